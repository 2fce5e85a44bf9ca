//! Keyword heuristics for distress detection.
//!
//! Pure functions over fixed keyword tables; classification never fails.
//! Matching is lowercase substring containment, which also catches
//! transcriber sound tags like "[screaming]".

use serde::{Deserialize, Serialize};

use crate::models::AlertType;

/// Fixed internal threshold for the `distress_detected` flag.
/// Independent of the configurable alert-trigger threshold.
const DETECTION_THRESHOLD: f64 = 0.6;

/// Category of distress heard in a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DistressType {
    Scream,
    HelpCall,
    Crying,
    Panic,
    None,
}

impl DistressType {
    /// The alert type a detection of this kind maps to, if any.
    pub fn alert_type(&self) -> Option<AlertType> {
        match self {
            Self::Scream => Some(AlertType::Scream),
            Self::HelpCall | Self::Crying => Some(AlertType::Distress),
            Self::Panic => Some(AlertType::Panic),
            Self::None => None,
        }
    }
}

/// Result of one classification call. Transient; owned by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub transcript: String,
    pub distress_type: DistressType,
    pub confidence: f64,
    pub keywords: Vec<String>,
    pub distress_detected: bool,
}

impl ClassificationResult {
    /// The safe default: nothing detected.
    pub fn none(transcript: &str) -> Self {
        Self {
            transcript: transcript.to_string(),
            distress_type: DistressType::None,
            confidence: 0.0,
            keywords: Vec::new(),
            distress_detected: false,
        }
    }
}

// ── Keyword tables ──────────────────────────────────────────

static SCREAM_INDICATORS: &[&str] = &[
    "scream",
    "screaming",
    "yell",
    "yelling",
    "shout",
    "shouting",
    "[scream]",
    "[screaming]",
    "[yelling]",
    "[inaudible]",
    "[noise]",
    "[loud noise]",
];

static HELP_PHRASES: &[&str] = &["help", "help me", "someone help", "please help"];

static CRYING_KEYWORDS: &[&str] = &["crying", "cry"];

static DISTRESS_KEYWORDS: &[&str] = &[
    "help",
    "help me",
    "someone help",
    "please help",
    "stop",
    "let me go",
    "leave me alone",
    "don't",
    "please don't",
    "emergency",
    "call 911",
    "police",
    "fire",
    "attack",
    "danger",
    "hurt",
    "pain",
    "scared",
    "run",
    "get away",
    "save me",
];

// ── Classification ──────────────────────────────────────────

/// Classify a transcript into a distress category with a confidence score.
///
/// Rules are checked in fixed precedence order; first match wins:
/// scream indicators, explicit help calls, crying, then matched-keyword
/// count (two or more → 0.8, exactly one → 0.6, none → no distress).
pub fn classify(transcript: &str) -> ClassificationResult {
    let lower = transcript.to_lowercase();

    let mut keywords: Vec<String> = DISTRESS_KEYWORDS
        .iter()
        .filter(|kw| lower.contains(*kw))
        .map(|kw| kw.to_string())
        .collect();
    let distress_hits = keywords.len();

    let scream_hit = SCREAM_INDICATORS.iter().find(|ind| lower.contains(*ind));
    if let Some(ind) = scream_hit {
        keywords.push(ind.to_string());
    }
    let crying_hit = CRYING_KEYWORDS.iter().find(|kw| lower.contains(*kw));
    if let Some(kw) = crying_hit {
        keywords.push(kw.to_string());
    }

    let (distress_type, confidence) = if scream_hit.is_some() {
        (DistressType::Scream, 0.9)
    } else if HELP_PHRASES.iter().any(|p| lower.contains(p)) {
        (DistressType::HelpCall, 0.95)
    } else if crying_hit.is_some() {
        (DistressType::Crying, 0.7)
    } else if distress_hits >= 2 {
        (DistressType::Panic, 0.8)
    } else if distress_hits == 1 {
        (DistressType::Panic, 0.6)
    } else {
        (DistressType::None, 0.0)
    };

    ClassificationResult {
        transcript: transcript.to_string(),
        distress_detected: distress_type != DistressType::None
            && confidence >= DETECTION_THRESHOLD,
        distress_type,
        confidence,
        keywords,
    }
}
