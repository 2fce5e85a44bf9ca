//! Distress classification: keyword heuristics over transcripts, a
//! transcription client for raw audio, and an independent LLM second
//! opinion. Classification failures never propagate; every error path
//! degrades to the safe "no distress detected" result.

pub mod keywords;
pub mod llm;
pub mod transcribe;

pub use keywords::{classify, ClassificationResult, DistressType};
pub use llm::{LlmAssessment, SecondOpinionClient};
pub use transcribe::TranscriptionClient;

use thiserror::Error;

use crate::config::Settings;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} service returned status {status}: {body}")]
    UpstreamStatus {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("LLM reply was not a valid assessment: {0}")]
    MalformedAssessment(String),
}

/// Outcome of a second-opinion request.
///
/// The fallback branch is explicit: when the LLM is unreachable or replies
/// with something unparseable, the caller gets the keyword classifier's
/// verdict, clearly labelled as such.
#[derive(Debug, Clone)]
pub enum SecondOpinion {
    Llm(LlmAssessment),
    HeuristicFallback(ClassificationResult),
}

/// Composes transcription and classification for incoming signals.
pub struct SignalAnalyzer {
    transcription: TranscriptionClient,
    llm: SecondOpinionClient,
}

impl SignalAnalyzer {
    pub fn new(settings: &Settings) -> Self {
        Self {
            transcription: TranscriptionClient::new(
                &settings.whisper_endpoint,
                &settings.whisper_api_key,
                settings.test_mode,
            ),
            llm: SecondOpinionClient::new(
                &settings.llm_endpoint,
                &settings.llm_api_key,
                &settings.llm_model,
                settings.test_mode,
            ),
        }
    }

    /// Classify already-decoded text. Pure and infallible.
    pub fn classify_text(&self, transcript: &str) -> ClassificationResult {
        classify(transcript)
    }

    /// Transcribe audio and classify the transcript.
    ///
    /// Transcription failures and empty transcripts both degrade to the
    /// NONE result; this method never errors.
    pub async fn analyze_audio(&self, audio: &[u8]) -> ClassificationResult {
        match self.transcription.transcribe(audio).await {
            Ok(transcript) => classify(&transcript),
            Err(e) => {
                tracing::warn!(error = %e, "Transcription failed; treating as no distress");
                ClassificationResult::none("")
            }
        }
    }

    /// Independent LLM assessment of a transcript.
    ///
    /// Never blended with the keyword score; on any LLM failure the named
    /// fallback branch carries the heuristic verdict instead.
    pub async fn second_opinion(&self, text: &str, context: &str) -> SecondOpinion {
        match self.llm.assess(text, context).await {
            Ok(assessment) => SecondOpinion::Llm(assessment),
            Err(e) => {
                tracing::warn!(error = %e, "LLM assessment unavailable; falling back to keyword classifier");
                SecondOpinion::HeuristicFallback(classify(text))
            }
        }
    }
}
