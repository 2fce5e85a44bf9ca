//! LLM-backed second opinion for ad-hoc text analysis.
//!
//! This path is independent of the keyword classifier: its verdict is never
//! numerically blended with the heuristic score, and a reply that is not
//! valid JSON is a typed error the caller handles with an explicit fallback.

use serde::{Deserialize, Serialize};

use super::keywords::DistressType;
use super::AnalysisError;

const SYSTEM_PROMPT: &str = "You are a safety analysis AI for a personal safety app. \
Analyze the provided transcription for signs of distress or emergency.\n\
Respond in JSON format:\n\
{\n\
    \"is_emergency\": boolean,\n\
    \"confidence\": float (0-1),\n\
    \"distress_type\": \"SCREAM\" | \"HELP_CALL\" | \"CRYING\" | \"PANIC\" | \"NONE\",\n\
    \"rationale\": \"brief explanation\"\n\
}\n\
Be sensitive to calls for help (explicit or implicit), signs of fear or \
panic, indicators of physical danger, and background sounds suggesting distress.";

/// Structured verdict parsed from the model reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmAssessment {
    pub is_emergency: bool,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub distress_type: Option<DistressType>,
    #[serde(default, alias = "analysis")]
    pub rationale: String,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Client for an OpenAI-style chat-completions endpoint.
pub struct SecondOpinionClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    test_mode: bool,
}

impl SecondOpinionClient {
    pub fn new(endpoint: &str, api_key: &str, model: &str, test_mode: bool) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            test_mode,
        }
    }

    /// Ask the model whether `text` describes an emergency.
    pub async fn assess(&self, text: &str, context: &str) -> Result<LlmAssessment, AnalysisError> {
        if self.test_mode || self.api_key.is_empty() {
            tracing::debug!("Sandbox mode: simulating LLM assessment");
            return Ok(LlmAssessment {
                is_emergency: false,
                confidence: 0.5,
                distress_type: Some(DistressType::None),
                rationale: "sandbox mode - no analysis performed".into(),
            });
        }

        let user_prompt = if context.is_empty() {
            format!("Analyze this transcription for safety concerns:\n\n\"{text}\"")
        } else {
            format!(
                "Analyze this transcription for safety concerns:\n\n\"{text}\"\n\nAdditional context: {context}"
            )
        };

        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &user_prompt,
                },
            ],
            temperature: 0.3,
            max_tokens: 512,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::UpstreamStatus {
                service: "llm",
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or_default();

        parse_assessment(content)
    }
}

/// Parse the model reply into an [`LlmAssessment`].
///
/// Models sometimes wrap JSON in a markdown fence; that is stripped first.
/// Anything else that fails to parse is a [`AnalysisError::MalformedAssessment`].
pub fn parse_assessment(content: &str) -> Result<LlmAssessment, AnalysisError> {
    let trimmed = strip_code_fence(content.trim());
    serde_json::from_str(trimmed)
        .map_err(|e| AnalysisError::MalformedAssessment(format!("{e}: {trimmed}")))
}

fn strip_code_fence(text: &str) -> &str {
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sandbox_mode_returns_fixed_verdict() {
        let client = SecondOpinionClient::new("http://unreachable.invalid", "key", "m", true);
        let verdict = client.assess("help me", "").await.unwrap();
        assert!(!verdict.is_emergency);
        assert_eq!(verdict.confidence, 0.5);
    }

    #[test]
    fn parse_assessment_full_payload() {
        let verdict = parse_assessment(
            r#"{"is_emergency": true, "confidence": 0.92, "distress_type": "HELP_CALL", "rationale": "explicit call for help"}"#,
        )
        .unwrap();
        assert!(verdict.is_emergency);
        assert_eq!(verdict.confidence, 0.92);
        assert_eq!(verdict.distress_type, Some(DistressType::HelpCall));
        assert_eq!(verdict.rationale, "explicit call for help");
    }

    #[test]
    fn parse_assessment_accepts_analysis_alias() {
        let verdict =
            parse_assessment(r#"{"is_emergency": false, "analysis": "calm conversation"}"#)
                .unwrap();
        assert_eq!(verdict.rationale, "calm conversation");
        assert_eq!(verdict.confidence, 0.0);
    }

    #[test]
    fn parse_assessment_strips_markdown_fence() {
        let verdict =
            parse_assessment("```json\n{\"is_emergency\": true, \"confidence\": 0.8}\n```")
                .unwrap();
        assert!(verdict.is_emergency);
    }

    #[test]
    fn parse_assessment_non_json_is_typed_error() {
        let err = parse_assessment("I think this sounds fine.").unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedAssessment(_)));
    }
}
