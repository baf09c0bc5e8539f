//! Gemini `generateContent` backend.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{FailureKind, GenerationBackend, GenerationOutcome};

/// Longest slice of an unrecognised error body kept in failure details.
const MAX_DETAIL_CHARS: usize = 300;

#[derive(Debug, Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    role: &'a str,
    parts: Vec<GeminiTextPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiTextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<GeminiPromptFeedback>,
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
struct GeminiPartResponse {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    code: Option<u16>,
    message: String,
    status: Option<String>,
}

/// Calls `{api_base}/models/{model}:generateContent` with the API key in a header.
#[derive(Clone)]
pub struct GeminiBackend {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl GeminiBackend {
    pub fn new(api_base: &str, model: &str, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to build HTTP client for Gemini")?;
        Ok(Self {
            client,
            endpoint: format!(
                "{}/models/{}:generateContent",
                api_base.trim_end_matches('/'),
                model
            ),
            api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    async fn complete(&self, prompt: &str, timeout: Duration) -> GenerationOutcome {
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiTextPart { text: prompt }],
            }],
        };

        let response = match self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .timeout(timeout)
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return transport_failure(e),
        };

        let status = response.status().as_u16();
        match response.text().await {
            Ok(text) => classify_reply(status, &text),
            Err(e) => transport_failure(e),
        }
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

fn transport_failure(e: reqwest::Error) -> GenerationOutcome {
    let kind = if e.is_timeout() {
        FailureKind::Timeout
    } else {
        FailureKind::TransportError
    };
    GenerationOutcome::failure(kind, e.to_string())
}

/// Maps an HTTP status and body to an outcome.
///
/// - 2xx with candidate text: success, text returned exactly as sent.
/// - 2xx without text (blocked prompt, safety stop) or undecodable: backend error.
/// - non-2xx carrying a Gemini error object, or any 4xx: backend error.
/// - 5xx without a recognisable error object: transport error.
fn classify_reply(status: u16, body: &str) -> GenerationOutcome {
    if (200..300).contains(&status) {
        return classify_success_body(body);
    }

    if let Ok(envelope) = serde_json::from_str::<GeminiErrorEnvelope>(body) {
        let err = envelope.error;
        return GenerationOutcome::failure(
            FailureKind::BackendError,
            format!(
                "{} {}: {}",
                err.status.as_deref().unwrap_or("ERROR"),
                err.code.unwrap_or(status),
                err.message
            ),
        );
    }

    let detail = format!("HTTP {status}: {}", truncate(body));
    if status >= 500 {
        GenerationOutcome::failure(FailureKind::TransportError, detail)
    } else {
        GenerationOutcome::failure(FailureKind::BackendError, detail)
    }
}

fn classify_success_body(body: &str) -> GenerationOutcome {
    let response: GeminiResponse = match serde_json::from_str(body) {
        Ok(response) => response,
        Err(e) => {
            return GenerationOutcome::failure(
                FailureKind::BackendError,
                format!("undecodable reply: {e}"),
            )
        }
    };

    if let Some(usage) = &response.usage_metadata {
        debug!(
            "Gemini call succeeded: prompt_tokens={:?}, output_tokens={:?}",
            usage.prompt_token_count, usage.candidates_token_count
        );
    }

    let Some(candidate) = response.candidates.first() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates".to_string());
        return GenerationOutcome::failure(
            FailureKind::BackendError,
            format!("prompt rejected: {reason}"),
        );
    };

    let text: String = candidate
        .content
        .iter()
        .flat_map(|c| c.parts.iter())
        .filter_map(|p| p.text.as_deref())
        .collect();

    if text.is_empty() {
        return GenerationOutcome::failure(
            FailureKind::BackendError,
            format!(
                "reply contained no text (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            ),
        );
    }

    GenerationOutcome::Success(text)
}

fn truncate(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_DETAIL_CHARS {
        trimmed.to_string()
    } else {
        let head: String = trimmed.chars().take(MAX_DETAIL_CHARS).collect();
        format!("{head}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure_kind(outcome: &GenerationOutcome) -> Option<FailureKind> {
        match outcome {
            GenerationOutcome::Failure { kind, .. } => Some(*kind),
            GenerationOutcome::Success(_) => None,
        }
    }

    #[test]
    fn test_success_concatenates_parts_verbatim() {
        let body = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Skill,Present\n"}, {"text": "---\n Score: 82% "}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 120, "candidatesTokenCount": 40}
        }"#;
        assert_eq!(
            classify_reply(200, body),
            GenerationOutcome::Success("Skill,Present\n---\n Score: 82% ".to_string())
        );
    }

    #[test]
    fn test_blocked_prompt_is_backend_error() {
        let body = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        let outcome = classify_reply(200, body);
        assert_eq!(failure_kind(&outcome), Some(FailureKind::BackendError));
        assert!(matches!(outcome, GenerationOutcome::Failure { detail, .. } if detail.contains("SAFETY")));
    }

    #[test]
    fn test_candidate_without_text_is_backend_error() {
        let body = r#"{"candidates": [{"finishReason": "SAFETY"}]}"#;
        assert_eq!(
            failure_kind(&classify_reply(200, body)),
            Some(FailureKind::BackendError)
        );
    }

    #[test]
    fn test_undecodable_success_body_is_backend_error() {
        assert_eq!(
            failure_kind(&classify_reply(200, "<html>oops</html>")),
            Some(FailureKind::BackendError)
        );
    }

    #[test]
    fn test_invalid_key_is_backend_error() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT"}}"#;
        let outcome = classify_reply(400, body);
        assert_eq!(
            outcome,
            GenerationOutcome::failure(
                FailureKind::BackendError,
                "INVALID_ARGUMENT 400: API key not valid."
            )
        );
    }

    #[test]
    fn test_quota_is_backend_error() {
        let body = r#"{"error": {"code": 429, "message": "Resource has been exhausted", "status": "RESOURCE_EXHAUSTED"}}"#;
        assert_eq!(
            failure_kind(&classify_reply(429, body)),
            Some(FailureKind::BackendError)
        );
    }

    #[test]
    fn test_bare_gateway_error_is_transport_error() {
        assert_eq!(
            failure_kind(&classify_reply(502, "Bad Gateway")),
            Some(FailureKind::TransportError)
        );
    }

    #[test]
    fn test_server_error_with_gemini_body_is_backend_error() {
        let body = r#"{"error": {"code": 503, "message": "The model is overloaded.", "status": "UNAVAILABLE"}}"#;
        assert_eq!(
            failure_kind(&classify_reply(503, body)),
            Some(FailureKind::BackendError)
        );
    }

    #[test]
    fn test_truncate_limits_long_bodies() {
        let long = "x".repeat(MAX_DETAIL_CHARS + 50);
        assert_eq!(truncate(&long).chars().count(), MAX_DETAIL_CHARS + 1);
        assert_eq!(truncate("  short  "), "short");
    }

    #[test]
    fn test_endpoint_joins_base_and_model() {
        let backend = GeminiBackend::new(
            "https://generativelanguage.googleapis.com/v1beta/",
            "gemini-1.5-flash",
            "key".to_string(),
        )
        .unwrap();
        assert_eq!(
            backend.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        let backend = GeminiBackend::new("http://127.0.0.1:9", "gemini-1.5-flash", "key".to_string())
            .unwrap();
        let outcome = backend.complete("hello", Duration::from_secs(5)).await;
        assert!(matches!(
            failure_kind(&outcome),
            Some(FailureKind::TransportError) | Some(FailureKind::Timeout)
        ));
    }
}
