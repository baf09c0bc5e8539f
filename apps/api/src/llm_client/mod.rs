//! LLM Client — the single point of entry for all text-generation calls.
//!
//! ARCHITECTURAL RULE: No other module may call the generation backend directly.
//! All backend interactions MUST go through `GenerationClient`.
//!
//! One request per call, no automatic retries: every call costs quota, so
//! re-running is the caller's decision. Every failure path comes back as
//! `GenerationOutcome::Failure`; nothing escapes as a panic or error.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod gemini;

pub use gemini::GeminiBackend;

/// Machine-distinguishable failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// The configured timeout expired before a full reply arrived.
    Timeout,
    /// DNS, connection, or transport-level fault.
    TransportError,
    /// The backend answered but refused or could not serve the request
    /// (quota, invalid key, malformed request, blocked prompt).
    BackendError,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureKind::Timeout => "timeout",
            FailureKind::TransportError => "transport error",
            FailureKind::BackendError => "backend error",
        })
    }
}

/// Result of one generation call. Success carries the raw reply, untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Success(String),
    Failure { kind: FailureKind, detail: String },
}

impl GenerationOutcome {
    pub fn failure(kind: FailureKind, detail: impl Into<String>) -> Self {
        GenerationOutcome::Failure {
            kind,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("generation timeout must be greater than zero")]
pub struct InvalidTimeout;

/// A filled prompt plus the time budget for answering it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    prompt: String,
    timeout: Duration,
}

impl GenerationRequest {
    pub fn new(prompt: String, timeout: Duration) -> Result<Self, InvalidTimeout> {
        if timeout.is_zero() {
            return Err(InvalidTimeout);
        }
        Ok(Self { prompt, timeout })
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// A text-generation backend: prompt in, reply text out.
///
/// Implementations classify their own faults but need not enforce the
/// timeout; `GenerationClient` bounds every call.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn complete(&self, prompt: &str, timeout: Duration) -> GenerationOutcome;

    /// Short identifier for logs.
    fn name(&self) -> &str;
}

/// Bounds calls to a `GenerationBackend` by the request's timeout.
#[derive(Clone)]
pub struct GenerationClient {
    backend: Arc<dyn GenerationBackend>,
}

impl GenerationClient {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Issues exactly one backend call. On timeout the in-flight call is
    /// dropped and whatever it had received is discarded.
    pub async fn generate(&self, request: &GenerationRequest) -> GenerationOutcome {
        debug!(
            "Generation call to {}: prompt_chars={}, timeout={}s",
            self.backend.name(),
            request.prompt().len(),
            request.timeout().as_secs()
        );

        let timeout = request.timeout();
        let call = self.backend.complete(request.prompt(), timeout);
        match tokio::time::timeout(timeout, call).await {
            Ok(outcome) => {
                if let GenerationOutcome::Failure { kind, detail } = &outcome {
                    warn!("Generation call failed ({kind}): {detail}");
                }
                outcome
            }
            Err(_) => {
                warn!(
                    "Generation call timed out after {}s",
                    timeout.as_secs()
                );
                GenerationOutcome::failure(
                    FailureKind::Timeout,
                    format!(
                        "no reply from {} within {}s",
                        self.backend.name(),
                        timeout.as_secs()
                    ),
                )
            }
        }
    }
}
