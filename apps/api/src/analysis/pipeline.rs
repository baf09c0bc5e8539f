//! One analysis run: extract → generate → parse, tracked as a state machine.
//!
//! `Idle → Extracting → Generating → Parsing → Complete | Failed(stage, reason)`.
//! Terminal states never transition again; a new run starts a new `AnalysisRun`.
//! Every stage failure is recorded as data. Nothing is retried.

use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;

use crate::analysis::catalog;
use crate::analysis::kind::AnalysisKind;
use crate::analysis::parser::{self, AnalysisResult, ParseError};
use crate::extraction::{self, ExtractionError};
use crate::llm_client::{
    FailureKind, GenerationClient, GenerationOutcome, GenerationRequest, InvalidTimeout,
};

/// A stage that can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Extracting,
    Generating,
    Parsing,
}

/// Why a run failed. Generation and parse failures stay distinct so callers
/// can tell "re-prompt" from "re-parse".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureReason {
    #[error("{0}")]
    Extraction(ExtractionError),

    #[error("{0}")]
    InvalidRequest(InvalidTimeout),

    #[error("{kind}: {detail}")]
    Generation { kind: FailureKind, detail: String },

    #[error("{0}")]
    Parse(ParseError),
}

impl FailureReason {
    /// Stable machine-readable code for API consumers.
    pub fn code(&self) -> &'static str {
        match self {
            FailureReason::Extraction(ExtractionError::Missing) => "document_missing",
            FailureReason::Extraction(ExtractionError::Unsupported) => "document_unsupported",
            FailureReason::Extraction(ExtractionError::Unreadable(_)) => "document_unreadable",
            FailureReason::Extraction(ExtractionError::NoText) => "document_no_text",
            FailureReason::InvalidRequest(_) => "invalid_request",
            FailureReason::Generation { kind, .. } => match kind {
                FailureKind::Timeout => "timeout",
                FailureKind::TransportError => "transport_error",
                FailureKind::BackendError => "backend_error",
            },
            FailureReason::Parse(ParseError::MissingSeparator) => "missing_separator",
            FailureReason::Parse(ParseError::MalformedHeader { .. }) => "malformed_header",
            FailureReason::Parse(ParseError::MalformedRow { .. }) => "malformed_row",
            FailureReason::Parse(ParseError::RatingOutOfRange { .. }) => "rating_out_of_range",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Extracting,
    Generating,
    Parsing,
    Complete(AnalysisResult),
    Failed { stage: Stage, reason: FailureReason },
}

impl RunState {
    pub fn name(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Extracting => "extracting",
            RunState::Generating => "generating",
            RunState::Parsing => "parsing",
            RunState::Complete(_) => "complete",
            RunState::Failed { .. } => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Complete(_) | RunState::Failed { .. })
    }

    /// The stage this state is working in, if any.
    fn active_stage(&self) -> Option<Stage> {
        match self {
            RunState::Extracting => Some(Stage::Extracting),
            RunState::Generating => Some(Stage::Generating),
            RunState::Parsing => Some(Stage::Parsing),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid run transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: &'static str,
    pub to: &'static str,
}

/// Owns the state of a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRun {
    state: RunState,
}

impl Default for AnalysisRun {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisRun {
    pub fn new() -> Self {
        Self {
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn into_state(self) -> RunState {
        self.state
    }

    pub fn advance(&mut self, next: RunState) -> Result<(), InvalidTransition> {
        let allowed = match (&self.state, &next) {
            (RunState::Idle, RunState::Extracting) => true,
            (RunState::Extracting, RunState::Generating) => true,
            (RunState::Generating, RunState::Parsing) => true,
            (RunState::Parsing, RunState::Complete(_)) => true,
            (current, RunState::Failed { stage, .. }) => current.active_stage() == Some(*stage),
            _ => false,
        };
        if !allowed {
            return Err(InvalidTransition {
                from: self.state.name(),
                to: next.name(),
            });
        }
        self.state = next;
        Ok(())
    }

    fn fail(&mut self, stage: Stage, reason: FailureReason) -> Result<(), InvalidTransition> {
        self.advance(RunState::Failed { stage, reason })
    }
}

/// Where the resume text comes from.
#[derive(Debug, Clone)]
pub enum ResumeSource {
    Pdf(Bytes),
    Text(String),
}

#[derive(Debug, Clone)]
pub struct AnalysisInput {
    pub kind: AnalysisKind,
    /// Pasted or fetched job description. Should be non-empty.
    pub jd_text: String,
    pub resume: ResumeSource,
    pub timeout: Duration,
}

impl AnalysisInput {
    pub fn new(kind: AnalysisKind, jd_text: String, resume: ResumeSource) -> Self {
        Self {
            kind,
            jd_text,
            resume,
            timeout: kind.timeout(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Executes one run to a terminal state. Costs exactly one backend call
/// when extraction succeeds, none otherwise.
pub async fn run_analysis(
    client: &GenerationClient,
    input: AnalysisInput,
) -> Result<AnalysisRun, InvalidTransition> {
    let mut run = AnalysisRun::new();

    run.advance(RunState::Extracting)?;
    let resume_text = match extract_resume(input.resume).await {
        Ok(text) => text,
        Err(e) => {
            run.fail(Stage::Extracting, FailureReason::Extraction(e))?;
            return Ok(run);
        }
    };

    run.advance(RunState::Generating)?;
    let prompt = catalog::render(input.kind, &input.jd_text, &resume_text);
    let request = match GenerationRequest::new(prompt, input.timeout) {
        Ok(request) => request,
        Err(e) => {
            run.fail(Stage::Generating, FailureReason::InvalidRequest(e))?;
            return Ok(run);
        }
    };
    let raw = match client.generate(&request).await {
        GenerationOutcome::Success(raw) => raw,
        GenerationOutcome::Failure { kind, detail } => {
            run.fail(Stage::Generating, FailureReason::Generation { kind, detail })?;
            return Ok(run);
        }
    };

    run.advance(RunState::Parsing)?;
    match parser::parse(input.kind, &raw) {
        Ok(result) => run.advance(RunState::Complete(result))?,
        Err(e) => run.fail(Stage::Parsing, FailureReason::Parse(e))?,
    }
    debug_assert!(run.state().is_terminal());
    Ok(run)
}

async fn extract_resume(source: ResumeSource) -> Result<String, ExtractionError> {
    match source {
        ResumeSource::Text(text) if text.trim().is_empty() => Err(ExtractionError::NoText),
        ResumeSource::Text(text) => Ok(text),
        ResumeSource::Pdf(bytes) => {
            tokio::task::spawn_blocking(move || extraction::extract_pdf_text(&bytes))
                .await
                .map_err(|e| ExtractionError::Unreadable(e.to_string()))?
        }
    }
}
