//! Axum route handlers for the Analysis API.

use std::time::Duration;

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis::export::{competency_csv, markdown_report};
use crate::analysis::kind::{AnalysisKind, UnknownKind};
use crate::analysis::parser::AnalysisResult;
use crate::analysis::pipeline::{run_analysis, AnalysisInput, ResumeSource, RunState, Stage};
use crate::errors::AppError;
use crate::state::AppState;

const MISSING_INPUTS: &str =
    "Please provide both a job description (jd_text or job_url) and a resume (resume file or resume_text)";
const MAX_TIMEOUT_SECS: u64 = 180;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct AnalysisKindInfo {
    pub kind: AnalysisKind,
    pub title: &'static str,
    pub timeout_secs: u64,
    pub has_table: bool,
}

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct RunFailure {
    pub stage: Stage,
    pub code: &'static str,
    pub message: String,
}

/// JSON view of a run state.
#[derive(Debug, Serialize)]
pub struct RunStateResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalysisResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<RunFailure>,
}

impl From<&RunState> for RunStateResponse {
    fn from(state: &RunState) -> Self {
        let (result, failure) = match state {
            RunState::Complete(result) => (Some(result.clone()), None),
            RunState::Failed { stage, reason } => (
                None,
                Some(RunFailure {
                    stage: *stage,
                    code: reason.code(),
                    message: reason.to_string(),
                }),
            ),
            _ => (None, None),
        };
        Self {
            status: state.name(),
            result,
            failure,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub runs: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub latest: RunStateResponse,
}

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Md,
    Csv,
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    #[serde(default)]
    pub format: ReportFormat,
}

/// Fields accepted by the analysis upload form.
#[derive(Debug, Default)]
struct AnalysisForm {
    kind: Option<String>,
    jd_text: Option<String>,
    job_url: Option<String>,
    resume_pdf: Option<Bytes>,
    resume_text: Option<String>,
    timeout_secs: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/analysis-kinds
pub async fn handle_list_kinds() -> Json<Vec<AnalysisKindInfo>> {
    Json(
        AnalysisKind::ALL
            .into_iter()
            .map(|kind| AnalysisKindInfo {
                kind,
                title: kind.title(),
                timeout_secs: kind.timeout().as_secs(),
                has_table: kind.has_table(),
            })
            .collect(),
    )
}

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<CreateSessionResponse>) {
    let session_id = state.sessions.create().await;
    info!("Session created: {session_id}");
    (StatusCode::CREATED, Json(CreateSessionResponse { session_id }))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.sessions.remove(session_id).await {
        return Err(session_not_found(session_id));
    }
    info!("Session deleted: {session_id}");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/sessions/:id/analyses
///
/// Multipart form: `kind`, `jd_text` or `job_url`, `resume` (PDF) or
/// `resume_text`, optional `timeout_secs`. Runs one analysis to completion and
/// stores it as the session's latest. A failed run is still a 200 with
/// `status: "failed"`; the caller decides whether to run again.
pub async fn handle_run_analysis(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<RunStateResponse>, AppError> {
    if !state.sessions.contains(session_id).await {
        return Err(session_not_found(session_id));
    }

    let form = read_form(multipart).await?;

    let kind: AnalysisKind = form
        .kind
        .as_deref()
        .ok_or_else(|| AppError::Validation("kind is required".to_string()))?
        .parse()
        .map_err(|e: UnknownKind| AppError::Validation(e.to_string()))?;

    let timeout = form
        .timeout_secs
        .as_deref()
        .map(parse_timeout)
        .transpose()?
        .unwrap_or_else(|| kind.timeout());

    let resume = match (form.resume_pdf, non_blank(form.resume_text)) {
        (Some(bytes), _) => ResumeSource::Pdf(bytes),
        (None, Some(text)) => ResumeSource::Text(text),
        (None, None) => return Err(AppError::Validation(MISSING_INPUTS.to_string())),
    };

    let jd_text = match (non_blank(form.jd_text), non_blank(form.job_url)) {
        (Some(jd), _) => jd,
        (None, Some(url)) => state.job_fetcher.fetch(&url).await?,
        (None, None) => return Err(AppError::Validation(MISSING_INPUTS.to_string())),
    };

    let input = AnalysisInput::new(kind, jd_text, resume).with_timeout(timeout);
    let run = run_analysis(&state.generator, input)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    let response = RunStateResponse::from(run.state());
    match &response.failure {
        None => info!(
            "Analysis {kind} completed for session {session_id} via {}",
            state.generator.backend_name()
        ),
        Some(failure) => warn!(
            "Analysis {kind} failed for session {session_id} at {:?}: {}",
            failure.stage, failure.message
        ),
    }

    state.sessions.record(session_id, run).await;
    Ok(Json(response))
}

/// GET /api/v1/sessions/:id/analyses/latest
pub async fn handle_latest_analysis(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = state
        .sessions
        .get(session_id)
        .await
        .ok_or_else(|| session_not_found(session_id))?;

    Ok(Json(SessionResponse {
        session_id,
        runs: session.runs(),
        created_at: session.created_at(),
        updated_at: session.updated_at(),
        latest: RunStateResponse::from(session.latest()),
    }))
}

/// GET /api/v1/sessions/:id/report?format=md|csv
pub async fn handle_report(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, AppError> {
    let session = state
        .sessions
        .get(session_id)
        .await
        .ok_or_else(|| session_not_found(session_id))?;

    let result = session.latest_result().ok_or_else(|| {
        AppError::UnprocessableEntity("No completed analysis to export yet".to_string())
    })?;

    let (body, content_type, extension) = match query.format {
        ReportFormat::Md => (
            markdown_report(result, Utc::now()),
            "text/markdown; charset=utf-8",
            "md",
        ),
        ReportFormat::Csv => (competency_csv(result)?, "text/csv; charset=utf-8", "csv"),
    };

    let headers = [
        (header::CONTENT_TYPE, content_type.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"competency_report.{extension}\""),
        ),
    ];
    Ok((headers, body).into_response())
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

async fn read_form(mut multipart: Multipart) -> Result<AnalysisForm, AppError> {
    let mut form = AnalysisForm::default();

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "resume" => {
                let bytes = field.bytes().await.map_err(bad_multipart)?;
                // Browsers send an empty part when no file was chosen.
                if !bytes.is_empty() {
                    form.resume_pdf = Some(bytes);
                }
            }
            "kind" => form.kind = Some(field.text().await.map_err(bad_multipart)?),
            "jd_text" => form.jd_text = Some(field.text().await.map_err(bad_multipart)?),
            "job_url" => form.job_url = Some(field.text().await.map_err(bad_multipart)?),
            "resume_text" => form.resume_text = Some(field.text().await.map_err(bad_multipart)?),
            "timeout_secs" => form.timeout_secs = Some(field.text().await.map_err(bad_multipart)?),
            _ => {}
        }
    }

    Ok(form)
}

fn bad_multipart(e: MultipartError) -> AppError {
    AppError::Validation(format!("Invalid multipart body: {e}"))
}

fn parse_timeout(raw: &str) -> Result<Duration, AppError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if (1..=MAX_TIMEOUT_SECS).contains(&secs) => Ok(Duration::from_secs(secs)),
        _ => Err(AppError::Validation(format!(
            "timeout_secs must be a whole number between 1 and {MAX_TIMEOUT_SECS}"
        ))),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn session_not_found(session_id: Uuid) -> AppError {
    AppError::NotFound(format!("Session {session_id} not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::parser::ParseError;
    use crate::analysis::pipeline::FailureReason;

    #[test]
    fn test_parse_timeout_bounds() {
        assert_eq!(parse_timeout("60").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_timeout(" 180 ").unwrap(), Duration::from_secs(180));
        assert!(parse_timeout("0").is_err());
        assert!(parse_timeout("181").is_err());
        assert!(parse_timeout("soon").is_err());
    }

    #[test]
    fn test_non_blank_drops_whitespace() {
        assert_eq!(non_blank(Some("  ".to_string())), None);
        assert_eq!(non_blank(None), None);
        assert_eq!(non_blank(Some("jd".to_string())), Some("jd".to_string()));
    }

    #[test]
    fn test_failed_state_view_carries_stage_and_code() {
        let state = RunState::Failed {
            stage: Stage::Parsing,
            reason: FailureReason::Parse(ParseError::MissingSeparator),
        };
        let json = serde_json::to_value(RunStateResponse::from(&state)).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["failure"]["stage"], "parsing");
        assert_eq!(json["failure"]["code"], "missing_separator");
        assert!(json.get("result").is_none());
    }

    #[test]
    fn test_idle_state_view_has_no_result_or_failure() {
        let json = serde_json::to_value(RunStateResponse::from(&RunState::Idle)).unwrap();
        assert_eq!(json, serde_json::json!({"status": "idle"}));
    }
}
