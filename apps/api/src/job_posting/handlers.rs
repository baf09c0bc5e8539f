use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FetchJobPostingRequest {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct FetchJobPostingResponse {
    pub jd_text: String,
}

/// POST /api/v1/job-postings/fetch
pub async fn handle_fetch_job_posting(
    State(state): State<AppState>,
    Json(req): Json<FetchJobPostingRequest>,
) -> Result<Json<FetchJobPostingResponse>, AppError> {
    let jd_text = state.job_fetcher.fetch(&req.url).await?;
    Ok(Json(FetchJobPostingResponse { jd_text }))
}
