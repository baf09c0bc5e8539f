pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};

use crate::analysis::handlers;
use crate::job_posting::handlers::handle_fetch_job_posting;
use crate::state::AppState;

pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/analysis-kinds", get(handlers::handle_list_kinds))
        .route(
            "/api/v1/job-postings/fetch",
            post(handle_fetch_job_posting),
        )
        .route("/api/v1/sessions", post(handlers::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            delete(handlers::handle_delete_session),
        )
        .route(
            "/api/v1/sessions/:id/analyses",
            post(handlers::handle_run_analysis),
        )
        .route(
            "/api/v1/sessions/:id/analyses/latest",
            get(handlers::handle_latest_analysis),
        )
        .route("/api/v1/sessions/:id/report", get(handlers::handle_report))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::analysis::session::SessionStore;
    use crate::job_posting::JobPostingFetcher;
    use crate::llm_client::testing::ScriptedBackend;
    use crate::llm_client::GenerationClient;

    const BOUNDARY: &str = "matcher-test-boundary";
    const COMPETENCY_REPLY: &str = "Skill/Keyword,Present in Resume,Competency Rating,Suggestion to Improve\n\
        Python,✅,9,None\n\
        Airflow,❌,3,\"Describe a DAG you built, even a small one\"\n\
        ---\n**Score:** 82%";

    fn app(reply: &str) -> Router {
        let state = AppState {
            generator: GenerationClient::new(Arc::new(ScriptedBackend::replying(reply))),
            job_fetcher: Arc::new(JobPostingFetcher::new(Duration::from_secs(1)).unwrap()),
            sessions: SessionStore::new(),
        };
        build_router(state, 1024 * 1024)
    }

    fn multipart(fields: &[(&str, &str)]) -> Body {
        let mut body = String::new();
        for (name, value) in fields {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        Body::from(body)
    }

    fn analysis_request(session_id: &str, fields: &[(&str, &str)]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("/api/v1/sessions/{session_id}/analyses"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(multipart(fields))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn create_session(app: &Router) -> String {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/sessions")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        json_body(response).await["session_id"]
            .as_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app("").oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_lists_all_kinds() {
        let response = app("").oneshot(get("/api/v1/analysis-kinds")).await.unwrap();
        let kinds = json_body(response).await;
        assert_eq!(kinds.as_array().unwrap().len(), 4);
        assert_eq!(kinds[3]["kind"], "competency_mapping");
        assert_eq!(kinds[3]["timeout_secs"], 120);
    }

    #[tokio::test]
    async fn test_new_session_starts_idle() {
        let app = app("");
        let id = create_session(&app).await;
        let response = app
            .oneshot(get(&format!("/api/v1/sessions/{id}/analyses/latest")))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["latest"]["status"], "idle");
        assert_eq!(body["runs"], 0);
    }

    #[tokio::test]
    async fn test_competency_run_then_latest_and_csv_report() {
        let app = app(COMPETENCY_REPLY);
        let id = create_session(&app).await;

        let response = app
            .clone()
            .oneshot(analysis_request(
                &id,
                &[
                    ("kind", "competency_mapping"),
                    ("jd_text", "Data Engineer: Python, Airflow"),
                    ("resume_text", "Python developer"),
                ],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let run = json_body(response).await;
        assert_eq!(run["status"], "complete");
        assert_eq!(run["result"]["narrative"], "**Score:** 82%");
        assert_eq!(run["result"]["table"][0]["skill"], "Python");
        assert_eq!(run["result"]["table"][1]["rating"], 3);

        let latest = app
            .clone()
            .oneshot(get(&format!("/api/v1/sessions/{id}/analyses/latest")))
            .await
            .unwrap();
        let latest = json_body(latest).await;
        assert_eq!(latest["runs"], 1);
        assert_eq!(latest["latest"]["status"], "complete");

        let report = app
            .oneshot(get(&format!("/api/v1/sessions/{id}/report?format=csv")))
            .await
            .unwrap();
        assert_eq!(report.status(), StatusCode::OK);
        assert_eq!(
            report.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"competency_report.csv\""
        );
        let csv_text = to_bytes(report.into_body(), usize::MAX).await.unwrap();
        let csv_text = String::from_utf8(csv_text.to_vec()).unwrap();
        assert!(csv_text.starts_with("Skill/Keyword,Present in Resume"));
        assert!(csv_text.contains("\"Describe a DAG you built, even a small one\""));
    }

    #[tokio::test]
    async fn test_unstructured_reply_is_a_failed_run_not_an_http_error() {
        let app = app("I could not produce a table, sorry.");
        let id = create_session(&app).await;

        let response = app
            .clone()
            .oneshot(analysis_request(
                &id,
                &[
                    ("kind", "competency_mapping"),
                    ("jd_text", "JD"),
                    ("resume_text", "Resume"),
                ],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let run = json_body(response).await;
        assert_eq!(run["status"], "failed");
        assert_eq!(run["failure"]["stage"], "parsing");
        assert_eq!(run["failure"]["code"], "missing_separator");

        let report = app
            .oneshot(get(&format!("/api/v1/sessions/{id}/report")))
            .await
            .unwrap();
        assert_eq!(report.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_missing_resume_is_validation_error() {
        let app = app("unused");
        let id = create_session(&app).await;
        let response = app
            .oneshot(analysis_request(
                &id,
                &[("kind", "similarity_score"), ("jd_text", "JD")],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_kind_is_validation_error() {
        let app = app("unused");
        let id = create_session(&app).await;
        let response = app
            .oneshot(analysis_request(
                &id,
                &[("kind", "vibes"), ("jd_text", "JD"), ("resume_text", "CV")],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_deleted_session_is_gone() {
        let app = app("unused");
        let id = create_session(&app).await;
        let delete = |id: &str| {
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/v1/sessions/{id}"))
                .body(Body::empty())
                .unwrap()
        };

        let response = app.clone().oneshot(delete(&id)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let latest = app
            .clone()
            .oneshot(get(&format!("/api/v1/sessions/{id}/analyses/latest")))
            .await
            .unwrap();
        assert_eq!(latest.status(), StatusCode::NOT_FOUND);

        let again = app.oneshot(delete(&id)).await.unwrap();
        assert_eq!(again.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let response = app("unused")
            .oneshot(get(&format!(
                "/api/v1/sessions/{}/analyses/latest",
                uuid::Uuid::new_v4()
            )))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_job_url_is_rejected_before_running() {
        let response = app("unused")
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/job-postings/fetch")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"url": "https://example.com/careers/1"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["code"], "INVALID_JOB_URL");
    }
}
