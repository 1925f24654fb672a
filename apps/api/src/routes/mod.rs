pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};

use crate::interview::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        // Session lifecycle
        .route("/api/v1/sessions", post(handlers::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            get(handlers::handle_get_session).delete(handlers::handle_end_session),
        )
        // Interview workflow
        .route(
            "/api/v1/sessions/:id/resume",
            post(handlers::handle_upload_resume),
        )
        .route(
            "/api/v1/sessions/:id/profile",
            post(handlers::handle_parse_profile),
        )
        .route(
            "/api/v1/sessions/:id/questions",
            post(handlers::handle_generate_questions),
        )
        .route(
            "/api/v1/sessions/:id/answers",
            put(handlers::handle_submit_answers),
        )
        .route(
            "/api/v1/sessions/:id/evaluate",
            post(handlers::handle_evaluate),
        )
        .route(
            "/api/v1/sessions/:id/export.csv",
            get(handlers::handle_export_csv),
        )
        .layer(DefaultBodyLimit::max(upload_limit))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::llm_client::testing::ScriptedInvoker;
    use crate::session::SessionStore;

    const BOUNDARY: &str = "interview-test-boundary";

    const PROFILE_REPLY: &str = r#"```json
{"name": "Ada Lovelace", "email": "ada@example.com", "experience": ["Analyst at Babbage & Co"],
 "projects": ["Analytical Engine notes"], "education": "Self-taught",
 "skills": ["Mathematics", "Programming"], "extracurricular": "Poetry"}
```"#;

    fn test_config() -> Config {
        Config {
            llm_api_key: "test-key".to_string(),
            llm_base_url: "http://localhost:0".to_string(),
            llm_model: "test-model".to_string(),
            llm_temperature: 1.0,
            question_batch_pause: Duration::ZERO,
            max_upload_bytes: 1024 * 1024,
            session_ttl: Duration::from_secs(3600),
            port: 0,
            rust_log: "info".to_string(),
        }
    }

    fn app(invoker: ScriptedInvoker) -> Router {
        build_router(AppState {
            invoker: Arc::new(invoker),
            sessions: SessionStore::default(),
            config: test_config(),
        })
    }

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: Method, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn upload_request(uri: &str, content_type: &str, contents: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; \
             filename=\"resume\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(contents);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn create_session(app: &Router) -> String {
        let response = send(app, empty_request(Method::POST, "/api/v1/sessions")).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await["session_id"]
            .as_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let app = app(ScriptedInvoker::default());
        let response = send(&app, empty_request(Method::GET, "/health")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "interview-api");
    }

    #[tokio::test]
    async fn test_full_interview_flow() {
        let app = app(ScriptedInvoker::texts([
            PROFILE_REPLY.to_string(),
            r#"[{'question': 'Tell me about the Analytical Engine.'}, {'question': 'How do you test a model?'}]"#
                .to_string(),
            r#"[{"question": "Tell me about the Analytical Engine.", "answer": "It computes.",
                 "score": 7, "comments": "Good, expand on loops"},
                {"question": "How do you test a model?", "answer": "Hold-out set",
                 "score": "9", "comments": "Solid"}]"#
                .to_string(),
        ]));
        let id = create_session(&app).await;
        let base = format!("/api/v1/sessions/{id}");

        let response = send(
            &app,
            upload_request(&format!("{base}/resume"), "text/plain", b"Ada Lovelace\nMathematician"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["format"], "text");
        assert_eq!(body["resume_text"], "Ada Lovelace\nMathematician");
        assert!(body["extraction_error"].is_null());

        let response = send(&app, empty_request(Method::POST, &format!("{base}/profile"))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["profile"]["name"], "Ada Lovelace");
        assert_eq!(body["profile"]["skills"][1], "Programming");

        let response = send(
            &app,
            json_request(
                Method::POST,
                &format!("{base}/questions"),
                json!({"job_position": "Data Scientist", "num_questions": 2}),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(
            body["questions"][0]["question"],
            "Tell me about the Analytical Engine."
        );
        assert_eq!(body["questions"].as_array().unwrap().len(), 2);

        let response = send(
            &app,
            json_request(
                Method::PUT,
                &format!("{base}/answers"),
                json!({"answers": ["It computes.", "Hold-out set"]}),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = send(&app, empty_request(Method::POST, &format!("{base}/evaluate"))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["feedback"][0]["score"], 7);
        assert_eq!(body["feedback"][1]["score"], 9);

        let response = send(&app, empty_request(Method::GET, &format!("{base}/export.csv"))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"interview_results.csv\""
        );
        let csv = body_text(response).await;
        assert!(csv.starts_with("Question,Answer,Score,Comments\n"));
        assert!(csv.contains("How do you test a model?,Hold-out set,9,Solid\n"));
        assert!(csv.contains("\"Good, expand on loops\""));
    }

    #[tokio::test]
    async fn test_unknown_session_is_404() {
        let app = app(ScriptedInvoker::default());
        let uri = format!("/api/v1/sessions/{}", uuid::Uuid::new_v4());
        let response = send(&app, empty_request(Method::GET, &uri)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_delete_session_ends_it() {
        let app = app(ScriptedInvoker::default());
        let id = create_session(&app).await;
        let uri = format!("/api/v1/sessions/{id}");

        let response = send(&app, empty_request(Method::DELETE, &uri)).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let response = send(&app, empty_request(Method::GET, &uri)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unreadable_pdf_is_reported_not_fatal() {
        let app = app(ScriptedInvoker::default());
        let id = create_session(&app).await;

        let response = send(
            &app,
            upload_request(
                &format!("/api/v1/sessions/{id}/resume"),
                "application/pdf",
                b"definitely not a pdf",
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["format"], "pdf");
        assert_eq!(body["resume_text"], "");
        assert!(body["extraction_error"]
            .as_str()
            .unwrap()
            .starts_with("Error reading PDF:"));
    }

    #[tokio::test]
    async fn test_profile_requires_resume() {
        let app = app(ScriptedInvoker::default());
        let id = create_session(&app).await;
        let response = send(
            &app,
            empty_request(Method::POST, &format!("/api/v1/sessions/{id}/profile")),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unparseable_profile_returns_parse_error() {
        let app = app(ScriptedInvoker::texts(["I could not find a resume."]));
        let id = create_session(&app).await;
        let base = format!("/api/v1/sessions/{id}");
        send(&app, upload_request(&format!("{base}/resume"), "text/plain", b"Ada")).await;

        let response = send(&app, empty_request(Method::POST, &format!("{base}/profile"))).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "PARSE_ERROR");
        assert_eq!(body["error"]["details"]["raw_output"], "I could not find a resume.");
    }

    #[tokio::test]
    async fn test_model_failure_is_bad_gateway() {
        // Replies run out immediately, so the invoker reports an error.
        let app = app(ScriptedInvoker::default());
        let id = create_session(&app).await;
        let base = format!("/api/v1/sessions/{id}");
        send(&app, upload_request(&format!("{base}/resume"), "text/plain", b"Ada")).await;

        let response = send(&app, empty_request(Method::POST, &format!("{base}/profile"))).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "MODEL_INVOCATION_ERROR");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .starts_with("Error running resume parser agent:"));
    }

    #[tokio::test]
    async fn test_question_count_out_of_range_is_rejected() {
        let app = app(ScriptedInvoker::texts([PROFILE_REPLY]));
        let id = create_session(&app).await;
        let base = format!("/api/v1/sessions/{id}");
        send(&app, upload_request(&format!("{base}/resume"), "text/plain", b"Ada")).await;
        send(&app, empty_request(Method::POST, &format!("{base}/profile"))).await;

        let response = send(
            &app,
            json_request(
                Method::POST,
                &format!("{base}/questions"),
                json!({"num_questions": 31}),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_export_without_feedback_is_404() {
        let app = app(ScriptedInvoker::default());
        let id = create_session(&app).await;
        let response = send(
            &app,
            empty_request(Method::GET, &format!("/api/v1/sessions/{id}/export.csv")),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
