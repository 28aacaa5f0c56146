pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::ai::handlers as ai;
use crate::auth::handlers as auth;
use crate::cv::handlers as cv;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Accounts
        .route("/api/v1/auth/register", post(auth::handle_register))
        .route("/api/v1/auth/login", post(auth::handle_login))
        .route("/api/v1/me", get(auth::handle_me))
        // CVs
        .route(
            "/api/v1/cvs",
            get(cv::handle_list_cvs).post(cv::handle_create_cv),
        )
        .route("/api/v1/cvs/validate", post(cv::handle_validate_cv))
        .route(
            "/api/v1/cvs/:id",
            get(cv::handle_get_cv)
                .patch(cv::handle_update_cv)
                .put(cv::handle_replace_cv)
                .delete(cv::handle_delete_cv),
        )
        .route("/api/v1/cvs/:id/duplicate", post(cv::handle_duplicate_cv))
        .route(
            "/api/v1/cvs/:id/share",
            post(cv::handle_share_cv).delete(cv::handle_revoke_share),
        )
        .route("/api/v1/cvs/:id/history", get(cv::handle_cv_history))
        .route(
            "/api/v1/cvs/:id/restore/:version",
            post(cv::handle_restore_version),
        )
        .route(
            "/api/v1/cvs/:id/completeness",
            get(cv::handle_cv_completeness),
        )
        .route("/api/v1/cvs/:id/export", get(cv::handle_export_cv))
        .route("/api/v1/cv-templates", get(cv::handle_list_templates))
        .route(
            "/api/v1/cv-sections/:section/new",
            get(cv::handle_new_entry),
        )
        // Public share links
        .route("/api/v1/shared/:token", get(cv::handle_get_shared))
        // AI
        .route("/api/v1/ai/enhance", post(ai::handle_enhance))
        .route("/api/v1/ai/summary", post(ai::handle_generate_summary))
        .route("/api/v1/ai/ats-score", post(ai::handle_ats_score))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    fn bearer(state: &AppState) -> String {
        let token = state.jwt.issue(Uuid::new_v4(), "ada@example.com").unwrap();
        format!("Bearer {token}")
    }

    async fn send(state: AppState, request: Request<Body>) -> (StatusCode, Value) {
        let response = build_router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn json_request(method: &str, uri: &str, auth: Option<String>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::get("/health").body(Body::empty()).unwrap();
        let (status, body) = send(AppState::for_tests(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "vitae-api");
    }

    #[tokio::test]
    async fn test_cv_routes_require_auth() {
        for (method, uri) in [
            ("GET", "/api/v1/cvs"),
            ("POST", "/api/v1/cvs"),
            ("GET", "/api/v1/me"),
            ("DELETE", "/api/v1/cvs/7b0f1f7e-3c2a-4c7e-9f5e-2d1a8b6c4e3f"),
            ("POST", "/api/v1/ai/enhance"),
        ] {
            let request = Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap();
            let (status, body) = send(AppState::for_tests(), request).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
            assert_eq!(body["error"]["code"], "UNAUTHORIZED");
        }
    }

    #[tokio::test]
    async fn test_malformed_share_token_is_not_found() {
        let request = Request::get("/api/v1/shared/not-a-token")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(AppState::for_tests(), request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_new_entry_for_section() {
        let state = AppState::for_tests();
        let request = Request::get("/api/v1/cv-sections/experience/new")
            .header(header::AUTHORIZATION, bearer(&state))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(state, request).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["id"].as_str().is_some_and(|id| id.parse::<Uuid>().is_ok()));
        assert_eq!(body["highlights"], json!([]));
    }

    #[tokio::test]
    async fn test_new_entry_for_unknown_section() {
        let state = AppState::for_tests();
        let request = Request::get("/api/v1/cv-sections/hobbies/new")
            .header(header::AUTHORIZATION, bearer(&state))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(state, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_validate_reports_field_errors() {
        let state = AppState::for_tests();
        let auth = bearer(&state);
        let request = json_request(
            "POST",
            "/api/v1/cvs/validate",
            Some(auth),
            json!({
                "title": "",
                "data": {
                    "personal": {"email": "not-an-email"},
                    "skills": [{"name": "Rust"}, {"name": "Go"}]
                }
            }),
        );
        let (status, body) = send(state, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], false);
        let fields: Vec<&str> = body["errors"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|e| e["field"].as_str())
            .collect();
        assert!(fields.contains(&"title"));
        assert!(fields.contains(&"personal.email"));
        let skills = body["section_counts"]
            .as_array()
            .unwrap()
            .iter()
            .find(|c| c["section"] == "skills")
            .unwrap();
        assert_eq!(skills["count"], 2);
    }

    #[tokio::test]
    async fn test_enhance_rejects_empty_text_before_spending_quota() {
        let state = AppState::for_tests();
        let auth = bearer(&state);
        let request = json_request(
            "POST",
            "/api/v1/ai/enhance",
            Some(auth),
            json!({"text": "   ", "kind": "bullet"}),
        );
        let (status, _) = send(state, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_cv_with_malformed_data_is_rejected() {
        let state = AppState::for_tests();
        let auth = bearer(&state);
        let request = json_request(
            "POST",
            "/api/v1/cvs",
            Some(auth),
            json!({"title": "Senior CV", "data": {"skills": "Rust, Go"}}),
        );
        let (status, body) = send(state, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_register_rejects_weak_password() {
        let request = json_request(
            "POST",
            "/api/v1/auth/register",
            None,
            json!({"email": "ada@example.com", "password": "short", "name": "Ada"}),
        );
        let (status, body) = send(AppState::for_tests(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["details"][0]["field"], "password");
    }
}
