//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws`
/// - REST-ish API under `/api/v1/...`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers); adjust for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    // Static files with SPA fallback
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        // HTTP API
        .route("/api/v1/health", get(http::http_health))
        .route(
            "/api/v1/activities",
            get(http::http_list_activities).post(http::http_create_activity),
        )
        .route(
            "/api/v1/activities/:id",
            get(http::http_get_activity)
                .put(http::http_update_activity)
                .delete(http::http_delete_activity),
        )
        .route("/api/v1/activities/:id/attempt", get(http::http_get_attempt))
        .route("/api/v1/activities/:id/questions", post(http::http_post_question))
        .route("/api/v1/activities/:id/grades", get(http::http_get_grades))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::AppConfig;

    fn app() -> Router {
        build_router(Arc::new(AppState::from_config(AppConfig::default(), None)))
    }

    async fn call(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .expect("request");
        let res = router.clone().oneshot(req).await.expect("response");
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.expect("body");
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).expect("json") };
        (status, value)
    }

    #[tokio::test]
    async fn activities_are_listed_without_secrets() {
        let router = app();
        let (status, body) = call(&router, "GET", "/api/v1/activities", None).await;
        assert_eq!(status, StatusCode::OK);
        let list = body.as_array().expect("array");
        assert_eq!(list.len(), 2);
        assert!(list.iter().all(|a| a.get("secret").is_none()));
        assert_eq!(list[0]["maxQuestions"], 5);
    }

    #[tokio::test]
    async fn direct_win_then_finished() {
        let router = app();
        let (status, body) = call(
            &router,
            "POST",
            "/api/v1/activities/fruit/questions",
            Some(json!({ "userId": "u1", "question": "Banana" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["verdict"], "answered");
        assert_eq!(body["directMatch"], "exact");
        assert_eq!(body["response"], "Yes you have guessed the secret");
        assert_eq!(body["attempt"]["status"], "win");
        assert_eq!(body["attempt"]["score"], 100);
        assert_eq!(body["attempt"]["history"][0]["question"], "Banana");

        let (status, body) = call(
            &router,
            "POST",
            "/api/v1/activities/fruit/questions",
            Some(json!({ "userId": "u1", "question": "Is it red?" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["verdict"], "finished");
        assert_eq!(body["attempt"]["questionCount"], 1);

        let (_, grades) = call(&router, "GET", "/api/v1/activities/fruit/grades", None).await;
        assert_eq!(grades[0]["userId"], "u1");
        assert_eq!(grades[0]["score"], 100);

        let (_, attempt) = call(&router, "GET", "/api/v1/activities/fruit/attempt?userId=u1", None).await;
        assert_eq!(attempt["gameFinished"], true);
        assert_eq!(attempt["remaining"], 19);
    }

    #[tokio::test]
    async fn oracle_unavailable_reports_bad_gateway_and_keeps_state() {
        let router = app();
        let (status, body) = call(
            &router,
            "POST",
            "/api/v1/activities/animal/questions",
            Some(json!({ "userId": "u2", "question": "Is it grey?" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["verdict"], "oracle_failed");
        assert_eq!(body["attempt"]["questionCount"], 0);
        assert_eq!(body["attempt"]["status"], "active");
    }

    #[tokio::test]
    async fn activity_lifecycle() {
        let router = app();
        let (status, created) = call(
            &router,
            "POST",
            "/api/v1/activities",
            Some(json!({ "id": "colours", "name": "Colours", "secret": "teal", "maxQuestions": 3 })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["maxQuestions"], 3);
        assert_eq!(created["maxGrade"], 100);

        let (status, _) = call(
            &router,
            "POST",
            "/api/v1/activities",
            Some(json!({ "name": "Broken", "secret": "" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, updated) = call(
            &router,
            "PUT",
            "/api/v1/activities/colours",
            Some(json!({ "name": "Colours 2", "secret": "teal", "maxGrade": 10 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["maxGrade"], 10);

        let (status, _) = call(&router, "DELETE", "/api/v1/activities/colours", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&router, "GET", "/api/v1/activities/colours", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(
            &router,
            "POST",
            "/api/v1/activities/colours/questions",
            Some(json!({ "userId": "u1", "question": "teal" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
