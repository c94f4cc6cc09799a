//! Router assembly: HTTP endpoints, WebSocket upgrade, quiz bank files, static
//! frontend, CORS, and HTTP tracing.

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
/// - REST-ish session API under `/api/v1/...`
/// - Bank files from `quiz_dir` under `/quizzes` and `/StudyTool/quizzes`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));
    let quiz_dir = state.config.quiz_dir.clone();

    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        // HTTP API
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/banks", get(http::http_get_banks))
        .route("/api/v1/session", post(http::http_open_session))
        .route(
            "/api/v1/session/:id",
            get(http::http_get_session).delete(http::http_close_session),
        )
        .route("/api/v1/session/:id/select", post(http::http_select_quiz))
        .route("/api/v1/session/:id/option", post(http::http_select_option))
        .route("/api/v1/session/:id/submit", post(http::http_submit))
        .route("/api/v1/session/:id/advance", post(http::http_advance))
        .route("/api/v1/session/:id/restart", post(http::http_restart))
        // Bank resources, at both deployment paths the loader tries
        .nest_service("/quizzes", ServeDir::new(&quiz_dir))
        .nest_service("/StudyTool/quizzes", ServeDir::new(&quiz_dir))
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
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use tower::ServiceExt;

    use crate::config::AppConfig;
    use crate::quiz::tests::{bank, question};
    use crate::store::MemoryStore;

    async fn ready_state() -> Arc<AppState> {
        let state = AppState::with_store(AppConfig::default(), Arc::new(MemoryStore::new()));
        state
            .install_banks(vec![
                bank("a", "Chapter 1", vec![question("a1", "2+2?", &["3", "4"], &["4"])]),
                bank("b", "Chapter 2", vec![question("b1", "capital of Italy?", &["Paris", "Rome"], &["Rome"])]),
            ])
            .await;
        Arc::new(state)
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<serde_json::Value>) -> (StatusCode, serde_json::Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                req = req.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let res = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), 1 << 20).await.unwrap();
        let json = if bytes.is_empty() { serde_json::Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, json)
    }

    #[tokio::test]
    async fn health_and_banks() {
        let app = build_router(ready_state().await);
        let (status, body) = call(&app, Method::GET, "/api/v1/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["banksLoaded"], true);
        assert!(body.get("banks_loaded").is_none());

        let (_, body) = call(&app, Method::GET, "/api/v1/banks", None).await;
        let ids: Vec<&str> = body["banks"].as_array().unwrap().iter().map(|b| b["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["comprehensive", "a", "b"]);
    }

    #[tokio::test]
    async fn session_flow_over_http() {
        let app = build_router(ready_state().await);
        let (status, view) = call(&app, Method::POST, "/api/v1/session", None).await;
        assert_eq!(status, StatusCode::OK);
        let sid = view["sessionId"].as_str().unwrap().to_string();
        assert_eq!(view["phase"], "answering");

        let (_, view) = call(&app, Method::POST, &format!("/api/v1/session/{sid}/select"), Some(serde_json::json!({"quizId": "b"}))).await;
        assert_eq!(view["question"]["text"], "Capital of Italy?");

        let (status, _) = call(&app, Method::POST, &format!("/api/v1/session/{sid}/submit"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        call(&app, Method::POST, &format!("/api/v1/session/{sid}/option"), Some(serde_json::json!({"index": 1}))).await;
        let (_, view) = call(&app, Method::POST, &format!("/api/v1/session/{sid}/submit"), None).await;
        assert_eq!(view["score"], 1);
        assert_eq!(view["correctAnswer"], 1);

        let (_, view) = call(&app, Method::POST, &format!("/api/v1/session/{sid}/advance"), None).await;
        assert_eq!(view["phase"], "finished");

        let (_, view) = call(&app, Method::POST, &format!("/api/v1/session/{sid}/restart"), None).await;
        assert_eq!(view["score"], 0);
        assert_eq!(view["phase"], "answering");
    }

    #[tokio::test]
    async fn unknown_quiz_and_session_are_not_found() {
        let app = build_router(ready_state().await);
        let (_, view) = call(&app, Method::POST, "/api/v1/session", Some(serde_json::json!({}))).await;
        let sid = view["sessionId"].as_str().unwrap().to_string();

        let (status, body) = call(&app, Method::POST, &format!("/api/v1/session/{sid}/select"), Some(serde_json::json!({"quizId": "nope"}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("nope"));

        let (status, _) = call(&app, Method::GET, "/api/v1/session/missing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&app, Method::DELETE, &format!("/api/v1/session/{sid}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&app, Method::POST, &format!("/api/v1/session/{sid}/restart"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn sessions_report_unavailable_while_loading() {
        let state = Arc::new(AppState::with_store(AppConfig::default(), Arc::new(MemoryStore::new())));
        let app = build_router(state);
        let (_, view) = call(&app, Method::POST, "/api/v1/session", None).await;
        assert_eq!(view["phase"], "loading");
        let sid = view["sessionId"].as_str().unwrap().to_string();
        let (status, _) = call(&app, Method::POST, &format!("/api/v1/session/{sid}/restart"), None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
