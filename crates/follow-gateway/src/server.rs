use crate::api::{AppendRequest, ErrorBody, HealthResponse, LogResponse};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use follow_core::{FollowResult, SessionRecord};
use follow_drive::{ClientState, StoreClient};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

/// Deadline applied to each logging request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const NOT_INITIALIZED: &str = "Logger not initialized";

/// Shared application state.
pub struct AppState {
    /// `None` when authentication failed at startup.
    pub logger: Option<Arc<StoreClient>>,
    pub request_timeout: Duration,
}

/// The HTTP wrapper around a [`StoreClient`].
pub struct GatewayServer;

impl GatewayServer {
    /// Build the router with the default request deadline.
    pub fn build(logger: Option<Arc<StoreClient>>) -> Router {
        Self::build_with_timeout(logger, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Build the router; every log/append call is cut off after `request_timeout`.
    pub fn build_with_timeout(logger: Option<Arc<StoreClient>>, request_timeout: Duration) -> Router {
        let state = Arc::new(AppState {
            logger,
            request_timeout,
        });

        Router::new()
            .route("/log", post(log_handler))
            .route("/append", post(append_handler))
            .route("/health", get(health_handler))
            .layer(CorsLayer::permissive())
            .with_state(state)
    }
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let client_state = state.logger.as_ref().map(|l| match l.state() {
        ClientState::Authenticated => "authenticated".to_string(),
        ClientState::FolderResolved => "folder_resolved".to_string(),
    });
    Json(HealthResponse {
        status: "ok".to_string(),
        logger_ready: state.logger.is_some(),
        state: client_state,
    })
}

async fn log_handler(
    State(state): State<Arc<AppState>>,
    Json(session): Json<SessionRecord>,
) -> Response {
    let Some(logger) = state.logger.clone() else {
        return failure(NOT_INITIALIZED);
    };

    info!(
        session_id = session.session_id.as_deref().unwrap_or_default(),
        messages = session.messages.len(),
        "Logging session"
    );
    let outcome = with_deadline(state.request_timeout, async move {
        logger.log_session(&session).await
    })
    .await;
    respond(outcome, "Failed to log session")
}

async fn append_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AppendRequest>,
) -> Response {
    let Some(logger) = state.logger.clone() else {
        return failure(NOT_INITIALIZED);
    };

    info!(session_id = %request.session_id, "Appending to session");
    let outcome = with_deadline(state.request_timeout, async move {
        logger
            .append_to_session(&request.session_id, request.message)
            .await
    })
    .await;
    respond(outcome, "Failed to append to session")
}

async fn with_deadline<F>(timeout: Duration, fut: F) -> FollowResult<Option<String>>
where
    F: Future<Output = FollowResult<Option<String>>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(outcome) => outcome,
        Err(_) => {
            warn!(timeout_ms = timeout.as_millis() as u64, "Request deadline exceeded");
            Ok(None)
        }
    }
}

fn respond(outcome: FollowResult<Option<String>>, message: &str) -> Response {
    match outcome {
        Ok(Some(file_id)) => (StatusCode::OK, Json(LogResponse::new(file_id))).into_response(),
        Ok(None) => failure(message),
        Err(e) => {
            error!(error = %e, "{message}");
            failure(message)
        }
    }
}

fn failure(message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody::new(message)),
    )
        .into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use follow_drive::MemoryStore;
    use tower::ServiceExt;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_without_logger() {
        let app = GatewayServer::build(None);
        let resp = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["logger_ready"], false);
        assert!(body.get("state").is_none());
    }

    #[tokio::test]
    async fn test_log_without_logger_is_500() {
        let app = GatewayServer::build(None);
        let resp = app
            .oneshot(post_json("/log", serde_json::json!({"session_id": "x"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(resp).await["error"], "Logger not initialized");
    }

    #[tokio::test]
    async fn test_log_success() {
        let client = StoreClient::new(Arc::new(MemoryStore::new()));
        let app = GatewayServer::build(Some(Arc::new(client)));
        let resp = app
            .oneshot(post_json(
                "/log",
                serde_json::json!({
                    "mode": "qa",
                    "session_id": "abc123",
                    "messages": [{"role": "user", "content": "Hi"}]
                }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["success"], true);
        assert!(body["file_id"].is_string());
    }

    #[tokio::test]
    async fn test_log_accepts_null_role_and_content() {
        let client = StoreClient::new(Arc::new(MemoryStore::new()));
        let app = GatewayServer::build(Some(Arc::new(client)));
        let resp = app
            .oneshot(post_json(
                "/log",
                serde_json::json!({
                    "session_id": "abc123",
                    "messages": [{"role": null, "content": null}]
                }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["success"], true);
    }

    #[tokio::test]
    async fn test_remote_failure_is_500() {
        let store = Arc::new(MemoryStore::new());
        store.fail_writes(true);
        let app = GatewayServer::build(Some(Arc::new(StoreClient::new(store))));
        let resp = app
            .oneshot(post_json("/log", serde_json::json!({"session_id": "abc"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(resp).await["error"], "Failed to log session");
    }
}
