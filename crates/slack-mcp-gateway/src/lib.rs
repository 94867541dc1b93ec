//! slack-mcp-gateway: HTTP + WebSocket front door for the tool
//! dispatcher.
//!
//! Provides:
//! - `GET /health` — liveness check
//! - `POST /tools/call` — one tool invocation, HTTP status mapped
//!   from the result's error kind
//! - `GET /ws` — JSON-RPC 2.0 (`health`, `tools/list`, `tools/call`)
//! - Optional bearer token authentication

pub mod handlers;
pub mod jsonrpc;
pub mod ws;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use slack_mcp_api::SlackClient;
use slack_mcp_config::SlackMcpConfig;
use slack_mcp_store::SqliteCredentialStore;
use slack_mcp_tools::{DispatchOptions, Dispatcher};
use slack_mcp_types::{ErrorKind, ToolResult};

/// Shared gateway state.
pub struct GatewayState {
    pub dispatcher: Arc<Dispatcher>,
    pub auth_token: Option<String>,
}

/// Start the gateway server.
///
/// This is the main entry point: it opens the credential store,
/// builds the Slack client and dispatcher, creates the axum router,
/// and serves requests until the process exits.
pub async fn start_gateway(
    config: SlackMcpConfig,
    port_override: Option<u16>,
) -> anyhow::Result<()> {
    let port = config.resolve_port(port_override);
    let host = config.gateway.host.clone();
    let auth_token = config.gateway.auth_token.clone();

    let db_path = config.resolve_database_path()?;
    let store = Arc::new(SqliteCredentialStore::open(&db_path)?);

    let client = Arc::new(SlackClient::new(
        &config.slack.base_url,
        config.slack.max_retries,
        Duration::from_secs(config.slack.request_timeout_secs),
    ));

    let dispatcher = Arc::new(Dispatcher::new(
        store,
        client,
        DispatchOptions {
            invocation_timeout: Duration::from_secs(config.dispatch.invocation_timeout_secs),
            credential_cache_ttl: Duration::from_secs(config.dispatch.credential_cache_ttl_secs),
        },
    ));

    let state = Arc::new(GatewayState {
        dispatcher,
        auth_token,
    });

    let app = router(state);

    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    info!("Gateway listening on {addr}");
    info!("  Tool calls: http://{addr}/tools/call");
    info!("  WebSocket:  ws://{addr}/ws");
    info!("  Health:     http://{addr}/health");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the axum router. Separate from `start_gateway` so tests can
/// drive it without binding a socket.
pub fn router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/tools/call", post(tools_call_handler))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

/// GET /health — simple HTTP health check.
async fn health_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Request body for POST /tools/call.
#[derive(Debug, Deserialize)]
struct CallRequest {
    tool: String,
    #[serde(default)]
    arguments: Value,
}

/// POST /tools/call — dispatch one tool invocation over plain HTTP.
async fn tools_call_handler(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    axum::Json(body): axum::Json<CallRequest>,
) -> Response {
    if !authenticated(&state, &headers, None) {
        return unauthorized();
    }

    let invocation = match handlers::build_invocation(&body.tool, &body.arguments) {
        Ok(inv) => inv,
        Err(msg) => {
            return (
                StatusCode::BAD_REQUEST,
                axum::Json(ToolResult::err(ErrorKind::InvalidArguments, msg)),
            )
                .into_response();
        }
    };

    let result = state.dispatcher.dispatch(&invocation).await;
    (status_for(&result), axum::Json(result)).into_response()
}

/// Transport-level auth failure. Not a `ToolResult`:
/// `authentication_error` means the upstream rejected a tenant token,
/// which this is not.
fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        axum::Json(serde_json::json!({ "error": "missing or invalid bearer token" })),
    )
        .into_response()
}

/// Map a normalized result to an HTTP status.
fn status_for(result: &ToolResult) -> StatusCode {
    let Some(error) = &result.error else {
        return StatusCode::OK;
    };
    match error.kind {
        ErrorKind::UnknownTool | ErrorKind::InvalidArguments => StatusCode::BAD_REQUEST,
        ErrorKind::Unauthorized => StatusCode::FORBIDDEN,
        // Tenant misconfiguration: server-side fault, never silent.
        ErrorKind::CredentialNotFound => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::AuthenticationError | ErrorKind::UpstreamError => StatusCode::BAD_GATEWAY,
    }
}

/// Query parameters for WebSocket connection (alternative auth).
#[derive(Deserialize, Default)]
struct WsQuery {
    token: Option<String>,
}

/// GET /ws — WebSocket upgrade with optional bearer token authentication.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Query(query): Query<WsQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    if !authenticated(&state, &headers, query.token.as_deref()) {
        tracing::warn!("WebSocket authentication failed");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let state = state.clone();
    Ok(ws.on_upgrade(move |socket| ws::handle_ws_connection(socket, state)))
}

/// Check the configured bearer token, if any, against the
/// Authorization header or a fallback query token.
fn authenticated(state: &GatewayState, headers: &HeaderMap, query_token: Option<&str>) -> bool {
    let Some(expected) = &state.auth_token else {
        return true;
    };
    let provided = extract_bearer_token(headers).or(query_token);
    provided == Some(expected.as_str())
}

/// Extract bearer token from Authorization header.
fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer my-secret-token".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers), Some("my-secret-token"));
    }

    #[test]
    fn test_extract_bearer_token_missing() {
        let headers = HeaderMap::new();
        assert_eq!(extract_bearer_token(&headers), None);
    }

    #[test]
    fn test_extract_bearer_token_wrong_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Basic abc123".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers), None);
    }

    #[tokio::test]
    async fn test_transport_auth_failure_is_not_a_tool_result() {
        let resp = unauthorized();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        // A plain message, not an error envelope with a kind.
        assert!(body["error"].is_string());
        assert!(body.get("kind").is_none());
        assert!(body.get("success").is_none());
    }

    #[test]
    fn test_status_mapping() {
        let ok = ToolResult::ok(serde_json::json!({}));
        assert_eq!(status_for(&ok), StatusCode::OK);

        let cases = [
            (ErrorKind::UnknownTool, StatusCode::BAD_REQUEST),
            (ErrorKind::InvalidArguments, StatusCode::BAD_REQUEST),
            (ErrorKind::Unauthorized, StatusCode::FORBIDDEN),
            (
                ErrorKind::CredentialNotFound,
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (ErrorKind::RateLimited, StatusCode::TOO_MANY_REQUESTS),
            (ErrorKind::Timeout, StatusCode::GATEWAY_TIMEOUT),
            (ErrorKind::AuthenticationError, StatusCode::BAD_GATEWAY),
            (ErrorKind::UpstreamError, StatusCode::BAD_GATEWAY),
        ];
        for (kind, status) in cases {
            let result = ToolResult::err(kind, "test");
            assert_eq!(status_for(&result), status, "{kind:?}");
        }
    }
}
