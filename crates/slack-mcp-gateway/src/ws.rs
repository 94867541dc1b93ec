//! WebSocket connection handler.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::StreamExt;
use tracing::{info, warn};

use crate::GatewayState;
use crate::handlers::handle_rpc;
use crate::jsonrpc::{JsonRpcRequest, JsonRpcResponse, PARSE_ERROR};

/// Handle a WebSocket connection: one JSON-RPC request per text
/// frame, one response frame back.
pub async fn handle_ws_connection(mut socket: WebSocket, state: Arc<GatewayState>) {
    info!("WebSocket client connected");

    while let Some(msg) = socket.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                warn!("WebSocket receive error: {e}");
                break;
            }
        };

        match msg {
            Message::Text(text) => {
                let response = process_rpc_message(&text, &state).await;
                let response_json = match serde_json::to_string(&response) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!("Failed to serialize response: {e}");
                        continue;
                    }
                };

                if socket
                    .send(Message::Text(response_json.into()))
                    .await
                    .is_err()
                {
                    break;
                }
            }
            Message::Close(_) => {
                info!("WebSocket client disconnected");
                break;
            }
            Message::Ping(data) => {
                if socket.send(Message::Pong(data)).await.is_err() {
                    break;
                }
            }
            _ => {}
        }
    }

    info!("WebSocket connection closed");
}

async fn process_rpc_message(text: &str, state: &GatewayState) -> JsonRpcResponse {
    let request: JsonRpcRequest = match serde_json::from_str(text) {
        Ok(req) => req,
        Err(e) => {
            return JsonRpcResponse::error(
                serde_json::Value::Null,
                PARSE_ERROR,
                format!("Invalid JSON-RPC request: {e}"),
            );
        }
    };

    handle_rpc(
        &request.method,
        &request.params,
        request.id,
        &state.dispatcher,
    )
    .await
}
