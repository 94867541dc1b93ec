use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio_tungstenite::tungstenite;

/// Invoke a tool on a running gateway via WebSocket JSON-RPC.
pub async fn run_call(
    tool: String,
    team: String,
    user: String,
    args: String,
    url: String,
    token: Option<String>,
) -> Result<()> {
    let mut arguments: serde_json::Value =
        serde_json::from_str(&args).context("--args must be a JSON object")?;
    let map = arguments
        .as_object_mut()
        .context("--args must be a JSON object")?;
    map.insert("team_id".into(), json!(team));
    map.insert("current_user_id".into(), json!(user));

    // Build WebSocket URL with optional token query param
    let ws_url = if let Some(ref token) = token {
        if url.contains('?') {
            format!("{url}&token={token}")
        } else {
            format!("{url}?token={token}")
        }
    } else {
        url.clone()
    };

    // Build request with optional auth header
    let mut request = tungstenite::http::Request::builder()
        .uri(&ws_url)
        .header("Sec-WebSocket-Version", "13")
        .header(
            "Sec-WebSocket-Key",
            tungstenite::handshake::client::generate_key(),
        )
        .header("Connection", "Upgrade")
        .header("Upgrade", "websocket")
        .header("Host", extract_host(&ws_url).unwrap_or("localhost"));

    if let Some(ref token) = token {
        request = request.header("Authorization", format!("Bearer {token}"));
    }

    let request = request
        .body(())
        .context("Failed to build WebSocket request")?;

    let (mut ws, _response) = tokio_tungstenite::connect_async(request)
        .await
        .context("Failed to connect to gateway WebSocket")?;

    let rpc_request = json!({
        "jsonrpc": "2.0",
        "id": uuid::Uuid::new_v4().to_string(),
        "method": "tools/call",
        "params": {
            "tool": tool,
            "arguments": arguments,
        },
    });

    ws.send(tungstenite::Message::Text(rpc_request.to_string().into()))
        .await
        .context("Failed to send invocation")?;

    // Wait for the response frame
    while let Some(msg) = ws.next().await {
        match msg? {
            tungstenite::Message::Text(text) => {
                let response: serde_json::Value =
                    serde_json::from_str(&text).context("Failed to parse response")?;

                if let Some(error) = response.get("error") {
                    eprintln!(
                        "Error: {}",
                        error
                            .get("message")
                            .and_then(|m| m.as_str())
                            .unwrap_or("Unknown error")
                    );
                    std::process::exit(1);
                }

                if let Some(result) = response.get("result") {
                    println!("{}", serde_json::to_string_pretty(result)?);
                    // Non-zero exit when the invocation itself failed
                    if result.get("success").and_then(|s| s.as_bool()) == Some(false) {
                        let _ = ws.close(None).await;
                        std::process::exit(2);
                    }
                }
                break;
            }
            tungstenite::Message::Close(_) => break,
            _ => {}
        }
    }

    let _ = ws.close(None).await;

    Ok(())
}

/// Extract host from a URL string.
fn extract_host(url: &str) -> Option<&str> {
    let after_scheme = url
        .strip_prefix("ws://")
        .or_else(|| url.strip_prefix("wss://"))?;
    after_scheme.split('/').next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_host() {
        assert_eq!(
            extract_host("ws://127.0.0.1:3000/ws"),
            Some("127.0.0.1:3000")
        );
        assert_eq!(extract_host("wss://example.com/ws"), Some("example.com"));
        assert_eq!(extract_host("http://invalid"), None);
    }
}
