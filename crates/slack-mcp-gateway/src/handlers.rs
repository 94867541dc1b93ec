//! JSON-RPC method handlers.

use serde_json::{Value, json};

use slack_mcp_tools::{Dispatcher, registry};
use slack_mcp_types::ToolInvocation;

use crate::jsonrpc::{INVALID_PARAMS, JsonRpcResponse, METHOD_NOT_FOUND};

/// Route a JSON-RPC request to the appropriate handler.
pub async fn handle_rpc(
    method: &str,
    params: &Value,
    id: Value,
    dispatcher: &Dispatcher,
) -> JsonRpcResponse {
    match method {
        "health" => handle_health(id),
        "tools/list" => handle_tools_list(id),
        "tools/call" => handle_tools_call(params, id, dispatcher).await,
        _ => JsonRpcResponse::error(id, METHOD_NOT_FOUND, format!("Method not found: {method}")),
    }
}

/// health — returns system status.
fn handle_health(id: Value) -> JsonRpcResponse {
    JsonRpcResponse::success(
        id,
        json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
        }),
    )
}

/// tools/list — advertise the registered tools and their schemas.
fn handle_tools_list(id: Value) -> JsonRpcResponse {
    let tools: Vec<Value> = registry::tool_specs()
        .into_iter()
        .map(|spec| {
            json!({
                "name": spec.name,
                "description": spec.description,
                "inputSchema": spec.schema,
                "conversationScoped": spec.conversation_scoped,
            })
        })
        .collect();
    JsonRpcResponse::success(id, json!({ "tools": tools }))
}

/// tools/call — dispatch one tool invocation.
///
/// Params:
///   - tool: string (required)
///   - arguments: object carrying team_id, current_user_id, and the
///     tool-specific fields
async fn handle_tools_call(params: &Value, id: Value, dispatcher: &Dispatcher) -> JsonRpcResponse {
    let tool = match params.get("tool").and_then(|v| v.as_str()) {
        Some(t) => t,
        None => return JsonRpcResponse::error(id, INVALID_PARAMS, "Missing 'tool' parameter"),
    };
    let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

    let invocation = match build_invocation(tool, &arguments) {
        Ok(inv) => inv,
        Err(msg) => return JsonRpcResponse::error(id, INVALID_PARAMS, msg),
    };

    let result = dispatcher.dispatch(&invocation).await;
    match serde_json::to_value(&result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::error(
            id,
            crate::jsonrpc::INTERNAL_ERROR,
            format!("Failed to serialize result: {e}"),
        ),
    }
}

/// Lift the transport's argument bundle into a `ToolInvocation`.
///
/// `team_id` and `current_user_id` ride inside `arguments` on the
/// wire; they are pulled out here so the dispatcher sees only the
/// tool-specific fields.
pub fn build_invocation(tool: &str, arguments: &Value) -> Result<ToolInvocation, String> {
    let mut args = match arguments.as_object() {
        Some(map) => map.clone(),
        None => return Err("'arguments' must be an object".to_string()),
    };

    let team_id = match args.remove("team_id") {
        Some(Value::String(s)) if !s.is_empty() => s,
        _ => return Err("Missing 'team_id' in arguments".to_string()),
    };
    let user_id = match args.remove("current_user_id") {
        Some(Value::String(s)) if !s.is_empty() => s,
        _ => return Err("Missing 'current_user_id' in arguments".to_string()),
    };

    Ok(ToolInvocation {
        tool: tool.to_string(),
        team_id,
        user_id,
        args,
    })
}
