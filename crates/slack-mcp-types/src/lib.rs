use serde::{Deserialize, Serialize};
use serde_json::Value;

// ──────────────────── Tenant Types ────────────────────

/// Per-tenant Slack credential, read from the `slack_bots` table.
///
/// Provisioned externally (or via the `credential` CLI commands);
/// the dispatcher only ever reads these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantCredential {
    /// Slack workspace (team) identifier, e.g. "T0123ABCD".
    pub team_id: String,
    /// Bot token for that workspace, e.g. "xoxb-...".
    pub bot_token: String,
}

// ──────────────────── Invocation Types ────────────────────

/// A single inbound tool invocation, as received from the transport.
///
/// Transient: one per request, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Tool name, e.g. "post_message".
    pub tool: String,
    /// Tenant whose credential executes the call.
    pub team_id: String,
    /// End-user on whose behalf the call is made.
    pub user_id: String,
    /// Raw tool-specific arguments; validated by the registry before
    /// anything downstream sees them.
    #[serde(default)]
    pub args: serde_json::Map<String, Value>,
}

/// Normalized outcome of a tool invocation.
///
/// Exactly one of `payload` / `error` is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl ToolResult {
    pub fn ok(payload: Value) -> Self {
        Self {
            success: true,
            payload: Some(payload),
            error: None,
        }
    }

    pub fn err(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            payload: None,
            error: Some(ErrorInfo::new(kind, message)),
        }
    }
}

// ──────────────────── Error Types ────────────────────

/// Classification of invocation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Tool name not registered.
    UnknownTool,
    /// Arguments failed structural validation.
    InvalidArguments,
    /// No credential row for the tenant. Fatal misconfiguration.
    CredentialNotFound,
    /// Acting user is not a member of the target conversation.
    Unauthorized,
    /// Slack rejected the tenant's token.
    AuthenticationError,
    /// Upstream rate limit, retries exhausted.
    RateLimited,
    /// Invocation deadline expired.
    Timeout,
    /// Any other upstream fault.
    UpstreamError,
}

impl ErrorKind {
    /// Whether the caller may reasonably retry the same invocation.
    pub fn retryable(self) -> bool {
        matches!(self, ErrorKind::RateLimited | ErrorKind::Timeout)
    }
}

/// Structured failure detail carried inside a [`ToolResult`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
    pub retryable: bool,
}

impl ErrorInfo {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: kind.retryable(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_invocation_serde() {
        let json_str = r#"{
            "tool": "post_message",
            "team_id": "T123",
            "user_id": "U456",
            "args": {"channel_id": "C789", "text": "hi"}
        }"#;
        let inv: ToolInvocation = serde_json::from_str(json_str).unwrap();
        assert_eq!(inv.tool, "post_message");
        assert_eq!(inv.team_id, "T123");
        assert_eq!(inv.args["channel_id"], "C789");
    }

    #[test]
    fn test_invocation_args_default_empty() {
        let json_str = r#"{"tool": "get_users", "team_id": "T1", "user_id": "U1"}"#;
        let inv: ToolInvocation = serde_json::from_str(json_str).unwrap();
        assert!(inv.args.is_empty());
    }

    #[test]
    fn test_result_ok_shape() {
        let result = ToolResult::ok(json!({"ts": "1700000000.000100"}));
        assert!(result.success);
        assert!(result.payload.is_some());
        assert!(result.error.is_none());

        let json_str = serde_json::to_string(&result).unwrap();
        assert!(!json_str.contains("error"));
    }

    #[test]
    fn test_result_err_shape() {
        let result = ToolResult::err(ErrorKind::Unauthorized, "not a member of C789");
        assert!(!result.success);
        assert!(result.payload.is_none());
        let err = result.error.unwrap();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
        assert!(!err.retryable);
    }

    #[test]
    fn test_error_kind_serde_tags() {
        let json_str = serde_json::to_string(&ErrorKind::CredentialNotFound).unwrap();
        assert_eq!(json_str, "\"credential_not_found\"");
        let parsed: ErrorKind = serde_json::from_str("\"rate_limited\"").unwrap();
        assert_eq!(parsed, ErrorKind::RateLimited);
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(ErrorKind::RateLimited.retryable());
        assert!(ErrorKind::Timeout.retryable());
        assert!(!ErrorKind::Unauthorized.retryable());
        assert!(!ErrorKind::AuthenticationError.retryable());
        assert!(!ErrorKind::CredentialNotFound.retryable());
        assert!(!ErrorKind::UpstreamError.retryable());
    }
}
