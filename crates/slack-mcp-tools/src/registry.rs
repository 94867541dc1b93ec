//! Tool declarations and structural argument validation.
//!
//! Validation checks presence and primitive types only; it never
//! checks that a channel or user actually exists. Each tool's
//! arguments come out as one `ToolArgs` variant, so the guard and
//! the executor work on typed data.

use serde_json::{Map, Value, json};

/// Default page size for channel and user listings.
const DEFAULT_LIST_LIMIT: u32 = 100;
/// Default message count for channel history.
const DEFAULT_HISTORY_LIMIT: u32 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ValidateError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("invalid argument '{field}': {reason}")]
    InvalidArguments { field: String, reason: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ValidateError {
    ValidateError::InvalidArguments {
        field: field.to_string(),
        reason: reason.into(),
    }
}

/// Declaration of one tool: name, human description, and the
/// JSON-Schema fragment advertised over `tools/list`.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    /// Whether invocations must pass the conversation access guard.
    pub conversation_scoped: bool,
    pub schema: Value,
}

/// Validated, typed tool arguments. Constructed only by [`validate`].
#[derive(Debug, Clone, PartialEq)]
pub enum ToolArgs {
    ListChannels {
        limit: u32,
        cursor: Option<String>,
    },
    GetChannelHistory {
        channel_id: String,
        limit: u32,
    },
    PostMessage {
        channel_id: String,
        text: String,
    },
    ReplyToThread {
        channel_id: String,
        thread_ts: String,
        text: String,
    },
    AddReaction {
        channel_id: String,
        timestamp: String,
        reaction: String,
    },
    GetThreadReplies {
        channel_id: String,
        thread_ts: String,
    },
    GetUsers {
        limit: u32,
        cursor: Option<String>,
    },
    GetUserProfile {
        user_id: String,
    },
}

impl ToolArgs {
    /// The channel the access guard must check, if any. Thread tools
    /// are authorized against the channel that carries the thread.
    pub fn conversation_id(&self) -> Option<&str> {
        match self {
            ToolArgs::GetChannelHistory { channel_id, .. }
            | ToolArgs::PostMessage { channel_id, .. }
            | ToolArgs::ReplyToThread { channel_id, .. }
            | ToolArgs::AddReaction { channel_id, .. }
            | ToolArgs::GetThreadReplies { channel_id, .. } => Some(channel_id),
            ToolArgs::ListChannels { .. }
            | ToolArgs::GetUsers { .. }
            | ToolArgs::GetUserProfile { .. } => None,
        }
    }

    pub fn tool_name(&self) -> &'static str {
        match self {
            ToolArgs::ListChannels { .. } => "list_channels",
            ToolArgs::GetChannelHistory { .. } => "get_channel_history",
            ToolArgs::PostMessage { .. } => "post_message",
            ToolArgs::ReplyToThread { .. } => "reply_to_thread",
            ToolArgs::AddReaction { .. } => "add_reaction",
            ToolArgs::GetThreadReplies { .. } => "get_thread_replies",
            ToolArgs::GetUsers { .. } => "get_users",
            ToolArgs::GetUserProfile { .. } => "get_user_profile",
        }
    }
}

/// Validate raw arguments for `tool`, producing typed [`ToolArgs`].
pub fn validate(tool: &str, args: &Map<String, Value>) -> Result<ToolArgs, ValidateError> {
    match tool {
        "list_channels" => Ok(ToolArgs::ListChannels {
            limit: optional_u32(args, "limit", DEFAULT_LIST_LIMIT)?,
            cursor: optional_str(args, "cursor")?,
        }),
        "get_channel_history" => Ok(ToolArgs::GetChannelHistory {
            channel_id: require_str(args, "channel_id")?,
            limit: optional_u32(args, "limit", DEFAULT_HISTORY_LIMIT)?,
        }),
        "post_message" => Ok(ToolArgs::PostMessage {
            channel_id: require_str(args, "channel_id")?,
            text: require_str(args, "text")?,
        }),
        "reply_to_thread" => Ok(ToolArgs::ReplyToThread {
            channel_id: require_str(args, "channel_id")?,
            thread_ts: require_str(args, "thread_ts")?,
            text: require_str(args, "text")?,
        }),
        "add_reaction" => Ok(ToolArgs::AddReaction {
            channel_id: require_str(args, "channel_id")?,
            timestamp: require_str(args, "timestamp")?,
            reaction: require_str(args, "reaction")?,
        }),
        "get_thread_replies" => Ok(ToolArgs::GetThreadReplies {
            channel_id: require_str(args, "channel_id")?,
            thread_ts: require_str(args, "thread_ts")?,
        }),
        "get_users" => Ok(ToolArgs::GetUsers {
            limit: optional_u32(args, "limit", DEFAULT_LIST_LIMIT)?,
            cursor: optional_str(args, "cursor")?,
        }),
        "get_user_profile" => Ok(ToolArgs::GetUserProfile {
            user_id: require_str(args, "user_id")?,
        }),
        other => Err(ValidateError::UnknownTool(other.to_string())),
    }
}

fn require_str(args: &Map<String, Value>, field: &str) -> Result<String, ValidateError> {
    match args.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::String(_)) => Err(invalid(field, "must not be empty")),
        Some(_) => Err(invalid(field, "expected a string")),
        None => Err(invalid(field, "missing required field")),
    }
}

fn optional_str(args: &Map<String, Value>, field: &str) -> Result<Option<String>, ValidateError> {
    match args.get(field) {
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(invalid(field, "expected a string")),
    }
}

fn optional_u32(
    args: &Map<String, Value>,
    field: &str,
    default: u32,
) -> Result<u32, ValidateError> {
    match args.get(field) {
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| invalid(field, "expected a non-negative integer")),
        Some(Value::Null) | None => Ok(default),
        Some(_) => Err(invalid(field, "expected an integer")),
    }
}

/// All registered tools, in the order advertised to clients.
pub fn tool_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "list_channels",
            description: "List channels the acting user can see in the workspace.",
            conversation_scoped: false,
            schema: json!({
                "type": "object",
                "properties": {
                    "limit": {"type": "integer", "description": "Max channels per page (capped at 200)."},
                    "cursor": {"type": "string", "description": "Pagination cursor from a previous page."}
                },
                "required": []
            }),
        },
        ToolSpec {
            name: "get_channel_history",
            description: "Get recent messages from a channel.",
            conversation_scoped: true,
            schema: json!({
                "type": "object",
                "properties": {
                    "channel_id": {"type": "string", "description": "Channel to read."},
                    "limit": {"type": "integer", "description": "Number of messages (default 10)."}
                },
                "required": ["channel_id"]
            }),
        },
        ToolSpec {
            name: "post_message",
            description: "Post a message to a channel.",
            conversation_scoped: true,
            schema: json!({
                "type": "object",
                "properties": {
                    "channel_id": {"type": "string", "description": "Channel to post to."},
                    "text": {"type": "string", "description": "Message text."}
                },
                "required": ["channel_id", "text"]
            }),
        },
        ToolSpec {
            name: "reply_to_thread",
            description: "Reply to a message thread.",
            conversation_scoped: true,
            schema: json!({
                "type": "object",
                "properties": {
                    "channel_id": {"type": "string", "description": "Channel carrying the thread."},
                    "thread_ts": {"type": "string", "description": "Timestamp of the thread root."},
                    "text": {"type": "string", "description": "Reply text."}
                },
                "required": ["channel_id", "thread_ts", "text"]
            }),
        },
        ToolSpec {
            name: "add_reaction",
            description: "Add an emoji reaction to a message.",
            conversation_scoped: true,
            schema: json!({
                "type": "object",
                "properties": {
                    "channel_id": {"type": "string", "description": "Channel containing the message."},
                    "timestamp": {"type": "string", "description": "Timestamp of the message."},
                    "reaction": {"type": "string", "description": "Emoji name without colons."}
                },
                "required": ["channel_id", "timestamp", "reaction"]
            }),
        },
        ToolSpec {
            name: "get_thread_replies",
            description: "Get all replies in a message thread.",
            conversation_scoped: true,
            schema: json!({
                "type": "object",
                "properties": {
                    "channel_id": {"type": "string", "description": "Channel carrying the thread."},
                    "thread_ts": {"type": "string", "description": "Timestamp of the thread root."}
                },
                "required": ["channel_id", "thread_ts"]
            }),
        },
        ToolSpec {
            name: "get_users",
            description: "List users in the workspace.",
            conversation_scoped: false,
            schema: json!({
                "type": "object",
                "properties": {
                    "limit": {"type": "integer", "description": "Max users per page (capped at 200)."},
                    "cursor": {"type": "string", "description": "Pagination cursor from a previous page."}
                },
                "required": []
            }),
        },
        ToolSpec {
            name: "get_user_profile",
            description: "Get profile details for a user.",
            conversation_scoped: false,
            schema: json!({
                "type": "object",
                "properties": {
                    "user_id": {"type": "string", "description": "User to look up."}
                },
                "required": ["user_id"]
            }),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(json: Value) -> Map<String, Value> {
        json.as_object().unwrap().clone()
    }

    #[test]
    fn test_unknown_tool() {
        let err = validate("delete_workspace", &Map::new()).unwrap_err();
        assert!(matches!(err, ValidateError::UnknownTool(name) if name == "delete_workspace"));
    }

    #[test]
    fn test_post_message_valid() {
        let parsed = validate(
            "post_message",
            &args(json!({"channel_id": "C123", "text": "hi"})),
        )
        .unwrap();
        assert_eq!(
            parsed,
            ToolArgs::PostMessage {
                channel_id: "C123".into(),
                text: "hi".into()
            }
        );
        assert_eq!(parsed.conversation_id(), Some("C123"));
    }

    #[test]
    fn test_missing_required_field() {
        let err = validate("get_channel_history", &Map::new()).unwrap_err();
        match err {
            ValidateError::InvalidArguments { field, .. } => assert_eq!(field, "channel_id"),
            other => panic!("expected InvalidArguments, got {other:?}"),
        }
    }

    #[test]
    fn test_mistyped_field() {
        let err = validate(
            "post_message",
            &args(json!({"channel_id": 42, "text": "hi"})),
        )
        .unwrap_err();
        match err {
            ValidateError::InvalidArguments { field, reason } => {
                assert_eq!(field, "channel_id");
                assert!(reason.contains("string"));
            }
            other => panic!("expected InvalidArguments, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_required_string_rejected() {
        let err = validate(
            "post_message",
            &args(json!({"channel_id": "", "text": "hi"})),
        )
        .unwrap_err();
        assert!(matches!(err, ValidateError::InvalidArguments { .. }));
    }

    #[test]
    fn test_limit_defaults() {
        let parsed = validate("list_channels", &Map::new()).unwrap();
        assert_eq!(
            parsed,
            ToolArgs::ListChannels {
                limit: 100,
                cursor: None
            }
        );

        let parsed = validate(
            "get_channel_history",
            &args(json!({"channel_id": "C1"})),
        )
        .unwrap();
        assert_eq!(
            parsed,
            ToolArgs::GetChannelHistory {
                channel_id: "C1".into(),
                limit: 10
            }
        );
    }

    #[test]
    fn test_limit_wrong_type() {
        let err = validate("get_users", &args(json!({"limit": "ten"}))).unwrap_err();
        assert!(matches!(err, ValidateError::InvalidArguments { field, .. } if field == "limit"));
    }

    #[test]
    fn test_negative_limit_rejected() {
        let err = validate("get_users", &args(json!({"limit": -1}))).unwrap_err();
        assert!(matches!(err, ValidateError::InvalidArguments { .. }));
    }

    #[test]
    fn test_thread_tools_scoped_to_channel() {
        let parsed = validate(
            "reply_to_thread",
            &args(json!({"channel_id": "C9", "thread_ts": "1.2", "text": "ok"})),
        )
        .unwrap();
        assert_eq!(parsed.conversation_id(), Some("C9"));

        let parsed = validate(
            "get_thread_replies",
            &args(json!({"channel_id": "C9", "thread_ts": "1.2"})),
        )
        .unwrap();
        assert_eq!(parsed.conversation_id(), Some("C9"));
    }

    #[test]
    fn test_unscoped_tools_have_no_conversation() {
        let parsed = validate("get_users", &Map::new()).unwrap();
        assert_eq!(parsed.conversation_id(), None);
        let parsed = validate("get_user_profile", &args(json!({"user_id": "U1"}))).unwrap();
        assert_eq!(parsed.conversation_id(), None);
    }

    #[test]
    fn test_specs_cover_every_tool() {
        let specs = tool_specs();
        assert_eq!(specs.len(), 8);
        for spec in &specs {
            // Every advertised tool validates an empty or minimal argument
            // set to either Ok or InvalidArguments, never UnknownTool.
            let result = validate(spec.name, &Map::new());
            assert!(
                !matches!(result, Err(ValidateError::UnknownTool(_))),
                "spec {} not wired into validate()",
                spec.name
            );
        }
    }

    #[test]
    fn test_scoped_flags_match_validation() {
        for spec in tool_specs() {
            let minimal = args(json!({
                "channel_id": "C1",
                "thread_ts": "1.2",
                "text": "x",
                "timestamp": "1.2",
                "reaction": "thumbsup",
                "user_id": "U1"
            }));
            let parsed = validate(spec.name, &minimal).unwrap();
            assert_eq!(
                parsed.conversation_id().is_some(),
                spec.conversation_scoped,
                "scoping mismatch for {}",
                spec.name
            );
            assert_eq!(parsed.tool_name(), spec.name);
        }
    }
}
