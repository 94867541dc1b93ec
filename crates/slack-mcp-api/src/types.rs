//! Slack Web API wire types.
//!
//! Only the fields the tools surface are typed; everything else rides
//! along untouched in the raw payload the dispatcher returns.

use serde::{Deserialize, Serialize};

/// Pagination metadata returned by cursor-paged endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseMetadata {
    #[serde(default)]
    pub next_cursor: Option<String>,
}

impl ResponseMetadata {
    /// Slack signals "no more pages" with an empty-string cursor.
    pub fn cursor(&self) -> Option<&str> {
        self.next_cursor.as_deref().filter(|c| !c.is_empty())
    }
}

/// A channel or DM as returned by `users.conversations`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_private: Option<bool>,
}

/// One page of `users.conversations` results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationsPage {
    #[serde(default)]
    pub channels: Vec<Conversation>,
    #[serde(default)]
    pub response_metadata: Option<ResponseMetadata>,
}

impl ConversationsPage {
    pub fn next_cursor(&self) -> Option<&str> {
        self.response_metadata.as_ref().and_then(|m| m.cursor())
    }
}

/// A single message in channel history or a thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackMessage {
    pub ts: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub thread_ts: Option<String>,
}

/// One page of `conversations.history` / `conversations.replies`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessagePage {
    #[serde(default)]
    pub messages: Vec<SlackMessage>,
    #[serde(default)]
    pub has_more: Option<bool>,
}

/// Result of `chat.postMessage`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostedMessage {
    /// Channel the message landed in.
    #[serde(default)]
    pub channel: Option<String>,
    /// Message identifier (Slack timestamp).
    pub ts: String,
    #[serde(default)]
    pub message: Option<SlackMessage>,
}

/// A workspace member from `users.list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub real_name: Option<String>,
    #[serde(default)]
    pub is_bot: Option<bool>,
}

/// One page of `users.list`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsersPage {
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub response_metadata: Option<ResponseMetadata>,
}

impl UsersPage {
    pub fn next_cursor(&self) -> Option<&str> {
        self.response_metadata.as_ref().and_then(|m| m.cursor())
    }
}

/// Profile fields from `users.profile.get`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub real_name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status_text: Option<String>,
}

/// Result of `users.profile.get`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub profile: Profile,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversations_page_parse() {
        let json = r#"{
            "channels": [
                {"id": "C123", "name": "general", "is_private": false},
                {"id": "C456", "name": "secret", "is_private": true}
            ],
            "response_metadata": {"next_cursor": "dXNlcjpVMDYxTkZUVDI="}
        }"#;
        let page: ConversationsPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.channels.len(), 2);
        assert_eq!(page.channels[0].id, "C123");
        assert_eq!(page.next_cursor(), Some("dXNlcjpVMDYxTkZUVDI="));
    }

    #[test]
    fn test_empty_cursor_means_done() {
        let json = r#"{"channels": [], "response_metadata": {"next_cursor": ""}}"#;
        let page: ConversationsPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.next_cursor(), None);
    }

    #[test]
    fn test_posted_message_parse() {
        let json = r#"{
            "channel": "C123",
            "ts": "1700000000.000100",
            "message": {"ts": "1700000000.000100", "user": "U1", "text": "hi"}
        }"#;
        let posted: PostedMessage = serde_json::from_str(json).unwrap();
        assert_eq!(posted.ts, "1700000000.000100");
        assert_eq!(posted.channel.as_deref(), Some("C123"));
    }

    #[test]
    fn test_message_page_minimal() {
        let json = r#"{"messages": [{"ts": "1.2"}]}"#;
        let page: MessagePage = serde_json::from_str(json).unwrap();
        assert_eq!(page.messages.len(), 1);
        assert!(page.messages[0].text.is_none());
        assert!(page.has_more.is_none());
    }
}
