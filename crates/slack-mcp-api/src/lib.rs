//! slack-mcp-api: Slack Web API HTTP client.
//!
//! One operation per endpoint, each taking the tenant's resolved bot
//! token. The client decodes Slack's 200-with-`ok:false` envelope,
//! honors `Retry-After` on 429s, and retries network failures with
//! exponential backoff, bounded in both cases.

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;

use crate::types::{
    ConversationsPage, MessagePage, PostedMessage, UserProfile, UsersPage,
};

pub use client::SlackClient;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Slack rejected the token (HTTP 401/403 or an auth-class
    /// `ok:false` code). Not the same thing as the access guard's
    /// "user is not a member" outcome.
    #[error("Slack rejected token: {0}")]
    Auth(String),
    /// HTTP 429 or `ratelimited`; carries the server-supplied delay.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },
    /// Any other upstream fault; body kept for diagnostics.
    #[error("Slack API error (status {status}): {body}")]
    Upstream { status: u16, body: String },
    /// Connection reset, DNS failure, request timeout.
    #[error("network error: {0}")]
    Network(String),
}

impl ApiError {
    /// Whether the client's own retry loop may try again.
    pub fn retryable(&self) -> bool {
        matches!(self, ApiError::RateLimited { .. } | ApiError::Network(_))
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// The Slack Web API operations the dispatcher needs.
///
/// A trait so dispatcher tests can substitute a fake that records
/// calls instead of reaching the network.
#[async_trait]
pub trait SlackApi: Send + Sync {
    /// `users.conversations` — channels visible to one user. This is
    /// the single listing operation shared by the `list_channels`
    /// tool and the access guard.
    async fn users_conversations(
        &self,
        token: &str,
        user_id: &str,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<ConversationsPage>;

    /// `conversations.history` — recent messages in a channel.
    async fn conversations_history(
        &self,
        token: &str,
        channel_id: &str,
        limit: u32,
    ) -> Result<MessagePage>;

    /// `conversations.replies` — messages in a thread.
    async fn conversations_replies(
        &self,
        token: &str,
        channel_id: &str,
        thread_ts: &str,
    ) -> Result<MessagePage>;

    /// `chat.postMessage` — post to a channel.
    async fn post_message(&self, token: &str, channel_id: &str, text: &str)
    -> Result<PostedMessage>;

    /// `chat.postMessage` with `thread_ts` — reply in a thread.
    async fn post_reply(
        &self,
        token: &str,
        channel_id: &str,
        thread_ts: &str,
        text: &str,
    ) -> Result<PostedMessage>;

    /// `reactions.add` — add an emoji reaction to a message.
    async fn add_reaction(
        &self,
        token: &str,
        channel_id: &str,
        timestamp: &str,
        name: &str,
    ) -> Result<()>;

    /// `users.list` — members of the workspace.
    async fn users_list(&self, token: &str, limit: u32, cursor: Option<&str>)
    -> Result<UsersPage>;

    /// `users.profile.get` — one user's profile.
    async fn user_profile(&self, token: &str, user_id: &str) -> Result<UserProfile>;
}
