//! Per-invocation orchestration.
//!
//! One invocation moves through validate → resolve credential →
//! access guard (conversation-scoped tools only) → execute, strictly
//! in that order, stopping at the first failure. Every exit path
//! produces a well-formed `ToolResult`; nothing escapes as a raw
//! error or panic. The whole sequence runs under one deadline.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tracing::{error, info, warn};

use slack_mcp_api::{ApiError, SlackApi};
use slack_mcp_store::cache::CredentialCache;
use slack_mcp_store::{CredentialStore, StoreError};
use slack_mcp_types::{ErrorKind, TenantCredential, ToolInvocation, ToolResult};

use crate::guard;
use crate::registry::{self, ToolArgs, ValidateError};

/// Tuning knobs for the dispatcher.
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    /// Deadline for one invocation, covering the guard check, the
    /// API call, and any client-side retries.
    pub invocation_timeout: Duration,
    /// TTL for cached tenant credentials.
    pub credential_cache_ttl: Duration,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            invocation_timeout: Duration::from_secs(30),
            credential_cache_ttl: Duration::from_secs(300),
        }
    }
}

/// Drives tool invocations end to end. Collaborators are injected so
/// tests run against fakes.
pub struct Dispatcher {
    store: Arc<dyn CredentialStore>,
    api: Arc<dyn SlackApi>,
    cache: CredentialCache,
    invocation_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        api: Arc<dyn SlackApi>,
        options: DispatchOptions,
    ) -> Self {
        Self {
            store,
            api,
            cache: CredentialCache::new(options.credential_cache_ttl),
            invocation_timeout: options.invocation_timeout,
        }
    }

    /// Execute one invocation. Infallible at the type level: every
    /// failure comes back inside the `ToolResult`.
    pub async fn dispatch(&self, invocation: &ToolInvocation) -> ToolResult {
        info!(
            tool = %invocation.tool,
            team = %invocation.team_id,
            user = %invocation.user_id,
            "dispatching tool invocation"
        );

        match tokio::time::timeout(self.invocation_timeout, self.run(invocation)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(tool = %invocation.tool, team = %invocation.team_id, "invocation timed out");
                ToolResult::err(
                    ErrorKind::Timeout,
                    format!(
                        "invocation exceeded {} s deadline",
                        self.invocation_timeout.as_secs()
                    ),
                )
            }
        }
    }

    async fn run(&self, invocation: &ToolInvocation) -> ToolResult {
        // Validate
        let args = match registry::validate(&invocation.tool, &invocation.args) {
            Ok(args) => args,
            Err(ValidateError::UnknownTool(name)) => {
                return ToolResult::err(ErrorKind::UnknownTool, format!("unknown tool: {name}"));
            }
            Err(err @ ValidateError::InvalidArguments { .. }) => {
                return ToolResult::err(ErrorKind::InvalidArguments, err.to_string());
            }
        };

        // Resolve credential
        let credential = match self.resolve_credential(&invocation.team_id).await {
            Ok(credential) => credential,
            Err(StoreError::NotFound(team)) => {
                // Tenant misconfiguration: loud, operator-visible.
                error!(team, "no Slack credential provisioned for tenant");
                return ToolResult::err(
                    ErrorKind::CredentialNotFound,
                    format!("no credential found for team_id={team}"),
                );
            }
            Err(err) => {
                error!(team = %invocation.team_id, "credential store failure: {err}");
                return ToolResult::err(
                    ErrorKind::UpstreamError,
                    format!("credential store failure: {err}"),
                );
            }
        };

        // Guard, once, for conversation-scoped tools
        if let Some(channel_id) = args.conversation_id() {
            match guard::authorize(
                self.api.as_ref(),
                &credential.bot_token,
                &invocation.user_id,
                channel_id,
            )
            .await
            {
                Ok(true) => {}
                Ok(false) => {
                    return ToolResult::err(
                        ErrorKind::Unauthorized,
                        format!(
                            "user {} is not a member of conversation {channel_id}",
                            invocation.user_id
                        ),
                    );
                }
                Err(err) => return self.api_failure(&invocation.team_id, err),
            }
        }

        // Execute
        match self.execute(&credential, &invocation.user_id, &args).await {
            Ok(payload) => ToolResult::ok(payload),
            Err(err) => self.api_failure(&invocation.team_id, err),
        }
    }

    async fn resolve_credential(&self, team_id: &str) -> Result<TenantCredential, StoreError> {
        if let Some(credential) = self.cache.get(team_id) {
            return Ok(credential);
        }
        let credential = self.store.resolve(team_id).await?;
        self.cache.put(credential.clone());
        Ok(credential)
    }

    async fn execute(
        &self,
        credential: &TenantCredential,
        user_id: &str,
        args: &ToolArgs,
    ) -> slack_mcp_api::Result<Value> {
        let token = &credential.bot_token;
        let api = self.api.as_ref();
        match args {
            ToolArgs::ListChannels { limit, cursor } => {
                let page = api
                    .users_conversations(token, user_id, *limit, cursor.as_deref())
                    .await?;
                Ok(to_payload(&page))
            }
            ToolArgs::GetChannelHistory { channel_id, limit } => {
                let page = api.conversations_history(token, channel_id, *limit).await?;
                Ok(to_payload(&page))
            }
            ToolArgs::PostMessage { channel_id, text } => {
                let posted = api.post_message(token, channel_id, text).await?;
                Ok(to_payload(&posted))
            }
            ToolArgs::ReplyToThread {
                channel_id,
                thread_ts,
                text,
            } => {
                let posted = api.post_reply(token, channel_id, thread_ts, text).await?;
                Ok(to_payload(&posted))
            }
            ToolArgs::AddReaction {
                channel_id,
                timestamp,
                reaction,
            } => {
                api.add_reaction(token, channel_id, timestamp, reaction)
                    .await?;
                Ok(json!({ "ok": true }))
            }
            ToolArgs::GetThreadReplies {
                channel_id,
                thread_ts,
            } => {
                let page = api
                    .conversations_replies(token, channel_id, thread_ts)
                    .await?;
                Ok(to_payload(&page))
            }
            ToolArgs::GetUsers { limit, cursor } => {
                let page = api.users_list(token, *limit, cursor.as_deref()).await?;
                Ok(to_payload(&page))
            }
            ToolArgs::GetUserProfile { user_id } => {
                let profile = api.user_profile(token, user_id).await?;
                Ok(to_payload(&profile))
            }
        }
    }

    /// Fold a Slack API failure into a `ToolResult`, invalidating the
    /// cached credential when the token itself was rejected so
    /// rotation is picked up on the next invocation.
    fn api_failure(&self, team_id: &str, err: ApiError) -> ToolResult {
        match err {
            ApiError::Auth(msg) => {
                warn!(team = team_id, "Slack rejected tenant token: {msg}");
                self.cache.invalidate(team_id);
                ToolResult::err(ErrorKind::AuthenticationError, msg)
            }
            ApiError::RateLimited { retry_after } => ToolResult::err(
                ErrorKind::RateLimited,
                format!("rate limited by Slack; retry after {} s", retry_after.as_secs()),
            ),
            ApiError::Network(msg) => ToolResult::err(
                ErrorKind::UpstreamError,
                format!("network failure after retries: {msg}"),
            ),
            ApiError::Upstream { status, body } => ToolResult::err(
                ErrorKind::UpstreamError,
                format!("Slack API failure (status {status}): {body}"),
            ),
        }
    }
}

fn to_payload<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}
