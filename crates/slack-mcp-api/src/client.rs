//! reqwest implementation of the Slack Web API operations.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::warn;

use crate::types::{
    ConversationsPage, MessagePage, PostedMessage, UserProfile, UsersPage,
};
use crate::{ApiError, Result, SlackApi};

/// Slack caps page sizes at 200 for the paged endpoints.
pub const MAX_PAGE_LIMIT: u32 = 200;

const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(10);

/// HTTP client for the Slack Web API.
///
/// Holds no token; every call takes the tenant's resolved bot token,
/// so one client serves all tenants over one connection pool.
pub struct SlackClient {
    client: Client,
    base_url: String,
    max_retries: u32,
}

impl SlackClient {
    /// Create a new client. `base_url` is normally
    /// `https://slack.com/api`; tests point it at a fake.
    pub fn new(base_url: impl Into<String>, max_retries: u32, request_timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .expect("failed to build reqwest client");
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_retries,
        }
    }

    async fn get(&self, token: &str, endpoint: &str, query: &[(&'static str, String)])
    -> Result<Value> {
        with_retries(self.max_retries, endpoint, || {
            self.send_once(token, endpoint, Some(query), None)
        })
        .await
    }

    async fn post(&self, token: &str, endpoint: &str, body: &Value) -> Result<Value> {
        with_retries(self.max_retries, endpoint, || {
            self.send_once(token, endpoint, None, Some(body))
        })
        .await
    }

    /// One HTTP round trip, classified but not retried.
    async fn send_once(
        &self,
        token: &str,
        endpoint: &str,
        query: Option<&[(&'static str, String)]>,
        body: Option<&Value>,
    ) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let mut req = match body {
            Some(json) => self.client.post(&url).json(json),
            None => self.client.get(&url),
        };
        if let Some(query) = query {
            req = req.query(query);
        }

        let resp = req
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = resp.status().as_u16();
        if status == 429 {
            let retry_after = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_RETRY_AFTER);
            return Err(ApiError::RateLimited { retry_after });
        }
        if status == 401 || status == 403 {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Auth(format!("HTTP {status}: {body}")));
        }
        if !(200..300).contains(&status) {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Upstream { status, body });
        }

        let value: Value = resp
            .json()
            .await
            .map_err(|e| ApiError::Network(format!("response decode failed: {e}")))?;
        check_envelope(&value)?;
        Ok(value)
    }
}

/// Decode a Slack `ok`/`error` envelope. Slack reports most failures
/// as HTTP 200 with `ok:false`, so this runs on every success status.
fn check_envelope(value: &Value) -> Result<()> {
    if value.get("ok").and_then(Value::as_bool).unwrap_or(false) {
        return Ok(());
    }
    let code = value
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown_error");
    Err(match code {
        "invalid_auth" | "not_authed" | "account_inactive" | "token_revoked" => {
            ApiError::Auth(code.to_string())
        }
        "ratelimited" => ApiError::RateLimited {
            retry_after: DEFAULT_RETRY_AFTER,
        },
        _ => ApiError::Upstream {
            status: 200,
            body: value.to_string(),
        },
    })
}

/// Run `op`, retrying retryable failures at most `max_retries` times.
/// 429s sleep for the server-supplied delay; network failures back
/// off exponentially. Never loops without sleeping.
async fn with_retries<T, F, Fut>(max_retries: u32, endpoint: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut backoff = INITIAL_BACKOFF;
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.retryable() && attempt < max_retries => {
                let delay = match &err {
                    ApiError::RateLimited { retry_after } => *retry_after,
                    _ => backoff,
                };
                attempt += 1;
                warn!(endpoint, attempt, ?delay, "Slack request failed, retrying: {err}");
                tokio::time::sleep(delay).await;
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }
            Err(err) => return Err(err),
        }
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| ApiError::Upstream {
        status: 200,
        body: format!("malformed Slack response: {e}"),
    })
}

#[async_trait]
impl SlackApi for SlackClient {
    async fn users_conversations(
        &self,
        token: &str,
        user_id: &str,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<ConversationsPage> {
        let mut query = vec![
            ("user", user_id.to_string()),
            ("types", "public_channel,private_channel".to_string()),
            ("limit", limit.min(MAX_PAGE_LIMIT).to_string()),
        ];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_string()));
        }
        decode(self.get(token, "users.conversations", &query).await?)
    }

    async fn conversations_history(
        &self,
        token: &str,
        channel_id: &str,
        limit: u32,
    ) -> Result<MessagePage> {
        let query = vec![
            ("channel", channel_id.to_string()),
            ("limit", limit.min(MAX_PAGE_LIMIT).to_string()),
        ];
        decode(self.get(token, "conversations.history", &query).await?)
    }

    async fn conversations_replies(
        &self,
        token: &str,
        channel_id: &str,
        thread_ts: &str,
    ) -> Result<MessagePage> {
        let query = vec![
            ("channel", channel_id.to_string()),
            ("ts", thread_ts.to_string()),
        ];
        decode(self.get(token, "conversations.replies", &query).await?)
    }

    async fn post_message(
        &self,
        token: &str,
        channel_id: &str,
        text: &str,
    ) -> Result<PostedMessage> {
        let body = json!({ "channel": channel_id, "text": text });
        decode(self.post(token, "chat.postMessage", &body).await?)
    }

    async fn post_reply(
        &self,
        token: &str,
        channel_id: &str,
        thread_ts: &str,
        text: &str,
    ) -> Result<PostedMessage> {
        let body = json!({ "channel": channel_id, "thread_ts": thread_ts, "text": text });
        decode(self.post(token, "chat.postMessage", &body).await?)
    }

    async fn add_reaction(
        &self,
        token: &str,
        channel_id: &str,
        timestamp: &str,
        name: &str,
    ) -> Result<()> {
        let body = json!({ "channel": channel_id, "timestamp": timestamp, "name": name });
        self.post(token, "reactions.add", &body).await?;
        Ok(())
    }

    async fn users_list(
        &self,
        token: &str,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<UsersPage> {
        let mut query = vec![("limit", limit.min(MAX_PAGE_LIMIT).to_string())];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_string()));
        }
        decode(self.get(token, "users.list", &query).await?)
    }

    async fn user_profile(&self, token: &str, user_id: &str) -> Result<UserProfile> {
        let query = vec![
            ("user", user_id.to_string()),
            ("include_labels", "true".to_string()),
        ];
        decode(self.get(token, "users.profile.get", &query).await?)
    }
}
