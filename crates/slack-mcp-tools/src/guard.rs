//! Conversation access guard.
//!
//! Slack's token-level permissions are tenant-wide, so membership of
//! the acting user must be checked explicitly: enumerate the
//! conversations the user can see and test the target against that
//! set. One check costs at least one API call; the dispatcher calls
//! it at most once per invocation, and results are never cached
//! across invocations (membership changes are not observable here).

use slack_mcp_api::{Result, SlackApi};
use tracing::debug;

/// Upper bound on membership pages walked per check. At 200 channels
/// a page this covers 2000 conversations, beyond which the user is
/// treated as not a member.
const MAX_GUARD_PAGES: u32 = 10;

/// Page size used for guard listings.
const GUARD_PAGE_LIMIT: u32 = 200;

/// Whether `user_id` is a member of `channel_id`.
///
/// `Ok(false)` means "not a member"; an `Err` means the listing call
/// itself failed.
pub async fn authorize(
    api: &dyn SlackApi,
    token: &str,
    user_id: &str,
    channel_id: &str,
) -> Result<bool> {
    let mut cursor: Option<String> = None;
    for page_no in 0..MAX_GUARD_PAGES {
        let page = api
            .users_conversations(token, user_id, GUARD_PAGE_LIMIT, cursor.as_deref())
            .await?;

        if page.channels.iter().any(|c| c.id == channel_id) {
            debug!(user_id, channel_id, page_no, "membership confirmed");
            return Ok(true);
        }

        match page.next_cursor() {
            Some(next) => cursor = Some(next.to_string()),
            None => break,
        }
    }
    debug!(user_id, channel_id, "membership not found");
    Ok(false)
}
