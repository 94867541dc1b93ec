//! Bounded-TTL in-memory credential cache.
//!
//! Staleness, not races, is the risk here: entries expire after a
//! short TTL so credential rotation is observed, and the dispatcher
//! invalidates a tenant's entry as soon as Slack reports the token
//! invalid.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use slack_mcp_types::TenantCredential;

struct Entry {
    credential: TenantCredential,
    inserted_at: Instant,
}

/// Concurrent credential cache keyed by team_id.
///
/// Uses a std `Mutex`; it is never held across an await point.
pub struct CredentialCache {
    entries: Mutex<HashMap<String, Entry>>,
    ttl: Duration,
}

impl CredentialCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Get a non-expired credential, if present.
    pub fn get(&self, team_id: &str) -> Option<TenantCredential> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(team_id) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                Some(entry.credential.clone())
            }
            Some(_) => {
                entries.remove(team_id);
                None
            }
            None => None,
        }
    }

    /// Store a freshly resolved credential.
    pub fn put(&self, credential: TenantCredential) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            credential.team_id.clone(),
            Entry {
                credential,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Drop a tenant's entry, forcing the next resolve to hit the
    /// store. Called when the upstream rejects the token.
    pub fn invalidate(&self, team_id: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(team_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cred(team: &str, token: &str) -> TenantCredential {
        TenantCredential {
            team_id: team.into(),
            bot_token: token.into(),
        }
    }

    #[test]
    fn test_hit_within_ttl() {
        let cache = CredentialCache::new(Duration::from_secs(60));
        cache.put(cred("T1", "xoxb-1"));
        let hit = cache.get("T1").unwrap();
        assert_eq!(hit.bot_token, "xoxb-1");
    }

    #[test]
    fn test_miss_after_ttl() {
        let cache = CredentialCache::new(Duration::ZERO);
        cache.put(cred("T1", "xoxb-1"));
        assert!(cache.get("T1").is_none());
    }

    #[test]
    fn test_invalidate() {
        let cache = CredentialCache::new(Duration::from_secs(60));
        cache.put(cred("T1", "xoxb-1"));
        cache.invalidate("T1");
        assert!(cache.get("T1").is_none());
    }

    #[test]
    fn test_unknown_team_misses() {
        let cache = CredentialCache::new(Duration::from_secs(60));
        assert!(cache.get("T404").is_none());
    }
}
