//! slack-mcp-store: SQLite-backed tenant credential store.
//!
//! Holds the `slack_bots` table mapping team_id to bot token. Rows
//! are provisioned externally (or via the `credential` CLI commands);
//! the dispatcher only reads them, optionally through a bounded-TTL
//! in-memory cache.

pub mod cache;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension};
use tokio::sync::Mutex;

use slack_mcp_types::TenantCredential;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No credential row for the tenant. Non-retryable; distinct from
    /// any authorization failure.
    #[error("no credential found for team_id={0}")]
    NotFound(String),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Blocking task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Read access to per-tenant credentials.
///
/// A trait so the dispatcher can take a fake store in tests.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up the credential for a tenant. Fails with
    /// [`StoreError::NotFound`] when no row exists.
    async fn resolve(&self, team_id: &str) -> Result<TenantCredential>;
}

/// SQLite-based credential store.
pub struct SqliteCredentialStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCredentialStore {
    /// Open (or create) the SQLite database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent read performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS slack_bots (
                team_id TEXT PRIMARY KEY,
                bot_token TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );",
        )?;

        tracing::info!("Credential store opened: {}", path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS slack_bots (
                team_id TEXT PRIMARY KEY,
                bot_token TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Insert or update the credential for a tenant.
    ///
    /// Used by provisioning (CLI) and tests, never by the dispatcher.
    pub async fn put(&self, credential: &TenantCredential) -> Result<()> {
        let conn = self.conn.clone();
        let credential = credential.clone();
        let now = chrono::Utc::now().timestamp_millis();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.execute(
                "INSERT INTO slack_bots (team_id, bot_token, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(team_id) DO UPDATE SET
                    bot_token = excluded.bot_token,
                    updated_at = excluded.updated_at",
                rusqlite::params![credential.team_id, credential.bot_token, now],
            )?;
            Ok(())
        })
        .await?
    }

    /// List all provisioned team ids, most recently updated first.
    pub async fn list_teams(&self) -> Result<Vec<String>> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let mut stmt =
                conn.prepare("SELECT team_id FROM slack_bots ORDER BY updated_at DESC")?;
            let rows = stmt
                .query_map([], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(rows)
        })
        .await?
    }

    /// Remove a tenant's credential.
    pub async fn remove(&self, team_id: &str) -> Result<()> {
        let conn = self.conn.clone();
        let team_id = team_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.execute(
                "DELETE FROM slack_bots WHERE team_id = ?1",
                rusqlite::params![team_id],
            )?;
            Ok(())
        })
        .await?
    }
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn resolve(&self, team_id: &str) -> Result<TenantCredential> {
        let conn = self.conn.clone();
        let team_id = team_id.to_string();
        let lookup = team_id.clone();
        let row: Option<TenantCredential> = tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let result = conn
                .query_row(
                    "SELECT team_id, bot_token FROM slack_bots WHERE team_id = ?1",
                    rusqlite::params![lookup],
                    |row| {
                        Ok(TenantCredential {
                            team_id: row.get(0)?,
                            bot_token: row.get(1)?,
                        })
                    },
                )
                .optional()?;
            Ok::<_, StoreError>(result)
        })
        .await??;

        row.ok_or(StoreError::NotFound(team_id))
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

    #[tokio::test]
    async fn test_put_and_resolve() {
        let store = SqliteCredentialStore::open_in_memory().unwrap();
        store.put(&cred("T123", "xoxb-abc")).await.unwrap();

        let loaded = store.resolve("T123").await.unwrap();
        assert_eq!(loaded.team_id, "T123");
        assert_eq!(loaded.bot_token, "xoxb-abc");
    }

    #[tokio::test]
    async fn test_resolve_not_found() {
        let store = SqliteCredentialStore::open_in_memory().unwrap();
        let err = store.resolve("T999").await.unwrap_err();
        match err {
            StoreError::NotFound(team) => assert_eq!(team, "T999"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_put_overwrites_token() {
        let store = SqliteCredentialStore::open_in_memory().unwrap();
        store.put(&cred("T123", "xoxb-old")).await.unwrap();
        store.put(&cred("T123", "xoxb-new")).await.unwrap();

        let loaded = store.resolve("T123").await.unwrap();
        assert_eq!(loaded.bot_token, "xoxb-new");
        assert_eq!(store.list_teams().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_and_remove() {
        let store = SqliteCredentialStore::open_in_memory().unwrap();
        store.put(&cred("T1", "a")).await.unwrap();
        store.put(&cred("T2", "b")).await.unwrap();

        let teams = store.list_teams().await.unwrap();
        assert_eq!(teams.len(), 2);

        store.remove("T1").await.unwrap();
        let teams = store.list_teams().await.unwrap();
        assert_eq!(teams, vec!["T2".to_string()]);
        assert!(matches!(
            store.resolve("T1").await,
            Err(StoreError::NotFound(_))
        ));
    }
}
