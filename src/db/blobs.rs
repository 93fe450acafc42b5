//! Blob store operations over the `blobs` and `meta` tables.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{Member, RawMemberRecord};

const KEY_ROSTER: &str = "roster";
const KEY_NEXT_ID: &str = "next_id";
const KEY_ASSIGNMENTS: &str = "assignments";

/// Handle for loading and saving the persisted blobs.
#[derive(Clone)]
pub struct BlobStore {
    pool: SqlitePool,
}

/// Everything read from disk at startup, decoded leniently.
#[derive(Debug, Default)]
pub struct PersistedState {
    pub roster: Vec<RawMemberRecord>,
    pub next_id: Option<i64>,
    pub assignments: HashMap<i64, i64>,
    pub revision_id: i64,
}

impl BlobStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn read_blob(&self, key: &str) -> Result<Option<String>, AppError> {
        let row = sqlx::query("SELECT value FROM blobs WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("value")))
    }

    async fn write_blob(&self, key: &str, value: &str) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO blobs (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Get the current revision ID.
    pub async fn get_revision_id(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT revision_id FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("revision_id"))
    }

    /// Increment the revision ID and return the new value.
    pub async fn increment_revision(&self) -> Result<i64, AppError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
            .bind(&now)
            .execute(&self.pool)
            .await?;
        self.get_revision_id().await
    }

    /// Load all persisted state at startup.
    ///
    /// Unreadable blobs degrade silently: a roster or assignment blob that
    /// is not valid JSON is logged and treated as absent, so the store stays
    /// usable after corruption. Per-record validation of the roster happens
    /// later in `RosterStore::from_snapshot`.
    pub async fn load(&self) -> Result<PersistedState, AppError> {
        let mut state = PersistedState {
            revision_id: self.get_revision_id().await?,
            ..Default::default()
        };

        if let Some(raw) = self.read_blob(KEY_ROSTER).await? {
            match serde_json::from_str::<Vec<serde_json::Value>>(&raw) {
                Ok(values) => {
                    // Tolerate junk elements inside an otherwise valid array
                    state.roster = values
                        .into_iter()
                        .filter_map(|v| serde_json::from_value::<RawMemberRecord>(v).ok())
                        .collect();
                }
                Err(err) => {
                    let err = AppError::MalformedPersistedState(format!(
                        "Roster snapshot is unreadable, starting empty: {}",
                        err
                    ));
                    tracing::warn!("{}", err);
                }
            }
        }

        if let Some(raw) = self.read_blob(KEY_NEXT_ID).await? {
            match raw.parse::<i64>() {
                Ok(counter) => state.next_id = Some(counter),
                Err(_) => tracing::warn!("Next-id counter is unreadable, deriving from roster"),
            }
        }

        if let Some(raw) = self.read_blob(KEY_ASSIGNMENTS).await? {
            match serde_json::from_str::<HashMap<String, i64>>(&raw) {
                Ok(map) => {
                    state.assignments = map
                        .into_iter()
                        .filter_map(|(k, v)| k.parse::<i64>().ok().map(|k| (k, v)))
                        .collect();
                }
                Err(err) => {
                    tracing::warn!("Assignment map is unreadable, starting empty: {}", err);
                }
            }
        }

        Ok(state)
    }

    /// Persist the roster snapshot as an ordered list of members.
    pub async fn save_roster(&self, members: &[Member]) -> Result<(), AppError> {
        let json = serde_json::to_string(members)?;
        self.write_blob(KEY_ROSTER, &json).await
    }

    /// Persist the next-id counter, never regressing below the stored value.
    pub async fn save_next_id(&self, next_id: i64) -> Result<(), AppError> {
        let stored = match self.read_blob(KEY_NEXT_ID).await? {
            Some(raw) => raw.parse::<i64>().unwrap_or(0),
            None => 0,
        };
        let value = next_id.max(stored);
        self.write_blob(KEY_NEXT_ID, &value.to_string()).await
    }

    /// Persist the assignment map. JSON objects key on strings, so giver ids
    /// are stringified here and parsed back in `load`.
    pub async fn save_assignments(&self, map: &HashMap<i64, i64>) -> Result<(), AppError> {
        let stringly: HashMap<String, i64> =
            map.iter().map(|(k, &v)| (k.to_string(), v)).collect();
        let json = serde_json::to_string(&stringly)?;
        self.write_blob(KEY_ASSIGNMENTS, &json).await
    }
}
