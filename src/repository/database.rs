use sqlx::{sqlite::{SqliteConnectOptions, SqlitePoolOptions}, Pool, QueryBuilder, Row, Sqlite, Transaction};
use rustc_hash::FxHashSet;
use std::path::Path;
use std::str::FromStr;

use crate::error::Result;
use crate::model::{CommitId, ForeignCommitId, MappingEntry};

use super::SCHEMA_VERSION;

/// SQLite-backed bidirectional nodemap
pub struct NodemapDb {
    pool: Pool<Sqlite>,
}

impl NodemapDb {
    /// Open (creating if needed) the nodemap database at `path`
    pub async fn open(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .pragma("temp_store", "MEMORY");
        Self::connect(options).await
    }

    /// In-memory database, used by tests and benchmarks
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        Self::connect(options).await
    }

    async fn connect(options: SqliteConnectOptions) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    /// Initialize database schema, returns true if schema was rebuilt
    pub async fn init_schema(&self) -> Result<bool> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS metadata (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )"
        ).execute(&self.pool).await?;

        let stored_version: Option<String> = sqlx::query("SELECT value FROM metadata WHERE key = 'schema_version'")
            .fetch_optional(&self.pool)
            .await?
            .map(|row| row.get("value"));

        let needs_rebuild = stored_version.as_deref() != Some(SCHEMA_VERSION);

        if needs_rebuild {
            if let Some(old) = &stored_version {
                tracing::warn!("nodemap schema version changed ({} -> {}), rebuilding index", old, SCHEMA_VERSION);
            }
            sqlx::query("DROP TABLE IF EXISTS nodemap").execute(&self.pool).await?;
            sqlx::query("DELETE FROM metadata").execute(&self.pool).await?;
        }

        // One row per local commit; the foreign side is indexed separately
        // so either direction is a point lookup.
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS nodemap (
                local BLOB PRIMARY KEY,
                foreign_id BLOB NOT NULL
            )"
        ).execute(&self.pool).await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS nodemap_foreign ON nodemap (foreign_id)")
            .execute(&self.pool)
            .await?;

        if needs_rebuild {
            sqlx::query("INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?)")
                .bind(SCHEMA_VERSION)
                .execute(&self.pool)
                .await?;
        }

        Ok(needs_rebuild)
    }

    /// Get metadata value by key
    pub async fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        Ok(sqlx::query("SELECT value FROM metadata WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| row.get("value")))
    }

    /// Set metadata value
    pub async fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO metadata (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn local_for(&self, foreign: &ForeignCommitId) -> Result<Option<CommitId>> {
        let row: Option<Vec<u8>> = sqlx::query_scalar("SELECT local FROM nodemap WHERE foreign_id = ? LIMIT 1")
            .bind(foreign.as_bytes().as_slice())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.and_then(|v| CommitId::from_bytes(&v)))
    }

    pub async fn foreign_for(&self, local: &CommitId) -> Result<Option<ForeignCommitId>> {
        let row: Option<Vec<u8>> = sqlx::query_scalar("SELECT foreign_id FROM nodemap WHERE local = ?")
            .bind(local.as_bytes().as_slice())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.and_then(|v| ForeignCommitId::from_bytes(&v)))
    }

    /// Load all indexed local ids into a set for fast dedup
    pub async fn load_local_ids(&self) -> Result<FxHashSet<CommitId>> {
        let rows: Vec<Vec<u8>> = sqlx::query_scalar("SELECT local FROM nodemap")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter()
            .filter_map(|v| CommitId::from_bytes(&v))
            .collect())
    }

    pub async fn count(&self) -> Result<u64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM nodemap")
            .fetch_one(&self.pool)
            .await?;
        Ok(n as u64)
    }

    /// Insert entries in ONE transaction, returns rows actually inserted.
    ///
    /// A local id that is already mapped keeps its first mapping.
    pub async fn insert_entries_with_callback<F>(
        &self,
        entries: &[MappingEntry],
        mut on_progress: F,
    ) -> Result<u64>
    where
        F: FnMut(usize),
    {
        let mut tx = self.pool.begin().await?;
        let inserted = self.insert_entries_in_tx(&mut tx, entries, &mut on_progress).await?;
        tx.commit().await?;
        Ok(inserted)
    }

    async fn insert_entries_in_tx<F>(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        entries: &[MappingEntry],
        on_progress: &mut F,
    ) -> Result<u64>
    where
        F: FnMut(usize),
    {
        // Two binds per row, well under SQLite's variable limit
        const BATCH_SIZE: usize = 5000;

        let mut inserted = 0;
        for chunk in entries.chunks(BATCH_SIZE) {
            if chunk.is_empty() {
                continue;
            }

            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT OR IGNORE INTO nodemap (local, foreign_id) "
            );
            qb.push_values(chunk, |mut row, entry| {
                row.push_bind(entry.local.as_bytes().as_slice())
                    .push_bind(entry.foreign.as_bytes().as_slice());
            });
            inserted += qb.build().execute(&mut **tx).await?.rows_affected();

            on_progress(chunk.len());
        }

        Ok(inserted)
    }
}
