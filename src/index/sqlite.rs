//! SQLite pattern index backend
//!
//! One blob row per sentence id: the serialized token->pattern map for that
//! sentence. Writes are batched upserts inside an explicit transaction;
//! bulk reads batch sentence-id lookups into prepared IN-clause tiers to
//! amortize per-round-trip overhead. Connections come from a
//! deadpool-sqlite pool so concurrent writers each get their own
//! connection.

use crate::error::{Result, SeedlingError};
use crate::index::{decode_blob, encode_blob, PatternIndex, TokenPatternMap};
use crate::types::SentenceId;
use async_trait::async_trait;
use deadpool_sqlite::{Config, Pool, Runtime};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

const TABLE: &str = "pattern_index";

/// IN-clause sizes for tiered bulk reads, largest first
const BATCH_TIERS: [usize; 4] = [51, 11, 4, 1];

/// SQLite-backed pattern index
pub struct SqlitePatternIndex {
    pool: Pool,
}

fn db_err(context: &str, err: impl std::fmt::Display) -> SeedlingError {
    SeedlingError::Database(format!("{}: {}", context, err))
}

impl SqlitePatternIndex {
    /// Open the index, applying the table lifecycle flags
    ///
    /// * `create_table = true, delete_existing = true`: drop and recreate.
    /// * `create_table = true, delete_existing = false`: error if the table
    ///   already exists.
    /// * `create_table = false`: error if the table is missing.
    pub async fn open(db_path: &Path, create_table: bool, delete_existing: bool) -> Result<Self> {
        let path_str = db_path.to_string_lossy().to_string();
        info!(path = %path_str, "opening sqlite pattern index");

        let config = Config::new(path_str);
        let pool = config
            .create_pool(Runtime::Tokio1)
            .map_err(|e| db_err("failed to create connection pool", e))?;

        let conn = pool
            .get()
            .await
            .map_err(|e| db_err("failed to get connection from pool", e))?;

        conn.interact(move |conn| -> Result<()> {
            let exists: bool = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
                    rusqlite::params![TABLE],
                    |row| row.get::<_, i64>(0),
                )
                .map(|n| n > 0)
                .map_err(|e| db_err("failed to probe for table", e))?;

            if create_table {
                if exists && !delete_existing {
                    return Err(SeedlingError::config(format!(
                        "table '{}' already exists; set delete_existing to recreate it",
                        TABLE
                    )));
                }
                if exists {
                    conn.execute(&format!("DROP TABLE {}", TABLE), [])
                        .map_err(|e| db_err("failed to drop table", e))?;
                }
                conn.execute(
                    &format!(
                        "CREATE TABLE {} (sentence_id TEXT PRIMARY KEY, patterns BLOB NOT NULL)",
                        TABLE
                    ),
                    [],
                )
                .map_err(|e| db_err("failed to create table", e))?;
            } else if !exists {
                return Err(SeedlingError::config(format!(
                    "table '{}' does not exist and create_table is disabled",
                    TABLE
                )));
            }
            Ok(())
        })
        .await
        .map_err(|e| db_err("pool interaction failed", e))??;

        Ok(Self { pool })
    }
}

#[async_trait]
impl PatternIndex for SqlitePatternIndex {
    async fn add_patterns(&self, sentence: &SentenceId, patterns: &TokenPatternMap) -> Result<()> {
        let batch: HashMap<SentenceId, TokenPatternMap> =
            [(sentence.clone(), patterns.clone())].into_iter().collect();
        self.add_patterns_bulk(&batch).await
    }

    async fn add_patterns_bulk(
        &self,
        batch: &HashMap<SentenceId, TokenPatternMap>,
    ) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let rows: Vec<(String, Vec<u8>)> = batch
            .iter()
            .map(|(id, patterns)| Ok((id.0.clone(), encode_blob(patterns)?)))
            .collect::<Result<_>>()?;

        let conn = self
            .pool
            .get()
            .await
            .map_err(|e| db_err("failed to get connection from pool", e))?;

        let count = conn
            .interact(move |conn| -> Result<usize> {
                let tx = conn
                    .transaction()
                    .map_err(|e| db_err("failed to begin transaction", e))?;
                {
                    let mut stmt = tx
                        .prepare(&format!(
                            "INSERT OR REPLACE INTO {} (sentence_id, patterns) VALUES (?, ?)",
                            TABLE
                        ))
                        .map_err(|e| db_err("failed to prepare upsert", e))?;
                    for (id, blob) in &rows {
                        stmt.execute(rusqlite::params![id, blob])
                            .map_err(|e| db_err("failed to upsert sentence", e))?;
                    }
                }
                tx.commit()
                    .map_err(|e| db_err("failed to commit transaction", e))?;
                Ok(rows.len())
            })
            .await
            .map_err(|e| db_err("pool interaction failed", e))??;

        debug!(sentences = count, "stored pattern batch in sqlite");
        Ok(())
    }

    async fn patterns_for_all_tokens(&self, sentence: &SentenceId) -> Result<TokenPatternMap> {
        let mut found = self
            .patterns_for_sentences(std::slice::from_ref(sentence))
            .await?;
        Ok(found.remove(sentence).unwrap_or_default())
    }

    async fn patterns_for_sentences(
        &self,
        sentences: &[SentenceId],
    ) -> Result<HashMap<SentenceId, TokenPatternMap>> {
        if sentences.is_empty() {
            return Ok(HashMap::new());
        }
        let ids: Vec<String> = sentences.iter().map(|s| s.0.clone()).collect();

        let conn = self
            .pool
            .get()
            .await
            .map_err(|e| db_err("failed to get connection from pool", e))?;

        let rows = conn
            .interact(move |conn| -> Result<Vec<(String, Vec<u8>)>> {
                let mut out = Vec::new();
                let mut remaining = ids.as_slice();
                // Consume the id list greedily through the tier sizes so
                // each round trip uses a prepared statement of fixed arity.
                while !remaining.is_empty() {
                    let tier = BATCH_TIERS
                        .iter()
                        .copied()
                        .find(|t| *t <= remaining.len())
                        .unwrap_or(1);
                    let (chunk, rest) = remaining.split_at(tier.min(remaining.len()));
                    remaining = rest;

                    let placeholders = vec!["?"; chunk.len()].join(",");
                    let mut stmt = conn
                        .prepare_cached(&format!(
                            "SELECT sentence_id, patterns FROM {} WHERE sentence_id IN ({})",
                            TABLE, placeholders
                        ))
                        .map_err(|e| db_err("failed to prepare lookup", e))?;
                    let mapped = stmt
                        .query_map(rusqlite::params_from_iter(chunk.iter()), |row| {
                            Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
                        })
                        .map_err(|e| db_err("failed to query sentences", e))?
                        .collect::<rusqlite::Result<Vec<_>>>()
                        .map_err(|e| db_err("failed to read rows", e))?;
                    out.extend(mapped);
                }
                Ok(out)
            })
            .await
            .map_err(|e| db_err("pool interaction failed", e))??;

        rows.into_iter()
            .map(|(id, blob)| Ok((SentenceId(id), decode_blob(&blob)?)))
            .collect()
    }

    async fn save(&self, _dir: &Path) -> Result<()> {
        // The database file is already durable.
        Ok(())
    }

    async fn load(&self, _dir: &Path) -> Result<()> {
        Ok(())
    }

    async fn setup_search(&self) -> Result<()> {
        Ok(())
    }

    async fn create_lookup_index(&self) -> Result<()> {
        let conn = self
            .pool
            .get()
            .await
            .map_err(|e| db_err("failed to get connection from pool", e))?;

        let result = conn
            .interact(|conn| {
                conn.execute(
                    &format!(
                        "CREATE INDEX IF NOT EXISTS idx_{}_sentence ON {} (sentence_id)",
                        TABLE, TABLE
                    ),
                    [],
                )
            })
            .await
            .map_err(|e| db_err("pool interaction failed", e))?;

        // Concurrent callers can race the check-then-create; that is not
        // worth failing the run over.
        if let Err(e) = result {
            warn!(error = %e, "secondary index creation failed; continuing");
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        // Pooled connections are reclaimed on drop; nothing to flush.
        debug!("sqlite pattern index closed");
        Ok(())
    }
}
