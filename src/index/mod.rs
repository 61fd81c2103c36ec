//! Per-token pattern index: storage layer for the pattern engine
//!
//! Provides the abstraction and implementations for persisting the
//! per-sentence map of token index to pattern-id set, so pattern
//! construction can scale past main memory. Three backends implement the
//! same contract: an in-memory map, a SQLite blob store, and a tantivy
//! inverted index.

pub mod memory;
pub mod sqlite;
pub mod tantivy;

use crate::config::IndexConfig;
use crate::error::Result;
use crate::pattern::PatternId;
use crate::types::SentenceId;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

pub use self::memory::{new_shared_store, MemoryPatternIndex, SharedPatternStore};
pub use self::sqlite::SqlitePatternIndex;
pub use self::tantivy::TantivyPatternIndex;

/// Token index to pattern-id set, for one sentence
pub type TokenPatternMap = HashMap<usize, HashSet<PatternId>>;

/// Pattern index backend trait defining all required operations
///
/// All backends share upsert semantics: new data for a token index replaces
/// old data for that index. Callers needing a read-merge-write update use
/// [`PatternIndex::update_patterns`].
#[async_trait]
pub trait PatternIndex: Send + Sync {
    /// Upsert one sentence's token-pattern map
    async fn add_patterns(&self, sentence: &SentenceId, patterns: &TokenPatternMap) -> Result<()>;

    /// Batched upsert of many sentences
    async fn add_patterns_bulk(
        &self,
        batch: &HashMap<SentenceId, TokenPatternMap>,
    ) -> Result<()>;

    /// Read-merge-write: union stored data into the input (incoming entries
    /// win on conflicting token indices), write back, then flush
    ///
    /// Last-writer-wins at token-index granularity is the documented
    /// conflict behavior.
    async fn update_patterns(&self, batch: HashMap<SentenceId, TokenPatternMap>) -> Result<()> {
        let mut merged = batch;
        let ids: Vec<SentenceId> = merged.keys().cloned().collect();
        let existing = self.patterns_for_sentences(&ids).await?;
        for (id, stored) in existing {
            let entry = merged.entry(id).or_default();
            for (tok, pats) in stored {
                entry.entry(tok).or_insert(pats);
            }
        }
        self.add_patterns_bulk(&merged).await?;
        self.close().await
    }

    /// The stored token-pattern map for a sentence; empty for unknown ids
    async fn patterns_for_all_tokens(&self, sentence: &SentenceId) -> Result<TokenPatternMap>;

    /// Bulk lookup over a sentence-id collection
    async fn patterns_for_sentences(
        &self,
        sentences: &[SentenceId],
    ) -> Result<HashMap<SentenceId, TokenPatternMap>>;

    /// Whole-index snapshot to a directory; no-op for durable backends
    async fn save(&self, dir: &Path) -> Result<()>;

    /// Load a snapshot written by [`PatternIndex::save`]; no-op for durable
    /// backends
    async fn load(&self, dir: &Path) -> Result<()>;

    /// Backend-specific readiness step before reads observe recent writes;
    /// no-op for backends without a read/write visibility gap
    async fn setup_search(&self) -> Result<()>;

    /// Idempotent secondary-index creation for query performance; a
    /// concurrent check-then-create race collapses to log-and-continue
    async fn create_lookup_index(&self) -> Result<()>;

    /// Release backend resources; safe to call multiple times
    async fn close(&self) -> Result<()>;
}

/// Enumerated backend implementations
///
/// Backend selection is an explicit configuration value; every enumerated
/// kind has a compiled-in implementation, so there is no runtime probing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexBackendKind {
    #[default]
    Memory,
    Sqlite,
    Tantivy,
}

/// Construct the configured backend
///
/// The memory backend attaches to `shared_store`, so every index opened
/// over the same store observes the same data.
pub async fn open_index(
    config: &IndexConfig,
    shared_store: SharedPatternStore,
) -> Result<Arc<dyn PatternIndex>> {
    config.validate()?;
    let index: Arc<dyn PatternIndex> = match config.backend {
        IndexBackendKind::Memory => Arc::new(MemoryPatternIndex::new(shared_store)),
        IndexBackendKind::Sqlite => Arc::new(
            SqlitePatternIndex::open(
                config.db_path.as_ref().expect("validated"),
                config.create_table,
                config.delete_existing,
            )
            .await?,
        ),
        IndexBackendKind::Tantivy => Arc::new(TantivyPatternIndex::open(
            config.index_dir.as_ref().expect("validated"),
        )?),
    };
    Ok(index)
}

/// Serialize one sentence's token-pattern map to its storage blob form
pub(crate) fn encode_blob(patterns: &TokenPatternMap) -> Result<Vec<u8>> {
    Ok(bincode::serialize(patterns)?)
}

/// Inverse of [`encode_blob`]
pub(crate) fn decode_blob(bytes: &[u8]) -> Result<TokenPatternMap> {
    Ok(bincode::deserialize(bytes)?)
}
