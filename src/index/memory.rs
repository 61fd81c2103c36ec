//! In-memory pattern index backend
//!
//! Backed by an explicitly shared concurrent map: every
//! [`MemoryPatternIndex`] constructed over the same [`SharedPatternStore`]
//! observes the same data. The store is injected rather than being a
//! process-wide static, preserving the "shared across all callers in a run"
//! semantics without hidden global state. `save`/`load` snapshot the whole
//! map as one bincode file.

use crate::error::Result;
use crate::index::{PatternIndex, TokenPatternMap};
use crate::types::SentenceId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Snapshot file name inside the save/load directory
const SNAPSHOT_FILE: &str = "pattern_index.bin";

/// The shared underlying store for all in-memory index instances in a run
pub type SharedPatternStore = Arc<RwLock<HashMap<SentenceId, TokenPatternMap>>>;

/// Create a fresh shared store
pub fn new_shared_store() -> SharedPatternStore {
    Arc::new(RwLock::new(HashMap::new()))
}

/// In-memory pattern index over an injected shared store
pub struct MemoryPatternIndex {
    store: SharedPatternStore,
}

impl MemoryPatternIndex {
    pub fn new(store: SharedPatternStore) -> Self {
        Self { store }
    }

    /// Number of sentences currently stored
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }
}

#[async_trait]
impl PatternIndex for MemoryPatternIndex {
    async fn add_patterns(&self, sentence: &SentenceId, patterns: &TokenPatternMap) -> Result<()> {
        // Whole-sentence replacement; partial merge goes through
        // update_patterns.
        self.store
            .write()
            .await
            .insert(sentence.clone(), patterns.clone());
        Ok(())
    }

    async fn add_patterns_bulk(
        &self,
        batch: &HashMap<SentenceId, TokenPatternMap>,
    ) -> Result<()> {
        let mut store = self.store.write().await;
        for (id, patterns) in batch {
            store.insert(id.clone(), patterns.clone());
        }
        debug!(sentences = batch.len(), "stored pattern batch in memory");
        Ok(())
    }

    async fn patterns_for_all_tokens(&self, sentence: &SentenceId) -> Result<TokenPatternMap> {
        Ok(self
            .store
            .read()
            .await
            .get(sentence)
            .cloned()
            .unwrap_or_default())
    }

    async fn patterns_for_sentences(
        &self,
        sentences: &[SentenceId],
    ) -> Result<HashMap<SentenceId, TokenPatternMap>> {
        let store = self.store.read().await;
        Ok(sentences
            .iter()
            .filter_map(|id| store.get(id).map(|m| (id.clone(), m.clone())))
            .collect())
    }

    async fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        let store = self.store.read().await;
        let bytes = bincode::serialize(&*store)?;
        let path = dir.join(SNAPSHOT_FILE);
        std::fs::write(&path, bytes)?;
        info!(path = %path.display(), sentences = store.len(), "saved pattern index snapshot");
        Ok(())
    }

    async fn load(&self, dir: &Path) -> Result<()> {
        let path = dir.join(SNAPSHOT_FILE);
        let bytes = std::fs::read(&path)?;
        let loaded: HashMap<SentenceId, TokenPatternMap> = bincode::deserialize(&bytes)?;
        let mut store = self.store.write().await;
        *store = loaded;
        info!(path = %path.display(), sentences = store.len(), "loaded pattern index snapshot");
        Ok(())
    }

    async fn setup_search(&self) -> Result<()> {
        // Reads always observe writes here.
        Ok(())
    }

    async fn create_lookup_index(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
