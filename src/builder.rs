//! Parallel pattern construction over a sentence corpus
//!
//! Partitions the sentence-id list into contiguous shards, one worker task
//! per shard, and writes every token's generated pattern ids through the
//! pattern index. Buffered backends are flushed every `flush_every`
//! sentences plus a final remainder flush per shard; the in-memory backend
//! is written through per sentence. A failure in any shard aborts the
//! remaining tasks and surfaces to the caller; writes from completed
//! shards are not rolled back (at-least-once, non-transactional across
//! shards).

use crate::config::EngineConfig;
use crate::error::{Result, SeedlingError};
use crate::index::{IndexBackendKind, PatternIndex, TokenPatternMap};
use crate::pattern::{PatternBank, SurfacePatternFactory};
use crate::types::{Corpus, SentenceId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info};

/// Builds the per-token pattern index for a corpus
pub struct PatternBuilder {
    factory: Arc<SurfacePatternFactory>,
    bank: Arc<PatternBank>,
    index: Arc<dyn PatternIndex>,
    num_workers: usize,
    flush_every: usize,
    write_through: bool,
}

impl PatternBuilder {
    pub fn new(
        factory: Arc<SurfacePatternFactory>,
        bank: Arc<PatternBank>,
        index: Arc<dyn PatternIndex>,
        num_workers: usize,
        flush_every: usize,
        write_through: bool,
    ) -> Self {
        Self {
            factory,
            bank,
            index,
            num_workers: num_workers.max(1),
            flush_every: flush_every.max(1),
            write_through,
        }
    }

    /// Construct from an engine configuration; the in-memory backend is
    /// written through, everything else is buffered
    pub fn from_config(
        config: &EngineConfig,
        factory: Arc<SurfacePatternFactory>,
        bank: Arc<PatternBank>,
        index: Arc<dyn PatternIndex>,
    ) -> Self {
        Self::new(
            factory,
            bank,
            index,
            config.num_workers,
            config.flush_every,
            config.index.backend == IndexBackendKind::Memory,
        )
    }

    /// Populate the pattern index for the given sentence ids
    ///
    /// Shards must never overlap; the contiguous partition here guarantees
    /// disjoint sentence-id assignment, which is what makes concurrent
    /// index writes commutative.
    pub async fn build(&self, corpus: Arc<Corpus>, ids: Vec<SentenceId>) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let shards = shard(ids, self.num_workers);
        info!(
            shards = shards.len(),
            write_through = self.write_through,
            "starting parallel pattern construction"
        );

        let mut tasks = JoinSet::new();
        for shard_ids in shards {
            let factory = Arc::clone(&self.factory);
            let bank = Arc::clone(&self.bank);
            let index = Arc::clone(&self.index);
            let corpus = Arc::clone(&corpus);
            let flush_every = self.flush_every;
            let write_through = self.write_through;
            tasks.spawn(async move {
                run_shard(
                    factory,
                    bank,
                    index,
                    corpus,
                    shard_ids,
                    flush_every,
                    write_through,
                )
                .await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let result = joined.map_err(|e| SeedlingError::Task(e.to_string()))?;
            if let Err(e) = result {
                // Fail fast: cancel the remaining shards; completed writes
                // stay in the index.
                tasks.abort_all();
                return Err(e);
            }
        }
        Ok(())
    }
}

async fn run_shard(
    factory: Arc<SurfacePatternFactory>,
    bank: Arc<PatternBank>,
    index: Arc<dyn PatternIndex>,
    corpus: Arc<Corpus>,
    ids: Vec<SentenceId>,
    flush_every: usize,
    write_through: bool,
) -> Result<()> {
    let mut buffer: HashMap<SentenceId, TokenPatternMap> = HashMap::new();
    let total = ids.len();
    for id in ids {
        let tokens = corpus.get(&id).ok_or_else(|| {
            SeedlingError::Corpus(format!("sentence '{}' not present in corpus", id))
        })?;
        let by_token = factory.patterns_for_sentence(tokens)?;
        let id_map: TokenPatternMap = by_token
            .into_iter()
            .map(|(tok, patterns)| (tok, patterns.iter().map(|p| bank.id_for(p)).collect()))
            .collect();
        if write_through {
            index.add_patterns(&id, &id_map).await?;
        } else {
            buffer.insert(id, id_map);
            if buffer.len() >= flush_every {
                index.add_patterns_bulk(&buffer).await?;
                buffer.clear();
            }
        }
    }
    if !buffer.is_empty() {
        index.add_patterns_bulk(&buffer).await?;
    }
    debug!(sentences = total, "shard finished");
    Ok(())
}

/// Contiguous partition into at most `num_workers` shards; the last shard
/// absorbs the remainder
fn shard(ids: Vec<SentenceId>, num_workers: usize) -> Vec<Vec<SentenceId>> {
    let shards = num_workers.min(ids.len()).max(1);
    let base = ids.len() / shards;
    let mut out = Vec::with_capacity(shards);
    let mut rest = ids;
    for _ in 0..shards - 1 {
        let tail = rest.split_off(base);
        out.push(rest);
        rest = tail;
    }
    out.push(rest);
    out
}
