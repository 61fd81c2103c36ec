//! Tantivy pattern index backend
//!
//! Each sentence is one indexed document: a raw-token string field holding
//! the sentence id (searchable, exact match) and a stored, non-searchable
//! bytes field holding the serialized token->pattern map. All writers
//! serialize through a single mutex-guarded writer handle; readers use a
//! separately managed view that must be (re)opened after writes before
//! they observe them. The near-real-time visibility gap is part of the
//! contract, surfaced through [`PatternIndex::setup_search`].

use crate::error::Result;
use crate::index::{decode_blob, encode_blob, PatternIndex, TokenPatternMap};
use crate::types::SentenceId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use tantivy::collector::TopDocs;
use tantivy::query::TermQuery;
use tantivy::schema::{Field, IndexRecordOption, Schema, Value, STORED, STRING};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tracing::{debug, info};

const WRITER_HEAP_BYTES: usize = 50_000_000;

/// Tantivy-backed pattern index
pub struct TantivyPatternIndex {
    index: Index,
    id_field: Field,
    patterns_field: Field,
    writer: Mutex<Option<IndexWriter>>,
    reader: Mutex<Option<IndexReader>>,
}

impl TantivyPatternIndex {
    /// Open the index directory, creating the index if it does not exist
    ///
    /// A missing index is a benign condition when probing, not an error.
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let index = match Index::open_in_dir(dir) {
            Ok(index) => {
                debug!(dir = %dir.display(), "opened existing tantivy pattern index");
                index
            }
            Err(_) => {
                info!(dir = %dir.display(), "creating tantivy pattern index");
                let mut schema_builder = Schema::builder();
                schema_builder.add_text_field("sentence_id", STRING | STORED);
                schema_builder.add_bytes_field("patterns", STORED);
                Index::create_in_dir(dir, schema_builder.build())?
            }
        };
        let schema = index.schema();
        let id_field = schema.get_field("sentence_id")?;
        let patterns_field = schema.get_field("patterns")?;
        Ok(Self {
            index,
            id_field,
            patterns_field,
            writer: Mutex::new(None),
            reader: Mutex::new(None),
        })
    }

    /// Current searcher view, opening one on first use
    fn searcher(&self) -> Result<tantivy::Searcher> {
        let mut guard = self.reader.lock().expect("reader lock poisoned");
        if guard.is_none() {
            let reader = self
                .index
                .reader_builder()
                .reload_policy(ReloadPolicy::OnCommitWithDelay)
                .try_into()?;
            *guard = Some(reader);
        }
        Ok(guard.as_ref().expect("reader just set").searcher())
    }

    fn lookup_one(
        &self,
        searcher: &tantivy::Searcher,
        sentence: &SentenceId,
    ) -> Result<Option<TokenPatternMap>> {
        let query = TermQuery::new(
            Term::from_field_text(self.id_field, sentence.as_str()),
            IndexRecordOption::Basic,
        );
        let top = searcher.search(&query, &TopDocs::with_limit(1))?;
        let Some((_, addr)) = top.into_iter().next() else {
            return Ok(None);
        };
        let stored: TantivyDocument = searcher.doc(addr)?;
        let bytes = stored
            .get_first(self.patterns_field)
            .and_then(|v| v.as_bytes())
            .unwrap_or_default();
        Ok(Some(decode_blob(bytes)?))
    }
}

#[async_trait]
impl PatternIndex for TantivyPatternIndex {
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
        let mut guard = self.writer.lock().expect("writer lock poisoned");
        if guard.is_none() {
            *guard = Some(self.index.writer(WRITER_HEAP_BYTES)?);
        }
        let writer = guard.as_mut().expect("writer just set");
        for (id, patterns) in batch {
            // Upsert: drop any previous document for this sentence first.
            writer.delete_term(Term::from_field_text(self.id_field, id.as_str()));
            writer.add_document(doc!(
                self.id_field => id.as_str(),
                self.patterns_field => encode_blob(patterns)?,
            ))?;
        }
        writer.commit()?;
        debug!(sentences = batch.len(), "stored pattern batch in tantivy");
        Ok(())
    }

    async fn patterns_for_all_tokens(&self, sentence: &SentenceId) -> Result<TokenPatternMap> {
        let searcher = self.searcher()?;
        Ok(self.lookup_one(&searcher, sentence)?.unwrap_or_default())
    }

    async fn patterns_for_sentences(
        &self,
        sentences: &[SentenceId],
    ) -> Result<HashMap<SentenceId, TokenPatternMap>> {
        let searcher = self.searcher()?;
        let mut out = HashMap::new();
        for id in sentences {
            if let Some(found) = self.lookup_one(&searcher, id)? {
                out.insert(id.clone(), found);
            }
        }
        Ok(out)
    }

    async fn save(&self, _dir: &Path) -> Result<()> {
        // The index directory is already durable.
        Ok(())
    }

    async fn load(&self, _dir: &Path) -> Result<()> {
        Ok(())
    }

    async fn setup_search(&self) -> Result<()> {
        // Reopen the read view so it observes everything committed so far.
        let mut guard = self.reader.lock().expect("reader lock poisoned");
        match guard.as_ref() {
            Some(reader) => reader.reload()?,
            None => {
                *guard = Some(
                    self.index
                        .reader_builder()
                        .reload_policy(ReloadPolicy::OnCommitWithDelay)
                        .try_into()?,
                );
            }
        }
        Ok(())
    }

    async fn create_lookup_index(&self) -> Result<()> {
        // The sentence-id field is the primary lookup term already.
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut guard = self.writer.lock().expect("writer lock poisoned");
        if let Some(mut writer) = guard.take() {
            writer.commit()?;
            debug!("tantivy pattern index writer closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn map(entries: &[(usize, &[u32])]) -> TokenPatternMap {
        entries
            .iter()
            .map(|(tok, pats)| (*tok, pats.iter().copied().collect::<HashSet<_>>()))
            .collect()
    }

    #[tokio::test]
    async fn test_write_then_setup_then_read() {
        let dir = TempDir::new().unwrap();
        let index = TantivyPatternIndex::open(dir.path()).unwrap();
        let id = SentenceId::from("s1");
        index
            .add_patterns(&id, &map(&[(0, &[1, 2]), (2, &[3])]))
            .await
            .unwrap();
        index.setup_search().await.unwrap();
        let got = index.patterns_for_all_tokens(&id).await.unwrap();
        assert_eq!(got, map(&[(0, &[1, 2]), (2, &[3])]));
    }

    #[tokio::test]
    async fn test_unknown_sentence_is_empty() {
        let dir = TempDir::new().unwrap();
        let index = TantivyPatternIndex::open(dir.path()).unwrap();
        index.setup_search().await.unwrap();
        let got = index
            .patterns_for_all_tokens(&SentenceId::from("nope"))
            .await
            .unwrap();
        assert!(got.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_replaces_document() {
        let dir = TempDir::new().unwrap();
        let index = TantivyPatternIndex::open(dir.path()).unwrap();
        let id = SentenceId::from("s1");
        index
            .add_patterns(&id, &map(&[(0, &[1]), (1, &[2])]))
            .await
            .unwrap();
        index.add_patterns(&id, &map(&[(0, &[9])])).await.unwrap();
        index.setup_search().await.unwrap();
        assert_eq!(
            index.patterns_for_all_tokens(&id).await.unwrap(),
            map(&[(0, &[9])])
        );
    }

    #[tokio::test]
    async fn test_reopen_existing_directory() {
        let dir = TempDir::new().unwrap();
        let id = SentenceId::from("s1");
        {
            let index = TantivyPatternIndex::open(dir.path()).unwrap();
            index.add_patterns(&id, &map(&[(0, &[4])])).await.unwrap();
            index.close().await.unwrap();
            index.close().await.unwrap();
        }
        let reopened = TantivyPatternIndex::open(dir.path()).unwrap();
        reopened.setup_search().await.unwrap();
        assert_eq!(
            reopened.patterns_for_all_tokens(&id).await.unwrap(),
            map(&[(0, &[4])])
        );
    }
}
