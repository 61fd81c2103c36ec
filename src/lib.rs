//! Seedling - Surface-Pattern Mining for Weakly-Supervised Phrase Extraction
//!
//! A pattern engine for entity-set bootstrapping over annotated corpora:
//! - Surface-pattern generation around every token position
//! - A pluggable per-token pattern index (in-memory, SQLite, tantivy)
//! - Parallel corpus-wide pattern construction
//! - Pattern application with phrase extraction policies
//! - F1-style pattern scoring against a trusted seed set
//!
//! # Architecture
//!
//! The engine is organized into several layers:
//! - **Types**: Corpus-side data structures (Token, Corpus, PhraseBank)
//! - **Pattern**: Restrictions, surface patterns, and the factory
//! - **Index**: Per-token pattern storage backends
//! - **Builder / Apply / Score**: The mining pipeline stages
//!
//! # Example
//!
//! ```ignore
//! use seedling::{
//!     EngineConfig, PatternBank, PatternBuilder, SurfacePatternFactory,
//! };
//! use seedling::index::{new_shared_store, open_index};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> seedling::Result<()> {
//!     let config = EngineConfig::from_file("config.toml")?;
//!     let factory = Arc::new(SurfacePatternFactory::new(
//!         config.pattern.clone(),
//!         vec!["disease".to_string()],
//!         stop_words,
//!         fill_words,
//!     )?);
//!     let bank = Arc::new(PatternBank::new());
//!     let index = open_index(&config.index, new_shared_store()).await?;
//!
//!     let builder = PatternBuilder::from_config(&config, factory, bank, index);
//!     builder.build(corpus, sentence_ids).await?;
//!     Ok(())
//! }
//! ```

pub mod apply;
pub mod builder;
pub mod config;
pub mod error;
pub mod index;
pub mod matcher;
pub mod pattern;
pub mod score;
pub mod types;

// Re-export commonly used types
pub use apply::{ApplyOptions, MatchOutcome, PatternApplier, TokenAnnotations};
pub use builder::PatternBuilder;
pub use config::{EngineConfig, IndexConfig, PatternConfig};
pub use error::{Result, SeedlingError};
pub use index::{IndexBackendKind, PatternIndex, TokenPatternMap};
pub use matcher::{CompiledPattern, MatcherContext};
pub use pattern::{
    AttributeRegistry, PatternBank, PatternId, Restriction, SurfacePattern, SurfacePatternFactory,
};
pub use score::{F1PatternScorer, PatternScore, PatternScorer};
pub use types::{CandidatePhrase, Corpus, Counter, PhraseBank, PhraseRef, SentenceId, Token};
