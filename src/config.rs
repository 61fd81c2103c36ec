//! Configuration for the pattern engine
//!
//! Config structs are plain serde types loadable from a file with an
//! environment-variable overlay. All fatal configuration checks live in
//! the `validate` methods and run before any corpus work starts.

use crate::error::{Result, SeedlingError};
use crate::index::IndexBackendKind;
use serde::Deserialize;
use std::path::{Path, PathBuf};

fn default_min_window() -> usize {
    1
}
fn default_max_window() -> usize {
    4
}
fn default_true() -> bool {
    true
}
fn default_num_words_compound() -> u32 {
    2
}
fn default_min_stopwords() -> usize {
    3
}
fn default_num_workers() -> usize {
    4
}
fn default_flush_every() -> usize {
    1000
}

/// Pattern-factory policy: window bounds, restriction usage, wildcards
#[derive(Debug, Clone, Deserialize)]
pub struct PatternConfig {
    /// Smallest accepted context window per side
    #[serde(default = "default_min_window")]
    pub min_window: usize,
    /// Largest generated context window per side
    #[serde(default = "default_max_window")]
    pub max_window: usize,
    /// Generate POS-restricted target templates
    #[serde(default = "default_true")]
    pub use_pos_tag: bool,
    /// Also generate targets without a POS restriction
    #[serde(default)]
    pub add_without_pos: bool,
    /// Restrict the target to the seed token's NER tag
    #[serde(default)]
    pub use_ner_restriction: bool,
    /// Restrict the target to the seed token's parse parent
    #[serde(default)]
    pub use_parse_parent: bool,
    /// Interleave filler-word glue wildcards into contexts
    #[serde(default = "default_true")]
    pub use_fillers: bool,
    /// Add a stop-word glue wildcard adjacent to the target
    #[serde(default = "default_true")]
    pub use_stop_wildcard: bool,
    /// Allow multi-token (compound) targets
    #[serde(default = "default_true")]
    pub compounding: bool,
    /// Maximum compound length (clamped to 1 when compounding is off)
    #[serde(default = "default_num_words_compound")]
    pub num_words_compound: u32,
    /// A pure-stopword side is accepted only past this many stop words
    #[serde(default = "default_min_stopwords")]
    pub min_stopwords: usize,
    /// Lowercase surface forms in literal context restrictions
    #[serde(default = "default_true")]
    pub match_lowercase: bool,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            min_window: default_min_window(),
            max_window: default_max_window(),
            use_pos_tag: true,
            add_without_pos: false,
            use_ner_restriction: false,
            use_parse_parent: false,
            use_fillers: true,
            use_stop_wildcard: true,
            compounding: true,
            num_words_compound: default_num_words_compound(),
            min_stopwords: default_min_stopwords(),
            match_lowercase: true,
        }
    }
}

impl PatternConfig {
    /// Fail fast on configurations that cannot produce any pattern
    pub fn validate(&self) -> Result<()> {
        if self.min_window == 0 || self.max_window < self.min_window {
            return Err(SeedlingError::config(format!(
                "invalid window bounds: min {} max {}",
                self.min_window, self.max_window
            )));
        }
        if !self.use_pos_tag && !self.add_without_pos {
            return Err(SeedlingError::config(
                "use_pos_tag and add_without_pos cannot both be disabled",
            ));
        }
        Ok(())
    }
}

/// Per-token pattern index backend selection and lifecycle
#[derive(Debug, Clone, Deserialize)]
pub struct IndexConfig {
    /// Which backend implementation to construct
    #[serde(default)]
    pub backend: IndexBackendKind,
    /// SQLite database file (relational backend)
    #[serde(default)]
    pub db_path: Option<PathBuf>,
    /// Search index directory (tantivy backend)
    #[serde(default)]
    pub index_dir: Option<PathBuf>,
    /// Create the backing table/index when opening
    #[serde(default = "default_true")]
    pub create_table: bool,
    /// Drop existing data when `create_table` is set
    #[serde(default)]
    pub delete_existing: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: IndexBackendKind::default(),
            db_path: None,
            index_dir: None,
            create_table: true,
            delete_existing: false,
        }
    }
}

impl IndexConfig {
    pub fn validate(&self) -> Result<()> {
        match self.backend {
            IndexBackendKind::Sqlite if self.db_path.is_none() => Err(SeedlingError::config(
                "sqlite backend requires index.db_path",
            )),
            IndexBackendKind::Tantivy if self.index_dir.is_none() => Err(SeedlingError::config(
                "tantivy backend requires index.index_dir",
            )),
            _ => Ok(()),
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub pattern: PatternConfig,
    #[serde(default)]
    pub index: IndexConfig,
    /// Worker-shard count for parallel pattern construction
    #[serde(default = "default_num_workers")]
    pub num_workers: usize,
    /// Buffered-backend flush interval, in sentences
    #[serde(default = "default_flush_every")]
    pub flush_every: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pattern: PatternConfig::default(),
            index: IndexConfig::default(),
            num_workers: default_num_workers(),
            flush_every: default_flush_every(),
        }
    }
}

impl EngineConfig {
    /// Load from a config file with a `SEEDLING_*` environment overlay
    pub fn from_file(path: &Path) -> Result<Self> {
        let loaded: Self = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(config::Environment::with_prefix("SEEDLING").separator("__"))
            .build()?
            .try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    pub fn validate(&self) -> Result<()> {
        self.pattern.validate()?;
        self.index.validate()?;
        if self.num_workers == 0 {
            return Err(SeedlingError::config("num_workers must be at least 1"));
        }
        if self.flush_every == 0 {
            return Err(SeedlingError::config("flush_every must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_both_target_modes_disabled_is_fatal() {
        let cfg = PatternConfig {
            use_pos_tag: false,
            add_without_pos: false,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(crate::error::SeedlingError::Config(_))
        ));
    }

    #[test]
    fn test_window_bounds_checked() {
        let cfg = PatternConfig {
            min_window: 3,
            max_window: 2,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_backend_paths_required() {
        let cfg = IndexConfig {
            backend: IndexBackendKind::Sqlite,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = IndexConfig {
            backend: IndexBackendKind::Tantivy,
            index_dir: Some("/tmp/idx".into()),
            ..Default::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_from_file_with_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seedling.toml");
        std::fs::write(
            &path,
            "num_workers = 2\n[pattern]\nmax_window = 3\n[index]\nbackend = \"memory\"\n",
        )
        .unwrap();
        let cfg = EngineConfig::from_file(&path).unwrap();
        assert_eq!(cfg.num_workers, 2);
        assert_eq!(cfg.pattern.max_window, 3);
        assert_eq!(cfg.flush_every, 1000);
    }
}
