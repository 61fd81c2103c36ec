//! Pattern model and generation
//!
//! Submodules, leaf-first: restriction nodes, the target-position template,
//! the immutable surface pattern, and the factory that enumerates candidate
//! patterns around a token position. The [`PatternBank`] intern table maps
//! structurally-equal patterns to one stable numeric id for storage.

pub mod factory;
pub mod restriction;
pub mod surface;
pub mod token;

pub use factory::SurfacePatternFactory;
pub use restriction::{AttributeRegistry, Restriction, RestrictionKind, Wildcard};
pub use surface::{Genre, SurfacePattern};
pub use token::PatternToken;

use std::collections::HashMap;
use std::sync::RwLock;

/// Stable numeric id of an interned surface pattern
pub type PatternId = u32;

#[derive(Debug, Default)]
struct BankInner {
    by_pattern: HashMap<SurfacePattern, PatternId>,
    by_id: Vec<SurfacePattern>,
}

/// Thread-safe intern table mapping surface patterns to stable ids
///
/// Structurally equal patterns collapse to one id; ids are dense and
/// assigned in first-seen order. Constructed explicitly and shared via
/// `Arc` between the builder, the pattern index, and application.
#[derive(Debug, Default)]
pub struct PatternBank {
    inner: RwLock<BankInner>,
}

impl PatternBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get-or-create the id for a pattern
    pub fn id_for(&self, pattern: &SurfacePattern) -> PatternId {
        {
            let inner = self.inner.read().expect("pattern bank poisoned");
            if let Some(id) = inner.by_pattern.get(pattern) {
                return *id;
            }
        }
        let mut inner = self.inner.write().expect("pattern bank poisoned");
        if let Some(id) = inner.by_pattern.get(pattern) {
            return *id;
        }
        let id = inner.by_id.len() as PatternId;
        inner.by_id.push(pattern.clone());
        inner.by_pattern.insert(pattern.clone(), id);
        id
    }

    /// Look up a pattern by id
    pub fn pattern_for(&self, id: PatternId) -> Option<SurfacePattern> {
        let inner = self.inner.read().expect("pattern bank poisoned");
        inner.by_id.get(id as usize).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("pattern bank poisoned").by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(word: &str) -> SurfacePattern {
        SurfacePattern::new(
            Some(vec![Restriction::attribute("word", word)]),
            PatternToken::new(Some("NN".into()), None, None, 1, false),
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_equal_patterns_share_an_id() {
        let bank = PatternBank::new();
        let a = bank.id_for(&pattern("the"));
        let b = bank.id_for(&pattern("the"));
        let c = bank.id_for(&pattern("a"));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(bank.len(), 2);
        assert_eq!(bank.pattern_for(a).unwrap(), pattern("the"));
        assert!(bank.pattern_for(99).is_none());
    }
}
