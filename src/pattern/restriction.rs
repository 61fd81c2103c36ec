//! Restriction nodes: one position of a pattern's context
//!
//! A [`Restriction`] is either a disjunction of (attribute, value)
//! restrictions or a bound wildcard class (filler / stop word). The two
//! modes are mutually exclusive by construction; calling
//! [`Restriction::add_restriction`] on a wildcard node is a contract
//! violation and returns an error. Every node carries a min/max occurrence
//! count (default 1..1) that controls how many corpus tokens it may absorb
//! when matched.

use crate::error::{Result, SeedlingError};
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

/// Bound wildcard classes usable in place of attribute restrictions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Wildcard {
    /// Absorbs configured filler words ("glue" between context tokens)
    Filler,
    /// Absorbs stop words adjacent to the target
    Stopword,
}

impl Wildcard {
    /// Short code used by the simple rendering
    pub fn code(&self) -> &'static str {
        match self {
            Wildcard::Filler => "FW",
            Wildcard::Stopword => "SW",
        }
    }
}

/// The two mutually exclusive restriction modes
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RestrictionKind {
    /// OR-set of (attribute class, value) pairs; ordering is canonicalized
    /// by the set so structurally identical nodes collapse
    Or(BTreeSet<(String, String)>),
    /// Bound wildcard class
    Wildcard(Wildcard),
}

/// One pattern-template node: an attribute disjunction or a bound wildcard,
/// with an occurrence range
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Restriction {
    kind: RestrictionKind,
    min: u32,
    max: u32,
}

impl Restriction {
    /// A single-attribute restriction with the default 1..1 occurrence
    pub fn attribute(class: impl Into<String>, value: impl Into<String>) -> Self {
        let mut set = BTreeSet::new();
        set.insert((class.into(), value.into()));
        Self {
            kind: RestrictionKind::Or(set),
            min: 1,
            max: 1,
        }
    }

    /// A bound wildcard node; wildcards default to optional 0..2 occurrence
    pub fn wildcard(w: Wildcard) -> Self {
        Self {
            kind: RestrictionKind::Wildcard(w),
            min: 0,
            max: 2,
        }
    }

    /// Add an (attribute, value) pair to the OR-set
    ///
    /// Fails on a wildcard node: the two modes are mutually exclusive.
    pub fn add_restriction(
        &mut self,
        class: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<&mut Self> {
        match &mut self.kind {
            RestrictionKind::Or(set) => {
                set.insert((class.into(), value.into()));
                Ok(self)
            }
            RestrictionKind::Wildcard(_) => Err(SeedlingError::InvalidOperation(
                "cannot add an attribute restriction to a bound-wildcard node".to_string(),
            )),
        }
    }

    /// Replace the node with a bound wildcard
    ///
    /// Fails if attribute restrictions were already configured.
    pub fn set_bound_wildcard(&mut self, w: Wildcard) -> Result<&mut Self> {
        match &self.kind {
            RestrictionKind::Or(set) if !set.is_empty() => Err(SeedlingError::InvalidOperation(
                "cannot turn a node with attribute restrictions into a bound wildcard".to_string(),
            )),
            _ => {
                self.kind = RestrictionKind::Wildcard(w);
                self.min = 0;
                self.max = 2;
                Ok(self)
            }
        }
    }

    /// Set the occurrence range this node may span when matched
    pub fn set_occurrence(&mut self, min: u32, max: u32) -> &mut Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn kind(&self) -> &RestrictionKind {
        &self.kind
    }

    pub fn occurrence(&self) -> (u32, u32) {
        (self.min, self.max)
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self.kind, RestrictionKind::Wildcard(_))
    }

    /// Detailed rendering: quoted, regex-escaped values with registry short
    /// keys and an explicit occurrence suffix when not 1..1
    ///
    /// Used for pattern display and as input to pattern compilation.
    pub fn render_detailed(&self, registry: &AttributeRegistry) -> String {
        let body = match &self.kind {
            RestrictionKind::Or(set) => {
                let parts: Vec<String> = set
                    .iter()
                    .map(|(class, value)| {
                        format!(
                            "{{{}:\"{}\"}}",
                            registry.short_key(class),
                            regex::escape(value)
                        )
                    })
                    .collect();
                format!("[{}]", parts.join(" | "))
            }
            RestrictionKind::Wildcard(Wildcard::Filler) => "[{filler:true}]".to_string(),
            RestrictionKind::Wildcard(Wildcard::Stopword) => "[{stopword:true}]".to_string(),
        };
        if (self.min, self.max) == (1, 1) {
            body
        } else {
            format!("{}{{{},{}}}", body, self.min, self.max)
        }
    }

    /// Simple rendering: bare values joined by `|`, wildcards collapsed to
    /// their short codes
    pub fn render_simple(&self) -> String {
        match &self.kind {
            RestrictionKind::Or(set) => set
                .iter()
                .map(|(_, value)| value.as_str())
                .collect::<Vec<_>>()
                .join("|"),
            RestrictionKind::Wildcard(w) => w.code().to_string(),
        }
    }

    /// Canonical form used for hashing/identity of enclosing patterns;
    /// independent of any registry state
    pub fn canonical(&self) -> String {
        let body = match &self.kind {
            RestrictionKind::Or(set) => {
                let parts: Vec<String> = set
                    .iter()
                    .map(|(class, value)| format!("{}:{}", class, value))
                    .collect();
                format!("[{}]", parts.join("|"))
            }
            RestrictionKind::Wildcard(w) => format!("[{}]", w.code()),
        };
        format!("{}{{{},{}}}", body, self.min, self.max)
    }
}

/// Thread-safe, idempotent registry of attribute-class short keys
///
/// The first caller to intern a class name wins; every later call observes
/// the same short key for the lifetime of the registry. Constructed
/// explicitly and shared via `Arc` by the components that render patterns;
/// never a process-wide static.
#[derive(Debug, Default)]
pub struct AttributeRegistry {
    keys: Mutex<HashMap<String, String>>,
}

impl AttributeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get-or-create the short key for an attribute class
    ///
    /// Short keys are stable, lowercase, and collision-free within one
    /// registry: a class whose lowered form is already taken gets a numeric
    /// suffix.
    pub fn short_key(&self, class: &str) -> String {
        let mut keys = self.keys.lock().expect("attribute registry poisoned");
        if let Some(existing) = keys.get(class) {
            return existing.clone();
        }
        let base: String = class
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        let base = if base.is_empty() {
            "attr".to_string()
        } else {
            base
        };
        let mut candidate = base.clone();
        let mut suffix = 1u32;
        while keys.values().any(|v| *v == candidate) {
            candidate = format!("{}{}", base, suffix);
            suffix += 1;
        }
        keys.insert(class.to_string(), candidate.clone());
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_or_set_is_order_insensitive() {
        let mut a = Restriction::attribute("tag", "NN");
        a.add_restriction("ner", "PERSON").unwrap();

        let mut b = Restriction::attribute("ner", "PERSON");
        b.add_restriction("tag", "NN").unwrap();

        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
        assert_eq!(a.canonical(), b.canonical());
    }

    #[test]
    fn test_modes_are_mutually_exclusive() {
        let mut wild = Restriction::wildcard(Wildcard::Filler);
        assert!(wild.add_restriction("tag", "NN").is_err());

        let mut attr = Restriction::attribute("tag", "NN");
        assert!(attr.set_bound_wildcard(Wildcard::Stopword).is_err());
    }

    #[test]
    fn test_renderings() {
        let registry = AttributeRegistry::new();
        let mut node = Restriction::attribute("word", "a.b");
        node.add_restriction("word", "cat").unwrap();
        let detailed = node.render_detailed(&registry);
        assert!(detailed.contains("{word:\"a\\.b\"}"));
        assert!(detailed.contains("{word:\"cat\"}"));
        assert_eq!(node.render_simple(), "a.b|cat");

        let mut sw = Restriction::wildcard(Wildcard::Stopword);
        assert_eq!(sw.render_simple(), "SW");
        assert_eq!(
            sw.set_occurrence(0, 2).render_detailed(&registry),
            "[{stopword:true}]{0,2}"
        );
    }

    #[test]
    fn test_registry_is_idempotent_and_collision_free() {
        let registry = AttributeRegistry::new();
        let first = registry.short_key("AnimalLabel");
        assert_eq!(first, "animallabel");
        assert_eq!(registry.short_key("AnimalLabel"), first);
        // Different class lowering to the same key gets disambiguated.
        let clash = registry.short_key("ANIMALLABEL");
        assert_ne!(clash, first);
    }
}
