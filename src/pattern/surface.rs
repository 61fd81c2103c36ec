//! Surface patterns: immutable context + target templates
//!
//! A [`SurfacePattern`] is the triple (previous context, target restriction,
//! next context). Identity is structural; the hash is computed once at
//! construction from the canonical string form and never changes. Patterns
//! carry no corpus back-references: they describe shape only.

use crate::error::{Result, SeedlingError};
use crate::pattern::restriction::{AttributeRegistry, Restriction};
use crate::pattern::token::PatternToken;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// Which context sides a pattern uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Genre {
    Prev,
    Next,
    PrevNext,
}

/// An immutable surface pattern
///
/// Constructed via [`SurfacePattern::new`], which derives the genre from
/// the context sides present; a pattern with neither side is rejected, so
/// the genre/context invariants of the model hold by construction.
#[derive(Debug, Clone)]
pub struct SurfacePattern {
    prev: Option<Vec<Restriction>>,
    target: PatternToken,
    next: Option<Vec<Restriction>>,
    genre: Genre,
    canonical: String,
    hash: u64,
}

fn canonical_side(side: Option<&[Restriction]>) -> String {
    match side {
        None => String::new(),
        Some(nodes) => nodes
            .iter()
            .map(|r| r.canonical())
            .collect::<Vec<_>>()
            .join(" "),
    }
}

impl SurfacePattern {
    /// Build a pattern from its context sides and target template
    ///
    /// An empty `Vec` context is treated the same as an absent side.
    pub fn new(
        prev: Option<Vec<Restriction>>,
        target: PatternToken,
        next: Option<Vec<Restriction>>,
    ) -> Result<Self> {
        let prev = prev.filter(|v| !v.is_empty());
        let next = next.filter(|v| !v.is_empty());
        let genre = match (&prev, &next) {
            (Some(_), Some(_)) => Genre::PrevNext,
            (Some(_), None) => Genre::Prev,
            (None, Some(_)) => Genre::Next,
            (None, None) => {
                return Err(SeedlingError::InvalidOperation(
                    "a surface pattern needs at least one context side".to_string(),
                ))
            }
        };
        let canonical = format!(
            "{} <{}> {}",
            canonical_side(prev.as_deref()),
            target.canonical(),
            canonical_side(next.as_deref())
        );
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        canonical.hash(&mut hasher);
        let hash = hasher.finish();
        Ok(Self {
            prev,
            target,
            next,
            genre,
            canonical,
            hash,
        })
    }

    pub fn genre(&self) -> Genre {
        self.genre
    }

    pub fn prev_context(&self) -> Option<&[Restriction]> {
        self.prev.as_deref()
    }

    pub fn next_context(&self) -> Option<&[Restriction]> {
        self.next.as_deref()
    }

    pub fn target(&self) -> &PatternToken {
        &self.target
    }

    /// Canonical string form; stable for the lifetime of the pattern
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// Total number of context nodes on both sides
    pub fn context_len(&self) -> usize {
        self.prev.as_ref().map_or(0, |v| v.len()) + self.next.as_ref().map_or(0, |v| v.len())
    }

    /// Detailed, compilable rendering of the full pattern
    pub fn render_detailed(&self, registry: &AttributeRegistry) -> String {
        let side = |nodes: Option<&[Restriction]>| {
            nodes.map_or(String::new(), |nodes| {
                nodes
                    .iter()
                    .map(|r| r.render_detailed(registry))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
        };
        format!(
            "{} {} {}",
            side(self.prev.as_deref()),
            self.target.render_detailed(registry),
            side(self.next.as_deref())
        )
        .trim()
        .to_string()
    }

    /// Whether `other`'s context arrays are contiguous subsequences of this
    /// pattern's on both sides
    ///
    /// Used to prefer shorter, more general patterns during pruning.
    pub fn subsumes(&self, other: &SurfacePattern) -> bool {
        contains_contiguous(self.prev.as_deref(), other.prev.as_deref())
            && contains_contiguous(self.next.as_deref(), other.next.as_deref())
    }

    /// Context-aware generality comparison
    ///
    /// Returns 0 when the two patterns are fully identical, `i32::MAX` when
    /// their contexts differ structurally, and otherwise the signed
    /// difference in target restrictiveness (restriction count minus
    /// compound length), used as a generality tie-break.
    pub fn equal_context(&self, other: &SurfacePattern) -> i32 {
        if self.prev != other.prev || self.next != other.next {
            return i32::MAX;
        }
        if self.target == other.target {
            return 0;
        }
        let weight = |t: &PatternToken| t.restriction_count() - t.num_words_compound as i32;
        weight(&self.target) - weight(&other.target)
    }
}

/// Whether `needle` occurs as a contiguous subsequence of `hay`
///
/// An absent or empty needle is always contained.
fn contains_contiguous(hay: Option<&[Restriction]>, needle: Option<&[Restriction]>) -> bool {
    let needle = match needle {
        None => return true,
        Some(n) if n.is_empty() => return true,
        Some(n) => n,
    };
    let hay = match hay {
        None => return false,
        Some(h) => h,
    };
    if needle.len() > hay.len() {
        return false;
    }
    hay.windows(needle.len()).any(|w| w == needle)
}

impl PartialEq for SurfacePattern {
    fn eq(&self, other: &Self) -> bool {
        self.target == other.target && self.prev == other.prev && self.next == other.next
    }
}

impl Eq for SurfacePattern {}

impl Hash for SurfacePattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl PartialOrd for SurfacePattern {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SurfacePattern {
    /// Longer-context patterns sort first; ties break lexicographically on
    /// the canonical string
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .context_len()
            .cmp(&self.context_len())
            .then_with(|| self.canonical.cmp(&other.canonical))
    }
}

impl std::fmt::Display for SurfacePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.canonical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::restriction::Wildcard;
    use std::collections::hash_map::DefaultHasher;

    fn target() -> PatternToken {
        PatternToken::new(Some("NN".into()), None, None, 1, false)
    }

    fn word(w: &str) -> Restriction {
        Restriction::attribute("word", w)
    }

    fn hash_of(p: &SurfacePattern) -> u64 {
        let mut hasher = DefaultHasher::new();
        p.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_genre_derivation() {
        let p = SurfacePattern::new(Some(vec![word("the")]), target(), None).unwrap();
        assert_eq!(p.genre(), Genre::Prev);
        assert!(p.next_context().is_none());

        let n = SurfacePattern::new(None, target(), Some(vec![word("sat")])).unwrap();
        assert_eq!(n.genre(), Genre::Next);

        let both =
            SurfacePattern::new(Some(vec![word("the")]), target(), Some(vec![word("sat")]))
                .unwrap();
        assert_eq!(both.genre(), Genre::PrevNext);

        assert!(SurfacePattern::new(None, target(), None).is_err());
        // An empty context side counts as absent.
        assert!(SurfacePattern::new(Some(vec![]), target(), None).is_err());
    }

    #[test]
    fn test_structural_equality_and_hash() {
        let mut r1 = Restriction::attribute("tag", "NN");
        r1.add_restriction("ner", "PERSON").unwrap();
        let mut r2 = Restriction::attribute("ner", "PERSON");
        r2.add_restriction("tag", "NN").unwrap();

        let a = SurfacePattern::new(Some(vec![r1]), target(), None).unwrap();
        let b = SurfacePattern::new(Some(vec![r2]), target(), None).unwrap();
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_subsumption_partial_order() {
        let long = SurfacePattern::new(
            Some(vec![word("the"), word("big")]),
            target(),
            Some(vec![word("sat")]),
        )
        .unwrap();
        let short = SurfacePattern::new(Some(vec![word("big")]), target(), None).unwrap();

        assert!(long.subsumes(&short));
        assert!(!short.subsumes(&long));
        // Reflexive.
        assert!(long.subsumes(&long));
        // Antisymmetry: mutual subsumption only for equal contexts.
        let copy = SurfacePattern::new(
            Some(vec![word("the"), word("big")]),
            target(),
            Some(vec![word("sat")]),
        )
        .unwrap();
        assert!(long.subsumes(&copy) && copy.subsumes(&long));
        assert_eq!(long, copy);
        // Non-contiguous subsequences don't count.
        let gap = SurfacePattern::new(Some(vec![word("a"), word("big")]), target(), None).unwrap();
        assert!(!long.subsumes(&gap));
    }

    #[test]
    fn test_equal_context() {
        let a = SurfacePattern::new(Some(vec![word("the")]), target(), None).unwrap();
        let same = SurfacePattern::new(Some(vec![word("the")]), target(), None).unwrap();
        assert_eq!(a.equal_context(&same), 0);

        let other_ctx = SurfacePattern::new(Some(vec![word("a")]), target(), None).unwrap();
        assert_eq!(a.equal_context(&other_ctx), i32::MAX);

        let bare = PatternToken::new(None, None, None, 1, false);
        let less_restricted =
            SurfacePattern::new(Some(vec![word("the")]), bare, None).unwrap();
        // Same context, more target restrictions on `a`: positive diff.
        assert!(a.equal_context(&less_restricted) > 0);
        assert!(less_restricted.equal_context(&a) < 0);
    }

    #[test]
    fn test_ordering_longer_context_first() {
        let long = SurfacePattern::new(
            Some(vec![word("the"), word("big")]),
            target(),
            Some(vec![word("sat")]),
        )
        .unwrap();
        let short = SurfacePattern::new(Some(vec![word("the")]), target(), None).unwrap();
        assert_eq!(long.cmp(&short), Ordering::Less);

        let mut sorted = vec![short.clone(), long.clone()];
        sorted.sort();
        assert_eq!(sorted[0], long);
    }

    #[test]
    fn test_wildcards_participate_in_identity() {
        let with_fw = SurfacePattern::new(
            Some(vec![word("the"), Restriction::wildcard(Wildcard::Filler)]),
            target(),
            None,
        )
        .unwrap();
        let without = SurfacePattern::new(Some(vec![word("the")]), target(), None).unwrap();
        assert_ne!(with_fw, without);
    }
}
