//! Pattern scoring against a trusted seed set
//!
//! Ranks candidate patterns by how well the phrases they extract agree
//! with phrases already known to be correct. The default scorer is the
//! F1-style combination of specificity (precision against the pattern's
//! own extractions) and sensitivity (recall against the seed set);
//! alternative strategies plug in through [`PatternScorer`].

use crate::error::{Result, SeedlingError};
use crate::pattern::SurfacePattern;
use crate::types::{Counter, PhraseRef};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// A scored pattern
#[derive(Debug, Clone, PartialEq)]
pub struct PatternScore {
    /// Fraction of the pattern's extractions that are seed phrases
    pub specificity: f64,
    /// Fraction of the seed set the pattern extracts
    pub sensitivity: f64,
    /// Harmonic mean of the two
    pub f1: f64,
}

/// Strategy seam for pattern ranking
pub trait PatternScorer {
    /// Score every pattern with at least one seed-overlapping extraction;
    /// zero-overlap patterns are dropped from the output entirely
    fn score(
        &self,
        extracted: &HashMap<SurfacePattern, Counter<PhraseRef>>,
        seed_phrases: &HashSet<PhraseRef>,
    ) -> Result<HashMap<SurfacePattern, PatternScore>>;
}

/// The default specificity/sensitivity F1 scorer
#[derive(Debug, Default, Clone, Copy)]
pub struct F1PatternScorer;

impl F1PatternScorer {
    pub fn new() -> Self {
        Self
    }
}

impl PatternScorer for F1PatternScorer {
    fn score(
        &self,
        extracted: &HashMap<SurfacePattern, Counter<PhraseRef>>,
        seed_phrases: &HashSet<PhraseRef>,
    ) -> Result<HashMap<SurfacePattern, PatternScore>> {
        if seed_phrases.is_empty() {
            return Err(SeedlingError::config(
                "pattern scoring requires a non-empty seed phrase set",
            ));
        }
        let mut scores = HashMap::new();
        for (pattern, phrases) in extracted {
            if phrases.is_empty() {
                continue;
            }
            let overlap = phrases
                .keys()
                .filter(|p| seed_phrases.contains(*p))
                .count() as f64;
            if overlap == 0.0 {
                continue;
            }
            let specificity = overlap / phrases.len() as f64;
            let sensitivity = overlap / seed_phrases.len() as f64;
            let f1 = 2.0 * specificity * sensitivity / (specificity + sensitivity);
            scores.insert(
                pattern.clone(),
                PatternScore {
                    specificity,
                    sensitivity,
                    f1,
                },
            );
        }
        debug!(
            candidates = extracted.len(),
            scored = scores.len(),
            "scored patterns against seed set"
        );
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::restriction::Restriction;
    use crate::pattern::token::PatternToken;
    use crate::types::CandidatePhrase;
    use std::sync::Arc;

    fn phrase(s: &str) -> PhraseRef {
        Arc::new(CandidatePhrase::new(s, s))
    }

    fn pattern(word: &str) -> SurfacePattern {
        SurfacePattern::new(
            Some(vec![Restriction::attribute("word", word)]),
            PatternToken::new(Some("NN".into()), None, None, 1, false),
            None,
        )
        .unwrap()
    }

    fn counter(phrases: &[&str]) -> Counter<PhraseRef> {
        phrases.iter().map(|p| (phrase(p), 1.0)).collect()
    }

    #[test]
    fn test_empty_seed_set_is_fatal() {
        let extracted = [(pattern("the"), counter(&["cat"]))].into_iter().collect();
        let err = F1PatternScorer::new()
            .score(&extracted, &HashSet::new())
            .unwrap_err();
        assert!(matches!(err, SeedlingError::Config(_)));
    }

    #[test]
    fn test_zero_overlap_patterns_are_dropped() {
        let extracted = [
            (pattern("the"), counter(&["cat", "dog"])),
            (pattern("a"), counter(&["table", "chair"])),
        ]
        .into_iter()
        .collect();
        let seeds: HashSet<PhraseRef> = [phrase("cat")].into_iter().collect();
        let scores = F1PatternScorer::new().score(&extracted, &seeds).unwrap();
        assert_eq!(scores.len(), 1);
        assert!(scores.contains_key(&pattern("the")));
    }

    #[test]
    fn test_f1_values() {
        // Pattern extracts {cat, dog, table}; seeds are {cat, dog, fish}.
        let extracted = [(pattern("the"), counter(&["cat", "dog", "table"]))]
            .into_iter()
            .collect();
        let seeds: HashSet<PhraseRef> = [phrase("cat"), phrase("dog"), phrase("fish")]
            .into_iter()
            .collect();
        let scores = F1PatternScorer::new().score(&extracted, &seeds).unwrap();
        let score = scores.get(&pattern("the")).unwrap();
        assert!((score.specificity - 2.0 / 3.0).abs() < 1e-9);
        assert!((score.sensitivity - 2.0 / 3.0).abs() < 1e-9);
        assert!((score.f1 - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_perfect_pattern_scores_one() {
        let extracted = [(pattern("the"), counter(&["cat"]))].into_iter().collect();
        let seeds: HashSet<PhraseRef> = [phrase("cat")].into_iter().collect();
        let scores = F1PatternScorer::new().score(&extracted, &seeds).unwrap();
        let score = scores.values().next().unwrap();
        assert_eq!(score.specificity, 1.0);
        assert_eq!(score.sensitivity, 1.0);
        assert_eq!(score.f1, 1.0);
    }

    #[test]
    fn test_scores_stay_in_unit_interval() {
        let extracted = [(
            pattern("the"),
            counter(&["cat", "dog", "fish", "table", "chair"]),
        )]
        .into_iter()
        .collect();
        let seeds: HashSet<PhraseRef> = [phrase("cat"), phrase("lamp")].into_iter().collect();
        let scores = F1PatternScorer::new().score(&extracted, &seeds).unwrap();
        for score in scores.values() {
            assert!(score.specificity > 0.0 && score.specificity <= 1.0);
            assert!(score.sensitivity > 0.0 && score.sensitivity <= 1.0);
            assert!(score.f1 > 0.0 && score.f1 <= 1.0);
        }
    }
}
