//! Pattern application: harvesting candidate phrases from a corpus
//!
//! Matches a curated set of compiled patterns over sentences and
//! accumulates, per pattern, the extracted candidate phrases and their
//! frequencies plus the spans where each pattern fired. Everything the
//! original pipeline wrote back onto tokens (the matched flag and the
//! per-token matched-pattern set) is returned here as an explicit
//! [`TokenAnnotations`] value for the caller to merge, keeping the
//! component free of corpus side effects.
//!
//! Two variants exist deliberately: [`PatternApplier::apply`] emits
//! counters for every accepted candidate, while
//! [`PatternApplier::apply_combined`] matches all patterns in one pass and
//! only emits counters for spans containing at least one token not already
//! labeled. The asymmetry is inherited behavior; do not unify without
//! product-owner review.

use crate::error::{Result, SeedlingError};
use crate::matcher::CompiledPattern;
use crate::pattern::{PatternBank, PatternId, SurfacePattern};
use crate::types::{Corpus, Counter, PhraseBank, PhraseRef, SentenceId, Token};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Policy flags for one application run
#[derive(Debug, Clone)]
pub struct ApplyOptions {
    /// The label being bootstrapped
    pub label: String,
    /// Omit stop words from extracted phrases (keep scanning)
    pub remove_stopwords_from_phrases: bool,
    /// Discard any candidate containing a stop word
    pub discard_phrases_with_stopwords: bool,
    /// Merge adjacent already-labeled tokens into the matched span
    pub club_neighboring_labeled_words: bool,
    /// Tokens matching this regex void the whole candidate
    pub ignore_word_regex: Option<Regex>,
}

impl ApplyOptions {
    pub fn for_label(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            remove_stopwords_from_phrases: false,
            discard_phrases_with_stopwords: false,
            club_neighboring_labeled_words: false,
            ignore_word_regex: None,
        }
    }
}

/// Per-token output of application: the "annotations to merge back"
#[derive(Debug, Default, Clone)]
pub struct TokenAnnotation {
    pub matched: bool,
    pub patterns: HashSet<PatternId>,
}

/// sentence id -> token index -> annotation
pub type TokenAnnotations = HashMap<SentenceId, HashMap<usize, TokenAnnotation>>;

/// Where a pattern fired; token bounds are inclusive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedSpan {
    pub sentence: SentenceId,
    pub start: usize,
    pub end: usize,
}

/// Everything one application run produced
#[derive(Debug, Default)]
pub struct MatchOutcome {
    /// (pattern x phrase) frequency counters
    pub counts: HashMap<SurfacePattern, Counter<PhraseRef>>,
    /// Spans where each pattern fired
    pub matched_spans: HashMap<SurfacePattern, Vec<MatchedSpan>>,
    /// Token-side bookkeeping for the caller to merge into its corpus
    pub annotations: TokenAnnotations,
    /// Phrases from spans with no previously-labeled token
    pub newly_labeled: HashSet<PhraseRef>,
}

/// Applies compiled patterns over a corpus for one label
pub struct PatternApplier {
    options: ApplyOptions,
    stop_words: Arc<HashSet<String>>,
    phrase_bank: Arc<PhraseBank>,
    pattern_bank: Arc<PatternBank>,
}

impl PatternApplier {
    pub fn new(
        options: ApplyOptions,
        stop_words: Arc<HashSet<String>>,
        phrase_bank: Arc<PhraseBank>,
        pattern_bank: Arc<PatternBank>,
    ) -> Self {
        Self {
            options,
            stop_words,
            phrase_bank,
            pattern_bank,
        }
    }

    /// Match each pattern independently over the working set
    ///
    /// Emits counters for every accepted candidate, whether or not the
    /// span was already labeled.
    pub fn apply(
        &self,
        patterns: &[(CompiledPattern, SurfacePattern)],
        corpus: &Corpus,
        ids: &[SentenceId],
    ) -> Result<MatchOutcome> {
        let mut outcome = MatchOutcome::default();
        for id in ids {
            let tokens = self.sentence(corpus, id)?;
            for (compiled, pattern) in patterns {
                for m in compiled.find_all(tokens) {
                    self.process_span(
                        &mut outcome,
                        pattern,
                        id,
                        tokens,
                        m.term_start,
                        m.term_end,
                        false,
                    );
                }
            }
        }
        debug!(
            patterns = patterns.len(),
            phrases = outcome.newly_labeled.len(),
            "pattern application finished"
        );
        Ok(outcome)
    }

    /// Match all patterns in one combined pass
    ///
    /// Overlapping matches collapse to the leftmost one, and counters are
    /// only emitted for spans with at least one not-already-labeled token
    /// (stricter than [`PatternApplier::apply`], deliberately).
    pub fn apply_combined(
        &self,
        patterns: &[(CompiledPattern, SurfacePattern)],
        corpus: &Corpus,
        ids: &[SentenceId],
    ) -> Result<MatchOutcome> {
        let mut outcome = MatchOutcome::default();
        for id in ids {
            let tokens = self.sentence(corpus, id)?;
            // One alternation over all patterns: gather every match, then
            // keep the leftmost non-overlapping ones.
            let mut all: Vec<(usize, usize, &SurfacePattern)> = Vec::new();
            for (compiled, pattern) in patterns {
                for m in compiled.find_all(tokens) {
                    all.push((m.term_start, m.term_end, pattern));
                }
            }
            all.sort_by_key(|(start, end, _)| (*start, *end));
            let mut cursor = 0;
            for (start, end, pattern) in all {
                if start < cursor {
                    continue;
                }
                cursor = end;
                self.process_span(&mut outcome, pattern, id, tokens, start, end, true);
            }
        }
        Ok(outcome)
    }

    fn sentence<'a>(&self, corpus: &'a Corpus, id: &SentenceId) -> Result<&'a [Token]> {
        corpus.get(id).ok_or_else(|| {
            SeedlingError::Corpus(format!("sentence '{}' not present in corpus", id))
        })
    }

    /// Walk one matched target span and fold it into the outcome
    ///
    /// `require_unlabeled` is the combined variant's stricter acceptance
    /// condition.
    #[allow(clippy::too_many_arguments)]
    fn process_span(
        &self,
        outcome: &mut MatchOutcome,
        pattern: &SurfacePattern,
        id: &SentenceId,
        tokens: &[Token],
        start: usize,
        end: usize,
        require_unlabeled: bool,
    ) {
        let label = self.options.label.as_str();
        let (mut s, mut e) = (start, end);
        if self.options.club_neighboring_labeled_words {
            while s > 0 && tokens[s - 1].is_labeled(label) {
                s -= 1;
            }
            while e < tokens.len() && tokens[e].is_labeled(label) {
                e += 1;
            }
        }

        let pattern_id = self.pattern_bank.id_for(pattern);
        let sentence_notes = outcome.annotations.entry(id.clone()).or_default();

        let mut do_not_use = false;
        let mut any_labeled = false;
        let mut any_unlabeled = false;
        let mut kept = Vec::with_capacity(e - s);
        let mut words = Vec::new();
        let mut lemmas = Vec::new();

        for (i, token) in tokens[s..e].iter().enumerate().map(|(k, t)| (s + k, t)) {
            let note = sentence_notes.entry(i).or_default();
            note.matched = true;
            note.patterns.insert(pattern_id);

            if token.is_labeled(label) {
                any_labeled = true;
            } else {
                any_unlabeled = true;
            }

            // Ignore-listed tokens poison the candidate but the walk (and
            // its marking) continues.
            if let Some(re) = &self.options.ignore_word_regex {
                if re.is_match(&token.word) {
                    do_not_use = true;
                }
            }
            let is_stop = self.stop_words.contains(&token.word.to_lowercase());
            if is_stop && self.options.discard_phrases_with_stopwords {
                do_not_use = true;
            }
            if is_stop && self.options.remove_stopwords_from_phrases {
                kept.push(false);
                continue;
            }
            kept.push(true);
            words.push(token.word.clone());
            lemmas.push(token.lemma.clone());
        }

        // A single omitted token strictly between two kept ones is a
        // malformed extraction; larger or edge gaps are fine.
        if has_isolated_gap(&kept) {
            return;
        }
        if do_not_use || words.is_empty() {
            return;
        }
        if require_unlabeled && !any_unlabeled {
            return;
        }

        let phrase = self
            .phrase_bank
            .intern(&words.join(" "), &lemmas.join(" "));
        outcome
            .counts
            .entry(pattern.clone())
            .or_default()
            .increment(phrase.clone(), 1.0);
        outcome
            .matched_spans
            .entry(pattern.clone())
            .or_default()
            .push(MatchedSpan {
                sentence: id.clone(),
                start: s,
                end: e - 1,
            });
        if !any_labeled {
            outcome.newly_labeled.insert(phrase);
        }
    }
}

/// The kept-omit-kept interior gap test
///
/// Returns true iff some position `i` with `0 < i < len-1` is omitted
/// while both neighbors are kept. Deliberately narrow: wider
/// interior gaps and gaps touching either edge are allowed.
pub fn has_isolated_gap(kept: &[bool]) -> bool {
    kept.windows(3)
        .any(|w| w[0] && !w[1] && w[2])
}
