//! Surface-pattern generation around a token position
//!
//! For every window size from `min_window` to `max_window` the factory
//! walks outward from the target token on both sides, building context
//! restriction lists under the configured policy, and instantiates one
//! surface pattern per accepted (side combination, target template) pair.
//! No ranking happens here; the factory's output is the raw candidate set.

use crate::config::PatternConfig;
use crate::error::{Result, SeedlingError};
use crate::pattern::restriction::{Restriction, Wildcard};
use crate::pattern::surface::SurfacePattern;
use crate::pattern::token::PatternToken;
use crate::types::{Token, BACKGROUND_LABEL};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Tokens with a URL-like prefix void the whole context side they appear in
static URL_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:https?://|www\.)").expect("url prefix regex"));

#[derive(Clone, Copy, PartialEq)]
enum Side {
    Prev,
    Next,
}

/// Context tokens collected while walking outward on one side
struct SideWalk {
    /// Restrictions in nearest-to-target-first order
    nodes: Vec<Restriction>,
    num_stop: usize,
    num_non_stop: usize,
}

/// Generates candidate surface patterns for token positions
pub struct SurfacePatternFactory {
    config: PatternConfig,
    label_classes: Vec<String>,
    stop_words: Arc<HashSet<String>>,
    fill_words: Arc<HashSet<String>>,
}

impl SurfacePatternFactory {
    /// Build a factory; the configuration is validated fail-fast
    pub fn new(
        config: PatternConfig,
        label_classes: Vec<String>,
        stop_words: Arc<HashSet<String>>,
        fill_words: Arc<HashSet<String>>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            label_classes,
            stop_words,
            fill_words,
        })
    }

    pub fn config(&self) -> &PatternConfig {
        &self.config
    }

    /// All valid surface patterns for the token at `i`, deduplicated by
    /// structural equality across window sizes
    pub fn patterns_for_token(
        &self,
        tokens: &[Token],
        i: usize,
    ) -> Result<HashSet<SurfacePattern>> {
        if i >= tokens.len() {
            return Err(SeedlingError::Corpus(format!(
                "token index {} out of bounds for sentence of length {}",
                i,
                tokens.len()
            )));
        }
        let targets = self.target_templates(&tokens[i])?;
        let mut patterns = HashSet::new();

        for w in self.config.min_window..=self.config.max_window {
            let prev = self.accepted_side(tokens, i, w, Side::Prev)?;
            let next = self.accepted_side(tokens, i, w, Side::Next)?;
            for target in &targets {
                if let Some(prev) = &prev {
                    patterns.insert(SurfacePattern::new(
                        Some(prev.clone()),
                        target.clone(),
                        None,
                    )?);
                }
                if let Some(next) = &next {
                    patterns.insert(SurfacePattern::new(
                        None,
                        target.clone(),
                        Some(next.clone()),
                    )?);
                }
                if let (Some(prev), Some(next)) = (&prev, &next) {
                    patterns.insert(SurfacePattern::new(
                        Some(prev.clone()),
                        target.clone(),
                        Some(next.clone()),
                    )?);
                }
            }
        }
        debug!(
            token = %tokens[i].word,
            count = patterns.len(),
            "generated candidate patterns"
        );
        Ok(patterns)
    }

    /// Patterns for every token position in a sentence
    pub fn patterns_for_sentence(
        &self,
        tokens: &[Token],
    ) -> Result<HashMap<usize, HashSet<SurfacePattern>>> {
        (0..tokens.len())
            .map(|i| Ok((i, self.patterns_for_token(tokens, i)?)))
            .collect()
    }

    /// Target templates per configuration: POS-restricted, unrestricted, or both
    fn target_templates(&self, token: &Token) -> Result<Vec<PatternToken>> {
        let ner = if self.config.use_ner_restriction {
            if !token.has_ner() {
                return Err(SeedlingError::config(format!(
                    "NER restriction requested but token '{}' carries no NER tag",
                    token.word
                )));
            }
            Some(token.ner.clone())
        } else {
            None
        };
        let parent = if self.config.use_parse_parent {
            match &token.parent {
                Some(p) => Some(p.clone()),
                None => {
                    return Err(SeedlingError::config(format!(
                        "parse-parent restriction requested but token '{}' has no parse parent",
                        token.word
                    )))
                }
            }
        } else {
            None
        };

        let mut targets = Vec::new();
        if self.config.use_pos_tag {
            targets.push(PatternToken::new(
                Some(coarse_tag(&token.tag)),
                ner.clone(),
                parent.clone(),
                self.config.num_words_compound,
                self.config.compounding,
            ));
        }
        if self.config.add_without_pos {
            targets.push(PatternToken::new(
                None,
                ner,
                parent,
                self.config.num_words_compound,
                self.config.compounding,
            ));
        }
        Ok(targets)
    }

    /// Collect, vet and glue one side's context for window size `w`
    ///
    /// Returns `None` when the side is rejected (URL contamination, too
    /// short, pure function words below the stop-word threshold, or a
    /// non-ASCII rendering).
    fn accepted_side(
        &self,
        tokens: &[Token],
        i: usize,
        w: usize,
        side: Side,
    ) -> Result<Option<Vec<Restriction>>> {
        let walk = match self.walk_side(tokens, i, w, side)? {
            Some(walk) => walk,
            None => return Ok(None),
        };
        if walk.nodes.is_empty() || walk.nodes.len() < self.config.min_window {
            return Ok(None);
        }
        // Patterns built purely from function words are only informative
        // when they are long enough.
        if walk.num_non_stop == 0 && walk.num_stop <= self.config.min_stopwords {
            return Ok(None);
        }
        if walk.nodes.iter().any(|r| !r.canonical().is_ascii()) {
            return Ok(None);
        }
        Ok(Some(self.glue(walk.nodes, side)))
    }

    /// Walk outward from `i`, skipping fillers, producing restrictions in
    /// nearest-first order; a URL-prefixed token voids the whole side
    fn walk_side(
        &self,
        tokens: &[Token],
        i: usize,
        w: usize,
        side: Side,
    ) -> Result<Option<SideWalk>> {
        let mut walk = SideWalk {
            nodes: Vec::new(),
            num_stop: 0,
            num_non_stop: 0,
        };
        let mut j = i as isize;
        loop {
            j += match side {
                Side::Prev => -1,
                Side::Next => 1,
            };
            if j < 0 || j as usize >= tokens.len() || walk.nodes.len() == w {
                break;
            }
            let token = &tokens[j as usize];
            let lowered = token.word.to_lowercase();
            if URL_PREFIX.is_match(&token.word) {
                return Ok(None);
            }
            // Fillers don't count against the window; glue wildcards absorb
            // them at match time.
            if self.fill_words.contains(&lowered) {
                continue;
            }
            walk.nodes.push(self.context_restriction(token)?);
            if self.stop_words.contains(&lowered) {
                walk.num_stop += 1;
            } else {
                walk.num_non_stop += 1;
            }
        }
        Ok(Some(walk))
    }

    /// Restriction for one context token: label abstraction always wins
    /// over the literal surface form
    fn context_restriction(&self, token: &Token) -> Result<Restriction> {
        for class in &self.label_classes {
            let value = token.label(class).ok_or_else(|| {
                SeedlingError::Corpus(format!(
                    "token '{}' is missing tracked label class '{}'",
                    token.word, class
                ))
            })?;
            if value != BACKGROUND_LABEL {
                return Ok(Restriction::attribute(class.clone(), value));
            }
        }
        if token.has_ner() {
            return Ok(Restriction::attribute("ner", token.ner.clone()));
        }
        let literal = if self.config.match_lowercase {
            token.word.to_lowercase()
        } else {
            token.word.clone()
        };
        Ok(Restriction::attribute("word", literal))
    }

    /// Interleave wildcard glue and emit the side in sentence order
    fn glue(&self, nearest_first: Vec<Restriction>, side: Side) -> Vec<Restriction> {
        let mut out = Vec::with_capacity(nearest_first.len() * 2 + 2);
        match side {
            Side::Prev => {
                // Sentence order: outermost token first, target edge last.
                for node in nearest_first.into_iter().rev() {
                    out.push(node);
                    if self.config.use_fillers {
                        out.push(Restriction::wildcard(Wildcard::Filler));
                    }
                }
                if self.config.use_stop_wildcard {
                    out.push(Restriction::wildcard(Wildcard::Stopword));
                }
            }
            Side::Next => {
                if self.config.use_stop_wildcard {
                    out.push(Restriction::wildcard(Wildcard::Stopword));
                }
                for node in nearest_first {
                    if self.config.use_fillers {
                        out.push(Restriction::wildcard(Wildcard::Filler));
                    }
                    out.push(node);
                }
            }
        }
        out
    }
}

/// Coarse POS class: the first two characters of the fine tag
fn coarse_tag(tag: &str) -> String {
    tag.chars().take(2).collect()
}
