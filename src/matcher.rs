//! Bounded token-sequence matching for compiled surface patterns
//!
//! A [`CompiledPattern`] lowers a surface pattern into a flat list of
//! predicate nodes with min/max repetition and a single `$term` target
//! group. Matching walks a token slice with greedy, depth-bounded
//! backtracking: a per-start branch budget caps pathological patterns, and
//! matches are reported non-overlapping, left to right.

use crate::pattern::restriction::{Restriction, RestrictionKind, Wildcard};
use crate::pattern::surface::SurfacePattern;
use crate::pattern::token::PatternToken;
use crate::types::Token;
use std::collections::HashSet;
use std::sync::Arc;

/// Backtracking-step budget per match start position
const BRANCH_BUDGET: u32 = 1_000;

/// Word lists and flags the matcher needs to evaluate wildcard nodes
#[derive(Debug, Clone)]
pub struct MatcherContext {
    pub stop_words: Arc<HashSet<String>>,
    pub fill_words: Arc<HashSet<String>>,
    /// Compare literal word restrictions case-insensitively
    pub match_lowercase: bool,
}

/// One match of a compiled pattern; all bounds are token indices with
/// exclusive ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchSpan {
    pub start: usize,
    pub end: usize,
    /// Bound `$term` group: the target phrase position
    pub term_start: usize,
    pub term_end: usize,
}

#[derive(Debug)]
enum NodePred {
    /// Disjunction of (attribute class, value) restrictions
    Attr(Vec<(String, String)>),
    Filler,
    Stopword,
    /// The `$term` target group
    Target(PatternToken),
}

#[derive(Debug)]
struct MatchNode {
    pred: NodePred,
    min: u32,
    max: u32,
}

/// A surface pattern lowered to matchable predicate nodes
#[derive(Debug)]
pub struct CompiledPattern {
    nodes: Vec<MatchNode>,
    ctx: MatcherContext,
}

impl CompiledPattern {
    /// Lower a surface pattern for matching
    pub fn compile(pattern: &SurfacePattern, ctx: MatcherContext) -> Self {
        let mut nodes = Vec::new();
        if let Some(prev) = pattern.prev_context() {
            for r in prev {
                nodes.push(lower_restriction(r));
            }
        }
        let target = pattern.target();
        nodes.push(MatchNode {
            pred: NodePred::Target(target.clone()),
            min: 1,
            max: target.num_words_compound,
        });
        if let Some(next) = pattern.next_context() {
            for r in next {
                nodes.push(lower_restriction(r));
            }
        }
        Self { nodes, ctx }
    }

    /// All non-overlapping matches in a token slice, left to right
    pub fn find_all(&self, tokens: &[Token]) -> Vec<MatchSpan> {
        let mut matches = Vec::new();
        let mut start = 0;
        while start < tokens.len() {
            let mut budget = BRANCH_BUDGET;
            match self.match_from(tokens, 0, start, None, &mut budget) {
                Some((end, (term_start, term_end))) if end > start => {
                    matches.push(MatchSpan {
                        start,
                        end,
                        term_start,
                        term_end,
                    });
                    start = end;
                }
                _ => start += 1,
            }
        }
        matches
    }

    /// Greedy backtracking walk; returns the match end and the term span
    fn match_from(
        &self,
        tokens: &[Token],
        node_idx: usize,
        pos: usize,
        term: Option<(usize, usize)>,
        budget: &mut u32,
    ) -> Option<(usize, (usize, usize))> {
        if *budget == 0 {
            return None;
        }
        *budget -= 1;
        let node = match self.nodes.get(node_idx) {
            Some(node) => node,
            // All nodes consumed; a valid pattern always has a target.
            None => return term.map(|t| (pos, t)),
        };
        let cap = (node.max as usize).min(tokens.len() - pos) as u32;
        if cap < node.min {
            return None;
        }
        for count in (node.min..=cap).rev() {
            let count = count as usize;
            if !tokens[pos..pos + count]
                .iter()
                .all(|t| self.token_matches(&node.pred, t))
            {
                continue;
            }
            let term = if matches!(node.pred, NodePred::Target(_)) {
                Some((pos, pos + count))
            } else {
                term
            };
            if let Some(found) = self.match_from(tokens, node_idx + 1, pos + count, term, budget) {
                return Some(found);
            }
        }
        None
    }

    fn token_matches(&self, pred: &NodePred, token: &Token) -> bool {
        let lowered = token.word.to_lowercase();
        match pred {
            NodePred::Filler => self.ctx.fill_words.contains(&lowered),
            NodePred::Stopword => self.ctx.stop_words.contains(&lowered),
            NodePred::Attr(pairs) => pairs.iter().any(|(class, value)| match class.as_str() {
                "word" => {
                    if self.ctx.match_lowercase {
                        lowered == value.to_lowercase()
                    } else {
                        token.word == *value
                    }
                }
                "ner" => token.ner == *value,
                "tag" => token.tag.starts_with(value.as_str()),
                // Any other class is a label class.
                _ => token.label(class) == Some(value.as_str()),
            }),
            NodePred::Target(target) => {
                target
                    .tag
                    .as_ref()
                    .is_none_or(|tag| token.tag.starts_with(tag.as_str()))
                    && target.ner.as_ref().is_none_or(|ner| token.ner == *ner)
                    && target
                        .parent
                        .as_ref()
                        .is_none_or(|p| token.parent.as_deref() == Some(p.as_str()))
            }
        }
    }
}

fn lower_restriction(r: &Restriction) -> MatchNode {
    let (min, max) = r.occurrence();
    let pred = match r.kind() {
        RestrictionKind::Or(set) => NodePred::Attr(set.iter().cloned().collect()),
        RestrictionKind::Wildcard(Wildcard::Filler) => NodePred::Filler,
        RestrictionKind::Wildcard(Wildcard::Stopword) => NodePred::Stopword,
    };
    MatchNode { pred, min, max }
}
