//! Core data types for the seedling pattern engine
//!
//! This module defines the corpus-side data structures the engine consumes
//! and produces: sentence identifiers, annotated tokens, the corpus map,
//! interned candidate phrases, and the counters used by application and
//! scoring. Tokens are immutable inputs; everything pattern application
//! learns about them is returned as explicit output (see `apply`).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::{Arc, Mutex};

/// Background (unlabeled) value for a label class
pub const BACKGROUND_LABEL: &str = "O";

/// Unique identifier for sentences
///
/// Wraps the upstream annotator's sentence key to provide type safety and
/// prevent mixing sentence ids with other string identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SentenceId(pub String);

impl SentenceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SentenceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SentenceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One annotated corpus token, as produced by the upstream annotator
///
/// `labels` maps a label class name to the token's current label value for
/// that class; [`BACKGROUND_LABEL`] means unlabeled. The engine never
/// mutates tokens: matched-pattern bookkeeping is emitted as
/// [`crate::apply::TokenAnnotations`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Surface form
    pub word: String,
    /// Lemma
    pub lemma: String,
    /// POS tag
    pub tag: String,
    /// NER tag (background is "O")
    pub ner: String,
    /// Parse-parent tag, when a parse is available
    pub parent: Option<String>,
    /// Current label per tracked label class
    pub labels: BTreeMap<String, String>,
}

impl Token {
    /// Construct a token with no labels and no parse parent
    pub fn new(
        word: impl Into<String>,
        lemma: impl Into<String>,
        tag: impl Into<String>,
        ner: impl Into<String>,
    ) -> Self {
        Self {
            word: word.into(),
            lemma: lemma.into(),
            tag: tag.into(),
            ner: ner.into(),
            parent: None,
            labels: BTreeMap::new(),
        }
    }

    /// Set the label for one class, returning self for chaining
    pub fn with_label(mut self, class: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(class.into(), value.into());
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Current label value for a class, if the class is present at all
    pub fn label(&self, class: &str) -> Option<&str> {
        self.labels.get(class).map(|s| s.as_str())
    }

    /// Whether the token carries a non-background label for `class`
    pub fn is_labeled(&self, class: &str) -> bool {
        self.label(class).is_some_and(|v| v != BACKGROUND_LABEL)
    }

    /// Whether the NER tag is non-background
    pub fn has_ner(&self) -> bool {
        !self.ner.is_empty() && self.ner != BACKGROUND_LABEL
    }
}

/// Tokenized corpus: sentence id to token sequence
///
/// Shared across builder workers via `Arc`; sentences are never mutated
/// after construction.
#[derive(Debug, Default, Clone)]
pub struct Corpus {
    sentences: HashMap<SentenceId, Vec<Token>>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: SentenceId, tokens: Vec<Token>) {
        self.sentences.insert(id, tokens);
    }

    pub fn get(&self, id: &SentenceId) -> Option<&[Token]> {
        self.sentences.get(id).map(|v| v.as_slice())
    }

    pub fn ids(&self) -> impl Iterator<Item = &SentenceId> {
        self.sentences.keys()
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }
}

impl FromIterator<(SentenceId, Vec<Token>)> for Corpus {
    fn from_iter<I: IntoIterator<Item = (SentenceId, Vec<Token>)>>(iter: I) -> Self {
        Self {
            sentences: iter.into_iter().collect(),
        }
    }
}

/// A canonicalized phrase + lemma pair extracted by pattern application
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CandidatePhrase {
    pub phrase: String,
    pub lemma: String,
}

impl CandidatePhrase {
    pub fn new(phrase: impl Into<String>, lemma: impl Into<String>) -> Self {
        Self {
            phrase: phrase.into(),
            lemma: lemma.into(),
        }
    }
}

impl std::fmt::Display for CandidatePhrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.phrase)
    }
}

/// Shared reference to an interned candidate phrase
pub type PhraseRef = Arc<CandidatePhrase>;

/// Concurrent intern table for candidate phrases
///
/// Identical phrase strings observed on any thread collapse to one shared
/// `Arc` instance. Constructed explicitly and injected wherever phrase
/// canonicalization is needed; there is no process-wide singleton.
#[derive(Debug, Default)]
pub struct PhraseBank {
    phrases: Mutex<HashMap<(String, String), PhraseRef>>,
}

impl PhraseBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get-or-create the shared instance for a phrase/lemma pair
    pub fn intern(&self, phrase: &str, lemma: &str) -> PhraseRef {
        let mut map = self.phrases.lock().expect("phrase bank poisoned");
        map.entry((phrase.to_string(), lemma.to_string()))
            .or_insert_with(|| Arc::new(CandidatePhrase::new(phrase, lemma)))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.phrases.lock().expect("phrase bank poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Thin real-valued counter keyed by an arbitrary hashable type
#[derive(Debug, Clone)]
pub struct Counter<T: Eq + Hash> {
    counts: HashMap<T, f64>,
}

impl<T: Eq + Hash> Default for Counter<T> {
    fn default() -> Self {
        Self {
            counts: HashMap::new(),
        }
    }
}

impl<T: Eq + Hash> Counter<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, key: T, by: f64) {
        *self.counts.entry(key).or_insert(0.0) += by;
    }

    pub fn get(&self, key: &T) -> f64 {
        self.counts.get(key).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, key: &T) -> bool {
        self.counts.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &T> {
        self.counts.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&T, f64)> {
        self.counts.iter().map(|(k, v)| (k, *v))
    }

    pub fn total(&self) -> f64 {
        self.counts.values().sum()
    }
}

impl<T: Eq + Hash> FromIterator<(T, f64)> for Counter<T> {
    fn from_iter<I: IntoIterator<Item = (T, f64)>>(iter: I) -> Self {
        Self {
            counts: iter.into_iter().collect(),
        }
    }
}
