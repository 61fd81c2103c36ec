//! Target-position restriction template
//!
//! A [`PatternToken`] describes what the *target* phrase position of a
//! surface pattern may match: an optional coarse POS-tag restriction, an
//! optional NER restriction, an optional parse-parent restriction, and the
//! maximum compound length (how many consecutive tokens the target may
//! span).

use crate::pattern::restriction::AttributeRegistry;

/// Restrictions applied to the target phrase position of a pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PatternToken {
    /// Coarse POS-tag restriction (prefix match at application time)
    pub tag: Option<String>,
    /// NER restriction
    pub ner: Option<String>,
    /// Parse-parent restriction
    pub parent: Option<String>,
    /// Maximum number of tokens a compound target may span
    pub num_words_compound: u32,
}

impl PatternToken {
    /// Build a target template; `num_words_compound` is clamped to 1 when
    /// compounding is disabled
    pub fn new(
        tag: Option<String>,
        ner: Option<String>,
        parent: Option<String>,
        num_words_compound: u32,
        compounding: bool,
    ) -> Self {
        let num_words_compound = if compounding {
            num_words_compound.max(1)
        } else {
            1
        };
        Self {
            tag,
            ner,
            parent,
            num_words_compound,
        }
    }

    /// Number of active restrictions (tag/ner/parent present)
    pub fn restriction_count(&self) -> i32 {
        [self.tag.is_some(), self.ner.is_some(), self.parent.is_some()]
            .iter()
            .filter(|b| **b)
            .count() as i32
    }

    /// Detailed rendering of the target group, e.g. `(?$term [{tag:"NN"}]{1,2})`
    pub fn render_detailed(&self, registry: &AttributeRegistry) -> String {
        let mut parts = Vec::new();
        if let Some(tag) = &self.tag {
            parts.push(format!("{{{}:/{}.*/}}", registry.short_key("tag"), regex::escape(tag)));
        }
        if let Some(ner) = &self.ner {
            parts.push(format!("{{{}:\"{}\"}}", registry.short_key("ner"), regex::escape(ner)));
        }
        if let Some(parent) = &self.parent {
            parts.push(format!(
                "{{{}:\"{}\"}}",
                registry.short_key("parent"),
                regex::escape(parent)
            ));
        }
        let body = if parts.is_empty() {
            "[]".to_string()
        } else {
            format!("[{}]", parts.join(" & "))
        };
        format!("(?$term {}{{1,{}}})", body, self.num_words_compound)
    }

    /// Canonical form used for pattern identity; registry-independent
    pub fn canonical(&self) -> String {
        format!(
            "(term tag:{} ner:{} parent:{} n:{})",
            self.tag.as_deref().unwrap_or("*"),
            self.ner.as_deref().unwrap_or("*"),
            self.parent.as_deref().unwrap_or("*"),
            self.num_words_compound
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compound_clamped_when_disabled() {
        let t = PatternToken::new(Some("NN".into()), None, None, 4, false);
        assert_eq!(t.num_words_compound, 1);
        let t = PatternToken::new(Some("NN".into()), None, None, 4, true);
        assert_eq!(t.num_words_compound, 4);
        // Zero is nonsensical even with compounding on.
        let t = PatternToken::new(None, None, None, 0, true);
        assert_eq!(t.num_words_compound, 1);
    }

    #[test]
    fn test_equality_includes_compound_length() {
        let a = PatternToken::new(Some("NN".into()), None, None, 1, true);
        let b = PatternToken::new(Some("NN".into()), None, None, 2, true);
        assert_ne!(a, b);
        let c = PatternToken::new(Some("NN".into()), None, None, 1, true);
        assert_eq!(a, c);
    }

    #[test]
    fn test_restriction_count() {
        let t = PatternToken::new(Some("NN".into()), Some("PERSON".into()), None, 1, false);
        assert_eq!(t.restriction_count(), 2);
        let bare = PatternToken::new(None, None, None, 1, false);
        assert_eq!(bare.restriction_count(), 0);
    }

    #[test]
    fn test_render_detailed() {
        let registry = AttributeRegistry::new();
        let t = PatternToken::new(Some("NN".into()), None, None, 2, true);
        assert_eq!(t.render_detailed(&registry), "(?$term [{tag:/NN.*/}]{1,2})");
        let bare = PatternToken::new(None, None, None, 1, false);
        assert_eq!(bare.render_detailed(&registry), "(?$term []{1,1})");
    }
}
