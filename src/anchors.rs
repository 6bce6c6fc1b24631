//! Heading anchor ids, computed the way the site renderer does.
//!
//! Base rule: strip inline markdown, lowercase, drop every character that is
//! not alphanumeric, `-` or `_`, and turn each whitespace run into one `-`.
//! Collisions within a page get a numeric suffix: the second `Setup` becomes
//! `setup-1`, the third `setup-2`. A suffixed id that is itself taken keeps
//! counting, so ids stay unique even against literal headings like `Setup 1`.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

/// Inline links and images: keep only the label text.
#[allow(clippy::expect_used, reason = "literal regex, checked by tests")]
static INLINE_LINK: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r"!?\[([^\]]*)\]\([^)]*\)").expect("valid regex"));

/// Inline HTML/JSX tags are not part of the rendered text.
#[allow(clippy::expect_used, reason = "literal regex, checked by tests")]
static INLINE_TAG: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r"</?[A-Za-z][^>]*>").expect("valid regex"));

/// Per-page anchor allocator.
#[derive(Debug, Default)]
pub struct Slugger {
    /// Base slug -> number of times it has been handed out.
    occurrences: HashMap<String, u32>,
}

impl Slugger {
    /// Allocate a unique anchor for a heading. Returns `None` for headings
    /// whose text has no slug characters at all.
    pub fn anchor(&mut self, heading_text: &str) -> Option<String> {
        let base = slugify(&plain_text(heading_text));
        if base.is_empty() {
            return None;
        }

        let mut candidate = base.clone();
        while self.occurrences.contains_key(&candidate) {
            let count = self.occurrences.entry(base.clone()).or_insert(0);
            *count = count.saturating_add(1);
            candidate = format!("{base}-{count}");
        }
        self.occurrences.insert(candidate.clone(), 0);
        return Some(candidate);
    }
}

/// Reduce inline markdown to the text a reader would see.
pub fn plain_text(markdown: &str) -> String {
    let without_links = INLINE_LINK.replace_all(markdown, "$1");
    let without_tags = INLINE_TAG.replace_all(&without_links, "");
    return without_tags
        .chars()
        .filter(|c| return !matches!(c, '`' | '*'))
        .collect();
}

/// Convert heading text to an anchor id, without collision handling.
pub fn slugify(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut pending_hyphen = false;

    for c in text.trim().chars() {
        if c.is_whitespace() {
            pending_hyphen = true;
            continue;
        }
        if !(c.is_alphanumeric() || c == '-' || c == '_') {
            continue;
        }
        if pending_hyphen {
            result.push('-');
            pending_hyphen = false;
        }
        result.extend(c.to_lowercase());
    }
    return result;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_heading() {
        assert_eq!(slugify("Chat Models"), "chat-models");
    }

    #[test]
    fn punctuation_is_stripped() {
        assert_eq!(slugify("What's New?"), "whats-new");
        assert_eq!(slugify("Step 1: Install"), "step-1-install");
    }

    #[test]
    fn whitespace_runs_collapse() {
        assert_eq!(slugify("  Hello   World  "), "hello-world");
    }

    #[test]
    fn hyphens_and_underscores_kept() {
        assert_eq!(slugify("max_tokens - limits"), "max_tokens---limits");
    }

    #[test]
    fn unicode_letters_kept() {
        assert_eq!(slugify("Überblick"), "überblick");
    }

    #[test]
    fn inline_markup_removed() {
        assert_eq!(plain_text("The `model` [field](#x) **matters**"), "The model field matters");
    }

    #[test]
    fn collisions_get_numeric_suffix() {
        let mut slugger = Slugger::default();
        assert_eq!(slugger.anchor("Setup").as_deref(), Some("setup"));
        assert_eq!(slugger.anchor("Setup").as_deref(), Some("setup-1"));
        assert_eq!(slugger.anchor("Setup").as_deref(), Some("setup-2"));
    }

    #[test]
    fn suffix_skips_literal_collision() {
        let mut slugger = Slugger::default();
        assert_eq!(slugger.anchor("Setup 1").as_deref(), Some("setup-1"));
        assert_eq!(slugger.anchor("Setup").as_deref(), Some("setup"));
        assert_eq!(slugger.anchor("Setup").as_deref(), Some("setup-2"));
    }

    #[test]
    fn empty_heading_has_no_anchor() {
        let mut slugger = Slugger::default();
        assert_eq!(slugger.anchor("???"), None);
    }
}
