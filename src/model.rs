//! In-memory document model produced by the loader. Immutable after loading.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use crate::error::LoadError;

/// A fenced or indented code block, tagged with its declared language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// Info-string language, lowercased. `None` for untagged blocks.
    pub language: Option<String>,
    /// One-based source line of the first line of `text`.
    pub line: u32,
    /// Raw block content without fences.
    pub text: String,
}

impl CodeBlock {
    /// One-based source line of a byte offset into `text`.
    pub fn line_of(&self, offset: usize) -> u32 {
        let before = self.text.get(..offset).unwrap_or(&self.text);
        let rows = u32::try_from(before.matches('\n').count()).unwrap_or(u32::MAX);
        return self.line.saturating_add(rows);
    }
}

/// One documentation source file.
#[derive(Debug, Clone)]
pub struct DocumentPage {
    /// Code blocks in source order.
    pub code_blocks: Vec<CodeBlock>,
    /// `description` frontmatter, if present and non-empty.
    pub description: Option<String>,
    /// `draft: true` in frontmatter.
    pub draft: bool,
    /// All frontmatter keys, including ones nothing validates.
    pub frontmatter: BTreeMap<String, serde_yaml::Value>,
    /// Headings in source order with computed anchors.
    pub headings: Vec<Heading>,
    /// Outbound references in source order.
    pub links: Vec<Link>,
    /// Logical slug, unique within the document set.
    pub path: String,
    /// Source file relative to the docs directory.
    pub source: PathBuf,
    /// `title` frontmatter, if present and non-empty.
    pub title: Option<String>,
}

impl DocumentPage {
    /// Set of heading anchors for O(1) existence checks.
    pub fn anchors(&self) -> HashSet<&str> {
        return self.headings.iter().map(|h| return h.anchor.as_str()).collect();
    }
}

/// The loaded documentation set plus the failures encountered while loading it.
#[derive(Debug, Default)]
pub struct DocumentSet {
    /// Per-file failures; each becomes one finding.
    pub errors: Vec<LoadError>,
    /// Pages keyed by slug.
    pub pages: BTreeMap<String, DocumentPage>,
    /// Navigation declaration in declared order.
    pub sidebar: Vec<SidebarEntry>,
}

/// A heading with its page-unique anchor id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    /// Slug-style anchor id, unique within the page.
    pub anchor: String,
    /// Markup level, 1 through 6.
    pub level: u8,
    /// One-based line in the source file.
    pub line: u32,
    /// Heading text as written.
    pub text: String,
}

/// An outbound reference found in page prose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// One-based line in the source file.
    pub line: u32,
    /// Target exactly as written.
    pub raw: String,
    /// Classified target.
    pub target: LinkTarget,
}

/// Where a link points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// Non-page file or a route outside the docs; recorded, never validated.
    Asset {
        /// Normalized path.
        path: String,
    },
    /// URL with a scheme; only checked in network mode.
    External {
        /// The URL as written.
        url: String,
    },
    /// Another page of the set, optionally at an anchor.
    Internal {
        /// Fragment without the `#`.
        anchor: Option<String>,
        /// Target page slug.
        slug: String,
    },
}

/// Declares that a slug should exist and be reachable from navigation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SidebarEntry {
    /// Navigation group (one group is one navigation tree).
    #[serde(default)]
    pub group: String,
    /// Display label.
    #[serde(default)]
    pub label: String,
    /// Target page slug.
    pub slug: String,
}
