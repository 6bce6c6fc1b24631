//! Link extraction from page prose and classification of link targets.

use std::sync::LazyLock;

use regex::Regex;

use crate::markdown::Blocks;
use crate::model::{Link, LinkTarget};

/// `<https://...>` autolinks.
#[allow(clippy::expect_used, reason = "literal regex, checked by tests")]
static AUTOLINK: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r"<((?:https?|mailto):[^>\s]+)>").expect("valid regex"));

/// `href="..."` attributes in inline HTML and MDX components.
#[allow(clippy::expect_used, reason = "literal regex, checked by tests")]
static HREF: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r#"\bhref=["']([^"']+)["']"#).expect("valid regex"));

/// `[label](target "title")` inline links; group 1 is `!` for images.
#[allow(clippy::expect_used, reason = "literal regex, checked by tests")]
static INLINE: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r#"(!?)\[(?:[^\]\\]|\\.)*\]\(\s*<?([^)\s>]+)>?(?:\s+["'(][^)]*)?\)"#)
        .expect("valid regex");
});

/// Inline code spans, blanked out before matching.
#[allow(clippy::expect_used, reason = "literal regex, checked by tests")]
static INLINE_CODE: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r"`+[^`]*`+").expect("valid regex"));

/// `[id]: target` reference definitions.
#[allow(clippy::expect_used, reason = "literal regex, checked by tests")]
static REFERENCE_DEF: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r"^\s{0,3}\[[^\]]+\]:\s*<?([^\s>]+)>?").expect("valid regex");
});

/// Where a page lives, for resolving its relative links.
#[derive(Debug, Clone, Copy)]
pub struct PageContext<'a> {
    /// URL prefix of the docs site, in `/x/` form or `/`.
    pub base_path: &'a str,
    /// Slug of the page containing the links.
    pub slug: &'a str,
    /// Directory of the source file relative to the docs root, `/`-separated.
    pub source_dir: &'a str,
}

/// Classify a raw link target relative to the page it appears on.
pub fn classify(raw: &str, page: &PageContext<'_>) -> LinkTarget {
    if has_uri_scheme(raw) {
        return LinkTarget::External { url: raw.to_string() };
    }
    if let Some(rest) = raw.strip_prefix("//") {
        return LinkTarget::External { url: format!("https://{rest}") };
    }

    let (path_and_query, anchor) = match raw.split_once('#') {
        Some((p, a)) if !a.is_empty() => (p, Some(a.to_string())),
        Some((p, _)) => (p, None),
        None => (raw, None),
    };
    let path = path_and_query.split('?').next().unwrap_or("");

    if path.is_empty() {
        return LinkTarget::Internal { anchor, slug: page.slug.to_string() };
    }

    let joined = if let Some(absolute) = path.strip_prefix('/') {
        let Some(inside) = strip_base_path(absolute, page.base_path) else {
            return LinkTarget::Asset { path: path.to_string() };
        };
        inside.to_string()
    } else if page.source_dir.is_empty() {
        path.to_string()
    } else {
        format!("{}/{path}", page.source_dir)
    };

    let normalized = normalize_segments(&joined);
    if is_asset(&normalized) {
        return LinkTarget::Asset { path: normalized };
    }
    return LinkTarget::Internal { anchor, slug: slug_from_path(&normalized) };
}

/// Extract every link from page prose, skipping code blocks and inline code.
pub fn extract(body: &str, line_offset: u32, blocks: &Blocks, page: &PageContext<'_>) -> Vec<Link> {
    let mut links = Vec::new();

    for (row, line) in body.lines().enumerate() {
        if blocks.in_code(row) {
            continue;
        }
        let line_no = u32::try_from(row)
            .unwrap_or(u32::MAX)
            .saturating_add(line_offset)
            .saturating_add(1);
        for raw in targets_in_line(line) {
            let target = classify(&raw, page);
            links.push(Link { line: line_no, raw, target });
        }
    }

    return links;
}

/// The part of an absolute link (without its leading `/`) under `base_path`.
/// The base path itself, with or without its trailing slash, is the site root.
fn strip_base_path<'a>(absolute: &'a str, base_path: &str) -> Option<&'a str> {
    let base = base_path.trim_start_matches('/');
    if absolute == base.trim_end_matches('/') {
        return Some("");
    }
    return absolute.strip_prefix(base);
}

/// Whether a target has a URI scheme such as `https:` or `mailto:`.
fn has_uri_scheme(target: &str) -> bool {
    let Some((scheme, _)) = target.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_alphabetic() {
        return false;
    }
    return chars.all(|c| return c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-'));
}

/// A normalized path with a non-page file extension is an asset.
fn is_asset(path: &str) -> bool {
    let last = path.rsplit('/').next().unwrap_or(path);
    let Some((_, ext)) = last.rsplit_once('.') else {
        return false;
    };
    return !matches!(ext.to_ascii_lowercase().as_str(), "md" | "mdx" | "html");
}

/// Collapse `.` and `..` segments without touching the filesystem.
/// Leading `..` that would escape the docs root are dropped.
fn normalize_segments(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {},
            ".." => {
                segments.pop();
            },
            other => segments.push(other),
        }
    }
    return segments.join("/");
}

/// Turn a normalized docs-relative path into a page slug: drop the page
/// extension and a trailing `index`, lowercase. The root page is `index`.
pub fn slug_from_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    let without_ext = [".mdx", ".md", ".html"]
        .iter()
        .find_map(|ext| return trimmed.strip_suffix(ext))
        .unwrap_or(trimmed);
    let without_index = if without_ext == "index" {
        ""
    } else {
        without_ext.strip_suffix("/index").unwrap_or(without_ext)
    };
    if without_index.is_empty() {
        return "index".to_string();
    }
    return without_index.to_lowercase();
}

/// All raw link targets on one prose line, in order of appearance.
fn targets_in_line(line: &str) -> Vec<String> {
    let line = INLINE_CODE.replace_all(line, "");
    let mut found: Vec<(usize, String)> = Vec::new();

    for cap in INLINE.captures_iter(&line) {
        let is_image = cap.get(1).is_some_and(|m| return !m.as_str().is_empty());
        let (Some(whole), Some(target)) = (cap.get(0), cap.get(2)) else {
            continue;
        };
        if is_image {
            continue;
        }
        found.push((whole.start(), target.as_str().to_string()));
    }
    if let Some(target) = REFERENCE_DEF.captures(&line).and_then(|cap| return cap.get(1)) {
        found.push((target.start(), target.as_str().to_string()));
    }
    for regex in [&*AUTOLINK, &*HREF] {
        for cap in regex.captures_iter(&line) {
            if let Some(target) = cap.get(1) {
                found.push((target.start(), target.as_str().to_string()));
            }
        }
    }

    found.sort_by_key(|(pos, _)| return *pos);
    return found.into_iter().map(|(_, target)| return target).collect();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> PageContext<'static> {
        return PageContext { base_path: "/", slug: "api/overview", source_dir: "api" };
    }

    fn internal(slug: &str, anchor: Option<&str>) -> LinkTarget {
        return LinkTarget::Internal { anchor: anchor.map(String::from), slug: slug.to_string() };
    }

    #[test]
    fn absolute_link_with_anchor() {
        assert_eq!(classify("/api/models/#chat-models", &page()), internal("api/models", Some("chat-models")));
    }

    #[test]
    fn relative_file_link() {
        assert_eq!(classify("./models.md#limits", &page()), internal("api/models", Some("limits")));
        assert_eq!(classify("../guides/start", &page()), internal("guides/start", None));
    }

    #[test]
    fn same_page_anchor() {
        assert_eq!(classify("#auth", &page()), internal("api/overview", Some("auth")));
    }

    #[test]
    fn index_pages_collapse() {
        assert_eq!(classify("/", &page()), internal("index", None));
        assert_eq!(classify("/api/index.md", &page()), internal("api", None));
    }

    #[test]
    fn base_path_root_without_trailing_slash() {
        let docs = PageContext { base_path: "/docs/", slug: "api/overview", source_dir: "api" };
        assert_eq!(classify("/docs#intro", &docs), internal("index", Some("intro")));
        assert_eq!(classify("/docs/", &docs), internal("index", None));
        assert_eq!(classify("/docs/api/models", &docs), internal("api/models", None));
        assert!(matches!(classify("/docsearch", &docs), LinkTarget::Asset { .. }));
    }

    #[test]
    fn external_and_assets() {
        assert!(matches!(classify("https://example.com/x", &page()), LinkTarget::External { .. }));
        assert!(matches!(classify("mailto:team@example.com", &page()), LinkTarget::External { .. }));
        assert!(matches!(classify("/images/diagram.png", &page()), LinkTarget::Asset { .. }));
    }

    #[test]
    fn base_path_stripped_and_outside_routes_ignored() {
        let ctx = PageContext { base_path: "/docs/", slug: "api/overview", source_dir: "api" };
        assert_eq!(classify("/docs/api/models", &ctx), internal("api/models", None));
        assert!(matches!(classify("/blog/post", &ctx), LinkTarget::Asset { .. }));
    }

    #[test]
    fn extracts_inline_reference_and_href_links() {
        let line = "See [models](/api/models#chat) and <https://example.com> or <a href=\"/guides/\">x</a>";
        assert_eq!(targets_in_line(line), vec!["/api/models#chat", "https://example.com", "/guides/"]);
        assert_eq!(targets_in_line("[ref]: ./limits.md"), vec!["./limits.md"]);
    }

    #[test]
    fn images_and_inline_code_skipped() {
        assert!(targets_in_line("![diagram](/img/a.png)").is_empty());
        assert!(targets_in_line("Use `[x](y)` syntax").is_empty());
    }

    #[test]
    fn links_in_code_blocks_skipped() {
        let body = "[a](/one)\n```md\n[b](/two)\n```\n[c](/three)\n";
        let blocks = crate::markdown::parse_blocks(std::path::Path::new("t.md"), body, 2).unwrap();
        let links = extract(body, 2, &blocks, &page());
        let raws: Vec<(&str, u32)> = links.iter().map(|l| (l.raw.as_str(), l.line)).collect();
        assert_eq!(raws, vec![("/one", 3), ("/three", 7)]);
    }
}
