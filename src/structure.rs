//! Structural validation: frontmatter completeness, sidebar/file consistency,
//! orphan pages and heading levels. Pure functions over the loaded model.

use std::collections::{BTreeMap, HashSet};

use crate::links::slug_from_path;
use crate::model::{DocumentPage, DocumentSet};
use crate::types::{Finding, Location, Rule};

/// Required frontmatter fields.
fn check_frontmatter(page: &DocumentPage, findings: &mut Vec<Finding>) {
    if page.title.is_none() {
        findings.push(Finding::new(
            Rule::FrontmatterMissingTitle,
            Location::page(&page.path),
            format!("`{}` has no `title` in its frontmatter", page.source.display()),
        ));
    }
    if page.description.is_none() {
        findings.push(Finding::new(
            Rule::FrontmatterMissingDescription,
            Location::page(&page.path),
            format!("`{}` has no `description` in its frontmatter", page.source.display()),
        ));
    }
}

/// Headings may go deeper by one level at a time. The page title counts as
/// level 1, so a page may open with `##`.
fn check_heading_levels(page: &DocumentPage, findings: &mut Vec<Finding>) {
    let mut previous: u8 = 1;
    for heading in &page.headings {
        if heading.level > previous.saturating_add(1) {
            findings.push(Finding::new(
                Rule::HeadingLevelSkip,
                Location::at(&page.path, heading.line),
                format!(
                    "heading `{}` is level {} but follows level {previous}",
                    heading.text, heading.level
                ),
            ));
        }
        previous = heading.level;
    }
}

/// Pages absent from every sidebar entry, minus excluded prefixes and drafts.
fn check_orphans(set: &DocumentSet, orphan_exclude: &[String], findings: &mut Vec<Finding>) {
    let listed: HashSet<String> = set.sidebar.iter().map(|e| return slug_from_path(&e.slug)).collect();

    for page in set.pages.values() {
        if listed.contains(&page.path) || page.draft {
            continue;
        }
        if orphan_exclude.iter().any(|prefix| return page.path.starts_with(prefix.as_str())) {
            continue;
        }
        findings.push(Finding::new(
            Rule::OrphanPage,
            Location::page(&page.path),
            format!("`{}` is not listed in any sidebar group", page.path),
        ));
    }
}

/// Sidebar entries must point at pages, and each group lists a slug once.
fn check_sidebar(set: &DocumentSet, findings: &mut Vec<Finding>) {
    let mut seen: BTreeMap<(&str, String), usize> = BTreeMap::new();

    for (index, entry) in set.sidebar.iter().enumerate() {
        let slug = slug_from_path(&entry.slug);
        let position = index.saturating_add(1);

        if !set.pages.contains_key(&slug) {
            findings.push(Finding::new(
                Rule::SidebarMissingPage,
                Location::page(&slug),
                format!("sidebar entry {position} (`{}`) points at `{slug}`, which has no page", entry.label),
            ));
        }

        let group = entry.group.as_str();
        if let Some(first) = seen.get(&(group, slug.clone())) {
            findings.push(Finding::new(
                Rule::SidebarDuplicateSlug,
                Location::page(&slug),
                format!(
                    "sidebar group `{group}` lists `{slug}` twice (entries {first} and {position})"
                ),
            ));
            continue;
        }
        seen.insert((group, slug), position);
    }
}

/// Run every structural check over the document set.
pub fn validate(set: &DocumentSet, orphan_exclude: &[String]) -> Vec<Finding> {
    let mut findings = Vec::new();

    for page in set.pages.values() {
        check_frontmatter(page, &mut findings);
        check_heading_levels(page, &mut findings);
    }
    check_sidebar(set, &mut findings);
    check_orphans(set, orphan_exclude, &mut findings);

    tracing::info!(findings = findings.len(), "structure validated");
    return findings;
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::loader::load_sources;
    use crate::model::SidebarEntry;
    use crate::types::{Category, Severity};

    fn entry(group: &str, slug: &str) -> SidebarEntry {
        return SidebarEntry { group: group.to_string(), label: slug.to_string(), slug: slug.to_string() };
    }

    fn page(path: &str, text: &str) -> (PathBuf, String) {
        return (PathBuf::from(path), text.to_string());
    }

    const COMPLETE: &str = "---\ntitle: T\ndescription: D\n---\n# T\n";

    #[test]
    fn complete_pages_in_sidebar_produce_nothing() {
        let set = load_sources(
            vec![page("api/overview.md", COMPLETE), page("api/models.md", COMPLETE)],
            vec![entry("API", "api/overview"), entry("API", "api/models")],
            "/",
        );
        assert!(validate(&set, &[]).is_empty());
    }

    #[test]
    fn missing_title_is_error_missing_description_is_warning() {
        let set = load_sources(vec![page("a.md", "# A\n")], vec![entry("", "a")], "/");
        let findings = validate(&set, &[]);
        let rules: Vec<(Rule, Severity)> = findings.iter().map(|f| (f.rule, f.severity)).collect();
        assert_eq!(
            rules,
            vec![
                (Rule::FrontmatterMissingTitle, Severity::Error),
                (Rule::FrontmatterMissingDescription, Severity::Warning),
            ]
        );
    }

    #[test]
    fn sidebar_entry_without_page() {
        let set = load_sources(
            vec![page("api/overview.md", COMPLETE)],
            vec![entry("API", "api/overview"), entry("API", "api/nonexistent")],
            "/",
        );
        let findings = validate(&set, &[]);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule, Rule::SidebarMissingPage);
        assert_eq!(findings[0].severity, Severity::Error);
        assert_eq!(findings[0].category, Category::Structure);
    }

    #[test]
    fn orphan_page_warns_once() {
        let set = load_sources(
            vec![page("api/overview.md", COMPLETE), page("orphan/page.md", COMPLETE)],
            vec![entry("API", "api/overview")],
            "/",
        );
        let findings = validate(&set, &[]);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule, Rule::OrphanPage);
        assert_eq!(findings[0].severity, Severity::Warning);
        assert_eq!(findings[0].location.slug, "orphan/page");
    }

    #[test]
    fn orphan_exclusions_and_drafts() {
        let draft = "---\ntitle: T\ndescription: D\ndraft: true\n---\n";
        let set = load_sources(
            vec![page("internal/notes.md", COMPLETE), page("wip.md", draft)],
            Vec::new(),
            "/",
        );
        assert!(validate(&set, &["internal/".to_string()]).is_empty());
    }

    #[test]
    fn duplicate_slug_within_group_only() {
        let set = load_sources(
            vec![page("api/overview.md", COMPLETE)],
            vec![entry("API", "api/overview"), entry("Start", "api/overview"), entry("API", "/api/overview/")],
            "/",
        );
        let findings = validate(&set, &[]);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule, Rule::SidebarDuplicateSlug);
    }

    #[test]
    fn heading_skip_warns() {
        let text = "---\ntitle: T\ndescription: D\n---\n## Setup\n\n#### Details\n\n### Back\n";
        let set = load_sources(vec![page("a.md", text)], vec![entry("", "a")], "/");
        let findings = validate(&set, &[]);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule, Rule::HeadingLevelSkip);
        assert_eq!(findings[0].location.line, Some(7));
    }
}
