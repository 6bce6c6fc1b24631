//! Core domain types shared by every validator: findings and their classification.
use std::fmt;

use serde::Serialize;

/// Which concern a finding belongs to. Declaration order is report order.
#[allow(clippy::arbitrary_source_item_ordering, reason = "declaration order is report order")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// Sidebar, orphan, heading and load problems.
    Structure,
    /// Required frontmatter fields.
    Frontmatter,
    /// Internal and external link integrity.
    Link,
    /// Documentation disagreeing with the API contract.
    ContractDrift,
    /// Code-sample conventions (base URL, auth header, credentials).
    Convention,
}

impl Category {
    /// Stable kebab-case name used in reports.
    pub const fn as_str(self) -> &'static str {
        return match self {
            Self::ContractDrift => "contract-drift",
            Self::Convention => "convention",
            Self::Frontmatter => "frontmatter",
            Self::Link => "link",
            Self::Structure => "structure",
        };
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(self.as_str());
    }
}

/// A single validation result. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    /// Concern this finding belongs to. Equal to the rule's category except for
    /// internal validator faults, which take the failing validator's category.
    pub category: Category,
    /// Where the problem is.
    pub location: Location,
    /// Human-readable description.
    pub message: String,
    /// Stable rule identifier.
    pub rule: Rule,
    /// How serious it is.
    pub severity: Severity,
}

impl Finding {
    /// A validator panicked; report it under the validator's own category.
    pub fn internal_fault(category: Category, validator: &str, detail: &str) -> Self {
        return Self {
            category,
            location: Location::run(),
            message: format!("{validator} validator failed internally: {detail}"),
            rule: Rule::InternalValidatorFault,
            severity: Severity::Error,
        };
    }

    /// Build a finding whose severity and category come from the rule.
    pub fn new(rule: Rule, location: Location, message: impl Into<String>) -> Self {
        return Self {
            category: rule.category(),
            location,
            message: message.into(),
            rule,
            severity: rule.severity(),
        };
    }
}

impl Ord for Finding {
    /// Severity, then category, then location; rule and message break ties so
    /// ordering is total and output is byte-identical across runs.
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        return (
            self.severity,
            self.category,
            &self.location,
            self.rule,
            &self.message,
        )
            .cmp(&(
                other.severity,
                other.category,
                &other.location,
                other.rule,
                &other.message,
            ));
    }
}

impl PartialOrd for Finding {
    /// Delegate to `Ord` implementation.
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        return Some(self.cmp(other));
    }
}

/// Page slug plus an optional one-based line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Location {
    /// One-based line within the source file, when derivable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// Page slug, contract file, or `<run>` for run-wide findings.
    pub slug: String,
}

impl Location {
    /// A specific line on a page.
    pub fn at(slug: impl Into<String>, line: u32) -> Self {
        return Self { line: Some(line), slug: slug.into() };
    }

    /// A whole page or file.
    pub fn page(slug: impl Into<String>) -> Self {
        return Self { line: None, slug: slug.into() };
    }

    /// Run-wide location used for findings with no natural page.
    pub fn run() -> Self {
        return Self::page("<run>");
    }
}

impl Ord for Location {
    /// Slug first, then line, so a page's findings group together.
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        return (&self.slug, self.line).cmp(&(&other.slug, other.line));
    }
}

impl PartialOrd for Location {
    /// Delegate to `Ord` implementation.
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        return Some(self.cmp(other));
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return match self.line {
            None => f.write_str(&self.slug),
            Some(line) => write!(f, "{}:{line}", self.slug),
        };
    }
}

/// Every finding-producing rule. Each rule has exactly one severity and category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rule {
    /// Contract document could not be loaded.
    ContractLoadFailure,
    /// Non-canonical auth header in a code sample.
    ConventionAuthHeader,
    /// Non-canonical API origin in a code sample.
    ConventionBaseUrl,
    /// Real-looking secret in a code sample.
    ConventionLiteralCredential,
    /// Code block mentions the API but no request could be extracted.
    DriftLowConfidence,
    /// Contract endpoint never documented.
    DriftUndocumentedEndpoint,
    /// Documented endpoint absent from the contract.
    DriftUnknownEndpoint,
    /// Documented model identifier absent from the models list.
    DriftUnknownModel,
    /// Documented parameter absent from the endpoint's parameters.
    DriftUnknownParameter,
    /// External URL failed the liveness check.
    ExternalLinkUnreachable,
    /// Page lacks a `description`.
    FrontmatterMissingDescription,
    /// Page lacks a `title`.
    FrontmatterMissingTitle,
    /// Heading jumps more than one level.
    HeadingLevelSkip,
    /// A validator panicked.
    InternalValidatorFault,
    /// Health or models endpoint could not be queried.
    IntrospectionUnavailable,
    /// Internal link anchor does not exist on the target page.
    LinkMissingAnchor,
    /// Internal link target page does not exist.
    LinkMissingPage,
    /// Source file could not be loaded.
    LoadFailure,
    /// Page reachable from no sidebar entry.
    OrphanPage,
    /// Sidebar slug declared twice in one group.
    SidebarDuplicateSlug,
    /// Sidebar slug with no page.
    SidebarMissingPage,
}

impl Rule {
    /// Every rule, in catalog order.
    pub const ALL: [Self; 21] = [
        Self::LoadFailure,
        Self::FrontmatterMissingTitle,
        Self::FrontmatterMissingDescription,
        Self::SidebarMissingPage,
        Self::SidebarDuplicateSlug,
        Self::OrphanPage,
        Self::HeadingLevelSkip,
        Self::LinkMissingPage,
        Self::LinkMissingAnchor,
        Self::ExternalLinkUnreachable,
        Self::ContractLoadFailure,
        Self::DriftUnknownEndpoint,
        Self::DriftUnknownParameter,
        Self::DriftUnknownModel,
        Self::DriftUndocumentedEndpoint,
        Self::DriftLowConfidence,
        Self::IntrospectionUnavailable,
        Self::ConventionBaseUrl,
        Self::ConventionAuthHeader,
        Self::ConventionLiteralCredential,
        Self::InternalValidatorFault,
    ];

    /// Default category for findings of this rule.
    pub const fn category(self) -> Category {
        return match self {
            Self::ContractLoadFailure
            | Self::HeadingLevelSkip
            | Self::InternalValidatorFault
            | Self::LoadFailure
            | Self::OrphanPage
            | Self::SidebarDuplicateSlug
            | Self::SidebarMissingPage => Category::Structure,
            Self::ConventionAuthHeader
            | Self::ConventionBaseUrl
            | Self::ConventionLiteralCredential => Category::Convention,
            Self::DriftLowConfidence
            | Self::DriftUndocumentedEndpoint
            | Self::DriftUnknownEndpoint
            | Self::DriftUnknownModel
            | Self::DriftUnknownParameter
            | Self::IntrospectionUnavailable => Category::ContractDrift,
            Self::ExternalLinkUnreachable | Self::LinkMissingAnchor | Self::LinkMissingPage => {
                Category::Link
            },
            Self::FrontmatterMissingDescription | Self::FrontmatterMissingTitle => {
                Category::Frontmatter
            },
        };
    }

    /// One-line explanation for the rule catalog.
    pub const fn description(self) -> &'static str {
        return match self {
            Self::ContractLoadFailure => "API contract could not be loaded; drift detection skipped",
            Self::ConventionAuthHeader => "code sample uses a non-canonical auth header",
            Self::ConventionBaseUrl => "code sample calls the API through a non-canonical origin",
            Self::ConventionLiteralCredential => "code sample embeds a real-looking credential",
            Self::DriftLowConfidence => "code block mentions the API but no request could be extracted",
            Self::DriftUndocumentedEndpoint => "contract endpoint is never documented",
            Self::DriftUnknownEndpoint => "documented endpoint does not exist in the contract",
            Self::DriftUnknownModel => "documented model id is not served by the platform",
            Self::DriftUnknownParameter => "documented parameter is not declared by the endpoint",
            Self::ExternalLinkUnreachable => "external link failed the liveness check",
            Self::FrontmatterMissingDescription => "page has no `description` frontmatter",
            Self::FrontmatterMissingTitle => "page has no `title` frontmatter",
            Self::HeadingLevelSkip => "heading skips a level",
            Self::InternalValidatorFault => "a validator failed internally",
            Self::IntrospectionUnavailable => "health or models endpoint could not be queried",
            Self::LinkMissingAnchor => "internal link anchor does not exist on the target page",
            Self::LinkMissingPage => "internal link targets a page that does not exist",
            Self::LoadFailure => "documentation source file could not be loaded",
            Self::OrphanPage => "page is not reachable from any sidebar entry",
            Self::SidebarDuplicateSlug => "sidebar group lists the same slug twice",
            Self::SidebarMissingPage => "sidebar entry points at a page that does not exist",
        };
    }

    /// Stable kebab-case identifier.
    pub const fn id(self) -> &'static str {
        return match self {
            Self::ContractLoadFailure => "contract-load-failure",
            Self::ConventionAuthHeader => "convention-auth-header",
            Self::ConventionBaseUrl => "convention-base-url",
            Self::ConventionLiteralCredential => "convention-literal-credential",
            Self::DriftLowConfidence => "drift-low-confidence",
            Self::DriftUndocumentedEndpoint => "drift-undocumented-endpoint",
            Self::DriftUnknownEndpoint => "drift-unknown-endpoint",
            Self::DriftUnknownModel => "drift-unknown-model",
            Self::DriftUnknownParameter => "drift-unknown-parameter",
            Self::ExternalLinkUnreachable => "external-link-unreachable",
            Self::FrontmatterMissingDescription => "frontmatter-missing-description",
            Self::FrontmatterMissingTitle => "frontmatter-missing-title",
            Self::HeadingLevelSkip => "heading-level-skip",
            Self::InternalValidatorFault => "internal-validator-fault",
            Self::IntrospectionUnavailable => "introspection-unavailable",
            Self::LinkMissingAnchor => "link-missing-anchor",
            Self::LinkMissingPage => "link-missing-page",
            Self::LoadFailure => "load-failure",
            Self::OrphanPage => "orphan-page",
            Self::SidebarDuplicateSlug => "sidebar-duplicate-slug",
            Self::SidebarMissingPage => "sidebar-missing-page",
        };
    }

    /// Fixed severity for findings of this rule.
    pub const fn severity(self) -> Severity {
        return match self {
            Self::ContractLoadFailure
            | Self::ConventionLiteralCredential
            | Self::DriftUnknownEndpoint
            | Self::FrontmatterMissingTitle
            | Self::InternalValidatorFault
            | Self::LinkMissingAnchor
            | Self::LinkMissingPage
            | Self::LoadFailure
            | Self::SidebarDuplicateSlug
            | Self::SidebarMissingPage => Severity::Error,
            Self::ConventionAuthHeader
            | Self::ConventionBaseUrl
            | Self::DriftUnknownModel
            | Self::DriftUnknownParameter
            | Self::ExternalLinkUnreachable
            | Self::FrontmatterMissingDescription
            | Self::HeadingLevelSkip
            | Self::IntrospectionUnavailable
            | Self::OrphanPage => Severity::Warning,
            Self::DriftLowConfidence | Self::DriftUndocumentedEndpoint => Severity::Info,
        };
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(self.id());
    }
}

/// Finding severity. Declaration order is report order: errors first.
#[allow(clippy::arbitrary_source_item_ordering, reason = "declaration order is report order")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Fails the run.
    Error,
    /// Reported, never fails the run.
    Warning,
    /// Informational note.
    Info,
}

impl Severity {
    /// Lowercase name used in reports.
    pub const fn as_str(self) -> &'static str {
        return match self {
            Self::Error => "error",
            Self::Info => "info",
            Self::Warning => "warning",
        };
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(self.as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_rule_has_unique_id() {
        let mut ids: Vec<&str> = Rule::ALL.iter().map(|r| r.id()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), Rule::ALL.len());
    }

    #[test]
    fn findings_sort_errors_first() {
        let warning = Finding::new(Rule::OrphanPage, Location::page("a"), "orphan");
        let error = Finding::new(Rule::LinkMissingPage, Location::at("z", 3), "broken");
        let mut findings = vec![warning.clone(), error.clone()];
        findings.sort();
        assert_eq!(findings, vec![error, warning]);
    }

    #[test]
    fn location_display_includes_line() {
        assert_eq!(Location::at("api/overview", 12).to_string(), "api/overview:12");
        assert_eq!(Location::page("api/overview").to_string(), "api/overview");
    }

    #[test]
    fn internal_fault_keeps_validator_category() {
        let finding = Finding::internal_fault(Category::Link, "link graph", "boom");
        assert_eq!(finding.category, Category::Link);
        assert_eq!(finding.severity, Severity::Error);
    }
}
