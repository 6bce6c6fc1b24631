//! Code-sample conventions: canonical base URL, canonical auth header, and
//! no real-looking credentials. Each check runs only when its canonical value
//! is configured.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::Conventions;
use crate::contract;
use crate::model::{CodeBlock, DocumentSet};
use crate::types::{Finding, Location, Rule};

/// Absolute http(s) URLs.
#[allow(clippy::expect_used, reason = "literal regex, checked by tests")]
static URL: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r#"https?://[^\s"'`<>)\]]+"#).expect("valid regex"));

/// Characters of a secret left visible in messages.
const VISIBLE_SECRET_CHARS: usize = 6;

/// Compiled view of the conventions for one run.
struct Checker<'a> {
    /// Lowercased `scheme://host[:port]` of the canonical base URL.
    canonical_origin: Option<String>,
    /// Configured conventions.
    conventions: &'a Conventions,
    /// Matches any recognized auth header used as a header; group 1 is the name.
    header: Option<Regex>,
    /// Path prefixes that mark a URL as an API call.
    prefixes: &'a [String],
}

impl Checker<'_> {
    /// Headers other than the canonical one.
    fn check_auth_headers(&self, slug: &str, block: &CodeBlock, findings: &mut Vec<Finding>) {
        let (Some(header), Some(canonical)) = (&self.header, &self.conventions.auth_header) else {
            return;
        };
        let mut reported = HashSet::new();
        for cap in header.captures_iter(&block.text) {
            let Some(name) = cap.get(1) else {
                continue;
            };
            if name.as_str().eq_ignore_ascii_case(canonical) {
                continue;
            }
            let line = block.line_of(name.start());
            if !reported.insert((line, name.as_str().to_ascii_lowercase())) {
                continue;
            }
            findings.push(Finding::new(
                Rule::ConventionAuthHeader,
                Location::at(slug, line),
                format!("sample authenticates with `{}`; the canonical header is `{canonical}`", name.as_str()),
            ));
        }
    }

    /// API URLs on an origin other than the canonical one.
    fn check_base_urls(&self, slug: &str, block: &CodeBlock, findings: &mut Vec<Finding>) {
        let Some(canonical) = &self.canonical_origin else {
            return;
        };
        for found in URL.find_iter(&block.text) {
            let url = found.as_str();
            let Some((origin, path)) = split_origin(url) else {
                continue;
            };
            if &origin == canonical || self.is_placeholder(&origin) || !contract::is_api_path(path, self.prefixes) {
                continue;
            }
            findings.push(Finding::new(
                Rule::ConventionBaseUrl,
                Location::at(slug, block.line_of(found.start())),
                format!("sample calls `{url}`; the canonical base URL is `{canonical}`"),
            ));
        }
    }

    /// Secret-shaped values that are not placeholders.
    fn check_credentials(&self, slug: &str, block: &CodeBlock, findings: &mut Vec<Finding>) {
        for pattern in &self.conventions.secret_patterns {
            for found in pattern.find_iter(&block.text) {
                if self.is_placeholder(found.as_str()) {
                    continue;
                }
                findings.push(Finding::new(
                    Rule::ConventionLiteralCredential,
                    Location::at(slug, block.line_of(found.start())),
                    format!(
                        "sample contains what looks like a real credential (`{}`); use a placeholder such as `YOUR_API_KEY`",
                        mask(found.as_str())
                    ),
                ));
            }
        }
    }

    /// Whether text contains a placeholder marker.
    fn is_placeholder(&self, text: &str) -> bool {
        return self.conventions.placeholders.iter().any(|marker| return text.contains(marker.as_str()));
    }
}

/// Regex matching any of `names` where a header is set: `-H "Name:`,
/// `"Name":`, `Name:` at line start, `{ Name: ... }`.
fn header_regex(names: &[String]) -> Option<Regex> {
    if names.is_empty() {
        return None;
    }
    let alternatives: Vec<String> = names.iter().map(|n| return regex::escape(n)).collect();
    let pattern = format!(r#"(?im)(?:^|[\s"'{{,(\[])({})["']?\s*:"#, alternatives.join("|"));
    return match Regex::new(&pattern) {
        Ok(regex) => Some(regex),
        Err(e) => {
            tracing::warn!(error = %e, "auth header pattern rejected; header check skipped");
            None
        },
    };
}

/// Keep the first few characters of a secret, star the rest.
fn mask(secret: &str) -> String {
    let visible: String = secret.chars().take(VISIBLE_SECRET_CHARS).collect();
    return format!("{visible}****");
}

/// `(scheme://host[:port] lowercased, path)` of an absolute URL.
fn split_origin(url: &str) -> Option<(String, &str)> {
    let (scheme, rest) = url.split_once("://")?;
    let cut = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let host = rest.get(..cut)?;
    let path = rest.get(cut..).unwrap_or("");
    let path = if path.is_empty() { "/" } else { path };
    return Some((format!("{}://{}", scheme.to_ascii_lowercase(), host.to_ascii_lowercase()), path));
}

/// Run every configured convention check over every code block.
pub fn validate(set: &DocumentSet, conventions: &Conventions, prefixes: &[String]) -> Vec<Finding> {
    let checker = Checker {
        canonical_origin: conventions
            .base_url
            .as_deref()
            .and_then(|base| return split_origin(base).map(|(origin, _)| return origin)),
        conventions,
        header: conventions.auth_header.as_ref().and_then(|_| return header_regex(&conventions.auth_headers)),
        prefixes,
    };
    let mut findings = Vec::new();

    for page in set.pages.values() {
        for block in &page.code_blocks {
            checker.check_base_urls(&page.path, block, &mut findings);
            checker.check_auth_headers(&page.path, block, &mut findings);
            checker.check_credentials(&page.path, block, &mut findings);
        }
    }

    tracing::info!(findings = findings.len(), "conventions checked");
    return findings;
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::config::Config;
    use crate::types::Severity;

    fn conventions(toml: &str) -> Conventions {
        return Config::parse(Path::new("/project"), toml).unwrap().conventions;
    }

    fn check(conventions: &Conventions, body: &str) -> Vec<Finding> {
        let page = crate::loader::parse_page(Path::new("api/auth.md"), body, "/").unwrap();
        let mut set = DocumentSet::default();
        set.pages.insert(page.path.clone(), page);
        return validate(&set, conventions, &["/v1".to_string()]);
    }

    const CANONICAL: &str = "[conventions]\nbase_url = \"https://api.solidrust.ai\"\nauth_header = \"Authorization\"\n";

    #[test]
    fn non_canonical_origin_warns() {
        let body = "```bash\ncurl https://artemis.hq.solidrust.net/v1/models\ncurl https://api.solidrust.ai/v1/models\ncurl https://github.com/org/repo\n```\n";
        let findings = check(&conventions(CANONICAL), body);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule, Rule::ConventionBaseUrl);
        assert_eq!(findings[0].severity, Severity::Warning);
        assert_eq!(findings[0].location, Location::at("api/auth", 2));
    }

    #[test]
    fn non_canonical_auth_header_warns() {
        let body = "```bash\ncurl https://api.solidrust.ai/v1/models -H \"X-API-Key: $KEY\"\n```\n\n```python\nheaders = {\"Authorization\": f\"Bearer {key}\"}\n```\n";
        let findings = check(&conventions(CANONICAL), body);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule, Rule::ConventionAuthHeader);
        assert!(findings[0].message.contains("X-API-Key"));
    }

    #[test]
    fn unconfigured_checks_are_skipped() {
        let body = "```bash\ncurl https://elsewhere.example/v1/models -H \"X-API-Key: $KEY\"\n```\n";
        assert!(check(&conventions(""), body).is_empty());
    }

    #[test]
    fn real_looking_key_is_error_placeholder_is_not() {
        let body = "```bash\nexport OPENAI_API_KEY=sk-live0123456789abcdefghijkl\nexport OTHER=sk-YOUR_KEY_GOES_HERE_0123456789\n```\n";
        let findings = check(&conventions(""), body);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule, Rule::ConventionLiteralCredential);
        assert_eq!(findings[0].severity, Severity::Error);
        assert!(findings[0].message.contains("sk-liv****"));
        assert!(!findings[0].message.contains("abcdef"));
    }

    #[test]
    fn origin_split() {
        assert_eq!(
            split_origin("HTTPS://API.Example.com:8443/v1/x"),
            Some(("https://api.example.com:8443".to_string(), "/v1/x"))
        );
        assert_eq!(split_origin("https://api.example.com"), Some(("https://api.example.com".to_string(), "/")));
    }
}
