//! Markdown diagnostics for fatal errors, printed to stderr.

use std::fmt::Write as _;
use std::io::IsTerminal as _;
use std::path::Path;

use crate::error::{ContractLoadError, Error};

/// ANSI bold.
const BOLD: &str = "\x1b[1m";

/// Most suggestions listed for a missing page.
const MAX_SUGGESTIONS: usize = 5;

/// ANSI reset.
const RESET: &str = "\x1b[0m";

/// Slugs that look like `wanted`: same last segment, or containing it.
pub fn closest_slugs<'a>(wanted: &str, slugs: impl IntoIterator<Item = &'a String>) -> Vec<String> {
    let wanted = wanted.trim_matches('/').to_ascii_lowercase();
    let leaf = wanted.rsplit('/').next().unwrap_or(&wanted);
    if leaf.is_empty() {
        return Vec::new();
    }
    return slugs
        .into_iter()
        .filter(|slug| {
            let slug_leaf = slug.rsplit('/').next().unwrap_or(slug);
            return slug_leaf == leaf || slug.contains(leaf);
        })
        .take(MAX_SUGGESTIONS)
        .cloned()
        .collect();
}

/// Render an error as markdown and print it to stderr, bold headings on a terminal.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    let styled = std::io::stderr().is_terminal();
    for line in md.lines() {
        if styled && line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Baseline that failed to parse or is out of order.
fn render_baseline_corrupt(reason: &str) -> String {
    return format!(
        "\
# Error: Baseline Corrupt

{reason}

## Fix

Regenerate the baseline from the current findings:

    docdrift baseline
"
    );
}

/// Config value out of range or file missing.
fn render_config_invalid(path: &Path, reason: &str) -> String {
    return format!(
        "\
# Error: Invalid Config

`{}`: {reason}

## Fix

Correct the value, or remove the key to use the default. See the
configuration section of `docdrift rules`.
",
        path.display()
    );
}

/// Contract that could not be turned into endpoints.
fn render_contract(e: &ContractLoadError) -> String {
    let fix = match e {
        ContractLoadError::DuplicateEndpoint { .. } => {
            "Two operations normalize to the same method and path; parameter names\n\
             do not distinguish endpoints. Remove or merge one of them."
        },
        ContractLoadError::Invalid { .. } => "Check that the document parses as YAML or JSON.",
        ContractLoadError::MissingField { .. } => {
            "An OpenAPI document needs `openapi` (or `swagger`), `info`, and `paths`\n\
             at the top level."
        },
        ContractLoadError::Unreadable { .. } => "Check the `contract` path in `.docdrift.toml`.",
    };
    return format!(
        "\
# Error: Contract Not Loaded

{e}

## Fix

{fix}
"
    );
}

/// Contract-only command without a contract.
fn render_contract_not_configured() -> String {
    return "\
# Error: No Contract Configured

This command lists the endpoints of the API contract, and `.docdrift.toml`
does not name one.

## Fix

Point `contract` at the OpenAPI document:

    contract = \"openapi.yaml\"
"
    .to_string();
}

/// Render an error as a structured markdown diagnostic.
///
/// Each variant produces a block with what happened and, where there is one,
/// how to fix it.
pub fn render_error(e: &Error) -> String {
    return match e {
        Error::BaselineCorrupt { reason } => render_baseline_corrupt(reason),
        Error::ConfigInvalid { path, reason } => render_config_invalid(path, reason),
        Error::Contract(inner) => render_contract(inner),
        Error::ContractNotConfigured => render_contract_not_configured(),
        Error::PageNotFound { slug, suggestions } => render_page_not_found(slug, suggestions),
        Error::Io(_)
        | Error::Json(_)
        | Error::Logging { .. }
        | Error::TomlDe(_)
        | Error::TomlSer(_)
        | Error::Watch { .. } => render_generic(e),
    };
}

/// Errors without a dedicated fix section.
fn render_generic(e: &Error) -> String {
    return match e {
        Error::Io(inner) => format!(
            "\
# Error: I/O

{inner}
"
        ),
        Error::TomlDe(inner) => format!(
            "\
# Error: Invalid TOML

{inner}

## Fix

Check `.docdrift.toml` and the baseline file for syntax errors.
"
        ),
        Error::Watch { reason } => format!(
            "\
# Error: Watch Failed

{reason}
"
        ),
        _ => format!(
            "\
# Error

{e}
"
        ),
    };
}

/// Unknown slug, with near matches.
fn render_page_not_found(slug: &str, suggestions: &[String]) -> String {
    let mut out = format!(
        "\
# Error: Page Not Found

No page has slug or source path `{slug}`.
"
    );
    if let Some(first) = suggestions.first() {
        let _ = write!(out, "\n## Did you mean `{first}`?\n\n");
        for s in suggestions {
            let _ = writeln!(out, "- `{s}`");
        }
    }
    return out;
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn page_not_found_lists_suggestions() {
        let slugs = vec!["api/models".to_string(), "guides/models".to_string(), "index".to_string()];
        let suggestions = closest_slugs("models", &slugs);
        assert_eq!(suggestions, vec!["api/models", "guides/models"]);

        let md = render_error(&Error::PageNotFound { slug: "models".to_string(), suggestions });
        assert!(md.starts_with("# Error: Page Not Found"));
        assert!(md.contains("## Did you mean `api/models`?"));
    }

    #[test]
    fn config_error_names_file() {
        let md = render_error(&Error::ConfigInvalid {
            path: PathBuf::from(".docdrift.toml"),
            reason: "network.concurrency must be at least 1".to_string(),
        });
        assert!(md.contains("`.docdrift.toml`: network.concurrency"));
        assert!(md.contains("## Fix"));
    }

    #[test]
    fn contract_error_explains_required_fields() {
        let md = render_error(&Error::Contract(ContractLoadError::MissingField {
            field: "paths",
            file: PathBuf::from("openapi.yaml"),
        }));
        assert!(md.contains("missing required field `paths`"));
        assert!(md.contains("`openapi` (or `swagger`)"));
    }
}
