//! `docdrift rules`: the rule catalog, workflow, configuration keys, and
//! exit codes, as Markdown or JSON.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::baseline::Baseline;
use crate::config::Config;
use crate::error::Error;
use crate::types::Rule;

/// Exit codes and their meaning.
const EXIT_CODES: [(u8, &str); 3] = [
    (0, "Success, or success with warnings"),
    (1, "At least one error finding"),
    (2, "Runtime error (config, baseline, I/O)"),
];

/// What exists in the project right now.
struct CurrentState {
    /// Entries in the baseline file, when it exists and parses.
    baseline_entries: Option<usize>,
    /// Config file that was read, if any.
    config: Option<PathBuf>,
    /// Configured contract path.
    contract: Option<PathBuf>,
    /// Config problem, when the config could not be loaded.
    problem: Option<String>,
}

/// One exit code in JSON output.
#[derive(Serialize)]
struct ExitCodeJson {
    /// Process exit code.
    code: u8,
    /// What it means.
    meaning: &'static str,
}

/// One rule in JSON output.
#[derive(Serialize)]
struct RuleJson {
    /// Category findings are filed under.
    category: &'static str,
    /// One-line explanation.
    description: &'static str,
    /// Stable rule id.
    id: &'static str,
    /// Fixed severity.
    severity: &'static str,
}

/// Whole JSON document.
#[derive(Serialize)]
struct RulesJson {
    /// Baseline entries, if a baseline exists.
    baseline_entries: Option<usize>,
    /// Config file read, if any.
    config: Option<String>,
    /// Configured contract, if any.
    contract: Option<String>,
    /// Exit code table.
    exit_codes: Vec<ExitCodeJson>,
    /// Rule catalog.
    rules: Vec<RuleJson>,
    /// Crate version.
    version: &'static str,
}

/// Category shown in the catalog; validator faults inherit the failing validator's.
const fn category_label(rule: Rule) -> &'static str {
    return match rule {
        Rule::InternalValidatorFault => "(validator's)",
        _ => rule.category().as_str(),
    };
}

/// Look at config and baseline without failing: `rules` must work in a broken project.
fn gather_state(root: &Path, config_path: Option<&Path>) -> CurrentState {
    let config = match Config::load(root, config_path) {
        Ok(config) => config,
        Err(e) => {
            return CurrentState {
                baseline_entries: None,
                config: config_path.map(Path::to_path_buf),
                contract: None,
                problem: Some(e.to_string()),
            };
        },
    };
    let baseline_entries = Baseline::read(&config.baseline)
        .ok()
        .map(|b| return b.entries.len())
        .filter(|n| return *n > 0);
    return CurrentState {
        baseline_entries,
        config: config.config_path,
        contract: config.contract,
        problem: None,
    };
}

/// Title, workflow, and configuration sections.
fn render_header() -> String {
    let version = env!("CARGO_PKG_VERSION");
    return format!(
        "\
# docdrift {version}

Validate a documentation site against its navigation, its own links, and the
OpenAPI contract it documents.

## Workflow

    docdrift check                    Run every validator (exit 0/1/2)
    docdrift check --format json      Structured result for CI
    docdrift check --network          Also probe external links, health, and models
    docdrift baseline                 Accept current findings into the baseline
    docdrift watch                    Re-check on every change
    docdrift anchors <slug-or-file>   List the anchors a page exposes
    docdrift endpoints                List the endpoints the contract declares
    docdrift rules                    This document

## Configuration (.docdrift.toml)

    docs_dir = \"src/content/docs\"     # pages live here
    contract = \"openapi.yaml\"         # enables drift detection
    base_path = \"/\"                   # stripped from absolute links
    exclude = [\"drafts/\"]             # skip these paths under docs_dir

    [[sidebar]]
    slug = \"api/overview\"
    label = \"Overview\"
    group = \"API\"

    [orphans]
    exclude = [\"changelog/\"]          # never reported as orphans

    [conventions]
    base_url = \"https://api.example.com\"
    auth_header = \"Authorization\"

    [drift]
    coverage = true                   # report undocumented endpoints
    models_file = \"models.json\"       # saved models list

    [network]
    models_url = \"https://api.example.com/v1/models\"
    health_url = \"https://api.example.com/health\"

## Rules

| Rule | Severity | Category | Meaning |
|------|----------|----------|---------|
"
    );
}

/// JSON reference document.
///
/// # Errors
///
/// Returns `Error::Json` if serialization fails.
fn render_json(state: &CurrentState) -> Result<String, Error> {
    let doc = RulesJson {
        baseline_entries: state.baseline_entries,
        config: state.config.as_ref().map(|p| return p.display().to_string()),
        contract: state.contract.as_ref().map(|p| return p.display().to_string()),
        exit_codes: EXIT_CODES
            .iter()
            .map(|&(code, meaning)| return ExitCodeJson { code, meaning })
            .collect(),
        rules: Rule::ALL
            .iter()
            .map(|rule| {
                return RuleJson {
                    category: category_label(*rule),
                    description: rule.description(),
                    id: rule.id(),
                    severity: rule.severity().as_str(),
                };
            })
            .collect(),
        version: env!("CARGO_PKG_VERSION"),
    };
    return Ok(serde_json::to_string_pretty(&doc)?);
}

/// Markdown reference document.
fn render_markdown(state: &CurrentState) -> String {
    let mut out = render_header();
    for rule in Rule::ALL {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} |",
            rule.id(),
            rule.severity(),
            category_label(rule),
            rule.description()
        );
    }

    let config = state.problem.as_ref().map_or_else(
        || {
            return state.config.as_ref().map_or_else(
                || return ".docdrift.toml (not found, using defaults)".to_string(),
                |path| return format!("{} (found)", path.display()),
            );
        },
        |problem| return format!("invalid ({problem})"),
    );
    let contract = state.contract.as_ref().map_or_else(
        || return "(none, drift detection off)".to_string(),
        |path| return path.display().to_string(),
    );
    let baseline = state
        .baseline_entries
        .map_or_else(|| return "(empty)".to_string(), |n| return format!("{n} accepted findings"));
    let _ = write!(
        out,
        "\n## Current State\n\nConfig:     {config}\nContract:   {contract}\nBaseline:   {baseline}\n"
    );

    out.push_str("\n## Exit Codes\n\n| Code | Meaning |\n|------|---------|\n");
    for (code, meaning) in EXIT_CODES {
        let _ = writeln!(out, "| {code}    | {meaning} |");
    }
    return out;
}

/// Print the reference document.
///
/// # Errors
///
/// Returns `Error::Json` if JSON output cannot be serialized.
pub fn run(root: &Path, config_path: Option<&Path>, json: bool) -> Result<(), Error> {
    let state = gather_state(root, config_path);
    if json {
        println!("{}", render_json(&state)?);
    } else {
        print!("{}", render_markdown(&state));
    }
    return Ok(());
}
