//! CLI commands for docdrift: check, baseline, anchors, endpoints.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::ValueEnum;
use serde::Serialize;

use crate::baseline::Baseline;
use crate::claims::{self, ClaimContext};
use crate::config::Config;
use crate::contract::{self, ApiContract, DEFAULT_API_PREFIX};
use crate::conventions;
use crate::diagnostics;
use crate::drift;
use crate::error::{ContractLoadError, Error};
use crate::link_graph::{self, LinkGraph};
use crate::loader;
use crate::model::{DocumentPage, DocumentSet};
use crate::network;
use crate::report::Report;
use crate::structure;
use crate::types::{Category, Finding, Location, Rule};

/// Options of the `check` command.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckOptions {
    /// How to print the report.
    pub format: OutputFormat,
    /// Run network checks even if the config leaves them off.
    pub network: bool,
    /// Report findings the baseline would hide.
    pub no_baseline: bool,
}

/// One endpoint in `endpoints --json` output.
#[derive(Serialize)]
struct EndpointJson {
    /// Upper-cased method.
    method: String,
    /// Declared parameter names.
    parameters: Vec<String>,
    /// Path template as written in the contract.
    path: String,
    /// Top-level fields of the success response.
    response_fields: Vec<String>,
    /// Success status code, when declared.
    status: Option<String>,
}

/// Report rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON result.
    Json,
    /// Markdown grouped by severity.
    #[default]
    Text,
}

/// Where the project lives and which config to read.
#[derive(Debug, Clone)]
pub struct Project {
    /// Explicit config file, if given on the command line.
    pub config: Option<PathBuf>,
    /// Project root; relative config paths resolve against it.
    pub root: PathBuf,
}

impl Project {
    /// Load the project's config.
    ///
    /// # Errors
    ///
    /// Returns config loading errors.
    pub fn load_config(&self) -> Result<Config, Error> {
        return Config::load(&self.root, self.config.as_deref());
    }
}

/// Print the anchors a page exposes, as `slug#anchor` lines.
///
/// # Errors
///
/// Returns config errors, or `Error::PageNotFound` when no page has that
/// slug or source path.
pub fn anchors(project: &Project, target: &str) -> Result<(), Error> {
    let config = project.load_config()?;
    let set = loader::load(&config);
    let Some(page) = find_page(&set, project, &config, target) else {
        return Err(Error::PageNotFound {
            slug: target.to_string(),
            suggestions: diagnostics::closest_slugs(target, set.pages.keys()),
        });
    };
    print!("{}", render_anchors(page));
    return Ok(());
}

/// Accept every current finding into the baseline file.
///
/// # Errors
///
/// Returns config errors, or I/O and serialization errors writing the file.
pub fn baseline(project: &Project, network: bool) -> Result<(), Error> {
    let config = project.load_config()?;
    let findings = collect_findings(&config, network || config.network.enabled);
    let baseline = Baseline::from_findings(&findings);
    baseline.write(&config.baseline)?;

    let count = baseline.entries.len();
    println!("Wrote {count} findings to {}", config.baseline.display());
    return Ok(());
}

/// Run every validator, print the report, and map its status to an exit code.
///
/// # Errors
///
/// Returns config errors, a corrupt baseline, or JSON serialization errors.
/// Validation problems are findings, never errors.
pub fn check(project: &Project, options: CheckOptions) -> Result<ExitCode, Error> {
    let config = project.load_config()?;
    let findings = collect_findings(&config, options.network || config.network.enabled);
    let (findings, suppressed) = if options.no_baseline {
        (findings, 0)
    } else {
        Baseline::read(&config.baseline)?.suppress(findings)
    };

    let report = Report::new(findings, suppressed);
    tracing::info!(
        status = report.status.as_str(),
        errors = report.counts.error,
        warnings = report.counts.warning,
        info = report.counts.info,
        suppressed,
        "check finished"
    );
    match options.format {
        OutputFormat::Json => println!("{}", report.render_json()?),
        OutputFormat::Text => print!("{}", report.render_text()),
    }
    return Ok(ExitCode::from(report.exit_code()));
}

/// Load inputs, run every validator, and collect their findings.
///
/// Load failures and validator panics become findings, so this always returns.
fn collect_findings(config: &Config, network: bool) -> Vec<Finding> {
    let mut findings = Vec::new();
    let (set, loaded_contract) = load_inputs(config, &mut findings);

    for error in &set.errors {
        findings.push(Finding::new(
            Rule::LoadFailure,
            Location::page(error.file().display().to_string()),
            error.to_string(),
        ));
    }

    let mut api = match loaded_contract {
        Some(Ok(api)) => Some(api),
        Some(Err(e)) => {
            findings.push(contract_failure(config, &e));
            None
        },
        None => {
            tracing::info!("no contract configured, drift detection skipped");
            None
        },
    };
    if let Some(api) = api.as_mut()
        && let Some(path) = &config.drift.models_file
    {
        match read_models_file(path) {
            Ok(models) => api.merge_models(models),
            Err(finding) => findings.push(finding),
        }
    }
    let prefixes = api.as_ref().map_or_else(|| return vec![DEFAULT_API_PREFIX.to_string()], ApiContract::path_prefixes);

    guarded(&mut findings, Category::Structure, "structure", || {
        return structure::validate(&set, &config.orphan_exclude);
    });

    let mut external: BTreeMap<String, Vec<Location>> = BTreeMap::new();
    guarded(&mut findings, Category::Link, "link graph", || {
        let graph = LinkGraph::build(&set);
        tracing::debug!(edges = graph.edge_count(), external = graph.external.len(), "link graph built");
        external = graph.external.iter().map(|(url, at)| return ((*url).to_string(), at.clone())).collect();
        return link_graph::validate(&set, &graph);
    });

    if network {
        guarded(&mut findings, Category::Link, "network", || {
            let outcome = network::run(&config.network, std::mem::take(&mut external));
            if let (Some(api), Some(models)) = (api.as_mut(), outcome.models) {
                api.merge_models(models);
            }
            return outcome.findings;
        });
    }

    guarded(&mut findings, Category::Convention, "conventions", || {
        return conventions::validate(&set, &config.conventions, &prefixes);
    });

    if let Some(api) = &api {
        guarded(&mut findings, Category::ContractDrift, "contract drift", || {
            let context = ClaimContext {
                api_host: config.conventions.base_url.as_deref().and_then(claims::host_of),
                contract: Some(api),
                placeholders: &config.conventions.placeholders,
                prefixes: prefixes.clone(),
                sdk_calls: &config.drift.sdk_calls,
            };
            let extraction = claims::extract(&set, &context);
            return drift::validate(api, &extraction, config.drift.coverage);
        });
    }

    return findings;
}

/// The finding recorded when the configured contract cannot be loaded.
fn contract_failure(config: &Config, error: &ContractLoadError) -> Finding {
    let file = config.contract.as_deref().map_or_else(String::new, |p| return p.display().to_string());
    tracing::warn!(error = %error, "contract not loaded, drift detection skipped");
    return Finding::new(
        Rule::ContractLoadFailure,
        Location::page(file),
        format!("{error}; contract drift was not checked"),
    );
}

/// Print the endpoints the contract declares.
///
/// # Errors
///
/// Returns `Error::ContractNotConfigured` without a contract, the contract's
/// load error, or JSON serialization errors.
pub fn endpoints(project: &Project, json: bool) -> Result<(), Error> {
    let config = project.load_config()?;
    let Some(path) = &config.contract else {
        return Err(Error::ContractNotConfigured);
    };
    let api = contract::load(path)?;

    if json {
        let listed: Vec<EndpointJson> = api
            .endpoints
            .values()
            .map(|e| {
                return EndpointJson {
                    method: e.method.clone(),
                    parameters: e.parameters.iter().map(|p| return p.name.clone()).collect(),
                    path: e.template.to_string(),
                    response_fields: e.response.fields.clone(),
                    status: e.response.status.clone(),
                };
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&listed)?);
        return Ok(());
    }

    let mut out = format!("# {} ({} endpoints)\n\n", path.display(), api.endpoints.len());
    if !api.base_paths.is_empty() {
        let _ = writeln!(out, "Base paths: {}\n", api.base_paths.join(", "));
    }
    for endpoint in api.endpoints.values() {
        let _ = write!(out, "- `{} {}`", endpoint.method, endpoint.template);
        if !endpoint.parameters.is_empty() {
            let names: Vec<&str> = endpoint.parameters.iter().map(|p| return p.name.as_str()).collect();
            let _ = write!(out, " ({})", names.join(", "));
        }
        if let Some(status) = &endpoint.response.status {
            let _ = write!(out, " -> {status}");
            if let Some(content_type) = &endpoint.response.content_type {
                let _ = write!(out, " {content_type}");
            }
        }
        out.push('\n');
    }
    print!("{out}");
    return Ok(());
}

/// A page by slug, or by source path relative to the docs dir, the project
/// root, or the working directory.
fn find_page<'a>(set: &'a DocumentSet, project: &Project, config: &Config, target: &str) -> Option<&'a DocumentPage> {
    if let Some(page) = set.pages.get(target.trim_matches('/')) {
        return Some(page);
    }
    let wanted = Path::new(target);
    return set.pages.values().find(|page| {
        let on_disk = config.docs_dir.join(&page.source);
        return page.source == wanted || on_disk == wanted || on_disk == project.root.join(wanted);
    });
}

/// Run a validator, turning a panic into an internal-fault finding under
/// `category` so the other validators still report.
fn guarded(findings: &mut Vec<Finding>, category: Category, validator: &str, run: impl FnOnce() -> Vec<Finding>) {
    match std::panic::catch_unwind(AssertUnwindSafe(run)) {
        Ok(mut produced) => findings.append(&mut produced),
        Err(payload) => {
            let detail = panic_message(payload.as_ref());
            tracing::error!(validator, detail = %detail, "validator panicked");
            findings.push(Finding::internal_fault(category, validator, &detail));
        },
    }
}

/// Load the document set and the contract on two threads.
///
/// A panicking loader is recorded as an internal fault and replaced by an
/// empty result.
fn load_inputs(
    config: &Config,
    findings: &mut Vec<Finding>,
) -> (DocumentSet, Option<Result<ApiContract, ContractLoadError>>) {
    let (docs, api) = std::thread::scope(|scope| {
        let docs = scope.spawn(|| return loader::load(config));
        let api = scope.spawn(|| return config.contract.as_deref().map(contract::load));
        return (docs.join(), api.join());
    });

    let set = docs.unwrap_or_else(|payload| {
        findings.push(Finding::internal_fault(
            Category::Structure,
            "document loader",
            &panic_message(payload.as_ref()),
        ));
        return DocumentSet::default();
    });
    let api = api.unwrap_or_else(|payload| {
        findings.push(Finding::internal_fault(
            Category::ContractDrift,
            "contract loader",
            &panic_message(payload.as_ref()),
        ));
        return None;
    });
    return (set, api);
}

/// Text of a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        return (*text).to_string();
    }
    if let Some(text) = payload.downcast_ref::<String>() {
        return text.clone();
    }
    return "panic with non-string payload".to_string();
}

/// Models list from a saved JSON file; failures are warnings.
fn read_models_file(path: &Path) -> Result<BTreeMap<String, contract::ModelInfo>, Finding> {
    let location = || return Location::page(path.display().to_string());
    let text = std::fs::read_to_string(path).map_err(|e| {
        return Finding::new(Rule::IntrospectionUnavailable, location(), format!("cannot read models file: {e}"));
    })?;
    let models = contract::parse_models(&text).map_err(|e| {
        return Finding::new(Rule::IntrospectionUnavailable, location(), format!("models file is not a models list: {e}"));
    })?;
    tracing::info!(file = %path.display(), models = models.len(), "loaded models file");
    return Ok(models);
}

/// Anchor listing for one page.
fn render_anchors(page: &DocumentPage) -> String {
    let title = page.title.as_deref().unwrap_or(&page.path);
    let mut out = format!("# {title}\n\nslug:   {}\nsource: {}\n", page.path, page.source.display());
    if !page.frontmatter.is_empty() {
        let keys: Vec<&str> = page.frontmatter.keys().map(String::as_str).collect();
        let _ = writeln!(out, "fields: {}", keys.join(", "));
    }
    out.push('\n');
    if page.headings.is_empty() {
        out.push_str("(no headings)\n");
    }
    for heading in &page.headings {
        let _ = writeln!(
            out,
            "{}#{}  {} {} (line {})",
            page.path,
            heading.anchor,
            "#".repeat(usize::from(heading.level)),
            heading.text,
            heading.line
        );
    }
    return out;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(files: &[(&str, &str)]) -> (tempfile::TempDir, Project) {
        let dir = tempfile::tempdir().unwrap();
        for (path, content) in files {
            let full = dir.path().join(path);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(full, content).unwrap();
        }
        let project = Project { config: None, root: dir.path().to_path_buf() };
        return (dir, project);
    }

    const CONFIG: &str = "docs_dir = \"docs\"\ncontract = \"openapi.yaml\"\n\n\
                          [[sidebar]]\nslug = \"index\"\nlabel = \"Home\"\ngroup = \"Start\"\n";

    const CONTRACT: &str = "openapi: 3.0.3\ninfo: {title: T, version: \"1\"}\nservers:\n  - url: https://api.example.com/v1\n\
                            paths:\n  /models:\n    get:\n      responses:\n        \"200\": {description: ok}\n";

    #[test]
    fn broken_contract_still_checks_documents() {
        let (_dir, project) = project(&[
            (".docdrift.toml", CONFIG),
            ("openapi.yaml", "info: {title: T}\n"),
            ("docs/index.md", "---\ntitle: Home\ndescription: d\n---\n\n[gone](/missing)\n"),
        ]);
        let config = project.load_config().unwrap();
        let findings = collect_findings(&config, false);
        let rules: Vec<Rule> = findings.iter().map(|f| return f.rule).collect();
        assert!(rules.contains(&Rule::ContractLoadFailure));
        assert!(rules.contains(&Rule::LinkMissingPage));
    }

    #[test]
    fn malformed_page_is_a_load_failure_not_an_abort() {
        let (_dir, project) = project(&[
            (".docdrift.toml", CONFIG),
            ("openapi.yaml", CONTRACT),
            ("docs/index.md", "---\ntitle: Home\ndescription: d\n---\n\nHello.\n"),
            ("docs/broken.md", "---\ntitle: [unclosed\n---\n"),
        ]);
        let config = project.load_config().unwrap();
        let findings = collect_findings(&config, false);
        assert_eq!(findings.len(), 1, "{findings:?}");
        assert_eq!(findings[0].rule, Rule::LoadFailure);
        assert!(findings[0].location.slug.contains("broken.md"));
    }

    #[test]
    fn documented_fake_endpoint_is_drift() {
        let page = "---\ntitle: Home\ndescription: d\n---\n\n```bash\ncurl -X POST https://api.example.com/v1/fake-endpoint\n```\n";
        let (_dir, project) = project(&[
            (".docdrift.toml", CONFIG),
            ("openapi.yaml", CONTRACT),
            ("docs/index.md", page),
        ]);
        let config = project.load_config().unwrap();
        let findings = collect_findings(&config, false);
        assert_eq!(findings.len(), 1, "{findings:?}");
        assert_eq!(findings[0].rule, Rule::DriftUnknownEndpoint);
        assert_eq!(findings[0].location.slug, "index");
    }

    #[test]
    fn title_only_pages_warn_but_succeed() {
        let config = "docs_dir = \"docs\"\n\n\
                      [[sidebar]]\nslug = \"api/overview\"\nlabel = \"Overview\"\ngroup = \"API\"\n\n\
                      [[sidebar]]\nslug = \"api/models\"\nlabel = \"Models\"\ngroup = \"API\"\n";
        let (_dir, project) = project(&[
            (".docdrift.toml", config),
            ("docs/api/overview.md", "---\ntitle: Overview\n---\n\nSee [chat models](/api/models#chat-models).\n"),
            ("docs/api/models.md", "---\ntitle: Models\n---\n\n## Chat Models\n"),
        ]);
        let config = project.load_config().unwrap();
        let report = Report::new(collect_findings(&config, false), 0);
        assert_eq!(report.status, crate::report::Status::SuccessWithWarnings);
        assert_eq!(report.counts.warning, 2);
        assert!(report.findings.iter().all(|f| return f.rule == Rule::FrontmatterMissingDescription));
    }

    #[test]
    fn panicking_validator_becomes_fault_finding() {
        let mut findings = Vec::new();
        guarded(&mut findings, Category::Link, "link graph", || panic!("boom"));
        guarded(&mut findings, Category::Structure, "structure", Vec::new);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule, Rule::InternalValidatorFault);
        assert_eq!(findings[0].category, Category::Link);
        assert!(findings[0].message.contains("boom"));
    }

    #[test]
    fn page_found_by_slug_or_path() {
        let (_dir, project) = project(&[
            (".docdrift.toml", CONFIG),
            ("docs/api/models.md", "---\ntitle: Models\n---\n\n## Chat Models\n"),
        ]);
        let config = project.load_config().unwrap();
        let set = loader::load(&config);
        let by_slug = find_page(&set, &project, &config, "api/models").unwrap();
        let by_path = find_page(&set, &project, &config, "docs/api/models.md").unwrap();
        assert_eq!(by_slug.path, by_path.path);
        assert!(find_page(&set, &project, &config, "api/nothing").is_none());

        let listing = render_anchors(by_slug);
        assert!(listing.contains("api/models#chat-models  ## Chat Models (line 5)"));
        assert!(listing.contains("fields: title"));
    }
}
