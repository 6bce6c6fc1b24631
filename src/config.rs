use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::Error;
use crate::model::SidebarEntry;

/// Name of the config file looked up in the project root.
pub const CONFIG_FILE: &str = ".docdrift.toml";

/// Project configuration loaded from `.docdrift.toml`.
/// All paths are already joined onto the project root.
#[derive(Debug)]
pub struct Config {
    /// URL prefix under which the docs are served; stripped from absolute links.
    pub base_path: String,
    /// Baseline file holding accepted finding fingerprints.
    pub baseline: PathBuf,
    /// Where the config was read from, if it existed.
    pub config_path: Option<PathBuf>,
    /// OpenAPI document, if configured.
    pub contract: Option<PathBuf>,
    /// Code-sample conventions.
    pub conventions: Conventions,
    /// Root of the markdown content tree.
    pub docs_dir: PathBuf,
    /// Contract drift settings.
    pub drift: DriftSettings,
    /// Path-prefix filters relative to `docs_dir`.
    exclude: Vec<String>,
    /// File extensions treated as documentation pages.
    pub extensions: Vec<String>,
    /// Path-prefix filters relative to `docs_dir`.
    include: Vec<String>,
    /// Optional network checks.
    pub network: NetworkSettings,
    /// Slug prefixes exempt from the orphan warning.
    pub orphan_exclude: Vec<String>,
    /// Navigation declaration.
    pub sidebar: Vec<SidebarEntry>,
}

/// Expected canonical values for code samples. A `None` canonical value skips
/// the corresponding check.
#[derive(Debug)]
pub struct Conventions {
    /// Canonical auth header name.
    pub auth_header: Option<String>,
    /// Header names recognized as carrying credentials.
    pub auth_headers: Vec<String>,
    /// Canonical API origin, e.g. `https://api.example.com`.
    pub base_url: Option<String>,
    /// Substrings that mark a credential as a placeholder.
    pub placeholders: Vec<String>,
    /// Patterns of real-looking secrets.
    pub secret_patterns: Vec<Regex>,
}

/// Contract drift settings.
#[derive(Debug)]
pub struct DriftSettings {
    /// Emit coverage-gap findings for undocumented endpoints.
    pub coverage: bool,
    /// Saved models-list response used instead of the live endpoint.
    pub models_file: Option<PathBuf>,
    /// SDK method chains that imply an endpoint.
    pub sdk_calls: Vec<SdkCall>,
}

/// Raw TOML structure for `.docdrift.toml`.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct DocdriftTomlConfig {
    #[serde(default)]
    base_path: Option<String>,
    #[serde(default)]
    baseline: Option<String>,
    #[serde(default)]
    contract: Option<String>,
    #[serde(default)]
    conventions: RawConventions,
    #[serde(default)]
    docs_dir: Option<String>,
    #[serde(default)]
    drift: RawDrift,
    #[serde(default)]
    exclude: Vec<String>,
    #[serde(default)]
    extensions: Option<Vec<String>>,
    #[serde(default)]
    include: Vec<String>,
    #[serde(default)]
    network: RawNetwork,
    #[serde(default)]
    orphans: RawOrphans,
    #[serde(default)]
    sidebar: Vec<SidebarEntry>,
}

/// Network check settings.
#[derive(Debug, Clone)]
pub struct NetworkSettings {
    /// Env var holding a bearer token for introspection requests.
    pub api_key_env: Option<String>,
    /// Maximum in-flight requests.
    pub concurrency: usize,
    /// Whole-batch deadline in seconds.
    pub deadline_secs: u64,
    /// Whether network checks run without `--network`.
    pub enabled: bool,
    /// Health endpoint expected to answer 2xx.
    pub health_url: Option<String>,
    /// Live models-list endpoint.
    pub models_url: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

/// `[conventions]` table.
#[derive(Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConventions {
    auth_header: Option<String>,
    auth_headers: Option<Vec<String>>,
    base_url: Option<String>,
    placeholders: Option<Vec<String>>,
    secret_patterns: Option<Vec<String>>,
}

/// `[drift]` table.
#[derive(Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDrift {
    #[serde(default)]
    coverage: bool,
    models_file: Option<String>,
    sdk_calls: Option<Vec<SdkCall>>,
}

/// `[network]` table.
#[derive(Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct RawNetwork {
    api_key_env: Option<String>,
    concurrency: Option<usize>,
    deadline_secs: Option<u64>,
    #[serde(default)]
    enabled: bool,
    health_url: Option<String>,
    models_url: Option<String>,
    timeout_secs: Option<u64>,
}

/// `[orphans]` table.
#[derive(Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct RawOrphans {
    #[serde(default)]
    exclude: Vec<String>,
}

/// An SDK method chain (e.g. `chat.completions.create`) that implies an endpoint.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SdkCall {
    /// Dotted method chain as it appears in code.
    pub call: String,
    /// HTTP method of the implied request.
    pub method: String,
    /// Path of the implied request.
    pub path: String,
}

impl Config {
    /// Validate raw values and resolve paths.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigInvalid` for invalid regexes or zero-valued limits.
    fn from_raw(
        root: &Path,
        config_path: Option<PathBuf>,
        raw: DocdriftTomlConfig,
    ) -> Result<Self, Error> {
        let shown = config_path.clone().unwrap_or_else(|| return root.join(CONFIG_FILE));
        let invalid = |reason: String| {
            return Error::ConfigInvalid { path: shown.clone(), reason };
        };

        let secret_sources = raw.conventions.secret_patterns.unwrap_or_else(default_secret_patterns);
        let mut secret_patterns = Vec::with_capacity(secret_sources.len());
        for source in &secret_sources {
            let compiled = Regex::new(source)
                .map_err(|e| return invalid(format!("secret pattern `{source}`: {e}")))?;
            secret_patterns.push(compiled);
        }

        let concurrency = raw.network.concurrency.unwrap_or(4);
        if concurrency == 0 {
            return Err(invalid("network.concurrency must be at least 1".to_string()));
        }
        let timeout_secs = raw.network.timeout_secs.unwrap_or(5);
        if timeout_secs == 0 {
            return Err(invalid("network.timeout_secs must be at least 1".to_string()));
        }
        let deadline_secs = raw.network.deadline_secs.unwrap_or(60);
        if deadline_secs == 0 {
            return Err(invalid("network.deadline_secs must be at least 1".to_string()));
        }

        let base_path = normalize_base_path(raw.base_path.as_deref().unwrap_or("/"));

        return Ok(Self {
            base_path,
            baseline: root.join(raw.baseline.as_deref().unwrap_or(".docdrift.baseline")),
            config_path,
            contract: raw.contract.map(|c| return root.join(c)),
            conventions: Conventions {
                auth_header: raw.conventions.auth_header,
                auth_headers: raw.conventions.auth_headers.unwrap_or_else(default_auth_headers),
                base_url: raw.conventions.base_url.map(|u| return u.trim_end_matches('/').to_string()),
                placeholders: raw.conventions.placeholders.unwrap_or_else(default_placeholders),
                secret_patterns,
            },
            docs_dir: root.join(raw.docs_dir.as_deref().unwrap_or("src/content/docs")),
            drift: DriftSettings {
                coverage: raw.drift.coverage,
                models_file: raw.drift.models_file.map(|f| return root.join(f)),
                sdk_calls: raw.drift.sdk_calls.unwrap_or_else(default_sdk_calls),
            },
            exclude: raw.exclude,
            extensions: raw
                .extensions
                .unwrap_or_else(|| return vec!["md".to_string(), "mdx".to_string()]),
            include: raw.include,
            network: NetworkSettings {
                api_key_env: raw.network.api_key_env,
                concurrency,
                deadline_secs,
                enabled: raw.network.enabled,
                health_url: raw.network.health_url,
                models_url: raw.network.models_url,
                timeout_secs,
            },
            orphan_exclude: raw.orphans.exclude,
            sidebar: raw.sidebar,
        });
    }

    /// Load config from `explicit` or `.docdrift.toml` in `root`.
    /// Returns defaults if the default file doesn't exist. A file that exists
    /// but is malformed is an error, never a silent fallback.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigInvalid` if an explicitly named file is missing or a
    /// value is out of range, `Error::Io` if reading fails, or `Error::TomlDe` if
    /// the TOML is malformed.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self, Error> {
        let path = explicit.map_or_else(|| return root.join(CONFIG_FILE), Path::to_path_buf);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && explicit.is_none() => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Self::from_raw(root, None, default_raw());
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::ConfigInvalid { path, reason: "file not found".to_string() });
            },
            Err(e) => return Err(Error::Io(e)),
        };

        let raw: DocdriftTomlConfig = toml::from_str(&content)?;
        return Self::from_raw(root, Some(path), raw);
    }

    /// Parse config from TOML text, resolving paths against `root`.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` for malformed TOML or `Error::ConfigInvalid` for
    /// out-of-range values.
    #[cfg(test)]
    pub fn parse(root: &Path, content: &str) -> Result<Self, Error> {
        let raw: DocdriftTomlConfig = toml::from_str(content)?;
        return Self::from_raw(root, None, raw);
    }

    /// Check whether a documentation file should be loaded.
    ///
    /// A path is included if no include patterns are set (load everything),
    /// or if the path starts with at least one include pattern.
    /// An included path is then excluded if it starts with any exclude pattern.
    pub fn should_scan(&self, relative_path: &str) -> bool {
        let included = self.include.is_empty()
            || self.include.iter().any(|p| return relative_path.starts_with(p.as_str()));

        if !included {
            return false;
        }

        return !self.exclude.iter().any(|p| return relative_path.starts_with(p.as_str()));
    }
}

/// Header names that carry credentials in common API docs.
fn default_auth_headers() -> Vec<String> {
    return ["Authorization", "X-API-Key", "Api-Key"]
        .iter()
        .map(|s| return (*s).to_string())
        .collect();
}

/// Raw config with every field at its default.
fn default_raw() -> DocdriftTomlConfig {
    return DocdriftTomlConfig {
        base_path: None,
        baseline: None,
        contract: None,
        conventions: RawConventions::default(),
        docs_dir: None,
        drift: RawDrift::default(),
        exclude: Vec::new(),
        extensions: None,
        include: Vec::new(),
        network: RawNetwork::default(),
        orphans: RawOrphans::default(),
        sidebar: Vec::new(),
    };
}

/// Placeholder markers recognized out of the box.
fn default_placeholders() -> Vec<String> {
    return ["YOUR_", "your-", "your_", "<", "$", "{", "xxxx", "XXXX", "..."]
        .iter()
        .map(|s| return (*s).to_string())
        .collect();
}

/// OpenAI-compatible SDK calls.
fn default_sdk_calls() -> Vec<SdkCall> {
    let table = [
        ("chat.completions.create", "POST", "/v1/chat/completions"),
        ("completions.create", "POST", "/v1/completions"),
        ("embeddings.create", "POST", "/v1/embeddings"),
        ("models.list", "GET", "/v1/models"),
    ];
    return table
        .iter()
        .map(|(call, method, path)| {
            return SdkCall {
                call: (*call).to_string(),
                method: (*method).to_string(),
                path: (*path).to_string(),
            };
        })
        .collect();
}

/// Secret shapes flagged out of the box.
fn default_secret_patterns() -> Vec<String> {
    return vec![
        r"\bsk-[A-Za-z0-9_-]{20,}".to_string(),
        r"\bBearer\s+[A-Za-z0-9._~+/-]{32,}=*".to_string(),
    ];
}

/// Force a base path into `/segment/` form; the root stays `/`.
fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    return format!("/{trimmed}/");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_empty() {
        let config = Config::parse(Path::new("/site"), "").unwrap();
        assert_eq!(config.docs_dir, PathBuf::from("/site/src/content/docs"));
        assert_eq!(config.base_path, "/");
        assert_eq!(config.network.timeout_secs, 5);
        assert_eq!(config.drift.sdk_calls.len(), 4);
        assert!(config.contract.is_none());
    }

    #[test]
    fn sidebar_entries_parse() {
        let toml = r#"
docs_dir = "docs"
contract = "openapi.yaml"

[[sidebar]]
slug = "api/overview"
label = "Overview"
group = "API"
"#;
        let config = Config::parse(Path::new("/site"), toml).unwrap();
        assert_eq!(config.sidebar.len(), 1);
        assert_eq!(config.sidebar[0].slug, "api/overview");
        assert_eq!(config.contract, Some(PathBuf::from("/site/openapi.yaml")));
    }

    #[test]
    fn invalid_secret_pattern_rejected() {
        let toml = "[conventions]\nsecret_patterns = [\"(\"]\n";
        let err = Config::parse(Path::new("."), toml).unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid { .. }));
    }

    #[test]
    fn zero_concurrency_rejected() {
        let err = Config::parse(Path::new("."), "[network]\nconcurrency = 0\n").unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid { .. }));
    }

    #[test]
    fn zero_deadline_rejected() {
        let err = Config::parse(Path::new("."), "[network]\ndeadline_secs = 0\n").unwrap_err();
        let Error::ConfigInvalid { reason, .. } = err else {
            panic!("expected ConfigInvalid, got {err:?}");
        };
        assert!(reason.contains("deadline_secs"));
        assert_eq!(Config::parse(Path::new("."), "").unwrap().network.deadline_secs, 60);
    }

    #[test]
    fn unknown_key_rejected() {
        assert!(Config::parse(Path::new("."), "docsdir = \"x\"\n").is_err());
    }

    #[test]
    fn include_exclude_prefixes() {
        let toml = "include = [\"api/\"]\nexclude = [\"api/internal/\"]\n";
        let config = Config::parse(Path::new("."), toml).unwrap();
        assert!(config.should_scan("api/overview.md"));
        assert!(!config.should_scan("api/internal/x.md"));
        assert!(!config.should_scan("guides/start.md"));
    }

    #[test]
    fn base_path_normalized() {
        assert_eq!(normalize_base_path("docs"), "/docs/");
        assert_eq!(normalize_base_path("/docs/"), "/docs/");
        assert_eq!(normalize_base_path(""), "/");
    }
}
