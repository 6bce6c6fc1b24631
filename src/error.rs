/// Crate-level error types for docdrift.
use std::path::PathBuf;

/// Failure to turn an API contract document into an `ApiContract`.
/// The contract is a single document, so any of these skips drift detection.
#[derive(Debug, thiserror::Error)]
pub enum ContractLoadError {
    /// Two operations normalize to the same (method, path) key.
    #[error("duplicate endpoint `{method} {path}` in {}", file.display())]
    DuplicateEndpoint {
        /// Contract document.
        file: PathBuf,
        /// Upper-cased HTTP method.
        method: String,
        /// Normalized path template.
        path: String,
    },

    /// The document is neither valid YAML nor valid JSON.
    #[error("invalid contract document {}: {reason}", file.display())]
    Invalid {
        /// Contract document.
        file: PathBuf,
        /// Parser message.
        reason: String,
    },

    /// A required top-level field is absent.
    #[error("contract {} is missing required field `{field}`", file.display())]
    MissingField {
        /// The absent field name.
        field: &'static str,
        /// Contract document.
        file: PathBuf,
    },

    /// The contract file could not be read.
    #[error("cannot read contract {}: {source}", file.display())]
    Unreadable {
        /// Contract document.
        file: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// All fatal errors. Anything that reaches `main` as an `Error` aborts the run
/// before a report can be produced, so this stays limited to CLI-level problems.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Baseline file exists but cannot be parsed or is out of order.
    #[error("baseline corrupt: {reason}")]
    BaselineCorrupt {
        /// Description of the corruption.
        reason: String,
    },

    /// Config file exists but is not valid.
    #[error("invalid config {}: {reason}", path.display())]
    ConfigInvalid {
        /// Path to the config file.
        path: PathBuf,
        /// What is wrong with it.
        reason: String,
    },

    /// Contract loading failed where the caller needed a contract.
    #[error(transparent)]
    Contract(#[from] ContractLoadError),

    /// A command needs a contract but none is configured.
    #[error("no API contract configured")]
    ContractNotConfigured,

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// JSON serialization failed.
    #[error("json: {0}")]
    Json(
        /// The wrapped JSON error.
        #[from]
        serde_json::Error,
    ),

    /// Logging subscriber could not be installed.
    #[error("logging setup failed: {reason}")]
    Logging {
        /// Subscriber error message.
        reason: String,
    },

    /// The requested page does not exist in the document set.
    #[error("page not found: `{slug}`")]
    PageNotFound {
        /// Slug or path that was asked for.
        slug: String,
        /// Existing slugs that look like what was meant.
        suggestions: Vec<String>,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// TOML serialization failed.
    #[error("toml serialize: {0}")]
    TomlSer(
        /// The wrapped TOML serialization error.
        #[from]
        toml::ser::Error,
    ),

    /// Filesystem watcher could not be created.
    #[error("watcher setup failed: {reason}")]
    Watch {
        /// Watcher error message.
        reason: String,
    },
}

/// Failure to load a single documentation source file. Recovered per file:
/// the run records it as a finding and keeps loading the rest.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Two files map to the same slug.
    #[error("duplicate slug `{slug}`: {} and {}", first.display(), file.display())]
    DuplicateSlug {
        /// The later file claiming the slug.
        file: PathBuf,
        /// The file that claimed the slug first.
        first: PathBuf,
        /// The contested slug.
        slug: String,
    },

    /// Frontmatter parsed but is not a key-value mapping.
    #[error("frontmatter in {} is not a key-value mapping", file.display())]
    FrontmatterNotMapping {
        /// Offending file.
        file: PathBuf,
    },

    /// Frontmatter YAML is malformed.
    #[error("invalid frontmatter in {}: {reason}", file.display())]
    FrontmatterSyntax {
        /// Offending file.
        file: PathBuf,
        /// Parser message.
        reason: String,
    },

    /// Opening `---` has no matching closing delimiter.
    #[error("unterminated frontmatter in {} (opened on line 1)", file.display())]
    FrontmatterUnterminated {
        /// Offending file.
        file: PathBuf,
    },

    /// Tree-sitter failed to parse the markdown body.
    #[error("markdown parse failed: {}: {reason}", file.display())]
    ParseFailed {
        /// Offending file.
        file: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// File could not be read.
    #[error("cannot read {}: {source}", file.display())]
    Unreadable {
        /// Offending file.
        file: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

impl LoadError {
    /// The file this error is about.
    pub fn file(&self) -> &std::path::Path {
        return match self {
            Self::DuplicateSlug { file, .. }
            | Self::FrontmatterNotMapping { file }
            | Self::FrontmatterSyntax { file, .. }
            | Self::FrontmatterUnterminated { file }
            | Self::ParseFailed { file, .. }
            | Self::Unreadable { file, .. } => file,
        };
    }
}

/// Failure of an optional network check. Always downgraded to a warning.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// HTTP client could not be constructed.
    #[error("http client setup failed: {reason}")]
    Client {
        /// Builder error message.
        reason: String,
    },

    /// Connection-level failure (DNS, refused, TLS).
    #[error("request to {url} failed: {reason}")]
    Connect {
        /// Transport error message.
        reason: String,
        /// Requested URL.
        url: String,
    },

    /// Response body was not the expected JSON shape.
    #[error("unexpected response body from {url}: {reason}")]
    InvalidBody {
        /// Decode error message.
        reason: String,
        /// Requested URL.
        url: String,
    },

    /// Server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status {
        /// Numeric HTTP status.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// The check's task panicked or was cancelled before it finished.
    #[error("check of {url} failed: {reason}")]
    TaskFailed {
        /// Join error message.
        reason: String,
        /// Requested URL.
        url: String,
    },

    /// Request exceeded its timeout or the run deadline.
    #[error("{url} timed out")]
    Timeout {
        /// Requested URL.
        url: String,
    },
}
