//! Baseline persistence: fingerprints of accepted findings, parsing,
//! serialization, and ordering enforcement.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use crate::error::Error;
use crate::types::Finding;

/// The baseline as a whole. Entries are sorted by (slug, rule, fingerprint).
/// Constructed only via `Baseline::new()`, `Baseline::from_findings()` or
/// `Baseline::parse()`, all of which enforce sorting and uniqueness.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Baseline {
    /// The ordered list of accepted findings.
    #[serde(default)]
    pub entries: Vec<BaselineEntry>,
}

impl Baseline {
    /// Baseline accepting every given finding.
    pub fn from_findings(findings: &[Finding]) -> Self {
        return Self::new(findings.iter().map(BaselineEntry::from_finding).collect());
    }

    /// Create a baseline from unsorted entries. Sorts and deduplicates.
    pub fn new(mut entries: Vec<BaselineEntry>) -> Self {
        entries.sort();
        entries.dedup();
        return Self { entries };
    }

    /// Parse a baseline from TOML content.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the content is not valid TOML,
    /// or `Error::BaselineCorrupt` if entries are not sorted.
    pub fn parse(content: &str) -> Result<Self, Error> {
        let baseline: Self = toml::from_str(content)?;
        enforce_baseline_entry_ordering(&baseline.entries)?;
        return Ok(baseline);
    }

    /// Read and parse a baseline from disk. A missing file is an empty baseline.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` for read failures other than not-found,
    /// `Error::TomlDe` if the content is invalid TOML,
    /// or `Error::BaselineCorrupt` if entries are not sorted.
    pub fn read(path: &Path) -> Result<Self, Error> {
        let content = match std::fs::read_to_string(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no baseline file");
                return Ok(Self::default());
            },
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };
        return Self::parse(&content);
    }

    /// Serialize to TOML.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlSer` if serialization fails.
    pub fn serialize(&self) -> Result<String, Error> {
        return Ok(toml::to_string_pretty(self)?);
    }

    /// Split findings into those not in the baseline and a count of the rest.
    pub fn suppress(&self, findings: Vec<Finding>) -> (Vec<Finding>, usize) {
        if self.entries.is_empty() {
            return (findings, 0);
        }
        let accepted: HashSet<&str> = self.entries.iter().map(|e| return e.fingerprint.as_str()).collect();
        let total = findings.len();
        let kept: Vec<Finding> = findings
            .into_iter()
            .filter(|f| return !accepted.contains(fingerprint(f).as_str()))
            .collect();
        let suppressed = total.saturating_sub(kept.len());
        return (kept, suppressed);
    }

    /// Write the baseline to disk.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlSer` if serialization fails,
    /// or `Error::Io` if the file cannot be written.
    pub fn write(&self, path: &Path) -> Result<(), Error> {
        let content = self.serialize()?;
        std::fs::write(path, content)?;
        return Ok(());
    }
}

/// One accepted finding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BaselineEntry {
    /// SHA-256 over rule, slug, and message.
    pub fingerprint: String,
    /// Message at the time the baseline was written, for reviewers.
    pub message: String,
    /// Rule id of the finding.
    pub rule: String,
    /// Page slug or file the finding was reported on.
    pub slug: String,
}

impl BaselineEntry {
    /// Entry recording `finding`.
    fn from_finding(finding: &Finding) -> Self {
        return Self {
            fingerprint: fingerprint(finding),
            message: finding.message.clone(),
            rule: finding.rule.id().to_string(),
            slug: finding.location.slug.clone(),
        };
    }
}

impl Ord for BaselineEntry {
    /// Compare entries by (slug, rule, fingerprint) for deterministic ordering.
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        return (&self.slug, &self.rule, &self.fingerprint).cmp(&(
            &other.slug,
            &other.rule,
            &other.fingerprint,
        ));
    }
}

impl PartialOrd for BaselineEntry {
    /// Delegate to `Ord` implementation.
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        return Some(self.cmp(other));
    }
}

/// Validate that baseline entries are strictly sorted.
///
/// # Errors
///
/// Returns `Error::BaselineCorrupt` if any adjacent pair is out of order.
fn enforce_baseline_entry_ordering(entries: &[BaselineEntry]) -> Result<(), Error> {
    for window in entries.windows(2) {
        let (Some(first), Some(second)) = (window.first(), window.get(1)) else {
            continue;
        };
        if first >= second {
            return Err(Error::BaselineCorrupt {
                reason: format!(
                    "entries not sorted: {} {} {} >= {} {} {}",
                    first.slug, first.rule, first.fingerprint, second.slug, second.rule, second.fingerprint,
                ),
            });
        }
    }
    return Ok(());
}

/// Stable identity of a finding across edits that only move it.
///
/// Hashes rule id, slug and message separated by NUL; the line is left out
/// so inserting text above a known finding keeps it suppressed.
pub fn fingerprint(finding: &Finding) -> String {
    let mut hasher = Sha256::new();
    hasher.update(finding.rule.id().as_bytes());
    hasher.update([0]);
    hasher.update(finding.location.slug.as_bytes());
    hasher.update([0]);
    hasher.update(finding.message.as_bytes());
    return format!("{:x}", hasher.finalize());
}
