//! Report aggregation: collects findings from every validator into one
//! ordered, counted result and renders it for people or machines.

use std::fmt::Write as _;

use serde::Serialize;

use crate::types::{Category, Finding, Severity};

/// Number of findings at each severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    /// Error findings.
    pub error: usize,
    /// Info findings.
    pub info: usize,
    /// Warning findings.
    pub warning: usize,
}

/// Result of one validation run.
#[derive(Debug, Serialize)]
pub struct Report {
    /// Findings per severity.
    pub counts: Counts,
    /// Findings ordered by severity, category, location.
    pub findings: Vec<Finding>,
    /// Overall outcome derived from the counts.
    pub status: Status,
    /// Findings hidden by the baseline.
    pub suppressed: usize,
}

impl Report {
    /// Process exit code: 1 when the run failed, 0 otherwise.
    pub const fn exit_code(&self) -> u8 {
        return match self.status {
            Status::Failure => 1,
            Status::Success | Status::SuccessWithWarnings => 0,
        };
    }

    /// Aggregate findings in any order. Duplicates collapse so repeated runs
    /// over the same inputs render byte-identical reports.
    pub fn new(mut findings: Vec<Finding>, suppressed: usize) -> Self {
        findings.sort();
        findings.dedup();

        let mut counts = Counts::default();
        for finding in &findings {
            let slot = match finding.severity {
                Severity::Error => &mut counts.error,
                Severity::Info => &mut counts.info,
                Severity::Warning => &mut counts.warning,
            };
            *slot = slot.saturating_add(1);
        }

        let status = if counts.error > 0 {
            Status::Failure
        } else if counts.warning > 0 || counts.info > 0 {
            Status::SuccessWithWarnings
        } else {
            Status::Success
        };

        return Self { counts, findings, status, suppressed };
    }

    /// Pretty-printed JSON of the whole report.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if serialization fails.
    pub fn render_json(&self) -> Result<String, serde_json::Error> {
        return serde_json::to_string_pretty(self);
    }

    /// Markdown report grouped by severity, then category, then location.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# docdrift: {}", self.status.as_str());
        let _ = write!(
            out,
            "\n{} error(s), {} warning(s), {} info",
            self.counts.error, self.counts.warning, self.counts.info
        );
        if self.suppressed > 0 {
            let _ = write!(out, " ({} suppressed by baseline)", self.suppressed);
        }
        out.push('\n');

        if self.findings.is_empty() {
            out.push_str("\nNo findings.\n");
            return out;
        }

        let mut current: Option<(Severity, Category)> = None;
        for finding in &self.findings {
            let group = (finding.severity, finding.category);
            if current.map(|(severity, _)| return severity) != Some(finding.severity) {
                let total = match finding.severity {
                    Severity::Error => self.counts.error,
                    Severity::Info => self.counts.info,
                    Severity::Warning => self.counts.warning,
                };
                let _ = write!(out, "\n## {} ({total})\n", finding.severity);
            }
            if current != Some(group) {
                let _ = write!(out, "\n### {}\n\n", finding.category);
                current = Some(group);
            }
            let _ = writeln!(out, "- `{}` {} [{}]", finding.location, finding.message, finding.rule);
        }
        return out;
    }
}

/// Overall run outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    /// At least one error finding.
    Failure,
    /// No findings at all.
    Success,
    /// Only warnings or info findings.
    SuccessWithWarnings,
}

impl Status {
    /// Kebab-case name used in reports.
    pub const fn as_str(self) -> &'static str {
        return match self {
            Self::Failure => "failure",
            Self::Success => "success",
            Self::SuccessWithWarnings => "success-with-warnings",
        };
    }
}
