//! Security-scan records.
//!
//! Analyzers emit per-tool findings; the orchestrator folds them into one
//! [`SecurityScanResult`] per scan. Multiple scans accumulate per server;
//! the latest wins for gating.

use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::value_objects::ids::ServerPath;

/// Lifecycle state of one scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    /// Queued, not yet started
    #[display("pending")]
    Pending,
    /// Analyzers running
    #[display("in_progress")]
    InProgress,
    /// No HIGH/CRITICAL findings
    #[display("safe")]
    Safe,
    /// At least one HIGH/CRITICAL finding
    #[display("unsafe")]
    Unsafe,
    /// Analyzer error or timeout
    #[display("failed")]
    Failed,
}

/// Severity vocabulary shared by analyzer findings and vulnerabilities.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum FindingSeverity {
    /// No threat observed
    #[display("SAFE")]
    Safe,
    /// Informational
    #[display("LOW")]
    Low,
    /// Worth review
    #[display("MEDIUM")]
    Medium,
    /// Gates enablement
    #[display("HIGH")]
    High,
    /// Gates enablement
    #[display("CRITICAL")]
    Critical,
}

impl FindingSeverity {
    /// Whether this severity forces the `unsafe` verdict.
    #[must_use]
    pub fn is_blocking(self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }
}

/// What one analyzer concluded about one tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolFinding {
    /// Tool the finding applies to
    pub tool_name: String,
    /// Worst severity observed for the tool
    pub severity: FindingSeverity,
    /// Names of matched threat signatures
    #[serde(default)]
    pub threat_names: Vec<String>,
    /// One-line summary of the threat
    #[serde(default)]
    pub threat_summary: String,
    /// Analyzer's overall judgement for the tool
    pub is_safe: bool,
}

/// One recorded vulnerability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vulnerability {
    /// Severity bucket
    pub severity: FindingSeverity,
    /// Short title
    pub title: String,
    /// Longer description
    #[serde(default)]
    pub description: String,
    /// CVE identifier, when applicable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cve_id: Option<String>,
    /// Affected package, when applicable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
    /// Affected version, when applicable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_version: Option<String>,
    /// First fixed version, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_version: Option<String>,
}

/// One complete scan of one server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityScanResult {
    /// Scanned server
    pub server_path: ServerPath,
    /// When the scan ran
    pub scan_timestamp: DateTime<Utc>,
    /// Final verdict
    pub scan_status: ScanStatus,
    /// Individual findings
    #[serde(default)]
    pub vulnerabilities: Vec<Vulnerability>,
    /// Normalized risk in `[0, 1]`
    pub risk_score: f64,
    /// Count of CRITICAL vulnerabilities (derived)
    pub critical_count: usize,
    /// Count of HIGH vulnerabilities (derived)
    pub high_count: usize,
    /// Count of MEDIUM vulnerabilities (derived)
    pub medium_count: usize,
    /// Count of LOW vulnerabilities (derived)
    pub low_count: usize,
    /// Total vulnerabilities (derived)
    pub total_vulnerabilities: usize,
    /// Analyzer names, timings, timeout notes
    #[serde(default)]
    pub scan_metadata: serde_json::Value,
}

impl SecurityScanResult {
    /// Build a result from analyzer findings, deriving verdict, counts and
    /// risk score.
    ///
    /// Verdict: `unsafe` iff any HIGH/CRITICAL; all-SAFE is `safe`; a mix of
    /// LOW/MEDIUM still counts as `safe`, with the warnings retained.
    #[must_use]
    pub fn from_findings(
        server_path: ServerPath,
        findings: &[ToolFinding],
        scan_metadata: serde_json::Value,
    ) -> Self {
        let vulnerabilities: Vec<Vulnerability> = findings
            .iter()
            .filter(|f| f.severity != FindingSeverity::Safe)
            .map(|f| Vulnerability {
                severity: f.severity,
                title: format!("{}: {}", f.tool_name, f.threat_summary),
                description: f.threat_names.join(", "),
                cve_id: None,
                package_name: None,
                package_version: None,
                fixed_version: None,
            })
            .collect();

        let scan_status = if findings.iter().any(|f| f.severity.is_blocking()) {
            ScanStatus::Unsafe
        } else {
            ScanStatus::Safe
        };

        let mut result = Self {
            server_path,
            scan_timestamp: Utc::now(),
            scan_status,
            vulnerabilities,
            risk_score: 0.0,
            critical_count: 0,
            high_count: 0,
            medium_count: 0,
            low_count: 0,
            total_vulnerabilities: 0,
            scan_metadata,
        };
        result.recompute_counts();
        result
    }

    /// Recompute the derived counts and risk score from `vulnerabilities`.
    pub fn recompute_counts(&mut self) {
        self.critical_count = self.count_of(FindingSeverity::Critical);
        self.high_count = self.count_of(FindingSeverity::High);
        self.medium_count = self.count_of(FindingSeverity::Medium);
        self.low_count = self.count_of(FindingSeverity::Low);
        self.total_vulnerabilities = self.vulnerabilities.len();
        self.risk_score = self.derive_risk_score();
    }

    fn count_of(&self, severity: FindingSeverity) -> usize {
        self.vulnerabilities
            .iter()
            .filter(|v| v.severity == severity)
            .count()
    }

    // Weighted severity sum squashed into [0, 1].
    fn derive_risk_score(&self) -> f64 {
        let weighted = 1.0 * self.critical_count as f64
            + 0.6 * self.high_count as f64
            + 0.3 * self.medium_count as f64
            + 0.1 * self.low_count as f64;
        (weighted / (weighted + 1.0)).min(1.0)
    }

    /// Whether warnings (non-blocking findings) are present.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        self.medium_count + self.low_count > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::ids::ServerPath;

    fn path() -> ServerPath {
        ServerPath::new("/cloudflare-docs").expect("valid")
    }

    fn finding(severity: FindingSeverity) -> ToolFinding {
        ToolFinding {
            tool_name: "search_docs".to_owned(),
            severity,
            threat_names: vec!["test".to_owned()],
            threat_summary: "test".to_owned(),
            is_safe: severity == FindingSeverity::Safe,
        }
    }

    #[test]
    fn all_safe_findings_give_safe_verdict() {
        let r = SecurityScanResult::from_findings(
            path(),
            &[finding(FindingSeverity::Safe)],
            serde_json::Value::Null,
        );
        assert_eq!(r.scan_status, ScanStatus::Safe);
        assert!(r.risk_score <= 0.1);
        assert_eq!(r.total_vulnerabilities, 0);
    }

    #[test]
    fn critical_finding_gives_unsafe_verdict() {
        let r = SecurityScanResult::from_findings(
            path(),
            &[finding(FindingSeverity::Safe), finding(FindingSeverity::Critical)],
            serde_json::Value::Null,
        );
        assert_eq!(r.scan_status, ScanStatus::Unsafe);
        assert_eq!(r.critical_count, 1);
    }

    #[test]
    fn mixed_low_medium_is_safe_with_warnings() {
        let r = SecurityScanResult::from_findings(
            path(),
            &[finding(FindingSeverity::Low), finding(FindingSeverity::Medium)],
            serde_json::Value::Null,
        );
        assert_eq!(r.scan_status, ScanStatus::Safe);
        assert!(r.has_warnings());
    }

    #[test]
    fn counts_survive_serde_round_trip() {
        let r = SecurityScanResult::from_findings(
            path(),
            &[
                finding(FindingSeverity::High),
                finding(FindingSeverity::Low),
                finding(FindingSeverity::Low),
            ],
            serde_json::Value::Null,
        );
        let json = serde_json::to_string(&r).expect("serialize");
        let mut back: SecurityScanResult = serde_json::from_str(&json).expect("deserialize");
        let (critical, high, medium, low, total) = (
            back.critical_count,
            back.high_count,
            back.medium_count,
            back.low_count,
            back.total_vulnerabilities,
        );
        back.recompute_counts();
        assert_eq!(back.critical_count, critical);
        assert_eq!(back.high_count, high);
        assert_eq!(back.medium_count, medium);
        assert_eq!(back.low_count, low);
        assert_eq!(back.total_vulnerabilities, total);
    }
}
