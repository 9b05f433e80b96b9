//! Security-scan constants.

/// Hard wall-clock cap for a single scan, in seconds.
pub const DEFAULT_SCAN_TIMEOUT_SECS: u64 = 60;

/// Tag applied to servers gated behind an unresolved or unsafe scan.
pub const SECURITY_PENDING_TAG: &str = "security-pending";

/// Risk score at or below which a scan is considered clean.
pub const CLEAN_RISK_SCORE: f64 = 0.1;
