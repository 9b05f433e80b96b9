//! Security-Scan Orchestrator Use Case
//!
//! # Overview
//! Runs every configured analyzer against a server's tool list under a hard
//! wall-clock cap, folds the findings into one verdict, and appends the
//! result to the scan history. An `unsafe` latest verdict blocks enablement
//! until an admin overrides.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use mgr_domain::entities::{McpServer, ScanStatus, SecurityScanResult, ToolFinding};
use mgr_domain::error::{Error, Result};
use mgr_domain::ports::providers::SecurityAnalyzer;
use mgr_domain::ports::repositories::{SecurityScanRepository, ServerRepository};
use mgr_domain::ports::services::ScanServiceInterface;
use mgr_domain::value_objects::{Namespace, ServerPath};

use crate::support::retry::with_backoff;

/// Behavior toggles wired from configuration.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    /// Hard wall-clock cap per scan
    pub timeout_secs: u64,
    /// Whether an `unsafe` verdict blocks enablement
    pub block_unsafe: bool,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            timeout_secs: mgr_domain::constants::scan::DEFAULT_SCAN_TIMEOUT_SECS,
            block_unsafe: true,
        }
    }
}

/// Implementation of the `ScanServiceInterface`.
pub struct ScanServiceImpl {
    servers: Arc<dyn ServerRepository>,
    scans: Arc<dyn SecurityScanRepository>,
    analyzers: Vec<Arc<dyn SecurityAnalyzer>>,
    settings: ScanSettings,
}

impl ScanServiceImpl {
    /// Create the service with injected dependencies.
    pub fn new(
        servers: Arc<dyn ServerRepository>,
        scans: Arc<dyn SecurityScanRepository>,
        analyzers: Vec<Arc<dyn SecurityAnalyzer>>,
        settings: ScanSettings,
    ) -> Self {
        Self {
            servers,
            scans,
            analyzers,
            settings,
        }
    }

    async fn run_analyzers(&self, server: &McpServer) -> Result<Vec<ToolFinding>> {
        let mut findings = Vec::new();
        for analyzer in &self.analyzers {
            let mut partial = analyzer.analyze(server).await?;
            findings.append(&mut partial);
        }
        Ok(findings)
    }

    fn analyzer_names(&self) -> Vec<&str> {
        self.analyzers.iter().map(|a| a.analyzer_name()).collect()
    }

    fn failed_result(
        &self,
        path: ServerPath,
        reason: &str,
        timed_out: bool,
    ) -> SecurityScanResult {
        SecurityScanResult {
            server_path: path,
            scan_timestamp: Utc::now(),
            scan_status: ScanStatus::Failed,
            vulnerabilities: Vec::new(),
            risk_score: 0.0,
            critical_count: 0,
            high_count: 0,
            medium_count: 0,
            low_count: 0,
            total_vulnerabilities: 0,
            scan_metadata: serde_json::json!({
                "analyzers": self.analyzer_names(),
                "error": reason,
                "timed_out": timed_out,
                "timeout_secs": self.settings.timeout_secs,
            }),
        }
    }
}

#[async_trait]
impl ScanServiceInterface for ScanServiceImpl {
    async fn scan_server(&self, ns: &Namespace, path: &ServerPath) -> Result<SecurityScanResult> {
        let server = self.servers.get(ns, path).await?;
        let started = std::time::Instant::now();
        let deadline = Duration::from_secs(self.settings.timeout_secs);

        let result = match tokio::time::timeout(deadline, self.run_analyzers(&server)).await {
            Ok(Ok(findings)) => SecurityScanResult::from_findings(
                path.clone(),
                &findings,
                serde_json::json!({
                    "analyzers": self.analyzer_names(),
                    "duration_ms": started.elapsed().as_millis() as u64,
                }),
            ),
            Ok(Err(err)) => {
                mgr_domain::error!("scan", "analyzer failed", &err);
                self.failed_result(path.clone(), &err.to_string(), false)
            }
            Err(_) => {
                mgr_domain::warn!(
                    "scan",
                    "scan exceeded deadline",
                    &format!("{path} after {}s", self.settings.timeout_secs)
                );
                let failed = self.failed_result(
                    path.clone(),
                    &Error::scan_timeout(self.settings.timeout_secs).to_string(),
                    true,
                );
                with_backoff("scan.append", || self.scans.append(ns, &failed)).await?;
                return Err(Error::scan_timeout(self.settings.timeout_secs));
            }
        };

        with_backoff("scan.append", || self.scans.append(ns, &result)).await?;
        Ok(result)
    }

    async fn scan_all(&self, ns: &Namespace) -> Result<Vec<SecurityScanResult>> {
        let servers = self.servers.list_all(ns).await?;
        let mut results = Vec::new();
        for server in servers.iter().filter(|s| !s.is_virtual()) {
            match self.scan_server(ns, &server.path).await {
                Ok(result) => results.push(result),
                Err(err) => {
                    mgr_domain::error!(
                        "scan",
                        "sweep scan failed",
                        &format!("{}: {err}", server.path)
                    );
                }
            }
        }
        Ok(results)
    }

    async fn latest(
        &self,
        ns: &Namespace,
        path: &ServerPath,
    ) -> Result<Option<SecurityScanResult>> {
        with_backoff("scan.latest", || self.scans.latest(ns, path)).await
    }

    async fn is_enable_blocked(&self, ns: &Namespace, path: &ServerPath) -> Result<bool> {
        if !self.settings.block_unsafe {
            return Ok(false);
        }
        let latest = self.latest(ns, path).await?;
        Ok(latest.is_some_and(|r| r.scan_status == ScanStatus::Unsafe))
    }
}
