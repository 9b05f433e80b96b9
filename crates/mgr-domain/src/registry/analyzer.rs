//! Security Analyzer Registry
//!
//! Analyzers named in `SECURITY_ANALYZERS` are resolved from this registry
//! at bootstrap; each entry builds one analyzer instance.

use std::collections::HashMap;

/// Configuration for security analyzer creation.
#[derive(Debug, Clone, Default)]
pub struct AnalyzerConfig {
    /// Analyzer name (e.g., "rules", "null")
    pub provider: String,
    /// Path to a rules file, for rule-based analyzers
    pub rules_path: Option<String>,
    /// Additional analyzer-specific configuration
    pub extra: HashMap<String, String>,
}

crate::impl_config_builder!(AnalyzerConfig {
    /// Set the rules file path
    rules_path: with_rules_path(into String),
});

crate::impl_registry!(
    provider_trait: crate::ports::providers::SecurityAnalyzer,
    config_type: AnalyzerConfig,
    entry_type: AnalyzerEntry,
    slice_name: SECURITY_ANALYZERS,
    resolve_fn: resolve_analyzer,
    list_fn: list_analyzers
);
