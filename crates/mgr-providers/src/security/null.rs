//! No-op analyzer: everything SAFE.

use async_trait::async_trait;

use mgr_domain::entities::{FindingSeverity, McpServer, ToolFinding};
use mgr_domain::error::Result;
use mgr_domain::ports::providers::SecurityAnalyzer;

/// Pass-through [`SecurityAnalyzer`].
#[derive(Default)]
pub struct NullAnalyzer;

#[async_trait]
impl SecurityAnalyzer for NullAnalyzer {
    fn analyzer_name(&self) -> &str {
        "null"
    }

    async fn analyze(&self, server: &McpServer) -> Result<Vec<ToolFinding>> {
        Ok(server
            .tool_list
            .iter()
            .map(|t| ToolFinding {
                tool_name: t.name.clone(),
                severity: FindingSeverity::Safe,
                threat_names: Vec::new(),
                threat_summary: String::new(),
                is_safe: true,
            })
            .collect())
    }
}

// ============================================================================
// Auto-registration via linkme distributed slice
// ============================================================================

use std::sync::Arc;

use mgr_domain::registry::analyzer::{AnalyzerConfig, AnalyzerEntry, SECURITY_ANALYZERS};

fn null_factory(
    _config: &AnalyzerConfig,
) -> std::result::Result<Arc<dyn SecurityAnalyzer>, String> {
    Ok(Arc::new(NullAnalyzer))
}

#[linkme::distributed_slice(SECURITY_ANALYZERS)]
static NULL_ANALYZER: AnalyzerEntry = AnalyzerEntry {
    name: "null",
    description: "Marks every tool SAFE",
    build: null_factory,
};
