//! Port traits: the seams between domain, application and providers.

pub mod providers;
pub mod repositories;
pub mod services;

use derive_more::Display;

/// Severity levels understood by the domain log facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display)]
pub enum LogLevel {
    /// Finest detail
    #[display("trace")]
    Trace,
    /// Diagnostic detail
    #[display("debug")]
    Debug,
    /// Normal operation
    #[display("info")]
    Info,
    /// Unexpected but handled
    #[display("warn")]
    Warn,
    /// Operation failed
    #[display("error")]
    Error,
}

pub use providers::{
    AuditSink, ClientConfigWriter, ClientServiceEntry, EmbeddingProvider, ExternalCatalog,
    ExternalCatalogAdapter, IssuedToken, PeerCatalogClient, SecurityAnalyzer, TokenClient,
};
pub use repositories::{
    AgentRepository, FederationRepository, ScopeRepository, ScoredDocument,
    SecurityScanRepository, SearchIndexRepository, ServerRepository, SkillRepository,
};
