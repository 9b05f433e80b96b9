//! Use-case services.

pub mod access_service;
pub mod audit_service;
pub mod federation_service;
pub mod registry_service;
pub mod scan_service;
pub mod search_service;
pub mod token_service;

pub use access_service::AccessServiceImpl;
pub use audit_service::AuditServiceImpl;
pub use federation_service::FederationServiceImpl;
pub use registry_service::{RegistryServiceImpl, RegistrySettings};
pub use scan_service::{ScanServiceImpl, ScanSettings};
pub use search_service::SearchServiceImpl;
pub use token_service::{CredentialSpec, TokenServiceImpl, TokenSettings};
