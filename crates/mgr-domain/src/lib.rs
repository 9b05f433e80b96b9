//! Domain layer for the MCP Gateway Registry.
//!
//! Holds the pure model of the system: entities (servers, agents, skills,
//! scopes, scans, peers, audit events), value objects (paths, namespaces,
//! search results, auth context), the typed error enum, and the port traits
//! that the application and provider layers implement.
//!
//! This crate has no I/O. Logging goes through the facade in
//! [`infra::logging`]; the infrastructure layer plugs in the real logger at
//! startup.

pub mod constants;
pub mod entities;
pub mod error;
pub mod infra;
#[macro_use]
pub mod macros;
pub mod ports;
pub mod registry;
pub mod value_objects;

pub use error::{Error, Result};
