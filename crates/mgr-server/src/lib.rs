//! HTTP surface of the MCP Gateway Registry.
//!
//! One axum application serves the registry API, the federation export and
//! admin endpoints, the audit API, and the gateway data path
//! (`/{server_path}/mcp/**`). Background workers (federation scheduler,
//! token refresher, scan sweeper) run as independent tasks with cooperative
//! shutdown.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod proxy;
pub mod routes;
pub mod state;
pub mod workers;
