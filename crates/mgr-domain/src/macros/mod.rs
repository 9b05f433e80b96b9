//! Macros shared across the workspace: logging facade dispatch, provider
//! registry generation, and DI container getters.

pub mod di;
pub mod logging;
pub mod registry;
