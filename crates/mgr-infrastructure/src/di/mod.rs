//! Dependency injection: the composition root.

pub mod bootstrap;

pub use bootstrap::{AppContext, init_app};
