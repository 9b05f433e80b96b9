//! Infrastructure layer: configuration, logging, and the composition root.

pub mod config;
pub mod di;
pub mod logging;
