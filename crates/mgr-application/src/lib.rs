//! Application layer: use-case services implementing the domain service
//! interfaces over the repository and provider ports.
//!
//! Services hold `Arc<dyn Port>` dependencies injected by the composition
//! root; no service constructs its own I/O clients.

pub mod support;
pub mod use_cases;
