//! Security analyzers.
//!
//! Resolved by name from the domain registry: `rules` (regex threat
//! signatures over tool names, descriptions and schemas) and `null`
//! (everything SAFE; for deployments that gate elsewhere).

mod null;
mod rules;

pub use null::NullAnalyzer;
pub use rules::RulesAnalyzer;
