//! Audit sinks.

mod jsonl;

pub use jsonl::JsonlAuditSink;
