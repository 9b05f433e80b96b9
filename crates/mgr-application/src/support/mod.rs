//! Cross-cutting helpers for use-case services.

pub mod retry;
