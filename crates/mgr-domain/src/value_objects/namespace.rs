//! Namespace partitioning.
//!
//! Every indexable entity belongs to a namespace; all index and collection
//! names are suffixed with it, enabling multi-tenancy on one backend.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Partition key appended to all index names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Namespace(String);

impl Namespace {
    /// Parse and validate a namespace (lowercase alphanumerics and hyphens).
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` for an empty or ill-formed namespace.
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let ok = !raw.is_empty()
            && raw
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !ok {
            return Err(Error::bad_request_field(
                "namespace may contain only lowercase alphanumerics and '-'",
                "namespace",
            ));
        }
        Ok(Self(raw))
    }

    /// The namespace as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Full index name for a base: `{base}-{namespace}`.
    #[must_use]
    pub fn index_name(&self, base: &str) -> String {
        format!("{base}-{}", self.0)
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self("default".to_owned())
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Namespace {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Namespace> for String {
    fn from(value: Namespace) -> Self {
        value.0
    }
}
