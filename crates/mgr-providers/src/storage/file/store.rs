//! Shared JSON file store.
//!
//! I/O failures map onto the backend error contract: a missing file is
//! `None`, a parse failure is `BackendData`, any other I/O error is
//! `TransientBackend`.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use mgr_domain::error::{Error, Result};
use mgr_domain::value_objects::Namespace;

use crate::storage::doc_id;

/// Directory-backed JSON document store for one entity kind.
pub(crate) struct JsonStore {
    root: PathBuf,
    kind: &'static str,
    /// Serializes mutations so read-compare-write sequences are atomic.
    pub(crate) write_lock: Mutex<()>,
}

impl JsonStore {
    pub(crate) fn new(root: impl Into<PathBuf>, kind: &'static str) -> Self {
        Self {
            root: root.into(),
            kind,
            write_lock: Mutex::new(()),
        }
    }

    fn dir(&self, ns: &Namespace) -> PathBuf {
        self.root.join(ns.as_str()).join(self.kind)
    }

    fn file_path(&self, ns: &Namespace, id: &str) -> PathBuf {
        self.dir(ns).join(format!("{}.json", doc_id(id)))
    }

    fn state_path(&self, ns: &Namespace) -> PathBuf {
        self.root
            .join(ns.as_str())
            .join(format!("{}_state.json", self.kind))
    }

    pub(crate) async fn read<T: DeserializeOwned>(
        &self,
        ns: &Namespace,
        id: &str,
    ) -> Result<Option<T>> {
        read_json(&self.file_path(ns, id)).await
    }

    pub(crate) async fn write<T: Serialize>(&self, ns: &Namespace, id: &str, value: &T)
        -> Result<()> {
        write_json(&self.file_path(ns, id), value).await
    }

    pub(crate) async fn remove(&self, ns: &Namespace, id: &str) -> Result<()> {
        match tokio::fs::remove_file(self.file_path(ns, id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::transient_with_source("failed to remove document", e)),
        }
    }

    pub(crate) async fn list<T: DeserializeOwned>(&self, ns: &Namespace) -> Result<Vec<T>> {
        let dir = self.dir(ns);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::transient_with_source("failed to list documents", e)),
        };

        let mut values = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::transient_with_source("failed to walk document dir", e))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(value) = read_json(&path).await? {
                    values.push(value);
                }
            }
        }
        Ok(values)
    }

    /// Enabled flags sidecar: id → enabled.
    pub(crate) async fn read_state(&self, ns: &Namespace) -> Result<BTreeMap<String, bool>> {
        Ok(read_json(&self.state_path(ns)).await?.unwrap_or_default())
    }

    pub(crate) async fn write_state(
        &self,
        ns: &Namespace,
        state: &BTreeMap<String, bool>,
    ) -> Result<()> {
        write_json(&self.state_path(ns), state).await
    }

    pub(crate) async fn set_state(&self, ns: &Namespace, id: &str, enabled: bool) -> Result<()> {
        let mut state = self.read_state(ns).await?;
        state.insert(doc_id(id), enabled);
        self.write_state(ns, &state).await
    }

    pub(crate) async fn clear_state(&self, ns: &Namespace, id: &str) -> Result<()> {
        let mut state = self.read_state(ns).await?;
        state.remove(&doc_id(id));
        self.write_state(ns, &state).await
    }
}

pub(crate) async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Error::transient_with_source("failed to read document", e)),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| Error::backend_data_with_source(format!("malformed document {}", path.display()), e))
}

/// Atomic write: temp file in the target directory, then rename.
pub(crate) async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| Error::internal("document path has no parent"))?;
    tokio::fs::create_dir_all(parent)
        .await
        .map_err(|e| Error::transient_with_source("failed to create document dir", e))?;

    let json = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, &json)
        .await
        .map_err(|e| Error::transient_with_source("failed to write document", e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| Error::transient_with_source("failed to commit document", e))?;
    Ok(())
}
