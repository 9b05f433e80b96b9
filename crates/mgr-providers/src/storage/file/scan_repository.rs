//! File-backed security-scan repository.
//!
//! One history file per server; appends are read-modify-write under the
//! store's write lock.

use std::path::PathBuf;

use async_trait::async_trait;

use mgr_domain::entities::SecurityScanResult;
use mgr_domain::error::Result;
use mgr_domain::ports::repositories::SecurityScanRepository;
use mgr_domain::value_objects::{Namespace, ServerPath};

use super::store::JsonStore;

/// File-backed [`SecurityScanRepository`].
pub struct FileScanRepository {
    store: JsonStore,
}

impl FileScanRepository {
    /// Create a repository rooted at the storage directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            store: JsonStore::new(root, "security_scans"),
        }
    }
}

#[async_trait]
impl SecurityScanRepository for FileScanRepository {
    async fn append(&self, ns: &Namespace, result: &SecurityScanResult) -> Result<()> {
        let _guard = self.store.write_lock.lock().await;
        let mut history: Vec<SecurityScanResult> = self
            .store
            .read(ns, result.server_path.as_str())
            .await?
            .unwrap_or_default();
        history.push(result.clone());
        history.sort_by(|a, b| b.scan_timestamp.cmp(&a.scan_timestamp));
        self.store
            .write(ns, result.server_path.as_str(), &history)
            .await
    }

    async fn latest(
        &self,
        ns: &Namespace,
        path: &ServerPath,
    ) -> Result<Option<SecurityScanResult>> {
        let history: Vec<SecurityScanResult> =
            self.store.read(ns, path.as_str()).await?.unwrap_or_default();
        Ok(history.into_iter().next())
    }

    async fn history(&self, ns: &Namespace, path: &ServerPath) -> Result<Vec<SecurityScanResult>> {
        Ok(self.store.read(ns, path.as_str()).await?.unwrap_or_default())
    }

    async fn delete_for(&self, ns: &Namespace, path: &ServerPath) -> Result<()> {
        let _guard = self.store.write_lock.lock().await;
        self.store.remove(ns, path.as_str()).await
    }
}
