//! File-backed scope repository.

use std::path::PathBuf;

use async_trait::async_trait;

use mgr_domain::entities::scope::{GroupMapping, ServerScope};
use mgr_domain::entities::{ScopeDocument, ScopeFile};
use mgr_domain::error::{Error, Result};
use mgr_domain::ports::repositories::ScopeRepository;
use mgr_domain::value_objects::Namespace;

use super::store::JsonStore;

fn scope_id(scope_type: &str, key: &str) -> String {
    format!("{scope_type}__{key}")
}

/// File-backed [`ScopeRepository`].
pub struct FileScopeRepository {
    store: JsonStore,
}

impl FileScopeRepository {
    /// Create a repository rooted at the storage directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            store: JsonStore::new(root, "scopes"),
        }
    }
}

#[async_trait]
impl ScopeRepository for FileScopeRepository {
    async fn put(&self, ns: &Namespace, doc: &ScopeDocument) -> Result<()> {
        let _guard = self.store.write_lock.lock().await;
        self.store
            .write(ns, &scope_id(doc.scope_type(), doc.key()), doc)
            .await
    }

    async fn get_server_scope(
        &self,
        ns: &Namespace,
        scope_name: &str,
    ) -> Result<Option<ServerScope>> {
        let doc: Option<ScopeDocument> =
            self.store.read(ns, &scope_id("server_scope", scope_name)).await?;
        match doc {
            Some(ScopeDocument::ServerScope(scope)) => Ok(Some(scope)),
            Some(other) => Err(Error::backend_data(format!(
                "scope '{scope_name}' stored as {}",
                other.scope_type()
            ))),
            None => Ok(None),
        }
    }

    async fn get_group_mapping(
        &self,
        ns: &Namespace,
        group_name: &str,
    ) -> Result<Option<GroupMapping>> {
        let doc: Option<ScopeDocument> =
            self.store.read(ns, &scope_id("group_mapping", group_name)).await?;
        match doc {
            Some(ScopeDocument::GroupMapping(mapping)) => Ok(Some(mapping)),
            Some(other) => Err(Error::backend_data(format!(
                "group mapping '{group_name}' stored as {}",
                other.scope_type()
            ))),
            None => Ok(None),
        }
    }

    async fn list_all(&self, ns: &Namespace) -> Result<Vec<ScopeDocument>> {
        self.store.list(ns).await
    }

    async fn delete(&self, ns: &Namespace, scope_type: &str, key: &str) -> Result<()> {
        let _guard = self.store.write_lock.lock().await;
        self.store.remove(ns, &scope_id(scope_type, key)).await
    }

    async fn load_file(&self, ns: &Namespace, file: ScopeFile) -> Result<usize> {
        let docs = file.into_documents();
        for doc in &docs {
            self.put(ns, doc).await?;
        }
        Ok(docs.len())
    }
}
