//! Audit Service Use Case
//!
//! # Overview
//! Thin orchestration over the audit sink: emission is fire-and-forget so a
//! failing sink can never fail a request; queries page, exports drain.

use std::sync::Arc;

use async_trait::async_trait;

use mgr_domain::entities::{AuditEvent, AuditPage, AuditQuery};
use mgr_domain::error::Result;
use mgr_domain::ports::providers::AuditSink;
use mgr_domain::ports::services::AuditServiceInterface;

/// Page size used when draining events for export.
const EXPORT_PAGE_SIZE: usize = 1000;

/// Implementation of the `AuditServiceInterface`.
pub struct AuditServiceImpl {
    sink: Arc<dyn AuditSink>,
}

impl AuditServiceImpl {
    /// Create the service with injected dependencies.
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl AuditServiceInterface for AuditServiceImpl {
    async fn emit(&self, event: AuditEvent) {
        if let Err(err) = self.sink.emit(event).await {
            mgr_domain::error!("audit", "failed to append audit event", &err);
        }
    }

    async fn query(&self, query: &AuditQuery) -> Result<AuditPage> {
        self.sink.query(query).await
    }

    async fn export(&self, query: &AuditQuery) -> Result<Vec<AuditEvent>> {
        let mut all = Vec::new();
        let mut page_query = query.clone();
        page_query.page = 0;
        page_query.page_size = EXPORT_PAGE_SIZE;

        loop {
            let page = self.sink.query(&page_query).await?;
            let drained = page.events.len();
            all.extend(page.events);
            if all.len() >= page.total || drained < EXPORT_PAGE_SIZE {
                break;
            }
            page_query.page += 1;
        }
        Ok(all)
    }
}
