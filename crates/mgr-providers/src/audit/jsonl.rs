//! Append-only JSONL audit sink.
//!
//! One file per stream per UTC day (`registry_api-2026-08-01.jsonl`).
//! Queries read every file back, filter in memory, and paginate; ordering is
//! timestamp with ties broken by request id.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use mgr_domain::entities::{AuditEvent, AuditPage, AuditQuery, SortOrder};
use mgr_domain::error::{Error, Result};
use mgr_domain::ports::providers::AuditSink;

/// File-backed [`AuditSink`].
pub struct JsonlAuditSink {
    dir: PathBuf,
    append_lock: Mutex<()>,
}

impl JsonlAuditSink {
    /// Sink rooted at the audit directory.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            append_lock: Mutex::new(()),
        }
    }

    fn file_for(&self, event: &AuditEvent) -> PathBuf {
        self.dir.join(format!(
            "{}-{}.jsonl",
            event.log_type,
            event.timestamp.format("%Y-%m-%d")
        ))
    }

    async fn read_all(&self) -> Result<Vec<AuditEvent>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::transient_with_source("failed to list audit dir", e)),
        };

        let mut events = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::transient_with_source("failed to walk audit dir", e))?
        {
            let path = entry.path();
            if !path.extension().is_some_and(|ext| ext == "jsonl") {
                continue;
            }
            let content = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::transient_with_source("failed to read audit file", e))?;
            for line in content.lines().filter(|l| !l.trim().is_empty()) {
                let event: AuditEvent = serde_json::from_str(line).map_err(|e| {
                    Error::backend_data_with_source(
                        format!("malformed audit line in {}", path.display()),
                        e,
                    )
                })?;
                events.push(event);
            }
        }
        Ok(events)
    }
}

#[async_trait]
impl AuditSink for JsonlAuditSink {
    async fn emit(&self, event: AuditEvent) -> Result<()> {
        let _guard = self.append_lock.lock().await;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| Error::transient_with_source("failed to create audit dir", e))?;

        let mut line = serde_json::to_vec(&event)?;
        line.push(b'\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.file_for(&event))
            .await
            .map_err(|e| Error::transient_with_source("failed to open audit file", e))?;
        file.write_all(&line)
            .await
            .map_err(|e| Error::transient_with_source("failed to append audit event", e))?;
        Ok(())
    }

    async fn query(&self, query: &AuditQuery) -> Result<AuditPage> {
        let mut events: Vec<AuditEvent> = self
            .read_all()
            .await?
            .into_iter()
            .filter(|e| query.matches(e))
            .collect();

        events.sort_by(|a, b| {
            let ordering = a
                .timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.request_id.cmp(&b.request_id));
            match query.sort {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let total = events.len();
        let page_size = query.page_size.max(1);
        let events = events
            .into_iter()
            .skip(query.page * page_size)
            .take(page_size)
            .collect();

        Ok(AuditPage {
            events,
            total,
            page: query.page,
            page_size,
        })
    }
}
