//! Process-wide registry of conversion jobs.
//!
//! Owned by the application state (`Arc<JobRegistry>`) from process start to
//! process stop. Entries are evicted lazily: every [`JobRegistry::create`]
//! first sweeps entries older than the configured TTL and deletes their
//! output archives from disk.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use jacport_core::preview::Preview;
use jacport_core::types::{JobId, Timestamp};
use tokio::sync::{Notify, RwLock};

use crate::channel::{EventChannel, JobEmitter};

/// State tracked for a single job.
struct JobEntry {
    created_at: Timestamp,
    /// Created with the entry and never replaced until eviction.
    channel: Arc<EventChannel>,
    preview: Option<Arc<Preview>>,
    output: Option<PathBuf>,
}

pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, JobEntry>>,
    ttl: chrono::Duration,
    /// Signalled whenever a job is registered, so early streams can wake up.
    registered: Notify,
}

impl JobRegistry {
    pub fn new(ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl)
            .unwrap_or_else(|_| chrono::Duration::days(365 * 100));
        Self {
            jobs: RwLock::new(HashMap::new()),
            ttl,
            registered: Notify::new(),
        }
    }

    /// Register a fresh job and return the producer handle for its events.
    ///
    /// Callers must use a fresh id per submission: registering an existing
    /// id replaces its state.
    pub async fn create(&self, id: JobId) -> JobEmitter {
        self.create_at(id, Utc::now()).await
    }

    /// [`create`](Self::create) with an explicit creation time.
    pub async fn create_at(&self, id: JobId, created_at: Timestamp) -> JobEmitter {
        self.evict_expired(Utc::now()).await;

        let channel = Arc::new(EventChannel::new());
        let entry = JobEntry {
            created_at,
            channel: Arc::clone(&channel),
            preview: None,
            output: None,
        };

        let replaced = self.jobs.write().await.insert(id.clone(), entry);
        if replaced.is_some() {
            tracing::warn!(job_id = %id, "Job id registered twice, previous state replaced");
        }
        tracing::debug!(job_id = %id, "Job registered");

        self.registered.notify_waiters();
        JobEmitter::new(id, channel)
    }

    /// Remove entries created more than the TTL before `now`, deleting their
    /// archives. File deletion is best-effort. Returns the number evicted.
    pub async fn evict_expired(&self, now: Timestamp) -> usize {
        let expired: Vec<(JobId, Option<PathBuf>)> = {
            let mut jobs = self.jobs.write().await;
            let ids: Vec<JobId> = jobs
                .iter()
                .filter(|(_, entry)| now - entry.created_at > self.ttl)
                .map(|(id, _)| id.clone())
                .collect();
            ids.into_iter()
                .filter_map(|id| jobs.remove(&id).map(|entry| (id, entry.output)))
                .collect()
        };

        for (id, output) in &expired {
            if let Some(path) = output {
                if let Err(e) = tokio::fs::remove_file(path).await {
                    tracing::debug!(job_id = %id, path = %path.display(), error = %e, "Could not delete expired archive");
                }
            }
        }

        if !expired.is_empty() {
            tracing::info!(evicted = expired.len(), "Evicted expired jobs");
        }
        expired.len()
    }

    pub async fn channel(&self, id: &JobId) -> Option<Arc<EventChannel>> {
        self.jobs
            .read()
            .await
            .get(id)
            .map(|entry| Arc::clone(&entry.channel))
    }

    /// Wait up to `max_wait` for `id` to be registered and return its channel.
    pub async fn wait_for_channel(&self, id: &JobId, max_wait: Duration) -> Option<Arc<EventChannel>> {
        let deadline = tokio::time::Instant::now() + max_wait;
        loop {
            let notified = self.registered.notified();
            tokio::pin!(notified);
            // Register interest before checking so a concurrent create is not missed.
            notified.as_mut().enable();

            if let Some(channel) = self.channel(id).await {
                return Some(channel);
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.channel(id).await;
            }
        }
    }

    pub async fn set_preview(&self, id: &JobId, preview: Preview) {
        if let Some(entry) = self.jobs.write().await.get_mut(id) {
            entry.preview = Some(Arc::new(preview));
        }
    }

    pub async fn preview(&self, id: &JobId) -> Option<Arc<Preview>> {
        self.jobs.read().await.get(id).and_then(|e| e.preview.clone())
    }

    /// Record the archive for `id`. If the job is gone (evicted while it
    /// ran), the archive is deleted instead.
    pub async fn set_output(&self, id: &JobId, path: PathBuf) {
        let orphan = match self.jobs.write().await.get_mut(id) {
            Some(entry) => {
                entry.output = Some(path);
                None
            }
            None => Some(path),
        };

        if let Some(path) = orphan {
            tracing::warn!(job_id = %id, path = %path.display(), "Job evicted before its archive was recorded, deleting it");
            if let Err(e) = tokio::fs::remove_file(&path).await {
                tracing::debug!(job_id = %id, path = %path.display(), error = %e, "Could not delete orphaned archive");
            }
        }
    }

    /// Artifact path for `id`, if the job has produced one.
    pub async fn output(&self, id: &JobId) -> Option<PathBuf> {
        self.jobs.read().await.get(id).and_then(|e| e.output.clone())
    }

    pub async fn contains(&self, id: &JobId) -> bool {
        self.jobs.read().await.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}
