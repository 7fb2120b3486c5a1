use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::models::job::Job;
use crate::services::pipeline_service::PipelineApi;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// Never requested.
    Idle,
    /// First fetch in flight, nothing to show yet.
    Loading,
    Success,
    Error,
}

/// What the pipeline screen renders for one pipeline id.
#[derive(Debug, Clone)]
pub struct QuerySnapshot {
    pub status: QueryStatus,
    /// `None` after success means the pipeline does not exist.
    pub data: Option<Arc<Job>>,
    pub error: Option<String>,
    pub is_fetching: bool,
    pub is_stale: bool,
}

#[derive(Debug, Default)]
struct CacheEntry {
    data: Option<Arc<Job>>,
    error: Option<String>,
    loaded: bool,
    invalidated: bool,
    fetched_at: Option<Instant>,
    /// Last ticket handed out for this id.
    issued: u64,
    /// Ticket of the response currently stored.
    applied: u64,
    in_flight: usize,
}

impl CacheEntry {
    fn is_stale(&self, stale_after: Option<Duration>) -> bool {
        if !self.loaded || self.invalidated || self.error.is_some() {
            return true;
        }
        match (stale_after, self.fetched_at) {
            (Some(limit), Some(at)) => at.elapsed() >= limit,
            _ => false,
        }
    }
}

/// Query cache keyed by pipeline id. After every mutation the entry is
/// invalidated and refetched; nothing in it is ever patched locally.
pub struct PipelineStore {
    api: Arc<dyn PipelineApi>,
    stale_after: Option<Duration>,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl PipelineStore {
    pub fn new(api: Arc<dyn PipelineApi>, stale_after: Option<Duration>) -> Self {
        Self {
            api,
            stale_after,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached job when fresh, otherwise a fetch.
    pub async fn load(&self, pipeline_id: &str) -> Result<Option<Arc<Job>>> {
        {
            let entries = self.entries();
            if let Some(entry) = entries.get(pipeline_id) {
                if !entry.is_stale(self.stale_after) {
                    debug!(pipeline_id, "Pipeline served from cache");
                    return Ok(entry.data.clone());
                }
            }
        }
        self.refetch(pipeline_id).await
    }

    /// Always hits the backend. Responses older than the one already
    /// stored are dropped, so overlapping fetches settle on the newest.
    pub async fn refetch(&self, pipeline_id: &str) -> Result<Option<Arc<Job>>> {
        let ticket = {
            let mut entries = self.entries();
            let entry = entries.entry(pipeline_id.to_string()).or_default();
            entry.issued += 1;
            entry.in_flight += 1;
            entry.issued
        };

        let result = self.api.fetch_pipeline(pipeline_id).await;

        let mut entries = self.entries();
        let entry = entries.entry(pipeline_id.to_string()).or_default();
        entry.in_flight = entry.in_flight.saturating_sub(1);

        if ticket < entry.applied {
            debug!(pipeline_id, ticket, applied = entry.applied, "Discarding outdated pipeline response");
            return match result {
                Ok(_) => Ok(entry.data.clone()),
                Err(err) => Err(err),
            };
        }
        entry.applied = ticket;

        match result {
            Ok(job) => {
                info!(
                    pipeline_id,
                    candidates = job.as_ref().map(|j| j.candidates.len()).unwrap_or(0),
                    "Pipeline loaded"
                );
                entry.data = job.map(Arc::new);
                entry.error = None;
                entry.loaded = true;
                entry.invalidated = false;
                entry.fetched_at = Some(Instant::now());
                Ok(entry.data.clone())
            }
            Err(err) => {
                warn!(pipeline_id, error = %err, "Pipeline fetch failed");
                entry.error = Some(err.user_message());
                Err(err)
            }
        }
    }

    /// Marks the cached pipeline stale; the next `load` goes to the backend.
    pub fn invalidate(&self, pipeline_id: &str) {
        if let Some(entry) = self.entries().get_mut(pipeline_id) {
            entry.invalidated = true;
            debug!(pipeline_id, "Pipeline query invalidated");
        }
    }

    /// Last stored job, stale or not, without touching the backend.
    pub fn cached(&self, pipeline_id: &str) -> Option<Arc<Job>> {
        self.entries().get(pipeline_id).and_then(|e| e.data.clone())
    }

    pub fn snapshot(&self, pipeline_id: &str) -> QuerySnapshot {
        let entries = self.entries();
        let Some(entry) = entries.get(pipeline_id) else {
            return QuerySnapshot {
                status: QueryStatus::Idle,
                data: None,
                error: None,
                is_fetching: false,
                is_stale: true,
            };
        };

        let status = if entry.error.is_some() {
            QueryStatus::Error
        } else if entry.loaded {
            QueryStatus::Success
        } else if entry.in_flight > 0 {
            QueryStatus::Loading
        } else {
            QueryStatus::Idle
        };

        QuerySnapshot {
            status,
            data: entry.data.clone(),
            error: entry.error.clone(),
            is_fetching: entry.in_flight > 0,
            is_stale: entry.is_stale(self.stale_after),
        }
    }
}
