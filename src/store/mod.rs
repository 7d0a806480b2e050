mod memory;

pub use memory::MemoryStore;

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::MapperSpec;
use crate::error::{Result, StatusError};

/// Named integer accumulators reported per job and per shard.
pub type Counters = BTreeMap<String, i64>;

/// Final outcome of a job or shard. A record that is still running (or was
/// never finalized) carries `None` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Success,
    Failed,
    Aborted,
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultStatus::Success => write!(f, "success"),
            ResultStatus::Failed => write!(f, "failed"),
            ResultStatus::Aborted => write!(f, "aborted"),
        }
    }
}

/// Persisted state of one mapreduce job, owned by the external store and
/// read-only here. `active_shards` is maintained by the store as shards
/// finish, so listings can report it without touching shard records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub mapreduce_id: String,
    pub name: String,
    pub mapper_spec: MapperSpec,
    pub start_time: DateTime<Utc>,
    pub updated_time: DateTime<Utc>,
    pub active: bool,
    pub result_status: Option<ResultStatus>,
    pub counters: Counters,
    pub shard_count: u32,
    pub active_shards: u32,
}

/// Persisted state of one shard of a job. Shard numbers are contiguous
/// `0..shard_count` within their job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardRecord {
    pub shard_id: String,
    pub shard_number: u32,
    pub active: bool,
    pub result_status: Option<ResultStatus>,
    pub last_work_item: String,
    pub updated_time: DateTime<Utc>,
    pub counters: Counters,
}

/// Continuation token for [`JobStore::query_jobs`]: the keyset position of
/// the last record on the previous page. Clients only ever see the opaque
/// [`encode`]d form, so resumption is independent of store internals.
///
/// [`encode`]: PageCursor::encode
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PageCursor {
    pub start_timestamp_ms: i64,
    pub mapreduce_id: String,
}

impl PageCursor {
    /// Position just past `record` in listing order.
    pub fn after(record: &JobRecord) -> Self {
        Self {
            start_timestamp_ms: record.start_time.timestamp_millis(),
            mapreduce_id: record.mapreduce_id.clone(),
        }
    }

    /// True when `record` sorts strictly after this position in listing
    /// order (descending start time, descending id on ties).
    pub fn precedes(&self, record: &JobRecord) -> bool {
        let start_ms = record.start_time.timestamp_millis();
        start_ms < self.start_timestamp_ms
            || (start_ms == self.start_timestamp_ms && record.mapreduce_id < self.mapreduce_id)
    }

    /// Opaque client-facing form: URL-safe base64 over a JSON payload.
    pub fn encode(&self) -> String {
        let payload = serde_json::json!({
            "start_timestamp_ms": self.start_timestamp_ms,
            "mapreduce_id": self.mapreduce_id,
        });
        URL_SAFE_NO_PAD.encode(payload.to_string())
    }

    pub fn decode(token: &str) -> Result<Self> {
        let payload = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| StatusError::InvalidCursor)?;
        serde_json::from_slice(&payload).map_err(|_| StatusError::InvalidCursor)
    }
}

/// Total order for job listings: most recently started first, ties broken
/// by descending `mapreduce_id` so pagination is deterministic and stable.
pub fn listing_order(a: &JobRecord, b: &JobRecord) -> Ordering {
    b.start_time
        .cmp(&a.start_time)
        .then_with(|| b.mapreduce_id.cmp(&a.mapreduce_id))
}

/// Read-only query interface over the external job record store. Every call
/// is atomic from this crate's perspective; the store's own consistency
/// guarantees are inherited, not strengthened.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// One page of job records in listing order. The returned cursor is
    /// present iff more records remain past the page.
    async fn query_jobs(
        &self,
        cursor: Option<&PageCursor>,
        limit: usize,
    ) -> Result<(Vec<JobRecord>, Option<PageCursor>)>;

    /// Point lookup by exact job identifier.
    async fn get_job(&self, mapreduce_id: &str) -> Result<Option<JobRecord>>;

    /// All shard records of a job, ordered by ascending shard number.
    async fn query_shards(&self, mapreduce_id: &str) -> Result<Vec<ShardRecord>>;
}
