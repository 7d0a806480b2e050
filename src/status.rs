use std::sync::Arc;

use serde::Serialize;

use crate::config::MapperSpec;
use crate::error::{Result, StatusError};
use crate::store::{Counters, JobRecord, JobStore, PageCursor, ResultStatus, ShardRecord};

/// Conventional page size when a caller has no preference.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Read-side aggregators over the job record store: paginated job listings
/// and single-job detail snapshots.
pub struct StatusReader {
    store: Arc<dyn JobStore>,
}

/// One job in a listing page. Exactly the fields the status UI consumes.
#[derive(Debug, Serialize)]
pub struct JobSummary {
    pub name: String,
    pub mapreduce_id: String,
    pub active: bool,
    pub start_timestamp_ms: i64,
    pub updated_timestamp_ms: i64,
    pub shards: u32,
    pub active_shards: u32,
    pub chart_url: String,
}

/// Wire shape of the list-jobs endpoint. `cursor` appears iff more records
/// remain past this page.
#[derive(Debug, Serialize)]
pub struct JobListPage {
    pub jobs: Vec<JobSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

/// Full snapshot of one job and all of its shards.
#[derive(Debug, Serialize)]
pub struct JobDetail {
    pub name: String,
    pub mapreduce_id: String,
    pub active: bool,
    pub start_timestamp_ms: i64,
    pub updated_timestamp_ms: i64,
    pub result_status: Option<ResultStatus>,
    pub counters: Counters,
    pub mapper_spec: MapperSpec,
    pub chart_url: String,
    pub shards: Vec<ShardDetail>,
}

#[derive(Debug, Serialize)]
pub struct ShardDetail {
    pub shard_id: String,
    pub shard_number: u32,
    pub active: bool,
    pub result_status: Option<ResultStatus>,
    pub last_work_item: String,
    pub shard_description: String,
    pub updated_timestamp_ms: i64,
    pub counters: Counters,
}

impl StatusReader {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// One page of job summaries in listing order (most recently started
    /// first). Pass the previous page's cursor to resume; a `limit` of zero
    /// is treated as one.
    pub async fn list_jobs(&self, cursor: Option<&str>, limit: usize) -> Result<JobListPage> {
        let position = cursor.map(PageCursor::decode).transpose()?;
        let limit = limit.max(1);
        tracing::debug!(limit, resumed = position.is_some(), "listing jobs");

        let (records, next) = self.store.query_jobs(position.as_ref(), limit).await?;
        Ok(JobListPage {
            jobs: records.iter().map(JobSummary::from_record).collect(),
            cursor: next.map(|cursor| cursor.encode()),
        })
    }

    /// Snapshot of one job and its full shard list, ordered by shard
    /// number. Unknown identifiers fail with [`StatusError::JobNotFound`]
    /// carrying the identifier.
    pub async fn get_job_detail(&self, mapreduce_id: &str) -> Result<JobDetail> {
        let record = self
            .store
            .get_job(mapreduce_id)
            .await?
            .ok_or_else(|| {
                tracing::warn!(mapreduce_id, "job lookup miss");
                StatusError::JobNotFound(mapreduce_id.to_string())
            })?;

        let shards = self.store.query_shards(mapreduce_id).await?;
        // exactly one record per shard number, contiguous from zero
        if shards.len() != record.shard_count as usize
            || shards
                .iter()
                .enumerate()
                .any(|(i, shard)| shard.shard_number as usize != i)
        {
            return Err(StatusError::StoreUnavailable(format!(
                "job '{}' has {} shard records, expected {}",
                mapreduce_id,
                shards.len(),
                record.shard_count
            )));
        }

        Ok(JobDetail::assemble(record, shards))
    }
}

impl JobSummary {
    fn from_record(record: &JobRecord) -> Self {
        Self {
            name: record.name.clone(),
            mapreduce_id: record.mapreduce_id.clone(),
            active: record.active,
            start_timestamp_ms: record.start_time.timestamp_millis(),
            updated_timestamp_ms: record.updated_time.timestamp_millis(),
            shards: record.shard_count,
            active_shards: record.active_shards,
            chart_url: chart_url(record.shard_count, record.active_shards),
        }
    }
}

impl JobDetail {
    fn assemble(record: JobRecord, shards: Vec<ShardRecord>) -> Self {
        let chart_url = chart_url(record.shard_count, record.active_shards);
        Self {
            name: record.name,
            mapreduce_id: record.mapreduce_id,
            active: record.active,
            start_timestamp_ms: record.start_time.timestamp_millis(),
            updated_timestamp_ms: record.updated_time.timestamp_millis(),
            result_status: record.result_status,
            counters: record.counters,
            mapper_spec: record.mapper_spec,
            chart_url,
            shards: shards.into_iter().map(ShardDetail::from_record).collect(),
        }
    }
}

impl ShardDetail {
    fn from_record(record: ShardRecord) -> Self {
        let shard_description = shard_description(&record);
        Self {
            shard_id: record.shard_id,
            shard_number: record.shard_number,
            active: record.active,
            result_status: record.result_status,
            last_work_item: record.last_work_item,
            shard_description,
            updated_timestamp_ms: record.updated_time.timestamp_millis(),
            counters: record.counters,
        }
    }
}

/// Shard-activity bar chart link for the status UI. Callers rely only on
/// this being deterministic in its inputs; rendering belongs to the UI.
pub fn chart_url(shard_count: u32, active_shards: u32) -> String {
    let done = shard_count.saturating_sub(active_shards);
    format!(
        "https://chart.apis.google.com/chart?cht=bvs&chs=300x200&chl=active|done&chd=t:{active_shards},{done}"
    )
}

/// Human description of a shard, determined by its number and state.
pub fn shard_description(shard: &ShardRecord) -> String {
    match (shard.active, shard.result_status) {
        (true, _) => format!("shard {} running", shard.shard_number),
        (false, Some(status)) => format!("shard {} {status}", shard.shard_number),
        (false, None) => format!("shard {} pending", shard.shard_number),
    }
}
