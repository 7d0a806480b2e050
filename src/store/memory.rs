use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::store::{listing_order, JobRecord, JobStore, PageCursor, ShardRecord};

/// In-memory [`JobStore`]: the reference implementation, used by tests and
/// single-process deployments. Writers populate it through [`put_job`] and
/// [`put_shards`]; the trait side is read-only like any other store.
///
/// [`put_job`]: MemoryStore::put_job
/// [`put_shards`]: MemoryStore::put_shards
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    jobs: HashMap<String, JobRecord>,
    shards: HashMap<String, Vec<ShardRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a job record.
    pub async fn put_job(&self, record: JobRecord) {
        let mut inner = self.inner.write().await;
        inner.jobs.insert(record.mapreduce_id.clone(), record);
    }

    /// Replace the shard records of a job.
    pub async fn put_shards(&self, mapreduce_id: &str, shards: Vec<ShardRecord>) {
        let mut inner = self.inner.write().await;
        inner.shards.insert(mapreduce_id.to_string(), shards);
    }

    pub async fn job_count(&self) -> usize {
        self.inner.read().await.jobs.len()
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn query_jobs(
        &self,
        cursor: Option<&PageCursor>,
        limit: usize,
    ) -> Result<(Vec<JobRecord>, Option<PageCursor>)> {
        let inner = self.inner.read().await;
        let mut records: Vec<JobRecord> = inner.jobs.values().cloned().collect();
        drop(inner);
        records.sort_by(listing_order);

        let mut remaining: Vec<JobRecord> = match cursor {
            Some(cursor) => records
                .into_iter()
                .filter(|record| cursor.precedes(record))
                .collect(),
            None => records,
        };

        let more = remaining.len() > limit;
        remaining.truncate(limit);
        let next = if more {
            remaining.last().map(PageCursor::after)
        } else {
            None
        };
        Ok((remaining, next))
    }

    async fn get_job(&self, mapreduce_id: &str) -> Result<Option<JobRecord>> {
        Ok(self.inner.read().await.jobs.get(mapreduce_id).cloned())
    }

    async fn query_shards(&self, mapreduce_id: &str) -> Result<Vec<ShardRecord>> {
        let inner = self.inner.read().await;
        let mut shards = inner
            .shards
            .get(mapreduce_id)
            .cloned()
            .unwrap_or_default();
        drop(inner);
        shards.sort_by_key(|shard| shard.shard_number);
        Ok(shards)
    }
}
