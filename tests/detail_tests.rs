use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use mapreduce_status::{
    Counters, JobRecord, MapperSpec, MemoryStore, ParamSpec, ResultStatus, ShardRecord,
    StatusError, StatusReader,
};

fn mapper_spec() -> MapperSpec {
    MapperSpec {
        handler: "handlers.word_count".to_string(),
        input_reader: "readers.line_input".to_string(),
        params_validator: None,
        params: vec![ParamSpec {
            name: "entity_kind".to_string(),
            default: None,
        }],
    }
}

fn job(id: &str, shard_count: u32, active_shards: u32) -> JobRecord {
    let mut counters = Counters::new();
    counters.insert("mapper_calls".to_string(), 1_234);
    JobRecord {
        mapreduce_id: id.to_string(),
        name: "my job 1".to_string(),
        mapper_spec: mapper_spec(),
        start_time: Utc.timestamp_millis_opt(10_000).unwrap(),
        updated_time: Utc.timestamp_millis_opt(20_000).unwrap(),
        active: true,
        result_status: None,
        counters,
        shard_count,
        active_shards,
    }
}

fn shard(job_id: &str, number: u32, active: bool, status: Option<ResultStatus>) -> ShardRecord {
    let mut counters = Counters::new();
    counters.insert("mapper_calls".to_string(), i64::from(number) * 10);
    ShardRecord {
        shard_id: format!("{job_id}-{number}"),
        shard_number: number,
        active,
        result_status: status,
        last_work_item: format!("item-{number}"),
        updated_time: Utc.timestamp_millis_opt(15_000).unwrap(),
        counters,
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn seeded_reader(record: JobRecord, shards: Vec<ShardRecord>) -> StatusReader {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let id = record.mapreduce_id.clone();
    store.put_job(record).await;
    store.put_shards(&id, shards).await;
    StatusReader::new(store)
}

#[tokio::test]
async fn test_unknown_job_fails_with_the_identifier() {
    init_tracing();
    let reader = StatusReader::new(Arc::new(MemoryStore::new()));

    match reader.get_job_detail("does not exist").await {
        Err(StatusError::JobNotFound(id)) => {
            assert_eq!(id, "does not exist");
        }
        other => panic!("expected JobNotFound, got {other:?}"),
    }

    // the rendered message names the identifier so clients can echo it
    let err = reader.get_job_detail("does not exist").await.unwrap_err();
    assert!(err.to_string().contains("does not exist"));
}

#[tokio::test]
async fn test_shard_list_is_complete_and_ordered() {
    let shards = vec![
        shard("job-1", 5, true, None),
        shard("job-1", 0, true, None),
        shard("job-1", 3, false, Some(ResultStatus::Success)),
        shard("job-1", 7, true, None),
        shard("job-1", 1, true, None),
        shard("job-1", 6, true, None),
        shard("job-1", 2, true, None),
        shard("job-1", 4, true, None),
    ];
    let reader = seeded_reader(job("job-1", 8, 7), shards).await;

    let detail = reader.get_job_detail("job-1").await.unwrap();
    assert_eq!(detail.shards.len(), 8);
    let numbers: Vec<u32> = detail.shards.iter().map(|shard| shard.shard_number).collect();
    assert_eq!(numbers, (0..8).collect::<Vec<u32>>());
}

#[tokio::test]
async fn test_detail_field_sets_are_exact() {
    let shards = (0..2).map(|n| shard("job-1", n, true, None)).collect();
    let reader = seeded_reader(job("job-1", 2, 2), shards).await;

    let detail: Value =
        serde_json::to_value(reader.get_job_detail("job-1").await.unwrap()).unwrap();

    let keys: BTreeSet<&str> = detail.as_object().unwrap().keys().map(String::as_str).collect();
    let expected: BTreeSet<&str> = [
        "active",
        "chart_url",
        "counters",
        "mapper_spec",
        "mapreduce_id",
        "name",
        "result_status",
        "shards",
        "start_timestamp_ms",
        "updated_timestamp_ms",
    ]
    .into_iter()
    .collect();
    assert_eq!(keys, expected);

    let shard_keys: BTreeSet<&str> = detail["shards"][0]
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    let expected_shard_keys: BTreeSet<&str> = [
        "active",
        "counters",
        "last_work_item",
        "result_status",
        "shard_description",
        "shard_id",
        "shard_number",
        "updated_timestamp_ms",
    ]
    .into_iter()
    .collect();
    assert_eq!(shard_keys, expected_shard_keys);
}

#[tokio::test]
async fn test_unset_result_status_renders_as_null() {
    let shards = vec![shard("job-1", 0, true, None)];
    let reader = seeded_reader(job("job-1", 1, 1), shards).await;

    let detail: Value =
        serde_json::to_value(reader.get_job_detail("job-1").await.unwrap()).unwrap();
    assert!(detail["result_status"].is_null());
    assert!(detail["shards"][0]["result_status"].is_null());
}

#[tokio::test]
async fn test_mapper_spec_wire_shape() {
    let shards = vec![shard("job-1", 0, true, None)];
    let reader = seeded_reader(job("job-1", 1, 1), shards).await;

    let detail: Value =
        serde_json::to_value(reader.get_job_detail("job-1").await.unwrap()).unwrap();
    assert_eq!(
        detail["mapper_spec"],
        serde_json::json!({
            "handler": "handlers.word_count",
            "input_reader": "readers.line_input",
            "params_validator": null,
            "params": [{ "name": "entity_kind", "default": null }]
        })
    );
}

#[tokio::test]
async fn test_shard_description_reflects_state() {
    let shards = vec![
        shard("job-1", 0, true, None),
        shard("job-1", 1, false, Some(ResultStatus::Success)),
        shard("job-1", 2, false, Some(ResultStatus::Failed)),
    ];
    let reader = seeded_reader(job("job-1", 3, 1), shards).await;

    let detail = reader.get_job_detail("job-1").await.unwrap();
    assert_eq!(detail.shards[0].shard_description, "shard 0 running");
    assert_eq!(detail.shards[1].shard_description, "shard 1 success");
    assert_eq!(detail.shards[2].shard_description, "shard 2 failed");
}

#[tokio::test]
async fn test_chart_url_is_deterministic() {
    let shards: Vec<ShardRecord> = (0..4).map(|n| shard("job-1", n, true, None)).collect();
    let reader = seeded_reader(job("job-1", 4, 4), shards).await;

    let first = reader.get_job_detail("job-1").await.unwrap();
    let second = reader.get_job_detail("job-1").await.unwrap();
    assert_eq!(first.chart_url, second.chart_url);
    assert!(!first.chart_url.is_empty());
}

#[tokio::test]
async fn test_missing_shard_records_are_a_store_failure() {
    let shards = vec![shard("job-1", 0, true, None), shard("job-1", 1, true, None)];
    let reader = seeded_reader(job("job-1", 4, 4), shards).await;

    match reader.get_job_detail("job-1").await {
        Err(StatusError::StoreUnavailable(_)) => {}
        other => panic!("expected StoreUnavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn test_gapped_shard_numbers_are_a_store_failure() {
    let shards = vec![shard("job-1", 0, true, None), shard("job-1", 2, true, None)];
    let reader = seeded_reader(job("job-1", 2, 2), shards).await;

    match reader.get_job_detail("job-1").await {
        Err(StatusError::StoreUnavailable(_)) => {}
        other => panic!("expected StoreUnavailable, got {other:?}"),
    }
}
