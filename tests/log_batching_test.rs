//! Log batches emitted through a launch session

mod common;

use common::*;
use launch_reporter::client::OCTET_STREAM;
use launch_reporter::models::{LogFile, LogLevel, SaveLogRq};
use launch_reporter::test_utils::{Call, RecordingClient};
use launch_reporter::{emit_log, spawn_in_context, ReporterConfig};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_fifteen_logs_dispatch_as_ten_then_five() {
    let client = Arc::new(RecordingClient::new().with_log_latency(Duration::from_millis(20)));
    let launch = launch_for(&client, "logs", ReporterConfig::default());
    let item = launch.start_test_item(step("chatty"));

    let context = launch.logging_context(&item).expect("context open while item runs");
    for n in 0..15 {
        assert!(context.emit(move |id| SaveLogRq::new(id, LogLevel::Info, format!("line {n}"))));
    }

    let drained = context.complete();
    drained.clone().await;
    assert!(drained.is_done());
    assert_eq!(client.finished_log_batches(), 2);

    let sizes: Vec<usize> = client.log_batches().iter().map(|batch| batch.len()).collect();
    assert_eq!(sizes, vec![10, 5]);
    assert!(client
        .log_batches()
        .iter()
        .flat_map(|batch| batch.entries.iter())
        .all(|entry| entry.item_id == "chatty"));

    launch.finish_test_item(&item, passed()).await;
    let last_batch = client
        .calls()
        .iter()
        .rposition(|call| matches!(call, Call::LogBatch { .. }))
        .expect("batches dispatched");
    assert!(last_batch < finish_invoked(&client, "chatty"));
    // entries only ever leave through batches
    assert_eq!(client.count(|call| matches!(call, Call::Log { .. })), 0);
}

#[tokio::test]
async fn test_attachment_without_content_type_is_sent_as_octet_stream() {
    let client = Arc::new(RecordingClient::new());
    let launch = launch_for(&client, "attachments", ReporterConfig::default());
    let item = launch.start_test_item(step("with-file"));

    let context = launch.logging_context(&item).expect("context open");
    context.emit(|id| {
        SaveLogRq::new(id, LogLevel::Error, "dump attached").with_file(LogFile {
            name: "dump.bin".to_string(),
            content: vec![0xde, 0xad],
            content_type: Some(String::new()),
        })
    });
    launch.finish_test_item(&item, passed()).await;

    let batches = client.log_batches();
    assert_eq!(batches.len(), 1);
    let part = &batches[0].binary_parts[0];
    assert_eq!(part.file_name, "dump.bin");
    assert_eq!(part.content_type, OCTET_STREAM);
    assert_eq!(part.content, vec![0xde, 0xad]);
}

#[tokio::test]
async fn test_nested_work_logs_to_the_active_item() {
    let client = Arc::new(RecordingClient::new());
    let launch = launch_for(&client, "nested", ReporterConfig::default());
    let outer = launch.start_test_item(suite("outer"));
    let inner = launch.start_child_item(&outer, step("inner"));

    let context = launch.logging_context(&inner).expect("context open");
    context
        .scope(async {
            assert!(emit_log(|id| SaveLogRq::new(id, LogLevel::Debug, "in test body")));
            let nested = spawn_in_context(async {
                emit_log(|id| SaveLogRq::new(id, LogLevel::Debug, "in spawned helper"))
            });
            assert!(nested.await.expect("helper task ran"));
        })
        .await;

    // no active context outside the scope
    assert!(!emit_log(|id| SaveLogRq::new(id, LogLevel::Debug, "stray")));

    launch.finish_test_item(&inner, passed());
    launch.finish_test_item(&outer, passed()).await;

    let entries: Vec<_> = client
        .log_batches()
        .into_iter()
        .flat_map(|batch| batch.entries)
        .collect();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|entry| entry.item_id == "inner"));
}

#[tokio::test]
async fn test_context_closes_when_item_finishes() {
    let client = Arc::new(RecordingClient::new());
    let launch = launch_for(&client, "closing", ReporterConfig::default());
    let item = launch.start_test_item(step("short"));

    let context = launch.logging_context(&item).expect("context open");
    launch.finish_test_item(&item, passed()).await;

    assert!(context.is_completed());
    assert!(launch.logging_context(&item).is_none());
    assert!(!context.emit(|id| SaveLogRq::new(id, LogLevel::Info, "too late")));
    assert!(client.log_batches().is_empty());
}
