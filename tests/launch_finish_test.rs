//! Launch finish: compensation, timeout and connection release

mod common;

use common::*;
use launch_reporter::models::FinishExecutionRq;
use launch_reporter::test_utils::{Call, RecordingClient};
use launch_reporter::{FinishOutcome, ReporterConfig, ReportingError};
use std::sync::Arc;
use std::time::Duration;

const INCORRECT_FINISH_STATUS: &str = "INCORRECT_FINISH_STATUS";

fn is_stop(call: &Call) -> bool {
    matches!(call, Call::StopLaunch { .. })
}

#[tokio::test]
async fn test_force_finish_stops_launch_on_incorrect_status() {
    let client = Arc::new(RecordingClient::new().with_finish_launch_error(INCORRECT_FINISH_STATUS));
    let config = ReporterConfig {
        force_finish_launch: true,
        ..ReporterConfig::default()
    };
    let launch = launch_for(&client, "forced", config);
    launch.start();

    let item = launch.start_test_item(step("only"));
    launch.finish_test_item(&item, passed());

    let outcome = launch
        .finish(FinishExecutionRq::now())
        .await
        .expect("no error surfaced");
    assert_eq!(outcome, FinishOutcome::Stopped);

    let rejected = position_where(&client, |call| {
        matches!(call, Call::LaunchFinished { ok: false, .. })
    });
    let stop = position_where(&client, is_stop);
    let close = position_where(&client, |call| *call == Call::Close);
    assert!(rejected < stop);
    assert!(stop < close);
    assert_eq!(client.count(|call| *call == Call::Close), 1);
}

#[tokio::test]
async fn test_incorrect_status_without_force_finish_is_only_logged() {
    let client = Arc::new(RecordingClient::new().with_finish_launch_error(INCORRECT_FINISH_STATUS));
    let launch = launch_for(&client, "strict", ReporterConfig::default());

    let outcome = launch
        .finish(FinishExecutionRq::now())
        .await
        .expect("no error surfaced");
    assert_eq!(outcome, FinishOutcome::Rejected);
    assert_eq!(client.count(is_stop), 0);
    assert_eq!(client.count(|call| *call == Call::Close), 1);
}

#[tokio::test]
async fn test_other_finish_errors_are_not_compensated() {
    let client = Arc::new(RecordingClient::new().with_finish_launch_error("ACCESS_DENIED"));
    let config = ReporterConfig {
        force_finish_launch: true,
        ..ReporterConfig::default()
    };
    let launch = launch_for(&client, "denied", config);

    let outcome = launch
        .finish(FinishExecutionRq::now())
        .await
        .expect("no error surfaced");
    assert_eq!(outcome, FinishOutcome::Rejected);
    assert_eq!(client.count(is_stop), 0);
    assert_eq!(client.count(|call| *call == Call::Close), 1);
}

#[tokio::test]
async fn test_failed_launch_start_still_closes_connection() {
    let client = Arc::new(RecordingClient::new().with_launch_start_error("PROJECT_NOT_FOUND"));
    let launch = launch_for(&client, "unreachable", ReporterConfig::default());

    assert!(launch.start().resolve().await.is_err());
    let item = launch.start_test_item(step("never-started"));
    launch.finish_test_item(&item, passed()).await;

    let outcome = launch
        .finish(FinishExecutionRq::now())
        .await
        .expect("no error surfaced");
    assert_eq!(outcome, FinishOutcome::Rejected);
    assert_eq!(client.count(|call| matches!(call, Call::FinishLaunch { .. })), 0);
    assert_eq!(client.count(|call| *call == Call::Close), 1);
}

#[tokio::test(start_paused = true)]
async fn test_finish_wait_times_out_without_aborting_the_call() {
    let client = Arc::new(
        RecordingClient::new().with_finish_launch_latency(Duration::from_secs(60)),
    );
    let config = ReporterConfig {
        reporting_timeout_secs: 5,
        ..ReporterConfig::default()
    };
    let launch = launch_for(&client, "slow", config);
    launch.start();

    let started = tokio::time::Instant::now();
    let result = launch.finish(FinishExecutionRq::now()).await;
    assert!(matches!(
        result,
        Err(ReportingError::Timeout {
            timeout_seconds: 5,
            ..
        })
    ));
    assert!(started.elapsed() >= Duration::from_secs(5));
    assert!(started.elapsed() < Duration::from_secs(6));
    assert_eq!(client.count(|call| *call == Call::Close), 0);

    // the remote call keeps running in the background and still releases the connection
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(client
        .calls()
        .contains(&Call::LaunchFinished {
            launch_id: "launch-slow".to_string(),
            ok: true,
        }));
    assert_eq!(client.count(|call| *call == Call::Close), 1);
}

#[tokio::test]
async fn test_second_finish_is_rejected() {
    let client = Arc::new(RecordingClient::new());
    let launch = launch_for(&client, "twice", ReporterConfig::default());

    launch
        .finish(FinishExecutionRq::now())
        .await
        .expect("first finish succeeds");
    let second = launch.finish(FinishExecutionRq::now()).await;

    assert!(matches!(second, Err(ReportingError::LaunchAlreadyFinished)));
    assert_eq!(client.count(|call| matches!(call, Call::FinishLaunch { .. })), 1);
    assert_eq!(client.count(|call| *call == Call::Close), 1);
}
