#![allow(dead_code)]

//! Shared builders for the integration suites

use launch_reporter::models::{
    FinishTestItemRq, ItemStatus, ItemType, StartLaunchRq, StartTestItemRq,
};
use launch_reporter::test_utils::{Call, RecordingClient};
use launch_reporter::{Launch, LaunchBuilder, ReporterConfig};
use std::sync::Arc;

pub fn launch_for(client: &Arc<RecordingClient>, name: &str, config: ReporterConfig) -> Launch {
    LaunchBuilder::new(client.clone(), config).build(StartLaunchRq::new(name))
}

pub fn suite(name: &str) -> StartTestItemRq {
    StartTestItemRq::new(name, ItemType::Suite)
}

pub fn step(name: &str) -> StartTestItemRq {
    StartTestItemRq::new(name, ItemType::Step)
}

pub fn passed() -> FinishTestItemRq {
    FinishTestItemRq::with_status(ItemStatus::Passed)
}

/// Position of the first recorded call matching `predicate`
pub fn position_where(client: &RecordingClient, predicate: impl Fn(&Call) -> bool) -> usize {
    client
        .calls()
        .iter()
        .position(|call| predicate(call))
        .unwrap_or_else(|| panic!("expected call not recorded in {:?}", client.calls()))
}

pub fn item_finished(client: &RecordingClient, item: &str) -> usize {
    position_where(client, |call| {
        matches!(call, Call::ItemFinished { item_id, .. } if item_id == item)
    })
}

pub fn finish_invoked(client: &RecordingClient, item: &str) -> usize {
    position_where(client, |call| {
        matches!(call, Call::FinishItem { item_id } if item_id == item)
    })
}
