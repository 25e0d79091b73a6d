//! # Test Utilities
//!
//! A scriptable in-process [`ReportPortalClient`] that records every remote call,
//! and every call's resolution, in one global order. Used by the unit tests and the
//! integration suites to check completion ordering without a remote service.
//!
//! Item identifiers equal the item names and launch identifiers are
//! `launch-<name>`, so tests should give items unique names.

use crate::client::{MultiPartRequest, ReportPortalClient};
use crate::error::{ReportingError, ReportingResult};
use crate::models::{
    BatchSaveOperatingRs, EntryCreatedRs, FinishExecutionRq, FinishTestItemRq, ItemCreatedRs,
    OperationCompletionRs, SaveLogRq, StartLaunchRq, StartLaunchRs, StartTestItemRq,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// One observable event at the remote boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    StartLaunch { name: String },
    StartItem {
        item_id: String,
        parent_id: Option<String>,
        launch_id: Option<String>,
    },
    /// A finish-item call was invoked
    FinishItem { item_id: String },
    /// A finish-item call resolved
    ItemFinished { item_id: String, ok: bool },
    FinishLaunch { launch_id: String },
    LaunchFinished { launch_id: String, ok: bool },
    StopLaunch { launch_id: String },
    /// A single-entry log call made by the host
    Log { item_id: String },
    LogBatch { entries: usize, attachments: usize },
    Close,
}

#[derive(Debug, Default)]
struct Script {
    start_latency: HashMap<String, Duration>,
    finish_latency: HashMap<String, Duration>,
    failing_starts: HashMap<String, String>,
    /// item id -> (error code, remaining failures)
    failing_finishes: HashMap<String, (String, u32)>,
    launch_start_error: Option<String>,
    finish_launch_error: Option<String>,
    finish_launch_latency: Option<Duration>,
    log_latency: Option<Duration>,
}

#[derive(Debug, Default)]
pub struct RecordingClient {
    script: Script,
    calls: Mutex<Vec<Call>>,
    batches: Mutex<Vec<MultiPartRequest>>,
    finish_attempts: Mutex<HashMap<String, usize>>,
    finish_requests: Mutex<HashMap<String, FinishTestItemRq>>,
    finished_log_batches: AtomicUsize,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay the start call of the named item
    pub fn with_start_latency(mut self, item: &str, latency: Duration) -> Self {
        self.script.start_latency.insert(item.to_string(), latency);
        self
    }

    /// Delay the finish call of the named item
    pub fn with_finish_latency(mut self, item: &str, latency: Duration) -> Self {
        self.script.finish_latency.insert(item.to_string(), latency);
        self
    }

    pub fn with_failing_start(mut self, item: &str, code: &str) -> Self {
        self.script
            .failing_starts
            .insert(item.to_string(), code.to_string());
        self
    }

    /// Reject the first `times` finish calls of the item with `code`
    pub fn with_failing_finish(mut self, item: &str, code: &str, times: u32) -> Self {
        self.script
            .failing_finishes
            .insert(item.to_string(), (code.to_string(), times));
        self
    }

    pub fn with_launch_start_error(mut self, code: &str) -> Self {
        self.script.launch_start_error = Some(code.to_string());
        self
    }

    pub fn with_finish_launch_error(mut self, code: &str) -> Self {
        self.script.finish_launch_error = Some(code.to_string());
        self
    }

    pub fn with_finish_launch_latency(mut self, latency: Duration) -> Self {
        self.script.finish_launch_latency = Some(latency);
        self
    }

    pub fn with_log_latency(mut self, latency: Duration) -> Self {
        self.script.log_latency = Some(latency);
        self
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Index of the first occurrence of `call` in the recorded order
    pub fn position(&self, call: &Call) -> Option<usize> {
        self.calls.lock().iter().position(|c| c == call)
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| predicate(c)).count()
    }

    pub fn finish_attempts(&self, item: &str) -> usize {
        self.finish_attempts.lock().get(item).copied().unwrap_or(0)
    }

    /// Most recent finish request sent for the item
    pub fn last_finish_request(&self, item: &str) -> Option<FinishTestItemRq> {
        self.finish_requests.lock().get(item).cloned()
    }

    pub fn log_batches(&self) -> Vec<MultiPartRequest> {
        self.batches.lock().clone()
    }

    /// Number of batch dispatches that have resolved
    pub fn finished_log_batches(&self) -> usize {
        self.finished_log_batches.load(Ordering::SeqCst)
    }

    fn take_finish_failure(&self, item_id: &str) -> Option<String> {
        let (code, remaining) = self.script.failing_finishes.get(item_id)?;
        let attempts = *self.finish_attempts.lock().get(item_id).unwrap_or(&0);
        (attempts as u64 <= u64::from(*remaining)).then(|| code.clone())
    }
}

async fn pause(latency: Option<&Duration>) {
    if let Some(latency) = latency {
        tokio::time::sleep(*latency).await;
    }
}

#[async_trait]
impl ReportPortalClient for RecordingClient {
    async fn start_launch(&self, rq: StartLaunchRq) -> ReportingResult<StartLaunchRs> {
        self.record(Call::StartLaunch {
            name: rq.name.clone(),
        });
        if let Some(code) = &self.script.launch_start_error {
            return Err(ReportingError::remote(code, "launch start rejected"));
        }
        Ok(StartLaunchRs {
            id: format!("launch-{}", rq.name),
            number: Some(1),
        })
    }

    async fn finish_launch(
        &self,
        launch_id: &str,
        _rq: FinishExecutionRq,
    ) -> ReportingResult<OperationCompletionRs> {
        self.record(Call::FinishLaunch {
            launch_id: launch_id.to_string(),
        });
        pause(self.script.finish_launch_latency.as_ref()).await;
        let result = match &self.script.finish_launch_error {
            Some(code) => Err(ReportingError::remote(code, "launch finish rejected")),
            None => Ok(OperationCompletionRs {
                result_message: format!("Launch {launch_id} finished"),
            }),
        };
        self.record(Call::LaunchFinished {
            launch_id: launch_id.to_string(),
            ok: result.is_ok(),
        });
        result
    }

    async fn stop_launch(
        &self,
        launch_id: &str,
        _rq: FinishExecutionRq,
    ) -> ReportingResult<OperationCompletionRs> {
        self.record(Call::StopLaunch {
            launch_id: launch_id.to_string(),
        });
        Ok(OperationCompletionRs {
            result_message: format!("Launch {launch_id} stopped"),
        })
    }

    async fn start_test_item(
        &self,
        parent_id: Option<&str>,
        rq: StartTestItemRq,
    ) -> ReportingResult<ItemCreatedRs> {
        pause(self.script.start_latency.get(&rq.name)).await;
        self.record(Call::StartItem {
            item_id: rq.name.clone(),
            parent_id: parent_id.map(str::to_string),
            launch_id: rq.launch_id.clone(),
        });
        if let Some(code) = self.script.failing_starts.get(&rq.name) {
            return Err(ReportingError::remote(code, "item start rejected"));
        }
        Ok(ItemCreatedRs { id: rq.name })
    }

    async fn finish_test_item(
        &self,
        item_id: &str,
        rq: FinishTestItemRq,
    ) -> ReportingResult<OperationCompletionRs> {
        self.record(Call::FinishItem {
            item_id: item_id.to_string(),
        });
        self.finish_requests.lock().insert(item_id.to_string(), rq);
        *self
            .finish_attempts
            .lock()
            .entry(item_id.to_string())
            .or_insert(0) += 1;
        pause(self.script.finish_latency.get(item_id)).await;

        let result = match self.take_finish_failure(item_id) {
            Some(code) => Err(ReportingError::remote(&code, "item finish rejected")),
            None => Ok(OperationCompletionRs {
                result_message: format!("Item {item_id} finished"),
            }),
        };
        self.record(Call::ItemFinished {
            item_id: item_id.to_string(),
            ok: result.is_ok(),
        });
        result
    }

    async fn log(&self, rq: SaveLogRq) -> ReportingResult<EntryCreatedRs> {
        self.record(Call::Log {
            item_id: rq.item_id.clone(),
        });
        Ok(EntryCreatedRs {
            id: format!("log-{}", rq.item_id),
        })
    }

    async fn log_batch(&self, rq: MultiPartRequest) -> ReportingResult<BatchSaveOperatingRs> {
        self.record(Call::LogBatch {
            entries: rq.len(),
            attachments: rq.binary_parts.len(),
        });
        let responses = rq
            .entries
            .iter()
            .enumerate()
            .map(|(n, entry)| EntryCreatedRs {
                id: format!("log-{}-{n}", entry.item_id),
            })
            .collect();
        self.batches.lock().push(rq);
        pause(self.script.log_latency.as_ref()).await;
        self.finished_log_batches.fetch_add(1, Ordering::SeqCst);
        Ok(BatchSaveOperatingRs { responses })
    }

    async fn close(&self) {
        self.record(Call::Close);
    }
}
