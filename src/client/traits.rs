//! # Remote Client Trait
//!
//! Async interface to the remote test-management service. Every call resolves at
//! most once; a call that never resolves must be guarded by whoever awaits it
//! synchronously (only the launch finish does).

use crate::client::multipart::MultiPartRequest;
use crate::error::ReportingResult;
use crate::models::{
    BatchSaveOperatingRs, EntryCreatedRs, FinishExecutionRq, FinishTestItemRq, ItemCreatedRs,
    OperationCompletionRs, SaveLogRq, StartLaunchRq, StartLaunchRs, StartTestItemRq,
};
use async_trait::async_trait;

/// Transport-agnostic client of the remote reporting service.
///
/// Implementations are shared by every worker thread of a launch, so they must be
/// `Send + Sync` and tolerate concurrent calls.
#[async_trait]
pub trait ReportPortalClient: Send + Sync {
    async fn start_launch(&self, rq: StartLaunchRq) -> ReportingResult<StartLaunchRs>;

    async fn finish_launch(
        &self,
        launch_id: &str,
        rq: FinishExecutionRq,
    ) -> ReportingResult<OperationCompletionRs>;

    async fn stop_launch(
        &self,
        launch_id: &str,
        rq: FinishExecutionRq,
    ) -> ReportingResult<OperationCompletionRs>;

    /// Start an item, as a root item when `parent_id` is `None`
    async fn start_test_item(
        &self,
        parent_id: Option<&str>,
        rq: StartTestItemRq,
    ) -> ReportingResult<ItemCreatedRs>;

    async fn finish_test_item(
        &self,
        item_id: &str,
        rq: FinishTestItemRq,
    ) -> ReportingResult<OperationCompletionRs>;

    /// Send a single log entry without attachments.
    ///
    /// For hosts that report entries outside an item's logging context. The
    /// reporting core itself always goes through [`log_batch`](Self::log_batch).
    async fn log(&self, rq: SaveLogRq) -> ReportingResult<EntryCreatedRs>;

    /// Send a batch of log entries as one multipart payload
    async fn log_batch(&self, rq: MultiPartRequest) -> ReportingResult<BatchSaveOperatingRs>;

    /// Release the underlying connection resources
    async fn close(&self);
}
