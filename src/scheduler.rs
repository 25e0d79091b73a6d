//! # Completion Scheduler
//!
//! Sequences the remote start/finish protocol so the remote service always sees a
//! consistent completion order even though callers start and finish items out of
//! order and every remote call runs asynchronously.
//!
//! ## Item lifecycle
//!
//! ```text
//! Started ──▶ AwaitingChildren ──▶ Finishing ──▶ Finished | Failed
//!   │               │                   │
//!   │               │                   └─ finish call through the retry policy,
//!   │               │                      node invalidated on success
//!   │               └─ children observed in registration order
//!   └─ start call in flight, handle already usable as a key
//! ```
//!
//! Finishing an item registers its composed finish operation as a child of its
//! parent's node (or of the launch root), so a parent's finish transitively waits
//! for every descendant. Failures are logged and count as resolved: one broken item
//! never blocks its siblings or its parent.

use crate::client::ReportPortalClient;
use crate::completion::{self, Completion};
use crate::config::ReporterConfig;
use crate::error::{ReportingError, ReportingResult};
use crate::handle::{Handle, HandleKey, ItemHandle, LaunchHandle};
use crate::image::ImageCodec;
use crate::logging::{log_completed, log_created, log_failure};
use crate::logging_context::LoggingContext;
use crate::models::{
    FinishExecutionRq, FinishTestItemRq, Issue, ItemStatus, StartTestItemRq, NOT_ISSUE,
};
use crate::registry::ItemTreeRegistry;
use crate::resilience::RetryPolicy;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle as RuntimeHandle;
use tracing::{debug, error, info};

/// How the launch-finish chain settled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishOutcome {
    /// The launch was finished normally
    Finished,
    /// Finishing was rejected with an incorrect status and the launch was stopped instead
    Stopped,
    /// The remote service refused to finish (or stop) the launch; the failure was logged
    Rejected,
}

pub struct CompletionScheduler {
    client: Arc<dyn ReportPortalClient>,
    config: Arc<ReporterConfig>,
    launch: LaunchHandle,
    registry: Arc<ItemTreeRegistry>,
    contexts: DashMap<HandleKey, Arc<LoggingContext>>,
    retry: RetryPolicy,
    image_codec: Option<Arc<dyn ImageCodec>>,
    launch_finished: AtomicBool,
    runtime: RuntimeHandle,
}

impl CompletionScheduler {
    /// Scheduler whose remote work runs on `runtime`, so items can be started and
    /// finished from threads that are not part of it.
    pub fn new(
        client: Arc<dyn ReportPortalClient>,
        config: Arc<ReporterConfig>,
        launch: LaunchHandle,
        image_codec: Option<Arc<dyn ImageCodec>>,
        runtime: RuntimeHandle,
    ) -> Self {
        let retry = RetryPolicy::for_item_finish(&config);
        let image_codec = image_codec.filter(|_| config.convert_image);
        Self {
            client,
            config,
            launch,
            registry: Arc::new(ItemTreeRegistry::new()),
            contexts: DashMap::new(),
            retry,
            image_codec,
            launch_finished: AtomicBool::new(false),
            runtime,
        }
    }

    /// Override the item-finish retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn launch(&self) -> &LaunchHandle {
        &self.launch
    }

    pub fn registry(&self) -> &Arc<ItemTreeRegistry> {
        &self.registry
    }

    pub fn runtime(&self) -> &RuntimeHandle {
        &self.runtime
    }

    /// Open logging context of an item that has not finished yet
    pub fn logging_context(&self, item: &ItemHandle) -> Option<Arc<LoggingContext>> {
        self.contexts.get(&item.key()).map(|entry| entry.value().clone())
    }

    /// Start an item under `parent`, or as a root item. Non-blocking: the returned
    /// handle can key children and finishes before its identifier resolves.
    pub fn start_item(&self, parent: Option<&ItemHandle>, rq: StartTestItemRq) -> ItemHandle {
        self.start_item_after(parent, None, rq)
    }

    /// Start a retry of `retry_of` once that item's own start has resolved
    pub fn start_retry_item(
        &self,
        parent: Option<&ItemHandle>,
        retry_of: &ItemHandle,
        mut rq: StartTestItemRq,
    ) -> ItemHandle {
        rq.retry = true;
        self.start_item_after(parent, Some(retry_of.clone()), rq)
    }

    fn start_item_after(
        &self,
        parent: Option<&ItemHandle>,
        after: Option<ItemHandle>,
        rq: StartTestItemRq,
    ) -> ItemHandle {
        let client = self.client.clone();
        let launch = self.launch.clone();
        let parent_handle = parent.cloned();

        let item = Handle::spawn(&self.runtime, "item", async move {
            let result = async {
                if let Some(previous) = after {
                    previous
                        .resolve()
                        .await
                        .map_err(|err| ReportingError::unresolved("retried item", err))?;
                }
                let launch_id = launch
                    .resolve()
                    .await
                    .map_err(|err| ReportingError::unresolved("launch", err))?;
                let parent_id = match &parent_handle {
                    Some(parent) => Some(
                        parent
                            .resolve()
                            .await
                            .map_err(|err| ReportingError::unresolved("parent item", err))?,
                    ),
                    None => None,
                };

                let mut rq = rq;
                rq.launch_id = Some(launch_id);
                debug!(name = %rq.name, parent = ?parent_id, "Starting test item");
                let rs = client.start_test_item(parent_id.as_deref(), rq).await?;
                log_created("item", &rs.id);
                Ok::<_, ReportingError>(rs.id)
            }
            .await;

            if let Err(err) = &result {
                log_failure("start test item", err);
            }
            result
        });

        // the item's own start is the first thing its finish waits for
        self.registry.add_child(item.key(), item.completion());
        if let Some(parent) = parent {
            self.registry.set_parent(item.key(), parent.clone());
        }

        let context = LoggingContext::init(
            &self.runtime,
            item.clone(),
            self.client.clone(),
            self.config.batch_log_size,
            self.image_codec.clone(),
        );
        self.contexts.insert(item.key(), context);

        item
    }

    /// Schedule the finish of `item` after all of its registered children.
    ///
    /// Non-blocking. The returned completion resolves once the composed finish
    /// operation has settled, successfully or not.
    pub fn finish_item(&self, item: &ItemHandle, mut rq: FinishTestItemRq) -> Completion {
        if rq.status == Some(ItemStatus::Skipped) && !self.config.skipped_is_issue {
            rq.issue = Some(Issue {
                issue_type: NOT_ISSUE.to_string(),
                comment: None,
            });
        }

        let node = match self.registry.get_if_present(item.key()) {
            Some(node) => node,
            None => {
                error!(item = ?item, "Item not found in the completion tree");
                self.registry.get_or_create(item.key())
            }
        };

        if let Some((_, context)) = self.contexts.remove(&item.key()) {
            node.add_child(context.complete());
        }

        let children = node.children();
        let parent = node.parent();
        let client = self.client.clone();
        let registry = self.registry.clone();
        let retry = self.retry;
        let item = item.clone();

        let task = self.runtime.spawn(async move {
            completion::concat(children).await;

            let result = async {
                let item_id = item
                    .resolve()
                    .await
                    .map_err(|err| ReportingError::unresolved("item", err))?;
                let rs = retry
                    .run("finish test item", ReportingError::is_retryable, || {
                        let client = client.clone();
                        let rq = rq.clone();
                        let item_id = item_id.clone();
                        async move { client.finish_test_item(&item_id, rq).await }
                    })
                    .await?;
                Ok::<_, ReportingError>((item_id, rs))
            }
            .await;

            match result {
                Ok((item_id, rs)) => {
                    log_completed("finish test item", &item_id, Some(&rs.result_message));
                    registry.invalidate(item.key());
                }
                Err(err) => log_failure("finish test item", &err),
            }
        });

        let finished = Completion::from_task(task);
        let parent_key = parent
            .map(|parent| parent.key())
            .unwrap_or_else(|| self.launch.key());
        self.registry.add_child(parent_key, finished.clone());
        finished
    }

    /// Finish the launch once every root item's finish chain has settled.
    ///
    /// Waits up to the configured reporting timeout. On timeout the chain keeps
    /// running in the background; only the wait is abandoned. The client is closed
    /// exactly once when the chain settles.
    pub async fn finish_launch(&self, rq: FinishExecutionRq) -> ReportingResult<FinishOutcome> {
        if self.launch_finished.swap(true, Ordering::SeqCst) {
            return Err(ReportingError::LaunchAlreadyFinished);
        }

        let children = self.registry.get_or_create(self.launch.key()).children();
        let client = self.client.clone();
        let registry = self.registry.clone();
        let launch = self.launch.clone();
        let force_finish = self.config.force_finish_launch;
        let runtime = self.runtime.clone();

        let chain = self.runtime.spawn(async move {
            let finish = runtime.spawn({
                let client = client.clone();
                let launch = launch.clone();
                async move {
                    completion::concat(children).await;
                    Self::finish_or_stop(client, launch, rq, force_finish).await
                }
            });

            let outcome = finish.await.unwrap_or_else(|join_err| {
                log_failure("finish launch", &ReportingError::from(join_err));
                FinishOutcome::Rejected
            });

            client.close().await;
            registry.invalidate(launch.key());
            debug!(outcome = ?outcome, "Reporting connection closed");
            outcome
        });

        let timeout = self.config.reporting_timeout();
        match tokio::time::timeout(timeout, chain).await {
            Ok(joined) => Ok(joined?),
            Err(_) => {
                let err = ReportingError::timeout("finish launch", timeout.as_secs());
                error!(error = %err, "Unable to finish launch in time");
                Err(err)
            }
        }
    }

    async fn finish_or_stop(
        client: Arc<dyn ReportPortalClient>,
        launch: LaunchHandle,
        rq: FinishExecutionRq,
        force_finish: bool,
    ) -> FinishOutcome {
        let launch_id = match launch.resolve().await {
            Ok(id) => id,
            Err(err) => {
                log_failure("finish launch", &ReportingError::unresolved("launch", err));
                return FinishOutcome::Rejected;
            }
        };

        match client.finish_launch(&launch_id, rq.clone()).await {
            Ok(rs) => {
                log_completed("finish launch", &launch_id, Some(&rs.result_message));
                FinishOutcome::Finished
            }
            Err(err) if force_finish && err.is_incorrect_finish_status() => {
                info!(
                    launch_id = %launch_id,
                    "Unable to finish launch due to incorrect status - stopping instead"
                );
                Self::stop_launch(client.as_ref(), &launch_id, rq).await
            }
            Err(err) => {
                log_failure("finish launch", &err);
                FinishOutcome::Rejected
            }
        }
    }

    /// Compensating action for a launch finish rejected with an incorrect status
    async fn stop_launch(
        client: &dyn ReportPortalClient,
        launch_id: &str,
        rq: FinishExecutionRq,
    ) -> FinishOutcome {
        match client.stop_launch(launch_id, rq).await {
            Ok(rs) => {
                log_completed("stop launch", launch_id, Some(&rs.result_message));
                FinishOutcome::Stopped
            }
            Err(err) => {
                log_failure("stop launch", &err);
                FinishOutcome::Rejected
            }
        }
    }
}
