//! # Launch Session
//!
//! Top-level entry point of a reporting run. A [`Launch`] owns the launch handle
//! for its whole lifetime, starts the remote launch on demand and delegates the
//! item lifecycle to its [`CompletionScheduler`].
//!
//! ```rust,no_run
//! use launch_reporter::config::ReporterConfig;
//! use launch_reporter::launch::LaunchBuilder;
//! use launch_reporter::models::{FinishExecutionRq, FinishTestItemRq, ItemStatus, ItemType, StartTestItemRq};
//! # use launch_reporter::client::ReportPortalClient;
//! # use std::sync::Arc;
//!
//! # async fn example(client: Arc<dyn ReportPortalClient>) -> launch_reporter::error::ReportingResult<()> {
//! let launch = LaunchBuilder::new(client, ReporterConfig::default()).build_from_config();
//! launch.start();
//!
//! let suite = launch.start_test_item(StartTestItemRq::new("suite", ItemType::Suite));
//! let test = launch.start_child_item(&suite, StartTestItemRq::new("test", ItemType::Step));
//! launch.finish_test_item(&test, FinishTestItemRq::with_status(ItemStatus::Passed));
//! launch.finish_test_item(&suite, FinishTestItemRq::with_status(ItemStatus::Passed));
//!
//! let outcome = launch.finish(FinishExecutionRq::now()).await?;
//! # let _ = outcome;
//! # Ok(())
//! # }
//! ```

use crate::client::ReportPortalClient;
use crate::completion::Completion;
use crate::config::ReporterConfig;
use crate::error::{ReportingError, ReportingResult};
use crate::handle::{Handle, ItemHandle, LaunchHandle};
use crate::image::ImageCodec;
use crate::launch_store::LaunchStore;
use crate::logging::{log_created, log_failure};
use crate::logging_context::LoggingContext;
use crate::models::{FinishExecutionRq, FinishTestItemRq, StartLaunchRq, StartTestItemRq};
use crate::resilience::RetryPolicy;
use crate::scheduler::{CompletionScheduler, FinishOutcome};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle as RuntimeHandle;
use tracing::{debug, info, warn};

/// Assembles a [`Launch`] from a client, configuration and optional collaborators
pub struct LaunchBuilder {
    client: Arc<dyn ReportPortalClient>,
    config: Arc<ReporterConfig>,
    store: Option<Arc<dyn LaunchStore>>,
    image_codec: Option<Arc<dyn ImageCodec>>,
    retry: Option<RetryPolicy>,
    runtime: Option<RuntimeHandle>,
}

impl LaunchBuilder {
    pub fn new(client: Arc<dyn ReportPortalClient>, config: ReporterConfig) -> Self {
        Self {
            client,
            config: Arc::new(config),
            store: None,
            image_codec: None,
            retry: None,
            runtime: None,
        }
    }

    /// Store used to record fresh launches and look them up in rerun mode
    pub fn with_store(mut self, store: Arc<dyn LaunchStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Codec applied to image attachments when `convert_image` is enabled
    pub fn with_image_codec(mut self, codec: Arc<dyn ImageCodec>) -> Self {
        self.image_codec = Some(codec);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Runtime that runs every remote call of the launch. Defaults to the runtime
    /// the launch is built in.
    pub fn with_runtime(mut self, runtime: RuntimeHandle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Build a session whose start request comes from the configuration
    pub fn build_from_config(self) -> Launch {
        let mut rq = StartLaunchRq::new(self.config.launch_name.clone());
        rq.description = self.config.description.clone();
        rq.attributes = self.config.attributes.clone();
        rq.mode = self.config.mode;
        self.build(rq)
    }

    /// Build a session for `rq`.
    ///
    /// In rerun mode the launch recorded under the same name is reused and no
    /// start call is made. Otherwise the start call is deferred until the launch
    /// is started (or first needed) and the new handle is recorded in the store.
    ///
    /// # Panics
    ///
    /// Without [`with_runtime`](Self::with_runtime), panics when called outside a
    /// tokio runtime.
    pub fn build(self, rq: StartLaunchRq) -> Launch {
        let name = rq.name.clone();

        let handle = if self.config.rerun {
            self.find_rerun_launch(&name)
        } else {
            let client = self.client.clone();
            let handle = Handle::deferred("launch", async move {
                match client.start_launch(rq).await {
                    Ok(rs) => {
                        log_created("launch", &rs.id);
                        Ok(rs.id)
                    }
                    Err(err) => {
                        log_failure("start launch", &err);
                        Err(err)
                    }
                }
            });
            if let Some(store) = &self.store {
                store.record_launch(&name, &handle);
            }
            handle
        };

        let rerun = self.config.rerun;
        self.into_launch(name, handle, rerun)
    }

    /// Build a session around a launch that was started elsewhere.
    ///
    /// Nothing is started and nothing is recorded. Has the same runtime
    /// requirement as [`build`](Self::build).
    pub fn attach(self, handle: LaunchHandle) -> Launch {
        debug!(key = %handle.key(), "Attaching to existing launch");
        let name = self.config.launch_name.clone();
        let launch = self.into_launch(name, handle, false);
        launch.started.store(true, Ordering::SeqCst);
        launch
    }

    fn find_rerun_launch(&self, name: &str) -> LaunchHandle {
        let found = self
            .store
            .as_ref()
            .and_then(|store| store.find_launch(name));

        match found {
            Some(handle) => {
                info!(launch_name = %name, key = %handle.key(), "Rerun mode: reusing recorded launch");
                handle
            }
            None => {
                let err = ReportingError::unresolved(
                    "launch",
                    format!("no recorded launch named '{name}' to rerun"),
                );
                warn!(launch_name = %name, error = %err, "Rerun mode: launch not found");
                Handle::failed("launch", err)
            }
        }
    }

    fn into_launch(self, name: String, handle: LaunchHandle, rerun: bool) -> Launch {
        let runtime = self.runtime.unwrap_or_else(RuntimeHandle::current);
        let mut scheduler = CompletionScheduler::new(
            self.client,
            self.config,
            handle,
            self.image_codec,
            runtime,
        );
        if let Some(retry) = self.retry {
            scheduler = scheduler.with_retry_policy(retry);
        }
        Launch {
            name,
            rerun,
            started: AtomicBool::new(false),
            scheduler,
        }
    }
}

pub struct Launch {
    name: String,
    rerun: bool,
    started: AtomicBool,
    scheduler: CompletionScheduler,
}

impl Launch {
    pub fn builder(client: Arc<dyn ReportPortalClient>, config: ReporterConfig) -> LaunchBuilder {
        LaunchBuilder::new(client, config)
    }

    /// Start the remote launch. Non-blocking and idempotent: the start call is
    /// issued at most once and every call returns the same handle.
    pub fn start(&self) -> LaunchHandle {
        let handle = self.scheduler.launch().clone();
        if !self.started.swap(true, Ordering::SeqCst) {
            debug!(launch_name = %self.name, rerun = self.rerun, "Starting launch");
            self.scheduler.runtime().spawn(handle.completion());
        }
        handle
    }

    pub fn handle(&self) -> &LaunchHandle {
        self.scheduler.launch()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_rerun(&self) -> bool {
        self.rerun
    }

    /// Start a root item of the launch
    pub fn start_test_item(&self, rq: StartTestItemRq) -> ItemHandle {
        self.scheduler.start_item(None, rq)
    }

    pub fn start_child_item(&self, parent: &ItemHandle, rq: StartTestItemRq) -> ItemHandle {
        self.scheduler.start_item(Some(parent), rq)
    }

    /// Start a retry of `retry_of` under `parent` (or as a root item)
    pub fn start_retry_item(
        &self,
        parent: Option<&ItemHandle>,
        retry_of: &ItemHandle,
        rq: StartTestItemRq,
    ) -> ItemHandle {
        self.scheduler.start_retry_item(parent, retry_of, rq)
    }

    pub fn finish_test_item(&self, item: &ItemHandle, rq: FinishTestItemRq) -> Completion {
        self.scheduler.finish_item(item, rq)
    }

    /// Logging context of an item that is still open
    pub fn logging_context(&self, item: &ItemHandle) -> Option<Arc<LoggingContext>> {
        self.scheduler.logging_context(item)
    }

    /// Finish the launch after every item finish has settled, waiting at most the
    /// configured reporting timeout.
    pub async fn finish(&self, rq: FinishExecutionRq) -> ReportingResult<FinishOutcome> {
        info!(launch_name = %self.name, "Finishing launch");
        self.scheduler.finish_launch(rq).await
    }

    pub fn scheduler(&self) -> &CompletionScheduler {
        &self.scheduler
    }
}
