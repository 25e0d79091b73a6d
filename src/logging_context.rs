//! # Logging Context
//!
//! Per-item log pipeline: entries emitted while an item runs are queued without
//! blocking the caller, stamped with the item's identifier once it resolves,
//! grouped into fixed-size batches and dispatched as multipart requests.
//!
//! ## Flow
//!
//! ```text
//! emit(factory) ──▶ unbounded queue ──▶ resolve item id ──▶ convert image?
//!                                                               │
//!        complete() ◀── last batch sent ◀── send batch(N) ◀─────┘
//! ```
//!
//! Batches of one item are sent one after another, in the order they were filled.
//! The queue is unbounded: a stalled dispatcher makes memory grow rather than
//! stalling the test that emits logs.
//!
//! ## Context propagation
//!
//! The active context travels with the task through a tokio task-local. Enter it
//! with [`LoggingContext::scope`]; [`emit_log`] and [`spawn_in_context`] pick it up
//! without the item identifier being threaded through every call.

use crate::client::{MultiPartRequest, ReportPortalClient};
use crate::completion::Completion;
use crate::config::DEFAULT_BATCH_LOG_SIZE;
use crate::error::SharedResult;
use crate::handle::ItemHandle;
use crate::image::ImageCodec;
use crate::logging::log_failure;
use crate::models::SaveLogRq;
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle as RuntimeHandle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

tokio::task_local! {
    static CURRENT_CONTEXT: Arc<LoggingContext>;
}

/// Builds a log entry from the resolved item identifier
pub type LogFactory = Box<dyn FnOnce(&str) -> SaveLogRq + Send>;

pub struct LoggingContext {
    item: ItemHandle,
    sender: Mutex<Option<mpsc::UnboundedSender<LogFactory>>>,
    drained: Completion,
}

impl LoggingContext {
    /// Start the pipeline for `item`, running its worker on `runtime`
    pub fn init(
        runtime: &RuntimeHandle,
        item: ItemHandle,
        client: Arc<dyn ReportPortalClient>,
        batch_size: usize,
        image_codec: Option<Arc<dyn ImageCodec>>,
    ) -> Arc<Self> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let worker = BatchWorker {
            item: item.clone(),
            client,
            batch_size: if batch_size == 0 {
                DEFAULT_BATCH_LOG_SIZE
            } else {
                batch_size
            },
            image_codec,
        };
        let drained = Completion::from_task(runtime.spawn(worker.run(receiver)));

        Arc::new(Self {
            item,
            sender: Mutex::new(Some(sender)),
            drained,
        })
    }

    pub fn item(&self) -> &ItemHandle {
        &self.item
    }

    /// Queue a log entry. Returns false when the context has already completed.
    pub fn emit<F>(&self, factory: F) -> bool
    where
        F: FnOnce(&str) -> SaveLogRq + Send + 'static,
    {
        let sender = self.sender.lock();
        match sender.as_ref() {
            Some(sender) => sender.send(Box::new(factory)).is_ok(),
            None => {
                warn!(item = %self.item.key(), "Log emitted after its context completed, dropping");
                false
            }
        }
    }

    /// Stop accepting entries. The returned completion resolves once the final
    /// partial batch and every earlier batch have been dispatched.
    pub fn complete(&self) -> Completion {
        if self.sender.lock().take().is_some() {
            debug!(item = %self.item.key(), "Logging context completed");
        }
        self.drained.clone()
    }

    pub fn is_completed(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// Run `future` with this context as the active one
    pub async fn scope<F>(self: Arc<Self>, future: F) -> F::Output
    where
        F: Future,
    {
        CURRENT_CONTEXT.scope(self, future).await
    }

    /// The context active for the current task, if any
    pub fn current() -> Option<Arc<Self>> {
        CURRENT_CONTEXT.try_with(Arc::clone).ok()
    }
}

impl fmt::Debug for LoggingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingContext")
            .field("item", &self.item)
            .field("completed", &self.is_completed())
            .finish()
    }
}

/// Emit a log entry on the active context. Returns false when there is none.
pub fn emit_log<F>(factory: F) -> bool
where
    F: FnOnce(&str) -> SaveLogRq + Send + 'static,
{
    match LoggingContext::current() {
        Some(context) => context.emit(factory),
        None => {
            debug!("No active logging context, log entry dropped");
            false
        }
    }
}

/// Spawn a task that inherits the active logging context.
///
/// Must be called from within a tokio runtime.
pub fn spawn_in_context<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    match LoggingContext::current() {
        Some(context) => tokio::spawn(CURRENT_CONTEXT.scope(context, future)),
        None => tokio::spawn(future),
    }
}

struct BatchWorker {
    item: ItemHandle,
    client: Arc<dyn ReportPortalClient>,
    batch_size: usize,
    image_codec: Option<Arc<dyn ImageCodec>>,
}

impl BatchWorker {
    async fn run(self, mut receiver: mpsc::UnboundedReceiver<LogFactory>) {
        let mut item_id: Option<SharedResult<String>> = None;
        let mut batch = Vec::with_capacity(self.batch_size);
        let mut dropped = 0usize;

        while let Some(factory) = receiver.recv().await {
            if item_id.is_none() {
                item_id = Some(self.item.resolve().await);
            }
            let Some(Ok(id)) = item_id.clone() else {
                dropped += 1;
                continue;
            };

            batch.push(self.prepare(factory(&id)));
            if batch.len() >= self.batch_size {
                let full = std::mem::replace(&mut batch, Vec::with_capacity(self.batch_size));
                self.dispatch(full).await;
            }
        }

        if !batch.is_empty() {
            self.dispatch(batch).await;
        }

        if dropped > 0 {
            warn!(
                item = %self.item.key(),
                dropped = dropped,
                "Item never resolved, log entries dropped"
            );
        }
    }

    fn prepare(&self, mut rq: SaveLogRq) -> SaveLogRq {
        let Some(codec) = &self.image_codec else {
            return rq;
        };
        if let Some(file) = rq.file.as_mut() {
            if codec.is_image(file.content_type.as_deref()) {
                match codec.convert(&file.content) {
                    Ok(converted) => {
                        file.content = converted.content;
                        file.content_type = Some(converted.content_type);
                    }
                    Err(err) => log_failure("image conversion", &err),
                }
            }
        }
        rq
    }

    async fn dispatch(&self, batch: Vec<SaveLogRq>) {
        let size = batch.len();
        match self.client.log_batch(MultiPartRequest::from_batch(batch)).await {
            Ok(rs) => debug!(
                item = %self.item.key(),
                entries = size,
                accepted = rs.responses.len(),
                "📤 Log batch dispatched"
            ),
            Err(err) => log_failure("log batch", &err),
        }
    }
}
