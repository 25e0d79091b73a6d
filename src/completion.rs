//! # Pending Completions
//!
//! A [`Completion`] is a shareable pending operation that always resolves to `()`.
//! Failures are logged by whoever produced the completion and never travel through
//! it, so a failed child never blocks the ordering of its siblings or parent.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::task::JoinHandle;
use tracing::error;

#[derive(Clone)]
pub struct Completion(Shared<BoxFuture<'static, ()>>);

impl Completion {
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self(future.boxed().shared())
    }

    /// Completion that has already resolved
    pub fn done() -> Self {
        Self::new(futures::future::ready(()))
    }

    /// Track a spawned task. A panicked or cancelled task still counts as resolved.
    pub fn from_task(task: JoinHandle<()>) -> Self {
        Self::new(async move {
            if let Err(join_err) = task.await {
                error!(error = %join_err, "Tracked reporting task did not complete");
            }
        })
    }

    pub fn is_done(&self) -> bool {
        self.0.peek().is_some()
    }
}

impl Future for Completion {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        Pin::new(&mut self.0).poll(cx)
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Completion").field(&self.is_done()).finish()
    }
}

/// Await every completion in registration order.
///
/// The underlying work may already be running concurrently; only the observation
/// is sequential.
pub async fn concat(completions: Vec<Completion>) {
    for completion in completions {
        completion.await;
    }
}
