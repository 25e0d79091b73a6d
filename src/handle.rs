//! # Eventually-Resolved Identifiers
//!
//! A [`Handle`] stands for the remote identifier of a launch or test item before
//! the remote service has assigned it. The start call runs eagerly on the tokio
//! runtime; any number of parties may clone the handle and await the same outcome.
//!
//! Handles double as registry keys: each carries a [`HandleKey`] minted at creation,
//! so a handle can be used to look up its tree node before its identifier resolves.

use crate::completion::Completion;
use crate::error::{ReportingError, ReportingResult, SharedResult};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::fmt;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tokio::runtime::Handle as RuntimeHandle;
use uuid::Uuid;

/// Identity of a handle, independent of the remote identifier it resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleKey(Uuid);

impl HandleKey {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for HandleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone)]
pub struct Handle {
    key: HandleKey,
    entity: &'static str,
    id: Shared<BoxFuture<'static, SharedResult<String>>>,
}

/// Handle of the launch; root of the completion tree
pub type LaunchHandle = Handle;
/// Handle of a single test item
pub type ItemHandle = Handle;

impl Handle {
    /// Spawn the start call on `runtime` and wrap its outcome. The caller does not
    /// need to be inside the runtime.
    pub fn spawn<F>(runtime: &RuntimeHandle, entity: &'static str, start: F) -> Self
    where
        F: Future<Output = ReportingResult<String>> + Send + 'static,
    {
        let task = runtime.spawn(start);
        let id = async move {
            match task.await {
                Ok(Ok(id)) => Ok(id),
                Ok(Err(err)) => Err(Arc::new(err)),
                Err(join_err) => Err(Arc::new(ReportingError::from(join_err))),
            }
        };
        Self::from_shared(entity, id.boxed().shared())
    }

    /// Handle whose start call runs only once somebody first awaits it
    pub fn deferred<F>(entity: &'static str, start: F) -> Self
    where
        F: Future<Output = ReportingResult<String>> + Send + 'static,
    {
        let id = async move { start.await.map_err(Arc::new) };
        Self::from_shared(entity, id.boxed().shared())
    }

    /// Handle whose identifier is already known
    pub fn resolved(entity: &'static str, id: impl Into<String>) -> Self {
        let id = id.into();
        Self::from_shared(entity, futures::future::ready(Ok(id)).boxed().shared())
    }

    /// Handle that can never resolve to an identifier
    pub fn failed(entity: &'static str, error: ReportingError) -> Self {
        let error = Arc::new(error);
        Self::from_shared(entity, futures::future::ready(Err(error)).boxed().shared())
    }

    fn from_shared(
        entity: &'static str,
        id: Shared<BoxFuture<'static, SharedResult<String>>>,
    ) -> Self {
        Self {
            key: HandleKey::new(),
            entity,
            id,
        }
    }

    pub fn key(&self) -> HandleKey {
        self.key
    }

    /// Kind of entity this handle identifies ("launch", "item")
    pub fn entity(&self) -> &'static str {
        self.entity
    }

    /// Wait for the remote identifier
    pub async fn resolve(&self) -> SharedResult<String> {
        self.id.clone().await
    }

    /// Outcome of the start call, if it has already settled
    pub fn peek(&self) -> Option<&SharedResult<String>> {
        self.id.peek()
    }

    /// Completion that resolves once the start call settles, successfully or not
    pub fn completion(&self) -> Completion {
        let id = self.id.clone();
        Completion::new(async move {
            let _ = id.await;
        })
    }
}

impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Handle {}

impl Hash for Handle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.peek() {
            Some(Ok(id)) => format!("resolved({id})"),
            Some(Err(err)) => format!("failed({err})"),
            None => "pending".to_string(),
        };
        f.debug_struct("Handle")
            .field("key", &self.key)
            .field("entity", &self.entity)
            .field("state", &state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_spawned_handle_resolves_once_for_every_clone() {
        let handle = Handle::spawn(&RuntimeHandle::current(), "item", async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok("item-1".to_string())
        });
        let clone = handle.clone();

        assert_eq!(handle, clone);
        assert_eq!(clone.resolve().await.expect("resolves"), "item-1");
        assert_eq!(handle.resolve().await.expect("resolves"), "item-1");
        assert!(matches!(handle.peek(), Some(Ok(id)) if id == "item-1"));
    }

    #[tokio::test]
    async fn test_failed_start_is_shared() {
        let handle = Handle::spawn(&RuntimeHandle::current(), "launch", async {
            Err(ReportingError::transport("connection refused"))
        });

        let first = handle.resolve().await.expect_err("start failed");
        let second = handle.resolve().await.expect_err("start failed");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_deferred_handle_waits_for_first_poll() {
        let started = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = started.clone();
        let handle = Handle::deferred("launch", async move {
            flag.store(true, std::sync::atomic::Ordering::SeqCst);
            Ok("launch-1".to_string())
        });

        tokio::task::yield_now().await;
        assert!(!started.load(std::sync::atomic::Ordering::SeqCst));
        assert!(handle.peek().is_none());

        assert_eq!(handle.resolve().await.expect("resolves"), "launch-1");
        assert!(started.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_distinct_handles_have_distinct_keys() {
        let a = Handle::resolved("item", "same-id");
        let b = Handle::resolved("item", "same-id");
        assert_ne!(a, b);
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn test_spawn_from_thread_outside_runtime() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .expect("build runtime");
        let runtime_handle = runtime.handle().clone();

        let handle = std::thread::spawn(move || {
            Handle::spawn(&runtime_handle, "item", async { Ok("worker-item".to_string()) })
        })
        .join()
        .expect("worker thread does not panic");

        let id = runtime.block_on(handle.resolve()).expect("resolves");
        assert_eq!(id, "worker-item");
    }

    #[tokio::test]
    async fn test_completion_resolves_even_on_failure() {
        let handle = Handle::failed("item", ReportingError::internal("boom"));
        let completion = handle.completion();
        completion.clone().await;
        assert!(completion.is_done());
    }
}
