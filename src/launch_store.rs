//! # Launch Persistence Seam
//!
//! Rerun mode attaches a new session to a launch started earlier. The association
//! between a launch name and its handle is kept by a [`LaunchStore`]; file-backed
//! stores live with the host, the in-memory store covers a single process.

use crate::handle::LaunchHandle;
use dashmap::DashMap;
use tracing::debug;

pub trait LaunchStore: Send + Sync {
    /// Remember the handle of a freshly started launch
    fn record_launch(&self, name: &str, handle: &LaunchHandle);

    /// Handle of a previously recorded launch with this name
    fn find_launch(&self, name: &str) -> Option<LaunchHandle>;
}

#[derive(Debug, Default)]
pub struct InMemoryLaunchStore {
    launches: DashMap<String, LaunchHandle>,
}

impl InMemoryLaunchStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LaunchStore for InMemoryLaunchStore {
    fn record_launch(&self, name: &str, handle: &LaunchHandle) {
        debug!(launch_name = %name, key = %handle.key(), "Recording launch handle");
        self.launches.insert(name.to_string(), handle.clone());
    }

    fn find_launch(&self, name: &str) -> Option<LaunchHandle> {
        self.launches.get(name).map(|entry| entry.value().clone())
    }
}
