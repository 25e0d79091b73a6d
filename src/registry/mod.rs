//! # Item Tree Registry
//!
//! Concurrent bookkeeping of the launch's item tree, keyed by [`HandleKey`] so
//! nodes can be addressed before their remote identifiers resolve.
//!
//! ## Architecture
//!
//! ```text
//! ItemTreeRegistry
//! └── DashMap<HandleKey, Arc<TreeItem>>
//!     ├── launch root  (children: finish chains of root items)
//!     └── item         (parent link + children: start, log drain, child finish chains)
//! ```
//!
//! Nodes are created lazily on first access and removed only by
//! [`ItemTreeRegistry::invalidate`].
//!
//! [`HandleKey`]: crate::handle::HandleKey

pub mod tree_item;

pub use tree_item::TreeItem;

use crate::completion::Completion;
use crate::handle::{Handle, HandleKey};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct ItemTreeRegistry {
    nodes: DashMap<HandleKey, Arc<TreeItem>>,
}

impl ItemTreeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Node for `key`, created atomically if absent
    pub fn get_or_create(&self, key: HandleKey) -> Arc<TreeItem> {
        self.nodes
            .entry(key)
            .or_insert_with(|| {
                debug!(key = %key, "Creating tree node");
                Arc::new(TreeItem::new())
            })
            .clone()
    }

    pub fn get_if_present(&self, key: HandleKey) -> Option<Arc<TreeItem>> {
        self.nodes.get(&key).map(|node| node.clone())
    }

    /// Link a node to its parent. A second call overwrites the first.
    pub fn set_parent(&self, key: HandleKey, parent: Handle) {
        let node = self.get_or_create(key);
        if let Some(previous) = node.set_parent(parent) {
            warn!(
                key = %key,
                previous_parent = %previous.key(),
                "Parent of tree node reassigned"
            );
        }
    }

    pub fn add_child(&self, key: HandleKey, completion: Completion) {
        self.get_or_create(key).add_child(completion);
    }

    /// Remove a node, dropping its references to pending children
    pub fn invalidate(&self, key: HandleKey) -> bool {
        let removed = self.nodes.remove(&key).is_some();
        if removed {
            debug!(key = %key, "Tree node invalidated");
        }
        removed
    }

    pub fn contains(&self, key: HandleKey) -> bool {
        self.nodes.contains_key(&key)
    }

    /// Number of live nodes, including nodes of items that were never finished
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_returns_same_node() {
        let registry = ItemTreeRegistry::new();
        let handle = Handle::resolved("item", "a");

        let first = registry.get_or_create(handle.key());
        let second = registry.get_or_create(handle.key());

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_invalidate_then_lookup_creates_fresh_node() {
        let registry = ItemTreeRegistry::new();
        let handle = Handle::resolved("item", "a");

        registry.add_child(handle.key(), Completion::done());
        registry.add_child(handle.key(), Completion::done());
        assert_eq!(registry.get_or_create(handle.key()).children().len(), 2);

        assert!(registry.invalidate(handle.key()));
        assert!(!registry.contains(handle.key()));
        assert!(!registry.invalidate(handle.key()));

        let fresh = registry.get_or_create(handle.key());
        assert!(fresh.children().is_empty());
        assert!(fresh.parent().is_none());
    }

    #[test]
    fn test_set_parent_last_caller_wins() {
        let registry = ItemTreeRegistry::new();
        let child = Handle::resolved("item", "child");
        let first = Handle::resolved("item", "p1");
        let second = Handle::resolved("item", "p2");

        registry.set_parent(child.key(), first);
        registry.set_parent(child.key(), second.clone());

        let parent = registry
            .get_if_present(child.key())
            .and_then(|node| node.parent())
            .expect("parent set");
        assert_eq!(parent, second);
    }

    #[test]
    fn test_concurrent_get_or_create_and_append() {
        let registry = Arc::new(ItemTreeRegistry::new());
        let shared = Handle::resolved("item", "shared");

        let workers = (0..8)
            .map(|_| {
                let registry = registry.clone();
                let key = shared.key();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        registry.add_child(key, Completion::done());
                        let own = Handle::resolved("item", "own");
                        registry.get_or_create(own.key());
                    }
                })
            })
            .collect::<Vec<_>>();
        for worker in workers {
            worker.join().expect("worker thread");
        }

        let node = registry.get_if_present(shared.key()).expect("node exists");
        assert_eq!(node.children().len(), 800);
        assert_eq!(registry.len(), 801);
    }
}
