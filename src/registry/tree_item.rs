//! Per-item node of the completion tree.

use crate::completion::Completion;
use crate::handle::Handle;
use parking_lot::Mutex;

/// Parent link plus the ordered list of pending completions the item's finish must
/// wait for. The list only grows while the item is open.
#[derive(Debug, Default)]
pub struct TreeItem {
    parent: Mutex<Option<Handle>>,
    children: Mutex<Vec<Completion>>,
}

impl TreeItem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the parent link, returning the previous one
    pub fn set_parent(&self, parent: Handle) -> Option<Handle> {
        self.parent.lock().replace(parent)
    }

    pub fn parent(&self) -> Option<Handle> {
        self.parent.lock().clone()
    }

    pub fn add_child(&self, completion: Completion) {
        self.children.lock().push(completion);
    }

    /// Snapshot of the children in registration order
    pub fn children(&self) -> Vec<Completion> {
        self.children.lock().clone()
    }
}
