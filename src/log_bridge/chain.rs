//! Append-only persistent list.
//!
//! `push` returns a new list that shares every existing node with its parent;
//! nodes are never mutated after creation. Two lists pushed from the same
//! parent therefore never see each other's entries.

use std::sync::Arc;

struct Node<T> {
    value: T,
    prev: Option<Arc<Node<T>>>,
}

pub(crate) struct Chain<T> {
    head: Option<Arc<Node<T>>>,
    len: usize,
}

impl<T> Clone for Chain<T> {
    fn clone(&self) -> Self {
        Self {
            head: self.head.clone(),
            len: self.len,
        }
    }
}

impl<T> Default for Chain<T> {
    fn default() -> Self {
        Self { head: None, len: 0 }
    }
}

impl<T> Chain<T> {
    pub(crate) fn push(&self, value: T) -> Self {
        Self {
            head: Some(Arc::new(Node {
                value,
                prev: self.head.clone(),
            })),
            len: self.len + 1,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Entries in insertion order.
    pub(crate) fn to_vec(&self) -> Vec<&T> {
        let mut items = Vec::with_capacity(self.len());
        let mut cursor = self.head.as_deref();
        while let Some(node) = cursor {
            items.push(&node.value);
            cursor = node.prev.as_deref();
        }
        items.reverse();
        items
    }
}
