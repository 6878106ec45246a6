use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::graph::NodeIndex;

/// Active nodes of one search tree, shallowest first.
///
/// Entries are never removed when a node leaves the tree or becomes passive;
/// the owner checks each popped entry and skips the stale ones.
///
/// The tree's terminal scans the whole grid when it grows. `terminal_scan` is
/// where that scan resumes, so nodes it has already settled are not visited
/// again.
#[derive(Clone, Debug, Default)]
pub struct Frontier {
    queue: BinaryHeap<Reverse<(usize, NodeIndex)>>,
    terminal_scan: usize,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, depth: usize, node: NodeIndex) {
        self.queue.push(Reverse((depth, node)));
    }

    /// Removes the entry with the smallest depth. Ties go to the lower node index.
    pub fn pop(&mut self) -> Option<(usize, NodeIndex)> {
        self.queue.pop().map(|Reverse(entry)| entry)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn terminal_scan(&self) -> usize {
        self.terminal_scan
    }

    pub fn set_terminal_scan(&mut self, node: usize) {
        self.terminal_scan = node;
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.terminal_scan = 0;
    }
}
