//! Recency List Module
//!
//! Implements least-recently-used tracking for cache eviction.

use std::collections::HashMap;

/// Arena slot of the head sentinel (most recent side).
const HEAD: usize = 0;
/// Arena slot of the tail sentinel (least recent side).
const TAIL: usize = 1;

#[derive(Debug)]
struct Node {
    key: String,
    prev: usize,
    next: usize,
}

// == Recency List ==
/// Tracks access order for LRU eviction.
///
/// The list is an intrusive doubly linked list stored in an arena: nodes live
/// in a `Vec` and link to each other by slot index, with a `HashMap` from key
/// to slot for O(1) lookup. Slots 0 and 1 are permanent head/tail sentinels
/// and are never exposed. Freed slots are recycled through a free list.
///
/// - Next to head = most recently used
/// - Next to tail = least recently used
///
/// Every operation is O(1).
#[derive(Debug)]
pub struct RecencyList {
    /// Arena of linked nodes, sentinels included
    nodes: Vec<Node>,
    /// Key to arena slot
    index: HashMap<String, usize>,
    /// Recycled slots available for reuse
    free: Vec<usize>,
}

impl RecencyList {
    // == Constructor ==
    /// Creates a new empty recency list.
    pub fn new() -> Self {
        let nodes = vec![
            Node {
                key: String::new(),
                prev: HEAD,
                next: TAIL,
            },
            Node {
                key: String::new(),
                prev: HEAD,
                next: TAIL,
            },
        ];
        Self {
            nodes,
            index: HashMap::new(),
            free: Vec::new(),
        }
    }

    // == Touch ==
    /// Marks a key as most recently used.
    ///
    /// If the key is already tracked it is relinked at the front;
    /// otherwise a slot is allocated for it.
    pub fn touch(&mut self, key: &str) {
        match self.index.get(key) {
            Some(&slot) => {
                self.unlink(slot);
                self.link_front(slot);
            }
            None => {
                let slot = self.alloc(key);
                self.index.insert(key.to_string(), slot);
                self.link_front(slot);
            }
        }
    }

    // == Remove ==
    /// Removes a key from the list. Unknown keys are ignored.
    pub fn remove(&mut self, key: &str) {
        if let Some(slot) = self.index.remove(key) {
            self.unlink(slot);
            self.nodes[slot].key.clear();
            self.free.push(slot);
        }
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently used key.
    ///
    /// Returns None if the list is empty.
    pub fn evict_oldest(&mut self) -> Option<String> {
        let slot = self.nodes[TAIL].prev;
        if slot == HEAD {
            return None;
        }
        self.unlink(slot);
        let key = std::mem::take(&mut self.nodes[slot].key);
        self.index.remove(&key);
        self.free.push(slot);
        Some(key)
    }

    // == Peek Oldest ==
    /// Returns the least recently used key without removing it.
    pub fn peek_oldest(&self) -> Option<&str> {
        let slot = self.nodes[TAIL].prev;
        if slot == HEAD {
            None
        } else {
            Some(self.nodes[slot].key.as_str())
        }
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    // == Contains ==
    /// Checks if a key is being tracked.
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    // == Clear ==
    /// Drops every tracked key and relinks the sentinels.
    pub fn clear(&mut self) {
        self.index.clear();
        self.free.clear();
        self.nodes.truncate(2);
        self.nodes[HEAD].prev = HEAD;
        self.nodes[HEAD].next = TAIL;
        self.nodes[TAIL].prev = HEAD;
        self.nodes[TAIL].next = TAIL;
    }

    // == Internal Links ==
    /// Detaches a slot from its neighbors. The slot's own links go stale
    /// until it is relinked or freed.
    fn unlink(&mut self, slot: usize) {
        let prev = self.nodes[slot].prev;
        let next = self.nodes[slot].next;
        self.nodes[prev].next = next;
        self.nodes[next].prev = prev;
    }

    /// Inserts a detached slot right after the head sentinel.
    fn link_front(&mut self, slot: usize) {
        let first = self.nodes[HEAD].next;
        self.nodes[slot].prev = HEAD;
        self.nodes[slot].next = first;
        self.nodes[first].prev = slot;
        self.nodes[HEAD].next = slot;
    }

    /// Claims a slot for a key, recycling a freed one when available.
    fn alloc(&mut self, key: &str) -> usize {
        match self.free.pop() {
            Some(slot) => {
                self.nodes[slot].key = key.to_string();
                slot
            }
            None => {
                self.nodes.push(Node {
                    key: key.to_string(),
                    prev: HEAD,
                    next: TAIL,
                });
                self.nodes.len() - 1
            }
        }
    }
}

impl Default for RecencyList {
    fn default() -> Self {
        Self::new()
    }
}
