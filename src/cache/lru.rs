//! LRU List Module
//!
//! Tracks access order for O(1) LRU eviction.
//!
//! The recency order is a doubly-linked list laid out in an arena: each slot
//! carries explicit `prev`/`next` handles instead of pointers, and a key map
//! resolves keys to handles. All list surgery (link at head, unlink, pop
//! tail) works purely on handles, so no operation is more than a couple of
//! map lookups plus constant-time splicing.

use std::collections::HashMap;

/// Sentinel handle meaning "no slot".
const NIL: usize = usize::MAX;

// == Arena Slot ==
#[derive(Debug)]
struct Slot {
    key: String,
    prev: usize,
    next: usize,
}

// == LRU List ==
/// Tracks key recency from most recently used (head) to least (tail).
///
/// Invariant: the key map and the linked slots always index exactly the same
/// key set, and every live slot is reachable by walking `next` from `head`.
#[derive(Debug)]
pub struct LruList {
    /// Arena of list slots; freed positions are recycled via `free`
    slots: Vec<Option<Slot>>,
    /// Stack of vacated arena positions
    free: Vec<usize>,
    /// key -> arena handle
    index: HashMap<String, usize>,
    head: usize,
    tail: usize,
}

impl LruList {
    // == Constructor ==
    /// Creates a new empty LRU list.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            head: NIL,
            tail: NIL,
        }
    }

    // == Touch ==
    /// Marks a key as most recently used, inserting it if new.
    pub fn touch(&mut self, key: &str) {
        if let Some(&handle) = self.index.get(key) {
            if handle == self.head {
                return;
            }
            self.unlink(handle);
            self.link_head(handle);
        } else {
            let handle = self.alloc(key.to_string());
            self.index.insert(key.to_string(), handle);
            self.link_head(handle);
        }
    }

    // == Remove ==
    /// Removes a key from the list. Unknown keys are a no-op.
    pub fn remove(&mut self, key: &str) {
        if let Some(handle) = self.index.remove(key) {
            self.unlink(handle);
            self.release(handle);
        }
    }

    // == Pop Oldest ==
    /// Removes and returns the least recently used key, or None if empty.
    pub fn pop_oldest(&mut self) -> Option<String> {
        let handle = self.tail;
        if handle == NIL {
            return None;
        }
        self.unlink(handle);
        let key = self.release(handle);
        self.index.remove(&key);
        Some(key)
    }

    // == Peek Oldest ==
    /// Returns the least recently used key without removing it.
    pub fn peek_oldest(&self) -> Option<&str> {
        if self.tail == NIL {
            return None;
        }
        self.slots[self.tail].as_ref().map(|s| s.key.as_str())
    }

    // == Clear ==
    /// Drops every tracked key.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.index.clear();
        self.head = NIL;
        self.tail = NIL;
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
    #[allow(dead_code)]
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    // == Internal: arena management ==
    fn alloc(&mut self, key: String) -> usize {
        let slot = Slot {
            key,
            prev: NIL,
            next: NIL,
        };
        if let Some(handle) = self.free.pop() {
            self.slots[handle] = Some(slot);
            handle
        } else {
            self.slots.push(Some(slot));
            self.slots.len() - 1
        }
    }

    fn release(&mut self, handle: usize) -> String {
        let slot = self.slots[handle].take().expect("releasing a vacant slot");
        self.free.push(handle);
        slot.key
    }

    // == Internal: list surgery ==
    fn link_head(&mut self, handle: usize) {
        let old_head = self.head;
        {
            let slot = self.slots[handle].as_mut().expect("linking a vacant slot");
            slot.prev = NIL;
            slot.next = old_head;
        }
        if old_head != NIL {
            self.slots[old_head]
                .as_mut()
                .expect("head points at a vacant slot")
                .prev = handle;
        }
        self.head = handle;
        if self.tail == NIL {
            self.tail = handle;
        }
    }

    fn unlink(&mut self, handle: usize) {
        let (prev, next) = {
            let slot = self.slots[handle].as_ref().expect("unlinking a vacant slot");
            (slot.prev, slot.next)
        };
        if prev != NIL {
            self.slots[prev]
                .as_mut()
                .expect("prev points at a vacant slot")
                .next = next;
        } else {
            self.head = next;
        }
        if next != NIL {
            self.slots[next]
                .as_mut()
                .expect("next points at a vacant slot")
                .prev = prev;
        } else {
            self.tail = prev;
        }
        let slot = self.slots[handle].as_mut().expect("unlinking a vacant slot");
        slot.prev = NIL;
        slot.next = NIL;
    }
}
