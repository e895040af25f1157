//! Bounded free list
//!
//! Tracks which pooled items are leased and which are idle. The recycler
//! only does bookkeeping: creating and destroying the items themselves is
//! up to the owner, guided by the [`Release`] outcome.

use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

/// Outcome of [`Recycler::release`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release<T> {
    /// Item is idle and can be acquired again
    Stored,
    /// Item was stored, and the oldest idle item was evicted to stay within
    /// `max_size`. The caller must destroy it.
    Evicted(T),
    /// Item was already idle; nothing changed
    AlreadyFree,
    /// Item is not tracked by this recycler
    Unknown,
}

/// Bounded free list over pooled item ids
#[derive(Debug)]
pub struct Recycler<T: Copy + Eq + Hash> {
    /// Idle items, oldest release at the front
    free: VecDeque<T>,
    free_set: HashSet<T>,
    /// Leased items, oldest acquisition at the front
    leased: VecDeque<T>,
    leased_set: HashSet<T>,
    max_size: usize,
    collection_checks: bool,
}

impl<T: Copy + Eq + Hash> Recycler<T> {
    pub fn new(capacity: usize, max_size: usize, collection_checks: bool) -> Self {
        let max_size = max_size.max(1);
        Self {
            free: VecDeque::with_capacity(capacity.min(max_size)),
            free_set: HashSet::with_capacity(capacity.min(max_size)),
            leased: VecDeque::new(),
            leased_set: HashSet::new(),
            max_size,
            collection_checks,
        }
    }

    /// Lease the most recently released idle item
    pub fn acquire(&mut self) -> Option<T> {
        let item = self.free.pop_back()?;
        self.free_set.remove(&item);
        self.leased.push_back(item);
        self.leased_set.insert(item);
        Some(item)
    }

    /// Track a newly created item as leased
    pub fn register(&mut self, item: T) {
        if self.leased_set.insert(item) {
            self.leased.push_back(item);
        }
    }

    /// Return a leased item to the free list
    pub fn release(&mut self, item: T) -> Release<T> {
        if self.free_set.contains(&item) {
            return Release::AlreadyFree;
        }
        if !self.leased_set.remove(&item) {
            return Release::Unknown;
        }
        self.leased.retain(|&i| i != item);

        self.free.push_back(item);
        self.free_set.insert(item);

        if self.free.len() > self.max_size {
            if let Some(oldest) = self.free.pop_front() {
                self.free_set.remove(&oldest);
                return Release::Evicted(oldest);
            }
        }
        Release::Stored
    }

    /// Stop tracking an item (leased or idle). Returns true if it was tracked.
    pub fn forget(&mut self, item: T) -> bool {
        if self.free_set.remove(&item) {
            self.free.retain(|&i| i != item);
            true
        } else if self.leased_set.remove(&item) {
            self.leased.retain(|&i| i != item);
            true
        } else {
            false
        }
    }

    /// Leased item held the longest
    pub fn oldest_leased(&self) -> Option<T> {
        self.leased.front().copied()
    }

    pub fn is_leased(&self, item: T) -> bool {
        self.leased_set.contains(&item)
    }

    pub fn is_free(&self, item: T) -> bool {
        self.free_set.contains(&item)
    }

    pub fn contains(&self, item: T) -> bool {
        self.is_leased(item) || self.is_free(item)
    }

    pub fn count_inactive(&self) -> usize {
        self.free.len()
    }

    pub fn count_active(&self) -> usize {
        self.leased.len()
    }

    pub fn count_all(&self) -> usize {
        self.free.len() + self.leased.len()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn collection_checks(&self) -> bool {
        self.collection_checks
    }

    /// Shrink or grow the idle bound. Returns items evicted by shrinking.
    pub fn set_max_size(&mut self, max_size: usize) -> Vec<T> {
        self.max_size = max_size.max(1);
        let mut evicted = Vec::new();
        while self.free.len() > self.max_size {
            if let Some(oldest) = self.free.pop_front() {
                self.free_set.remove(&oldest);
                evicted.push(oldest);
            }
        }
        evicted
    }

    /// Forget everything, returning every tracked item (idle first)
    pub fn drain(&mut self) -> Vec<T> {
        self.free_set.clear();
        self.leased_set.clear();
        self.free.drain(..).chain(self.leased.drain(..)).collect()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
