// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! A chained hash set keyed by encoded entry bytes, with its backing storage
//! (a [`BlobStore`]) folded in. The spine is a flat `Vec` of slots; the first
//! colliding entry lives *in* the slot itself rather than behind a pointer,
//! which halves pointer chases on the common, collision-free path.
//!
//! The hash/equality strategy is a small trait, [`EntrySetHasher`], so it can
//! be swapped out (the distilled spec calls this out as "polymorphism over
//! the hash/equality capability set") without touching the chaining logic.
//! [`JenkinsHasher`] is the default, and the only one this crate ships.

use crate::blob::{BlobHandle, BlobStore};
use crate::varint::entry_length;
use tracing::debug;

/// Initial spine capacity.
pub const DEFAULT_INIT_CAPACITY: u32 = 4096;
/// Maximum spine capacity the set will grow to via doubling.
pub const DEFAULT_MAX_CAPACITY: u32 = 512 << 20;
/// Resize once occupancy exceeds this percentage of capacity.
pub const RESIZE_THRESHOLD_PCT: u64 = 97;

/// Computes a hash over an encoded entry's bytes.
pub trait EntrySetHasher {
    fn hash(&self, bytes: &[u8]) -> u32;
}

/// Jenkins' one-at-a-time hash, the canonical strategy used throughout this
/// crate: `h = 0; for b in bytes { h ^= (h << 5) + (h >> 2) + b }`.
#[derive(Default, Clone, Copy)]
pub struct JenkinsHasher;

impl EntrySetHasher for JenkinsHasher {
    fn hash(&self, bytes: &[u8]) -> u32 {
        let mut h: u32 = 0;
        for &b in bytes {
            h ^= h.wrapping_shl(5)
                .wrapping_add(h.wrapping_shr(2))
                .wrapping_add(b as u32);
        }
        h
    }
}

#[derive(Clone)]
struct Entry {
    handle: BlobHandle,
    len: u32,
}

struct ChainNode {
    entry: Entry,
    next: Option<Box<ChainNode>>,
}

#[derive(Default)]
struct Slot {
    head: Option<Entry>,
    chain: Option<Box<ChainNode>>,
}

/// Aggregate shape statistics for an [`EntrySet`]'s spine and chains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntrySetStats {
    pub capacity: u64,
    pub spine_use: u64,
    pub entries: u64,
    pub ht_bytes: u64,
    pub collision_slots: u64,
    pub total_chain_len: u64,
    pub max_chain_len: u64,
    pub dist_1_2: u64,
    pub dist_3_5: u64,
    pub dist_6_9: u64,
    pub dist_10_: u64,
    pub blob_allocated_bytes: u64,
    pub blob_used_bytes: u64,
}

impl EntrySetStats {
    pub fn avg_chain_len(&self) -> f64 {
        if self.collision_slots == 0 {
            0.0
        } else {
            self.total_chain_len as f64 / self.collision_slots as f64
        }
    }

    pub fn total_bytes(&self) -> u64 {
        self.ht_bytes + self.blob_allocated_bytes
    }
}

/// A chained hash set over encoded entry byte sequences, generic over the
/// hash strategy `H`.
pub struct EntrySet<H: EntrySetHasher = JenkinsHasher> {
    hasher: H,
    spine: Vec<Slot>,
    capacity: u32,
    max_capacity: u32,
    spine_use: u64,
    entries: u64,
    blobs: BlobStore,
}

impl EntrySet<JenkinsHasher> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_INIT_CAPACITY, DEFAULT_MAX_CAPACITY)
    }

    pub fn with_capacity(capacity: u32, max_capacity: u32) -> Self {
        Self::with_hasher(JenkinsHasher, capacity, max_capacity)
    }
}

impl Default for EntrySet<JenkinsHasher> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: EntrySetHasher> EntrySet<H> {
    pub fn with_hasher(hasher: H, capacity: u32, max_capacity: u32) -> Self {
        assert!(capacity > 0, "capacity must be positive");
        let mut spine = Vec::with_capacity(capacity as usize);
        spine.resize_with(capacity as usize, Slot::default);
        EntrySet {
            hasher,
            spine,
            capacity,
            max_capacity,
            spine_use: 0,
            entries: 0,
            blobs: BlobStore::new(),
        }
    }

    fn index(&self, bytes: &[u8]) -> usize {
        (self.hasher.hash(bytes) as usize) % (self.capacity as usize)
    }

    fn equals(&self, entry: &Entry, bytes: &[u8]) -> bool {
        entry.len as usize == bytes.len() && self.blobs.get(entry.handle, entry.len as usize) == bytes
    }

    /// Inserts `bytes` (an already-canonicalized encoded entry) if not
    /// already present. Returns `true` if this was a new entry.
    pub fn insert(&mut self, bytes: &[u8]) -> bool {
        let idx = self.index(bytes);
        if self.find_in_slot(idx, bytes).is_some() {
            return false;
        }

        let handle = self.blobs.add(bytes);
        let entry = Entry {
            handle,
            len: entry_length(bytes) as u32,
        };
        let slot = &mut self.spine[idx];
        if slot.head.is_none() {
            slot.head = Some(entry);
            self.spine_use += 1;
        } else {
            slot.chain = Some(Box::new(ChainNode {
                entry,
                next: slot.chain.take(),
            }));
        }
        self.entries += 1;

        self.maybe_resize();
        true
    }

    /// Returns `true` if an entry equal to `bytes` is present.
    pub fn contains(&self, bytes: &[u8]) -> bool {
        let idx = self.index(bytes);
        self.find_in_slot(idx, bytes).is_some()
    }

    fn find_in_slot(&self, idx: usize, bytes: &[u8]) -> Option<()> {
        let slot = &self.spine[idx];
        if let Some(head) = &slot.head {
            if self.equals(head, bytes) {
                return Some(());
            }
        } else {
            return None;
        }
        let mut node = slot.chain.as_deref();
        while let Some(n) = node {
            if self.equals(&n.entry, bytes) {
                return Some(());
            }
            node = n.next.as_deref();
        }
        None
    }

    /// Removes an entry equal to `bytes`, if present. The underlying blob
    /// bytes are not reclaimed (see `DESIGN.md` / spec §9).
    pub fn erase(&mut self, bytes: &[u8]) {
        let idx = self.index(bytes);
        let slot = &mut self.spine[idx];

        let head_matches = slot
            .head
            .as_ref()
            .map(|h| h.len as usize == bytes.len())
            .unwrap_or(false)
            && slot
                .head
                .as_ref()
                .map(|h| self.blobs.get(h.handle, h.len as usize) == bytes)
                .unwrap_or(false);

        if head_matches {
            match slot.chain.take() {
                None => {
                    slot.head = None;
                    self.spine_use -= 1;
                }
                Some(first) => {
                    slot.head = Some(first.entry);
                    slot.chain = first.next;
                }
            }
            self.entries -= 1;
            return;
        }

        // Search the chain, unlinking the matching node.
        let mut cursor = &mut slot.chain;
        while let Some(node) = cursor {
            if node.entry.len as usize == bytes.len()
                && self.blobs.get(node.entry.handle, node.entry.len as usize) == bytes
            {
                *cursor = node.next.take();
                self.entries -= 1;
                return;
            }
            cursor = &mut node.next;
        }
    }

    /// Removes all entries; does not shrink the spine.
    pub fn clear(&mut self) {
        for slot in &mut self.spine {
            slot.head = None;
            slot.chain = None;
        }
        self.spine_use = 0;
        self.entries = 0;
    }

    pub fn len(&self) -> u64 {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    fn maybe_resize(&mut self) {
        if self.capacity >= self.max_capacity {
            return;
        }
        if 100 * self.entries / self.capacity as u64 <= RESIZE_THRESHOLD_PCT {
            return;
        }

        let new_capacity = self.capacity.saturating_mul(2).min(self.max_capacity);
        debug!(
            old_capacity = self.capacity,
            new_capacity, entries = self.entries, "resizing entry set spine"
        );

        let mut new_spine = Vec::with_capacity(new_capacity as usize);
        new_spine.resize_with(new_capacity as usize, Slot::default);

        for slot in self.spine.drain(..) {
            let mut chain: Vec<Entry> = Vec::new();
            if let Some(head) = slot.head {
                chain.push(head);
            }
            let mut node = slot.chain;
            while let Some(n) = node {
                chain.push(n.entry);
                node = n.next;
            }
            for entry in chain {
                let bytes = self.blobs.get(entry.handle, entry.len as usize);
                let idx = (self.hasher.hash(bytes) as usize) % (new_capacity as usize);
                let new_slot = &mut new_spine[idx];
                if new_slot.head.is_none() {
                    new_slot.head = Some(entry);
                } else {
                    new_slot.chain = Some(Box::new(ChainNode {
                        entry,
                        next: new_slot.chain.take(),
                    }));
                }
            }
        }

        self.spine = new_spine;
        self.capacity = new_capacity;
        self.spine_use = self
            .spine
            .iter()
            .filter(|s| s.head.is_some())
            .count() as u64;
    }

    /// Snapshot of spine/chain shape and blob usage, for `Cache::stats`.
    pub fn stats(&self) -> EntrySetStats {
        let mut stats = EntrySetStats {
            capacity: self.capacity as u64,
            spine_use: self.spine_use,
            entries: self.entries,
            ht_bytes: self.capacity as u64 * std::mem::size_of::<Entry>() as u64,
            blob_allocated_bytes: self.blobs.allocated_bytes(),
            blob_used_bytes: self.blobs.used_bytes(),
            ..Default::default()
        };

        for slot in &self.spine {
            let mut chain_len = 0u64;
            let mut node = slot.chain.as_deref();
            while let Some(n) = node {
                chain_len += 1;
                stats.ht_bytes += std::mem::size_of::<ChainNode>() as u64;
                node = n.next.as_deref();
            }
            if chain_len > 0 {
                stats.collision_slots += 1;
            }
            match chain_len {
                0 => {}
                1..=2 => stats.dist_1_2 += 1,
                3..=5 => stats.dist_3_5 += 1,
                6..=9 => stats.dist_6_9 += 1,
                _ => stats.dist_10_ += 1,
            }
            stats.total_chain_len += chain_len;
            stats.max_chain_len = stats.max_chain_len.max(chain_len);
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(n: u32, pairs: &[(u32, u32)]) -> Vec<u8> {
        let mut buf = Vec::new();
        crate::varint::encode(n, &mut buf);
        for (t, v) in pairs {
            crate::varint::encode(*t, &mut buf);
            crate::varint::encode(*v, &mut buf);
        }
        buf
    }

    #[test]
    fn jenkins_hash_is_deterministic() {
        let h = JenkinsHasher;
        let bytes = entry(2, &[(1, 1), (2, 3)]);
        assert_eq!(h.hash(&bytes), h.hash(&bytes));
    }

    #[test]
    fn idempotent_insert() {
        let mut set = EntrySet::new();
        let e = entry(1, &[(1, 1)]);
        assert!(set.insert(&e));
        assert!(!set.insert(&e));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn insert_erase_round_trip() {
        let mut set = EntrySet::new();
        let e = entry(1, &[(5, 9)]);
        assert!(set.insert(&e));
        let stats_before = set.stats();
        set.erase(&e);
        assert_eq!(set.len(), 0);
        assert!(set.insert(&e));
        let stats_after = set.stats();
        assert_eq!(stats_before.spine_use, stats_after.spine_use);
    }

    #[test]
    fn distinct_entries_coexist_on_collision() {
        // Force a collision by using a tiny capacity.
        let mut set = EntrySet::with_capacity(1, 1);
        let a = entry(1, &[(1, 1)]);
        let b = entry(1, &[(2, 2)]);
        assert!(set.insert(&a));
        assert!(set.insert(&b));
        assert!(set.contains(&a));
        assert!(set.contains(&b));
        assert_eq!(set.len(), 2);
        let stats = set.stats();
        assert_eq!(stats.collision_slots, 1);
        assert_eq!(stats.total_chain_len, 1);
    }

    #[test]
    fn erase_spine_head_promotes_chain() {
        let mut set = EntrySet::with_capacity(1, 1);
        let a = entry(1, &[(1, 1)]);
        let b = entry(1, &[(2, 2)]);
        set.insert(&a);
        set.insert(&b);
        set.erase(&a);
        assert!(!set.contains(&a));
        assert!(set.contains(&b));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn resize_preserves_all_entries() {
        let mut set = EntrySet::with_capacity(8, 64);
        let mut entries = Vec::new();
        for i in 0..50u32 {
            let e = entry(1, &[(i, i)]);
            set.insert(&e);
            entries.push(e);
        }
        assert!(set.capacity > 8);
        for e in &entries {
            assert!(set.contains(e));
        }
        assert_eq!(set.len(), entries.len() as u64);
    }

    #[test]
    fn clear_empties_set_without_shrinking_spine() {
        let mut set = EntrySet::with_capacity(16, 64);
        set.insert(&entry(1, &[(1, 1)]));
        set.insert(&entry(1, &[(2, 2)]));
        set.clear();
        assert_eq!(set.len(), 0);
        assert_eq!(set.capacity, 16);
    }
}
