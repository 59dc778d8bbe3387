// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Two-level string interning: `tag -> (tag_id, value -> value_id)`.
//!
//! Value ids restart at 1 for every tag, which keeps the common case's
//! sequence numbers small (and therefore their packed encodings short) —
//! a flat, global value table would push ids into multi-byte encodings
//! much sooner.

use std::collections::HashMap;
use std::hash::BuildHasherDefault;

pub(crate) type FxHashMap<K, V> = HashMap<K, V, BuildHasherDefault<rustc_hash::FxHasher>>;

struct TagEntry {
    tag_id: u32,
    next_value_id: u32,
    values: FxHashMap<String, u32>,
}

/// Interns `(tag, value)` string pairs into stable, monotonically assigned
/// 32-bit ids. Ids are never reused and are dense starting at 1 (id `0` is
/// reserved and never handed out).
#[derive(Default)]
pub struct StringsTable {
    tags: FxHashMap<String, TagEntry>,
    next_tag_id: u32,
    allocated_bytes: u64,
}

impl StringsTable {
    pub fn new() -> Self {
        StringsTable {
            tags: FxHashMap::default(),
            next_tag_id: 1,
            allocated_bytes: 0,
        }
    }

    /// Interns `tag` and `value`, returning their sequence numbers and
    /// whether *both* were already present before this call. A fresh intern
    /// of either string makes this `false`.
    pub fn check_and_add(&mut self, tag: &str, value: &str) -> (u32, u32, bool) {
        let mut both_present = true;

        let next_tag_id = &mut self.next_tag_id;
        let allocated_bytes = &mut self.allocated_bytes;
        let entry = self.tags.entry(tag.to_owned()).or_insert_with(|| {
            both_present = false;
            *allocated_bytes += tag.len() as u64;
            let tag_id = *next_tag_id;
            *next_tag_id += 1;
            TagEntry {
                tag_id,
                next_value_id: 1,
                values: FxHashMap::default(),
            }
        });

        let tag_id = entry.tag_id;
        let value_id = match entry.values.get(value) {
            Some(&id) => id,
            None => {
                both_present = false;
                let id = entry.next_value_id;
                entry.next_value_id += 1;
                entry.values.insert(value.to_owned(), id);
                self.allocated_bytes += value.len() as u64;
                id
            }
        };

        (tag_id, value_id, both_present)
    }

    /// Number of distinct tags interned so far.
    pub fn num_tags(&self) -> usize {
        self.tags.len()
    }

    /// Total number of distinct values interned across all tags.
    pub fn num_vals_all(&self) -> usize {
        self.tags.values().map(|t| t.values.len()).sum()
    }

    /// Number of distinct values interned under `tag`, or 0 if unknown.
    pub fn num_vals(&self, tag: &str) -> usize {
        self.tags.get(tag).map_or(0, |t| t.values.len())
    }

    /// Sum of the byte lengths of every interned tag and value string.
    pub fn allocated_bytes(&self) -> u64 {
        self.allocated_bytes
    }

    /// A snapshot mapping each known tag to its distinct value count, for
    /// building the `strings_table` stats object.
    pub fn per_tag_value_counts(&self) -> FxHashMap<String, usize> {
        self.tags
            .iter()
            .map(|(tag, entry)| (tag.clone(), entry.values.len()))
            .collect()
    }
}
