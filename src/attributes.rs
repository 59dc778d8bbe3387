// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Per-bucket facade over the string interner and the entry set: encodes a
//! point and forwards it to the hash set for insertion or removal.

use std::cell::RefCell;
use std::rc::Rc;

use crate::encode;
use crate::error::Result;
use crate::hashset::{EntrySet, EntrySetStats};
use crate::strings::StringsTable;

/// Outcome of [`AttributesTable::lookup`].
pub struct LookupResult {
    /// `true` iff this exact point already existed in the table.
    pub found: bool,
    /// Canonical `tag=value,...` attribute string, sorted by tag.
    pub attr_str: String,
}

/// Statistics for a single bucket's attributes table, matching the nested
/// per-bucket object described in the spec's `stats()` interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttributesTableStats {
    pub attr_entries: u64,
    pub set: EntrySetStats,
}

/// Checks whether `tag` is in the ignored-attribute set, taking the set by
/// reference so callers can hold it alongside other borrows of the table.
fn is_ignored(ignored: &[String], tag: &str) -> bool {
    ignored.iter().any(|t| t == tag)
}

/// Owns one bucket's dedup hash set and holds a shared reference to the
/// cache-wide strings table. `scratch`/`attr_buf` are the encode buffers,
/// reused across every `lookup`/`remove` call rather than reallocated.
pub struct AttributesTable {
    set: EntrySet,
    strings: Rc<RefCell<StringsTable>>,
    ignored: Rc<[String]>,
    scratch: Vec<u8>,
    attr_buf: String,
}

impl AttributesTable {
    pub fn new(strings: Rc<RefCell<StringsTable>>, ignored: Rc<[String]>) -> Self {
        AttributesTable {
            set: EntrySet::new(),
            strings,
            ignored,
            scratch: Vec::new(),
            attr_buf: String::new(),
        }
    }

    /// Encodes `point`, inserts it into the dedup set if new, and reports
    /// whether it was already present.
    pub fn lookup(&mut self, point: &[(String, String)]) -> Result<LookupResult> {
        let mut strings = self.strings.borrow_mut();
        let ignored = &self.ignored;
        let encoded = encode::encode(
            &mut strings,
            point,
            |tag| is_ignored(ignored, tag),
            &mut self.scratch,
            &mut self.attr_buf,
        )?;
        let is_new = self.set.insert(encoded.bytes);
        Ok(LookupResult {
            found: !is_new,
            attr_str: encoded.attr_str,
        })
    }

    /// Encodes `point` and removes it from the dedup set if present. A
    /// point that was never inserted, or that doesn't exist in this bucket,
    /// is a no-op. Shares the same [`crate::error::CacheError::TooBig`]
    /// check as `lookup` (the original implementation skipped this check on
    /// the remove path, which could silently build a malformed buffer for
    /// oversized points — this crate treats that as a bug and fixes it).
    pub fn remove(&mut self, point: &[(String, String)]) -> Result<()> {
        let mut strings = self.strings.borrow_mut();
        let ignored = &self.ignored;
        let encoded = encode::encode(
            &mut strings,
            point,
            |tag| is_ignored(ignored, tag),
            &mut self.scratch,
            &mut self.attr_buf,
        )?;
        self.set.erase(encoded.bytes);
        Ok(())
    }

    pub fn stats(&self) -> AttributesTableStats {
        AttributesTableStats {
            attr_entries: self.set.len(),
            set: self.set.stats(),
        }
    }
}
