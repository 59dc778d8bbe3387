// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Snapshot types returned by [`crate::cache::Cache::stats`].

use crate::attributes::AttributesTableStats;
use crate::strings::FxHashMap;

/// Snapshot of the shared strings table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringsTableStats {
    pub allocated_bytes: u64,
    pub num_tags: usize,
    pub num_vals_all: usize,
    /// Distinct value count per known tag.
    pub per_tag: FxHashMap<String, usize>,
}

/// A full point-in-time snapshot of the cache: the shared strings table plus
/// one [`AttributesTableStats`] entry per live bucket.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    pub strings_table: StringsTableStats,
    pub buckets: FxHashMap<String, AttributesTableStats>,
}
