// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Top-level cache: dispatches per-bucket [`AttributesTable`]s and
//! implements generation-based bucket eviction.

use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, info};

use crate::attributes::AttributesTable;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::stats::{CacheStats, StringsTableStats};
use crate::strings::{FxHashMap, StringsTable};

pub use crate::attributes::LookupResult;

/// Parses a bucket id of the shape `<space>@<decimal-uint>` into its space
/// prefix (including the trailing `@`) and its generation number.
fn parse_bucket_id(bucket_id: &str) -> Result<(&str, u64)> {
    let at = bucket_id.find('@').ok_or_else(|| {
        CacheError::InvalidBucketId(Cow::Owned(bucket_id.to_owned()))
    })?;
    let (space, rest) = bucket_id.split_at(at);
    let generation = rest[1..]
        .parse::<u64>()
        .map_err(|_| CacheError::InvalidBucketId(Cow::Owned(bucket_id.to_owned())))?;
    Ok((space, generation))
}

/// Maps bucket ids to their per-bucket dedup tables, sharing one strings
/// table across all of them.
pub struct Cache {
    strings: Rc<RefCell<StringsTable>>,
    ignored_attributes: Rc<[String]>,
    buckets: FxHashMap<String, AttributesTable>,
}

impl Cache {
    /// Creates a cache from the given configuration.
    pub fn new(config: Config) -> Self {
        let mut ignored: Vec<String> = config.ignored_attributes.into_iter().collect();
        ignored.sort();
        Cache {
            strings: Rc::new(RefCell::new(StringsTable::new())),
            ignored_attributes: Rc::from(ignored),
            buckets: FxHashMap::default(),
        }
    }

    fn get_or_create_bucket(&mut self, bucket_id: &str) -> &mut AttributesTable {
        if !self.buckets.contains_key(bucket_id) {
            debug!(bucket_id, "creating new attributes table for bucket");
            let table = AttributesTable::new(self.strings.clone(), self.ignored_attributes.clone());
            self.buckets.insert(bucket_id.to_owned(), table);
        }
        self.buckets.get_mut(bucket_id).expect("just inserted")
    }

    /// Looks up `point` within `bucket_id`, interning and encoding it as
    /// needed, creating the bucket's table on first use.
    pub fn lookup_point(
        &mut self,
        bucket_id: &str,
        point: &[(String, String)],
    ) -> Result<LookupResult> {
        self.get_or_create_bucket(bucket_id).lookup(point)
    }

    /// Removes `point` from `bucket_id` if present. A point in a bucket that
    /// doesn't exist yet is a no-op (no bucket is created).
    pub fn remove_point(&mut self, bucket_id: &str, point: &[(String, String)]) -> Result<()> {
        match self.buckets.get_mut(bucket_id) {
            Some(table) => table.remove(point),
            None => Ok(()),
        }
    }

    /// Evicts every bucket in the same space as `bucket_id` whose
    /// generation is `<=` the one named by `bucket_id`. The shared strings
    /// table is never cleared.
    pub fn remove_bucket(&mut self, bucket_id: &str) -> Result<()> {
        let (space, generation) = parse_bucket_id(bucket_id)?;
        let prefix: String = format!("{space}@");

        let to_remove: Vec<String> = self
            .buckets
            .keys()
            .filter(|id| {
                id.starts_with(&prefix)
                    && parse_bucket_id(id)
                        .map(|(_, gen)| gen <= generation)
                        .unwrap_or(false)
            })
            .cloned()
            .collect();

        for id in to_remove {
            if let Some(table) = self.buckets.remove(&id) {
                info!(
                    bucket_id = %id,
                    entries = table.stats().attr_entries,
                    "evicted bucket"
                );
            }
        }

        Ok(())
    }

    /// A point-in-time snapshot of the strings table and every live bucket.
    pub fn stats(&self) -> CacheStats {
        let strings = self.strings.borrow();
        let strings_table = StringsTableStats {
            allocated_bytes: strings.allocated_bytes(),
            num_tags: strings.num_tags(),
            num_vals_all: strings.num_vals_all(),
            per_tag: strings.per_tag_value_counts(),
        };

        let buckets = self
            .buckets
            .iter()
            .map(|(id, table)| (id.clone(), table.stats()))
            .collect();

        CacheStats {
            strings_table,
            buckets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(t, v)| (t.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parses_bucket_id_grammar() {
        assert_eq!(parse_bucket_id("svcA@3").unwrap(), ("svcA", 3));
        assert!(parse_bucket_id("svcA").is_err());
        assert!(parse_bucket_id("svcA@notanumber").is_err());
    }

    #[test]
    fn s5_bucket_eviction_by_generation() {
        let mut cache = Cache::new(Config::empty());
        for id in ["svcA@3", "svcA@5", "svcA@9", "svcB@5"] {
            cache.lookup_point(id, &point(&[("host", "a.com")])).unwrap();
        }

        cache.remove_bucket("svcA@5").unwrap();

        let remaining: std::collections::HashSet<&str> =
            cache.buckets.keys().map(|s| s.as_str()).collect();
        assert_eq!(
            remaining,
            std::collections::HashSet::from(["svcA@9", "svcB@5"])
        );
    }

    #[test]
    fn invalid_bucket_id_is_rejected() {
        let mut cache = Cache::new(Config::empty());
        assert!(matches!(
            cache.remove_bucket("no-at-sign"),
            Err(CacheError::InvalidBucketId(_))
        ));
    }

    #[test]
    fn lookup_creates_bucket_on_first_use() {
        let mut cache = Cache::new(Config::empty());
        assert!(cache.stats().buckets.is_empty());
        cache
            .lookup_point("svc@1", &point(&[("host", "a.com")]))
            .unwrap();
        assert_eq!(cache.stats().buckets.len(), 1);
    }

    #[test]
    fn strings_table_is_shared_across_buckets() {
        let mut cache = Cache::new(Config::empty());
        cache
            .lookup_point("svc@1", &point(&[("host", "a.com")]))
            .unwrap();
        cache
            .lookup_point("svc@2", &point(&[("host", "a.com")]))
            .unwrap();
        // Same tag+value interned once, shared between buckets.
        assert_eq!(cache.stats().strings_table.num_tags, 1);
        assert_eq!(cache.stats().strings_table.num_vals_all, 1);
    }

    #[test]
    fn remove_point_on_unknown_bucket_is_a_no_op() {
        let mut cache = Cache::new(Config::empty());
        assert!(cache
            .remove_point("svc@1", &point(&[("host", "a.com")]))
            .is_ok());
    }
}
