// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! An in-memory deduplication cache for attribute-tagged observation points.
//!
//! A *point* is a set of `(tag, value)` string pairs. For each logical
//! namespace (a *bucket*, identified by a `<space>@<generation>` id), the
//! cache answers: has a point with this exact set of pairs already been
//! seen? It's built for high insert-and-probe throughput over millions of
//! distinct points by interning tag/value strings into small integers and
//! storing points as compact, order-independent byte sequences over those
//! integers.
//!
//! ```
//! use point_dedup_cache::{Cache, Config};
//!
//! let mut cache = Cache::new(Config::empty());
//! let point = vec![("host".to_string(), "a.example.com".to_string())];
//!
//! let first = cache.lookup_point("svcA@1", &point).unwrap();
//! assert!(!first.found);
//!
//! let second = cache.lookup_point("svcA@1", &point).unwrap();
//! assert!(second.found);
//! assert_eq!(second.attr_str, "host=a.example.com");
//! ```
//!
//! This crate is single-threaded by design: a [`Cache`] is expected to be
//! driven by one mutator, with no internal locking. See `DESIGN.md` for the
//! full set of invariants and the rationale behind the non-reclaiming
//! `erase` and handle-based arena storage.

pub mod attributes;
pub mod blob;
pub mod cache;
pub mod config;
pub mod encode;
pub mod error;
pub mod hashset;
pub mod stats;
pub mod strings;
pub mod varint;

pub use attributes::LookupResult;
pub use cache::Cache;
pub use config::Config;
pub use error::{CacheError, Result};
pub use stats::{CacheStats, StringsTableStats};
