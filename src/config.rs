// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Cache construction configuration.
//!
//! Where the original implementation kept the ignored-attribute set as
//! process-wide state initialized once at startup, this crate threads it
//! explicitly through [`Config`] into [`crate::cache::Cache::new`] — same
//! behavior, no global state, no ambiguity about lifetime.

use std::collections::HashSet;

/// Configuration for a [`crate::cache::Cache`].
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Attribute (tag) names that are never encoded or hashed, e.g.
    /// timestamps or raw sample values that would otherwise defeat
    /// deduplication.
    pub ignored_attributes: HashSet<String>,
}

impl Config {
    /// Creates a config with the given ignored-attribute set.
    pub fn new(ignored_attributes: HashSet<String>) -> Self {
        Config { ignored_attributes }
    }

    /// Creates a config with no ignored attributes.
    pub fn empty() -> Self {
        Config::default()
    }
}
