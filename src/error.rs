// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::borrow::Cow;

/// Errors that can occur while operating the cache.
///
/// Everything else (interning, hashing, encode/decode) is infallible by
/// construction; these are the only two states a caller needs to handle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// The point's canonical `tag=value,...` attribute string would exceed
    /// the 16 KiB hard limit. No state was changed.
    #[error("encoded attribute string exceeds the {limit} byte limit")]
    TooBig {
        /// The configured limit that was exceeded.
        limit: usize,
    },
    /// A bucket id did not match the `<space>@<decimal-uint>` grammar.
    #[error("invalid bucket id `{0}`: expected `<space>@<generation>`")]
    InvalidBucketId(Cow<'static, str>),
}

/// Result alias used throughout the crate's public API.
pub type Result<T> = std::result::Result<T, CacheError>;
