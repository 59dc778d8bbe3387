// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! An append-only arena of fixed-size slabs ("blobs"). This is the storage
//! backing [`crate::hashset::EntrySet`]: encoded entries are copied in once
//! and never moved, so a [`BlobHandle`] into this store stays valid for the
//! lifetime of the [`BlobStore`] that produced it.
//!
//! Unlike the C++ original this is grounded on, handles here are plain
//! `(blob index, offset)` pairs rather than raw pointers into the arena —
//! see `DESIGN.md` for why that's a safe substitute that doesn't need
//! `unsafe`.

/// Default blob size: 20 MiB.
pub const DEFAULT_BLOB_SIZE: usize = 20 << 20;

/// A stable reference to bytes previously copied into a [`BlobStore`].
/// The length of the referenced entry is not stored here; callers recover
/// it from the bytes themselves via [`crate::varint::entry_length`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobHandle {
    blob: u32,
    offset: u32,
}

/// Append-only arena of fixed-size `Vec<u8>` slabs with a bump-allocator
/// cursor into the tail slab. Entries are never moved or individually freed;
/// the only way to reclaim memory is to drop the whole store.
pub struct BlobStore {
    blob_size: usize,
    blobs: Vec<Vec<u8>>,
}

impl BlobStore {
    /// Creates a store with the default 20 MiB blob size.
    pub fn new() -> Self {
        Self::with_blob_size(DEFAULT_BLOB_SIZE)
    }

    /// Creates a store whose blobs are `blob_size` bytes each.
    pub fn with_blob_size(blob_size: usize) -> Self {
        assert!(blob_size > 0, "blob size must be positive");
        BlobStore {
            blob_size,
            blobs: vec![Vec::with_capacity(blob_size)],
        }
    }

    /// Copies `src` into the arena and returns a handle to the copy.
    ///
    /// # Panics
    /// Panics if `src.len()` exceeds the blob size; callers must reject
    /// oversized entries before reaching the store (see
    /// [`crate::attributes::AttributesTable`]).
    pub fn add(&mut self, src: &[u8]) -> BlobHandle {
        assert!(
            src.len() <= self.blob_size,
            "entry of {} bytes exceeds blob size {}",
            src.len(),
            self.blob_size
        );

        if self.tail().capacity() - self.tail().len() < src.len() {
            self.blobs.push(Vec::with_capacity(self.blob_size));
        }

        let blob = (self.blobs.len() - 1) as u32;
        let tail = self.blobs.last_mut().expect("at least one blob");
        let offset = tail.len() as u32;
        tail.extend_from_slice(src);

        BlobHandle { blob, offset }
    }

    /// Resolves a handle to its bytes. `len` is the caller-known length of
    /// the entry (typically from [`crate::varint::entry_length`]).
    pub fn get(&self, handle: BlobHandle, len: usize) -> &[u8] {
        let blob = &self.blobs[handle.blob as usize];
        let start = handle.offset as usize;
        &blob[start..start + len]
    }

    fn tail(&self) -> &Vec<u8> {
        self.blobs.last().expect("at least one blob")
    }

    /// Total bytes reserved across all blobs (`num_blobs * blob_size`).
    pub fn allocated_bytes(&self) -> u64 {
        (self.blobs.len() as u64) * (self.blob_size as u64)
    }

    /// Total bytes actually copied into the arena so far.
    pub fn used_bytes(&self) -> u64 {
        let full_blobs = (self.blobs.len() - 1) as u64;
        full_blobs * (self.blob_size as u64) + self.tail().len() as u64
    }
}

impl Default for BlobStore {
    fn default() -> Self {
        Self::new()
    }
}
