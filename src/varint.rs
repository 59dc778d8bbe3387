// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! A 7-bits-per-byte variable-length encoding for `u32`, with the
//! continuation bit in the MSB position (the same shape as a protobuf
//! varint). The encoder always produces the canonical, shortest-possible
//! form; the decoder accepts any well-formed sequence, including overlong
//! ones, since it never needs to produce them itself.

/// Appends the packed encoding of `val` to `out` and returns the number of
/// bytes written.
pub fn encode(val: u32, out: &mut Vec<u8>) -> usize {
    let start = out.len();
    let mut v = val;
    while v >= 0x80 {
        out.push((v as u8) | 0x80);
        v >>= 7;
    }
    out.push(v as u8);
    out.len() - start
}

/// Decodes a packed `u32` from the front of `bytes`, returning the value and
/// the number of bytes consumed.
///
/// # Panics
/// Panics if `bytes` does not contain a terminated varint (every byte has
/// its continuation bit set). Callers only ever hand this well-formed
/// entries produced by [`encode`], so this should not occur in practice.
pub fn decode(bytes: &[u8]) -> (u32, usize) {
    let mut result: u32 = 0;
    let mut shift = 0u32;
    for (i, &b) in bytes.iter().enumerate() {
        result |= ((b & 0x7f) as u32) << shift;
        if b & 0x80 == 0 {
            return (result, i + 1);
        }
        shift += 7;
    }
    panic!("truncated varint: no terminating byte found");
}

/// Computes the byte length of an encoded entry (`N · pairs(tag_id,val_id)`)
/// without a stored length prefix: reads `N`, then advances through exactly
/// `2*N` further varints.
///
/// # Panics
/// Panics if `bytes` is truncated mid-varint; see [`decode`].
pub fn entry_length(bytes: &[u8]) -> usize {
    let (n, mut len) = decode(bytes);
    if n == 0 {
        return len;
    }
    for _ in 0..(2 * n) {
        let (_, consumed) = decode(&bytes[len..]);
        len += consumed;
    }
    len
}
