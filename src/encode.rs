// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Canonicalizes a point — an unordered bag of `(tag, value)` string pairs —
//! into the packed, order-independent byte sequence the hash set keys on,
//! plus the human-readable `tag=value,...` string used as a cache key by
//! downstream consumers.

use tracing::warn;

use crate::error::{CacheError, Result};
use crate::strings::StringsTable;
use crate::varint;

/// Hard limit on the pretty attribute string, matching the spec's 16 KiB
/// scratch buffer.
pub const MAX_ATTR_STRING_LEN: usize = 16 << 10;

/// The result of encoding one point. Borrows its packed bytes from the
/// caller-owned scratch buffer; `attr_str` is the one allocation this call
/// can't avoid, since it outlives the call as part of [`crate::attributes::LookupResult`].
pub struct Encoded<'a> {
    /// The canonical, tag-sorted packed byte sequence.
    pub bytes: &'a [u8],
    /// `tag1=val1,tag2=val2,...` in the same sorted order.
    pub attr_str: String,
    /// `true` iff every (tag, value) string in the point was already known
    /// to the strings table before this call. This is a fast-path hint, not
    /// a dedup verdict: the hash-set probe is the only authority on whether
    /// the *point* itself is new.
    pub all_found: bool,
}

struct Tuple<'a> {
    tag: &'a str,
    value: &'a str,
    tag_id: u32,
    value_id: u32,
}

/// Encodes `point`, skipping any pair whose tag is in `is_ignored`, interning
/// strings via `strings`. `scratch` and `attr_buf` are caller-owned buffers
/// (typically a bucket's [`crate::attributes::AttributesTable`] scratch
/// fields): both are cleared and reused in place rather than reallocated.
/// Returns `Err(CacheError::TooBig)` if the resulting attribute string would
/// exceed [`MAX_ATTR_STRING_LEN`] — in which case no partial result is
/// produced.
pub fn encode<'s>(
    strings: &mut StringsTable,
    point: &[(String, String)],
    is_ignored: impl Fn(&str) -> bool,
    scratch: &'s mut Vec<u8>,
    attr_buf: &mut String,
) -> Result<Encoded<'s>> {
    let mut all_found = true;
    let mut tuples: Vec<Tuple> = Vec::with_capacity(point.len());

    for (tag, value) in point {
        if is_ignored(tag) {
            continue;
        }
        let (tag_id, value_id, both_present) = strings.check_and_add(tag, value);
        all_found &= both_present;
        tuples.push(Tuple {
            tag,
            value,
            tag_id,
            value_id,
        });
    }

    // Canonicalization: ascending tag string, with value string as a
    // tie-break for the (unexpected, but not forbidden) case of duplicate
    // tags within one point. This makes the encoding a deterministic total
    // order regardless of input order or duplicate tags.
    tuples.sort_by(|a, b| a.tag.cmp(b.tag).then_with(|| a.value.cmp(b.value)));

    scratch.clear();
    attr_buf.clear();
    varint::encode(tuples.len() as u32, scratch);

    for (i, t) in tuples.iter().enumerate() {
        varint::encode(t.tag_id, scratch);
        varint::encode(t.value_id, scratch);

        if i != 0 {
            attr_buf.push(',');
        }
        attr_buf.push_str(t.tag);
        attr_buf.push('=');
        attr_buf.push_str(t.value);

        if attr_buf.len() > MAX_ATTR_STRING_LEN {
            warn!(
                len = attr_buf.len(),
                limit = MAX_ATTR_STRING_LEN,
                "point attribute string exceeds limit, rejecting"
            );
            return Err(CacheError::TooBig {
                limit: MAX_ATTR_STRING_LEN,
            });
        }
    }

    Ok(Encoded {
        bytes: scratch.as_slice(),
        attr_str: attr_buf.clone(),
        all_found,
    })
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
    fn s1_canonical_four_tag_encoding() {
        let mut strings = StringsTable::new();
        let pt = point(&[
            ("proxy", "sfdc1"),
            ("ip", "127.12.33.22"),
            ("host", "myname.mydomain.com"),
            ("rate", "99"),
        ]);
        let mut scratch = Vec::new();
        let mut attr_buf = String::new();
        let encoded = encode(&mut strings, &pt, |_| false, &mut scratch, &mut attr_buf).unwrap();
        assert_eq!(
            encoded.bytes,
            &[0x04, 0x03, 0x01, 0x02, 0x01, 0x01, 0x01, 0x04, 0x01][..]
        );
        assert_eq!(
            encoded.attr_str,
            "host=myname.mydomain.com,ip=127.12.33.22,proxy=sfdc1,rate=99"
        );
    }

    #[test]
    fn s6_ignored_attributes_are_skipped() {
        let mut strings = StringsTable::new();
        let pt = point(&[
            ("host", "foo.com"),
            ("time", "14044044"),
            ("value", "333333"),
            ("name", "cpu.system"),
        ]);
        let ignored = ["time", "value"];
        let mut scratch = Vec::new();
        let mut attr_buf = String::new();
        let encoded = encode(
            &mut strings,
            &pt,
            |t| ignored.contains(&t),
            &mut scratch,
            &mut attr_buf,
        )
        .unwrap();
        assert_eq!(encoded.attr_str, "host=foo.com,name=cpu.system");
        let (n, _) = varint::decode(encoded.bytes);
        assert_eq!(n, 2);
    }

    #[test]
    fn order_independence() {
        let mut strings_a = StringsTable::new();
        let mut strings_b = StringsTable::new();
        let pt_a = point(&[("a", "1"), ("b", "2"), ("c", "3")]);
        let pt_b = point(&[("c", "3"), ("a", "1"), ("b", "2")]);

        let mut scratch_a = Vec::new();
        let mut attr_buf_a = String::new();
        let encoded_a = encode(&mut strings_a, &pt_a, |_| false, &mut scratch_a, &mut attr_buf_a).unwrap();

        let mut scratch_b = Vec::new();
        let mut attr_buf_b = String::new();
        let encoded_b = encode(&mut strings_b, &pt_b, |_| false, &mut scratch_b, &mut attr_buf_b).unwrap();

        assert_eq!(encoded_a.bytes, encoded_b.bytes);
    }

    #[test]
    fn too_big_point_is_rejected() {
        let mut strings = StringsTable::new();
        let long_value = "x".repeat(MAX_ATTR_STRING_LEN);
        let pt = point(&[("tag", &long_value)]);
        let mut scratch = Vec::new();
        let mut attr_buf = String::new();
        let err = encode(&mut strings, &pt, |_| false, &mut scratch, &mut attr_buf).unwrap_err();
        assert_eq!(
            err,
            CacheError::TooBig {
                limit: MAX_ATTR_STRING_LEN
            }
        );
    }

    #[test]
    fn all_found_is_false_on_first_sighting_true_on_repeat() {
        let mut strings = StringsTable::new();
        let pt = point(&[("host", "a.com")]);
        let mut scratch = Vec::new();
        let mut attr_buf = String::new();
        let first = encode(&mut strings, &pt, |_| false, &mut scratch, &mut attr_buf).unwrap();
        assert!(!first.all_found);
        let second = encode(&mut strings, &pt, |_| false, &mut scratch, &mut attr_buf).unwrap();
        assert!(second.all_found);
    }
}
