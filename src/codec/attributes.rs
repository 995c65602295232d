//! Attribute column (column 9) tokenization and formatting.
//!
//! The column is `name=value(,value)*` pairs separated by `;`. Names and
//! values are percent-escaped. Parsing is permissive: tokens without `=`
//! are discarded, duplicate names accumulate into one list in encounter
//! order, and `.` or an empty column yields an empty map.
//!
//! Formatting is byte-stable: `ID`, `Name`, `Alias`, `Parent` are emitted
//! first in that order, remaining keys follow lexicographically, so
//! repeated formatting of the same map always produces identical text.

use crate::codec::escape::{escape, unescape};
use crate::types::AttributeMap;

/// Attribute keys emitted ahead of all others, in this order.
pub const ATTRIBUTE_KEY_ORDER: [&str; 4] = ["ID", "Name", "Alias", "Parent"];

fn key_rank(key: &str) -> usize {
    ATTRIBUTE_KEY_ORDER
        .iter()
        .position(|k| *k == key)
        .unwrap_or(ATTRIBUTE_KEY_ORDER.len())
}

/// Tokenize the raw column-9 text into an attribute map.
///
/// # Examples
///
/// ```
/// use gffstream::codec::parse_attributes;
///
/// let attrs = parse_attributes("ID=m1;Parent=g1,g2;Note=a%2Cb");
/// assert_eq!(attrs["ID"], ["m1"]);
/// assert_eq!(attrs["Parent"], ["g1", "g2"]);
/// assert_eq!(attrs["Note"], ["a,b"]);
///
/// assert!(parse_attributes(".").is_empty());
/// ```
pub fn parse_attributes(column: &str) -> AttributeMap {
    let mut attrs = AttributeMap::new();
    if column.is_empty() || column == "." {
        return attrs;
    }
    for token in column.split(';') {
        if token.is_empty() {
            continue;
        }
        let Some((name, value)) = token.split_once('=') else {
            // No '=': not a name=value pair, discarded.
            continue;
        };
        let values = attrs.entry(unescape(name)).or_default();
        for piece in value.split(',') {
            values.push(unescape(piece));
        }
    }
    attrs
}

/// Format an attribute map as column-9 text, or `.` when empty.
///
/// Keys with an empty value list are omitted. Output key order is stable;
/// see [`ATTRIBUTE_KEY_ORDER`].
pub fn format_attributes(attrs: &AttributeMap) -> String {
    let mut keys: Vec<&String> = attrs
        .iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(k, _)| k)
        .collect();
    keys.sort_by(|a, b| {
        (key_rank(a.as_str()), a.as_str()).cmp(&(key_rank(b.as_str()), b.as_str()))
    });

    if keys.is_empty() {
        return ".".to_string();
    }

    let mut parts = Vec::with_capacity(keys.len());
    for key in keys {
        let values: Vec<String> = attrs[key].iter().map(|v| escape(v)).collect();
        parts.push(format!("{}={}", escape(key), values.join(",")));
    }
    parts.join(";")
}
