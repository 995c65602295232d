//! Percent escaping for GFF3 column and attribute text.
//!
//! GFF3 reserves a small byte set inside fields: the column separator
//! (tab), line terminators, and the attribute punctuation `;`, `=`, `%`,
//! `&`, `,`. Those bytes, all other control bytes, and everything outside
//! printable ASCII are written as `%HH`. Unescaping is best-effort: a `%`
//! that is not followed by two hex digits passes through unchanged.
//!
//! # Examples
//!
//! ```
//! use gffstream::codec::{escape, unescape};
//!
//! assert_eq!(escape("a,b;c"), "a%2Cb%3Bc");
//! assert_eq!(unescape("a%2Cb%3Bc"), "a,b;c");
//!
//! // Malformed escapes pass through.
//! assert_eq!(unescape("100%"), "100%");
//! assert_eq!(unescape("%GG"), "%GG");
//! ```

/// Bytes escaped in addition to control and non-ASCII bytes.
const RESERVED: &[u8] = b";=%&,";

fn is_reserved(b: u8) -> bool {
    b < 0x20 || b >= 0x7f || RESERVED.contains(&b)
}

/// Percent-escape a string for use as a GFF3 field or attribute value.
pub fn escape(s: &str) -> String {
    escape_bytes(s.as_bytes())
}

/// Percent-escape raw bytes. The output is pure ASCII: reserved bytes
/// become uppercase `%HH` sequences, everything else passes through.
pub fn escape_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        if is_reserved(b) {
            out.push('%');
            out.push(char::from_digit((b >> 4) as u32, 16).unwrap().to_ascii_uppercase());
            out.push(char::from_digit((b & 0xf) as u32, 16).unwrap().to_ascii_uppercase());
        } else {
            out.push(b as char);
        }
    }
    out
}

/// Undo percent escaping, replacing undecodable UTF-8 lossily.
///
/// Fields in parsed lines go through this; for exact byte fidelity use
/// [`unescape_bytes`].
pub fn unescape(s: &str) -> String {
    match String::from_utf8(unescape_bytes(s)) {
        Ok(out) => out,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

/// Undo percent escaping at the byte level: the exact inverse of
/// [`escape_bytes`]. Malformed `%` sequences are copied through unchanged.
pub fn unescape_bytes(s: &str) -> Vec<u8> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hi = (bytes[i + 1] as char).to_digit(16);
            let lo = (bytes[i + 2] as char).to_digit(16);
            if let (Some(hi), Some(lo)) = (hi, lo) {
                out.push(((hi << 4) | lo) as u8);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_reserved_punctuation() {
        assert_eq!(escape("a;b=c%d&e,f"), "a%3Bb%3Dc%25d%26e%2Cf");
    }

    #[test]
    fn test_escape_control_and_high_bytes() {
        assert_eq!(escape("a\tb\nc\rd"), "a%09b%0Ac%0Dd");
        assert_eq!(escape_bytes(&[0x00, 0x1f, 0x7f, 0xff]), "%00%1F%7F%FF");
    }

    #[test]
    fn test_escape_passes_printable_ascii() {
        let s = "chr1 exon+score:0.5 [a-z]!";
        assert_eq!(escape(s), s);
    }

    #[test]
    fn test_unescape_case_insensitive() {
        assert_eq!(unescape("%2c%2C"), ",,");
    }

    #[test]
    fn test_unescape_malformed_passthrough() {
        assert_eq!(unescape("%"), "%");
        assert_eq!(unescape("%2"), "%2");
        assert_eq!(unescape("%zz"), "%zz");
        assert_eq!(unescape("50%%20"), "50% ");
    }

    #[test]
    fn test_byte_round_trip_all_values() {
        // unescape(escape(s)) == s for every byte value.
        let all: Vec<u8> = (0u8..=255).collect();
        let escaped = escape_bytes(&all);
        assert!(escaped.is_ascii());
        assert_eq!(unescape_bytes(&escaped), all);
    }

    #[test]
    fn test_string_round_trip() {
        let s = "Noggin,+-%Foo\tbar";
        assert_eq!(unescape(&escape(s)), s);
    }
}
