//! Lexical layer shared by the parser and the sync inserter.
//!
//! Everything here is a pure function over one line (or one column) of
//! text: percent escaping, feature row parsing and formatting, attribute
//! column tokenization, and `##` directive recognition. Errors are
//! signaled through return values and carry no positional context; the
//! parser adds source name and line number when it propagates them.
//!
//! # Examples
//!
//! ```
//! use gffstream::codec;
//!
//! let line = codec::parse_feature_line("chr1\t.\texon\t1\t50\t.\t+\t.\tParent=m1")?;
//! assert_eq!(line.parents(), ["m1".to_string()]);
//! assert_eq!(
//!     codec::format_feature_line(&line),
//!     "chr1\t.\texon\t1\t50\t.\t+\t.\tParent=m1\n"
//! );
//! # Ok::<(), gffstream::GffError>(())
//! ```

mod attributes;
mod directive;
mod escape;
mod line;

pub use attributes::{format_attributes, parse_attributes, ATTRIBUTE_KEY_ORDER};
pub use directive::{parse_directive, ParsedDirective};
pub use escape::{escape, escape_bytes, unescape, unescape_bytes};
pub use line::{format_feature_line, parse_feature_line};
