//! gffstream: streaming GFF3 parsing with hierarchy reconstruction
//!
//! # Overview
//!
//! GFF3 is line-oriented, but the features on those lines form trees:
//! `Parent` and `Derives_from` attributes cross-reference `ID`s that may
//! appear in any order between `###` synchronization marks. gffstream
//! reads one or more GFF3 inputs as a lazy stream of items — feature
//! groups, directives, comments, and a FASTA handoff — while resolving
//! those references incrementally and flushing completed subtrees as soon
//! as a sync boundary allows, so memory tracks the current window rather
//! than the whole file.
//!
//! ## Key Features
//!
//! - **Streaming**: items are produced on demand from `next_item`, with
//!   flushes at every `###`, `##FASTA` and end of input
//! - **Hierarchy reconstruction**: forward references, multi-location
//!   features, multi-parent children and derivation links all resolve to
//!   shared [`Feature`] handles
//! - **Pluggable working state**: the default in-memory store, or a
//!   disk-backed store that spills feature subgraphs between flushes
//! - **Sync mark insertion**: [`SyncInserter`] re-synthesizes `###` marks
//!   at every safe position of an existing file
//!
//! ## Quick Start
//!
//! ```
//! use gffstream::{GffItem, GffStream};
//!
//! let data = "\
//! chr1\t.\tgene\t1\t100\t.\t+\t.\tID=g1
//! chr1\t.\tmRNA\t1\t100\t.\t+\t.\tID=m1;Parent=g1
//! chr1\t.\texon\t1\t50\t.\t+\t.\tParent=m1
//! ";
//!
//! for item in GffStream::from_reader(data.as_bytes()) {
//!     if let GffItem::Feature(feature) = item? {
//!         // g1, with m1 nested under it and the exon under m1
//!         assert_eq!(feature.ids(), vec!["g1".to_string()]);
//!     }
//! }
//! # Ok::<(), gffstream::GffError>(())
//! ```
//!
//! ## Module Organization
//!
//! - [`codec`]: percent escaping, feature line and attribute column
//!   parse/format, directive recognition
//! - [`io`]: input opening (mmap threshold, gzip) and multi-stream line
//!   iteration with FASTA handoff
//! - [`store`]: the parse-window working state, in memory or on disk
//! - [`parser`]: the streaming hierarchy-reconstructing parser
//! - [`sync`]: the backward-reading `###` insertion pass

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod codec;
pub mod error;
pub mod io;
pub mod parser;
pub mod store;
pub mod sync;
pub mod types;

// Re-export commonly used types
pub use error::{GffError, Result};
pub use io::{FastaHandoff, GffSource, LineSource};
pub use parser::GffStream;
pub use store::{DiskStore, MemoryStore, TempStore};
pub use sync::SyncInserter;
pub use types::{Directive, Feature, GffItem, GffLine, ReferenceKind, Strand};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
