//! I/O module: input opening and lazy line iteration
//!
//! [`GffSource`] opens paths with threshold-based memory mapping and
//! transparent gzip decompression; [`LineSource`] strings any number of
//! opened inputs together as one lazy line stream and hands the remainder
//! over when a FASTA section begins.

mod line_source;
mod source;

pub use line_source::{FastaHandoff, LineSource};
pub use source::{GffSource, MMAP_THRESHOLD};
