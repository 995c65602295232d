//! `###` synchronization mark insertion.
//!
//! [`SyncInserter`] rewrites GFF3 input so that `###` marks appear at
//! every safe point: a position where no feature in the remainder still
//! awaits a parent or derivation defined earlier. Pre-existing `###` lines
//! are dropped and recomputed, which makes the pass idempotent.
//!
//! # Algorithm
//!
//! Two passes through one temp file. The inputs are read **backwards**,
//! maintaining the set of IDs still awaited: each feature line unions in
//! its `Parent`/`Derives_from` values and subtracts its `ID` values. A
//! line written while the set is empty is a safe point, so a marker is
//! written after it — which, once the temp file is reversed back into
//! forward order, places the marker *before* the line. The reversal pass
//! suppresses a marker that would precede all feature data.
//!
//! Reading backwards is what makes the decision local: at any line, the
//! open set says exactly whether every reference pointing earlier than
//! here has been resolved.

use crate::codec::unescape;
use crate::error::{GffError, Result};
use log::debug;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Rewrites GFF3 inputs with `###` marks inserted at every safe point.
///
/// # Example
///
/// ```no_run
/// use gffstream::SyncInserter;
///
/// let inserter = SyncInserter::new(vec!["annotations.gff3"]);
/// let mut out = Vec::new();
/// inserter.run(&mut out)?;
/// # Ok::<(), gffstream::GffError>(())
/// ```
pub struct SyncInserter {
    paths: Vec<PathBuf>,
}

impl SyncInserter {
    /// Create an inserter over the given inputs, treated as one
    /// concatenation in order.
    pub fn new<P, I>(paths: I) -> Self
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = P>,
    {
        SyncInserter {
            paths: paths.into_iter().map(|p| p.as_ref().to_path_buf()).collect(),
        }
    }

    /// Run the two-pass rewrite, writing the marked-up concatenation to
    /// `out`.
    pub fn run<W: Write>(&self, out: &mut W) -> Result<()> {
        let mut temp = tempfile::tempfile()?;
        let mut open_refs: HashSet<String> = HashSet::new();

        {
            let mut temp_out = BufWriter::new(&mut temp);
            // Reverse global order: last file first, each read backwards.
            for path in self.paths.iter().rev() {
                let file = File::open(path).map_err(|source| GffError::OpenPath {
                    path: path.display().to_string(),
                    source,
                })?;
                debug!("backward pass over {}", path.display());
                let mut lines = BackwardLineReader::new(file)?;
                while let Some(line) = lines.next_line()? {
                    let trimmed = line.trim_start();
                    if is_sync_mark(trimmed) {
                        continue;
                    }
                    if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('>') {
                        writeln!(temp_out, "{line}")?;
                        continue;
                    }
                    let is_feature = scan_references(&line, &mut open_refs);
                    writeln!(temp_out, "{line}")?;
                    if is_feature && open_refs.is_empty() {
                        writeln!(temp_out, "###")?;
                    }
                }
            }
            temp_out.flush()?;
        }

        // Reverse again to restore forward order; a marker before any
        // feature data is useless and suppressed. "Feature data" here is
        // the same classification the backward pass used: not blank, not
        // `#`- or `>`-prefixed, and all nine tab fields present.
        let mut lines = BackwardLineReader::new(temp)?;
        let mut seen_feature = false;
        while let Some(line) = lines.next_line()? {
            let trimmed = line.trim_start();
            if is_sync_mark(trimmed) && !seen_feature {
                continue;
            }
            if !trimmed.is_empty()
                && !trimmed.starts_with('#')
                && !trimmed.starts_with('>')
                && feature_column(&line).is_some()
            {
                seen_feature = true;
            }
            writeln!(out, "{line}")?;
        }
        Ok(())
    }
}

fn is_sync_mark(trimmed: &str) -> bool {
    trimmed.bytes().take_while(|&b| b == b'#').count() == 3 && trimmed[3..].trim().is_empty()
}

/// Column 9 of a tab-split row, when the line has all nine fields. Only
/// such rows count as feature data for marker placement.
fn feature_column(line: &str) -> Option<&str> {
    line.splitn(9, '\t').nth(8)
}

/// Cheap column-9 scan: union `Parent`/`Derives_from` values into the open
/// set, then subtract `ID` values. Returns whether the line had nine
/// fields (i.e. is a feature line eligible for a following marker).
fn scan_references(line: &str, open_refs: &mut HashSet<String>) -> bool {
    let Some(column9) = feature_column(line) else {
        return false;
    };

    let mut awaited = Vec::new();
    let mut defined = Vec::new();
    for token in column9.split(';') {
        let Some((name, value)) = token.split_once('=') else {
            continue;
        };
        match name {
            "Parent" | "Derives_from" => {
                awaited.extend(value.split(',').map(unescape));
            }
            "ID" => {
                defined.extend(value.split(',').map(unescape));
            }
            _ => {}
        }
    }
    open_refs.extend(awaited);
    for id in defined {
        open_refs.remove(&id);
    }
    true
}

const CHUNK_SIZE: u64 = 8192;

/// Reads a seekable stream line by line from the end.
///
/// Lines are yielded without their terminator; a `\r` preceding the `\n`
/// is stripped as well.
pub(crate) struct BackwardLineReader<R: Read + Seek> {
    inner: R,
    /// File offset of the first byte held in `buffer`.
    low: u64,
    /// Pending bytes; the final byte is the last byte of the next line to
    /// yield (terminators are consumed as lines are cut).
    buffer: Vec<u8>,
}

impl<R: Read + Seek> BackwardLineReader<R> {
    pub(crate) fn new(mut inner: R) -> Result<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        let mut reader = BackwardLineReader {
            inner,
            low: len,
            buffer: Vec::new(),
        };
        if len > 0 {
            reader.fill_front()?;
            // A trailing newline terminates the final line; it is not an
            // extra empty line.
            if reader.buffer.last() == Some(&b'\n') {
                reader.buffer.pop();
                if reader.buffer.last() == Some(&b'\r') {
                    reader.buffer.pop();
                }
            }
        }
        Ok(reader)
    }

    fn fill_front(&mut self) -> Result<()> {
        let take = CHUNK_SIZE.min(self.low);
        let new_low = self.low - take;
        self.inner.seek(SeekFrom::Start(new_low))?;
        let mut chunk = vec![0u8; take as usize];
        self.inner.read_exact(&mut chunk)?;
        chunk.extend_from_slice(&self.buffer);
        self.buffer = chunk;
        self.low = new_low;
        Ok(())
    }

    pub(crate) fn next_line(&mut self) -> Result<Option<String>> {
        loop {
            if let Some(pos) = self.buffer.iter().rposition(|&b| b == b'\n') {
                let line = self.buffer.split_off(pos + 1);
                self.buffer.pop(); // the newline
                if self.buffer.last() == Some(&b'\r') {
                    self.buffer.pop(); // CRLF terminator
                }
                return Ok(Some(String::from_utf8_lossy(&line).into_owned()));
            }
            if self.low == 0 {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                let line = std::mem::take(&mut self.buffer);
                return Ok(Some(String::from_utf8_lossy(&line).into_owned()));
            }
            self.fill_front()?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn backward_lines(data: &str) -> Vec<String> {
        let mut reader = BackwardLineReader::new(Cursor::new(data.as_bytes().to_vec())).unwrap();
        let mut lines = Vec::new();
        while let Some(line) = reader.next_line().unwrap() {
            lines.push(line);
        }
        lines
    }

    #[test]
    fn test_backward_reader_basic() {
        assert_eq!(backward_lines("a\nb\nc\n"), ["c", "b", "a"]);
    }

    #[test]
    fn test_backward_reader_no_trailing_newline() {
        assert_eq!(backward_lines("a\nb\nc"), ["c", "b", "a"]);
    }

    #[test]
    fn test_backward_reader_empty_input() {
        assert!(backward_lines("").is_empty());
    }

    #[test]
    fn test_backward_reader_preserves_empty_lines() {
        assert_eq!(backward_lines("a\n\nb\n"), ["b", "", "a"]);
    }

    #[test]
    fn test_backward_reader_crosses_chunk_boundaries() {
        // Lines longer than the chunk size and enough lines to need many
        // refills.
        let long = "x".repeat(3 * CHUNK_SIZE as usize);
        let data = format!("first\n{long}\nlast\n");
        assert_eq!(backward_lines(&data), ["last", long.as_str(), "first"]);

        let many: String = (0..5000).map(|i| format!("line{i}\n")).collect();
        let lines = backward_lines(&many);
        assert_eq!(lines.len(), 5000);
        assert_eq!(lines[0], "line4999");
        assert_eq!(lines[4999], "line0");
    }

    #[test]
    fn test_scan_references_tracks_open_set() {
        let mut open = HashSet::new();
        assert!(scan_references("chr\t.\texon\t1\t5\t.\t+\t.\tParent=m1", &mut open));
        assert!(open.contains("m1"));
        scan_references("chr\t.\tmRNA\t1\t9\t.\t+\t.\tID=m1;Parent=g1", &mut open);
        assert!(!open.contains("m1"));
        assert!(open.contains("g1"));
        scan_references("chr\t.\tgene\t1\t9\t.\t+\t.\tID=g1", &mut open);
        assert!(open.is_empty());
    }

    #[test]
    fn test_scan_references_short_line_ignored() {
        let mut open = HashSet::new();
        assert!(!scan_references("ACGTACGT", &mut open));
        assert!(open.is_empty());
    }

    #[test]
    fn test_scan_references_unescapes_values() {
        let mut open = HashSet::new();
        scan_references("chr\t.\texon\t1\t5\t.\t+\t.\tParent=a%2Cb", &mut open);
        assert!(open.contains("a,b"));
        scan_references("chr\t.\tgene\t1\t9\t.\t+\t.\tID=a%2Cb", &mut open);
        assert!(open.is_empty());
    }

    #[test]
    fn test_is_sync_mark() {
        assert!(is_sync_mark("###"));
        assert!(is_sync_mark("###  "));
        assert!(!is_sync_mark("##"));
        assert!(!is_sync_mark("####"));
        assert!(!is_sync_mark("###x"));
    }
}
