//! Lazy line iteration over an ordered concatenation of input streams.
//!
//! [`LineSource`] presents any number of inputs as one sequence of lines,
//! retiring each stream when it is exhausted. It remembers the current
//! source name and line number for diagnostics, and can surrender the
//! remaining bytes of the current stream for the FASTA handoff.

use crate::error::Result;
use crate::io::GffSource;
use log::debug;
use std::collections::VecDeque;
use std::io::{BufRead, Cursor, Read};

/// Ordered concatenation of input streams as a lazy line iterator.
pub struct LineSource {
    streams: VecDeque<(String, Box<dyn BufRead + Send>)>,
    line_number: usize,
    buf: Vec<u8>,
}

impl LineSource {
    /// Build a line source by opening the given inputs in order.
    pub fn open(sources: Vec<GffSource>) -> Result<Self> {
        let mut streams = VecDeque::with_capacity(sources.len());
        for source in sources {
            streams.push_back(source.open()?);
        }
        Ok(Self::from_streams(streams.into()))
    }

    /// Build a line source over already-open named streams, taken as-is
    /// (no compression sniffing).
    pub fn from_streams(streams: Vec<(String, Box<dyn BufRead + Send>)>) -> Self {
        LineSource {
            streams: streams.into(),
            line_number: 0,
            buf: Vec::with_capacity(256),
        }
    }

    /// The next line, including its terminator, or `None` when every
    /// stream is exhausted. Bytes are treated as UTF-8; undecodable bytes
    /// are replaced rather than rejected.
    pub fn next_line(&mut self) -> Result<Option<String>> {
        loop {
            let Some((_, reader)) = self.streams.front_mut() else {
                return Ok(None);
            };
            self.buf.clear();
            let n = reader.read_until(b'\n', &mut self.buf)?;
            if n == 0 {
                let (name, _) = self.streams.pop_front().expect("stream present");
                debug!("retired exhausted input {name}");
                self.line_number = 0;
                continue;
            }
            self.line_number += 1;
            return Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()));
        }
    }

    /// Name of the stream lines are currently drawn from.
    pub fn current_name(&self) -> &str {
        self.streams
            .front()
            .map(|(name, _)| name.as_str())
            .unwrap_or("<end of input>")
    }

    /// 1-based number of the last line read from the current stream.
    pub fn current_line_number(&self) -> usize {
        self.line_number
    }

    /// Surrender the remainder of the current stream as a FASTA handoff
    /// and retire all inputs. `prefix` is prepended to the stream — the
    /// already-consumed `>` header line when the FASTA section started
    /// implicitly.
    ///
    /// Returns `None` when input is already exhausted and no prefix was
    /// given.
    pub fn take_current(&mut self, prefix: Option<Vec<u8>>) -> Option<FastaHandoff> {
        let current = self.streams.pop_front();
        self.streams.clear();

        match (prefix, current) {
            (Some(prefix), Some((name, reader))) => Some(FastaHandoff {
                source_name: name,
                reader: Box::new(Cursor::new(prefix).chain(reader)),
            }),
            (None, Some((name, reader))) => Some(FastaHandoff {
                source_name: name,
                reader,
            }),
            (Some(prefix), None) => Some(FastaHandoff {
                source_name: "<end of input>".to_string(),
                reader: Box::new(Cursor::new(prefix)),
            }),
            (None, None) => None,
        }
    }
}

impl std::fmt::Debug for LineSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineSource")
            .field("current", &self.current_name())
            .field("line", &self.line_number)
            .field("pending_streams", &self.streams.len())
            .finish()
    }
}

/// The remaining bytes of an input after a `##FASTA` directive or implicit
/// `>` header. Ownership of the underlying stream transfers to the caller;
/// the parser reads nothing further from it.
pub struct FastaHandoff {
    source_name: String,
    reader: Box<dyn BufRead + Send>,
}

impl FastaHandoff {
    /// Name of the input the FASTA section came from.
    pub fn source_name(&self) -> &str {
        &self.source_name
    }
}

impl Read for FastaHandoff {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reader.read(buf)
    }
}

impl BufRead for FastaHandoff {
    fn fill_buf(&mut self) -> std::io::Result<&[u8]> {
        self.reader.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.reader.consume(amt)
    }
}

impl std::fmt::Debug for FastaHandoff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastaHandoff")
            .field("source", &self.source_name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(data: &'static str) -> GffSource {
        GffSource::from_reader(data.as_bytes())
    }

    #[test]
    fn test_concatenates_streams_in_order() {
        let mut lines = LineSource::open(vec![source("a\nb\n"), source("c\n")]).unwrap();
        assert_eq!(lines.next_line().unwrap().as_deref(), Some("a\n"));
        assert_eq!(lines.next_line().unwrap().as_deref(), Some("b\n"));
        assert_eq!(lines.next_line().unwrap().as_deref(), Some("c\n"));
        assert_eq!(lines.next_line().unwrap(), None);
        assert_eq!(lines.next_line().unwrap(), None);
    }

    #[test]
    fn test_line_numbers_reset_per_stream() {
        let mut lines = LineSource::open(vec![source("a\nb\n"), source("c\n")]).unwrap();
        lines.next_line().unwrap();
        assert_eq!(lines.current_line_number(), 1);
        lines.next_line().unwrap();
        assert_eq!(lines.current_line_number(), 2);
        lines.next_line().unwrap();
        assert_eq!(lines.current_line_number(), 1);
    }

    #[test]
    fn test_final_line_without_newline() {
        let mut lines = LineSource::open(vec![source("a\nb")]).unwrap();
        assert_eq!(lines.next_line().unwrap().as_deref(), Some("a\n"));
        assert_eq!(lines.next_line().unwrap().as_deref(), Some("b"));
        assert_eq!(lines.next_line().unwrap(), None);
    }

    #[test]
    fn test_take_current_keeps_remaining_bytes() {
        let mut lines =
            LineSource::open(vec![source("line1\n>seq\nACGT\n"), source("never\n")]).unwrap();
        lines.next_line().unwrap();
        let header = lines.next_line().unwrap().unwrap();
        assert_eq!(header, ">seq\n");

        let mut handoff = lines
            .take_current(Some(header.into_bytes()))
            .expect("handoff");
        let mut rest = String::new();
        handoff.read_to_string(&mut rest).unwrap();
        // The consumed header is restored, and the later stream is dropped.
        assert_eq!(rest, ">seq\nACGT\n");
        assert_eq!(lines.next_line().unwrap(), None);
    }

    #[test]
    fn test_take_current_without_prefix() {
        let mut lines = LineSource::open(vec![source("##FASTA\n>a\nAC\n")]).unwrap();
        lines.next_line().unwrap();
        let mut handoff = lines.take_current(None).expect("handoff");
        let mut rest = String::new();
        handoff.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, ">a\nAC\n");
    }
}
