//! Streaming GFF3 parser with hierarchy reconstruction.
//!
//! # Architecture
//!
//! [`GffStream`] pulls lines from a [`LineSource`], dispatches each one
//! (blank, FASTA begin, `#` family, or feature row), and maintains a
//! [`TempStore`] of under-construction features. `Parent` and
//! `Derives_from` references may point forward: a reference whose target
//! has not been seen yet is parked in the orphan table and attached when
//! the target's `ID` appears. Completed top-level subtrees are flushed —
//! in first-seen order — at every `###` sync mark, at `##FASTA`, at an
//! implicit `>` header, and at end of input, which keeps resident memory
//! proportional to the current sync window rather than the whole file.
//!
//! # Example
//!
//! ```
//! use gffstream::{GffItem, GffStream};
//!
//! let data = "\
//! ###gff-version 3
//! chr1\t.\tgene\t1\t100\t.\t+\t.\tID=g1
//! chr1\t.\tmRNA\t1\t100\t.\t+\t.\tID=m1;Parent=g1
//! ";
//! let mut parser = GffStream::from_reader(data.as_bytes());
//!
//! let directive = parser.next_item()?.unwrap();
//! assert!(matches!(directive, GffItem::Directive(_)));
//!
//! let gene = parser.next_item()?.unwrap();
//! let gene = gene.as_feature().unwrap();
//! assert_eq!(gene.ids(), vec!["g1".to_string()]);
//! assert_eq!(gene.children().len(), 1);
//! # Ok::<(), gffstream::GffError>(())
//! ```

use crate::codec::{self, ParsedDirective};
use crate::error::Result;
use crate::io::{GffSource, LineSource};
use crate::store::{MemoryStore, TempStore};
use crate::types::{Feature, GffItem, GffLine, ReferenceKind};
use log::{debug, trace};
use std::io::BufRead;
use std::path::Path;

/// Streaming GFF3 parser over one or more inputs.
///
/// Items come out in the order they become resolvable: comments,
/// directives and hierarchy-free feature lines immediately, grouped
/// features at the next flush boundary. Iteration stops after the inputs
/// are exhausted and the output queue has drained; a FASTA handoff ends
/// the parse early, surrendering the remaining bytes to the caller.
pub struct GffStream {
    lines: LineSource,
    store: Box<dyn TempStore>,
    input_done: bool,
    closed: bool,
}

impl GffStream {
    /// Open a parser over the given sources with the default in-memory
    /// store.
    pub fn open(sources: Vec<GffSource>) -> Result<Self> {
        Self::with_store(sources, Box::new(MemoryStore::new()))
    }

    /// Open a parser with an explicit [`TempStore`] implementation, e.g.
    /// [`crate::DiskStore`] for very large sync windows.
    pub fn with_store(sources: Vec<GffSource>, store: Box<dyn TempStore>) -> Result<Self> {
        Ok(GffStream {
            lines: LineSource::open(sources)?,
            store,
            input_done: false,
            closed: false,
        })
    }

    /// Parse a single file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open(vec![GffSource::from_path(path)])
    }

    /// Parse the concatenation of several files.
    pub fn from_paths<P, I>(paths: I) -> Result<Self>
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = P>,
    {
        Self::open(paths.into_iter().map(GffSource::from_path).collect())
    }

    /// Parse from an in-memory or caller-opened stream. The stream is
    /// taken as-is; gzip detection applies to path sources only.
    pub fn from_reader<R: BufRead + Send + 'static>(reader: R) -> Self {
        GffStream {
            lines: LineSource::from_streams(vec![("<stream>".to_string(), Box::new(reader))]),
            store: Box::new(MemoryStore::new()),
            input_done: false,
            closed: false,
        }
    }

    /// The next parsed item, or `None` when inputs are exhausted and the
    /// output queue has drained.
    ///
    /// After a fatal error the parser is closed and returns `None`.
    pub fn next_item(&mut self) -> Result<Option<GffItem>> {
        if self.closed {
            return Ok(None);
        }
        loop {
            if let Some(item) = self.store.out_pop() {
                return Ok(Some(item));
            }
            if self.input_done {
                return Ok(None);
            }
            if let Err(e) = self.pump_lines() {
                self.closed = true;
                return Err(e);
            }
        }
    }

    /// Consume input lines until at least one item is queued or input is
    /// exhausted. This is the whole of the parser's look-ahead: callers
    /// that stop pulling stop the parse.
    fn pump_lines(&mut self) -> Result<()> {
        while self.store.out_len() == 0 && !self.input_done {
            match self.lines.next_line()? {
                Some(raw) => self.dispatch(raw)?,
                None => {
                    self.input_done = true;
                    debug!("end of input, final flush");
                    self.flush()?;
                }
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.store
            .flush()
            .map_err(|e| e.at(self.lines.current_name(), self.lines.current_line_number()))
    }

    fn dispatch(&mut self, raw: String) -> Result<()> {
        let line = raw.trim_end_matches(['\n', '\r']);
        let trimmed = line.trim_start();

        if trimmed.is_empty() {
            return Ok(());
        }

        if trimmed.starts_with('>') {
            // Implicit FASTA begin: the header line belongs to the
            // surrendered stream.
            self.flush()?;
            debug!("implicit FASTA start at {}", self.lines.current_name());
            let handoff = self.lines.take_current(Some(raw.into_bytes()));
            self.input_done = true;
            if let Some(handoff) = handoff {
                self.store.out_push(GffItem::Fasta(handoff));
            }
            return Ok(());
        }

        if trimmed.starts_with('#') {
            let hashes = trimmed.bytes().take_while(|&b| b == b'#').count();
            if hashes == 3 && trimmed[3..].trim().is_empty() {
                trace!("sync mark at {}:{}", self.lines.current_name(), self.lines.current_line_number());
                return self.flush();
            }
            if hashes == 2 {
                match codec::parse_directive(trimmed) {
                    Some(ParsedDirective::Fasta) => {
                        self.flush()?;
                        debug!("##FASTA handoff at {}", self.lines.current_name());
                        let handoff = self.lines.take_current(None);
                        self.input_done = true;
                        if let Some(handoff) = handoff {
                            self.store.out_push(GffItem::Fasta(handoff));
                        }
                        return Ok(());
                    }
                    Some(ParsedDirective::Directive(directive)) => {
                        self.store.out_push(GffItem::Directive(directive));
                        return Ok(());
                    }
                    None => {}
                }
            }
            let text = trimmed.trim_start_matches('#').trim_end();
            self.store.out_push(GffItem::Comment(text.to_string()));
            return Ok(());
        }

        let parsed = codec::parse_feature_line(line)
            .map_err(|e| e.at(self.lines.current_name(), self.lines.current_line_number()))?;
        self.handle_feature_line(parsed)
    }

    /// The hierarchy step: resolve which feature a parsed line belongs
    /// to, pick up orphans waiting for its IDs, and resolve or park its
    /// outgoing `Parent`/`Derives_from` references.
    fn handle_feature_line(&mut self, line: GffLine) -> Result<()> {
        let ids = line.ids().to_vec();
        let parents = line.parents().to_vec();
        let derives = line.derives_from().to_vec();

        if ids.is_empty() && parents.is_empty() && derives.is_empty() {
            // No hierarchy role: streams straight through.
            self.store.out_push(GffItem::Feature(Feature::from_line(line)));
            return Ok(());
        }

        let top_level = parents.is_empty() && derives.is_empty();

        // Find the feature this line belongs to: the first of its IDs that
        // is already under construction wins; remaining IDs are re-bound
        // to it below.
        let mut feature: Option<Feature> = None;
        for id in &ids {
            if let Some(existing) = self.store.uc_get(id)? {
                match &feature {
                    None => {
                        trace!("line joins feature under construction for ID {id}");
                        existing.push_line(line.clone());
                        feature = Some(existing);
                    }
                    Some(chosen) if chosen.same(&existing) => {}
                    Some(_) => {
                        trace!("ID {id} re-bound by colliding line");
                    }
                }
            }
        }
        let feature = feature.unwrap_or_else(|| Feature::from_line(line));

        for id in &ids {
            self.store.uc_put(id, &feature, top_level)?;
        }

        // Orphans waiting for any of this line's IDs attach now.
        for id in &ids {
            for (kind, waiting) in self.store.orphans_take(id) {
                if waiting.same(&feature) {
                    // A feature never becomes its own child.
                    continue;
                }
                trace!("orphan {} reference to {id} resolved", kind.attribute());
                feature.attach(kind, &waiting);
            }
        }

        // Outgoing references: attach to live targets, park the rest.
        for (kind, targets) in [
            (ReferenceKind::Parent, &parents),
            (ReferenceKind::DerivesFrom, &derives),
        ] {
            for target in targets {
                if !feature.mark_resolved(target, kind) {
                    // Already attached or parked through another line or
                    // ID of this feature.
                    continue;
                }
                match self.store.uc_get(target)? {
                    Some(t) if t.same(&feature) => {
                        trace!("dropped self-reference {} to {target}", kind.attribute());
                    }
                    Some(t) => {
                        t.attach(kind, &feature);
                        self.store.uc_update(target, &t)?;
                    }
                    None => {
                        trace!("parking orphan {} reference to {target}", kind.attribute());
                        self.store.orphans_add(target, kind, feature.clone());
                    }
                }
            }
        }

        for id in &ids {
            self.store.uc_update(id, &feature)?;
        }
        Ok(())
    }
}

impl Iterator for GffStream {
    type Item = Result<GffItem>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_item().transpose()
    }
}

impl std::fmt::Debug for GffStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GffStream")
            .field("lines", &self.lines)
            .field("queued", &self.store.out_len())
            .field("input_done", &self.input_done)
            .field("closed", &self.closed)
            .finish()
    }
}
