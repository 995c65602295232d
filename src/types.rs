//! Common types used throughout gffstream
//!
//! The central type is [`Feature`]: a shared handle to a logical GFF3
//! feature, formed by one or more [`GffLine`]s that carry the same `ID`
//! attribute value. Child and derived-feature lists live on the feature,
//! not on individual lines, so every line of a multi-location feature
//! observes the same lists (mutation through one line is visible through
//! any other).
//!
//! Feature-to-feature edges only ever point downward (parent to child), so
//! the handle graph is acyclic for well-formed input.

use crate::error::{GffError, Result};
use crate::io::FastaHandoff;
use serde::{Deserialize, Serialize};
use std::cell::{Ref, RefCell, RefMut};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::{Rc, Weak};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Attribute column contents: attribute name to ordered, non-empty list of
/// values. Duplicate names in the input accumulate into one list in
/// encounter order.
pub type AttributeMap = HashMap<String, Vec<String>>;

/// DNA strand orientation of a feature line.
///
/// GFF3 allows `+`, `-` and `?` (strand relevant but unknown); an absent
/// strand (`.`) is represented as `None` at the field level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strand {
    /// `+` strand
    Forward,
    /// `-` strand
    Reverse,
    /// `?`: strand is relevant but not known
    Unknown,
}

impl Strand {
    /// The single-character GFF3 column value for this strand.
    pub fn symbol(&self) -> &'static str {
        match self {
            Strand::Forward => "+",
            Strand::Reverse => "-",
            Strand::Unknown => "?",
        }
    }
}

impl FromStr for Strand {
    type Err = GffError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "+" => Ok(Strand::Forward),
            "-" => Ok(Strand::Reverse),
            "?" => Ok(Strand::Unknown),
            other => Err(GffError::line_parse(format!(
                "invalid strand '{other}' (expected '+', '-', '?' or '.')"
            ))),
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// One physical GFF3 row.
///
/// Fields that held `.` in the source text are `None`. The attribute column
/// is fully tokenized and percent-unescaped; see [`crate::codec`] for the
/// exact rules.
///
/// # Examples
///
/// ```
/// use gffstream::GffLine;
///
/// let line = GffLine::from_line("chr1\t.\tgene\t1\t100\t.\t+\t.\tID=g1")?;
/// assert_eq!(line.seq_id.as_deref(), Some("chr1"));
/// assert_eq!(line.source, None);
/// assert_eq!(line.ids(), ["g1".to_string()]);
/// # Ok::<(), gffstream::GffError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GffLine {
    /// Landmark sequence identifier (column 1)
    pub seq_id: Option<String>,
    /// Annotation source (column 2)
    pub source: Option<String>,
    /// Feature type (column 3)
    pub feature_type: Option<String>,
    /// Start position, 1-based inclusive (column 4)
    pub start: Option<u64>,
    /// End position, 1-based inclusive (column 5)
    pub end: Option<u64>,
    /// Score (column 6)
    pub score: Option<f64>,
    /// Strand (column 7)
    pub strand: Option<Strand>,
    /// CDS phase: 0, 1 or 2 (column 8)
    pub phase: Option<u8>,
    /// Tokenized attribute column (column 9)
    pub attributes: AttributeMap,
}

impl GffLine {
    /// Parse one tab-separated feature row.
    ///
    /// Delegates to [`crate::codec::parse_feature_line`].
    pub fn from_line(line: &str) -> Result<Self> {
        crate::codec::parse_feature_line(line)
    }

    /// Serialize this row back to one LF-terminated GFF3 line.
    ///
    /// Delegates to [`crate::codec::format_feature_line`].
    pub fn to_line(&self) -> String {
        crate::codec::format_feature_line(self)
    }

    /// Values of the named attribute, or an empty slice when absent.
    pub fn attr(&self, name: &str) -> &[String] {
        self.attributes.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `ID` attribute values.
    pub fn ids(&self) -> &[String] {
        self.attr("ID")
    }

    /// `Parent` attribute values.
    pub fn parents(&self) -> &[String] {
        self.attr("Parent")
    }

    /// `Derives_from` attribute values.
    pub fn derives_from(&self) -> &[String] {
        self.attr("Derives_from")
    }
}

/// Which reference attribute produced a feature-to-feature edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceKind {
    /// A `Parent=` reference; resolves into the target's child list
    Parent,
    /// A `Derives_from=` reference; resolves into the target's derived list
    DerivesFrom,
}

impl ReferenceKind {
    /// The GFF3 attribute name this kind corresponds to.
    pub fn attribute(&self) -> &'static str {
        match self {
            ReferenceKind::Parent => "Parent",
            ReferenceKind::DerivesFrom => "Derives_from",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.attribute())
    }
}

static NEXT_UID: AtomicU64 = AtomicU64::new(1);

/// Backing record of a [`Feature`]. Lines and the shared child/derived
/// lists live here; handles are reference-counted.
#[derive(Debug)]
pub(crate) struct FeatureNode {
    pub(crate) uid: u64,
    pub(crate) lines: Vec<GffLine>,
    pub(crate) children: Vec<Feature>,
    pub(crate) derived: Vec<Feature>,
    /// `(target id, attribute)` pairs this feature has already resolved or
    /// parked as an orphan; guards against duplicate attachment when a
    /// feature has multiple IDs or multiple lines.
    pub(crate) resolved: HashSet<(String, ReferenceKind)>,
}

pub(crate) type WeakFeature = Weak<RefCell<FeatureNode>>;

/// A logical GFF3 feature: a shared handle over one or more lines plus the
/// child and derived-feature lists they all observe.
///
/// Cloning a `Feature` clones the handle, not the contents; a child
/// referenced from several parents is the same object everywhere.
/// Equality between handles is identity ([`Feature::same`]).
#[derive(Clone)]
pub struct Feature {
    inner: Rc<RefCell<FeatureNode>>,
}

impl Feature {
    /// Create a feature holding a single line.
    pub fn from_line(line: GffLine) -> Self {
        Self::from_node(FeatureNode {
            uid: NEXT_UID.fetch_add(1, Ordering::Relaxed),
            lines: vec![line],
            children: Vec::new(),
            derived: Vec::new(),
            resolved: HashSet::new(),
        })
    }

    pub(crate) fn from_node(node: FeatureNode) -> Self {
        Feature {
            inner: Rc::new(RefCell::new(node)),
        }
    }

    pub(crate) fn from_rc(inner: Rc<RefCell<FeatureNode>>) -> Self {
        Feature { inner }
    }

    /// Stable identity of this feature for the lifetime of the process.
    pub fn uid(&self) -> u64 {
        self.inner.borrow().uid
    }

    /// Whether two handles point at the same feature object.
    pub fn same(&self, other: &Feature) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// The physical lines of this feature, in file order.
    pub fn lines(&self) -> Ref<'_, [GffLine]> {
        Ref::map(self.inner.borrow(), |n| n.lines.as_slice())
    }

    /// Child features attached via `Parent` references, in resolution order.
    ///
    /// The returned list is shared by every line of this feature.
    pub fn children(&self) -> Ref<'_, [Feature]> {
        Ref::map(self.inner.borrow(), |n| n.children.as_slice())
    }

    /// Derived features attached via `Derives_from` references.
    pub fn derived(&self) -> Ref<'_, [Feature]> {
        Ref::map(self.inner.borrow(), |n| n.derived.as_slice())
    }

    /// All distinct `ID` values across this feature's lines, in first-seen
    /// order.
    pub fn ids(&self) -> Vec<String> {
        let node = self.inner.borrow();
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for line in &node.lines {
            for id in line.ids() {
                if seen.insert(id.clone()) {
                    out.push(id.clone());
                }
            }
        }
        out
    }

    /// Feature type of the first line, when present.
    pub fn feature_type(&self) -> Option<String> {
        self.inner.borrow().lines.first()?.feature_type.clone()
    }

    pub(crate) fn push_line(&self, line: GffLine) {
        self.inner.borrow_mut().lines.push(line);
    }

    /// Attach `referrer` to this feature's child or derived list.
    pub(crate) fn attach(&self, kind: ReferenceKind, referrer: &Feature) {
        let mut node = self.inner.borrow_mut();
        match kind {
            ReferenceKind::Parent => node.children.push(referrer.clone()),
            ReferenceKind::DerivesFrom => node.derived.push(referrer.clone()),
        }
    }

    /// Record `(target, kind)` in the completion set. Returns `false` when
    /// the pair was already present, i.e. the reference has already been
    /// attached or parked through another line or ID of this feature.
    pub(crate) fn mark_resolved(&self, target: &str, kind: ReferenceKind) -> bool {
        self.inner
            .borrow_mut()
            .resolved
            .insert((target.to_string(), kind))
    }

    pub(crate) fn node(&self) -> Ref<'_, FeatureNode> {
        self.inner.borrow()
    }

    pub(crate) fn node_mut(&self) -> RefMut<'_, FeatureNode> {
        self.inner.borrow_mut()
    }

    pub(crate) fn downgrade(&self) -> WeakFeature {
        Rc::downgrade(&self.inner)
    }
}

impl PartialEq for Feature {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl Eq for Feature {}

impl fmt::Debug for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.inner.borrow();
        f.debug_struct("Feature")
            .field("uid", &node.uid)
            .field("ids", &self.ids())
            .field("lines", &node.lines.len())
            .field(
                "children",
                &node.children.iter().map(Feature::uid).collect::<Vec<_>>(),
            )
            .field(
                "derived",
                &node.derived.iter().map(Feature::uid).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// A structured `##` metadata line.
///
/// Unknown directives are preserved verbatim rather than rejected. The
/// `##FASTA` marker never surfaces as a `Directive`; the parser turns it
/// into [`GffItem::Fasta`], which carries the remaining input.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// `##gff-version <version>`
    GffVersion {
        /// Declared version string, e.g. `3`
        version: String,
    },
    /// `##sequence-region <seqid> <start> <end>`
    SequenceRegion {
        /// Landmark sequence identifier
        seq_id: String,
        /// Region start (non-digit characters stripped before parsing)
        start: u64,
        /// Region end (non-digit characters stripped before parsing)
        end: u64,
    },
    /// `##genome-build <source> <buildname>`
    GenomeBuild {
        /// Source of the build
        source: String,
        /// Build name
        buildname: String,
    },
    /// Any other `##name value` line, preserved verbatim
    Other {
        /// Directive name (case-sensitive, as written)
        name: String,
        /// Raw payload with trailing whitespace stripped
        value: String,
    },
}

impl Directive {
    /// The directive name as it appeared after `##`.
    pub fn name(&self) -> &str {
        match self {
            Directive::GffVersion { .. } => "gff-version",
            Directive::SequenceRegion { .. } => "sequence-region",
            Directive::GenomeBuild { .. } => "genome-build",
            Directive::Other { name, .. } => name,
        }
    }
}

/// One item yielded by the parser.
#[derive(Debug)]
pub enum GffItem {
    /// A completed feature group
    Feature(Feature),
    /// A `##` metadata line
    Directive(Directive),
    /// A `#` comment line, leading hash marks and trailing whitespace
    /// stripped
    Comment(String),
    /// FASTA handoff: ownership of the remaining input bytes. Emitted for
    /// `##FASTA` and for an implicit `>` header (which is included in the
    /// stream). No further items follow.
    Fasta(FastaHandoff),
}

impl GffItem {
    /// The feature, if this item is one.
    pub fn as_feature(&self) -> Option<&Feature> {
        match self {
            GffItem::Feature(f) => Some(f),
            _ => None,
        }
    }

    /// The directive, if this item is one.
    pub fn as_directive(&self) -> Option<&Directive> {
        match self {
            GffItem::Directive(d) => Some(d),
            _ => None,
        }
    }

    /// The comment text, if this item is one.
    pub fn as_comment(&self) -> Option<&str> {
        match self {
            GffItem::Comment(c) => Some(c),
            _ => None,
        }
    }

    /// Consume the item, returning the FASTA handoff if this item is one.
    pub fn into_fasta(self) -> Option<FastaHandoff> {
        match self {
            GffItem::Fasta(h) => Some(h),
            _ => None,
        }
    }
}
