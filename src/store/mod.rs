//! Parse-window working state, pluggable between memory and disk.
//!
//! A [`TempStore`] holds everything the parser accumulates between flush
//! boundaries (start of stream, `###`, `##FASTA`, implicit FASTA, end of
//! input): the FIFO of emittable items, the index of under-construction
//! features by ID, the ordered list of top-level features, and the table
//! of orphan references waiting for their target ID to appear.
//!
//! Both implementations expose identical semantics; [`MemoryStore`] keeps
//! everything in ordinary maps, [`DiskStore`] spills serialized feature
//! subgraphs to an unlinked temp file while preserving shared-child
//! identity.

mod disk;
mod memory;

pub use disk::DiskStore;
pub use memory::MemoryStore;

use crate::error::Result;
use crate::types::{Feature, GffItem, ReferenceKind};

/// Working state of one parse window.
///
/// `flush` is the window boundary: it moves every top-level feature (in
/// first-seen order) to the output queue, clears the ID index and orphan
/// table, and fails if any orphan reference is still unresolved.
pub trait TempStore {
    /// Append an item to the output queue.
    fn out_push(&mut self, item: GffItem);

    /// Pop the oldest queued item.
    fn out_pop(&mut self) -> Option<GffItem>;

    /// Number of queued items.
    fn out_len(&self) -> usize;

    /// Look up an under-construction feature by one of its IDs.
    fn uc_get(&mut self, id: &str) -> Result<Option<Feature>>;

    /// Insert or overwrite an ID binding. When `top_level` is true the ID
    /// is also recorded in the ordered top-level list used for flush
    /// ordering.
    fn uc_put(&mut self, id: &str, feature: &Feature, top_level: bool) -> Result<()>;

    /// Re-persist a binding after the feature was mutated, without
    /// touching top-level order.
    fn uc_update(&mut self, id: &str, feature: &Feature) -> Result<()>;

    /// Remove and return the references waiting for `id` to appear.
    fn orphans_take(&mut self, id: &str) -> Vec<(ReferenceKind, Feature)>;

    /// Park a reference whose target has not been seen yet.
    fn orphans_add(&mut self, id: &str, kind: ReferenceKind, feature: Feature);

    /// Emit all top-level features in first-seen order and clear the
    /// window. Errors with the unresolved reference set if any orphan
    /// bucket is non-empty.
    fn flush(&mut self) -> Result<()>;
}

/// Render the orphan table into sorted `target (attribute)` descriptors
/// for the unresolved-reference error.
pub(crate) fn orphan_descriptors(
    orphans: &std::collections::HashMap<String, Vec<(ReferenceKind, Feature)>>,
) -> Vec<String> {
    let mut targets: Vec<String> = orphans
        .iter()
        .flat_map(|(id, waiting)| {
            waiting
                .iter()
                .map(move |(kind, _)| format!("{id} ({})", kind.attribute()))
        })
        .collect();
    targets.sort();
    targets.dedup();
    targets
}
