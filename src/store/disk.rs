//! Disk-backed [`TempStore`] implementation.
//!
//! Under-construction features are spilled to an anonymous temp file
//! (unlinked at creation, so the OS reclaims it even on abnormal
//! termination). Every persist writes the whole downward subgraph of the
//! feature — itself, its children, its derived features — as one snapshot
//! of flat node records keyed by per-feature uids, and repoints each
//! contained uid at that snapshot. A uid's latest snapshot is
//! authoritative: hydration follows child uids through the pointer table
//! rather than trusting embedded copies, so a node refreshed after its
//! parent was last spilled still comes back current.
//!
//! Shared-child identity survives round trips through a registry of weak
//! handles: hydrating a uid that is still alive anywhere returns the
//! existing feature instead of duplicating it, and a live feature always
//! wins over its serialized copy (mutations are re-persisted before the
//! last handle can drop).

use crate::error::{GffError, Result};
use crate::store::{orphan_descriptors, TempStore};
use crate::types::{Feature, FeatureNode, GffItem, GffLine, ReferenceKind, WeakFeature};
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

#[derive(Debug, Clone, Copy)]
struct BlobRef {
    offset: u64,
    len: usize,
    /// Index of the uid's record inside the snapshot.
    slot: usize,
}

#[derive(Serialize, Deserialize)]
struct NodeRecord {
    uid: u64,
    lines: Vec<GffLine>,
    children: Vec<u64>,
    derived: Vec<u64>,
    resolved: Vec<(String, ReferenceKind)>,
}

/// [`TempStore`] that spills under-construction features to a temp file.
///
/// Semantically identical to [`crate::store::MemoryStore`]; only the
/// residency of the ID index differs.
pub struct DiskStore {
    out: VecDeque<GffItem>,
    file: File,
    write_pos: u64,
    /// id -> uid currently bound to it.
    bound: HashMap<String, u64>,
    /// uid -> location of its latest snapshot.
    blobs: HashMap<u64, BlobRef>,
    /// uid -> live handle, so hydration never duplicates a feature that
    /// is still referenced somewhere.
    live: HashMap<u64, WeakFeature>,
    top_level: Vec<String>,
    top_seen: HashSet<String>,
    orphans: HashMap<String, Vec<(ReferenceKind, Feature)>>,
}

impl DiskStore {
    /// Create a store backed by a fresh anonymous temp file in the
    /// platform temp directory.
    pub fn new() -> Result<Self> {
        Ok(DiskStore {
            out: VecDeque::new(),
            file: tempfile::tempfile()?,
            write_pos: 0,
            bound: HashMap::new(),
            blobs: HashMap::new(),
            live: HashMap::new(),
            top_level: Vec::new(),
            top_seen: HashSet::new(),
            orphans: HashMap::new(),
        })
    }

    /// Serialize the downward subgraph of `feature` as one snapshot and
    /// repoint every contained uid at it.
    fn persist(&mut self, feature: &Feature) -> Result<()> {
        let subtree = collect_subtree(feature);
        let records: Vec<NodeRecord> = subtree
            .iter()
            .map(|f| {
                let node = f.node();
                NodeRecord {
                    uid: node.uid,
                    lines: node.lines.clone(),
                    children: node.children.iter().map(Feature::uid).collect(),
                    derived: node.derived.iter().map(Feature::uid).collect(),
                    resolved: node.resolved.iter().cloned().collect(),
                }
            })
            .collect();

        let bytes =
            serde_json::to_vec(&records).map_err(|e| GffError::Store(e.to_string()))?;
        self.file.seek(SeekFrom::Start(self.write_pos))?;
        self.file.write_all(&bytes)?;
        let offset = self.write_pos;
        let len = bytes.len();
        self.write_pos += len as u64;
        trace!("spilled {} node(s), {len} byte(s) at offset {offset}", records.len());

        for (slot, f) in subtree.iter().enumerate() {
            let uid = f.uid();
            self.live.insert(uid, f.downgrade());
            self.blobs.insert(uid, BlobRef { offset, len, slot });
        }
        Ok(())
    }

    fn read_record(&mut self, blob: BlobRef) -> Result<NodeRecord> {
        self.file.seek(SeekFrom::Start(blob.offset))?;
        let mut bytes = vec![0u8; blob.len];
        self.file.read_exact(&mut bytes)?;
        let mut records: Vec<NodeRecord> =
            serde_json::from_slice(&bytes).map_err(|e| GffError::Store(e.to_string()))?;
        if blob.slot >= records.len() {
            return Err(GffError::Store(format!(
                "snapshot slot {} out of range ({} records)",
                blob.slot,
                records.len()
            )));
        }
        Ok(records.swap_remove(blob.slot))
    }

    /// Bring the feature for `uid` back to life, reusing live handles and
    /// following child uids through the latest-snapshot table.
    fn hydrate(&mut self, uid: u64) -> Result<Feature> {
        if let Some(rc) = self.live.get(&uid).and_then(WeakFeature::upgrade) {
            return Ok(Feature::from_rc(rc));
        }
        let blob = self
            .blobs
            .get(&uid)
            .copied()
            .ok_or_else(|| GffError::Store(format!("no snapshot for feature uid {uid}")))?;
        let record = self.read_record(blob)?;

        let feature = Feature::from_node(FeatureNode {
            uid: record.uid,
            lines: record.lines,
            children: Vec::new(),
            derived: Vec::new(),
            resolved: record.resolved.into_iter().collect(),
        });
        // Register before descending so diamond shapes hydrate each node
        // once.
        self.live.insert(uid, feature.downgrade());
        debug!("hydrated feature uid {uid} from spill file");

        for child_uid in record.children {
            let child = self.hydrate(child_uid)?;
            feature.node_mut().children.push(child);
        }
        for derived_uid in record.derived {
            let derived = self.hydrate(derived_uid)?;
            feature.node_mut().derived.push(derived);
        }
        Ok(feature)
    }
}

/// Downward closure over child and derived edges, deduplicated, root
/// first.
fn collect_subtree(root: &Feature) -> Vec<Feature> {
    let mut seen = HashSet::new();
    let mut order = Vec::new();
    let mut stack = vec![root.clone()];
    while let Some(f) = stack.pop() {
        if !seen.insert(f.uid()) {
            continue;
        }
        {
            let node = f.node();
            for child in &node.children {
                stack.push(child.clone());
            }
            for derived in &node.derived {
                stack.push(derived.clone());
            }
        }
        order.push(f);
    }
    order
}

impl TempStore for DiskStore {
    fn out_push(&mut self, item: GffItem) {
        self.out.push_back(item);
    }

    fn out_pop(&mut self) -> Option<GffItem> {
        self.out.pop_front()
    }

    fn out_len(&self) -> usize {
        self.out.len()
    }

    fn uc_get(&mut self, id: &str) -> Result<Option<Feature>> {
        match self.bound.get(id).copied() {
            Some(uid) => Ok(Some(self.hydrate(uid)?)),
            None => Ok(None),
        }
    }

    fn uc_put(&mut self, id: &str, feature: &Feature, top_level: bool) -> Result<()> {
        self.bound.insert(id.to_string(), feature.uid());
        if top_level {
            if self.top_seen.insert(id.to_string()) {
                self.top_level.push(id.to_string());
            }
        } else if self.top_seen.remove(id) {
            // A later line brought a Parent/Derives_from reference: the
            // feature is no longer top-level and must not be emitted on
            // its own at flush.
            self.top_level.retain(|t| t != id);
        }
        self.persist(feature)
    }

    fn uc_update(&mut self, id: &str, feature: &Feature) -> Result<()> {
        self.bound.insert(id.to_string(), feature.uid());
        self.persist(feature)
    }

    fn orphans_take(&mut self, id: &str) -> Vec<(ReferenceKind, Feature)> {
        self.orphans.remove(id).unwrap_or_default()
    }

    fn orphans_add(&mut self, id: &str, kind: ReferenceKind, feature: Feature) {
        self.orphans
            .entry(id.to_string())
            .or_default()
            .push((kind, feature));
    }

    fn flush(&mut self) -> Result<()> {
        if !self.orphans.is_empty() {
            let targets = orphan_descriptors(&self.orphans);
            self.orphans.clear();
            return Err(GffError::UnresolvedReferences {
                file: String::new(),
                line: 0,
                targets,
            });
        }

        let ids = std::mem::take(&mut self.top_level);
        self.top_seen.clear();
        debug!("flushing {} top-level feature(s) from spill store", ids.len());

        let mut emitted = HashSet::new();
        for id in ids {
            if let Some(feature) = self.uc_get(&id)? {
                if emitted.insert(feature.uid()) {
                    self.out.push_back(GffItem::Feature(feature));
                }
            }
        }

        self.bound.clear();
        self.blobs.clear();
        self.live.clear();
        self.file.set_len(0)?;
        self.write_pos = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GffLine;

    fn feature(attrs: &str) -> Feature {
        let line = GffLine::from_line(&format!("chr\t.\tgene\t1\t10\t.\t+\t.\t{attrs}")).unwrap();
        Feature::from_line(line)
    }

    #[test]
    fn test_get_returns_live_handle() {
        let mut store = DiskStore::new().unwrap();
        let f = feature("ID=g1");
        store.uc_put("g1", &f, true).unwrap();
        let got = store.uc_get("g1").unwrap().unwrap();
        assert!(got.same(&f));
    }

    #[test]
    fn test_hydration_after_handles_dropped() {
        let mut store = DiskStore::new().unwrap();
        {
            let parent = feature("ID=p");
            let child = feature("ID=c;Parent=p");
            parent.attach(ReferenceKind::Parent, &child);
            store.uc_put("p", &parent, true).unwrap();
            store.uc_put("c", &child, false).unwrap();
        }
        // All strong handles are gone; the store must rebuild from disk.
        let parent = store.uc_get("p").unwrap().unwrap();
        assert_eq!(parent.ids(), vec!["p".to_string()]);
        assert_eq!(parent.children().len(), 1);

        // Identity is preserved: the child inside the parent is the same
        // object a direct lookup returns.
        let child = store.uc_get("c").unwrap().unwrap();
        assert!(parent.children()[0].same(&child));
    }

    #[test]
    fn test_latest_snapshot_wins_over_embedded_copy() {
        let mut store = DiskStore::new().unwrap();
        {
            let parent = feature("ID=p");
            let child = feature("ID=c;Parent=p");
            parent.attach(ReferenceKind::Parent, &child);
            store.uc_put("p", &parent, true).unwrap();
            store.uc_put("c", &child, false).unwrap();
            // The child grows a second location after the parent was last
            // spilled.
            child.push_line(
                GffLine::from_line("chr\t.\tgene\t20\t30\t.\t+\t.\tID=c;Parent=p").unwrap(),
            );
            store.uc_update("c", &child).unwrap();
        }
        let parent = store.uc_get("p").unwrap().unwrap();
        assert_eq!(parent.children()[0].lines().len(), 2);
    }

    #[test]
    fn test_shared_child_identity_across_round_trip() {
        let mut store = DiskStore::new().unwrap();
        {
            let p1 = feature("ID=p1");
            let p2 = feature("ID=p2");
            let shared = feature("ID=c;Parent=p1,p2");
            p1.attach(ReferenceKind::Parent, &shared);
            p2.attach(ReferenceKind::Parent, &shared);
            store.uc_put("p1", &p1, true).unwrap();
            store.uc_put("p2", &p2, true).unwrap();
            store.uc_put("c", &shared, false).unwrap();
        }
        let p1 = store.uc_get("p1").unwrap().unwrap();
        let p2 = store.uc_get("p2").unwrap().unwrap();
        assert!(p1.children()[0].same(&p2.children()[0]));
    }

    #[test]
    fn test_uc_put_demotes_previously_top_level_id() {
        let mut store = DiskStore::new().unwrap();
        let f = feature("ID=m1");
        store.uc_put("m1", &f, true).unwrap();
        // A later line of the same feature carried a parent reference.
        store.uc_put("m1", &f, false).unwrap();
        store.flush().unwrap();
        assert_eq!(store.out_len(), 0);
    }

    #[test]
    fn test_flush_emits_and_clears() {
        let mut store = DiskStore::new().unwrap();
        let f = feature("ID=g1");
        store.uc_put("g1", &f, true).unwrap();
        store.flush().unwrap();
        assert_eq!(store.out_len(), 1);
        assert!(store.uc_get("g1").unwrap().is_none());
        // Spill file was truncated.
        assert_eq!(store.write_pos, 0);
    }

    #[test]
    fn test_flush_fails_on_residual_orphans() {
        let mut store = DiskStore::new().unwrap();
        store.orphans_add("ghost", ReferenceKind::DerivesFrom, feature("Derives_from=ghost"));
        let err = store.flush().unwrap_err();
        assert!(err.to_string().contains("ghost (Derives_from)"));
    }

    #[test]
    fn test_rebinding_moves_id_between_features() {
        let mut store = DiskStore::new().unwrap();
        let first = feature("ID=x");
        let second = feature("ID=x");
        store.uc_put("x", &first, true).unwrap();
        store.uc_put("x", &second, true).unwrap();
        let got = store.uc_get("x").unwrap().unwrap();
        assert!(got.same(&second));

        // Re-persisting the displaced feature must not steal the binding
        // back.
        store.uc_update("other", &first).unwrap();
        let got = store.uc_get("x").unwrap().unwrap();
        assert!(got.same(&second));
    }
}
