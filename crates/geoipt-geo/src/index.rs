use geoipt_core::models::BoundingBox;
use rstar::{RTree, RTreeObject, AABB};

use crate::models::BoundingBoxExt;

/// Declared box of one catalog entry, keyed by its position in the input
#[derive(Debug, Clone, PartialEq)]
struct IndexedBox {
    slot: usize,
    bbox: BoundingBox,
    envelope: AABB<[f64; 2]>,
}

impl IndexedBox {
    fn new(slot: usize, bbox: BoundingBox) -> Self {
        let rect = bbox.to_rect();
        let envelope = AABB::from_corners(
            [rect.min().x, rect.min().y],
            [rect.max().x, rect.max().y],
        );
        Self { slot, bbox, envelope }
    }
}

impl RTreeObject for IndexedBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// R-tree over the optional declared boxes of a sequence of entries.
///
/// Entries without a box are never filtered out: every query returns them.
/// Query results are slot positions in input order, so callers keep their
/// own ordering contract.
pub struct BBoxIndex {
    tree: RTree<IndexedBox>,
    unbounded: Vec<usize>,
    len: usize,
}

impl BBoxIndex {
    /// Build an index from one optional box per entry
    pub fn from_boxes<I>(boxes: I) -> Self
    where
        I: IntoIterator<Item = Option<BoundingBox>>,
    {
        let mut indexed = Vec::new();
        let mut unbounded = Vec::new();
        let mut len = 0;

        for (slot, bbox) in boxes.into_iter().enumerate() {
            len += 1;
            match bbox {
                Some(bbox) => indexed.push(IndexedBox::new(slot, bbox)),
                None => unbounded.push(slot),
            }
        }

        Self { tree: RTree::bulk_load(indexed), unbounded, len }
    }

    /// Slots whose box intersects the viewport (closed intervals) or that
    /// have no box at all, in ascending order
    pub fn query(&self, viewport: &BoundingBox) -> Vec<usize> {
        let mut slots = self.query_bounded(viewport);
        slots.extend_from_slice(&self.unbounded);
        slots.sort_unstable();
        slots
    }

    /// Only the slots with a declared box intersecting the viewport
    pub fn query_bounded(&self, viewport: &BoundingBox) -> Vec<usize> {
        let rect = viewport.to_rect();
        let envelope = AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]);

        let mut slots: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .filter(|indexed| indexed.bbox.intersects(viewport))
            .map(|indexed| indexed.slot)
            .collect();
        slots.sort_unstable();
        slots
    }

    /// Number of entries without a declared box
    pub fn unbounded_count(&self) -> usize {
        self.unbounded.len()
    }

    /// Get the total number of entries in the index
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
