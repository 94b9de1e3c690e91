//! Composable trees of layout geometry.
//!
//! Every blob lives in a [`BlobTree`] arena and is referred to by a
//! [`BlobKey`]. Composite blobs own their children: removing a composite
//! releases its whole subtree. Child positions are never stored; they are
//! derived from the children's bloated bounding boxes whenever the tree is
//! queried, so all queries are pure folds over the tree.

use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};
use stkgeom::bbox::{Bbox, BoundBox};
use stkgeom::{Dir, Point, Rect};

use super::{Element, Layout};
use crate::error::{ErrorSource, Result};
use crate::stack::NodeKey;
use crate::tech::Technology;

new_key_type! {
    /// A key identifying a blob of a [`BlobTree`].
    pub struct BlobKey;
}

/// A child of a sequence blob.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct SeqChild {
    pub key: BlobKey,
    /// Extra space inserted before this child along the sequence axis.
    pub gap: i64,
}

/// A node of a [`BlobTree`].
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum Blob {
    /// Drawn geometry.
    Leaf(Layout),
    /// An empty rectangle that fixes the visible extent of its parent.
    Boundary(Rect),
    /// Children placed left to right, each abutting the previous child's
    /// bloated box.
    HorizontalSeq(Vec<SeqChild>),
    /// Children placed bottom to top, each abutting the previous child's
    /// bloated box.
    VerticalSeq(Vec<SeqChild>),
    /// Children overlaid in a shared coordinate system.
    BoundaryMerge(Vec<BlobKey>),
}

impl Blob {
    #[inline]
    pub fn is_boundary(&self) -> bool {
        matches!(self, Self::Boundary(_))
    }
}

/// An arena of [`Blob`]s.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlobTree {
    blobs: SlotMap<BlobKey, Blob>,
}

impl BlobTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn leaf(&mut self, layout: Layout) -> BlobKey {
        self.blobs.insert(Blob::Leaf(layout))
    }

    pub fn boundary(&mut self, rect: Rect) -> BlobKey {
        self.blobs.insert(Blob::Boundary(rect))
    }

    /// Creates an empty horizontal sequence.
    pub fn hseq(&mut self) -> BlobKey {
        self.blobs.insert(Blob::HorizontalSeq(Vec::new()))
    }

    /// Creates an empty vertical sequence.
    pub fn vseq(&mut self) -> BlobKey {
        self.blobs.insert(Blob::VerticalSeq(Vec::new()))
    }

    pub fn merge(&mut self, children: impl IntoIterator<Item = BlobKey>) -> BlobKey {
        self.blobs
            .insert(Blob::BoundaryMerge(children.into_iter().collect()))
    }

    /// Appends `child` to the composite blob `parent`.
    ///
    /// The gap is ignored by merge blobs.
    pub fn append(&mut self, parent: BlobKey, child: BlobKey, gap: i64) -> Result<()> {
        if parent == child || !self.blobs.contains_key(child) {
            return Err(ErrorSource::Internal(format!("cannot append blob {child:?}")).into());
        }
        match self.blobs.get_mut(parent) {
            Some(Blob::HorizontalSeq(children)) | Some(Blob::VerticalSeq(children)) => {
                children.push(SeqChild { key: child, gap });
            }
            Some(Blob::BoundaryMerge(children)) => children.push(child),
            _ => {
                return Err(ErrorSource::Internal(format!(
                    "blob {parent:?} cannot hold children"
                ))
                .into())
            }
        }
        Ok(())
    }

    #[inline]
    pub fn get(&self, key: BlobKey) -> Option<&Blob> {
        self.blobs.get(key)
    }

    /// The number of live blobs in the arena.
    #[inline]
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// Offsets of each child of `key`, in `key`'s coordinate system.
    fn placements(&self, key: BlobKey, tech: &dyn Technology) -> Vec<(BlobKey, Point)> {
        match self.blobs.get(key) {
            Some(Blob::HorizontalSeq(children)) => self.sequence(children, Dir::Horiz, tech),
            Some(Blob::VerticalSeq(children)) => self.sequence(children, Dir::Vert, tech),
            Some(Blob::BoundaryMerge(children)) => {
                children.iter().map(|&c| (c, Point::zero())).collect()
            }
            _ => Vec::new(),
        }
    }

    fn sequence(
        &self,
        children: &[SeqChild],
        dir: Dir,
        tech: &dyn Technology,
    ) -> Vec<(BlobKey, Point)> {
        let mut end: Option<i64> = None;
        let mut out = Vec::with_capacity(children.len());
        for child in children {
            let b = self.bloated_bbox(child.key, tech);
            if b.is_empty() {
                out.push((child.key, Point::zero()));
                continue;
            }
            let offset = match end {
                None => child.gap,
                Some(end) => end + child.gap - b.p0.coord(dir),
            };
            end = Some(b.p1.coord(dir) + offset);
            out.push((child.key, Point::offset(offset, dir)));
        }
        out
    }

    /// The extent of all drawn geometry and boundary rectangles under `key`.
    pub fn bbox(&self, key: BlobKey, tech: &dyn Technology) -> Bbox {
        match self.blobs.get(key) {
            None => Bbox::empty(),
            Some(Blob::Leaf(layout)) => layout.bbox(),
            Some(Blob::Boundary(rect)) => rect.bbox(),
            Some(_) => self
                .placements(key, tech)
                .into_iter()
                .fold(Bbox::empty(), |acc, (child, offset)| {
                    acc.union(self.bbox(child, tech).translated(offset))
                }),
        }
    }

    /// Like [`BlobTree::bbox`], but with every drawn element inflated by
    /// its layer's bloat. Boundary rectangles are not inflated.
    pub fn bloated_bbox(&self, key: BlobKey, tech: &dyn Technology) -> Bbox {
        match self.blobs.get(key) {
            None => Bbox::empty(),
            Some(Blob::Leaf(layout)) => layout.bloated_bbox(tech),
            Some(Blob::Boundary(rect)) => rect.bbox(),
            Some(_) => self
                .placements(key, tech)
                .into_iter()
                .fold(Bbox::empty(), |acc, (child, offset)| {
                    acc.union(self.bloated_bbox(child, tech).translated(offset))
                }),
        }
    }

    /// The boundary rectangle fixed directly on `key`, if any.
    ///
    /// A blob is bounded if it is a boundary or a merge with a boundary child.
    pub fn boundary_of(&self, key: BlobKey) -> Option<Rect> {
        match self.blobs.get(key)? {
            Blob::Boundary(rect) => Some(*rect),
            Blob::BoundaryMerge(children) => {
                children.iter().find_map(|&c| match self.blobs.get(c) {
                    Some(Blob::Boundary(rect)) => Some(*rect),
                    _ => None,
                })
            }
            _ => None,
        }
    }

    fn collect(
        &self,
        key: BlobKey,
        offset: Point,
        tech: &dyn Technology,
        pred: &dyn Fn(&Element) -> bool,
        out: &mut Vec<Element>,
    ) {
        match self.blobs.get(key) {
            Some(Blob::Leaf(layout)) => {
                out.extend(layout.elems().iter().filter(|e| pred(*e)).map(|e| Element {
                    rect: e.rect.translated(offset),
                    ..e.clone()
                }));
            }
            Some(Blob::Boundary(_)) | None => {}
            Some(_) => {
                for (child, child_offset) in self.placements(key, tech) {
                    self.collect(child, offset + child_offset, tech, pred, out);
                }
            }
        }
    }

    /// Finds all drawn elements under `key` matching `pred`, in the
    /// coordinate system of `key`.
    pub fn search(
        &self,
        key: BlobKey,
        tech: &dyn Technology,
        pred: impl Fn(&Element) -> bool,
    ) -> Vec<Element> {
        let mut out = Vec::new();
        self.collect(key, Point::zero(), tech, &pred, &mut out);
        out
    }

    /// Finds all drawn elements on net `net`.
    pub fn search_net(&self, key: BlobKey, tech: &dyn Technology, net: NodeKey) -> Vec<Element> {
        self.search(key, tech, |e| e.net == Some(net))
    }

    /// All drawn elements under `key`, in depth-first order.
    pub fn flatten(&self, key: BlobKey, tech: &dyn Technology) -> Vec<Element> {
        self.search(key, tech, |_| true)
    }

    /// Removes every boundary blob under `key`, releasing it.
    ///
    /// Returns `None` if `key` was itself a boundary (and is now gone).
    pub fn strip_boundaries(&mut self, key: BlobKey) -> Option<BlobKey> {
        if self.blobs.get(key)?.is_boundary() {
            self.blobs.remove(key);
            return None;
        }
        let children: Vec<BlobKey> = match self.blobs.get(key)? {
            Blob::Leaf(_) | Blob::Boundary(_) => return Some(key),
            Blob::HorizontalSeq(c) | Blob::VerticalSeq(c) => c.iter().map(|c| c.key).collect(),
            Blob::BoundaryMerge(c) => c.clone(),
        };
        let kept: Vec<BlobKey> = children
            .into_iter()
            .filter_map(|c| self.strip_boundaries(c))
            .collect();
        match self.blobs.get_mut(key) {
            Some(Blob::HorizontalSeq(c)) | Some(Blob::VerticalSeq(c)) => {
                c.retain(|c| kept.contains(&c.key))
            }
            Some(Blob::BoundaryMerge(c)) => c.retain(|c| kept.contains(c)),
            _ => {}
        }
        Some(key)
    }

    /// Removes `key` and its whole subtree from the arena.
    pub fn remove(&mut self, key: BlobKey) -> Option<Blob> {
        let blob = self.blobs.remove(key)?;
        match &blob {
            Blob::HorizontalSeq(children) | Blob::VerticalSeq(children) => {
                for c in children {
                    self.remove(c.key);
                }
            }
            Blob::BoundaryMerge(children) => {
                for &c in children {
                    self.remove(c);
                }
            }
            Blob::Leaf(_) | Blob::Boundary(_) => {}
        }
        Some(blob)
    }
}
