//! Leaf geometry containers and the blob tree that composes them.

use serde::{Deserialize, Serialize};
use stkgeom::bbox::{Bbox, BoundBox};
use stkgeom::Rect;

use crate::stack::NodeKey;
use crate::tech::{Flavor, MosKind, Technology};

pub mod blob;

pub use self::blob::{Blob, BlobKey, BlobTree};

/// The material a rectangle is drawn on.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum LayerTag {
    /// Active diffusion of a transistor row.
    Diff { kind: MosKind, flavor: Flavor },
    /// The transistor channel under a gate.
    Fet { kind: MosKind, flavor: Flavor },
    /// Tap diffusion contacting a well or the substrate.
    WellDiff { kind: MosKind, flavor: Flavor },
    /// Marker covering all active area of one polarity of a stack.
    DiffBbox { kind: MosKind, flavor: Flavor },
    Poly,
    /// A metal layer, numbered from 1.
    Metal(usize),
}

impl LayerTag {
    /// Returns `true` for diffusion of any polarity or flavor.
    #[inline]
    pub fn is_diff(&self) -> bool {
        matches!(self, Self::Diff { .. })
    }
}

/// The direction of a pin.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum PinDir {
    Input,
    Output,
}

/// A rectangle on a layer.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub layer: LayerTag,
    pub rect: Rect,
    pub net: Option<NodeKey>,
    /// Set if this element is a pin of its cell.
    pub pin: Option<PinDir>,
}

impl Element {
    pub fn new(layer: LayerTag, rect: Rect) -> Self {
        Self {
            layer,
            rect,
            net: None,
            pin: None,
        }
    }

    pub fn with_net(mut self, net: Option<NodeKey>) -> Self {
        self.net = net;
        self
    }

    pub fn with_pin(mut self, dir: PinDir) -> Self {
        self.pin = Some(dir);
        self
    }

    /// This element's rectangle, inflated by the layer's bloat distance.
    pub fn bloated_rect(&self, tech: &dyn Technology) -> Rect {
        self.rect.expand(tech.bloat(self.layer))
    }
}

impl BoundBox for Element {
    fn bbox(&self) -> Bbox {
        self.rect.bbox()
    }
}

/// A flat collection of drawn rectangles.
///
/// Drawing calls take a lower-left corner and a (possibly negative) extent.
/// Degenerate rectangles are silently dropped.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    elems: Vec<Element>,
}

impl Layout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an element unless its rectangle covers no area.
    ///
    /// Returns `true` if the element was kept.
    pub fn add(&mut self, elem: Element) -> bool {
        if elem.rect.is_degenerate() {
            return false;
        }
        self.elems.push(elem);
        true
    }

    #[allow(clippy::too_many_arguments)]
    pub fn draw_diff(
        &mut self,
        flavor: Flavor,
        kind: MosKind,
        x: i64,
        y: i64,
        w: i64,
        h: i64,
        net: Option<NodeKey>,
    ) -> bool {
        self.add(
            Element::new(LayerTag::Diff { kind, flavor }, Rect::from_extent(x, y, w, h))
                .with_net(net),
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn draw_fet(
        &mut self,
        flavor: Flavor,
        kind: MosKind,
        x: i64,
        y: i64,
        w: i64,
        h: i64,
        net: Option<NodeKey>,
    ) -> bool {
        self.add(
            Element::new(LayerTag::Fet { kind, flavor }, Rect::from_extent(x, y, w, h))
                .with_net(net),
        )
    }

    pub fn draw_poly(&mut self, x: i64, y: i64, w: i64, h: i64, net: Option<NodeKey>) -> bool {
        self.add(Element::new(LayerTag::Poly, Rect::from_extent(x, y, w, h)).with_net(net))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn draw_metal_pin(
        &mut self,
        metal: usize,
        x: i64,
        y: i64,
        w: i64,
        h: i64,
        net: Option<NodeKey>,
        dir: PinDir,
    ) -> bool {
        self.add(
            Element::new(LayerTag::Metal(metal), Rect::from_extent(x, y, w, h))
                .with_net(net)
                .with_pin(dir),
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn draw_well_diff(
        &mut self,
        flavor: Flavor,
        kind: MosKind,
        x: i64,
        y: i64,
        w: i64,
        h: i64,
        net: Option<NodeKey>,
    ) -> bool {
        self.add(
            Element::new(
                LayerTag::WellDiff { kind, flavor },
                Rect::from_extent(x, y, w, h),
            )
            .with_net(net),
        )
    }

    /// Draws the active-area marker for one polarity of a stack.
    ///
    /// Empty boxes draw nothing.
    pub fn draw_diff_bbox(&mut self, flavor: Flavor, kind: MosKind, bbox: Bbox) -> bool {
        match bbox.into_rect() {
            Some(rect) => self.add(Element::new(LayerTag::DiffBbox { kind, flavor }, rect)),
            None => false,
        }
    }

    #[inline]
    pub fn elems(&self) -> &[Element] {
        &self.elems
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    /// The bounding box of all elements, each inflated by its layer's bloat.
    pub fn bloated_bbox(&self, tech: &dyn Technology) -> Bbox {
        self.elems.iter().fold(Bbox::empty(), |acc, e| {
            acc.union(e.bloated_rect(tech).bbox())
        })
    }
}

impl BoundBox for Layout {
    fn bbox(&self) -> Bbox {
        self.elems.bbox()
    }
}

impl Extend<Element> for Layout {
    fn extend<T: IntoIterator<Item = Element>>(&mut self, iter: T) {
        for elem in iter {
            self.add(elem);
        }
    }
}
