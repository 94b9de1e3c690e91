//! Draws the rectangles of a single stack edge.

use std::cmp::max;

use array_map::ArrayMap;
use stkgeom::bbox::{Bbox, BoundBox};
use stkgeom::Rect;

use super::transition::{positive, resolve, EdgeStep};
use super::SynthCtx;
use crate::error::{ErrorSource, Result};
use crate::layout::Layout;
use crate::stack::{EdgeKey, NodeKey};
use crate::tech::{Flavor, MosKind};

/// Running active-area bounds of a stack, one box per polarity.
///
/// Boxes start empty and only grow by the diffusion and gate rectangles
/// actually drawn.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct StackBbox {
    boxes: ArrayMap<MosKind, Bbox, 2>,
    flavor: Option<Flavor>,
}

impl StackBbox {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, kind: MosKind) -> Bbox {
        self.boxes[kind]
    }

    /// The flavor of the most recently drawn edge.
    #[inline]
    pub fn flavor(&self) -> Option<Flavor> {
        self.flavor
    }

    pub fn extend(&mut self, kind: MosKind, rect: Rect) {
        self.boxes[kind] = self.boxes[kind].union(rect.bbox());
    }
}

/// Which way a row's devices grow from its centre line.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum RowDir {
    /// Devices hang below the centre line (the NMOS row of a dual stack).
    Down,
    Up,
}

impl RowDir {
    #[inline]
    pub fn sign(self) -> i64 {
        match self {
            Self::Down => -1,
            Self::Up => 1,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Row {
    /// The centre line shared by the row's gate ends.
    pub y: i64,
    pub dir: RowDir,
}

impl Row {
    pub fn new(y: i64, dir: RowDir) -> Self {
        Self { y, dir }
    }
}

/// One edge to draw.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct EmitRequest {
    pub step: EdgeStep,
    /// Extra diffusion inserted before the edge to align it with the other row.
    pub pad: i64,
    /// Where the previous feature of this row ends.
    pub x: i64,
    pub row: Row,
    /// The edge at the same gate position of the other row, with that
    /// row's centre line.
    pub opposing: Option<(EdgeKey, i64)>,
}

/// Draws diffusion and gate rectangles of one row, keeping the stack's
/// bounding box in step with what was actually drawn.
struct RowPen<'l> {
    layout: &'l mut Layout,
    bbox: &'l mut StackBbox,
    kind: MosKind,
    flavor: Flavor,
    row: Row,
}

impl RowPen<'_> {
    fn extent(&self, x: i64, len: i64, height: i64) -> (i64, i64, i64, i64) {
        (x, self.row.y, len, self.row.dir.sign() * height)
    }

    fn diff(&mut self, x: i64, len: i64, height: i64, net: Option<NodeKey>) {
        let (x, y, w, h) = self.extent(x, len, height);
        if self
            .layout
            .draw_diff(self.flavor, self.kind, x, y, w, h, net)
        {
            self.bbox.extend(self.kind, Rect::from_extent(x, y, w, h));
        }
    }

    fn fet(&mut self, x: i64, len: i64, height: i64) {
        let (x, y, w, h) = self.extent(x, len, height);
        if self
            .layout
            .draw_fet(self.flavor, self.kind, x, y, w, h, None)
        {
            self.bbox.extend(self.kind, Rect::from_extent(x, y, w, h));
        }
    }
}

/// Draws one edge and returns where its last rectangle ends.
///
/// Padding is folded into the first diffusion rectangle before the gate.
/// The closing diffusion is only drawn for the rightmost edge of a row.
pub fn emit_edge(
    ctx: &SynthCtx<'_>,
    layout: &mut Layout,
    bbox: &mut StackBbox,
    req: &EmitRequest,
) -> Result<i64> {
    let step = &req.step;
    let edge = ctx.edge(step.edge)?;
    let rules = ctx.device(edge)?;
    let left = ctx.node(step.left)?;
    let plan = resolve(ctx, step)?;
    let width = plan.width;
    let len = ctx.length(edge);

    bbox.flavor = Some(edge.flavor);
    let mut pen = RowPen {
        layout,
        bbox,
        kind: edge.kind,
        flavor: edge.flavor,
        row: req.row,
    };

    let mut x = req.x;
    let first = plan.first + req.pad;
    pen.diff(x, first, plan.first_width, left.contact.then_some(step.left));
    x += first;
    if let Some(second) = plan.second {
        pen.diff(x, second, width, None);
        x += second;
    }
    pen.fet(x, len, width);

    let poly = ctx.tech.poly();
    let overhang = poly.overhang(len);
    let far_overhang = if plan.is_notch() {
        max(overhang, poly.notch_overhang(len))
    } else {
        overhang
    };
    let Row { y, dir } = req.row;
    let gate = Some(edge.gate);
    match dir {
        RowDir::Down => {
            pen.layout.draw_poly(x, y, len, overhang, gate);
            pen.layout
                .draw_poly(x, y - width - far_overhang, len, far_overhang, None);
        }
        RowDir::Up => {
            // Where both rows' poly would overlap, assume equal overhangs and
            // stop this row's poly where the other row's ends.
            let mut near_end = None;
            if let Some((opp, opp_y)) = req.opposing {
                let opp_overhang = poly.overhang(ctx.length(ctx.edge(opp)?));
                if opp_y + opp_overhang + overhang >= y {
                    near_end = Some(opp_y + opp_overhang);
                }
            }
            match near_end {
                Some(end) => {
                    if y - end > 0 {
                        pen.layout.draw_poly(x, end, len, y - end, gate);
                    }
                }
                None => {
                    pen.layout.draw_poly(x, y - overhang, len, overhang, gate);
                }
            }
            pen.layout.draw_poly(x, y + width, len, far_overhang, None);
        }
    }
    x += len;

    if step.flags.right {
        let right = edge.other(step.left).ok_or_else(|| {
            ErrorSource::InvalidStack("transistor does not touch its left node".into())
        })?;
        let contact = ctx.node(right)?.contact;
        let closing = positive(
            "right diffusion overhang",
            edge,
            width,
            rules.diff.eff_overhang(width, contact),
        )?;
        pen.diff(x, closing, width, Some(right));
        x += closing;
    }

    Ok(x)
}
