//! Grid-aligned cell boundaries and pin placement.

use std::cmp::max;

use stkgeom::bbox::Bbox;
use stkgeom::snap::Grid;
use stkgeom::Dir;

use crate::config::PassSettings;
use crate::error::{ErrorSource, Result};
use crate::layout::{BlobKey, BlobTree, Layout, PinDir};
use crate::log::warn;
use crate::stack::{Netlist, NodeKey};
use crate::tech::Technology;

/// Fixes the visible extent of `key` to its bloated bounding box, grown
/// outward to the placement grid.
///
/// Returns the bounded blob. Empty blobs, and blobs that already carry
/// exactly this boundary, are returned unchanged.
pub fn compute_boundary(
    tree: &mut BlobTree,
    key: BlobKey,
    tech: &dyn Technology,
    grid: &Grid,
) -> BlobKey {
    let snapped = grid.snap_out(tree.bloated_bbox(key, tech));
    let Some(rect) = snapped.into_rect() else {
        return key;
    };
    if tree.boundary_of(key) == Some(rect) {
        return key;
    }
    let boundary = tree.boundary(rect);
    tree.merge([key, boundary])
}

/// Overlays `pins` on the bounded blob `key`, then replaces every boundary
/// of the result with a single fresh one.
pub fn attach_pins(
    tree: &mut BlobTree,
    key: BlobKey,
    pins: Layout,
    tech: &dyn Technology,
    grid: &Grid,
) -> Result<BlobKey> {
    let pins = tree.leaf(pins);
    let merged = tree.merge([key, pins]);
    let stripped = tree.strip_boundaries(merged).ok_or_else(|| {
        ErrorSource::Internal("blob vanished while stripping boundaries".into())
    })?;
    Ok(compute_boundary(tree, stripped, tech, grid))
}

/// Height, measured from the bottom of a cell, of the top edge of the
/// input pin band.
///
/// The band starts at the cell height rounded up to the grid and grows one
/// pitch at a time until an input pin clears the output pin row.
pub fn top_band(height: i64, settings: &PassSettings) -> i64 {
    let pitch = settings.grid.pitch(Dir::Vert);
    let w = settings.pin.min_width();
    let mut top = settings.grid.snap_up(Dir::Vert, height);
    while top - w <= pitch + w + settings.pin.min_spacing() {
        top += pitch;
    }
    top
}

/// The largest number of tracks between pins that still fits `count` pins
/// (plus one leading track) within `extent`.
///
/// Falls back to placing pins on every track.
pub fn pin_stride(count: usize, pitch: i64, extent: i64) -> i64 {
    if count == 0 {
        return 1;
    }
    let count = count as i64;
    let mut stride = 1;
    while pitch + count * stride * pitch <= extent {
        stride += 1;
    }
    max(stride - 1, 1)
}

/// The nets that receive pins, in placement order.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct PinSet {
    pub inputs: Vec<NodeKey>,
    pub outputs: Vec<NodeKey>,
    /// Input tracks held for weak supplies, which get no pin of their own.
    pub reserved: usize,
}

impl PinSet {
    /// Collects the pins of a cell: ports that are not omitted, globals,
    /// then the supplies if they reach diffusion without having a pin
    /// already.
    pub fn from_netlist(netlist: &Netlist) -> Self {
        let mut inputs = Vec::new();
        let mut outputs = Vec::new();
        for port in netlist.ports().iter().filter(|p| !p.omit) {
            let Some(net) = port.net else {
                continue;
            };
            if port.input {
                inputs.push(net);
            } else {
                outputs.push(net);
            }
        }
        inputs.extend_from_slice(netlist.globals());
        for supply in [netlist.vdd(), netlist.gnd()].into_iter().flatten() {
            let pinned = inputs.contains(&supply) || outputs.contains(&supply);
            if !pinned && netlist.has_diffusion_edges(supply) {
                inputs.push(supply);
            }
        }
        let reserved = usize::from(netlist.weak_supply_vdd() > 0)
            + usize::from(netlist.weak_supply_gnd() > 0);
        Self {
            inputs,
            outputs,
            reserved,
        }
    }

    #[inline]
    pub fn input_tracks(&self) -> usize {
        self.inputs.len() + self.reserved
    }
}

/// Draws pins for `pins` on a cell whose boundary is `bounds`.
///
/// Inputs go along the top band, outputs one pitch above the bottom edge.
pub fn place_pins(bounds: Bbox, pins: &PinSet, settings: &PassSettings) -> Layout {
    let mut layout = Layout::new();
    if bounds.is_empty() {
        return layout;
    }
    let pitch_x = settings.grid.pitch(Dir::Horiz);
    let pitch_y = settings.grid.pitch(Dir::Vert);
    let w = settings.pin.min_width();
    let right = settings.grid.snap_up(Dir::Horiz, bounds.width());
    let top = top_band(bounds.height(), settings);

    let rows = [
        (
            &pins.inputs,
            pins.input_tracks(),
            top - w,
            PinDir::Input,
        ),
        (&pins.outputs, pins.outputs.len(), pitch_y, PinDir::Output),
    ];
    for (nets, tracks, y, dir) in rows {
        if tracks as i64 * pitch_x > right {
            warn!(
                "can't fit {tracks} {} ports along a cell edge of length {right}",
                match dir {
                    PinDir::Input => "input",
                    PinDir::Output => "output",
                }
            );
        }
        let stride = pin_stride(tracks, pitch_x, right);
        let mut x = pitch_x;
        for &net in nets {
            layout.draw_metal_pin(
                settings.pin_layer,
                bounds.p0.x + x,
                bounds.p0.y + y,
                w,
                w,
                Some(net),
                dir,
            );
            x += pitch_x * stride;
        }
    }
    layout
}
