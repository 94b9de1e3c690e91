//! Import of pre-computed cell geometry from `.rect` files.
//!
//! Each line of a `.rect` file describes one rectangle:
//!
//! ```text
//! rect|inrect|outrect <net> <layer> llx lly urx ury
//! ```
//!
//! Corners are inclusive. A net of `#` means the rectangle has no net.
//! Layers are `ndiff`, `pdiff`, `nfet`, `pfet`, `ntap` and `ptap` (each
//! optionally prefixed by a flavor name and a colon, as in `lvt:ndiff`),
//! `poly`, and `m1`, `m2`, ... for metals. `bbox` lines are ignored.

use std::path::PathBuf;

use arcstr::ArcStr;
use stkgeom::bbox::{Bbox, BoundBox};
use stkgeom::Rect;
use thiserror::Error;

use crate::boundary::compute_boundary;
use crate::config::PassSettings;
use crate::error::{with_err_context, ErrorContext, Result};
use crate::io::read_optional;
use crate::layout::{BlobKey, BlobTree, Element, LayerTag, Layout, PinDir};
use crate::log::{debug, warn};
use crate::stack::Netlist;
use crate::synth::row_centers;
use crate::tech::{Flavor, MosKind, Technology};

#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[non_exhaustive]
pub enum RectParseError {
    #[error("line {line}: expected 7 fields, found {found}")]
    FieldCount { line: usize, found: usize },

    #[error("line {line}: unknown rectangle kind `{kind}`")]
    UnknownKind { line: usize, kind: String },

    #[error("line {line}: unknown layer `{layer}`")]
    UnknownLayer { line: usize, layer: String },

    #[error("line {line}: invalid coordinate `{value}`")]
    InvalidCoord { line: usize, value: String },
}

fn parse_layer(layer: &str, tech: &dyn Technology) -> Option<LayerTag> {
    if layer == "poly" {
        return Some(LayerTag::Poly);
    }
    if let Some(index) = layer.strip_prefix('m') {
        let index: usize = index.parse().ok()?;
        return (1..=tech.num_metals())
            .contains(&index)
            .then_some(LayerTag::Metal(index));
    }

    let (flavor, base) = match layer.split_once(':') {
        Some((name, base)) => {
            let flavor = tech
                .flavors()
                .into_iter()
                .find(|&f| tech.flavor_name(f) == Some(name))?;
            (flavor, base)
        }
        None => (Flavor::default(), layer),
    };
    let tag = match base {
        "ndiff" => LayerTag::Diff {
            kind: MosKind::Nmos,
            flavor,
        },
        "pdiff" => LayerTag::Diff {
            kind: MosKind::Pmos,
            flavor,
        },
        "nfet" => LayerTag::Fet {
            kind: MosKind::Nmos,
            flavor,
        },
        "pfet" => LayerTag::Fet {
            kind: MosKind::Pmos,
            flavor,
        },
        "ntap" => LayerTag::WellDiff {
            kind: MosKind::Nmos,
            flavor,
        },
        "ptap" => LayerTag::WellDiff {
            kind: MosKind::Pmos,
            flavor,
        },
        _ => return None,
    };
    Some(tag)
}

/// Parses the contents of a `.rect` file.
///
/// Nets are looked up by name in `netlist`; unknown nets are dropped with a
/// warning.
pub fn parse_rect(
    input: &str,
    netlist: &Netlist,
    tech: &dyn Technology,
) -> std::result::Result<Layout, RectParseError> {
    let mut layout = Layout::new();
    for (i, raw) in input.lines().enumerate() {
        let line = i + 1;
        let fields: Vec<&str> = raw.split_whitespace().collect();
        match fields.first() {
            None | Some(&"bbox") => continue,
            _ => {}
        }
        if fields.len() != 7 {
            return Err(RectParseError::FieldCount {
                line,
                found: fields.len(),
            });
        }

        let pin = match fields[0] {
            "rect" => None,
            "inrect" => Some(PinDir::Input),
            "outrect" => Some(PinDir::Output),
            kind => {
                return Err(RectParseError::UnknownKind {
                    line,
                    kind: kind.to_string(),
                })
            }
        };
        let net = match fields[1] {
            "#" => None,
            name => {
                let net = netlist.find_node(name);
                if net.is_none() {
                    warn!("line {line}: net `{name}` is not in the netlist");
                }
                net
            }
        };
        let layer =
            parse_layer(fields[2], tech).ok_or_else(|| RectParseError::UnknownLayer {
                line,
                layer: fields[2].to_string(),
            })?;
        let mut coords = [0i64; 4];
        for (c, value) in coords.iter_mut().zip(&fields[3..]) {
            *c = value.parse().map_err(|_| RectParseError::InvalidCoord {
                line,
                value: value.to_string(),
            })?;
        }
        let [llx, lly, urx, ury] = coords;

        let mut elem =
            Element::new(layer, Rect::from_inclusive(llx, lly, urx, ury)).with_net(net);
        elem.pin = pin;
        layout.add(elem);
    }
    Ok(layout)
}

/// The vertical shift that puts the diffusion of `layout` on the matching
/// row centre line of a cell with row separation `diffspace`.
///
/// Only the first populated layer is considered, searching flavors in index
/// order and NMOS before PMOS. The top of all its NMOS diffusion (or the
/// bottom of all its PMOS diffusion) lands on the row centre line. Returns
/// `None` if the layout has no diffusion.
pub fn diffusion_shift(layout: &Layout, tech: &dyn Technology, diffspace: i64) -> Option<i64> {
    let (yn, yp) = row_centers(diffspace);
    tech.flavors().into_iter().find_map(|flavor| {
        MosKind::ALL.into_iter().find_map(|kind| {
            let bbox = layout
                .elems()
                .iter()
                .filter(|e| e.layer == LayerTag::Diff { kind, flavor })
                .fold(Bbox::empty(), |acc, e| acc.union(e.rect.bbox()));
            if bbox.is_empty() {
                return None;
            }
            Some(match kind {
                MosKind::Nmos => yn - bbox.p1.y,
                MosKind::Pmos => yp - bbox.p0.y,
            })
        })
    })
}

/// Reads `<rect_dir>/<cell>.rect` into `tree`, aligned to the diffusion
/// rows and bounded.
///
/// Returns `None` if import is disabled or the file does not exist.
pub fn import_rect(
    tree: &mut BlobTree,
    cell: &ArcStr,
    netlist: &Netlist,
    tech: &dyn Technology,
    settings: &PassSettings,
    diffspace: i64,
) -> Result<Option<BlobKey>> {
    let Some(dir) = settings.rect_dir.as_ref() else {
        return Ok(None);
    };
    let path: PathBuf = dir.join(format!("{cell}.rect"));
    let Some(input) = read_optional(&path)? else {
        debug!("no pre-computed geometry for {cell} at {path:?}");
        return Ok(None);
    };
    let layout = with_err_context(parse_rect(&input, netlist, tech), || {
        ErrorContext::ReadFile(path.clone())
    })?;

    let shift = diffusion_shift(&layout, tech, diffspace);
    let leaf = tree.leaf(layout);
    let key = match shift {
        None => {
            warn!("pre-computed geometry for {cell} has no diffusion");
            leaf
        }
        Some(0) => leaf,
        Some(shift) => {
            let seq = tree.vseq();
            tree.append(seq, leaf, shift)?;
            seq
        }
    };
    Ok(Some(compute_boundary(tree, key, tech, &settings.grid)))
}
