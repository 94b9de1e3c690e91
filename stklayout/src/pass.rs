//! The per-design layout pass: synthesizes every cell, then the well taps.

use std::cmp::min;
use std::collections::BTreeMap;

use arcstr::ArcStr;
use stkgeom::bbox::Bbox;
use stkgeom::Dir;

use crate::boundary::{attach_pins, compute_boundary, place_pins, top_band, PinSet};
use crate::config::{LayoutConfig, PassSettings};
use crate::design::{Circuit, Design};
use crate::error::{with_err_context, ErrorContext, ErrorSource, Result};
use crate::layout::{BlobKey, BlobTree, Element, Layout, PinDir};
use crate::log::{debug, Log};
use crate::rect::import_rect;
use crate::stack::validation::validate_stacks;
use crate::stack::NodeKey;
use crate::stats::{self, CellReport, DesignStats};
use crate::synth::{
    diff_separation, draw_dual_stack, draw_single_stack, row_centers, DrawnStack, SynthCtx,
};
use crate::tech::{Flavor, MosKind, Technology};

/// The finished geometry of one cell.
#[derive(Debug, Clone)]
pub struct CellLayout {
    tree: BlobTree,
    root: BlobKey,
    diffspace: i64,
    imported: bool,
}

impl CellLayout {
    #[inline]
    pub fn tree(&self) -> &BlobTree {
        &self.tree
    }

    #[inline]
    pub fn root(&self) -> BlobKey {
        self.root
    }

    /// The distance between the NMOS and PMOS row centre lines.
    #[inline]
    pub fn diffspace(&self) -> i64 {
        self.diffspace
    }

    /// Whether the geometry was read from a `.rect` file.
    #[inline]
    pub fn is_imported(&self) -> bool {
        self.imported
    }

    pub fn bbox(&self, tech: &dyn Technology) -> Bbox {
        self.tree.bbox(self.root, tech)
    }

    pub fn bloated_bbox(&self, tech: &dyn Technology) -> Bbox {
        self.tree.bloated_bbox(self.root, tech)
    }

    /// All drawn elements, in cell coordinates.
    pub fn elements(&self, tech: &dyn Technology) -> Vec<Element> {
        self.tree.flatten(self.root, tech)
    }
}

/// The cell whose supplies and row separation are used for well taps.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Reference {
    pub cell: ArcStr,
    pub diffspace: i64,
    pub psc: NodeKey,
    pub nsc: NodeKey,
}

pub struct StackLayoutPass<'a> {
    tech: &'a dyn Technology,
    settings: PassSettings,
    layouts: BTreeMap<ArcStr, CellLayout>,
    well_taps: BTreeMap<Flavor, CellLayout>,
    reference: Option<Reference>,
}

impl<'a> StackLayoutPass<'a> {
    pub fn new(tech: &'a dyn Technology, config: &LayoutConfig) -> Result<Self> {
        Ok(Self::with_settings(tech, config.resolve(tech)?))
    }

    pub fn with_settings(tech: &'a dyn Technology, settings: PassSettings) -> Self {
        Self {
            tech,
            settings,
            layouts: BTreeMap::new(),
            well_taps: BTreeMap::new(),
            reference: None,
        }
    }

    #[inline]
    pub fn tech(&self) -> &'a dyn Technology {
        self.tech
    }

    #[inline]
    pub fn settings(&self) -> &PassSettings {
        &self.settings
    }

    pub fn layout(&self, cell: &str) -> Option<&CellLayout> {
        self.layouts.get(cell)
    }

    /// Laid-out cells, in name order.
    pub fn layouts(&self) -> impl Iterator<Item = (&ArcStr, &CellLayout)> {
        self.layouts.iter()
    }

    pub fn well_tap(&self, flavor: Flavor) -> Option<&CellLayout> {
        self.well_taps.get(&flavor)
    }

    #[inline]
    pub fn reference(&self) -> Option<&Reference> {
        self.reference.as_ref()
    }

    /// Lays out every cell of `design` in name order, then one well tap per
    /// flavor with tap rules.
    ///
    /// The well taps take their supplies and row separation from the first
    /// synthesized cell that exposes both substrate-contact nets.
    ///
    /// Results of an earlier run are discarded.
    pub fn run(&mut self, design: &Design) -> Result<()> {
        self.layouts.clear();
        self.well_taps.clear();
        self.reference = None;

        for circuit in design.cells() {
            let name = circuit.name.clone();
            let Some(layout) = with_err_context(self.synthesize_cell(circuit), || {
                ErrorContext::SynthesizeCell(name.clone())
            })?
            else {
                continue;
            };
            if self.reference.is_none() && !layout.imported {
                let nl = &circuit.netlist;
                if let (Some(psc), Some(nsc)) = (nl.psc(), nl.nsc()) {
                    debug!("using {name} as the well tap reference cell");
                    self.reference = Some(Reference {
                        cell: name.clone(),
                        diffspace: layout.diffspace,
                        psc,
                        nsc,
                    });
                }
            }
            self.layouts.insert(name, layout);
        }

        for flavor in self.tech.flavors() {
            let label: ArcStr = match self.tech.flavor_name(flavor) {
                Some(name) => name.into(),
                None => arcstr::format!("{flavor}"),
            };
            let tap = with_err_context(self.well_tap_layout(flavor), || {
                ErrorContext::WellTap(label)
            })?;
            if let Some(tap) = tap {
                self.well_taps.insert(flavor, tap);
            }
        }
        Ok(())
    }

    /// Produces the geometry of one cell, without storing it.
    ///
    /// Returns `None` for cells that need no geometry: cells without
    /// stacks, and cells built only from keepers.
    pub fn synthesize_cell(&self, circuit: &Circuit) -> Result<Option<CellLayout>> {
        let name = &circuit.name;
        let nl = &circuit.netlist;
        let stacks = &circuit.stacks;
        if stacks.is_empty() {
            debug!("{name} has no transistor stacks; skipping");
            return Ok(None);
        }
        if nl.is_keeper_only() {
            debug!("{name} only has keepers; skipping");
            return Ok(None);
        }
        validate_stacks(nl, stacks)
            .into_result(ErrorContext::Task("validating transistor stacks".into()))?;

        let ctx = SynthCtx::new(self.tech, nl, self.settings.scale);
        let diffspace = diff_separation(&ctx, stacks)?;
        debug!("synthesizing {name} with row separation {diffspace}");

        let mut tree = BlobTree::new();
        let imported = with_err_context(
            import_rect(&mut tree, name, nl, self.tech, &self.settings, diffspace),
            || ErrorContext::ImportRect(name.clone()),
        )?;
        if let Some(root) = imported {
            debug!("{name}: using pre-computed geometry");
            return Ok(Some(CellLayout {
                tree,
                root,
                diffspace,
                imported: true,
            }));
        }

        let seq = tree.hseq();
        for gp in stacks.dual.iter() {
            let mut layout = Layout::new();
            let drawn = draw_dual_stack(&ctx, &mut layout, gp, diffspace)?;
            mark_diff_bbox(&mut layout, &drawn, &MosKind::ALL);
            let leaf = tree.leaf(layout);
            tree.append(seq, leaf, 0)?;
        }
        for (kind, singles) in [(MosKind::Nmos, &stacks.n), (MosKind::Pmos, &stacks.p)] {
            for stack in singles.iter() {
                let mut layout = Layout::new();
                let drawn = draw_single_stack(&ctx, &mut layout, stack)?;
                mark_diff_bbox(&mut layout, &drawn, &[kind]);
                let leaf = tree.leaf(layout);
                tree.append(seq, leaf, 0)?;
            }
        }

        let mut root = compute_boundary(&mut tree, seq, self.tech, &self.settings.grid);
        let bounds = tree.bbox(root, self.tech);
        if !bounds.is_empty() {
            let pins = place_pins(bounds, &PinSet::from_netlist(nl), &self.settings);
            root = attach_pins(&mut tree, root, pins, self.tech, &self.settings.grid)?;
        }
        Ok(Some(CellLayout {
            tree,
            root,
            diffspace,
            imported: false,
        }))
    }

    /// Builds the well tap of `flavor`, or `None` if neither polarity of
    /// the flavor has tap rules.
    fn well_tap_layout(&self, flavor: Flavor) -> Result<Option<CellLayout>> {
        let n = self.tech.device(MosKind::Nmos, flavor);
        let p = self.tech.device(MosKind::Pmos, flavor);
        let n_tap = n.and_then(|d| d.tap);
        let p_tap = p.and_then(|d| d.tap);
        if n_tap.is_none() && p_tap.is_none() {
            return Ok(None);
        }
        let reference = self
            .reference
            .as_ref()
            .ok_or(ErrorSource::MissingSupplies)?;
        let (yn, yp) = row_centers(reference.diffspace);

        let mut layout = Layout::new();
        if let Some(tap) = n_tap {
            let mut y = yp;
            if let Some(well) = n.and_then(|d| d.well) {
                y = min(y, well.overhang_welldiff);
            }
            layout.draw_well_diff(
                flavor,
                MosKind::Nmos,
                0,
                y,
                tap.width,
                tap.min_height(),
                Some(reference.nsc),
            );
        }
        if let Some(tap) = p_tap {
            let height = tap.min_height();
            let mut y = yn;
            if let Some(well) = p.and_then(|d| d.well) {
                if well.overhang_welldiff < -y {
                    y = -well.overhang_welldiff;
                }
            }
            layout.draw_well_diff(
                flavor,
                MosKind::Pmos,
                0,
                y - height,
                tap.width,
                height,
                Some(reference.psc),
            );
        }

        let mut tree = BlobTree::new();
        let leaf = tree.leaf(layout);
        let root = compute_boundary(&mut tree, leaf, self.tech, &self.settings.grid);
        let bounds = tree.bbox(root, self.tech);

        let s = &self.settings;
        let w = s.pin.min_width();
        let pitch_x = s.grid.pitch(Dir::Horiz);
        let mut pins = Layout::new();
        pins.draw_metal_pin(
            s.pin_layer,
            bounds.p0.x + pitch_x,
            bounds.p0.y + top_band(bounds.height(), s) - w,
            w,
            w,
            Some(reference.nsc),
            PinDir::Input,
        );
        pins.draw_metal_pin(
            s.pin_layer,
            bounds.p0.x + pitch_x,
            bounds.p0.y + s.grid.pitch(Dir::Vert),
            w,
            w,
            Some(reference.psc),
            PinDir::Input,
        );
        let root = attach_pins(&mut tree, root, pins, self.tech, &s.grid)?;
        Ok(Some(CellLayout {
            tree,
            root,
            diffspace: reference.diffspace,
            imported: false,
        }))
    }

    pub fn max_height(&self, design: &Design) -> Result<i64> {
        stats::max_height(design, self)
    }

    pub fn design_stats(&self, design: &Design) -> Result<DesignStats> {
        stats::design_stats(design, self)
    }

    pub fn cell_reports(&self, design: &Design) -> Result<Vec<CellReport>> {
        stats::cell_reports(design, self)
    }

    /// Logs a report per used cell followed by the design totals.
    pub fn report(&self, design: &Design) -> Result<DesignStats> {
        for report in self.cell_reports(design)? {
            report.log();
        }
        let stats = self.design_stats(design)?;
        stats.log();
        Ok(stats)
    }
}

fn mark_diff_bbox(layout: &mut Layout, drawn: &DrawnStack, kinds: &[MosKind]) {
    let flavor = drawn.bbox.flavor().unwrap_or_default();
    for &kind in kinds {
        layout.draw_diff_bbox(flavor, kind, drawn.bbox.get(kind));
    }
}
