//! Area statistics over a laid-out design.

use std::cmp::{max, min};
use std::collections::BTreeMap;

use arcstr::ArcStr;
use serde::Serialize;
use stkgeom::bbox::Bbox;

use crate::design::Design;
use crate::error::Result;
use crate::log::{info, Log};
use crate::pass::StackLayoutPass;

/// Usage and area of one cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellReport {
    pub name: ArcStr,
    /// Number of times the cell is used below (and including) the top cell.
    pub count: usize,
    /// Bloated bounding-box area, in square design units.
    pub area: i64,
    pub area_um2: f64,
    /// Percentage of the total area taken by all uses of this cell.
    pub share: f64,
    pub nodes: usize,
    pub fets: usize,
    pub keepers: usize,
}

impl Log for CellReport {
    fn log(&self) {
        info!(
            "{}: {} uses, area {} ({:.3} um^2, {:.2}% of total), {} nodes, {} fets, {} keepers",
            self.name,
            self.count,
            self.area,
            self.area_um2,
            self.share,
            self.nodes,
            self.fets,
            self.keepers
        );
    }
}

/// Totals over every instance of a design.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DesignStats {
    /// Instances, counting the top cell, whose cell has geometry.
    pub instances: usize,
    /// Sum of bloated instance areas, scaled by the area multiplier.
    pub area: f64,
    /// Sum of instance widths times [`DesignStats::max_height`], scaled by
    /// the area multiplier.
    pub stdcell_area: f64,
    pub max_height: i64,
}

impl Log for DesignStats {
    fn log(&self) {
        info!(
            "{} instances, area {:.1}, standard-cell area {:.1} (height {})",
            self.instances, self.area, self.stdcell_area, self.max_height
        );
    }
}

fn cell_bbox(pass: &StackLayoutPass<'_>, name: &str) -> Option<Bbox> {
    let bbox = pass.layout(name)?.bloated_bbox(pass.tech());
    (!bbox.is_empty()).then_some(bbox)
}

fn share(area: i64, count: usize, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    (area * count as i64) as f64 * 100.0 / total as f64
}

/// The height spanned by every cell reachable from the top, with the
/// origin always included.
pub fn max_height(design: &Design, pass: &StackLayoutPass<'_>) -> Result<i64> {
    let (mut ymin, mut ymax) = (0, 0);
    for circuit in design.reachable()? {
        if let Some(bbox) = cell_bbox(pass, &circuit.name) {
            ymin = min(ymin, bbox.p0.y);
            ymax = max(ymax, bbox.p1.y);
        }
    }
    Ok(ymax - ymin)
}

pub fn design_stats(design: &Design, pass: &StackLayoutPass<'_>) -> Result<DesignStats> {
    let max_height = max_height(design, pass)?;
    let mut stats = DesignStats {
        max_height,
        ..Default::default()
    };
    let (mut area, mut stdcell) = (0i64, 0i64);
    design.for_each_instance(|circuit| {
        if let Some(bbox) = cell_bbox(pass, &circuit.name) {
            stats.instances += 1;
            area += bbox.width() * bbox.height();
            stdcell += bbox.width() * max_height;
        }
    })?;
    let multiplier = pass.settings().area_multiplier;
    stats.area = area as f64 * multiplier;
    stats.stdcell_area = stdcell as f64 * multiplier;
    Ok(stats)
}

/// One report per cell with geometry that is used by the design, in name
/// order.
pub fn cell_reports(design: &Design, pass: &StackLayoutPass<'_>) -> Result<Vec<CellReport>> {
    let mut counts: BTreeMap<ArcStr, usize> = BTreeMap::new();
    design.for_each_instance(|circuit| {
        *counts.entry(circuit.name.clone()).or_default() += 1;
    })?;

    let um_per_unit = pass.settings().nm_per_unit / 1000.0;
    let mut reports = Vec::new();
    for (name, count) in counts {
        let (Some(bbox), Some(circuit)) = (cell_bbox(pass, &name), design.cell(&name)) else {
            continue;
        };
        let area = bbox.width() * bbox.height();
        let (fets, keepers) = circuit.netlist.fet_counts();
        reports.push(CellReport {
            name,
            count,
            area,
            area_um2: area as f64 * um_per_unit * um_per_unit,
            share: 0.0,
            nodes: circuit.netlist.num_nodes(),
            fets,
            keepers,
        });
    }

    let total: i64 = reports.iter().map(|r| r.area * r.count as i64).sum();
    for report in reports.iter_mut() {
        report.share = share(report.area, report.count, total);
    }
    Ok(reports)
}
