use common::{sample_design, TECH};
use float_eq::assert_float_eq;
use stklayout::{LayoutConfig, StackLayoutPass};

mod common;

fn config(area_multiplier: f64) -> LayoutConfig {
    LayoutConfig::builder()
        .lambda(10e-9)
        .area_multiplier(area_multiplier)
        .build()
        .unwrap()
}

#[test]
fn design_totals_count_every_use() {
    let design = sample_design();
    let mut pass = StackLayoutPass::new(&*TECH, &config(2.0)).unwrap();
    pass.run(&design).unwrap();

    let inv = pass.layout("inv").unwrap().bloated_bbox(&*TECH);
    let nand = pass.layout("nand2").unwrap().bloated_bbox(&*TECH);
    let height = inv.p1.y.max(nand.p1.y).max(0) - inv.p0.y.min(nand.p0.y).min(0);
    assert_eq!(pass.max_height(&design).unwrap(), height);

    let stats = pass.design_stats(&design).unwrap();
    // the top cell has no geometry of its own
    assert_eq!(stats.instances, 4);
    assert_eq!(stats.max_height, height);
    let area = 3 * inv.width() * inv.height() + nand.width() * nand.height();
    assert_float_eq!(stats.area, 2.0 * area as f64, abs <= 1e-9);
    let stdcell = (3 * inv.width() + nand.width()) * height;
    assert_float_eq!(stats.stdcell_area, 2.0 * stdcell as f64, abs <= 1e-9);
    assert!(stats.stdcell_area >= stats.area);
}

#[test]
fn cell_reports_share_the_total() {
    let design = sample_design();
    let mut pass = StackLayoutPass::new(&*TECH, &config(1.0)).unwrap();
    pass.run(&design).unwrap();

    let reports = pass.cell_reports(&design).unwrap();
    let names: Vec<String> = reports.iter().map(|r| r.name.to_string()).collect();
    assert_eq!(names, vec!["inv", "nand2"]);

    let inv = &reports[0];
    assert_eq!(inv.count, 3);
    assert_eq!((inv.fets, inv.keepers), (2, 0));
    assert_eq!(inv.nodes, 4);
    // one design unit is 10 nm
    assert_float_eq!(inv.area_um2, inv.area as f64 * 1e-4, rmax <= 1e-12);

    let total: f64 = reports.iter().map(|r| r.share).sum();
    assert_float_eq!(total, 100.0, abs <= 1e-9);

    let logged = pass.report(&design).unwrap();
    assert_eq!(logged, pass.design_stats(&design).unwrap());
}
