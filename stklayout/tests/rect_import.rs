use std::fs;

use common::{inverter, nand2, TECH};
use stklayout::error::ErrorSource;
use stklayout::layout::{LayerTag, PinDir};
use stklayout::tech::MosKind;
use stklayout::{Design, LayoutConfig, StackLayoutPass};
use stkgeom::Rect;
use tempdir::TempDir;

mod common;

const INV_RECT: &str = "\
bbox 0 0 29 39
rect gnd ndiff 0 0 9 3
rect vdd pdiff 0 30 9 35
inrect a m2 10 20 13 23
";

fn design() -> Design {
    let mut design = Design::new("inv");
    design.add_cell(inverter("inv", true));
    design.add_cell(nand2("nand2"));
    design.add_cell(inverter("inv_tap", true));
    design
}

fn import_config(dir: &TempDir) -> LayoutConfig {
    LayoutConfig::builder()
        .lambda(10e-9)
        .rect_import(1)
        .rect_dir(dir.path())
        .build()
        .unwrap()
}

#[test]
fn rect_file_replaces_synthesis() {
    let dir = TempDir::new("stklayout").unwrap();
    fs::write(dir.path().join("inv.rect"), INV_RECT).unwrap();

    let design = design();
    let mut pass = StackLayoutPass::new(&*TECH, &import_config(&dir)).unwrap();
    pass.run(&design).unwrap();

    let inv = pass.layout("inv").unwrap();
    let nl = &design.cell("inv").unwrap().netlist;
    let elems = inv.elements(&*TECH);
    assert_eq!(elems.len(), 3);
    assert!(!elems.iter().any(|e| matches!(e.layer, LayerTag::Fet { .. })));

    // the n diffusion top (4) moves onto the n row centre line (-10)
    assert_eq!(
        elems[0].layer,
        LayerTag::Diff {
            kind: MosKind::Nmos,
            flavor: common::SVT
        }
    );
    assert_eq!(elems[0].rect, Rect::from_extent(0, -14, 10, 4));
    assert_eq!(elems[0].net, nl.find_node("gnd"));
    assert_eq!(elems[2].rect, Rect::from_extent(10, 6, 4, 4));
    assert_eq!(elems[2].pin, Some(PinDir::Input));
    assert_eq!(elems[2].net, nl.find_node("a"));
    assert!(inv.is_imported());

    // cells without a file are synthesized as usual
    let nand = pass.layout("nand2").unwrap().elements(&*TECH);
    assert_eq!(
        nand.iter()
            .filter(|e| matches!(e.layer, LayerTag::Fet { .. }))
            .count(),
        4
    );
    assert!(!pass.layout("nand2").unwrap().is_imported());
}

#[test]
fn imported_cells_are_not_well_tap_references() {
    let dir = TempDir::new("stklayout").unwrap();
    fs::write(dir.path().join("inv.rect"), INV_RECT).unwrap();

    let design = design();
    let mut pass = StackLayoutPass::new(&*TECH, &import_config(&dir)).unwrap();
    pass.run(&design).unwrap();

    // `inv` comes first by name and has substrate contacts, but its
    // geometry was imported
    let reference = pass.reference().unwrap();
    assert_eq!(&*reference.cell, "inv_tap");
    assert_eq!(
        reference.diffspace,
        pass.layout("inv_tap").unwrap().diffspace()
    );
    assert!(pass.well_tap(common::SVT).is_some());
}

#[test]
fn malformed_rect_file_is_an_error() {
    let dir = TempDir::new("stklayout").unwrap();
    fs::write(dir.path().join("inv.rect"), "rect gnd ndiff 0 0 9\n").unwrap();

    let mut pass = StackLayoutPass::new(&*TECH, &import_config(&dir)).unwrap();
    let err = pass.run(&design()).unwrap_err();
    assert!(matches!(err.source(), ErrorSource::RectParse(_)));
}
