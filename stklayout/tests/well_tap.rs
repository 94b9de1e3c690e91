use common::{inverter, nand2, sample_design, unit_config, LVT, SVT, TECH};
use stklayout::error::{ErrorContext, ErrorSource};
use stklayout::layout::{LayerTag, PinDir};
use stklayout::tech::MosKind;
use stklayout::{Design, StackLayoutPass};
use stkgeom::snap::Grid;
use stkgeom::Rect;

mod common;

#[test]
fn taps_follow_reference_rows() {
    let design = sample_design();
    let mut pass = StackLayoutPass::new(&*TECH, &unit_config()).unwrap();
    pass.run(&design).unwrap();

    let reference = pass.reference().unwrap();
    assert_eq!(&*reference.cell, "inv");
    assert_eq!(reference.diffspace, 20);

    // only svt has tap rules
    assert!(pass.well_tap(LVT).is_none());
    let tap = pass.well_tap(SVT).unwrap();
    let elems = tap.elements(&*TECH);

    let taps: Vec<_> = elems
        .iter()
        .filter(|e| matches!(e.layer, LayerTag::WellDiff { .. }))
        .map(|e| (e.layer, e.rect, e.net))
        .collect();
    // rows sit at -10 and 10; both taps are pulled in to the well overhang
    // of 4, and are 6 wide and 60 / 6 tall
    assert_eq!(
        taps,
        vec![
            (
                LayerTag::WellDiff {
                    kind: MosKind::Nmos,
                    flavor: SVT
                },
                Rect::from_extent(0, 4, 6, 10),
                Some(reference.nsc)
            ),
            (
                LayerTag::WellDiff {
                    kind: MosKind::Pmos,
                    flavor: SVT
                },
                Rect::from_extent(0, -14, 6, 10),
                Some(reference.psc)
            ),
        ]
    );

    let pins: Vec<_> = elems
        .iter()
        .filter(|e| e.pin.is_some())
        .map(|e| (e.rect, e.net, e.pin))
        .collect();
    assert_eq!(
        pins,
        vec![
            (
                Rect::from_extent(0, 20, 4, 4),
                Some(reference.nsc),
                Some(PinDir::Input)
            ),
            (
                Rect::from_extent(0, -16, 4, 4),
                Some(reference.psc),
                Some(PinDir::Input)
            ),
        ]
    );
    assert!(Grid::new(10, 8).is_aligned(tap.bbox(&*TECH)));
}

#[test]
fn reference_is_first_cell_by_name() {
    let mut design = Design::new("top");
    design.add_cell(inverter("b_inv", true));
    design.add_cell(inverter("a_inv", true));
    let mut pass = StackLayoutPass::new(&*TECH, &unit_config()).unwrap();
    pass.run(&design).unwrap();
    assert_eq!(&*pass.reference().unwrap().cell, "a_inv");
}

#[test]
fn taps_need_substrate_contacts() {
    let mut design = Design::new("nand2");
    design.add_cell(nand2("nand2"));
    design.add_cell(inverter("inv", false));
    let mut pass = StackLayoutPass::new(&*TECH, &unit_config()).unwrap();
    let err = pass.run(&design).unwrap_err();
    assert!(matches!(err.source(), ErrorSource::MissingSupplies));
    assert_eq!(err.context(), &[ErrorContext::WellTap("svt".into())]);
}
