#![allow(dead_code)]

use std::path::PathBuf;

use lazy_static::lazy_static;
use stklayout::design::{Circuit, Design, Instance};
use stklayout::stack::{BasePair, CellStacks, Edge, GatePair, Netlist, NodeKey, PairEdge, Port};
use stklayout::tech::{Flavor, MosKind, TechDb};
use stklayout::LayoutConfig;

pub const DATA_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/data/tests");

pub const SVT: Flavor = Flavor::new(0);
pub const LVT: Flavor = Flavor::new(1);

lazy_static! {
    pub static ref TECH: TechDb =
        TechDb::from_toml_file(PathBuf::from(DATA_DIR).join("tech.toml")).unwrap();
}

/// A configuration with one design unit per netlist length unit.
pub fn unit_config() -> LayoutConfig {
    LayoutConfig::builder().lambda(10e-9).build().unwrap()
}

pub fn fet(kind: MosKind, width: i64, gate: NodeKey, a: NodeKey, b: NodeKey) -> Edge {
    Edge {
        kind,
        flavor: SVT,
        widths: vec![width],
        length: 2,
        gate,
        a,
        b,
        keeper: false,
    }
}

fn port(name: &str, net: NodeKey, input: bool) -> Port {
    Port {
        name: name.into(),
        net: Some(net),
        input,
        omit: false,
    }
}

/// The supply nets of a sample cell.
pub struct Supplies {
    pub vdd: NodeKey,
    pub gnd: NodeKey,
}

fn supplies(nl: &mut Netlist, substrate_contacts: bool) -> Supplies {
    let vdd = nl.add_node("vdd", true);
    let gnd = nl.add_node("gnd", true);
    nl.set_supplies(Some(vdd), Some(gnd));
    if substrate_contacts {
        nl.set_substrate_contacts(Some(gnd), Some(vdd));
    }
    Supplies { vdd, gnd }
}

/// An inverter with input `a` and output `y`, as one dual stack.
pub fn inverter(name: &str, substrate_contacts: bool) -> Circuit {
    let mut nl = Netlist::new();
    let Supplies { vdd, gnd } = supplies(&mut nl, substrate_contacts);
    let a = nl.add_node("a", false);
    let y = nl.add_node("y", true);
    let n = nl.add_edge(fet(MosKind::Nmos, 4, a, gnd, y));
    let p = nl.add_edge(fet(MosKind::Pmos, 6, a, vdd, y));
    nl.add_port(port("a", a, true));
    nl.add_port(port("y", y, false));

    let stacks = CellStacks {
        dual: vec![GatePair::base(
            Some(gnd),
            Some(vdd),
            BasePair::new(Some(PairEdge::new(n, 0)), Some(PairEdge::new(p, 0))),
        )],
        ..Default::default()
    };
    Circuit::new(name, nl, stacks)
}

/// A two-input NAND: series NMOS, parallel PMOS sharing the output.
pub fn nand2(name: &str) -> Circuit {
    let mut nl = Netlist::new();
    let Supplies { vdd, gnd } = supplies(&mut nl, false);
    let a = nl.add_node("a", false);
    let b = nl.add_node("b", false);
    let y = nl.add_node("y", true);
    let mid = nl.add_node("mid", false);
    let na = nl.add_edge(fet(MosKind::Nmos, 4, a, gnd, mid));
    let nb = nl.add_edge(fet(MosKind::Nmos, 4, b, mid, y));
    let pa = nl.add_edge(fet(MosKind::Pmos, 4, a, vdd, y));
    let pb = nl.add_edge(fet(MosKind::Pmos, 4, b, y, vdd));
    nl.add_port(port("a", a, true));
    nl.add_port(port("b", b, true));
    nl.add_port(port("y", y, false));

    let stacks = CellStacks {
        dual: vec![GatePair::composite(
            Some(gnd),
            Some(vdd),
            vec![
                BasePair::new(Some(PairEdge::new(na, 0)), Some(PairEdge::new(pa, 0))),
                BasePair::new(Some(PairEdge::new(nb, 0)), Some(PairEdge::new(pb, 0))),
            ],
        )],
        ..Default::default()
    };
    Circuit::new(name, nl, stacks)
}

/// A cell holding a single keeper transistor.
pub fn keeper(name: &str) -> Circuit {
    let mut nl = Netlist::new();
    let Supplies { vdd, .. } = supplies(&mut nl, false);
    let a = nl.add_node("a", false);
    let y = nl.add_node("y", true);
    let k = nl.add_edge(Edge {
        keeper: true,
        ..fet(MosKind::Pmos, 2, a, vdd, y)
    });
    let stacks = CellStacks {
        dual: vec![GatePair::base(
            None,
            Some(vdd),
            BasePair::new(None, Some(PairEdge::new(k, 0))),
        )],
        ..Default::default()
    };
    Circuit::new(name, nl, stacks)
}

/// `top` instantiates two inverters and a NAND; the NAND itself has an
/// inverter inside.
pub fn sample_design() -> Design {
    let mut design = Design::new("top");
    let mut top = Circuit::new("top", Netlist::new(), CellStacks::default());
    top.add_instance(Instance::new("x0", "inv"));
    top.add_instance(Instance::new("x1", "inv"));
    top.add_instance(Instance::new("x2", "nand2"));
    let mut nand = nand2("nand2");
    nand.add_instance(Instance::new("x0", "inv"));
    design.add_cell(top);
    design.add_cell(nand);
    design.add_cell(inverter("inv", true));
    design.add_cell(keeper("keeper"));
    design
}
