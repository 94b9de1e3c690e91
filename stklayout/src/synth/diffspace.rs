//! The vertical separation between the NMOS and PMOS rows of a cell.

use std::cmp::max;

use super::SynthCtx;
use crate::error::Result;
use crate::stack::CellStacks;
use crate::tech::Flavor;

/// Computes the centre-to-centre distance between the two rows of every
/// dual stack of a cell.
///
/// The separation must hold opposite-polarity diffusion apart for every
/// flavor in use. If any gate position carries two different gate nets,
/// it must also fit two poly overhangs and a poly gap between the rows.
/// A cell without dual stacks needs no separation.
pub fn diff_separation(ctx: &SynthCtx<'_>, stacks: &CellStacks) -> Result<i64> {
    let poly = ctx.tech.poly();
    let mut spacing = 0;
    let mut poly_overhang = 0;
    let mut split_gates = false;
    let mut flavor: Option<Flavor> = None;

    for gp in stacks.dual.iter() {
        for pair in gp.pairs() {
            let n = pair.n.map(|pe| ctx.edge(pe.edge)).transpose()?;
            let p = pair.p.map(|pe| ctx.edge(pe.edge)).transpose()?;

            if let (Some(n), Some(p)) = (n, p) {
                poly_overhang = max(
                    poly_overhang,
                    max(
                        poly.overhang(ctx.length(n)),
                        poly.overhang(ctx.length(p)),
                    ),
                );
                split_gates |= n.gate != p.gate;
            }

            for edge in [n, p].into_iter().flatten() {
                if flavor != Some(edge.flavor) {
                    flavor = Some(edge.flavor);
                    let opp = ctx.device(edge)?.diff.opp_spacing(edge.flavor);
                    spacing = max(spacing, opp);
                }
            }
        }
    }

    if split_gates {
        spacing = max(
            spacing,
            2 * poly_overhang + max(poly.eol(), poly.spacing(0)),
        );
    }
    Ok(spacing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::{BasePair, Edge, GatePair, Netlist, PairEdge, SingleStack, StackLink};
    use crate::tech::MosKind;
    use crate::tests::{add_fet, add_fet_with_gate, sample_tech, LVT, SVT};

    #[test]
    fn single_stacks_need_no_separation() {
        let tech = sample_tech();
        let mut nl = Netlist::new();
        let (a, b) = (nl.add_node("a", false), nl.add_node("b", false));
        let e = add_fet(&mut nl, MosKind::Nmos, 3, a, b);
        let stacks = CellStacks {
            n: vec![SingleStack::new(
                vec![StackLink {
                    node: a,
                    edge: e,
                    fold: 0,
                }],
                b,
            )],
            ..Default::default()
        };
        let ctx = SynthCtx::new(&tech, &nl, 1);
        assert_eq!(diff_separation(&ctx, &stacks).unwrap(), 0);
        assert_eq!(diff_separation(&ctx, &CellStacks::default()).unwrap(), 0);
    }

    fn pair_stacks(nl: &mut Netlist, shared_gate: bool, p_flavor: Flavor) -> CellStacks {
        let d: Vec<_> = (0..4).map(|i| nl.add_node(format!("d{i}"), false)).collect();
        let gn = nl.add_node("gn", false);
        let gp = if shared_gate {
            gn
        } else {
            nl.add_node("gp", false)
        };
        let n = add_fet_with_gate(nl, MosKind::Nmos, 3, gn, d[0], d[1]);
        let p = nl.add_edge(Edge {
            kind: MosKind::Pmos,
            flavor: p_flavor,
            widths: vec![3],
            length: 2,
            gate: gp,
            a: d[2],
            b: d[3],
            keeper: false,
        });
        CellStacks {
            dual: vec![GatePair::base(
                Some(d[0]),
                Some(d[2]),
                BasePair::new(Some(PairEdge::new(n, 0)), Some(PairEdge::new(p, 0))),
            )],
            ..Default::default()
        }
    }

    #[test]
    fn shared_gate_uses_diffusion_spacing() {
        let tech = sample_tech();
        let mut nl = Netlist::new();
        let stacks = pair_stacks(&mut nl, true, SVT);
        let ctx = SynthCtx::new(&tech, &nl, 1);
        assert_eq!(diff_separation(&ctx, &stacks).unwrap(), 20);
    }

    #[test]
    fn split_gates_make_room_for_poly() {
        let mut tech = sample_tech();
        tech.poly_mut().overhang = rangetab::RangeTable::constant(10);
        let mut nl = Netlist::new();
        let stacks = pair_stacks(&mut nl, false, SVT);
        let ctx = SynthCtx::new(&tech, &nl, 1);
        // 2 * 10 + max(eol 3, spacing 3)
        assert_eq!(diff_separation(&ctx, &stacks).unwrap(), 23);
    }

    #[test]
    fn flavor_change_rechecks_spacing() {
        let tech = sample_tech();
        let mut nl = Netlist::new();
        let stacks = pair_stacks(&mut nl, true, LVT);
        let ctx = SynthCtx::new(&tech, &nl, 1);
        // svt nmos against svt is 20, lvt pmos against lvt is 24
        assert_eq!(diff_separation(&ctx, &stacks).unwrap(), 24);
    }
}
