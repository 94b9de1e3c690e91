//! Walks whole stacks, driving [`emit_edge`] left to right.

use std::cmp::max;

use array_map::ArrayMap;

use super::emit::{emit_edge, EmitRequest, Row, RowDir, StackBbox};
use super::transition::{locate_fet, EdgeFlags, EdgeStep};
use super::SynthCtx;
use crate::error::{ErrorSource, Result};
use crate::layout::Layout;
use crate::stack::{GatePair, NodeKey, PairEdge, SingleStack};
use crate::tech::MosKind;

/// The geometry summary of one drawn stack.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct DrawnStack {
    pub bbox: StackBbox,
    /// The x coordinate at which both rows end.
    pub end: i64,
}

/// The centre lines `(yn, yp)` of the NMOS and PMOS rows of a dual stack
/// separated by `diffspace`.
#[inline]
pub fn row_centers(diffspace: i64) -> (i64, i64) {
    let yp = diffspace / 2;
    (yp - diffspace, yp)
}

fn invalid(msg: &str) -> ErrorSource {
    ErrorSource::InvalidStack(msg.to_string())
}

/// Draws a paired NMOS/PMOS stack, starting at x = 0.
///
/// Each row keeps its own cursor, previous edge and left node. Where both
/// rows have an edge at the same gate position, the row that would reach
/// its gate first is padded so the gates line up.
pub fn draw_dual_stack(
    ctx: &SynthCtx<'_>,
    layout: &mut Layout,
    gp: &GatePair,
    diffspace: i64,
) -> Result<DrawnStack> {
    let (yn, yp) = row_centers(diffspace);
    // IMPORTANT: the ordering of array elements here must match
    // the ordering of variants in the [`MosKind`] enum.
    let rows: ArrayMap<MosKind, Row, 2> =
        ArrayMap::new([Row::new(yn, RowDir::Down), Row::new(yp, RowDir::Up)]);

    let mut bbox = StackBbox::new();
    let mut cursor: ArrayMap<MosKind, i64, 2> = ArrayMap::default();
    let mut prev: ArrayMap<MosKind, Option<PairEdge>, 2> = ArrayMap::default();
    let mut left: ArrayMap<MosKind, Option<NodeKey>, 2> = ArrayMap::default();

    let pairs = gp.pairs();
    for (i, pair) in pairs.iter().enumerate() {
        let next = pairs.get(i + 1);
        let mut steps: ArrayMap<MosKind, Option<EdgeStep>, 2> = ArrayMap::default();
        for kind in MosKind::ALL {
            let Some(pe) = pair.get(kind) else {
                continue;
            };
            let node = match (left[kind], prev[kind]) {
                (Some(node), Some(p)) => ctx
                    .edge(p.edge)?
                    .other(node)
                    .ok_or_else(|| invalid("diffusion chain is not connected"))?,
                (None, _) => gp
                    .left(kind)
                    .ok_or_else(|| invalid("paired row has no left node"))?,
                (Some(_), None) => {
                    return Err(ErrorSource::Internal(
                        "row has a left node but no previous edge".into(),
                    )
                    .into())
                }
            };
            left[kind] = Some(node);
            steps[kind] = Some(EdgeStep {
                edge: pe.edge,
                fold: pe.fold,
                prev: prev[kind],
                left: node,
                flags: EdgeFlags {
                    left: prev[kind].is_none(),
                    right: next.map_or(true, |n| !n.has(kind)),
                },
            });
        }

        let mut pad: ArrayMap<MosKind, i64, 2> = ArrayMap::default();
        if let (Some(n), Some(p)) = (steps[MosKind::Nmos], steps[MosKind::Pmos]) {
            let gate_n = locate_fet(ctx, &n, cursor[MosKind::Nmos])?;
            let gate_p = locate_fet(ctx, &p, cursor[MosKind::Pmos])?;
            if gate_n > gate_p {
                pad[MosKind::Pmos] = gate_n - gate_p;
            } else {
                pad[MosKind::Nmos] = gate_p - gate_n;
            }
        }

        for kind in MosKind::ALL {
            let Some(step) = steps[kind] else {
                continue;
            };
            let other = kind.other();
            cursor[kind] = emit_edge(
                ctx,
                layout,
                &mut bbox,
                &EmitRequest {
                    step,
                    pad: pad[kind],
                    x: cursor[kind],
                    row: rows[kind],
                    opposing: pair.get(other).map(|o| (o.edge, rows[other].y)),
                },
            )?;
            prev[kind] = pair.get(kind);
            if !pair.has(other) {
                cursor[other] = cursor[kind];
            }
        }
    }

    Ok(DrawnStack {
        bbox,
        end: max(cursor[MosKind::Nmos], cursor[MosKind::Pmos]),
    })
}

/// Draws a single-polarity stack on the line y = 0, starting at x = 0.
pub fn draw_single_stack(
    ctx: &SynthCtx<'_>,
    layout: &mut Layout,
    stack: &SingleStack,
) -> Result<DrawnStack> {
    let mut bbox = StackBbox::new();
    let mut x = 0;
    let links = &stack.links;
    for (i, link) in links.iter().enumerate() {
        let step = EdgeStep {
            edge: link.edge,
            fold: link.fold,
            prev: i
                .checked_sub(1)
                .map(|j| PairEdge::new(links[j].edge, links[j].fold)),
            left: link.node,
            flags: EdgeFlags {
                left: i == 0,
                right: i + 1 == links.len(),
            },
        };
        x = emit_edge(
            ctx,
            layout,
            &mut bbox,
            &EmitRequest {
                step,
                pad: 0,
                x,
                row: Row::new(0, RowDir::Up),
                opposing: None,
            },
        )?;
    }
    Ok(DrawnStack { bbox, end: x })
}

#[cfg(test)]
mod tests {
    use stkgeom::bbox::Bbox;
    use stkgeom::{Point, Rect};

    use super::*;
    use crate::layout::LayerTag;
    use crate::stack::{BasePair, Netlist, StackLink};
    use crate::tech::{TechDb, Technology};
    use crate::tests::{add_fet, add_fet_with_gate, sample_tech, STRICTER, SVT};

    /// An NMOS stack with the given widths, every node carrying `contacts`.
    fn nmos_stack(widths: &[i64], contacts: bool) -> (Netlist, SingleStack) {
        let mut nl = Netlist::new();
        let mut node = nl.add_node("n0", contacts);
        let mut links = Vec::new();
        for (i, &w) in widths.iter().enumerate() {
            let next = nl.add_node(format!("n{}", i + 1), contacts);
            let edge = add_fet(&mut nl, MosKind::Nmos, w, node, next);
            links.push(StackLink {
                node,
                edge,
                fold: 0,
            });
            node = next;
        }
        (nl, SingleStack::new(links, node))
    }

    fn stack_length(tech: &TechDb, nl: &Netlist, stack: &SingleStack) -> i64 {
        let ctx = SynthCtx::new(tech, nl, 1);
        draw_single_stack(&ctx, &mut Layout::new(), stack)
            .unwrap()
            .end
    }

    #[test]
    fn row_centers_split_separation() {
        assert_eq!(row_centers(0), (0, 0));
        assert_eq!(row_centers(21), (-11, 10));
        assert_eq!(row_centers(20), (-10, 10));
    }

    #[test]
    fn equal_width_single_stack_length() {
        let tech = sample_tech();
        let mut nl = Netlist::new();
        let (a, b, c) = (
            nl.add_node("a", false),
            nl.add_node("b", false),
            nl.add_node("c", false),
        );
        let e1 = add_fet(&mut nl, MosKind::Nmos, 3, a, b);
        let e2 = add_fet(&mut nl, MosKind::Nmos, 3, b, c);
        let stack = SingleStack::new(
            vec![
                StackLink {
                    node: a,
                    edge: e1,
                    fold: 0,
                },
                StackLink {
                    node: b,
                    edge: e2,
                    fold: 0,
                },
            ],
            c,
        );
        let ctx = SynthCtx::new(&tech, &nl, 1);
        let mut layout = Layout::new();
        let drawn = draw_single_stack(&ctx, &mut layout, &stack).unwrap();
        // overhang + gate + max(fet, poly spacing) + gate + overhang
        assert_eq!(drawn.end, 5 + 2 + 4 + 2 + 5);
        assert_eq!(drawn.bbox.get(MosKind::Nmos).width(), drawn.end);
        assert!(drawn.bbox.get(MosKind::Pmos).is_empty());
        let diffs = layout
            .elems()
            .iter()
            .filter(|e| e.layer.is_diff())
            .count();
        assert_eq!(diffs, 3);
    }

    #[test]
    fn notch_up_then_down() {
        let tech = sample_tech();
        let (nl, stack) = nmos_stack(&[2, 4, 2], false);
        let ctx = SynthCtx::new(&tech, &nl, 1);
        let mut layout = Layout::new();
        let drawn = draw_single_stack(&ctx, &mut layout, &stack).unwrap();

        let diffs: Vec<Rect> = layout
            .elems()
            .iter()
            .filter(|e| e.layer.is_diff())
            .map(|e| e.rect)
            .collect();
        assert_eq!(
            diffs,
            vec![
                Rect::from_extent(0, 0, 5, 2),
                // up: spacing at the narrow width, then overhang at the wide one
                Rect::from_extent(7, 0, 4, 2),
                Rect::from_extent(11, 0, 5, 4),
                // down: overhang at the wide width, then notch spacing
                Rect::from_extent(18, 0, 5, 4),
                Rect::from_extent(23, 0, 4, 2),
                Rect::from_extent(29, 0, 5, 2),
            ]
        );

        let rules = tech.device(MosKind::Nmos, SVT).unwrap();
        let diff = rules.diff;
        let gate = 2;
        let spc = rules.fet.spacing(gate).max(tech.poly().spacing(gate));
        let expected = diff.overhang(2)
            + gate
            + diff.notch_spacing().max(spc)
            + diff.overhang(4)
            + gate
            + diff.overhang(4)
            + diff.notch_spacing()
            + gate
            + diff.overhang(2);
        assert_eq!(drawn.end, expected);
        assert_eq!(drawn.end, 34);
        assert_eq!(
            drawn.bbox.get(MosKind::Nmos),
            Bbox::new(Point::new(0, 0), Point::new(34, 4))
        );
    }

    #[test]
    fn stricter_rules_never_shorten_stacks() {
        let base = sample_tech();
        for contacts in [false, true] {
            let (nl, stack) = nmos_stack(&[3, 3, 5, 3], contacts);
            let before = stack_length(&base, &nl, &stack);
            for (rule, stricter) in STRICTER.iter().enumerate() {
                let mut tech = sample_tech();
                stricter(&mut tech);
                let after = stack_length(&tech, &nl, &stack);
                assert!(after >= before, "rule {rule}: {after} < {before}");
            }
        }
    }

    #[test]
    fn lagging_row_is_padded_once() {
        let tech = sample_tech();
        let mut nl = Netlist::new();
        let (n0, n1, n2) = (
            nl.add_node("n0", false),
            nl.add_node("n1", false),
            nl.add_node("n2", false),
        );
        let (p0, p1) = (nl.add_node("p0", true), nl.add_node("p1", false));
        let g = nl.add_node("g", false);
        let na = add_fet(&mut nl, MosKind::Nmos, 2, n0, n1);
        let nb = add_fet_with_gate(&mut nl, MosKind::Nmos, 2, g, n1, n2);
        let pb = add_fet_with_gate(&mut nl, MosKind::Pmos, 4, g, p0, p1);
        let gp = GatePair::composite(
            Some(n0),
            Some(p0),
            vec![
                BasePair::new(Some(PairEdge::new(na, 0)), None),
                BasePair::new(Some(PairEdge::new(nb, 0)), Some(PairEdge::new(pb, 0))),
            ],
        );
        let ctx = SynthCtx::new(&tech, &nl, 1);
        let mut layout = Layout::new();
        let drawn = draw_dual_stack(&ctx, &mut layout, &gp, 20).unwrap();

        // the p row starts where the first n gate ends, and the n row is
        // padded so the shared gate lines up at x = 14
        assert_eq!(drawn.end, 21);
        let diffs = |kind: MosKind| -> Vec<(i64, i64)> {
            layout
                .elems()
                .iter()
                .filter(|e| e.layer == LayerTag::Diff { kind, flavor: SVT })
                .map(|e| (e.rect.left(), e.rect.right()))
                .collect()
        };
        assert_eq!(diffs(MosKind::Nmos), vec![(0, 5), (7, 14), (16, 21)]);
        assert_eq!(diffs(MosKind::Pmos), vec![(7, 14), (16, 21)]);

        let fets: Vec<_> = layout
            .elems()
            .iter()
            .filter(|e| matches!(e.layer, LayerTag::Fet { .. }))
            .map(|e| e.rect.left())
            .collect();
        assert_eq!(fets, vec![5, 14, 14]);
        assert_eq!(drawn.bbox.get(MosKind::Pmos).p0.y, 10);
        assert_eq!(drawn.bbox.get(MosKind::Nmos).p1.y, -10);
    }

    #[test]
    fn rows_end_aligned() {
        let tech = sample_tech();
        let mut nl = Netlist::new();
        let (n0, n1) = (nl.add_node("n0", false), nl.add_node("n1", true));
        let (p0, p1, p2) = (
            nl.add_node("p0", false),
            nl.add_node("p1", false),
            nl.add_node("p2", true),
        );
        let na = add_fet(&mut nl, MosKind::Nmos, 3, n0, n1);
        let pa = add_fet(&mut nl, MosKind::Pmos, 3, p0, p1);
        let pb = add_fet(&mut nl, MosKind::Pmos, 5, p1, p2);
        let gp = GatePair::composite(
            Some(n0),
            Some(p0),
            vec![
                BasePair::new(Some(PairEdge::new(na, 0)), Some(PairEdge::new(pa, 0))),
                BasePair::new(None, Some(PairEdge::new(pb, 0))),
            ],
        );
        let ctx = SynthCtx::new(&tech, &nl, 1);
        let mut layout = Layout::new();
        let drawn = draw_dual_stack(&ctx, &mut layout, &gp, 24).unwrap();
        let n_end = drawn.bbox.get(MosKind::Nmos).p1.x;
        let p_end = drawn.bbox.get(MosKind::Pmos).p1.x;
        assert_eq!(drawn.end, n_end.max(p_end));
        // p continues past the n row's closing diffusion
        assert!(p_end > n_end);
    }
}
