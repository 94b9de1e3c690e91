//! Plans the diffusion that separates consecutive gates of a stack.
//!
//! Planning is pure: it reads rules and the netlist but draws nothing, so a
//! dual stack can plan both rows before deciding how to pad them.

use std::cmp::{max, Ordering};

use super::SynthCtx;
use crate::error::{ErrorSource, Result};
use crate::stack::{Edge, EdgeKey, NodeKey, PairEdge};
use crate::tech::error::RuleError;

/// Whether an edge sits at either end of its row.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct EdgeFlags {
    pub left: bool,
    pub right: bool,
}

/// One edge to be placed, together with what lies to its left.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct EdgeStep {
    pub edge: EdgeKey,
    pub fold: usize,
    /// The previous edge of the same row; `None` at the left boundary.
    pub prev: Option<PairEdge>,
    /// The diffusion node shared with `prev`, or the row's first node.
    pub left: NodeKey,
    pub flags: EdgeFlags,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Transition {
    /// First edge of a row.
    Boundary,
    /// Same width as the previous edge.
    Flat,
    /// Wider than the previous edge.
    UpNotch,
    /// Narrower than the previous edge.
    DownNotch,
}

/// The diffusion to draw before an edge's gate.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TransitionPlan {
    pub transition: Transition,
    /// Drawn width of the edge itself.
    pub width: i64,
    /// Length of the first diffusion rectangle.
    pub first: i64,
    /// Height of the first diffusion rectangle.
    ///
    /// Across a notch this is the previous edge's width.
    pub first_width: i64,
    /// Length of the full-width rectangle that follows a notch.
    pub second: Option<i64>,
}

impl TransitionPlan {
    #[inline]
    pub fn is_notch(&self) -> bool {
        matches!(
            self.transition,
            Transition::UpNotch | Transition::DownNotch
        )
    }

    /// Horizontal distance from the previous feature to the gate.
    #[inline]
    pub fn total(&self) -> i64 {
        self.first + self.second.unwrap_or_default()
    }
}

pub(crate) fn positive(what: &'static str, edge: &Edge, width: i64, value: i64) -> Result<i64> {
    if value > 0 {
        Ok(value)
    } else {
        Err(RuleError::NonPositive {
            what,
            kind: edge.kind,
            width,
            value,
        }
        .into())
    }
}

/// Plans the diffusion between the previous feature and `step`'s gate.
///
/// # Errors
///
/// Returns [`RuleError::NonPositive`] if the rules produce a zero or
/// negative distance, and [`RuleError::MissingDevice`] if the edge has no
/// rule bundle.
pub fn resolve(ctx: &SynthCtx<'_>, step: &EdgeStep) -> Result<TransitionPlan> {
    let edge = ctx.edge(step.edge)?;
    let rules = ctx.device(edge)?;
    let left = ctx.node(step.left)?;
    let diff = rules.diff;
    let width = ctx.width(edge, step.fold);

    if step.flags.left {
        let first = positive(
            "left diffusion overhang",
            edge,
            width,
            diff.eff_overhang(width, left.contact),
        )?;
        return Ok(TransitionPlan {
            transition: Transition::Boundary,
            width,
            first,
            first_width: width,
            second: None,
        });
    }

    let prev = step.prev.ok_or_else(|| {
        ErrorSource::Internal("interior edge of a stack has no predecessor".into())
    })?;
    let prev_edge = ctx.edge(prev.edge)?;
    let prev_width = ctx.width(prev_edge, prev.fold);

    let poly = ctx.tech.poly();
    let spc = [ctx.length(prev_edge), ctx.length(edge)]
        .into_iter()
        .map(|len| max(rules.fet.spacing(len), poly.spacing(len)))
        .max()
        .unwrap_or_default();

    // A contact between a gate and a notch must still fit between gates.
    let notch = if left.contact {
        max(
            diff.notch_spacing(),
            diff.via_space_mid() - diff.overhang(width),
        )
    } else {
        diff.notch_spacing()
    };

    let (transition, first, second) = match width.cmp(&prev_width) {
        Ordering::Equal => {
            let first = if left.contact {
                max(spc, diff.via_space_mid())
            } else {
                spc
            };
            (Transition::Flat, first, None)
        }
        Ordering::Greater => (
            Transition::UpNotch,
            max(notch, spc),
            Some(diff.overhang(width)),
        ),
        Ordering::Less => (
            Transition::DownNotch,
            diff.overhang(width),
            Some(notch),
        ),
    };

    let first = positive("diffusion spacing", edge, width, first)?;
    let second = second
        .map(|v| positive("notch diffusion length", edge, width, v))
        .transpose()?;

    Ok(TransitionPlan {
        transition,
        width,
        first,
        first_width: if second.is_some() { prev_width } else { width },
        second,
    })
}

/// Returns the position of `step`'s gate if the previous feature ends at `x`.
pub fn locate_fet(ctx: &SynthCtx<'_>, step: &EdgeStep, x: i64) -> Result<i64> {
    Ok(x + resolve(ctx, step)?.total())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::Netlist;
    use crate::tech::{MosKind, TechDb};
    use crate::tests::{add_fet, sample_tech, STRICTER, SVT};

    struct Chain {
        nl: Netlist,
        nodes: Vec<NodeKey>,
        edges: Vec<EdgeKey>,
    }

    /// An NMOS chain with the given widths.
    fn chain(widths: &[i64], contacts: bool) -> Chain {
        let mut nl = Netlist::new();
        let mut nodes = vec![nl.add_node("n0", contacts)];
        let mut edges = Vec::new();
        for (i, &w) in widths.iter().enumerate() {
            let next = nl.add_node(format!("n{}", i + 1), contacts);
            edges.push(add_fet(&mut nl, MosKind::Nmos, w, nodes[i], next));
            nodes.push(next);
        }
        Chain { nl, nodes, edges }
    }

    fn step(c: &Chain, i: usize) -> EdgeStep {
        EdgeStep {
            edge: c.edges[i],
            fold: 0,
            prev: i.checked_sub(1).map(|j| PairEdge::new(c.edges[j], 0)),
            left: c.nodes[i],
            flags: EdgeFlags {
                left: i == 0,
                right: i + 1 == c.edges.len(),
            },
        }
    }

    fn plan(tech: &TechDb, c: &Chain, i: usize) -> Result<TransitionPlan> {
        resolve(&SynthCtx::new(tech, &c.nl, 1), &step(c, i))
    }

    #[test]
    fn left_boundary_uses_overhang() {
        let tech = sample_tech();
        let c = chain(&[4], false);
        assert_eq!(plan(&tech, &c, 0).unwrap().total(), 5);
        let c = chain(&[4], true);
        let p = plan(&tech, &c, 0).unwrap();
        assert_eq!(p.transition, Transition::Boundary);
        assert_eq!(p.total(), 7);
    }

    #[test]
    fn equal_widths_use_gate_spacing() {
        let tech = sample_tech();
        let c = chain(&[4, 4], false);
        let p = plan(&tech, &c, 1).unwrap();
        assert_eq!(p.transition, Transition::Flat);
        assert_eq!((p.first, p.second), (4, None));

        let c = chain(&[4, 4], true);
        assert_eq!(plan(&tech, &c, 1).unwrap().first, 8);
    }

    #[test]
    fn notches_need_two_rectangles() {
        let tech = sample_tech();
        let c = chain(&[2, 4, 2], false);

        let up = plan(&tech, &c, 1).unwrap();
        assert_eq!(up.transition, Transition::UpNotch);
        assert_eq!((up.first, up.first_width, up.second), (4, 2, Some(5)));

        let down = plan(&tech, &c, 2).unwrap();
        assert_eq!(down.transition, Transition::DownNotch);
        assert_eq!((down.first, down.first_width, down.second), (5, 4, Some(4)));
    }

    #[test]
    fn non_positive_spacing_is_fatal() {
        let mut tech = sample_tech();
        tech.device_rules_mut(MosKind::Nmos, SVT)
            .unwrap()
            .diff
            .notch_spacing = 0;
        let c = chain(&[4, 2], false);
        let err = plan(&tech, &c, 1).unwrap_err();
        assert!(matches!(
            err.source(),
            ErrorSource::Rule(RuleError::NonPositive { value: 0, .. })
        ));
    }

    #[test]
    fn larger_spacing_never_shortens() {
        let base = sample_tech();
        for contacts in [false, true] {
            let c = chain(&[3, 3, 5, 3], contacts);
            for (rule, stricter) in STRICTER.iter().enumerate() {
                let mut tech = sample_tech();
                stricter(&mut tech);
                for i in 0..c.edges.len() {
                    let a = plan(&base, &c, i).unwrap().total();
                    let b = plan(&tech, &c, i).unwrap().total();
                    assert!(b >= a, "rule {rule}, edge {i}: {b} < {a}");
                }
            }
        }
    }

    #[test]
    fn locate_adds_transition_to_cursor() {
        let tech = sample_tech();
        let c = chain(&[4, 4], false);
        let ctx = SynthCtx::new(&tech, &c.nl, 1);
        assert_eq!(locate_fet(&ctx, &step(&c, 1), 11).unwrap(), 15);
    }
}
