//! Transistor-stack geometry synthesis.
//!
//! The pipeline for one stack is: [`transition`] plans the diffusion
//! between consecutive gates, [`emit`] draws one edge's rectangles, and
//! [`assemble`] walks a whole stack. [`diffspace`] chooses the vertical
//! distance between the NMOS and PMOS rows of a cell.

use crate::error::{ErrorSource, Result};
use crate::stack::{Edge, EdgeKey, Netlist, Node, NodeKey};
use crate::tech::error::RuleError;
use crate::tech::{DeviceRules, Technology};

pub mod assemble;
pub mod diffspace;
pub mod emit;
pub mod transition;

pub use self::assemble::{draw_dual_stack, draw_single_stack, row_centers, DrawnStack};
pub use self::diffspace::diff_separation;
pub use self::emit::StackBbox;

/// Everything the synthesizer reads while drawing the stacks of one cell.
///
/// The length scale lives here rather than in global state, so different
/// cells may be synthesized with different scales side by side.
#[derive(Clone, Copy)]
pub struct SynthCtx<'a> {
    pub tech: &'a dyn Technology,
    pub netlist: &'a Netlist,
    /// Design units per netlist length unit.
    pub scale: i64,
}

impl<'a> SynthCtx<'a> {
    pub fn new(tech: &'a dyn Technology, netlist: &'a Netlist, scale: i64) -> Self {
        Self {
            tech,
            netlist,
            scale,
        }
    }

    /// The drawn width of fold `fold` of `edge`.
    #[inline]
    pub fn width(&self, edge: &Edge, fold: usize) -> i64 {
        edge.width(fold) * self.scale
    }

    /// The drawn gate length of `edge`.
    #[inline]
    pub fn length(&self, edge: &Edge) -> i64 {
        edge.length * self.scale
    }

    pub fn edge(&self, key: EdgeKey) -> Result<&'a Edge> {
        self.netlist.edge(key).ok_or_else(|| {
            ErrorSource::InvalidStack("stack refers to an unknown transistor".into()).into()
        })
    }

    pub fn node(&self, key: NodeKey) -> Result<&'a Node> {
        self.netlist.node(key).ok_or_else(|| {
            ErrorSource::InvalidStack("stack refers to an unknown node".into()).into()
        })
    }

    /// The rule bundle for `edge`'s polarity and flavor.
    pub fn device(&self, edge: &Edge) -> Result<DeviceRules<'a>> {
        self.tech.device(edge.kind, edge.flavor).ok_or_else(|| {
            RuleError::MissingDevice {
                kind: edge.kind,
                flavor: edge.flavor,
            }
            .into()
        })
    }
}
