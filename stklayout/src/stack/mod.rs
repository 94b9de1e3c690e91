//! The transistor-stack intermediate representation.
//!
//! A [`Netlist`] owns the nodes and transistor edges of one cell. The
//! [`CellStacks`] of a cell order those edges into diffusion chains: paired
//! NMOS/PMOS rows ([`GatePair`]) and single-polarity chains ([`SingleStack`]).
//! Both are produced upstream and only read during layout synthesis.

use arcstr::ArcStr;
use array_map::ArrayMap;
use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};

use crate::tech::{Flavor, MosKind};

pub mod validation;

new_key_type! {
    /// A key identifying a net of a [`Netlist`].
    pub struct NodeKey;
    /// A key identifying a transistor of a [`Netlist`].
    pub struct EdgeKey;
}

/// A net, or a diffusion terminal shared by adjacent transistors.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: ArcStr,
    /// Whether the diffusion at this node carries a contact.
    pub contact: bool,
}

/// A transistor.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub kind: MosKind,
    pub flavor: Flavor,
    /// Electrical width of each fold of the device, in netlist units.
    pub widths: Vec<i64>,
    /// Gate length, in netlist units.
    pub length: i64,
    pub gate: NodeKey,
    pub a: NodeKey,
    pub b: NodeKey,
    /// Weak (keeper) device.
    pub keeper: bool,
}

impl Edge {
    /// Returns the width of fold `fold`.
    ///
    /// Out-of-range folds fall back to the last listed width.
    pub fn width(&self, fold: usize) -> i64 {
        self.widths
            .get(fold)
            .or_else(|| self.widths.last())
            .copied()
            .unwrap_or_default()
    }

    /// Returns `true` if `node` is a diffusion terminal of this edge.
    #[inline]
    pub fn touches(&self, node: NodeKey) -> bool {
        self.a == node || self.b == node
    }

    /// Given one diffusion terminal, returns the other.
    pub fn other(&self, node: NodeKey) -> Option<NodeKey> {
        if self.a == node {
            Some(self.b)
        } else if self.b == node {
            Some(self.a)
        } else {
            None
        }
    }
}

/// An interface port of a cell.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub name: ArcStr,
    /// The local net connected to this port.
    ///
    /// `None` if the port only passes through the cell.
    pub net: Option<NodeKey>,
    pub input: bool,
    /// Excluded from pin generation.
    pub omit: bool,
}

/// The transistor-level netlist of one cell.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Netlist {
    nodes: SlotMap<NodeKey, Node>,
    edges: SlotMap<EdgeKey, Edge>,
    ports: Vec<Port>,
    globals: Vec<NodeKey>,
    vdd: Option<NodeKey>,
    gnd: Option<NodeKey>,
    psc: Option<NodeKey>,
    nsc: Option<NodeKey>,
    weak_supply_vdd: usize,
    weak_supply_gnd: usize,
}

impl Netlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, name: impl Into<ArcStr>, contact: bool) -> NodeKey {
        self.nodes.insert(Node {
            name: name.into(),
            contact,
        })
    }

    pub fn add_edge(&mut self, edge: Edge) -> EdgeKey {
        self.edges.insert(edge)
    }

    pub fn add_port(&mut self, port: Port) {
        self.ports.push(port);
    }

    pub fn add_global(&mut self, net: NodeKey) {
        self.globals.push(net);
    }

    pub fn set_supplies(&mut self, vdd: Option<NodeKey>, gnd: Option<NodeKey>) {
        self.vdd = vdd;
        self.gnd = gnd;
    }

    /// Sets the nets used for n-well (`nsc`) and substrate (`psc`) contacts.
    pub fn set_substrate_contacts(&mut self, psc: Option<NodeKey>, nsc: Option<NodeKey>) {
        self.psc = psc;
        self.nsc = nsc;
    }

    pub fn set_weak_supplies(&mut self, vdd: usize, gnd: usize) {
        self.weak_supply_vdd = vdd;
        self.weak_supply_gnd = gnd;
    }

    #[inline]
    pub fn node(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    #[inline]
    pub fn edge(&self, key: EdgeKey) -> Option<&Edge> {
        self.edges.get(key)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeKey, &Node)> {
        self.nodes.iter()
    }

    pub fn edges(&self) -> impl Iterator<Item = (EdgeKey, &Edge)> {
        self.edges.iter()
    }

    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Finds a node by name.
    pub fn find_node(&self, name: &str) -> Option<NodeKey> {
        self.nodes
            .iter()
            .find(|(_, n)| n.name == name)
            .map(|(k, _)| k)
    }

    #[inline]
    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    #[inline]
    pub fn globals(&self) -> &[NodeKey] {
        &self.globals
    }

    #[inline]
    pub fn vdd(&self) -> Option<NodeKey> {
        self.vdd
    }

    #[inline]
    pub fn gnd(&self) -> Option<NodeKey> {
        self.gnd
    }

    #[inline]
    pub fn psc(&self) -> Option<NodeKey> {
        self.psc
    }

    #[inline]
    pub fn nsc(&self) -> Option<NodeKey> {
        self.nsc
    }

    /// Returns `true` if this netlist exposes both substrate-contact nets.
    #[inline]
    pub fn has_substrate_contacts(&self) -> bool {
        self.psc.is_some() && self.nsc.is_some()
    }

    #[inline]
    pub fn weak_supply_vdd(&self) -> usize {
        self.weak_supply_vdd
    }

    #[inline]
    pub fn weak_supply_gnd(&self) -> usize {
        self.weak_supply_gnd
    }

    /// Returns `true` if any transistor has `node` as a diffusion terminal.
    pub fn has_diffusion_edges(&self, node: NodeKey) -> bool {
        self.edges.values().any(|e| e.touches(node))
    }

    /// Returns `true` if the netlist has transistors and all of them are keepers.
    pub fn is_keeper_only(&self) -> bool {
        !self.edges.is_empty() && self.edges.values().all(|e| e.keeper)
    }

    /// Counts standard and keeper transistors.
    pub fn fet_counts(&self) -> (usize, usize) {
        let keepers = self.edges.values().filter(|e| e.keeper).count();
        (self.edges.len() - keepers, keepers)
    }
}

/// One link of a single-polarity diffusion chain: a node, followed by the
/// transistor to its right.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct StackLink {
    pub node: NodeKey,
    pub edge: EdgeKey,
    /// Which fold of the edge this position uses.
    pub fold: usize,
}

/// A chain of series transistors of one polarity.
///
/// The chain reads `links[0].node, links[0].edge, links[1].node, ..., end`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct SingleStack {
    pub links: Vec<StackLink>,
    pub end: NodeKey,
}

impl SingleStack {
    pub fn new(links: Vec<StackLink>, end: NodeKey) -> Self {
        Self { links, end }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// The node to the right of link `i`.
    pub fn right_of(&self, i: usize) -> NodeKey {
        self.links.get(i + 1).map(|l| l.node).unwrap_or(self.end)
    }
}

/// A transistor placed at one gate position of a paired stack.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct PairEdge {
    pub edge: EdgeKey,
    pub fold: usize,
}

impl PairEdge {
    pub fn new(edge: EdgeKey, fold: usize) -> Self {
        Self { edge, fold }
    }
}

/// One aligned gate position of a paired stack. Either row may be absent.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct BasePair {
    pub n: Option<PairEdge>,
    pub p: Option<PairEdge>,
}

impl BasePair {
    pub fn new(n: Option<PairEdge>, p: Option<PairEdge>) -> Self {
        Self { n, p }
    }

    #[inline]
    pub fn get(&self, kind: MosKind) -> Option<PairEdge> {
        match kind {
            MosKind::Nmos => self.n,
            MosKind::Pmos => self.p,
        }
    }

    #[inline]
    pub fn has(&self, kind: MosKind) -> bool {
        self.get(kind).is_some()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.n.is_some() && self.p.is_some()
    }
}

/// A paired NMOS/PMOS stack.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum GatePair {
    /// A single aligned gate position.
    Base {
        left: ArrayMap<MosKind, Option<NodeKey>, 2>,
        pair: BasePair,
    },
    /// An ordered sequence of aligned gate positions.
    Composite {
        left: ArrayMap<MosKind, Option<NodeKey>, 2>,
        pairs: Vec<BasePair>,
    },
}

impl GatePair {
    pub fn base(left_n: Option<NodeKey>, left_p: Option<NodeKey>, pair: BasePair) -> Self {
        // IMPORTANT: the ordering of array elements here must match
        // the ordering of variants in the [`MosKind`] enum.
        Self::Base {
            left: ArrayMap::new([left_n, left_p]),
            pair,
        }
    }

    pub fn composite(
        left_n: Option<NodeKey>,
        left_p: Option<NodeKey>,
        pairs: Vec<BasePair>,
    ) -> Self {
        Self::Composite {
            left: ArrayMap::new([left_n, left_p]),
            pairs,
        }
    }

    /// The leftmost diffusion node of row `kind`.
    pub fn left(&self, kind: MosKind) -> Option<NodeKey> {
        match self {
            Self::Base { left, .. } | Self::Composite { left, .. } => left[kind],
        }
    }

    /// The gate positions of this stack, left to right.
    pub fn pairs(&self) -> &[BasePair] {
        match self {
            Self::Base { pair, .. } => std::slice::from_ref(pair),
            Self::Composite { pairs, .. } => pairs,
        }
    }
}

/// All stacks of one cell.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct CellStacks {
    pub dual: Vec<GatePair>,
    pub n: Vec<SingleStack>,
    pub p: Vec<SingleStack>,
}

impl CellStacks {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dual.is_empty() && self.n.is_empty() && self.p.is_empty()
    }
}
