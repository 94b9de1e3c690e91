//! The technology rule facade.
//!
//! The synthesizer never owns design rules. It asks a [`Technology`] for the
//! spacing, overhang and notch distances of each device it places. [`TechDb`]
//! is a TOML-backed implementation suitable for tests and small flows.

use std::fmt::Display;

use array_map::Indexable;
use serde::{Deserialize, Serialize};

use crate::layout::LayerTag;

pub mod db;
pub mod error;
pub mod rules;

pub use self::db::TechDb;
use self::rules::{DiffRules, FetRules, PolyRules, RoutingRules, WellDiffRules, WellRules};

/// The polarity of a transistor.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
#[derive(Indexable)]
pub enum MosKind {
    Nmos,
    Pmos,
}

impl MosKind {
    /// Returns the opposite polarity.
    #[inline]
    pub fn other(self) -> Self {
        match self {
            Self::Nmos => Self::Pmos,
            Self::Pmos => Self::Nmos,
        }
    }

    /// Both polarities, in index order.
    pub const ALL: [MosKind; 2] = [MosKind::Nmos, MosKind::Pmos];
}

impl Display for MosKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nmos => write!(f, "nmos"),
            Self::Pmos => write!(f, "pmos"),
        }
    }
}

/// A process variant (threshold flavor) selecting a distinct rule set.
#[derive(
    Debug, Default, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Flavor(usize);

impl Flavor {
    #[inline]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn index(&self) -> usize {
        self.0
    }
}

impl Display for Flavor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The rule bundle for one (polarity, flavor) pair.
///
/// Well and tap rules are indexed by doping type: the [`MosKind::Nmos`]
/// bundle carries the n-well and the n+ tap diffusion, both of which sit
/// on the PMOS side of a cell.
#[derive(Debug, Copy, Clone)]
pub struct DeviceRules<'a> {
    pub kind: MosKind,
    pub flavor: Flavor,
    pub diff: &'a DiffRules,
    pub fet: &'a FetRules,
    pub well: Option<&'a WellRules>,
    pub tap: Option<&'a WellDiffRules>,
}

/// A source of design rules.
pub trait Technology {
    /// Nanometres per design unit.
    fn scale(&self) -> f64;

    /// All device flavors, in index order.
    fn flavors(&self) -> Vec<Flavor>;

    fn flavor_name(&self, flavor: Flavor) -> Option<&str>;

    fn device(&self, kind: MosKind, flavor: Flavor) -> Option<DeviceRules<'_>>;

    fn poly(&self) -> &PolyRules;

    fn num_metals(&self) -> usize;

    /// Routing rules for a metal layer. Metal layers are numbered from 1.
    fn metal(&self, index: usize) -> Option<&RoutingRules>;

    /// The distance by which geometry on `layer` is inflated when computing
    /// bloated bounding boxes.
    ///
    /// Bloating by half the layer's minimum spacing lets any two bloated
    /// boxes abut without violating spacing.
    fn bloat(&self, layer: LayerTag) -> i64;
}
