//! Rule values for each class of layout material.
//!
//! Every query is a pure function of its arguments. Widths and lengths are
//! in design units.

use arcstr::ArcStr;
use rangetab::RangeTable;
use serde::{Deserialize, Serialize};

use super::Flavor;

/// Diffusion rules for one (polarity, flavor) pair.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct DiffRules {
    /// Diffusion extension past a gate, as a function of device width.
    pub overhang: RangeTable,
    /// Diffusion extension required around a contact.
    pub via_overhang: i64,
    /// Spacing between a gate and a width step in the diffusion.
    pub notch_spacing: i64,
    /// Gate-to-gate spacing required to fit a contact between two gates.
    pub via_space_mid: i64,
    /// Minimum spacing between separate diffusion regions of this flavor.
    pub spacing: i64,
    /// Spacing to opposite-polarity diffusion, indexed by the other flavor.
    #[serde(default)]
    pub opp_spacing: Vec<i64>,
    #[serde(default)]
    pub min_width: i64,
}

impl DiffRules {
    #[inline]
    pub fn overhang(&self, width: i64) -> i64 {
        self.overhang.get(width)
    }

    /// The overhang for a device of the given width, raised to the via
    /// overhang when the diffusion carries a contact.
    pub fn eff_overhang(&self, width: i64, contact: bool) -> i64 {
        let overhang = self.overhang(width);
        if contact {
            std::cmp::max(overhang, self.via_overhang)
        } else {
            overhang
        }
    }

    #[inline]
    pub fn notch_spacing(&self) -> i64 {
        self.notch_spacing
    }

    #[inline]
    pub fn via_space_mid(&self) -> i64 {
        self.via_space_mid
    }

    #[inline]
    pub fn spacing(&self) -> i64 {
        self.spacing
    }

    /// Spacing to opposite-polarity diffusion of flavor `other`.
    ///
    /// Returns zero when the database carries no value for that flavor.
    pub fn opp_spacing(&self, other: Flavor) -> i64 {
        self.opp_spacing
            .get(other.index())
            .copied()
            .unwrap_or_default()
    }

    #[inline]
    pub fn min_width(&self) -> i64 {
        self.min_width
    }
}

/// Transistor (gate) rules.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct FetRules {
    /// Gate-to-gate spacing, as a function of gate length.
    pub spacing: RangeTable,
}

impl FetRules {
    #[inline]
    pub fn spacing(&self, length: i64) -> i64 {
        self.spacing.get(length)
    }
}

/// Polysilicon rules.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct PolyRules {
    /// Poly extension past the diffusion edge, by gate length.
    pub overhang: RangeTable,
    /// Poly extension past a notched diffusion edge, by gate length.
    pub notch_overhang: RangeTable,
    pub spacing: RangeTable,
    /// End-of-line spacing.
    pub eol: i64,
}

impl PolyRules {
    #[inline]
    pub fn overhang(&self, length: i64) -> i64 {
        self.overhang.get(length)
    }

    #[inline]
    pub fn notch_overhang(&self, length: i64) -> i64 {
        self.notch_overhang.get(length)
    }

    #[inline]
    pub fn spacing(&self, length: i64) -> i64 {
        self.spacing.get(length)
    }

    #[inline]
    pub fn eol(&self) -> i64 {
        self.eol
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct WellRules {
    pub overhang: i64,
    /// Well extension past tap diffusion.
    pub overhang_welldiff: i64,
}

/// Rules for the tap diffusion that contacts a well or the substrate.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct WellDiffRules {
    pub width: i64,
    #[serde(default)]
    pub min_area: i64,
}

impl WellDiffRules {
    /// Height of a tap of width [`WellDiffRules::width`] that meets the
    /// minimum area, never less than the width itself.
    pub fn min_height(&self) -> i64 {
        let mut height = self.min_area;
        if height > 0 && self.width > 0 {
            height /= self.width;
        }
        std::cmp::max(height, self.width)
    }
}

/// Rules for a routing (metal) layer.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct RoutingRules {
    pub name: ArcStr,
    pub pitch: i64,
    pub min_width: i64,
    pub min_spacing: i64,
}

impl RoutingRules {
    #[inline]
    pub fn pitch(&self) -> i64 {
        self.pitch
    }

    #[inline]
    pub fn min_width(&self) -> i64 {
        self.min_width
    }

    #[inline]
    pub fn min_spacing(&self) -> i64 {
        self.min_spacing
    }
}
