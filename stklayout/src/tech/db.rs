//! A technology rule database loaded from TOML.

use std::collections::HashMap;
use std::path::Path;

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use super::error::RuleError;
use super::rules::{DiffRules, FetRules, PolyRules, RoutingRules, WellDiffRules, WellRules};
use super::{DeviceRules, Flavor, MosKind, Technology};
use crate::error::{with_err_context, ErrorContext, Result};
use crate::io::read_to_string;
use crate::layout::LayerTag;

/// Owned rules for one (polarity, flavor) pair.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct DeviceRuleSet {
    pub diff: DiffRules,
    pub fet: FetRules,
    #[serde(default)]
    pub well: Option<WellRules>,
    #[serde(default)]
    pub tap: Option<WellDiffRules>,
}

#[derive(Debug, Clone, Deserialize)]
struct DeviceEntry {
    kind: MosKind,
    flavor: ArcStr,
    #[serde(flatten)]
    rules: DeviceRuleSet,
}

#[derive(Debug, Clone, Deserialize)]
struct TechFile {
    scale: f64,
    flavors: Vec<ArcStr>,
    poly: PolyRules,
    metals: Vec<RoutingRules>,
    #[serde(default)]
    devices: Vec<DeviceEntry>,
}

/// A [`Technology`] backed by plain rule tables.
#[derive(Debug, Clone)]
pub struct TechDb {
    scale: f64,
    flavors: Vec<ArcStr>,
    poly: PolyRules,
    metals: Vec<RoutingRules>,
    devices: HashMap<(MosKind, Flavor), DeviceRuleSet>,
}

impl TechDb {
    pub fn from_toml(input: &str) -> Result<Self> {
        let file: TechFile = toml::from_str(input)?;
        Self::from_file(file)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let input = read_to_string(path)?;
        with_err_context(Self::from_toml(&input), || {
            ErrorContext::ReadFile(path.to_path_buf())
        })
    }

    fn from_file(file: TechFile) -> Result<Self> {
        if file.metals.len() < 3 {
            return Err(RuleError::TooFewMetals(file.metals.len()).into());
        }
        if !(file.scale > 0.0) {
            return Err(RuleError::InvalidValue(format!(
                "scale must be positive, got {}",
                file.scale
            ))
            .into());
        }
        if let Some(m) = file.metals.iter().find(|m| m.pitch <= 0) {
            return Err(RuleError::InvalidValue(format!(
                "metal {} has non-positive pitch {}",
                m.name, m.pitch
            ))
            .into());
        }

        let mut devices = HashMap::with_capacity(file.devices.len());
        for entry in file.devices {
            let flavor = file
                .flavors
                .iter()
                .position(|f| *f == entry.flavor)
                .map(Flavor::new)
                .ok_or_else(|| RuleError::UnknownFlavor(entry.flavor.clone()))?;
            if devices.insert((entry.kind, flavor), entry.rules).is_some() {
                return Err(RuleError::DuplicateDevice {
                    kind: entry.kind,
                    flavor: entry.flavor,
                }
                .into());
            }
        }

        Ok(Self {
            scale: file.scale,
            flavors: file.flavors,
            poly: file.poly,
            metals: file.metals,
            devices,
        })
    }

    /// Looks up a flavor by name.
    pub fn flavor(&self, name: &str) -> Option<Flavor> {
        self.flavors
            .iter()
            .position(|f| f == name)
            .map(Flavor::new)
    }

    /// Mutable access to the rules of one device, for tuning a loaded database.
    pub fn device_rules_mut(
        &mut self,
        kind: MosKind,
        flavor: Flavor,
    ) -> Option<&mut DeviceRuleSet> {
        self.devices.get_mut(&(kind, flavor))
    }

    pub fn poly_mut(&mut self) -> &mut PolyRules {
        &mut self.poly
    }
}

#[inline]
fn half_up(value: i64) -> i64 {
    (value + 1) / 2
}

impl Technology for TechDb {
    fn scale(&self) -> f64 {
        self.scale
    }

    fn flavors(&self) -> Vec<Flavor> {
        (0..self.flavors.len()).map(Flavor::new).collect()
    }

    fn flavor_name(&self, flavor: Flavor) -> Option<&str> {
        self.flavors.get(flavor.index()).map(|s| s.as_str())
    }

    fn device(&self, kind: MosKind, flavor: Flavor) -> Option<DeviceRules<'_>> {
        let set = self.devices.get(&(kind, flavor))?;
        Some(DeviceRules {
            kind,
            flavor,
            diff: &set.diff,
            fet: &set.fet,
            well: set.well.as_ref(),
            tap: set.tap.as_ref(),
        })
    }

    fn poly(&self) -> &PolyRules {
        &self.poly
    }

    fn num_metals(&self) -> usize {
        self.metals.len()
    }

    fn metal(&self, index: usize) -> Option<&RoutingRules> {
        self.metals.get(index.checked_sub(1)?)
    }

    fn bloat(&self, layer: LayerTag) -> i64 {
        match layer {
            LayerTag::Diff { kind, flavor }
            | LayerTag::Fet { kind, flavor }
            | LayerTag::DiffBbox { kind, flavor }
            | LayerTag::WellDiff { kind, flavor } => self
                .devices
                .get(&(kind, flavor))
                .map(|d| half_up(d.diff.spacing))
                .unwrap_or_default(),
            LayerTag::Poly => half_up(self.poly.spacing(0)),
            LayerTag::Metal(i) => self
                .metal(i)
                .map(|m| half_up(m.min_spacing))
                .unwrap_or_default(),
        }
    }
}
