//! User-facing configuration of the layout pass.
//!
//! A [`LayoutConfig`] is plain data. It only becomes usable once it has been
//! [resolved](LayoutConfig::resolve) against a [`Technology`], which checks
//! every layer index and produces the [`PassSettings`] the synthesizer reads.

use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use stkgeom::snap::Grid;
use thiserror::Error;

use crate::error::{with_err_context, ErrorContext, Result};
use crate::io::read_to_string;
use crate::log::warn;
use crate::tech::rules::RoutingRules;
use crate::tech::Technology;

#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[allow(clippy::needless_borrow)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct LayoutConfig {
    /// Metres per netlist length unit.
    lambda: f64,
    /// The metal layer whose pitch sets the horizontal placement grid.
    #[builder(default = "2")]
    #[serde(default = "default_align_x")]
    metal_align_x: i64,
    /// The metal layer whose pitch sets the vertical placement grid.
    #[builder(default = "1")]
    #[serde(default = "default_align_y")]
    metal_align_y: i64,
    /// 1 if odd-numbered metals run horizontally, 0 otherwise.
    #[builder(default = "1")]
    #[serde(default = "default_horiz_metal")]
    horiz_metal: i64,
    /// The metal layer carrying cell pins.
    #[builder(default = "2")]
    #[serde(default = "default_pin_layer")]
    pin_layer: i64,
    /// 1 to read pre-computed geometry from `<rect_dir>/<cell>.rect`.
    #[builder(default = "0")]
    #[serde(default)]
    rect_import: i64,
    /// Directory searched for pre-computed geometry.
    ///
    /// Defaults to the current directory.
    #[builder(default, setter(into, strip_option))]
    #[serde(default)]
    rect_dir: Option<PathBuf>,
    /// Scale applied to the reported area statistics.
    #[builder(default = "1.0")]
    #[serde(default = "default_area_multiplier")]
    area_multiplier: f64,
}

fn default_align_x() -> i64 {
    2
}

fn default_align_y() -> i64 {
    1
}

fn default_horiz_metal() -> i64 {
    1
}

fn default_pin_layer() -> i64 {
    2
}

fn default_area_multiplier() -> f64 {
    1.0
}

/// An invalid configuration value.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("{param} ({value}) must be a metal layer between 1 and {max}")]
    LayerOutOfRange {
        param: &'static str,
        value: i64,
        max: usize,
    },

    #[error("{param} must be 0 or 1, found {value}")]
    InvalidFlag { param: &'static str, value: i64 },

    #[error("lambda must be positive, found {0}")]
    InvalidLambda(f64),

    #[error("lambda ({lambda} m) is smaller than one design unit ({scale} nm)")]
    LambdaBelowScale { lambda: f64, scale: f64 },

    #[error("area multiplier must be non-negative, found {0}")]
    InvalidAreaMultiplier(f64),

    #[error("technology defines {0} metal layers; at least 3 are required")]
    TooFewMetals(usize),

    #[error("metal layer {0} has a non-positive pitch")]
    InvalidPitch(usize),
}

impl LayoutConfigBuilder {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(lambda) = self.lambda {
            if !(lambda > 0.0) {
                return Err(format!("lambda must be positive, found {lambda}"));
            }
        }
        if let Some(mult) = self.area_multiplier {
            if !(mult >= 0.0) {
                return Err(format!(
                    "area multiplier must be non-negative, found {mult}"
                ));
            }
        }
        for (param, value) in [
            ("horiz_metal", self.horiz_metal),
            ("rect_import", self.rect_import),
        ] {
            if let Some(v) = value {
                if v != 0 && v != 1 {
                    return Err(format!("{param} must be 0 or 1, found {v}"));
                }
            }
        }
        Ok(())
    }
}

impl LayoutConfig {
    #[inline]
    pub fn builder() -> LayoutConfigBuilder {
        LayoutConfigBuilder::default()
    }

    pub fn from_toml(input: &str) -> Result<Self> {
        let value = toml::from_str(input)?;
        Ok(value)
    }

    /// Loads a configuration file.
    ///
    /// A relative `rect_dir` is taken relative to the file's directory.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let input = read_to_string(path)?;
        let mut value = with_err_context(Self::from_toml(&input), || {
            ErrorContext::ReadFile(path.to_path_buf())
        })?;
        value.resolve_paths(path);
        Ok(value)
    }

    fn resolve_paths(&mut self, path: &Path) {
        if let (Some(dir), Some(parent)) = (&self.rect_dir, path.parent()) {
            if dir.is_relative() {
                self.rect_dir = Some(parent.join(dir));
            }
        }
    }

    #[inline]
    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    #[inline]
    pub fn pin_layer(&self) -> i64 {
        self.pin_layer
    }

    #[inline]
    pub fn area_multiplier(&self) -> f64 {
        self.area_multiplier
    }

    /// Checks this configuration against `tech` and derives the settings
    /// used by the layout pass.
    pub fn resolve(&self, tech: &dyn Technology) -> Result<PassSettings> {
        with_err_context(self.resolve_inner(tech), || ErrorContext::ResolveConfig)
    }

    fn resolve_inner(
        &self,
        tech: &dyn Technology,
    ) -> std::result::Result<PassSettings, ConfigError> {
        let nmetals = tech.num_metals();
        if nmetals < 3 {
            return Err(ConfigError::TooFewMetals(nmetals));
        }

        let metal = |param: &'static str, value: i64| {
            usize::try_from(value)
                .ok()
                .filter(|i| (1..=nmetals).contains(i))
                .and_then(|i| Some((i, tech.metal(i)?)))
                .ok_or(ConfigError::LayerOutOfRange {
                    param,
                    value,
                    max: nmetals,
                })
        };
        let (align_x, metal_x) = metal("metal_align_x", self.metal_align_x)?;
        let (align_y, metal_y) = metal("metal_align_y", self.metal_align_y)?;
        let (pin_layer, pin) = metal("pin_layer", self.pin_layer)?;

        for (param, value) in [
            ("horiz_metal", self.horiz_metal),
            ("rect_import", self.rect_import),
        ] {
            if value != 0 && value != 1 {
                return Err(ConfigError::InvalidFlag { param, value });
            }
        }
        if !(self.lambda > 0.0) {
            return Err(ConfigError::InvalidLambda(self.lambda));
        }
        if !(self.area_multiplier >= 0.0) {
            return Err(ConfigError::InvalidAreaMultiplier(self.area_multiplier));
        }
        for (i, m) in [(align_x, metal_x), (align_y, metal_y), (pin_layer, pin)] {
            if m.pitch() <= 0 {
                return Err(ConfigError::InvalidPitch(i));
            }
        }

        let scale = lambda_to_scale(self.lambda, tech.scale())?;

        if (pin_layer as i64) % 2 == self.horiz_metal {
            warn!(
                "pin layer {} ({}) is a horizontal metal; pins are normally placed on vertical metal",
                pin_layer,
                pin.name
            );
        }
        if pin.pitch() != metal_x.pitch() {
            warn!(
                "pin layer pitch ({}) differs from the horizontal alignment pitch ({} on {}); \
                 pins may fall off the routing grid",
                pin.pitch(),
                metal_x.pitch(),
                metal_x.name
            );
        }

        let rect_dir = (self.rect_import == 1)
            .then(|| self.rect_dir.clone().unwrap_or_else(|| PathBuf::from(".")));

        Ok(PassSettings {
            scale,
            grid: Grid::new(metal_x.pitch(), metal_y.pitch()),
            pin_layer,
            pin: pin.clone(),
            rect_dir,
            area_multiplier: self.area_multiplier,
            nm_per_unit: tech.scale(),
        })
    }
}

/// Converts `lambda` (metres) into a whole number of design units of
/// `scale` nanometres each.
fn lambda_to_scale(lambda: f64, scale: f64) -> std::result::Result<i64, ConfigError> {
    let exact = lambda * 1e9 / scale;
    let rounded = exact.round();
    if rounded < 1.0 {
        return Err(ConfigError::LambdaBelowScale { lambda, scale });
    }
    if (rounded * scale - lambda * 1e9).abs() > 0.001 {
        warn!(
            "lambda ({lambda} m) is not a multiple of the technology scale ({scale} nm); \
             rounding to {rounded} design units"
        );
    }
    Ok(rounded as i64)
}

/// Resolved, technology-checked settings for one layout pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PassSettings {
    /// Design units per netlist length unit.
    pub scale: i64,
    /// The placement grid used for cell boundaries.
    pub grid: Grid,
    /// The 1-based metal layer carrying pins.
    pub pin_layer: usize,
    pub pin: RoutingRules,
    /// Set if pre-computed geometry should be imported.
    pub rect_dir: Option<PathBuf>,
    pub area_multiplier: f64,
    /// Nanometres per design unit.
    pub nm_per_unit: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorSource;
    use crate::tests::sample_tech;

    fn config_err(cfg: &LayoutConfig) -> ConfigError {
        match cfg.resolve(&sample_tech()).unwrap_err().into_inner() {
            ErrorSource::Config(e) => e,
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn defaults_resolve() {
        let cfg = LayoutConfig::builder().lambda(20e-9).build().unwrap();
        let settings = cfg.resolve(&sample_tech()).unwrap();
        assert_eq!(settings.scale, 2);
        assert_eq!(settings.pin_layer, 2);
        assert_eq!(settings.grid, Grid::new(10, 8));
        assert!(settings.rect_dir.is_none());
    }

    #[test]
    fn toml_defaults_match_builder() {
        let cfg = LayoutConfig::from_toml("lambda = 2e-8").unwrap();
        assert_eq!(cfg, LayoutConfig::builder().lambda(20e-9).build().unwrap());
    }

    #[test]
    fn out_of_range_layers_are_reported_with_value() {
        let cfg = LayoutConfig::builder()
            .lambda(20e-9)
            .metal_align_x(7)
            .build()
            .unwrap();
        assert_eq!(
            config_err(&cfg),
            ConfigError::LayerOutOfRange {
                param: "metal_align_x",
                value: 7,
                max: 4
            }
        );

        let cfg = LayoutConfig::from_toml("lambda = 2e-8\npin_layer = 0").unwrap();
        assert!(matches!(
            config_err(&cfg),
            ConfigError::LayerOutOfRange { value: 0, .. }
        ));
    }

    #[test]
    fn flags_must_be_binary() {
        let cfg = LayoutConfig::from_toml("lambda = 2e-8\nhoriz_metal = 2").unwrap();
        assert_eq!(
            config_err(&cfg),
            ConfigError::InvalidFlag {
                param: "horiz_metal",
                value: 2
            }
        );
        assert!(LayoutConfig::builder()
            .lambda(20e-9)
            .rect_import(3)
            .build()
            .is_err());
    }

    #[test]
    fn inexact_lambda_rounds() {
        assert_eq!(lambda_to_scale(24e-9, 10.0).unwrap(), 2);
        assert_eq!(lambda_to_scale(26e-9, 10.0).unwrap(), 3);
        assert!(lambda_to_scale(2e-9, 10.0).is_err());
    }

    #[test]
    fn rect_dir_defaults_to_cwd() {
        let cfg = LayoutConfig::builder()
            .lambda(20e-9)
            .rect_import(1)
            .build()
            .unwrap();
        let settings = cfg.resolve(&sample_tech()).unwrap();
        assert_eq!(settings.rect_dir, Some(PathBuf::from(".")));
    }
}
