//! Step-function lookup tables keyed by an integer width or length.
//!
//! A table with bounds `[b0, b1, ..]` and values `[v0, v1, .., vn]` maps any key
//! `k <= b0` to `v0`, any key in `(b0, b1]` to `v1`, and so on. Keys past the
//! last bound map to the final value.

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Eq, PartialEq, Builder, Serialize, Deserialize)]
#[builder(pattern = "owned", build_fn(validate = "Self::validate"))]
#[serde(try_from = "RangeTableRepr", into = "RangeTableRepr")]
pub struct RangeTable {
    #[builder(default)]
    bounds: Vec<i64>,
    values: Vec<i64>,
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum RangeTableError {
    #[error("range table needs at least one value")]
    Empty,
    #[error("range table with {bounds} bounds needs {} values, found {values}", bounds + 1)]
    LengthMismatch { bounds: usize, values: usize },
    #[error("range table bounds must be strictly increasing")]
    Unsorted,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RangeTableRepr {
    Const(i64),
    Table { bounds: Vec<i64>, values: Vec<i64> },
}

impl RangeTable {
    #[inline]
    pub fn builder() -> RangeTableBuilder {
        RangeTableBuilder::default()
    }

    /// A table that returns `value` for every key.
    pub fn constant(value: i64) -> Self {
        Self {
            bounds: Vec::new(),
            values: vec![value],
        }
    }

    /// Creates a table, checking that the bounds and values are consistent.
    pub fn new(bounds: Vec<i64>, values: Vec<i64>) -> Result<Self, RangeTableError> {
        check(&bounds, &values)?;
        Ok(Self { bounds, values })
    }

    /// Looks up the value that applies to `key`.
    pub fn get(&self, key: i64) -> i64 {
        let idx = self.bounds.partition_point(|b| *b < key);
        // `check` guarantees `values.len() == bounds.len() + 1`.
        self.values[idx.min(self.values.len() - 1)]
    }

    /// The largest value in the table, regardless of key.
    pub fn max_value(&self) -> i64 {
        self.values.iter().copied().max().unwrap_or_default()
    }

    #[inline]
    pub fn is_constant(&self) -> bool {
        self.bounds.is_empty()
    }

    /// Returns a copy of the table with every value transformed by `f`.
    pub fn map(&self, f: impl Fn(i64) -> i64) -> Self {
        Self {
            bounds: self.bounds.clone(),
            values: self.values.iter().copied().map(f).collect(),
        }
    }
}

impl Default for RangeTable {
    fn default() -> Self {
        Self::constant(0)
    }
}

impl From<i64> for RangeTable {
    fn from(value: i64) -> Self {
        Self::constant(value)
    }
}

impl RangeTableBuilder {
    fn validate(&self) -> Result<(), String> {
        let bounds = self.bounds.as_deref().unwrap_or_default();
        match self.values.as_deref() {
            Some(values) => check(bounds, values).map_err(|e| e.to_string()),
            None => Ok(()),
        }
    }
}

fn check(bounds: &[i64], values: &[i64]) -> Result<(), RangeTableError> {
    if values.is_empty() {
        return Err(RangeTableError::Empty);
    }
    if values.len() != bounds.len() + 1 {
        return Err(RangeTableError::LengthMismatch {
            bounds: bounds.len(),
            values: values.len(),
        });
    }
    if bounds.windows(2).any(|w| w[0] >= w[1]) {
        return Err(RangeTableError::Unsorted);
    }
    Ok(())
}

impl TryFrom<RangeTableRepr> for RangeTable {
    type Error = RangeTableError;

    fn try_from(value: RangeTableRepr) -> Result<Self, Self::Error> {
        match value {
            RangeTableRepr::Const(v) => Ok(Self::constant(v)),
            RangeTableRepr::Table { bounds, values } => Self::new(bounds, values),
        }
    }
}

impl From<RangeTable> for RangeTableRepr {
    fn from(value: RangeTable) -> Self {
        if value.is_constant() {
            Self::Const(value.values[0])
        } else {
            Self::Table {
                bounds: value.bounds,
                values: value.values,
            }
        }
    }
}
