use arcstr::ArcStr;
use thiserror::Error;

use super::{Flavor, MosKind};

/// A design-rule inconsistency.
///
/// These are fatal: the rule database returned data from which no legal
/// geometry can be built.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[non_exhaustive]
pub enum RuleError {
    #[error("computed {what} is not positive ({value}) for a {kind} edge of width {width}")]
    NonPositive {
        what: &'static str,
        kind: MosKind,
        width: i64,
        value: i64,
    },

    #[error("no rules for {kind} devices of flavor {flavor}")]
    MissingDevice { kind: MosKind, flavor: Flavor },

    #[error("unknown device flavor: {0}")]
    UnknownFlavor(ArcStr),

    #[error("rules for {kind} devices of flavor {flavor} are given more than once")]
    DuplicateDevice { kind: MosKind, flavor: ArcStr },

    #[error("technology defines {0} metal layers; at least 3 are required")]
    TooFewMetals(usize),

    #[error("invalid rule value: {0}")]
    InvalidValue(String),
}
