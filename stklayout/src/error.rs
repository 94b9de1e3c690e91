use std::fmt::{Debug, Display};
use std::path::PathBuf;

use arcstr::ArcStr;
use thiserror::Error;

use crate::config::ConfigError;
use crate::rect::RectParseError;
use crate::tech::error::RuleError;

pub type Result<T> = std::result::Result<T, StkError>;

pub struct StkError {
    pub(crate) source: ErrorSource,
    pub(crate) context: Vec<ErrorContext>,
}

impl StkError {
    pub fn source(&self) -> &ErrorSource {
        &self.source
    }
}

impl std::error::Error for StkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

impl Display for StkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Error:\n{}", self.source)?;
        if !self.context.is_empty() {
            writeln!(f, "\nError occurred:")?;
            for item in self.context.iter() {
                writeln!(f, "\twhile {}", item)?;
            }
        }
        Ok(())
    }
}

impl Debug for StkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.source)?;
        if !self.context.is_empty() {
            writeln!(f, "\nError occurred:")?;
            for (i, item) in self.context.iter().enumerate() {
                writeln!(f, "\t{}: {:?}", i, item)?;
            }
        }
        Ok(())
    }
}

impl<T> From<T> for StkError
where
    T: Into<ErrorSource>,
{
    fn from(value: T) -> Self {
        Self {
            source: value.into(),
            context: Vec::new(),
        }
    }
}

impl StkError {
    pub fn new(source: impl Into<ErrorSource>) -> Self {
        Self {
            source: source.into(),
            context: Vec::new(),
        }
    }

    pub fn from_context(source: impl Into<ErrorSource>, ctx: impl Into<ErrorContext>) -> Self {
        Self {
            source: source.into(),
            context: vec![ctx.into()],
        }
    }

    pub fn with_context(mut self, ctx: impl Into<ErrorContext>) -> Self {
        self.context.push(ctx.into());
        self
    }

    #[inline]
    pub fn into_inner(self) -> ErrorSource {
        self.source
    }

    /// The context chain, innermost first.
    #[inline]
    pub fn context(&self) -> &[ErrorContext] {
        &self.context
    }
}

#[inline]
pub fn with_err_context<T, E, C>(result: std::result::Result<T, E>, ctx: C) -> Result<T>
where
    C: FnOnce() -> ErrorContext,
    E: Into<StkError>,
{
    result.map_err(|err| err.into().with_context(ctx()))
}

#[derive(Debug, Clone, Eq, PartialEq)]
#[non_exhaustive]
pub enum ErrorContext {
    SynthesizeCell(ArcStr),
    WellTap(ArcStr),
    ImportRect(ArcStr),
    ResolveConfig,
    ReadFile(PathBuf),
    Task(ArcStr),
}

impl Display for ErrorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use ErrorContext::*;
        match self {
            SynthesizeCell(name) => write!(f, "synthesizing layout for cell {name}"),
            WellTap(flavor) => write!(f, "generating well tap for flavor {flavor}"),
            ImportRect(name) => write!(f, "importing pre-computed geometry for cell {name}"),
            ResolveConfig => write!(f, "resolving layout configuration"),
            ReadFile(path) => write!(f, "reading file {path:?}"),
            Task(task) => write!(f, "{task}"),
        }
    }
}

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ErrorSource {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("design rule inconsistency: {0}")]
    Rule(#[from] RuleError),

    #[error("could not find both power supplies for substrate contacts")]
    MissingSupplies,

    #[error("invalid transistor stack (enable logging for details): {0}")]
    InvalidStack(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("no such cell: {0}")]
    CellNotFound(ArcStr),

    #[error("cell {0} instantiates itself")]
    RecursiveCell(ArcStr),

    #[error("error parsing pre-computed geometry: {0}")]
    RectParse(#[from] RectParseError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("error parsing TOML: {0}")]
    TomlParsing(#[from] toml::de::Error),
}
