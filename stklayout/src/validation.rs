use std::fmt::Display;

use crate::error::{ErrorContext, ErrorSource, StkError};
use crate::log::Log;

/// The output of a validator.
#[derive(Debug)]
pub struct ValidatorOutput<W, E, D> {
    pub(crate) warnings: Vec<W>,
    pub(crate) errors: Vec<E>,
    /// Additional validation data.
    pub(crate) data: D,
}

/// Placeholder for warnings or validator data that a validator does not produce.
#[derive(Default, Debug, Clone, Eq, PartialEq, Hash)]
pub struct Empty;

impl Log for Empty {
    fn log(&self) {}
}

impl<W, E, D> Default for ValidatorOutput<W, E, D>
where
    D: Default,
{
    fn default() -> Self {
        Self {
            warnings: Vec::new(),
            errors: Vec::new(),
            data: D::default(),
        }
    }
}

impl<W, E, D> ValidatorOutput<W, E, D>
where
    W: Log,
    E: Log + Display,
    D: Log + Default,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs all stored warning and error messages.
    pub fn log(&self) {
        self.data.log();

        for warning in self.warnings.iter() {
            warning.log();
        }
        for error in self.errors.iter() {
            error.log();
        }
    }

    /// Returns `true` is any errors were encountered.
    #[inline]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    #[inline]
    pub fn errors(&self) -> &[E] {
        &self.errors
    }

    /// Returns the first encountered error as a [`String`].
    pub fn first_error(&self) -> String {
        format!("{}", self.errors[0])
    }

    /// Logs the output, then converts the first error (if any) into a
    /// [`StkError`] carrying the given context.
    pub fn into_result(self, ctx: ErrorContext) -> Result<D, StkError> {
        self.log();
        if self.has_errors() {
            return Err(StkError::from_context(
                ErrorSource::InvalidStack(self.first_error()),
                ctx,
            ));
        }
        Ok(self.data)
    }
}
