//! IO utilities.

use std::io::ErrorKind;
use std::path::Path;

use crate::error::{with_err_context, ErrorContext, Result};

pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    let data = with_err_context(std::fs::read_to_string(path), || {
        ErrorContext::ReadFile(path.to_path_buf())
    })?;
    Ok(data)
}

/// Reads a file that is allowed to be absent.
///
/// Returns `Ok(None)` if no file exists at `path`.
pub fn read_optional<P: AsRef<Path>>(path: P) -> Result<Option<String>> {
    let path = path.as_ref();
    match std::fs::read_to_string(path) {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => with_err_context(Err(e), || ErrorContext::ReadFile(path.to_path_buf())),
    }
}
