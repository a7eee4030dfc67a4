//! Thin helpers over the `semver` crate.
//!
//! Concord does not implement version syntax itself; `semver` supplies
//! parsing and total ordering. This module adds error mapping into
//! [`ConcordError`] and the scalar projection used by the default cost
//! function.

use semver::Version;

use crate::errors::{ConcordError, ConcordResult};

/// Parse a version string, attributing failures to the named unit.
pub fn parse(unit: &str, text: &str) -> ConcordResult<Version> {
    Version::parse(text.trim()).map_err(|e| ConcordError::InvalidVersion {
        unit: unit.to_string(),
        version: text.to_string(),
        reason: e.to_string(),
    })
}

/// Scalar projection of a version, monotone in semver ordering for the
/// version shapes Concord deals with (major/minor/patch below 1000).
///
/// Pre-release versions score just under their release counterpart.
pub fn magnitude(version: &Version) -> f64 {
    let base = version.major as f64 * 1_000_000.0
        + version.minor as f64 * 1_000.0
        + version.patch as f64;
    if version.pre.is_empty() {
        base
    } else {
        base - 0.5
    }
}
