//! The unit-version store for one resolution session.

use std::collections::HashMap;
use std::sync::Arc;

use semver::Version;

use crate::constraint::VersionConstraint;
use crate::errors::{ConcordError, ConcordResult};
use crate::unit::UnitVersion;

/// Holds every known version of every unit, plus the interned constraints.
///
/// A registry is populated once, then read-only for the rest of its life.
/// Everything handed out is behind an `Arc`, so concurrent `resolve` calls
/// over a populated registry share no mutable state.
#[derive(Debug, Default)]
pub struct Registry {
    /// Versions per unit name, in registration order.
    units: HashMap<String, Vec<Arc<UnitVersion>>>,
    /// Constraints interned by `(unit, expr)`.
    interned: HashMap<(String, String), Arc<VersionConstraint>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a unit version, freezing it. Fails if the same
    /// `(name, version)` pair is already registered.
    pub fn add_unit_version(&mut self, uv: UnitVersion) -> ConcordResult<Arc<UnitVersion>> {
        let versions = self.units.entry(uv.name().to_string()).or_default();
        if versions.iter().any(|known| known.version() == uv.version()) {
            return Err(ConcordError::DuplicateVersion {
                unit: uv.name().to_string(),
                version: uv.version().to_string(),
            });
        }
        tracing::trace!("registered {}", uv.id());
        let uv = Arc::new(uv);
        versions.push(uv.clone());
        Ok(uv)
    }

    /// The interned constraint for `(unit, expr)`, parsed on first use.
    ///
    /// Repeated requests for the same pair return the same `Arc`, so identity
    /// comparison and deduplicated parsing come for free.
    pub fn constraint(&mut self, unit: &str, expr: &str) -> ConcordResult<Arc<VersionConstraint>> {
        let key = (unit.to_string(), expr.trim().to_string());
        if let Some(constraint) = self.interned.get(&key) {
            return Ok(constraint.clone());
        }
        let constraint = Arc::new(VersionConstraint::parse(unit, expr)?);
        self.interned.insert(key, constraint.clone());
        Ok(constraint)
    }

    /// All registered versions of a unit. Unknown names yield an empty slice,
    /// not an error; "nothing satisfies this" surfaces during search.
    pub fn versions_of(&self, name: &str) -> &[Arc<UnitVersion>] {
        self.units.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The one registered version matching `(name, version)`, if present.
    pub fn lookup(&self, name: &str, version: &Version) -> Option<Arc<UnitVersion>> {
        self.versions_of(name)
            .iter()
            .find(|uv| uv.version() == version)
            .cloned()
    }

    /// Number of distinct unit names.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
