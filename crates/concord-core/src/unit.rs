//! One buildable version of a unit.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use semver::Version;

use crate::constraint::VersionConstraint;
use crate::errors::{ConcordError, ConcordResult};
use crate::version;

/// A specific version of a named unit, with the dependencies it declares and
/// the version constraints it places on some of them.
///
/// A `UnitVersion` is built up during registry population (dependencies and
/// constraints may be appended) and is frozen behind an `Arc` once handed to
/// [`Registry::add_unit_version`](crate::registry::Registry::add_unit_version).
/// Population and resolution are non-overlapping phases.
#[derive(Debug, Clone)]
pub struct UnitVersion {
    name: String,
    version: Version,
    /// Oldest version this one can stand in for when matched against a
    /// compatible-range constraint.
    earliest_compatible: Version,
    /// Dependency unit names in declaration order.
    dependencies: Vec<String>,
    /// At most one constraint per dependency name.
    constraints: HashMap<String, Arc<VersionConstraint>>,
}

impl UnitVersion {
    /// A unit version whose compatibility window is just itself.
    pub fn new(name: impl Into<String>, version: &str) -> ConcordResult<Self> {
        let name = name.into();
        let version = version::parse(&name, version)?;
        Ok(Self {
            earliest_compatible: version.clone(),
            name,
            version,
            dependencies: Vec::new(),
            constraints: HashMap::new(),
        })
    }

    /// A unit version declaring backward compatibility down to
    /// `earliest_compatible`.
    pub fn with_window(
        name: impl Into<String>,
        version: &str,
        earliest_compatible: &str,
    ) -> ConcordResult<Self> {
        let name = name.into();
        let version = version::parse(&name, version)?;
        let earliest_compatible = version::parse(&name, earliest_compatible)?;
        Ok(Self {
            name,
            version,
            earliest_compatible,
            dependencies: Vec::new(),
            constraints: HashMap::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn earliest_compatible(&self) -> &Version {
        &self.earliest_compatible
    }

    /// Dependency names in declaration order.
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// `name@version` identifier used in logs and diagnostics.
    pub fn id(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }

    /// Append a dependency if absent. Idempotent; order is preserved.
    pub fn add_dependency(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.dependencies.contains(&name) {
            self.dependencies.push(name);
        }
    }

    /// Record a constraint, keyed by the dependency it targets.
    ///
    /// The target must already be a declared dependency; a constraint on a
    /// unit this version does not depend on is rejected.
    pub fn add_constraint(&mut self, constraint: Arc<VersionConstraint>) -> ConcordResult<()> {
        let target = constraint.unit();
        if !self.dependencies.iter().any(|d| d == target) {
            return Err(ConcordError::UnknownDependency {
                unit: self.id(),
                target: target.to_string(),
            });
        }
        self.constraints.insert(target.to_string(), constraint);
        Ok(())
    }

    /// The constraint this version places on a dependency, if any.
    pub fn constraint_on(&self, target: &str) -> Option<&Arc<VersionConstraint>> {
        self.constraints.get(target)
    }

    /// All constraints, in dependency declaration order.
    pub fn constraints(&self) -> impl Iterator<Item = &Arc<VersionConstraint>> {
        self.dependencies
            .iter()
            .filter_map(|dep| self.constraints.get(dep))
    }
}

impl fmt::Display for UnitVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_defaults_window_to_self() {
        let uv = UnitVersion::new("a", "1.2.0").unwrap();
        assert_eq!(uv.earliest_compatible(), uv.version());
    }

    #[test]
    fn invalid_version_rejected() {
        assert!(UnitVersion::new("a", "one point oh").is_err());
    }

    #[test]
    fn add_dependency_is_idempotent_and_ordered() {
        let mut uv = UnitVersion::new("a", "1.0.0").unwrap();
        uv.add_dependency("b");
        uv.add_dependency("c");
        uv.add_dependency("b");
        assert_eq!(uv.dependencies(), ["b", "c"]);
    }

    #[test]
    fn constraint_requires_declared_dependency() {
        let mut uv = UnitVersion::new("a", "1.0.0").unwrap();
        let c = Arc::new(VersionConstraint::parse("b", "=1.0.0").unwrap());
        assert!(uv.add_constraint(c.clone()).is_err());

        uv.add_dependency("b");
        assert!(uv.add_constraint(c).is_ok());
        assert!(uv.constraint_on("b").is_some());
        assert!(uv.constraint_on("c").is_none());
    }

    #[test]
    fn constraints_iterate_in_declaration_order() {
        let mut uv = UnitVersion::new("a", "1.0.0").unwrap();
        for dep in ["z", "m", "b"] {
            uv.add_dependency(dep);
        }
        for dep in ["b", "z"] {
            let c = Arc::new(VersionConstraint::parse(dep, "=1.0.0").unwrap());
            uv.add_constraint(c).unwrap();
        }
        let order: Vec<&str> = uv.constraints().map(|c| c.unit()).collect();
        assert_eq!(order, ["z", "b"]);
    }

    #[test]
    fn display_and_id() {
        let uv = UnitVersion::new("a", "1.0.0").unwrap();
        assert_eq!(uv.to_string(), "a@1.0.0");
        assert_eq!(uv.id(), "a@1.0.0");
    }
}
