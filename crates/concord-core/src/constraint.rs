//! Version constraints: exact pins and compatible ranges.

use std::fmt;
use std::hash::{Hash, Hasher};

use semver::Version;

use crate::errors::{ConcordError, ConcordResult};
use crate::unit::UnitVersion;

/// How a constraint expression matches candidate versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    /// `=V`: only the version V itself.
    Exact(Version),
    /// Bare `V`: any version at or above V whose declared
    /// backward-compatibility window still covers V.
    Compatible(Version),
}

/// An immutable requirement that the chosen version of one unit must satisfy.
///
/// Identity is the `(unit, expr)` pair; the registry interns constraints by
/// that key so a repeated request returns the same instance.
#[derive(Debug, Clone)]
pub struct VersionConstraint {
    unit: String,
    expr: String,
    matcher: Matcher,
}

impl VersionConstraint {
    /// Parse a constraint expression for the named unit.
    ///
    /// `=1.2.3` pins exactly; a bare `1.2.3` is a compatible range. Anything
    /// else is `MalformedConstraint`.
    pub fn parse(unit: &str, expr: &str) -> ConcordResult<Self> {
        let trimmed = expr.trim();
        let (exact, operand) = match trimmed.strip_prefix('=') {
            Some(rest) => (true, rest.trim()),
            None => (false, trimmed),
        };
        if operand.is_empty() {
            return Err(ConcordError::MalformedConstraint {
                unit: unit.to_string(),
                expr: expr.to_string(),
                reason: "empty version operand".to_string(),
            });
        }
        let version = Version::parse(operand).map_err(|e| ConcordError::MalformedConstraint {
            unit: unit.to_string(),
            expr: expr.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            unit: unit.to_string(),
            expr: trimmed.to_string(),
            matcher: if exact {
                Matcher::Exact(version)
            } else {
                Matcher::Compatible(version)
            },
        })
    }

    /// The unit this constraint applies to.
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// The normalized expression string.
    pub fn expr(&self) -> &str {
        &self.expr
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn is_exact(&self) -> bool {
        matches!(self.matcher, Matcher::Exact(_))
    }

    /// The version an exact pin forces, if this is an exact constraint.
    pub fn pinned(&self) -> Option<&Version> {
        match &self.matcher {
            Matcher::Exact(v) => Some(v),
            Matcher::Compatible(_) => None,
        }
    }

    /// Whether a candidate version of the constrained unit satisfies this
    /// constraint. Callers only ever apply a constraint to versions of the
    /// unit it names.
    pub fn accepts(&self, candidate: &UnitVersion) -> bool {
        match &self.matcher {
            Matcher::Exact(v) => candidate.version() == v,
            Matcher::Compatible(v) => {
                candidate.version() >= v && candidate.earliest_compatible() <= v
            }
        }
    }
}

impl PartialEq for VersionConstraint {
    fn eq(&self, other: &Self) -> bool {
        self.unit == other.unit && self.expr == other.expr
    }
}

impl Eq for VersionConstraint {}

impl Hash for VersionConstraint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.unit.hash(state);
        self.expr.hash(state);
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.unit, self.expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(name: &str, version: &str, earliest: &str) -> UnitVersion {
        UnitVersion::with_window(name, version, earliest).unwrap()
    }

    #[test]
    fn parse_exact() {
        let c = VersionConstraint::parse("lib", "=1.2.0").unwrap();
        assert!(c.is_exact());
        assert_eq!(c.pinned().unwrap().to_string(), "1.2.0");
    }

    #[test]
    fn parse_range() {
        let c = VersionConstraint::parse("lib", "1.2.0").unwrap();
        assert!(!c.is_exact());
        assert!(c.pinned().is_none());
    }

    #[test]
    fn parse_normalizes_whitespace() {
        let c = VersionConstraint::parse("lib", "  = 1.0.0 ").unwrap();
        assert!(c.is_exact());
        assert_eq!(c.expr(), "= 1.0.0");
    }

    #[test]
    fn parse_rejects_empty_operand() {
        assert!(VersionConstraint::parse("lib", "=").is_err());
        assert!(VersionConstraint::parse("lib", "").is_err());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(VersionConstraint::parse("lib", ">=1.0").is_err());
        assert!(VersionConstraint::parse("lib", "latest").is_err());
    }

    #[test]
    fn exact_accepts_only_equal() {
        let c = VersionConstraint::parse("lib", "=1.0.0").unwrap();
        assert!(c.accepts(&unit("lib", "1.0.0", "1.0.0")));
        assert!(!c.accepts(&unit("lib", "1.0.1", "1.0.0")));
    }

    #[test]
    fn range_accepts_newer_within_window() {
        let c = VersionConstraint::parse("lib", "1.1.0").unwrap();
        // Newer and backward compatible down to 1.0.0: accepted.
        assert!(c.accepts(&unit("lib", "1.2.0", "1.0.0")));
        // The written version itself: accepted.
        assert!(c.accepts(&unit("lib", "1.1.0", "1.1.0")));
    }

    #[test]
    fn range_rejects_older_or_incompatible() {
        let c = VersionConstraint::parse("lib", "1.1.0").unwrap();
        // Older than the written version.
        assert!(!c.accepts(&unit("lib", "1.0.0", "1.0.0")));
        // Newer, but its window starts after the written version.
        assert!(!c.accepts(&unit("lib", "2.0.0", "2.0.0")));
    }

    #[test]
    fn identity_is_unit_and_expr() {
        let a = VersionConstraint::parse("lib", "=1.0.0").unwrap();
        let b = VersionConstraint::parse("lib", "=1.0.0").unwrap();
        let c = VersionConstraint::parse("other", "=1.0.0").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn display() {
        let c = VersionConstraint::parse("lib", "=1.0.0").unwrap();
        assert_eq!(c.to_string(), "lib =1.0.0");
    }
}
