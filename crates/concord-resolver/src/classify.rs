//! Exact vs. inexact transitive-dependency classification.
//!
//! A dependency chain in which every edge carries an exact pin leaves no
//! version choice: the whole chain is forced. A chain broken by an edge with
//! no constraint, or only a range constraint, leaves the choice open from
//! that edge on. Splitting the reachable set this way is the search engine's
//! main performance lever: the exact set needs no enumeration at all, and
//! backtracking runs only over the inexact names.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use concord_core::errors::{ConcordError, ConcordResult};
use concord_core::registry::Registry;
use concord_core::unit::UnitVersion;

/// The split of one unit version's transitive dependencies.
#[derive(Debug, Default)]
pub struct Classification {
    /// Versions forced by all-exact chains, in first-discovery order.
    /// Excludes the root itself.
    pub exact: Vec<Arc<UnitVersion>>,
    /// Names first reached through an unpinned edge, in first-discovery
    /// order. A branch behind an unpinned edge is not descended: no version
    /// is determined there, so its own edges are unknown until the search
    /// picks one.
    pub inexact: Vec<String>,
}

impl Classification {
    /// Classify everything reachable from `root` against the registry.
    ///
    /// Traversal is depth-first preorder over dependency declaration order,
    /// each unit name visited at most once. A name reachable both ways is
    /// classified exact only; an exact discovery after an inexact sighting
    /// reclassifies the name.
    pub fn of(registry: &Registry, root: &UnitVersion) -> ConcordResult<Self> {
        let mut walker = Walker {
            registry,
            root: root.name().to_string(),
            exact: Vec::new(),
            exact_versions: HashMap::new(),
            exact_chains: HashMap::new(),
            inexact: Vec::new(),
            inexact_seen: HashSet::new(),
        };
        walker.walk(root, &root.id())?;
        Ok(Classification {
            exact: walker.exact,
            inexact: walker.inexact,
        })
    }
}

/// The exactly pinned transitive dependency versions of `root`.
pub fn exact_transitive_versions(
    registry: &Registry,
    root: &UnitVersion,
) -> ConcordResult<Vec<Arc<UnitVersion>>> {
    Ok(Classification::of(registry, root)?.exact)
}

/// The transitive dependency names of `root` whose version is left open.
pub fn inexact_transitive_deps(
    registry: &Registry,
    root: &UnitVersion,
) -> ConcordResult<Vec<String>> {
    Ok(Classification::of(registry, root)?.inexact)
}

struct Walker<'a> {
    registry: &'a Registry,
    root: String,
    exact: Vec<Arc<UnitVersion>>,
    exact_versions: HashMap<String, Arc<UnitVersion>>,
    /// Chain of unit ids that pinned each exact name, for conflict reports.
    exact_chains: HashMap<String, String>,
    inexact: Vec<String>,
    inexact_seen: HashSet<String>,
}

impl Walker<'_> {
    fn walk(&mut self, node: &UnitVersion, chain: &str) -> ConcordResult<()> {
        for dep in node.dependencies() {
            if dep == &self.root {
                continue;
            }
            let pin = node.constraint_on(dep).and_then(|c| c.pinned().cloned());
            let Some(pin) = pin else {
                if !self.exact_versions.contains_key(dep.as_str())
                    && self.inexact_seen.insert(dep.clone())
                {
                    self.inexact.push(dep.clone());
                }
                continue;
            };

            if let Some(existing) = self.exact_versions.get(dep.as_str()) {
                if existing.version() != &pin {
                    return Err(ConcordError::ConflictingExactConstraint {
                        unit: dep.clone(),
                        existing: existing.version().to_string(),
                        existing_chain: self
                            .exact_chains
                            .get(dep.as_str())
                            .cloned()
                            .unwrap_or_default(),
                        requested: pin.to_string(),
                        requested_chain: chain.to_string(),
                    });
                }
                continue;
            }

            let Some(pinned) = self.registry.lookup(dep, &pin) else {
                return Err(ConcordError::Unsatisfiable {
                    diagnosis: format!(
                        "`{dep}` has no registered version {pin}, required by {chain}"
                    ),
                });
            };

            // Exact classification wins over an earlier inexact sighting.
            if self.inexact_seen.remove(dep.as_str()) {
                self.inexact.retain(|name| name != dep);
            }

            let child_chain = format!("{chain} -> {}", pinned.id());
            self.exact_versions.insert(dep.clone(), pinned.clone());
            self.exact_chains.insert(dep.clone(), child_chain.clone());
            self.exact.push(pinned.clone());
            self.walk(&pinned, &child_chain)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(
        reg: &mut Registry,
        name: &str,
        version: &str,
        deps: &[(&str, Option<&str>)],
    ) -> Arc<UnitVersion> {
        let mut uv = UnitVersion::new(name, version).unwrap();
        for (dep, expr) in deps {
            uv.add_dependency(*dep);
            if let Some(expr) = expr {
                let c = reg.constraint(dep, expr).unwrap();
                uv.add_constraint(c).unwrap();
            }
        }
        reg.add_unit_version(uv).unwrap()
    }

    #[test]
    fn exact_chain_is_followed_inexact_is_not() {
        let mut reg = Registry::new();
        let a = register(
            &mut reg,
            "a",
            "1.0.0",
            &[("b", Some("=1.0.0")), ("f", Some("1.1.0"))],
        );
        register(
            &mut reg,
            "b",
            "1.0.0",
            &[("c", Some("=1.0.0")), ("d", None), ("f", Some("1.0.0"))],
        );
        register(&mut reg, "c", "1.0.0", &[]);
        register(&mut reg, "d", "1.0.0", &[("e", Some("=1.0.0"))]);
        register(&mut reg, "e", "1.0.0", &[]);
        register(&mut reg, "f", "1.1.0", &[]);

        let classification = Classification::of(&reg, &a).unwrap();
        let exact: Vec<String> = classification.exact.iter().map(|uv| uv.id()).collect();
        assert_eq!(exact, ["b@1.0.0", "c@1.0.0"]);
        // d is open (no constraint), f is open (range); e hides behind d.
        assert_eq!(classification.inexact, ["d", "f"]);
    }

    #[test]
    fn exact_and_inexact_are_disjoint() {
        let mut reg = Registry::new();
        let a = register(
            &mut reg,
            "a",
            "1.0.0",
            &[("x", Some("1.0.0")), ("b", Some("=1.0.0"))],
        );
        register(&mut reg, "b", "1.0.0", &[("x", Some("=1.0.0"))]);
        register(&mut reg, "x", "1.0.0", &[]);

        let classification = Classification::of(&reg, &a).unwrap();
        let exact: Vec<&str> = classification
            .exact
            .iter()
            .map(|uv| uv.name())
            .collect();
        for name in &classification.inexact {
            assert!(!exact.contains(&name.as_str()));
        }
        // x was sighted inexact first, then pinned exactly through b.
        assert_eq!(exact, ["b", "x"]);
        assert!(classification.inexact.is_empty());
    }

    #[test]
    fn conflicting_exact_chains_rejected() {
        let mut reg = Registry::new();
        let a = register(
            &mut reg,
            "a",
            "1.0.0",
            &[("b", Some("=1.0.0")), ("c", Some("=1.0.0"))],
        );
        register(&mut reg, "b", "1.0.0", &[("d", Some("=1.0.0"))]);
        register(&mut reg, "c", "1.0.0", &[("d", Some("=1.1.0"))]);
        register(&mut reg, "d", "1.0.0", &[]);
        register(&mut reg, "d", "1.1.0", &[]);

        let err = Classification::of(&reg, &a).unwrap_err();
        assert!(matches!(
            err,
            ConcordError::ConflictingExactConstraint { .. }
        ));
    }

    #[test]
    fn missing_pinned_version_is_unsatisfiable() {
        let mut reg = Registry::new();
        let a = register(&mut reg, "a", "1.0.0", &[("b", Some("=9.9.9"))]);
        register(&mut reg, "b", "1.0.0", &[]);

        let err = Classification::of(&reg, &a).unwrap_err();
        assert!(matches!(err, ConcordError::Unsatisfiable { .. }));
        assert!(err.to_string().contains("9.9.9"));
    }

    #[test]
    fn exact_cycle_terminates() {
        let mut reg = Registry::new();
        let a = register(&mut reg, "a", "1.0.0", &[("b", Some("=1.0.0"))]);
        register(&mut reg, "b", "1.0.0", &[("a", Some("=1.0.0"))]);

        let classification = Classification::of(&reg, &a).unwrap();
        let exact: Vec<&str> = classification
            .exact
            .iter()
            .map(|uv| uv.name())
            .collect();
        assert_eq!(exact, ["b"]);
    }
}
