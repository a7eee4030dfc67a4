//! Seeding plus backtracking search over free unit versions.
//!
//! Units pinned by chains of exact constraints are forced up front and never
//! enumerated; backtracking runs only over units whose version is left open
//! by a range constraint or no constraint at all. Every mutation made while
//! trying a candidate is recorded on an explicit trail, so undoing a decision
//! is O(diff) rather than a clone of the working state.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use concord_core::constraint::VersionConstraint;
use concord_core::errors::{ConcordError, ConcordResult};
use concord_core::registry::Registry;
use concord_core::unit::UnitVersion;

use crate::conflict::ConflictDiagnosis;
use crate::cost::{self, CostFn};
use crate::graph::ResolvedGraph;

/// Knobs for a single [`resolve`] call.
pub struct ResolveOptions {
    /// Constraints applied as if declared by a synthetic root, letting a
    /// caller pin units without touching the registry. They constrain a unit
    /// once it is reachable; they do not pull it into the closure by
    /// themselves.
    pub extra_constraints: Vec<Arc<VersionConstraint>>,
    /// A previous assignment to prefer keeping, version by version.
    pub previous: Vec<Arc<UnitVersion>>,
    /// Scores a complete assignment; lower wins. Defaults to [`cost::newest`].
    pub cost: Option<CostFn>,
    /// How much worse than optimal a solution may score and still win on the
    /// strength of retaining more `previous` versions.
    pub previous_tolerance: f64,
    /// Cap on candidate trials (extension). Exhausting it with no solution
    /// found is `BudgetExhausted`, never a proof of unsatisfiability; with at
    /// least one solution found, the best so far is returned.
    pub max_steps: Option<u64>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            extra_constraints: Vec::new(),
            previous: Vec::new(),
            cost: None,
            previous_tolerance: 0.0,
            max_steps: None,
        }
    }
}

/// A complete, constraint-satisfying assignment.
#[derive(Debug)]
pub struct Resolution {
    /// Each root followed by its dependencies, depth-first over declaration
    /// order, duplicates suppressed.
    pub units: Vec<Arc<UnitVersion>>,
    /// The chosen version of every unit in the closure.
    pub assignment: BTreeMap<String, Arc<UnitVersion>>,
    /// The assignment as a dependency graph, for display and path queries.
    pub graph: ResolvedGraph,
}

/// Resolve one version for every unit transitively reachable from `roots`.
///
/// Pure and synchronous: the registry is only read, and all working state is
/// private to this call, so concurrent resolutions over a shared registry are
/// safe.
pub fn resolve(
    registry: &Registry,
    roots: &[&str],
    options: ResolveOptions,
) -> ConcordResult<Resolution> {
    let cost = options.cost.unwrap_or_else(|| Box::new(cost::newest));
    let previous: HashMap<String, Arc<UnitVersion>> = options
        .previous
        .iter()
        .map(|uv| (uv.name().to_string(), uv.clone()))
        .collect();

    let mut search = Search {
        registry,
        constraints: HashMap::new(),
        assignment: HashMap::new(),
        assigned_chain: HashMap::new(),
        agenda: Vec::new(),
        discovered: HashSet::new(),
        trail: Vec::new(),
        previous,
        cost,
        previous_tolerance: options.previous_tolerance.max(0.0),
        max_steps: options.max_steps,
        steps: 0,
        budget_hit: false,
        seeding: true,
        seed_conflict: None,
        frontier: Vec::new(),
        min_cost: f64::INFINITY,
        solutions: 0,
        last_conflict: None,
    };

    for root in roots {
        if search.discovered.insert((*root).to_string()) {
            search.agenda.push((*root).to_string());
        }
    }
    for constraint in &options.extra_constraints {
        search
            .constraints
            .entry(constraint.unit().to_string())
            .or_default()
            .push(ConstraintEntry {
                constraint: constraint.clone(),
                chain: "(request)".to_string(),
            });
    }

    search.seed()?;
    search.seeding = false;
    search.run();

    if search.frontier.is_empty() {
        if search.budget_hit {
            return Err(ConcordError::BudgetExhausted {
                steps: search.steps,
            });
        }
        return Err(ConcordError::Unsatisfiable {
            diagnosis: search.diagnosis_string(),
        });
    }

    let winner = search.best_solution();
    let assignment = winner.assignment.clone();
    let graph = ResolvedGraph::new(roots, &assignment);
    let units = graph.ordered_units();
    tracing::debug!(
        "resolved {} units in {} steps ({} complete assignments considered)",
        units.len(),
        search.steps,
        search.solutions
    );
    Ok(Resolution {
        units,
        assignment,
        graph,
    })
}

/// One accumulated requirement on a unit, with the chain of unit ids that
/// introduced it (for diagnostics).
struct ConstraintEntry {
    constraint: Arc<VersionConstraint>,
    chain: String,
}

/// One undoable mutation of the working state.
enum TrailOp {
    Assigned(String),
    ConstraintAdded(String),
    Discovered,
}

/// A recorded complete solution.
struct Solution {
    assignment: BTreeMap<String, Arc<UnitVersion>>,
    cost: f64,
    retained: usize,
}

struct Search<'a> {
    registry: &'a Registry,
    /// Requirements accumulated per unit name; entries beyond the seeding
    /// phase are popped on backtrack.
    constraints: HashMap<String, Vec<ConstraintEntry>>,
    assignment: HashMap<String, Arc<UnitVersion>>,
    /// Chain of unit ids that led to each assignment.
    assigned_chain: HashMap<String, String>,
    /// Every reachable unit name, in discovery order.
    agenda: Vec<String>,
    discovered: HashSet<String>,
    trail: Vec<TrailOp>,
    previous: HashMap<String, Arc<UnitVersion>>,
    cost: CostFn,
    previous_tolerance: f64,
    max_steps: Option<u64>,
    steps: u64,
    budget_hit: bool,
    seeding: bool,
    seed_conflict: Option<ConcordError>,
    /// Solutions still in the running: within tolerance of the best cost and
    /// not dominated on (cost, retained) by an earlier find.
    frontier: Vec<Solution>,
    min_cost: f64,
    solutions: u64,
    last_conflict: Option<ConflictDiagnosis>,
}

impl Search<'_> {
    /// Force every unit whose domain has no real choice, chasing exact
    /// chains, before any backtracking. Conflicting exact chains and empty
    /// domains are rejected here.
    fn seed(&mut self) -> ConcordResult<()> {
        let mut i = 0;
        while i < self.agenda.len() {
            let name = self.agenda[i].clone();
            i += 1;
            if self.assignment.contains_key(&name) {
                continue;
            }
            let domain = self.candidates(&name);
            if domain.is_empty() {
                // Constraints active during seeding are permanent, so an
                // empty domain here can never recover.
                self.conflict_on(&name);
                return Err(ConcordError::Unsatisfiable {
                    diagnosis: self.diagnosis_string(),
                });
            }
            if domain.len() == 1 {
                let only = domain[0].clone();
                tracing::trace!("seeding forced unit {}", only.id());
                if !self.apply(&only, "") {
                    if let Some(err) = self.seed_conflict.take() {
                        return Err(err);
                    }
                    return Err(ConcordError::Unsatisfiable {
                        diagnosis: self.diagnosis_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Depth-first backtracking over the agenda; records every complete
    /// valid assignment and keeps going so solutions can be compared.
    fn run(&mut self) {
        if self.budget_hit {
            return;
        }
        let next = self
            .agenda
            .iter()
            .find(|name| !self.assignment.contains_key(*name))
            .cloned();
        let Some(unit) = next else {
            self.record_solution();
            return;
        };

        let domain = self.candidates(&unit);
        if domain.is_empty() {
            self.conflict_on(&unit);
            return;
        }
        for candidate in domain {
            if let Some(max) = self.max_steps {
                if self.steps >= max {
                    self.budget_hit = true;
                    tracing::debug!("search budget exhausted after {} steps", self.steps);
                    return;
                }
            }
            self.steps += 1;
            tracing::trace!("trying {} for `{}`", candidate.id(), unit);
            let mark = self.trail.len();
            if self.apply(&candidate, "") {
                self.run();
            } else {
                tracing::trace!("rejected {}", candidate.id());
            }
            self.undo_to(mark);
            if self.budget_hit {
                return;
            }
        }
    }

    /// Assign `uv` plus everything its exact constraints force, recording
    /// every mutation on the trail. On a violation the conflict is remembered
    /// and `false` returned; the caller unwinds to its trail mark.
    fn apply(&mut self, uv: &Arc<UnitVersion>, parent_chain: &str) -> bool {
        let chain = if parent_chain.is_empty() {
            uv.id()
        } else {
            format!("{parent_chain} -> {}", uv.id())
        };
        let name = uv.name().to_string();
        self.trail.push(TrailOp::Assigned(name.clone()));
        self.assignment.insert(name.clone(), uv.clone());
        self.assigned_chain.insert(name, chain.clone());

        for dep in uv.dependencies() {
            if self.discovered.insert(dep.clone()) {
                self.agenda.push(dep.clone());
                self.trail.push(TrailOp::Discovered);
            }

            let Some(constraint) = uv.constraint_on(dep) else {
                continue;
            };
            let constraint = constraint.clone();
            self.constraints
                .entry(dep.clone())
                .or_default()
                .push(ConstraintEntry {
                    constraint: constraint.clone(),
                    chain: chain.clone(),
                });
            self.trail.push(TrailOp::ConstraintAdded(dep.clone()));

            if let Some(assigned) = self.assignment.get(dep).cloned() {
                if !constraint.accepts(&assigned) {
                    self.conflict_on(dep);
                    if self.seeding && constraint.is_exact() {
                        self.seed_conflict = Some(ConcordError::ConflictingExactConstraint {
                            unit: dep.clone(),
                            existing: assigned.version().to_string(),
                            existing_chain: self
                                .assigned_chain
                                .get(dep)
                                .cloned()
                                .unwrap_or_default(),
                            requested: constraint
                                .pinned()
                                .map(|v| v.to_string())
                                .unwrap_or_default(),
                            requested_chain: chain.clone(),
                        });
                    }
                    return false;
                }
                continue;
            }

            if let Some(pin) = constraint.pinned() {
                let Some(pinned) = self.registry.lookup(dep, pin) else {
                    self.conflict_on(dep);
                    return false;
                };
                if !self.satisfies_all(dep, &pinned) {
                    self.conflict_on(dep);
                    return false;
                }
                tracing::trace!("forcing {} via {}", pinned.id(), chain);
                if !self.apply(&pinned, &chain) {
                    return false;
                }
            }
        }
        true
    }

    fn undo_to(&mut self, mark: usize) {
        while self.trail.len() > mark {
            match self.trail.pop() {
                Some(TrailOp::Assigned(name)) => {
                    self.assignment.remove(&name);
                    self.assigned_chain.remove(&name);
                }
                Some(TrailOp::ConstraintAdded(name)) => {
                    if let Some(entries) = self.constraints.get_mut(&name) {
                        entries.pop();
                    }
                }
                Some(TrailOp::Discovered) => {
                    if let Some(name) = self.agenda.pop() {
                        self.discovered.remove(&name);
                    }
                }
                None => break,
            }
        }
    }

    /// Registered versions of `name` satisfying every accumulated constraint,
    /// newest first, with a `previous` choice hoisted to the front.
    fn candidates(&self, name: &str) -> Vec<Arc<UnitVersion>> {
        let mut domain: Vec<Arc<UnitVersion>> = self
            .registry
            .versions_of(name)
            .iter()
            .filter(|uv| self.satisfies_all(name, uv))
            .cloned()
            .collect();
        domain.sort_by(|a, b| b.version().cmp(a.version()));
        if let Some(prev) = self.previous.get(name) {
            if let Some(pos) = domain.iter().position(|uv| uv.version() == prev.version()) {
                let preferred = domain.remove(pos);
                domain.insert(0, preferred);
            }
        }
        domain
    }

    fn satisfies_all(&self, name: &str, candidate: &UnitVersion) -> bool {
        self.constraints
            .get(name)
            .map(|entries| entries.iter().all(|e| e.constraint.accepts(candidate)))
            .unwrap_or(true)
    }

    fn record_solution(&mut self) {
        let assignment: BTreeMap<String, Arc<UnitVersion>> = self
            .assignment
            .iter()
            .map(|(name, uv)| (name.clone(), uv.clone()))
            .collect();
        let cost = (self.cost)(&assignment);
        let retained = assignment
            .iter()
            .filter(|(name, uv)| {
                self.previous
                    .get(*name)
                    .is_some_and(|prev| prev.version() == uv.version())
            })
            .count();
        self.solutions += 1;
        tracing::debug!(
            "complete assignment #{} (cost {cost}, retained {retained})",
            self.solutions
        );

        if cost < self.min_cost {
            self.min_cost = cost;
            let keep = self.min_cost + self.previous_tolerance;
            self.frontier.retain(|s| s.cost <= keep);
        }
        // An earlier solution that is at least as cheap and retains at least
        // as much makes this one unable to win under any later pruning.
        let dominated = self
            .frontier
            .iter()
            .any(|s| s.retained >= retained && s.cost <= cost);
        if !dominated && cost <= self.min_cost + self.previous_tolerance {
            self.frontier.push(Solution {
                assignment,
                cost,
                retained,
            });
        }
    }

    /// Lowest cost wins, first-found breaking ties; a solution within
    /// tolerance that retains strictly more previous choices overrides.
    fn best_solution(&self) -> &Solution {
        let keep = self.min_cost + self.previous_tolerance;
        let mut winner = self
            .frontier
            .iter()
            .find(|s| s.cost <= self.min_cost)
            .unwrap_or(&self.frontier[0]);
        for candidate in &self.frontier {
            if candidate.cost <= keep && candidate.retained > winner.retained {
                winner = candidate;
            }
        }
        winner
    }

    fn conflict_on(&mut self, unit: &str) {
        let mut diagnosis = ConflictDiagnosis::new(unit);
        diagnosis.unknown_unit = self.registry.versions_of(unit).is_empty();
        if let Some(entries) = self.constraints.get(unit) {
            for entry in entries {
                diagnosis.add(entry.constraint.expr(), &entry.chain);
            }
        }
        if let Some(assigned) = self.assignment.get(unit) {
            let chain = self
                .assigned_chain
                .get(unit)
                .map(String::as_str)
                .unwrap_or("?");
            diagnosis.note_assigned(&assigned.id(), chain);
        }
        self.last_conflict = Some(diagnosis);
    }

    fn diagnosis_string(&self) -> String {
        match &self.last_conflict {
            Some(diagnosis) => diagnosis.to_string(),
            None => "the dependency closure admits no complete assignment".to_string(),
        }
    }
}
