//! Unsatisfiability diagnosis reporting.

use std::fmt;

/// A contested unit with the competing requirements discovered during search.
///
/// Assembled on a best-effort basis from the constraint accumulator at the
/// moment a violation or domain wipeout is observed.
#[derive(Debug, Clone, Default)]
pub struct ConflictDiagnosis {
    pub unit: String,
    pub competing: Vec<CompetingConstraint>,
    /// The version already assigned when the conflict surfaced, with the
    /// chain of units that introduced it.
    pub assigned: Option<(String, String)>,
    /// True when the registry holds no versions of the unit at all.
    pub unknown_unit: bool,
}

/// One requirement on the contested unit and the chain that introduced it.
#[derive(Debug, Clone)]
pub struct CompetingConstraint {
    pub expr: String,
    pub chain: String,
}

impl ConflictDiagnosis {
    pub fn new(unit: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            ..Self::default()
        }
    }

    pub fn add(&mut self, expr: &str, chain: &str) {
        self.competing.push(CompetingConstraint {
            expr: expr.to_string(),
            chain: chain.to_string(),
        });
    }

    pub fn note_assigned(&mut self, id: &str, chain: &str) {
        self.assigned = Some((id.to_string(), chain.to_string()));
    }

    pub fn is_empty(&self) -> bool {
        self.competing.is_empty() && self.assigned.is_none() && !self.unknown_unit
    }
}

impl fmt::Display for ConflictDiagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no version of `{}` satisfies", self.unit)?;
        if self.unknown_unit {
            write!(f, " anything: no versions are registered")?;
            return Ok(());
        }
        let mut first = true;
        for c in &self.competing {
            if !first {
                write!(f, " and")?;
            }
            first = false;
            write!(f, " `{}` (via {})", c.expr, c.chain)?;
        }
        if let Some((id, chain)) = &self.assigned {
            write!(f, "; {id} was already chosen (via {chain})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_diagnosis() {
        let d = ConflictDiagnosis::new("x");
        assert!(d.is_empty());
    }

    #[test]
    fn display_lists_competitors() {
        let mut d = ConflictDiagnosis::new("c");
        d.add("=1.0.0", "a@1.0.0 -> b@1.0.0");
        d.add("1.1.0", "a@1.0.0");
        let s = d.to_string();
        assert!(s.contains("`c`"));
        assert!(s.contains("`=1.0.0` (via a@1.0.0 -> b@1.0.0)"));
        assert!(s.contains("and `1.1.0` (via a@1.0.0)"));
    }

    #[test]
    fn display_unknown_unit() {
        let d = ConflictDiagnosis {
            unit: "ghost".to_string(),
            unknown_unit: true,
            ..ConflictDiagnosis::default()
        };
        assert!(d.to_string().contains("no versions are registered"));
    }

    #[test]
    fn display_mentions_assigned() {
        let mut d = ConflictDiagnosis::new("b");
        d.add("=2.0.0", "c@1.0.0");
        d.note_assigned("b@1.0.0", "a@1.0.0");
        let s = d.to_string();
        assert!(s.contains("b@1.0.0 was already chosen (via a@1.0.0)"));
    }
}
