use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all Concord operations.
#[derive(Debug, Error, Diagnostic)]
pub enum ConcordError {
    /// A version string could not be parsed as semantic version.
    #[error("invalid version `{version}` for `{unit}`: {reason}")]
    InvalidVersion {
        unit: String,
        version: String,
        reason: String,
    },

    /// A constraint expression is neither an exact pin nor a bare version.
    #[error("malformed constraint `{expr}` on `{unit}`: {reason}")]
    #[diagnostic(help("a constraint is either `=1.2.3` (exact) or `1.2.3` (compatible range)"))]
    MalformedConstraint {
        unit: String,
        expr: String,
        reason: String,
    },

    /// The same (name, version) pair was registered twice.
    #[error("duplicate version: `{unit}` {version} is already registered")]
    DuplicateVersion { unit: String, version: String },

    /// A constraint targets a unit that is not a declared dependency.
    #[error("`{unit}` constrains `{target}` but does not depend on it")]
    #[diagnostic(help("declare the dependency with add_dependency before constraining it"))]
    UnknownDependency { unit: String, target: String },

    /// Two chains of exact constraints force different versions of one unit.
    #[error(
        "conflicting exact constraints on `{unit}`: \
         {existing} (via {existing_chain}) vs {requested} (via {requested_chain})"
    )]
    ConflictingExactConstraint {
        unit: String,
        existing: String,
        existing_chain: String,
        requested: String,
        requested_chain: String,
    },

    /// The search exhausted the space with no complete valid assignment.
    #[error("no satisfying assignment exists: {diagnosis}")]
    Unsatisfiable { diagnosis: String },

    /// The step budget ran out before a solution was found or the space was
    /// exhausted. Not a proof of unsatisfiability.
    #[error("search budget of {steps} steps exhausted with no solution found")]
    BudgetExhausted { steps: u64 },
}

/// Convenience alias used throughout Concord.
pub type ConcordResult<T> = Result<T, ConcordError>;
