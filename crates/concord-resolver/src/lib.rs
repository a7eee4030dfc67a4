//! Unit-version constraint resolution engine: exact/inexact transitive
//! dependency classification, backtracking search over free version choices,
//! and cost-based selection among complete assignments.

pub mod classify;
pub mod conflict;
pub mod cost;
pub mod graph;
pub mod search;
