//! Scoring of complete assignments.

use std::collections::BTreeMap;
use std::sync::Arc;

use concord_core::unit::UnitVersion;
use concord_core::version;

/// Scores a complete name-to-version assignment; lower is better.
pub type CostFn = Box<dyn Fn(&BTreeMap<String, Arc<UnitVersion>>) -> f64>;

/// Default cost: the negated sum of version magnitudes, so the newest
/// mutually compatible set scores lowest.
pub fn newest(assignment: &BTreeMap<String, Arc<UnitVersion>>) -> f64 {
    -assignment
        .values()
        .map(|uv| version::magnitude(uv.version()))
        .sum::<f64>()
}

/// The mirror image of [`newest`]: prefers the oldest satisfying set, in the
/// spirit of minimal version selection.
pub fn oldest(assignment: &BTreeMap<String, Arc<UnitVersion>>) -> f64 {
    -newest(assignment)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment(versions: &[(&str, &str)]) -> BTreeMap<String, Arc<UnitVersion>> {
        versions
            .iter()
            .map(|(name, v)| {
                (
                    name.to_string(),
                    Arc::new(UnitVersion::new(*name, v).unwrap()),
                )
            })
            .collect()
    }

    #[test]
    fn newest_prefers_higher_versions() {
        let older = assignment(&[("a", "1.0.0"), ("b", "1.0.0")]);
        let newer = assignment(&[("a", "1.1.0"), ("b", "1.0.0")]);
        assert!(newest(&newer) < newest(&older));
    }

    #[test]
    fn oldest_prefers_lower_versions() {
        let older = assignment(&[("a", "1.0.0")]);
        let newer = assignment(&[("a", "2.0.0")]);
        assert!(oldest(&older) < oldest(&newer));
    }
}
