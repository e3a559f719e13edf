//! Sort policies over a provider's published results.
//!
//! Ranking is applied to a *view*: stored [`ResultGroup`]s are never
//! reordered. Every policy is a stable sort, so ties keep provider order.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SearchError;
use crate::types::{ResultGroup, SearchResult};

/// A named sort policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// Ascending provider relevance; results without relevance last.
    #[default]
    Best,
    /// Newest first; results without a modification time last.
    Recent,
    /// Ascending by title, plain code-point order.
    Az,
}

impl SortMode {
    /// All policies, in the order front ends list them.
    pub fn all() -> &'static [SortMode] {
        &[Self::Best, Self::Recent, Self::Az]
    }

    /// Stable identifier used in URLs and preferences.
    pub fn id(&self) -> &'static str {
        match self {
            Self::Best => "best",
            Self::Recent => "recent",
            Self::Az => "az",
        }
    }

    /// Human-readable label.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Best => "Best",
            Self::Recent => "Recent",
            Self::Az => "A-Z",
        }
    }

    /// Compare two results under this policy.
    pub fn compare(&self, a: &SearchResult, b: &SearchResult) -> Ordering {
        match self {
            Self::Best => by_relevance(a, b),
            Self::Recent => by_recency(a, b),
            Self::Az => a.title.cmp(&b.title),
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for SortMode {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "best" => Ok(Self::Best),
            "recent" => Ok(Self::Recent),
            "az" | "a-z" => Ok(Self::Az),
            other => Err(SearchError::Config(format!("unknown sort mode: {other}"))),
        }
    }
}

fn by_relevance(a: &SearchResult, b: &SearchResult) -> Ordering {
    match (a.relevance, b.relevance) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn by_recency(a: &SearchResult, b: &SearchResult) -> Ordering {
    // `None` is the minimum, so reversing puts it last.
    b.modified.cmp(&a.modified)
}

/// Return a sorted view of `results` without reordering the input.
pub fn rank(results: &[SearchResult], mode: SortMode) -> Vec<&SearchResult> {
    let mut view: Vec<&SearchResult> = results.iter().collect();
    view.sort_by(|a, b| mode.compare(a, b));
    view
}

/// Build a render-ready copy of published groups.
///
/// Groups are kept in publish order; empty groups and groups from
/// `hidden` providers are skipped, and each group's results are sorted
/// by `mode`.
pub fn ranked_groups(groups: &[ResultGroup], mode: SortMode, hidden: &[String]) -> Vec<ResultGroup> {
    groups
        .iter()
        .filter(|g| !g.results.is_empty() && !hidden.iter().any(|h| h == &g.provider_id))
        .map(|g| ResultGroup {
            provider_id: g.provider_id.clone(),
            elapsed_ms: g.elapsed_ms,
            results: rank(&g.results, mode).into_iter().cloned().collect(),
            error: g.error.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(title: &str, relevance: Option<u32>, modified: Option<i64>) -> SearchResult {
        SearchResult {
            relevance,
            modified,
            ..SearchResult::new(title, format!("https://example.com/{title}"))
        }
    }

    fn titles(view: &[&SearchResult]) -> Vec<String> {
        view.iter().map(|r| r.title.clone()).collect()
    }

    #[test]
    fn best_sorts_by_relevance_missing_last() {
        let results = vec![
            result("none", None, None),
            result("two", Some(2), None),
            result("zero", Some(0), None),
        ];
        assert_eq!(titles(&rank(&results, SortMode::Best)), ["zero", "two", "none"]);
    }

    #[test]
    fn best_is_stable_on_sorted_input() {
        let results: Vec<SearchResult> = (0..5)
            .map(|i| result(&format!("r{i}"), Some(i), None))
            .collect();
        let view = rank(&results, SortMode::Best);
        assert_eq!(titles(&view), ["r0", "r1", "r2", "r3", "r4"]);
    }

    #[test]
    fn best_keeps_arrival_order_for_ties() {
        let results = vec![result("b", None, None), result("a", None, None)];
        assert_eq!(titles(&rank(&results, SortMode::Best)), ["b", "a"]);
    }

    #[test]
    fn recent_sorts_newest_first_missing_last() {
        let results = vec![
            result("missing", None, None),
            result("older", None, Some(1_600_000_000)),
            result("newer", None, Some(1_700_000_000)),
        ];
        assert_eq!(
            titles(&rank(&results, SortMode::Recent)),
            ["newer", "older", "missing"]
        );
    }

    #[test]
    fn az_uses_code_point_order() {
        let results = vec![
            result("beta", None, None),
            result("Zeta", None, None),
            result("alpha", None, None),
        ];
        // Uppercase sorts before lowercase in code-point order.
        assert_eq!(titles(&rank(&results, SortMode::Az)), ["Zeta", "alpha", "beta"]);
    }

    #[test]
    fn rank_does_not_mutate_input() {
        let results = vec![result("b", Some(1), None), result("a", Some(0), None)];
        let _ = rank(&results, SortMode::Best);
        assert_eq!(results[0].title, "b");
    }

    #[test]
    fn sort_mode_parses_and_displays() {
        assert_eq!("best".parse::<SortMode>().expect("parse"), SortMode::Best);
        assert_eq!("Recent".parse::<SortMode>().expect("parse"), SortMode::Recent);
        assert_eq!("A-Z".parse::<SortMode>().expect("parse"), SortMode::Az);
        assert!("loudest".parse::<SortMode>().is_err());
        assert_eq!(SortMode::Az.to_string(), "az");
        assert_eq!(SortMode::Az.name(), "A-Z");
        assert_eq!(SortMode::default(), SortMode::Best);
    }

    #[test]
    fn sort_mode_serde_lowercase() {
        let json = serde_json::to_string(&SortMode::Recent).expect("serialize");
        assert_eq!(json, "\"recent\"");
    }

    #[test]
    fn ranked_groups_skip_hidden_and_empty() {
        let groups = vec![
            ResultGroup {
                provider_id: "a".into(),
                elapsed_ms: 5,
                results: vec![result("x", Some(1), None), result("y", Some(0), None)],
                error: None,
            },
            ResultGroup {
                provider_id: "b".into(),
                elapsed_ms: 5,
                results: vec![result("z", Some(0), None)],
                error: None,
            },
            ResultGroup {
                provider_id: "c".into(),
                elapsed_ms: 5,
                results: vec![],
                error: Some("network error: down".into()),
            },
        ];

        let view = ranked_groups(&groups, SortMode::Best, &["b".to_string()]);
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].provider_id, "a");
        assert_eq!(view[0].results[0].title, "y");
        // Stored groups keep provider order.
        assert_eq!(groups[0].results[0].title, "x");
    }
}
