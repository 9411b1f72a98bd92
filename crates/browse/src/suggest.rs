//! Autocomplete suggestion ranking
//!
//! Matches the search box text against the disease and autoantibody columns
//! of a record set. Each category is scored, deduplicated, ordered and
//! truncated on its own, then the categories are concatenated.

use autoab_common::config::BrowseConfig;
use autoab_common::models::{FilterField, Record};
use autoab_common::Priority;
use serde::{Serialize, Serializer};
use std::cmp::Reverse;
use std::collections::HashMap;

/// Column a suggestion was drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SuggestionKind {
    Disease,
    Autoantibody,
}

impl SuggestionKind {
    pub fn field(self) -> FilterField {
        match self {
            SuggestionKind::Disease => FilterField::Disease,
            SuggestionKind::Autoantibody => FilterField::Autoantibody,
        }
    }
}

/// How closely a candidate matched. Higher is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchScore {
    Substring = 1,
    Prefix = 2,
    Exact = 3,
}

impl MatchScore {
    /// Score `candidate` against an already lowercased, trimmed query.
    pub fn of(candidate: &str, query: &str) -> Option<MatchScore> {
        let candidate = candidate.to_lowercase();
        if candidate == query {
            Some(MatchScore::Exact)
        } else if candidate.starts_with(query) {
            Some(MatchScore::Prefix)
        } else if candidate.contains(query) {
            Some(MatchScore::Substring)
        } else {
            None
        }
    }
}

impl Serialize for MatchScore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
    pub value: String,
    pub priority: Priority,
    pub match_score: MatchScore,
}

#[derive(Debug, Clone)]
pub struct SuggestionRanker {
    pub max_per_category: usize,
    pub min_query_len: usize,
    /// Categories in output order
    pub category_order: Vec<SuggestionKind>,
}

impl Default for SuggestionRanker {
    fn default() -> Self {
        Self {
            max_per_category: 50,
            min_query_len: 2,
            category_order: vec![SuggestionKind::Autoantibody, SuggestionKind::Disease],
        }
    }
}

impl SuggestionRanker {
    pub fn from_config(config: &BrowseConfig) -> Self {
        let category_order = if config.autoantibody_first {
            vec![SuggestionKind::Autoantibody, SuggestionKind::Disease]
        } else {
            vec![SuggestionKind::Disease, SuggestionKind::Autoantibody]
        };

        Self {
            max_per_category: config.max_suggestions_per_category,
            min_query_len: config.min_query_len,
            category_order,
        }
    }

    /// Whether `query` is long enough to be worth a fetch.
    pub fn accepts(&self, query: &str) -> bool {
        query.trim().chars().count() >= self.min_query_len
    }

    pub fn rank(&self, records: &[Record], query: &str) -> Vec<Suggestion> {
        if !self.accepts(query) {
            return Vec::new();
        }
        let query = query.trim().to_lowercase();

        self.category_order
            .iter()
            .flat_map(|&kind| self.rank_category(records, &query, kind))
            .collect()
    }

    fn rank_category(&self, records: &[Record], query: &str, kind: SuggestionKind) -> Vec<Suggestion> {
        let mut ranked: Vec<Suggestion> = Vec::new();
        let mut seen: HashMap<&str, usize> = HashMap::new();

        for record in records {
            let Some(value) = record.field(kind.field()).map(str::trim) else {
                continue;
            };
            if value.is_empty() {
                continue;
            }

            if let Some(&i) = seen.get(value) {
                ranked[i].priority = ranked[i].priority.max(record.priority);
                continue;
            }

            if let Some(match_score) = MatchScore::of(value, query) {
                seen.insert(value, ranked.len());
                ranked.push(Suggestion {
                    kind,
                    value: value.to_string(),
                    priority: record.priority,
                    match_score,
                });
            }
        }

        // stable: equal priority and score keep first-seen order
        ranked.sort_by_key(|s| (Reverse(s.priority), Reverse(s.match_score)));
        ranked.truncate(self.max_per_category);
        ranked
    }
}

/// Rank with the default category order and minimum query length.
pub fn rank_suggestions(records: &[Record], query: &str, max_per_category: usize) -> Vec<Suggestion> {
    SuggestionRanker {
        max_per_category,
        ..SuggestionRanker::default()
    }
    .rank(records, query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(disease: &str, antibody: &str, priority: f64) -> Record {
        Record {
            disease: disease.to_string(),
            autoantibody: antibody.to_string(),
            priority: Priority::new(priority),
            ..Record::default()
        }
    }

    fn values(suggestions: &[Suggestion]) -> Vec<&str> {
        suggestions.iter().map(|s| s.value.as_str()).collect()
    }

    #[test]
    fn test_prefix_beats_substring_at_equal_priority() {
        let records = vec![
            record("Drug-induced lupus", "", 1.0),
            record("Lupiod dermatitis", "", 1.0),
            record("Lupus", "", 1.0),
        ];

        let ranked = rank_suggestions(&records, "lup", 50);
        assert_eq!(values(&ranked), vec!["Lupiod dermatitis", "Lupus", "Drug-induced lupus"]);
        assert_eq!(ranked[2].match_score, MatchScore::Substring);
    }

    #[test]
    fn test_exact_match_ranks_first() {
        let records = vec![
            record("Lupus", "", 1.0),
            record("Drug-induced lupus", "", 1.0),
            record("LUP", "", 1.0),
        ];

        let ranked = rank_suggestions(&records, "  Lup ", 50);
        assert_eq!(ranked[0].value, "LUP");
        assert_eq!(ranked[0].match_score, MatchScore::Exact);
    }

    #[test]
    fn test_priority_dominates_score() {
        let records = vec![record("Lupus", "", 1.0), record("Drug-induced lupus", "", 4.0)];

        let ranked = rank_suggestions(&records, "lupus", 50);
        assert_eq!(values(&ranked), vec!["Drug-induced lupus", "Lupus"]);
    }

    #[test]
    fn test_duplicates_keep_max_priority() {
        let records = vec![
            record("Lupus", "", 1.0),
            record(" Lupus ", "", 6.0),
            record("Lupus nephritis", "", 3.0),
        ];

        let ranked = rank_suggestions(&records, "lupus", 50);
        assert_eq!(values(&ranked), vec!["Lupus", "Lupus nephritis"]);
        assert_eq!(ranked[0].priority.value(), 6.0);
    }

    #[test]
    fn test_short_query_is_empty() {
        let records = vec![record("Lupus", "Anti-La", 1.0)];
        assert!(rank_suggestions(&records, "l", 50).is_empty());
        assert!(rank_suggestions(&records, "  a  ", 50).is_empty());
    }

    #[test]
    fn test_autoantibodies_listed_before_diseases() {
        let records = vec![record("Antiphospholipid syndrome", "Anti-cardiolipin", 1.0)];

        let ranked = rank_suggestions(&records, "anti", 50);
        let kinds: Vec<_> = ranked.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![SuggestionKind::Autoantibody, SuggestionKind::Disease]);
    }

    #[test]
    fn test_category_order_is_configurable() {
        let config = BrowseConfig {
            autoantibody_first: false,
            ..BrowseConfig::default()
        };
        let records = vec![record("Antiphospholipid syndrome", "Anti-cardiolipin", 1.0)];

        let ranked = SuggestionRanker::from_config(&config).rank(&records, "anti");
        assert_eq!(ranked[0].kind, SuggestionKind::Disease);
    }

    #[test]
    fn test_truncates_per_category() {
        let records: Vec<Record> = (0..5)
            .map(|i| record(&format!("Thyroiditis {i}"), &format!("Anti-TPO {i}"), i as f64))
            .collect();

        let ranked = rank_suggestions(&records, "ti", 2);
        assert_eq!(values(&ranked), vec!["Anti-TPO 4", "Anti-TPO 3", "Thyroiditis 4", "Thyroiditis 3"]);
    }

    #[test]
    fn test_blank_candidates_are_skipped() {
        let records = vec![record("", "", 9.0), record("   ", "Anti-Jo-1", 1.0)];
        let ranked = rank_suggestions(&records, "jo", 50);

        assert_eq!(values(&ranked), vec!["Anti-Jo-1"]);
    }

    #[test]
    fn test_serialized_shape() {
        let ranked = rank_suggestions(&[record("Lupus", "", 2.0)], "lupus", 50);
        let json = serde_json::to_value(&ranked[0]).unwrap();

        assert_eq!(
            json,
            serde_json::json!({ "type": "disease", "value": "Lupus", "priority": 2.0, "matchScore": 3 })
        );
    }
}
