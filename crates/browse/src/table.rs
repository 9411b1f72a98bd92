//! Record table sorting

use autoab_common::models::{Record, SortOrder};
use serde::Serialize;
use std::cmp::Ordering;

/// Sortable table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    Disease,
    Autoantibody,
    Autoantigen,
    Epitope,
    Type,
    UniprotId,
    DiagnosticMarker,
    Sensitivity,
    Priority,
    UpdatedAt,
}

impl SortKey {
    /// Column from its `sortBy` name. Unknown names give `None`.
    pub fn from_param(name: &str) -> Option<SortKey> {
        let key = match name.trim() {
            "disease" => SortKey::Disease,
            "autoantibody" => SortKey::Autoantibody,
            "autoantigen" => SortKey::Autoantigen,
            "epitope" => SortKey::Epitope,
            "type" => SortKey::Type,
            "uniprotId" => SortKey::UniprotId,
            "diagnosticMarker" => SortKey::DiagnosticMarker,
            "sensitivity" => SortKey::Sensitivity,
            "priority" => SortKey::Priority,
            "updatedAt" => SortKey::UpdatedAt,
            _ => return None,
        };
        Some(key)
    }

    fn text(self, record: &Record) -> Option<String> {
        let raw = match self {
            SortKey::Disease => Some(record.disease.as_str()),
            SortKey::Autoantibody => Some(record.autoantibody.as_str()),
            SortKey::Autoantigen => Some(record.autoantigen.as_str()),
            SortKey::Epitope => record.epitope.as_deref(),
            SortKey::Type => record.record_type.as_deref(),
            SortKey::UniprotId => record.uniprot_id.as_deref(),
            SortKey::Sensitivity => record.sensitivity.as_deref(),
            SortKey::DiagnosticMarker => {
                return record
                    .diagnostic_marker
                    .clone()
                    .map(|m| String::from(m).to_lowercase())
            }
            SortKey::Priority | SortKey::UpdatedAt => None,
        };
        raw.map(str::to_lowercase)
    }

    fn compare(self, a: &Record, b: &Record) -> Ordering {
        match self {
            SortKey::Priority => a.priority.cmp(&b.priority),
            SortKey::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            _ => self.text(a).cmp(&self.text(b)),
        }
    }
}

/// Stable in-place sort. Text columns compare case-insensitively and
/// missing values sort before present ones in ascending order.
pub fn sort_records(records: &mut [Record], key: SortKey, order: SortOrder) {
    records.sort_by(|a, b| {
        let ordering = key.compare(a, b);
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoab_common::Priority;
    use pretty_assertions::assert_eq;

    fn record(id: &str, antigen: &str, priority: f64) -> Record {
        Record {
            id: id.to_string(),
            autoantigen: antigen.to_string(),
            priority: Priority::new(priority),
            ..Record::default()
        }
    }

    fn ids(records: &[Record]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_text_sort_ignores_case() {
        let mut records = vec![record("1", "histone", 0.0), record("2", "DNA", 0.0), record("3", "Ro60", 0.0)];
        sort_records(&mut records, SortKey::Autoantigen, SortOrder::Asc);

        assert_eq!(ids(&records), vec!["2", "1", "3"]);
    }

    #[test]
    fn test_priority_sort_uses_parsed_value() {
        let mut records: Vec<Record> = serde_json::from_value(serde_json::json!([
            { "_id": "a", "priority": "10" },
            { "_id": "b", "priority": 9 },
            { "_id": "c", "priority": "n/a" },
        ]))
        .unwrap();

        sort_records(&mut records, SortKey::Priority, SortOrder::Desc);
        assert_eq!(ids(&records), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_sort_is_stable() {
        let mut records = vec![record("1", "DNA", 1.0), record("2", "dna", 1.0), record("3", "Dna", 1.0)];
        sort_records(&mut records, SortKey::Autoantigen, SortOrder::Desc);

        assert_eq!(ids(&records), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_from_param() {
        assert_eq!(SortKey::from_param("uniprotId"), Some(SortKey::UniprotId));
        assert_eq!(SortKey::from_param("priority"), Some(SortKey::Priority));
        assert_eq!(SortKey::from_param("uniprot_id"), None);
        assert_eq!(SortKey::from_param(""), None);
    }
}
