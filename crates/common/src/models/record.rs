//! Disease / autoantibody / autoantigen association records

use crate::errors::{AppError, Result};
use crate::models::FilterField;
use crate::priority::Priority;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use validator::{Validate, ValidationError};

/// One curated association row.
///
/// `disease`, `autoantibody` and `autoantigen` are required when a record is
/// created, but rows read back from the catalog are taken as they come: a
/// missing or `null` key becomes `""` and is grouped under that literal.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    #[serde(default, alias = "_id", deserialize_with = "null_as_empty")]
    pub id: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub disease: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub autoantibody: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub autoantigen: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epitope: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uniprot_id: Option<String>,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub record_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic_marker: Option<DiagnosticMarker>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitivity: Option<String>,

    /// Parsed at the boundary; see [`crate::priority`].
    #[serde(default)]
    pub priority: Priority,

    #[serde(flatten)]
    pub details: DescriptiveFields,

    /// Unanchored metadata carried through untouched
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub additional: BTreeMap<String, serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Display-only columns. The browse engine never interprets these.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptiveFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disease_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disease_subtype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organ_system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autoantibody_synonyms: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autoantigen_synonyms: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isotype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specificity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positive_predictive_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative_predictive_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prevalence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detection_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clinical_association: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pathogenicity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// `diagnosticMarker` column. Anything other than yes/no is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DiagnosticMarker {
    Yes,
    No,
    Other(String),
}

impl From<String> for DiagnosticMarker {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "yes" => DiagnosticMarker::Yes,
            "no" => DiagnosticMarker::No,
            _ => DiagnosticMarker::Other(raw),
        }
    }
}

impl From<DiagnosticMarker> for String {
    fn from(marker: DiagnosticMarker) -> Self {
        match marker {
            DiagnosticMarker::Yes => "Yes".to_string(),
            DiagnosticMarker::No => "No".to_string(),
            DiagnosticMarker::Other(raw) => raw,
        }
    }
}

impl Record {
    /// Value of a cascade filter column on this record.
    pub fn field(&self, field: FilterField) -> Option<&str> {
        match field {
            FilterField::Disease => Some(self.disease.as_str()),
            FilterField::Autoantibody => Some(self.autoantibody.as_str()),
            FilterField::Autoantigen => Some(self.autoantigen.as_str()),
            FilterField::Epitope => self.epitope.as_deref(),
            FilterField::Type => self.record_type.as_deref(),
            FilterField::UniprotId => self.uniprot_id.as_deref(),
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Create payload, checked before it is submitted to the catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewRecord {
    #[validate(custom(function = "not_blank"))]
    pub disease: String,

    #[validate(custom(function = "not_blank"))]
    pub autoantibody: String,

    #[validate(custom(function = "not_blank"))]
    pub autoantigen: String,

    #[serde(default)]
    pub epitope: Option<String>,

    #[serde(default)]
    #[validate(length(max = 32))]
    pub uniprot_id: Option<String>,

    #[serde(default, rename = "type")]
    pub record_type: Option<String>,

    #[serde(default)]
    pub diagnostic_marker: Option<DiagnosticMarker>,

    #[serde(default)]
    pub sensitivity: Option<String>,

    #[serde(default)]
    pub priority: Priority,

    #[serde(flatten)]
    pub details: DescriptiveFields,

    #[serde(default)]
    pub additional: BTreeMap<String, serde_json::Value>,
}

fn not_blank(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

impl NewRecord {
    /// Validate and trim the required keys.
    pub fn validated(mut self) -> Result<Self> {
        self.validate().map_err(|errors| {
            let mut fields: Vec<String> = errors
                .field_errors()
                .keys()
                .map(|k| k.to_string())
                .collect();
            fields.sort();
            AppError::Validation {
                message: format!("invalid fields: {}", fields.join(", ")),
                field: fields.into_iter().next(),
            }
        })?;

        self.disease = self.disease.trim().to_string();
        self.autoantibody = self.autoantibody.trim().to_string();
        self.autoantigen = self.autoantigen.trim().to_string();
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_from_upstream_json() {
        let raw = json!({
            "_id": "665f1c",
            "disease": "Systemic lupus erythematosus",
            "autoantibody": "Anti-dsDNA",
            "autoantigen": "dsDNA",
            "uniprotId": "P0DMV8",
            "type": "Nuclear",
            "diagnosticMarker": "yes",
            "priority": " 5 ",
            "isotype": "IgG",
            "additional": {"cohort": "EU"}
        });

        let record: Record = serde_json::from_value(raw).unwrap();
        assert_eq!(record.id, "665f1c");
        assert_eq!(record.priority.value(), 5.0);
        assert_eq!(record.diagnostic_marker, Some(DiagnosticMarker::Yes));
        assert_eq!(record.record_type.as_deref(), Some("Nuclear"));
        assert_eq!(record.details.isotype.as_deref(), Some("IgG"));
        assert_eq!(record.additional["cohort"], json!("EU"));
        assert_eq!(record.field(FilterField::UniprotId), Some("P0DMV8"));
    }

    #[test]
    fn test_missing_keys_become_empty() {
        let record: Record =
            serde_json::from_value(json!({"id": "1", "disease": null, "priority": ""})).unwrap();
        assert_eq!(record.disease, "");
        assert_eq!(record.autoantibody, "");
        assert_eq!(record.priority.value(), 0.0);
    }

    #[test]
    fn test_other_marker_kept_verbatim() {
        let marker = DiagnosticMarker::from("Supportive".to_string());
        assert_eq!(marker, DiagnosticMarker::Other("Supportive".to_string()));
        assert_eq!(String::from(marker), "Supportive");
    }

    #[test]
    fn test_new_record_requires_keys() {
        let err = NewRecord {
            disease: "Celiac disease".into(),
            autoantibody: "  ".into(),
            autoantigen: "Transglutaminase 2".into(),
            ..Default::default()
        }
        .validated()
        .unwrap_err();

        match err {
            AppError::Validation { field, .. } => assert_eq!(field.as_deref(), Some("autoantibody")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_new_record_is_trimmed() {
        let record = NewRecord {
            disease: " Celiac disease ".into(),
            autoantibody: "Anti-tTG".into(),
            autoantigen: "TG2 ".into(),
            ..Default::default()
        }
        .validated()
        .unwrap();
        assert_eq!(record.disease, "Celiac disease");
        assert_eq!(record.autoantigen, "TG2");
    }
}
