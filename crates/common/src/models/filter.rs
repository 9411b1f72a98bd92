//! Filter state and its URL query-string form

use serde::{Deserialize, Serialize};
use std::fmt;
use url::form_urlencoded;

/// A column that takes part in the dependent filter cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterField {
    Disease,
    Autoantibody,
    Autoantigen,
    Epitope,
    Type,
    UniprotId,
}

impl FilterField {
    /// Cascade order: a change at position `i` resets every position after it.
    pub const CASCADE: [FilterField; 6] = [
        FilterField::Disease,
        FilterField::Autoantibody,
        FilterField::Autoantigen,
        FilterField::Epitope,
        FilterField::Type,
        FilterField::UniprotId,
    ];

    pub fn position(self) -> usize {
        match self {
            FilterField::Disease => 0,
            FilterField::Autoantibody => 1,
            FilterField::Autoantigen => 2,
            FilterField::Epitope => 3,
            FilterField::Type => 4,
            FilterField::UniprotId => 5,
        }
    }

    /// Fields strictly before this one.
    pub fn upstream(self) -> &'static [FilterField] {
        &Self::CASCADE[..self.position()]
    }

    /// Fields strictly after this one.
    pub fn downstream(self) -> &'static [FilterField] {
        &Self::CASCADE[self.position() + 1..]
    }

    /// Immediate successor, `None` for the terminal `uniprotId`.
    pub fn next(self) -> Option<FilterField> {
        Self::CASCADE.get(self.position() + 1).copied()
    }

    /// Query parameter / API name
    pub fn param_name(self) -> &'static str {
        match self {
            FilterField::Disease => "disease",
            FilterField::Autoantibody => "autoantibody",
            FilterField::Autoantigen => "autoantigen",
            FilterField::Epitope => "epitope",
            FilterField::Type => "type",
            FilterField::UniprotId => "uniprotId",
        }
    }

    pub fn from_param(name: &str) -> Option<FilterField> {
        Self::CASCADE.into_iter().find(|f| f.param_name() == name)
    }
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.param_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn parse(raw: &str) -> Option<SortOrder> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }
}

/// Currently selected filters, free-text search and sort.
///
/// Values are never stored as empty strings: [`FilterState::set`] and the
/// query-string decoder both turn blank input into `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disease: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autoantibody: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autoantigen: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epitope: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub record_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uniprot_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<SortOrder>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl FilterState {
    pub fn get(&self, field: FilterField) -> Option<&str> {
        self.slot(field).as_deref()
    }

    /// Assign a cascade field. This does not touch downstream fields; the
    /// cascade in the browse crate owns that rule.
    pub fn set(&mut self, field: FilterField, value: Option<String>) {
        *self.slot_mut(field) = non_blank(value);
    }

    pub fn clear(&mut self, field: FilterField) {
        *self.slot_mut(field) = None;
    }

    fn slot(&self, field: FilterField) -> &Option<String> {
        match field {
            FilterField::Disease => &self.disease,
            FilterField::Autoantibody => &self.autoantibody,
            FilterField::Autoantigen => &self.autoantigen,
            FilterField::Epitope => &self.epitope,
            FilterField::Type => &self.record_type,
            FilterField::UniprotId => &self.uniprot_id,
        }
    }

    fn slot_mut(&mut self, field: FilterField) -> &mut Option<String> {
        match field {
            FilterField::Disease => &mut self.disease,
            FilterField::Autoantibody => &mut self.autoantibody,
            FilterField::Autoantigen => &mut self.autoantigen,
            FilterField::Epitope => &mut self.epitope,
            FilterField::Type => &mut self.record_type,
            FilterField::UniprotId => &mut self.uniprot_id,
        }
    }

    /// Set cascade fields in cascade order.
    pub fn active_filters(&self) -> Vec<(FilterField, String)> {
        FilterField::CASCADE
            .into_iter()
            .filter_map(|f| self.get(f).map(|v| (f, v.to_string())))
            .collect()
    }

    /// Set cascade fields strictly upstream of `field`.
    pub fn upstream_filters(&self, field: FilterField) -> Vec<(FilterField, String)> {
        field
            .upstream()
            .iter()
            .filter_map(|&f| self.get(f).map(|v| (f, v.to_string())))
            .collect()
    }

    /// True when any cascade field or the free-text search is set.
    pub fn has_active_filters(&self) -> bool {
        self.search.is_some() || FilterField::CASCADE.iter().any(|&f| self.get(f).is_some())
    }

    /// Encode as `application/x-www-form-urlencoded`, skipping unset fields.
    pub fn to_query_string(&self) -> String {
        let mut out = form_urlencoded::Serializer::new(String::new());
        for field in FilterField::CASCADE {
            if let Some(value) = self.get(field) {
                out.append_pair(field.param_name(), value);
            }
        }
        if let Some(search) = &self.search {
            out.append_pair("search", search);
        }
        if let Some(sort_by) = &self.sort_by {
            out.append_pair("sortBy", sort_by);
        }
        if let Some(order) = self.sort_order {
            out.append_pair("sortOrder", order.as_str());
        }
        out.finish()
    }

    /// Decode a query string produced by [`FilterState::to_query_string`]
    /// (or a deep link). Unknown keys are ignored, a repeated key keeps its
    /// last value, blank values decode as unset.
    pub fn from_query_string(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut state = FilterState::default();

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            let value = non_blank(Some(value.into_owned()));
            match key.as_ref() {
                "search" => state.search = value,
                "sortBy" => state.sort_by = value,
                "sortOrder" => state.sort_order = value.as_deref().and_then(SortOrder::parse),
                other => {
                    if let Some(field) = FilterField::from_param(other) {
                        state.set(field, value);
                    }
                }
            }
        }

        state
    }
}
