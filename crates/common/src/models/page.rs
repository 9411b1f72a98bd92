//! Paginated list envelope

use super::Record;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub total_pages: u32,
}

fn default_page() -> u32 { 1 }

impl Pagination {
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// `{ data, pagination }` as returned by the list API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordPage {
    #[serde(default)]
    pub data: Vec<Record>,
    #[serde(default)]
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_without_pagination_block() {
        let page: RecordPage = serde_json::from_str(r#"{"data": [{"id": "a", "disease": "Graves disease"}]}"#).unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.pagination.total, 0);
        assert!(!page.pagination.has_next());
    }

    #[test]
    fn test_has_next() {
        let pagination = Pagination { page: 2, limit: 20, total: 61, total_pages: 4 };
        assert!(pagination.has_next());
    }
}
