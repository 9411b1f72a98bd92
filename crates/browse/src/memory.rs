//! In-memory catalog
//!
//! Serves a fixed record set through [`CatalogApi`]. The gateway uses it
//! when `catalog.fixture_path` is configured; tests use it to script
//! latency and upstream failures.

use crate::table::{sort_records, SortKey};
use async_trait::async_trait;
use autoab_common::catalog::CatalogApi;
use autoab_common::errors::{AppError, Result};
use autoab_common::models::{FilterField, FilterState, Pagination, Record, RecordPage, SortOrder};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::info;

/// One call received by an [`InMemoryCatalog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogCall {
    ListRecords { page: u32, limit: u32 },
    UniqueValues(FilterField),
    Search(String),
}

#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    records: Vec<Record>,
    latency: Duration,
    failure: Mutex<Option<(u16, String)>>,
    calls: Mutex<Vec<CatalogCall>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn matches_exact(value: Option<&str>, wanted: &str) -> bool {
    value.is_some_and(|v| v.trim().to_lowercase() == wanted.trim().to_lowercase())
}

fn mentions(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

impl InMemoryCatalog {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    /// Load a JSON array of records, or a `{ data: [...] }` envelope.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| AppError::Configuration {
            message: format!("Failed to read catalog fixture {}: {}", path.display(), e),
        })?;

        let value: serde_json::Value = serde_json::from_str(&raw)?;
        let records: Vec<Record> = match value {
            serde_json::Value::Object(mut envelope) => {
                serde_json::from_value(envelope.remove("data").unwrap_or_default())?
            }
            other => serde_json::from_value(other)?,
        };

        info!(path = %path.display(), records = records.len(), "Loaded catalog fixture");
        Ok(Self::new(records))
    }

    /// Delay every call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make every following call fail as the upstream would.
    pub fn fail_with(&self, status: u16, message: impl Into<String>) {
        *lock(&self.failure) = Some((status, message.into()));
    }

    pub fn recover(&self) {
        *lock(&self.failure) = None;
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn calls(&self) -> Vec<CatalogCall> {
        lock(&self.calls).clone()
    }

    async fn begin(&self, call: CatalogCall) -> Result<()> {
        lock(&self.calls).push(call);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match lock(&self.failure).clone() {
            Some((status, message)) => Err(AppError::Upstream { status, message }),
            None => Ok(()),
        }
    }

    fn filtered(&self, filters: &FilterState) -> Vec<Record> {
        let active = filters.active_filters();
        let search = filters
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        self.records
            .iter()
            .filter(|r| active.iter().all(|(field, value)| matches_exact(r.field(*field), value)))
            .filter(|r| match &search {
                Some(q) => mentions(&r.disease, q) || mentions(&r.autoantibody, q) || mentions(&r.autoantigen, q),
                None => true,
            })
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CatalogApi for InMemoryCatalog {
    async fn list_records(&self, filters: &FilterState, page: u32, limit: u32) -> Result<RecordPage> {
        self.begin(CatalogCall::ListRecords { page, limit }).await?;

        let mut matched = self.filtered(filters);
        if let Some(key) = filters.sort_by.as_deref().and_then(SortKey::from_param) {
            sort_records(&mut matched, key, filters.sort_order.unwrap_or(SortOrder::Asc));
        }

        let page = page.max(1);
        let limit = limit.max(1);
        let total = matched.len() as u64;
        let total_pages = u32::try_from(total.div_ceil(u64::from(limit))).unwrap_or(u32::MAX);
        let offset = u64::from(page - 1).saturating_mul(u64::from(limit));
        let data = matched
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(limit as usize)
            .collect();

        Ok(RecordPage {
            data,
            pagination: Pagination {
                page,
                limit,
                total,
                total_pages,
            },
        })
    }

    async fn list_unique_values(
        &self,
        field: FilterField,
        dependent: &[(FilterField, String)],
    ) -> Result<Vec<String>> {
        self.begin(CatalogCall::UniqueValues(field)).await?;

        let mut values: Vec<String> = self
            .records
            .iter()
            .filter(|r| dependent.iter().all(|(f, v)| matches_exact(r.field(*f), v)))
            .filter_map(|r| r.field(field).map(str::trim))
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect();

        // case-insensitive order, exact spelling breaks ties so dedup sees neighbours
        values.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b)));
        values.dedup();
        Ok(values)
    }

    async fn search_records(&self, query: &str) -> Result<Vec<Record>> {
        self.begin(CatalogCall::Search(query.to_string())).await?;

        let q = query.trim().to_lowercase();
        Ok(self
            .records
            .iter()
            .filter(|r| mentions(&r.disease, &q) || mentions(&r.autoantibody, &q))
            .cloned()
            .collect())
    }
}
