//! Browse screen session
//!
//! Couples a [`FilterCascade`] with the catalog: filter changes fetch the
//! next dropdown's options, and a page load turns the matching records into
//! the disease tree.

use crate::cascade::{CandidateRequest, FilterCascade};
use crate::grouping::{group_by_disease_then_antibody, DiseaseTree};
use autoab_common::catalog::CatalogApi;
use autoab_common::errors::{AppError, Result};
use autoab_common::models::{FilterField, FilterState, Pagination, SortOrder};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum ViewState {
    /// Nothing selected yet, so nothing was fetched
    NoFilters,
    /// Filters applied, zero matches
    Empty,
    Loaded,
    Failed { message: String, retryable: bool },
}

/// Everything the tree view renders for one page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseView {
    pub state: ViewState,
    pub tree: DiseaseTree,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    pub filters: FilterState,
    /// Deep link for the applied filters
    pub query: String,
}

impl BrowseView {
    fn empty(filters: &FilterState, state: ViewState) -> Self {
        Self {
            state,
            tree: DiseaseTree::default(),
            pagination: None,
            filters: filters.clone(),
            query: filters.to_query_string(),
        }
    }

    pub fn no_filters(filters: &FilterState) -> Self {
        Self::empty(filters, ViewState::NoFilters)
    }

    /// View for a failed load, carrying the retry hint.
    pub fn failed(filters: &FilterState, err: &AppError) -> Self {
        Self::empty(
            filters,
            ViewState::Failed {
                message: err.to_string(),
                retryable: err.is_retryable(),
            },
        )
    }
}

pub struct BrowseSession {
    catalog: Arc<dyn CatalogApi>,
    cascade: FilterCascade,
    page_size: u32,
}

impl BrowseSession {
    pub fn new(catalog: Arc<dyn CatalogApi>, page_size: u32) -> Self {
        Self {
            catalog,
            cascade: FilterCascade::new(),
            page_size,
        }
    }

    /// Start from a decoded deep link.
    pub fn restore(catalog: Arc<dyn CatalogApi>, filters: &FilterState, page_size: u32) -> Self {
        Self {
            catalog,
            cascade: FilterCascade::restore(filters),
            page_size,
        }
    }

    pub fn cascade(&self) -> &FilterCascade {
        &self.cascade
    }

    pub fn filters(&self) -> &FilterState {
        self.cascade.state()
    }

    pub fn options(&self, field: FilterField) -> &[String] {
        self.cascade.candidates(field)
    }

    /// Fetch the disease dropdown.
    pub async fn load_root_options(&mut self) -> Result<()> {
        let request = self.cascade.refresh_root();
        self.fetch_candidates(request).await
    }

    /// Apply a filter change, then fetch the next field's options.
    pub async fn set_filter(&mut self, field: FilterField, value: Option<String>) -> Result<()> {
        match self.cascade.set_filter(field, value)? {
            Some(request) => self.fetch_candidates(request).await,
            None => Ok(()),
        }
    }

    pub fn set_search(&mut self, text: Option<String>) {
        self.cascade.set_search(text);
    }

    pub fn set_sort(&mut self, sort_by: Option<String>, order: Option<SortOrder>) {
        self.cascade.set_sort(sort_by, order);
    }

    pub fn clear_all(&mut self) {
        self.cascade.clear_all();
    }

    async fn fetch_candidates(&mut self, request: CandidateRequest) -> Result<()> {
        match self
            .catalog
            .list_unique_values(request.field, &request.dependencies)
            .await
        {
            Ok(values) => {
                let count = values.len();
                if self.cascade.apply_candidates(&request, values) {
                    debug!(field = %request.field, count, "Candidate list loaded");
                }
                Ok(())
            }
            Err(e) => {
                self.cascade.mark_failed(&request);
                Err(e)
            }
        }
    }

    /// Load one page of records for the applied filters.
    pub async fn load_page(&self, page: u32) -> Result<BrowseView> {
        let filters = self.cascade.state();
        if !filters.has_active_filters() {
            return Ok(BrowseView::no_filters(filters));
        }

        let result = self.catalog.list_records(filters, page, self.page_size).await?;
        let tree = group_by_disease_then_antibody(&result.data);
        let state = if tree.is_empty() {
            ViewState::Empty
        } else {
            ViewState::Loaded
        };

        info!(
            page,
            records = result.data.len(),
            diseases = tree.len(),
            total = result.pagination.total,
            "Browse page loaded"
        );

        Ok(BrowseView {
            state,
            tree,
            pagination: Some(result.pagination),
            filters: filters.clone(),
            query: filters.to_query_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascade::CandidateStatus;
    use crate::memory::{CatalogCall, InMemoryCatalog};
    use autoab_common::models::Record;
    use autoab_common::Priority;
    use pretty_assertions::assert_eq;

    fn record(disease: &str, antibody: &str, antigen: &str, priority: f64) -> Record {
        Record {
            disease: disease.to_string(),
            autoantibody: antibody.to_string(),
            autoantigen: antigen.to_string(),
            priority: Priority::new(priority),
            ..Record::default()
        }
    }

    fn catalog() -> Arc<InMemoryCatalog> {
        Arc::new(InMemoryCatalog::new(vec![
            record("Lupus", "Anti-dsDNA", "dsDNA", 4.0),
            record("Lupus", "Anti-Sm", "Sm D1", 2.0),
            record("Sjogren syndrome", "Anti-Ro", "Ro60", 3.0),
        ]))
    }

    #[tokio::test]
    async fn test_no_filters_skips_fetch() {
        let catalog = catalog();
        let session = BrowseSession::new(catalog.clone(), 50);

        let view = session.load_page(1).await.unwrap();
        assert_eq!(view.state, ViewState::NoFilters);
        assert!(catalog.calls().is_empty());
    }

    #[tokio::test]
    async fn test_filter_then_load_builds_tree() {
        let catalog = catalog();
        let mut session = BrowseSession::new(catalog.clone(), 50);

        session.load_root_options().await.unwrap();
        assert_eq!(session.options(FilterField::Disease), ["Lupus", "Sjogren syndrome"]);

        session.set_filter(FilterField::Disease, Some("Lupus".into())).await.unwrap();
        assert_eq!(session.options(FilterField::Autoantibody), ["Anti-dsDNA", "Anti-Sm"]);

        let view = session.load_page(1).await.unwrap();
        assert_eq!(view.state, ViewState::Loaded);
        assert_eq!(view.tree.get("Lupus").unwrap().priority.value(), 4.0);
        assert_eq!(view.query, "disease=Lupus");
        assert_eq!(view.pagination.unwrap().total, 2);
    }

    #[tokio::test]
    async fn test_zero_matches_is_empty_state() {
        let mut session = BrowseSession::new(catalog(), 50);
        session.set_search(Some("myasthenia".into()));

        let view = session.load_page(1).await.unwrap();
        assert_eq!(view.state, ViewState::Empty);
        assert!(view.tree.is_empty());
    }

    #[tokio::test]
    async fn test_upstream_failure_propagates_and_marks_slot() {
        let catalog = catalog();
        let mut session = BrowseSession::new(catalog.clone(), 50);
        catalog.fail_with(503, "down");

        let err = session
            .set_filter(FilterField::Disease, Some("Lupus".into()))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(session.cascade().status(FilterField::Autoantibody), CandidateStatus::Failed);
        // the selection itself was still applied
        assert_eq!(session.filters().disease.as_deref(), Some("Lupus"));

        let err = session.load_page(1).await.unwrap_err();
        let view = BrowseView::failed(session.filters(), &err);
        assert!(matches!(view.state, ViewState::Failed { retryable: true, .. }));
    }

    #[tokio::test]
    async fn test_restore_from_deep_link() {
        let catalog = catalog();
        let link = FilterState::from_query_string("?disease=Lupus&autoantibody=Anti-Sm");
        let session = BrowseSession::restore(catalog.clone(), &link, 10);

        let view = session.load_page(1).await.unwrap();
        assert_eq!(view.tree.record_count(), 1);
        assert_eq!(catalog.calls(), vec![CatalogCall::ListRecords { page: 1, limit: 10 }]);
    }

    #[tokio::test]
    async fn test_orphaned_filter_is_rejected_without_fetch() {
        let catalog = catalog();
        let mut session = BrowseSession::new(catalog.clone(), 50);

        let err = session
            .set_filter(FilterField::Autoantigen, Some("Ro60".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
        assert!(catalog.calls().is_empty());
    }
}
