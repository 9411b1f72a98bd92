//! Browse handlers
//!
//! Filters arrive in the same query-string encoding the UI uses for deep
//! links (`disease=…&autoantibody=…&sortBy=…`).

use axum::{
    extract::{Path, Query, RawQuery, State},
    Json,
};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

use crate::AppState;
use autoab_browse::{sort_records, BrowseSession, BrowseView, CatalogStats, FilterCascade, SortKey, Suggestion};
use autoab_common::{
    errors::{AppError, Result},
    models::{FilterField, FilterState, RecordPage, SortOrder},
};

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SuggestParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsResponse {
    pub field: FilterField,
    pub dependencies: BTreeMap<&'static str, String>,
    pub values: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionsResponse {
    pub query: String,
    pub suggestions: Vec<Suggestion>,
    pub processing_time_ms: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: CatalogStats,
    pub pages_read: u32,
    /// More pages matched than `stats_max_pages` allows
    pub truncated: bool,
}

/// Decode filters and refuse combinations the browse screens cannot produce.
fn applied_filters(raw: Option<String>) -> Result<FilterState> {
    let filters = FilterState::from_query_string(raw.as_deref().unwrap_or_default());

    let restored = FilterCascade::restore(&filters);
    if let Some((field, _)) = filters
        .active_filters()
        .into_iter()
        .find(|(field, _)| restored.state().get(*field).is_none())
    {
        return Err(AppError::Validation {
            message: format!("{} is set but a filter before it is not", field),
            field: Some(field.param_name().to_string()),
        });
    }
    if filters.search.is_some() && filters.disease.is_some() {
        return Err(AppError::Validation {
            message: "search cannot be combined with a disease filter".to_string(),
            field: Some("search".to_string()),
        });
    }

    Ok(filters)
}

fn page_and_limit(state: &AppState, params: &PageParams) -> (u32, u32) {
    let limit = params
        .limit
        .filter(|&l| l > 0)
        .unwrap_or(state.config.catalog.page_size);
    (params.page.unwrap_or(1).max(1), limit)
}

/// Disease → autoantibody tree for the applied filters
pub async fn tree(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
    RawQuery(raw): RawQuery,
) -> Result<Json<BrowseView>> {
    let filters = applied_filters(raw)?;
    let (page, limit) = page_and_limit(&state, &params);

    let session = BrowseSession::restore(state.catalog.clone(), &filters, limit);
    let view = session.load_page(page).await?;
    Ok(Json(view))
}

/// Flat record table, sorted by `sortBy` / `sortOrder`
pub async fn records(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
    RawQuery(raw): RawQuery,
) -> Result<Json<RecordPage>> {
    let filters = applied_filters(raw)?;
    let (page, limit) = page_and_limit(&state, &params);

    let sort_key = match filters.sort_by.as_deref() {
        Some(name) => Some(SortKey::from_param(name).ok_or_else(|| AppError::InvalidFormat {
            message: format!("unknown sort column: {}", name),
        })?),
        None => None,
    };

    let mut result = state.catalog.list_records(&filters, page, limit).await?;
    if let Some(key) = sort_key {
        sort_records(&mut result.data, key, filters.sort_order.unwrap_or(SortOrder::Asc));
    }
    Ok(Json(result))
}

/// Dropdown values for `field` given the filters upstream of it
pub async fn options(
    State(state): State<AppState>,
    Path(field): Path<String>,
    RawQuery(raw): RawQuery,
) -> Result<Json<OptionsResponse>> {
    let field = FilterField::from_param(&field).ok_or(AppError::UnknownFilterField { name: field })?;
    let filters = applied_filters(raw)?;
    let dependencies = filters.upstream_filters(field);

    let values = state.catalog.list_unique_values(field, &dependencies).await?;

    Ok(Json(OptionsResponse {
        field,
        dependencies: dependencies
            .into_iter()
            .map(|(f, v)| (f.param_name(), v))
            .collect(),
        values,
    }))
}

/// Ranked autocomplete suggestions for `q`
pub async fn suggestions(
    State(state): State<AppState>,
    Query(params): Query<SuggestParams>,
) -> Result<Json<SuggestionsResponse>> {
    let start = Instant::now();
    let query = params.q.trim().to_string();

    let suggestions = if state.ranker.accepts(&query) {
        let records = state.catalog.search_records(&query).await?;
        state.ranker.rank(&records, &query)
    } else {
        Vec::new()
    };

    Ok(Json(SuggestionsResponse {
        query,
        suggestions,
        processing_time_ms: start.elapsed().as_millis() as u64,
    }))
}

/// Dashboard counters over every record matching the applied filters,
/// up to `stats_max_pages` pages
pub async fn stats(State(state): State<AppState>, RawQuery(raw): RawQuery) -> Result<Json<StatsResponse>> {
    let filters = applied_filters(raw)?;
    let limit = state.config.catalog.page_size.max(1);
    let browse = &state.config.browse;

    let first = state.catalog.list_records(&filters, 1, limit).await?;
    let total_pages = first.pagination.total_pages;
    let last = total_pages.min(browse.stats_max_pages.max(1));
    if last < total_pages {
        tracing::warn!(total_pages, pages_read = last, "Stats limited to the first pages");
    }

    let rest: Vec<_> = stream::iter(2..=last)
        .map(|page| state.catalog.list_records(&filters, page, limit))
        .buffered(browse.stats_concurrency.max(1))
        .try_collect()
        .await?;

    let records: Vec<_> = std::iter::once(first)
        .chain(rest)
        .flat_map(|page| page.data)
        .collect();

    tracing::debug!(records = records.len(), pages_read = last, "Computed catalog stats");
    Ok(Json(StatsResponse {
        stats: CatalogStats::from_records(&records),
        pages_read: last.max(1),
        truncated: last < total_pages,
    }))
}
