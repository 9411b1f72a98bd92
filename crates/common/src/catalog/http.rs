//! reqwest-backed catalog client

use super::CatalogApi;
use crate::config::CatalogConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use crate::models::{FilterField, FilterState, Record, RecordPage};
use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoff, ExponentialBackoffBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::{Duration, Instant};

/// Catalog client over HTTP/JSON
#[derive(Clone)]
pub struct HttpCatalogClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    max_retries: u32,
}

/// Some endpoints answer with a bare array, others wrap it in `{ data }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Bare(Vec<T>),
    Wrapped { data: Vec<T> },
}

impl<T> Listing<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Bare(items) | Listing::Wrapped { data: items } => items,
        }
    }
}

impl HttpCatalogClient {
    /// Create a client from configuration
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout,
            max_retries: config.max_retries,
        })
    }

    /// GET with retry on transient failures
    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &str,
        params: &[(String, String)],
    ) -> Result<T> {
        let max_retries = self.max_retries;
        let mut attempt = 0_u32;

        retry(retry_policy(), || {
            attempt = attempt.saturating_add(1);
            let attempt = attempt;
            async move {
                let start = Instant::now();
                let result = self.get_once(path, params).await;
                metrics::record_upstream(operation, start.elapsed().as_secs_f64(), result.is_ok());

                result.map_err(|e| {
                    if attempt > max_retries || !e.is_retryable() {
                        return backoff::Error::permanent(e);
                    }
                    tracing::warn!(
                        operation,
                        attempt,
                        max_retries,
                        error = %e,
                        "Catalog request failed, retrying"
                    );
                    backoff::Error::transient(e)
                })
            }
        })
        .await
    }

    async fn get_once<T: DeserializeOwned>(&self, path: &str, params: &[(String, String)]) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream {
                status: status.as_u16(),
                message: body,
            });
        }

        let bytes = response.bytes().await.map_err(|e| self.classify(e))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn classify(&self, err: reqwest::Error) -> AppError {
        if err.is_timeout() {
            AppError::UpstreamTimeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else {
            AppError::HttpClient(err)
        }
    }
}

const INITIAL_BACKOFF: Duration = Duration::from_millis(100);
const MAX_BACKOFF: Duration = Duration::from_secs(5);

/// Jittered exponential delays, capped per attempt. The attempt count is
/// bounded by `max_retries`, not by elapsed time.
fn retry_policy() -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_initial_interval(INITIAL_BACKOFF)
        .with_multiplier(2.0)
        .with_max_interval(MAX_BACKOFF)
        .with_max_elapsed_time(None)
        .build()
}

/// Query parameters for a list call
fn list_params(filters: &FilterState, page: u32, limit: u32) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = filters
        .active_filters()
        .into_iter()
        .map(|(field, value)| (field.param_name().to_string(), value))
        .collect();

    if let Some(search) = &filters.search {
        params.push(("search".to_string(), search.clone()));
    }
    if let Some(sort_by) = &filters.sort_by {
        params.push(("sortBy".to_string(), sort_by.clone()));
    }
    if let Some(order) = filters.sort_order {
        params.push(("sortOrder".to_string(), order.as_str().to_string()));
    }
    params.push(("page".to_string(), page.to_string()));
    params.push(("limit".to_string(), limit.to_string()));
    params
}

#[async_trait]
impl CatalogApi for HttpCatalogClient {
    async fn list_records(&self, filters: &FilterState, page: u32, limit: u32) -> Result<RecordPage> {
        let params = list_params(filters, page, limit);
        let page: RecordPage = self.get_json("list_records", "/records", &params).await?;

        tracing::debug!(
            returned = page.data.len(),
            total = page.pagination.total,
            "Listed records"
        );
        Ok(page)
    }

    async fn list_unique_values(
        &self,
        field: FilterField,
        dependent: &[(FilterField, String)],
    ) -> Result<Vec<String>> {
        let params: Vec<(String, String)> = dependent
            .iter()
            .map(|(f, v)| (f.param_name().to_string(), v.clone()))
            .collect();
        let path = format!("/records/unique/{}", field.param_name());

        let values: Listing<String> = self.get_json("list_unique_values", &path, &params).await?;
        Ok(values.into_vec())
    }

    async fn search_records(&self, query: &str) -> Result<Vec<Record>> {
        let params = vec![("q".to_string(), query.to_string())];
        let records: Listing<Record> = self.get_json("search_records", "/records/search", &params).await?;
        Ok(records.into_vec())
    }
}
