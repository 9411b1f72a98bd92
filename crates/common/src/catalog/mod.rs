//! Catalog API boundary
//!
//! The browse engine never talks to storage. It asks the catalog REST API
//! for pages of records, for the distinct values of a filter column given
//! the filters upstream of it, and for records matching free text.

mod http;

pub use http::HttpCatalogClient;

use crate::errors::Result;
use crate::models::{FilterField, FilterState, Record, RecordPage};
use async_trait::async_trait;

/// Read side of the catalog REST API
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// One page of records matching `filters`
    async fn list_records(&self, filters: &FilterState, page: u32, limit: u32) -> Result<RecordPage>;

    /// Distinct values of `field` among records matching `dependent`
    async fn list_unique_values(
        &self,
        field: FilterField,
        dependent: &[(FilterField, String)],
    ) -> Result<Vec<String>>;

    /// Records whose disease or autoantibody mentions `query`
    async fn search_records(&self, query: &str) -> Result<Vec<Record>>;
}
