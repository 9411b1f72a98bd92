//! Catalog data model
//!
//! Records as they arrive from the catalog API, the filter state that
//! drives list queries, and the paginated envelope around list results.

mod filter;
mod page;
mod record;

pub use filter::{FilterField, FilterState, SortOrder};
pub use page::{Pagination, RecordPage};
pub use record::{DescriptiveFields, DiagnosticMarker, NewRecord, Record};
