//! AutoAb Browse Engine
//!
//! Turns flat catalog records into the view models the browse screens show:
//! - Dependent filter cascade (disease → autoantibody → autoantigen → epitope → type → uniprotId)
//! - Disease → autoantibody tree with priority aggregation
//! - Ranked autocomplete suggestions with debounced single-flight fetching
//! - Tree expansion state, dashboard statistics and table sorting

pub mod browse;
pub mod cascade;
pub mod expansion;
pub mod grouping;
pub mod memory;
pub mod session;
pub mod stats;
pub mod suggest;
pub mod table;

pub use browse::{BrowseSession, BrowseView, ViewState};
pub use cascade::{CandidateRequest, CandidateStatus, FilterCascade};
pub use expansion::{ExpansionAction, ExpansionState};
pub use grouping::{group_by_disease_then_antibody, AntibodyGroup, DiseaseGroup, DiseaseTree};
pub use memory::{CatalogCall, InMemoryCatalog};
pub use session::{SuggestionSession, SuggestionSnapshot, SuggestionStatus};
pub use stats::CatalogStats;
pub use suggest::{rank_suggestions, MatchScore, Suggestion, SuggestionKind, SuggestionRanker};
pub use table::{sort_records, SortKey};
