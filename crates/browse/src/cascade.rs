//! Dependent filter cascade
//!
//! One owner for the rule every filter screen relies on: changing a filter
//! clears and invalidates everything downstream of it, in the same call that
//! assigns the new value. Candidate lists for the dropdowns are fetched by
//! the caller; the cascade hands out a [`CandidateRequest`] stamped with a
//! generation so a list that arrives after its field was invalidated again
//! is dropped instead of shown.

use autoab_common::errors::{AppError, Result};
use autoab_common::models::{FilterField, FilterState, SortOrder};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CandidateStatus {
    /// Invalidated by an upstream change and not yet re-requested
    Stale,
    /// A request is outstanding
    Loading,
    Ready,
    /// The last request for this field failed
    Failed,
}

#[derive(Debug, Clone)]
struct CandidateSlot {
    status: CandidateStatus,
    values: Vec<String>,
    generation: u64,
}

impl CandidateSlot {
    fn stale() -> Self {
        Self {
            status: CandidateStatus::Stale,
            values: Vec::new(),
            generation: 0,
        }
    }
}

/// Ask the candidate-values API for `field`'s options given `dependencies`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRequest {
    pub field: FilterField,
    pub dependencies: Vec<(FilterField, String)>,
    #[serde(skip)]
    generation: u64,
}

/// Filter state plus the cached option list for every cascade field.
#[derive(Debug, Clone)]
pub struct FilterCascade {
    state: FilterState,
    slots: [CandidateSlot; 6],
    next_generation: u64,
}

impl Default for FilterCascade {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterCascade {
    pub fn new() -> Self {
        Self {
            state: FilterState::default(),
            slots: std::array::from_fn(|_| CandidateSlot::stale()),
            next_generation: 1,
        }
    }

    /// Rebuild a cascade from a decoded deep link. Fields are applied in
    /// cascade order and the first unset field ends the walk, so a link that
    /// names an autoantibody without a disease keeps neither.
    pub fn restore(state: &FilterState) -> Self {
        let mut cascade = Self::new();
        for field in FilterField::CASCADE {
            match state.get(field) {
                Some(value) => cascade.state.set(field, Some(value.to_string())),
                None => break,
            }
        }
        if cascade.state.disease.is_none() {
            cascade.state.search = state.search.clone();
        }
        cascade.state.sort_by = state.sort_by.clone();
        cascade.state.sort_order = state.sort_order;
        cascade
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn candidates(&self, field: FilterField) -> &[String] {
        &self.slots[field.position()].values
    }

    pub fn status(&self, field: FilterField) -> CandidateStatus {
        self.slots[field.position()].status
    }

    /// Assign `field` and reset everything downstream of it.
    ///
    /// Returns the request for the next field's options, or `None` when
    /// `field` is the terminal `uniprotId`. Setting a value while an upstream
    /// field is unset is rejected and leaves the cascade untouched; clearing
    /// is always allowed.
    pub fn set_filter(&mut self, field: FilterField, value: Option<String>) -> Result<Option<CandidateRequest>> {
        let value = value.filter(|v| !v.trim().is_empty());

        if value.is_some() {
            if let Some(missing) = field.upstream().iter().find(|&&f| self.state.get(f).is_none()) {
                return Err(AppError::Validation {
                    message: format!("{} requires {} to be selected first", field, missing),
                    field: Some(field.param_name().to_string()),
                });
            }
        }

        self.state.set(field, value);
        if field == FilterField::Disease {
            self.state.search = None;
        }

        for &downstream in field.downstream() {
            self.state.clear(downstream);
            self.invalidate(downstream);
        }

        debug!(
            field = %field,
            value = ?self.state.get(field),
            reset = field.downstream().len(),
            "Filter changed"
        );

        Ok(field.next().map(|next| self.request(next)))
    }

    /// Request for the root (`disease`) option list.
    pub fn refresh_root(&mut self) -> CandidateRequest {
        self.request(FilterField::Disease)
    }

    /// Switch to free-text mode. A non-blank search clears the whole cascade.
    pub fn set_search(&mut self, text: Option<String>) {
        let text = text.filter(|t| !t.trim().is_empty());
        if text.is_some() {
            for &field in FilterField::Disease.downstream() {
                self.invalidate(field);
            }
            for field in FilterField::CASCADE {
                self.state.clear(field);
            }
        }
        self.state.search = text;
    }

    pub fn set_sort(&mut self, sort_by: Option<String>, order: Option<SortOrder>) {
        self.state.sort_by = sort_by.filter(|s| !s.trim().is_empty());
        self.state.sort_order = order;
    }

    /// Drop every selection and the search text. The root option list stays.
    pub fn clear_all(&mut self) {
        for &field in FilterField::Disease.downstream() {
            self.invalidate(field);
        }
        let sort_by = self.state.sort_by.take();
        let sort_order = self.state.sort_order.take();
        self.state = FilterState {
            sort_by,
            sort_order,
            ..FilterState::default()
        };
    }

    /// Store a fetched option list if `request` is still the latest one for
    /// its field. Returns whether it was applied.
    pub fn apply_candidates(&mut self, request: &CandidateRequest, mut values: Vec<String>) -> bool {
        let slot = &mut self.slots[request.field.position()];
        if slot.generation != request.generation {
            debug!(
                field = %request.field,
                request_generation = request.generation,
                current_generation = slot.generation,
                "Dropping stale candidate list"
            );
            return false;
        }

        values.retain(|v| !v.trim().is_empty());
        slot.values = values;
        slot.status = CandidateStatus::Ready;
        true
    }

    /// Record that `request` failed, if it is still current.
    pub fn mark_failed(&mut self, request: &CandidateRequest) {
        let slot = &mut self.slots[request.field.position()];
        if slot.generation == request.generation {
            slot.status = CandidateStatus::Failed;
        }
    }

    fn request(&mut self, field: FilterField) -> CandidateRequest {
        let generation = self.bump();
        let slot = &mut self.slots[field.position()];
        slot.generation = generation;
        slot.status = CandidateStatus::Loading;

        CandidateRequest {
            field,
            dependencies: self.state.upstream_filters(field),
            generation,
        }
    }

    fn invalidate(&mut self, field: FilterField) {
        let generation = self.bump();
        let slot = &mut self.slots[field.position()];
        slot.values.clear();
        slot.status = CandidateStatus::Stale;
        slot.generation = generation;
    }

    fn bump(&mut self) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        generation
    }
}
