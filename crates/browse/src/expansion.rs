//! Tree expansion state
//!
//! The set of expanded nodes is plain data. Keys are the disease name for a
//! disease row and `disease|autoantibody` for an antibody row. Every change
//! goes through [`ExpansionState::apply`], which returns the next state.

use crate::grouping::DiseaseTree;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

const SEPARATOR: char = '|';

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "action")]
pub enum ExpansionAction {
    ToggleDisease { disease: String },
    ToggleAntibody { disease: String, autoantibody: String },
    ExpandAll,
    CollapseAll,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpansionState(BTreeSet<String>);

pub fn antibody_key(disease: &str, autoantibody: &str) -> String {
    format!("{disease}{SEPARATOR}{autoantibody}")
}

impl ExpansionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reduce one action. `tree` is only read by `ExpandAll`.
    pub fn apply(&self, action: &ExpansionAction, tree: &DiseaseTree) -> Self {
        match action {
            ExpansionAction::ToggleDisease { disease } => self.toggle_disease(disease),
            ExpansionAction::ToggleAntibody { disease, autoantibody } => {
                self.toggle_antibody(disease, autoantibody)
            }
            ExpansionAction::ExpandAll => Self::expand_all(tree),
            ExpansionAction::CollapseAll => Self::collapse_all(),
        }
    }

    /// Collapsing a disease leaves its antibody keys alone, so reopening it
    /// restores the previous layout.
    pub fn toggle_disease(&self, disease: &str) -> Self {
        self.toggle(disease.to_string())
    }

    pub fn toggle_antibody(&self, disease: &str, autoantibody: &str) -> Self {
        self.toggle(antibody_key(disease, autoantibody))
    }

    pub fn expand_all(tree: &DiseaseTree) -> Self {
        let keys = tree.iter().flat_map(|group| {
            std::iter::once(group.disease.clone()).chain(
                group
                    .antibodies
                    .iter()
                    .map(|a| antibody_key(&group.disease, &a.autoantibody)),
            )
        });
        Self(keys.collect())
    }

    pub fn collapse_all() -> Self {
        Self::default()
    }

    /// Raw membership test for a composite key.
    pub fn is_expanded(&self, key: &str) -> bool {
        self.0.contains(key)
    }

    pub fn is_disease_expanded(&self, disease: &str) -> bool {
        self.0.contains(disease)
    }

    /// An antibody row is visible as expanded only under an expanded disease.
    pub fn is_antibody_expanded(&self, disease: &str, autoantibody: &str) -> bool {
        self.is_disease_expanded(disease) && self.0.contains(&antibody_key(disease, autoantibody))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn toggle(&self, key: String) -> Self {
        let mut next = self.0.clone();
        if !next.remove(&key) {
            next.insert(key);
        }
        Self(next)
    }
}
