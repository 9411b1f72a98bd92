//! Disease → autoantibody tree
//!
//! Recomputed from scratch over an immutable slice every time the record
//! list changes. Nothing here is cached between calls.

use autoab_common::metrics;
use autoab_common::models::Record;
use autoab_common::Priority;
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::HashMap;

/// Records sharing one autoantibody inside a disease.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AntibodyGroup {
    pub autoantibody: String,
    /// Highest record priority in the subgroup
    pub priority: Priority,
    pub records: Vec<Record>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiseaseGroup {
    pub disease: String,
    /// Highest record priority across every subgroup
    pub priority: Priority,
    pub record_count: usize,
    pub antibodies: Vec<AntibodyGroup>,
}

impl DiseaseGroup {
    pub fn antibody(&self, name: &str) -> Option<&AntibodyGroup> {
        self.antibodies.iter().find(|g| g.autoantibody == name)
    }
}

/// Sorted disease groups with lookup by name.
///
/// Serializes as the ordered list of groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DiseaseTree {
    groups: Vec<DiseaseGroup>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl DiseaseTree {
    fn from_sorted(groups: Vec<DiseaseGroup>) -> Self {
        let index = groups
            .iter()
            .enumerate()
            .map(|(i, g)| (g.disease.clone(), i))
            .collect();
        Self { groups, index }
    }

    pub fn get(&self, disease: &str) -> Option<&DiseaseGroup> {
        self.index.get(disease).map(|&i| &self.groups[i])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DiseaseGroup> {
        self.groups.iter()
    }

    /// Disease names in display order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.disease.as_str())
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn record_count(&self) -> usize {
        self.groups.iter().map(|g| g.record_count).sum()
    }

    pub fn into_groups(self) -> Vec<DiseaseGroup> {
        self.groups
    }
}

impl<'a> IntoIterator for &'a DiseaseTree {
    type Item = &'a DiseaseGroup;
    type IntoIter = std::slice::Iter<'a, DiseaseGroup>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.iter()
    }
}

/// Group records by disease, then by autoantibody.
///
/// Ordering at every level is descending priority with a case-insensitive
/// ascending name as the tie-break:
/// - records inside a subgroup by autoantigen
/// - subgroups by their own max priority, then autoantibody
/// - diseases by their max priority, then disease
///
/// Missing keys arrive as `""` and form a group of their own.
pub fn group_by_disease_then_antibody(records: &[Record]) -> DiseaseTree {
    let mut groups: Vec<DiseaseGroup> = Vec::new();
    let mut by_disease: HashMap<&str, usize> = HashMap::new();

    for record in records {
        let gi = *by_disease.entry(record.disease.as_str()).or_insert_with(|| {
            groups.push(DiseaseGroup {
                disease: record.disease.clone(),
                priority: Priority::ZERO,
                record_count: 0,
                antibodies: Vec::new(),
            });
            groups.len() - 1
        });

        let group = &mut groups[gi];
        group.priority = group.priority.max(record.priority);
        group.record_count += 1;

        match group
            .antibodies
            .iter_mut()
            .find(|a| a.autoantibody == record.autoantibody)
        {
            Some(antibody) => {
                antibody.priority = antibody.priority.max(record.priority);
                antibody.records.push(record.clone());
            }
            None => group.antibodies.push(AntibodyGroup {
                autoantibody: record.autoantibody.clone(),
                priority: record.priority,
                records: vec![record.clone()],
            }),
        }
    }

    for group in &mut groups {
        for antibody in &mut group.antibodies {
            antibody
                .records
                .sort_by_cached_key(|r| (Reverse(r.priority), r.autoantigen.to_lowercase()));
        }
        group
            .antibodies
            .sort_by_cached_key(|a| (Reverse(a.priority), a.autoantibody.to_lowercase()));
    }
    groups.sort_by_cached_key(|g| (Reverse(g.priority), g.disease.to_lowercase()));

    metrics::record_tree_build(records.len());
    DiseaseTree::from_sorted(groups)
}
