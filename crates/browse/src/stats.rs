//! Dashboard counters over a record set

use autoab_common::models::{DiagnosticMarker, Record};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerCounts {
    pub yes: usize,
    pub no: usize,
    pub other: usize,
    pub unset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiseaseCount {
    pub disease: String,
    pub records: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStats {
    pub total_records: usize,
    pub unique_diseases: usize,
    pub unique_autoantibodies: usize,
    pub unique_autoantigens: usize,
    pub diagnostic_markers: MarkerCounts,
    /// Most frequent diseases, ties broken by name
    pub top_diseases: Vec<DiseaseCount>,
}

impl CatalogStats {
    pub const TOP_DISEASES: usize = 10;

    pub fn from_records(records: &[Record]) -> Self {
        let mut diseases: HashMap<&str, usize> = HashMap::new();
        let mut antibodies = HashSet::new();
        let mut antigens = HashSet::new();
        let mut markers = MarkerCounts::default();

        for record in records {
            let disease = record.disease.trim();
            if !disease.is_empty() {
                *diseases.entry(disease).or_default() += 1;
            }
            let antibody = record.autoantibody.trim();
            if !antibody.is_empty() {
                antibodies.insert(antibody);
            }
            let antigen = record.autoantigen.trim();
            if !antigen.is_empty() {
                antigens.insert(antigen);
            }

            match &record.diagnostic_marker {
                Some(DiagnosticMarker::Yes) => markers.yes += 1,
                Some(DiagnosticMarker::No) => markers.no += 1,
                Some(DiagnosticMarker::Other(_)) => markers.other += 1,
                None => markers.unset += 1,
            }
        }

        let mut top_diseases: Vec<DiseaseCount> = diseases
            .iter()
            .map(|(&disease, &records)| DiseaseCount {
                disease: disease.to_string(),
                records,
            })
            .collect();
        top_diseases.sort_by(|a, b| b.records.cmp(&a.records).then_with(|| a.disease.cmp(&b.disease)));
        top_diseases.truncate(Self::TOP_DISEASES);

        Self {
            total_records: records.len(),
            unique_diseases: diseases.len(),
            unique_autoantibodies: antibodies.len(),
            unique_autoantigens: antigens.len(),
            diagnostic_markers: markers,
            top_diseases,
        }
    }
}
