//! Classifier adapters for species prediction and resistance gene detection.
//!
//! Both adapters run [`ReferenceCatalog::best_match`] for every input record
//! against their own catalog and produce one call per record. The catalogs
//! are independent and never merged.

use crate::catalog::ReferenceCatalog;
use crate::sequence::SequenceRecord;

use serde::{Deserialize, Serialize};

//-----------------------------------------------------------------------------

/// Label reported when a catalog yields no match (empty catalog).
pub const NO_MATCH: &str = "N/A";

/// A species prediction for one sequence record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeciesCall {
    /// Identifier of the classified record.
    pub id: String,
    /// Predicted species, or [`NO_MATCH`].
    pub predicted_species: String,
    /// Percent identity of the best match.
    pub identity: f64,
    /// Percent coverage of the best match.
    pub coverage: f64,
    /// Alignment score of the best match.
    pub score: f64,
}

/// A resistance gene call for one sequence record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResistanceCall {
    /// Identifier of the classified record.
    pub id: String,
    /// Closest resistance gene, or [`NO_MATCH`].
    pub gene: String,
    /// Percent identity of the best match.
    pub identity: f64,
    /// Percent coverage of the best match.
    pub coverage: f64,
    /// Alignment score of the best match.
    pub score: f64,
}

//-----------------------------------------------------------------------------

fn label_or_no_match(label: String) -> String {
    if label.is_empty() { NO_MATCH.to_string() } else { label }
}

/// Predicts a species for every record using the species reference catalog.
pub fn classify_species(records: &[SequenceRecord], catalog: &ReferenceCatalog) -> Vec<SpeciesCall> {
    let mut calls: Vec<SpeciesCall> = Vec::with_capacity(records.len());
    for record in records {
        let (label, result) = catalog.best_match(&record.sequence);
        calls.push(SpeciesCall {
            id: record.id.clone(),
            predicted_species: label_or_no_match(label),
            identity: result.identity,
            coverage: result.coverage,
            score: result.score,
        });
    }
    calls
}

/// Finds the closest resistance gene for every record using the resistance
/// gene reference catalog.
pub fn detect_resistance_genes(records: &[SequenceRecord], catalog: &ReferenceCatalog) -> Vec<ResistanceCall> {
    let mut calls: Vec<ResistanceCall> = Vec::with_capacity(records.len());
    for record in records {
        let (label, result) = catalog.best_match(&record.sequence);
        calls.push(ResistanceCall {
            id: record.id.clone(),
            gene: label_or_no_match(label),
            identity: result.identity,
            coverage: result.coverage,
            score: result.score,
        });
    }
    calls
}

//-----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<SequenceRecord> {
        vec![
            SequenceRecord::new("isolate_1", "ATGAGTATTCAACATTTCCGTGTCGCCCTTATTCCCTTTTTTG"),
            SequenceRecord::new("isolate_2", "ATGGCAGCTATTGTTGACGTTATCGCGGTGATTTTTATC"),
        ]
    }

    #[test]
    fn species_calls() {
        let catalog = ReferenceCatalog::new(vec![
            ("Escherichia_coli".to_string(), "ATGAGTATTCAACATTTCCGTGTCGCCCTTATTCCCTTTTTTG".to_string()),
            ("Staphylococcus_aureus".to_string(), "TTGGCAGCTATTGTTGACGTTATCGCG".to_string()),
        ]);
        let calls = classify_species(&records(), &catalog);
        assert_eq!(calls.len(), 2, "Wrong number of species calls");
        assert_eq!(calls[0].id, "isolate_1", "Wrong record id in the first call");
        assert_eq!(calls[0].predicted_species, "Escherichia_coli", "Wrong species for an exact match");
        assert_eq!(calls[0].identity, 100.0, "Wrong identity for an exact match");
        assert_eq!(calls[0].coverage, 100.0, "Wrong coverage for an exact match");
        assert!(calls[1].identity < 100.0, "Unrelated sequence should not match fully");
    }

    #[test]
    fn empty_catalog_yields_no_match() {
        let catalog = ReferenceCatalog::new(Vec::new());
        let calls = detect_resistance_genes(&records(), &catalog);
        assert_eq!(calls.len(), 2, "Wrong number of resistance calls");
        for call in calls {
            assert_eq!(call.gene, NO_MATCH, "Empty catalog should yield {}", NO_MATCH);
            assert_eq!(call.identity, 0.0, "Empty catalog should yield zero identity");
        }
    }
}

//-----------------------------------------------------------------------------
