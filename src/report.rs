//! Assembling classification results into report rows.
//!
//! A report row combines the QC metrics of a sequence record with its
//! species prediction and resistance gene call, plus a resistance risk
//! label drawn from a seeded random number generator. The column order of
//! the CSV output follows the struct field order and is fixed.

use crate::classify::{ResistanceCall, SpeciesCall};
use crate::sequence::SequenceRecord;

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

//-----------------------------------------------------------------------------

/// Resistance risk labels, in the order they are sampled.
pub const RISK_LEVELS: [&str; 3] = ["Low", "Medium", "High"];

/// Separator for QC flags in a report row.
pub const FLAG_SEPARATOR: &str = ";";

/// One row of the consolidated analysis report.
///
/// The field order is the column order of the CSV report and is part of the
/// output contract.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    /// Record identifier.
    pub id: String,
    /// The analyzed sequence.
    pub sequence: String,
    /// Sequence length in bases.
    pub length: usize,
    /// Number of ambiguous bases.
    pub ambiguous: usize,
    /// QC flags joined with [`FLAG_SEPARATOR`].
    pub qc_flags: String,
    /// GC content percentage.
    pub gc_content: f64,
    /// Predicted species.
    pub predicted_species: String,
    /// Identity of the species match.
    pub species_identity: f64,
    /// Coverage of the species match.
    pub species_coverage: f64,
    /// Score of the species match.
    pub species_score: f64,
    /// Closest resistance gene.
    pub amr_gene: String,
    /// Identity of the resistance gene match.
    pub amr_identity: f64,
    /// Coverage of the resistance gene match.
    pub amr_coverage: f64,
    /// Score of the resistance gene match.
    pub amr_score: f64,
    /// Resistance risk label from [`RISK_LEVELS`].
    pub resistance_risk: String,
}

//-----------------------------------------------------------------------------

/// Builds the consolidated report rows for the given records and calls.
///
/// The calls must be in record order, one per record, as produced by the
/// classifier adapters. The risk labels are drawn from a generator seeded
/// with `seed`; the same seed always yields the same labels.
///
/// # Errors
///
/// Returns an error if the numbers of records and calls disagree.
pub fn build_rows(
    records: &[SequenceRecord],
    species_calls: &[SpeciesCall],
    resistance_calls: &[ResistanceCall],
    seed: Option<u64>,
) -> Result<Vec<ReportRow>, String> {
    if species_calls.len() != records.len() || resistance_calls.len() != records.len() {
        return Err(format!(
            "Mismatched result counts: {} records, {} species calls, {} resistance calls",
            records.len(), species_calls.len(), resistance_calls.len()
        ));
    }

    let mut rng = match seed {
        Some(value) => StdRng::seed_from_u64(value),
        None => StdRng::from_entropy(),
    };

    let mut rows: Vec<ReportRow> = Vec::with_capacity(records.len());
    for ((record, species), resistance) in
        records.iter().zip(species_calls.iter()).zip(resistance_calls.iter())
    {
        let risk = RISK_LEVELS.choose(&mut rng).unwrap();
        rows.push(ReportRow {
            id: record.id.clone(),
            sequence: record.sequence.clone(),
            length: record.length,
            ambiguous: record.ambiguous,
            qc_flags: record.qc_flags.join(FLAG_SEPARATOR),
            gc_content: record.gc_content,
            predicted_species: species.predicted_species.clone(),
            species_identity: species.identity,
            species_coverage: species.coverage,
            species_score: species.score,
            amr_gene: resistance.gene.clone(),
            amr_identity: resistance.identity,
            amr_coverage: resistance.coverage,
            amr_score: resistance.score,
            resistance_risk: risk.to_string(),
        });
    }

    Ok(rows)
}

//-----------------------------------------------------------------------------

/// Writes the report rows as CSV with a header row.
pub fn write_report<W: Write>(rows: &[ReportRow], writer: W) -> Result<(), String> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row).map_err(|x| x.to_string())?;
    }
    csv_writer.flush().map_err(|x| x.to_string())
}

/// Saves the report rows as a CSV file, creating parent directories as needed.
pub fn save_report<P: AsRef<Path>>(rows: &[ReportRow], filename: P) -> Result<(), String> {
    if let Some(parent) = filename.as_ref().parent() {
        fs::create_dir_all(parent).map_err(|x| x.to_string())?;
    }
    let file = fs::File::create(filename).map_err(|x| x.to_string())?;
    write_report(rows, file)
}

//-----------------------------------------------------------------------------

/// Aggregate counts over a set of report rows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Number of analyzed sequences.
    pub sequence_count: usize,
    /// Predicted species with their counts, most common first.
    pub species_counts: Vec<(String, usize)>,
    /// Resistance genes with their counts, most common first.
    pub amr_counts: Vec<(String, usize)>,
}

fn counts_by_frequency<'a>(labels: impl Iterator<Item = &'a str>) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }
    let mut result: Vec<(String, usize)> = counts.into_iter()
        .map(|(label, count)| (label.to_string(), count))
        .collect();
    // Most common first; the map already ordered the labels for equal counts.
    result.sort_by(|a, b| b.1.cmp(&a.1));
    result
}

/// Builds the summary counts for the given report rows.
pub fn build_summary(rows: &[ReportRow]) -> Summary {
    Summary {
        sequence_count: rows.len(),
        species_counts: counts_by_frequency(rows.iter().map(|row| row.predicted_species.as_str())),
        amr_counts: counts_by_frequency(rows.iter().map(|row| row.amr_gene.as_str())),
    }
}

/// Writes the summary as CSV with columns category, name, and count.
pub fn write_summary<W: Write>(summary: &Summary, writer: W) -> Result<(), String> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["category", "name", "count"]).map_err(|x| x.to_string())?;
    for (name, count) in summary.species_counts.iter() {
        csv_writer.write_record(["species", name, &count.to_string()]).map_err(|x| x.to_string())?;
    }
    for (name, count) in summary.amr_counts.iter() {
        csv_writer.write_record(["amr_gene", name, &count.to_string()]).map_err(|x| x.to_string())?;
    }
    csv_writer.flush().map_err(|x| x.to_string())
}

/// Saves the summary as a CSV file, creating parent directories as needed.
pub fn save_summary<P: AsRef<Path>>(summary: &Summary, filename: P) -> Result<(), String> {
    if let Some(parent) = filename.as_ref().parent() {
        fs::create_dir_all(parent).map_err(|x| x.to_string())?;
    }
    let file = fs::File::create(filename).map_err(|x| x.to_string())?;
    write_summary(summary, file)
}

//-----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ReferenceCatalog;
    use crate::classify;

    fn fixture() -> (Vec<SequenceRecord>, Vec<SpeciesCall>, Vec<ResistanceCall>) {
        let records = vec![
            SequenceRecord::new("isolate_1", "ATGAGTATTCAACATTTCCGTGTCGCCCTTATTCCCTTTTTTG"),
            SequenceRecord::new("isolate_2", "ATGGCAGCTATTGTTGACGTTATCGCGGTGATTTTTATC"),
        ];
        let species = ReferenceCatalog::new(vec![
            ("Escherichia_coli".to_string(), "ATGAGTATTCAACATTTCCGTGTCGCCCTTATTCCCTTTTTTG".to_string()),
        ]);
        let resistance = ReferenceCatalog::new(vec![
            ("blaTEM".to_string(), "ATGAGTATTCAACATTTCCG".to_string()),
        ]);
        let species_calls = classify::classify_species(&records, &species);
        let resistance_calls = classify::detect_resistance_genes(&records, &resistance);
        (records, species_calls, resistance_calls)
    }

    #[test]
    fn rows_are_deterministic_with_a_seed() {
        let (records, species_calls, resistance_calls) = fixture();
        let first = build_rows(&records, &species_calls, &resistance_calls, Some(42));
        assert!(first.is_ok(), "Failed to build rows: {}", first.unwrap_err());
        let first = first.unwrap();
        let second = build_rows(&records, &species_calls, &resistance_calls, Some(42)).unwrap();
        assert_eq!(first, second, "Same seed produced different rows");
        for row in first.iter() {
            assert!(RISK_LEVELS.contains(&row.resistance_risk.as_str()), "Unknown risk label {}", row.resistance_risk);
        }
    }

    #[test]
    fn mismatched_counts() {
        let (records, species_calls, _) = fixture();
        let result = build_rows(&records, &species_calls, &[], Some(1));
        assert!(result.is_err(), "Mismatched call counts were accepted");
    }

    #[test]
    fn csv_output() {
        let (records, species_calls, resistance_calls) = fixture();
        let rows = build_rows(&records, &species_calls, &resistance_calls, Some(7)).unwrap();
        let mut buffer: Vec<u8> = Vec::new();
        let result = write_report(&rows, &mut buffer);
        assert!(result.is_ok(), "Failed to write the report: {}", result.unwrap_err());
        let text = String::from_utf8(buffer).unwrap();
        let header = text.lines().next().unwrap();
        assert!(header.starts_with("id,sequence,length,ambiguous,qc_flags,gc_content,predicted_species"),
            "Unexpected report columns: {}", header);
        assert_eq!(text.lines().count(), 3, "Wrong number of report lines");
    }

    #[test]
    fn summary_counts() {
        let (records, species_calls, resistance_calls) = fixture();
        let rows = build_rows(&records, &species_calls, &resistance_calls, Some(7)).unwrap();
        let summary = build_summary(&rows);
        assert_eq!(summary.sequence_count, 2, "Wrong sequence count");
        let total: usize = summary.species_counts.iter().map(|(_, count)| count).sum();
        assert_eq!(total, 2, "Species counts do not cover all rows");
        assert_eq!(summary.species_counts[0].1, 2, "Most common species should be counted twice");

        let mut buffer: Vec<u8> = Vec::new();
        let result = write_summary(&summary, &mut buffer);
        assert!(result.is_ok(), "Failed to write the summary: {}", result.unwrap_err());
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.starts_with("category,name,count"), "Unexpected summary header");
    }
}

//-----------------------------------------------------------------------------
