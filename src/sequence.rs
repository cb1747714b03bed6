//! Loading nucleotide sequences from FASTA input.
//!
//! Each record gets simple quality-control metrics when it is loaded:
//! sequence length, the number of ambiguous (non-ACGT) bases, GC content,
//! and QC flags for short or ambiguity-heavy sequences. Empty input yields
//! an empty record list, not an error; rejecting an empty submission is the
//! caller's decision.

use crate::utils;

use std::io::BufRead;
use std::path::Path;

use serde::{Deserialize, Serialize};

//-----------------------------------------------------------------------------

/// Sequences shorter than this are flagged as `too_short`.
pub const MIN_SEQUENCE_LENGTH: usize = 50;

/// Sequences with more ambiguous bases than this are flagged as
/// `high_ambiguous_content`.
pub const MAX_AMBIGUOUS_BASES: usize = 5;

/// QC flag for sequences shorter than [`MIN_SEQUENCE_LENGTH`].
pub const FLAG_TOO_SHORT: &str = "too_short";

/// QC flag for sequences with more than [`MAX_AMBIGUOUS_BASES`] ambiguous bases.
pub const FLAG_HIGH_AMBIGUOUS: &str = "high_ambiguous_content";

//-----------------------------------------------------------------------------

/// A loaded sequence with its quality-control metrics.
///
/// The sequence is stored in upper case and is immutable after loading.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SequenceRecord {
    /// Record identifier from the FASTA header.
    pub id: String,
    /// The sequence in upper case.
    pub sequence: String,
    /// Sequence length in bases.
    pub length: usize,
    /// Number of ambiguous (non-ACGT) bases.
    pub ambiguous: usize,
    /// QC flags; see [`FLAG_TOO_SHORT`] and [`FLAG_HIGH_AMBIGUOUS`].
    pub qc_flags: Vec<String>,
    /// GC content as a percentage with two decimals.
    pub gc_content: f64,
}

impl SequenceRecord {
    /// Creates a record from an identifier and a raw sequence, computing the
    /// QC metrics.
    pub fn new(id: &str, sequence: &str) -> Self {
        let sequence = sequence.to_ascii_uppercase();
        let length = sequence.len();
        let ambiguous = sequence.bytes()
            .filter(|c| !matches!(c, b'A' | b'C' | b'G' | b'T'))
            .count();
        let gc = sequence.bytes().filter(|c| matches!(c, b'G' | b'C')).count();

        let mut qc_flags: Vec<String> = Vec::new();
        if length < MIN_SEQUENCE_LENGTH {
            qc_flags.push(FLAG_TOO_SHORT.to_string());
        }
        if ambiguous > MAX_AMBIGUOUS_BASES {
            qc_flags.push(FLAG_HIGH_AMBIGUOUS.to_string());
        }

        SequenceRecord {
            id: id.to_string(),
            sequence,
            length,
            ambiguous,
            qc_flags,
            gc_content: utils::percentage(gc, length),
        }
    }
}

//-----------------------------------------------------------------------------

/// Loads FASTA records from the reader.
///
/// The identifier is the header line up to the first whitespace. Sequence
/// data may span multiple lines. Lines before the first header are rejected.
///
/// # Errors
///
/// Returns an error if the input cannot be read or if sequence data appears
/// before the first header line.
pub fn load_fasta(reader: &mut impl BufRead) -> Result<Vec<SequenceRecord>, String> {
    let mut records: Vec<SequenceRecord> = Vec::new();
    let mut id: Option<String> = None;
    let mut sequence = String::new();
    let mut line_num = 0;

    for line in reader.lines() {
        let line = line.map_err(|x| x.to_string())?;
        line_num += 1;
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        if let Some(header) = line.strip_prefix('>') {
            if let Some(id) = id.take() {
                records.push(SequenceRecord::new(&id, &sequence));
            }
            let name = header.split_whitespace().next().unwrap_or("");
            id = Some(name.to_string());
            sequence.clear();
        } else {
            if id.is_none() {
                return Err(format!("Sequence data before the first FASTA header on line {}", line_num));
            }
            sequence.push_str(line.trim());
        }
    }
    if let Some(id) = id {
        records.push(SequenceRecord::new(&id, &sequence));
    }

    Ok(records)
}

/// Loads FASTA records from a string.
pub fn load_fasta_from_text(text: &str) -> Result<Vec<SequenceRecord>, String> {
    let mut reader = text.as_bytes();
    load_fasta(&mut reader)
}

/// Loads FASTA records from a file, which may be gzip-compressed.
pub fn load_fasta_from_file<P: AsRef<Path>>(filename: P) -> Result<Vec<SequenceRecord>, String> {
    let mut reader = utils::open_file(filename)?;
    load_fasta(&mut reader)
}

//-----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input() {
        let records = load_fasta_from_text("");
        assert!(records.is_ok(), "Failed to load empty input: {}", records.unwrap_err());
        assert!(records.unwrap().is_empty(), "Empty input produced records");
    }

    #[test]
    fn basic_records() {
        let fasta = ">isolate_1 sample A\nATGAGTATTCAACATTTCCGTGTC\nGCCCTTATTCCCTTTTTTG\n>isolate_2\natggcagctattgttgacgttatcgcggtgatttttatc\n";
        let records = load_fasta_from_text(fasta);
        assert!(records.is_ok(), "Failed to load FASTA: {}", records.unwrap_err());
        let records = records.unwrap();
        assert_eq!(records.len(), 2, "Wrong number of records");

        assert_eq!(records[0].id, "isolate_1", "Header should be cut at the first whitespace");
        assert_eq!(records[0].length, 43, "Multi-line sequence not concatenated");
        assert_eq!(records[0].sequence, "ATGAGTATTCAACATTTCCGTGTCGCCCTTATTCCCTTTTTTG", "Wrong first sequence");

        assert_eq!(records[1].id, "isolate_2", "Wrong second identifier");
        assert_eq!(records[1].sequence, "ATGGCAGCTATTGTTGACGTTATCGCGGTGATTTTTATC", "Sequence should be upper-cased");
    }

    #[test]
    fn qc_metrics() {
        let record = SequenceRecord::new("short", "ATGCNN");
        assert_eq!(record.length, 6, "Wrong length");
        assert_eq!(record.ambiguous, 2, "Wrong ambiguous base count");
        assert_eq!(record.gc_content, 33.33, "Wrong GC content");
        assert!(record.qc_flags.iter().any(|f| f == FLAG_TOO_SHORT), "Missing too_short flag");
        assert!(!record.qc_flags.iter().any(|f| f == FLAG_HIGH_AMBIGUOUS), "Unexpected ambiguity flag");

        let ambiguous = "N".repeat(MAX_AMBIGUOUS_BASES + 1) + &"ACGT".repeat(20);
        let record = SequenceRecord::new("ambiguous", &ambiguous);
        assert!(record.qc_flags.iter().any(|f| f == FLAG_HIGH_AMBIGUOUS), "Missing ambiguity flag");
        assert!(!record.qc_flags.iter().any(|f| f == FLAG_TOO_SHORT), "Unexpected too_short flag");
    }

    #[test]
    fn data_before_header() {
        let result = load_fasta_from_text("ATGC\n>isolate_1\nACGT\n");
        assert!(result.is_err(), "Sequence data before the first header was accepted");
    }
}

//-----------------------------------------------------------------------------
