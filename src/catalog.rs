//! Reference catalogs and best-match selection.
//!
//! A [`ReferenceCatalog`] is an ordered, immutable list of (label, sequence)
//! pairs loaded once from a CSV sheet. Two independent catalogs exist in a
//! deployment: pathogen species and resistance genes. They are never merged.
//!
//! [`ReferenceCatalog::best_match`] scores a query against every entry with
//! [`crate::align::align`] and keeps the best one. Every entry is scored;
//! this is intended for reference-catalog scale, not genome-scale search.

use crate::align::{self, AlignmentResult};
use crate::utils;

use std::io::Read;
use std::path::Path;

//-----------------------------------------------------------------------------

/// Name of the required sequence column in reference CSV sheets.
pub const SEQUENCE_COLUMN: &str = "sequence";

/// Label column of the pathogen species reference sheet.
pub const SPECIES_COLUMN: &str = "species";

/// Label column of the resistance gene reference sheet.
pub const RESISTANCE_COLUMN: &str = "gene_name";

//-----------------------------------------------------------------------------

/// An ordered, immutable collection of labeled reference sequences.
///
/// # Examples
///
/// ```
/// use patho_base::catalog::ReferenceCatalog;
///
/// let csv = "gene_name,sequence\nblaTEM,ATGAGTATT\nmecA,TTGGCAGCT\n";
/// let catalog = ReferenceCatalog::from_csv_reader(csv.as_bytes(), "gene_name").unwrap();
/// assert_eq!(catalog.len(), 2);
///
/// let (label, result) = catalog.best_match("ATGAGTATT");
/// assert_eq!(label, "blaTEM");
/// assert_eq!(result.identity, 100.0);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferenceCatalog {
    entries: Vec<(String, String)>,
}

impl ReferenceCatalog {
    /// Creates a catalog from the given (label, sequence) pairs.
    ///
    /// Sequences are stored in upper case. The order of the entries is
    /// preserved and used for breaking full ties in [`Self::best_match`].
    pub fn new(entries: Vec<(String, String)>) -> Self {
        let entries = entries.into_iter()
            .map(|(label, sequence)| (label, sequence.to_ascii_uppercase()))
            .collect();
        ReferenceCatalog { entries }
    }

    /// Loads a catalog from a CSV file with a header row.
    ///
    /// The sheet must contain the given label column and a `sequence` column.
    /// The file may be gzip-compressed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist, cannot be parsed as CSV,
    /// or does not contain the required columns.
    pub fn from_csv_file<P: AsRef<Path>>(filename: P, label_column: &str) -> Result<Self, String> {
        if !utils::file_exists(&filename) {
            return Err(format!("Reference CSV not found: {}", filename.as_ref().display()));
        }
        let reader = utils::open_file(&filename)?;
        Self::from_csv_reader(reader, label_column)
    }

    /// Loads a catalog from CSV data with a header row.
    ///
    /// See [`Self::from_csv_file`] for the requirements.
    pub fn from_csv_reader<R: Read>(reader: R, label_column: &str) -> Result<Self, String> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let headers = csv_reader.headers().map_err(|x| x.to_string())?;
        let label_index = headers.iter().position(|name| name == label_column);
        let sequence_index = headers.iter().position(|name| name == SEQUENCE_COLUMN);
        let (label_index, sequence_index) = match (label_index, sequence_index) {
            (Some(label), Some(sequence)) => (label, sequence),
            _ => {
                return Err(format!(
                    "Reference CSV must contain columns {} and {}, got {}",
                    label_column, SEQUENCE_COLUMN,
                    headers.iter().collect::<Vec<&str>>().join(", ")
                ));
            },
        };

        let mut entries: Vec<(String, String)> = Vec::new();
        for record in csv_reader.records() {
            let record = record.map_err(|x| x.to_string())?;
            let label = record.get(label_index).unwrap_or("").to_string();
            let sequence = record.get(sequence_index).unwrap_or("").to_ascii_uppercase();
            entries.push((label, sequence));
        }

        Ok(ReferenceCatalog { entries })
    }

    /// Returns the number of entries in the catalog.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns an iterator over the (label, sequence) pairs in stored order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(label, sequence)| (label.as_str(), sequence.as_str()))
    }

    /// Returns the catalog entry with the best alignment to the query.
    ///
    /// A candidate replaces the current best if it has a higher identity, or
    /// the same identity and a higher score. Remaining ties keep the earliest
    /// entry in catalog order. An empty catalog yields an empty label and the
    /// zero-valued result.
    pub fn best_match(&self, query: &str) -> (String, AlignmentResult) {
        let mut best_label = String::new();
        let mut best = AlignmentResult::zero();
        for (label, sequence) in self.iter() {
            let result = align::align(query, sequence);
            if result.identity > best.identity ||
                (result.identity == best.identity && result.score > best.score)
            {
                best_label = label.to_string();
                best = result;
            }
        }
        (best_label, best)
    }
}

//-----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog_from(entries: &[(&str, &str)]) -> ReferenceCatalog {
        let entries = entries.iter()
            .map(|(label, sequence)| (label.to_string(), sequence.to_string()))
            .collect();
        ReferenceCatalog::new(entries)
    }

    #[test]
    fn empty_catalog() {
        let catalog = ReferenceCatalog::new(Vec::new());
        let (label, result) = catalog.best_match("ACGT");
        assert!(label.is_empty(), "Empty catalog returned label {}", label);
        assert_eq!(result, AlignmentResult::zero(), "Empty catalog returned a nonzero result");
    }

    #[test]
    fn exact_match_wins() {
        let catalog = catalog_from(&[
            ("blaTEM", "ATGAGTATTCAACATTTCCG"),
            ("mecA", "TTGGCAGCTATTGTTGACGT"),
        ]);
        let (label, result) = catalog.best_match("TTGGCAGCTATTGTTGACGT");
        assert_eq!(label, "mecA", "Wrong label for an exact match");
        assert_eq!(result.identity, 100.0, "Wrong identity for an exact match");
        assert_eq!(result.coverage, 100.0, "Wrong coverage for an exact match");
    }

    #[test]
    fn full_ties_keep_the_earliest_entry() {
        let catalog = catalog_from(&[
            ("first", "ACGTACGT"),
            ("second", "ACGTACGT"),
        ]);
        let (label, _) = catalog.best_match("ACGTACGT");
        assert_eq!(label, "first", "Full tie did not keep the earliest entry");
    }

    #[test]
    fn score_breaks_identity_ties() {
        // Both references match all eight query bases and have length 12, so
        // the identities tie at 8/12. The query's bases sit in one contiguous
        // block of `contiguous` (one gap run) but in two blocks of `split`
        // (two gap runs), so `contiguous` scores higher under affine gaps.
        // It must win even though it comes later in catalog order.
        let query = "AACCGGTT";
        let split = align::align(query, "AAAACCGGTTAA");
        let contiguous = align::align(query, "AACCGGTTAAAA");
        assert_eq!(split.identity, contiguous.identity, "Fixture identities should tie");
        assert!(contiguous.score > split.score, "Fixture scores should differ");

        let catalog = catalog_from(&[
            ("split", "AAAACCGGTTAA"),
            ("contiguous", "AACCGGTTAAAA"),
        ]);
        let (label, result) = catalog.best_match(query);
        assert_eq!(label, "contiguous", "Score did not break the identity tie");
        assert_eq!(result, contiguous, "Wrong result for the score tie-break");
    }

    #[test]
    fn csv_loading() {
        let csv = "gene_name,sequence,notes\nblaTEM,atgagtatt,common\nmecA,TTGGCAGCT,\n";
        let catalog = ReferenceCatalog::from_csv_reader(csv.as_bytes(), RESISTANCE_COLUMN);
        assert!(catalog.is_ok(), "Failed to load catalog: {}", catalog.unwrap_err());
        let catalog = catalog.unwrap();
        assert_eq!(catalog.len(), 2, "Wrong number of catalog entries");
        let entries: Vec<(&str, &str)> = catalog.iter().collect();
        assert_eq!(entries[0], ("blaTEM", "ATGAGTATT"), "Sequences should be upper-cased on load");
        assert_eq!(entries[1], ("mecA", "TTGGCAGCT"), "Wrong second entry");
    }

    #[test]
    fn csv_missing_columns() {
        let csv = "name,dna\nblaTEM,ATGAGTATT\n";
        let catalog = ReferenceCatalog::from_csv_reader(csv.as_bytes(), RESISTANCE_COLUMN);
        assert!(catalog.is_err(), "Catalog loaded without the required columns");
        let message = catalog.unwrap_err();
        assert!(message.contains(RESISTANCE_COLUMN), "Error does not name the missing column: {}", message);
    }

    #[test]
    fn missing_file() {
        let catalog = ReferenceCatalog::from_csv_file("no-such-reference.csv", SPECIES_COLUMN);
        assert!(catalog.is_err(), "Catalog loaded from a missing file");
    }
}

//-----------------------------------------------------------------------------
