//! # Patho-base: pathogen screening with a SQLite job database.
//!
//! This is a toolkit for screening pathogen isolate sequences against
//! reference catalogs. Every isolate is aligned to a species catalog and to
//! a resistance gene catalog with a global pairwise aligner, and the results
//! are assembled into a consolidated report.
//!
//! Analysis runs as jobs that are persisted in a SQLite database. A job is
//! created in the `pending` state, moves to `running` when the pipeline
//! starts, and ends as either `completed` (with the report rows as its
//! payload) or `failed` (with an error message). Terminal states are final:
//! the guarded transitions in the database never move a finished job again.
//! Jobs can run inline on the calling thread or in a background worker
//! thread with its own database connection.
//!
//! See [`JobStore`] for the database interface and [`JobRunner`] for job
//! execution. See [`align`] for the aligner and [`ReferenceCatalog`] for
//! catalog matching.
//!
//! ### Basic concepts
//!
//! Sequences are loaded from FASTA files (plain or gzip-compressed) into
//! [`SequenceRecord`] values, which carry basic QC metrics. Reference
//! catalogs are loaded from CSV files with a label column and a `sequence`
//! column.
//!
//! Alignment uses match/mismatch scores with affine gap penalties. The
//! scores are scaled to integers internally, so the same inputs always
//! produce bit-identical results.

pub mod align;
pub mod catalog;
pub mod classify;
pub mod db;
pub mod report;
pub mod runner;
pub mod sequence;
pub mod utils;

pub use align::AlignmentResult;
pub use catalog::ReferenceCatalog;
pub use classify::{ResistanceCall, SpeciesCall};
pub use db::{JobRecord, JobStatus, JobStore};
pub use report::{ReportRow, Summary};
pub use runner::{ExecutionMode, JobOutcome, JobRunner};
pub use sequence::SequenceRecord;
