//! Running analysis jobs inline or in the background.
//!
//! [`JobRunner`] orchestrates one job end to end: it creates the job record,
//! executes the classification pipeline, and persists the terminal state.
//! The pipeline body is identical in both execution modes; only the caller's
//! blocking relationship changes. In [`ExecutionMode::Inline`] everything
//! runs on the calling thread and [`JobRunner::enqueue`] returns the outcome.
//! In [`ExecutionMode::Background`] the pipeline is offloaded to a worker
//! thread with its own database connection and the caller polls job status
//! through [`JobRunner::get_job`].
//!
//! The pipeline returns an explicit [`Result`], which the runner converts
//! into the terminal transition. No error escapes `enqueue` or a worker
//! thread; every failure after job creation ends as a `failed` job with the
//! message preserved.

use crate::catalog::ReferenceCatalog;
use crate::classify;
use crate::db::{JobRecord, JobStore};
use crate::report::{self, ReportRow};
use crate::sequence::SequenceRecord;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};


//-----------------------------------------------------------------------------

/// Execution strategy for analysis jobs, selected at construction time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Run the pipeline synchronously on the calling thread.
    Inline,
    /// Offload the pipeline to a worker thread and return immediately.
    Background,
}

/// The terminal outcome of one pipeline execution.
#[derive(Clone, Debug, PartialEq)]
pub enum JobOutcome {
    /// All steps succeeded; the job was marked completed with these rows.
    Completed(Vec<ReportRow>),
    /// A step failed; the job was marked failed with this message.
    Failed(String),
}

//-----------------------------------------------------------------------------

/// Cleans submission metadata before persistence.
///
/// Keys with absent values are dropped; string values are trimmed and the
/// key is dropped if the trimmed value is empty.
pub fn clean_metadata(metadata: &BTreeMap<String, Option<String>>) -> BTreeMap<String, String> {
    let mut cleaned: BTreeMap<String, String> = BTreeMap::new();
    for (key, value) in metadata {
        if let Some(value) = value {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                cleaned.insert(key.clone(), trimmed.to_string());
            }
        }
    }
    cleaned
}

//-----------------------------------------------------------------------------

/// Executes the classification pipeline for one job.
///
/// Classifies every record against both catalogs, assembles the report rows,
/// and writes the per-job report and summary CSV files when an output
/// directory is configured.
///
/// # Errors
///
/// Returns an error if report assembly or artefact writing fails. Errors
/// from this function are owned by the job: the runner converts them into a
/// `failed` transition.
pub fn run_pipeline(
    sequences: &[SequenceRecord],
    species: &ReferenceCatalog,
    resistance: &ReferenceCatalog,
    seed: Option<i64>,
    output_dir: Option<&Path>,
    job_id: &str,
) -> Result<Vec<ReportRow>, String> {
    let species_calls = classify::classify_species(sequences, species);
    let resistance_calls = classify::detect_resistance_genes(sequences, resistance);
    let rows = report::build_rows(sequences, &species_calls, &resistance_calls, seed.map(|s| s as u64))?;

    if let Some(output_dir) = output_dir {
        report::save_report(&rows, output_dir.join(format!("report_{}.csv", job_id)))?;
        report::save_report(&rows, output_dir.join("report.csv"))?;
        let summary = report::build_summary(&rows);
        if summary.sequence_count > 0 {
            report::save_summary(&summary, output_dir.join(format!("summary_{}.csv", job_id)))?;
        }
    }

    Ok(rows)
}

//-----------------------------------------------------------------------------

/// Orchestrates analysis jobs against a job database and two reference
/// catalogs.
///
/// The catalogs are loaded once and shared read-only with all workers. The
/// runner keeps its own database connection for job creation and reads;
/// every background worker opens a separate connection, as connections are
/// not shared between threads.
///
/// The runner does not deduplicate submissions and does not cap the number
/// of concurrent background jobs; each call to [`JobRunner::enqueue`] starts
/// at most one worker.
#[derive(Debug)]
pub struct JobRunner {
    store: JobStore,
    db_file: PathBuf,
    species: Arc<ReferenceCatalog>,
    resistance: Arc<ReferenceCatalog>,
    output_dir: Option<PathBuf>,
    mode: ExecutionMode,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl JobRunner {
    /// Creates a runner, opening the job database in `db_file` or creating
    /// it if it does not exist.
    pub fn new<P: AsRef<Path>>(
        db_file: P,
        species: ReferenceCatalog,
        resistance: ReferenceCatalog,
        output_dir: Option<PathBuf>,
        mode: ExecutionMode,
    ) -> Result<Self, String> {
        let store = JobStore::open_or_create(&db_file)?;
        Ok(JobRunner {
            store,
            db_file: db_file.as_ref().to_path_buf(),
            species: Arc::new(species),
            resistance: Arc::new(resistance),
            output_dir,
            mode,
            workers: Mutex::new(Vec::new()),
        })
    }

    /// Returns the execution mode of the runner.
    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Creates a job for the given sequences and executes it.
    ///
    /// The job record is created in the `pending` state before this returns,
    /// so the returned id is immediately valid for polling. In inline mode
    /// the call blocks until the job is terminal and the outcome is
    /// returned; in background mode the call returns immediately with
    /// [`None`] as the outcome.
    ///
    /// # Errors
    ///
    /// Returns an error only if the job record cannot be created. Failures
    /// after job creation are persisted as a `failed` job and reported
    /// through the outcome, never as an error.
    pub fn enqueue(
        &self,
        sequences: Vec<SequenceRecord>,
        seed: Option<i64>,
        metadata: &BTreeMap<String, Option<String>>,
    ) -> Result<(String, Option<JobOutcome>), String> {
        let cleaned = clean_metadata(metadata);
        let job = self.store.create_job(seed, &cleaned)?;
        let job_id = job.id;

        match self.mode {
            ExecutionMode::Inline => {
                let outcome = run_job(
                    &self.store, &job_id, &sequences,
                    &self.species, &self.resistance,
                    seed, self.output_dir.as_deref(),
                );
                Ok((job_id, Some(outcome)))
            },
            ExecutionMode::Background => {
                let db_file = self.db_file.clone();
                let worker_job_id = job_id.clone();
                let species = self.species.clone();
                let resistance = self.resistance.clone();
                let output_dir = self.output_dir.clone();
                let handle = thread::spawn(move || {
                    let store = match JobStore::open(&db_file) {
                        Ok(store) => store,
                        Err(message) => {
                            eprintln!("Warning: job {} could not open the database: {}", worker_job_id, message);
                            return;
                        },
                    };
                    let _ = run_job(
                        &store, &worker_job_id, &sequences,
                        &species, &resistance,
                        seed, output_dir.as_deref(),
                    );
                });
                self.workers.lock().unwrap().push(handle);
                Ok((job_id, None))
            },
        }
    }

    /// Returns the job with the given id, or [`None`] if it does not exist.
    pub fn get_job(&self, job_id: &str) -> Result<Option<JobRecord>, String> {
        self.store.get_job(job_id)
    }

    /// Returns up to `limit` jobs, most recently created first.
    pub fn list_jobs(&self, limit: usize) -> Result<Vec<JobRecord>, String> {
        self.store.list_jobs(limit)
    }

    /// Waits until all background workers started so far have finished.
    ///
    /// Jobs are not cancelled; a running job always reaches a terminal
    /// state. This is a no-op in inline mode.
    pub fn wait_for_background_jobs(&self) {
        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.workers.lock().unwrap());
        for handle in handles {
            let _ = handle.join();
        }
    }
}

impl Drop for JobRunner {
    fn drop(&mut self) {
        self.wait_for_background_jobs();
    }
}

//-----------------------------------------------------------------------------

// Executes one job: marks it running, runs the pipeline, and persists the
// terminal state. Every failure becomes a `Failed` outcome; nothing is
// propagated to the caller or the worker thread.
fn run_job(
    store: &JobStore,
    job_id: &str,
    sequences: &[SequenceRecord],
    species: &ReferenceCatalog,
    resistance: &ReferenceCatalog,
    seed: Option<i64>,
    output_dir: Option<&Path>,
) -> JobOutcome {
    let started = match store.mark_running(job_id) {
        Ok(started) => started,
        Err(message) => {
            eprintln!("Warning: job {} could not be marked running: {}", job_id, message);
            return JobOutcome::Failed(message);
        },
    };
    if !started {
        let message = format!("Job {} is missing or not pending", job_id);
        return JobOutcome::Failed(message);
    }

    match run_pipeline(sequences, species, resistance, seed, output_dir, job_id) {
        Ok(rows) => {
            match store.mark_completed(job_id, &rows) {
                Ok(_) => JobOutcome::Completed(rows),
                Err(message) => {
                    eprintln!("Warning: the results of job {} could not be persisted: {}", job_id, message);
                    JobOutcome::Failed(message)
                },
            }
        },
        Err(message) => {
            if let Err(db_error) = store.mark_failed(job_id, &message) {
                eprintln!("Warning: the failure of job {} could not be persisted: {}", job_id, db_error);
            }
            JobOutcome::Failed(message)
        },
    }
}

//-----------------------------------------------------------------------------
