//! SQLite-backed storage for analysis jobs.
//!
//! Each analysis request is tracked as a job with the lifecycle
//! `pending → running → {completed | failed}`. Every transition is committed
//! to the database before the runner proceeds, so a poller always observes a
//! status consistent with actual progress. The database is the single source
//! of truth for job state: the runner only ever holds a job id and re-reads
//! or re-writes the record on every transition.
//!
//! In multi-threaded applications, each thread should have its own
//! connection; see [`JobStore::open`].

use crate::report::ReportRow;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension, Row};
use serde::Serialize;
use uuid::Uuid;


//-----------------------------------------------------------------------------

/// Status of an analysis job.
///
/// Transitions are one-directional and single-shot: `Pending` to `Running`
/// to exactly one of the terminal states. A terminal job is never
/// re-transitioned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Created but not started.
    Pending,
    /// Classification work is in progress.
    Running,
    /// All steps succeeded; the result payload is populated.
    Completed,
    /// A step failed; the error message is populated.
    Failed,
}

impl JobStatus {
    /// Returns the status as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Parses a stored status string.
    pub fn from_str(value: &str) -> Result<Self, String> {
        match value {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(format!("Invalid job status: {}", value)),
        }
    }

    /// Returns `true` if the status is `Completed` or `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

//-----------------------------------------------------------------------------

/// A persisted analysis job.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct JobRecord {
    /// Opaque unique identifier, generated at creation and never reused.
    pub id: String,
    /// Current lifecycle status.
    pub status: JobStatus,
    /// Optional seed for the randomized risk-labeling step.
    pub seed: Option<i64>,
    /// Cleaned submission metadata.
    pub metadata: BTreeMap<String, String>,
    /// Result rows; present only when the job is completed.
    pub results: Option<Vec<ReportRow>>,
    /// Error message; present only when the job is failed.
    pub error: Option<String>,
    /// Creation timestamp (UTC, written by the database).
    pub created_at: String,
    /// Timestamp of the latest transition (UTC, written by the database).
    pub updated_at: String,
}

// Raw column values before the JSON columns are parsed.
struct JobColumns {
    id: String,
    status: String,
    seed: Option<i64>,
    metadata: String,
    results: Option<String>,
    error: Option<String>,
    created_at: String,
    updated_at: String,
}

impl JobColumns {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(JobColumns {
            id: row.get(0)?,
            status: row.get(1)?,
            seed: row.get(2)?,
            metadata: row.get(3)?,
            results: row.get(4)?,
            error: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn into_record(self) -> Result<JobRecord, String> {
        let status = JobStatus::from_str(&self.status)?;
        let metadata: BTreeMap<String, String> = serde_json::from_str(&self.metadata)
            .map_err(|x| format!("Invalid metadata for job {}: {}", self.id, x))?;
        let results: Option<Vec<ReportRow>> = match self.results {
            Some(json) => Some(serde_json::from_str(&json)
                .map_err(|x| format!("Invalid result payload for job {}: {}", self.id, x))?),
            None => None,
        };
        Ok(JobRecord {
            id: self.id,
            status,
            seed: self.seed,
            metadata,
            results,
            error: self.error,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

//-----------------------------------------------------------------------------

/// A connection to a job database.
///
/// Job records are mutated only through the transition operations
/// [`JobStore::create_job`], [`JobStore::mark_running`],
/// [`JobStore::mark_completed`], and [`JobStore::mark_failed`]. Each of them
/// is a single guarded SQL statement and therefore atomic with respect to
/// other operations on the same job id.
///
/// # Examples
///
/// ```
/// use patho_base::db::{JobStore, JobStatus};
/// use std::collections::BTreeMap;
/// use std::fs;
///
/// let db_file = std::env::temp_dir().join("patho-base-doc-example.db");
/// let _ = fs::remove_file(&db_file);
/// let store = JobStore::create(&db_file).unwrap();
///
/// let job = store.create_job(Some(42), &BTreeMap::new()).unwrap();
/// assert_eq!(job.status, JobStatus::Pending);
/// assert!(store.mark_running(&job.id).unwrap());
///
/// let job = store.get_job(&job.id).unwrap().unwrap();
/// assert_eq!(job.status, JobStatus::Running);
///
/// drop(store);
/// fs::remove_file(&db_file).unwrap();
/// ```
#[derive(Debug)]
pub struct JobStore {
    connection: Connection,
    filename: PathBuf,
}

impl JobStore {
    // Key for database version.
    const KEY_VERSION: &'static str = "version";

    /// Current database version.
    pub const VERSION: &'static str = "patho-base v0.1.0";

    // Concurrent workers share the database file, so writers wait for the
    // lock instead of failing immediately.
    const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

    const JOB_COLUMNS: &'static str =
        "id, status, seed, metadata, results, error, created_at, updated_at";

    /// Returns `true` if the database file exists.
    pub fn exists<P: AsRef<Path>>(filename: P) -> bool {
        crate::utils::file_exists(filename)
    }

    /// Creates a new job database in the given file.
    ///
    /// # Errors
    ///
    /// Returns an error if the database already exists.
    /// Passes through any database errors.
    pub fn create<P: AsRef<Path>>(filename: P) -> Result<Self, String> {
        if Self::exists(&filename) {
            return Err(format!("Database {} already exists", filename.as_ref().display()));
        }
        let connection = Connection::open(&filename).map_err(|x| x.to_string())?;
        connection.busy_timeout(Self::BUSY_TIMEOUT).map_err(|x| x.to_string())?;

        connection.execute(
            "CREATE TABLE Tags (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            ) STRICT",
            (),
        ).map_err(|x| x.to_string())?;
        connection.execute(
            "INSERT INTO Tags(key, value) VALUES (?1, ?2)",
            (Self::KEY_VERSION, Self::VERSION),
        ).map_err(|x| x.to_string())?;

        connection.execute(
            "CREATE TABLE Jobs (
                id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                seed INTEGER,
                metadata TEXT NOT NULL,
                results TEXT,
                error TEXT,
                created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
                updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
            ) STRICT",
            (),
        ).map_err(|x| x.to_string())?;

        Ok(JobStore {
            connection,
            filename: filename.as_ref().to_path_buf(),
        })
    }

    /// Opens a connection to the job database in the given file.
    ///
    /// Checks the database version and passes through any database errors.
    pub fn open<P: AsRef<Path>>(filename: P) -> Result<Self, String> {
        let connection = Connection::open(&filename).map_err(|x| x.to_string())?;
        connection.busy_timeout(Self::BUSY_TIMEOUT).map_err(|x| x.to_string())?;

        let version: Option<String> = connection.prepare(
            "SELECT value FROM Tags WHERE key = ?1"
        ).and_then(|mut statement| {
            statement.query_row((Self::KEY_VERSION,), |row| row.get(0)).optional()
        }).map_err(|x| x.to_string())?;
        match version {
            Some(version) if version == Self::VERSION => (),
            Some(version) => {
                return Err(format!("Unsupported database version: {} (expected {})", version, Self::VERSION));
            },
            None => {
                return Err(format!("Database {} has no version tag", filename.as_ref().display()));
            },
        }

        Ok(JobStore {
            connection,
            filename: filename.as_ref().to_path_buf(),
        })
    }

    /// Opens the job database in the given file, creating it first if it
    /// does not exist.
    pub fn open_or_create<P: AsRef<Path>>(filename: P) -> Result<Self, String> {
        if Self::exists(&filename) {
            Self::open(filename)
        } else {
            Self::create(filename)
        }
    }

    /// Returns the filename of the database.
    pub fn filename(&self) -> &Path {
        &self.filename
    }
}

//-----------------------------------------------------------------------------

/// Job operations.
impl JobStore {
    /// Creates a new pending job and returns the persisted record.
    ///
    /// The job id is a fresh UUID; the metadata must already be cleaned
    /// (see [`crate::runner::clean_metadata`]).
    pub fn create_job(&self, seed: Option<i64>, metadata: &BTreeMap<String, String>) -> Result<JobRecord, String> {
        let id = Uuid::new_v4().to_string();
        let metadata_json = serde_json::to_string(metadata).map_err(|x| x.to_string())?;
        self.connection.execute(
            "INSERT INTO Jobs(id, status, seed, metadata) VALUES (?1, ?2, ?3, ?4)",
            (&id, JobStatus::Pending.as_str(), seed, &metadata_json),
        ).map_err(|x| x.to_string())?;

        let job = self.get_job(&id)?;
        job.ok_or(format!("Job {} disappeared after creation", id))
    }

    /// Marks a pending job as running.
    ///
    /// Returns `false` without raising if the job does not exist or is not
    /// pending.
    pub fn mark_running(&self, job_id: &str) -> Result<bool, String> {
        let updated = self.connection.execute(
            "UPDATE Jobs
                SET status = ?1, updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now')
                WHERE id = ?2 AND status = ?3",
            (JobStatus::Running.as_str(), job_id, JobStatus::Pending.as_str()),
        ).map_err(|x| x.to_string())?;
        Ok(updated > 0)
    }

    /// Marks a running job as completed and stores the result rows.
    ///
    /// Returns `false` without raising if the job does not exist or is not
    /// running; a terminal job is never modified.
    pub fn mark_completed(&self, job_id: &str, rows: &[ReportRow]) -> Result<bool, String> {
        let results_json = serde_json::to_string(rows).map_err(|x| x.to_string())?;
        let updated = self.connection.execute(
            "UPDATE Jobs
                SET status = ?1, results = ?2, error = NULL,
                    updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now')
                WHERE id = ?3 AND status = ?4",
            (JobStatus::Completed.as_str(), &results_json, job_id, JobStatus::Running.as_str()),
        ).map_err(|x| x.to_string())?;
        Ok(updated > 0)
    }

    /// Marks a running job as failed and stores the error message. No
    /// partial result payload is retained.
    ///
    /// Returns `false` without raising if the job does not exist or is not
    /// running; a terminal job is never modified.
    pub fn mark_failed(&self, job_id: &str, message: &str) -> Result<bool, String> {
        let updated = self.connection.execute(
            "UPDATE Jobs
                SET status = ?1, error = ?2, results = NULL,
                    updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now')
                WHERE id = ?3 AND status = ?4",
            (JobStatus::Failed.as_str(), message, job_id, JobStatus::Running.as_str()),
        ).map_err(|x| x.to_string())?;
        Ok(updated > 0)
    }

    /// Returns the job with the given id, or [`None`] if it does not exist.
    pub fn get_job(&self, job_id: &str) -> Result<Option<JobRecord>, String> {
        let columns = self.connection.prepare(
            &format!("SELECT {} FROM Jobs WHERE id = ?1", Self::JOB_COLUMNS)
        ).and_then(|mut statement| {
            statement.query_row((job_id,), JobColumns::from_row).optional()
        }).map_err(|x| x.to_string())?;
        match columns {
            Some(columns) => Ok(Some(columns.into_record()?)),
            None => Ok(None),
        }
    }

    /// Returns up to `limit` jobs, most recently created first.
    pub fn list_jobs(&self, limit: usize) -> Result<Vec<JobRecord>, String> {
        let mut statement = self.connection.prepare(
            &format!(
                "SELECT {} FROM Jobs ORDER BY created_at DESC, rowid DESC LIMIT ?1",
                Self::JOB_COLUMNS
            )
        ).map_err(|x| x.to_string())?;

        let mut result: Vec<JobRecord> = Vec::new();
        let mut rows = statement.query((limit,)).map_err(|x| x.to_string())?;
        while let Some(row) = rows.next().map_err(|x| x.to_string())? {
            let columns = JobColumns::from_row(row).map_err(|x| x.to_string())?;
            result.push(columns.into_record()?);
        }
        Ok(result)
    }
}

//-----------------------------------------------------------------------------
