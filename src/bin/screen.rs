use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;
use std::{env, io, process};

use patho_base::{ExecutionMode, JobOutcome, JobRunner, ReferenceCatalog};
use patho_base::{report, sequence};

use getopts::Options;

//-----------------------------------------------------------------------------

fn main() -> Result<(), String> {
    let start_time = Instant::now();

    // Parse arguments.
    let config = Config::new()?;

    // Load the reference catalogs.
    let species = ReferenceCatalog::from_csv_file(&config.species_file, patho_base::catalog::SPECIES_COLUMN)?;
    let resistance = ReferenceCatalog::from_csv_file(&config.resistance_file, patho_base::catalog::RESISTANCE_COLUMN)?;
    eprintln!(
        "Loaded {} species references and {} resistance gene references",
        species.len(), resistance.len()
    );

    // Load the sequences.
    let sequences = sequence::load_fasta_from_file(&config.input_file)?;
    if sequences.is_empty() {
        return Err(format!("No sequences in {}", config.input_file));
    }
    eprintln!("Loaded {} sequences from {}", sequences.len(), config.input_file);

    // Run the job.
    let mode = if config.background { ExecutionMode::Background } else { ExecutionMode::Inline };
    let runner = JobRunner::new(&config.db_file, species, resistance, config.output_dir.clone(), mode)?;
    let (job_id, outcome) = runner.enqueue(sequences, config.seed, &config.metadata)?;
    eprintln!("Created job {}", job_id);

    match outcome {
        Some(JobOutcome::Completed(rows)) => {
            if config.output_dir.is_none() {
                report::write_report(&rows, io::stdout())?;
            }
            eprintln!("Job {} completed with {} result rows", job_id, rows.len());
        },
        Some(JobOutcome::Failed(message)) => {
            return Err(format!("Job {} failed: {}", job_id, message));
        },
        None => {
            eprintln!("Job {} is running in the background", job_id);
            runner.wait_for_background_jobs();
        },
    }

    let end_time = Instant::now();
    let seconds = end_time.duration_since(start_time).as_secs_f64();
    eprintln!("Used {:.3} seconds", seconds);

    Ok(())
}

//-----------------------------------------------------------------------------

struct Config {
    pub input_file: String,
    pub species_file: String,
    pub resistance_file: String,
    pub db_file: String,
    pub output_dir: Option<PathBuf>,
    pub seed: Option<i64>,
    pub background: bool,
    pub metadata: BTreeMap<String, Option<String>>,
}

impl Config {
    pub fn new() -> Result<Config, String> {
        let args: Vec<String> = env::args().collect();
        let program = args[0].clone();

        let mut opts = Options::new();
        opts.optflag("h", "help", "print this help");
        opts.optopt("s", "species-ref", "species reference catalog (required)", "FILE");
        opts.optopt("r", "resistance-ref", "resistance gene catalog (required)", "FILE");
        opts.optopt("d", "db", "job database file (default: jobs.db)", "FILE");
        opts.optopt("o", "output", "write report and summary files to this directory", "DIR");
        opts.optopt("", "seed", "random seed for risk labels", "INT");
        opts.optflag("", "background", "run the job in a background thread");
        opts.optmulti("m", "meta", "attach metadata to the job", "KEY=VALUE");
        let matches = opts.parse(&args[1..]).map_err(|x| x.to_string())?;

        if matches.opt_present("h") {
            let header = format!("Usage: {} [options] sequences.fasta[.gz]", program);
            eprint!("{}", opts.usage(&header));
            process::exit(0);
        }

        let species_file = matches.opt_str("s");
        let resistance_file = matches.opt_str("r");
        let db_file = matches.opt_str("d").unwrap_or(String::from("jobs.db"));
        let output_dir = matches.opt_str("o").map(PathBuf::from);
        let mut seed: Option<i64> = None;
        if let Some(s) = matches.opt_str("seed") {
            seed = Some(s.parse::<i64>().map_err(|x| format!("--seed: {}", x))?);
        }
        let background = matches.opt_present("background");

        let mut metadata: BTreeMap<String, Option<String>> = BTreeMap::new();
        for item in matches.opt_strs("m") {
            match item.split_once('=') {
                Some((key, value)) => metadata.insert(key.to_string(), Some(value.to_string())),
                None => metadata.insert(item, None),
            };
        }

        let input_file = if let Some(s) = matches.free.first() {
            s.clone()
        } else {
            let header = format!("Usage: {} [options] sequences.fasta[.gz]", program);
            eprint!("{}", opts.usage(&header));
            process::exit(1);
        };

        Ok(Config {
            input_file,
            species_file: species_file.ok_or("Species catalog must be provided with --species-ref".to_string())?,
            resistance_file: resistance_file.ok_or("Resistance catalog must be provided with --resistance-ref".to_string())?,
            db_file,
            output_dir,
            seed,
            background,
            metadata,
        })
    }
}

//-----------------------------------------------------------------------------
