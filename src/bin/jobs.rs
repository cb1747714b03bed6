use std::{env, process};

use patho_base::JobStore;

use getopts::Options;

//-----------------------------------------------------------------------------

fn main() -> Result<(), String> {
    // Parse arguments.
    let config = Config::new()?;

    // Open the database.
    let store = JobStore::open(&config.db_file)?;

    if let Some(job_id) = &config.job_id {
        let job = store.get_job(job_id)?;
        let job = job.ok_or(format!("Job {} does not exist", job_id))?;
        let output = serde_json::to_string_pretty(&job).map_err(|x| x.to_string())?;
        println!("{}", output);
    } else {
        let jobs = store.list_jobs(config.limit)?;
        for job in jobs.iter() {
            println!("{}\t{}\t{}", job.id, job.status.as_str(), job.created_at);
        }
        eprintln!("Listed {} jobs from {}", jobs.len(), config.db_file);
    }

    Ok(())
}

//-----------------------------------------------------------------------------

struct Config {
    pub db_file: String,
    pub job_id: Option<String>,
    pub limit: usize,
}

impl Config {
    pub fn new() -> Result<Config, String> {
        let args: Vec<String> = env::args().collect();
        let program = args[0].clone();

        let mut opts = Options::new();
        opts.optflag("h", "help", "print this help");
        opts.optopt("j", "job", "print the full record of this job", "ID");
        opts.optopt("n", "limit", "list at most this many jobs (default 20)", "INT");
        let matches = opts.parse(&args[1..]).map_err(|x| x.to_string())?;

        if matches.opt_present("h") {
            let header = format!("Usage: {} [options] jobs.db", program);
            eprint!("{}", opts.usage(&header));
            process::exit(0);
        }

        let job_id = matches.opt_str("j");
        let mut limit: usize = 20;
        if let Some(s) = matches.opt_str("n") {
            limit = s.parse::<usize>().map_err(|x| format!("--limit: {}", x))?;
        }

        let db_file = if let Some(s) = matches.free.first() {
            s.clone()
        } else {
            let header = format!("Usage: {} [options] jobs.db", program);
            eprint!("{}", opts.usage(&header));
            process::exit(1);
        };

        Ok(Config {
            db_file,
            job_id,
            limit,
        })
    }
}

//-----------------------------------------------------------------------------
