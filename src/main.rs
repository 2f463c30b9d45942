use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDateTime;
use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use jobq::config::QueueConfig;
use jobq::job::{Job, JobStatus, NewJob};
use jobq::queue::JobQueue;
use jobq::runner::Runner;
use jobq::shutdown::install_shutdown_handler;
use jobq::store::{JobStore, LimitBy, OrderBy, SortField};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Parser, Debug)]
#[command(name = "jobq")]
#[command(version)]
#[command(about = "A persisted priority job queue with advisory locking")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run a queue-processing pass (or watch the queue continuously)
    Run(RunArgs),

    /// Job management commands
    Job {
        #[command(flatten)]
        store: StoreArgs,

        #[command(subcommand)]
        command: JobCommands,
    },

    /// Remove the queue lock file (e.g. after a crashed runner)
    Unlock {
        /// Lock file to remove
        #[arg(long, default_value = "/var/run/jobq.pid")]
        lock_file: PathBuf,
    },
}

// =============================================================================
// Run Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct RunArgs {
    #[command(flatten)]
    store: StoreArgs,

    /// Lock file used to serialize passes
    #[arg(long, default_value = "/var/run/jobq.pid")]
    lock_file: PathBuf,

    /// Interpreter that job commands are run through
    #[arg(long, default_value = "python3")]
    interpreter: String,

    /// Treat a lock older than this many seconds as stuck (0 = never)
    #[arg(long, default_value = "0")]
    extended_secs: u64,

    /// Keep running passes instead of exiting after one
    #[arg(long)]
    watch: bool,

    /// Seconds between passes in watch mode
    #[arg(long, default_value = "5")]
    interval_secs: u64,
}

// =============================================================================
// Store Arguments (shared by run and job commands)
// =============================================================================

#[derive(Parser, Debug)]
struct StoreArgs {
    /// Database the job table lives in
    #[arg(long, default_value = "sqlite:jobq.db")]
    db: String,

    /// Output format
    #[arg(long, short = 'o', default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

// =============================================================================
// Job Commands
// =============================================================================

#[derive(clap::Subcommand, Debug)]
enum JobCommands {
    /// Add a job to the queue
    Submit {
        /// The command to run, without the interpreter (e.g. "report.py --all")
        command: String,

        /// Higher priority jobs run first
        #[arg(long, default_value = "0")]
        priority: i64,

        /// Earliest run time, "YYYY-MM-DD HH:MM:SS" local (default: now)
        #[arg(long)]
        start: Option<String>,
    },
    /// Show a single job
    Status {
        /// The job id
        job_id: i64,
    },
    /// List queued jobs
    List {
        /// Include running and inactive jobs as well
        #[arg(long)]
        all: bool,

        /// Maximum number of jobs to show
        #[arg(long, default_value = "100")]
        limit: u32,
    },
    /// Delete a job from the queue
    Remove {
        /// The job id
        job_id: i64,
    },
}

// =============================================================================
// JSON Output Types
// =============================================================================

#[derive(Serialize)]
struct JobOutput {
    id: i64,
    status: String,
    priority: i64,
    start: String,
    command: String,
    created_on: String,
    updated_on: String,
}

impl From<&Job> for JobOutput {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id,
            status: job.status.to_string(),
            priority: job.priority,
            start: job.start.format(DATETIME_FORMAT).to_string(),
            command: job.command.clone(),
            created_on: job.created_on.format(DATETIME_FORMAT).to_string(),
            updated_on: job.updated_on.format(DATETIME_FORMAT).to_string(),
        }
    }
}

#[derive(Serialize)]
struct JobListOutput {
    jobs: Vec<JobOutput>,
}

#[derive(Serialize)]
struct PassOutput {
    completed: usize,
    failed: usize,
    skipped: bool,
}

// =============================================================================
// Handlers
// =============================================================================

async fn run_pass(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = QueueConfig::new(args.store.db.clone())
        .with_lock_file(args.lock_file)
        .with_interpreter(args.interpreter)
        .with_extended_seconds(args.extended_secs)
        .with_poll_interval(Duration::from_secs(args.interval_secs));

    let store = JobStore::connect(&config.database_url).await?;
    let runner = Runner::new(JobQueue::new(store, config));

    if args.watch {
        let shutdown = install_shutdown_handler();
        runner.watch(shutdown).await?;
        return Ok(());
    }

    let summary = runner.pass().await?;
    match args.store.output {
        OutputFormat::Json => {
            let output = PassOutput {
                completed: summary.completed,
                failed: summary.failed,
                skipped: summary.skipped,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Table => {
            if summary.skipped {
                println!("Pass skipped: queue is locked");
            } else {
                println!("Completed: {}", summary.completed);
                println!("Failed:    {}", summary.failed);
            }
        }
    }
    Ok(())
}

async fn handle_job_submit(
    store: &JobStore,
    command: String,
    priority: i64,
    start: Option<String>,
    output_format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut new = NewJob::new(command).with_priority(priority);
    if let Some(start) = start {
        new = new.with_start(NaiveDateTime::parse_from_str(&start, DATETIME_FORMAT)?);
    }

    let job = store.insert(&new).await?;

    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&JobOutput::from(&job))?);
        }
        OutputFormat::Table => {
            println!("Job {} queued", job.id);
            println!("Start:    {}", job.start.format(DATETIME_FORMAT));
            println!("Priority: {}", job.priority);
            println!("Command:  {}", job.command);
        }
    }
    Ok(())
}

async fn handle_job_status(
    store: &JobStore,
    job_id: i64,
    output_format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let job = match store.find(job_id).await? {
        Some(job) => job,
        None => {
            eprintln!("Job not found: {}", job_id);
            std::process::exit(1);
        }
    };

    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&JobOutput::from(&job))?);
        }
        OutputFormat::Table => {
            println!("Job ID:     {}", job.id);
            println!("Status:     {}", job.status);
            println!("Priority:   {}", job.priority);
            println!("Start:      {}", job.start.format(DATETIME_FORMAT));
            println!("Command:    {}", job.command);
            println!("Created:    {}", job.created_on.format(DATETIME_FORMAT));
            println!("Updated:    {}", job.updated_on.format(DATETIME_FORMAT));
        }
    }
    Ok(())
}

async fn handle_job_list(
    store: &JobStore,
    all: bool,
    limit: u32,
    output_format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let order = Some(OrderBy::desc(SortField::Priority));
    let limitby = Some(LimitBy::First(limit));

    let mut jobs = store
        .select(JobStatus::Active, None, order, limitby)
        .await?;
    if all {
        for status in [JobStatus::Running, JobStatus::Inactive] {
            jobs.extend(store.select(status, None, order, limitby).await?);
        }
    }

    match output_format {
        OutputFormat::Json => {
            let output = JobListOutput {
                jobs: jobs.iter().map(JobOutput::from).collect(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Table => {
            if jobs.is_empty() {
                println!("No jobs found");
                return Ok(());
            }
            println!(
                "{:<8} {:<10} {:>8}  {:<19}  {}",
                "ID", "STATUS", "PRIORITY", "START", "COMMAND"
            );
            for job in &jobs {
                println!(
                    "{:<8} {:<10} {:>8}  {:<19}  {}",
                    job.id,
                    job.status.to_string(),
                    job.priority,
                    job.start.format(DATETIME_FORMAT).to_string(),
                    job.command
                );
            }
        }
    }
    Ok(())
}

// =============================================================================
// Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    match args.command {
        Commands::Run(run_args) => {
            run_pass(run_args).await?;
        }
        Commands::Job { store, command } => {
            let job_store = JobStore::connect(&store.db).await?;

            match command {
                JobCommands::Submit {
                    command: cmd,
                    priority,
                    start,
                } => {
                    handle_job_submit(&job_store, cmd, priority, start, &store.output).await?;
                }
                JobCommands::Status { job_id } => {
                    handle_job_status(&job_store, job_id, &store.output).await?;
                }
                JobCommands::List { all, limit } => {
                    handle_job_list(&job_store, all, limit, &store.output).await?;
                }
                JobCommands::Remove { job_id } => {
                    job_store.delete(job_id).await?;
                    println!("Job {} removed", job_id);
                }
            }
        }
        Commands::Unlock { lock_file } => {
            if lock_file.exists() {
                std::fs::remove_file(&lock_file)?;
                println!("Removed lock file {}", lock_file.display());
            } else {
                println!("No lock file at {}", lock_file.display());
            }
        }
    }

    Ok(())
}
