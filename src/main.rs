use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use ncbi_corpus::config::DEFAULT_MAX_RESULTS;
use ncbi_corpus::{
    ClientConfig, Database, FailurePolicy, Harvest, Harvester, NcbiClient, RunConfig,
};

#[derive(Parser)]
#[command(
    name = "ncbi-corpus",
    about = "Build a flat corpus from PubMed or PMC records",
    long_about = "Fetches PubMed or PMC records in parallel, extracts a fixed set of fields \
                  from each article, and writes the corpus as JSON Lines"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// API key for NCBI E-utilities (increases rate limit)
    #[arg(long, env = "NCBI_API_KEY", global = true)]
    api_key: Option<String>,

    /// Email for NCBI requests (recommended)
    #[arg(long, env = "NCBI_EMAIL", global = true)]
    email: Option<String>,

    /// Tool name for NCBI requests
    #[arg(long, env = "NCBI_TOOL", default_value = "ncbi-corpus", global = true)]
    tool: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Search a database and harvest every identifier found
    Search {
        /// Search query (E-utilities term syntax)
        query: String,
        /// Maximum number of identifiers to harvest
        #[arg(short = 'n', long, default_value_t = DEFAULT_MAX_RESULTS)]
        max_results: usize,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Harvest an explicit list of identifiers
    Fetch {
        /// PMIDs or PMCIDs, depending on --db
        #[arg(required_unless_present = "ids_file")]
        ids: Vec<String>,
        /// File with one identifier per line
        #[arg(long)]
        ids_file: Option<PathBuf>,
        #[command(flatten)]
        run: RunArgs,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Record family: pubmed or pmc
    #[arg(long = "db", default_value = "pubmed")]
    database: Database,

    /// Number of parallel chunk workers
    #[arg(short, long, default_value_t = ncbi_corpus::config::DEFAULT_WORKERS)]
    workers: usize,

    /// What to do when a chunk fails: fail-batch or skip-chunk
    #[arg(long, default_value = "fail-batch")]
    policy: FailurePolicy,

    /// Identifiers sent in one EFetch request
    #[arg(long, default_value_t = 1)]
    ids_per_request: usize,

    /// Output JSONL file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory to save the last raw XML document of each chunk
    #[arg(long)]
    raw_dir: Option<PathBuf>,

    /// HTTP request timeout in seconds
    #[arg(short, long, default_value_t = 30)]
    timeout: u64,
}

impl RunArgs {
    fn run_config(&self) -> RunConfig {
        RunConfig::new(self.database)
            .with_workers(self.workers)
            .with_failure_policy(self.policy)
            .with_ids_per_request(self.ids_per_request)
            .with_keep_raw(self.raw_dir.is_some())
    }
}

fn create_client(cli: &Cli, run: &RunArgs) -> NcbiClient {
    let mut config = ClientConfig::new()
        .with_tool(&cli.tool)
        .with_timeout_seconds(run.timeout);

    if let Some(key) = &cli.api_key {
        config = config.with_api_key(key);
    }

    if let Some(email) = &cli.email {
        config = config.with_email(email);
    }

    NcbiClient::with_config(config)
}

fn read_ids_file(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read identifiers from {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

fn write_outputs(harvest: &Harvest, run: &RunArgs) -> Result<()> {
    match &run.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            harvest.corpus.write_json_lines(BufWriter::new(file))?;
            info!(path = %path.display(), rows = harvest.corpus.len(), "Corpus written");
        }
        None => harvest.corpus.write_json_lines(io::stdout().lock())?,
    }

    if let Some(dir) = &run.raw_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        for (chunk, raw) in &harvest.raw_documents {
            let path = dir.join(format!("{}-chunk-{chunk:04}.xml", run.database));
            let mut file = File::create(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            file.write_all(raw)?;
        }
        info!(
            dir = %dir.display(),
            documents = harvest.raw_documents.len(),
            "Raw documents written"
        );
    }

    for failure in &harvest.failures {
        warn!(
            chunk = failure.index,
            identifiers = failure.identifiers.len(),
            error = %failure.error,
            "Chunk skipped"
        );
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // Logs go to stderr so stdout stays clean for the corpus
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(io::stderr),
        )
        .with(filter)
        .init();

    let (harvest, run) = match &cli.command {
        Commands::Search {
            query,
            max_results,
            run,
        } => {
            let client = create_client(&cli, run);
            let harvester = Harvester::new(Arc::new(client), run.run_config())?;
            (harvester.harvest(query, *max_results).await?, run)
        }
        Commands::Fetch { ids, ids_file, run } => {
            let mut identifiers = ids.clone();
            if let Some(path) = ids_file {
                identifiers.extend(read_ids_file(path)?);
            }
            let client = create_client(&cli, run);
            let harvester = Harvester::new(Arc::new(client), run.run_config())?;
            (harvester.harvest_ids(&identifiers).await?, run)
        }
    };

    write_outputs(&harvest, run)
}
