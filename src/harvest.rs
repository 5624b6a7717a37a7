//! Search, fetch, and assemble in one call

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::batch::{BatchRunner, ChunkFailure};
use crate::config::RunConfig;
use crate::corpus::{Corpus, Schema, assemble};
use crate::error::Result;
use crate::source::RecordSource;

/// Result of a harvest
#[derive(Debug)]
pub struct Harvest {
    pub corpus: Corpus,
    /// Chunks skipped under `FailurePolicy::SkipChunk`
    pub failures: Vec<ChunkFailure>,
    /// `(chunk index, last raw document)` per chunk, when raw retention is on
    pub raw_documents: Vec<(usize, Vec<u8>)>,
}

/// Drives a whole run: resolve identifiers, fan out, assemble
///
/// Each call is independent; nothing is carried over between harvests.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use ncbi_corpus::{ClientConfig, Database, Harvester, NcbiClient, RunConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = NcbiClient::with_config(ClientConfig::new().with_email("me@example.org"));
///     let harvester = Harvester::new(Arc::new(client), RunConfig::new(Database::Pmc))?;
///
///     let harvest = harvester.harvest("crispr base editing", 200).await?;
///     println!("{} rows", harvest.corpus.len());
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Harvester {
    source: Arc<dyn RecordSource>,
    runner: BatchRunner,
    schema: Schema,
}

impl Harvester {
    pub fn new(source: Arc<dyn RecordSource>, config: RunConfig) -> Result<Self> {
        let schema = Schema::for_database(config.database);
        let runner = BatchRunner::new(Arc::clone(&source), config)?;
        Ok(Self {
            source,
            runner,
            schema,
        })
    }

    /// Replace the output columns
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    pub fn config(&self) -> &RunConfig {
        self.runner.config()
    }

    /// Resolve `query` into identifiers
    ///
    /// A result as long as `max_results` usually means the query matched more
    /// records than were returned; this is logged, not treated as an error.
    #[instrument(skip(self), fields(database = %self.config().database))]
    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<String>> {
        let ids = self
            .source
            .search(self.config().database, query, max_results)
            .await?;

        if max_results > 0 && ids.len() >= max_results {
            warn!(
                returned = ids.len(),
                max_results, "Search hit max_results; the result set is probably truncated"
            );
        }
        Ok(ids)
    }

    /// Search, then harvest every identifier found
    pub async fn harvest(&self, query: &str, max_results: usize) -> Result<Harvest> {
        let ids = self.search(query, max_results).await?;
        self.harvest_ids(&ids).await
    }

    /// Fetch, extract, and assemble an explicit identifier list
    #[instrument(skip(self, identifiers), fields(identifiers = identifiers.len()))]
    pub async fn harvest_ids(&self, identifiers: &[String]) -> Result<Harvest> {
        let run = self.runner.run(identifiers).await?;

        let raw_documents = run
            .chunks
            .iter()
            .filter_map(|chunk| chunk.raw.clone().map(|raw| (chunk.index, raw)))
            .collect();
        let corpus = assemble(run.chunks, &self.schema)?;

        info!(
            rows = corpus.len(),
            skipped_chunks = run.failures.len(),
            "Harvest complete"
        );
        Ok(Harvest {
            corpus,
            failures: run.failures,
            raw_documents,
        })
    }
}
