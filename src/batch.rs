//! Parallel batch runner
//!
//! A run splits the identifier list into contiguous chunks, one per worker,
//! and processes every chunk on its own task: fetch the raw document for each
//! identifier group, extract records on the blocking pool, and accumulate them.
//! Results are collected in partition order once every worker has finished, so
//! the row order of the final corpus never depends on scheduling.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span, instrument, warn};

use crate::config::{FailurePolicy, RunConfig};
use crate::error::{CorpusError, Result};
use crate::extract::Extractor;
use crate::record::LiteratureRecord;
use crate::source::RecordSource;

/// A contiguous slice of the identifier list handled by one worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position in the partition, starting at 0
    pub index: usize,
    pub identifiers: Vec<String>,
}

impl Chunk {
    pub fn first_id(&self) -> &str {
        self.identifiers.first().map(String::as_str).unwrap_or("")
    }
}

/// Split `identifiers` into `workers` near-equal contiguous chunks
///
/// The worker count is clamped to the number of identifiers. When the split
/// is uneven the leading chunks are one identifier longer, so chunk sizes
/// never differ by more than one. An empty identifier list yields no chunks.
///
/// # Errors
///
/// Returns [`CorpusError::InvalidConfig`] when `workers` is zero.
///
/// # Example
///
/// ```
/// use ncbi_corpus::batch::partition;
///
/// let ids: Vec<String> = (1..=7).map(|i| i.to_string()).collect();
/// let chunks = partition(&ids, 3)?;
///
/// let sizes: Vec<usize> = chunks.iter().map(|c| c.identifiers.len()).collect();
/// assert_eq!(sizes, vec![3, 2, 2]);
/// assert_eq!(chunks[1].identifiers, vec!["4", "5"]);
/// # Ok::<(), ncbi_corpus::CorpusError>(())
/// ```
pub fn partition(identifiers: &[String], workers: usize) -> Result<Vec<Chunk>> {
    if workers == 0 {
        return Err(CorpusError::InvalidConfig(
            "worker count must be at least 1".to_string(),
        ));
    }

    let count = workers.min(identifiers.len());
    if count == 0 {
        return Ok(Vec::new());
    }

    let base = identifiers.len() / count;
    let extra = identifiers.len() % count;

    let mut chunks = Vec::with_capacity(count);
    let mut start = 0;
    for index in 0..count {
        let len = base + usize::from(index < extra);
        chunks.push(Chunk {
            index,
            identifiers: identifiers[start..start + len].to_vec(),
        });
        start += len;
    }
    Ok(chunks)
}

/// Records produced by one chunk
#[derive(Debug, Clone)]
pub struct ChunkOutput {
    pub index: usize,
    pub identifiers: Vec<String>,
    /// Records of every identifier in the chunk, in identifier order
    pub records: Vec<LiteratureRecord>,
    /// Last raw document fetched by the chunk, when raw retention is on
    pub raw: Option<Vec<u8>>,
}

/// A chunk that was skipped under [`FailurePolicy::SkipChunk`]
#[derive(Debug)]
pub struct ChunkFailure {
    pub index: usize,
    pub identifiers: Vec<String>,
    pub error: CorpusError,
}

/// Outcome of a batch run
#[derive(Debug, Default)]
pub struct BatchRun {
    /// Successful chunks in partition order
    pub chunks: Vec<ChunkOutput>,
    /// Skipped chunks in partition order; always empty under `FailBatch`
    pub failures: Vec<ChunkFailure>,
}

impl BatchRun {
    pub fn record_count(&self) -> usize {
        self.chunks.iter().map(|c| c.records.len()).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Fans identifiers out over chunk workers and gathers their records
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use ncbi_corpus::{BatchRunner, Database, NcbiClient, RunConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let runner = BatchRunner::new(
///         Arc::new(NcbiClient::new()),
///         RunConfig::new(Database::Pubmed).with_workers(4),
///     )?;
///
///     let ids = vec!["31978945".to_string(), "33515491".to_string()];
///     let run = runner.run(&ids).await?;
///     println!("{} records", run.record_count());
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct BatchRunner {
    source: Arc<dyn RecordSource>,
    extractor: Extractor,
    config: RunConfig,
}

impl BatchRunner {
    pub fn new(source: Arc<dyn RecordSource>, config: RunConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            source,
            extractor: Extractor::for_database(config.database),
            config,
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Process every identifier and return per-chunk results in partition order
    ///
    /// # Errors
    ///
    /// Under [`FailurePolicy::FailBatch`] the first failed chunk (in partition
    /// order) is returned as [`CorpusError::ChunkFailed`], or
    /// [`CorpusError::WorkerFailed`] when its task panicked. All workers are
    /// joined before either outcome is reported.
    #[instrument(skip(self, identifiers), fields(
        database = %self.config.database,
        identifiers = identifiers.len(),
        workers = self.config.workers,
        policy = %self.config.failure_policy,
    ))]
    pub async fn run(&self, identifiers: &[String]) -> Result<BatchRun> {
        let chunks = partition(identifiers, self.config.workers)?;
        if chunks.is_empty() {
            info!("No identifiers to process");
            return Ok(BatchRun::default());
        }
        info!(chunks = chunks.len(), "Starting chunk workers");

        let workers: Vec<(Chunk, JoinHandle<Result<ChunkOutput>>)> = chunks
            .into_iter()
            .map(|chunk| {
                let task = ChunkTask {
                    source: Arc::clone(&self.source),
                    extractor: self.extractor,
                    ids_per_request: self.config.ids_per_request,
                    keep_raw: self.config.keep_raw,
                };
                let span = info_span!("chunk", index = chunk.index, size = chunk.identifiers.len());
                let handle = tokio::spawn(task.process(chunk.clone()).instrument(span));
                (chunk, handle)
            })
            .collect();

        // Join-all barrier: every worker finishes before results are inspected
        let mut outcomes = Vec::with_capacity(workers.len());
        for (chunk, handle) in workers {
            let outcome = match handle.await {
                Ok(result) => result.map_err(|source| CorpusError::ChunkFailed {
                    chunk: chunk.index,
                    first_id: chunk.first_id().to_string(),
                    source: Box::new(source),
                }),
                Err(join_error) => Err(CorpusError::WorkerFailed {
                    chunk: chunk.index,
                    message: join_error.to_string(),
                }),
            };
            outcomes.push((chunk, outcome));
        }

        let mut run = BatchRun::default();
        for (chunk, outcome) in outcomes {
            match outcome {
                Ok(output) => run.chunks.push(output),
                Err(error) => match self.config.failure_policy {
                    FailurePolicy::FailBatch => return Err(error),
                    FailurePolicy::SkipChunk => {
                        warn!(chunk = chunk.index, error = %error, "Skipping failed chunk");
                        run.failures.push(ChunkFailure {
                            index: chunk.index,
                            identifiers: chunk.identifiers,
                            error,
                        });
                    }
                },
            }
        }

        info!(
            records = run.record_count(),
            completed = run.chunks.len(),
            skipped = run.failures.len(),
            "Batch run finished"
        );
        Ok(run)
    }
}

/// Everything a chunk worker owns; nothing is shared mutably between workers
struct ChunkTask {
    source: Arc<dyn RecordSource>,
    extractor: Extractor,
    ids_per_request: usize,
    keep_raw: bool,
}

impl ChunkTask {
    async fn process(self, chunk: Chunk) -> Result<ChunkOutput> {
        let database = self.extractor.database();
        let mut records = Vec::new();
        let mut raw = None;

        for group in chunk.identifiers.chunks(self.ids_per_request) {
            let document = self.source.fetch(database, group).await?;
            let (extracted, document) = extract_blocking(self.extractor, document, chunk.index)
                .await?;
            let extracted = extracted.map_err(|e| e.with_identifier(&group.join(",")))?;

            debug!(
                ids = group.len(),
                records = extracted.len(),
                "Extracted identifier group"
            );
            records.extend(extracted);
            if self.keep_raw {
                raw = Some(document);
            }
        }

        Ok(ChunkOutput {
            index: chunk.index,
            identifiers: chunk.identifiers,
            records,
            raw,
        })
    }
}

/// Run extraction on the blocking pool and hand the document back
async fn extract_blocking(
    extractor: Extractor,
    document: Vec<u8>,
    chunk: usize,
) -> Result<(Result<Vec<LiteratureRecord>>, Vec<u8>)> {
    tokio::task::spawn_blocking(move || {
        let records = extractor.extract(&document);
        (records, document)
    })
    .await
    .map_err(|e| CorpusError::WorkerFailed {
        chunk,
        message: e.to_string(),
    })
}
