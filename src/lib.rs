//! # NCBI Corpus
//!
//! Harvest PubMed and PubMed Central records into a flat, normalized corpus.
//!
//! A run resolves a query (or takes an explicit identifier list), fetches the
//! raw EFetch XML for every identifier across parallel chunk workers, extracts
//! one flat record per article with path-based field rules, and assembles the
//! records into a table with a fixed column order per database family.
//!
//! ## Features
//!
//! - **Two record families**: PubMed citations and PMC full-text articles, each
//!   with its own extraction rules and output schema
//! - **Fault-tolerant extraction**: a missing field is an empty value, never an error
//! - **Parallel batches**: contiguous chunks, one worker each, results kept in
//!   identifier order regardless of scheduling
//! - **Explicit failure policy**: fail the whole batch or skip the failing chunk
//! - **NCBI etiquette**: shared rate limiting, retry with backoff, API key support
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use ncbi_corpus::{ClientConfig, Database, Harvester, NcbiClient, RunConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = NcbiClient::with_config(
//!         ClientConfig::new().with_email("researcher@university.edu"),
//!     );
//!     let harvester = Harvester::new(
//!         Arc::new(client),
//!         RunConfig::new(Database::Pubmed).with_workers(4),
//!     )?;
//!
//!     let harvest = harvester.harvest("covid-19 treatment", 100).await?;
//!     for row in harvest.corpus.rows().iter().take(5) {
//!         println!("{:?}", row.cells.get(1));
//!     }
//!
//!     harvest.corpus.write_json_lines(std::io::stdout().lock())?;
//!     Ok(())
//! }
//! ```
//!
//! ### Extracting a document you already have
//!
//! ```
//! use ncbi_corpus::{Database, Extractor};
//!
//! let xml = br#"<pmc-articleset><article><front><article-meta>
//!   <title-group><article-title>Example</article-title></title-group>
//!   <pub-date pub-type="epub"><day>15</day><month>03</month><year>2020</year></pub-date>
//! </article-meta></front></article></pmc-articleset>"#;
//!
//! let records = Extractor::for_database(Database::Pmc).extract(xml)?;
//! assert_eq!(records[0].title(), "Example");
//! assert_eq!(records[0].pub_date(), "2020-03-15");
//! # Ok::<(), ncbi_corpus::CorpusError>(())
//! ```

pub mod batch;
pub mod cache;
pub mod config;
pub mod corpus;
pub mod database;
pub mod error;
pub mod extract;
pub mod harvest;
pub mod rate_limit;
pub mod record;
pub mod retry;
pub mod source;
pub mod xml;

// Re-export main types for convenience
pub use batch::{BatchRun, BatchRunner, ChunkFailure, ChunkOutput, partition};
pub use config::{CacheConfig, ClientConfig, FailurePolicy, RunConfig};
pub use corpus::{Cell, Corpus, CorpusRow, Schema, assemble};
pub use database::Database;
pub use error::{CorpusError, Result};
pub use extract::Extractor;
pub use harvest::{Harvest, Harvester};
pub use rate_limit::RateLimiter;
pub use record::{FieldValue, LiteratureRecord, PmcRecord, PubmedRecord, SENTINEL_PUB_DATE};
pub use retry::RetryConfig;
pub use source::{NcbiClient, RecordSource};
