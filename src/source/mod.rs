//! Remote record sources
//!
//! The batch runner only needs two things from the outside world: resolving a
//! query into identifiers, and fetching the raw document for a group of
//! identifiers. [`RecordSource`] captures exactly that so runs can be driven by
//! the NCBI E-utilities client or by an in-memory source in tests.

mod ncbi;
pub(crate) mod responses;

pub use ncbi::NcbiClient;

use async_trait::async_trait;

use crate::database::Database;
use crate::error::Result;

#[async_trait]
pub trait RecordSource: Send + Sync + 'static {
    /// Resolve `query` into at most `max_results` identifiers
    ///
    /// Failures are reported as [`crate::CorpusError::SearchError`].
    async fn search(&self, database: Database, query: &str, max_results: usize)
    -> Result<Vec<String>>;

    /// Fetch one raw document covering every identifier in `ids`
    ///
    /// Failures are reported as [`crate::CorpusError::FetchError`] naming the
    /// identifiers of the request.
    async fn fetch(&self, database: Database, ids: &[String]) -> Result<Vec<u8>>;
}
