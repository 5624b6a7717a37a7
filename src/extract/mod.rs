//! Record extraction
//!
//! An [`Extractor`] turns one raw EFetch document into flat
//! [`LiteratureRecord`]s. The rule set is chosen once per run from the active
//! [`Database`]; every top-level element under the document root yields exactly
//! one record, however sparse.
//!
//! Field rules never fail: a rule that matches nothing produces an empty string
//! or an empty list. Only a document that cannot be parsed at all is an error.

pub mod normalize;
mod pmc;
mod pubmed;

use tracing::{debug, instrument};

use crate::database::Database;
use crate::error::Result;
use crate::record::LiteratureRecord;
use crate::xml::Document;

/// Family-specific extraction strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extractor {
    Pubmed,
    Pmc,
}

impl Extractor {
    pub fn for_database(database: Database) -> Self {
        match database {
            Database::Pubmed => Extractor::Pubmed,
            Database::Pmc => Extractor::Pmc,
        }
    }

    pub fn database(&self) -> Database {
        match self {
            Extractor::Pubmed => Database::Pubmed,
            Extractor::Pmc => Database::Pmc,
        }
    }

    /// Parse raw document bytes and extract one record per top-level element
    ///
    /// # Errors
    ///
    /// Returns [`crate::CorpusError::XmlError`] when the bytes are not a
    /// well-formed XML document. Callers that know which identifiers the
    /// document was fetched for rewrap it with
    /// [`crate::CorpusError::with_identifier`].
    ///
    /// # Example
    ///
    /// ```
    /// use ncbi_corpus::{Database, Extractor};
    ///
    /// let raw = br#"<PubmedArticleSet>
    ///   <PubmedArticle>
    ///     <MedlineCitation><Article><ArticleTitle>Title</ArticleTitle></Article></MedlineCitation>
    ///   </PubmedArticle>
    /// </PubmedArticleSet>"#;
    ///
    /// let records = Extractor::for_database(Database::Pubmed).extract(raw)?;
    /// assert_eq!(records.len(), 1);
    /// assert_eq!(records[0].title(), "Title");
    /// assert_eq!(records[0].pub_date(), "1900-01-01");
    /// # Ok::<(), ncbi_corpus::CorpusError>(())
    /// ```
    #[instrument(skip(raw), fields(database = %self.database(), raw_size = raw.len()))]
    pub fn extract(&self, raw: &[u8]) -> Result<Vec<LiteratureRecord>> {
        let doc = Document::from_bytes(raw)?;
        let records = self.extract_document(&doc);
        debug!(records = records.len(), "Extracted records");
        Ok(records)
    }

    /// Extract from an already parsed document
    pub fn extract_document(&self, doc: &Document) -> Vec<LiteratureRecord> {
        doc.records()
            .into_iter()
            .map(|element| match self {
                Extractor::Pubmed => {
                    LiteratureRecord::Pubmed(pubmed::extract_record(doc, element))
                }
                Extractor::Pmc => LiteratureRecord::Pmc(pmc::extract_record(doc, element)),
            })
            .collect()
    }
}

impl From<Database> for Extractor {
    fn from(database: Database) -> Self {
        Extractor::for_database(database)
    }
}
