//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use ncbi_corpus::{CorpusError, Database, RecordSource, Result};

/// One `PubmedArticle` element with a title, one author, and an entrez date
pub fn pubmed_article(pmid: &str, title: &str, given: &str, surname: &str) -> String {
    format!(
        r#"<PubmedArticle>
    <MedlineCitation Status="MEDLINE" Owner="NLM">
        <PMID Version="1">{pmid}</PMID>
        <Article>
            <Journal><ISOAbbreviation>Test J</ISOAbbreviation></Journal>
            <ArticleTitle>{title}</ArticleTitle>
            <AuthorList>
                <Author><LastName>{surname}</LastName><ForeName>{given}</ForeName></Author>
            </AuthorList>
        </Article>
    </MedlineCitation>
    <PubmedData>
        <History>
            <PubMedPubDate PubStatus="entrez"><Year>2020</Year><Month>3</Month><Day>15</Day></PubMedPubDate>
        </History>
        <ArticleIdList>
            <ArticleId IdType="pubmed">{pmid}</ArticleId>
        </ArticleIdList>
    </PubmedData>
</PubmedArticle>"#
    )
}

/// One JATS `article` element with a title, one author, and an epub date
pub fn pmc_article(pmcid: &str, title: &str, given: &str, surname: &str) -> String {
    format!(
        r#"<article article-type="research-article">
  <front>
    <journal-meta><journal-id journal-id-type="iso-abbrev">Test J</journal-id></journal-meta>
    <article-meta>
      <article-id pub-id-type="pmc">{pmcid}</article-id>
      <title-group><article-title>{title}</article-title></title-group>
      <contrib-group>
        <contrib contrib-type="author"><name><surname>{surname}</surname><given-names>{given}</given-names></name></contrib>
      </contrib-group>
      <pub-date pub-type="epub"><day>15</day><month>03</month><year>2020</year></pub-date>
    </article-meta>
  </front>
  <body><p>Body of {pmcid}.</p></body>
</article>"#
    )
}

pub fn pubmed_set(articles: &[String]) -> String {
    format!(
        "<?xml version=\"1.0\" ?>\n<PubmedArticleSet>\n{}\n</PubmedArticleSet>",
        articles.join("\n")
    )
}

pub fn pmc_set(articles: &[String]) -> String {
    format!(
        "<?xml version=\"1.0\" ?>\n<pmc-articleset>\n{}\n</pmc-articleset>",
        articles.join("\n")
    )
}

pub fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// [`RecordSource`] serving canned documents from memory
///
/// Documents are keyed by single identifier; a multi-identifier request gets
/// the concatenated articles of each identifier wrapped in one set.
#[derive(Default)]
pub struct InMemorySource {
    articles: HashMap<String, String>,
    raw: HashMap<String, Vec<u8>>,
    unavailable: Vec<String>,
    search_results: Vec<String>,
    requests: Mutex<Vec<Vec<String>>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `article` (a single record element) for `id`
    pub fn with_article(mut self, id: &str, article: String) -> Self {
        self.articles.insert(id.to_string(), article);
        self
    }

    /// Serve `document` verbatim for `id`
    pub fn with_raw(mut self, id: &str, document: &[u8]) -> Self {
        self.raw.insert(id.to_string(), document.to_vec());
        self
    }

    /// Fail every fetch that includes `id`
    pub fn with_unavailable(mut self, id: &str) -> Self {
        self.unavailable.push(id.to_string());
        self
    }

    pub fn with_search_results(mut self, ids: &[&str]) -> Self {
        self.search_results = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Identifier groups requested so far, in request order
    pub fn requests(&self) -> Vec<Vec<String>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordSource for InMemorySource {
    async fn search(
        &self,
        database: Database,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<String>> {
        if query.trim().is_empty() {
            return Err(CorpusError::SearchError {
                database: database.to_string(),
                query: query.to_string(),
                message: "query is empty".to_string(),
            });
        }
        Ok(self
            .search_results
            .iter()
            .take(max_results)
            .cloned()
            .collect())
    }

    async fn fetch(&self, database: Database, ids: &[String]) -> Result<Vec<u8>> {
        self.requests.lock().unwrap().push(ids.to_vec());

        if let Some(id) = ids.iter().find(|id| self.unavailable.contains(*id)) {
            return Err(CorpusError::FetchError {
                id: id.clone(),
                message: "Service Unavailable".to_string(),
            });
        }

        if let [id] = ids
            && let Some(raw) = self.raw.get(id)
        {
            return Ok(raw.clone());
        }

        let articles: Vec<String> = ids
            .iter()
            .filter_map(|id| self.articles.get(id).cloned())
            .collect();
        let document = match database {
            Database::Pubmed => pubmed_set(&articles),
            Database::Pmc => pmc_set(&articles),
        };
        Ok(document.into_bytes())
    }
}
