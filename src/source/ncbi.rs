use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::{debug, info, instrument};

use super::RecordSource;
use super::responses::ESearchResult;
use crate::cache::{DocumentCache, document_key};
use crate::config::ClientConfig;
use crate::database::Database;
use crate::error::{CorpusError, Result};
use crate::rate_limit::RateLimiter;
use crate::retry::with_retry;

/// [`RecordSource`] backed by the NCBI E-utilities (`esearch.fcgi` / `efetch.fcgi`)
///
/// Every request goes through one shared token bucket, so clones of a client
/// (one per chunk worker) stay under the NCBI rate limit together.
#[derive(Clone)]
pub struct NcbiClient {
    client: Client,
    base_url: String,
    rate_limiter: RateLimiter,
    config: ClientConfig,
    cache: Option<DocumentCache>,
}

impl NcbiClient {
    /// Create a client with default configuration (3 requests/second, no API key)
    pub fn new() -> Self {
        Self::with_config(ClientConfig::new())
    }

    /// Create a client with custom configuration
    ///
    /// # Example
    ///
    /// ```
    /// use ncbi_corpus::{ClientConfig, NcbiClient};
    ///
    /// let config = ClientConfig::new()
    ///     .with_api_key("your_api_key_here")
    ///     .with_email("researcher@university.edu");
    ///
    /// let client = NcbiClient::with_config(config);
    /// ```
    pub fn with_config(config: ClientConfig) -> Self {
        let rate_limiter = config.create_rate_limiter();
        let base_url = config.effective_base_url().to_string();
        let client = Client::builder()
            .user_agent(config.effective_user_agent())
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");
        let cache = config.cache_config.as_ref().map(DocumentCache::new);

        Self {
            client,
            base_url,
            rate_limiter,
            config,
            cache,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn push_api_params(&self, url: &mut String) {
        for (key, value) in self.config.build_api_params() {
            url.push('&');
            url.push_str(&key);
            url.push('=');
            url.push_str(&urlencoding::encode(&value));
        }
    }

    async fn esearch(
        &self,
        database: Database,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<String>> {
        let mut url = format!(
            "{}/esearch.fcgi?db={}&term={}&retmax={}&retmode=json",
            self.base_url,
            database,
            urlencoding::encode(query),
            max_results
        );
        self.push_api_params(&mut url);

        let response = self.make_request(&url).await?;
        let search_result: ESearchResult = response.json().await?;

        if let Some(error_msg) = &search_result.esearchresult.error {
            return Err(CorpusError::ApiError {
                status: 200,
                message: format!("NCBI ESearch API error: {error_msg}"),
            });
        }

        let total = search_result.esearchresult.total_count();
        let ids = search_result.esearchresult.idlist;
        info!(
            total = ?total,
            returned = ids.len(),
            query_translation = ?search_result.esearchresult.querytranslation,
            "Search completed"
        );

        Ok(ids)
    }

    async fn efetch(&self, database: Database, ids: &[String]) -> Result<Vec<u8>> {
        let id_list = ids.join(",");
        let mut url = format!(
            "{}/efetch.fcgi?db={}&id={}&retmode=xml",
            self.base_url,
            database,
            urlencoding::encode(&id_list)
        );
        self.push_api_params(&mut url);

        let response = self.make_request(&url).await?;
        if !response.status().is_success() {
            return Err(CorpusError::ApiError {
                status: response.status().as_u16(),
                message: response
                    .status()
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string(),
            });
        }

        let body = response.bytes().await?.to_vec();
        if let Some(message) = ncbi_error_message(&body) {
            return Err(CorpusError::ApiError {
                status: 200,
                message: format!("NCBI EFetch API error: {message}"),
            });
        }

        Ok(body)
    }

    /// Internal helper method for making HTTP requests with retry logic
    async fn make_request(&self, url: &str) -> Result<Response> {
        with_retry(
            || async {
                self.rate_limiter.acquire().await;
                debug!("Making API request to: {url}");
                let response = self
                    .client
                    .get(url)
                    .send()
                    .await
                    .map_err(CorpusError::from)?;

                if response.status().as_u16() == 429 {
                    return Err(CorpusError::RateLimitExceeded);
                }
                // Server errors are retried
                if response.status().is_server_error() {
                    return Err(CorpusError::ApiError {
                        status: response.status().as_u16(),
                        message: response
                            .status()
                            .canonical_reason()
                            .unwrap_or("Unknown error")
                            .to_string(),
                    });
                }

                Ok(response)
            },
            &self.config.retry_config,
            "NCBI API request",
        )
        .await
    }
}

impl Default for NcbiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordSource for NcbiClient {
    #[instrument(skip(self), fields(database = %database))]
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

        self.esearch(database, query, max_results)
            .await
            .map_err(|e| CorpusError::SearchError {
                database: database.to_string(),
                query: query.to_string(),
                message: e.to_string(),
            })
    }

    #[instrument(skip(self, ids), fields(database = %database, ids = ids.len()))]
    async fn fetch(&self, database: Database, ids: &[String]) -> Result<Vec<u8>> {
        let id_list = ids.join(",");
        if ids.is_empty() {
            return Err(CorpusError::FetchError {
                id: id_list,
                message: "no identifiers to fetch".to_string(),
            });
        }

        let cache_key = document_key(database, ids);
        if let Some(cache) = &self.cache
            && let Some(cached) = cache.get(&cache_key).await
        {
            return Ok(cached);
        }

        let body = self
            .efetch(database, ids)
            .await
            .map_err(|e| CorpusError::FetchError {
                id: id_list.clone(),
                message: e.to_string(),
            })?;
        debug!(bytes = body.len(), "Fetched raw document");

        if let Some(cache) = &self.cache {
            cache.insert(cache_key, body.clone()).await;
        }
        Ok(body)
    }
}

/// Message of an `<ERROR>` element in an E-utilities reply, if present
fn ncbi_error_message(body: &[u8]) -> Option<String> {
    const OPEN: &[u8] = b"<ERROR>";
    const CLOSE: &[u8] = b"</ERROR>";

    // Error replies are tiny; only their head is inspected
    let head = &body[..body.len().min(1024)];
    let start = head.windows(OPEN.len()).position(|w| w == OPEN)? + OPEN.len();
    let rest = &head[start..];
    let end = rest
        .windows(CLOSE.len())
        .position(|w| w == CLOSE)
        .unwrap_or(rest.len());
    let message = String::from_utf8_lossy(&rest[..end]).trim().to_string();
    Some(if message.is_empty() {
        "Unknown error".to_string()
    } else {
        message
    })
}
