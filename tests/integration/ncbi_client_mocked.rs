//! NCBI E-utilities client against a mocked server
//!
//! These tests exercise request building, error mapping, retries, caching, and
//! a complete harvest without making real API calls.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{ids, pmc_article, pmc_set, pubmed_article, pubmed_set};
use ncbi_corpus::{
    CacheConfig, Cell, ClientConfig, CorpusError, Database, Harvester, NcbiClient, RecordSource,
    RetryConfig, RunConfig,
};
use tracing_test::traced_test;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ESEARCH_RESPONSE: &str = r#"{
    "header": {"type": "esearch", "version": "0.3"},
    "esearchresult": {
        "count": "2",
        "retmax": "2",
        "retstart": "0",
        "idlist": ["31978945", "33515491"],
        "translationset": [],
        "querytranslation": "\"coronavirus\"[MeSH Terms]"
    }
}"#;

/// Helper to create a client pointing at a mock server
fn create_mock_client(mock_server: &MockServer) -> NcbiClient {
    let config = ClientConfig::new()
        .with_base_url(mock_server.uri())
        .with_rate_limit(100.0) // High rate limit for tests
        .with_retry_config(
            RetryConfig::new()
                .with_max_retries(2)
                .with_initial_delay(Duration::from_millis(10))
                .without_jitter(),
        );

    NcbiClient::with_config(config)
}

#[tokio::test]
#[traced_test]
async fn test_search_returns_identifiers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .and(query_param("db", "pubmed"))
        .and(query_param("term", "coronavirus"))
        .and(query_param("retmax", "20"))
        .and(query_param("retmode", "json"))
        .and(query_param("tool", "ncbi-corpus"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ESEARCH_RESPONSE))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);
    let pmids = client
        .search(Database::Pubmed, "coronavirus", 20)
        .await
        .expect("search should succeed");

    assert_eq!(pmids, vec!["31978945", "33515491"]);
}

#[tokio::test]
#[traced_test]
async fn test_search_api_error_is_search_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"esearchresult": {"ERROR": "Invalid query syntax"}}"#),
        )
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);
    let err = client
        .search(Database::Pmc, "((broken", 10)
        .await
        .unwrap_err();

    match err {
        CorpusError::SearchError {
            database,
            query,
            message,
        } => {
            assert_eq!(database, "pmc");
            assert_eq!(query, "((broken");
            assert!(message.contains("Invalid query syntax"));
        }
        other => panic!("expected SearchError, got {other:?}"),
    }
}

#[tokio::test]
#[traced_test]
async fn test_fetch_sends_identifier_group_and_api_params() {
    let mock_server = MockServer::start().await;
    let body = pubmed_set(&[
        pubmed_article("100", "One", "A", "B"),
        pubmed_article("200", "Two", "C", "D"),
    ]);

    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .and(query_param("db", "pubmed"))
        .and(query_param("id", "100,200"))
        .and(query_param("retmode", "xml"))
        .and(query_param("api_key", "secret"))
        .and(query_param("email", "me@example.org"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body.clone())
                .insert_header("content-type", "application/xml"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = ClientConfig::new()
        .with_base_url(mock_server.uri())
        .with_rate_limit(100.0)
        .with_api_key("secret")
        .with_email("me@example.org");
    let client = NcbiClient::with_config(config);

    let raw = client
        .fetch(Database::Pubmed, &ids(&["100", "200"]))
        .await
        .expect("fetch should succeed");
    assert_eq!(raw, body.into_bytes());
}

#[tokio::test]
#[traced_test]
async fn test_fetch_retries_server_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string(pmc_set(&[])))
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);
    let raw = client
        .fetch(Database::Pmc, &ids(&["7906746"]))
        .await
        .expect("fetch should succeed after a retry");

    assert!(String::from_utf8(raw).unwrap().contains("pmc-articleset"));
    let received = mock_server.received_requests().await.unwrap();
    assert_eq!(received.len(), 2);
}

#[tokio::test]
#[traced_test]
async fn test_fetch_gives_up_after_max_retries() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);
    let err = client
        .fetch(Database::Pubmed, &ids(&["100"]))
        .await
        .unwrap_err();

    match err {
        CorpusError::FetchError { id, message } => {
            assert_eq!(id, "100");
            assert!(message.contains("500"));
        }
        other => panic!("expected FetchError, got {other:?}"),
    }
    // Initial attempt plus two retries
    let received = mock_server.received_requests().await.unwrap();
    assert_eq!(received.len(), 3);
}

#[tokio::test]
#[traced_test]
async fn test_fetch_client_error_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);
    let err = client
        .fetch(Database::Pubmed, &ids(&["abc"]))
        .await
        .unwrap_err();

    assert!(matches!(err, CorpusError::FetchError { ref id, .. } if id == "abc"));
    let received = mock_server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
}

#[tokio::test]
#[traced_test]
async fn test_fetch_ncbi_error_document() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<?xml version=\"1.0\" ?>\n<eFetchResult>\n\t<ERROR>Cannot retrieve history data.</ERROR>\n</eFetchResult>",
        ))
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);
    let err = client
        .fetch(Database::Pubmed, &ids(&["1"]))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("Cannot retrieve history data."));
}

#[tokio::test]
#[traced_test]
async fn test_cached_fetch_skips_second_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string(pmc_set(&[pmc_article(
            "1", "Cached", "A", "B",
        )])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = ClientConfig::new()
        .with_base_url(mock_server.uri())
        .with_rate_limit(100.0)
        .with_cache(CacheConfig::default());
    let client = NcbiClient::with_config(config);

    let first = client.fetch(Database::Pmc, &ids(&["PMC1"])).await.unwrap();
    let second = client.fetch(Database::Pmc, &ids(&["PMC1"])).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
#[traced_test]
async fn test_harvest_over_mocked_eutils() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .and(query_param("db", "pubmed"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ESEARCH_RESPONSE))
        .mount(&mock_server)
        .await;

    for (pmid, title) in [("31978945", "Novel coronavirus"), ("33515491", "Vaccine trial")] {
        Mock::given(method("GET"))
            .and(path("/efetch.fcgi"))
            .and(query_param("id", pmid))
            .respond_with(ResponseTemplate::new(200).set_body_string(pubmed_set(&[
                pubmed_article(pmid, title, "Given", "Surname"),
            ])))
            .mount(&mock_server)
            .await;
    }

    let client = create_mock_client(&mock_server);
    let harvester = Harvester::new(
        Arc::new(client),
        RunConfig::new(Database::Pubmed).with_workers(2),
    )
    .unwrap();

    let harvest = harvester.harvest("coronavirus", 100).await.unwrap();
    let corpus = &harvest.corpus;

    assert_eq!(corpus.len(), 2);
    assert_eq!(
        corpus.get(0, "title").and_then(Cell::as_text),
        Some("Novel coronavirus")
    );
    assert_eq!(
        corpus.get(1, "pubmed_id").and_then(Cell::as_text),
        Some("33515491")
    );
    assert!(harvest.failures.is_empty());
}

#[tokio::test]
#[traced_test]
async fn test_default_workers_share_ncbi_rate_limit() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string(pubmed_set(&[
            pubmed_article("1", "Throttled", "A", "B"),
        ])))
        .expect(12)
        .mount(&mock_server)
        .await;

    // 3 requests/second without an API key, shared by all 12 workers
    let config = ClientConfig::new()
        .with_base_url(mock_server.uri())
        .with_retry_config(RetryConfig::no_retry());
    let client = NcbiClient::with_config(config);
    let harvester = Harvester::new(Arc::new(client), RunConfig::new(Database::Pubmed)).unwrap();

    let pmids: Vec<String> = (1..=12).map(|i| i.to_string()).collect();
    let harvest = harvester
        .harvest_ids(&pmids)
        .await
        .expect("throttling must delay requests, not fail them");

    assert_eq!(harvest.corpus.len(), 12);
    assert!(harvest.failures.is_empty());
}

#[tokio::test]
#[traced_test]
async fn test_too_many_requests_is_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string(pubmed_set(&[])))
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);
    client
        .fetch(Database::Pubmed, &ids(&["1"]))
        .await
        .expect("fetch should succeed after a 429");

    assert!(logs_contain("Rate limit exceeded"));
    let received = mock_server.received_requests().await.unwrap();
    assert_eq!(received.len(), 2);
}
