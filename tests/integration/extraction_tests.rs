//! Extraction of PubMed and PMC EFetch documents into flat records

mod common;

use common::{pmc_article, pmc_set, pubmed_article, pubmed_set};
use ncbi_corpus::{CorpusError, Database, Extractor, LiteratureRecord, PmcRecord, PubmedRecord};
use rstest::rstest;

fn extract_pubmed(xml: &str) -> Vec<PubmedRecord> {
    Extractor::for_database(Database::Pubmed)
        .extract(xml.as_bytes())
        .expect("PubMed document should parse")
        .into_iter()
        .map(|record| match record {
            LiteratureRecord::Pubmed(r) => r,
            other => panic!("expected a PubMed record, got {other:?}"),
        })
        .collect()
}

fn extract_pmc(xml: &str) -> Vec<PmcRecord> {
    Extractor::for_database(Database::Pmc)
        .extract(xml.as_bytes())
        .expect("PMC document should parse")
        .into_iter()
        .map(|record| match record {
            LiteratureRecord::Pmc(r) => r,
            other => panic!("expected a PMC record, got {other:?}"),
        })
        .collect()
}

#[test]
fn test_pubmed_set_yields_one_record_per_article() {
    let xml = pubmed_set(&[
        pubmed_article("100", "First title", "Ada", "Lovelace"),
        pubmed_article("200", "Second title", "Alan", "Turing"),
    ]);
    let records = extract_pubmed(&xml);

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].pubmed_id, "100");
    assert_eq!(records[0].authors, "Ada Lovelace");
    assert_eq!(records[1].title, "Second title");
    assert_eq!(records[1].pub_date, "2020-3-15");
    assert_eq!(records[1].journal, "Test J");
    // Nothing else is present in the fixture
    assert_eq!(records[1].doi, "");
    assert_eq!(records[1].r#abstract, "");
    assert!(records[1].mesh_descriptors.is_empty());
}

#[test]
fn test_pubmed_record_without_authors() {
    let xml = r#"<PubmedArticleSet><PubmedArticle><MedlineCitation>
        <Article><ArticleTitle>Anonymous</ArticleTitle><AuthorList/></Article>
    </MedlineCitation></PubmedArticle></PubmedArticleSet>"#;
    let records = extract_pubmed(xml);
    assert_eq!(records[0].authors, "");
    assert_eq!(records[0].affiliations, "");
    assert_eq!(records[0].pub_date, "1900-01-01");
}

#[test]
fn test_pubmed_author_pairing_survives_missing_forename() {
    let xml = r#"<PubmedArticleSet><PubmedArticle><MedlineCitation><Article><AuthorList>
        <Author><LastName>Wu</LastName><ForeName>Fan</ForeName></Author>
        <Author><LastName>Consortium</LastName></Author>
        <Author><LastName>Zhao</LastName><ForeName>Su</ForeName></Author>
    </AuthorList></Article></MedlineCitation></PubmedArticle></PubmedArticleSet>"#;
    let records = extract_pubmed(xml);
    assert_eq!(records[0].authors, "Fan Wu;Consortium;Su Zhao");
}

#[test]
fn test_pubmed_affiliations_are_cleaned_and_deduplicated() {
    let xml = r#"<PubmedArticleSet><PubmedArticle><MedlineCitation><Article><AuthorList>
        <Author><LastName>A</LastName><ForeName>B</ForeName>
            <AffiliationInfo><Affiliation>Dept of Biology, MIT, Cambridge, MA, USA. Electronic address: a@mit.edu.</Affiliation></AffiliationInfo>
        </Author>
        <Author><LastName>C</LastName><ForeName>D</ForeName>
            <AffiliationInfo><Affiliation>Broad Institute, Cambridge, MA, USA.</Affiliation></AffiliationInfo>
            <AffiliationInfo><Affiliation>Dept of Biology, MIT, Cambridge, MA, USA.</Affiliation></AffiliationInfo>
        </Author>
    </AuthorList></Article></MedlineCitation></PubmedArticle></PubmedArticleSet>"#;
    let records = extract_pubmed(xml);
    assert_eq!(
        records[0].affiliations,
        "Dept of Biology, MIT, Cambridge, MA, USA;Broad Institute, Cambridge, MA, USA"
    );
}

#[test]
fn test_pubmed_major_topic_mesh_terms() {
    let xml = r#"<PubmedArticleSet><PubmedArticle><MedlineCitation>
        <MeshHeadingList>
            <MeshHeading>
                <DescriptorName UI="D000086382" MajorTopicYN="Y">COVID-19</DescriptorName>
                <QualifierName UI="Q000175" MajorTopicYN="N">diagnosis</QualifierName>
            </MeshHeading>
            <MeshHeading>
                <DescriptorName UI="D006801" MajorTopicYN="N">Humans</DescriptorName>
            </MeshHeading>
            <MeshHeading>
                <DescriptorName UI="D017809" MajorTopicYN="N">Fatal Outcome</DescriptorName>
                <QualifierName UI="Q000401" MajorTopicYN="Y">mortality</QualifierName>
                <QualifierName UI="Q000453" MajorTopicYN="Y">epidemiology</QualifierName>
            </MeshHeading>
        </MeshHeadingList>
    </MedlineCitation></PubmedArticle></PubmedArticleSet>"#;
    let records = extract_pubmed(xml);

    assert_eq!(records[0].mesh_descriptors, vec!["COVID-19", "Fatal Outcome"]);
    assert_eq!(
        records[0].mesh_qualifiers,
        vec!["diagnosis", "mortality", "epidemiology"]
    );
}

#[rstest]
#[case("<Year>2021</Year><Month>11</Month><Day>3</Day>", "2021-11-3")]
#[case("<Year>2021</Year><Month>Nov</Month><Day>03</Day>", "2021-Nov-03")]
#[case("<Year>2021</Year><Month>11</Month>", "1900-01-01")]
#[case("", "1900-01-01")]
fn test_pubmed_entrez_date(#[case] parts: &str, #[case] expected: &str) {
    let xml = format!(
        r#"<PubmedArticleSet><PubmedArticle><PubmedData><History>
            <PubMedPubDate PubStatus="received"><Year>1999</Year><Month>1</Month><Day>1</Day></PubMedPubDate>
            <PubMedPubDate PubStatus="entrez">{parts}</PubMedPubDate>
        </History></PubmedData></PubmedArticle></PubmedArticleSet>"#
    );
    assert_eq!(extract_pubmed(&xml)[0].pub_date, expected);
}

#[test]
fn test_pmc_set_yields_one_record_per_article() {
    let xml = pmc_set(&[
        pmc_article("7906746", "Viral dynamics", "Jane", "Smith"),
        pmc_article("7092803", "Host response", "John", "Doe"),
    ]);
    let records = extract_pmc(&xml);

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].pmcid, "7906746");
    assert_eq!(records[0].authors, "Jane Smith");
    assert_eq!(records[0].pub_date, "2020-03-15");
    assert_eq!(records[1].full_text, "Body of 7092803.");
    assert_eq!(records[1].journal, "Test J");
    assert_eq!(records[1].pubmed_id, "");
    assert!(records[1].pmc_keywords.is_empty());
}

#[test]
fn test_pmc_sparse_article_has_empty_fields() {
    let records = extract_pmc(
        r#"<pmc-articleset><article><front><article-meta>
            <title-group><article-title>Only a title</article-title></title-group>
        </article-meta></front></article></pmc-articleset>"#,
    );
    assert_eq!(
        records[0],
        PmcRecord {
            title: "Only a title".to_string(),
            ..Default::default()
        }
    );
}

#[test]
fn test_pmc_nested_abstract_and_keywords() {
    let records = extract_pmc(
        r#"<pmc-articleset><article><front><article-meta>
            <abstract>
                <sec><title>Background</title><p>Some <italic>context</italic>.</p></sec>
                <sec><title>Results</title><p>Findings.</p></sec>
            </abstract>
            <kwd-group kwd-group-type="author"><kwd>alpha</kwd><kwd> beta </kwd></kwd-group>
        </article-meta></front></article></pmc-articleset>"#,
    );
    assert_eq!(
        records[0].r#abstract,
        "BackgroundSome context.ResultsFindings."
    );
    assert_eq!(records[0].pmc_keywords, vec!["alpha", "beta"]);
}

#[test]
fn test_document_that_is_not_xml() {
    let err = Extractor::for_database(Database::Pubmed)
        .extract(b"Service temporarily unavailable")
        .unwrap_err();
    assert!(matches!(err, CorpusError::XmlError(_)));

    let parse_error = err.with_identifier("100");
    assert!(parse_error.to_string().contains("100"));
}
