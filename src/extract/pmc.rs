//! Field rules for PMC EFetch documents (JATS `pmc-articleset`)

use std::sync::LazyLock;

use super::normalize::{clean_list, join_author_names, pmc_date};
use crate::record::PmcRecord;
use crate::xml::{Document, NodeId, Path};

struct PmcRules {
    title: Path,
    author: Path,
    given_names: Path,
    surname: Path,
    affiliation: Path,
    epub_date_parts: Path,
    electronic_date_parts: Path,
    pubmed_id: Path,
    doi: Path,
    pmcid: Path,
    pmcid_fallback: Path,
    abstract_text: Path,
    body_text: Path,
    journal: Path,
    subjects: Path,
    keywords: Path,
}

fn rule(expression: &str) -> Path {
    Path::parse(expression).expect("Failed to compile PMC field rule")
}

static RULES: LazyLock<PmcRules> = LazyLock::new(|| PmcRules {
    title: rule(".//article-meta//article-title/text()"),
    author: rule(r#".//*[@contrib-type="author"]"#),
    given_names: rule("name/given-names"),
    surname: rule("name/surname"),
    affiliation: rule(".//aff/text()"),
    epub_date_parts: rule(r#".//article-meta/pub-date[@pub-type="epub"]/*"#),
    electronic_date_parts: rule(
        r#".//article-meta/pub-date[@date-type="pub"][@publication-format="electronic"]/*"#,
    ),
    pubmed_id: rule(r#".//article-meta/article-id[@pub-id-type="pmid"]/text()"#),
    doi: rule(r#".//article-meta/article-id[@pub-id-type="doi"]/text()"#),
    pmcid: rule(r#".//article-meta/article-id[@pub-id-type="pmc"]/text()"#),
    pmcid_fallback: rule(r#".//article-meta/article-id[@pub-id-type="pmcid"]/text()"#),
    abstract_text: rule(".//abstract//*/text()"),
    body_text: rule(".//body//*/text()"),
    journal: rule(r#".//journal-meta/journal-id[@journal-id-type="iso-abbrev"]/text()"#),
    subjects: rule(".//article-meta/article-categories//subject/text()"),
    keywords: rule(".//kwd/text()"),
});

/// Extract one record from an `article` element
pub(crate) fn extract_record(doc: &Document, article: NodeId) -> PmcRecord {
    let rules = &*RULES;
    let joined = |path: &Path| doc.joined(article, path, "").trim().to_string();

    let authors = join_author_names(doc.select(article, &rules.author).into_iter().map(
        |contrib| {
            (
                doc.first_text(contrib, &rules.given_names),
                doc.first_text(contrib, &rules.surname),
            )
        },
    ));

    // Labels and punctuation between <aff> children leave blank text nodes
    let affiliations = clean_list(doc.texts(article, &rules.affiliation)).join(";");

    let mut date_parts = doc.texts(article, &rules.epub_date_parts);
    if date_parts.is_empty() {
        date_parts = doc.texts(article, &rules.electronic_date_parts);
    }

    let mut pmcid = joined(&rules.pmcid);
    if pmcid.is_empty() {
        pmcid = joined(&rules.pmcid_fallback);
    }

    PmcRecord {
        pmcid,
        title: joined(&rules.title),
        authors,
        affiliations,
        pub_date: pmc_date(date_parts),
        pubmed_id: joined(&rules.pubmed_id),
        doi: joined(&rules.doi),
        r#abstract: joined(&rules.abstract_text),
        full_text: joined(&rules.body_text),
        journal: joined(&rules.journal),
        pmcclass: clean_list(doc.texts(article, &rules.subjects)).join(","),
        pmc_keywords: clean_list(doc.texts(article, &rules.keywords)),
    }
}
