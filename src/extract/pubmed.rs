//! Field rules for PubMed EFetch documents (`PubmedArticleSet`)

use std::sync::LazyLock;

use super::normalize::{clean_list, join_affiliations, join_author_names, pubmed_date};
use crate::record::PubmedRecord;
use crate::xml::{Document, NodeId, Path};

struct PubmedRules {
    author: Path,
    fore_name: Path,
    last_name: Path,
    affiliation: Path,
    entrez_year: Path,
    entrez_month: Path,
    entrez_day: Path,
    pubmed_id: Path,
    doi: Path,
    pmcid: Path,
    title: Path,
    abstract_text: Path,
    journal: Path,
    publication_type: Path,
    keywords: Path,
    mesh_descriptors: Path,
    mesh_qualifiers: Path,
}

fn rule(expression: &str) -> Path {
    Path::parse(expression).expect("Failed to compile PubMed field rule")
}

static RULES: LazyLock<PubmedRules> = LazyLock::new(|| PubmedRules {
    author: rule(".//Author"),
    fore_name: rule("ForeName"),
    last_name: rule("LastName"),
    affiliation: rule(".//Affiliation"),
    entrez_year: rule(r#".//PubMedPubDate[@PubStatus="entrez"]/Year"#),
    entrez_month: rule(r#".//PubMedPubDate[@PubStatus="entrez"]/Month"#),
    entrez_day: rule(r#".//PubMedPubDate[@PubStatus="entrez"]/Day"#),
    pubmed_id: rule(r#".//PubmedData/ArticleIdList/ArticleId[@IdType="pubmed"]/text()"#),
    doi: rule(r#".//PubmedData/ArticleIdList/ArticleId[@IdType="doi"]/text()"#),
    pmcid: rule(r#".//PubmedData/ArticleIdList/ArticleId[@IdType="pmc"]/text()"#),
    title: rule(".//ArticleTitle/text()"),
    abstract_text: rule(".//AbstractText"),
    journal: rule(".//Journal/ISOAbbreviation/text()"),
    publication_type: rule(".//PublicationType/text()"),
    keywords: rule("MedlineCitation/KeywordList/*/text()"),
    mesh_descriptors: rule(
        r#"MedlineCitation/MeshHeadingList/MeshHeading/*[@MajorTopicYN="Y"]/../DescriptorName/text()"#,
    ),
    mesh_qualifiers: rule(
        r#"MedlineCitation/MeshHeadingList/MeshHeading/*[@MajorTopicYN="Y"]/../QualifierName/text()"#,
    ),
});

/// Extract one record from a `PubmedArticle` (or any other top-level) element
pub(crate) fn extract_record(doc: &Document, article: NodeId) -> PubmedRecord {
    let rules = &*RULES;

    let authors = join_author_names(doc.select(article, &rules.author).into_iter().map(
        |author| {
            (
                doc.first_text(author, &rules.fore_name),
                doc.first_text(author, &rules.last_name),
            )
        },
    ));

    let affiliations = join_affiliations(doc.texts(article, &rules.affiliation));

    let pub_date = pubmed_date(
        doc.first_text(article, &rules.entrez_year),
        doc.first_text(article, &rules.entrez_month),
        doc.first_text(article, &rules.entrez_day),
    );

    // Structured abstracts carry one AbstractText per section
    let abstract_text = clean_list(doc.texts(article, &rules.abstract_text)).join(" ");

    PubmedRecord {
        pubmed_id: doc.joined(article, &rules.pubmed_id, "").trim().to_string(),
        title: doc.joined(article, &rules.title, "").trim().to_string(),
        authors,
        affiliations,
        pub_date,
        r#abstract: abstract_text,
        doi: doc.joined(article, &rules.doi, "").trim().to_string(),
        pmcid: doc.joined(article, &rules.pmcid, "").trim().to_string(),
        journal: doc.joined(article, &rules.journal, "").trim().to_string(),
        pubmed_class: clean_list(doc.texts(article, &rules.publication_type)).join(","),
        pubmed_keywords: clean_list(doc.texts(article, &rules.keywords)),
        mesh_descriptors: clean_list(doc.texts(article, &rules.mesh_descriptors)),
        mesh_qualifiers: clean_list(doc.texts(article, &rules.mesh_qualifiers)),
    }
}
