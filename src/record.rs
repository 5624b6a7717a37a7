//! Flat literature records
//!
//! One [`LiteratureRecord`] is produced per record element of a raw document.
//! Fields are never optional: anything missing in the source is an empty
//! string or an empty list.

use serde::{Deserialize, Serialize};

use crate::database::Database;

/// Placeholder publication date for PubMed records without an entrez date
pub const SENTINEL_PUB_DATE: &str = "1900-01-01";

/// A single field value as seen by the corpus schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

/// Record extracted from a PubMed `PubmedArticle` element
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubmedRecord {
    pub pubmed_id: String,
    pub title: String,
    /// `"Given Surname"` pairs joined with `;`
    pub authors: String,
    /// Cleaned, de-duplicated affiliations joined with `;`
    pub affiliations: String,
    /// `year-month-day` of the entrez date, or [`SENTINEL_PUB_DATE`]
    pub pub_date: String,
    pub r#abstract: String,
    pub doi: String,
    pub pmcid: String,
    /// ISO journal abbreviation
    pub journal: String,
    /// Publication types joined with `,`
    pub pubmed_class: String,
    pub pubmed_keywords: Vec<String>,
    /// Descriptor names of headings flagged as major topics
    pub mesh_descriptors: Vec<String>,
    /// Qualifier names of headings flagged as major topics
    pub mesh_qualifiers: Vec<String>,
}

/// Record extracted from a PMC `article` element
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PmcRecord {
    pub pmcid: String,
    pub title: String,
    pub authors: String,
    pub affiliations: String,
    /// Electronic publication date, `year-month-day` when all parts exist; may be empty
    pub pub_date: String,
    pub pubmed_id: String,
    pub doi: String,
    pub r#abstract: String,
    pub full_text: String,
    pub journal: String,
    /// Article category subjects joined with `,`
    pub pmcclass: String,
    pub pmc_keywords: Vec<String>,
}

/// Normalized record of either family
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "lowercase")]
pub enum LiteratureRecord {
    Pubmed(PubmedRecord),
    Pmc(PmcRecord),
}

impl LiteratureRecord {
    pub fn database(&self) -> Database {
        match self {
            LiteratureRecord::Pubmed(_) => Database::Pubmed,
            LiteratureRecord::Pmc(_) => Database::Pmc,
        }
    }

    /// Family-specific primary identifier (PMID or PMCID)
    pub fn id(&self) -> &str {
        match self {
            LiteratureRecord::Pubmed(r) => &r.pubmed_id,
            LiteratureRecord::Pmc(r) => &r.pmcid,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            LiteratureRecord::Pubmed(r) => &r.title,
            LiteratureRecord::Pmc(r) => &r.title,
        }
    }

    pub fn pub_date(&self) -> &str {
        match self {
            LiteratureRecord::Pubmed(r) => &r.pub_date,
            LiteratureRecord::Pmc(r) => &r.pub_date,
        }
    }

    /// Value of a schema column; `None` for columns this family does not have
    pub fn field(&self, column: &str) -> Option<FieldValue> {
        match self {
            LiteratureRecord::Pubmed(r) => r.field(column),
            LiteratureRecord::Pmc(r) => r.field(column),
        }
    }
}

impl PubmedRecord {
    pub fn field(&self, column: &str) -> Option<FieldValue> {
        let text = |s: &String| Some(FieldValue::Text(s.clone()));
        let list = |v: &Vec<String>| Some(FieldValue::List(v.clone()));
        match column {
            "pubmed_id" => text(&self.pubmed_id),
            "title" => text(&self.title),
            "authors" => text(&self.authors),
            "affiliations" => text(&self.affiliations),
            "pub_date" => text(&self.pub_date),
            "abstract" => text(&self.r#abstract),
            "doi" => text(&self.doi),
            "pmcid" => text(&self.pmcid),
            "journal" => text(&self.journal),
            "pubmed_class" => text(&self.pubmed_class),
            "pubmed_keywords" => list(&self.pubmed_keywords),
            "mesh_descriptors" => list(&self.mesh_descriptors),
            "mesh_qualifiers" => list(&self.mesh_qualifiers),
            _ => None,
        }
    }
}

impl PmcRecord {
    pub fn field(&self, column: &str) -> Option<FieldValue> {
        let text = |s: &String| Some(FieldValue::Text(s.clone()));
        match column {
            "pmcid" => text(&self.pmcid),
            "title" => text(&self.title),
            "authors" => text(&self.authors),
            "affiliations" => text(&self.affiliations),
            "pub_date" => text(&self.pub_date),
            "pubmed_id" => text(&self.pubmed_id),
            "doi" => text(&self.doi),
            "abstract" => text(&self.r#abstract),
            "full_text" => text(&self.full_text),
            "journal" => text(&self.journal),
            "pmcclass" => text(&self.pmcclass),
            "pmc_keywords" => Some(FieldValue::List(self.pmc_keywords.clone())),
            _ => None,
        }
    }
}
