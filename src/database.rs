//! Record family selector
//!
//! Choosing a [`Database`] fixes the E-utilities `db` parameter, the extraction
//! rule set, and the output column schema for a whole run.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CorpusError;

/// Output columns for PubMed records, in corpus order
pub const PUBMED_COLUMNS: [&str; 13] = [
    "pubmed_id",
    "title",
    "authors",
    "affiliations",
    "pub_date",
    "abstract",
    "doi",
    "pmcid",
    "journal",
    "pubmed_class",
    "pubmed_keywords",
    "mesh_descriptors",
    "mesh_qualifiers",
];

/// Output columns for PMC records, in corpus order
pub const PMC_COLUMNS: [&str; 12] = [
    "pmcid",
    "title",
    "authors",
    "affiliations",
    "pub_date",
    "pubmed_id",
    "doi",
    "abstract",
    "full_text",
    "journal",
    "pmcclass",
    "pmc_keywords",
];

/// Literature database family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    /// PubMed citations (`PubmedArticleSet` documents)
    Pubmed,
    /// PubMed Central full-text articles (`pmc-articleset` documents)
    Pmc,
}

impl Database {
    /// Value of the E-utilities `db` parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            Database::Pubmed => "pubmed",
            Database::Pmc => "pmc",
        }
    }

    /// Declared column order for this family
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Database::Pubmed => &PUBMED_COLUMNS,
            Database::Pmc => &PMC_COLUMNS,
        }
    }
}

impl fmt::Display for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Database {
    type Err = CorpusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pubmed" => Ok(Database::Pubmed),
            "pmc" => Ok(Database::Pmc),
            other => Err(CorpusError::UnknownDatabase(other.to_string())),
        }
    }
}
