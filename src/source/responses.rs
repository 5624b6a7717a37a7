use serde::{Deserialize, Serialize};

/// ESearch JSON response (`retmode=json`)
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ESearchResult {
    pub esearchresult: ESearchData,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ESearchData {
    /// NCBI reports query errors with a 200 status and this field set
    #[serde(default, rename = "ERROR")]
    pub error: Option<String>,
    #[serde(default)]
    pub count: Option<String>,
    #[serde(default)]
    pub retmax: Option<String>,
    #[serde(default)]
    pub idlist: Vec<String>,
    #[serde(default)]
    pub querytranslation: Option<String>,
}

impl ESearchData {
    /// Total number of matches reported by NCBI, independent of `retmax`
    pub fn total_count(&self) -> Option<usize> {
        self.count.as_deref().and_then(|c| c.parse().ok())
    }
}
