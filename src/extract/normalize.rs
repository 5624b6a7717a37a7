//! Normalization passes applied to raw extracted text

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::record::SENTINEL_PUB_DATE;

/// Pair given names with surnames, one `"Given Surname"` per author, `;`-joined
///
/// Each item is the (given name, surname) of one author container element,
/// so an author missing one part cannot shift the pairing of later authors.
/// A lone part is kept on its own; an author with neither is dropped.
pub fn join_author_names<I>(authors: I) -> String
where
    I: IntoIterator<Item = (Option<String>, Option<String>)>,
{
    authors
        .into_iter()
        .filter_map(|(given, surname)| match (given, surname) {
            (Some(g), Some(s)) => Some(format!("{g} {s}")),
            (Some(only), None) | (None, Some(only)) => Some(only),
            (None, None) => None,
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// Remove a trailing "Electronic address ..." clause and surrounding punctuation
pub fn clean_affiliation(affiliation: &str) -> String {
    static EMAIL_CLAUSE: OnceLock<Regex> = OnceLock::new();
    let re = EMAIL_CLAUSE.get_or_init(|| {
        Regex::new(r"(?i)electronic address.*\.").expect("Failed to compile email clause regex")
    });

    re.replace_all(affiliation, "")
        .trim_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace())
        .to_string()
}

/// Clean every affiliation, drop blanks and duplicates (first occurrence wins),
/// and join with `;`
pub fn join_affiliations<I, S>(affiliations: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    affiliations
        .into_iter()
        .map(|a| clean_affiliation(a.as_ref()))
        .filter(|a| !a.is_empty() && seen.insert(a.clone()))
        .collect::<Vec<_>>()
        .join(";")
}

/// Assemble a PubMed date from year, month, and day
///
/// Any missing component invalidates the whole date, which then falls back to
/// [`SENTINEL_PUB_DATE`].
pub fn pubmed_date(year: Option<String>, month: Option<String>, day: Option<String>) -> String {
    match (year, month, day) {
        (Some(y), Some(m), Some(d)) => format!("{y}-{m}-{d}"),
        _ => SENTINEL_PUB_DATE.to_string(),
    }
}

/// Assemble a PMC date from components in declared order (day, month, year)
///
/// Components are reversed and joined with `-`; blanks are skipped and no
/// fallback is applied.
pub fn pmc_date<I, S>(declared: I) -> String
where
    I: IntoIterator<Item = S>,
    I::IntoIter: DoubleEndedIterator,
    S: AsRef<str>,
{
    declared
        .into_iter()
        .rev()
        .map(|part| part.as_ref().trim().to_string())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Trim each item and drop blanks
pub fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}
