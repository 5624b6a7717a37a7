//! Corpus assembly
//!
//! Per-chunk record lists are concatenated in partition order, projected onto
//! the column schema of the active family, and given a dense row index. The
//! `pub_date` column is coerced to a real date on the way.

use std::io::Write;

use chrono::NaiveDate;
use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::{debug, info, instrument};

use crate::batch::ChunkOutput;
use crate::database::Database;
use crate::error::{CorpusError, Result};
use crate::record::{FieldValue, LiteratureRecord};

/// Column holding the publication date
pub const DATE_COLUMN: &str = "pub_date";

/// Ordered output columns for one record family
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    database: Database,
    columns: Vec<String>,
}

impl Schema {
    /// Fixed column order of `database`
    pub fn for_database(database: Database) -> Self {
        Self::with_columns(database, database.columns().iter().copied())
    }

    /// Custom projection; columns the family lacks come out empty
    pub fn with_columns<I, S>(database: Database, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            database,
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn database(&self) -> Database {
        self.database
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

impl From<Database> for Schema {
    fn from(database: Database) -> Self {
        Schema::for_database(database)
    }
}

/// One corpus value
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    List(Vec<String>),
    /// `None` when the record had no date at all
    Date(Option<NaiveDate>),
}

impl Cell {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Cell::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::Date(date) => *date,
            _ => None,
        }
    }
}

impl From<FieldValue> for Cell {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Text(text) => Cell::Text(text),
            FieldValue::List(items) => Cell::List(items),
        }
    }
}

/// A projected record with its row index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusRow {
    pub index: usize,
    /// One cell per schema column, in schema order
    pub cells: Vec<Cell>,
}

/// The assembled table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Corpus {
    database: Database,
    columns: Vec<String>,
    rows: Vec<CorpusRow>,
}

impl Corpus {
    pub fn database(&self) -> Database {
        self.database
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[CorpusRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Cell at `row` in `column`
    pub fn get(&self, row: usize, column: &str) -> Option<&Cell> {
        let col = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.cells.get(col))
    }

    /// Every cell of `column`, in row order; empty for unknown columns
    pub fn column(&self, column: &str) -> Vec<&Cell> {
        match self.column_index(column) {
            Some(col) => self.rows.iter().filter_map(|r| r.cells.get(col)).collect(),
            None => Vec::new(),
        }
    }

    /// Write one JSON object per row: `index` followed by the schema columns
    ///
    /// Dates are written as `YYYY-MM-DD`, missing dates as `null`.
    pub fn write_json_lines<W: Write>(&self, mut writer: W) -> Result<()> {
        for row in &self.rows {
            let line = serde_json::to_string(&RowView {
                columns: &self.columns,
                row,
            })?;
            writeln!(writer, "{line}")?;
        }
        writer.flush()?;
        Ok(())
    }
}

struct RowView<'a> {
    columns: &'a [String],
    row: &'a CorpusRow,
}

impl Serialize for RowView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len() + 1))?;
        map.serialize_entry("index", &self.row.index)?;
        for (column, cell) in self.columns.iter().zip(&self.row.cells) {
            map.serialize_entry(column, cell)?;
        }
        map.end()
    }
}

/// Concatenate chunk results into one corpus
///
/// Chunks are ordered by partition index, not by the order they are given in,
/// so the row order matches the identifier order of the run.
///
/// # Errors
///
/// Returns [`CorpusError::DateCoercionError`] for the first non-empty
/// `pub_date` that is not a date. One bad date invalidates the whole corpus.
///
/// # Example
///
/// ```
/// use ncbi_corpus::batch::ChunkOutput;
/// use ncbi_corpus::corpus::{Schema, assemble};
/// use ncbi_corpus::{Database, LiteratureRecord, PubmedRecord};
///
/// let record = |id: &str| LiteratureRecord::Pubmed(PubmedRecord {
///     pubmed_id: id.to_string(),
///     pub_date: "2020-1-25".to_string(),
///     ..Default::default()
/// });
/// let chunk = |index: usize, ids: &[&str]| ChunkOutput {
///     index,
///     identifiers: ids.iter().map(|s| s.to_string()).collect(),
///     records: ids.iter().map(|id| record(id)).collect(),
///     raw: None,
/// };
///
/// let corpus = assemble(
///     vec![chunk(1, &["3"]), chunk(0, &["1", "2"])],
///     &Schema::for_database(Database::Pubmed),
/// )?;
///
/// let ids: Vec<_> = corpus.column("pubmed_id").iter().map(|c| c.as_text().unwrap()).collect();
/// assert_eq!(ids, vec!["1", "2", "3"]);
/// assert_eq!(corpus.rows()[2].index, 2);
/// # Ok::<(), ncbi_corpus::CorpusError>(())
/// ```
#[instrument(skip_all, fields(database = %schema.database(), chunks = chunks.len()))]
pub fn assemble(mut chunks: Vec<ChunkOutput>, schema: &Schema) -> Result<Corpus> {
    chunks.sort_by_key(|chunk| chunk.index);

    let records = chunks.into_iter().flat_map(|chunk| chunk.records);
    let mut rows = Vec::new();
    for (index, record) in records.enumerate() {
        if record.database() != schema.database() {
            debug!(row = index, family = %record.database(), "Record family differs from schema");
        }
        rows.push(CorpusRow {
            index,
            cells: project(&record, schema.columns(), index)?,
        });
    }

    info!(rows = rows.len(), "Corpus assembled");
    Ok(Corpus {
        database: schema.database(),
        columns: schema.columns().to_vec(),
        rows,
    })
}

fn project(record: &LiteratureRecord, columns: &[String], row: usize) -> Result<Vec<Cell>> {
    columns
        .iter()
        .map(|column| {
            let value = record.field(column);
            if column == DATE_COLUMN {
                let text = match &value {
                    Some(FieldValue::Text(text)) => text.as_str(),
                    _ => "",
                };
                return coerce_date(text, row).map(Cell::Date);
            }
            Ok(value.map(Cell::from).unwrap_or_else(|| Cell::Text(String::new())))
        })
        .collect()
}

fn coerce_date(value: &str, row: usize) -> Result<Option<NaiveDate>> {
    if value.trim().is_empty() {
        return Ok(None);
    }
    parse_pub_date(value)
        .map(Some)
        .ok_or_else(|| CorpusError::DateCoercionError {
            row,
            value: value.to_string(),
        })
}

/// Parse an extracted publication date
///
/// Accepts `year`, `year-month`, and `year-month-day` joined with `-`, with
/// or without zero padding. Months may also be English names or three-letter
/// abbreviations. Missing month or day defaults to the first.
///
/// ```
/// use chrono::NaiveDate;
/// use ncbi_corpus::corpus::parse_pub_date;
///
/// assert_eq!(parse_pub_date("2020-1-5"), NaiveDate::from_ymd_opt(2020, 1, 5));
/// assert_eq!(parse_pub_date("2019-Mar"), NaiveDate::from_ymd_opt(2019, 3, 1));
/// assert_eq!(parse_pub_date("2020-02-30"), None);
/// ```
pub fn parse_pub_date(value: &str) -> Option<NaiveDate> {
    let mut parts = value.trim().split('-').map(str::trim);

    let year: i32 = parse_number(parts.next()?)?;
    let month = match parts.next() {
        Some(month) => parse_month(month)?,
        None => 1,
    };
    let day: u32 = match parts.next() {
        Some(day) => parse_number(day)?,
        None => 1,
    };
    if parts.next().is_some() {
        return None;
    }

    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_number<T: std::str::FromStr>(part: &str) -> Option<T> {
    if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

fn parse_month(part: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "january",
        "february",
        "march",
        "april",
        "may",
        "june",
        "july",
        "august",
        "september",
        "october",
        "november",
        "december",
    ];

    if let Some(number) = parse_number(part) {
        return Some(number);
    }
    let lower = part.to_ascii_lowercase();
    if lower.len() < 3 {
        return None;
    }
    MONTHS
        .iter()
        .position(|name| *name == lower || name.get(..3) == Some(lower.as_str()))
        .map(|i| i as u32 + 1)
}
