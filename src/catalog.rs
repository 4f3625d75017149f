//! The biosample term catalog.
//!
//! The archive describes each biosample type with a classification (e.g.,
//! `cell line` or `tissue`), a display name, and a list of so-called "cell
//! slims": coarse category labels used for faceted grouping. This module
//! turns those raw records into [`Term`]s suitable for building a
//! [hierarchy](crate::hierarchy).

use std::collections::BTreeSet;
use std::io::Read;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// The classifications that are permitted within the catalog.
///
/// Records with an empty classification are always permitted.
pub const ALLOWED_CLASSIFICATIONS: &[&str] = &[
    "primary cell",
    "in vitro differentiated cells",
    "cell line",
    "cell",
];

/// An error related to reading a catalog.
#[derive(Debug)]
pub enum Error {
    /// The catalog payload could not be decoded.
    Json(serde_json::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Json(err) => write!(f, "invalid catalog payload: {err}"),
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// A raw biosample type record as returned by the archive.
///
/// Every field is tolerated as missing (or `null`).
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Record {
    /// The display name of the term.
    #[serde(default)]
    term_name: Option<String>,

    /// The classification of the term.
    #[serde(default)]
    classification: Option<String>,

    /// The cell slims the term belongs to.
    #[serde(default)]
    cell_slims: Option<Vec<Value>>,
}

impl Record {
    /// Creates a new record.
    ///
    /// # Examples
    ///
    /// ```
    /// use encodelite::catalog::Record;
    ///
    /// let record = Record::new("K562", "cell line", ["leukemia cell"]);
    /// assert_eq!(record.term_name(), Some("K562"));
    /// ```
    pub fn new<S>(
        term_name: impl Into<String>,
        classification: impl Into<String>,
        cell_slims: impl IntoIterator<Item = S>,
    ) -> Self
    where
        S: Into<String>,
    {
        Self {
            term_name: Some(term_name.into()),
            classification: Some(classification.into()),
            cell_slims: Some(
                cell_slims
                    .into_iter()
                    .map(|slim| Value::String(slim.into()))
                    .collect(),
            ),
        }
    }

    /// Gets the term name (if it exists).
    pub fn term_name(&self) -> Option<&str> {
        self.term_name.as_deref()
    }

    /// Gets the classification (if it exists).
    pub fn classification(&self) -> Option<&str> {
        self.classification.as_deref()
    }

    /// Gets the cell slims coerced to strings.
    pub fn cell_slims(&self) -> impl Iterator<Item = String> + '_ {
        self.cell_slims.iter().flatten().map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// A biosample term that survived filtering.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Term {
    /// The display name.
    name: String,

    /// The trimmed, lowercased classification.
    classification: String,

    /// The set of slims.
    slims: BTreeSet<String>,
}

impl Term {
    /// Attempts to create a term from a raw [`Record`].
    ///
    /// [`None`] is returned if the record has no name or if its
    /// classification is not one of the [`ALLOWED_CLASSIFICATIONS`].
    ///
    /// # Examples
    ///
    /// ```
    /// use encodelite::catalog::Record;
    /// use encodelite::catalog::Term;
    ///
    /// let term = Term::try_from_record(&Record::new("HepG2", " Cell Line ", ["epithelial cell"]));
    /// assert_eq!(term.unwrap().classification(), "cell line");
    ///
    /// let term = Term::try_from_record(&Record::new("liver", "tissue", ["hepatocyte"]));
    /// assert!(term.is_none());
    /// ```
    pub fn try_from_record(record: &Record) -> Option<Self> {
        let classification = record
            .classification()
            .unwrap_or_default()
            .trim()
            .to_lowercase();

        if !classification.is_empty() && !ALLOWED_CLASSIFICATIONS.contains(&classification.as_str())
        {
            return None;
        }

        let name = record.term_name().filter(|name| !name.is_empty())?;

        Some(Self {
            name: name.to_string(),
            classification,
            slims: record.cell_slims().collect(),
        })
    }

    /// Gets the name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the classification.
    ///
    /// This is empty for unclassified terms.
    pub fn classification(&self) -> &str {
        &self.classification
    }

    /// Gets the slims.
    pub fn slims(&self) -> &BTreeSet<String> {
        &self.slims
    }
}

/// Filters a sequence of raw records into [`Term`]s.
///
/// # Examples
///
/// ```
/// use encodelite::catalog;
/// use encodelite::catalog::Record;
///
/// let terms = catalog::load(vec![
///     Record::new("T cell", "primary cell", ["T cell", "leukocyte"]),
///     Record::new("lung", "tissue", ["epithelial cell"]),
/// ]);
///
/// assert_eq!(terms.len(), 1);
/// assert_eq!(terms[0].name(), "T cell");
/// ```
pub fn load<I>(records: I) -> Vec<Term>
where
    I: IntoIterator<Item = Record>,
{
    let mut total = 0usize;

    let terms = records
        .into_iter()
        .inspect(|_| total += 1)
        .filter_map(|record| Term::try_from_record(&record))
        .collect::<Vec<_>>();

    debug!("catalog: kept {} of {} records", terms.len(), total);
    terms
}

/// The envelope around a search response from the archive.
#[derive(Debug, Default, Deserialize)]
struct Envelope {
    /// The results of the search.
    #[serde(rename = "@graph", default)]
    graph: Option<Vec<Record>>,
}

/// Reads the raw records from an archive search response.
///
/// A missing (or `null`) `@graph` is treated as an empty catalog.
///
/// # Examples
///
/// ```
/// use encodelite::catalog;
///
/// let data = br#"{"@graph": [{"term_name": "K562", "classification": "cell line", "cell_slims": ["leukemia cell"]}]}"#;
/// let records = catalog::read_records(&data[..])?;
///
/// assert_eq!(records.len(), 1);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn read_records<R>(reader: R) -> Result<Vec<Record>>
where
    R: Read,
{
    let envelope: Envelope = serde_json::from_reader(reader).map_err(Error::Json)?;
    Ok(envelope.graph.unwrap_or_default())
}
