//! Search queries against the archive.
//!
//! [`Query`] holds the parameters of a single request to the search
//! endpoint. The [`criteria`] module expands a user's metadata search into
//! one query per filter combination, and the [`item`] module extracts the
//! displayed fields from the returned objects.

pub mod criteria;
pub mod item;

pub use criteria::Criteria;
pub use item::Item;

/// The path of the search endpoint.
pub const SEARCH_PATH: &str = "/search/";

/// A type of object that can be searched for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Kind {
    /// An experiment.
    Experiment,

    /// A file.
    File,

    /// A dataset.
    Dataset,

    /// A biosample type (the term catalog).
    BiosampleType,
}

impl Kind {
    /// Parses the kind of a metadata search.
    ///
    /// Only files, experiments, and datasets can be searched for; any other
    /// name yields [`Kind::File`].
    ///
    /// # Examples
    ///
    /// ```
    /// use encodelite::search::Kind;
    ///
    /// assert_eq!(Kind::searchable("Experiment"), Kind::Experiment);
    /// assert_eq!(Kind::searchable("BiosampleType"), Kind::File);
    /// ```
    pub fn searchable(name: &str) -> Self {
        match name {
            "Experiment" => Kind::Experiment,
            "Dataset" => Kind::Dataset,
            _ => Kind::File,
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Kind::Experiment => write!(f, "Experiment"),
            Kind::File => write!(f, "File"),
            Kind::Dataset => write!(f, "Dataset"),
            Kind::BiosampleType => write!(f, "BiosampleType"),
        }
    }
}

/// The query parameters for a single search.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Query {
    /// The parameters in the order they are sent.
    params: Vec<(String, String)>,
}

impl Query {
    /// Creates a query for the facets of all released objects of a kind.
    ///
    /// No results are requested (`limit=0`); only facets are of interest.
    ///
    /// # Examples
    ///
    /// ```
    /// use encodelite::search::Kind;
    /// use encodelite::search::Query;
    ///
    /// let query = Query::facets(Kind::File).filter("assembly", "GRCh38");
    /// assert_eq!(
    ///     query.to_string(),
    ///     "format=json&frame=embedded&type=File&status=released&limit=0&assembly=GRCh38"
    /// );
    /// ```
    pub fn facets(kind: Kind) -> Self {
        Self {
            params: vec![
                (String::from("format"), String::from("json")),
                (String::from("frame"), String::from("embedded")),
                (String::from("type"), kind.to_string()),
                (String::from("status"), String::from("released")),
                (String::from("limit"), String::from("0")),
            ],
        }
    }

    /// Creates a query for the full biosample type catalog.
    pub fn catalog() -> Self {
        Self {
            params: vec![
                (String::from("type"), Kind::BiosampleType.to_string()),
                (String::from("format"), String::from("json")),
                (String::from("frame"), String::from("object")),
                (String::from("limit"), String::from("all")),
            ],
        }
    }

    /// Adds a filter to the query.
    pub fn filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((field.into(), value.into()));
        self
    }

    /// Gets the parameters.
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }
}

/// Renders the parameters as a percent-encoded query string.
impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, (key, value)) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, "&")?;
            }

            write!(
                f,
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(value)
            )?;
        }

        Ok(())
    }
}
