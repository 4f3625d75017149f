//! A blocking client for the archive.
//!
//! The client is an explicit object holding the timeout and headers for every
//! request; it is constructed and owned by the caller. Requests are never
//! retried.

use reqwest::blocking;
use reqwest::header;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use reqwest::StatusCode;
use serde::Serialize;
use tracing::debug;
use tracing::info;

use crate::catalog;
use crate::catalog::Record;
use crate::config::Config;
use crate::facet;
use crate::facet::Payload;
use crate::hierarchy;
use crate::hierarchy::Node;
use crate::search::item;
use crate::search::item::Graph;
use crate::search::item::Results;
use crate::search::Criteria;
use crate::search::Kind;
use crate::search::Query;
use crate::search::SEARCH_PATH;

/// An error related to the [`Client`].
#[derive(Debug)]
pub enum Error {
    /// The client could not be constructed.
    Build(reqwest::Error),

    /// An invalid header value was configured.
    InvalidHeader(header::InvalidHeaderValue),

    /// A request failed to complete.
    Request(reqwest::Error),

    /// A request completed with an unsuccessful status.
    Status(StatusCode, String),

    /// The catalog could not be read.
    Catalog(catalog::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Build(err) => write!(f, "unable to build client: {err}"),
            Error::InvalidHeader(err) => write!(f, "invalid header: {err}"),
            Error::Request(err) => write!(f, "request failed: {err}"),
            Error::Status(status, url) => write!(f, "request to {url} returned {status}"),
            Error::Catalog(err) => write!(f, "catalog error: {err}"),
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// The filter options offered to users.
#[derive(Clone, Debug, Serialize)]
pub struct Options {
    /// The assays (most common first).
    pub assays: Vec<String>,

    /// The organisms (most common first).
    pub organisms: Vec<String>,

    /// The targets (most common first).
    pub targets: Vec<String>,

    /// The flat list of cell types (sorted by label).
    pub cell_types: Vec<String>,

    /// The cell type hierarchy.
    pub cell_tree: Node,
}

/// A client for the archive.
#[derive(Clone, Debug)]
pub struct Client {
    /// The inner HTTP client.
    inner: blocking::Client,

    /// The base URL of the archive.
    base_url: String,
}

impl Client {
    /// Creates a new client from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_str(config.user_agent()).map_err(Error::InvalidHeader)?,
        );

        let inner = blocking::Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .build()
            .map_err(Error::Build)?;

        Ok(Self {
            inner,
            base_url: config.archive_url().to_string(),
        })
    }

    /// Gets the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Gets the full URL of a search.
    pub fn url(&self, query: &Query) -> String {
        format!("{}{}?{}", self.base_url, SEARCH_PATH, query)
    }

    /// Sends a search, returning the response regardless of its status.
    fn send(&self, query: &Query) -> Result<blocking::Response> {
        let url = format!("{}{}", self.base_url, SEARCH_PATH);
        debug!("client: GET {}", self.url(query));

        self.inner
            .get(&url)
            .query(query.params())
            .send()
            .map_err(Error::Request)
    }

    /// Performs a search, returning the successful response.
    fn get(&self, query: &Query) -> Result<blocking::Response> {
        let response = self.send(query)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status(status, response.url().to_string()));
        }

        Ok(response)
    }

    /// Fetches the facets for a query.
    fn facets(&self, query: &Query) -> Result<Payload> {
        self.get(query)?
            .json::<Payload>()
            .map_err(Error::Request)
    }

    /// Fetches one page of search results.
    ///
    /// The archive answers some filtered searches that match nothing with
    /// `404 Not Found`; these are treated as an empty page.
    fn graph(&self, query: &Query) -> Result<Graph> {
        let response = self.send(query)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!("client: no results for {}", self.url(query));
            return Ok(Graph::default());
        }

        if !status.is_success() {
            return Err(Error::Status(status, response.url().to_string()));
        }

        response.json::<Graph>().map_err(Error::Request)
    }

    /// Searches the archive's metadata.
    ///
    /// One request is made for every combination of included cell type,
    /// target, and output type (see [`Criteria::queries()`]). The results
    /// are merged by identifier, excluded cell types are removed, and the
    /// merged list is trimmed to the criteria's limit.
    pub fn search(&self, criteria: &Criteria) -> Result<Results> {
        let queries = criteria.queries();
        let mut urls = Vec::with_capacity(queries.len());
        let mut pages = Vec::with_capacity(queries.len());

        for query in &queries {
            urls.push(self.url(query));
            pages.push(self.graph(query)?.items());
        }

        let items = item::merge(pages, &criteria.exclude_cell_types, criteria.limit());
        info!(
            "client: {} requests returned {} items",
            urls.len(),
            items.len()
        );

        Ok(Results {
            urls,
            total: items.len(),
            items,
        })
    }

    /// Fetches the raw biosample type catalog.
    pub fn fetch_catalog(&self) -> Result<Vec<Record>> {
        let bytes = self
            .get(&Query::catalog())?
            .bytes()
            .map_err(Error::Request)?;

        let records = catalog::read_records(&bytes[..]).map_err(Error::Catalog)?;
        info!("client: fetched {} biosample types", records.len());

        Ok(records)
    }

    /// Fetches the catalog and builds the cell type hierarchy from it.
    pub fn cell_tree(&self) -> Result<Node> {
        self.fetch_catalog().map(hierarchy::build)
    }

    /// Fetches the assays and organisms of released experiments.
    pub fn assays_and_organisms(&self) -> Result<(Vec<String>, Vec<String>)> {
        let experiments = self.facets(&Query::facets(Kind::Experiment))?;
        Ok((
            facet::by_count(experiments.terms(facet::ASSAY_TITLE)),
            facet::by_count(experiments.terms(facet::ORGANISM)),
        ))
    }

    /// Fetches the targets of released experiments, falling back to the
    /// targets of released files.
    pub fn targets(&self) -> Result<Vec<String>> {
        let experiments = self.facets(&Query::facets(Kind::Experiment))?;
        self.targets_from(&experiments)
    }

    /// Derives targets from experiment facets (see [`Client::targets()`]).
    fn targets_from(&self, experiments: &Payload) -> Result<Vec<String>> {
        let targets = facet::by_count(experiments.terms(facet::TARGET));
        if !targets.is_empty() {
            return Ok(targets);
        }

        let files = self.facets(&Query::facets(Kind::File))?;
        Ok(facet::by_count(files.terms(facet::FILE_TARGET)))
    }

    /// Fetches the flat list of cell types of released experiments, falling
    /// back to the cell types of released files.
    pub fn cell_types(&self) -> Result<Vec<String>> {
        let experiments = self.facets(&Query::facets(Kind::Experiment))?;
        self.cell_types_from(&experiments)
    }

    /// Derives cell types from experiment facets (see
    /// [`Client::cell_types()`]).
    fn cell_types_from(&self, experiments: &Payload) -> Result<Vec<String>> {
        let terms = experiments.terms(facet::CELL_TYPE);
        if !terms.is_empty() {
            return Ok(facet::by_label(terms));
        }

        let files = self.facets(&Query::facets(Kind::File))?;
        Ok(facet::by_label(files.terms(facet::FILE_CELL_TYPE)))
    }

    /// Fetches the assemblies of released files, optionally restricted to a
    /// single organism.
    pub fn assemblies(&self, organism: Option<&str>) -> Result<Vec<String>> {
        let mut query = Query::facets(Kind::File);

        if let Some(organism) = organism.filter(|o| !o.is_empty()) {
            for field in facet::FILE_ORGANISMS {
                query = query.filter(*field, organism);
            }
        }

        let files = self.facets(&query)?;
        Ok(facet::by_count_exact(files.terms(facet::ASSEMBLY)))
    }

    /// Fetches every filter option along with the cell type hierarchy.
    pub fn options(&self) -> Result<Options> {
        let experiments = self.facets(&Query::facets(Kind::Experiment))?;

        Ok(Options {
            assays: facet::by_count(experiments.terms(facet::ASSAY_TITLE)),
            organisms: facet::by_count(experiments.terms(facet::ORGANISM)),
            targets: self.targets_from(&experiments)?,
            cell_types: self.cell_types_from(&experiments)?,
            cell_tree: self.cell_tree()?,
        })
    }
}
