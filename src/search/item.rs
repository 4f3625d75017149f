//! Objects returned by a metadata search.
//!
//! The archive embeds related objects to varying depths depending on the
//! kind of object returned, so each displayed field is looked up along a
//! fixed list of paths and the first non-empty value wins.

use std::collections::HashMap;
use std::collections::HashSet;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

/// The paths to an object's assembly.
const ASSEMBLY: &[&str] = &["/assembly", "/dataset/assembly"];

/// The paths to an object's organism.
const ORGANISM: &[&str] = &[
    "/organism/scientific_name",
    "/dataset/organism/scientific_name",
    "/replicates/0/library/biosample/organism/scientific_name",
];

/// The paths to an object's cell type.
const CELL_TYPE: &[&str] = &[
    "/biosample_ontology/term_name",
    "/replicates/0/library/biosample/biosample_ontology/term_name",
    "/dataset/replicates/0/library/biosample/biosample_ontology/term_name",
];

/// The paths to an object's target.
const TARGET: &[&str] = &[
    "/target/label",
    "/experiment_object/target/label",
    "/dataset/target/label",
];

/// The paths to an object's primary type.
const TYPE: &[&str] = &[
    "/assay_title",
    "/output_type",
    "/file_format",
    "/display_title",
];

/// Renders a field as text.
///
/// Strings are used as is and lists of strings are joined. Empty values and
/// values of any other shape are treated as missing.
fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Array(values) => {
            let values = values.iter().filter_map(Value::as_str).collect::<Vec<_>>();
            match values.is_empty() {
                true => None,
                false => Some(values.join(", ")),
            }
        }
        _ => None,
    }
}

/// Gets the first non-empty field along a list of paths.
fn first(object: &Value, paths: &[&str]) -> Option<String> {
    paths
        .iter()
        .find_map(|path| object.pointer(path).and_then(text))
}

/// The results page of a search.
#[derive(Debug, Default, Deserialize)]
pub struct Graph {
    /// The returned objects.
    #[serde(rename = "@graph", default)]
    graph: Vec<Value>,
}

impl Graph {
    /// Extracts the items from the page.
    pub fn items(&self) -> Vec<Item> {
        self.graph.iter().map(Item::from_value).collect()
    }
}

/// The displayed fields of a search result.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Item {
    /// The accession.
    accession: Option<String>,

    /// The archive identifier (`@id`).
    id: Option<String>,

    /// The genome assembly.
    assembly: Option<String>,

    /// The organism.
    organism: Option<String>,

    /// The cell type.
    cell_type: Option<String>,

    /// The target.
    target: Option<String>,

    /// The primary type (assay, output type, or file format).
    #[serde(rename = "type")]
    kind: Option<String>,
}

impl Item {
    /// Extracts the displayed fields from a returned object.
    ///
    /// # Examples
    ///
    /// ```
    /// use encodelite::search::Item;
    ///
    /// let object = serde_json::json!({
    ///     "@id": "/files/ENCFF001ABC/",
    ///     "accession": "ENCFF001ABC",
    ///     "output_type": "signal p-value",
    ///     "dataset": {
    ///         "assembly": "GRCh38",
    ///         "target": { "label": "CTCF" },
    ///     },
    ///     "replicates": [{
    ///         "library": { "biosample": { "biosample_ontology": { "term_name": "K562" } } },
    ///     }],
    /// });
    ///
    /// let item = Item::from_value(&object);
    /// assert_eq!(item.id(), Some("/files/ENCFF001ABC/"));
    /// assert_eq!(item.assembly(), Some("GRCh38"));
    /// assert_eq!(item.cell_type(), Some("K562"));
    /// assert_eq!(item.target(), Some("CTCF"));
    /// assert_eq!(item.kind(), Some("signal p-value"));
    /// assert_eq!(item.organism(), None);
    /// ```
    pub fn from_value(object: &Value) -> Self {
        Self {
            accession: first(object, &["/accession"]),
            id: first(object, &["/@id"]),
            assembly: first(object, ASSEMBLY),
            organism: first(object, ORGANISM),
            cell_type: first(object, CELL_TYPE),
            target: first(object, TARGET),
            kind: first(object, TYPE),
        }
    }

    /// Gets the accession.
    pub fn accession(&self) -> Option<&str> {
        self.accession.as_deref()
    }

    /// Gets the archive identifier.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Gets the genome assembly.
    pub fn assembly(&self) -> Option<&str> {
        self.assembly.as_deref()
    }

    /// Gets the organism.
    pub fn organism(&self) -> Option<&str> {
        self.organism.as_deref()
    }

    /// Gets the cell type.
    pub fn cell_type(&self) -> Option<&str> {
        self.cell_type.as_deref()
    }

    /// Gets the target.
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Gets the primary type.
    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }
}

/// Merges the items of several result pages.
///
/// Items are keyed by identifier: items without one are dropped, and a
/// repeated identifier keeps its first position but takes the latest item.
/// Items whose cell type is excluded are then removed, and at most `limit`
/// items are kept.
pub fn merge<I>(pages: I, exclude_cell_types: &[String], limit: usize) -> Vec<Item>
where
    I: IntoIterator<Item = Vec<Item>>,
{
    let mut merged: Vec<Item> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for item in pages.into_iter().flatten() {
        let Some(id) = item.id().map(String::from) else {
            continue;
        };

        match positions.get(&id).copied() {
            Some(i) => merged[i] = item,
            None => {
                positions.insert(id, merged.len());
                merged.push(item);
            }
        }
    }

    let excluded = exclude_cell_types
        .iter()
        .map(String::as_str)
        .collect::<HashSet<_>>();

    if !excluded.is_empty() {
        merged.retain(|item| !excluded.contains(item.cell_type().unwrap_or_default()));
    }

    merged.truncate(limit);
    merged
}

/// The results of a metadata search.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Results {
    /// The URL of every request made.
    pub urls: Vec<String>,

    /// The number of items.
    pub total: usize,

    /// The merged items.
    pub items: Vec<Item>,
}
