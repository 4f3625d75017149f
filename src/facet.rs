//! Facets reported by archive searches.
//!
//! A search with `limit=0` returns no results but still reports, for each
//! faceted field, the distinct values (terms) along with the number of
//! documents carrying them. These facets drive the filter options offered to
//! users (assays, organisms, targets, cell types, and assemblies).

use std::cmp::Ordering;

use serde::Deserialize;
use serde_json::Value;

use crate::hierarchy::compare_labels;

/// The assay facet on experiments.
pub const ASSAY_TITLE: &str = "assay_title";

/// The organism facet on experiments.
pub const ORGANISM: &str = "organism.scientific_name";

/// The target facet on experiments.
pub const TARGET: &str = "target.label";

/// The target facet on files.
pub const FILE_TARGET: &str = "dataset.target.label";

/// The cell type facet on experiments.
pub const CELL_TYPE: &str = "biosample_ontology.term_name";

/// The cell type facet on files.
pub const FILE_CELL_TYPE: &str = "replicates.library.biosample.biosample_ontology.term_name";

/// The assembly facet on files.
pub const ASSEMBLY: &str = "assembly";

/// The organism facets on files that are filtered when looking up assemblies
/// for a single organism.
pub const FILE_ORGANISMS: &[&str] = &[
    "organism.scientific_name",
    "dataset.organism.scientific_name",
    "dataset.replicates.library.biosample.donor.organism.scientific_name",
];

/// A single facet term.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FacetTerm {
    /// The term.
    key: String,

    /// The number of documents with the term.
    count: u64,
}

impl FacetTerm {
    /// Creates a new facet term.
    pub fn new(key: impl Into<String>, count: u64) -> Self {
        Self {
            key: key.into(),
            count,
        }
    }

    /// Gets the key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Gets the document count.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Consumes self and returns the key.
    pub fn into_key(self) -> String {
        self.key
    }
}

/// A facet as reported by the archive.
#[derive(Debug, Default, Deserialize)]
struct Facet {
    /// The faceted field.
    #[serde(default)]
    field: Option<String>,

    /// The terms for the field.
    ///
    /// This is kept loosely typed, as some facets report terms in shapes
    /// other than a list.
    #[serde(default)]
    terms: Value,
}

/// The facets portion of a search response.
#[derive(Debug, Default, Deserialize)]
pub struct Payload {
    /// The facets.
    #[serde(default)]
    facets: Option<Vec<Facet>>,
}

impl Payload {
    /// Gets the terms of the first facet for `field`.
    ///
    /// Terms without a key are skipped and terms without a count are given a
    /// count of zero. If the field is not faceted, the list is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use encodelite::facet::Payload;
    ///
    /// let payload: Payload = serde_json::from_str(
    ///     r#"{"facets": [{"field": "assembly", "terms": [{"key": "GRCh38", "doc_count": 7}]}]}"#,
    /// )?;
    ///
    /// let terms = payload.terms("assembly");
    /// assert_eq!(terms[0].key(), "GRCh38");
    /// assert_eq!(terms[0].count(), 7);
    /// assert!(payload.terms("target.label").is_empty());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn terms(&self, field: &str) -> Vec<FacetTerm> {
        let facet = match self
            .facets
            .iter()
            .flatten()
            .find(|facet| facet.field.as_deref() == Some(field))
        {
            Some(facet) => facet,
            None => return Vec::new(),
        };

        facet
            .terms
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|term| {
                let key = match term.get("key")? {
                    Value::String(s) if !s.is_empty() => s.clone(),
                    Value::Number(n) => n.to_string(),
                    _ => return None,
                };

                let count = term
                    .get("doc_count")
                    .and_then(Value::as_u64)
                    .unwrap_or(0);

                Some(FacetTerm { key, count })
            })
            .collect()
    }
}

/// Orders terms by descending count, then case-insensitively by key.
fn compare_by_count(a: &FacetTerm, b: &FacetTerm) -> Ordering {
    b.count
        .cmp(&a.count)
        .then_with(|| compare_labels(&a.key, &b.key))
}

/// Returns the keys ordered by descending count, then case-insensitively.
pub fn by_count(mut terms: Vec<FacetTerm>) -> Vec<String> {
    terms.sort_by(compare_by_count);
    terms.into_iter().map(FacetTerm::into_key).collect()
}

/// Returns the keys ordered by descending count, then by their exact text.
pub fn by_count_exact(mut terms: Vec<FacetTerm>) -> Vec<String> {
    terms.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    terms.into_iter().map(FacetTerm::into_key).collect()
}

/// Returns the keys ordered case-insensitively, ignoring counts.
pub fn by_label(mut terms: Vec<FacetTerm>) -> Vec<String> {
    terms.sort_by(|a, b| compare_labels(&a.key, &b.key));
    terms.into_iter().map(FacetTerm::into_key).collect()
}
