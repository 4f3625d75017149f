//! Metadata search criteria.

use std::collections::HashSet;

use crate::config::Config;
use crate::search::Kind;
use crate::search::Query;

/// The number of results requested when no limit is given.
pub const DEFAULT_LIMIT: usize = 25;

/// The maximum number of results that can be requested.
pub const MAX_LIMIT: usize = 200;

/// The cell type filter field.
pub const CELL_TYPE: &str = "biosample_ontology.term_name";

/// The target filter field.
pub const TARGET: &str = "target.label";

/// The output type filter field.
pub const OUTPUT_TYPE: &str = "output_type";

/// Clamps a requested result limit.
///
/// A missing or zero limit is the [default](DEFAULT_LIMIT); anything else is
/// clamped to `1..=`[`MAX_LIMIT`].
///
/// # Examples
///
/// ```
/// use encodelite::search::criteria::clamp_limit;
///
/// assert_eq!(clamp_limit(None), 25);
/// assert_eq!(clamp_limit(Some(0)), 25);
/// assert_eq!(clamp_limit(Some(10)), 10);
/// assert_eq!(clamp_limit(Some(1000)), 200);
/// ```
pub fn clamp_limit(limit: Option<usize>) -> usize {
    match limit {
        None | Some(0) => DEFAULT_LIMIT,
        Some(limit) => limit.clamp(1, MAX_LIMIT),
    }
}

/// Removes repeated and empty values, keeping the first occurrence of each.
fn unique(values: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();

    values
        .iter()
        .map(String::as_str)
        .filter(|value| !value.is_empty() && seen.insert(*value))
        .collect()
}

/// Expands a filter axis: an empty axis contributes a single unfiltered slot.
fn axis(values: Vec<&str>) -> Vec<Option<&str>> {
    match values.is_empty() {
        true => vec![None],
        false => values.into_iter().map(Some).collect(),
    }
}

/// The criteria of a metadata search.
///
/// Every field is optional. The file format and output types normally come
/// from configuration (see [`Criteria::from_config()`]).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Criteria {
    /// The kind of object searched for.
    pub kind: Option<Kind>,

    /// Free text to search for.
    pub search_term: Option<String>,

    /// The assay title.
    pub assay_title: Option<String>,

    /// The organism (scientific name).
    pub organism: Option<String>,

    /// The genome assembly.
    pub assembly: Option<String>,

    /// A single target, used only when no targets are included.
    pub target: Option<String>,

    /// The cell types to include (one request each).
    pub include_cell_types: Vec<String>,

    /// The cell types removed from the merged results.
    pub exclude_cell_types: Vec<String>,

    /// The targets to include (one request each).
    pub include_targets: Vec<String>,

    /// The file format.
    pub file_format: Option<String>,

    /// The output types (one request each).
    pub output_types: Vec<String>,

    /// The requested number of results.
    pub limit: Option<usize>,

    /// The pagination cursor.
    pub after: Option<String>,
}

impl Criteria {
    /// Creates criteria with the file format and output types set from
    /// configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            file_format: config.file_format().map(String::from),
            output_types: config
                .output_types()
                .into_iter()
                .map(String::from)
                .collect(),
            ..Default::default()
        }
    }

    /// Gets the kind of object searched for.
    pub fn kind(&self) -> Kind {
        match self.kind {
            Some(Kind::Experiment) => Kind::Experiment,
            Some(Kind::Dataset) => Kind::Dataset,
            _ => Kind::File,
        }
    }

    /// Gets the clamped result limit.
    pub fn limit(&self) -> usize {
        clamp_limit(self.limit)
    }

    /// Gets the targets, falling back to the single target.
    fn targets(&self) -> Vec<&str> {
        let targets = unique(&self.include_targets);

        match (targets.is_empty(), self.target.as_deref()) {
            (true, Some(target)) if !target.is_empty() => vec![target],
            _ => targets,
        }
    }

    /// Builds the parameters shared by every request.
    ///
    /// # Examples
    ///
    /// ```
    /// use encodelite::search::Criteria;
    ///
    /// let criteria = Criteria {
    ///     organism: Some(String::from("Homo sapiens")),
    ///     limit: Some(500),
    ///     ..Default::default()
    /// };
    ///
    /// assert_eq!(
    ///     criteria.base().to_string(),
    ///     "type=File&format=json&frame=embedded&status=released&limit=200\
    ///      &organism.scientific_name=Homo%20sapiens"
    /// );
    /// ```
    pub fn base(&self) -> Query {
        let mut query = Query {
            params: vec![
                (String::from("type"), self.kind().to_string()),
                (String::from("format"), String::from("json")),
                (String::from("frame"), String::from("embedded")),
                (String::from("status"), String::from("released")),
                (String::from("limit"), self.limit().to_string()),
            ],
        };

        let optional = [
            ("searchTerm", &self.search_term),
            ("assay_title", &self.assay_title),
            ("organism.scientific_name", &self.organism),
            ("assembly", &self.assembly),
            ("file_format", &self.file_format),
            ("after", &self.after),
        ];

        for (field, value) in optional {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                query = query.filter(field, value);
            }
        }

        query
    }

    /// Expands the criteria into one query per combination of cell type,
    /// target, and output type.
    ///
    /// An axis with no values places no filter on that field, so criteria
    /// without any of them expand to the single base query.
    pub fn queries(&self) -> Vec<Query> {
        let base = self.base();
        let cells = axis(unique(&self.include_cell_types));
        let targets = axis(self.targets());
        let output_types = axis(unique(&self.output_types));

        let mut queries = Vec::with_capacity(cells.len() * targets.len() * output_types.len());

        for cell in &cells {
            for target in &targets {
                for output_type in &output_types {
                    let filters = [
                        (CELL_TYPE, cell),
                        (TARGET, target),
                        (OUTPUT_TYPE, output_type),
                    ];

                    let query = filters
                        .into_iter()
                        .fold(base.clone(), |query, (field, value)| match value {
                            Some(value) => query.filter(field, *value),
                            None => query,
                        });

                    queries.push(query);
                }
            }
        }

        queries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn value<'a>(query: &'a Query, field: &str) -> Option<&'a str> {
        query
            .params()
            .iter()
            .find(|(key, _)| key == field)
            .map(|(_, value)| value.as_str())
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(Some(1)), 1);
        assert_eq!(clamp_limit(Some(200)), 200);
        assert_eq!(clamp_limit(Some(201)), 200);
        assert_eq!(clamp_limit(Some(usize::MAX)), MAX_LIMIT);
    }

    #[test]
    fn test_base_params() {
        let criteria = Criteria {
            kind: Some(Kind::BiosampleType),
            search_term: Some(String::from("")),
            assay_title: Some(String::from("ChIP-seq")),
            assembly: Some(String::from("GRCh38")),
            file_format: Some(String::from("bigWig")),
            after: Some(String::from("cursor")),
            ..Default::default()
        };

        let base = criteria.base();
        assert_eq!(value(&base, "type"), Some("File"));
        assert_eq!(value(&base, "limit"), Some("25"));
        assert_eq!(value(&base, "searchTerm"), None);
        assert_eq!(value(&base, "assay_title"), Some("ChIP-seq"));
        assert_eq!(value(&base, "assembly"), Some("GRCh38"));
        assert_eq!(value(&base, "file_format"), Some("bigWig"));
        assert_eq!(value(&base, "after"), Some("cursor"));
        assert_eq!(value(&base, "organism.scientific_name"), None);

        let datasets = Criteria {
            kind: Some(Kind::Dataset),
            ..Default::default()
        };
        assert_eq!(value(&datasets.base(), "type"), Some("Dataset"));
    }

    #[test]
    fn test_expansion() {
        let criteria = Criteria {
            include_cell_types: strings(&["K562", "HepG2", "K562"]),
            include_targets: strings(&["CTCF", "POLR2A"]),
            output_types: strings(&["fold change over control", "signal p-value"]),
            ..Default::default()
        };

        let queries = criteria.queries();
        assert_eq!(queries.len(), 8);

        let combinations = queries
            .iter()
            .map(|q| {
                (
                    value(q, CELL_TYPE).unwrap(),
                    value(q, TARGET).unwrap(),
                    value(q, OUTPUT_TYPE).unwrap(),
                )
            })
            .collect::<Vec<_>>();

        assert_eq!(
            combinations[0],
            ("K562", "CTCF", "fold change over control")
        );
        assert_eq!(combinations[1], ("K562", "CTCF", "signal p-value"));
        assert_eq!(combinations[2], ("K562", "POLR2A", "fold change over control"));
        assert_eq!(combinations[7], ("HepG2", "POLR2A", "signal p-value"));

        let unique = combinations.iter().collect::<HashSet<_>>();
        assert_eq!(unique.len(), 8);
    }

    #[test]
    fn test_empty_axes_are_unfiltered() {
        let queries = Criteria::default().queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0], Criteria::default().base());

        let criteria = Criteria {
            include_targets: strings(&["CTCF"]),
            ..Default::default()
        };
        let queries = criteria.queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(value(&queries[0], TARGET), Some("CTCF"));
        assert_eq!(value(&queries[0], CELL_TYPE), None);
        assert_eq!(value(&queries[0], OUTPUT_TYPE), None);
    }

    #[test]
    fn test_single_target_fallback() {
        let mut criteria = Criteria {
            target: Some(String::from("EP300")),
            ..Default::default()
        };
        assert_eq!(value(&criteria.queries()[0], TARGET), Some("EP300"));

        criteria.include_targets = strings(&["CTCF"]);
        let queries = criteria.queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(value(&queries[0], TARGET), Some("CTCF"));
    }

    #[test]
    fn test_from_config() -> Result<(), Box<dyn std::error::Error>> {
        let config = Config::from_reader(
            &b"file_format: bigWig\noutput_types: fold change over control,signal p-value\n"[..],
        )?;

        let criteria = Criteria::from_config(&config);
        assert_eq!(criteria.file_format.as_deref(), Some("bigWig"));
        assert_eq!(
            criteria.output_types,
            ["fold change over control", "signal p-value"]
        );

        let queries = criteria.queries();
        assert_eq!(queries.len(), 2);
        assert_eq!(value(&queries[0], "file_format"), Some("bigWig"));
        assert_eq!(value(&queries[1], OUTPUT_TYPE), Some("signal p-value"));

        Ok(())
    }
}
