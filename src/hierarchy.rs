//! Inference of a cell-type hierarchy from slim annotations.
//!
//! The archive provides no explicit parent pointers between slims. Instead,
//! the hierarchy is reconstructed entirely from which terms carry which
//! slims:
//!
//! 1. The catalog is inverted into a [`SlimIndex`] of slim → members.
//! 2. Each slim is assigned the closest slim whose members strictly enclose
//!    its own (see [`order`]).
//! 3. The parent assignments are assembled into a forest (see [`assembly`]).
//! 4. Members are aggregated up the forest (see [`aggregate`]).
//! 5. The forest is packed beneath a synthetic root [`Node`] (see [`node`]).
//!
//! Every build starts from scratch and is deterministic: the same catalog
//! always produces the same tree.

use std::cmp::Ordering;

use tracing::debug;

use crate::catalog;
use crate::catalog::Record;
use crate::catalog::Term;

pub mod aggregate;
pub mod assembly;
pub mod index;
pub mod node;
pub mod order;

pub use index::SlimIndex;
pub use node::Node;

/// Compares two labels case-insensitively.
///
/// Labels are compared by their Unicode default case folding (so `ß` sorts
/// as `ss`). Labels that fold to the same text are ordered by their exact
/// text so that the ordering is total.
pub fn compare_labels(a: &str, b: &str) -> Ordering {
    caseless::default_case_fold_str(a)
        .cmp(&caseless::default_case_fold_str(b))
        .then_with(|| a.cmp(b))
}

/// Sorts labels case-insensitively (see [`compare_labels()`]).
pub fn sort_labels(labels: &mut [String]) {
    labels.sort_by(|a, b| compare_labels(a, b));
}

/// Builds a hierarchy from raw catalog records.
///
/// # Examples
///
/// ```
/// use encodelite::catalog::Record;
/// use encodelite::hierarchy;
///
/// let tree = hierarchy::build(vec![
///     Record::new("A", "cell", ["x", "y"]),
///     Record::new("B", "cell", ["y"]),
/// ]);
///
/// assert_eq!(tree.label(), "Cell types");
/// assert_eq!(tree.aggregate_members(), ["A", "B"]);
///
/// let y = &tree.children()[0];
/// assert_eq!(y.label(), "y");
/// assert_eq!(y.children()[0].label(), "x");
/// ```
pub fn build<I>(records: I) -> Node
where
    I: IntoIterator<Item = Record>,
{
    build_from_terms(&catalog::load(records))
}

/// Builds a hierarchy from already filtered terms.
pub fn build_from_terms(terms: &[Term]) -> Node {
    let index = SlimIndex::from_terms(terms);
    let parents = order::reconstruct(&index);
    let assembly = assembly::assemble(&index, &parents);
    let aggregates = aggregate::aggregate(&index, &assembly);

    debug!(
        "hierarchy: {} terms, {} slims, {} roots",
        terms.len(),
        index.len(),
        assembly.roots().len()
    );

    node::pack(&index, &assembly, &aggregates)
}
