//! Reconstruction of the parent relation between slims.
//!
//! The archive does not report how slims relate to one another. Instead, we
//! infer a partial order from membership alone: slim `b` encloses slim `a`
//! when the members of `a` are a strict subset of the members of `b`. The
//! parent of `a` is then chosen from the _minimal_ enclosing slims (those
//! that do not themselves enclose another candidate), preferring the
//! smallest member set and then the label (case-insensitively).
//!
//! Because no set is a strict subset of itself, a slim can never be its own
//! ancestor and the resulting relation is always a forest.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::hierarchy::compare_labels;
use crate::hierarchy::index::SlimIndex;

/// The parent (if any) assigned to each slim.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Parents {
    /// The inner parent assignments.
    inner: BTreeMap<String, Option<String>>,
}

impl Parents {
    /// Gets the parent of a slim.
    ///
    /// [`None`] is returned both when the slim is a local root and when the
    /// slim is unknown.
    pub fn parent(&self, slim: &str) -> Option<&str> {
        self.inner.get(slim)?.as_deref()
    }

    /// Returns an iterator over every slim and its parent.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.inner
            .iter()
            .map(|(slim, parent)| (slim.as_str(), parent.as_deref()))
    }

    /// Gets the number of slims.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns whether there are no slims.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl FromIterator<(String, Option<String>)> for Parents {
    fn from_iter<T: IntoIterator<Item = (String, Option<String>)>>(iter: T) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}

/// Gets every slim whose members are a strict superset of the members of
/// `slim`.
pub fn candidates<'a>(index: &'a SlimIndex, slim: &str) -> Vec<&'a str> {
    index
        .slims()
        .filter(|other| *other != slim && index.is_strict_subset(slim, other))
        .collect()
}

/// Reduces a list of candidates to its minimal elements.
///
/// A candidate is dropped if its members are a strict superset of another
/// candidate's members.
pub fn minimal<'a>(index: &SlimIndex, candidates: &[&'a str]) -> Vec<&'a str> {
    candidates
        .iter()
        .filter(|x| {
            !candidates
                .iter()
                .any(|y| x != &y && index.is_strict_subset(y, x))
        })
        .copied()
        .collect()
}

/// Orders two slims for the purposes of choosing a parent: smaller member
/// sets first, then case-insensitively by label.
fn compare_candidates(index: &SlimIndex, a: &str, b: &str) -> Ordering {
    index
        .size(a)
        .cmp(&index.size(b))
        .then_with(|| compare_labels(a, b))
}

/// Chooses the parent of a single slim.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeSet;
///
/// use encodelite::hierarchy::SlimIndex;
/// use encodelite::hierarchy::order;
///
/// let set = |names: &[&str]| names.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>();
/// let index = SlimIndex::from_buckets([
///     (String::from("x"), set(&["A"])),
///     (String::from("y"), set(&["A", "B"])),
///     (String::from("z"), set(&["A", "B", "C"])),
/// ]);
///
/// assert_eq!(order::parent_of(&index, "x"), Some("y"));
/// assert_eq!(order::parent_of(&index, "y"), Some("z"));
/// assert_eq!(order::parent_of(&index, "z"), None);
/// ```
pub fn parent_of<'a>(index: &'a SlimIndex, slim: &str) -> Option<&'a str> {
    let candidates = candidates(index, slim);

    if candidates.is_empty() {
        return None;
    }

    minimal(index, &candidates)
        .into_iter()
        .min_by(|a, b| compare_candidates(index, a, b))
}

/// Assigns a parent to every slim within the index.
pub fn reconstruct(index: &SlimIndex) -> Parents {
    index
        .slims()
        .map(|slim| {
            (
                slim.to_string(),
                parent_of(index, slim).map(|parent| parent.to_string()),
            )
        })
        .collect()
}
