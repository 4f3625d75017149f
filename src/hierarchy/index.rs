//! An index of slims to the terms that belong to them.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::catalog::Term;

/// The members of a single slim.
pub type Members = BTreeSet<String>;

/// A mapping of each slim label to the (non-empty) set of term names that
/// carry that slim.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SlimIndex {
    /// The inner buckets.
    inner: BTreeMap<String, Members>,
}

impl SlimIndex {
    /// Builds an index from a list of terms.
    ///
    /// # Examples
    ///
    /// ```
    /// use encodelite::catalog;
    /// use encodelite::catalog::Record;
    /// use encodelite::hierarchy::SlimIndex;
    ///
    /// let terms = catalog::load(vec![
    ///     Record::new("A", "cell", ["x", "y"]),
    ///     Record::new("B", "cell", ["y"]),
    /// ]);
    ///
    /// let index = SlimIndex::from_terms(&terms);
    /// assert_eq!(index.len(), 2);
    /// assert_eq!(index.members("y").unwrap().len(), 2);
    /// ```
    pub fn from_terms(terms: &[Term]) -> Self {
        let mut inner = BTreeMap::<String, Members>::new();

        for term in terms {
            for slim in term.slims() {
                inner
                    .entry(slim.clone())
                    .or_default()
                    .insert(term.name().to_string());
            }
        }

        Self::from_buckets(inner)
    }

    /// Builds an index directly from slim buckets, discarding any bucket
    /// that is empty.
    pub fn from_buckets<I>(buckets: I) -> Self
    where
        I: IntoIterator<Item = (String, Members)>,
    {
        let inner = buckets
            .into_iter()
            .filter(|(_, members)| !members.is_empty())
            .collect();

        Self { inner }
    }

    /// Gets the members of a slim.
    pub fn members(&self, slim: &str) -> Option<&Members> {
        self.inner.get(slim)
    }

    /// Gets the number of members of a slim (zero if the slim doesn't exist).
    pub fn size(&self, slim: &str) -> usize {
        self.members(slim).map(|members| members.len()).unwrap_or(0)
    }

    /// Returns an iterator over the slim labels in lexicographic order.
    pub fn slims(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(String::as_str)
    }

    /// Returns an iterator over the slims and their members.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Members)> {
        self.inner
            .iter()
            .map(|(slim, members)| (slim.as_str(), members))
    }

    /// Gets the number of slims.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns whether the index has no slims.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns whether the members of `a` are a strict subset of the members
    /// of `b`.
    ///
    /// Unknown slims are never a strict subset of anything.
    pub fn is_strict_subset(&self, a: &str, b: &str) -> bool {
        match (self.members(a), self.members(b)) {
            (Some(a), Some(b)) => a.len() < b.len() && a.is_subset(b),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use crate::catalog::Record;

    fn members(names: &[&str]) -> Members {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn test_buckets() {
        let terms = catalog::load(vec![
            Record::new("A", "cell", ["x", "y"]),
            Record::new("B", "cell line", ["y", "z"]),
            Record::new("C", "", ["z"]),
            Record::new("D", "cell", Vec::<String>::new()),
        ]);

        let index = SlimIndex::from_terms(&terms);

        assert_eq!(index.slims().collect::<Vec<_>>(), vec!["x", "y", "z"]);
        assert_eq!(index.members("x"), Some(&members(&["A"])));
        assert_eq!(index.members("y"), Some(&members(&["A", "B"])));
        assert_eq!(index.members("z"), Some(&members(&["B", "C"])));
        assert_eq!(index.members("w"), None);
        assert_eq!(index.size("w"), 0);
    }

    #[test]
    fn test_empty_buckets_are_discarded() {
        let index = SlimIndex::from_buckets([
            (String::from("x"), members(&["A"])),
            (String::from("y"), Members::new()),
        ]);

        assert_eq!(index.len(), 1);
        assert!(index.members("y").is_none());
    }

    #[test]
    fn test_strict_subset() {
        let index = SlimIndex::from_buckets([
            (String::from("a"), members(&["A"])),
            (String::from("b"), members(&["A", "B"])),
            (String::from("c"), members(&["A", "B"])),
            (String::from("d"), members(&["C"])),
        ]);

        assert!(index.is_strict_subset("a", "b"));
        assert!(!index.is_strict_subset("b", "a"));
        assert!(!index.is_strict_subset("b", "c"));
        assert!(!index.is_strict_subset("c", "b"));
        assert!(!index.is_strict_subset("a", "a"));
        assert!(!index.is_strict_subset("d", "b"));
        assert!(!index.is_strict_subset("a", "missing"));
    }
}
