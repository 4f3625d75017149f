//! Aggregation of members up through the forest.

use std::collections::HashMap;

use crate::hierarchy::assembly::Assembly;
use crate::hierarchy::index::Members;
use crate::hierarchy::index::SlimIndex;

/// The aggregate members of every slim: its own members plus the members of
/// all of its descendants.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Aggregates {
    /// The memoized aggregate for each slim.
    inner: HashMap<String, Members>,
}

impl Aggregates {
    /// Gets the aggregate members of a slim.
    pub fn get(&self, slim: &str) -> Option<&Members> {
        self.inner.get(slim)
    }

    /// Computes the union of every aggregate.
    pub fn union(&self) -> Members {
        self.inner.values().flatten().cloned().collect()
    }
}

/// Computes the aggregate members of every slim within the forest.
///
/// Slims are resolved in post-order so that each child is complete before its
/// parent reads it. Slims that are not reachable from any root (which cannot
/// happen for a consistent forest) are resolved from their own subtrees
/// afterwards.
pub fn aggregate(index: &SlimIndex, assembly: &Assembly) -> Aggregates {
    let mut inner = HashMap::<String, Members>::new();

    for slim in assembly.post_order() {
        resolve(index, assembly, slim, &mut inner);
    }

    for slim in assembly.slims() {
        if !inner.contains_key(slim) {
            resolve(index, assembly, slim, &mut inner);
        }
    }

    Aggregates { inner }
}

/// Resolves the aggregate for a single slim, computing any unresolved
/// descendants first.
fn resolve(
    index: &SlimIndex,
    assembly: &Assembly,
    slim: &str,
    memo: &mut HashMap<String, Members>,
) {
    let mut stack = vec![(slim, false)];

    while let Some((current, expanded)) = stack.pop() {
        if memo.contains_key(current) {
            continue;
        }

        if !expanded {
            stack.push((current, true));

            for child in assembly.children(current) {
                // An expanded entry still on the stack is an ancestor.
                if !memo.contains_key(child.as_str())
                    && !stack
                        .iter()
                        .any(|(pending, expanded)| *expanded && *pending == child.as_str())
                {
                    stack.push((child.as_str(), false));
                }
            }

            continue;
        }

        let mut members = index.members(current).cloned().unwrap_or_default();

        for child in assembly.children(current) {
            if let Some(aggregate) = memo.get(child.as_str()) {
                members.extend(aggregate.iter().cloned());
            }
        }

        memo.insert(current.to_string(), members);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::hierarchy::assembly;
    use crate::hierarchy::order;

    fn set(names: &[&str]) -> Members {
        names.iter().map(|name| name.to_string()).collect()
    }

    fn index(buckets: &[(&str, &[&str])]) -> SlimIndex {
        SlimIndex::from_buckets(
            buckets
                .iter()
                .map(|(slim, members)| (slim.to_string(), set(members))),
        )
    }

    #[test]
    fn test_aggregates() {
        let index = index(&[
            ("leaf1", &["A"]),
            ("leaf2", &["B"]),
            ("mid", &["A", "B"]),
            ("top", &["A", "B", "C"]),
            ("lone", &["Z"]),
        ]);

        let assembly = assembly::assemble(&index, &order::reconstruct(&index));
        let aggregates = aggregate(&index, &assembly);

        assert_eq!(aggregates.get("leaf1"), Some(&set(&["A"])));
        assert_eq!(aggregates.get("mid"), Some(&set(&["A", "B"])));
        assert_eq!(aggregates.get("top"), Some(&set(&["A", "B", "C"])));
        assert_eq!(aggregates.get("lone"), Some(&set(&["Z"])));
        assert_eq!(aggregates.union(), set(&["A", "B", "C", "Z"]));
    }

    #[test]
    fn test_aggregate_includes_descendants_members() {
        // A hand-built parent assignment where a child carries a member its
        // parent does not.
        let index = index(&[("parent", &["A"]), ("child", &["B"])]);
        let parents = order::Parents::from_iter([
            (String::from("parent"), None),
            (String::from("child"), Some(String::from("parent"))),
        ]);

        let assembly = assembly::assemble(&index, &parents);
        let aggregates = aggregate(&index, &assembly);

        assert_eq!(aggregates.get("parent"), Some(&set(&["A", "B"])));
        assert_eq!(aggregates.get("child"), Some(&set(&["B"])));
    }

    #[test]
    fn test_deep_chain() {
        let depth = 2_000;
        let buckets = (0..depth)
            .map(|i| (format!("s{i:05}"), BTreeSet::from([format!("T{i}")])))
            .collect::<Vec<_>>();

        let index = SlimIndex::from_buckets(buckets);
        let parents = (0..depth)
            .map(|i| {
                let parent = (i + 1 < depth).then(|| format!("s{:05}", i + 1));
                (format!("s{i:05}"), parent)
            })
            .collect::<order::Parents>();

        let assembly = assembly::assemble(&index, &parents);
        let aggregates = aggregate(&index, &assembly);

        assert_eq!(assembly.roots(), [format!("s{:05}", depth - 1)]);
        assert_eq!(aggregates.get("s00000").map(|m| m.len()), Some(1));
        assert_eq!(
            aggregates.get(&format!("s{:05}", depth - 1)).map(|m| m.len()),
            Some(depth)
        );
    }

    #[test]
    fn test_empty() {
        let index = SlimIndex::default();
        let assembly = assembly::assemble(&index, &order::reconstruct(&index));
        let aggregates = aggregate(&index, &assembly);

        assert!(aggregates.union().is_empty());
    }
}
