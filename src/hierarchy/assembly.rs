//! Assembly of parent assignments into a forest.

use std::collections::BTreeMap;
use std::collections::HashSet;

use tracing::warn;

use crate::hierarchy::compare_labels;
use crate::hierarchy::index::SlimIndex;
use crate::hierarchy::order::Parents;

/// A forest of slims.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Assembly {
    /// The children of each slim in accumulation order.
    ///
    /// Every slim in the index has an entry, even if it has no children.
    children: BTreeMap<String, Vec<String>>,

    /// The root slims in accumulation order.
    roots: Vec<String>,
}

impl Assembly {
    /// Gets the children of a slim.
    pub fn children(&self, slim: &str) -> &[String] {
        self.children
            .get(slim)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Gets the root slims.
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    /// Returns an iterator over every slim in the forest.
    pub fn slims(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }

    /// Returns the slims reachable from the roots in post-order (every child
    /// appears before its parent).
    ///
    /// The traversal uses an explicit stack, so arbitrarily deep chains are
    /// supported. Each slim is visited at most once.
    pub fn post_order(&self) -> Vec<&str> {
        let mut order = Vec::new();
        let mut visited = HashSet::<&str>::new();
        let mut stack = self
            .roots
            .iter()
            .rev()
            .map(|root| (root.as_str(), false))
            .collect::<Vec<_>>();

        while let Some((slim, expanded)) = stack.pop() {
            if expanded {
                order.push(slim);
                continue;
            }

            if !visited.insert(slim) {
                continue;
            }

            stack.push((slim, true));

            for child in self.children(slim).iter().rev() {
                if !visited.contains(child.as_str()) {
                    stack.push((child.as_str(), false));
                }
            }
        }

        order
    }
}

/// Assembles a forest from the slims within an index and their parents.
pub fn assemble(index: &SlimIndex, parents: &Parents) -> Assembly {
    let mut children = index
        .slims()
        .map(|slim| (slim.to_string(), Vec::new()))
        .collect::<BTreeMap<_, _>>();

    for (child, parent) in parents.iter() {
        let parent = match parent {
            Some(parent) if parent != child => parent,
            _ => continue,
        };

        match children.get_mut(parent) {
            Some(list) => list.push(child.to_string()),
            None => warn!("hierarchy: parent `{parent}` of `{child}` is not a known slim"),
        }
    }

    let claimed = children
        .values()
        .flatten()
        .map(String::as_str)
        .collect::<HashSet<_>>();

    let mut roots = index
        .slims()
        .filter(|slim| parents.parent(slim).is_none() && !claimed.contains(slim))
        .map(String::from)
        .collect::<Vec<_>>();

    if roots.is_empty() {
        let fallback = index.slims().min_by(|a, b| {
            index
                .size(b)
                .cmp(&index.size(a))
                .then_with(|| compare_labels(a, b))
        });

        if let Some(slim) = fallback {
            warn!("hierarchy: no natural roots found; falling back to `{slim}`");
            roots.push(slim.to_string());
        }
    }

    Assembly { children, roots }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::hierarchy::order;

    fn index(buckets: &[(&str, &[&str])]) -> SlimIndex {
        SlimIndex::from_buckets(buckets.iter().map(|(slim, members)| {
            (
                slim.to_string(),
                members
                    .iter()
                    .map(|member| member.to_string())
                    .collect::<BTreeSet<_>>(),
            )
        }))
    }

    #[test]
    fn test_assembly() {
        let index = index(&[
            ("leaf1", &["A"]),
            ("leaf2", &["B"]),
            ("mid", &["A", "B"]),
            ("top", &["A", "B", "C"]),
            ("lone", &["Z"]),
        ]);

        let assembly = assemble(&index, &order::reconstruct(&index));

        assert_eq!(assembly.roots(), ["lone", "top"]);
        assert_eq!(assembly.children("top"), ["mid"]);
        assert_eq!(assembly.children("mid"), ["leaf1", "leaf2"]);
        assert!(assembly.children("leaf1").is_empty());
        assert!(assembly.children("unknown").is_empty());
        assert_eq!(
            assembly.post_order(),
            vec!["lone", "leaf1", "leaf2", "mid", "top"]
        );
    }

    #[test]
    fn test_empty() {
        let index = SlimIndex::default();
        let assembly = assemble(&index, &order::reconstruct(&index));

        assert!(assembly.roots().is_empty());
        assert!(assembly.post_order().is_empty());
    }

    #[test]
    fn test_fallback_root() {
        let index = index(&[("a", &["A"]), ("b", &["A", "B"]), ("B2", &["C", "D"])]);

        // An inconsistent parent assignment where every slim is claimed.
        let parents = Parents::from_iter([
            (String::from("a"), Some(String::from("b"))),
            (String::from("b"), Some(String::from("a"))),
            (String::from("B2"), Some(String::from("a"))),
        ]);

        let assembly = assemble(&index, &parents);

        // `b` and `B2` are the largest; `b` sorts first case-insensitively.
        assert_eq!(assembly.roots(), ["b"]);
    }

    #[test]
    fn test_self_parent_is_ignored() {
        let index = index(&[("a", &["A"])]);
        let parents = Parents::from_iter([(String::from("a"), Some(String::from("a")))]);

        let assembly = assemble(&index, &parents);

        assert!(assembly.children("a").is_empty());
        // `a` has a parent, so no natural roots exist.
        assert_eq!(assembly.roots(), ["a"]);
    }

    #[test]
    fn test_post_order_tolerates_cycles() {
        let index = index(&[("a", &["A"]), ("b", &["A", "B"])]);
        let parents = Parents::from_iter([
            (String::from("a"), Some(String::from("b"))),
            (String::from("b"), Some(String::from("a"))),
        ]);

        let assembly = assemble(&index, &parents);
        let order = assembly.post_order();

        assert_eq!(order.len(), 2);
        assert_eq!(order.last(), Some(&"b"));
    }
}
