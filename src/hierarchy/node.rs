//! The nested, serializable form of a hierarchy.

use std::collections::HashMap;

use serde::Deserialize;
use serde::Serialize;

use crate::hierarchy::aggregate::Aggregates;
use crate::hierarchy::assembly::Assembly;
use crate::hierarchy::index::Members;
use crate::hierarchy::index::SlimIndex;
use crate::hierarchy::sort_labels;

/// The prefix of every slim node identifier.
pub const ID_PREFIX: &str = "SLIM::";

/// The identifier of the synthetic root node.
pub const ROOT_ID: &str = "SLIM::ROOT";

/// The label of the synthetic root node.
pub const ROOT_LABEL: &str = "Cell types";

/// A node within a slim hierarchy.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Node {
    /// The unique identifier.
    id: String,

    /// The slim label.
    label: String,

    /// The terms directly within the slim (case-insensitively sorted).
    members: Vec<String>,

    /// The terms within the slim or any descendant (case-insensitively
    /// sorted).
    aggregate_members: Vec<String>,

    /// The child nodes (case-insensitively sorted by label).
    children: Vec<Node>,
}

impl Node {
    /// Gets the identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Gets the label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Gets the members.
    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// Gets the aggregate members.
    pub fn aggregate_members(&self) -> &[String] {
        &self.aggregate_members
    }

    /// Gets the children.
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Returns whether this is the synthetic root node.
    pub fn is_root(&self) -> bool {
        self.id == ROOT_ID
    }

    /// Returns an iterator over this node and all of its descendants in
    /// depth-first, pre-order.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Finds the first node (in pre-order) with the provided label.
    ///
    /// # Examples
    ///
    /// ```
    /// use encodelite::catalog::Record;
    /// use encodelite::hierarchy;
    ///
    /// let tree = hierarchy::build(vec![Record::new("A", "cell", ["x"])]);
    ///
    /// let node = tree.find("x").unwrap();
    /// assert_eq!(node.id(), "SLIM::x");
    /// assert!(tree.find("y").is_none());
    /// ```
    pub fn find(&self, label: &str) -> Option<&Node> {
        self.descendants().find(|node| node.label == label)
    }
}

/// A depth-first, pre-order iterator over a node and its descendants.
#[derive(Debug)]
pub struct Descendants<'a> {
    /// The nodes that remain to be visited.
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Converts a set of members into a case-insensitively sorted list.
fn sorted(members: &Members) -> Vec<String> {
    let mut members = members.iter().cloned().collect::<Vec<_>>();
    sort_labels(&mut members);
    members
}

/// Packs the forest into a nested tree beneath a synthetic root.
///
/// Nodes are built bottom-up in post-order, so no recursion is needed.
pub fn pack(index: &SlimIndex, assembly: &Assembly, aggregates: &Aggregates) -> Node {
    let mut built = HashMap::<&str, Node>::new();

    for slim in assembly.post_order() {
        let mut labels = assembly.children(slim).to_vec();
        sort_labels(&mut labels);

        let children = labels
            .iter()
            .filter_map(|label| built.remove(label.as_str()))
            .collect::<Vec<_>>();

        let node = Node {
            id: format!("{ID_PREFIX}{slim}"),
            label: slim.to_string(),
            members: index.members(slim).map(sorted).unwrap_or_default(),
            aggregate_members: aggregates.get(slim).map(sorted).unwrap_or_default(),
            children,
        };

        built.insert(slim, node);
    }

    let mut roots = assembly.roots().to_vec();
    sort_labels(&mut roots);

    Node {
        id: ROOT_ID.to_string(),
        label: ROOT_LABEL.to_string(),
        members: Vec::new(),
        aggregate_members: sorted(&aggregates.union()),
        children: roots
            .iter()
            .filter_map(|root| built.remove(root.as_str()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Record;
    use crate::hierarchy;

    #[test]
    fn test_serialization_shape() -> Result<(), Box<dyn std::error::Error>> {
        let tree = hierarchy::build(vec![Record::new("A", "cell", ["x"])]);
        let json = serde_json::to_string(&tree)?;

        assert_eq!(
            json,
            r#"{"id":"SLIM::ROOT","label":"Cell types","members":[],"aggregate_members":["A"],"children":[{"id":"SLIM::x","label":"x","members":["A"],"aggregate_members":["A"],"children":[]}]}"#
        );

        let parsed = serde_json::from_str::<Node>(&json)?;
        assert_eq!(parsed, tree);

        Ok(())
    }

    #[test]
    fn test_children_are_sorted_case_insensitively() {
        let tree = hierarchy::build(vec![
            Record::new("A", "cell", ["all", "beta"]),
            Record::new("B", "cell", ["all", "Alpha"]),
            Record::new("C", "cell", ["all", "gamma"]),
        ]);

        let all = tree.find("all").unwrap();
        let labels = all
            .children()
            .iter()
            .map(|node| node.label())
            .collect::<Vec<_>>();

        assert_eq!(labels, vec!["Alpha", "beta", "gamma"]);
        assert_eq!(all.members(), ["A", "B", "C"]);
    }

    #[test]
    fn test_descendants() {
        let tree = hierarchy::build(vec![
            Record::new("A", "cell", ["x", "y"]),
            Record::new("B", "cell", ["y"]),
            Record::new("C", "cell", ["z"]),
        ]);

        let labels = tree
            .descendants()
            .map(|node| node.label())
            .collect::<Vec<_>>();

        assert_eq!(labels, vec![ROOT_LABEL, "y", "x", "z"]);
        assert!(tree.is_root());
        assert!(!tree.children()[0].is_root());
    }
}
