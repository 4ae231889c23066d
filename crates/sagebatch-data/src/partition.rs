//! Partitioning of raw nodes into user and item groups.

use tracing::error;

use sagebatch_core::{node_namespace, GroupTags, NodeGroup, NodeId};

/// Appends every node to the list of its group.
///
/// Nodes whose namespace tag matches neither group are logged and left out
/// of both lists. Input order is preserved within each group.
///
/// # Returns
///
/// The number of nodes that could not be classified.
///
/// # Example
///
/// ```
/// use sagebatch_core::{make_node, GroupTags};
/// use sagebatch_data::partition::partition_nodes;
///
/// let u = make_node(0, 1).unwrap();
/// let i = make_node(1, 1).unwrap();
/// let stray = make_node(5, 1).unwrap();
///
/// let (mut users, mut items) = (Vec::new(), Vec::new());
/// let invalid = partition_nodes(&[u, stray, i], GroupTags::default(), &mut users, &mut items);
///
/// assert_eq!(users, vec![u]);
/// assert_eq!(items, vec![i]);
/// assert_eq!(invalid, 1);
/// ```
pub fn partition_nodes(
    nodes: &[NodeId],
    tags: GroupTags,
    user_nodes: &mut Vec<NodeId>,
    item_nodes: &mut Vec<NodeId>,
) -> usize {
    let mut invalid = 0;
    for &node in nodes {
        match tags.group_of(node) {
            Some(NodeGroup::User) => user_nodes.push(node),
            Some(NodeGroup::Item) => item_nodes.push(node),
            None => {
                invalid += 1;
                error!(
                    "Invalid node: {} with ns_id: {}, expect {} or {}.",
                    node,
                    node_namespace(node),
                    tags.user,
                    tags.item
                );
            }
        }
    }
    invalid
}

#[cfg(test)]
mod tests {
    use super::*;
    use sagebatch_core::make_node;

    #[test]
    fn test_partition_accumulates() {
        let tags = GroupTags::new(3, 4);
        let u1 = make_node(3, 1).unwrap();
        let u2 = make_node(3, 2).unwrap();
        let i1 = make_node(4, 1).unwrap();

        let (mut users, mut items) = (Vec::new(), Vec::new());
        assert_eq!(partition_nodes(&[u1, i1], tags, &mut users, &mut items), 0);
        assert_eq!(partition_nodes(&[i1, u2, u1], tags, &mut users, &mut items), 0);

        assert_eq!(users, vec![u1, u2, u1]);
        assert_eq!(items, vec![i1, i1]);
    }

    #[test]
    fn test_unknown_tags_are_excluded() {
        let tags = GroupTags::default();
        let nodes: Vec<NodeId> = (2..6).map(|ns| make_node(ns, 9).unwrap()).collect();

        let (mut users, mut items) = (Vec::new(), Vec::new());
        let invalid = partition_nodes(&nodes, tags, &mut users, &mut items);

        assert_eq!(invalid, 4);
        assert!(users.is_empty());
        assert!(items.is_empty());
    }

    #[test]
    fn test_empty_input() {
        let (mut users, mut items) = (Vec::new(), Vec::new());
        assert_eq!(partition_nodes(&[], GroupTags::default(), &mut users, &mut items), 0);
        assert!(users.is_empty() && items.is_empty());
    }
}
