//! Composition of user and item indexings into one flat index space.
//!
//! User nodes occupy `[0, |users|)` and item nodes occupy
//! `[|users|, |users| + |items|)`. Both indexings must be fully built before a
//! [`FlatIndexer`] is created; it only borrows them immutably.

use crate::error::{Result, SageError};
use crate::indexing::Indexing;
use crate::node::{node_namespace, GroupTags, NodeGroup, NodeId};

/// Maps nodes of either group into the concatenated user/item index range.
#[derive(Debug, Clone, Copy)]
pub struct FlatIndexer<'a> {
    tags: GroupTags,
    user: &'a Indexing,
    item: &'a Indexing,
}

impl<'a> FlatIndexer<'a> {
    /// Creates a composer over finished user and item indexings.
    pub fn new(tags: GroupTags, user: &'a Indexing, item: &'a Indexing) -> Self {
        Self { tags, user, item }
    }

    /// Returns the size of the flat index space.
    pub fn len(&self) -> usize {
        self.user.size() + self.item.size()
    }

    /// Returns `true` if both indexings are empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the range of flat indices occupied by `group`.
    pub fn range(&self, group: NodeGroup) -> std::ops::Range<usize> {
        match group {
            NodeGroup::User => 0..self.user.size(),
            NodeGroup::Item => self.user.size()..self.len(),
        }
    }

    /// Returns the flat index of `node`.
    ///
    /// # Errors
    ///
    /// Returns `SageError::UnknownGroup` if the node belongs to neither group,
    /// and `SageError::IndexMiss` if it is absent from its group's indexing.
    pub fn index(&self, node: NodeId) -> Result<usize> {
        let group = self.tags.require_group(node)?;
        let (indexing, offset) = match group {
            NodeGroup::User => (self.user, 0),
            NodeGroup::Item => (self.item, self.user.size()),
        };
        indexing
            .get(node)
            .map(|index| index + offset)
            .ok_or(SageError::IndexMiss {
                node,
                ns_id: node_namespace(node),
                group: group.as_str(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::make_node;

    fn user(v: u64) -> NodeId {
        make_node(0, v).unwrap()
    }

    fn item(v: u64) -> NodeId {
        make_node(1, v).unwrap()
    }

    #[test]
    fn test_users_before_items() {
        let users = Indexing::build([user(1), user(2)]);
        let items = Indexing::build([item(1), item(2), item(3)]);
        let flat = FlatIndexer::new(GroupTags::default(), &users, &items);

        assert_eq!(flat.len(), 5);
        assert_eq!(flat.index(user(1)).unwrap(), 0);
        assert_eq!(flat.index(user(2)).unwrap(), 1);
        assert_eq!(flat.index(item(1)).unwrap(), 2);
        assert_eq!(flat.index(item(3)).unwrap(), 4);
        assert_eq!(flat.range(NodeGroup::User), 0..2);
        assert_eq!(flat.range(NodeGroup::Item), 2..5);
    }

    #[test]
    fn test_index_falls_in_group_range() {
        let users = Indexing::build((0..10).map(user));
        let items = Indexing::build((0..7).map(item));
        let flat = FlatIndexer::new(GroupTags::default(), &users, &items);

        for v in 0..10 {
            assert!(flat.range(NodeGroup::User).contains(&flat.index(user(v)).unwrap()));
        }
        for v in 0..7 {
            assert!(flat.range(NodeGroup::Item).contains(&flat.index(item(v)).unwrap()));
        }
    }

    #[test]
    fn test_missing_node_is_error() {
        let users = Indexing::build([user(1)]);
        let items = Indexing::new();
        let flat = FlatIndexer::new(GroupTags::default(), &users, &items);

        assert_eq!(
            flat.index(item(4)),
            Err(SageError::IndexMiss {
                node: item(4),
                ns_id: 1,
                group: "item",
            })
        );
    }

    #[test]
    fn test_unknown_group_is_error() {
        let users = Indexing::new();
        let items = Indexing::new();
        let flat = FlatIndexer::new(GroupTags::default(), &users, &items);
        let stray = make_node(6, 1).unwrap();
        assert!(matches!(
            flat.index(stray),
            Err(SageError::UnknownGroup { ns_id: 6, .. })
        ));
    }
}
