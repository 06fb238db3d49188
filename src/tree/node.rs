//! Tree nodes and node handles

use crate::slab::BlockId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle to a node of a [`Tree`](super::Tree)
///
/// A thin wrapper over the slab block that stores the node. Handles are
/// only meaningful for the tree that created them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub(crate) BlockId);

impl NodeId {
    /// Underlying slab block
    pub fn block(&self) -> BlockId {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node[{}]", self.0)
    }
}

/// Child side of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

/// A slot a subtree can be attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
    /// The tree's root slot
    Root,
    /// Left child slot of the given node
    Left(NodeId),
    /// Right child slot of the given node
    Right(NodeId),
}

impl Position {
    /// Build a child position from a parent and a side
    pub fn child(parent: NodeId, side: Side) -> Self {
        match side {
            Side::Left => Position::Left(parent),
            Side::Right => Position::Right(parent),
        }
    }

    /// Parent node owning this slot, `None` for the root slot
    pub fn parent(&self) -> Option<NodeId> {
        match self {
            Position::Root => None,
            Position::Left(node) | Position::Right(node) => Some(*node),
        }
    }
}

/// Attachment state of a live node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Reachable from a parent slot or the root slot
    Attached,
    /// Created without a parent and not hung onto anything yet
    Unattached,
}

/// A node record stored in a slab block
///
/// Besides the tree links, every node sits in the tree's enumeration list
/// through `prev`/`next`, independently of the tree shape.
#[derive(Debug)]
pub struct Node<T> {
    pub(crate) value: T,
    pub(crate) left: Option<NodeId>,
    pub(crate) right: Option<NodeId>,
    pub(crate) parent: Option<NodeId>,
    /// Distance from the root; only refreshed by level recomputation
    pub(crate) level: usize,
    pub(crate) prev: Option<NodeId>,
    pub(crate) next: Option<NodeId>,
}

impl<T> Node<T> {
    pub(crate) fn new(value: T, parent: Option<NodeId>, level: usize) -> Self {
        Self {
            value,
            left: None,
            right: None,
            parent,
            level,
            prev: None,
            next: None,
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn left(&self) -> Option<NodeId> {
        self.left
    }

    pub fn right(&self) -> Option<NodeId> {
        self.right
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn level(&self) -> usize {
        self.level
    }

    /// Previous node in the enumeration list
    pub fn prev(&self) -> Option<NodeId> {
        self.prev
    }

    /// Next node in the enumeration list
    pub fn next(&self) -> Option<NodeId> {
        self.next
    }

    pub fn child(&self, side: Side) -> Option<NodeId> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    pub(crate) fn child_mut(&mut self, side: Side) -> &mut Option<NodeId> {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    /// Check if the node has no children
    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_children() {
        let child = NodeId(BlockId::new(0, 1, 0));
        let mut node = Node::new(10, None, 0);
        assert!(node.is_leaf());

        *node.child_mut(Side::Right) = Some(child);
        assert_eq!(node.child(Side::Right), Some(child));
        assert_eq!(node.right(), Some(child));
        assert!(!node.is_leaf());
    }

    #[test]
    fn test_position_parent() {
        let id = NodeId(BlockId::new(1, 2, 3));
        assert_eq!(Position::Root.parent(), None);
        assert_eq!(Position::child(id, Side::Left), Position::Left(id));
        assert_eq!(Position::Right(id).parent(), Some(id));
        assert_eq!(id.to_string(), "node[1:2#3]");
    }
}
