//! Structural self-check of a tree
//!
//! Every check is independent and contributes one bit when violated. The
//! result is empty when the tree is consistent.

use crate::tree::{NodeId, Tree};
use serde::Serialize;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Bitmask of violated invariants
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct VerifyFlags(u64);

impl VerifyFlags {
    /// No tree was given
    pub const NULL_TREE: Self = Self(1 << 0);
    /// Node count is zero but the enumeration list is not empty, or the reverse
    pub const HEAD_COUNT_MISMATCH: Self = Self(1 << 1);
    /// Length of the enumeration list differs from the node count
    pub const LIST_LENGTH_MISMATCH: Self = Self(1 << 2);
    /// A listed or linked node does not resolve to a stored element
    pub const MISSING_ELEMENT: Self = Self(1 << 3);
    /// `prev` and `next` of neighbouring nodes disagree
    pub const BROKEN_LIST_LINKS: Self = Self(1 << 4);
    /// A child does not point back at its parent, or the root has a parent
    pub const PARENT_LINK_MISMATCH: Self = Self(1 << 5);
    /// An attached node's level is not its parent's level plus one
    pub const LEVEL_MISMATCH: Self = Self(1 << 6);

    const MESSAGES: [(Self, &'static str); 7] = [
        (Self::NULL_TREE, "NULL_TREE"),
        (Self::HEAD_COUNT_MISMATCH, "WRONG_HEAD_OR_NODES_COUNT"),
        (Self::LIST_LENGTH_MISMATCH, "INVALID_NODES_COUNT_ACCORDING_TO_LIST"),
        (Self::MISSING_ELEMENT, "SOME_NODES_HAVE_NO_ELEMENT"),
        (Self::BROKEN_LIST_LINKS, "BROKEN_PREV_NEXT_LINKS"),
        (Self::PARENT_LINK_MISMATCH, "CHILD_PARENT_LINK_MISMATCH"),
        (Self::LEVEL_MISMATCH, "STALE_NODE_LEVEL"),
    ];

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(&self) -> u64 {
        self.0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub const fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Messages of every set flag, in bit order
    pub fn messages(&self) -> Vec<&'static str> {
        Self::MESSAGES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, message)| *message)
            .collect()
    }
}

impl BitOr for VerifyFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for VerifyFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for VerifyFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tree verification result: <{}>", self.0)?;
        for message in self.messages() {
            write!(f, "\n----> {}", message)?;
        }
        Ok(())
    }
}

/// Run every check against `tree`
///
/// Cost is O(n): the enumeration list and the attached shape are walked once
/// each, and both walks are bounded by the node count.
pub fn verify<T>(tree: Option<&Tree<T>>) -> VerifyFlags {
    let Some(tree) = tree else {
        return VerifyFlags::NULL_TREE;
    };

    let mut flags = VerifyFlags::empty();
    if (tree.len == 0) != tree.head.is_none() {
        flags |= VerifyFlags::HEAD_COUNT_MISMATCH;
    }
    flags |= check_enumeration(tree);
    flags |= check_shape(tree);
    flags
}

fn check_enumeration<T>(tree: &Tree<T>) -> VerifyFlags {
    let mut flags = VerifyFlags::empty();
    let mut count = 0;
    let mut prev: Option<NodeId> = None;
    let mut current = tree.head;

    while let Some(id) = current {
        if count > tree.len {
            break;
        }
        count += 1;

        let Some(node) = tree.slab.get(id.0) else {
            flags |= VerifyFlags::MISSING_ELEMENT;
            break;
        };
        if node.prev != prev {
            flags |= VerifyFlags::BROKEN_LIST_LINKS;
        }
        prev = Some(id);
        current = node.next;
    }

    if count != tree.len {
        flags |= VerifyFlags::LIST_LENGTH_MISMATCH;
    }
    flags
}

fn check_shape<T>(tree: &Tree<T>) -> VerifyFlags {
    let mut flags = VerifyFlags::empty();
    let Some(root) = tree.root else {
        return flags;
    };
    let Some(root_node) = tree.slab.get(root.0) else {
        return VerifyFlags::MISSING_ELEMENT;
    };
    if root_node.parent.is_some() {
        flags |= VerifyFlags::PARENT_LINK_MISMATCH;
    }
    if root_node.level != 0 {
        flags |= VerifyFlags::LEVEL_MISMATCH;
    }

    let mut visited = 0;
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        visited += 1;
        if visited > tree.len {
            // More attached nodes than live nodes: the shape has a cycle
            flags |= VerifyFlags::PARENT_LINK_MISMATCH;
            break;
        }
        let Some(node) = tree.slab.get(id.0) else {
            continue;
        };

        for child in [node.left, node.right].into_iter().flatten() {
            match tree.slab.get(child.0) {
                None => flags |= VerifyFlags::MISSING_ELEMENT,
                Some(child_node) => {
                    if child_node.parent != Some(id) {
                        flags |= VerifyFlags::PARENT_LINK_MISMATCH;
                    }
                    if child_node.level != node.level + 1 {
                        flags |= VerifyFlags::LEVEL_MISMATCH;
                    }
                    stack.push(child);
                }
            }
        }
    }

    flags
}
