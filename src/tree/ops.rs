//! Insertion, deletion and attachment of loose nodes

use super::node::{NodeId, Position, Side};
use super::Tree;
use crate::error::{Error, Result};
use tracing::{debug, warn};

impl<T> Tree<T> {
    /// Fail with the matching occupied-slot error if `position` is taken
    pub(crate) fn ensure_vacant(&self, position: Position) -> Result<()> {
        let err = match position {
            Position::Root => Error::RootAlreadyExists,
            Position::Left(_) => Error::LeftChildOccupied,
            Position::Right(_) => Error::RightChildOccupied,
        };

        if self.occupant(position)?.is_some() {
            warn!(?position, "Slot is already occupied");
            return Err(err);
        }
        Ok(())
    }

    /// Store `id` in `position` and point its parent link back
    pub(crate) fn link(&mut self, position: Position, id: NodeId) -> Result<()> {
        let parent = position.parent();
        match position {
            Position::Root => self.root = Some(id),
            Position::Left(p) => self.node_mut(p)?.left = Some(id),
            Position::Right(p) => self.node_mut(p)?.right = Some(id),
        }
        self.node_mut(id)?.parent = parent;
        Ok(())
    }

    /// Clear whichever slot currently holds `id`
    pub(crate) fn detach(&mut self, id: NodeId) -> Result<()> {
        let parent = self.node_mut(id)?.parent.take();

        match parent {
            Some(parent) => {
                let parent = self.node_mut(parent)?;
                if parent.left == Some(id) {
                    parent.left = None;
                } else if parent.right == Some(id) {
                    parent.right = None;
                }
            }
            None if self.root == Some(id) => self.root = None,
            None => {}
        }
        Ok(())
    }

    /// Insert a new node into an empty slot
    pub fn insert_at(&mut self, position: Position, value: T) -> Result<NodeId> {
        self.self_check("insert")?;
        if let Some(parent) = position.parent() {
            self.node(parent)?;
        }
        self.ensure_vacant(position)?;

        let id = self.new_node(position.parent(), value)?;
        self.link(position, id)?;

        debug!(node = %id, ?position, len = self.len, "Inserted node");
        Ok(id)
    }

    /// Insert the root node of an empty tree
    pub fn insert_root(&mut self, value: T) -> Result<NodeId> {
        self.insert_at(Position::Root, value)
    }

    /// Insert a new node as the left child of `node`
    pub fn insert_left(&mut self, node: NodeId, value: T) -> Result<NodeId> {
        self.insert_at(Position::Left(node), value)
    }

    /// Insert a new node as the right child of `node`
    pub fn insert_right(&mut self, node: NodeId, value: T) -> Result<NodeId> {
        self.insert_at(Position::Right(node), value)
    }

    /// Delete a child of `node` if it is a leaf
    ///
    /// Never cascades: a child with descendants is refused with `NotALeaf`.
    pub fn delete_child(&mut self, node: NodeId, side: Side) -> Result<()> {
        self.self_check("delete_child")?;

        let child = self.node(node)?.child(side).ok_or_else(|| {
            warn!(node = %node, ?side, "Requested deletion of an empty slot");
            Error::NoSuchChild
        })?;
        if !self.node(child)?.is_leaf() {
            warn!(node = %node, child = %child, "Refusing to delete a non-leaf child");
            return Err(Error::NotALeaf);
        }

        self.delete_node(child)
    }

    pub fn delete_left_child(&mut self, node: NodeId) -> Result<()> {
        self.delete_child(node, Side::Left)
    }

    pub fn delete_right_child(&mut self, node: NodeId) -> Result<()> {
        self.delete_child(node, Side::Right)
    }

    /// Delete `node` and all of its descendants
    ///
    /// Children go before their parent. The slot that held `node` is cleared
    /// as part of deleting `node` itself. Returns the number of deleted nodes.
    pub fn delete_subtree(&mut self, node: NodeId) -> Result<usize> {
        self.self_check("delete_subtree")?;
        let deleted = self.delete_subtree_nodes(node)?;
        debug!(node = %node, deleted, len = self.len, "Deleted subtree");
        Ok(deleted)
    }

    /// Delete the whole attached tree; loose nodes survive
    pub fn delete_root(&mut self) -> Result<usize> {
        self.self_check("delete_root")?;
        match self.root {
            Some(root) => self.delete_subtree_nodes(root),
            None => Err(Error::NoSuchChild),
        }
    }

    /// Post-order deletion without the self-check
    ///
    /// Stops at the first failing node and leaves the rest in place.
    pub(crate) fn delete_subtree_nodes(&mut self, node: NodeId) -> Result<usize> {
        let order = self.postorder(node)?;
        for id in &order {
            self.delete_node(*id)?;
        }
        Ok(order.len())
    }

    /// Attach a loose node (and whatever hangs below it) at `position`
    ///
    /// Only the levels of the attached subtree are recomputed.
    pub fn hang_loose(&mut self, position: Position, loose: NodeId) -> Result<()> {
        self.self_check("hang_loose")?;

        if self.node(loose)?.parent.is_some() || self.root == Some(loose) {
            warn!(node = %loose, "Node is already attached");
            return Err(Error::NotLoose(loose));
        }
        let base_level = match position.parent() {
            Some(parent) => {
                if self.is_in_subtree(parent, loose)? {
                    return Err(Error::MigrationCycle);
                }
                self.node(parent)?.level + 1
            }
            None => 0,
        };
        self.ensure_vacant(position)?;

        self.link(position, loose)?;
        self.recompute_levels(Some(loose), base_level)?;

        debug!(node = %loose, ?position, "Hung loose node");
        Ok(())
    }

    pub fn hang_loose_at_left(&mut self, loose: NodeId, parent: NodeId) -> Result<()> {
        self.hang_loose(Position::Left(parent), loose)
    }

    pub fn hang_loose_at_right(&mut self, loose: NodeId, parent: NodeId) -> Result<()> {
        self.hang_loose(Position::Right(parent), loose)
    }

    pub fn hang_loose_as_root(&mut self, loose: NodeId) -> Result<()> {
        self.hang_loose(Position::Root, loose)
    }
}
