//! Deep copies of subtrees

use super::node::{NodeId, Position, Side};
use super::Tree;
use crate::error::{Error, Result};
use tracing::{debug, warn};

/// One cloned element of a subtree, in pre-order
struct Snapshot<T> {
    value: T,
    /// Index of the parent entry and the side this entry hangs on
    parent: Option<(usize, Side)>,
}

impl<T: Clone> Tree<T> {
    /// Clone the elements and shape of the subtree under `start`
    fn snapshot(&self, start: NodeId) -> Result<Vec<Snapshot<T>>> {
        let mut entries = Vec::new();
        let mut stack = vec![(start, None)];

        while let Some((id, parent)) = stack.pop() {
            let node = self.node(id)?;
            let index = entries.len();
            entries.push(Snapshot {
                value: node.value.clone(),
                parent,
            });
            stack.extend(node.right.map(|right| (right, Some((index, Side::Right)))));
            stack.extend(node.left.map(|left| (left, Some((index, Side::Left)))));
        }

        Ok(entries)
    }

    /// Rebuild a snapshot with fresh nodes and attach it at `position`
    ///
    /// The copy is built loose and only attached once complete; if an
    /// allocation fails, the nodes created so far are deleted again and the
    /// cached depth is restored.
    fn graft(&mut self, position: Position, entries: Vec<Snapshot<T>>) -> Result<NodeId> {
        let mut created: Vec<NodeId> = Vec::with_capacity(entries.len());
        let depth = self.depth;

        for entry in entries {
            if let Err(e) = self.graft_entry(&mut created, entry) {
                if let Some(&copy_root) = created.first() {
                    if let Err(rollback) = self.delete_subtree_nodes(copy_root) {
                        warn!(error = %rollback, "Failed to roll back partial copy");
                    }
                }
                self.depth = depth;
                return Err(e);
            }
        }

        let Some(&copy_root) = created.first() else {
            return Err(Error::NoSuchChild);
        };
        let base_level = match position.parent() {
            Some(parent) => self.node(parent)?.level + 1,
            None => 0,
        };
        self.link(position, copy_root)?;
        self.recompute_levels(Some(copy_root), base_level)?;

        Ok(copy_root)
    }

    fn graft_entry(&mut self, created: &mut Vec<NodeId>, entry: Snapshot<T>) -> Result<()> {
        let id = match entry.parent {
            None => self.new_node(None, entry.value)?,
            Some((index, side)) => {
                let parent = created[index];
                let id = self.new_node(Some(parent), entry.value)?;
                *self.node_mut(parent)?.child_mut(side) = Some(id);
                id
            }
        };
        created.push(id);
        Ok(())
    }

    fn prepare_copy(&self, position: Position) -> Result<()> {
        self.self_check("copy_subtree")?;
        if let Some(parent) = position.parent() {
            self.node(parent)?;
        }
        self.ensure_vacant(position)
    }

    /// Deep-copy the subtree under `src_node` of `source` into `position`
    ///
    /// Fresh nodes are allocated for every element; the source is not touched.
    /// Returns the root of the copy.
    pub fn copy_subtree(
        &mut self,
        position: Position,
        source: &Tree<T>,
        src_node: NodeId,
    ) -> Result<NodeId> {
        self.prepare_copy(position)?;
        let entries = source.snapshot(src_node)?;
        let count = entries.len();

        let copy_root = self.graft(position, entries)?;
        debug!(src = %src_node, copy = %copy_root, ?position, count, "Copied subtree");
        Ok(copy_root)
    }

    /// Deep-copy a subtree of this same tree into `position`
    ///
    /// The source is captured before any node is created, so the target slot
    /// may lie inside the copied subtree.
    pub fn copy_subtree_within(&mut self, position: Position, src_node: NodeId) -> Result<NodeId> {
        self.prepare_copy(position)?;
        let entries = self.snapshot(src_node)?;
        let count = entries.len();

        let copy_root = self.graft(position, entries)?;
        debug!(
            src = %src_node,
            copy = %copy_root,
            ?position,
            count,
            "Copied subtree in place"
        );
        Ok(copy_root)
    }

    pub fn copy_subtree_into_left(
        &mut self,
        dest: NodeId,
        source: &Tree<T>,
        src_node: NodeId,
    ) -> Result<NodeId> {
        self.copy_subtree(Position::Left(dest), source, src_node)
    }

    pub fn copy_subtree_into_right(
        &mut self,
        dest: NodeId,
        source: &Tree<T>,
        src_node: NodeId,
    ) -> Result<NodeId> {
        self.copy_subtree(Position::Right(dest), source, src_node)
    }

    /// Full copy of the attached tree with the same configuration
    ///
    /// Loose nodes are not copied.
    pub fn try_clone(&self) -> Result<Tree<T>> {
        let mut copy = Tree::new(self.config.clone())?;
        copy.printer = self.printer;

        if let Some(root) = self.root {
            let entries = self.snapshot(root)?;
            copy.graft(Position::Root, entries)?;
        }
        Ok(copy)
    }
}
