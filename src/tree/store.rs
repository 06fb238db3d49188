//! Node store: node creation, destruction and the enumeration list

use super::node::{Node, NodeId};
use super::Tree;
use crate::error::Result;
use tracing::{debug, info, warn};

impl<T> Tree<T> {
    /// Allocate a node and push it onto the front of the enumeration list
    ///
    /// The node records `parent` and its level, but the parent's child slot
    /// is left for the caller to link.
    pub(crate) fn new_node(&mut self, parent: Option<NodeId>, value: T) -> Result<NodeId> {
        let level = match parent {
            Some(parent) => self.node(parent)?.level + 1,
            None => 0,
        };

        let mut node = Node::new(value, parent, level);
        node.next = self.head;
        let id = NodeId(self.slab.allocate(node)?);

        if let Some(old_head) = self.head {
            self.node_mut(old_head)?.prev = Some(id);
        }
        self.head = Some(id);
        self.len += 1;
        self.depth = self.depth.max(level);

        Ok(id)
    }

    /// Destroy a single node
    ///
    /// Clears the parent's slot (or the root slot) that points at the node,
    /// orphans its children, unlinks it from the enumeration list and
    /// recycles its block. The element is dropped last.
    pub(crate) fn delete_node(&mut self, id: NodeId) -> Result<()> {
        let (parent, left, right, prev, next) = {
            let node = self.node(id)?;
            (node.parent, node.left, node.right, node.prev, node.next)
        };

        if let Some(parent) = parent.and_then(|p| self.slab.get_mut(p.0)) {
            if parent.left == Some(id) {
                parent.left = None;
            } else if parent.right == Some(id) {
                parent.right = None;
            }
        }
        if self.root == Some(id) {
            self.root = None;
            self.depth = 0;
        }

        for child in [left, right].into_iter().flatten() {
            if let Some(child) = self.slab.get_mut(child.0) {
                child.parent = None;
            }
        }

        match prev {
            Some(prev) => self.node_mut(prev)?.next = next,
            None => self.head = next,
        }
        if let Some(next) = next {
            self.node_mut(next)?.prev = prev;
        }

        let node = self.slab.release(id.0)?;
        self.len -= 1;
        drop(node);

        debug!(node = %id, remaining = self.len, "Deleted node");
        Ok(())
    }

    /// Create a node that is not attached anywhere yet
    ///
    /// The node is enumerated and destroyed with the tree, but stays out of
    /// every walk from the root until it is hung with `hang_loose`.
    pub fn create_loose(&mut self, value: T) -> Result<NodeId> {
        self.self_check("create_loose")?;
        let id = self.new_node(None, value)?;
        debug!(node = %id, "Created loose node");
        Ok(id)
    }

    /// Delete every node, attached or loose
    ///
    /// Walks the enumeration list, so the cost does not depend on the shape.
    /// Pools are kept for reuse.
    pub fn clear(&mut self) -> Result<usize> {
        let mut deleted = 0;
        while let Some(head) = self.head {
            self.delete_node(head)?;
            deleted += 1;
        }

        self.root = None;
        self.depth = 0;
        debug!(deleted, "Cleared tree");
        Ok(deleted)
    }
}

impl<T> Drop for Tree<T> {
    fn drop(&mut self) {
        // Elements go first, then the pools holding them
        if let Err(e) = self.clear() {
            warn!(error = %e, "Failed to delete all nodes during teardown");
        }
        if self.slab.is_initialized() {
            if let Err(e) = self.slab.deinit() {
                warn!(error = %e, "Failed to release slab pools");
            }
        }
        info!("Tree destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::NodeState;
    use std::cell::Cell;
    use std::rc::Rc;

    struct DropCounter(Rc<Cell<usize>>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn test_enumeration_list_links() -> Result<()> {
        let mut tree = Tree::with_capacity(8)?;
        let a = tree.create_loose('a')?;
        let b = tree.create_loose('b')?;
        let c = tree.create_loose('c')?;

        assert_eq!(tree.head(), Some(c));
        assert_eq!(tree.node(c)?.next(), Some(b));
        assert_eq!(tree.node(b)?.prev(), Some(c));
        assert_eq!(tree.node(a)?.next(), None);

        // Unlink from the middle
        tree.delete_node(b)?;
        assert_eq!(tree.node(c)?.next(), Some(a));
        assert_eq!(tree.node(a)?.prev(), Some(c));

        // Unlink the head
        tree.delete_node(c)?;
        assert_eq!(tree.head(), Some(a));
        assert_eq!(tree.node(a)?.prev(), None);
        assert_eq!(tree.len(), 1);
        assert!(tree.verify().is_empty());
        Ok(())
    }

    #[test]
    fn test_loose_node_state() -> Result<()> {
        let mut tree = Tree::with_capacity(4)?;
        let root = tree.insert_root(1)?;
        let loose = tree.create_loose(2)?;

        assert_eq!(tree.node_state(root)?, NodeState::Attached);
        assert_eq!(tree.node_state(loose)?, NodeState::Unattached);
        assert_eq!(tree.level(loose)?, 0);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.subtree_size(root)?, 1);
        Ok(())
    }

    #[test]
    fn test_clear_runs_destructors_once() -> Result<()> {
        let drops = Rc::new(Cell::new(0));
        let mut tree = Tree::with_capacity(2)?;

        let root = tree.insert_root(DropCounter(drops.clone()))?;
        tree.insert_left(root, DropCounter(drops.clone()))?;
        tree.insert_right(root, DropCounter(drops.clone()))?;
        tree.create_loose(DropCounter(drops.clone()))?;

        assert_eq!(tree.clear()?, 4);
        assert_eq!(drops.get(), 4);
        assert!(tree.is_empty());
        assert_eq!(tree.head(), None);
        assert_eq!(tree.root(), None);

        drop(tree);
        assert_eq!(drops.get(), 4);
        Ok(())
    }

    #[test]
    fn test_drop_releases_everything() -> Result<()> {
        let drops = Rc::new(Cell::new(0));
        {
            let mut tree = Tree::with_capacity(1)?;
            let root = tree.insert_root(DropCounter(drops.clone()))?;
            let left = tree.insert_left(root, DropCounter(drops.clone()))?;
            tree.insert_left(left, DropCounter(drops.clone()))?;
            tree.create_loose(DropCounter(drops.clone()))?;
            assert_eq!(tree.slab_stats().pools.len(), 4);
        }
        assert_eq!(drops.get(), 4);
        Ok(())
    }
}
