//! Re-parenting of existing subtrees

use super::node::{NodeId, Position};
use super::Tree;
use crate::error::{Error, Result};
use tracing::debug;

impl<T> Tree<T> {
    /// Delete the subtree under `node`, sparing `keep` and its descendants
    ///
    /// Returns whether `keep` was met inside the subtree. Spared nodes lose
    /// their link to a deleted parent.
    pub(crate) fn delete_except(&mut self, node: NodeId, keep: NodeId) -> Result<bool> {
        let mut found = false;
        let mut doomed = Vec::new();
        let mut stack = vec![node];

        while let Some(id) = stack.pop() {
            if id == keep {
                found = true;
                continue;
            }
            let current = self.node(id)?;
            doomed.push(id);
            stack.extend(current.left);
            stack.extend(current.right);
        }

        // Reverse pre-order visits children before their parent
        for id in doomed.iter().rev() {
            self.delete_node(*id)?;
        }

        debug!(
            node = %node,
            keep = %keep,
            found,
            deleted = doomed.len(),
            "Deleted subtree except spared node"
        );
        Ok(found)
    }

    /// Move the subtree under `migr` into `position`
    ///
    /// Whatever occupied `position` is deleted, except `migr` itself if it
    /// lived in there. Levels of the whole tree are recomputed afterwards.
    /// Moving a subtree below one of its own nodes fails with
    /// `MigrationCycle` and leaves the tree untouched.
    pub fn migrate_subtree(&mut self, position: Position, migr: NodeId) -> Result<()> {
        self.self_check("migrate_subtree")?;
        self.node(migr)?;
        if let Some(dest) = position.parent() {
            if self.is_in_subtree(dest, migr)? {
                return Err(Error::MigrationCycle);
            }
        }

        let found = match self.occupant(position)? {
            Some(existing) => self.delete_except(existing, migr)?,
            None => false,
        };
        if !found {
            self.detach(migr)?;
        }

        self.link(position, migr)?;
        let depth = self.recompute_levels(None, 0)?;

        debug!(node = %migr, ?position, found, depth, len = self.len, "Migrated subtree");
        Ok(())
    }

    pub fn migrate_subtree_into_left(&mut self, dest: NodeId, migr: NodeId) -> Result<()> {
        self.migrate_subtree(Position::Left(dest), migr)
    }

    pub fn migrate_subtree_into_right(&mut self, dest: NodeId, migr: NodeId) -> Result<()> {
        self.migrate_subtree(Position::Right(dest), migr)
    }

    pub fn migrate_into_root(&mut self, migr: NodeId) -> Result<()> {
        self.migrate_subtree(Position::Root, migr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_from_inside_replaced_subtree() -> Result<()> {
        let mut tree = Tree::with_capacity(4)?;
        let a = tree.insert_root('A')?;
        let b = tree.insert_left(a, 'B')?;
        let c = tree.insert_left(b, 'C')?;
        let d = tree.insert_right(c, 'D')?;

        tree.migrate_subtree_into_left(a, c)?;

        assert_eq!(tree.left(a)?, Some(c));
        assert_eq!(tree.parent(c)?, Some(a));
        assert!(!tree.contains(b));
        assert_eq!(tree.level(c)?, 1);
        assert_eq!(tree.level(d)?, 2);
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.depth(), 2);
        assert!(tree.verify().is_empty());
        Ok(())
    }

    #[test]
    fn test_migrate_from_elsewhere() -> Result<()> {
        let mut tree = Tree::with_capacity(8)?;
        let a = tree.insert_root(0)?;
        let b = tree.insert_left(a, 1)?;
        let c = tree.insert_right(a, 2)?;
        let c_left = tree.insert_left(c, 3)?;
        let b_left = tree.insert_left(b, 4)?;

        // Replace b's left subtree with c's left child
        tree.migrate_subtree_into_left(b, c_left)?;

        assert!(!tree.contains(b_left));
        assert_eq!(tree.left(b)?, Some(c_left));
        assert_eq!(tree.left(c)?, None);
        assert_eq!(tree.level(c_left)?, 2);
        assert_eq!(tree.len(), 4);
        assert!(tree.verify().is_empty());
        Ok(())
    }

    #[test]
    fn test_migrate_into_empty_slot() -> Result<()> {
        let mut tree = Tree::with_capacity(8)?;
        let a = tree.insert_root(0)?;
        let b = tree.insert_left(a, 1)?;
        let deep = tree.insert_left(b, 2)?;

        tree.migrate_subtree_into_right(a, deep)?;
        assert_eq!(tree.right(a)?, Some(deep));
        assert_eq!(tree.left(b)?, None);
        assert_eq!(tree.level(deep)?, 1);
        assert_eq!(tree.depth(), 1);
        Ok(())
    }

    #[test]
    fn test_migrate_into_root() -> Result<()> {
        let mut tree = Tree::with_capacity(8)?;
        let a = tree.insert_root(0)?;
        let b = tree.insert_left(a, 1)?;
        let c = tree.insert_right(b, 2)?;
        let d = tree.insert_left(c, 3)?;
        tree.insert_right(a, 4)?;

        tree.migrate_into_root(c)?;

        assert_eq!(tree.root(), Some(c));
        assert_eq!(tree.parent(c)?, None);
        assert_eq!(tree.level(c)?, 0);
        assert_eq!(tree.level(d)?, 1);
        assert_eq!(tree.len(), 2);
        assert!(!tree.contains(a));
        assert!(tree.verify().is_empty());
        Ok(())
    }

    #[test]
    fn test_migrate_loose_node() -> Result<()> {
        let mut tree = Tree::with_capacity(8)?;
        let a = tree.insert_root(0)?;
        tree.insert_left(a, 1)?;
        let loose = tree.create_loose(9)?;

        tree.migrate_subtree_into_left(a, loose)?;
        assert_eq!(tree.left(a)?, Some(loose));
        assert_eq!(tree.len(), 2);
        Ok(())
    }

    #[test]
    fn test_migrate_into_own_subtree_is_refused() -> Result<()> {
        let mut tree = Tree::with_capacity(8)?;
        let a = tree.insert_root(0)?;
        let b = tree.insert_left(a, 1)?;
        let c = tree.insert_left(b, 2)?;

        assert!(matches!(tree.migrate_subtree_into_right(c, b), Err(Error::MigrationCycle)));
        assert!(matches!(tree.migrate_subtree_into_right(b, b), Err(Error::MigrationCycle)));
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.left(b)?, Some(c));
        assert!(tree.verify().is_empty());
        Ok(())
    }

    #[test]
    fn test_migrate_onto_itself_is_noop() -> Result<()> {
        let mut tree = Tree::with_capacity(8)?;
        let a = tree.insert_root(0)?;
        let b = tree.insert_left(a, 1)?;
        let c = tree.insert_left(b, 2)?;

        tree.migrate_subtree_into_left(a, b)?;
        assert_eq!(tree.left(a)?, Some(b));
        assert_eq!(tree.left(b)?, Some(c));
        assert_eq!(tree.len(), 3);
        Ok(())
    }
}
