//! Binary tree over slab-allocated nodes
//!
//! # Architecture
//!
//! ```text
//! Tree<T>
//!   ├─→ root ──→ A            (shape: parent / left / right)
//!   │           / \
//!   │          B   C
//!   ├─→ head ──→ C ⇄ B ⇄ A ⇄ L   (enumeration list, newest first)
//!   └─→ SlabAllocator<Node<T>>   (pools of blocks)
//! ```
//!
//! `L` is a loose node: it is enumerated and torn down with the tree, but
//! is not reachable from `root` until it is hung somewhere.
//!
//! Ownership is logical: the enumeration list holds every live node, so
//! teardown walks the list rather than the shape.

mod copy;
mod migrate;
pub mod node;
mod ops;
mod store;

pub use node::{Node, NodeId, NodeState, Position, Side};

use crate::config::TreeConfig;
use crate::dump::{PrintFn, TreeDumper};
use crate::error::{Error, Result};
use crate::slab::{SlabAllocator, SlabStats};
use crate::verify::{verify, VerifyFlags};
use tracing::{debug, error};

/// Binary tree with arena-allocated nodes
pub struct Tree<T> {
    pub(crate) slab: SlabAllocator<Node<T>>,
    pub(crate) root: Option<NodeId>,
    /// Most recently created node of the enumeration list
    pub(crate) head: Option<NodeId>,
    pub(crate) len: usize,
    /// Cached maximum level
    pub(crate) depth: usize,
    pub(crate) config: TreeConfig,
    pub(crate) printer: Option<PrintFn<T>>,
}

impl<T> std::fmt::Debug for Tree<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tree")
            .field("root", &self.root)
            .field("head", &self.head)
            .field("len", &self.len)
            .field("depth", &self.depth)
            .field("pools", &self.slab.pool_count())
            .finish_non_exhaustive()
    }
}

impl<T> Tree<T> {
    /// Create an empty tree
    ///
    /// The allocator is sized from `config.pool_capacity`; exceeding it
    /// later only adds pools.
    pub fn new(config: TreeConfig) -> Result<Self> {
        config.validate()?;
        let slab = SlabAllocator::with_capacity(config.pool_capacity, config.max_pools)?;

        Ok(Self {
            slab,
            root: None,
            head: None,
            len: 0,
            depth: 0,
            config,
            printer: None,
        })
    }

    /// Create with default settings
    pub fn with_defaults() -> Result<Self> {
        Self::new(TreeConfig::default())
    }

    /// Create with a typical node count as pool capacity
    pub fn with_capacity(pool_capacity: usize) -> Result<Self> {
        Self::new(TreeConfig {
            pool_capacity,
            ..TreeConfig::default()
        })
    }

    /// Install the element printer used by dumps
    pub fn set_printer(&mut self, printer: PrintFn<T>) {
        self.printer = Some(printer);
    }

    pub fn printer(&self) -> Option<PrintFn<T>> {
        self.printer
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Head of the enumeration list
    pub fn head(&self) -> Option<NodeId> {
        self.head
    }

    /// Number of live nodes, loose ones included
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Cached maximum level of the tree
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Size in bytes of one element
    pub fn element_size(&self) -> usize {
        std::mem::size_of::<T>()
    }

    /// Get a node record
    pub fn node(&self, id: NodeId) -> Result<&Node<T>> {
        self.slab.get(id.0).ok_or(Error::InvalidNode(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node<T>> {
        self.slab.get_mut(id.0).ok_or(Error::InvalidNode(id))
    }

    /// Check if `id` refers to a live node of this tree
    pub fn contains(&self, id: NodeId) -> bool {
        self.slab.contains(id.0)
    }

    /// Get the element stored in a node
    pub fn get(&self, id: NodeId) -> Result<&T> {
        Ok(&self.node(id)?.value)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Result<&mut T> {
        Ok(&mut self.node_mut(id)?.value)
    }

    /// Replace the element stored in a node and return the old one
    pub fn set(&mut self, id: NodeId, value: T) -> Result<T> {
        self.self_check("set")?;
        Ok(std::mem::replace(&mut self.node_mut(id)?.value, value))
    }

    pub fn left(&self, id: NodeId) -> Result<Option<NodeId>> {
        Ok(self.node(id)?.left)
    }

    pub fn right(&self, id: NodeId) -> Result<Option<NodeId>> {
        Ok(self.node(id)?.right)
    }

    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>> {
        Ok(self.node(id)?.parent)
    }

    pub fn level(&self, id: NodeId) -> Result<usize> {
        Ok(self.node(id)?.level)
    }

    pub fn is_leaf(&self, id: NodeId) -> Result<bool> {
        Ok(self.node(id)?.is_leaf())
    }

    /// Whether a node hangs in the tree or is still loose
    ///
    /// A node under a loose parent counts as attached to that parent.
    pub fn node_state(&self, id: NodeId) -> Result<NodeState> {
        let node = self.node(id)?;
        if node.parent.is_some() || self.root == Some(id) {
            Ok(NodeState::Attached)
        } else {
            Ok(NodeState::Unattached)
        }
    }

    /// Node currently stored in a slot
    pub fn occupant(&self, position: Position) -> Result<Option<NodeId>> {
        match position {
            Position::Root => Ok(self.root),
            Position::Left(parent) => Ok(self.node(parent)?.left),
            Position::Right(parent) => Ok(self.node(parent)?.right),
        }
    }

    /// Iterate over the enumeration list, newest node first
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            tree: self,
            next: self.head,
            remaining: self.len,
        }
    }

    /// Node ids of the subtree under `start` in pre-order (node, left, right)
    pub fn preorder(&self, start: NodeId) -> Result<Vec<NodeId>> {
        let mut order = Vec::new();
        let mut stack = vec![start];

        while let Some(id) = stack.pop() {
            let node = self.node(id)?;
            order.push(id);
            // Right first so that left is visited first
            stack.extend(node.right);
            stack.extend(node.left);
        }

        Ok(order)
    }

    /// Node ids of the subtree under `start` in post-order (left, right, node)
    pub fn postorder(&self, start: NodeId) -> Result<Vec<NodeId>> {
        let mut order = Vec::new();
        let mut stack = vec![start];

        while let Some(id) = stack.pop() {
            let node = self.node(id)?;
            order.push(id);
            stack.extend(node.left);
            stack.extend(node.right);
        }

        order.reverse();
        Ok(order)
    }

    /// Number of nodes in the subtree under `start`
    pub fn subtree_size(&self, start: NodeId) -> Result<usize> {
        Ok(self.preorder(start)?.len())
    }

    /// Check whether `node` lies in the subtree rooted at `ancestor`
    ///
    /// Walks parent links, so it costs O(level).
    pub fn is_in_subtree(&self, node: NodeId, ancestor: NodeId) -> Result<bool> {
        let mut current = Some(node);
        let mut steps = 0;

        while let Some(id) = current {
            if id == ancestor {
                return Ok(true);
            }
            steps += 1;
            if steps > self.len {
                break;
            }
            current = self.node(id)?.parent;
        }

        Ok(false)
    }

    /// Reassign levels below `start` (the root by default)
    ///
    /// `start` receives `start_level`, every descendant its parent's level
    /// plus one. A full recomputation from the root resets the cached depth
    /// to the deepest level seen; a partial one can only raise it.
    /// Returns the deepest level seen.
    pub fn recompute_levels(&mut self, start: Option<NodeId>, start_level: usize) -> Result<usize> {
        let full = start.is_none();
        let Some(start) = start.or(self.root) else {
            self.depth = 0;
            return Ok(0);
        };

        let mut max_level = start_level;
        let mut stack = vec![(start, start_level)];

        while let Some((id, level)) = stack.pop() {
            let node = self.node_mut(id)?;
            node.level = level;
            max_level = max_level.max(level);
            stack.extend(node.left.map(|child| (child, level + 1)));
            stack.extend(node.right.map(|child| (child, level + 1)));
        }

        self.depth = if full {
            max_level
        } else {
            self.depth.max(max_level)
        };

        debug!(start = %start, start_level, max_level, "Recomputed levels");
        Ok(max_level)
    }

    /// Run the structural self-check
    pub fn verify(&self) -> VerifyFlags {
        verify(Some(self))
    }

    /// Verify the tree before a mutation
    ///
    /// On failure the flags are logged, a dump is attempted when enabled, and
    /// the operation must abort without touching the tree.
    pub(crate) fn self_check(&self, operation: &'static str) -> Result<()> {
        if !self.config.self_check {
            return Ok(());
        }

        let flags = self.verify();
        if flags.is_empty() {
            return Ok(());
        }

        error!(operation, flags = %flags, "Tree verification failed");
        if self.config.dump.enabled {
            let dumper = TreeDumper::new(self.config.dump.clone());
            if let Err(e) = dumper.dump(self, flags, operation) {
                error!(operation, error = %e, "Failed to dump corrupted tree");
            }
        }

        Err(Error::Verification(flags))
    }

    /// Get allocator statistics
    pub fn slab_stats(&self) -> SlabStats {
        self.slab.stats()
    }
}

/// Iterator over the enumeration list of a tree
pub struct Iter<'a, T> {
    tree: &'a Tree<T>,
    next: Option<NodeId>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (NodeId, &'a Node<T>);

    fn next(&mut self) -> Option<Self::Item> {
        // Bounded by the node count so a broken list cannot loop forever
        if self.remaining == 0 {
            return None;
        }
        let id = self.next?;
        let node = self.tree.slab.get(id.0)?;
        self.next = node.next;
        self.remaining -= 1;
        Some((id, node))
    }
}

impl<'a, T> IntoIterator for &'a Tree<T> {
    type Item = (NodeId, &'a Node<T>);
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
