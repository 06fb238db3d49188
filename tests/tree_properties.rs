//! Property tests for the tree engine.
//!
//! After any sequence of operations the node count matches the number of
//! nodes created minus the number deleted, and the tree passes verification.

use proptest::prelude::*;
use slabtree::{Error, NodeId, Position, SlabAllocator, Tree};

#[derive(Debug, Clone, Copy)]
enum Op {
    Insert { pick: usize, right: bool },
    InsertRoot,
    CreateLoose,
    DeleteLeaf { pick: usize, right: bool },
    DeleteSubtree { pick: usize },
    Hang { pick: usize, target: usize, right: bool },
    Copy { pick: usize, target: usize, right: bool },
    Migrate { pick: usize, target: usize, right: bool },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (any::<usize>(), any::<bool>()).prop_map(|(pick, right)| Op::Insert { pick, right }),
        1 => Just(Op::InsertRoot),
        1 => Just(Op::CreateLoose),
        2 => (any::<usize>(), any::<bool>())
            .prop_map(|(pick, right)| Op::DeleteLeaf { pick, right }),
        1 => any::<usize>().prop_map(|pick| Op::DeleteSubtree { pick }),
        1 => (any::<usize>(), any::<usize>(), any::<bool>())
            .prop_map(|(pick, target, right)| Op::Hang { pick, target, right }),
        1 => (any::<usize>(), any::<usize>(), any::<bool>())
            .prop_map(|(pick, target, right)| Op::Copy { pick, target, right }),
        1 => (any::<usize>(), any::<usize>(), any::<bool>())
            .prop_map(|(pick, target, right)| Op::Migrate { pick, target, right }),
    ]
}

fn position(parent: NodeId, right: bool) -> Position {
    if right {
        Position::Right(parent)
    } else {
        Position::Left(parent)
    }
}

/// Apply one operation and return the change in node count it should cause
fn apply(tree: &mut Tree<u32>, op: Op, next_value: &mut u32) -> Result<isize, Error> {
    let live: Vec<NodeId> = tree.iter().map(|(id, _)| id).collect();
    let pick = |index: usize| live.get(index % live.len().max(1)).copied();
    *next_value += 1;
    let value = *next_value;

    match op {
        Op::InsertRoot => tree.insert_root(value).map(|_| 1),
        Op::CreateLoose => tree.create_loose(value).map(|_| 1),
        Op::Insert { pick: p, right } => match pick(p) {
            Some(parent) => tree.insert_at(position(parent, right), value).map(|_| 1),
            None => Ok(0),
        },
        Op::DeleteLeaf { pick: p, right } => match pick(p) {
            Some(parent) if right => tree.delete_right_child(parent).map(|_| -1),
            Some(parent) => tree.delete_left_child(parent).map(|_| -1),
            None => Ok(0),
        },
        Op::DeleteSubtree { pick: p } => match pick(p) {
            Some(node) => tree.delete_subtree(node).map(|n| -(n as isize)),
            None => Ok(0),
        },
        Op::Hang { pick: p, target, right } => match (pick(p), pick(target)) {
            (Some(loose), Some(parent)) => {
                tree.hang_loose(position(parent, right), loose).map(|_| 0)
            }
            _ => Ok(0),
        },
        Op::Copy { pick: p, target, right } => match (pick(p), pick(target)) {
            (Some(src), Some(parent)) => {
                let size = tree.subtree_size(src)? as isize;
                tree.copy_subtree_within(position(parent, right), src).map(|_| size)
            }
            _ => Ok(0),
        },
        Op::Migrate { pick: p, target, right } => match (pick(p), pick(target)) {
            (Some(migr), Some(parent)) => {
                let slot = position(parent, right);
                let removed = match tree.occupant(slot)? {
                    Some(occupant) if tree.is_in_subtree(migr, occupant)? => {
                        tree.subtree_size(occupant)? - tree.subtree_size(migr)?
                    }
                    Some(occupant) => tree.subtree_size(occupant)?,
                    None => 0,
                };
                tree.migrate_subtree(slot, migr).map(|_| -(removed as isize))
            }
            _ => Ok(0),
        },
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn node_count_tracks_creations_and_deletions(
        pool_capacity in 1usize..6,
        ops in proptest::collection::vec(op_strategy(), 1..60),
    ) {
        let mut tree = Tree::with_capacity(pool_capacity).unwrap();
        let mut expected: isize = 0;
        let mut next_value = 0;

        for op in ops {
            let before = tree.len();
            match apply(&mut tree, op, &mut next_value) {
                Ok(delta) => expected += delta,
                Err(e) => {
                    prop_assert!(
                        e.is_warning() || matches!(e, Error::MigrationCycle),
                        "unexpected error {} for {:?}", e, op
                    );
                    prop_assert_eq!(tree.len(), before);
                }
            }

            prop_assert_eq!(tree.len() as isize, expected);
            prop_assert_eq!(tree.iter().count(), tree.len());
            prop_assert_eq!(tree.slab_stats().live_blocks, tree.len());
            prop_assert!(tree.verify().is_empty(), "{} after {:?}", tree.verify(), op);
        }

        let cleared = tree.clear().unwrap();
        prop_assert_eq!(cleared as isize, expected);
        prop_assert!(tree.is_empty());
    }

    #[test]
    fn depth_is_deepest_attached_level(
        path in proptest::collection::vec(any::<bool>(), 0..40),
    ) {
        let mut tree = Tree::with_capacity(4).unwrap();
        let mut current = tree.insert_root(0).unwrap();
        for (value, right) in path.iter().enumerate() {
            current = tree.insert_at(position(current, *right), value as u32).unwrap();
        }

        prop_assert_eq!(tree.depth(), path.len());
        prop_assert_eq!(tree.level(current).unwrap(), path.len());

        let root = tree.root().unwrap();
        prop_assert_eq!(tree.delete_subtree(root).unwrap(), path.len() + 1);
        prop_assert_eq!(tree.depth(), 0);
    }

    #[test]
    fn allocator_recycles_released_blocks(
        pool_capacity in 1usize..8,
        rounds in proptest::collection::vec(1usize..20, 1..10),
    ) {
        let mut slab: SlabAllocator<usize> =
            SlabAllocator::with_capacity(pool_capacity, None).unwrap();

        let mut max_live = 0;
        for count in rounds {
            let ids: Vec<_> = (0..count).map(|v| slab.allocate(v).unwrap()).collect();
            max_live = max_live.max(count);
            prop_assert_eq!(slab.live_count(), count);

            for (value, id) in ids.iter().enumerate() {
                prop_assert_eq!(slab.release(*id).unwrap(), value);
                prop_assert!(!slab.contains(*id));
            }
            prop_assert_eq!(slab.live_count(), 0);
        }

        // Pools are only added when every existing one is full
        prop_assert_eq!(slab.pool_count(), max_live.div_ceil(pool_capacity));
    }
}
