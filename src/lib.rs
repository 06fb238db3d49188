// slabtree - Binary trees over slab-allocated nodes
// Structural self-checks and Graphviz dumps included

#![warn(rust_2018_idioms)]

pub mod config;
pub mod dump;
pub mod slab;
pub mod tree;
pub mod verify;

// Re-exports for convenience
pub use config::TreeConfig;
pub use dump::{DumpConfig, DumpReport, PrintFn, TreeDumper};
pub use error::{Error, Result};
pub use slab::{BlockId, SlabAllocator, SlabStats};
pub use tree::{Node, NodeId, NodeState, Position, Side, Tree};
pub use verify::{verify, VerifyFlags};

/// slabtree error types
pub mod error {
    use crate::slab::BlockId;
    use crate::tree::NodeId;
    use crate::verify::VerifyFlags;
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum Error {
        #[error("Allocator already initialized")]
        AlreadyInitialized,

        #[error("Pool capacity must be greater than zero")]
        InvalidCapacity,

        #[error("Allocation failure: {0}")]
        AllocationFailure(String),

        #[error("Allocator not initialized")]
        NotInitialized,

        #[error("Invalid block: {0}")]
        InvalidBlock(BlockId),

        #[error("Root already exists")]
        RootAlreadyExists,

        #[error("Left child is occupied")]
        LeftChildOccupied,

        #[error("Right child is occupied")]
        RightChildOccupied,

        #[error("Requested child does not exist")]
        NoSuchChild,

        #[error("Node is not a leaf")]
        NotALeaf,

        #[error("Node is not loose: {0}")]
        NotLoose(NodeId),

        #[error("Invalid node: {0}")]
        InvalidNode(NodeId),

        #[error("Destination lies inside the migrated subtree")]
        MigrationCycle,

        #[error("{0}")]
        Verification(VerifyFlags),

        #[error("Dump error: {0}")]
        Dump(String),

        #[error("Configuration error: {0}")]
        Config(String),

        #[error("I/O error: {0}")]
        Io(#[from] std::io::Error),
    }

    impl Error {
        /// Recoverable structural refusal; the tree is unchanged
        pub fn is_warning(&self) -> bool {
            matches!(
                self,
                Error::RootAlreadyExists
                    | Error::LeftChildOccupied
                    | Error::RightChildOccupied
                    | Error::NoSuchChild
                    | Error::NotALeaf
                    | Error::NotLoose(_)
            )
        }

        /// Memory could not be obtained; the tree keeps its prior state
        pub fn is_resource(&self) -> bool {
            matches!(self, Error::AllocationFailure(_))
        }
    }

    pub type Result<T> = std::result::Result<T, Error>;
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert!(Error::NotALeaf.is_warning());
        assert!(Error::RootAlreadyExists.is_warning());
        assert!(!Error::MigrationCycle.is_warning());
        assert!(Error::AllocationFailure("oom".into()).is_resource());
        assert!(!Error::NoSuchChild.is_resource());
    }

    #[test]
    fn test_verification_message() {
        let err = Error::Verification(VerifyFlags::LIST_LENGTH_MISMATCH);
        assert!(err.to_string().contains("INVALID_NODES_COUNT_ACCORDING_TO_LIST"));
    }
}
