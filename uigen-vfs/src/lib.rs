pub mod edit;
pub mod error;
pub mod path;
pub mod tree;

pub use edit::{EditCommand, EditOutput, FileCommand, LineRange};
pub use error::VfsError;
pub use path::VfsLimits;
pub use tree::{DirEntry, NodeKind, Snapshot, SnapshotEntry, TreeConfig, TreeMetrics, VirtualFileTree, VirtualNode};
