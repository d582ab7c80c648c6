pub mod config;
pub mod coordinator;
pub mod diagnostic;
pub mod entry;
pub mod error;
pub mod import_map;
pub mod resolve;
pub mod resource;
pub mod transform;

pub use config::PreviewConfig;
pub use coordinator::{BuildCoordinator, BuildOutcome, BuildTicket};
pub use diagnostic::{Diagnostic, Severity};
pub use error::PreviewError;
pub use import_map::{BuildOutput, ImportMap, ImportMapBuilder, TransformResult};
pub use resource::{InMemoryRegistry, Resource, ResourceHandle, ResourceKind, ResourceRegistry};
