//! Pipeline stages
//!
//! One module per stage of a pipeline run. Each stage owns its error type
//! so the orchestrator can tell which stage failed and why.

pub mod artifact;
pub mod builder;
pub mod notify;
pub mod registry;
pub mod source;

pub use artifact::{ArtifactStore, ExportError};
pub use builder::{BuildError, BuildOutput, ImageBuilder};
pub use notify::{EventNotifier, NotifyError};
pub use registry::{PublishError, RegistryPublisher};
pub use source::{GitSourceResolver, SourceError, SourceResolver, SourceTree};
