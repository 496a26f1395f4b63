//! Versioned Spec Registry: immutable, semver'd storage for workflows,
//! node specs, edge specs, and tool specs, over a pluggable storage
//! backend (local filesystem or an object-store-style in-memory backend).

mod error;
mod registry;
mod semver;
mod storage;

pub use error::RegistryError;
pub use registry::Registry;
pub use semver::SemVer;
pub use storage::{LocalFileStorage, ObjectStoreStorage, RegistryStorage};

use crate::workflow::spec::{EdgeSpec, NodeSpec, ToolSpec, Workflow, WorkflowStatusLabel};
use std::sync::Arc;

/// Bundles the four entity-kind registries that share one storage backend —
/// the shape callers actually want when wiring a Spec Registry instance.
pub struct SpecRegistry {
    pub workflows: Registry<Workflow>,
    pub nodes: Registry<NodeSpec>,
    pub edges: Registry<EdgeSpec>,
    pub tools: Registry<ToolSpec>,
}

impl SpecRegistry {
    pub fn new(storage: Arc<dyn RegistryStorage>) -> Self {
        Self {
            workflows: Registry::new("workflow", storage.clone()),
            nodes: Registry::new("node", storage.clone()),
            edges: Registry::new("edge", storage.clone()),
            tools: Registry::new("tool", storage),
        }
    }

    pub fn local_file(root: impl Into<std::path::PathBuf>) -> Self {
        Self::new(Arc::new(LocalFileStorage::new(root)))
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(ObjectStoreStorage::new()))
    }

    /// Save a workflow spec as a new draft version. Consults the spec's own
    /// `metadata.status`: a workflow already authored with
    /// `WorkflowStatusLabel::Published` is flipped immutable immediately,
    /// so callers don't need a separate `publish_workflow` round trip for
    /// specs that were already approved before saving.
    pub async fn save_workflow(&self, id: &str, version: Option<&str>, workflow: &Workflow) -> Result<String, RegistryError> {
        let saved_version = self.workflows.publish(id, version, workflow).await?;
        if matches!(workflow.metadata.status, WorkflowStatusLabel::Published) {
            self.workflows.publish_version(id, &saved_version).await?;
        }
        Ok(saved_version)
    }

    /// Flip a saved workflow version to published, making it immutable.
    pub async fn publish_workflow(&self, id: &str, version: &str) -> Result<(), RegistryError> {
        self.workflows.publish_version(id, version).await
    }
}
