//! External collaborator boundaries.
//!
//! The engine never implements an LLM or an agent itself — it calls out
//! through these traits, matching the "no LLM implementation" scope
//! boundary. Deterministic test doubles are provided for use in the crate's
//! own test suite.

use super::spec::{AgentRef, Workflow};
use super::state::WorkflowValue;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(
        &self,
        system_prompt: Option<&str>,
        user_message: &str,
        output_schema: Option<&serde_json::Value>,
    ) -> Result<WorkflowValue, String>;
}

pub struct AgentInvocationMeta {
    pub workflow_id: String,
    pub node_id: String,
    pub execution_id: String,
}

#[async_trait]
pub trait AgentInvoker: Send + Sync {
    async fn invoke(
        &self,
        agent_ref: &AgentRef,
        input: WorkflowValue,
        meta: AgentInvocationMeta,
    ) -> Result<WorkflowValue, String>;
}

/// Resolves a workflow id (typically via the Spec Registry) for Subworkflow
/// nodes. Kept independent of the registry crate boundary so the engine
/// doesn't have to depend on a concrete storage backend.
#[async_trait]
pub trait WorkflowResolver: Send + Sync {
    async fn resolve(&self, workflow_id: &str) -> Option<Workflow>;
}

/// In-memory resolver backed by a simple map, useful for tests and for
/// embedding pre-built sub-workflows without going through the registry.
#[derive(Default)]
pub struct InMemoryWorkflowResolver {
    workflows: RwLock<HashMap<String, Workflow>>,
}

impl InMemoryWorkflowResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, workflow: Workflow) {
        self.workflows.write().await.insert(workflow.id.clone(), workflow);
    }
}

#[async_trait]
impl WorkflowResolver for InMemoryWorkflowResolver {
    async fn resolve(&self, workflow_id: &str) -> Option<Workflow> {
        self.workflows.read().await.get(workflow_id).cloned()
    }
}

/// Echoes the user message back as a string; used where tests need a
/// `LlmClient` but don't care about real completions.
pub struct EchoLlmClient;

#[async_trait]
impl LlmClient for EchoLlmClient {
    async fn complete(
        &self,
        _system_prompt: Option<&str>,
        user_message: &str,
        _output_schema: Option<&serde_json::Value>,
    ) -> Result<WorkflowValue, String> {
        Ok(WorkflowValue::String(user_message.to_string()))
    }
}

/// Boxed custom node executor, used by the node factory for `NodeType::Custom`.
pub type CustomNodeFn = Arc<
    dyn Fn(
            WorkflowValue,
        ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<WorkflowValue, String>> + Send>>
        + Send
        + Sync,
>;

/// Registry of runtime-registered custom node kinds (`NodeType::Custom`).
#[derive(Default, Clone)]
pub struct NodeFactory {
    custom: Arc<RwLock<HashMap<String, CustomNodeFn>>>,
}

impl NodeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, kind: impl Into<String>, f: CustomNodeFn) {
        self.custom.write().await.insert(kind.into(), f);
    }

    pub async fn get(&self, kind: &str) -> Option<CustomNodeFn> {
        self.custom.read().await.get(kind).cloned()
    }
}
