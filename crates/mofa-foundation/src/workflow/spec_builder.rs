//! Fluent builders over the `spec` data model. Distinct from the teacher's
//! closure-based `builder.rs` (which builds `WorkflowGraph`/`WorkflowNode`);
//! this one produces plain, serializable `Workflow`/`NodeSpec`/`EdgeSpec`
//! values suitable for registry publication.

use super::spec::{
    Condition, ConditionGroup, EdgeKind, EdgeSpec, JoinOp, NodeType, RoutingStrategy, Workflow,
    WorkflowMetadata,
};
use super::spec_validator::{validate_workflow, ValidationReport};
use std::collections::HashMap;

pub use super::spec::NodeSpec as NodeSpecValue;

pub struct NodeSpecBuilder {
    inner: super::spec::NodeSpec,
}

impl NodeSpecBuilder {
    pub fn new(id: impl Into<String>, name: impl Into<String>, node_type: NodeType) -> Self {
        Self { inner: super::spec::NodeSpec::new(id, name, node_type) }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.inner.description = description.into();
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.inner.prompt = Some(prompt.into());
        self
    }

    pub fn tool_ref(mut self, tool_ref: super::spec::ToolRef) -> Self {
        self.inner.tool_ref = Some(tool_ref);
        self
    }

    pub fn agent_ref(mut self, agent_ref: super::spec::AgentRef) -> Self {
        self.inner.agent_ref = Some(agent_ref);
        self
    }

    pub fn llm_ref(mut self, llm_ref: super::spec::LlmRef) -> Self {
        self.inner.llm_ref = Some(llm_ref);
        self
    }

    pub fn params(mut self, params: serde_json::Value) -> Self {
        self.inner.params = params;
        self
    }

    pub fn build(self) -> super::spec::NodeSpec {
        self.inner
    }
}

pub struct EdgeSpecBuilder {
    inner: EdgeSpec,
}

impl EdgeSpecBuilder {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self { inner: EdgeSpec::new(id, source, target, EdgeKind::Default) }
    }

    pub fn kind(mut self, kind: EdgeKind) -> Self {
        self.inner.edge_type = kind;
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.inner.priority = priority;
        self
    }

    pub fn condition(mut self, join: JoinOp, conditions: Vec<Condition>) -> Self {
        self.inner.condition = Some(ConditionGroup { join, conditions });
        self.inner.edge_type = EdgeKind::Conditional;
        self
    }

    pub fn data_mapping(mut self, mapping: HashMap<String, String>) -> Self {
        self.inner.data_mapping = mapping;
        self
    }

    /// Fallback edges are a last resort: `route()` only ever consults the
    /// dedicated fallback edge once no other edge passes, but the ordinary
    /// priority-sort is shared code, so a `Fallback` edge's priority is
    /// forced to the lowest possible value here regardless of call order
    /// (mirrors spec's "priority is forced to the lowest" rule).
    pub fn build(mut self) -> EdgeSpec {
        if matches!(self.inner.edge_type, EdgeKind::Fallback) {
            self.inner.priority = i32::MIN;
        }
        self.inner
    }
}

pub struct WorkflowBuilder {
    id: String,
    name: String,
    version: String,
    description: String,
    nodes: Vec<super::spec::NodeSpec>,
    edges: Vec<EdgeSpec>,
    start_node_id: Option<String>,
    end_node_ids: Vec<String>,
    routing_strategy: RoutingStrategy,
    max_iterations: u32,
    timeout_seconds: Option<u64>,
    metadata: WorkflowMetadata,
}

impl WorkflowBuilder {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: "0.1.0".to_string(),
            description: String::new(),
            nodes: Vec::new(),
            edges: Vec::new(),
            start_node_id: None,
            end_node_ids: Vec::new(),
            routing_strategy: RoutingStrategy::FirstMatch,
            max_iterations: 100,
            timeout_seconds: None,
            metadata: WorkflowMetadata::default(),
        }
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn node(mut self, node: super::spec::NodeSpec) -> Self {
        if matches!(node.node_type, NodeType::Start) && self.start_node_id.is_none() {
            self.start_node_id = Some(node.id.clone());
        }
        if matches!(node.node_type, NodeType::End) {
            self.end_node_ids.push(node.id.clone());
        }
        self.nodes.push(node);
        self
    }

    pub fn edge(mut self, edge: EdgeSpec) -> Self {
        self.edges.push(edge);
        self
    }

    pub fn start_node(mut self, id: impl Into<String>) -> Self {
        self.start_node_id = Some(id.into());
        self
    }

    pub fn routing_strategy(mut self, strategy: RoutingStrategy) -> Self {
        self.routing_strategy = strategy;
        self
    }

    pub fn max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    pub fn build(self) -> Workflow {
        Workflow {
            id: self.id,
            name: self.name,
            version: self.version,
            description: self.description,
            nodes: self.nodes,
            edges: self.edges,
            start_node_id: self.start_node_id,
            end_node_ids: self.end_node_ids,
            routing_strategy: self.routing_strategy,
            max_iterations: self.max_iterations,
            timeout_seconds: self.timeout_seconds,
            metadata: self.metadata,
        }
    }

    /// Build and run `spec_validator` against the result, returning both so
    /// callers can decide whether to proceed on warnings.
    pub fn build_validated(self) -> (Workflow, ValidationReport) {
        let workflow = self.build();
        let report = validate_workflow(&workflow);
        (workflow, report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::spec::NodeType;

    #[test]
    fn builds_minimal_two_node_workflow() {
        let start = NodeSpecBuilder::new("start", "Start", NodeType::Start).build();
        let end = NodeSpecBuilder::new("end", "End", NodeType::End).build();
        let edge = EdgeSpecBuilder::new("e1", "start", "end").build();

        let workflow = WorkflowBuilder::new("wf1", "Demo")
            .node(start)
            .node(end)
            .edge(edge)
            .build();

        assert_eq!(workflow.start_node_id.as_deref(), Some("start"));
        assert_eq!(workflow.end_node_ids, vec!["end".to_string()]);
        assert_eq!(workflow.nodes.len(), 2);
    }
}
