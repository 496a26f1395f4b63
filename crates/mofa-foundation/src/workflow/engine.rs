//! The workflow engine: walks a `Workflow` spec node by node, dispatching
//! each node kind inline so Subworkflow/Parallel recursion can call back
//! into `Engine::execute` directly instead of through a trait-object
//! callback.

use super::collaborators::{AgentInvocationMeta, AgentInvoker, LlmClient, NodeFactory, WorkflowResolver};
use super::condition::{apply_transform, as_string, transform_data, values_equal, wrap_error, DataTransform};
use super::spec::{ConditionGroup, EdgeKind, NodeSpec, NodeType, RoutingStrategy, Workflow};
use super::state::{NodeStatus, WorkflowContext, WorkflowValue};
use super::template::render_braces;
use crate::tool_runtime::{ToolExecutor, ToolOutcome, ToolPipeline, ToolRuntimeError};
use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::join_all;
use serde::Deserialize;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{oneshot, Mutex, Semaphore};
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    #[error("workflow '{0}' not found in resolver/registry")]
    WorkflowNotFound(String),
    #[error("failed to build workflow: {0}")]
    WorkflowBuildError(String),
    #[error("workflow validation failed: {0}")]
    WorkflowValidationError(String),
    #[error("workflow execution failed: {0}")]
    WorkflowExecutionError(String),
    #[error("workflow is in an invalid state for this operation: {0}")]
    WorkflowStateError(String),
    #[error("node '{0}' not found")]
    NodeNotFound(String),
    #[error("node '{node_id}' execution failed: {message}")]
    NodeExecutionError { node_id: String, message: String },
    #[error("node '{0}' failed validation: {1}")]
    NodeValidationError(String, String),
    #[error("edge '{0}' not found")]
    EdgeNotFound(String),
    #[error("edge '{0}' failed validation: {1}")]
    EdgeValidationError(String, String),
    #[error("no outgoing edge from node '{0}' could be traversed")]
    RoutingError(String),
    #[error("failed to evaluate condition on edge '{0}': {1}")]
    ConditionEvaluationError(String, String),
    #[error("transform failed on node '{0}': {1}")]
    TransformError(String, String),
    #[error("workflow execution exceeded its timeout ({0}s)")]
    WorkflowTimeout(u64),
    #[error("workflow exceeded max iterations ({0})")]
    MaxIterationsExceeded(u32),
    #[error("cycle detected at node '{0}'")]
    CycleDetected(String),
    #[error("parallel execution failed in branches: {0:?}")]
    ParallelExecutionError(Vec<String>),
    #[error("webhook call to '{url}' failed with status {status_code:?}")]
    WebhookError { url: String, status_code: Option<u16> },
    #[error("subworkflow execution failed: {0}")]
    SubworkflowError(String),
}

impl EngineError {
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::WorkflowNotFound(_) => "workflow_not_found",
            EngineError::WorkflowBuildError(_) => "workflow_build_error",
            EngineError::WorkflowValidationError(_) => "workflow_validation_error",
            EngineError::WorkflowExecutionError(_) => "workflow_execution_error",
            EngineError::WorkflowStateError(_) => "workflow_state_error",
            EngineError::NodeNotFound(_) => "node_not_found",
            EngineError::NodeExecutionError { .. } => "node_execution_error",
            EngineError::NodeValidationError(..) => "node_validation_error",
            EngineError::EdgeNotFound(_) => "edge_not_found",
            EngineError::EdgeValidationError(..) => "edge_validation_error",
            EngineError::RoutingError(_) => "routing_error",
            EngineError::ConditionEvaluationError(..) => "condition_evaluation_error",
            EngineError::TransformError(..) => "transform_error",
            EngineError::WorkflowTimeout(_) => "workflow_timeout",
            EngineError::MaxIterationsExceeded(_) => "max_iterations_exceeded",
            EngineError::CycleDetected(_) => "cycle_detected",
            EngineError::ParallelExecutionError(_) => "parallel_execution_error",
            EngineError::WebhookError { .. } => "webhook_error",
            EngineError::SubworkflowError(_) => "subworkflow_error",
        }
    }
}

#[async_trait]
pub trait WorkflowObserver: Send + Sync {
    async fn on_workflow_start(&self, _workflow_id: &str, _execution_id: &str) {}
    async fn on_workflow_end(&self, _workflow_id: &str, _execution_id: &str, _result: &Result<WorkflowValue, String>) {}
}

#[async_trait]
pub trait NodeObserver: Send + Sync {
    async fn on_node_start(&self, _node_id: &str) {}
    async fn on_node_end(&self, _node_id: &str, _status: &NodeStatus) {}
}

/// Observer dispatch swallows individual observer errors/panics-in-future so
/// a misbehaving observer never aborts the workflow it's merely watching.
#[derive(Default, Clone)]
pub struct EngineObservers {
    workflow: Vec<Arc<dyn WorkflowObserver>>,
    node: Vec<Arc<dyn NodeObserver>>,
}

impl EngineObservers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_workflow_observer(&mut self, observer: Arc<dyn WorkflowObserver>) {
        self.workflow.push(observer);
    }

    pub fn add_node_observer(&mut self, observer: Arc<dyn NodeObserver>) {
        self.node.push(observer);
    }

    async fn notify_workflow_start(&self, workflow_id: &str, execution_id: &str) {
        for o in &self.workflow {
            o.on_workflow_start(workflow_id, execution_id).await;
        }
    }

    async fn notify_workflow_end(&self, workflow_id: &str, execution_id: &str, result: &Result<WorkflowValue, String>) {
        for o in &self.workflow {
            o.on_workflow_end(workflow_id, execution_id, result).await;
        }
    }

    async fn notify_node_start(&self, node_id: &str) {
        for o in &self.node {
            o.on_node_start(node_id).await;
        }
    }

    async fn notify_node_end(&self, node_id: &str, status: &NodeStatus) {
        for o in &self.node {
            o.on_node_end(node_id, status).await;
        }
    }
}

struct ExecutionHandle {
    cancelled: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    resume_tx: Mutex<Option<oneshot::Sender<WorkflowValue>>>,
}

pub struct Engine {
    tools: HashMap<String, Arc<ToolPipeline>>,
    resolver: Arc<dyn WorkflowResolver>,
    llm: Option<Arc<dyn LlmClient>>,
    agent_invoker: Option<Arc<dyn AgentInvoker>>,
    node_factory: NodeFactory,
    observers: EngineObservers,
    handles: DashMap<String, Arc<ExecutionHandle>>,
}

impl Engine {
    pub fn new(resolver: Arc<dyn WorkflowResolver>) -> Self {
        Self {
            tools: HashMap::new(),
            resolver,
            llm: None,
            agent_invoker: None,
            node_factory: NodeFactory::new(),
            observers: EngineObservers::new(),
            handles: DashMap::new(),
        }
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_agent_invoker(mut self, invoker: Arc<dyn AgentInvoker>) -> Self {
        self.agent_invoker = Some(invoker);
        self
    }

    pub fn with_node_factory(mut self, factory: NodeFactory) -> Self {
        self.node_factory = factory;
        self
    }

    pub fn with_observers(mut self, observers: EngineObservers) -> Self {
        self.observers = observers;
        self
    }

    pub fn register_tool(&mut self, pipeline: ToolPipeline) {
        self.tools.insert(pipeline.spec.id.clone(), Arc::new(pipeline));
    }

    /// Run `workflow` to completion (or failure/timeout), returning the
    /// value written to `ctx.output_data` by the End node reached.
    pub async fn execute(&self, workflow: &Workflow, input: WorkflowValue) -> Result<WorkflowValue, EngineError> {
        let ctx = WorkflowContext::new(&workflow.id);
        ctx.set_input(input.clone()).await;
        self.execute_with_context(workflow, input, ctx).await
    }

    pub async fn execute_with_context(
        &self,
        workflow: &Workflow,
        input: WorkflowValue,
        ctx: WorkflowContext,
    ) -> Result<WorkflowValue, EngineError> {
        let start_node_id = workflow
            .start_node_id
            .clone()
            .ok_or_else(|| EngineError::WorkflowValidationError("no start node".to_string()))?;

        let handle = Arc::new(ExecutionHandle {
            cancelled: Arc::new(AtomicBool::new(false)),
            paused: Arc::new(AtomicBool::new(false)),
            resume_tx: Mutex::new(None),
        });
        let execution_id = ctx.execution_id.clone();
        let workflow_id = workflow.id.clone();
        self.handles.insert(execution_id.clone(), handle.clone());

        self.observers.notify_workflow_start(&workflow_id, &execution_id).await;

        let timeout_secs = workflow.timeout_seconds;
        let run = async move {
            self.walk(workflow, &start_node_id, input, &ctx, &handle).await
        };

        let result = match timeout_secs {
            Some(secs) => match tokio::time::timeout(Duration::from_secs(secs), run).await {
                Ok(r) => r,
                Err(_) => Err(EngineError::WorkflowTimeout(secs)),
            },
            None => run.await,
        };

        self.handles.remove(&execution_id);
        let textual = result.as_ref().map(|v| v.clone()).map_err(|e| e.to_string());
        self.observers.notify_workflow_end(&workflow_id, &execution_id, &textual).await;
        result
    }

    /// Request cancellation of a running execution. Cooperative: the next
    /// node-boundary check in the queue walk observes the flag and stops.
    pub fn cancel(&self, execution_id: &str) -> bool {
        if let Some(handle) = self.handles.get(execution_id) {
            handle.cancelled.store(true, Ordering::SeqCst);
            true
        } else {
            false
        }
    }

    pub fn pause(&self, execution_id: &str) -> bool {
        if let Some(handle) = self.handles.get(execution_id) {
            handle.paused.store(true, Ordering::SeqCst);
            true
        } else {
            false
        }
    }

    /// Supply the value a suspended `HumanInput` node is waiting on.
    pub async fn resume(&self, execution_id: &str, input: WorkflowValue) -> bool {
        let Some(handle) = self.handles.get(execution_id).map(|h| h.clone()) else {
            return false;
        };
        handle.paused.store(false, Ordering::SeqCst);
        if let Some(tx) = handle.resume_tx.lock().await.take() {
            let _ = tx.send(input);
        }
        true
    }

    async fn walk(
        &self,
        workflow: &Workflow,
        start_node_id: &str,
        input: WorkflowValue,
        ctx: &WorkflowContext,
        handle: &Arc<ExecutionHandle>,
    ) -> Result<WorkflowValue, EngineError> {
        let mut queue: VecDeque<(String, WorkflowValue)> = VecDeque::new();
        queue.push_back((start_node_id.to_string(), input));

        let mut iterations: u32 = 0;

        while let Some((node_id, payload)) = queue.pop_front() {
            if handle.cancelled.load(Ordering::SeqCst) {
                return Err(EngineError::WorkflowExecutionError("execution cancelled".to_string()));
            }
            iterations += 1;
            if iterations > workflow.max_iterations {
                return Err(EngineError::MaxIterationsExceeded(workflow.max_iterations));
            }

            let node = workflow.node(&node_id).ok_or_else(|| EngineError::NodeNotFound(node_id.clone()))?;

            ctx.set_node_state_checked(&node_id, NodeStatus::Running).await;
            self.observers.notify_node_start(&node_id).await;

            let outcome = self.execute_node(workflow, node, payload, ctx, handle).await;

            match outcome {
                Ok(NodeOutcome::Value(value)) => {
                    ctx.set_node_output(&node_id, value.clone()).await;
                    ctx.set_node_state_checked(&node_id, NodeStatus::Completed).await;
                    ctx.record_execution_step(&node_id).await;
                    self.observers.notify_node_end(&node_id, &NodeStatus::Completed).await;

                    if matches!(node.node_type, NodeType::End) {
                        return Ok(value);
                    }

                    self.route(workflow, &node_id, &value, ctx, &mut queue).await?;
                }
                Ok(NodeOutcome::Suspended) => {
                    ctx.set_node_state_checked(&node_id, NodeStatus::Paused).await;
                    self.observers.notify_node_end(&node_id, &NodeStatus::Paused).await;

                    let final_value = loop {
                        let (tx, rx) = oneshot::channel();
                        *handle.resume_tx.lock().await = Some(tx);
                        handle.paused.store(true, Ordering::SeqCst);

                        let resumed_value = rx.await.map_err(|_| {
                            EngineError::WorkflowExecutionError("execution dropped while paused".to_string())
                        })?;

                        if matches!(node.node_type, NodeType::HumanInput) {
                            match self.apply_human_input_resume(node, ctx, resumed_value).await? {
                                HumanInputRound::Complete(value) => break value,
                                HumanInputRound::StillWaiting => {
                                    ctx.set_node_state_checked(&node_id, NodeStatus::Paused).await;
                                    self.observers.notify_node_end(&node_id, &NodeStatus::Paused).await;
                                    continue;
                                }
                            }
                        } else {
                            break resumed_value;
                        }
                    };

                    ctx.set_node_state_checked(&node_id, NodeStatus::Completed).await;
                    ctx.set_node_output(&node_id, final_value.clone()).await;
                    ctx.record_execution_step(&node_id).await;
                    self.route(workflow, &node_id, &final_value, ctx, &mut queue).await?;
                }
                Err(err) => {
                    ctx.set_node_state_checked(&node_id, NodeStatus::Failed(err.to_string())).await;
                    self.observers.notify_node_end(&node_id, &NodeStatus::Failed(err.to_string())).await;
                    ctx.set_current_error(err.kind(), None, &err.to_string()).await;

                    let error_payload = wrap_error(err.kind(), &err.to_string(), None, &node_id);
                    let error_edges: Vec<_> = workflow
                        .outgoing_edges(&node_id)
                        .into_iter()
                        .filter(|e| matches!(e.edge_type, EdgeKind::Error))
                        .collect();

                    let mut routed = false;
                    for edge in error_edges {
                        if edge.can_traverse(&error_payload, ctx).await {
                            let mapped = transform_data(&edge.data_mapping, &error_payload, ctx).await;
                            queue.push_back((edge.target_node_id.clone(), mapped));
                            routed = true;
                            break;
                        }
                    }

                    if !routed {
                        return Err(err);
                    }
                    ctx.clear_current_error().await;
                }
            }
        }

        Ok(ctx.get_output_data().await)
    }

    async fn route(
        &self,
        workflow: &Workflow,
        node_id: &str,
        value: &WorkflowValue,
        ctx: &WorkflowContext,
        queue: &mut VecDeque<(String, WorkflowValue)>,
    ) -> Result<(), EngineError> {
        let mut edges = workflow.outgoing_edges(node_id);
        if edges.is_empty() {
            return Ok(());
        }
        edges.sort_by(|a, b| b.priority.cmp(&a.priority));

        let mut passing = Vec::new();
        for edge in &edges {
            if matches!(edge.edge_type, EdgeKind::Error | EdgeKind::Fallback) {
                continue;
            }
            if edge.can_traverse(value, ctx).await {
                passing.push(*edge);
            }
        }

        if passing.is_empty() {
            let fallback = edges.iter().find(|e| matches!(e.edge_type, EdgeKind::Fallback));
            if let Some(edge) = fallback {
                let mapped = transform_data(&edge.data_mapping, value, ctx).await;
                queue.push_back((edge.target_node_id.clone(), mapped));
                return Ok(());
            }
            return Err(EngineError::RoutingError(node_id.to_string()));
        }

        match workflow.routing_strategy {
            RoutingStrategy::FirstMatch => {
                let edge = passing[0];
                let mapped = transform_data(&edge.data_mapping, value, ctx).await;
                queue.push_back((edge.target_node_id.clone(), mapped));
            }
            RoutingStrategy::AllMatches => {
                for edge in passing {
                    let mapped = transform_data(&edge.data_mapping, value, ctx).await;
                    queue.push_back((edge.target_node_id.clone(), mapped));
                }
            }
        }
        Ok(())
    }

    async fn execute_node(
        &self,
        workflow: &Workflow,
        node: &NodeSpec,
        payload: WorkflowValue,
        ctx: &WorkflowContext,
        handle: &Arc<ExecutionHandle>,
    ) -> Result<NodeOutcome, EngineError> {
        match &node.node_type {
            NodeType::Start => Ok(NodeOutcome::Value(payload)),
            NodeType::End => {
                ctx.set_output_data(payload.clone()).await;
                Ok(NodeOutcome::Value(payload))
            }
            NodeType::Decision => self.execute_decision_node(node, payload, ctx).await,
            NodeType::Switch => self.execute_switch_node(node, payload, ctx).await,
            NodeType::Delay => {
                let params: DelayParams = parse_params(&node.params).unwrap_or_default();
                tokio::time::sleep(Duration::from_millis(params.delay_ms)).await;
                Ok(NodeOutcome::Value(payload))
            }
            NodeType::Transform => {
                let params: TransformParams = parse_params(&node.params)
                    .map_err(|e| EngineError::TransformError(node.id.clone(), e))?;
                let result = apply_transform(&params.transform, &payload, ctx).await;
                Ok(NodeOutcome::Value(result))
            }
            NodeType::Llm => self.execute_llm_node(node, payload, ctx).await,
            NodeType::Agent => self.execute_agent_node(workflow, node, payload, ctx).await,
            NodeType::Tool => self.execute_tool_node(node, payload, ctx).await,
            NodeType::Webhook => self.execute_webhook_node(node, payload, ctx).await,
            NodeType::HumanInput => self.execute_human_input_node(node, payload, ctx).await,
            NodeType::Subworkflow => self.execute_subworkflow_node(node, payload, ctx).await,
            NodeType::Parallel => self.execute_parallel_node(workflow, node, payload, ctx, handle).await,
            NodeType::Loop => self.execute_loop_node(workflow, node, payload, ctx, handle).await,
            NodeType::Custom(kind) => {
                let f = self.node_factory.get(kind).await.ok_or_else(|| {
                    EngineError::NodeExecutionError { node_id: node.id.clone(), message: format!("no factory registered for custom kind '{kind}'") }
                })?;
                let result = f(payload)
                    .await
                    .map_err(|e| EngineError::NodeExecutionError { node_id: node.id.clone(), message: e })?;
                Ok(NodeOutcome::Value(result))
            }
        }
    }

    async fn execute_llm_node(&self, node: &NodeSpec, payload: WorkflowValue, ctx: &WorkflowContext) -> Result<NodeOutcome, EngineError> {
        let llm = self.llm.as_ref().ok_or_else(|| EngineError::NodeExecutionError {
            node_id: node.id.clone(),
            message: "no LlmClient configured on this engine".to_string(),
        })?;
        let prompt_template = node.prompt.as_deref().unwrap_or("{input}");
        let rendered = render_braces(prompt_template, &payload, ctx).await;
        let system_prompt = node.llm_ref.as_ref().and_then(|r| r.system_prompt.as_deref());
        let output_schema = node.llm_ref.as_ref().and_then(|r| r.output_schema.as_ref());
        let result = llm
            .complete(system_prompt, &rendered, output_schema)
            .await
            .map_err(|e| EngineError::NodeExecutionError { node_id: node.id.clone(), message: e })?;
        Ok(NodeOutcome::Value(result))
    }

    async fn execute_agent_node(&self, workflow: &Workflow, node: &NodeSpec, payload: WorkflowValue, ctx: &WorkflowContext) -> Result<NodeOutcome, EngineError> {
        let invoker = self.agent_invoker.as_ref().ok_or_else(|| EngineError::NodeExecutionError {
            node_id: node.id.clone(),
            message: "no AgentInvoker configured on this engine".to_string(),
        })?;
        let agent_ref = node.agent_ref.as_ref().ok_or_else(|| EngineError::NodeValidationError(node.id.clone(), "agent node missing agent_ref".to_string()))?;
        let meta = AgentInvocationMeta {
            workflow_id: workflow.id.clone(),
            node_id: node.id.clone(),
            execution_id: ctx.execution_id.clone(),
        };
        let result = invoker
            .invoke(agent_ref, payload, meta)
            .await
            .map_err(|e| EngineError::NodeExecutionError { node_id: node.id.clone(), message: e })?;
        Ok(NodeOutcome::Value(result))
    }

    async fn execute_tool_node(&self, node: &NodeSpec, payload: WorkflowValue, ctx: &WorkflowContext) -> Result<NodeOutcome, EngineError> {
        let tool_ref = node.tool_ref.as_ref().ok_or_else(|| EngineError::NodeValidationError(node.id.clone(), "tool node missing tool_ref".to_string()))?;
        let pipeline = self.tools.get(&tool_ref.tool_id).ok_or_else(|| EngineError::NodeExecutionError {
            node_id: node.id.clone(),
            message: format!("tool '{}' is not registered on this engine", tool_ref.tool_id),
        })?;

        let args = merge_args(tool_ref.args_template.as_ref(), &payload);
        let outcome: ToolOutcome = pipeline.run(args, ctx).await.map_err(|e: ToolRuntimeError| EngineError::NodeExecutionError {
            node_id: node.id.clone(),
            message: e.to_string(),
        })?;

        if let Some(speech) = &outcome.pre_tool_speech {
            ctx.set_variable("__pre_tool_speech__", WorkflowValue::String(speech.clone())).await;
        }
        Ok(NodeOutcome::Value(outcome.result))
    }

    /// Evaluates an ordered list of `ConditionSpec`s against the payload;
    /// the first one that matches supplies the decision value, falling back
    /// to `default` when none do. The router then picks edges keyed off
    /// `$node.<this_id>.decision`.
    async fn execute_decision_node(&self, node: &NodeSpec, payload: WorkflowValue, ctx: &WorkflowContext) -> Result<NodeOutcome, EngineError> {
        let params: DecisionParams = parse_params(&node.params)
            .map_err(|e| EngineError::NodeValidationError(node.id.clone(), e))?;

        let mut decision = params.default.clone();
        for case in &params.conditions {
            if case.condition.evaluate(&payload, ctx).await {
                decision = case.result.clone();
                break;
            }
        }

        let mut out = HashMap::new();
        out.insert("decision".to_string(), decision);
        out.insert("input".to_string(), payload);
        Ok(NodeOutcome::Value(WorkflowValue::Map(out)))
    }

    /// Resolves `switch_field` (or the whole payload when absent) and finds
    /// the first case whose `values` contains it, writing `switch_target`/
    /// `switch_value`/`switch_case` to ctx for edge conditions to read.
    async fn execute_switch_node(&self, node: &NodeSpec, payload: WorkflowValue, ctx: &WorkflowContext) -> Result<NodeOutcome, EngineError> {
        let params: SwitchParams = parse_params(&node.params)
            .map_err(|e| EngineError::NodeValidationError(node.id.clone(), e))?;

        let switch_value = match &params.switch_field {
            Some(field) => super::condition::resolve_path(field, &payload, ctx).await.unwrap_or(WorkflowValue::Null),
            None => payload.clone(),
        };

        let normalize = |v: &WorkflowValue| -> String {
            let s = as_string(v);
            if params.case_sensitive { s } else { s.to_lowercase() }
        };
        let switch_key = normalize(&switch_value);

        let matched = params.cases.iter().find(|case| case.values.iter().any(|v| normalize(v) == switch_key));

        let (switch_target, switch_case) = match matched {
            Some(case) => (Some(case.target.clone()), Some(case.name.clone().unwrap_or_else(|| case.target.clone()))),
            None => (params.default_target.clone(), None),
        };

        ctx.set_variable("switch_value", switch_value.clone()).await;
        ctx.set_variable(
            "switch_target",
            switch_target.clone().map(WorkflowValue::String).unwrap_or(WorkflowValue::Null),
        )
        .await;
        ctx.set_variable(
            "switch_case",
            switch_case.clone().map(WorkflowValue::String).unwrap_or(WorkflowValue::Null),
        )
        .await;

        let mut out = HashMap::new();
        out.insert("switch_value".to_string(), switch_value);
        out.insert("switch_target".to_string(), switch_target.map(WorkflowValue::String).unwrap_or(WorkflowValue::Null));
        out.insert("switch_case".to_string(), switch_case.map(WorkflowValue::String).unwrap_or(WorkflowValue::Null));
        out.insert("input".to_string(), payload);
        Ok(NodeOutcome::Value(WorkflowValue::Map(out)))
    }

    async fn execute_webhook_node(&self, node: &NodeSpec, payload: WorkflowValue, ctx: &WorkflowContext) -> Result<NodeOutcome, EngineError> {
        let params: WebhookParams = parse_params(&node.params)
            .map_err(|e| EngineError::NodeValidationError(node.id.clone(), e))?;

        let url = render_braces(&params.url, &payload, ctx).await;
        let client = crate::tool_runtime::HttpSessionManager::global().client();
        let method = reqwest::Method::from_bytes(params.method.as_bytes())
            .map_err(|e| EngineError::NodeValidationError(node.id.clone(), e.to_string()))?;
        let mut request = client.request(method, &url);
        for (k, v) in &params.headers {
            request = request.header(k, render_braces(v, &payload, ctx).await);
        }
        if let Some(body_template) = &params.body_template {
            let rendered = render_braces(body_template, &payload, ctx).await;
            request = request.body(rendered);
        }

        let response = request.send().await.map_err(|_e| EngineError::WebhookError { url: url.clone(), status_code: None })?;
        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(EngineError::WebhookError { url, status_code: Some(status) });
        }
        let text = response.text().await.unwrap_or_default();
        let parsed = serde_json::from_str::<serde_json::Value>(&text).unwrap_or_else(|_| serde_json::Value::String(text));
        Ok(NodeOutcome::Value(WorkflowValue::Json(parsed)))
    }

    /// First pass over a `HumanInput` node: if `required_fields`/
    /// `approval_mode` are already satisfied by the `existing_values` the
    /// payload arrived with, completes immediately without ever pausing.
    /// Otherwise suspends; `walk`'s `Suspended` branch loops resume rounds
    /// through `apply_human_input_resume` until satisfied or retries run out.
    async fn execute_human_input_node(&self, node: &NodeSpec, payload: WorkflowValue, ctx: &WorkflowContext) -> Result<NodeOutcome, EngineError> {
        let params: HumanInputParams = parse_params(&node.params)
            .map_err(|e| EngineError::NodeValidationError(node.id.clone(), e))?;

        let existing_values = extract_map_field(&payload, "existing_values");
        ctx.set_variable(&hitl_existing_key(&node.id), WorkflowValue::Map(existing_values.clone())).await;
        ctx.set_variable(&hitl_retries_key(&node.id), WorkflowValue::Int(0)).await;

        let missing = missing_human_input_fields(&params.required_fields, &existing_values);
        if human_input_satisfied(&params, &missing, &existing_values) {
            return Ok(NodeOutcome::Value(human_input_result(&params, &existing_values, &missing)));
        }

        ctx.set_variable("_waiting_for_input", WorkflowValue::Bool(true)).await;
        ctx.set_variable("_waiting_node_id", WorkflowValue::String(node.id.clone())).await;
        Ok(NodeOutcome::Suspended)
    }

    /// One resume round for a suspended `HumanInput` node: merges the
    /// caller-supplied value into the accumulated `existing_values`
    /// (running an LLM extraction pass first when `extraction_prompt` is
    /// set and the resume value is free text), recomputes missing fields,
    /// and decides whether to finish or suspend again.
    async fn apply_human_input_resume(
        &self,
        node: &NodeSpec,
        ctx: &WorkflowContext,
        resumed: WorkflowValue,
    ) -> Result<HumanInputRound, EngineError> {
        let params: HumanInputParams = parse_params(&node.params)
            .map_err(|e| EngineError::NodeValidationError(node.id.clone(), e))?;

        let resumed = match (&resumed, params.extraction_prompt.as_deref(), self.llm.as_ref()) {
            (WorkflowValue::String(text), Some(prompt), Some(llm)) => {
                let rendered = format!("{prompt}\n\n{text}");
                llm.complete(None, &rendered, None).await.unwrap_or_else(|_| resumed.clone())
            }
            _ => resumed,
        };

        let existing_key = hitl_existing_key(&node.id);
        let mut existing_values = match ctx.get_variable(&existing_key).await {
            Some(WorkflowValue::Map(m)) => m,
            _ => HashMap::new(),
        };
        if let WorkflowValue::Map(updates) = &resumed {
            existing_values.extend(updates.clone());
        }
        ctx.set_variable(&existing_key, WorkflowValue::Map(existing_values.clone())).await;

        let missing = missing_human_input_fields(&params.required_fields, &existing_values);
        let satisfied = human_input_satisfied(&params, &missing, &existing_values);

        let retries_key = hitl_retries_key(&node.id);
        let retries = match ctx.get_variable(&retries_key).await {
            Some(WorkflowValue::Int(n)) => n,
            _ => 0,
        };

        if satisfied || !params.retry_on_invalid || retries + 1 >= params.max_retries as i64 {
            ctx.set_variable("_waiting_for_input", WorkflowValue::Bool(false)).await;
            return Ok(HumanInputRound::Complete(human_input_result(&params, &existing_values, &missing)));
        }

        ctx.set_variable(&retries_key, WorkflowValue::Int(retries + 1)).await;
        ctx.set_variable("_waiting_for_input", WorkflowValue::Bool(true)).await;
        Ok(HumanInputRound::StillWaiting)
    }

    async fn execute_subworkflow_node(&self, node: &NodeSpec, payload: WorkflowValue, ctx: &WorkflowContext) -> Result<NodeOutcome, EngineError> {
        let params: SubworkflowParams = parse_params(&node.params)
            .map_err(|e| EngineError::NodeValidationError(node.id.clone(), e))?;

        let child_workflow = self
            .resolver
            .resolve(&params.workflow_id)
            .await
            .ok_or_else(|| EngineError::WorkflowNotFound(params.workflow_id.clone()))?;

        let child_ctx = WorkflowContext::new(&child_workflow.id);
        for (k, v) in ctx.public_variables().await {
            child_ctx.set_variable(&k, v).await;
        }
        child_ctx.set_input(payload.clone()).await;

        let result = Box::pin(self.execute_with_context(&child_workflow, payload, child_ctx)).await;
        result
            .map(NodeOutcome::Value)
            .map_err(|e| EngineError::SubworkflowError(e.to_string()))
    }

    async fn execute_parallel_node(
        &self,
        workflow: &Workflow,
        node: &NodeSpec,
        payload: WorkflowValue,
        ctx: &WorkflowContext,
        handle: &Arc<ExecutionHandle>,
    ) -> Result<NodeOutcome, EngineError> {
        let params: ParallelParams = parse_params(&node.params)
            .map_err(|e| EngineError::NodeValidationError(node.id.clone(), e))?;

        let semaphore = Arc::new(Semaphore::new(params.max_concurrency.unwrap_or(params.branches.len().max(1))));

        let tasks = params.branches.iter().map(|branch_node_id| {
            let semaphore = semaphore.clone();
            let branch_ctx = ctx.clone_for_branch();
            let payload = payload.clone();
            let branch_node_id = branch_node_id.clone();
            let handle = handle.clone();
            async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                let branch_ctx = branch_ctx.await;
                let node = workflow.node(&branch_node_id).ok_or_else(|| EngineError::NodeNotFound(branch_node_id.clone()))?;
                let outcome = self.execute_node(workflow, node, payload, &branch_ctx, handle).await?;
                match outcome {
                    NodeOutcome::Value(v) => Ok((branch_node_id, v)),
                    NodeOutcome::Suspended => Err(EngineError::NodeExecutionError {
                        node_id: branch_node_id,
                        message: "HumanInput is not supported inside a Parallel branch".to_string(),
                    }),
                }
            }
        });

        let results: Vec<Result<(String, WorkflowValue), EngineError>> = join_all(tasks).await;

        let mut failed = Vec::new();
        let mut succeeded = HashMap::new();
        for result in results {
            match result {
                Ok((id, value)) => {
                    succeeded.insert(id, value);
                }
                Err(e) => {
                    warn!(error = %e, "parallel branch failed");
                    failed.push(e.to_string());
                }
            }
        }

        if !failed.is_empty() && params.fail_fast {
            return Err(EngineError::ParallelExecutionError(failed));
        }
        if !failed.is_empty() && !params.collect_results {
            return Err(EngineError::ParallelExecutionError(failed));
        }

        if params.collect_results {
            let map = succeeded.into_iter().map(|(k, v)| (k, v)).collect();
            Ok(NodeOutcome::Value(WorkflowValue::Map(map)))
        } else {
            Ok(NodeOutcome::Value(succeeded.into_values().next().unwrap_or(WorkflowValue::Null)))
        }
    }

    async fn execute_loop_node(
        &self,
        workflow: &Workflow,
        node: &NodeSpec,
        payload: WorkflowValue,
        ctx: &WorkflowContext,
        handle: &Arc<ExecutionHandle>,
    ) -> Result<NodeOutcome, EngineError> {
        let params: LoopParams = parse_params(&node.params)
            .map_err(|e| EngineError::NodeValidationError(node.id.clone(), e))?;
        let body_node = workflow.node(&params.body_node_id).ok_or_else(|| EngineError::NodeNotFound(params.body_node_id.clone()))?;

        let max_iterations = params.max_iterations.unwrap_or(workflow.max_iterations);
        let mut current = payload;
        let mut accumulated: Vec<WorkflowValue> = match &params.accumulator_var {
            Some(name) => match ctx.get_variable(name).await {
                Some(WorkflowValue::List(l)) => l,
                _ => Vec::new(),
            },
            None => Vec::new(),
        };

        for iteration in 0..max_iterations {
            if handle.cancelled.load(Ordering::SeqCst) {
                return Err(EngineError::WorkflowExecutionError("execution cancelled".to_string()));
            }
            let outcome = self.execute_node(workflow, body_node, current.clone(), ctx, handle).await?;
            current = match outcome {
                NodeOutcome::Value(v) => v,
                NodeOutcome::Suspended => {
                    return Err(EngineError::NodeExecutionError {
                        node_id: body_node.id.clone(),
                        message: "HumanInput is not supported inside a Loop body".to_string(),
                    })
                }
            };

            let iteration_count = iteration + 1;
            ctx.set_variable(&params.iteration_var, WorkflowValue::Int(iteration_count as i64)).await;

            if let Some(acc_var) = &params.accumulator_var {
                accumulated.push(current.clone());
                ctx.set_variable(acc_var, WorkflowValue::List(accumulated.clone())).await;
            }

            debug!(loop_node = %node.id, iteration = iteration_count, "loop iteration complete");

            let should_exit = if let Some(exit_condition) = &params.exit_condition {
                exit_condition.evaluate(&current, ctx).await
            } else if let Some(exit_field) = &params.exit_field {
                match super::condition::resolve_path(exit_field, &current, ctx).await {
                    Some(resolved) => match &params.exit_value {
                        Some(expected) => super::condition::values_equal(&resolved, expected),
                        None => matches!(resolved, WorkflowValue::Bool(true)),
                    },
                    None => false,
                }
            } else {
                false
            };

            if should_exit {
                return Ok(NodeOutcome::Value(loop_result(current, &params, iteration_count, &accumulated, true)));
            }
        }

        info!(loop_node = %node.id, max_iterations, "loop exhausted max iterations without meeting exit condition");
        Ok(NodeOutcome::Value(loop_result(current, &params, max_iterations, &accumulated, false)))
    }
}

fn loop_result(data: WorkflowValue, params: &LoopParams, iteration: u32, accumulated: &[WorkflowValue], exited_early: bool) -> WorkflowValue {
    let mut out = HashMap::new();
    out.insert("continue_loop".to_string(), WorkflowValue::Bool(false));
    out.insert("iteration".to_string(), WorkflowValue::Int(iteration as i64));
    out.insert("data".to_string(), data);
    if params.accumulator_var.is_some() {
        out.insert("accumulated".to_string(), WorkflowValue::List(accumulated.to_vec()));
    }
    out.insert("exited_early".to_string(), WorkflowValue::Bool(exited_early));
    WorkflowValue::Map(out)
}

enum NodeOutcome {
    Value(WorkflowValue),
    Suspended,
}

enum HumanInputRound {
    Complete(WorkflowValue),
    StillWaiting,
}

fn hitl_existing_key(node_id: &str) -> String {
    format!("_hitl_existing_{node_id}")
}

fn hitl_retries_key(node_id: &str) -> String {
    format!("_hitl_retries_{node_id}")
}

fn extract_map_field(payload: &WorkflowValue, field: &str) -> HashMap<String, WorkflowValue> {
    if let WorkflowValue::Map(m) = payload {
        if let Some(WorkflowValue::Map(inner)) = m.get(field) {
            return inner.clone();
        }
    }
    HashMap::new()
}

fn missing_human_input_fields(required: &[String], values: &HashMap<String, WorkflowValue>) -> Vec<String> {
    required
        .iter()
        .filter(|f| !matches!(values.get(*f), Some(v) if !v.is_null()))
        .cloned()
        .collect()
}

fn human_input_satisfied(params: &HumanInputParams, missing: &[String], values: &HashMap<String, WorkflowValue>) -> bool {
    missing.is_empty() && (!params.approval_mode || values.contains_key("approved"))
}

fn human_input_result(params: &HumanInputParams, values: &HashMap<String, WorkflowValue>, missing: &[String]) -> WorkflowValue {
    let mut out = HashMap::new();
    out.insert("user_input".to_string(), WorkflowValue::Map(values.clone()));
    out.insert(
        "fields".to_string(),
        WorkflowValue::List(params.required_fields.iter().map(|f| WorkflowValue::String(f.clone())).collect()),
    );
    out.insert("complete".to_string(), WorkflowValue::Bool(missing.is_empty()));
    out.insert(
        "missing_fields".to_string(),
        WorkflowValue::List(missing.iter().map(|f| WorkflowValue::String(f.clone())).collect()),
    );
    if params.approval_mode {
        out.insert("approved".to_string(), values.get("approved").cloned().unwrap_or(WorkflowValue::Bool(false)));
    }
    WorkflowValue::Map(out)
}

fn parse_params<T: for<'de> Deserialize<'de> + Default>(params: &serde_json::Value) -> Result<T, String> {
    if params.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(params.clone()).map_err(|e| e.to_string())
}

/// Tool args are the payload by default; an `args_template` on the `ToolRef`
/// provides defaults that the payload's own fields (when it's a `Map`)
/// override.
fn merge_args(args_template: Option<&serde_json::Value>, payload: &WorkflowValue) -> WorkflowValue {
    let Some(template) = args_template else {
        return payload.clone();
    };
    let mut merged = template.clone();
    if let (Some(obj), WorkflowValue::Map(m)) = (merged.as_object_mut(), payload) {
        for (k, v) in m {
            if let Ok(json_v) = serde_json::to_value(v) {
                obj.insert(k.clone(), json_v);
            }
        }
    }
    WorkflowValue::Json(merged)
}

#[derive(Debug, Clone, Deserialize)]
struct DecisionCase {
    condition: ConditionGroup,
    result: WorkflowValue,
}

#[derive(Debug, Deserialize)]
struct DecisionParams {
    #[serde(default)]
    conditions: Vec<DecisionCase>,
    #[serde(default = "default_decision_value")]
    default: WorkflowValue,
}

fn default_decision_value() -> WorkflowValue {
    WorkflowValue::Null
}

impl Default for DecisionParams {
    fn default() -> Self {
        Self { conditions: Vec::new(), default: WorkflowValue::Null }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct SwitchCase {
    values: Vec<WorkflowValue>,
    target: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SwitchParams {
    switch_field: Option<String>,
    #[serde(default)]
    cases: Vec<SwitchCase>,
    #[serde(default)]
    default_target: Option<String>,
    #[serde(default)]
    case_sensitive: bool,
}

impl Default for SwitchParams {
    fn default() -> Self {
        Self { switch_field: None, cases: Vec::new(), default_target: None, case_sensitive: false }
    }
}

#[derive(Debug, Default, Deserialize)]
struct DelayParams {
    #[serde(default)]
    delay_ms: u64,
}

#[derive(Debug, Deserialize)]
struct TransformParams {
    transform: DataTransform,
}

impl Default for TransformParams {
    fn default() -> Self {
        Self { transform: DataTransform::Extract { path: "$output".to_string() } }
    }
}

#[derive(Debug, Deserialize)]
struct WebhookParams {
    url: String,
    #[serde(default = "default_webhook_method")]
    method: String,
    #[serde(default)]
    headers: HashMap<String, String>,
    body_template: Option<String>,
}

fn default_webhook_method() -> String {
    "POST".to_string()
}

impl Default for WebhookParams {
    fn default() -> Self {
        Self { url: String::new(), method: default_webhook_method(), headers: HashMap::new(), body_template: None }
    }
}

#[derive(Debug, Deserialize)]
struct SubworkflowParams {
    workflow_id: String,
}

impl Default for SubworkflowParams {
    fn default() -> Self {
        Self { workflow_id: String::new() }
    }
}

#[derive(Debug, Deserialize)]
struct ParallelParams {
    branches: Vec<String>,
    #[serde(default)]
    fail_fast: bool,
    #[serde(default = "default_true")]
    collect_results: bool,
    max_concurrency: Option<usize>,
}

fn default_true() -> bool {
    true
}

impl Default for ParallelParams {
    fn default() -> Self {
        Self { branches: Vec::new(), fail_fast: false, collect_results: true, max_concurrency: None }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct HumanInputParams {
    #[serde(default)]
    required_fields: Vec<String>,
    #[serde(default)]
    approval_mode: bool,
    #[serde(default)]
    retry_on_invalid: bool,
    #[serde(default = "default_max_retries")]
    max_retries: u32,
    #[serde(default)]
    extraction_prompt: Option<String>,
}

fn default_max_retries() -> u32 {
    3
}

impl Default for HumanInputParams {
    fn default() -> Self {
        Self {
            required_fields: Vec::new(),
            approval_mode: false,
            retry_on_invalid: false,
            max_retries: default_max_retries(),
            extraction_prompt: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LoopParams {
    body_node_id: String,
    exit_field: Option<String>,
    #[serde(default)]
    exit_value: Option<WorkflowValue>,
    #[serde(default)]
    exit_condition: Option<ConditionGroup>,
    max_iterations: Option<u32>,
    #[serde(default = "default_iteration_var")]
    iteration_var: String,
    #[serde(default)]
    accumulator_var: Option<String>,
}

fn default_iteration_var() -> String {
    "loop_iteration".to_string()
}

impl Default for LoopParams {
    fn default() -> Self {
        Self {
            body_node_id: String::new(),
            exit_field: None,
            exit_value: None,
            exit_condition: None,
            max_iterations: None,
            iteration_var: default_iteration_var(),
            accumulator_var: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::collaborators::{EchoLlmClient, InMemoryWorkflowResolver};
    use crate::workflow::spec::{Condition, ConditionOperator, JoinOp, NodeType};
    use crate::workflow::spec_builder::{EdgeSpecBuilder, NodeSpecBuilder, WorkflowBuilder};

    fn engine() -> Engine {
        Engine::new(Arc::new(InMemoryWorkflowResolver::new())).with_llm(Arc::new(EchoLlmClient))
    }

    #[tokio::test]
    async fn sequential_start_to_end_passes_input_through() {
        let workflow = WorkflowBuilder::new("wf1", "Simple")
            .node(NodeSpecBuilder::new("start", "Start", NodeType::Start).build())
            .node(NodeSpecBuilder::new("end", "End", NodeType::End).build())
            .edge(EdgeSpecBuilder::new("e1", "start", "end").build())
            .build();

        let result = engine().execute(&workflow, WorkflowValue::String("hi".to_string())).await.unwrap();
        assert_eq!(result.as_str(), Some("hi"));
    }

    #[tokio::test]
    async fn conditional_routing_picks_matching_edge() {
        let cond_edge = EdgeSpecBuilder::new("e2", "decide", "yes").condition(
            JoinOp::And,
            vec![Condition {
                field: "$output.go".to_string(),
                operator: ConditionOperator::Equals,
                value: WorkflowValue::Bool(true),
                negate: false,
            }],
        ).build();

        let workflow = WorkflowBuilder::new("wf2", "Branch")
            .node(NodeSpecBuilder::new("start", "Start", NodeType::Start).build())
            .node(NodeSpecBuilder::new("decide", "Decide", NodeType::Decision).build())
            .node(NodeSpecBuilder::new("yes", "Yes", NodeType::End).build())
            .node(NodeSpecBuilder::new("no", "No", NodeType::End).build())
            .edge(EdgeSpecBuilder::new("e1", "start", "decide").build())
            .edge(cond_edge)
            .edge(EdgeSpecBuilder::new("e3", "decide", "no").build())
            .build();

        let input = WorkflowValue::Map(HashMap::from([("go".to_string(), WorkflowValue::Bool(true))]));
        let result = engine().execute(&workflow, input).await.unwrap();
        match result {
            WorkflowValue::Map(m) => assert_eq!(m.get("go"), Some(&WorkflowValue::Bool(true))),
            _ => panic!("expected map passthrough"),
        }
    }
}
