//! Serializable workflow specification types.
//!
//! Unlike [`super::node::WorkflowNode`], which historically carried boxed
//! closures, everything here is plain data: it round-trips through JSON and
//! the spec registry unchanged.

use super::state::WorkflowValue;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How the router selects among passing outgoing edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutingStrategy {
    FirstMatch,
    AllMatches,
}

impl Default for RoutingStrategy {
    fn default() -> Self {
        RoutingStrategy::FirstMatch
    }
}

/// Lifecycle status of a workflow *spec* in the registry (distinct from a
/// running execution's [`super::state::WorkflowStatus`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatusLabel {
    Draft,
    PendingReview,
    Approved,
    Rejected,
    Published,
    Archived,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowMetadata {
    #[serde(default = "default_status")]
    pub status: WorkflowStatusLabel,
    #[serde(default)]
    pub tags: Vec<String>,
    pub owner: Option<String>,
    pub env: Option<String>,
    #[serde(default)]
    pub created_at: u64,
    #[serde(default)]
    pub updated_at: u64,
}

fn default_status() -> WorkflowStatusLabel {
    WorkflowStatusLabel::Draft
}

impl Default for WorkflowMetadata {
    fn default() -> Self {
        Self {
            status: WorkflowStatusLabel::Draft,
            tags: Vec::new(),
            owner: None,
            env: None,
            created_at: 0,
            updated_at: 0,
        }
    }
}

/// A complete, persistable workflow definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: String,
    pub nodes: Vec<NodeSpec>,
    pub edges: Vec<EdgeSpec>,
    pub start_node_id: Option<String>,
    #[serde(default)]
    pub end_node_ids: Vec<String>,
    #[serde(default)]
    pub routing_strategy: RoutingStrategy,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    pub timeout_seconds: Option<u64>,
    #[serde(default)]
    pub metadata: WorkflowMetadata,
}

fn default_max_iterations() -> u32 {
    100
}

impl Workflow {
    pub fn node(&self, id: &str) -> Option<&NodeSpec> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn outgoing_edges(&self, node_id: &str) -> Vec<&EdgeSpec> {
        self.edges.iter().filter(|e| e.source_node_id == node_id).collect()
    }
}

/// What kind of payload flows through a node's input/output port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IoType {
    Text,
    Speech,
    Json,
    Image,
    Audio,
    Video,
    Binary,
    Structured,
    Stream,
    Any,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IoSpec {
    pub io_type: Option<IoType>,
    pub format: Option<String>,
    pub schema: Option<serde_json::Value>,
}

/// Discriminant for a node. `Custom` carries the registered subtype name
/// looked up via the node factory at execute time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "subtype", rename_all = "snake_case")]
pub enum NodeType {
    Start,
    End,
    Llm,
    Agent,
    Tool,
    Subworkflow,
    Decision,
    Switch,
    Parallel,
    Loop,
    Transform,
    Webhook,
    HumanInput,
    Delay,
    Custom(String),
}

impl NodeType {
    pub fn display_name(&self) -> &str {
        match self {
            NodeType::Start => "Start",
            NodeType::End => "End",
            NodeType::Llm => "LLM",
            NodeType::Agent => "Agent",
            NodeType::Tool => "Tool",
            NodeType::Subworkflow => "Subworkflow",
            NodeType::Decision => "Decision",
            NodeType::Switch => "Switch",
            NodeType::Parallel => "Parallel",
            NodeType::Loop => "Loop",
            NodeType::Transform => "Transform",
            NodeType::Webhook => "Webhook",
            NodeType::HumanInput => "HumanInput",
            NodeType::Delay => "Delay",
            NodeType::Custom(name) => name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRef {
    pub agent_id: Option<String>,
    pub output_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRef {
    pub tool_id: String,
    pub tool_version: Option<String>,
    pub args_template: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRef {
    pub llm_id: Option<String>,
    pub system_prompt: Option<String>,
    pub output_schema: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserPromptConfig {
    pub precedence: Option<String>,
    pub merge_strategy: Option<String>,
    pub max_length: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignOperator {
    Set,
    SetIfExists,
    SetIfTruthy,
    Append,
    Increment,
    Transform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformExecution {
    Sync,
    Async,
    Await,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnAssignError {
    Ignore,
    Log,
    Raise,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableAssignment {
    pub target: String,
    pub source_field: String,
    #[serde(default)]
    pub default_value: Option<WorkflowValue>,
    #[serde(default)]
    pub transform_expr: Option<String>,
    #[serde(default)]
    pub transform_func_name: Option<String>,
    #[serde(default = "default_assign_operator")]
    pub operator: AssignOperator,
    #[serde(default = "default_transform_execution")]
    pub transform_execution: TransformExecution,
    #[serde(default = "default_on_assign_error")]
    pub on_error: OnAssignError,
}

fn default_assign_operator() -> AssignOperator {
    AssignOperator::Set
}
fn default_transform_execution() -> TransformExecution {
    TransformExecution::Sync
}
fn default_on_assign_error() -> OnAssignError {
    OnAssignError::Log
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeDisplay {
    pub label: Option<String>,
    pub position_x: Option<f64>,
    pub position_y: Option<f64>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeExecConfig {
    #[serde(default = "default_timeout_s")]
    pub timeout_s: u64,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_s: f64,
    #[serde(default)]
    pub cache_enabled: bool,
    pub cache_ttl_s: Option<u64>,
}

fn default_timeout_s() -> u64 {
    30
}
fn default_retry_delay() -> f64 {
    1.0
}

impl Default for NodeExecConfig {
    fn default() -> Self {
        Self {
            timeout_s: default_timeout_s(),
            max_retries: 0,
            retry_delay_s: default_retry_delay(),
            cache_enabled: false,
            cache_ttl_s: None,
        }
    }
}

/// A single node's full specification. Node-kind-specific fields live in
/// `params` (a JSON blob interpreted by each kind's executor in
/// `workflow::node`), keeping this struct flat and serializable regardless
/// of which kind it describes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: String,
    pub name: String,
    pub node_type: NodeType,
    #[serde(default)]
    pub description: String,
    pub agent_ref: Option<AgentRef>,
    pub tool_ref: Option<ToolRef>,
    pub llm_ref: Option<LlmRef>,
    pub prompt: Option<String>,
    #[serde(default)]
    pub input_spec: IoSpec,
    #[serde(default)]
    pub output_spec: IoSpec,
    #[serde(default)]
    pub background_agents: Vec<String>,
    pub user_prompt_config: Option<UserPromptConfig>,
    #[serde(default)]
    pub dynamic_variables: Vec<VariableAssignment>,
    #[serde(default)]
    pub display: NodeDisplay,
    #[serde(default)]
    pub config: NodeExecConfig,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Node-kind-specific parameters (switch cases, loop bounds, webhook
    /// url/method, HITL required fields, ...). See `workflow::node` for the
    /// shape each `NodeType` expects.
    #[serde(default)]
    pub params: serde_json::Value,
}

impl NodeSpec {
    pub fn new(id: impl Into<String>, name: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            node_type,
            description: String::new(),
            agent_ref: None,
            tool_ref: None,
            llm_ref: None,
            prompt: None,
            input_spec: IoSpec::default(),
            output_spec: IoSpec::default(),
            background_agents: Vec::new(),
            user_prompt_config: None,
            dynamic_variables: Vec::new(),
            display: NodeDisplay::default(),
            config: NodeExecConfig::default(),
            metadata: HashMap::new(),
            params: serde_json::Value::Null,
        }
    }
}

/// Kind of an edge, widened from the teacher's four-variant `EdgeType`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "custom_kind", rename_all = "snake_case")]
pub enum EdgeKind {
    Default,
    Conditional,
    Error,
    Timeout,
    Fallback,
    LoopBack,
    ParallelJoin,
    Custom(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    Gt,
    Lt,
    Ge,
    Le,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    MatchesRegex,
    InList,
    NotInList,
    IsEmpty,
    IsNotEmpty,
    IsTrue,
    IsFalse,
    Custom,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: ConditionOperator,
    #[serde(default = "default_condition_value")]
    pub value: WorkflowValue,
    #[serde(default)]
    pub negate: bool,
}

fn default_condition_value() -> WorkflowValue {
    WorkflowValue::Null
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionGroup {
    pub conditions: Vec<Condition>,
    #[serde(default = "default_join_op")]
    pub join: JoinOp,
}

fn default_join_op() -> JoinOp {
    JoinOp::And
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeSpec {
    pub id: String,
    pub source_node_id: String,
    pub target_node_id: String,
    pub edge_type: EdgeKind,
    pub condition: Option<ConditionGroup>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_weight")]
    pub weight: f64,
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub data_mapping: HashMap<String, String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

fn default_weight() -> f64 {
    1.0
}

impl EdgeSpec {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>, edge_type: EdgeKind) -> Self {
        Self {
            id: id.into(),
            source_node_id: source.into(),
            target_node_id: target.into(),
            edge_type,
            condition: None,
            priority: 0,
            weight: default_weight(),
            timeout_ms: None,
            data_mapping: HashMap::new(),
            metadata: HashMap::new(),
        }
    }
}

// --- Tool specs -----------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnType {
    Json,
    Text,
    Toon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnTarget {
    Human,
    Llm,
    Agent,
    Step,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub type_name: String,
    #[serde(default)]
    pub required: bool,
    pub default: Option<WorkflowValue>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionToolSpec {
    pub function_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpToolSpec {
    pub url: String,
    #[serde(default = "default_http_method")]
    pub method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    pub body_template: Option<serde_json::Value>,
}

fn default_http_method() -> String {
    "GET".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DbProvider {
    Postgres,
    MySql,
    Sqlite,
    DynamoDb,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbToolSpec {
    pub provider: DbProvider,
    pub connection_ref: String,
    pub statement: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "tool_type", rename_all = "snake_case")]
pub enum ToolKind {
    Function(FunctionToolSpec),
    Http(HttpToolSpec),
    Db(DbToolSpec),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay")]
    pub base_delay_s: f64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    #[serde(default = "default_max_delay")]
    pub max_delay_s: f64,
    #[serde(default = "default_jitter")]
    pub jitter: bool,
    #[serde(default = "default_retry_statuses")]
    pub retry_on_status: Vec<u16>,
}

fn default_multiplier() -> f64 {
    2.0
}
fn default_max_delay() -> f64 {
    30.0
}
fn default_jitter() -> bool {
    true
}
fn default_retry_statuses() -> Vec<u16> {
    vec![429, 500, 502, 503, 504]
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay_s: default_retry_delay(),
            multiplier: default_multiplier(),
            max_delay_s: default_max_delay(),
            jitter: default_jitter(),
            retry_on_status: default_retry_statuses(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerSpec {
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_recovery_timeout")]
    pub recovery_timeout_s: u64,
    #[serde(default = "default_half_open_calls")]
    pub half_open_max_calls: u32,
}

fn default_failure_threshold() -> u32 {
    5
}
fn default_recovery_timeout() -> u64 {
    30
}
fn default_half_open_calls() -> u32 {
    1
}

impl Default for CircuitBreakerSpec {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            recovery_timeout_s: default_recovery_timeout(),
            half_open_max_calls: default_half_open_calls(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdempotencySpec {
    #[serde(default)]
    pub enabled: bool,
    pub key_field: Option<String>,
    pub ttl_s: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InterruptionSpec {
    /// If true, the tool call cannot be cancelled mid-flight.
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechContextScope {
    FullContext,
    ToolOnly,
    LastMessage,
    Custom,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PreToolSpeechSpec {
    Constant { text: String },
    Random { choices: Vec<String> },
    Auto { scope: SpeechContextScope },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExecutionMode {
    Sequential,
    Parallel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub id: String,
    pub version: String,
    pub tool_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub kind: ToolKind,
    #[serde(default)]
    pub parameters: Vec<ParamSpec>,
    #[serde(default = "default_return_type")]
    pub return_type: ReturnType,
    #[serde(default = "default_return_target")]
    pub return_target: ReturnTarget,
    #[serde(default = "default_timeout_s")]
    pub timeout_s: u64,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerSpec,
    #[serde(default)]
    pub idempotency: IdempotencySpec,
    #[serde(default)]
    pub interruption: InterruptionSpec,
    pub pre_tool_speech: Option<PreToolSpeechSpec>,
    #[serde(default = "default_execution_mode")]
    pub execution: ExecutionMode,
    #[serde(default)]
    pub dynamic_variables: Vec<VariableAssignment>,
    #[serde(default)]
    pub metrics_tags: HashMap<String, String>,
}

fn default_return_type() -> ReturnType {
    ReturnType::Json
}
fn default_return_target() -> ReturnTarget {
    ReturnTarget::Step
}
fn default_execution_mode() -> ExecutionMode {
    ExecutionMode::Sequential
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_roundtrips_through_json() {
        let mut wf = Workflow {
            id: "wf-1".into(),
            name: "demo".into(),
            version: "1.0.0".into(),
            description: String::new(),
            nodes: vec![NodeSpec::new("start", "Start", NodeType::Start)],
            edges: vec![],
            start_node_id: Some("start".into()),
            end_node_ids: vec![],
            routing_strategy: RoutingStrategy::FirstMatch,
            max_iterations: 100,
            timeout_seconds: None,
            metadata: WorkflowMetadata::default(),
        };
        wf.edges.push(EdgeSpec::new("e1", "start", "start", EdgeKind::Default));

        let json = serde_json::to_string(&wf).unwrap();
        let back: Workflow = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, wf.id);
        assert_eq!(back.nodes.len(), 1);
        assert_eq!(back.edges.len(), 1);
    }

    #[test]
    fn node_type_custom_roundtrips() {
        let nt = NodeType::Custom("special".into());
        let json = serde_json::to_string(&nt).unwrap();
        let back: NodeType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, nt);
    }
}
