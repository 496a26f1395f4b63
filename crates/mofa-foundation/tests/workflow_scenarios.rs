//! End-to-end scenario tests for the workflow engine, tool runtime, and
//! spec registry working together.
//!
//! Each test below exercises one full path through `Engine::execute` using
//! only the public `spec_builder`/`collaborators`/`tool_runtime` surface, the
//! same way a workflow author would assemble a graph and run it. Deterministic
//! test doubles (`EchoLlmClient`, a local `AgentInvoker`, `FunctionToolExecutor`)
//! stand in for real backends.
//!
//! # Running
//!
//! ```bash
//! cargo test -p mofa-foundation --test workflow_scenarios
//! ```

use std::collections::HashMap;
use std::pin::Pin;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use mofa_foundation::tool_runtime::idempotency::InMemoryIdempotencyStore;
use mofa_foundation::tool_runtime::{FunctionToolExecutor, ToolExecutor, ToolPipeline};
use mofa_foundation::workflow::collaborators::{AgentInvocationMeta, AgentInvoker, InMemoryWorkflowResolver, NodeFactory};
use mofa_foundation::workflow::engine::{Engine, EngineError};
use mofa_foundation::workflow::spec::{
    AgentRef, CircuitBreakerSpec, Condition, ConditionOperator, FunctionToolSpec, JoinOp, NodeType,
    ReturnTarget, ReturnType, RetryConfig, ToolKind, ToolRef, ToolSpec,
};
use mofa_foundation::workflow::spec_builder::{EdgeSpecBuilder, NodeSpecBuilder, WorkflowBuilder};
use mofa_foundation::workflow::state::WorkflowValue;

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Invokes agents by upper-casing whatever string came in, tagged with the
/// agent id it was told to call — enough to prove routing/meta reached it.
struct UpperCaseAgentInvoker;

#[async_trait]
impl AgentInvoker for UpperCaseAgentInvoker {
    async fn invoke(
        &self,
        agent_ref: &AgentRef,
        input: WorkflowValue,
        _meta: AgentInvocationMeta,
    ) -> Result<WorkflowValue, String> {
        let text = input.as_str().unwrap_or_default();
        let agent_id = agent_ref.agent_id.as_deref().unwrap_or("unknown");
        Ok(WorkflowValue::String(format!("{agent_id}:{}", text.to_uppercase())))
    }
}

fn base_tool_spec(id: &str) -> ToolSpec {
    ToolSpec {
        id: id.to_string(),
        version: "1.0.0".to_string(),
        tool_name: id.to_string(),
        description: String::new(),
        kind: ToolKind::Function(FunctionToolSpec { function_name: id.to_string() }),
        parameters: vec![],
        return_type: ReturnType::Json,
        return_target: ReturnTarget::Step,
        timeout_s: 5,
        retry: RetryConfig { max_retries: 0, base_delay_s: 0.001, multiplier: 1.0, max_delay_s: 0.01, jitter: false, retry_on_status: vec![] },
        circuit_breaker: CircuitBreakerSpec { failure_threshold: 5, recovery_timeout_s: 30, half_open_max_calls: 1 },
        idempotency: Default::default(),
        interruption: Default::default(),
        pre_tool_speech: None,
        execution: mofa_foundation::workflow::spec::ExecutionMode::Sequential,
        dynamic_variables: vec![],
        metrics_tags: Default::default(),
    }
}

fn boxed_fn<F, Fut>(f: F) -> mofa_foundation::workflow::collaborators::CustomNodeFn
where
    F: Fn(WorkflowValue) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<WorkflowValue, String>> + Send + 'static,
{
    Arc::new(move |v| Box::pin(f(v)) as Pin<Box<dyn Future<Output = Result<WorkflowValue, String>> + Send>>)
}

// ─────────────────────────────────────────────────────────────────────────────
// S1 — sequential Start -> Agent -> End
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn s1_sequential_start_agent_end() {
    let workflow = WorkflowBuilder::new("s1", "Sequential agent call")
        .node(NodeSpecBuilder::new("start", "Start", NodeType::Start).build())
        .node(
            NodeSpecBuilder::new("agent", "Agent", NodeType::Agent)
                .agent_ref(AgentRef { agent_id: Some("greeter".to_string()), output_key: None })
                .build(),
        )
        .node(NodeSpecBuilder::new("end", "End", NodeType::End).build())
        .edge(EdgeSpecBuilder::new("e1", "start", "agent").build())
        .edge(EdgeSpecBuilder::new("e2", "agent", "end").build())
        .build();

    let engine = Engine::new(Arc::new(InMemoryWorkflowResolver::new()))
        .with_agent_invoker(Arc::new(UpperCaseAgentInvoker));

    let result = engine
        .execute(&workflow, WorkflowValue::String("hello".to_string()))
        .await
        .expect("workflow should complete");

    assert_eq!(result.as_str(), Some("greeter:HELLO"));
}

// ─────────────────────────────────────────────────────────────────────────────
// S2 — conditional routing via a Decision node, with edge priority ordering
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn s2_decision_routes_on_highest_priority_matching_edge() {
    // Two edges out of "decide" both match the payload; "to_vip" carries the
    // higher priority and must win over "to_standard" even though it's added
    // second.
    let to_standard = EdgeSpecBuilder::new("e_standard", "decide", "standard")
        .condition(
            JoinOp::And,
            vec![Condition {
                field: "$output.tier".to_string(),
                operator: ConditionOperator::Equals,
                value: WorkflowValue::String("gold".to_string()),
                negate: false,
            }],
        )
        .priority(1)
        .build();

    let to_vip = EdgeSpecBuilder::new("e_vip", "decide", "vip")
        .condition(
            JoinOp::And,
            vec![Condition {
                field: "$output.tier".to_string(),
                operator: ConditionOperator::Equals,
                value: WorkflowValue::String("gold".to_string()),
                negate: false,
            }],
        )
        .priority(10)
        .build();

    let workflow = WorkflowBuilder::new("s2", "Tiered routing")
        .node(NodeSpecBuilder::new("start", "Start", NodeType::Start).build())
        .node(NodeSpecBuilder::new("decide", "Decide", NodeType::Decision).build())
        .node(NodeSpecBuilder::new("standard", "Standard", NodeType::End).build())
        .node(NodeSpecBuilder::new("vip", "VIP", NodeType::End).build())
        .edge(EdgeSpecBuilder::new("e0", "start", "decide").build())
        .edge(to_standard)
        .edge(to_vip)
        .build();

    let engine = Engine::new(Arc::new(InMemoryWorkflowResolver::new()));
    let input = WorkflowValue::Map(HashMap::from([("tier".to_string(), WorkflowValue::String("gold".to_string()))]));
    let result = engine.execute(&workflow, input).await.expect("should route");

    match result {
        WorkflowValue::Map(m) => assert_eq!(m.get("tier").and_then(|v| v.as_str()), Some("gold")),
        other => panic!("expected passthrough map, got {other:?}"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// S3 — tool retry + circuit breaker: 5 consecutive failures trip the breaker
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn s3_circuit_breaker_opens_after_five_consecutive_failures() {
    let calls = Arc::new(AtomicU32::new(0));
    let calls_for_executor = calls.clone();
    let executor: Arc<dyn ToolExecutor> = Arc::new(FunctionToolExecutor::new(Arc::new(move |_args| {
        let calls = calls_for_executor.clone();
        Box::pin(async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("503 Service Unavailable".to_string())
        })
    })));

    let mut spec = base_tool_spec("flaky_upstream");
    spec.circuit_breaker.failure_threshold = 5;
    let pipeline = ToolPipeline::new(spec.clone(), executor, Arc::new(InMemoryIdempotencyStore::new()));

    let workflow = WorkflowBuilder::new("s3", "Flaky tool call")
        .node(NodeSpecBuilder::new("start", "Start", NodeType::Start).build())
        .node(
            NodeSpecBuilder::new("call", "Call upstream", NodeType::Tool)
                .tool_ref(ToolRef { tool_id: spec.id.clone(), tool_version: None, args_template: None })
                .build(),
        )
        .node(NodeSpecBuilder::new("end", "End", NodeType::End).build())
        .edge(EdgeSpecBuilder::new("e1", "start", "call").build())
        .edge(EdgeSpecBuilder::new("e2", "call", "end").build())
        .build();

    let mut engine = Engine::new(Arc::new(InMemoryWorkflowResolver::new()));
    engine.register_tool(pipeline);

    // Five consecutive 503s trip the breaker (failure_threshold = 5).
    for attempt in 0..5 {
        let err = engine
            .execute(&workflow, WorkflowValue::Null)
            .await
            .expect_err("upstream is down, call must fail");
        let message = err.to_string();
        assert!(
            message.contains("503"),
            "attempt {attempt} should surface the upstream failure, got: {message}"
        );
    }
    assert_eq!(calls.load(Ordering::SeqCst), 5, "each failed attempt should reach the executor once (no retries)");

    // The sixth call never reaches the executor — the breaker is open.
    let sixth = engine.execute(&workflow, WorkflowValue::Null).await.expect_err("breaker should be open");
    assert!(
        sixth.to_string().contains("circuit breaker open"),
        "expected a circuit-open error, got: {sixth}"
    );
    assert_eq!(calls.load(Ordering::SeqCst), 5, "the open breaker must short-circuit before calling the executor");
}

// ─────────────────────────────────────────────────────────────────────────────
// S4 — Parallel: fail_fast=true propagates, fail_fast=false+collect_results
// returns the partial success map
// ─────────────────────────────────────────────────────────────────────────────

fn parallel_workflow(fail_fast: bool, collect_results: bool) -> mofa_foundation::workflow::spec::Workflow {
    let params = serde_json::json!({
        "branches": ["ok_branch", "boom_branch"],
        "fail_fast": fail_fast,
        "collect_results": collect_results,
    });

    WorkflowBuilder::new("s4", "Parallel fan-out")
        .node(NodeSpecBuilder::new("start", "Start", NodeType::Start).build())
        .node(NodeSpecBuilder::new("ok_branch", "OK branch", NodeType::Custom("echo_ok".to_string())).build())
        .node(NodeSpecBuilder::new("boom_branch", "Boom branch", NodeType::Custom("always_fail".to_string())).build())
        .node(NodeSpecBuilder::new("parallel", "Fan out", NodeType::Parallel).params(params).build())
        .node(NodeSpecBuilder::new("end", "End", NodeType::End).build())
        .edge(EdgeSpecBuilder::new("e1", "start", "parallel").build())
        .edge(EdgeSpecBuilder::new("e2", "parallel", "end").build())
        .build()
}

#[tokio::test]
async fn s4_parallel_fail_fast_propagates_branch_error() {
    let factory = NodeFactory::new();
    factory
        .register("echo_ok", boxed_fn(|v| async move { Ok(v) }))
        .await;
    factory
        .register("always_fail", boxed_fn(|_v| async move { Err("boom".to_string()) }))
        .await;

    let engine = Engine::new(Arc::new(InMemoryWorkflowResolver::new())).with_node_factory(factory);
    let workflow = parallel_workflow(true, true);

    let err = engine
        .execute(&workflow, WorkflowValue::Null)
        .await
        .expect_err("fail_fast should propagate the branch failure");

    assert!(
        matches!(err, EngineError::ParallelExecutionError(_)),
        "expected ParallelExecutionError, got {err:?}"
    );
}

#[tokio::test]
async fn s4_parallel_collects_partial_success_when_not_fail_fast() {
    let factory = NodeFactory::new();
    factory
        .register("echo_ok", boxed_fn(|_v| async move { Ok(WorkflowValue::String("done".to_string())) }))
        .await;
    factory
        .register("always_fail", boxed_fn(|_v| async move { Err("boom".to_string()) }))
        .await;

    let engine = Engine::new(Arc::new(InMemoryWorkflowResolver::new())).with_node_factory(factory);
    let workflow = parallel_workflow(false, true);

    let result = engine
        .execute(&workflow, WorkflowValue::Null)
        .await
        .expect("partial success with collect_results=true should not fail the workflow");

    match result {
        WorkflowValue::Map(m) => {
            assert_eq!(m.get("ok_branch").and_then(|v| v.as_str()), Some("done"));
            assert!(!m.contains_key("boom_branch"), "failed branch must not appear in the collected results");
        }
        other => panic!("expected a map of collected branch results, got {other:?}"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// S5 — Loop runs until exit_field flips true, after three false iterations
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn s5_loop_runs_until_exit_condition_after_three_false_iterations() {
    let invocations = Arc::new(AtomicU32::new(0));
    let invocations_for_body = invocations.clone();

    let factory = NodeFactory::new();
    factory
        .register(
            "counter",
            boxed_fn(move |payload| {
                let invocations = invocations_for_body.clone();
                async move {
                    invocations.fetch_add(1, Ordering::SeqCst);
                    let count = match &payload {
                        WorkflowValue::Map(m) => m.get("count").and_then(|v| v.as_i64()).unwrap_or(0),
                        _ => 0,
                    };
                    let next = count + 1;
                    let done = next >= 4;
                    Ok(WorkflowValue::Map(HashMap::from([
                        ("count".to_string(), WorkflowValue::Int(next)),
                        ("done".to_string(), WorkflowValue::Bool(done)),
                    ])))
                }
            }),
        )
        .await;

    let loop_params = serde_json::json!({
        "body_node_id": "counter",
        "exit_field": "$output.done",
        "max_iterations": 10,
    });

    let workflow = WorkflowBuilder::new("s5", "Loop until done")
        .node(NodeSpecBuilder::new("start", "Start", NodeType::Start).build())
        .node(NodeSpecBuilder::new("counter", "Counter body", NodeType::Custom("counter".to_string())).build())
        .node(NodeSpecBuilder::new("loop", "Loop", NodeType::Loop).params(loop_params).build())
        .node(NodeSpecBuilder::new("end", "End", NodeType::End).build())
        .edge(EdgeSpecBuilder::new("e1", "start", "loop").build())
        .edge(EdgeSpecBuilder::new("e2", "loop", "end").build())
        .build();

    let engine = Engine::new(Arc::new(InMemoryWorkflowResolver::new())).with_node_factory(factory);
    let input = WorkflowValue::Map(HashMap::from([("count".to_string(), WorkflowValue::Int(0))]));
    let result = engine.execute(&workflow, input).await.expect("loop should reach its exit condition");

    assert_eq!(invocations.load(Ordering::SeqCst), 4, "3 false iterations, then 1 true iteration");
    match result {
        WorkflowValue::Map(m) => {
            assert_eq!(m.get("continue_loop"), Some(&WorkflowValue::Bool(false)));
            assert_eq!(m.get("iteration").and_then(|v| v.as_i64()), Some(4));
            match m.get("data") {
                Some(WorkflowValue::Map(data)) => {
                    assert_eq!(data.get("count").and_then(|v| v.as_i64()), Some(4));
                    assert_eq!(data.get("done"), Some(&WorkflowValue::Bool(true)));
                }
                other => panic!("expected loop data map, got {other:?}"),
            }
        }
        other => panic!("expected final loop payload map, got {other:?}"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// S5b — Loop tracks iteration_var and accumulator_var, exits via exit_value
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn s5b_loop_tracks_iteration_and_accumulator_and_exits_on_exit_value() {
    let factory = NodeFactory::new();
    factory
        .register(
            "ticker",
            boxed_fn(move |payload| async move {
                let count = match &payload {
                    WorkflowValue::Map(m) => m.get("count").and_then(|v| v.as_i64()).unwrap_or(0),
                    _ => 0,
                };
                let next = count + 1;
                let status = if next >= 3 { "stop" } else { "go" };
                Ok(WorkflowValue::Map(HashMap::from([
                    ("count".to_string(), WorkflowValue::Int(next)),
                    ("status".to_string(), WorkflowValue::String(status.to_string())),
                ])))
            }),
        )
        .await;

    let loop_params = serde_json::json!({
        "body_node_id": "ticker",
        "exit_field": "$output.status",
        "exit_value": "stop",
        "max_iterations": 10,
        "iteration_var": "tick",
        "accumulator_var": "history",
    });

    let workflow = WorkflowBuilder::new("s5b", "Loop with accumulator")
        .node(NodeSpecBuilder::new("start", "Start", NodeType::Start).build())
        .node(NodeSpecBuilder::new("ticker", "Ticker body", NodeType::Custom("ticker".to_string())).build())
        .node(NodeSpecBuilder::new("loop", "Loop", NodeType::Loop).params(loop_params).build())
        .node(NodeSpecBuilder::new("end", "End", NodeType::End).build())
        .edge(EdgeSpecBuilder::new("e1", "start", "loop").build())
        .edge(EdgeSpecBuilder::new("e2", "loop", "end").build())
        .build();

    let engine = Engine::new(Arc::new(InMemoryWorkflowResolver::new())).with_node_factory(factory);
    let input = WorkflowValue::Map(HashMap::from([("count".to_string(), WorkflowValue::Int(0))]));
    let result = engine.execute(&workflow, input).await.expect("loop should reach its exit value");

    match result {
        WorkflowValue::Map(m) => {
            assert_eq!(m.get("iteration").and_then(|v| v.as_i64()), Some(3));
            match m.get("accumulated") {
                Some(WorkflowValue::List(items)) => assert_eq!(items.len(), 3),
                other => panic!("expected accumulated list, got {other:?}"),
            }
        }
        other => panic!("expected final loop payload map, got {other:?}"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// S6 — HumanInput suspends execution, `Engine::resume` supplies the answer
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn s6_human_input_suspends_then_resumes_with_supplied_value() {
    use mofa_foundation::workflow::state::WorkflowContext;

    let human_input_params = serde_json::json!({
        "required_fields": ["answer"],
    });

    let workflow = WorkflowBuilder::new("s6", "Approval gate")
        .node(NodeSpecBuilder::new("start", "Start", NodeType::Start).build())
        .node(NodeSpecBuilder::new("approve", "Wait for approval", NodeType::HumanInput).params(human_input_params).build())
        .node(NodeSpecBuilder::new("end", "End", NodeType::End).build())
        .edge(EdgeSpecBuilder::new("e1", "start", "approve").build())
        .edge(EdgeSpecBuilder::new("e2", "approve", "end").build())
        .build();

    let engine = Engine::new(Arc::new(InMemoryWorkflowResolver::new()));

    let ctx = WorkflowContext::new(&workflow.id);
    let execution_id = ctx.execution_id.clone();

    let run = engine.execute_with_context(&workflow, WorkflowValue::String("pending".to_string()), ctx);
    let resumer = async {
        let answer = WorkflowValue::Map(HashMap::from([("answer".to_string(), WorkflowValue::String("approved".to_string()))]));
        assert!(engine.resume(&execution_id, answer).await, "resume should find the suspended execution");
    };

    let (result, _) = tokio::join!(run, resumer);
    let value = result.expect("workflow should complete after resume");
    match value {
        WorkflowValue::Map(m) => {
            assert_eq!(m.get("complete"), Some(&WorkflowValue::Bool(true)));
            match m.get("user_input") {
                Some(WorkflowValue::Map(u)) => {
                    assert_eq!(u.get("answer").and_then(|v| v.as_str()), Some("approved"));
                }
                other => panic!("expected user_input map, got {other:?}"),
            }
        }
        other => panic!("expected HumanInput result map, got {other:?}"),
    }
}

#[tokio::test]
async fn s6b_human_input_already_satisfied_never_suspends() {
    let human_input_params = serde_json::json!({
        "required_fields": ["answer"],
    });

    let workflow = WorkflowBuilder::new("s6b", "Pre-answered gate")
        .node(NodeSpecBuilder::new("start", "Start", NodeType::Start).build())
        .node(NodeSpecBuilder::new("approve", "Wait for approval", NodeType::HumanInput).params(human_input_params).build())
        .node(NodeSpecBuilder::new("end", "End", NodeType::End).build())
        .edge(EdgeSpecBuilder::new("e1", "start", "approve").build())
        .edge(EdgeSpecBuilder::new("e2", "approve", "end").build())
        .build();

    let engine = Engine::new(Arc::new(InMemoryWorkflowResolver::new()));
    let existing = WorkflowValue::Map(HashMap::from([(
        "existing_values".to_string(),
        WorkflowValue::Map(HashMap::from([("answer".to_string(), WorkflowValue::String("pre-approved".to_string()))])),
    )]));

    let result = engine.execute(&workflow, existing).await.expect("already-satisfied gate should not suspend");
    match result {
        WorkflowValue::Map(m) => {
            assert_eq!(m.get("complete"), Some(&WorkflowValue::Bool(true)));
            match m.get("user_input") {
                Some(WorkflowValue::Map(u)) => {
                    assert_eq!(u.get("answer").and_then(|v| v.as_str()), Some("pre-approved"));
                }
                other => panic!("expected user_input map, got {other:?}"),
            }
        }
        other => panic!("expected HumanInput result map, got {other:?}"),
    }
}
