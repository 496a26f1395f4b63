//! The tool execution pipeline: validate -> authorize -> policy -> limiter
//! -> idempotency -> pre-tool-speech -> execute (retry + circuit breaker) ->
//! dynamic-variable-assignment -> emit.
//!
//! Modeled as a fixed, ordered sequence of stages rather than a dynamic
//! middleware chain — the stage list is closed over by spec.md's §4.2
//! numbering, so there's no need for runtime registration of new stages the
//! way a general middleware framework would offer.

use super::error::ToolRuntimeError;
use super::http::HttpToolExecutor;
use super::idempotency::IdempotencyStore;
use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::workflow::spec::{
    AssignOperator, OnAssignError, PreToolSpeechSpec, ToolKind, ToolSpec, VariableAssignment,
};
use crate::workflow::state::{WorkflowContext, WorkflowValue};
use async_trait::async_trait;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// A concrete tool implementation. `FunctionToolExecutor` wraps a boxed
/// closure (for programmatically registered tools); `HttpToolExecutor`
/// drives the shared `HttpSessionManager`.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, args: WorkflowValue) -> Result<WorkflowValue, ToolRuntimeError>;
}

pub type BoxedToolFn = Arc<
    dyn Fn(WorkflowValue) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<WorkflowValue, String>> + Send>>
        + Send
        + Sync,
>;

pub struct FunctionToolExecutor {
    f: BoxedToolFn,
}

impl FunctionToolExecutor {
    pub fn new(f: BoxedToolFn) -> Self {
        Self { f }
    }
}

#[async_trait]
impl ToolExecutor for FunctionToolExecutor {
    async fn execute(&self, args: WorkflowValue) -> Result<WorkflowValue, ToolRuntimeError> {
        (self.f)(args).await.map_err(ToolRuntimeError::Execution)
    }
}

#[async_trait]
impl ToolExecutor for HttpToolExecutor {
    async fn execute(&self, args: WorkflowValue) -> Result<WorkflowValue, ToolRuntimeError> {
        self.call(&args).await
    }
}

pub struct DbToolExecutor;

#[async_trait]
impl ToolExecutor for DbToolExecutor {
    async fn execute(&self, _args: WorkflowValue) -> Result<WorkflowValue, ToolRuntimeError> {
        Err(ToolRuntimeError::Unsupported("db".to_string()))
    }
}

pub fn build_executor(spec: &ToolSpec) -> Arc<dyn ToolExecutor> {
    match &spec.kind {
        ToolKind::Http(http) => Arc::new(HttpToolExecutor::new(http.clone())),
        ToolKind::Function(_) => Arc::new(FunctionToolExecutor::new(Arc::new(|_args| {
            Box::pin(async { Err("function tool has no registered body".to_string()) })
        }))),
        ToolKind::Db(_) => Arc::new(DbToolExecutor),
    }
}

/// Hook for request-time checks (auth, policy, rate limiting). Tests and
/// callers can supply permissive or restrictive doubles; production
/// deployments would implement these against real auth/policy services
/// (out of scope for this crate).
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn authorize(&self, tool_id: &str, args: &WorkflowValue) -> Result<(), ToolRuntimeError>;
}

#[async_trait]
pub trait PolicyEngine: Send + Sync {
    async fn check(&self, tool_id: &str, args: &WorkflowValue) -> Result<(), ToolRuntimeError>;
}

#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn acquire(&self, tool_id: &str) -> Result<(), ToolRuntimeError>;
}

pub struct AllowAll;

#[async_trait]
impl Authorizer for AllowAll {
    async fn authorize(&self, _tool_id: &str, _args: &WorkflowValue) -> Result<(), ToolRuntimeError> {
        Ok(())
    }
}

#[async_trait]
impl PolicyEngine for AllowAll {
    async fn check(&self, _tool_id: &str, _args: &WorkflowValue) -> Result<(), ToolRuntimeError> {
        Ok(())
    }
}

#[async_trait]
impl RateLimiter for AllowAll {
    async fn acquire(&self, _tool_id: &str) -> Result<(), ToolRuntimeError> {
        Ok(())
    }
}

/// Generates pre-tool speech for `Auto` mode. Left as an external
/// collaborator since generating speech is an LLM concern.
#[async_trait]
pub trait SpeechGenerator: Send + Sync {
    async fn generate(&self, tool_id: &str, ctx: &WorkflowContext) -> String;
}

pub struct StaticSpeechGenerator;

#[async_trait]
impl SpeechGenerator for StaticSpeechGenerator {
    async fn generate(&self, tool_id: &str, _ctx: &WorkflowContext) -> String {
        format!("Let me check that for you (running {tool_id})...")
    }
}

pub struct ToolOutcome {
    pub result: WorkflowValue,
    pub pre_tool_speech: Option<String>,
    pub retries: u32,
}

pub struct ToolPipeline {
    pub spec: ToolSpec,
    executor: Arc<dyn ToolExecutor>,
    circuit_breaker: Arc<CircuitBreaker>,
    idempotency: Arc<dyn IdempotencyStore>,
    authorizer: Arc<dyn Authorizer>,
    policy: Arc<dyn PolicyEngine>,
    limiter: Arc<dyn RateLimiter>,
    speech: Arc<dyn SpeechGenerator>,
}

impl ToolPipeline {
    pub fn new(
        spec: ToolSpec,
        executor: Arc<dyn ToolExecutor>,
        idempotency: Arc<dyn IdempotencyStore>,
    ) -> Self {
        let cb_config = CircuitBreakerConfig {
            name: spec.id.clone(),
            failure_threshold: spec.circuit_breaker.failure_threshold,
            timeout: Duration::from_secs(spec.circuit_breaker.recovery_timeout_s),
            half_open_max_requests: spec.circuit_breaker.half_open_max_calls,
            ..CircuitBreakerConfig::default()
        };
        Self {
            spec,
            executor,
            circuit_breaker: CircuitBreaker::new("tool", cb_config),
            idempotency,
            authorizer: Arc::new(AllowAll),
            policy: Arc::new(AllowAll),
            limiter: Arc::new(AllowAll),
            speech: Arc::new(StaticSpeechGenerator),
        }
    }

    pub fn with_authorizer(mut self, a: Arc<dyn Authorizer>) -> Self {
        self.authorizer = a;
        self
    }

    pub fn with_policy(mut self, p: Arc<dyn PolicyEngine>) -> Self {
        self.policy = p;
        self
    }

    pub fn with_limiter(mut self, l: Arc<dyn RateLimiter>) -> Self {
        self.limiter = l;
        self
    }

    pub fn with_speech_generator(mut self, s: Arc<dyn SpeechGenerator>) -> Self {
        self.speech = s;
        self
    }

    fn validate(&self, args: &WorkflowValue) -> Result<(), ToolRuntimeError> {
        let WorkflowValue::Map(map) = args else {
            if self.spec.parameters.iter().any(|p| p.required) {
                return Err(ToolRuntimeError::Validation("expected object args".to_string()));
            }
            return Ok(());
        };
        for param in &self.spec.parameters {
            if param.required && !map.contains_key(&param.name) {
                return Err(ToolRuntimeError::Validation(format!(
                    "missing required parameter '{}'",
                    param.name
                )));
            }
        }
        Ok(())
    }

    async fn idempotency_key(&self, args: &WorkflowValue) -> Option<String> {
        if !self.spec.idempotency.enabled {
            return None;
        }
        let key_field = self.spec.idempotency.key_field.as_deref()?;
        if let WorkflowValue::Map(m) = args {
            m.get(key_field).map(|v| format!("{}:{:?}", self.spec.id, v))
        } else {
            None
        }
    }

    async fn pre_tool_speech(&self, ctx: &WorkflowContext) -> Option<String> {
        match self.spec.pre_tool_speech.as_ref()? {
            PreToolSpeechSpec::Constant { text } => Some(text.clone()),
            PreToolSpeechSpec::Random { choices } => {
                if choices.is_empty() {
                    None
                } else {
                    let idx = rand::thread_rng().gen_range(0..choices.len());
                    Some(choices[idx].clone())
                }
            }
            PreToolSpeechSpec::Auto { .. } => Some(self.speech.generate(&self.spec.id, ctx).await),
        }
    }

    async fn execute_with_retry_and_breaker(
        &self,
        args: WorkflowValue,
    ) -> Result<(WorkflowValue, u32), ToolRuntimeError> {
        if !self.circuit_breaker.can_execute().await {
            return Err(ToolRuntimeError::CircuitOpen(self.spec.id.clone()));
        }

        let retry = &self.spec.retry;
        let mut attempt = 0;
        loop {
            let started = Instant::now();
            let timeout = Duration::from_secs(self.spec.timeout_s);
            let outcome = tokio::time::timeout(timeout, self.executor.execute(args.clone())).await;

            match outcome {
                Ok(Ok(value)) => {
                    self.circuit_breaker.record_success().await;
                    return Ok((value, attempt));
                }
                Ok(Err(err)) => {
                    self.circuit_breaker.record_failure(None).await;
                    if attempt >= retry.max_retries || !err.is_retryable() {
                        return Err(err);
                    }
                }
                Err(_elapsed) => {
                    self.circuit_breaker.record_failure(None).await;
                    if attempt >= retry.max_retries {
                        return Err(ToolRuntimeError::Timeout(self.spec.timeout_s));
                    }
                }
            }

            let base_delay = retry.base_delay_s * retry.multiplier.powi(attempt as i32);
            let mut delay = base_delay.min(retry.max_delay_s);
            if retry.jitter {
                let jitter_frac: f64 = rand::thread_rng().gen_range(0.0..0.25);
                delay += delay * jitter_frac;
            }
            warn!(
                tool_id = %self.spec.id,
                attempt,
                delay_s = delay,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "retrying tool call"
            );
            tokio::time::sleep(Duration::from_secs_f64(delay)).await;
            attempt += 1;
        }
    }

    /// Run the full pipeline for one tool invocation.
    pub async fn run(&self, args: WorkflowValue, ctx: &WorkflowContext) -> Result<ToolOutcome, ToolRuntimeError> {
        self.validate(&args)?;
        self.authorizer.authorize(&self.spec.id, &args).await?;
        self.policy.check(&self.spec.id, &args).await?;
        self.limiter.acquire(&self.spec.id).await?;

        if let Some(key) = self.idempotency_key(&args).await {
            if let Some(cached) = self.idempotency.get(&key).await {
                debug!(tool_id = %self.spec.id, key, "idempotent call served from cache");
                return Ok(ToolOutcome { result: cached, pre_tool_speech: None, retries: 0 });
            }
        }

        let pre_tool_speech = self.pre_tool_speech(ctx).await;

        let (result, retries) = self.execute_with_retry_and_breaker(args.clone()).await?;

        if let Some(key) = self.idempotency_key(&args).await {
            let ttl = Duration::from_secs(self.spec.idempotency.ttl_s.unwrap_or(300));
            self.idempotency.put(&key, result.clone(), ttl).await;
        }

        apply_dynamic_variables(&self.spec.dynamic_variables, &result, ctx).await;

        Ok(ToolOutcome { result, pre_tool_speech, retries })
    }
}

/// Apply dynamic-variable-assignment rules: extract `source_field` from the
/// tool result, transform it, and write it into ctx per `operator`.
pub async fn apply_dynamic_variables(
    assignments: &[VariableAssignment],
    result: &WorkflowValue,
    ctx: &WorkflowContext,
) {
    for assignment in assignments {
        let extracted = crate::workflow::condition::resolve_path(
            &format!("$output.{}", assignment.source_field),
            result,
            ctx,
        )
        .await;

        let value = match extracted {
            Some(v) => v,
            None => match &assignment.default_value {
                Some(d) => d.clone(),
                None => {
                    match assignment.on_error {
                        OnAssignError::Raise => {
                            warn!(target = %assignment.target, "dynamic variable source field missing");
                        }
                        OnAssignError::Log => {
                            debug!(target = %assignment.target, "dynamic variable source field missing, skipping");
                        }
                        OnAssignError::Ignore => {}
                    }
                    continue;
                }
            },
        };

        let transformed = if let Some(expr) = &assignment.transform_expr {
            crate::workflow::condition::resolve_path(expr, &value, ctx)
                .await
                .unwrap_or(value.clone())
        } else {
            value
        };

        match assignment.operator {
            AssignOperator::Set | AssignOperator::Transform => {
                ctx.set_variable(&assignment.target, transformed).await;
            }
            AssignOperator::SetIfExists => {
                if ctx.get_variable(&assignment.target).await.is_some() {
                    ctx.set_variable(&assignment.target, transformed).await;
                }
            }
            AssignOperator::SetIfTruthy => {
                if is_truthy(&transformed) {
                    ctx.set_variable(&assignment.target, transformed).await;
                }
            }
            AssignOperator::Append => {
                let mut list = match ctx.get_variable(&assignment.target).await {
                    Some(WorkflowValue::List(l)) => l,
                    _ => Vec::new(),
                };
                list.push(transformed);
                ctx.set_variable(&assignment.target, WorkflowValue::List(list)).await;
            }
            AssignOperator::Increment => {
                let current = match ctx.get_variable(&assignment.target).await {
                    Some(WorkflowValue::Int(i)) => i,
                    _ => 0,
                };
                let delta = transformed.as_i64().unwrap_or(1);
                ctx.set_variable(&assignment.target, WorkflowValue::Int(current + delta)).await;
            }
        }
    }
}

fn is_truthy(v: &WorkflowValue) -> bool {
    match v {
        WorkflowValue::Null => false,
        WorkflowValue::Bool(b) => *b,
        WorkflowValue::Int(i) => *i != 0,
        WorkflowValue::Float(f) => *f != 0.0,
        WorkflowValue::String(s) => !s.is_empty(),
        WorkflowValue::List(l) => !l.is_empty(),
        WorkflowValue::Map(m) => !m.is_empty(),
        _ => true,
    }
}

#[derive(Default)]
pub struct ToolRegistry {
    pipelines: HashMap<String, Arc<ToolPipeline>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, pipeline: ToolPipeline) {
        self.pipelines.insert(pipeline.spec.id.clone(), Arc::new(pipeline));
    }

    pub fn get(&self, tool_id: &str) -> Option<Arc<ToolPipeline>> {
        self.pipelines.get(tool_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool_runtime::idempotency::InMemoryIdempotencyStore;
    use crate::workflow::spec::{FunctionToolSpec, RetryConfig, ToolKind};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn test_spec(retries: u32) -> ToolSpec {
        ToolSpec {
            id: "t1".into(),
            version: "1.0.0".into(),
            tool_name: "t1".into(),
            description: String::new(),
            kind: ToolKind::Function(FunctionToolSpec { function_name: "f".into() }),
            parameters: vec![],
            return_type: crate::workflow::spec::ReturnType::Json,
            return_target: crate::workflow::spec::ReturnTarget::Step,
            timeout_s: 5,
            retry: RetryConfig { max_retries: retries, base_delay_s: 0.001, multiplier: 1.0, max_delay_s: 0.01, jitter: false, retry_on_status: vec![] },
            circuit_breaker: Default::default(),
            idempotency: Default::default(),
            interruption: Default::default(),
            pre_tool_speech: None,
            execution: crate::workflow::spec::ExecutionMode::Sequential,
            dynamic_variables: vec![],
            metrics_tags: Default::default(),
        }
    }

    #[tokio::test]
    async fn retries_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();
        let executor: Arc<dyn ToolExecutor> = Arc::new(FunctionToolExecutor::new(Arc::new(move |_args| {
            let calls = calls2.clone();
            Box::pin(async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err("transient".to_string())
                } else {
                    Ok(WorkflowValue::Int(42))
                }
            })
        })));
        let pipeline = ToolPipeline::new(test_spec(5), executor, Arc::new(InMemoryIdempotencyStore::new()));
        let ctx = WorkflowContext::new("wf");
        let outcome = pipeline.run(WorkflowValue::Null, &ctx).await.unwrap();
        assert_eq!(outcome.result.as_i64(), Some(42));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn circuit_opens_after_consecutive_failures() {
        let executor: Arc<dyn ToolExecutor> = Arc::new(FunctionToolExecutor::new(Arc::new(|_args| {
            Box::pin(async { Err::<WorkflowValue, String>("boom".to_string()) })
        })));
        let mut spec = test_spec(0);
        spec.circuit_breaker.failure_threshold = 2;
        let pipeline = ToolPipeline::new(spec, executor, Arc::new(InMemoryIdempotencyStore::new()));
        let ctx = WorkflowContext::new("wf");

        let _ = pipeline.run(WorkflowValue::Null, &ctx).await;
        let _ = pipeline.run(WorkflowValue::Null, &ctx).await;
        let third = pipeline.run(WorkflowValue::Null, &ctx).await;
        assert!(matches!(third, Err(ToolRuntimeError::CircuitOpen(_))));
    }
}
