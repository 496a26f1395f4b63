//! Shared HTTP session manager and the HTTP tool executor.
//!
//! Grounded on the reqwest-client-held-in-a-struct pattern used across the
//! pack's provider clients, extended with the process-wide singleton
//! lifecycle (`startup`/`shutdown`) spec.md's §4.2/§5 require.

use super::error::ToolRuntimeError;
use crate::workflow::spec::HttpToolSpec;
use crate::workflow::state::WorkflowValue;
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

static SESSION_MANAGER: OnceCell<HttpSessionManager> = OnceCell::new();

/// Process-wide pooled HTTP client. Lazily initialized on first use;
/// `shutdown` tears down registered executors and the pool, meant to be
/// triggered on SIGTERM by the process entry point.
pub struct HttpSessionManager {
    client: reqwest::Client,
    registered: RwLock<Vec<String>>,
}

impl HttpSessionManager {
    pub fn global() -> &'static HttpSessionManager {
        SESSION_MANAGER.get_or_init(HttpSessionManager::startup)
    }

    fn startup() -> Self {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(32)
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .expect("failed to build shared reqwest client");
        Self { client, registered: RwLock::new(Vec::new()) }
    }

    pub async fn register_executor(&self, name: impl Into<String>) {
        self.registered.write().await.push(name.into());
    }

    pub async fn health_check(&self) -> bool {
        true
    }

    /// Closes registered executors (logically; the pooled client itself is
    /// dropped with the process) within `timeout`.
    pub async fn shutdown(&self, timeout: Duration) {
        let _ = tokio::time::timeout(timeout, async {
            self.registered.write().await.clear();
        })
        .await;
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

/// Default statuses that trigger a retry unless the tool spec overrides them.
pub const DEFAULT_RETRY_STATUSES: &[u16] = &[429, 500, 502, 503, 504];

pub struct HttpToolExecutor {
    spec: HttpToolSpec,
}

impl HttpToolExecutor {
    pub fn new(spec: HttpToolSpec) -> Self {
        Self { spec }
    }

    /// Execute one HTTP call. `args` may override the spec's base url query
    /// params / headers / body per spec precedence rules (args win).
    pub async fn call(&self, args: &WorkflowValue) -> Result<WorkflowValue, ToolRuntimeError> {
        let client = HttpSessionManager::global().client();
        let method = reqwest::Method::from_bytes(self.spec.method.as_bytes())
            .map_err(|e| ToolRuntimeError::Validation(format!("invalid http method: {e}")))?;

        let mut request = client.request(method, &self.spec.url);

        for (k, v) in &self.spec.headers {
            request = request.header(k, v);
        }

        let mut query_params: HashMap<String, String> = HashMap::new();
        let mut body = self.spec.body_template.clone();

        if let WorkflowValue::Map(overrides) = args {
            for (k, v) in overrides {
                if k == "__query__" {
                    if let WorkflowValue::Map(q) = v {
                        for (qk, qv) in q {
                            query_params.insert(qk.clone(), value_to_query_string(qv));
                        }
                    }
                    continue;
                }
                if k == "__body__" {
                    body = Some(value_to_json(v));
                    continue;
                }
                query_params.insert(k.clone(), value_to_query_string(v));
            }
        }

        if !query_params.is_empty() && body.is_none() {
            request = request.query(&query_params);
        }

        if let Some(json_body) = &body {
            if json_body.is_object() || json_body.is_array() {
                request = request.json(json_body);
            }
        }

        let response = request
            .send()
            .await
            .map_err(|e| ToolRuntimeError::Http(e.to_string()))?;

        let status_code = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
            .collect();

        let text = response
            .text()
            .await
            .map_err(|e| ToolRuntimeError::Http(e.to_string()))?;

        let parsed_body = serde_json::from_str::<serde_json::Value>(&text)
            .unwrap_or_else(|_| serde_json::Value::String(text));

        let mut out = HashMap::new();
        out.insert("status_code".to_string(), WorkflowValue::Int(status_code as i64));
        out.insert("response".to_string(), WorkflowValue::Json(parsed_body));
        out.insert(
            "headers".to_string(),
            WorkflowValue::Map(headers.into_iter().map(|(k, v)| (k, WorkflowValue::String(v))).collect()),
        );

        if !(200..300).contains(&status_code) {
            return Err(ToolRuntimeError::Execution(format!(
                "http call returned status {status_code}"
            )));
        }

        Ok(WorkflowValue::Map(out))
    }
}

fn value_to_query_string(v: &WorkflowValue) -> String {
    match v {
        WorkflowValue::String(s) => s.clone(),
        WorkflowValue::Int(i) => i.to_string(),
        WorkflowValue::Float(f) => f.to_string(),
        WorkflowValue::Bool(b) => b.to_string(),
        other => value_to_json(other).to_string(),
    }
}

fn value_to_json(v: &WorkflowValue) -> serde_json::Value {
    match v {
        WorkflowValue::Null => serde_json::Value::Null,
        WorkflowValue::Bool(b) => serde_json::Value::Bool(*b),
        WorkflowValue::Int(i) => serde_json::Value::from(*i),
        WorkflowValue::Float(f) => serde_json::Value::from(*f),
        WorkflowValue::String(s) => serde_json::Value::String(s.clone()),
        WorkflowValue::Bytes(_) => serde_json::Value::Null,
        WorkflowValue::List(items) => serde_json::Value::Array(items.iter().map(value_to_json).collect()),
        WorkflowValue::Map(m) => serde_json::Value::Object(m.iter().map(|(k, v)| (k.clone(), value_to_json(v))).collect()),
        WorkflowValue::Json(j) => j.clone(),
    }
}
