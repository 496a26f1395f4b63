//! Edge condition evaluation, path resolution, and data transforms.
//!
//! Deliberately hand-rolled rather than built on an embedded expression
//! engine: transform/condition expressions stay a small declarative surface
//! (operators, literals, dotted variable access) rather than a general
//! scripting language. Anything richer should be a custom node registered
//! at build time.

use super::spec::{Condition, ConditionGroup, ConditionOperator, EdgeKind, EdgeSpec, JoinOp};
use super::state::{WorkflowContext, WorkflowValue};
use regex::Regex;
use std::collections::HashMap;

impl EdgeSpec {
    /// Whether this edge may be followed given the current payload/ctx.
    /// DEFAULT edges with no condition are always traversable; CONDITIONAL
    /// edges require at least one condition and evaluate their group;
    /// ERROR edges require `__current_error__` to be present (and to match
    /// type/code if the edge names one); FALLBACK edges are always true —
    /// the router is responsible for only picking them when nothing else did.
    pub async fn can_traverse(&self, payload: &WorkflowValue, ctx: &WorkflowContext) -> bool {
        match &self.edge_type {
            EdgeKind::Default => true,
            EdgeKind::Fallback => true,
            EdgeKind::Conditional => match &self.condition {
                Some(group) if !group.conditions.is_empty() => group.evaluate(payload, ctx).await,
                _ => false,
            },
            EdgeKind::Error => {
                let Some(current_error) = ctx.get_variable("__current_error__").await else {
                    return false;
                };
                match &self.condition {
                    Some(group) if !group.conditions.is_empty() => {
                        group.evaluate(&current_error, ctx).await
                    }
                    _ => true,
                }
            }
            EdgeKind::Timeout | EdgeKind::LoopBack | EdgeKind::ParallelJoin | EdgeKind::Custom(_) => {
                match &self.condition {
                    Some(group) if !group.conditions.is_empty() => group.evaluate(payload, ctx).await,
                    _ => true,
                }
            }
        }
    }
}

/// Resolve a `$input.`/`$output.`/`$node.<id>.`/`$ctx.`/`$workflow.id` path
/// against the current payload and context. Strings without a leading `$`
/// are treated as literals by callers, not by this function.
pub async fn resolve_path(path: &str, payload: &WorkflowValue, ctx: &WorkflowContext) -> Option<WorkflowValue> {
    if !path.starts_with('$') {
        return Some(WorkflowValue::String(path.to_string()));
    }
    let rest = &path[1..];
    if let Some(tail) = rest.strip_prefix("input.") {
        return dig(&ctx.get_input().await, tail);
    }
    if rest == "input" {
        return Some(ctx.get_input().await);
    }
    if let Some(tail) = rest.strip_prefix("output.") {
        return dig(payload, tail);
    }
    if rest == "output" {
        return Some(payload.clone());
    }
    if let Some(tail) = rest.strip_prefix("node.") {
        let mut parts = tail.splitn(2, '.');
        let node_id = parts.next()?;
        let field = parts.next();
        let node_output = ctx.get_node_output(node_id).await?;
        return match field {
            Some(f) => dig(&node_output, f),
            None => Some(node_output),
        };
    }
    if let Some(tail) = rest.strip_prefix("ctx.") {
        let mut parts = tail.splitn(2, '.');
        let var = parts.next()?;
        let field = parts.next();
        let value = ctx.get_variable(var).await?;
        return match field {
            Some(f) => dig(&value, f),
            None => Some(value),
        };
    }
    if rest == "workflow.id" {
        return Some(WorkflowValue::String(ctx.workflow_id.clone()));
    }
    None
}

/// Descend a dotted path (`a.b.c`) into a `Map`/`Json` value.
fn dig(value: &WorkflowValue, path: &str) -> Option<WorkflowValue> {
    if path.is_empty() {
        return Some(value.clone());
    }
    let mut current = value.clone();
    for segment in path.split('.') {
        current = match current {
            WorkflowValue::Map(mut m) => m.remove(segment)?,
            WorkflowValue::Json(j) => WorkflowValue::Json(j.get(segment)?.clone()),
            _ => return None,
        };
    }
    Some(current)
}

fn as_f64(v: &WorkflowValue) -> Option<f64> {
    match v {
        WorkflowValue::Int(i) => Some(*i as f64),
        WorkflowValue::Float(f) => Some(*f),
        WorkflowValue::Json(j) => j.as_f64(),
        _ => None,
    }
}

pub(crate) fn as_string(v: &WorkflowValue) -> String {
    match v {
        WorkflowValue::String(s) => s.clone(),
        WorkflowValue::Int(i) => i.to_string(),
        WorkflowValue::Float(f) => f.to_string(),
        WorkflowValue::Bool(b) => b.to_string(),
        WorkflowValue::Null => String::new(),
        WorkflowValue::Json(j) => j.to_string(),
        other => format!("{other:?}"),
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
        WorkflowValue::Bytes(b) => !b.is_empty(),
        WorkflowValue::Json(j) => !j.is_null() && *j != serde_json::Value::Bool(false),
    }
}

fn list_contains(haystack: &WorkflowValue, needle: &WorkflowValue) -> bool {
    match haystack {
        WorkflowValue::List(items) => items.iter().any(|i| values_equal(i, needle)),
        WorkflowValue::Json(serde_json::Value::Array(items)) => {
            let needle_json = to_json(needle);
            items.iter().any(|i| *i == needle_json)
        }
        _ => false,
    }
}

fn to_json(v: &WorkflowValue) -> serde_json::Value {
    match v {
        WorkflowValue::Null => serde_json::Value::Null,
        WorkflowValue::Bool(b) => serde_json::Value::Bool(*b),
        WorkflowValue::Int(i) => serde_json::Value::from(*i),
        WorkflowValue::Float(f) => serde_json::Value::from(*f),
        WorkflowValue::String(s) => serde_json::Value::String(s.clone()),
        WorkflowValue::Bytes(_) => serde_json::Value::Null,
        WorkflowValue::List(items) => serde_json::Value::Array(items.iter().map(to_json).collect()),
        WorkflowValue::Map(m) => {
            serde_json::Value::Object(m.iter().map(|(k, v)| (k.clone(), to_json(v))).collect())
        }
        WorkflowValue::Json(j) => j.clone(),
    }
}

pub(crate) fn values_equal(a: &WorkflowValue, b: &WorkflowValue) -> bool {
    to_json(a) == to_json(b)
}

/// Evaluate a single [`Condition`] against a field resolved from `payload`.
async fn evaluate_condition(cond: &Condition, payload: &WorkflowValue, ctx: &WorkflowContext) -> bool {
    let field_value = resolve_path(&cond.field, payload, ctx)
        .await
        .unwrap_or(WorkflowValue::Null);

    let result = match cond.operator {
        ConditionOperator::Equals => values_equal(&field_value, &cond.value),
        ConditionOperator::NotEquals => !values_equal(&field_value, &cond.value),
        ConditionOperator::Gt => match (as_f64(&field_value), as_f64(&cond.value)) {
            (Some(a), Some(b)) => a > b,
            _ => false,
        },
        ConditionOperator::Lt => match (as_f64(&field_value), as_f64(&cond.value)) {
            (Some(a), Some(b)) => a < b,
            _ => false,
        },
        ConditionOperator::Ge => match (as_f64(&field_value), as_f64(&cond.value)) {
            (Some(a), Some(b)) => a >= b,
            _ => false,
        },
        ConditionOperator::Le => match (as_f64(&field_value), as_f64(&cond.value)) {
            (Some(a), Some(b)) => a <= b,
            _ => false,
        },
        ConditionOperator::Contains => as_string(&field_value).contains(&as_string(&cond.value)),
        ConditionOperator::NotContains => !as_string(&field_value).contains(&as_string(&cond.value)),
        ConditionOperator::StartsWith => as_string(&field_value).starts_with(&as_string(&cond.value)),
        ConditionOperator::EndsWith => as_string(&field_value).ends_with(&as_string(&cond.value)),
        ConditionOperator::MatchesRegex => Regex::new(&as_string(&cond.value))
            .map(|re| re.is_match(&as_string(&field_value)))
            .unwrap_or(false),
        ConditionOperator::InList => list_contains(&cond.value, &field_value),
        ConditionOperator::NotInList => !list_contains(&cond.value, &field_value),
        ConditionOperator::IsEmpty => match &field_value {
            WorkflowValue::Null => true,
            WorkflowValue::String(s) => s.is_empty(),
            WorkflowValue::List(l) => l.is_empty(),
            WorkflowValue::Map(m) => m.is_empty(),
            _ => false,
        },
        ConditionOperator::IsNotEmpty => match &field_value {
            WorkflowValue::Null => false,
            WorkflowValue::String(s) => !s.is_empty(),
            WorkflowValue::List(l) => !l.is_empty(),
            WorkflowValue::Map(m) => !m.is_empty(),
            _ => true,
        },
        ConditionOperator::IsTrue => is_truthy(&field_value),
        ConditionOperator::IsFalse => !is_truthy(&field_value),
        ConditionOperator::Custom => false,
    };

    if cond.negate {
        !result
    } else {
        result
    }
}

impl ConditionGroup {
    pub async fn evaluate(&self, payload: &WorkflowValue, ctx: &WorkflowContext) -> bool {
        if self.conditions.is_empty() {
            return false;
        }
        match self.join {
            JoinOp::And => {
                for c in &self.conditions {
                    if !evaluate_condition(c, payload, ctx).await {
                        return false;
                    }
                }
                true
            }
            JoinOp::Or => {
                for c in &self.conditions {
                    if evaluate_condition(c, payload, ctx).await {
                        return true;
                    }
                }
                false
            }
        }
    }
}

/// Apply an edge's `data_mapping` (target field -> dotted source path) to
/// produce the payload the target node receives. Missing required source
/// fields are recorded as `_missing_<name>: true` in the output instead of
/// failing the traversal.
pub async fn transform_data(
    data_mapping: &HashMap<String, String>,
    payload: &WorkflowValue,
    ctx: &WorkflowContext,
) -> WorkflowValue {
    if data_mapping.is_empty() {
        return payload.clone();
    }
    let mut out = HashMap::new();
    for (target, source_path) in data_mapping {
        match resolve_path(source_path, payload, ctx).await {
            Some(v) => {
                out.insert(target.clone(), v);
            }
            None => {
                out.insert(format!("_missing_{target}"), WorkflowValue::Bool(true));
            }
        }
    }
    WorkflowValue::Map(out)
}

/// Wrap a failed node's payload with the `__error__` envelope used by
/// error-typed edges.
pub fn wrap_error(
    error_type: &str,
    error_message: &str,
    error_code: Option<&str>,
    source_node_id: &str,
) -> WorkflowValue {
    let mut map = HashMap::new();
    map.insert("errorType".to_string(), WorkflowValue::String(error_type.to_string()));
    map.insert("errorMessage".to_string(), WorkflowValue::String(error_message.to_string()));
    if let Some(code) = error_code {
        map.insert("errorCode".to_string(), WorkflowValue::String(code.to_string()));
    }
    map.insert(
        "sourceNodeId".to_string(),
        WorkflowValue::String(source_node_id.to_string()),
    );
    let mut outer = HashMap::new();
    outer.insert("__error__".to_string(), WorkflowValue::Map(map));
    WorkflowValue::Map(outer)
}

/// Declarative data transforms for Transform nodes, replacing the
/// source-language `PYTHON` transform kind entirely.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataTransform {
    Map { mapping: HashMap<String, String> },
    Filter { field: String, operator: ConditionOperator, value: WorkflowValue },
    Extract { path: String },
    Template { template: String },
    Merge { sources: Vec<String> },
    Split { field: String, separator: String },
    Format { template: String },
    JmesPath { expr: String },
    JsonPath { expr: String },
}

pub async fn apply_transform(
    transform: &DataTransform,
    payload: &WorkflowValue,
    ctx: &WorkflowContext,
) -> WorkflowValue {
    match transform {
        DataTransform::Map { mapping } => transform_data(mapping, payload, ctx).await,
        DataTransform::Filter { field, operator, value } => {
            let cond = Condition {
                field: field.clone(),
                operator: *operator,
                value: value.clone(),
                negate: false,
            };
            if evaluate_condition(&cond, payload, ctx).await {
                payload.clone()
            } else {
                WorkflowValue::Null
            }
        }
        DataTransform::Extract { path } => resolve_path(path, payload, ctx).await.unwrap_or(WorkflowValue::Null),
        DataTransform::Template { template } | DataTransform::Format { template } => {
            WorkflowValue::String(super::template::render_braces(template, payload, ctx).await)
        }
        DataTransform::Merge { sources } => {
            let mut merged = HashMap::new();
            for source in sources {
                if let Some(WorkflowValue::Map(m)) = resolve_path(source, payload, ctx).await {
                    merged.extend(m);
                }
            }
            WorkflowValue::Map(merged)
        }
        DataTransform::Split { field, separator } => {
            let value = resolve_path(field, payload, ctx).await.unwrap_or(WorkflowValue::Null);
            let s = as_string(&value);
            WorkflowValue::List(
                s.split(separator.as_str())
                    .map(|part| WorkflowValue::String(part.to_string()))
                    .collect(),
            )
        }
        DataTransform::JmesPath { expr } | DataTransform::JsonPath { expr } => {
            // Minimal dotted-path subset; full JMESPath/JSONPath grammars are
            // out of scope for the declarative evaluator.
            resolve_path(&format!("$output.{expr}"), payload, ctx)
                .await
                .unwrap_or(WorkflowValue::Null)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn equals_condition_matches() {
        let ctx = WorkflowContext::new("wf");
        let payload = WorkflowValue::Map(HashMap::from([
            ("status".to_string(), WorkflowValue::String("ok".to_string())),
        ]));
        let cond = Condition {
            field: "$output.status".to_string(),
            operator: ConditionOperator::Equals,
            value: WorkflowValue::String("ok".to_string()),
            negate: false,
        };
        assert!(evaluate_condition(&cond, &payload, &ctx).await);
    }

    #[tokio::test]
    async fn and_group_requires_all() {
        let ctx = WorkflowContext::new("wf");
        let payload = WorkflowValue::Map(HashMap::from([
            ("a".to_string(), WorkflowValue::Int(1)),
            ("b".to_string(), WorkflowValue::Int(2)),
        ]));
        let group = ConditionGroup {
            join: JoinOp::And,
            conditions: vec![
                Condition { field: "$output.a".into(), operator: ConditionOperator::Equals, value: WorkflowValue::Int(1), negate: false },
                Condition { field: "$output.b".into(), operator: ConditionOperator::Equals, value: WorkflowValue::Int(99), negate: false },
            ],
        };
        assert!(!group.evaluate(&payload, &ctx).await);
    }

    #[tokio::test]
    async fn missing_mapping_field_flags_missing() {
        let ctx = WorkflowContext::new("wf");
        let payload = WorkflowValue::Map(HashMap::new());
        let mapping = HashMap::from([("out".to_string(), "$output.nope".to_string())]);
        let result = transform_data(&mapping, &payload, &ctx).await;
        match result {
            WorkflowValue::Map(m) => assert!(m.contains_key("_missing_out")),
            _ => panic!("expected map"),
        }
    }

    #[test]
    fn default_edge_with_no_conditions_is_not_a_conditional_group() {
        // A `ConditionGroup` with zero conditions always evaluates false;
        // DEFAULT edges never carry a `ConditionGroup` at all (they skip
        // evaluation entirely in `EdgeSpec::can_traverse`).
        let group = ConditionGroup { conditions: vec![], join: JoinOp::And };
        assert!(group.conditions.is_empty());
    }
}
