//! Condition module - Evaluates `when` expressions.
//!
//! An expression is one or more `KEY == "value"` / `KEY != "value"` clauses
//! joined by `&&`. There is no OR and no grouping.

use std::collections::BTreeMap;

/// EnvContext is the flat key/value context conditions are evaluated against.
pub type EnvContext = BTreeMap<String, String>;

/// Builds a context from the process environment.
///
/// Variables whose name or value is not valid Unicode are skipped.
pub fn env_context() -> EnvContext {
    std::env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .collect()
}

/// Parses `key=val,foo=bar` overrides. Entries without `=` are ignored.
pub fn parse_context_overrides(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .filter_map(|kv| kv.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .collect()
}

/// Evaluates `expr` against `ctx`.
///
/// An empty expression is true. A clause without `==` or `!=` makes the whole
/// expression false. A key missing from the context reads as "".
pub fn evaluate(expr: &str, ctx: &EnvContext) -> bool {
    let expr = expr.trim();
    if expr.is_empty() {
        return true;
    }
    expr.split("&&").all(|clause| evaluate_clause(clause.trim(), ctx))
}

fn evaluate_clause(clause: &str, ctx: &EnvContext) -> bool {
    let lookup = |key: &str| ctx.get(key.trim()).map(String::as_str).unwrap_or_default();

    if let Some((key, value)) = clause.split_once("!=") {
        lookup(key) != unquote(value)
    } else if let Some((key, value)) = clause.split_once("==") {
        lookup(key) == unquote(value)
    } else {
        false
    }
}

fn unquote(value: &str) -> &str {
    value.trim().trim_matches(|c| c == '"' || c == '\'')
}
