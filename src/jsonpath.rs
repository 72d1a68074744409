// src/jsonpath.rs
//! `jsonpath` finder over `jsonpath_lib`.
//!
//! Expressions without a leading `$` are rooted first, so `foo[*].bar`
//! reads as `$.foo[*].bar`.

use jsonpath_lib::Compiled as CompiledJsonPath;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid jsonpath '{expr}': {msg}")]
pub struct JsonPathError {
    pub expr: String,
    pub msg: String,
}

#[derive(Debug, Clone)]
pub struct JsonPath {
    compiled: CompiledJsonPath,
    expr: String,
}

fn rooted(expr: &str) -> String {
    if expr.starts_with('$') {
        expr.to_string()
    } else if expr.starts_with('[') {
        format!("${expr}")
    } else {
        format!("$.{expr}")
    }
}

impl JsonPath {
    pub fn parse(expr: &str) -> Result<Self, JsonPathError> {
        let expr = rooted(expr.trim());
        let compiled = CompiledJsonPath::compile(&expr)
            .map_err(|msg| JsonPathError { expr: expr.clone(), msg: msg.to_string() })?;
        Ok(Self { compiled, expr })
    }

    pub fn as_str(&self) -> &str {
        &self.expr
    }

    /// Every node the path selects, in document order.
    pub fn select<'v>(&self, root: &'v Value) -> Result<Vec<&'v Value>, JsonPathError> {
        self.compiled
            .select(root)
            .map_err(|e| JsonPathError { expr: self.expr.clone(), msg: e.to_string() })
    }
}

/// Text of a selected node: strings verbatim, anything else as compact JSON.
pub fn node_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
