// src/response.rs
//! Response tree.
//!
//! Every evaluated instruction yields one [`Response`]. Found and loaded
//! responses hold [`ScrapeResult`]s, and each result holds the responses of
//! its `then` children, so the tree nests through results.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

use crate::core::sanitize::excerpt;

/// One extracted or loaded value and the responses of its children.
#[derive(Clone, Debug, PartialEq)]
pub struct ScrapeResult {
    pub value: String,
    pub children: Vec<Response>,
}

impl ScrapeResult {
    pub fn new(value: impl Into<String>, children: Vec<Response>) -> Self {
        Self { value: value.into(), children }
    }

    pub fn as_dict(&self) -> Value {
        self.render(None)
    }

    fn render(&self, cut: Option<(usize, usize)>) -> Value {
        let value = match cut {
            Some((head, tail)) => excerpt(&self.value, head, tail).into_owned(),
            None => self.value.clone(),
        };
        let mut out = Map::new();
        out.insert("value".into(), Value::String(value));
        if !self.children.is_empty() {
            let children = self.children.iter().map(|c| c.render(cut)).collect();
            out.insert("children".into(), Value::Array(children));
        }
        Value::Object(out)
    }
}

/// Variant payloads.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Found {
        name: Option<String>,
        description: Option<String>,
        results: Vec<ScrapeResult>,
    },
    Loaded {
        name: Option<String>,
        description: Option<String>,
        result: ScrapeResult,
        cookies: BTreeMap<String, String>,
    },
    Wait {
        name: Option<String>,
        description: Option<String>,
    },
    MissingTags {
        missing: Vec<String>,
    },
    Failed {
        reason: String,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    pub id: String,
    pub uri: String,
    pub instruction: Value,
    /// Tags visible when the response was built.
    pub tags: BTreeMap<String, String>,
    pub outcome: Outcome,
}

impl Response {
    pub fn status(&self) -> &'static str {
        match self.outcome {
            Outcome::Found { .. } => "found",
            Outcome::Loaded { .. } => "loaded",
            Outcome::Wait { .. } => "wait",
            Outcome::MissingTags { .. } => "missing",
            Outcome::Failed { .. } => "failed",
        }
    }

    pub fn name(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Found { name, .. } | Outcome::Loaded { name, .. } | Outcome::Wait { name, .. } => {
                name.as_deref()
            }
            _ => None,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Found { description, .. }
            | Outcome::Loaded { description, .. }
            | Outcome::Wait { description, .. } => description.as_deref(),
            _ => None,
        }
    }

    /// Results of a found or loaded response; empty otherwise.
    pub fn results(&self) -> &[ScrapeResult] {
        match &self.outcome {
            Outcome::Found { results, .. } => results,
            Outcome::Loaded { result, .. } => std::slice::from_ref(result),
            _ => &[],
        }
    }

    pub fn missing_tags(&self) -> &[String] {
        match &self.outcome {
            Outcome::MissingTags { missing } => missing,
            _ => &[],
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Failed { reason } => Some(reason),
            _ => None,
        }
    }

    pub fn cookies(&self) -> Option<&BTreeMap<String, String>> {
        match &self.outcome {
            Outcome::Loaded { cookies, .. } => Some(cookies),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.outcome, Outcome::Found { .. } | Outcome::Loaded { .. })
    }

    pub fn as_dict(&self) -> Value {
        self.render(None)
    }

    /// Like `as_dict`, with long values cut to a head/tail excerpt.
    pub fn as_dict_truncated(&self, head: usize, tail: usize) -> Value {
        self.render(Some((head, tail)))
    }

    fn render(&self, cut: Option<(usize, usize)>) -> Value {
        let mut out = json!({
            "id": self.id,
            "uri": self.uri,
            "instruction": self.instruction,
            "status": self.status(),
            "tags": self.tags,
        });
        let extra = match &self.outcome {
            Outcome::Found { name, description, results } => json!({
                "name": name,
                "description": description,
                "results": results.iter().map(|r| r.render(cut)).collect::<Vec<_>>(),
            }),
            Outcome::Loaded { name, description, result, cookies } => json!({
                "name": name,
                "description": description,
                "results": [result.render(cut)],
                "cookies": cookies,
            }),
            Outcome::Wait { name, description } => json!({
                "name": name,
                "description": description,
            }),
            Outcome::MissingTags { missing } => json!({ "missing": missing }),
            Outcome::Failed { reason } => json!({ "failed": reason }),
        };
        if let (Value::Object(out), Value::Object(extra)) = (&mut out, extra) {
            out.extend(extra);
        }
        out
    }

    /// Collapse the tree into name → value maps.
    ///
    /// Each result becomes a branch map holding `name → value` plus the
    /// flattening of its ready children: a child that flattens to a map is
    /// merged in (deeper keys win), one that flattens to a list is stored
    /// under the child's name. A single branch comes back as a map, several
    /// as a list. `None` for responses that aren't found or loaded.
    pub fn flattened_values(&self) -> Option<Value> {
        if !self.is_ready() {
            return None;
        }
        let name = self.name();
        let mut branches: Vec<Map<String, Value>> = self
            .results()
            .iter()
            .map(|result| {
                let mut branch = Map::new();
                if let Some(name) = name {
                    branch.insert(name.to_string(), Value::String(result.value.clone()));
                }
                for child in &result.children {
                    match child.flattened_values() {
                        Some(Value::Object(map)) => branch.extend(map),
                        Some(list @ Value::Array(_)) => {
                            if let Some(child_name) = child.name() {
                                branch.insert(child_name.to_string(), list);
                            }
                        }
                        _ => {}
                    }
                }
                branch
            })
            .collect();

        if branches.len() == 1 {
            branches.pop().map(Value::Object)
        } else {
            Some(Value::Array(branches.into_iter().map(Value::Object).collect()))
        }
    }
}
