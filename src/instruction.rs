// src/instruction.rs
//! Instruction documents: `extends` resolution and typed field access.
//!
//! Instructions stay `serde_json` maps all the way through evaluation so that
//! responses can echo back exactly what was run.

use serde_json::{Map, Value};

use crate::error::ScrapeError;
use crate::loader::Load;

pub type Instruction = Map<String, Value>;

/// Keys whose values are concatenated rather than replaced.
const LIST_KEYS: [&str; 2] = ["extends", "then"];
/// Keys whose map values are merged rather than replaced.
const MAP_KEYS: [&str; 3] = ["cookies", "headers", "posts"];

/// How `extends` folds an extension into the instruction being built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MergePolicy {
    /// Extension entries of `then`/`extends` go before the existing ones.
    pub prepend_lists: bool,
    /// On key conflicts inside `cookies`/`headers`/`posts`, keep the
    /// original's value.
    pub maps_favor_original: bool,
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self { prepend_lists: true, maps_favor_original: true }
    }
}

/// Fold `extension` into `orig`.
///
/// List keys are concatenated, map keys merged when both sides are maps, and
/// every other key from `extension` overwrites `orig`.
pub fn extend_instruction(orig: &mut Instruction, mut extension: Instruction, policy: MergePolicy) {
    for key in LIST_KEYS {
        let Some(ext_val) = extension.remove(key) else { continue };
        let Some(orig_val) = orig.get_mut(key) else {
            orig.insert(key.to_string(), ext_val);
            continue;
        };
        let mut existing = match orig_val.take() {
            Value::Array(items) => items,
            other => vec![other],
        };
        let incoming = match ext_val {
            Value::Array(items) => items,
            other => vec![other],
        };
        let merged = if policy.prepend_lists {
            incoming.into_iter().chain(existing).collect()
        } else {
            existing.extend(incoming);
            existing
        };
        *orig_val = Value::Array(merged);
    }

    for key in MAP_KEYS {
        let Some(ext_val) = extension.get(key) else { continue };
        match orig.get_mut(key) {
            None => {
                if let Some(v) = extension.remove(key) {
                    orig.insert(key.to_string(), v);
                }
            }
            Some(Value::Object(orig_map)) if ext_val.is_object() => {
                let Some(Value::Object(ext_map)) = extension.remove(key) else { continue };
                for (k, v) in ext_map {
                    if policy.maps_favor_original && orig_map.contains_key(&k) {
                        continue;
                    }
                    orig_map.insert(k, v);
                }
            }
            // Shapes differ: left in `extension` for wholesale replacement.
            Some(_) => {}
        }
    }

    for (k, v) in extension {
        orig.insert(k, v);
    }
}

fn expect_object(doc: Value, origin: &str) -> Result<Instruction, ScrapeError> {
    match doc {
        Value::Object(map) => Ok(map),
        other => Err(ScrapeError::invalid(format!(
            "`extends` target '{origin}' must be an object, got {other}"
        ))),
    }
}

/// Expand `extends` until none is left. String entries are loaded relative
/// to `base_uri`.
pub fn resolve_extends(
    instruction: &mut Instruction,
    base_uri: &str,
    loader: &dyn Load,
    policy: MergePolicy,
) -> Result<(), ScrapeError> {
    while let Some(extends) = instruction.remove("extends") {
        let entries = match extends {
            Value::Array(items) => items,
            single @ (Value::String(_) | Value::Object(_)) => vec![single],
            other => {
                return Err(ScrapeError::invalid(format!(
                    "`extends` must be a string, object or list, got {other}"
                )));
            }
        };
        for entry in entries {
            let extension = match entry {
                Value::String(reference) => {
                    let (doc, resolved) = loader.load(base_uri, &reference)?;
                    logd!("extends: loaded '{reference}' from {resolved}");
                    expect_object(doc, &resolved)?
                }
                Value::Object(map) => map,
                _ => {
                    return Err(ScrapeError::invalid(
                        "element of `extends` list must be an object or string",
                    ));
                }
            };
            extend_instruction(instruction, extension, policy);
        }
    }
    Ok(())
}

/// Which branch an instruction takes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    Find,
    JsonPath,
    XPath,
    Load,
}

impl Kind {
    pub fn of(instruction: &Instruction) -> Result<Self, ScrapeError> {
        let present: Vec<Kind> = [
            ("find", Kind::Find),
            ("jsonpath", Kind::JsonPath),
            ("xpath", Kind::XPath),
            ("load", Kind::Load),
        ]
        .into_iter()
        .filter(|(key, _)| instruction.contains_key(*key))
        .map(|(_, kind)| kind)
        .collect();
        match present.as_slice() {
            [kind] => Ok(*kind),
            [] => Err(ScrapeError::invalid("could not find a `find`, `jsonpath`, `xpath` or `load` key")),
            _ => Err(ScrapeError::invalid(
                "only one of `find`, `jsonpath`, `xpath` and `load` may be given",
            )),
        }
    }

    /// Instruction key holding the expression.
    pub fn key(self) -> &'static str {
        match self {
            Kind::Find => "find",
            Kind::JsonPath => "jsonpath",
            Kind::XPath => "xpath",
            Kind::Load => "load",
        }
    }
}

/// Boolean flag with a default when absent or null.
pub fn flag(instruction: &Instruction, key: &str, default: bool) -> Result<bool, ScrapeError> {
    match instruction.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(other) => Err(ScrapeError::invalid(format!("`{key}` must be a boolean, got {other}"))),
    }
}

/// Raw string field, left unsubstituted.
pub fn raw_str<'a>(instruction: &'a Instruction, key: &str) -> Result<Option<&'a str>, ScrapeError> {
    match instruction.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(ScrapeError::invalid(format!("`{key}` must be a string, got {other}"))),
    }
}

/// Inline `tags` as name/value pairs.
pub fn inline_tags(instruction: &Instruction) -> Result<Vec<(String, String)>, ScrapeError> {
    match instruction.get("tags") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(k, v)| match v {
                Value::String(s) => Ok((k.clone(), s.clone())),
                Value::Number(n) => Ok((k.clone(), n.to_string())),
                other => Err(ScrapeError::invalid(format!(
                    "tag '{k}' must be a string or number, got {other}"
                ))),
            })
            .collect(),
        Some(other) => Err(ScrapeError::invalid(format!("`tags` must be an object, got {other}"))),
    }
}

/// Free-form description, stringified if it isn't text already.
pub fn description(instruction: &Instruction) -> Option<String> {
    match instruction.get("description")? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
