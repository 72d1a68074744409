// src/template.rs
//! `{{tag}}` / `{{{tag}}}` substitution.
//!
//! The raw triple-brace form is scanned first, then the percent-encoded
//! double-brace form runs over the result of that first pass. Missing tags are
//! collected in that scan order (raw pass, then encoded pass) and their
//! placeholders are replaced with nothing.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::{Captures, Regex};
use serde_json::Value;

use crate::error::{TemplateError, TemplateResultError};
use crate::tags::Tags;

/// Bytes left alone by the encoded form, matching form/query encoding.
const QUERY_SAFE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'_').remove(b'.').remove(b'-');

fn raw_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\{([A-Za-z0-9_]+)\}\}\}").expect("static regex"))
}

fn encoded_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{([A-Za-z0-9_]+)\}\}").expect("static regex"))
}

/// Percent-encode with spaces as `+`.
pub fn quote_plus(value: &str) -> String {
    utf8_percent_encode(value, QUERY_SAFE).to_string().replace("%20", "+")
}

/// Outcome of one substitution: the filled value plus every tag that could
/// not be resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Substitution<T> {
    value: T,
    missing: Vec<String>,
}

impl<T> Substitution<T> {
    pub fn missing_tags(&self) -> &[String] {
        &self.missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    pub fn result(&self) -> Result<&T, TemplateResultError> {
        if self.missing.is_empty() {
            Ok(&self.value)
        } else {
            Err(TemplateResultError { missing: self.missing.clone() })
        }
    }

    pub fn into_result(self) -> Result<T, TemplateResultError> {
        if self.missing.is_empty() {
            Ok(self.value)
        } else {
            Err(TemplateResultError { missing: self.missing })
        }
    }
}

/// A filled template: text, or a string-to-string map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filled {
    Text(String),
    Map(BTreeMap<String, String>),
}

impl Filled {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Filled::Text(s) => Some(s),
            Filled::Map(_) => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Filled::Map(m) => Some(m),
            Filled::Text(_) => None,
        }
    }
}

fn fill(template: &str, tags: &Tags<'_>, missing: &mut Vec<String>) -> String {
    let first = raw_re().replace_all(template, |caps: &Captures<'_>| {
        let name = &caps[1];
        match tags.get(name) {
            Some(v) => v.to_string(),
            None => {
                missing.push(name.to_string());
                String::new()
            }
        }
    });
    encoded_re()
        .replace_all(&first, |caps: &Captures<'_>| {
            let name = &caps[1];
            match tags.get(name) {
                Some(v) => quote_plus(v),
                None => {
                    missing.push(name.to_string());
                    String::new()
                }
            }
        })
        .into_owned()
}

/// Substitute a plain string.
pub fn substitute(template: &str, tags: &Tags<'_>) -> Substitution<String> {
    let mut missing = Vec::new();
    let value = fill(template, tags, &mut missing);
    Substitution { value, missing }
}

fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a map",
    }
}

/// Substitute an instruction field. `None` and JSON `null` pass through as
/// `None`; numbers and booleans are stringified first; maps have both keys and values
/// filled, in document order.
pub fn substitute_value(
    template: Option<&Value>,
    tags: &Tags<'_>,
) -> Result<Substitution<Option<Filled>>, TemplateError> {
    let mut missing = Vec::new();
    let value = match template {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => {
            let mut out = BTreeMap::new();
            for (k, v) in map {
                let text = scalar_text(v).ok_or_else(|| {
                    TemplateError::Unsupported(format!("{} under key '{k}'", kind_of(v)))
                })?;
                let key = fill(k, tags, &mut missing);
                let val = fill(&text, tags, &mut missing);
                out.insert(key, val);
            }
            Some(Filled::Map(out))
        }
        Some(v) => {
            let text = scalar_text(v).ok_or_else(|| TemplateError::Unsupported(kind_of(v).into()))?;
            Some(Filled::Text(fill(&text, tags, &mut missing)))
        }
    };
    Ok(Substitution { value, missing })
}

/// Concatenate the missing tags of several substitutions, in argument order,
/// so a set of fields can be gated on one check.
pub fn combine_missing<'a, I>(lists: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a [String]>,
{
    lists.into_iter().flat_map(|l| l.iter().cloned()).collect()
}
