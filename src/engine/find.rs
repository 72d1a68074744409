// src/engine/find.rs
//! `find` and `jsonpath` branches.

use serde_json::Value;

use crate::config::consts::*;
use crate::core::sanitize::preview;
use crate::error::{PatternError, ScrapeError};
use crate::instruction::{description, flag, raw_str, Instruction, Kind};
use crate::jsonpath::{node_text, JsonPath};
use crate::pattern::Pattern;
use crate::response::{Outcome, Response, ScrapeResult};
use crate::tags::Tags;
use crate::xpath::{self, XPathError};
use crate::template::{combine_missing, substitute, substitute_value};
use crate::engine::engine::{respond, text_field, Scraper};
use crate::engine::types::Frame;

/// `items[start:stop]` with signed bounds: negative bounds count from the end and
/// out-of-range bounds clamp.
fn signed_slice<T>(items: Vec<T>, start: i64, stop: Option<i64>) -> Vec<T> {
    let len = items.len() as i64;
    let clamp = |i: i64| if i < 0 { (len + i).max(0) } else { i.min(len) };
    let lo = clamp(start);
    let hi = stop.map_or(len, clamp);
    if lo >= hi {
        return Vec::new();
    }
    items.into_iter().skip(lo as usize).take((hi - lo) as usize).collect()
}

/// Upper bound of the inclusive `max_match`, `None` for "to the end".
fn slice_stop(max: i64) -> Option<i64> {
    if max == -1 { None } else { max.checked_add(1) }
}

fn regex_matches(
    instruction: &Instruction,
    find: &str,
    input: &str,
    min: i64,
    max: i64,
) -> Result<Result<Vec<String>, PatternError>, ScrapeError> {
    let replace = raw_str(instruction, "replace")?.unwrap_or(DEFAULT_REPLACE);
    let pattern = match Pattern::compile(
        find,
        flag(instruction, "case_insensitive", DEFAULT_CASE_INSENSITIVE)?,
        flag(instruction, "multiline", DEFAULT_MULTILINE)?,
        flag(instruction, "dot_matches_all", DEFAULT_DOT_MATCHES_ALL)?,
        replace,
    ) {
        Ok(p) => p,
        Err(e) => return Ok(Err(e)),
    };

    // Non-negative bounds can stop the scan early.
    let subs: Result<Vec<String>, PatternError> = if min >= 0 && max >= -1 {
        let lower = usize::try_from(min).unwrap_or(usize::MAX);
        let upper = slice_stop(max).and_then(|s| usize::try_from(s).ok());
        pattern.substitutions(input).range(lower, upper).collect()
    } else {
        pattern
            .substitutions(input)
            .collect::<Result<Vec<_>, _>>()
            .map(|all| signed_slice(all, min, slice_stop(max)))
    };
    Ok(subs)
}

enum JsonFailure {
    BadExpression,
    NotJson,
}

fn jsonpath_matches(expr: &str, input: &str, min: i64, max: i64) -> Result<Vec<String>, JsonFailure> {
    let path = JsonPath::parse(expr).map_err(|_| JsonFailure::BadExpression)?;
    let doc: Value = serde_json::from_str(input).map_err(|_| JsonFailure::NotJson)?;
    let all = path
        .select(&doc)
        .map_err(|_| JsonFailure::BadExpression)?
        .into_iter()
        .map(node_text)
        .collect();
    Ok(signed_slice(all, min, slice_stop(max)))
}

fn xpath_matches(expr: &str, input: &str, min: i64, max: i64) -> Result<Vec<String>, XPathError> {
    let all = xpath::select(expr, input)?;
    Ok(signed_slice(all, min, slice_stop(max)))
}

fn parse_bound(text: &str) -> Result<i64, std::num::ParseIntError> {
    text.trim().parse()
}

pub(super) fn eval_find(
    scraper: &Scraper,
    instruction: &Instruction,
    kind: Kind,
    tags: &mut Tags<'_>,
    frame: Frame<'_>,
) -> Result<Vec<Response>, ScrapeError> {
    let echo = Value::Object(instruction.clone());
    let key = kind.key();
    let raw_find = match instruction.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };

    // `match` pins both bounds to the same value
    let (min_key, max_key) = if instruction.contains_key("match") {
        ("match", "match")
    } else {
        ("min_match", "max_match")
    };

    let find_sub = substitute_value(instruction.get(key), tags)?;
    let name_sub = substitute_value(instruction.get("name"), tags)?;
    let min_sub = substitute_value(instruction.get(min_key), tags)?;
    let max_sub = substitute_value(instruction.get(max_key), tags)?;
    let tag_match_sub = substitute_value(instruction.get("tag_match"), tags)?;
    let join_sub = substitute_value(instruction.get("join"), tags)?;
    let input_sub = substitute_value(instruction.get("input"), tags)?;

    let missing = combine_missing([
        find_sub.missing_tags(),
        name_sub.missing_tags(),
        min_sub.missing_tags(),
        max_sub.missing_tags(),
        tag_match_sub.missing_tags(),
        join_sub.missing_tags(),
        input_sub.missing_tags(),
    ]);
    if !missing.is_empty() {
        logd!("{key} '{}' is missing tags {missing:?}", preview(&raw_find));
        return Ok(vec![respond(&echo, tags, frame, Outcome::MissingTags { missing })]);
    }

    let find = text_field(find_sub, key)?
        .ok_or_else(|| ScrapeError::invalid(format!("`{key}` must not be null")))?;
    let name = text_field(name_sub, "name")?.filter(|n| !n.is_empty());
    let tag_match = text_field(tag_match_sub, "tag_match")?.filter(|t| !t.is_empty());
    let join = text_field(join_sub, "join")?;
    let own_input = text_field(input_sub, "input")?;
    let input = own_input.as_deref().unwrap_or(frame.input);

    let min_text = text_field(min_sub, min_key)?.unwrap_or_else(|| DEFAULT_MIN_MATCH.to_string());
    let max_text = text_field(max_sub, max_key)?.unwrap_or_else(|| DEFAULT_MAX_MATCH.to_string());
    let (min, max) = match (parse_bound(&min_text), parse_bound(&max_text)) {
        (Ok(min), Ok(max)) => (min, max),
        (Err(e), _) | (_, Err(e)) => {
            let reason = format!("Min_match '{min_text}' or max_match '{max_text}' is not an int: {e}");
            logd!("{reason}");
            return Ok(vec![respond(&echo, tags, frame, Outcome::Failed { reason })]);
        }
    };
    let single_match = min == max || join.is_some();

    let found = match kind {
        Kind::JsonPath => jsonpath_matches(&find, input, min, max).map_err(|f| match f {
            JsonFailure::BadExpression => {
                format!("'{raw_find}' failed because it is not a valid jsonpath expression")
            }
            JsonFailure::NotJson => {
                format!("'{raw_find}' failed because its input '{}' was not JSON", preview(input))
            }
        }),
        Kind::XPath => xpath_matches(&find, input, min, max)
            .map_err(|e| format!("'{raw_find}' failed because of {e}")),
        _ => regex_matches(instruction, &find, input, min, max)?
            .map_err(|e| format!("'{raw_find}' failed because of {e}")),
    };
    let mut matches = match found {
        Ok(m) => m,
        Err(reason) => {
            loge!("{reason}");
            return Ok(vec![respond(&echo, tags, frame, Outcome::Failed { reason })]);
        }
    };

    // Joining happens before the emptiness check: no matches join to "".
    if let Some(sep) = join.as_deref().filter(|j| !j.is_empty()) {
        matches = vec![matches.join(sep)];
    }

    if matches.is_empty() {
        if let Some(otherwise) = instruction.get("else").filter(|v| !v.is_null()) {
            logd!("no matches for '{}', trying `else`", preview(&raw_find));
            return scraper.eval_node(otherwise, tags, frame.with_input(input));
        }
        let reason = format!("No matches for '{raw_find}', evaluated to '{find}'");
        logd!("{reason}");
        return Ok(vec![respond(&echo, tags, frame, Outcome::Failed { reason })]);
    }

    logd!("{key} '{}' -> {} match(es)", preview(&find), matches.len());

    // Tags inside the matched text itself, `tag_match` already in scope.
    let mut values = Vec::with_capacity(matches.len());
    for (i, raw) in matches.iter().enumerate() {
        let mut scope = tags.fork();
        if let Some(tm) = &tag_match {
            scope.insert(tm.clone(), i.to_string());
        }
        match substitute(raw, &scope).into_result() {
            Ok(v) => values.push(v),
            Err(e) => {
                return Ok(vec![respond(&echo, tags, frame, Outcome::MissingTags { missing: e.missing })]);
            }
        }
    }

    // A one-to-one find names its value for everything evaluated after it.
    if single_match {
        if let Some(name) = &name {
            for (i, v) in values.iter().enumerate() {
                tags.insert(name.clone(), v.clone());
                if let Some(tm) = &tag_match {
                    tags.insert(tm.clone(), i.to_string());
                }
            }
        }
    }

    let children: Vec<Result<Vec<Response>, ScrapeError>> = match instruction.get("then") {
        Some(then) if !then.is_null() => {
            let ambient: &Tags<'_> = tags;
            let (name, tag_match, values) = (&name, &tag_match, &values);
            scraper.pool.run_indexed(values.len(), |i| {
                let mut fork = ambient.fork();
                if let Some(tm) = tag_match {
                    fork.insert(tm.clone(), i.to_string());
                }
                if let Some(name) = name {
                    fork.insert(name.clone(), values[i].clone());
                }
                scraper.eval_node(then, &mut fork, frame.with_input(&values[i]))
            })
        }
        _ => values.iter().map(|_| Ok(Vec::new())).collect(),
    };

    let mut results = Vec::with_capacity(values.len());
    for (value, children) in values.into_iter().zip(children) {
        results.push(ScrapeResult::new(value, children?));
    }

    let outcome = Outcome::Found { name, description: description(instruction), results };
    Ok(vec![respond(&echo, tags, frame, outcome)])
}
