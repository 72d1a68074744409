// src/engine/load.rs
use serde_json::Value;

use crate::config::consts::DEFAULT_METHOD;
use crate::core::net::{FetchRequest, Method};
use crate::error::ScrapeError;
use crate::instruction::{description, raw_str, Instruction};
use crate::response::{Outcome, Response, ScrapeResult};
use crate::tags::Tags;
use crate::template::{combine_missing, substitute_value};
use crate::engine::engine::{map_field, respond, text_field, Scraper};
use crate::engine::types::Frame;

pub(super) fn eval_load(
    scraper: &Scraper,
    instruction: &Instruction,
    tags: &mut Tags<'_>,
    frame: Frame<'_>,
) -> Result<Response, ScrapeError> {
    let echo = Value::Object(instruction.clone());

    let method_raw = raw_str(instruction, "method")?.unwrap_or(DEFAULT_METHOD);
    let method = Method::parse(method_raw)
        .ok_or_else(|| ScrapeError::invalid(format!("illegal HTTP method: {method_raw}")))?;

    let url_sub = substitute_value(instruction.get("load"), tags)?;
    let name_sub = substitute_value(instruction.get("name"), tags)?;
    let posts_sub = substitute_value(instruction.get("posts"), tags)?;
    let cookies_sub = substitute_value(instruction.get("cookies"), tags)?;
    let headers_sub = substitute_value(instruction.get("headers"), tags)?;

    let missing = combine_missing([
        url_sub.missing_tags(),
        name_sub.missing_tags(),
        posts_sub.missing_tags(),
        cookies_sub.missing_tags(),
        headers_sub.missing_tags(),
    ]);
    if !missing.is_empty() {
        logd!("load is missing tags {missing:?}");
        return Ok(respond(&echo, tags, frame, Outcome::MissingTags { missing }));
    }

    let url = text_field(url_sub, "load")?
        .ok_or_else(|| ScrapeError::invalid("`load` must not be null"))?;
    let name = text_field(name_sub, "name")?.filter(|n| !n.is_empty());
    let description = description(instruction);

    if !frame.force {
        logd!("load {url}: waiting for force");
        return Ok(respond(&echo, tags, frame, Outcome::Wait { name, description }));
    }

    let posts = map_field(posts_sub, "posts")?;
    let request = FetchRequest {
        // form data always goes out as a POST
        method: if posts.is_empty() { method } else { Method::Post },
        url,
        headers: map_field(headers_sub, "headers")?,
        cookies: map_field(cookies_sub, "cookies")?,
        posts,
    };

    logf!("load: {} {}", request.method.as_str(), request.url);
    let fetched = match scraper.fetcher.fetch(&request) {
        Ok(f) => f,
        Err(e) => {
            loge!("load {} failed: {e}", request.url);
            return Ok(respond(&echo, tags, frame, Outcome::Failed { reason: e.to_string() }));
        }
    };
    if fetched.status != 200 {
        let reason = format!("Status code {} from {}", fetched.status, request.url);
        loge!("{reason}");
        return Ok(respond(&echo, tags, frame, Outcome::Failed { reason }));
    }
    logf!("load: {} -> {} bytes", request.url, fetched.body.len());

    // Children of a load share its scope.
    let children = match instruction.get("then") {
        Some(then) if !then.is_null() => scraper.eval_node(then, tags, frame.with_input(&fetched.body))?,
        _ => Vec::new(),
    };

    let outcome = Outcome::Loaded {
        name,
        description,
        result: ScrapeResult::new(fetched.body, children),
        cookies: fetched.cookies,
    };
    Ok(respond(&echo, tags, frame, outcome))
}
