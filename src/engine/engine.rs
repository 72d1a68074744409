// src/engine/engine.rs
use std::collections::BTreeMap;
use std::path::MAIN_SEPARATOR;
use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::config::ScraperOptions;
use crate::core::net::{Fetch, HttpFetcher};
use crate::core::sanitize::preview;
use crate::error::ScrapeError;
use crate::instruction::{inline_tags, resolve_extends, Instruction, Kind};
use crate::loader::{DocumentLoader, Load};
use crate::response::{Outcome, Response};
use crate::tags::Tags;
use crate::template::{substitute, Filled, Substitution};
use crate::engine::{find, load};
use crate::engine::pool::WorkerPool;
use crate::engine::types::{Frame, Request, Scraped};

/// Instruction interpreter.
///
/// One `Scraper` can serve any number of `scrape` calls, from any number of
/// threads; they share the document cache, the HTTP agent and the worker
/// budget.
pub struct Scraper {
    pub(super) options: ScraperOptions,
    pub(super) fetcher: Arc<dyn Fetch>,
    pub(super) loader: DocumentLoader,
    pub(super) pool: WorkerPool,
}

impl Scraper {
    pub fn new(options: ScraperOptions) -> Self {
        let fetcher = Arc::new(HttpFetcher::new(&options.user_agent, options.timeout));
        Self::with_fetcher(options, fetcher)
    }

    /// Use `fetcher` for both `load` instructions and remote documents.
    pub fn with_fetcher(options: ScraperOptions, fetcher: Arc<dyn Fetch>) -> Self {
        let loader = DocumentLoader::new(Arc::clone(&fetcher), options.cache_size);
        let pool = WorkerPool::new(options.workers);
        Self { options, fetcher, loader, pool }
    }

    pub fn options(&self) -> &ScraperOptions {
        &self.options
    }

    pub fn loader(&self) -> &DocumentLoader {
        &self.loader
    }

    /// Evaluate `instruction` (a map, a list, or a reference to load).
    ///
    /// Only malformed instructions and refused scheme crossings are errors;
    /// everything else is reported through the responses.
    pub fn scrape(&self, instruction: &Value, request: Request) -> Result<Scraped, ScrapeError> {
        let Request { tags, input, force, uri, id } = request;
        let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let uri = uri.unwrap_or_else(default_uri);
        let frame = Frame {
            input: &input,
            force: force || self.options.force_all,
            id: &id,
            uri: &uri,
        };
        logf!("scrape {id}: {} (force={})", preview(&instruction.to_string()), frame.force);

        let mut scope = Tags::from_map(tags);
        let mut responses = self.eval_node(instruction, &mut scope, frame)?;

        if instruction.is_array() || responses.len() != 1 {
            Ok(Scraped::Many(responses))
        } else {
            match responses.pop() {
                Some(one) => Ok(Scraped::One(one)),
                None => Ok(Scraped::Many(Vec::new())),
            }
        }
    }

    /// Evaluate one node of an instruction tree against `tags`.
    ///
    /// Lists run element by element on the same scope, so a single-match
    /// `name` written by one element is visible to the ones after it.
    pub(super) fn eval_node(
        &self,
        node: &Value,
        tags: &mut Tags<'_>,
        frame: Frame<'_>,
    ) -> Result<Vec<Response>, ScrapeError> {
        match node {
            Value::String(reference) => {
                let target = match substitute(reference, tags).into_result() {
                    Ok(t) => t,
                    Err(e) => {
                        logd!("reference '{reference}' is missing tags {:?}", e.missing);
                        return Ok(vec![respond(node, tags, frame, Outcome::MissingTags { missing: e.missing })]);
                    }
                };
                let (doc, resolved) = self.loader.load(frame.uri, &target)?;
                self.eval_node(&doc, tags, frame.with_uri(&resolved))
            }
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.extend(self.eval_node(item, tags, frame)?);
                }
                Ok(out)
            }
            Value::Object(map) => self.eval_map(map.clone(), tags, frame),
            other => Err(ScrapeError::invalid(format!(
                "instruction must be a string, list or object, got {other}"
            ))),
        }
    }

    fn eval_map(
        &self,
        mut instruction: Instruction,
        tags: &mut Tags<'_>,
        frame: Frame<'_>,
    ) -> Result<Vec<Response>, ScrapeError> {
        resolve_extends(&mut instruction, frame.uri, &self.loader, self.options.merge)?;
        tags.extend(inline_tags(&instruction)?);

        let kind = Kind::of(&instruction)?;
        logd!("dispatch {kind:?} at depth {}", tags.depth());
        match kind {
            Kind::Find | Kind::JsonPath | Kind::XPath => find::eval_find(self, &instruction, kind, tags, frame),
            Kind::Load => load::eval_load(self, &instruction, tags, frame).map(|r| vec![r]),
        }
    }
}

fn default_uri() -> String {
    let mut uri = std::env::current_dir()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();
    if !uri.ends_with(MAIN_SEPARATOR) {
        uri.push(MAIN_SEPARATOR);
    }
    uri
}

/// Response for `instruction` with the scope as it stands now.
pub(super) fn respond(instruction: &Value, tags: &Tags<'_>, frame: Frame<'_>, outcome: Outcome) -> Response {
    Response {
        id: frame.id.to_string(),
        uri: frame.uri.to_string(),
        instruction: instruction.clone(),
        tags: tags.snapshot(),
        outcome,
    }
}

/// Text of a substituted field. Only call once the missing-tag gate passed.
pub(super) fn text_field(
    sub: Substitution<Option<Filled>>,
    key: &str,
) -> Result<Option<String>, ScrapeError> {
    match sub.into_result() {
        Ok(None) => Ok(None),
        Ok(Some(Filled::Text(s))) => Ok(Some(s)),
        Ok(Some(Filled::Map(_))) => Err(ScrapeError::invalid(format!("`{key}` must be a string, not a map"))),
        Err(e) => Err(ScrapeError::invalid(format!("`{key}`: {e}"))),
    }
}

/// Map of a substituted field; absent means empty.
pub(super) fn map_field(
    sub: Substitution<Option<Filled>>,
    key: &str,
) -> Result<BTreeMap<String, String>, ScrapeError> {
    match sub.into_result() {
        Ok(None) => Ok(BTreeMap::new()),
        Ok(Some(Filled::Map(m))) => Ok(m),
        Ok(Some(Filled::Text(_))) => Err(ScrapeError::invalid(format!("`{key}` must be a map"))),
        Err(e) => Err(ScrapeError::invalid(format!("`{key}`: {e}"))),
    }
}
