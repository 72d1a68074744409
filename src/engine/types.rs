// src/engine/types.rs
use std::collections::BTreeMap;

use serde_json::Value;

use crate::response::Response;

/// Per-call settings for [`Scraper::scrape`](super::Scraper::scrape).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Request {
    pub tags: BTreeMap<String, String>,
    pub input: String,
    pub force: bool,
    /// Base URI for relative references. Defaults to the working directory.
    pub uri: Option<String>,
    /// Shared by every response in the tree. Generated when absent.
    pub id: Option<String>,
}

impl Request {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(mut self, input: impl Into<String>) -> Self {
        self.input = input.into();
        self
    }

    pub fn tag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(name.into(), value.into());
        self
    }

    pub fn tags<I, K, V>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// What every node of one evaluation shares, plus the input it runs on.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Frame<'a> {
    pub input: &'a str,
    pub force: bool,
    pub id: &'a str,
    pub uri: &'a str,
}

impl<'a> Frame<'a> {
    pub fn with_input(self, input: &'a str) -> Self {
        Frame { input, ..self }
    }

    pub fn with_uri(self, uri: &'a str) -> Self {
        Frame { uri, ..self }
    }
}

/// Top-level outcome: a single response for a map instruction, an ordered
/// list for a list instruction.
#[derive(Clone, Debug, PartialEq)]
pub enum Scraped {
    One(Response),
    Many(Vec<Response>),
}

impl Scraped {
    pub fn responses(&self) -> &[Response] {
        match self {
            Scraped::One(r) => std::slice::from_ref(r),
            Scraped::Many(rs) => rs,
        }
    }

    pub fn into_responses(self) -> Vec<Response> {
        match self {
            Scraped::One(r) => vec![r],
            Scraped::Many(rs) => rs,
        }
    }

    /// The single response, if this isn't a list.
    pub fn one(&self) -> Option<&Response> {
        match self {
            Scraped::One(r) => Some(r),
            Scraped::Many(_) => None,
        }
    }

    pub fn flattened_values(&self) -> Option<Value> {
        match self {
            Scraped::One(r) => r.flattened_values(),
            Scraped::Many(rs) => Some(Value::Array(
                rs.iter().filter_map(Response::flattened_values).collect(),
            )),
        }
    }

    pub fn as_dict(&self) -> Value {
        match self {
            Scraped::One(r) => r.as_dict(),
            Scraped::Many(rs) => Value::Array(rs.iter().map(Response::as_dict).collect()),
        }
    }

    pub fn as_dict_truncated(&self, head: usize, tail: usize) -> Value {
        match self {
            Scraped::One(r) => r.as_dict_truncated(head, tail),
            Scraped::Many(rs) => Value::Array(rs.iter().map(|r| r.as_dict_truncated(head, tail)).collect()),
        }
    }
}
