// src/core/net.rs
//! Fetch collaborator.
//!
//! The engine only needs `fetch(method, url, headers, cookies, body)`; HTTP
//! error statuses come back as ordinary [`Fetched`] values, only transport
//! failures are errors.

use std::collections::BTreeMap;
use std::io::Read;
use std::time::Duration;

use crate::config::consts::MAX_BODY_BYTES;
use crate::error::FetchError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Head,
    Get,
    Post,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Head => "HEAD",
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }

    /// Accepts `head`, `get` or `post`, in any case.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "head" => Some(Method::Head),
            "get" => Some(Method::Get),
            "post" => Some(Method::Post),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchRequest {
    pub method: Method,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub cookies: BTreeMap<String, String>,
    /// Form fields, sent url-encoded. Only used with `Method::Post`.
    pub posts: BTreeMap<String, String>,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: BTreeMap::new(),
            cookies: BTreeMap::new(),
            posts: BTreeMap::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Fetched {
    pub status: u16,
    pub body: String,
    pub cookies: BTreeMap<String, String>,
}

pub trait Fetch: Send + Sync {
    fn fetch(&self, req: &FetchRequest) -> Result<Fetched, FetchError>;
}

/// `Fetch` over a shared `ureq` agent.
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .user_agent(user_agent)
            .timeout(timeout)
            .build();
        Self { agent }
    }
}

fn cookie_header(cookies: &BTreeMap<String, String>) -> String {
    cookies
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// `name=value` of each `Set-Cookie` line; attributes are dropped.
pub fn parse_set_cookies<'a, I>(lines: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out = BTreeMap::new();
    for line in lines {
        let pair = line.split(';').next().unwrap_or("");
        if let Some((k, v)) = pair.split_once('=') {
            let k = k.trim();
            if !k.is_empty() {
                out.insert(k.to_string(), v.trim().to_string());
            }
        }
    }
    out
}

fn read_response(resp: ureq::Response) -> Result<Fetched, FetchError> {
    let status = resp.status();
    let cookies = parse_set_cookies(resp.all("set-cookie"));
    let mut buf = Vec::new();
    resp.into_reader()
        .take(MAX_BODY_BYTES)
        .read_to_end(&mut buf)
        .map_err(|e| FetchError(format!("reading body: {e}")))?;
    Ok(Fetched { status, body: String::from_utf8_lossy(&buf).into_owned(), cookies })
}

impl Fetch for HttpFetcher {
    fn fetch(&self, req: &FetchRequest) -> Result<Fetched, FetchError> {
        let mut call = self.agent.request(req.method.as_str(), &req.url);
        for (k, v) in &req.headers {
            call = call.set(k, v);
        }
        if !req.cookies.is_empty() {
            call = call.set("Cookie", &cookie_header(&req.cookies));
        }

        let sent = if req.method == Method::Post {
            let form: Vec<(&str, &str)> =
                req.posts.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
            call.send_form(&form)
        } else {
            call.call()
        };

        match sent {
            Ok(resp) => read_response(resp),
            // 4xx/5xx still carry a body worth reporting
            Err(ureq::Error::Status(_, resp)) => read_response(resp),
            Err(ureq::Error::Transport(t)) => Err(FetchError(t.to_string())),
        }
    }
}
