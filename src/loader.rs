// src/loader.rs
//! Loader collaborator: resolves instruction references against a base URI
//! and reads JSON documents from disk or over HTTP, through a bounded cache.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use url::Url;

use crate::core::net::{Fetch, FetchRequest};
use crate::error::ScrapeError;

pub trait Load: Send + Sync {
    /// Load `reference` relative to `base_uri`, returning the document and the
    /// URI it resolved to.
    fn load(&self, base_uri: &str, reference: &str) -> Result<(Value, String), ScrapeError>;
}

/* ---------------- URI resolution ---------------- */

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Location {
    Remote(Url),
    Local(PathBuf),
}

impl Location {
    pub fn scheme(&self) -> &str {
        match self {
            Location::Remote(url) => url.scheme(),
            Location::Local(_) => "file",
        }
    }

    pub fn as_uri(&self) -> String {
        match self {
            Location::Remote(url) => url.to_string(),
            Location::Local(path) => path.to_string_lossy().into_owned(),
        }
    }
}

/// Absolute URL with a real scheme. Single-letter schemes are Windows drive
/// letters, not URLs.
fn absolute_url(s: &str) -> Option<Url> {
    Url::parse(s).ok().filter(|u| u.scheme().len() > 1)
}

fn classify(url: Url) -> Result<Location, ScrapeError> {
    match url.scheme() {
        "http" | "https" => Ok(Location::Remote(url)),
        "file" => url
            .to_file_path()
            .map(Location::Local)
            .map_err(|_| ScrapeError::invalid(format!("bad file URI '{url}'"))),
        other => Err(ScrapeError::invalid(format!("reference to unsupported scheme '{other}'"))),
    }
}

fn parse_base(base: &str) -> Result<Location, ScrapeError> {
    match absolute_url(base) {
        Some(url) => classify(url),
        None => Ok(Location::Local(PathBuf::from(base))),
    }
}

/// Directory a relative path resolves against: the base itself when it ends
/// in a separator, otherwise its parent.
fn base_dir(base: &Path) -> PathBuf {
    let s = base.to_string_lossy();
    if s.ends_with('/') || s.ends_with(std::path::MAIN_SEPARATOR) {
        base.to_path_buf()
    } else {
        base.parent().map(Path::to_path_buf).unwrap_or_default()
    }
}

/// Resolve `reference` against `base`. Crossing from a remote scheme onto
/// the local filesystem is refused.
pub fn resolve(base: &str, reference: &str) -> Result<Location, ScrapeError> {
    let base_loc = parse_base(base)?;
    let resolved = match absolute_url(reference) {
        Some(url) => classify(url)?,
        None => match &base_loc {
            Location::Remote(url) => {
                let joined = url
                    .join(reference)
                    .map_err(|e| ScrapeError::invalid(format!("can't resolve '{reference}': {e}")))?;
                classify(joined)?
            }
            Location::Local(path) => {
                let r = Path::new(reference);
                if r.is_absolute() {
                    Location::Local(r.to_path_buf())
                } else {
                    Location::Local(base_dir(path).join(r))
                }
            }
        },
    };

    if matches!(base_loc, Location::Remote(_)) && matches!(resolved, Location::Local(_)) {
        return Err(ScrapeError::SchemeSecurity {
            from: base_loc.scheme().to_string(),
            to: resolved.scheme().to_string(),
        });
    }
    Ok(resolved)
}

/* ---------------- Cache ---------------- */

#[derive(Default)]
struct CacheInner {
    docs: HashMap<String, Value>,
    order: VecDeque<String>,
}

/// Bounded document cache, oldest insert evicted first. Reads hand out
/// copies so callers can mutate what they get.
pub struct DocumentCache {
    inner: Mutex<CacheInner>,
    capacity: usize,
}

impl DocumentCache {
    pub fn new(capacity: usize) -> Self {
        Self { inner: Mutex::new(CacheInner::default()), capacity }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let inner = self.inner.lock().ok()?;
        inner.docs.get(key).cloned()
    }

    pub fn insert(&self, key: &str, doc: &Value) {
        if self.capacity == 0 {
            return;
        }
        let Ok(mut inner) = self.inner.lock() else { return };
        if inner.docs.insert(key.to_string(), doc.clone()).is_none() {
            inner.order.push_back(key.to_string());
        }
        while inner.order.len() > self.capacity {
            if let Some(old) = inner.order.pop_front() {
                logd!("cache: evicting {old}");
                inner.docs.remove(&old);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|i| i.docs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/* ---------------- Default loader ---------------- */

/// Reads local files directly and remote documents through a `Fetch`.
pub struct DocumentLoader {
    cache: DocumentCache,
    fetcher: Arc<dyn Fetch>,
}

impl DocumentLoader {
    pub fn new(fetcher: Arc<dyn Fetch>, cache_size: usize) -> Self {
        Self { cache: DocumentCache::new(cache_size), fetcher }
    }

    pub fn cache(&self) -> &DocumentCache {
        &self.cache
    }

    fn read(&self, loc: &Location) -> Result<String, ScrapeError> {
        match loc {
            Location::Local(path) => std::fs::read_to_string(path).map_err(|e| {
                ScrapeError::invalid(format!("couldn't open '{}': {e}", path.display()))
            }),
            Location::Remote(url) => {
                logf!("loader: GET {url}");
                let fetched = self
                    .fetcher
                    .fetch(&FetchRequest::get(url.as_str()))
                    .map_err(|e| ScrapeError::invalid(format!("couldn't load '{url}': {e}")))?;
                if fetched.status != 200 {
                    return Err(ScrapeError::invalid(format!(
                        "couldn't load '{url}': status code {}",
                        fetched.status
                    )));
                }
                Ok(fetched.body)
            }
        }
    }
}

impl Load for DocumentLoader {
    fn load(&self, base_uri: &str, reference: &str) -> Result<(Value, String), ScrapeError> {
        let loc = resolve(base_uri, reference)?;
        let uri = loc.as_uri();

        if let Some(doc) = self.cache.get(&uri) {
            logd!("cache: hit {uri}");
            return Ok((doc, uri));
        }

        let text = self.read(&loc)?;
        let doc: Value = serde_json::from_str(&text)
            .map_err(|e| ScrapeError::invalid(format!("invalid JSON in '{uri}': {e}")))?;
        self.cache.insert(&uri, &doc);
        Ok((doc, uri))
    }
}
