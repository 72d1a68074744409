// src/tags.rs
//! Layered tag scope.
//!
//! A `Tags` owns its local entries and borrows its parent. Lookups fall back
//! through the chain; writes only ever touch the local layer, so a fork can
//! never change what its parent or its siblings see.

use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default)]
pub struct Tags<'p> {
    local: HashMap<String, String>,
    parent: Option<&'p Tags<'p>>,
}

impl<'p> Tags<'p> {
    /// Root scope with no parent.
    pub fn new() -> Self {
        Self { local: HashMap::new(), parent: None }
    }

    pub fn from_map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            local: entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            parent: None,
        }
    }

    /// New empty layer on top of `self`.
    pub fn fork(&self) -> Tags<'_> {
        Tags { local: HashMap::new(), parent: Some(self) }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        match self.local.get(name) {
            Some(v) => Some(v.as_str()),
            None => self.parent.and_then(|p| p.get(name)),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.local.insert(name.into(), value.into());
    }

    pub fn extend<I, K, V>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in entries {
            self.insert(k, v);
        }
    }

    /// Entries written to this layer only.
    pub fn local(&self) -> &HashMap<String, String> {
        &self.local
    }

    pub fn depth(&self) -> usize {
        self.parent.map_or(0, |p| p.depth() + 1)
    }

    /// Everything visible from here, nearest layer winning.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        let mut out = self.parent.map(|p| p.snapshot()).unwrap_or_default();
        for (k, v) in &self.local {
            out.insert(k.clone(), v.clone());
        }
        out
    }
}
