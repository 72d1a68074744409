// src/config/options.rs
use std::time::Duration;

use super::consts::*;
use crate::instruction::MergePolicy;

/// Scraper-wide settings. Per-call settings live on `engine::Request`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScraperOptions {
    /// Treat every call as forced, so loads always hit the network.
    pub force_all: bool,
    /// Upper bound on evaluations running at once, the calling thread
    /// included. `1` evaluates everything on the caller's thread.
    pub workers: usize,
    /// Entries kept by the document cache.
    pub cache_size: usize,
    pub user_agent: String,
    pub timeout: Duration,
    pub merge: MergePolicy,
}

impl Default for ScraperOptions {
    fn default() -> Self {
        Self {
            force_all: false,
            workers: DEFAULT_WORKERS,
            cache_size: MAX_FILE_CACHE_SIZE,
            user_agent: s!(USER_AGENT),
            timeout: Duration::from_secs(HTTP_TIMEOUT_SECS),
            merge: MergePolicy::default(),
        }
    }
}

impl ScraperOptions {
    pub fn sequential() -> Self {
        Self { workers: 1, ..Self::default() }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_force_all(mut self, force_all: bool) -> Self {
        self.force_all = force_all;
        self
    }
}
