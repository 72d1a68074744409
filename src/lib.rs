// src/lib.rs
//! Declarative scraping instructions: recursive `find`/`load`/`then`
//! documents evaluated into a tree of responses.

#[macro_use]
pub mod macros;
#[macro_use]
pub mod log;

pub mod config;
pub mod core;
pub mod error;

pub mod tags;
pub mod template;
pub mod pattern;
pub mod instruction;
pub mod jsonpath;
pub mod xpath;
pub mod loader;
pub mod response;
pub mod engine;

#[cfg(feature = "cli")]
pub mod cli;

pub use config::ScraperOptions;
pub use engine::{Request, Scraped, Scraper};
pub use error::ScrapeError;
pub use instruction::MergePolicy;
pub use response::{Outcome, Response, ScrapeResult};
pub use tags::Tags;
