// src/engine/mod.rs
mod engine;
mod find;
mod load;
pub mod pool;
pub mod types;

pub use engine::Scraper;
pub use pool::WorkerPool;
pub use types::{Request, Scraped};
