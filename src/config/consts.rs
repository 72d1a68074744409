// src/config/consts.rs

// Net config
pub const USER_AGENT: &str = concat!("instr_scrape/", env!("CARGO_PKG_VERSION"));
pub const HTTP_TIMEOUT_SECS: u64 = 30;
pub const MAX_BODY_BYTES: u64 = 16 * 1024 * 1024;

// Document cache
pub const MAX_FILE_CACHE_SIZE: usize = 50;

// Find defaults
pub const DEFAULT_REPLACE: &str = "$0";
pub const DEFAULT_CASE_INSENSITIVE: bool = false;
pub const DEFAULT_MULTILINE: bool = false;
pub const DEFAULT_DOT_MATCHES_ALL: bool = true;
pub const DEFAULT_MIN_MATCH: i64 = 0;
pub const DEFAULT_MAX_MATCH: i64 = -1; // to the end

// Load defaults
pub const DEFAULT_METHOD: &str = "get";

// Display
pub const EXCERPT_HEAD: usize = 200;
pub const EXCERPT_TAIL: usize = 100;

// Concurrency
pub const DEFAULT_WORKERS: usize = 4;
