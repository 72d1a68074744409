// src/cli.rs
use std::{fs, io::{self, Read}, path::PathBuf};

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use serde_json::Value;

use crate::config::consts::{DEFAULT_WORKERS, EXCERPT_HEAD, EXCERPT_TAIL};
use crate::{Request, Scraper, ScraperOptions};

#[derive(Parser, Debug)]
#[command(name = "cli")]
#[command(about = "Evaluate a scraping instruction and print the responses as JSON")]
pub struct Args {
    /// Inline JSON instruction, or a path/URL to load one from
    pub instruction: String,
    /// File to use as input, `-` for stdin
    #[arg(long)]
    pub input: Option<String>,
    /// Tag as NAME=VALUE (repeatable)
    #[arg(long = "tag", value_parser = parse_tag)]
    pub tags: Vec<(String, String)>,
    /// Actually perform loads instead of stopping at `wait`
    #[arg(long)]
    pub force: bool,
    /// Print flattened values instead of the response tree
    #[arg(long)]
    pub flatten: bool,
    /// Don't cut long values in the response tree
    #[arg(long)]
    pub full: bool,
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,
    /// Base URI for relative references
    #[arg(long)]
    pub uri: Option<String>,
    /// Write a debug log here
    #[arg(long)]
    pub log: Option<PathBuf>,
}

fn parse_tag(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected NAME=VALUE, got '{s}'"))
}

/// JSON if it looks like JSON, otherwise a reference for the loader.
fn parse_instruction(arg: &str) -> Result<Value> {
    let trimmed = arg.trim_start();
    if trimmed.starts_with(['{', '[', '"']) {
        serde_json::from_str(trimmed).wrap_err("instruction is not valid JSON")
    } else {
        Ok(Value::String(arg.to_string()))
    }
}

fn read_input(source: Option<&str>) -> Result<String> {
    match source {
        None => Ok(s!()),
        Some("-") => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf).wrap_err("reading stdin")?;
            Ok(buf)
        }
        Some(path) => fs::read_to_string(path).wrap_err_with(|| format!("reading input file '{path}'")),
    }
}

pub fn run() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    if let Some(path) = &args.log {
        crate::log::init(path, ::log::LevelFilter::Debug).wrap_err("installing logger")?;
    }

    let instruction = parse_instruction(&args.instruction)?;
    let input = read_input(args.input.as_deref())?;

    let scraper = Scraper::new(ScraperOptions::default().with_workers(args.workers));
    let mut request = Request::new().input(input).tags(args.tags).force(args.force);
    if let Some(uri) = args.uri {
        request = request.uri(uri);
    }

    let scraped = scraper.scrape(&instruction, request)?;
    let out = if args.flatten {
        scraped.flattened_values().unwrap_or(Value::Null)
    } else if args.full {
        scraped.as_dict()
    } else {
        scraped.as_dict_truncated(EXCERPT_HEAD, EXCERPT_TAIL)
    };
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
