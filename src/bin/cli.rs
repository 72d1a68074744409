// src/bin/cli.rs
use instr_scrape::cli;

fn main() -> color_eyre::eyre::Result<()> {
    cli::run()
}
