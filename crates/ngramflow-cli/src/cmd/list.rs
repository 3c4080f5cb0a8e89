//! List subcommand - generate the Google Books shard list

use std::io::Write;

use anyhow::Result;
use clap::Args;

use crate::config::Config;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// N-gram order (1 for unigrams, 2 for bigrams, ...)
    pub n: u32,
}

pub fn run(args: ListArgs, config: &Config) -> Result<()> {
    let template = config.books.template();
    let mut out = std::io::stdout().lock();
    for url in template.urls(args.n) {
        writeln!(out, "{url}")?;
    }
    Ok(())
}
