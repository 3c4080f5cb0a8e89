//! Work-item list handling and Google Books shard-list generation.
//!
//! The pipeline consumes a newline-delimited list of locators (URLs or
//! local paths), fixed in order for a run. `BooksTemplate` reproduces the
//! Google Books ngram corpus naming scheme so the list can be generated
//! deterministically for a given n.

use std::io::{self, BufRead};

use ngramflow_core::Ledger;

/// One unit of input to fetch and ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Source locator: URL or local path.
    pub locator: String,
    /// Already present in the completion ledger at load time.
    pub done: bool,
}

/// Read a locator list, one per line, skipping blanks.
pub fn load(reader: impl BufRead) -> io::Result<Vec<String>> {
    let mut locators = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            locators.push(trimmed.to_owned());
        }
    }
    Ok(locators)
}

/// Compute the done flag for each locator against the ledger.
pub fn mark_done(locators: Vec<String>, ledger: &Ledger) -> Vec<WorkItem> {
    locators
        .into_iter()
        .map(|locator| {
            let done = ledger.contains(&locator);
            WorkItem { locator, done }
        })
        .collect()
}

/// Part-of-speech tag shards of the Google Books ngram corpus.
pub const POS_TAGS: [&str; 10] = [
    "_ADJ_", "_ADP_", "_ADV_", "_CONJ_", "_DET_", "_NOUN_", "_NUM_", "_PRON_", "_PRT_", "_VERB_",
];

/// URL template for the Google Books ngram corpus.
#[derive(Debug, Clone)]
pub struct BooksTemplate {
    pub base_url: String,
    pub corpus: String,
    pub version: String,
}

impl Default for BooksTemplate {
    fn default() -> Self {
        Self {
            base_url: "http://storage.googleapis.com/books/ngrams/books".to_string(),
            corpus: "eng-all".to_string(),
            version: "20120701".to_string(),
        }
    }
}

impl BooksTemplate {
    pub fn shard_url(&self, n: u32, shard: &str) -> String {
        format!(
            "{}/googlebooks-{}-{}gram-{}-{}.gz",
            self.base_url, self.corpus, n, self.version, shard
        )
    }

    /// All shard URLs for the given n, in the corpus's fixed order:
    /// digit shards, part-of-speech tags, then the two-character shards
    /// `a_`, `aa` .. `zz`.
    pub fn urls(&self, n: u32) -> Vec<String> {
        shard_suffixes()
            .iter()
            .map(|s| self.shard_url(n, s))
            .collect()
    }
}

/// Shard suffixes in corpus order.
pub fn shard_suffixes() -> Vec<String> {
    let mut shards: Vec<String> = (0..10).map(|d| d.to_string()).collect();
    shards.extend(POS_TAGS.iter().map(|t| t.to_string()));
    for x in 'a'..='z' {
        for y in std::iter::once('_').chain('a'..='z') {
            shards.push(format!("{x}{y}"));
        }
    }
    shards
}
