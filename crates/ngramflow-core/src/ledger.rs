//! Completion ledger — durable record of already-indexed work items.
//!
//! Plain text, one locator per line, append-only. A locator present in
//! the ledger is never fetched again in this or a later run. Appends go
//! through an `O_APPEND` handle as a single write, so a reader (or a
//! crash) sees either the old file or the fully appended line, never a
//! torn one. External tooling may tail the file.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;

pub struct Ledger {
    path: PathBuf,
    done: FxHashSet<String>,
    file: File,
}

impl Ledger {
    /// Load the ledger, creating an empty file if none exists.
    pub fn load(path: &Path) -> io::Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)?;

        let mut text = String::new();
        file.read_to_string(&mut text)?;
        let done: FxHashSet<String> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_owned)
            .collect();

        log::debug!("{} entries in ledger {}", done.len(), path.display());

        Ok(Self {
            path: path.to_path_buf(),
            done,
            file,
        })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.done.contains(id)
    }

    pub fn len(&self) -> usize {
        self.done.len()
    }

    pub fn is_empty(&self) -> bool {
        self.done.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a completed work item.
    ///
    /// One write syscall for the whole line, flushed before returning;
    /// a failure here must be treated as fatal by the caller since the
    /// completion would otherwise not survive a restart.
    pub fn append(&mut self, id: &str) -> io::Result<()> {
        let line = format!("{id}\n");
        self.file.write_all(line.as_bytes())?;
        self.file.flush()?;
        self.done.insert(id.to_owned());
        Ok(())
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("path", &self.path)
            .field("entries", &self.done.len())
            .finish_non_exhaustive()
    }
}
