//! Decompressed document handle passed from the fetcher to the feeder.

use std::io::{self, BufRead};

/// A fully retrieved work item, ready to be streamed line by line.
///
/// Owns the (already decompressing) line source plus the metadata the
/// feeder and the telemetry loop need: the origin locator, the transfer
/// size, and the uncompressed offset consumed so far. Exactly one stage
/// holds a `Document` at a time; dropping it releases the underlying
/// spool file.
pub struct Document {
    id: String,
    reader: Box<dyn BufRead + Send>,
    total_bytes: Option<u64>,
    consumed: u64,
}

impl Document {
    pub fn new(id: impl Into<String>, reader: Box<dyn BufRead + Send>, total_bytes: Option<u64>) -> Self {
        Self {
            id: id.into(),
            reader,
            total_bytes,
            consumed: 0,
        }
    }

    /// Origin locator (URL or path) of this document.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Transfer size in bytes, when the transport declared one.
    pub fn total_bytes(&self) -> Option<u64> {
        self.total_bytes
    }

    /// Uncompressed bytes handed out so far.
    pub fn pos(&self) -> u64 {
        self.consumed
    }

    /// Read the next line (including its terminator) into `buf`.
    /// Returns 0 at end of stream.
    pub fn read_line(&mut self, buf: &mut String) -> io::Result<usize> {
        let n = self.reader.read_line(buf)?;
        self.consumed += n as u64;
        Ok(n)
    }

    /// Close the stream, keeping only the identifier for the ledger.
    pub fn into_id(self) -> String {
        self.id
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.id)
            .field("total_bytes", &self.total_bytes)
            .field("consumed", &self.consumed)
            .finish_non_exhaustive()
    }
}
