// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Forward index: per-document token-id streams.
//!
//! Documents are appended in visitation order and `doc_id` equals the
//! append position, so no sort pass exists anywhere in the file's life.
//! The header's `doc_count` is not known until the last document (skipped
//! documents never receive an id), so the writer leaves a placeholder and
//! patches it in `finish`.
//!
//! Layout (`forward_index.bin`, little-endian):
//!
//! ```text
//! u32 doc_count
//! repeated doc_count times:
//!   u32 doc_id
//!   u32 token_count
//!   u32[token_count] token_ids
//! ```
//!
//! The sidecar `doc_ids.tsv` maps `doc_id` to the source `paper_id`, one
//! `<doc_id>\t<paper_id>\n` line per document, ascending by doc_id.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use crate::codec::{read_u32, read_u32_vec, write_u32, write_u32_slice};

/// One decoded forward record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardDoc {
    pub doc_id: u32,
    pub token_ids: Vec<u32>,
}

/// Streaming writer for `forward_index.bin`.
pub struct ForwardWriter {
    w: BufWriter<File>,
    docs_written: u32,
}

impl ForwardWriter {
    pub fn create(path: &Path) -> io::Result<Self> {
        let mut w = BufWriter::new(File::create(path)?);
        // Placeholder doc_count, patched in finish().
        write_u32(&mut w, 0)?;
        Ok(Self {
            w,
            docs_written: 0,
        })
    }

    /// Append one document's token ids; returns the assigned doc_id.
    pub fn append(&mut self, token_ids: &[u32]) -> io::Result<u32> {
        let doc_id = self.docs_written;
        write_u32(&mut self.w, doc_id)?;
        write_u32(&mut self.w, token_ids.len() as u32)?;
        write_u32_slice(&mut self.w, token_ids)?;
        self.docs_written += 1;
        Ok(doc_id)
    }

    /// Patch the header with the final document count, flush, and fsync.
    /// Returns the document count D.
    pub fn finish(self) -> io::Result<u32> {
        let docs = self.docs_written;
        let mut file = self.w.into_inner()?;
        file.seek(SeekFrom::Start(0))?;
        write_u32(&mut file, docs)?;
        file.sync_all()?;
        Ok(docs)
    }
}

/// Pull-based reader over `forward_index.bin` records.
///
/// Verifies that stored doc_ids are dense and in order; a gap or repeat is
/// corruption, not data.
pub struct ForwardReader {
    r: BufReader<File>,
    doc_count: u32,
    next: u32,
}

impl ForwardReader {
    pub fn open(path: &Path) -> io::Result<Self> {
        let mut r = BufReader::new(File::open(path)?);
        let doc_count = read_u32(&mut r)?;
        Ok(Self {
            r,
            doc_count,
            next: 0,
        })
    }

    /// Total document count D from the header.
    pub fn doc_count(&self) -> u32 {
        self.doc_count
    }

    fn read_record(&mut self) -> io::Result<ForwardDoc> {
        let doc_id = read_u32(&mut self.r)?;
        if doc_id != self.next {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "forward index out of order: expected doc_id {}, found {}",
                    self.next, doc_id
                ),
            ));
        }
        let token_count = read_u32(&mut self.r)? as usize;
        let token_ids = read_u32_vec(&mut self.r, token_count)?;
        self.next += 1;
        Ok(ForwardDoc { doc_id, token_ids })
    }
}

impl Iterator for ForwardReader {
    type Item = io::Result<ForwardDoc>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.doc_count {
            return None;
        }
        Some(self.read_record())
    }
}

/// Writer for the `doc_ids.tsv` sidecar.
pub struct DocIdTable {
    w: BufWriter<File>,
}

impl DocIdTable {
    pub fn create(path: &Path) -> io::Result<Self> {
        Ok(Self {
            w: BufWriter::new(File::create(path)?),
        })
    }

    pub fn append(&mut self, doc_id: u32, paper_id: &str) -> io::Result<()> {
        writeln!(self.w, "{}\t{}", doc_id, paper_id)
    }

    pub fn finish(mut self) -> io::Result<()> {
        self.w.flush()?;
        self.w.into_inner()?.sync_all()
    }
}
