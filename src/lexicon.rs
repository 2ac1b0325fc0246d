// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Lexicon: bijection between normalized tokens and dense token ids.
//!
//! Ids are assigned in first-observation order during the lexicon pass and
//! are immutable afterwards. The structure is two parallel tables: a reverse
//! `Vec<String>` indexed by id, and a forward `HashMap` keyed by token
//! bytes.
//!
//! The on-disk form stores each token's id explicitly even though records
//! are written in id order; the loader verifies the stored id against the
//! record position, so a corrupted or reordered file is rejected instead of
//! silently remapping the vocabulary (the forward pass re-reads the file
//! from disk rather than trusting in-memory state).
//!
//! Layout (`lexicon.bin`, little-endian):
//!
//! ```text
//! u32 vocab_size
//! repeated vocab_size times:
//!   u32 token_len
//!   u8[token_len] token_utf8
//!   u32 token_id
//! ```

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::codec::{read_u32, write_u32};

#[derive(Debug, Default)]
pub struct Lexicon {
    terms: Vec<String>,
    ids: HashMap<String, u32>,
}

impl Lexicon {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for `token`, assigning the next free id on first observation.
    pub fn intern(&mut self, token: &str) -> u32 {
        if let Some(&id) = self.ids.get(token) {
            return id;
        }
        let id = self.terms.len() as u32;
        self.terms.push(token.to_owned());
        self.ids.insert(token.to_owned(), id);
        id
    }

    /// Id for `token` if it has one.
    pub fn get(&self, token: &str) -> Option<u32> {
        self.ids.get(token).copied()
    }

    /// Token string for `id`.
    pub fn term(&self, id: u32) -> Option<&str> {
        self.terms.get(id as usize).map(String::as_str)
    }

    /// Vocabulary size V.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write_u32(w, self.terms.len() as u32)?;
        for (id, term) in self.terms.iter().enumerate() {
            let bytes = term.as_bytes();
            write_u32(w, bytes.len() as u32)?;
            w.write_all(bytes)?;
            write_u32(w, id as u32)?;
        }
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let vocab_size = read_u32(r)? as usize;
        let mut terms = Vec::with_capacity(vocab_size);
        let mut ids = HashMap::with_capacity(vocab_size);

        for position in 0..vocab_size {
            let token_len = read_u32(r)? as usize;
            let mut buf = vec![0u8; token_len];
            r.read_exact(&mut buf)?;
            let term = String::from_utf8(buf).map_err(|e| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("invalid UTF-8 in lexicon entry {}: {}", position, e),
                )
            })?;
            let token_id = read_u32(r)? as usize;
            if token_id != position {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "lexicon entry {} carries id {}, ids must be dense and in order",
                        position, token_id
                    ),
                ));
            }
            if ids.insert(term.clone(), token_id as u32).is_some() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("duplicate token {:?} in lexicon", term),
                ));
            }
            terms.push(term);
        }

        Ok(Self { terms, ids })
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        let file = File::create(path)?;
        let mut w = BufWriter::new(file);
        self.write_to(&mut w)?;
        w.flush()?;
        w.into_inner()?.sync_all()
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        let mut r = BufReader::new(File::open(path)?);
        let lexicon = Self::read_from(&mut r)?;
        // Trailing bytes mean the file does not match its own header.
        let mut probe = [0u8; 1];
        if r.read(&mut probe)? != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "trailing bytes after last lexicon entry",
            ));
        }
        Ok(lexicon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn intern_assigns_dense_ids_in_first_observation_order() {
        let mut lex = Lexicon::new();
        assert_eq!(lex.intern("alpha"), 0);
        assert_eq!(lex.intern("beta"), 1);
        assert_eq!(lex.intern("alpha"), 0);
        assert_eq!(lex.intern("gamma"), 2);
        assert_eq!(lex.len(), 3);
        assert_eq!(lex.term(1), Some("beta"));
        assert_eq!(lex.get("gamma"), Some(2));
        assert_eq!(lex.get("delta"), None);
    }

    #[test]
    fn roundtrip_preserves_ids_and_terms() {
        let mut lex = Lexicon::new();
        for term in ["virus", "protein", "ümlaut", "rna"] {
            lex.intern(term);
        }
        let mut buf = Vec::new();
        lex.write_to(&mut buf).unwrap();

        let loaded = Lexicon::read_from(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(loaded.len(), 4);
        for term in ["virus", "protein", "ümlaut", "rna"] {
            assert_eq!(loaded.get(term), lex.get(term));
        }
    }

    #[test]
    fn out_of_order_ids_rejected() {
        let mut buf = Vec::new();
        write_u32(&mut buf, 1).unwrap();
        write_u32(&mut buf, 2).unwrap();
        buf.extend_from_slice(b"ab");
        write_u32(&mut buf, 5).unwrap(); // id 5 at position 0
        let err = Lexicon::read_from(&mut Cursor::new(&buf)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn truncated_file_rejected() {
        let mut lex = Lexicon::new();
        lex.intern("alpha");
        let mut buf = Vec::new();
        lex.write_to(&mut buf).unwrap();
        buf.truncate(buf.len() - 2);
        assert!(Lexicon::read_from(&mut Cursor::new(&buf)).is_err());
    }

    #[test]
    fn save_load_detects_trailing_garbage() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("lexicon.bin");
        let mut lex = Lexicon::new();
        lex.intern("alpha");
        lex.save(&path).unwrap();
        assert!(Lexicon::load(&path).is_ok());

        let mut bytes = std::fs::read(&path).unwrap();
        bytes.push(0xFF);
        std::fs::write(&path, bytes).unwrap();
        assert!(Lexicon::load(&path).is_err());
    }

    #[test]
    fn empty_lexicon_roundtrips() {
        let lex = Lexicon::new();
        let mut buf = Vec::new();
        lex.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), 4);
        let loaded = Lexicon::read_from(&mut Cursor::new(&buf)).unwrap();
        assert!(loaded.is_empty());
    }
}
