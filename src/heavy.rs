// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Heavy-token fast path: positionless companion files for frequent tokens.
//!
//! Every token the barrel mapping routes to the special frequent barrel gets
//! its postings block projected down to `(doc_id, freq)` pairs and written
//! to its own file. Query code that does not need positions can set-intersect
//! these files without decoding position arrays.
//!
//! `heavy/token_<id>.bin` layout:
//!
//! ```text
//! u32 doc_count
//! repeated doc_count times:
//!   u32 doc_id
//!   u32 freq
//! ```
//!
//! `heavy/manifest.json` lists every extracted token with its file name,
//! document count, and byte size.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::barrels::BarrelMap;
use crate::codec::{read_u32, write_u32};
use crate::error::IndexError;
use crate::postings::PostingsReader;

/// Manifest entry for one extracted heavy token.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct HeavyEntry {
    pub file: String,
    pub doc_count: u32,
    pub size_bytes: u64,
}

/// `heavy/manifest.json`: token_id to entry, serialized with ordered keys.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct HeavyManifest {
    pub tokens: BTreeMap<u32, HeavyEntry>,
}

impl HeavyManifest {
    pub fn load(path: &Path) -> Result<Self, IndexError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// One decoded heavy file: `(doc_id, freq)` pairs in doc_id order.
pub fn read_heavy_file(path: &Path) -> io::Result<Vec<(u32, u32)>> {
    let mut r = BufReader::new(File::open(path)?);
    let doc_count = read_u32(&mut r)? as usize;
    let mut pairs = Vec::with_capacity(doc_count);
    for _ in 0..doc_count {
        let doc_id = read_u32(&mut r)?;
        let freq = read_u32(&mut r)?;
        pairs.push((doc_id, freq));
    }
    let mut probe = [0u8; 1];
    if r.read(&mut probe)? != 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "trailing bytes after last heavy entry",
        ));
    }
    Ok(pairs)
}

/// Extract every special-barrel token into `dir` and write the manifest.
/// Returns the number of extracted tokens.
pub fn extract_heavy_tokens(
    postings: &mut PostingsReader,
    map: &BarrelMap,
    dir: &Path,
) -> Result<usize, IndexError> {
    fs::create_dir_all(dir)?;
    let mut manifest = HeavyManifest::default();

    for token_id in map.special_tokens() {
        // A special token absent from the offsets never occurred (its df is
        // zero only when every document holding it was skipped); nothing to
        // project.
        let Some(block) = postings.get(token_id)? else {
            continue;
        };

        let file_name = format!("token_{}.bin", token_id);
        let path = dir.join(&file_name);
        let mut w = BufWriter::new(File::create(&path)?);
        write_u32(&mut w, block.len() as u32)?;
        for posting in &block {
            write_u32(&mut w, posting.doc_id)?;
            write_u32(&mut w, posting.freq)?;
        }
        w.flush()?;
        w.into_inner().map_err(io::Error::from)?.sync_all()?;

        let size_bytes = 4 + 8 * block.len() as u64;
        manifest.tokens.insert(
            token_id,
            HeavyEntry {
                file: file_name,
                doc_count: block.len() as u32,
                size_bytes,
            },
        );
    }

    let extracted = manifest.tokens.len();
    let manifest_path = dir.join("manifest.json");
    let json = serde_json::to_string_pretty(&manifest)?;
    let mut w = BufWriter::new(File::create(&manifest_path)?);
    w.write_all(json.as_bytes())?;
    w.flush()?;
    w.into_inner().map_err(io::Error::from)?.sync_all()?;

    Ok(extracted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::barrels::PostingRecord;
    use crate::config::IndexConfig;
    use crate::postings::aggregate;

    /// Build a postings pair holding one token in `docs` documents.
    fn build_postings(dir: &Path, token_id: u32, docs: u32) -> PostingsReader {
        let barrel = dir.join("barrel_freq.bin");
        let mut w = BufWriter::new(File::create(&barrel).unwrap());
        for doc_id in 0..docs {
            PostingRecord {
                token_id,
                doc_id,
                freq: 2,
                positions: vec![0, 7],
            }
            .write_to(&mut w)
            .unwrap();
        }
        w.flush().unwrap();

        let index_path = dir.join("postings_index.bin");
        let offsets_path = dir.join("postings_offsets.bin");
        aggregate(
            &[barrel],
            token_id as usize + 1,
            1024,
            &dir.join("spill.tmp"),
            &index_path,
            &offsets_path,
        )
        .unwrap();
        PostingsReader::open(&index_path, &offsets_path).unwrap()
    }

    #[test]
    fn heavy_file_projects_block_to_doc_freq_pairs() {
        let tmp = tempfile::tempdir().unwrap();
        let mut postings = build_postings(tmp.path(), 0, 3);

        // df 3 > tau = 0.05 * 3, so token 0 is special.
        let map = BarrelMap::assign(&[3], 3, &IndexConfig::default());
        let heavy_dir = tmp.path().join("heavy");
        let extracted = extract_heavy_tokens(&mut postings, &map, &heavy_dir).unwrap();
        assert_eq!(extracted, 1);

        let pairs = read_heavy_file(&heavy_dir.join("token_0.bin")).unwrap();
        assert_eq!(pairs, vec![(0, 2), (1, 2), (2, 2)]);
    }

    #[test]
    fn manifest_records_file_and_sizes() {
        let tmp = tempfile::tempdir().unwrap();
        let mut postings = build_postings(tmp.path(), 0, 2);
        let map = BarrelMap::assign(&[2], 2, &IndexConfig::default());
        let heavy_dir = tmp.path().join("heavy");
        extract_heavy_tokens(&mut postings, &map, &heavy_dir).unwrap();

        let manifest = HeavyManifest::load(&heavy_dir.join("manifest.json")).unwrap();
        let entry = manifest.tokens.get(&0).unwrap();
        assert_eq!(entry.file, "token_0.bin");
        assert_eq!(entry.doc_count, 2);
        assert_eq!(entry.size_bytes, 4 + 8 * 2);
        assert_eq!(
            entry.size_bytes,
            fs::metadata(heavy_dir.join("token_0.bin")).unwrap().len()
        );
    }

    #[test]
    fn no_special_tokens_writes_empty_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        let mut postings = build_postings(tmp.path(), 0, 1);
        // df 1 over D = 100: regular barrel, nothing heavy.
        let map = BarrelMap::assign(&[1], 100, &IndexConfig::default());
        let heavy_dir = tmp.path().join("heavy");
        let extracted = extract_heavy_tokens(&mut postings, &map, &heavy_dir).unwrap();
        assert_eq!(extracted, 0);

        let manifest = HeavyManifest::load(&heavy_dir.join("manifest.json")).unwrap();
        assert!(manifest.tokens.is_empty());
    }
}
