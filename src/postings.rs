// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Postings aggregation: barrels in, one seekable postings file plus an
//! offset directory out.
//!
//! Phase A drains every barrel into per-token accumulators. A token whose
//! in-memory list reaches the spill threshold is flushed to its own temp
//! file and the memory released; later postings for that token buffer and
//! re-flush at the same threshold, so resident postings stay bounded by
//! `spill_threshold` per token. Phase B walks token ids in ascending order,
//! merges each token's temp file with its in-memory tail, sorts by doc_id,
//! and appends one contiguous block to `postings_index.bin` while recording
//! `(token_id, offset, length)`.
//!
//! Two postings with equal doc_id under one token cannot be produced by the
//! barrel builder; seeing one means a barrel was corrupted, and the
//! aggregation aborts.
//!
//! Block layout inside `postings_index.bin`:
//!
//! ```text
//! u32 doc_count
//! repeated doc_count times:
//!   u32 doc_id
//!   u32 freq
//!   u32 pos_count
//!   u32[pos_count] positions
//! ```
//!
//! `postings_offsets.bin`:
//!
//! ```text
//! u32 token_count
//! repeated token_count times:
//!   u32 token_id
//!   u64 offset
//!   u64 length
//! ```
//!
//! Tokens that never occur get no block and no offsets entry, so adjacent
//! entries tile the postings file without gaps.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::barrels::BarrelReader;
use crate::codec::{read_u32, read_u32_vec, read_u64, try_read_u32, write_u32, write_u32_slice, write_u64};
use crate::error::IndexError;

/// One posting under a single token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub doc_id: u32,
    pub freq: u32,
    pub positions: Vec<u32>,
}

impl Posting {
    fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write_u32(w, self.doc_id)?;
        write_u32(w, self.freq)?;
        write_u32(w, self.positions.len() as u32)?;
        write_u32_slice(w, &self.positions)
    }

    fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let doc_id = read_u32(r)?;
        let freq = read_u32(r)?;
        let pos_count = read_u32(r)? as usize;
        let positions = read_u32_vec(r, pos_count)?;
        Ok(Self {
            doc_id,
            freq,
            positions,
        })
    }

    fn encoded_len(&self) -> u64 {
        12 + 4 * self.positions.len() as u64
    }
}

/// Decode one postings block (`doc_count` + postings) from raw bytes.
/// The block must fill the slice exactly.
pub fn decode_block(bytes: &[u8]) -> io::Result<Vec<Posting>> {
    let mut cursor = io::Cursor::new(bytes);
    let doc_count = read_u32(&mut cursor)? as usize;
    let mut postings = Vec::with_capacity(doc_count);
    for _ in 0..doc_count {
        postings.push(Posting::read_from(&mut cursor)?);
    }
    if cursor.position() != bytes.len() as u64 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "postings block shorter than its recorded length",
        ));
    }
    Ok(postings)
}

/// One entry of the offset directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetEntry {
    pub token_id: u32,
    pub offset: u64,
    pub length: u64,
}

/// The offset directory, sorted by token_id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffsetTable {
    entries: Vec<OffsetEntry>,
}

impl OffsetTable {
    pub fn entries(&self) -> &[OffsetEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry for `token_id`, if the token occurs in the corpus.
    pub fn get(&self, token_id: u32) -> Option<OffsetEntry> {
        self.entries
            .binary_search_by_key(&token_id, |e| e.token_id)
            .ok()
            .map(|i| self.entries[i])
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write_u32(w, self.entries.len() as u32)?;
        for e in &self.entries {
            write_u32(w, e.token_id)?;
            write_u64(w, e.offset)?;
            write_u64(w, e.length)?;
        }
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let token_count = read_u32(r)? as usize;
        let mut entries: Vec<OffsetEntry> = Vec::with_capacity(token_count);
        for _ in 0..token_count {
            let entry = OffsetEntry {
                token_id: read_u32(r)?,
                offset: read_u64(r)?,
                length: read_u64(r)?,
            };
            if let Some(prev) = entries.last() {
                if prev.token_id >= entry.token_id {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "offsets not sorted by token_id",
                    ));
                }
                if prev.offset + prev.length != entry.offset {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!(
                            "offsets leave a gap before token {}: {} + {} != {}",
                            entry.token_id, prev.offset, prev.length, entry.offset
                        ),
                    ));
                }
            } else if entry.offset != 0 {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "first offsets entry does not start at 0",
                ));
            }
            entries.push(entry);
        }
        Ok(Self { entries })
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        Self::read_from(&mut BufReader::new(File::open(path)?))
    }
}

fn spill_path(spill_dir: &Path, token_id: u32) -> PathBuf {
    spill_dir.join(format!("token_{}.bin", token_id))
}

/// Per-token Phase A accumulator.
#[derive(Default)]
struct TokenBucket {
    mem: Vec<Posting>,
    spilled: bool,
}

/// Aggregation totals for the end-of-run summary.
#[derive(Debug, Clone, Copy)]
pub struct AggregateStats {
    /// Tokens that received a postings block
    pub token_count: u32,
    /// Total bytes of `postings_index.bin`
    pub postings_bytes: u64,
    /// Tokens that overflowed to a spill file during Phase A
    pub spilled_tokens: usize,
}

/// Run both aggregation phases.
///
/// `barrel_files` may come in any order; record order within each file is
/// preserved. Spill files live under `spill_dir`, which is created here and
/// removed after a successful emit.
pub fn aggregate(
    barrel_files: &[PathBuf],
    vocab_size: usize,
    spill_threshold: usize,
    spill_dir: &Path,
    index_path: &Path,
    offsets_path: &Path,
) -> Result<AggregateStats, IndexError> {
    fs::create_dir_all(spill_dir)?;

    // Phase A: drain barrels into per-token buckets, spilling as needed.
    let mut buckets: Vec<TokenBucket> = Vec::with_capacity(vocab_size);
    buckets.resize_with(vocab_size, TokenBucket::default);
    let mut spilled_tokens = 0usize;

    for path in barrel_files {
        for record in BarrelReader::open(path)? {
            let record = record?;
            let token_id = record.token_id;
            let bucket = buckets.get_mut(token_id as usize).ok_or_else(|| {
                IndexError::Corrupt(format!(
                    "barrel {} holds token id {} outside vocabulary of {}",
                    path.display(),
                    token_id,
                    vocab_size
                ))
            })?;
            bucket.mem.push(Posting {
                doc_id: record.doc_id,
                freq: record.freq,
                positions: record.positions,
            });
            if bucket.mem.len() >= spill_threshold {
                if !bucket.spilled {
                    bucket.spilled = true;
                    spilled_tokens += 1;
                }
                spill(spill_dir, token_id, &mut bucket.mem)?;
            }
        }
    }

    // Phase B: ascending token ids; sequential because it owns the offsets.
    let mut index_writer = BufWriter::new(File::create(index_path)?);
    let mut offsets = OffsetTable::default();
    let mut offset = 0u64;

    for (token_id, bucket) in buckets.into_iter().enumerate() {
        let token_id = token_id as u32;
        let mut postings = if bucket.spilled {
            let mut merged = read_spill(spill_dir, token_id)?;
            merged.extend(bucket.mem);
            merged
        } else {
            bucket.mem
        };
        if postings.is_empty() {
            continue;
        }

        postings.sort_by_key(|p| p.doc_id);
        if let Some(w) = postings.windows(2).find(|w| w[0].doc_id == w[1].doc_id) {
            return Err(IndexError::Corrupt(format!(
                "duplicate doc_id {} in postings for token {}",
                w[0].doc_id, token_id
            )));
        }

        let length: u64 = 4 + postings.iter().map(Posting::encoded_len).sum::<u64>();
        write_u32(&mut index_writer, postings.len() as u32)?;
        for posting in &postings {
            posting.write_to(&mut index_writer)?;
        }
        offsets.entries.push(OffsetEntry {
            token_id,
            offset,
            length,
        });
        offset += length;
    }

    index_writer.flush()?;
    index_writer.into_inner().map_err(io::Error::from)?.sync_all()?;

    let mut offsets_writer = BufWriter::new(File::create(offsets_path)?);
    offsets.write_to(&mut offsets_writer)?;
    offsets_writer.flush()?;
    offsets_writer
        .into_inner()
        .map_err(io::Error::from)?
        .sync_all()?;

    fs::remove_dir_all(spill_dir)?;

    Ok(AggregateStats {
        token_count: offsets.len() as u32,
        postings_bytes: offset,
        spilled_tokens,
    })
}

/// Append the bucket's postings to the token's spill file and release the
/// memory.
fn spill(spill_dir: &Path, token_id: u32, mem: &mut Vec<Posting>) -> io::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(spill_path(spill_dir, token_id))?;
    let mut w = BufWriter::new(file);
    for posting in mem.iter() {
        posting.write_to(&mut w)?;
    }
    w.flush()?;
    *mem = Vec::new();
    Ok(())
}

/// Read every posting from a token's spill file, in append order.
fn read_spill(spill_dir: &Path, token_id: u32) -> io::Result<Vec<Posting>> {
    let mut r = BufReader::new(File::open(spill_path(spill_dir, token_id))?);
    let mut postings = Vec::new();
    loop {
        // Peek via doc_id: clean EOF between postings ends the file.
        let doc_id = match try_read_u32(&mut r)? {
            Some(v) => v,
            None => break,
        };
        let freq = read_u32(&mut r)?;
        let pos_count = read_u32(&mut r)? as usize;
        let positions = read_u32_vec(&mut r, pos_count)?;
        postings.push(Posting {
            doc_id,
            freq,
            positions,
        });
    }
    Ok(postings)
}

/// Random-access reader over the published postings pair.
///
/// Lookup is one binary search in the in-memory offset directory plus one
/// seek-and-read of the exact block.
pub struct PostingsReader {
    file: File,
    offsets: OffsetTable,
}

impl PostingsReader {
    pub fn open(index_path: &Path, offsets_path: &Path) -> io::Result<Self> {
        Ok(Self {
            file: File::open(index_path)?,
            offsets: OffsetTable::load(offsets_path)?,
        })
    }

    pub fn offsets(&self) -> &OffsetTable {
        &self.offsets
    }

    /// Postings block for `token_id`; `None` if the token has no block.
    pub fn get(&mut self, token_id: u32) -> io::Result<Option<Vec<Posting>>> {
        let Some(entry) = self.offsets.get(token_id) else {
            return Ok(None);
        };
        self.file.seek(SeekFrom::Start(entry.offset))?;
        let mut bytes = vec![0u8; entry.length as usize];
        self.file.read_exact(&mut bytes)?;
        Ok(Some(decode_block(&bytes)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::barrels::PostingRecord;

    /// Write records into a synthetic barrel file.
    fn write_barrel(path: &Path, records: &[PostingRecord]) {
        let mut w = BufWriter::new(File::create(path).unwrap());
        for rec in records {
            rec.write_to(&mut w).unwrap();
        }
        w.flush().unwrap();
    }

    fn rec(token_id: u32, doc_id: u32, positions: &[u32]) -> PostingRecord {
        PostingRecord {
            token_id,
            doc_id,
            freq: positions.len() as u32,
            positions: positions.to_vec(),
        }
    }

    #[test]
    fn aggregates_across_barrels_and_sorts_by_doc_id() {
        let tmp = tempfile::tempdir().unwrap();
        let b0 = tmp.path().join("barrel_00.bin");
        let b1 = tmp.path().join("barrel_01.bin");
        write_barrel(&b0, &[rec(0, 2, &[0]), rec(1, 2, &[1])]);
        write_barrel(&b1, &[rec(0, 0, &[3, 5]), rec(0, 1, &[2])]);

        let index_path = tmp.path().join("postings_index.bin");
        let offsets_path = tmp.path().join("postings_offsets.bin");
        let stats = aggregate(
            &[b0, b1],
            3,
            1024,
            &tmp.path().join("spill.tmp"),
            &index_path,
            &offsets_path,
        )
        .unwrap();
        assert_eq!(stats.token_count, 2);
        assert_eq!(stats.spilled_tokens, 0);

        let mut reader = PostingsReader::open(&index_path, &offsets_path).unwrap();
        let block = reader.get(0).unwrap().unwrap();
        let doc_ids: Vec<u32> = block.iter().map(|p| p.doc_id).collect();
        assert_eq!(doc_ids, vec![0, 1, 2]);
        assert_eq!(block[0].positions, vec![3, 5]);
        assert_eq!(block[0].freq, 2);

        // Token 2 never occurred: no block, no entry.
        assert!(reader.get(2).unwrap().is_none());
    }

    #[test]
    fn spill_threshold_bounds_memory_and_merges_with_tail() {
        // Threshold 4, nine postings for one token across three barrels.
        let tmp = tempfile::tempdir().unwrap();
        let barrels: Vec<PathBuf> = (0u32..3)
            .map(|b| {
                let path = tmp.path().join(format!("barrel_0{}.bin", b));
                let records: Vec<PostingRecord> =
                    (0u32..3).map(|d| rec(0, b * 3 + d, &[d])).collect();
                write_barrel(&path, &records);
                path
            })
            .collect();

        let index_path = tmp.path().join("postings_index.bin");
        let offsets_path = tmp.path().join("postings_offsets.bin");
        let stats = aggregate(
            &barrels,
            1,
            4,
            &tmp.path().join("spill.tmp"),
            &index_path,
            &offsets_path,
        )
        .unwrap();
        assert_eq!(stats.spilled_tokens, 1);

        let mut reader = PostingsReader::open(&index_path, &offsets_path).unwrap();
        let block = reader.get(0).unwrap().unwrap();
        assert_eq!(block.len(), 9);
        let doc_ids: Vec<u32> = block.iter().map(|p| p.doc_id).collect();
        assert_eq!(doc_ids, (0..9).collect::<Vec<u32>>());

        // Spill directory is gone after a successful emit.
        assert!(!tmp.path().join("spill.tmp").exists());
    }

    #[test]
    fn duplicate_doc_id_aborts_with_corruption() {
        let tmp = tempfile::tempdir().unwrap();
        let b0 = tmp.path().join("barrel_00.bin");
        write_barrel(&b0, &[rec(0, 5, &[0]), rec(0, 5, &[1])]);

        let err = aggregate(
            &[b0],
            1,
            1024,
            &tmp.path().join("spill.tmp"),
            &tmp.path().join("postings_index.bin"),
            &tmp.path().join("postings_offsets.bin"),
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), 4);
        assert!(err.to_string().contains("duplicate doc_id 5"));
    }

    #[test]
    fn offsets_tile_the_postings_file() {
        let tmp = tempfile::tempdir().unwrap();
        let b0 = tmp.path().join("barrel_00.bin");
        write_barrel(
            &b0,
            &[rec(0, 0, &[0]), rec(1, 0, &[1, 2]), rec(2, 0, &[3])],
        );

        let index_path = tmp.path().join("postings_index.bin");
        let offsets_path = tmp.path().join("postings_offsets.bin");
        aggregate(
            &[b0],
            3,
            1024,
            &tmp.path().join("spill.tmp"),
            &index_path,
            &offsets_path,
        )
        .unwrap();

        let offsets = OffsetTable::load(&offsets_path).unwrap();
        assert_eq!(offsets.len(), 3);
        let entries = offsets.entries();
        assert_eq!(entries[0].offset, 0);
        for w in entries.windows(2) {
            assert_eq!(w[0].offset + w[0].length, w[1].offset);
        }
        let file_len = fs::metadata(&index_path).unwrap().len();
        let last = entries.last().unwrap();
        assert_eq!(last.offset + last.length, file_len);
    }

    #[test]
    fn empty_vocabulary_produces_wellformed_empty_artifacts() {
        let tmp = tempfile::tempdir().unwrap();
        let index_path = tmp.path().join("postings_index.bin");
        let offsets_path = tmp.path().join("postings_offsets.bin");
        let stats = aggregate(
            &[],
            0,
            1024,
            &tmp.path().join("spill.tmp"),
            &index_path,
            &offsets_path,
        )
        .unwrap();
        assert_eq!(stats.token_count, 0);
        assert_eq!(fs::metadata(&index_path).unwrap().len(), 0);

        let offsets = OffsetTable::load(&offsets_path).unwrap();
        assert!(offsets.is_empty());
    }

    #[test]
    fn offset_table_rejects_gaps() {
        let mut buf = Vec::new();
        write_u32(&mut buf, 2).unwrap();
        write_u32(&mut buf, 0).unwrap();
        write_u64(&mut buf, 0).unwrap();
        write_u64(&mut buf, 16).unwrap();
        write_u32(&mut buf, 1).unwrap();
        write_u64(&mut buf, 20).unwrap(); // gap: 16 expected
        write_u64(&mut buf, 8).unwrap();
        let err = OffsetTable::read_from(&mut io::Cursor::new(&buf)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
