// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Frequency-bucketed positional barrels (two passes over the forward
//! index).
//!
//! Pass 1 counts document frequency per token. The assignment step routes
//! tokens with `df > threshold * D` to the special frequent barrel and
//! spreads the rest over B regular barrels by `floor(rank^exponent * B)`,
//! where rank is the token's position in the df-ascending order. The
//! exponent (< 1) compresses the low end of the distribution: rare tokens
//! fan out across the early barrels while progressively more frequent
//! tokens cluster in later ones, which keeps per-barrel byte sizes more
//! even than a uniform partition.
//!
//! Pass 2 streams the forward index again and emits one positional record
//! per (document, token) pair into the barrel chosen by the mapping.
//! Records inside a barrel are produced document by document with token ids
//! ascending within each document, so every barrel is implicitly sorted by
//! `(doc_id, token_id)`. Writers flush at document boundaries; a partial
//! record never reaches disk.
//!
//! Barrel record layout (no file header, boundaries implied by `pos_count`):
//!
//! ```text
//! u32 token_id
//! u32 doc_id
//! u32 freq
//! u32 pos_count
//! u32[pos_count] positions
//! ```
//!
//! `barrel_mapping.bin` layout:
//!
//! ```text
//! u32 num_barrels
//! u32 special_freq_barrel_id
//! u32 mapping_count
//! repeated mapping_count times:
//!   u32 token_id
//!   u32 barrel_id
//! ```

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::codec::{read_u32, read_u32_vec, try_read_u32, write_u32, write_u32_slice};
use crate::config::IndexConfig;
use crate::forward::ForwardDoc;

/// Records handed to pass-1 workers in batches of this many documents.
const DF_BATCH_DOCS: usize = 1024;

/// One positional posting record as stored in a barrel file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostingRecord {
    pub token_id: u32,
    pub doc_id: u32,
    pub freq: u32,
    pub positions: Vec<u32>,
}

impl PostingRecord {
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write_u32(w, self.token_id)?;
        write_u32(w, self.doc_id)?;
        write_u32(w, self.freq)?;
        write_u32(w, self.positions.len() as u32)?;
        write_u32_slice(w, &self.positions)
    }

    /// Decode the next record, `None` on clean EOF.
    ///
    /// Rejects records whose `freq` disagrees with `pos_count` or whose
    /// positions are not strictly increasing; both indicate corruption.
    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Option<Self>> {
        let token_id = match try_read_u32(r)? {
            Some(v) => v,
            None => return Ok(None),
        };
        let doc_id = read_u32(r)?;
        let freq = read_u32(r)?;
        let pos_count = read_u32(r)?;
        if freq != pos_count {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "record for token {} doc {}: freq {} disagrees with pos_count {}",
                    token_id, doc_id, freq, pos_count
                ),
            ));
        }
        let positions = read_u32_vec(r, pos_count as usize)?;
        if !positions.windows(2).all(|w| w[0] < w[1]) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "record for token {} doc {}: positions not strictly increasing",
                    token_id, doc_id
                ),
            ));
        }
        Ok(Some(Self {
            token_id,
            doc_id,
            freq,
            positions,
        }))
    }
}

/// Pass 1: document frequency per token.
///
/// Per-document dedup runs on rayon; accumulation into `df` stays
/// sequential, which is what keeps the counts deterministic.
pub fn document_frequencies<I>(docs: I, vocab_size: usize) -> io::Result<Vec<u32>>
where
    I: Iterator<Item = io::Result<ForwardDoc>>,
{
    let mut docs = docs;
    let mut df = vec![0u32; vocab_size];

    loop {
        let mut batch = Vec::with_capacity(DF_BATCH_DOCS);
        for _ in 0..DF_BATCH_DOCS {
            match docs.next() {
                Some(rec) => batch.push(rec?),
                None => break,
            }
        }
        if batch.is_empty() {
            break;
        }
        let done = batch.len() < DF_BATCH_DOCS;

        let uniques: Vec<Vec<u32>> = batch
            .par_iter()
            .map(|doc| {
                let mut ids = doc.token_ids.clone();
                ids.sort_unstable();
                ids.dedup();
                ids
            })
            .collect();

        for ids in uniques {
            for id in ids {
                let slot = df.get_mut(id as usize).ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!(
                            "token id {} out of range for vocabulary of {}",
                            id, vocab_size
                        ),
                    )
                })?;
                *slot += 1;
            }
        }

        if done {
            break;
        }
    }

    Ok(df)
}

/// Total assignment of token ids to barrels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarrelMap {
    num_barrels: u32,
    special: u32,
    assignment: Vec<u32>,
}

impl BarrelMap {
    /// Compute the assignment from pass-1 document frequencies.
    pub fn assign(df: &[u32], doc_count: u32, cfg: &IndexConfig) -> Self {
        let b = cfg.num_barrels;
        let tau = cfg.freq_barrel_threshold * f64::from(doc_count);

        let mut assignment = vec![0u32; df.len()];
        let mut regular: Vec<u32> = Vec::with_capacity(df.len());
        for (token_id, &freq) in df.iter().enumerate() {
            if f64::from(freq) > tau {
                assignment[token_id] = b;
            } else {
                regular.push(token_id as u32);
            }
        }

        // df ascending, token_id breaks ties: the order (and therefore the
        // whole mapping) is a pure function of the corpus.
        regular.sort_unstable_by_key(|&t| (df[t as usize], t));

        let n = regular.len();
        for (i, &token_id) in regular.iter().enumerate() {
            let rank = i as f64 / n as f64;
            let barrel = (rank.powf(cfg.barrel_exponent) * f64::from(b)).floor() as u32;
            assignment[token_id as usize] = barrel.min(b - 1);
        }

        Self {
            num_barrels: b,
            special: b,
            assignment,
        }
    }

    /// Regular barrel count B.
    pub fn num_barrels(&self) -> u32 {
        self.num_barrels
    }

    /// Id of the special frequent barrel.
    pub fn special_id(&self) -> u32 {
        self.special
    }

    /// Vocabulary size the mapping covers.
    pub fn len(&self) -> usize {
        self.assignment.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignment.is_empty()
    }

    pub fn barrel_of(&self, token_id: u32) -> Option<u32> {
        self.assignment.get(token_id as usize).copied()
    }

    pub fn is_special(&self, token_id: u32) -> bool {
        self.barrel_of(token_id) == Some(self.special)
    }

    /// Token ids routed to the special barrel, ascending.
    pub fn special_tokens(&self) -> impl Iterator<Item = u32> + '_ {
        self.assignment
            .iter()
            .enumerate()
            .filter(|&(_, &b)| b == self.special)
            .map(|(t, _)| t as u32)
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write_u32(w, self.num_barrels)?;
        write_u32(w, self.special)?;
        write_u32(w, self.assignment.len() as u32)?;
        for (token_id, &barrel_id) in self.assignment.iter().enumerate() {
            write_u32(w, token_id as u32)?;
            write_u32(w, barrel_id)?;
        }
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let num_barrels = read_u32(r)?;
        let special = read_u32(r)?;
        let mapping_count = read_u32(r)? as usize;

        let mut assignment = Vec::with_capacity(mapping_count);
        for position in 0..mapping_count {
            let token_id = read_u32(r)? as usize;
            if token_id != position {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "barrel mapping entry {} carries token id {}, must be dense and in order",
                        position, token_id
                    ),
                ));
            }
            let barrel_id = read_u32(r)?;
            if barrel_id > special {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("barrel id {} exceeds special barrel {}", barrel_id, special),
                ));
            }
            assignment.push(barrel_id);
        }

        Ok(Self {
            num_barrels,
            special,
            assignment,
        })
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        self.write_to(&mut w)?;
        w.flush()?;
        w.into_inner()?.sync_all()
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        Self::read_from(&mut BufReader::new(File::open(path)?))
    }
}

/// File name of a barrel inside the barrels directory.
pub fn barrel_file_name(barrel_id: u32, num_barrels: u32) -> String {
    if barrel_id == num_barrels {
        "barrel_freq.bin".to_string()
    } else {
        format!("barrel_{:02}.bin", barrel_id)
    }
}

/// Paths of all barrel files in emission order (regular 0..B, then freq).
pub fn barrel_paths(dir: &Path, num_barrels: u32) -> Vec<PathBuf> {
    (0..=num_barrels)
        .map(|b| dir.join(barrel_file_name(b, num_barrels)))
        .collect()
}

/// Pass 2: stream the forward index and route positional records to their
/// barrels. Keeps exactly B+1 writers open; flushes every writer touched by
/// a document before moving to the next one.
pub fn write_barrels<I>(docs: I, map: &BarrelMap, dir: &Path) -> io::Result<()>
where
    I: Iterator<Item = io::Result<ForwardDoc>>,
{
    fs::create_dir_all(dir)?;
    let mut writers: Vec<BufWriter<File>> = barrel_paths(dir, map.num_barrels())
        .iter()
        .map(|path| Ok(BufWriter::new(File::create(path)?)))
        .collect::<io::Result<_>>()?;

    for rec in docs {
        let doc = rec?;

        // BTreeMap gives token_id-ascending emission within the document.
        let mut by_token: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
        for (position, &token_id) in doc.token_ids.iter().enumerate() {
            by_token.entry(token_id).or_default().push(position as u32);
        }

        let mut touched: Vec<u32> = Vec::new();
        for (token_id, positions) in by_token {
            let barrel_id = map.barrel_of(token_id).ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("token id {} has no barrel assignment", token_id),
                )
            })?;
            let record = PostingRecord {
                token_id,
                doc_id: doc.doc_id,
                freq: positions.len() as u32,
                positions,
            };
            record.write_to(&mut writers[barrel_id as usize])?;
            if !touched.contains(&barrel_id) {
                touched.push(barrel_id);
            }
        }
        for barrel_id in touched {
            writers[barrel_id as usize].flush()?;
        }
    }

    for w in writers {
        let file = w.into_inner()?;
        file.sync_all()?;
    }
    Ok(())
}

/// Iterator over the records of one barrel file, in file order.
pub struct BarrelReader {
    r: BufReader<File>,
}

impl BarrelReader {
    pub fn open(path: &Path) -> io::Result<Self> {
        Ok(Self {
            r: BufReader::new(File::open(path)?),
        })
    }
}

impl Iterator for BarrelReader {
    type Item = io::Result<PostingRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        PostingRecord::read_from(&mut self.r).transpose()
    }
}
