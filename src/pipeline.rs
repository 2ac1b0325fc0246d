// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Pipeline driver: runs the six stages and publishes atomically.
//!
//! Every artifact is written under a `.tmp` name (directories included) and
//! renamed into place only after the whole generation is complete, so a
//! reader never sees a half-built index: it observes either the previous
//! generation or the new one. A run that dies mid-build leaves only `.tmp`
//! entries, which the next run sweeps before writing anything.
//!
//! Stage order and the files that flow between them:
//!
//! ```text
//! S1/S2  corpus ──tokenize──▶ lexicon.bin
//! S3     corpus + lexicon ──▶ forward_index.bin, doc_ids.tsv
//! S4     forward_index ─────▶ barrel_mapping.bin, barrels/
//! S5     barrels/ ──────────▶ postings_index.bin, postings_offsets.bin
//! S6     postings + mapping ▶ heavy/
//! ```
//!
//! The offsets file is renamed last: a consumer that finds the new offsets
//! table finds every block it points into.

use std::fs;
use std::path::{Path, PathBuf};

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::barrels::{self, BarrelMap};
use crate::config::IndexConfig;
use crate::corpus::Corpus;
use crate::error::IndexError;
use crate::forward::{DocIdTable, ForwardReader, ForwardWriter};
use crate::heavy::extract_heavy_tokens;
use crate::lexicon::Lexicon;
use crate::postings::{aggregate, PostingsReader};
use crate::tokenize::Tokenizer;

/// Final artifact names at the output root.
pub const LEXICON_FILE: &str = "lexicon.bin";
pub const FORWARD_FILE: &str = "forward_index.bin";
pub const DOC_IDS_FILE: &str = "doc_ids.tsv";
pub const MAPPING_FILE: &str = "barrel_mapping.bin";
pub const BARRELS_DIR: &str = "barrels";
pub const POSTINGS_FILE: &str = "postings_index.bin";
pub const OFFSETS_FILE: &str = "postings_offsets.bin";
pub const HEAVY_DIR: &str = "heavy";

const TMP_SUFFIX: &str = ".tmp";
const SPILL_DIR: &str = "spill.tmp";

/// Counts reported after a successful build.
#[derive(Debug, Clone, Copy)]
pub struct BuildSummary {
    pub documents: u32,
    pub vocabulary: u32,
    pub postings_tokens: u32,
    pub postings_bytes: u64,
    pub heavy_tokens: usize,
    pub skipped_malformed: usize,
    pub skipped_empty: usize,
}

fn tmp(output: &Path, name: &str) -> PathBuf {
    output.join(format!("{}{}", name, TMP_SUFFIX))
}

fn progress_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{spinner:.cyan} {prefix:<12} [{bar:40.cyan/dim}] {pos}/{len} {msg}",
    )
    .unwrap()
    .progress_chars("━━╸")
}

fn stage_bar(multi: &MultiProgress, prefix: &str, len: u64) -> ProgressBar {
    let pb = multi.add(ProgressBar::new(len));
    pb.set_style(progress_style());
    pb.set_prefix(prefix.to_string());
    pb
}

/// Remove `.tmp` leftovers from a previous cancelled run.
pub fn sweep_temp(output: &Path) -> Result<(), IndexError> {
    if !output.exists() {
        return Ok(());
    }
    for entry in fs::read_dir(output).map_err(IndexError::from)? {
        let entry = entry.map_err(IndexError::from)?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !name.ends_with(TMP_SUFFIX) {
            continue;
        }
        let path = entry.path();
        if path.is_dir() {
            fs::remove_dir_all(&path).map_err(IndexError::from)?;
        } else {
            fs::remove_file(&path).map_err(IndexError::from)?;
        }
    }
    Ok(())
}

/// Run the full pipeline: corpus in, published artifact set out.
pub fn build_index(
    input: &Path,
    output: &Path,
    cfg: &IndexConfig,
    tokenizer: &Tokenizer,
) -> Result<BuildSummary, IndexError> {
    cfg.validate()?;
    fs::create_dir_all(output).map_err(IndexError::from)?;
    sweep_temp(output)?;

    let multi = MultiProgress::new();

    // S1: resolve the corpus once; S2 and S3 stream the same entry list.
    let corpus = Corpus::scan(input).map_err(|e| e.at("S1 corpus scan"))?;

    // S2: lexicon.
    let lexicon_path = tmp(output, LEXICON_FILE);
    let pb = stage_bar(&multi, "Lexicon", corpus.len() as u64);
    let mut lexicon = Lexicon::new();
    for entry in corpus.entries() {
        match Corpus::load(entry) {
            Ok(doc) => {
                for token in tokenizer.tokenize(&doc.text()) {
                    lexicon.intern(&token);
                }
            }
            Err(e) => {
                eprintln!("warning: skipping {}: {}", entry.path.display(), e);
            }
        }
        pb.inc(1);
    }
    lexicon
        .save(&lexicon_path)
        .map_err(|e| IndexError::from(e).at("S2 lexicon build"))?;
    pb.finish_with_message(format!("{} terms", lexicon.len()));

    // S3: forward index. The lexicon is re-read from disk; a corrupted file
    // fails here, not at query time.
    let lexicon = Lexicon::load(&lexicon_path)
        .map_err(|e| IndexError::from(e).at("S3 forward build"))?;
    let forward_path = tmp(output, FORWARD_FILE);
    let doc_ids_path = tmp(output, DOC_IDS_FILE);

    let pb = stage_bar(&multi, "Forward", corpus.len() as u64);
    let mut skipped_empty = 0usize;
    let documents = (|| -> Result<u32, IndexError> {
        let mut writer = ForwardWriter::create(&forward_path)?;
        let mut doc_table = DocIdTable::create(&doc_ids_path)?;
        for entry in corpus.entries() {
            let Ok(doc) = Corpus::load(entry) else {
                // Warned during the lexicon pass; skip the same document.
                pb.inc(1);
                continue;
            };
            let tokens = tokenizer.tokenize(&doc.text());
            if tokens.is_empty() {
                skipped_empty += 1;
                pb.inc(1);
                continue;
            }
            let mut token_ids = Vec::with_capacity(tokens.len());
            for token in &tokens {
                let id = lexicon.get(token).ok_or_else(|| {
                    IndexError::Corrupt(format!(
                        "token {:?} of paper {} missing from lexicon",
                        token, entry.paper_id
                    ))
                })?;
                token_ids.push(id);
            }
            let doc_id = writer.append(&token_ids)?;
            doc_table.append(doc_id, &entry.paper_id)?;
            pb.inc(1);
        }
        doc_table.finish()?;
        Ok(writer.finish()?)
    })()
    .map_err(|e| e.at("S3 forward build"))?;
    pb.finish_with_message(format!("{} documents", documents));

    // S4: document frequencies, assignment, positional barrels.
    let mapping_path = tmp(output, MAPPING_FILE);
    let barrels_dir = tmp(output, BARRELS_DIR);
    let map = (|| -> Result<BarrelMap, IndexError> {
        let pb = stage_bar(&multi, "Barrels", u64::from(documents) * 2);
        let reader = ForwardReader::open(&forward_path)?;
        let df = barrels::document_frequencies(
            reader.inspect(|_| pb.inc(1)),
            lexicon.len(),
        )?;
        let map = BarrelMap::assign(&df, documents, cfg);
        map.save(&mapping_path)?;

        let reader = ForwardReader::open(&forward_path)?;
        barrels::write_barrels(reader.inspect(|_| pb.inc(1)), &map, &barrels_dir)?;
        pb.finish_with_message(format!("{} + freq", map.num_barrels()));
        Ok(map)
    })()
    .map_err(|e| e.at("S4 barrel build"))?;

    // S5: postings aggregation.
    let postings_path = tmp(output, POSTINGS_FILE);
    let offsets_path = tmp(output, OFFSETS_FILE);
    let stats = aggregate(
        &barrels::barrel_paths(&barrels_dir, map.num_barrels()),
        lexicon.len(),
        cfg.spill_threshold,
        &output.join(SPILL_DIR),
        &postings_path,
        &offsets_path,
    )
    .map_err(|e| e.at("S5 postings aggregation"))?;

    // S6: heavy-token extraction.
    let heavy_dir = tmp(output, HEAVY_DIR);
    let heavy_tokens = (|| -> Result<usize, IndexError> {
        let mut postings = PostingsReader::open(&postings_path, &offsets_path)?;
        extract_heavy_tokens(&mut postings, &map, &heavy_dir)
    })()
    .map_err(|e| e.at("S6 heavy extraction"))?;

    publish(output).map_err(|e| e.at("publication"))?;

    Ok(BuildSummary {
        documents,
        vocabulary: lexicon.len() as u32,
        postings_tokens: stats.token_count,
        postings_bytes: stats.postings_bytes,
        heavy_tokens,
        skipped_malformed: corpus.skipped_malformed(),
        skipped_empty,
    })
}

/// Rename the complete `.tmp` generation into place. The offsets directory
/// goes last so a reader holding the new offsets always finds the new
/// blocks.
fn publish(output: &Path) -> Result<(), IndexError> {
    let ordered = [
        LEXICON_FILE,
        FORWARD_FILE,
        DOC_IDS_FILE,
        MAPPING_FILE,
        BARRELS_DIR,
        POSTINGS_FILE,
        HEAVY_DIR,
        OFFSETS_FILE,
    ];
    for name in ordered {
        let from = tmp(output, name);
        let to = output.join(name);
        if to.is_dir() {
            fs::remove_dir_all(&to).map_err(IndexError::from)?;
        }
        fs::rename(&from, &to).map_err(IndexError::from)?;
    }
    Ok(())
}

/// Print the end-of-run summary for a finished build.
pub fn print_summary(summary: &BuildSummary) {
    eprintln!();
    eprintln!("✅ Index complete");
    eprintln!(
        "   {} documents │ {} terms │ {} postings blocks │ {} heavy tokens │ {}",
        summary.documents,
        summary.vocabulary,
        summary.postings_tokens,
        summary.heavy_tokens,
        format_bytes(summary.postings_bytes),
    );
    if summary.skipped_malformed > 0 || summary.skipped_empty > 0 {
        eprintln!(
            "   skipped: {} malformed, {} empty",
            summary.skipped_malformed, summary.skipped_empty
        );
    }
}

pub fn format_bytes(bytes: u64) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / 1024.0 / 1024.0)
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_removes_only_tmp_entries() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("lexicon.bin"), b"keep").unwrap();
        fs::write(dir.path().join("lexicon.bin.tmp"), b"drop").unwrap();
        fs::create_dir(dir.path().join("barrels.tmp")).unwrap();
        fs::write(dir.path().join("barrels.tmp/barrel_00.bin"), b"drop").unwrap();
        fs::create_dir(dir.path().join("spill.tmp")).unwrap();

        sweep_temp(dir.path()).unwrap();

        assert!(dir.path().join("lexicon.bin").exists());
        assert!(!dir.path().join("lexicon.bin.tmp").exists());
        assert!(!dir.path().join("barrels.tmp").exists());
        assert!(!dir.path().join("spill.tmp").exists());
    }

    #[test]
    fn sweep_of_missing_output_dir_is_a_no_op() {
        assert!(sweep_temp(Path::new("/nonexistent/out")).is_ok());
    }

    #[test]
    fn format_bytes_picks_unit() {
        assert_eq!(format_bytes(12), "12 B");
        assert_eq!(format_bytes(4 * 1024), "4.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
