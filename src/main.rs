// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Cordex CLI: build and inspect research-paper search indexes.
//!
//! ```bash
//! # Build the artifact set from a corpus of JSON documents
//! cordex index --input ./corpus --output ./index
//!
//! # Inspect a published index
//! cordex inspect ./index
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use cordex::barrels::{barrel_file_name, BarrelMap};
use cordex::codec::read_u32;
use cordex::config::IndexConfig;
use cordex::error::IndexError;
use cordex::heavy::HeavyManifest;
use cordex::lexicon::Lexicon;
use cordex::pipeline::{
    build_index, format_bytes, print_summary, BARRELS_DIR, FORWARD_FILE, HEAVY_DIR, LEXICON_FILE,
    MAPPING_FILE, OFFSETS_FILE,
};
use cordex::postings::OffsetTable;
use cordex::tokenize::Tokenizer;

mod cli;
use cli::{Cli, Commands};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Index {
            input,
            output,
            num_barrels,
            freq_barrel_threshold,
            barrel_exponent,
            spill_threshold,
            min_token_len,
            bucket_count,
            stop_words,
        } => run_index(
            &input,
            &output,
            IndexConfig {
                num_barrels,
                freq_barrel_threshold,
                barrel_exponent,
                spill_threshold,
                min_token_len,
                bucket_count: bucket_count.unwrap_or(IndexConfig::default().bucket_count),
            },
            bucket_count.is_some(),
            stop_words,
        ),
        Commands::Inspect { dir } => inspect_index(&dir),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ {}", e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn run_index(
    input: &Path,
    output: &Path,
    cfg: IndexConfig,
    bucket_count_set: bool,
    stop_words: Option<PathBuf>,
) -> Result<(), IndexError> {
    cfg.validate()?;
    if bucket_count_set {
        eprintln!("warning: --bucket-count is ignored by the barrel pipeline");
    }

    let tokenizer = match stop_words {
        Some(path) => {
            Tokenizer::from_stop_word_file(&path, cfg.min_token_len).map_err(IndexError::from)?
        }
        None => Tokenizer::new(cfg.min_token_len),
    };

    let summary = build_index(input, output, &cfg, &tokenizer)?;
    print_summary(&summary);
    Ok(())
}

/// Read a published index back through the library readers and print what
/// is in it.
fn inspect_index(dir: &Path) -> Result<(), IndexError> {
    if !dir.is_dir() {
        return Err(IndexError::InputNotFound(dir.to_path_buf()));
    }

    let lexicon = Lexicon::load(&dir.join(LEXICON_FILE))?;
    let doc_count = {
        let mut r = BufReader::new(File::open(dir.join(FORWARD_FILE)).map_err(IndexError::from)?);
        read_u32(&mut r)?
    };
    let map = BarrelMap::load(&dir.join(MAPPING_FILE))?;
    let offsets = OffsetTable::load(&dir.join(OFFSETS_FILE))?;
    let manifest = HeavyManifest::load(&dir.join(HEAVY_DIR).join("manifest.json"))?;

    println!("index at {}", dir.display());
    println!("  documents        {}", doc_count);
    println!("  vocabulary       {}", lexicon.len());
    println!(
        "  postings blocks  {} ({})",
        offsets.len(),
        format_bytes(offsets.entries().last().map_or(0, |e| e.offset + e.length))
    );
    println!("  heavy tokens     {}", manifest.tokens.len());

    println!("  barrels          {} regular + freq", map.num_barrels());
    for barrel_id in 0..=map.num_barrels() {
        let tokens = (0..map.len() as u32)
            .filter(|&t| map.barrel_of(t) == Some(barrel_id))
            .count();
        let name = barrel_file_name(barrel_id, map.num_barrels());
        let bytes = std::fs::metadata(dir.join(BARRELS_DIR).join(&name))
            .map(|m| m.len())
            .unwrap_or(0);
        println!(
            "    {:<16} {:>8} tokens  {:>10}",
            name,
            tokens,
            format_bytes(bytes)
        );
    }

    Ok(())
}
