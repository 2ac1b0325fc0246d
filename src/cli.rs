// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! CLI definitions for the cordex command-line interface.
//!
//! Two subcommands: `index` runs the full pipeline over a corpus directory
//! and publishes the artifact set, `inspect` prints statistics for a
//! published index by reading the artifacts back through the library's own
//! readers.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "cordex",
    about = "Offline index builder for a research-paper search engine",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the full artifact set from a directory of JSON documents
    Index {
        /// Input directory containing CORD-19-style JSON files
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory for the published artifacts
        #[arg(short, long)]
        output: PathBuf,

        /// Number of regular barrels; the frequent barrel comes on top
        #[arg(long, default_value = "16")]
        num_barrels: u32,

        /// Fraction of the document count above which a token is routed to
        /// the frequent barrel
        #[arg(long, default_value = "0.05")]
        freq_barrel_threshold: f64,

        /// Exponent of the rank-to-barrel map
        #[arg(long, default_value = "0.6")]
        barrel_exponent: f64,

        /// Per-token in-memory posting budget before spilling to disk
        #[arg(long, default_value = "1024")]
        spill_threshold: usize,

        /// Minimum token length after normalization
        #[arg(long, default_value = "2")]
        min_token_len: usize,

        /// Shard count of the older external-sort build; accepted for
        /// compatibility and ignored by the barrel pipeline
        #[arg(long)]
        bucket_count: Option<usize>,

        /// Stop-word file (one word per line, '#' comments); defaults to
        /// the embedded English list
        #[arg(long)]
        stop_words: Option<PathBuf>,
    },

    /// Print statistics for a published index directory
    Inspect {
        /// Directory holding the published artifacts
        dir: PathBuf,
    },
}
