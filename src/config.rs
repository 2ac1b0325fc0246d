// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Pipeline configuration.
//!
//! All knobs the pipeline recognizes, with their defaults. Values are
//! validated once at startup; a bad value is a hard failure (exit code 2)
//! before anything touches the output directory.

use crate::error::IndexError;

/// Configuration for a single pipeline execution.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Number of regular barrels B; the special frequent barrel is id B
    pub num_barrels: u32,
    /// Fraction of the document count above which a token is routed to the
    /// frequent barrel (strict comparison: df > threshold * D)
    pub freq_barrel_threshold: f64,
    /// Exponent in the rank-to-barrel map; < 1 spreads rare tokens across
    /// the early barrels to even out per-barrel byte sizes
    pub barrel_exponent: f64,
    /// Per-token in-memory posting budget before spilling to a temp file
    pub spill_threshold: usize,
    /// Minimum token length after normalization; shorter tokens are dropped
    pub min_token_len: usize,
    /// Shard count of the older external-sort inverted build. Recognized for
    /// compatibility; the barrel pipeline ignores it.
    pub bucket_count: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            num_barrels: 16,
            freq_barrel_threshold: 0.05,
            barrel_exponent: 0.6,
            spill_threshold: 1024,
            min_token_len: 2,
            bucket_count: 128,
        }
    }
}

impl IndexConfig {
    /// Validate all values. Called by the driver before any write.
    pub fn validate(&self) -> Result<(), IndexError> {
        if self.num_barrels < 1 {
            return Err(IndexError::Config(format!(
                "num_barrels must be >= 1, got {}",
                self.num_barrels
            )));
        }
        if !(self.freq_barrel_threshold > 0.0 && self.freq_barrel_threshold <= 1.0) {
            return Err(IndexError::Config(format!(
                "freq_barrel_threshold must be in (0, 1], got {}",
                self.freq_barrel_threshold
            )));
        }
        if !(self.barrel_exponent > 0.0 && self.barrel_exponent.is_finite()) {
            return Err(IndexError::Config(format!(
                "barrel_exponent must be a positive finite number, got {}",
                self.barrel_exponent
            )));
        }
        if self.spill_threshold < 1 {
            return Err(IndexError::Config(
                "spill_threshold must be >= 1".to_string(),
            ));
        }
        if self.min_token_len < 1 {
            return Err(IndexError::Config(
                "min_token_len must be >= 1".to_string(),
            ));
        }
        if self.bucket_count < 1 {
            return Err(IndexError::Config(
                "bucket_count must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}
