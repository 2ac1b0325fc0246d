//! Offline indexing core for a research-paper search engine.
//!
//! Given a directory of CORD-19-style JSON documents, the pipeline produces
//! a closed set of binary artifacts that enable constant-time retrieval of
//! positional postings for any term in the vocabulary.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌───────────┐   ┌──────────┐
//! │ corpus + │──▶│ lexicon  │──▶│  forward  │──▶│ barrels  │
//! │ tokenize │   │ (S2)     │   │  (S3)     │   │ (S4)     │
//! └──────────┘   └──────────┘   └───────────┘   └──────────┘
//!                                                     │
//!                ┌──────────┐   ┌───────────┐         │
//!                │  heavy   │◀──│ postings  │◀────────┘
//!                │  (S6)    │   │ (S5)      │
//!                └──────────┘   └───────────┘
//! ```
//!
//! Each stage reads only the previous stage's published files and streams
//! them; no stage holds the corpus in memory. The driver in [`pipeline`]
//! writes every artifact under a temporary name and renames the complete
//! generation into place, so consumers never observe a partial index.
//!
//! # Artifacts
//!
//! | File | Contents |
//! |------|----------|
//! | `lexicon.bin` | token string ↔ dense token id |
//! | `forward_index.bin` | per-document token-id streams |
//! | `doc_ids.tsv` | doc_id → paper_id |
//! | `barrel_mapping.bin` | token id → barrel id |
//! | `barrels/` | positional records bucketed by document frequency |
//! | `postings_index.bin` | one contiguous postings block per token |
//! | `postings_offsets.bin` | token id → (offset, length) directory |
//! | `heavy/` | positionless fast-path files for frequent tokens |
//!
//! # Usage
//!
//! ```ignore
//! use cordex::{build_index, IndexConfig, Tokenizer};
//!
//! let cfg = IndexConfig::default();
//! let tokenizer = Tokenizer::new(cfg.min_token_len);
//! let summary = build_index("corpus".as_ref(), "index".as_ref(), &cfg, &tokenizer)?;
//! ```

// Module declarations
pub mod barrels;
pub mod codec;
pub mod config;
pub mod corpus;
pub mod error;
pub mod forward;
pub mod heavy;
pub mod lexicon;
pub mod pipeline;
pub mod postings;
pub mod tokenize;

// Re-exports for public API
pub use barrels::{BarrelMap, BarrelReader, PostingRecord};
pub use config::IndexConfig;
pub use corpus::{Corpus, CorpusEntry, SourceDoc};
pub use error::IndexError;
pub use forward::{ForwardDoc, ForwardReader};
pub use heavy::{HeavyEntry, HeavyManifest};
pub use lexicon::Lexicon;
pub use pipeline::{build_index, BuildSummary};
pub use postings::{OffsetEntry, OffsetTable, Posting, PostingsReader};
pub use tokenize::{normalize, Tokenizer};
