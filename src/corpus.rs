// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Corpus reader: CORD-19-style JSON documents from a directory tree.
//!
//! The reader walks the input directory in lexicographic path order, picks
//! one file per paper (PMC variant over PDF-derived when both exist), and
//! then streams full documents on demand. The selection runs exactly once
//! per pipeline execution: the lexicon and forward-index stages iterate the
//! same entry list, which is what makes their two passes agree.
//!
//! Malformed files (undecodable JSON, missing `paper_id`) are skipped with
//! a warning; a missing corpus root is fatal before any write.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use walkdir::WalkDir;

use crate::error::IndexError;

/// One text section of a source document (abstract paragraph, body section).
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Section {
    #[serde(default)]
    pub text: String,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct Metadata {
    #[serde(default)]
    pub title: String,
}

/// A fully parsed source document.
#[derive(Deserialize, Clone, Debug)]
pub struct SourceDoc {
    pub paper_id: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default, rename = "abstract")]
    pub abstract_sections: Vec<Section>,
    #[serde(default)]
    pub body_text: Vec<Section>,
}

impl SourceDoc {
    /// Searchable text: title, abstract texts, body texts, space-delimited.
    pub fn text(&self) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(
            1 + self.abstract_sections.len() + self.body_text.len(),
        );
        parts.push(&self.metadata.title);
        for s in &self.abstract_sections {
            parts.push(&s.text);
        }
        for s in &self.body_text {
            parts.push(&s.text);
        }
        parts.join(" ")
    }
}

/// Pre-parse target: just enough to identify the paper.
#[derive(Deserialize)]
struct PaperIdOnly {
    paper_id: Option<String>,
}

/// Source variant of a file, inferred from its path.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Variant {
    Pmc,
    Pdf,
}

fn classify(path: &Path) -> Variant {
    let in_pmc_dir = path
        .components()
        .any(|c| c.as_os_str() == "pmc_json");
    let xml_json = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(".xml.json"));
    if in_pmc_dir || xml_json {
        Variant::Pmc
    } else {
        Variant::Pdf
    }
}

/// One selected document: the winning file for a paper.
#[derive(Clone, Debug)]
pub struct CorpusEntry {
    pub path: PathBuf,
    pub paper_id: String,
}

/// The selected corpus: one entry per paper, in path order of the winning
/// file. Both indexing passes stream this list.
#[derive(Debug)]
pub struct Corpus {
    entries: Vec<CorpusEntry>,
    skipped_malformed: usize,
}

impl Corpus {
    /// Walk `root`, pre-parse every `*.json` file, and resolve variant
    /// conflicts. Deterministic for a fixed tree: traversal is sorted by
    /// file name at every level.
    pub fn scan(root: &Path) -> Result<Corpus, IndexError> {
        if !root.is_dir() {
            return Err(IndexError::InputNotFound(root.to_path_buf()));
        }

        let mut candidates: Vec<(PathBuf, String, Variant)> = Vec::new();
        let mut skipped = 0usize;

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    eprintln!("warning: skipping unreadable entry: {}", e);
                    skipped += 1;
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }

            let raw = match fs::read_to_string(path) {
                Ok(raw) => raw,
                Err(e) => {
                    eprintln!("warning: skipping {}: {}", path.display(), e);
                    skipped += 1;
                    continue;
                }
            };
            let paper_id = match serde_json::from_str::<PaperIdOnly>(&raw) {
                Ok(PaperIdOnly {
                    paper_id: Some(id),
                }) if !id.is_empty() => id,
                Ok(_) => {
                    eprintln!("warning: skipping {}: missing paper_id", path.display());
                    skipped += 1;
                    continue;
                }
                Err(e) => {
                    eprintln!("warning: skipping {}: {}", path.display(), e);
                    skipped += 1;
                    continue;
                }
            };

            candidates.push((path.to_path_buf(), paper_id, classify(path)));
        }

        // Resolve duplicates: PMC beats PDF; among equal variants the first
        // path in traversal order wins.
        let mut best: HashMap<&str, (usize, Variant)> = HashMap::new();
        for (idx, (_, paper_id, variant)) in candidates.iter().enumerate() {
            match best.get(paper_id.as_str()) {
                Some(&(_, held)) if held == Variant::Pmc || *variant == Variant::Pdf => {}
                _ => {
                    best.insert(paper_id.as_str(), (idx, *variant));
                }
            }
        }

        let mut winners: Vec<usize> = best.values().map(|&(idx, _)| idx).collect();
        winners.sort_unstable();

        let entries = winners
            .into_iter()
            .map(|idx| {
                let (path, paper_id, _) = candidates[idx].clone();
                CorpusEntry { path, paper_id }
            })
            .collect();

        Ok(Corpus {
            entries,
            skipped_malformed: skipped,
        })
    }

    pub fn entries(&self) -> &[CorpusEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Files skipped during scan (unreadable or malformed).
    pub fn skipped_malformed(&self) -> usize {
        self.skipped_malformed
    }

    /// Full-parse one selected entry. Callers treat an error as a
    /// per-document skip; both passes see the same file and the same parser,
    /// so skips agree between them.
    pub fn load(entry: &CorpusEntry) -> Result<SourceDoc, IndexError> {
        let raw = fs::read_to_string(&entry.path)?;
        Ok(serde_json::from_str::<SourceDoc>(&raw)?)
    }
}
