//! Shared test utilities and fixtures.

#![allow(dead_code)]

use std::path::Path;

use cordex::pipeline::BuildSummary;
use cordex::{build_index, IndexConfig, Tokenizer};

/// Write one CORD-19-style JSON document under `root`.
pub fn write_paper(
    root: &Path,
    rel: &str,
    paper_id: &str,
    title: &str,
    abstracts: &[&str],
    bodies: &[&str],
) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let doc = serde_json::json!({
        "paper_id": paper_id,
        "metadata": { "title": title },
        "abstract": abstracts
            .iter()
            .map(|t| serde_json::json!({ "text": t }))
            .collect::<Vec<_>>(),
        "body_text": bodies
            .iter()
            .map(|t| serde_json::json!({ "text": t }))
            .collect::<Vec<_>>(),
    });
    std::fs::write(path, serde_json::to_string_pretty(&doc).unwrap()).unwrap();
}

/// Document with no title or abstract: its token stream is exactly the
/// tokenization of `text`.
pub fn write_simple(root: &Path, rel: &str, paper_id: &str, text: &str) {
    write_paper(root, rel, paper_id, "", &[], &[text]);
}

/// Run the pipeline with an explicit stop-word set.
pub fn build(
    corpus: &Path,
    output: &Path,
    cfg: &IndexConfig,
    stop_words: &[&str],
) -> BuildSummary {
    let tokenizer = Tokenizer::with_stop_words(stop_words.iter().copied(), cfg.min_token_len);
    build_index(corpus, output, cfg, &tokenizer).unwrap()
}

/// Run the pipeline with no stop words and default configuration.
pub fn build_default(corpus: &Path, output: &Path) -> BuildSummary {
    build(corpus, output, &IndexConfig::default(), &[])
}
