// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Unified error type for the indexing pipeline.
//!
//! Every fatal condition maps onto one of the pipeline exit codes:
//! 2 = invalid configuration, 3 = input not found, 4 = artifact corruption,
//! 5 = I/O failure. Per-document problems (malformed JSON, empty token
//! stream) are not errors; the corpus iterator reports them as skips and the
//! stage continues.

use std::path::PathBuf;

use thiserror::Error;

/// All fatal errors the pipeline recognizes.
#[derive(Error, Debug)]
pub enum IndexError {
    /// Configuration value out of range, rejected before any write
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Input corpus directory absent or not a directory
    #[error("input not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// Artifact corruption: vocabulary miss, duplicate doc_id, unsorted
    /// positions, malformed bytes in a previously written artifact
    #[error("corrupt artifact: {0}")]
    Corrupt(String),

    /// I/O error (file read/write, directory access, short write)
    #[error("I/O error: {0}")]
    Io(std::io::Error),

    /// JSON serialization error (heavy manifest)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Wrapper naming the stage an error surfaced in, so the user-visible
    /// failure line reads "S5 postings aggregation: duplicate doc_id ..."
    #[error("{stage}: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: Box<IndexError>,
    },
}

/// Artifact codecs speak `io::Result`; `InvalidData` and `UnexpectedEof`
/// from them mean a malformed or truncated artifact, which is corruption
/// (exit 4), not an I/O failure (exit 5).
impl From<std::io::Error> for IndexError {
    fn from(e: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match e.kind() {
            ErrorKind::InvalidData | ErrorKind::UnexpectedEof => {
                IndexError::Corrupt(e.to_string())
            }
            _ => IndexError::Io(e),
        }
    }
}

impl IndexError {
    /// Attach a stage name. Already-wrapped errors keep their original stage.
    pub fn at(self, stage: &'static str) -> IndexError {
        match self {
            IndexError::Stage { .. } => self,
            other => IndexError::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Process exit code for this error (0 is success, reserved for Ok).
    pub fn exit_code(&self) -> i32 {
        match self {
            IndexError::Config(_) => 2,
            IndexError::InputNotFound(_) => 3,
            IndexError::Corrupt(_) => 4,
            IndexError::Io(_) | IndexError::Json(_) => 5,
            IndexError::Stage { source, .. } => source.exit_code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_match_the_pipeline_contract() {
        assert_eq!(IndexError::Config("x".into()).exit_code(), 2);
        assert_eq!(IndexError::InputNotFound("/x".into()).exit_code(), 3);
        assert_eq!(IndexError::Corrupt("x".into()).exit_code(), 4);
        let io = IndexError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(io.exit_code(), 5);
    }

    #[test]
    fn stage_wrapper_keeps_inner_exit_code() {
        let err = IndexError::Corrupt("duplicate doc_id 7 for token 3".into())
            .at("S5 postings aggregation");
        assert_eq!(err.exit_code(), 4);
        let msg = err.to_string();
        assert!(msg.contains("S5 postings aggregation"));
        assert!(msg.contains("duplicate doc_id 7"));
    }

    #[test]
    fn stage_wrapper_does_not_nest() {
        let err = IndexError::Corrupt("x".into())
            .at("S4 barrel build")
            .at("pipeline");
        assert!(err.to_string().starts_with("S4 barrel build"));
    }

    #[test]
    fn io_error_from_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: IndexError = io_err.into();
        assert!(matches!(err, IndexError::Io(_)));
        assert!(err.to_string().contains("access denied"));
    }

    #[test]
    fn malformed_artifact_bytes_classify_as_corruption() {
        let truncated = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "truncated");
        let err: IndexError = truncated.into();
        assert_eq!(err.exit_code(), 4);

        let invalid = std::io::Error::new(std::io::ErrorKind::InvalidData, "bad bytes");
        let err: IndexError = invalid.into();
        assert_eq!(err.exit_code(), 4);
    }
}
