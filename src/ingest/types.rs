use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Result of one ingestion attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IngestOutcome {
    /// Rows committed, source file deleted
    Ingested { rows: usize },
    /// Load failed; file moved to the quarantine area
    Quarantined { destination: PathBuf, reason: String },
    /// Load failed and the quarantine move failed too; file left in place
    QuarantineFailed { reason: String },
    /// Store append failed; file left in place for the next pass
    Deferred { reason: String },
}

/// Totals for one discover-and-ingest pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassSummary {
    pub discovered: usize,
    pub ingested: usize,
    pub quarantined: usize,
    pub deferred: usize,
    pub rows_appended: usize,
}

impl PassSummary {
    pub fn record(&mut self, outcome: &IngestOutcome) {
        match outcome {
            IngestOutcome::Ingested { rows } => {
                self.ingested += 1;
                self.rows_appended += rows;
            }
            IngestOutcome::Quarantined { .. } => self.quarantined += 1,
            // Still in the source directory either way.
            IngestOutcome::QuarantineFailed { .. } | IngestOutcome::Deferred { .. } => self.deferred += 1,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Source directory not found: {0}")]
    SourceDirMissing(PathBuf),
    #[error("Invalid discovery pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
