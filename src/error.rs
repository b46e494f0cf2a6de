use thiserror::Error;

/// Errors surfaced by the analysis core.
///
/// Alias conflicts and invalid projection paths are *data* outcomes, not
/// errors: conflicts are logged and the offending rename is rejected,
/// projections carry a validity flag the caller must check.
#[derive(Debug, Error)]
pub enum LineageError {
    /// The requested traversal start commit is absent from the commit graph.
    #[error("commit {0} is not contained in the commit graph")]
    UnknownStartNode(String),

    /// Unsupported traversal direction string.
    #[error("no such direction: {0}, please use \"backward\" or \"forward\"")]
    InvalidDirection(String),

    /// A referenced record is missing from the project store. The metric
    /// output depends on complete provenance, so this is fatal rather than
    /// a silent skip.
    #[error("{kind} {id} not found in project store")]
    NotFound { kind: &'static str, id: String },

    /// Configuration file could not be read, parsed, or validated.
    #[error("{0}")]
    Config(String),

    /// Report serialization or output failed.
    #[error("report export failed: {0}")]
    Export(String),
}

impl LineageError {
    pub(crate) fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        LineageError::NotFound { kind, id: id.into() }
    }
}

pub type Result<T> = std::result::Result<T, LineageError>;
