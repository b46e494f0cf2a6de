//! Extract software-evolution features for a chosen release of a
//! version-controlled project.
//!
//! For every file shipped in the release, the crate reconstructs the file's
//! identity across renames and copies back to its origin, accumulates change
//! metrics over a bounded history window, and attributes post-release
//! defects to release files via bug-inducing-commit analysis. The output
//! feeds defect-prediction and software-quality datasets.
//!
//! The commit graph, the mined commit/file/issue records, and all
//! persistence are external collaborators: callers load records into a
//! [`store::ProjectStore`], build a [`graph::CommitGraph`], and open a
//! [`session::ReleaseSession`] per target release.

pub mod analyzers;
pub mod config;
pub mod error;
pub mod export;
pub mod filters;
pub mod graph;
pub mod session;
pub mod store;
pub mod types;

pub use config::AnalysisConfig;
pub use error::{LineageError, Result};
pub use session::ReleaseSession;
