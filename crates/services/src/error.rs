//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use study_core::ImportError;

/// Errors from reading or writing the persisted snapshot.
///
/// `PersistenceGateway::load` and `save` swallow these after logging; the
/// `try_*` variants return them for callers that want to know.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PersistenceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("stored state is not valid JSON: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("state could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("stored state has no `subjects` array")]
    MissingSubjects,
    #[error("stored schema version {found:?} does not match {expected}")]
    VersionMismatch {
        found: Option<String>,
        expected: &'static str,
    },
    #[error("no stored state")]
    Missing,
}

/// Errors emitted by JSON export / import file flows.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExportError {
    #[error("state could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Import(#[from] ImportError),
}

/// Errors emitted while producing a progress report.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReportError {
    #[error("unknown report style: {0} (expected plain or styled)")]
    UnknownStyle(String),
    #[error("unknown report format: {0} (expected text or html)")]
    UnknownFormat(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
