use thiserror::Error;

use crate::import::ImportError;
use crate::model::{LevelError, ParseColumnKindError};

/// Umbrella error for callers that do not care which core check failed.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Level(#[from] LevelError),
    #[error(transparent)]
    ColumnKind(#[from] ParseColumnKindError),
    #[error(transparent)]
    Import(#[from] ImportError),
}
