#![forbid(unsafe_code)]

pub mod defaults;
pub mod error;
pub mod import;
pub mod model;
pub mod progress;
pub mod reducer;
pub mod time;

pub use error::Error;
pub use import::{ImportError, ImportRejection, ValidatedImport};
pub use progress::{ProgressStats, SubjectProgress};
pub use reducer::{Action, reduce};
pub use time::Clock;
