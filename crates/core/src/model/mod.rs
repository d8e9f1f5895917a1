mod app_state;
mod chapter;
mod column;
mod ids;
mod lenient;
mod level;
mod subject;

pub use app_state::{AppState, SCHEMA_VERSION, Theme, iso_timestamp};
pub use chapter::{Chapter, CheckballState};
pub use column::{
    AVAILABLE_COLUMNS, Column, ColumnKind, ColumnPreset, DEFAULT_COLUMNS, ParseColumnKindError,
};
pub use ids::{ChapterId, ColumnId, SubjectId};
pub use level::{Level, LevelError};
pub use subject::Subject;
