use serde::{Deserialize, Serialize};

use crate::model::ids::{ChapterId, ColumnId};
use crate::model::lenient;
use crate::model::level::Level;

/// One cell of the subject × chapter × column grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckballState {
    #[serde(default = "lenient::missing_column", deserialize_with = "lenient::column_id")]
    pub column_id: ColumnId,
    pub level: Level,
}

impl CheckballState {
    #[must_use]
    pub fn empty(column_id: ColumnId) -> Self {
        Self {
            column_id,
            level: Level::EMPTY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: ChapterId,
    pub name: String,
    #[serde(default, deserialize_with = "lenient::order")]
    pub order: usize,
    pub checkballs: Vec<CheckballState>,
}

impl Chapter {
    /// Creates a chapter with one empty checkball per given column.
    #[must_use]
    pub fn seeded<'a>(
        id: ChapterId,
        name: impl Into<String>,
        order: usize,
        columns: impl IntoIterator<Item = &'a ColumnId>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            order,
            checkballs: columns
                .into_iter()
                .map(|col| CheckballState::empty(col.clone()))
                .collect(),
        }
    }

    #[must_use]
    pub fn checkball(&self, column_id: &ColumnId) -> Option<&CheckballState> {
        self.checkballs.iter().find(|cb| &cb.column_id == column_id)
    }

    /// Level for a column, treating a missing checkball as empty.
    #[must_use]
    pub fn level_for(&self, column_id: &ColumnId) -> Level {
        self.checkball(column_id).map_or(Level::EMPTY, |cb| cb.level)
    }

    /// A chapter is complete when it has at least one checkball and all are full.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.checkballs.is_empty() && self.checkballs.iter().all(|cb| cb.level.is_full())
    }

    #[must_use]
    pub fn level_sum(&self) -> u64 {
        self.checkballs
            .iter()
            .map(|cb| u64::from(cb.level.value()))
            .sum()
    }
}
