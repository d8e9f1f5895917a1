use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::model::chapter::Chapter;
use crate::model::column::Column;
use crate::model::ids::{ChapterId, ColumnId, SubjectId};
use crate::model::lenient;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    pub name: String,
    #[serde(default, deserialize_with = "lenient::order")]
    pub order: usize,
    pub columns: Vec<Column>,
    pub chapters: Vec<Chapter>,
}

impl Subject {
    #[must_use]
    pub fn column(&self, id: &ColumnId) -> Option<&Column> {
        self.columns.iter().find(|c| &c.id == id)
    }

    #[must_use]
    pub fn chapter(&self, id: &ChapterId) -> Option<&Chapter> {
        self.chapters.iter().find(|c| &c.id == id)
    }

    #[must_use]
    pub fn column_ids(&self) -> BTreeSet<&ColumnId> {
        self.columns.iter().map(|c| &c.id).collect()
    }

    /// True when every chapter holds exactly one checkball per column of this subject.
    #[must_use]
    pub fn checkballs_aligned(&self) -> bool {
        let columns = self.column_ids();
        self.chapters.iter().all(|chapter| {
            let refs: Vec<&ColumnId> = chapter.checkballs.iter().map(|cb| &cb.column_id).collect();
            let unique: BTreeSet<&ColumnId> = refs.iter().copied().collect();
            refs.len() == unique.len() && unique == columns
        })
    }

    /// Number of checkballs pointing at a column this subject does not have.
    #[must_use]
    pub fn dangling_checkballs(&self) -> usize {
        let columns = self.column_ids();
        self.chapters
            .iter()
            .flat_map(|chapter| chapter.checkballs.iter())
            .filter(|cb| !columns.contains(&cb.column_id))
            .count()
    }
}
