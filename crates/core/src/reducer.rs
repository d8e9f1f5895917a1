//! Pure state transitions over the progress tree.
//!
//! Actions carry every freshly minted id they need, so `reduce` itself is
//! deterministic: the same state and action always produce the same tree.

use std::sync::Arc;

use crate::defaults::default_columns;
use crate::import::ValidatedImport;
use crate::model::{
    AppState, Chapter, ChapterId, CheckballState, Column, ColumnId, ColumnKind, Level, Subject,
    SubjectId,
};
use crate::time::Clock;

//
// ─── ACTIONS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Action {
    AddSubject {
        subject_id: SubjectId,
        name: String,
        columns: Vec<Column>,
    },
    RemoveSubject {
        subject_id: SubjectId,
    },
    AddColumn {
        subject_id: SubjectId,
        column_id: ColumnId,
        name: String,
        kind: ColumnKind,
    },
    RemoveColumn {
        subject_id: SubjectId,
        column_id: ColumnId,
    },
    UpdateColumnName {
        subject_id: SubjectId,
        column_id: ColumnId,
        name: String,
    },
    AddChapter {
        subject_id: SubjectId,
        chapter_id: ChapterId,
        name: String,
    },
    RemoveChapter {
        subject_id: SubjectId,
        chapter_id: ChapterId,
    },
    UpdateChapterName {
        subject_id: SubjectId,
        chapter_id: ChapterId,
        name: String,
    },
    UpdateCheckball {
        subject_id: SubjectId,
        chapter_id: ChapterId,
        column_id: ColumnId,
        level: Level,
    },
    ToggleTheme,
    ImportData(Box<ValidatedImport>),
    ResetData(Box<AppState>),
}

impl Action {
    /// New subject seeded with the default column pair.
    #[must_use]
    pub fn add_subject(name: impl Into<String>) -> Self {
        Action::AddSubject {
            subject_id: SubjectId::generate(),
            name: name.into(),
            columns: default_columns(),
        }
    }

    /// New column; `kind` defaults to `Custom`.
    #[must_use]
    pub fn add_column(
        subject_id: SubjectId,
        name: impl Into<String>,
        kind: Option<ColumnKind>,
    ) -> Self {
        Action::AddColumn {
            subject_id,
            column_id: ColumnId::generate(),
            name: name.into(),
            kind: kind.unwrap_or_default(),
        }
    }

    #[must_use]
    pub fn add_chapter(subject_id: SubjectId, name: impl Into<String>) -> Self {
        Action::AddChapter {
            subject_id,
            chapter_id: ChapterId::generate(),
            name: name.into(),
        }
    }

    /// Replace the whole tree with the default catalog stamped by `clock`.
    #[must_use]
    pub fn reset(clock: &Clock) -> Self {
        Action::ResetData(Box::new(AppState::fresh(clock.now())))
    }

    #[must_use]
    pub fn import(data: ValidatedImport) -> Self {
        Action::ImportData(Box::new(data))
    }

    /// Short name for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Action::AddSubject { .. } => "add_subject",
            Action::RemoveSubject { .. } => "remove_subject",
            Action::AddColumn { .. } => "add_column",
            Action::RemoveColumn { .. } => "remove_column",
            Action::UpdateColumnName { .. } => "update_column_name",
            Action::AddChapter { .. } => "add_chapter",
            Action::RemoveChapter { .. } => "remove_chapter",
            Action::UpdateChapterName { .. } => "update_chapter_name",
            Action::UpdateCheckball { .. } => "update_checkball",
            Action::ToggleTheme => "toggle_theme",
            Action::ImportData(_) => "import_data",
            Action::ResetData(_) => "reset_data",
        }
    }
}

//
// ─── REDUCER ───────────────────────────────────────────────────────────────────
//

/// Applies `action` to `state`.
///
/// Returns the same `Arc` when nothing changed, including every reference
/// miss (unknown subject, chapter or column id). Callers detect changes with
/// `Arc::ptr_eq`.
#[must_use]
pub fn reduce(state: &Arc<AppState>, action: Action) -> Arc<AppState> {
    match action {
        Action::AddSubject {
            subject_id,
            name,
            columns,
        } => {
            let subject = Subject {
                id: subject_id,
                name,
                order: state.subjects.len(),
                columns: columns
                    .into_iter()
                    .enumerate()
                    .map(|(order, col)| Column { order, ..col })
                    .collect(),
                chapters: Vec::new(),
            };
            let mut next = AppState::clone(state);
            next.subjects.push(Arc::new(subject));
            Arc::new(next)
        }

        Action::RemoveSubject { subject_id } => {
            if state.subject(&subject_id).is_none() {
                return Arc::clone(state);
            }
            let mut next = AppState::clone(state);
            next.subjects.retain(|s| s.id != subject_id);
            for (order, subject) in next.subjects.iter_mut().enumerate() {
                if subject.order != order {
                    Arc::make_mut(subject).order = order;
                }
            }
            Arc::new(next)
        }

        Action::AddColumn {
            subject_id,
            column_id,
            name,
            kind,
        } => update_subject(state, &subject_id, |subject| {
            let order = subject.columns.len();
            subject
                .columns
                .push(Column::new(column_id.clone(), name, kind, order));
            for chapter in &mut subject.chapters {
                chapter
                    .checkballs
                    .push(CheckballState::empty(column_id.clone()));
            }
            true
        }),

        Action::RemoveColumn {
            subject_id,
            column_id,
        } => update_subject(state, &subject_id, |subject| {
            if subject.column(&column_id).is_none() {
                return false;
            }
            subject.columns.retain(|c| c.id != column_id);
            renumber(subject.columns.iter_mut().map(|c| &mut c.order));
            for chapter in &mut subject.chapters {
                chapter.checkballs.retain(|cb| cb.column_id != column_id);
            }
            true
        }),

        Action::UpdateColumnName {
            subject_id,
            column_id,
            name,
        } => update_subject(state, &subject_id, |subject| {
            match subject.columns.iter_mut().find(|c| c.id == column_id) {
                Some(column) if column.name != name => {
                    column.name = name;
                    true
                }
                _ => false,
            }
        }),

        Action::AddChapter {
            subject_id,
            chapter_id,
            name,
        } => update_subject(state, &subject_id, |subject| {
            let chapter = Chapter::seeded(
                chapter_id,
                name,
                subject.chapters.len(),
                subject.columns.iter().map(|c| &c.id),
            );
            subject.chapters.push(chapter);
            true
        }),

        Action::RemoveChapter {
            subject_id,
            chapter_id,
        } => update_subject(state, &subject_id, |subject| {
            if subject.chapter(&chapter_id).is_none() {
                return false;
            }
            subject.chapters.retain(|c| c.id != chapter_id);
            renumber(subject.chapters.iter_mut().map(|c| &mut c.order));
            true
        }),

        Action::UpdateChapterName {
            subject_id,
            chapter_id,
            name,
        } => update_subject(state, &subject_id, |subject| {
            match subject.chapters.iter_mut().find(|c| c.id == chapter_id) {
                Some(chapter) if chapter.name != name => {
                    chapter.name = name;
                    true
                }
                _ => false,
            }
        }),

        Action::UpdateCheckball {
            subject_id,
            chapter_id,
            column_id,
            level,
        } => update_subject(state, &subject_id, |subject| {
            let Some(chapter) = subject.chapters.iter_mut().find(|c| c.id == chapter_id) else {
                return false;
            };
            let mut changed = false;
            for cb in chapter
                .checkballs
                .iter_mut()
                .filter(|cb| cb.column_id == column_id && cb.level != level)
            {
                cb.level = level;
                changed = true;
            }
            changed
        }),

        Action::ToggleTheme => {
            let mut next = AppState::clone(state);
            next.theme = next.theme.toggled();
            Arc::new(next)
        }

        Action::ImportData(data) => Arc::new(data.into_state()),

        Action::ResetData(fresh) => Arc::new(*fresh),
    }
}

/// Runs `edit` against a private copy of the matching subject.
///
/// `edit` returns whether it changed anything; on `false` (or when the
/// subject is missing) the input state is returned untouched.
fn update_subject(
    state: &Arc<AppState>,
    subject_id: &SubjectId,
    edit: impl FnOnce(&mut Subject) -> bool,
) -> Arc<AppState> {
    let Some(idx) = state.subjects.iter().position(|s| &s.id == subject_id) else {
        return Arc::clone(state);
    };

    let mut subject = Subject::clone(&state.subjects[idx]);
    if !edit(&mut subject) {
        return Arc::clone(state);
    }

    let mut next = AppState::clone(state);
    next.subjects[idx] = Arc::new(subject);
    Arc::new(next)
}

fn renumber<'a>(orders: impl Iterator<Item = &'a mut usize>) {
    for (position, order) in orders.enumerate() {
        *order = position;
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Theme;
    use crate::time::{fixed_clock, fixed_now};

    fn empty_state() -> Arc<AppState> {
        Arc::new(AppState::empty(fixed_now()))
    }

    fn with_subject(name: &str) -> (Arc<AppState>, SubjectId) {
        let state = reduce(&empty_state(), Action::add_subject(name));
        let id = state.subjects[0].id.clone();
        (state, id)
    }

    fn level(value: u8) -> Level {
        Level::new(value).unwrap()
    }

    #[test]
    fn add_subject_seeds_default_columns() {
        let (state, _) = with_subject("Biology");
        let subject = &state.subjects[0];
        assert_eq!(subject.name, "Biology");
        assert_eq!(subject.order, 0);
        let names: Vec<&str> = subject.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["PYQs", "Notes"]);
        assert_eq!(subject.columns[0].kind, ColumnKind::Pyqs);
        assert_eq!(subject.columns[1].order, 1);
        assert!(subject.chapters.is_empty());
    }

    #[test]
    fn add_column_extends_every_chapter() {
        let (state, sid) = with_subject("Biology");
        let state = reduce(&state, Action::add_chapter(sid.clone(), "Cells"));
        let state = reduce(&state, Action::add_chapter(sid.clone(), "Genetics"));
        let state = reduce(&state, Action::add_column(sid.clone(), "Lectures", None));

        let subject = state.subject(&sid).unwrap();
        assert_eq!(subject.columns.len(), 3);
        assert_eq!(subject.columns[2].kind, ColumnKind::Custom);
        assert_eq!(subject.columns[2].order, 2);
        assert!(subject.checkballs_aligned());
        for chapter in &subject.chapters {
            assert_eq!(chapter.checkballs.len(), 3);
            assert_eq!(chapter.checkballs[2].level, Level::EMPTY);
        }
    }

    #[test]
    fn add_chapter_seeds_one_checkball_per_column() {
        let (state, sid) = with_subject("Biology");
        let state = reduce(&state, Action::add_chapter(sid.clone(), "Cells"));
        let subject = state.subject(&sid).unwrap();
        let chapter = &subject.chapters[0];
        assert_eq!(chapter.order, 0);
        assert_eq!(chapter.checkballs.len(), 2);
        assert!(subject.checkballs_aligned());
    }

    #[test]
    fn remove_column_drops_its_checkballs() {
        let (state, sid) = with_subject("Biology");
        let state = reduce(&state, Action::add_chapter(sid.clone(), "Cells"));
        let removed = state.subjects[0].columns[0].id.clone();
        let state = reduce(
            &state,
            Action::RemoveColumn {
                subject_id: sid.clone(),
                column_id: removed.clone(),
            },
        );

        let subject = state.subject(&sid).unwrap();
        assert_eq!(subject.columns.len(), 1);
        assert_eq!(subject.columns[0].order, 0);
        assert!(
            subject
                .chapters
                .iter()
                .all(|c| c.checkball(&removed).is_none())
        );
        assert!(subject.checkballs_aligned());
    }

    #[test]
    fn remove_renumbers_remaining_siblings() {
        let (state, _) = with_subject("A");
        let state = reduce(&state, Action::add_subject("B"));
        let state = reduce(&state, Action::add_subject("C"));
        let first = state.subjects[0].id.clone();
        let state = reduce(&state, Action::RemoveSubject { subject_id: first });
        let orders: Vec<usize> = state.subjects.iter().map(|s| s.order).collect();
        assert_eq!(orders, [0, 1]);
    }

    #[test]
    fn update_checkball_sets_level() {
        let (state, sid) = with_subject("Biology");
        let state = reduce(&state, Action::add_chapter(sid.clone(), "Cells"));
        let subject = &state.subjects[0];
        let chapter_id = subject.chapters[0].id.clone();
        let column_id = subject.columns[1].id.clone();

        let state = reduce(
            &state,
            Action::UpdateCheckball {
                subject_id: sid.clone(),
                chapter_id: chapter_id.clone(),
                column_id: column_id.clone(),
                level: level(7),
            },
        );
        let chapter = state.subject(&sid).unwrap().chapter(&chapter_id).unwrap();
        assert_eq!(chapter.level_for(&column_id), level(7));
    }

    #[test]
    fn update_checkball_hits_every_duplicate_column_entry() {
        let imported = crate::import::parse(
            r#"{"subjects":[{"id":"s","name":"Bio","columns":[{"id":"k","name":"Notes"}],
                "chapters":[{"id":"c","name":"Cells","checkballs":[
                    {"columnId":"k","level":0},{"columnId":"k","level":5}]}]}]}"#,
        )
        .unwrap();
        let state = reduce(&empty_state(), Action::import(imported));

        let state = reduce(
            &state,
            Action::UpdateCheckball {
                subject_id: SubjectId::new("s"),
                chapter_id: ChapterId::new("c"),
                column_id: ColumnId::new("k"),
                level: Level::FULL,
            },
        );
        let chapter = &state.subjects[0].chapters[0];
        assert!(chapter.checkballs.iter().all(|cb| cb.level == Level::FULL));
        assert!(chapter.is_complete());
    }

    #[test]
    fn reference_misses_return_the_same_state() {
        let (state, sid) = with_subject("Biology");
        let actions = vec![
            Action::RemoveSubject {
                subject_id: SubjectId::new("missing"),
            },
            Action::add_column(SubjectId::new("missing"), "X", None),
            Action::add_chapter(SubjectId::new("missing"), "X"),
            Action::RemoveChapter {
                subject_id: sid.clone(),
                chapter_id: ChapterId::new("missing"),
            },
            Action::RemoveColumn {
                subject_id: sid.clone(),
                column_id: ColumnId::new("missing"),
            },
            Action::UpdateColumnName {
                subject_id: sid.clone(),
                column_id: ColumnId::new("missing"),
                name: "X".into(),
            },
            Action::UpdateCheckball {
                subject_id: sid.clone(),
                chapter_id: ChapterId::new("missing"),
                column_id: ColumnId::new("missing"),
                level: Level::FULL,
            },
        ];
        for action in actions {
            let next = reduce(&state, action);
            assert!(Arc::ptr_eq(&state, &next));
        }
    }

    #[test]
    fn untouched_subjects_are_shared() {
        let (state, sid) = with_subject("A");
        let state = reduce(&state, Action::add_subject("B"));
        let next = reduce(&state, Action::add_chapter(sid, "Intro"));
        assert!(!Arc::ptr_eq(&state.subjects[0], &next.subjects[0]));
        assert!(Arc::ptr_eq(&state.subjects[1], &next.subjects[1]));
    }

    #[test]
    fn rename_accepts_any_string() {
        let (state, sid) = with_subject("Biology");
        let state = reduce(&state, Action::add_chapter(sid.clone(), "Cells"));
        let chapter_id = state.subjects[0].chapters[0].id.clone();
        let state = reduce(
            &state,
            Action::UpdateChapterName {
                subject_id: sid.clone(),
                chapter_id: chapter_id.clone(),
                name: String::new(),
            },
        );
        assert_eq!(state.subjects[0].chapters[0].name, "");
    }

    #[test]
    fn toggle_theme_and_reset() {
        let (state, _) = with_subject("Biology");
        let state = reduce(&state, Action::ToggleTheme);
        assert_eq!(state.theme, Theme::Light);

        let state = reduce(&state, Action::reset(&fixed_clock()));
        assert_eq!(state.theme, Theme::Dark);
        assert_eq!(state.subjects.len(), 3);
        assert_eq!(state.last_modified, "2023-11-14T22:13:20.000Z");
    }
}
