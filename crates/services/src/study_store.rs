//! The authoritative in-memory progress tree.
//!
//! `StudyStore` is owned by the composition root and handed out by
//! reference. All mutation goes through [`StudyStore::dispatch`]; `&mut self`
//! keeps dispatches serialized and non-reentrant.

use std::sync::Arc;

use study_core::import::{self, ImportError};
use study_core::model::{AppState, ChapterId, ColumnId, ColumnKind, Level, SubjectId};
use study_core::progress::{self, ProgressStats};
use study_core::{Action, Clock, reduce};

/// Notified after every dispatch that produced a new state.
pub trait StateListener: Send + Sync {
    fn state_changed(&self, state: &Arc<AppState>);
}

pub struct StudyStore {
    state: Arc<AppState>,
    clock: Clock,
    listeners: Vec<Arc<dyn StateListener>>,
}

impl StudyStore {
    #[must_use]
    pub fn new(initial: AppState, clock: Clock) -> Self {
        Self {
            state: Arc::new(initial),
            clock,
            listeners: Vec::new(),
        }
    }

    #[must_use]
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    pub fn subscribe(&mut self, listener: Arc<dyn StateListener>) {
        self.listeners.push(listener);
    }

    /// Apply `action`. Returns `true` when the state changed.
    pub fn dispatch(&mut self, action: Action) -> bool {
        let kind = action.kind();
        let next = reduce(&self.state, action);
        if Arc::ptr_eq(&next, &self.state) {
            tracing::debug!(action = kind, "action left state unchanged");
            return false;
        }
        tracing::debug!(action = kind, "state changed");
        self.state = next;
        for listener in &self.listeners {
            listener.state_changed(&self.state);
        }
        true
    }

    /// Progress figures for the current tree.
    #[must_use]
    pub fn progress(&self) -> ProgressStats {
        progress::calculate(&self.state.subjects)
    }

    //
    // ─── EDITING HELPERS ───────────────────────────────────────────────────────
    //

    /// Adds a subject named `name` (trimmed). Blank names are ignored.
    pub fn add_subject(&mut self, name: &str) -> Option<SubjectId> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let action = Action::add_subject(name);
        let Action::AddSubject { subject_id, .. } = &action else {
            return None;
        };
        let id = subject_id.clone();
        self.dispatch(action).then_some(id)
    }

    pub fn remove_subject(&mut self, subject_id: &SubjectId) -> bool {
        self.dispatch(Action::RemoveSubject {
            subject_id: subject_id.clone(),
        })
    }

    /// Adds a column and returns its id, or `None` if the subject is gone.
    pub fn add_column(
        &mut self,
        subject_id: &SubjectId,
        name: &str,
        kind: Option<ColumnKind>,
    ) -> Option<ColumnId> {
        let action = Action::add_column(subject_id.clone(), name, kind);
        let Action::AddColumn { column_id, .. } = &action else {
            return None;
        };
        let id = column_id.clone();
        self.dispatch(action).then_some(id)
    }

    pub fn remove_column(&mut self, subject_id: &SubjectId, column_id: &ColumnId) -> bool {
        self.dispatch(Action::RemoveColumn {
            subject_id: subject_id.clone(),
            column_id: column_id.clone(),
        })
    }

    /// Adds a chapter and returns its id, or `None` if the subject is gone.
    pub fn add_chapter(&mut self, subject_id: &SubjectId, name: &str) -> Option<ChapterId> {
        let action = Action::add_chapter(subject_id.clone(), name);
        let Action::AddChapter { chapter_id, .. } = &action else {
            return None;
        };
        let id = chapter_id.clone();
        self.dispatch(action).then_some(id)
    }

    pub fn remove_chapter(&mut self, subject_id: &SubjectId, chapter_id: &ChapterId) -> bool {
        self.dispatch(Action::RemoveChapter {
            subject_id: subject_id.clone(),
            chapter_id: chapter_id.clone(),
        })
    }

    /// Finishes a column edit: trimmed non-empty names rename, blank names delete.
    pub fn commit_column_name(
        &mut self,
        subject_id: &SubjectId,
        column_id: &ColumnId,
        name: &str,
    ) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return self.remove_column(subject_id, column_id);
        }
        self.dispatch(Action::UpdateColumnName {
            subject_id: subject_id.clone(),
            column_id: column_id.clone(),
            name: name.to_owned(),
        })
    }

    /// Finishes a chapter edit: trimmed non-empty names rename, blank names delete.
    pub fn commit_chapter_name(
        &mut self,
        subject_id: &SubjectId,
        chapter_id: &ChapterId,
        name: &str,
    ) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return self.remove_chapter(subject_id, chapter_id);
        }
        self.dispatch(Action::UpdateChapterName {
            subject_id: subject_id.clone(),
            chapter_id: chapter_id.clone(),
            name: name.to_owned(),
        })
    }

    pub fn set_level(
        &mut self,
        subject_id: &SubjectId,
        chapter_id: &ChapterId,
        column_id: &ColumnId,
        level: Level,
    ) -> bool {
        self.dispatch(Action::UpdateCheckball {
            subject_id: subject_id.clone(),
            chapter_id: chapter_id.clone(),
            column_id: column_id.clone(),
            level,
        })
    }

    /// Advances a checkball along the click cycle and returns its new level.
    pub fn cycle_checkball(
        &mut self,
        subject_id: &SubjectId,
        chapter_id: &ChapterId,
        column_id: &ColumnId,
    ) -> Option<Level> {
        let current = self
            .state
            .subject(subject_id)?
            .chapter(chapter_id)?
            .checkball(column_id)?
            .level;
        let next = current.cycle();
        self.set_level(subject_id, chapter_id, column_id, next);
        Some(next)
    }

    pub fn toggle_theme(&mut self) {
        self.dispatch(Action::ToggleTheme);
    }

    pub fn reset(&mut self) {
        self.dispatch(Action::reset(&self.clock));
    }

    //
    // ─── IMPORT / EXPORT ───────────────────────────────────────────────────────
    //

    /// Pretty-printed JSON of the current state, suitable for re-import.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if the state cannot be encoded.
    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self.state.as_ref())
    }

    /// Replaces the whole state with `text` if it passes validation.
    ///
    /// # Errors
    ///
    /// Returns `ImportError` for malformed or rejected payloads; the current
    /// state is left untouched.
    pub fn import_json(&mut self, text: &str) -> Result<(), ImportError> {
        let imported = import::parse(text)?;
        let dangling = imported.state().dangling_checkballs();
        if dangling > 0 {
            tracing::warn!(dangling, "imported state has checkballs for unknown columns");
        }
        self.dispatch(Action::import(imported));
        Ok(())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
