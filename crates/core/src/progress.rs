use serde::Serialize;
use std::sync::Arc;

use crate::model::{Level, Subject, SubjectId};

/// Per-subject slice of [`ProgressStats`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectProgress {
    pub subject_id: SubjectId,
    pub subject_name: String,
    pub completed_chapters: usize,
    pub total_chapters: usize,
    pub completion_percentage: f64,
}

/// Aggregate completion figures derived from the subject tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressStats {
    pub total_chapters: usize,
    pub completed_chapters: usize,
    pub overall_completion_percentage: f64,
    pub subject_progress: Vec<SubjectProgress>,
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    checkballs: u64,
    levels: u64,
}

impl Tally {
    fn add(&mut self, other: Tally) {
        self.checkballs += other.checkballs;
        self.levels += other.levels;
    }

    fn percentage(self) -> f64 {
        completion_percentage(self.levels, self.checkballs)
    }
}

/// Computes progress for `subjects`. Pure; safe to call on every query.
#[must_use]
pub fn calculate(subjects: &[Arc<Subject>]) -> ProgressStats {
    let mut overall = Tally::default();
    let mut total_chapters = 0;
    let mut completed_chapters = 0;

    let subject_progress = subjects
        .iter()
        .map(|subject| {
            let mut tally = Tally::default();
            let mut completed = 0;
            for chapter in &subject.chapters {
                tally.add(Tally {
                    checkballs: chapter.checkballs.len() as u64,
                    levels: chapter.level_sum(),
                });
                if chapter.is_complete() {
                    completed += 1;
                }
            }

            overall.add(tally);
            total_chapters += subject.chapters.len();
            completed_chapters += completed;

            SubjectProgress {
                subject_id: subject.id.clone(),
                subject_name: subject.name.clone(),
                completed_chapters: completed,
                total_chapters: subject.chapters.len(),
                completion_percentage: tally.percentage(),
            }
        })
        .collect();

    ProgressStats {
        total_chapters,
        completed_chapters,
        overall_completion_percentage: overall.percentage(),
        subject_progress,
    }
}

/// `levels / (checkballs × 10) × 100`, one decimal place; 0 with no checkballs.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn completion_percentage(level_sum: u64, checkballs: u64) -> f64 {
    let max = checkballs * u64::from(Level::MAX);
    if max == 0 {
        return 0.0;
    }
    round_one_decimal(level_sum as f64 / max as f64 * 100.0)
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
