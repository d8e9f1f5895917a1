//! Paginated progress report.
//!
//! Building happens in two steps: [`ReportDocument::build`] captures the
//! content from a state snapshot, then [`paginate`] lays it out on A4 pages.
//! Renderers in [`render`] turn the pages into text or HTML.

pub mod render;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use study_core::model::AppState;
use study_core::progress;

use crate::error::ReportError;
use crate::export::write_atomic;

pub use render::{render_html, render_text};

pub const REPORT_TITLE: &str = "Study Tracker - Progress Report";

//
// ─── LAYOUT ────────────────────────────────────────────────────────────────────
//

/// A4 height in millimetres.
pub const PAGE_HEIGHT_MM: f32 = 297.0;
pub const MARGIN_MM: f32 = 15.0;
/// Space a subject section needs before it may start on the current page.
pub const SECTION_MIN_SPACE_MM: f32 = 40.0;

const TITLE_PT: f32 = 20.0;
const HEADING_PT: f32 = 16.0;
const SUBJECT_PT: f32 = 14.0;
const STAT_PT: f32 = 11.0;
const BODY_PT: f32 = 10.0;

const HEADER_ROW_MM: f32 = 5.0;
const CHAPTER_ROW_MM: f32 = 6.0;
const RULE_GAP_MM: f32 = 5.0;

const COLUMN_HEADER_CHARS: usize = 8;
const CHAPTER_NAME_CHARS: usize = 35;
const CHAPTER_NAME_KEEP: usize = 32;

fn line_height(font_pt: f32) -> f32 {
    font_pt * 0.5
}

//
// ─── STYLE ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    #[must_use]
    pub fn hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// Colours used by a preset. Content and layout never depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub title: Rgb,
    pub text: Rgb,
    pub background: Rgb,
    pub footer: Rgb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportStyle {
    #[default]
    Plain,
    Styled,
}

impl ReportStyle {
    #[must_use]
    pub fn palette(self) -> Palette {
        match self {
            ReportStyle::Plain => Palette {
                title: Rgb(0, 0, 0),
                text: Rgb(0, 0, 0),
                background: Rgb(255, 255, 255),
                footer: Rgb(150, 150, 150),
            },
            ReportStyle::Styled => Palette {
                title: Rgb(16, 185, 129),
                text: Rgb(100, 100, 100),
                background: Rgb(245, 245, 245),
                footer: Rgb(150, 150, 150),
            },
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ReportStyle::Plain => "plain",
            ReportStyle::Styled => "styled",
        }
    }
}

impl FromStr for ReportStyle {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" => Ok(ReportStyle::Plain),
            "styled" => Ok(ReportStyle::Styled),
            _ => Err(ReportError::UnknownStyle(s.to_owned())),
        }
    }
}

impl fmt::Display for ReportStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Text,
    Html,
}

impl FromStr for ReportFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(ReportFormat::Text),
            "html" => Ok(ReportFormat::Html),
            _ => Err(ReportError::UnknownFormat(s.to_owned())),
        }
    }
}

//
// ─── DOCUMENT ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq)]
pub struct OverallBlock {
    pub total_chapters: usize,
    pub completed_chapters: usize,
    pub completion_percentage: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChapterRow {
    pub name: String,
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubjectSection {
    pub name: String,
    pub chapter_count: usize,
    pub completion_percentage: f64,
    /// `Chapter` followed by one truncated header per column.
    pub headers: Vec<String>,
    pub rows: Vec<ChapterRow>,
}

/// Report content, independent of pages and colours.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    pub title: String,
    pub generated_at: String,
    pub overall: OverallBlock,
    pub sections: Vec<SubjectSection>,
}

impl ReportDocument {
    #[must_use]
    pub fn build(state: &AppState, generated_at: DateTime<Utc>) -> Self {
        let stats = progress::calculate(&state.subjects);

        let sections = state
            .subjects
            .iter()
            .zip(&stats.subject_progress)
            .map(|(subject, progress)| {
                let mut headers = Vec::with_capacity(subject.columns.len() + 1);
                headers.push("Chapter".to_owned());
                headers.extend(
                    subject
                        .columns
                        .iter()
                        .map(|c| truncate_chars(&c.name, COLUMN_HEADER_CHARS)),
                );

                let rows = subject
                    .chapters
                    .iter()
                    .map(|chapter| ChapterRow {
                        name: shorten_chapter_name(&chapter.name),
                        cells: subject
                            .columns
                            .iter()
                            .map(|c| format!("{}%", chapter.level_for(&c.id).percent()))
                            .collect(),
                    })
                    .collect();

                SubjectSection {
                    name: subject.name.clone(),
                    chapter_count: subject.chapters.len(),
                    completion_percentage: progress.completion_percentage,
                    headers,
                    rows,
                }
            })
            .collect();

        Self {
            title: REPORT_TITLE.to_owned(),
            generated_at: generated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            overall: OverallBlock {
                total_chapters: stats.total_chapters,
                completed_chapters: stats.completed_chapters,
                completion_percentage: stats.overall_completion_percentage,
            },
            sections,
        }
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn shorten_chapter_name(name: &str) -> String {
    if name.chars().count() > CHAPTER_NAME_CHARS {
        let mut short = truncate_chars(name, CHAPTER_NAME_KEEP);
        short.push_str("...");
        short
    } else {
        name.to_owned()
    }
}

//
// ─── PAGINATION ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Title(String),
    Text(String),
    Heading(String),
    Stat(String),
    /// Subject name, drawn under a horizontal rule.
    SubjectHeading(String),
    TableHeader(Vec<String>),
    TableRow(Vec<String>),
}

/// A block and its top offset on the page, in millimetres.
#[derive(Debug, Clone, PartialEq)]
pub struct Placed {
    pub top_mm: f32,
    pub height_mm: f32,
    pub block: Block,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Page {
    pub blocks: Vec<Placed>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaginatedReport {
    pages: Vec<Page>,
}

impl PaginatedReport {
    #[must_use]
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Footer text for the zero-based page `index`.
    #[must_use]
    pub fn footer(&self, index: usize) -> String {
        format!("Page {} of {}", index + 1, self.pages.len())
    }
}

struct Cursor {
    pages: Vec<Page>,
    y: f32,
}

impl Cursor {
    fn new() -> Self {
        Self {
            pages: vec![Page::default()],
            y: MARGIN_MM,
        }
    }

    fn ensure(&mut self, space: f32) {
        if self.y + space > PAGE_HEIGHT_MM - MARGIN_MM {
            self.pages.push(Page::default());
            self.y = MARGIN_MM;
        }
    }

    fn place(&mut self, block: Block, height_mm: f32) {
        self.ensure(height_mm);
        if let Some(page) = self.pages.last_mut() {
            page.blocks.push(Placed {
                top_mm: self.y,
                height_mm,
                block,
            });
        }
        self.y += height_mm;
    }

    fn gap(&mut self, mm: f32) {
        self.y += mm;
    }
}

/// Lays `doc` out on A4 pages.
#[must_use]
pub fn paginate(doc: &ReportDocument) -> PaginatedReport {
    let mut cur = Cursor::new();

    cur.place(Block::Title(doc.title.clone()), line_height(TITLE_PT));
    cur.gap(5.0);
    cur.place(
        Block::Text(format!("Generated: {}", doc.generated_at)),
        line_height(BODY_PT),
    );
    cur.gap(10.0);

    cur.place(
        Block::Heading("Overall Progress".to_owned()),
        line_height(HEADING_PT),
    );
    cur.gap(2.0);
    for stat in [
        format!("Total Chapters: {}", doc.overall.total_chapters),
        format!("Completed Chapters: {}", doc.overall.completed_chapters),
        format!(
            "Overall Completion: {:.1}%",
            doc.overall.completion_percentage
        ),
    ] {
        cur.place(Block::Stat(stat), line_height(STAT_PT));
    }
    cur.gap(8.0);

    for section in &doc.sections {
        cur.ensure(SECTION_MIN_SPACE_MM);
        cur.gap(RULE_GAP_MM);
        cur.place(
            Block::SubjectHeading(section.name.clone()),
            line_height(SUBJECT_PT),
        );
        cur.gap(2.0);
        cur.place(
            Block::Text(format!(
                "Chapters: {} | Completion: {:.1}%",
                section.chapter_count, section.completion_percentage
            )),
            line_height(BODY_PT),
        );
        cur.gap(5.0);
        cur.place(Block::TableHeader(section.headers.clone()), HEADER_ROW_MM);
        for row in &section.rows {
            let mut cells = Vec::with_capacity(row.cells.len() + 1);
            cells.push(row.name.clone());
            cells.extend(row.cells.iter().cloned());
            cur.place(Block::TableRow(cells), CHAPTER_ROW_MM);
        }
        cur.gap(8.0);
    }

    PaginatedReport { pages: cur.pages }
}

/// Builds, lays out and renders `state` in one go.
#[must_use]
pub fn render_report(
    state: &AppState,
    generated_at: DateTime<Utc>,
    style: ReportStyle,
    format: ReportFormat,
) -> String {
    let report = paginate(&ReportDocument::build(state, generated_at));
    match format {
        ReportFormat::Text => render_text(&report),
        ReportFormat::Html => render_html(&report, style.palette()),
    }
}

/// Writes a rendered report to `path` without leaving partial files behind.
///
/// # Errors
///
/// Returns `ReportError::Io` if the file cannot be written.
pub async fn write_report(path: &std::path::Path, body: &str) -> Result<(), ReportError> {
    write_atomic(path, body.as_bytes()).await?;
    tracing::info!(path = %path.display(), "wrote report");
    Ok(())
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use study_core::model::Level;
    use study_core::time::fixed_now;
    use study_core::{Action, reduce};

    fn biology() -> Arc<AppState> {
        let state = Arc::new(AppState::empty(fixed_now()));
        let state = reduce(&state, Action::add_subject("Biology"));
        let sid = state.subjects[0].id.clone();
        let state = reduce(
            &state,
            Action::add_column(sid.clone(), "Quick Revision", None),
        );
        let state = reduce(
            &state,
            Action::add_chapter(
                sid.clone(),
                "An exceedingly long chapter name that will not fit",
            ),
        );
        let subject = &state.subjects[0];
        reduce(
            &state,
            Action::UpdateCheckball {
                subject_id: sid.clone(),
                chapter_id: subject.chapters[0].id.clone(),
                column_id: subject.columns[0].id.clone(),
                level: Level::new(7).unwrap(),
            },
        )
    }

    #[test]
    fn build_truncates_names_and_formats_percentages() {
        let doc = ReportDocument::build(&biology(), fixed_now());
        assert_eq!(doc.title, REPORT_TITLE);
        assert_eq!(doc.generated_at, "2023-11-14 22:13:20 UTC");

        let section = &doc.sections[0];
        assert_eq!(section.headers, ["Chapter", "PYQs", "Notes", "Quick Re"]);
        assert_eq!(section.rows[0].name, "An exceedingly long chapter name...");
        assert_eq!(section.rows[0].name.chars().count(), 35);
        assert_eq!(section.rows[0].cells, ["70%", "0%", "0%"]);
        assert!((section.completion_percentage - 23.3).abs() < 1e-9);
    }

    #[test]
    fn default_catalog_spans_pages_within_margins() {
        let state = AppState::fresh(fixed_now());
        let report = paginate(&ReportDocument::build(&state, fixed_now()));

        assert_eq!(report.page_count(), 3);
        assert_eq!(report.footer(0), "Page 1 of 3");
        assert!(matches!(
            &report.pages()[2].blocks[0].block,
            Block::SubjectHeading(name) if name == "Mathematics"
        ));

        for page in report.pages() {
            assert!(!page.blocks.is_empty());
            for placed in &page.blocks {
                assert!(placed.top_mm >= MARGIN_MM);
                assert!(placed.top_mm + placed.height_mm <= PAGE_HEIGHT_MM - MARGIN_MM);
            }
        }

        let rows = report
            .pages()
            .iter()
            .flat_map(|p| &p.blocks)
            .filter(|p| matches!(p.block, Block::TableRow(_)))
            .count();
        assert_eq!(rows, 90);
    }

    #[test]
    fn subject_sections_start_with_room_to_spare() {
        let state = AppState::fresh(fixed_now());
        let report = paginate(&ReportDocument::build(&state, fixed_now()));

        for page in report.pages() {
            for placed in &page.blocks {
                if matches!(placed.block, Block::SubjectHeading(_)) {
                    let section_top = placed.top_mm - RULE_GAP_MM;
                    assert!(section_top + SECTION_MIN_SPACE_MM <= PAGE_HEIGHT_MM - MARGIN_MM);
                }
            }
        }
    }

    #[test]
    fn styles_change_only_colours() {
        assert_ne!(ReportStyle::Plain.palette(), ReportStyle::Styled.palette());
        assert_eq!(ReportStyle::Styled.palette().title.hex(), "#10b981");
        assert_eq!("Styled".parse::<ReportStyle>().unwrap(), ReportStyle::Styled);
        assert!(matches!(
            "neon".parse::<ReportStyle>(),
            Err(ReportError::UnknownStyle(_))
        ));
        assert_eq!("html".parse::<ReportFormat>().unwrap(), ReportFormat::Html);
    }

    #[tokio::test]
    async fn write_report_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Study_Tracker_2023-11-14.html");
        std::fs::write(&path, "old").unwrap();

        let body = render_report(
            &biology(),
            fixed_now(),
            ReportStyle::Plain,
            ReportFormat::Html,
        );
        write_report(&path, &body).await.unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("<!DOCTYPE html>"));
        assert!(written.contains("Page 1 of 1"));

        let missing_dir = dir.path().join("nope").join("report.html");
        let err = write_report(&missing_dir, &body).await.unwrap_err();
        assert!(matches!(err, ReportError::Io(_)));
    }
}
