use std::fmt::{self, Write as _};
use std::path::PathBuf;

use services::export::{self, report_file_name};
use services::report::{self, ReportFormat, ReportStyle};
use services::{AppServices, ExportError, ReportError};
use study_core::model::{AppState, Chapter, ColumnKind, ColumnPreset, Level, Subject};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug)]
pub enum CommandError {
    Usage(&'static str),
    UnknownCommand(String),
    UnbalancedQuote,
    UnknownSubject(String),
    UnknownColumn { subject: String, raw: String },
    UnknownChapter { subject: String, raw: String },
    InvalidLevel(String),
    NoCheckball { chapter: String, column: String },
    Core(study_core::Error),
    Export(ExportError),
    Report(ReportError),
    Encode(serde_json::Error),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Usage(usage) => write!(f, "usage: {usage}"),
            CommandError::UnknownCommand(cmd) => {
                write!(f, "unknown command: {cmd} (try `help`)")
            }
            CommandError::UnbalancedQuote => write!(f, "unbalanced quote"),
            CommandError::UnknownSubject(raw) => write!(f, "no subject matches {raw:?}"),
            CommandError::UnknownColumn { subject, raw } => {
                write!(f, "no column in {subject} matches {raw:?}")
            }
            CommandError::UnknownChapter { subject, raw } => {
                write!(f, "no chapter in {subject} matches {raw:?}")
            }
            CommandError::InvalidLevel(raw) => write!(f, "level must be 0-10, got {raw:?}"),
            CommandError::NoCheckball { chapter, column } => {
                write!(f, "{chapter} has no checkball for column {column}")
            }
            CommandError::Core(study_core::Error::Import(err)) => {
                write!(f, "import rejected: {err}")
            }
            CommandError::Core(err) => write!(f, "{err}"),
            CommandError::Export(err) => write!(f, "{err}"),
            CommandError::Report(err) => write!(f, "report failed: {err}"),
            CommandError::Encode(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for CommandError {}

impl From<study_core::Error> for CommandError {
    fn from(err: study_core::Error) -> Self {
        CommandError::Core(err)
    }
}

impl From<ExportError> for CommandError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::Import(err) => CommandError::Core(err.into()),
            err => CommandError::Export(err),
        }
    }
}

impl From<ReportError> for CommandError {
    fn from(err: ReportError) -> Self {
        CommandError::Report(err)
    }
}

//
// ─── PARSING ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    List { subject: Option<String> },
    Stats { json: bool },
    AddSubject { name: String },
    RemoveSubject { subject: String },
    AddColumn { subject: String, name: String, kind: Option<ColumnKind> },
    RemoveColumn { subject: String, column: String },
    RenameColumn { subject: String, column: String, name: String },
    AddChapter { subject: String, name: String },
    RemoveChapter { subject: String, chapter: String },
    RenameChapter { subject: String, chapter: String, name: String },
    Set { subject: String, chapter: String, column: String, level: Level },
    Cycle { subject: String, chapter: String, column: String },
    Theme,
    Reset,
    Export { path: Option<PathBuf> },
    Import { path: PathBuf },
    Report { style: ReportStyle, format: ReportFormat, out: Option<PathBuf> },
    Shell,
    Help,
    Quit,
}

pub const HELP: &str = "\
Commands:
  list [subject]                             subjects, or one subject's chapters
  stats [--json]                             completion figures
  add-subject <name>
  remove-subject <subject>
  add-column <subject> <name> [type]         type: pyqs, notes, lectures, quick-revision, brush-up, custom
  remove-column <subject> <column>
  rename-column <subject> <column> <name>    an empty name removes the column
  add-chapter <subject> <name>
  remove-chapter <subject> <chapter>
  rename-chapter <subject> <chapter> <name>  an empty name removes the chapter
  set <subject> <chapter> <column> <0-10>
  cycle <subject> <chapter> <column>         0 -> 5 -> 10 -> 0
  theme                                      toggle light/dark
  reset                                      restore the default catalog
  export [path]                              JSON snapshot (default: dated file in .)
  import <path>                              replace everything with a JSON snapshot
  report [--style plain|styled] [--format text|html] [--out path]
  shell                                      interactive mode
References accept an id or a case-insensitive name; quote names with spaces.";

/// Splits a shell line into words, honouring single and double quotes.
pub fn split_words(line: &str) -> Result<Vec<String>, CommandError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut in_word = false;

    for ch in line.chars() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => current.push(ch),
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                in_word = true;
            }
            None if ch.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            None => {
                current.push(ch);
                in_word = true;
            }
        }
    }
    if quote.is_some() {
        return Err(CommandError::UnbalancedQuote);
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

impl Command {
    pub fn parse(words: &[String]) -> Result<Self, CommandError> {
        let Some((head, rest)) = words.split_first() else {
            return Ok(Command::Help);
        };
        let args: Vec<&str> = rest.iter().map(String::as_str).collect();

        let cmd = match (head.as_str(), args.as_slice()) {
            ("list" | "ls", []) => Command::List { subject: None },
            ("list" | "ls", [subject]) => Command::List {
                subject: Some((*subject).to_owned()),
            },
            ("list" | "ls", _) => return Err(CommandError::Usage("list [subject]")),

            ("stats", []) => Command::Stats { json: false },
            ("stats", ["--json"]) => Command::Stats { json: true },
            ("stats", _) => return Err(CommandError::Usage("stats [--json]")),

            ("add-subject", [name]) => Command::AddSubject {
                name: (*name).to_owned(),
            },
            ("add-subject", _) => return Err(CommandError::Usage("add-subject <name>")),

            ("remove-subject", [subject]) => Command::RemoveSubject {
                subject: (*subject).to_owned(),
            },
            ("remove-subject", _) => return Err(CommandError::Usage("remove-subject <subject>")),

            ("add-column", [subject, name]) => Command::AddColumn {
                subject: (*subject).to_owned(),
                name: (*name).to_owned(),
                kind: None,
            },
            ("add-column", [subject, name, kind]) => Command::AddColumn {
                subject: (*subject).to_owned(),
                name: (*name).to_owned(),
                kind: Some(kind.parse().map_err(study_core::Error::from)?),
            },
            ("add-column", _) => {
                return Err(CommandError::Usage("add-column <subject> <name> [type]"));
            }

            ("remove-column", [subject, column]) => Command::RemoveColumn {
                subject: (*subject).to_owned(),
                column: (*column).to_owned(),
            },
            ("remove-column", _) => {
                return Err(CommandError::Usage("remove-column <subject> <column>"));
            }

            ("rename-column", [subject, column, name]) => Command::RenameColumn {
                subject: (*subject).to_owned(),
                column: (*column).to_owned(),
                name: (*name).to_owned(),
            },
            ("rename-column", _) => {
                return Err(CommandError::Usage("rename-column <subject> <column> <name>"));
            }

            ("add-chapter", [subject, name]) => Command::AddChapter {
                subject: (*subject).to_owned(),
                name: (*name).to_owned(),
            },
            ("add-chapter", _) => return Err(CommandError::Usage("add-chapter <subject> <name>")),

            ("remove-chapter", [subject, chapter]) => Command::RemoveChapter {
                subject: (*subject).to_owned(),
                chapter: (*chapter).to_owned(),
            },
            ("remove-chapter", _) => {
                return Err(CommandError::Usage("remove-chapter <subject> <chapter>"));
            }

            ("rename-chapter", [subject, chapter, name]) => Command::RenameChapter {
                subject: (*subject).to_owned(),
                chapter: (*chapter).to_owned(),
                name: (*name).to_owned(),
            },
            ("rename-chapter", _) => {
                return Err(CommandError::Usage(
                    "rename-chapter <subject> <chapter> <name>",
                ));
            }

            ("set", [subject, chapter, column, level]) => Command::Set {
                subject: (*subject).to_owned(),
                chapter: (*chapter).to_owned(),
                column: (*column).to_owned(),
                level: parse_level(level)?,
            },
            ("set", _) => {
                return Err(CommandError::Usage("set <subject> <chapter> <column> <0-10>"));
            }

            ("cycle", [subject, chapter, column]) => Command::Cycle {
                subject: (*subject).to_owned(),
                chapter: (*chapter).to_owned(),
                column: (*column).to_owned(),
            },
            ("cycle", _) => return Err(CommandError::Usage("cycle <subject> <chapter> <column>")),

            ("theme", []) => Command::Theme,
            ("reset", []) => Command::Reset,

            ("export", []) => Command::Export { path: None },
            ("export", [path]) => Command::Export {
                path: Some(PathBuf::from(path)),
            },
            ("export", _) => return Err(CommandError::Usage("export [path]")),

            ("import", [path]) => Command::Import {
                path: PathBuf::from(path),
            },
            ("import", _) => return Err(CommandError::Usage("import <path>")),

            ("report", flags) => parse_report(flags)?,

            ("shell", []) => Command::Shell,
            ("help" | "--help" | "-h", _) => Command::Help,
            ("quit" | "exit", []) => Command::Quit,

            (other, _) => return Err(CommandError::UnknownCommand(other.to_owned())),
        };
        Ok(cmd)
    }
}

const REPORT_USAGE: &str = "report [--style plain|styled] [--format text|html] [--out path]";

fn parse_report(flags: &[&str]) -> Result<Command, CommandError> {
    let mut style = ReportStyle::default();
    let mut format = ReportFormat::default();
    let mut out = None;

    let mut iter = flags.iter();
    while let Some(flag) = iter.next() {
        let value = iter.next().ok_or(CommandError::Usage(REPORT_USAGE))?;
        match *flag {
            "--style" => style = value.parse()?,
            "--format" => format = value.parse()?,
            "--out" => out = Some(PathBuf::from(value)),
            _ => return Err(CommandError::Usage(REPORT_USAGE)),
        }
    }
    Ok(Command::Report { style, format, out })
}

fn parse_level(raw: &str) -> Result<Level, CommandError> {
    let trimmed = raw.trim();
    // Single keys go through the keyboard digit mapping.
    if trimmed.len() == 1 {
        if let Some(level) = trimmed.chars().next().and_then(Level::from_digit) {
            return Ok(level);
        }
    }
    let value: u8 = trimmed
        .parse()
        .map_err(|_| CommandError::InvalidLevel(raw.to_owned()))?;
    Ok(Level::new(value).map_err(study_core::Error::from)?)
}

//
// ─── RESOLUTION ────────────────────────────────────────────────────────────────
//

fn find_subject<'a>(state: &'a AppState, raw: &str) -> Result<&'a Subject, CommandError> {
    state
        .subjects
        .iter()
        .map(|s| &**s)
        .find(|s| s.id == *raw)
        .or_else(|| {
            state
                .subjects
                .iter()
                .map(|s| &**s)
                .find(|s| s.name.eq_ignore_ascii_case(raw.trim()))
        })
        .ok_or_else(|| CommandError::UnknownSubject(raw.to_owned()))
}

fn find_chapter<'a>(subject: &'a Subject, raw: &str) -> Result<&'a Chapter, CommandError> {
    subject
        .chapters
        .iter()
        .find(|c| c.id == *raw)
        .or_else(|| {
            subject
                .chapters
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(raw.trim()))
        })
        .ok_or_else(|| CommandError::UnknownChapter {
            subject: subject.name.clone(),
            raw: raw.to_owned(),
        })
}

fn find_column<'a>(
    subject: &'a Subject,
    raw: &str,
) -> Result<&'a study_core::model::Column, CommandError> {
    subject
        .columns
        .iter()
        .find(|c| c.id == *raw)
        .or_else(|| {
            subject
                .columns
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(raw.trim()))
        })
        .ok_or_else(|| CommandError::UnknownColumn {
            subject: subject.name.clone(),
            raw: raw.to_owned(),
        })
}

fn no_checkball(chapter: &Chapter, column: &str) -> CommandError {
    CommandError::NoCheckball {
        chapter: chapter.name.clone(),
        column: column.to_owned(),
    }
}

//
// ─── EXECUTION ─────────────────────────────────────────────────────────────────
//

/// Runs `cmd` and returns what should be printed.
///
/// `Shell` and `Quit` are handled by the caller and produce no output here.
pub async fn execute(services: &mut AppServices, cmd: Command) -> Result<String, CommandError> {
    let mut out = String::new();
    let state = std::sync::Arc::clone(services.store().state());

    match cmd {
        Command::List { subject: None } => {
            let stats = services.store().progress();
            for (subject, progress) in state.subjects.iter().zip(&stats.subject_progress) {
                let _ = writeln!(
                    out,
                    "{:<24} {:>3} chapters  {:>5.1}%  [{}]",
                    subject.name,
                    subject.chapters.len(),
                    progress.completion_percentage,
                    subject.id
                );
            }
            let _ = writeln!(out, "theme: {}", state.theme);
        }
        Command::List {
            subject: Some(raw),
        } => {
            let subject = find_subject(&state, &raw)?;
            let _ = write!(out, "{:<36}", "Chapter");
            for column in &subject.columns {
                let _ = write!(out, "{:<16}", format!("{} ({})", column.name, column.kind));
            }
            out.push('\n');
            for chapter in &subject.chapters {
                let mut row = format!("{:<36}", chapter.name);
                for column in &subject.columns {
                    let _ = write!(row, "{:<16}", chapter.level_for(&column.id).value());
                }
                if chapter.is_complete() {
                    row.push_str("done");
                }
                let _ = writeln!(out, "{}", row.trim_end());
            }
        }
        Command::Stats { json } => {
            let stats = services.store().progress();
            if json {
                let body = serde_json::to_string_pretty(&stats).map_err(CommandError::Encode)?;
                let _ = writeln!(out, "{body}");
            } else {
                let _ = writeln!(
                    out,
                    "overall: {}/{} chapters complete, {:.1}%",
                    stats.completed_chapters,
                    stats.total_chapters,
                    stats.overall_completion_percentage
                );
                for subject in &stats.subject_progress {
                    let _ = writeln!(
                        out,
                        "  {}: {}/{} chapters, {:.1}%",
                        subject.subject_name,
                        subject.completed_chapters,
                        subject.total_chapters,
                        subject.completion_percentage
                    );
                }
            }
        }
        Command::AddSubject { name } => match services.store_mut().add_subject(&name) {
            Some(id) => {
                let _ = writeln!(out, "added subject {} [{id}]", name.trim());
            }
            None => {
                let _ = writeln!(out, "subject name is empty; nothing added");
            }
        },
        Command::RemoveSubject { subject } => {
            let found = find_subject(&state, &subject)?;
            services.store_mut().remove_subject(&found.id);
            let _ = writeln!(out, "removed subject {}", found.name);
        }
        Command::AddColumn {
            subject,
            name,
            kind,
        } => {
            let found = find_subject(&state, &subject)?;
            let kind = kind.or_else(|| ColumnPreset::lookup(&name).map(|preset| preset.kind));
            if let Some(id) = services.store_mut().add_column(&found.id, &name, kind) {
                let _ = writeln!(out, "added column {name} to {} [{id}]", found.name);
            }
        }
        Command::RemoveColumn { subject, column } => {
            let found = find_subject(&state, &subject)?;
            let col = find_column(found, &column)?;
            services.store_mut().remove_column(&found.id, &col.id);
            let _ = writeln!(out, "removed column {} from {}", col.name, found.name);
        }
        Command::RenameColumn {
            subject,
            column,
            name,
        } => {
            let found = find_subject(&state, &subject)?;
            let col = find_column(found, &column)?;
            services
                .store_mut()
                .commit_column_name(&found.id, &col.id, &name);
            if name.trim().is_empty() {
                let _ = writeln!(out, "removed column {}", col.name);
            } else {
                let _ = writeln!(out, "renamed column {} to {}", col.name, name.trim());
            }
        }
        Command::AddChapter { subject, name } => {
            let found = find_subject(&state, &subject)?;
            if let Some(id) = services.store_mut().add_chapter(&found.id, &name) {
                let _ = writeln!(out, "added chapter {name} to {} [{id}]", found.name);
            }
        }
        Command::RemoveChapter { subject, chapter } => {
            let found = find_subject(&state, &subject)?;
            let ch = find_chapter(found, &chapter)?;
            services.store_mut().remove_chapter(&found.id, &ch.id);
            let _ = writeln!(out, "removed chapter {} from {}", ch.name, found.name);
        }
        Command::RenameChapter {
            subject,
            chapter,
            name,
        } => {
            let found = find_subject(&state, &subject)?;
            let ch = find_chapter(found, &chapter)?;
            services
                .store_mut()
                .commit_chapter_name(&found.id, &ch.id, &name);
            if name.trim().is_empty() {
                let _ = writeln!(out, "removed chapter {}", ch.name);
            } else {
                let _ = writeln!(out, "renamed chapter {} to {}", ch.name, name.trim());
            }
        }
        Command::Set {
            subject,
            chapter,
            column,
            level,
        } => {
            let found = find_subject(&state, &subject)?;
            let ch = find_chapter(found, &chapter)?;
            let col = find_column(found, &column)?;
            if ch.checkball(&col.id).is_none() {
                return Err(no_checkball(ch, &col.name));
            }
            services
                .store_mut()
                .set_level(&found.id, &ch.id, &col.id, level);
            let _ = writeln!(out, "{} / {} / {}: {level}", found.name, ch.name, col.name);
        }
        Command::Cycle {
            subject,
            chapter,
            column,
        } => {
            let found = find_subject(&state, &subject)?;
            let ch = find_chapter(found, &chapter)?;
            let col = find_column(found, &column)?;
            let level = services
                .store_mut()
                .cycle_checkball(&found.id, &ch.id, &col.id)
                .ok_or_else(|| no_checkball(ch, &col.name))?;
            let _ = writeln!(out, "{} / {} / {}: {level}", found.name, ch.name, col.name);
        }
        Command::Theme => {
            services.store_mut().toggle_theme();
            let _ = writeln!(out, "theme: {}", services.store().state().theme);
        }
        Command::Reset => {
            services.store_mut().reset();
            let _ = writeln!(out, "restored the default catalog");
        }
        Command::Export { path } => {
            let clock = services.clock();
            let target = path.unwrap_or_else(|| PathBuf::from("."));
            let written = export::export_json_file(services.store(), &target, &clock).await?;
            let _ = writeln!(
                out,
                "exported to {} at {}",
                written.display(),
                clock.iso_now()
            );
        }
        Command::Import { path } => {
            export::import_file(services.store_mut(), &path).await?;
            let _ = writeln!(
                out,
                "imported {} subjects from {}",
                services.store().state().subjects.len(),
                path.display()
            );
        }
        Command::Report { style, format, out: target } => {
            let clock = services.clock();
            let body = report::render_report(&state, clock.now(), style, format);
            let target = match (target, format) {
                (Some(path), _) => Some(path),
                (None, ReportFormat::Html) => Some(PathBuf::from(report_file_name(&clock))),
                (None, ReportFormat::Text) => None,
            };
            match target {
                Some(path) => {
                    report::write_report(&path, &body).await?;
                    let _ = writeln!(out, "wrote {style} report to {}", path.display());
                }
                None => out.push_str(&body),
            }
        }
        Command::Help => {
            let _ = writeln!(out, "{HELP}");
        }
        Command::Shell | Command::Quit => {}
    }
    Ok(out)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
