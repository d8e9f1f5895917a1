use std::collections::HashSet;
use std::fmt::Write as _;

use super::{Block, Page, PaginatedReport, Palette};

//
// ─── TEXT ──────────────────────────────────────────────────────────────────────
//

const TEXT_WIDTH: usize = 72;
const NAME_WIDTH: usize = 36;
const CELL_WIDTH: usize = 10;

/// Plain-text rendering for terminals. Pages are separated by their footer.
#[must_use]
pub fn render_text(report: &PaginatedReport) -> String {
    let mut out = String::new();
    for (index, page) in report.pages().iter().enumerate() {
        for placed in &page.blocks {
            match &placed.block {
                Block::Title(text) => {
                    out.push_str(text);
                    out.push('\n');
                    out.push_str(&"=".repeat(text.chars().count()));
                    out.push('\n');
                }
                Block::Heading(text) => {
                    let _ = writeln!(out, "\n{text}");
                    out.push_str(&"-".repeat(text.chars().count()));
                    out.push('\n');
                }
                Block::SubjectHeading(text) => {
                    let _ = writeln!(out, "\n{}\n{text}", "-".repeat(TEXT_WIDTH));
                }
                Block::Text(text) | Block::Stat(text) => {
                    let _ = writeln!(out, "{text}");
                }
                Block::TableHeader(cells) | Block::TableRow(cells) => {
                    out.push_str(&text_row(cells));
                    out.push('\n');
                }
            }
        }
        let footer = report.footer(index);
        let _ = writeln!(out, "\n{footer:^TEXT_WIDTH$}\n");
    }
    out
}

fn text_row(cells: &[String]) -> String {
    let mut line = String::new();
    for (i, cell) in cells.iter().enumerate() {
        let width = if i == 0 { NAME_WIDTH } else { CELL_WIDTH };
        let _ = write!(line, "{cell:<width$}");
    }
    line.trim_end().to_owned()
}

//
// ─── HTML ──────────────────────────────────────────────────────────────────────
//

/// Standalone HTML document, one `<section>` per page.
///
/// Each page body is written as Markdown, rendered with `pulldown-cmark` and
/// sanitised before it is wrapped in the page template.
#[must_use]
pub fn render_html(report: &PaginatedReport, palette: Palette) -> String {
    let mut body = String::new();
    let mut header: Option<&[String]> = None;

    for (index, page) in report.pages().iter().enumerate() {
        let markdown = page_markdown(page, &mut header);
        let html = markdown_to_html(&markdown);
        let _ = write!(
            body,
            "<section class=\"page\">\n{html}<footer>{}</footer>\n</section>\n",
            report.footer(index)
        );
    }

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n<style>\n{css}</style>\n</head>\n<body>\n{body}</body>\n</html>\n",
        title = super::REPORT_TITLE,
        css = stylesheet(palette),
    )
}

/// Markdown for one page. Chapter rows that continue a table from the
/// previous page reuse its header so the page renders on its own.
fn page_markdown<'a>(page: &'a Page, header: &mut Option<&'a [String]>) -> String {
    let mut md = String::new();
    let mut in_table = false;

    for placed in &page.blocks {
        match &placed.block {
            Block::TableHeader(cells) => {
                *header = Some(cells.as_slice());
                md.push('\n');
                md.push_str(&markdown_row(cells));
                md.push_str(&markdown_separator(cells.len()));
                in_table = true;
            }
            Block::TableRow(cells) => {
                if !in_table {
                    let head: &[String] = header.unwrap_or(&[]);
                    md.push('\n');
                    md.push_str(&markdown_row(head));
                    md.push_str(&markdown_separator(head.len().max(cells.len())));
                    in_table = true;
                }
                md.push_str(&markdown_row(cells));
            }
            other => {
                in_table = false;
                md.push('\n');
                match other {
                    Block::Title(text) => {
                        let _ = writeln!(md, "# {}", escape_markdown(text));
                    }
                    Block::Heading(text) => {
                        let _ = writeln!(md, "## {}", escape_markdown(text));
                    }
                    Block::SubjectHeading(text) => {
                        let _ = writeln!(md, "---\n\n### {}", escape_markdown(text));
                    }
                    Block::Stat(text) => {
                        let _ = writeln!(md, "**{}**", escape_markdown(text));
                    }
                    _ => {
                        let _ = writeln!(md, "{}", escape_markdown(text_of(other)));
                    }
                }
            }
        }
    }
    md
}

fn text_of(block: &Block) -> &str {
    match block {
        Block::Title(t)
        | Block::Text(t)
        | Block::Heading(t)
        | Block::Stat(t)
        | Block::SubjectHeading(t) => t,
        Block::TableHeader(_) | Block::TableRow(_) => "",
    }
}

fn markdown_row(cells: &[String]) -> String {
    let mut row = String::from("|");
    for cell in cells {
        let _ = write!(row, " {} |", escape_markdown(cell));
    }
    row.push('\n');
    row
}

fn markdown_separator(columns: usize) -> String {
    let mut row = String::from("|");
    for _ in 0..columns.max(1) {
        row.push_str(" --- |");
    }
    row.push('\n');
    row
}

fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(
            ch,
            '\\' | '`' | '*' | '_' | '[' | ']' | '<' | '>' | '|' | '#' | '!' | '&'
        ) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn markdown_to_html(input: &str) -> String {
    let mut options = pulldown_cmark::Options::empty();
    options.insert(pulldown_cmark::Options::ENABLE_TABLES);

    let parser = pulldown_cmark::Parser::new_ext(input, options);
    let mut html = String::new();
    pulldown_cmark::html::push_html(&mut html, parser);
    sanitize_html(&html)
}

fn sanitize_html(html: &str) -> String {
    let tags: HashSet<&str> = [
        "h1", "h2", "h3", "p", "hr", "strong", "em", "table", "thead", "tbody", "tr", "th", "td",
    ]
    .into_iter()
    .collect();

    ammonia::Builder::new()
        .tags(tags)
        .clean(html)
        .to_string()
}

fn stylesheet(palette: Palette) -> String {
    let title = palette.title.hex();
    let text = palette.text.hex();
    let background = palette.background.hex();
    let footer = palette.footer.hex();
    format!(
        "body {{ margin: 0; font-family: Helvetica, Arial, sans-serif; }}\n\
         .page {{ box-sizing: border-box; width: 210mm; min-height: 297mm; padding: 15mm; \
         background: {background}; color: {text}; position: relative; page-break-after: always; }}\n\
         h1, h2, h3 {{ color: {title}; margin: 0 0 2mm; }}\n\
         hr {{ border: 0; border-top: 0.5mm solid {title}; }}\n\
         table {{ width: 100%; border-collapse: collapse; font-size: 8pt; }}\n\
         th {{ text-align: left; font-size: 9pt; }}\n\
         footer {{ position: absolute; bottom: 10mm; left: 0; right: 0; text-align: center; \
         font-size: 8pt; color: {footer}; }}\n"
    )
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
