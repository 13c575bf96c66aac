use std::io::Write;
use std::path::Path;

use healthcheck_core::results::ResultsPage;
use healthcheck_core::view::{EMPTY_HISTORY, HistoryPage};
use healthcheck_core::{ProcessingStats, SortOrder};
use healthcheck_reporting::pdf::layout::{NOTICE_TEXT, NOTICE_TITLE};
use owo_colors::OwoColorize;
use pulldown_cmark::{Event, Parser, Tag, TagEnd};

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

fn heading(w: &mut dyn Write, text: &str, color: ColorMode) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{}", text.bold().blue())
    } else {
        writeln!(w, "{text}")?;
        writeln!(w, "{}", "-".repeat(text.chars().count()))
    }
}

fn stats_line(stats: &ProcessingStats) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(secs) = stats.processing_secs {
        parts.push(format!("Tiempo de procesamiento: {secs:.2} s"));
    }
    if let Some(pages) = stats.pages {
        parts.push(format!("Páginas: {pages}"));
    }
    if let Some(mb) = stats.file_size_mb {
        parts.push(format!("Tamaño: {mb:.2} MB"));
    }
    (!parts.is_empty()).then(|| parts.join(" · "))
}

/// Print the results view.
pub fn print_results(w: &mut dyn Write, page: &ResultsPage, color: ColorMode) -> std::io::Result<()> {
    writeln!(w)?;
    if color.enabled() {
        writeln!(w, "{}", page.title.bold())?;
    } else {
        writeln!(w, "{}", page.title)?;
    }
    if let Some(line) = stats_line(&page.stats) {
        if color.enabled() {
            writeln!(w, "{}", line.dimmed())?;
        } else {
            writeln!(w, "{line}")?;
        }
    }
    writeln!(w)?;

    if let Some(summary) = &page.summary {
        heading(w, "Resumen General", color)?;
        writeln!(w, "{}", render_markdown(summary, color))?;
        writeln!(w)?;
    }
    heading(w, "Interpretación de Conceptos", color)?;
    writeln!(w, "{}", render_markdown(&page.interpretation, color))?;
    writeln!(w)?;
    heading(w, "Resultados Simplificados", color)?;
    writeln!(w, "{}", render_markdown(&page.simplified, color))?;
    writeln!(w)?;

    print_disclaimer(w, color)?;
    if let Some(record) = &page.saved {
        let msg = format!("Guardado en el historial (id {})", record.id);
        if color.enabled() {
            writeln!(w, "{}", msg.dimmed())?;
        } else {
            writeln!(w, "{msg}")?;
        }
    }
    Ok(())
}

pub fn print_disclaimer(w: &mut dyn Write, color: ColorMode) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{} {}", format!("{NOTICE_TITLE}:").bold().yellow(), NOTICE_TEXT.yellow())
    } else {
        writeln!(w, "{NOTICE_TITLE}: {NOTICE_TEXT}")
    }
}

/// Print the history cards, or the empty-state line.
pub fn print_history(
    w: &mut dyn Write,
    page: &HistoryPage,
    sort: SortOrder,
    color: ColorMode,
) -> std::io::Result<()> {
    let cards = match page {
        HistoryPage::Empty => {
            if color.enabled() {
                writeln!(w, "{}", EMPTY_HISTORY.dimmed())?;
            } else {
                writeln!(w, "{EMPTY_HISTORY}")?;
            }
            return Ok(());
        }
        HistoryPage::Cards(cards) => cards,
    };

    heading(w, "Historial de Análisis", color)?;
    let meta = format!("{} análisis, orden: {sort}", cards.len());
    if color.enabled() {
        writeln!(w, "{}", meta.dimmed())?;
    } else {
        writeln!(w, "{meta}")?;
    }
    for card in cards {
        writeln!(w)?;
        if color.enabled() {
            writeln!(
                w,
                "{} {}  {}",
                format!("[{}]", card.id).cyan(),
                card.file_name.bold(),
                card.date_label.dimmed()
            )?;
        } else {
            writeln!(w, "[{}] {}  {}", card.id, card.file_name, card.date_label)?;
        }
        writeln!(w, "    {}", card.preview)?;
    }
    Ok(())
}

pub fn print_exported(w: &mut dyn Write, path: &Path, color: ColorMode) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{} {}", "Exportado:".green(), path.display())
    } else {
        writeln!(w, "Exportado: {}", path.display())
    }
}

pub fn print_success(w: &mut dyn Write, message: &str, color: ColorMode) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{}", message.green())
    } else {
        writeln!(w, "{message}")
    }
}

pub fn print_error(w: &mut dyn Write, message: &str, color: ColorMode) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{} {}", "Error:".bold().red(), message)
    } else {
        writeln!(w, "Error: {message}")
    }
}

pub fn print_notice(w: &mut dyn Write, message: &str, color: ColorMode) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{}", message.yellow())
    } else {
        writeln!(w, "{message}")
    }
}

/// File counter shown before each upload when several files are analysed.
pub fn print_file_header(
    w: &mut dyn Write,
    index: usize,
    total: usize,
    path: &Path,
    color: ColorMode,
) -> std::io::Result<()> {
    let label = format!("[{index}/{total}]");
    if color.enabled() {
        writeln!(w, "{} {}", label.bold().cyan(), path.display())
    } else {
        writeln!(w, "{label} {}", path.display())
    }
}

#[derive(Default)]
struct MdState {
    bold: usize,
    italic: usize,
    heading: bool,
    /// Open lists; `Some(n)` is an ordered list whose next item is `n`.
    lists: Vec<Option<u64>>,
}

fn ensure_line_start(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

fn styled(text: &str, state: &MdState, color: ColorMode) -> String {
    if !color.enabled() {
        return text.to_string();
    }
    let mut s = text.to_string();
    if state.italic > 0 {
        s = s.italic().to_string();
    }
    if state.bold > 0 || state.heading {
        s = s.bold().to_string();
    }
    s
}

/// Render markdown for the terminal: headings and emphasis become bold or
/// italic, lists get bullets or numbers, raw HTML is dropped.
pub fn render_markdown(text: &str, color: ColorMode) -> String {
    let mut out = String::new();
    let mut state = MdState::default();

    for event in Parser::new(text) {
        match event {
            Event::Start(Tag::Heading { .. }) => {
                ensure_line_start(&mut out);
                state.heading = true;
            }
            Event::End(TagEnd::Heading(_)) => {
                state.heading = false;
                out.push_str("\n\n");
            }
            Event::Start(Tag::Strong) => state.bold += 1,
            Event::End(TagEnd::Strong) => state.bold = state.bold.saturating_sub(1),
            Event::Start(Tag::Emphasis) => state.italic += 1,
            Event::End(TagEnd::Emphasis) => state.italic = state.italic.saturating_sub(1),
            Event::Start(Tag::List(start)) => {
                ensure_line_start(&mut out);
                state.lists.push(start);
            }
            Event::End(TagEnd::List(_)) => {
                state.lists.pop();
                if state.lists.is_empty() {
                    out.push('\n');
                }
            }
            Event::Start(Tag::Item) => {
                ensure_line_start(&mut out);
                let depth = state.lists.len().saturating_sub(1);
                out.push_str(&"  ".repeat(depth));
                match state.lists.last_mut() {
                    Some(Some(n)) => {
                        out.push_str(&format!("{n}. "));
                        *n += 1;
                    }
                    _ => out.push_str("• "),
                }
            }
            Event::End(TagEnd::Item) => ensure_line_start(&mut out),
            Event::End(TagEnd::Paragraph) => {
                if state.lists.is_empty() {
                    out.push_str("\n\n");
                } else {
                    ensure_line_start(&mut out);
                }
            }
            Event::Text(t) => out.push_str(&styled(&t, &state, color)),
            Event::Code(t) => {
                if color.enabled() {
                    out.push_str(&t.cyan().to_string());
                } else {
                    out.push_str(&t);
                }
            }
            Event::SoftBreak | Event::HardBreak => out.push('\n'),
            Event::Rule => {
                ensure_line_start(&mut out);
                out.push_str(&"─".repeat(40));
                out.push_str("\n\n");
            }
            _ => {}
        }
    }
    out.trim_end().to_string()
}
