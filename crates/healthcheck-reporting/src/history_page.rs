//! Static HTML snapshot of the history list.
//!
//! Card text comes pre-escaped from [`HistoryCard`]; nothing else on the page
//! is user-controlled.

use std::fmt::Write as _;
use std::path::Path;

use healthcheck_core::view::{EMPTY_HISTORY, HistoryCard, HistoryPage, SortOrder};

use crate::ExportError;

const PAGE_TITLE: &str = "Historial de Análisis";

const STYLE: &str = "\
body{font-family:Helvetica,Arial,sans-serif;background:#f8f9fa;color:#212529;margin:0;padding:2rem}
h1{color:#007bff;margin-top:0}
.sort{color:#6c757d;font-size:.9rem}
.history-grid{display:grid;grid-template-columns:repeat(auto-fill,minmax(280px,1fr));gap:1rem}
.history-card{background:#fff;border-radius:8px;box-shadow:0 1px 3px rgba(0,0,0,.1);padding:1rem}
.history-card-title{font-size:1.05rem;margin:0 0 .25rem;word-break:break-word}
.history-card-date{color:#6c757d;font-size:.85rem;margin:0 0 .5rem}
.history-card-preview{font-size:.9rem;margin:0}
.empty-state{color:#6c757d;text-align:center;padding:3rem}";

fn write_card(out: &mut String, card: &HistoryCard) {
    let _ = write!(
        out,
        r#"<div class="history-card" data-id="{id}">
<h3 class="history-card-title">{title}</h3>
<p class="history-card-date" title="{iso}">{date}</p>
<p class="history-card-preview">{preview}</p>
</div>
"#,
        id = card.id,
        title = card.file_name_html,
        iso = card.timestamp.to_rfc3339(),
        date = card.date_label,
        preview = card.preview_html,
    );
}

/// Render the history page as a self-contained HTML document.
pub fn history_page_html(page: &HistoryPage, sort: SortOrder) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "<!DOCTYPE html>\n<html lang=\"es\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{PAGE_TITLE} - HealthCheck</title>\n<style>\n{STYLE}\n</style>\n</head>\n<body>\n\
         <h1>{PAGE_TITLE}</h1>\n"
    );
    match page {
        HistoryPage::Empty => {
            let _ = writeln!(out, "<div class=\"empty-state\">{EMPTY_HISTORY}</div>");
        }
        HistoryPage::Cards(cards) => {
            let _ = writeln!(
                out,
                "<p class=\"sort\">{} análisis · orden: {sort}</p>\n<div class=\"history-grid\">",
                cards.len()
            );
            for card in cards {
                write_card(&mut out, card);
            }
            out.push_str("</div>\n");
        }
    }
    out.push_str("</body>\n</html>\n");
    out
}

/// Write [`history_page_html`] to `path`, creating parent directories.
pub fn export_history_page(page: &HistoryPage, sort: SortOrder, path: &Path) -> Result<(), ExportError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, history_page_html(page, sort))?;
    tracing::info!(path = %path.display(), cards = page.cards().len(), "wrote history page");
    Ok(())
}
