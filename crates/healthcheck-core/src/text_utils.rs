//! Text helpers shared by the history view, results view and exporters.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Character budget of the summary preview on history cards.
pub const PREVIEW_MAX_CHARS: usize = 150;

/// Placeholder for result sections the analysis did not produce.
pub const NOT_AVAILABLE: &str = "N/A";

static LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").unwrap());
static PREVIEW_MARKERS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[*_~`#]").unwrap());
static NEWLINE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n+").unwrap());
static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*([^*]+)\*\*").unwrap());
static ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*([^*]+)\*").unwrap());
static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"#{1,6}\s*").unwrap());
static LIST_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[-*+]\s+").unwrap());
static NUMBERED_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\d+\.\s+").unwrap());
static INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]+)`").unwrap());
static EXCESS_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());
static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static JSON_FIELD_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""(?:interpretacionConceptos|resultadosSimplificados|resumenEjecutivo)"\s*:\s*""#)
        .unwrap()
});
static JSON_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\{\s*").unwrap());
static JSON_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\}\s*$").unwrap());
static JSON_TRAILING_QUOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"",?\s*$"#).unwrap());

/// Flatten markdown into a single line of plain text: emphasis, heading and
/// code markers dropped, links reduced to their text, newlines to spaces.
pub fn strip_markdown(text: &str) -> String {
    let text = PREVIEW_MARKERS.replace_all(text, "");
    let text = LINK.replace_all(&text, "$1");
    let text = NEWLINE_RUNS.replace_all(&text, " ");
    text.trim().to_string()
}

/// Cut `text` to at most `max_chars` characters, appending `...` when cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

/// Card preview of an executive summary.
pub fn summary_preview(summary: &str) -> String {
    truncate_chars(&strip_markdown(summary), PREVIEW_MAX_CHARS)
}

pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

pub fn strip_html_tags(s: &str) -> String {
    HTML_TAG.replace_all(s, "").into_owned()
}

/// Markdown reduced to styled plain text for document export. Absent text
/// becomes [`NOT_AVAILABLE`].
pub fn clean_markdown(text: Option<&str>) -> String {
    let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
        return NOT_AVAILABLE.to_string();
    };
    let text = text.replace("\\n", "\n").replace("\\r", "");
    let text = BOLD.replace_all(&text, "$1");
    let text = ITALIC.replace_all(&text, "$1");
    let text = HEADING.replace_all(&text, "");
    let text = LIST_MARKER.replace_all(&text, "• ");
    let text = NUMBERED_MARKER.replace_all(&text, "");
    let text = LINK.replace_all(&text, "$1");
    let text = INLINE_CODE.replace_all(&text, "$1");
    let text = EXCESS_NEWLINES.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Undo the escaping the model sometimes leaves in its answers before the
/// text is handed to a markdown renderer.
///
/// Literal `\n` sequences become newlines, `\"` becomes `"`, line endings are
/// normalised, and a section that still looks like a raw JSON object is
/// unwrapped.
pub fn normalize_markdown(text: &str) -> String {
    let cleaned = text
        .replace("\\n", "\n")
        .replace("\\\"", "\"")
        .replace("\r\n", "\n")
        .replace('\r', "\n");

    if !(cleaned.trim_start().starts_with('{') || cleaned.contains("\"interpretacionConceptos\"")) {
        return cleaned;
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(&cleaned) {
        let pick = ["resultadosSimplificados", "interpretacionConceptos"]
            .iter()
            .find_map(|k| value.get(*k).and_then(|v| v.as_str()).filter(|s| !s.is_empty()));
        return pick.map(str::to_string).unwrap_or(cleaned);
    }

    let stripped = JSON_OPEN.replace(&cleaned, "");
    let stripped = JSON_CLOSE.replace(&stripped, "");
    let stripped = JSON_FIELD_PREFIX.replace_all(&stripped, "");
    JSON_TRAILING_QUOTE.replace_all(&stripped, "").into_owned()
}

/// Comparison key for file names: case-insensitive and accent-insensitive,
/// so `Árbol.pdf` sorts with `arbol.pdf`.
pub fn sort_key(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_strips_markers_and_links() {
        assert_eq!(
            summary_preview("**Bold** text with [a link](http://x)"),
            "Bold text with a link"
        );
    }

    #[test]
    fn preview_collapses_newlines_and_headings() {
        assert_eq!(
            strip_markdown("## Resumen\n\nHemoglobina `normal`\n"),
            "Resumen Hemoglobina normal"
        );
    }

    #[test]
    fn preview_truncates_at_budget() {
        let long = "a".repeat(200);
        let preview = summary_preview(&long);
        assert_eq!(preview.chars().count(), PREVIEW_MAX_CHARS + 3);
        assert!(preview.ends_with("..."));

        let exact = "b".repeat(PREVIEW_MAX_CHARS);
        assert_eq!(summary_preview(&exact), exact);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("ñandú", 3), "ñan...");
        assert_eq!(truncate_chars("ñandú", 5), "ñandú");
    }

    #[test]
    fn escape_html_neutralises_markup() {
        assert_eq!(
            escape_html(r#"<img src=x onerror="alert('1')">&"#),
            "&lt;img src=x onerror=&quot;alert(&#39;1&#39;)&quot;&gt;&amp;"
        );
    }

    #[test]
    fn strip_html_tags_keeps_text() {
        assert_eq!(strip_html_tags("<b>Alto</b> riesgo<br/>"), "Alto riesgo");
    }

    #[test]
    fn clean_markdown_absent_is_placeholder() {
        assert_eq!(clean_markdown(None), "N/A");
        assert_eq!(clean_markdown(Some("  ")), "N/A");
    }

    #[test]
    fn clean_markdown_reduces_syntax() {
        let md = "### Hallazgos\\n- **Glucosa**: *alta*\n1. Ver [guía](http://g)\n\n\n\nUsar `ayuno`";
        assert_eq!(
            clean_markdown(Some(md)),
            "Hallazgos\n• Glucosa: alta\nVer guía\n\nUsar ayuno"
        );
    }

    #[test]
    fn normalize_unescapes_literal_newlines() {
        assert_eq!(normalize_markdown("uno\\ndos\r\ntres"), "uno\ndos\ntres");
    }

    #[test]
    fn normalize_unwraps_json_section() {
        let raw = r#"{"interpretacionConceptos": "tecnico", "resultadosSimplificados": "simple"}"#;
        assert_eq!(normalize_markdown(raw), "simple");
    }

    #[test]
    fn normalize_strips_broken_json_wrapper() {
        let raw = r#"{ "resultadosSimplificados": "texto sin cerrar"#;
        assert_eq!(normalize_markdown(raw), "texto sin cerrar");
    }

    #[test]
    fn sort_key_folds_case_and_accents() {
        assert_eq!(sort_key("Árbol.PDF"), "arbol.pdf");
        assert_eq!(sort_key("examen"), sort_key("EXÁMEN"));
    }
}
