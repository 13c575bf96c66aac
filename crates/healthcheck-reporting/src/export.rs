use std::io::Write;
use std::path::{Path, PathBuf};

use healthcheck_core::text_utils::{NOT_AVAILABLE, strip_html_tags};

use crate::ExportError;
use crate::pdf::{self, Icon};
use crate::types::{ExportFormat, ReportData};

/// Base name used when the analysed file has no usable name.
const FALLBACK_NAME: &str = "resultado";

/// Export one result into `dir` and return the written path.
///
/// The file name is derived from the analysed file's name; an existing file
/// with the same name is overwritten.
pub fn export_results(
    report: &ReportData,
    format: ExportFormat,
    dir: &Path,
    icon: Option<&Icon>,
) -> Result<PathBuf, ExportError> {
    let content = match format {
        ExportFormat::Text => export_text(report).into_bytes(),
        ExportFormat::Pdf => pdf::render_pdf(report, icon)?,
    };

    std::fs::create_dir_all(dir)?;
    let path = dir.join(export_filename(report.file_name.as_deref(), format));
    let mut file = std::fs::File::create(&path)?;
    file.write_all(&content)?;
    tracing::info!(path = %path.display(), format = %format, bytes = content.len(), "exported analysis");
    Ok(path)
}

/// `Analisis_<name>.<ext>`: a trailing `.pdf` is dropped and characters that
/// cannot appear in a file name are replaced with `_`.
pub fn export_filename(file_name: Option<&str>, format: ExportFormat) -> String {
    let name = file_name.map(str::trim).unwrap_or_default();
    let stem = match name.len().checked_sub(4) {
        Some(cut) if name.is_char_boundary(cut) && name[cut..].eq_ignore_ascii_case(".pdf") => {
            &name[..cut]
        }
        _ => name,
    };
    let sanitized: String = stem
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let sanitized = sanitized.trim();
    let stem = if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        FALLBACK_NAME
    } else {
        sanitized
    };
    format!("Analisis_{}.{}", stem, format.extension())
}

/// Plain-text rendition of a result.
pub fn export_text(report: &ReportData) -> String {
    let result = &report.result;
    let mut out = String::from("Resultados del Análisis de HealthCheck\n");
    out.push_str(&"=".repeat(41));
    out.push_str("\n\n");
    out.push_str(&format!(
        "Archivo Analizado: {}\n",
        report.file_name.as_deref().unwrap_or(NOT_AVAILABLE)
    ));
    out.push_str(&format!("Fecha: {}\n\n", report.generated_at));

    let sections = [
        ("RESUMEN EJECUTIVO", result.summary()),
        ("INTERPRETACIÓN de CONCEPTOS", result.interpretation()),
        ("RESULTADOS SIMPLIFICADOS (PARA EL PACIENTE)", result.simplified()),
    ];
    for (title, body) in sections {
        out.push_str(&format!("--- {title} ---\n"));
        out.push_str(body.unwrap_or(NOT_AVAILABLE));
        out.push_str("\n\n");
    }

    out.push('\n');
    out.push_str(&"=".repeat(41));
    out.push('\n');
    out.push_str("AVISO IMPORTANTE:\n");
    out.push_str("Esta interpretación fue generada con IA y es solo para fines informativos.\n");
    out.push_str("NO reemplaza el diagnóstico de un médico profesional.\n");
    out.push_str("Consulte siempre a su médico.\n");

    strip_html_tags(&out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use healthcheck_core::AnalysisResult;

    // ── helpers ──────────────────────────────────────────────────────

    fn report(file_name: Option<&str>, result: AnalysisResult) -> ReportData {
        ReportData {
            file_name: file_name.map(str::to_string),
            result,
            generated_at: "19/10/2026, 14:05:09".to_string(),
        }
    }

    fn full_result() -> AnalysisResult {
        AnalysisResult {
            resumen_ejecutivo: Some("Valores <b>normales</b>".into()),
            interpretacion_conceptos: Some("**Glucosa**: 92 mg/dL".into()),
            resultados_simplificados: Some("Todo bien<br/>por ahora".into()),
        }
    }

    // ── file names ───────────────────────────────────────────────────

    #[test]
    fn filename_strips_pdf_extension() {
        assert_eq!(
            export_filename(Some("hemograma.pdf"), ExportFormat::Pdf),
            "Analisis_hemograma.pdf"
        );
        assert_eq!(
            export_filename(Some("HEMOGRAMA.PDF"), ExportFormat::Text),
            "Analisis_HEMOGRAMA.txt"
        );
    }

    #[test]
    fn filename_only_strips_trailing_extension() {
        assert_eq!(
            export_filename(Some("a.pdf.backup.pdf"), ExportFormat::Text),
            "Analisis_a.pdf.backup.txt"
        );
    }

    #[test]
    fn filename_fallback_and_sanitizing() {
        assert_eq!(export_filename(None, ExportFormat::Pdf), "Analisis_resultado.pdf");
        assert_eq!(export_filename(Some(".pdf"), ExportFormat::Pdf), "Analisis_resultado.pdf");
        assert_eq!(
            export_filename(Some("../etc/passwd"), ExportFormat::Text),
            "Analisis_.._etc_passwd.txt"
        );
        assert_eq!(
            export_filename(Some("año\n2026.pdf"), ExportFormat::Text),
            "Analisis_año_2026.txt"
        );
    }

    // ── text export ──────────────────────────────────────────────────

    #[test]
    fn text_has_all_sections_in_order() {
        let text = export_text(&report(Some("lab.pdf"), full_result()));
        let resumen = text.find("--- RESUMEN EJECUTIVO ---").unwrap();
        let interp = text.find("--- INTERPRETACIÓN de CONCEPTOS ---").unwrap();
        let simple = text
            .find("--- RESULTADOS SIMPLIFICADOS (PARA EL PACIENTE) ---")
            .unwrap();
        assert!(resumen < interp && interp < simple);
        assert!(text.starts_with("Resultados del Análisis de HealthCheck\n"));
        assert!(text.contains("Archivo Analizado: lab.pdf"));
        assert!(text.contains("Fecha: 19/10/2026, 14:05:09"));
        assert!(text.contains("AVISO IMPORTANTE:"));
        assert!(text.trim_end().ends_with("Consulte siempre a su médico."));
    }

    #[test]
    fn text_strips_html_tags() {
        let text = export_text(&report(Some("lab.pdf"), full_result()));
        assert!(text.contains("Valores normales"));
        assert!(text.contains("Todo bienpor ahora"));
        assert!(!text.contains('<'));
    }

    #[test]
    fn text_missing_summary_is_na() {
        let result = AnalysisResult {
            resumen_ejecutivo: None,
            ..full_result()
        };
        let text = export_text(&report(Some("lab.pdf"), result));
        assert!(text.contains("--- RESUMEN EJECUTIVO ---\nN/A\n"));
        assert!(!text.contains("<b>"));
    }

    // ── files on disk ────────────────────────────────────────────────

    #[test]
    fn export_writes_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = export_results(
            &report(Some("orina.pdf"), full_result()),
            ExportFormat::Text,
            dir.path(),
            None,
        )
        .unwrap();
        assert_eq!(path, dir.path().join("Analisis_orina.txt"));
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("Archivo Analizado: orina.pdf"));
    }

    #[test]
    fn export_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("exports").join("2026");
        let path = export_results(
            &report(None, AnalysisResult::default()),
            ExportFormat::Pdf,
            &nested,
            None,
        )
        .unwrap();
        assert_eq!(path, nested.join("Analisis_resultado.pdf"));
        assert!(std::fs::read(&path).unwrap().starts_with(b"%PDF-"));
    }
}
