//! End-to-end exports to a temporary directory.

use healthcheck_core::AnalysisResult;
use healthcheck_reporting::{ExportFormat, ReportData, export_results, load_icon};

fn long_result() -> AnalysisResult {
    let paragraph = "La glucosa en ayunas es de 92 mg/dL, dentro del rango de referencia (70-100 mg/dL). \
                     El colesterol total está ligeramente elevado y conviene repetir el control en tres meses.";
    let body = vec![paragraph; 60].join("\n\n");
    AnalysisResult {
        resumen_ejecutivo: Some("**Resumen**: valores mayormente normales.\n- Glucosa normal\n- Colesterol alto".into()),
        interpretacion_conceptos: Some(body.clone()),
        resultados_simplificados: Some(body),
    }
}

fn page_count(path: &std::path::Path) -> usize {
    let bytes = std::fs::read(path).unwrap();
    assert!(bytes.starts_with(b"%PDF-"));
    lopdf::Document::load_mem(&bytes).unwrap().get_pages().len()
}

#[test]
fn long_pdf_spans_several_pages_with_icon() {
    let dir = tempfile::tempdir().unwrap();
    let icon_path = dir.path().join("warning.png");
    image::RgbaImage::from_pixel(16, 16, image::Rgba([255, 193, 7, 200]))
        .save(&icon_path)
        .unwrap();
    let icon = load_icon(Some(&icon_path));
    assert!(icon.is_some());

    let report = ReportData::new(Some("Hemograma completo.PDF"), long_result());
    let path = export_results(&report, ExportFormat::Pdf, dir.path(), icon.as_ref()).unwrap();

    assert_eq!(path.file_name().unwrap(), "Analisis_Hemograma completo.pdf");
    assert!(page_count(&path) >= 3);
}

#[test]
fn short_pdf_is_one_page_without_icon() {
    let dir = tempfile::tempdir().unwrap();
    let report = ReportData::new(
        Some("orina.pdf"),
        AnalysisResult {
            resumen_ejecutivo: Some("Sin hallazgos relevantes.".into()),
            ..Default::default()
        },
    );
    let path = export_results(&report, ExportFormat::Pdf, dir.path(), None).unwrap();
    assert_eq!(page_count(&path), 1);
}

#[test]
fn text_and_pdf_exports_coexist() {
    let dir = tempfile::tempdir().unwrap();
    let report = ReportData::new(Some("lab.pdf"), long_result());
    let txt = export_results(&report, ExportFormat::Text, dir.path(), None).unwrap();
    let pdf = export_results(&report, ExportFormat::Pdf, dir.path(), None).unwrap();
    assert_ne!(txt, pdf);

    let text = std::fs::read_to_string(&txt).unwrap();
    assert!(text.contains("**Resumen**"));
    assert!(text.contains("Archivo Analizado: lab.pdf"));
}
