use std::fmt;
use std::str::FromStr;

use chrono::Local;
use healthcheck_core::AnalysisResult;
use healthcheck_core::dates::report_timestamp;

/// Document formats a result can be exported to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Pdf,
    Text,
}

impl ExportFormat {
    pub fn all() -> &'static [ExportFormat] {
        &[ExportFormat::Pdf, ExportFormat::Text]
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Text => "Plain Text",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Text => "txt",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        if wanted == "text" {
            return Ok(Self::Text);
        }
        Self::all()
            .iter()
            .copied()
            .find(|f| f.extension() == wanted)
            .ok_or_else(|| {
                let expected: Vec<&str> = Self::all().iter().map(|f| f.extension()).collect();
                format!(
                    "unknown export format '{wanted}' (expected {})",
                    expected.join(" or ")
                )
            })
    }
}

/// One result prepared for export.
#[derive(Debug, Clone)]
pub struct ReportData {
    pub file_name: Option<String>,
    pub result: AnalysisResult,
    /// Generation time, already formatted (`dd/mm/YYYY, HH:MM:SS`).
    pub generated_at: String,
}

impl ReportData {
    /// Stamp the report with the current local time.
    pub fn new(file_name: Option<&str>, result: AnalysisResult) -> Self {
        Self {
            file_name: file_name
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
            result,
            generated_at: report_timestamp(&Local::now()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parses_aliases() {
        assert_eq!("PDF".parse::<ExportFormat>().unwrap(), ExportFormat::Pdf);
        assert_eq!("text".parse::<ExportFormat>().unwrap(), ExportFormat::Text);
        assert_eq!("txt".parse::<ExportFormat>().unwrap(), ExportFormat::Text);
        let err = "docx".parse::<ExportFormat>().unwrap_err();
        assert_eq!(err, "unknown export format 'docx' (expected pdf or txt)");
    }

    #[test]
    fn blank_file_name_is_absent() {
        let data = ReportData::new(Some("  "), AnalysisResult::default());
        assert!(data.file_name.is_none());
        assert_eq!(data.generated_at.len(), "19/10/2026, 14:05:09".len());
    }
}
