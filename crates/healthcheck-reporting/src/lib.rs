pub mod export;
pub mod history_page;
pub mod pdf;
pub mod types;

pub use export::{export_filename, export_results, export_text};
pub use history_page::{export_history_page, history_page_html};
pub use pdf::{Icon, load_icon, render_pdf};
pub use types::{ExportFormat, ReportData};

#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to build PDF: {0}")]
    Pdf(#[from] lopdf::Error),
}
