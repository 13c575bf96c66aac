//! The results view: consume a staged result, prepare it for display and
//! record it in history when it came from a fresh upload.

use thiserror::Error;

use crate::history::HistoryStore;
use crate::session::{ProcessingStats, SessionError, SessionStage};
use crate::storage::Storage;
use crate::text_utils::normalize_markdown;
use crate::view::Interaction;
use crate::{AnalysisRecord, AnalysisResult, Clock};

pub const DEFAULT_TITLE: &str = "Resultados del Análisis";
pub const UNNAMED_FILE: &str = "Sin nombre";
pub const NO_INTERPRETATION: &str = "No se proporcionó interpretación.";
pub const NO_SIMPLIFIED: &str = "No se proporcionaron resultados simplificados.";
pub const MSG_NO_DATA: &str = "No se encontraron datos de análisis.";
pub const MSG_DISPLAY_FAILED: &str = "Hubo un error al mostrar los resultados. Inténtalo de nuevo.";
pub const MSG_SAVE_FAILED: &str = "No se pudo guardar el análisis en el historial.";

#[derive(Error, Debug)]
pub enum ResultsError {
    #[error("No se encontraron datos de análisis.")]
    NoData,
    #[error("staged result could not be read: {0}")]
    Session(#[from] SessionError),
}

/// Everything the results screen shows. Section bodies are markdown,
/// already normalised.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultsPage {
    pub title: String,
    pub file_name: Option<String>,
    pub stats: ProcessingStats,
    /// `None` hides the summary block.
    pub summary: Option<String>,
    pub interpretation: String,
    pub simplified: String,
    /// The untouched payload, for export.
    pub result: AnalysisResult,
    /// The history entry written for this view, if any.
    pub saved: Option<AnalysisRecord>,
}

impl ResultsPage {
    fn build(file_name: Option<String>, stats: ProcessingStats, result: AnalysisResult) -> Self {
        let title = match &file_name {
            Some(name) => format!("Resultados de: {name}"),
            None => DEFAULT_TITLE.to_string(),
        };
        Self {
            title,
            file_name,
            stats,
            summary: result.summary().map(normalize_markdown),
            interpretation: normalize_markdown(result.interpretation().unwrap_or(NO_INTERPRETATION)),
            simplified: normalize_markdown(result.simplified().unwrap_or(NO_SIMPLIFIED)),
            result,
            saved: None,
        }
    }
}

/// Open the results view from whatever is staged in the session.
///
/// A result staged by an upload is inserted into history; one staged by the
/// history view is not. A failed history write is reported through `ui` but
/// the results are still shown.
pub fn open_results<T, S, C>(
    session: &SessionStage<T>,
    store: &HistoryStore<S, C>,
    ui: &mut dyn Interaction,
) -> Result<ResultsPage, ResultsError>
where
    T: Storage,
    S: Storage,
    C: Clock,
{
    let staged = match session.take() {
        Ok(Some(staged)) => staged,
        Ok(None) => {
            tracing::warn!("results view opened with nothing staged");
            return Err(ResultsError::NoData);
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to read staged result");
            ui.notify(MSG_DISPLAY_FAILED);
            return Err(e.into());
        }
    };

    let mut page = ResultsPage::build(staged.file_name, staged.stats, staged.result);
    if staged.from_history {
        tracing::debug!("result came from history, not saving again");
        return Ok(page);
    }

    let name = page.file_name.as_deref().unwrap_or(UNNAMED_FILE);
    match store.insert(name, page.result.clone()) {
        Ok(record) => page.saved = Some(record),
        Err(_) => ui.notify(MSG_SAVE_FAILED),
    }
    Ok(page)
}
