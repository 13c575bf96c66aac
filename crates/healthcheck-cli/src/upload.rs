use std::path::Path;
use std::time::Duration;

use healthcheck_core::{AnalysisClient, ApiError, UploadOutcome};
use indicatif::{ProgressBar, ProgressStyle};

/// Progress messages shown while the request is in flight. They advance on a
/// timer; the server reports nothing until it answers.
const STAGES: [&str; 4] = [
    "Subiendo archivo...",
    "Extrayendo texto...",
    "Analizando con IA...",
    "Generando resultados...",
];
const STAGE_INTERVAL: Duration = Duration::from_millis(1500);

/// Upload `path` with a spinner on stderr. `show` false hides it, e.g. when
/// output is not a terminal.
pub async fn analyze_with_progress(
    client: &AnalysisClient,
    path: &Path,
    show: bool,
) -> Result<UploadOutcome, ApiError> {
    let bar = if show {
        ProgressBar::new_spinner()
    } else {
        ProgressBar::hidden()
    };
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_prefix(
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    );
    bar.enable_steady_tick(Duration::from_millis(120));

    let request = client.analyze_file(path);
    tokio::pin!(request);
    let mut ticker = tokio::time::interval(STAGE_INTERVAL);
    let mut stage = 0;

    let result = loop {
        tokio::select! {
            res = &mut request => break res,
            _ = ticker.tick() => {
                bar.set_message(STAGES[stage]);
                stage = (stage + 1).min(STAGES.len() - 1);
            }
        }
    };
    bar.finish_and_clear();
    result
}

/// User-facing explanation of an upload failure.
pub fn describe_error(err: &ApiError, endpoint: &str) -> String {
    match err {
        ApiError::InvalidFile(msg) => format!("Archivo no válido: {msg}"),
        ApiError::Io(e) => format!("No se pudo leer el archivo: {e}"),
        ApiError::Transport(e) if e.is_timeout() => {
            "El servidor tardó demasiado en responder.".to_string()
        }
        ApiError::Transport(e) if e.is_connect() => {
            format!("No se pudo conectar con el servidor de análisis ({endpoint}).")
        }
        ApiError::Transport(e) => format!("Error de red: {e}"),
        ApiError::Status { code, detail } => {
            format!("El servidor respondió con un error ({code}): {detail}")
        }
        ApiError::Decode(msg) => format!("Respuesta inesperada del servidor: {msg}"),
        ApiError::Rejected(msg) => format!("El documento no es válido: {msg}"),
    }
}
