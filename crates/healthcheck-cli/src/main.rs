use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use healthcheck_core::config_file::{self, ConfigFile};
use healthcheck_core::{
    ActionOutcome, AnalysisClient, Config, HistoryController, HistoryPage, HistoryStore,
    MemoryStorage, Navigation, SessionStage, SortOrder, SqliteStorage, open_results,
};
use healthcheck_reporting::{ExportFormat, ReportData, export_history_page, export_results, load_icon};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

mod output;
mod prompt;
mod upload;

use output::ColorMode;
use prompt::TerminalUi;

const MSG_CANCELLED: &str = "Operación cancelada.";

/// HealthCheck - AI-assisted interpretation of lab report PDFs
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Analysis API base URL (overrides HEALTHCHECK_API_URL and the config file)
    #[arg(long, global = true)]
    api_url: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload one or more lab report PDFs for analysis
    Analyze {
        /// PDF files to analyse, processed one after another
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Export each result after showing it (pdf or txt)
        #[arg(long)]
        export: Option<ExportFormat>,

        /// Directory for exported files
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Browse and manage the local analysis history
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Export a stored analysis to PDF or plain text
    Export {
        /// History entry id
        id: i64,

        /// Output format (pdf or txt)
        #[arg(long, default_value = "pdf")]
        format: ExportFormat,

        /// Directory for the exported file
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum HistoryAction {
    /// List stored analyses
    List {
        /// date-desc, date-asc, name-asc or name-desc
        #[arg(long)]
        sort: Option<SortOrder>,

        /// Also write the list as an HTML page
        #[arg(long)]
        html: Option<PathBuf>,
    },

    /// Show a stored analysis
    View {
        id: i64,

        /// Export the result after showing it (pdf or txt)
        #[arg(long)]
        export: Option<ExportFormat>,

        /// Directory for the exported file
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Delete one stored analysis
    Delete {
        id: i64,

        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },

    /// Delete the whole history
    Clear {
        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the resolved configuration
    Show,
    /// Write a config file with the default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Resolved settings shared by every command.
struct App {
    config: Config,
    color: ColorMode,
}

impl App {
    fn open_store(&self) -> anyhow::Result<HistoryStore<SqliteStorage>> {
        let storage = SqliteStorage::open(&self.config.storage_path).with_context(|| {
            format!(
                "failed to open history storage at {}",
                self.config.storage_path.display()
            )
        })?;
        Ok(HistoryStore::new(storage, self.config.history.clone()))
    }

    fn export(
        &self,
        report: &ReportData,
        format: ExportFormat,
        output_dir: Option<&Path>,
    ) -> anyhow::Result<PathBuf> {
        let dir = output_dir.unwrap_or(self.config.export_dir.as_path());
        let icon = match format {
            ExportFormat::Pdf => load_icon(self.config.warning_icon.as_deref()),
            ExportFormat::Text => None,
        };
        export_results(report, format, dir, icon.as_ref())
            .with_context(|| format!("failed to export {} to {}", format.label(), dir.display()))
    }
}

fn init_logging(log_file: Option<&Path>) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("healthcheck=warn"));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let name = path
                .file_name()
                .with_context(|| format!("--log-file {} does not name a file", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(guard)
}

/// Resolve configuration: CLI flags > env vars > config file > defaults.
fn resolve(cli: &Cli) -> (App, ConfigFile) {
    let file = config_file::load_config();
    let mut config = Config::from_file(&file).apply_env();
    if let Some(url) = &cli.api_url {
        config.api_base_url = url.trim_end_matches('/').to_string();
    }
    let color_pref = file.display.as_ref().and_then(|d| d.color).unwrap_or(true);
    let color = ColorMode(!cli.no_color && color_pref && std::io::stdout().is_terminal());
    (App { config, color }, file)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let _log_guard = init_logging(cli.log_file.as_deref())?;
    let (app, file) = resolve(&cli);
    tracing::debug!(api = %app.config.api_base_url, storage = %app.config.storage_path.display(), "configuration resolved");

    match cli.command {
        Command::Analyze {
            files,
            export,
            output_dir,
        } => analyze(&app, &files, export, output_dir.as_deref()).await,
        Command::History { action } => match action {
            HistoryAction::List { sort, html } => history_list(&app, sort, html.as_deref()),
            HistoryAction::View {
                id,
                export,
                output_dir,
            } => history_view(&app, id, export, output_dir.as_deref()),
            HistoryAction::Delete { id, yes } => history_delete(&app, id, yes),
            HistoryAction::Clear { yes } => history_clear(&app, yes),
        },
        Command::Export {
            id,
            format,
            output_dir,
        } => export_stored(&app, id, format, output_dir.as_deref()),
        Command::Config { action } => match action {
            ConfigAction::Show => config_show(&app, &file),
            ConfigAction::Init { force } => config_init(force),
        },
    }
}

async fn analyze(
    app: &App,
    files: &[PathBuf],
    export: Option<ExportFormat>,
    output_dir: Option<&Path>,
) -> anyhow::Result<()> {
    let client = AnalysisClient::from_config(&app.config);
    let store = app.open_store()?;
    let session = SessionStage::new(MemoryStorage::new());
    let mut ui = TerminalUi::new(app.color, false);
    let mut out = std::io::stdout();
    let mut err = std::io::stderr();
    let show_spinner = std::io::stderr().is_terminal();

    let mut failed = 0;
    for (i, path) in files.iter().enumerate() {
        if files.len() > 1 {
            output::print_file_header(&mut out, i + 1, files.len(), path, app.color)?;
        }

        let outcome = match upload::analyze_with_progress(&client, path, show_spinner).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "analysis failed");
                output::print_error(&mut err, &upload::describe_error(&e, &client.endpoint()), app.color)?;
                failed += 1;
                continue;
            }
        };
        if let Some(message) = &outcome.message {
            tracing::info!(%message, "server message");
        }

        if let Err(e) = session.stage_upload(&outcome.file_name, &outcome.result, &outcome.stats()) {
            tracing::error!(error = %e, "failed to stage result");
            output::print_error(&mut err, healthcheck_core::results::MSG_DISPLAY_FAILED, app.color)?;
            failed += 1;
            continue;
        }
        let page = match open_results(&session, &store, &mut ui) {
            Ok(page) => page,
            Err(e) => {
                output::print_error(&mut err, &e.to_string(), app.color)?;
                failed += 1;
                continue;
            }
        };
        output::print_results(&mut out, &page, app.color)?;

        if let Some(format) = export {
            let report = ReportData::new(page.file_name.as_deref(), page.result.clone());
            if !export_report(app, &report, format, output_dir, &mut out, &mut err)? {
                failed += 1;
                continue;
            }
        }
        out.flush()?;
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} file(s) could not be analysed", files.len());
    }
    Ok(())
}

/// Export one shown result, reporting a failure on `err` instead of
/// returning it so a batch can carry on. Returns whether the file was written.
fn export_report(
    app: &App,
    report: &ReportData,
    format: ExportFormat,
    output_dir: Option<&Path>,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> std::io::Result<bool> {
    match app.export(report, format, output_dir) {
        Ok(path) => {
            output::print_exported(out, &path, app.color)?;
            Ok(true)
        }
        Err(e) => {
            tracing::warn!(file_name = ?report.file_name, error = %e, "export failed");
            output::print_error(err, &format!("{e:#}"), app.color)?;
            Ok(false)
        }
    }
}

fn history_list(app: &App, sort: Option<SortOrder>, html: Option<&Path>) -> anyhow::Result<()> {
    let store = app.open_store()?;
    let session = SessionStage::new(MemoryStorage::new());
    let controller = HistoryController::new(&store, &session, sort.unwrap_or(app.config.default_sort));
    let page = controller.load();

    let mut out = std::io::stdout();
    output::print_history(&mut out, &page, controller.sort(), app.color)?;
    if let Some(path) = html {
        export_history_page(&page, controller.sort(), path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        output::print_exported(&mut out, path, app.color)?;
    }
    Ok(())
}

fn history_view(
    app: &App,
    id: i64,
    export: Option<ExportFormat>,
    output_dir: Option<&Path>,
) -> anyhow::Result<()> {
    let store = app.open_store()?;
    let session = SessionStage::new(MemoryStorage::new());
    let controller = HistoryController::new(&store, &session, app.config.default_sort);
    let mut ui = TerminalUi::new(app.color, false);

    let Some(Navigation::Results) = controller.view(id, &mut ui) else {
        anyhow::bail!("history entry {id} could not be opened");
    };
    let page = open_results(&session, &store, &mut ui)?;
    let mut out = std::io::stdout();
    output::print_results(&mut out, &page, app.color)?;

    if let Some(format) = export {
        let report = ReportData::new(page.file_name.as_deref(), page.result.clone());
        let path = app.export(&report, format, output_dir)?;
        output::print_exported(&mut out, &path, app.color)?;
    }
    Ok(())
}

fn history_delete(app: &App, id: i64, yes: bool) -> anyhow::Result<()> {
    let store = app.open_store()?;
    if store.get_by_id(id).is_none() {
        anyhow::bail!("no history entry with id {id}");
    }
    let session = SessionStage::new(MemoryStorage::new());
    let controller = HistoryController::new(&store, &session, app.config.default_sort);
    let mut ui = TerminalUi::new(app.color, yes);

    let outcome = controller.delete(id, &mut ui);
    let mut out = std::io::stdout();
    report_outcome(&mut out, &outcome, "Análisis eliminado del historial.", app.color)?;
    output::print_history(&mut out, outcome.page(), controller.sort(), app.color)?;
    match outcome {
        ActionOutcome::Failed(_) => anyhow::bail!("history entry {id} could not be deleted"),
        _ => Ok(()),
    }
}

fn history_clear(app: &App, yes: bool) -> anyhow::Result<()> {
    let store = app.open_store()?;
    let session = SessionStage::new(MemoryStorage::new());
    let controller = HistoryController::new(&store, &session, app.config.default_sort);
    let mut out = std::io::stdout();

    // Nothing to clear: the action is not offered.
    if controller.load().is_empty() {
        output::print_history(&mut out, &HistoryPage::Empty, controller.sort(), app.color)?;
        return Ok(());
    }

    let mut ui = TerminalUi::new(app.color, yes);
    let outcome = controller.clear_all(&mut ui);
    report_outcome(&mut out, &outcome, "Historial eliminado.", app.color)?;
    match outcome {
        ActionOutcome::Done(_) => Ok(()),
        ActionOutcome::Cancelled(page) => {
            output::print_history(&mut out, &page, controller.sort(), app.color)?;
            Ok(())
        }
        ActionOutcome::Failed(page) => {
            output::print_history(&mut out, &page, controller.sort(), app.color)?;
            anyhow::bail!("history could not be cleared")
        }
    }
}

/// One status line for a history mutation. Failures were already announced
/// through the prompt's notice, so they print nothing here.
fn report_outcome(
    out: &mut dyn Write,
    outcome: &ActionOutcome,
    done: &str,
    color: ColorMode,
) -> std::io::Result<()> {
    match outcome {
        ActionOutcome::Done(_) => output::print_success(out, done, color),
        ActionOutcome::Cancelled(_) => output::print_notice(out, MSG_CANCELLED, color),
        ActionOutcome::Failed(_) => Ok(()),
    }
}

fn export_stored(
    app: &App,
    id: i64,
    format: ExportFormat,
    output_dir: Option<&Path>,
) -> anyhow::Result<()> {
    let store = app.open_store()?;
    let record = store
        .get_by_id(id)
        .with_context(|| format!("no history entry with id {id}"))?;
    let report = ReportData::new(Some(&record.file_name), record.result);
    let path = app.export(&report, format, output_dir)?;
    output::print_exported(&mut std::io::stdout(), &path, app.color)?;
    Ok(())
}

fn config_show(app: &App, file: &ConfigFile) -> anyhow::Result<()> {
    let color_pref = file.display.as_ref().and_then(|d| d.color).unwrap_or(true);
    let snapshot = config_file::snapshot(&app.config, color_pref);
    let mut out = std::io::stdout();
    match config_file::config_path() {
        Some(path) if path.exists() => writeln!(out, "# {}", path.display())?,
        Some(path) => writeln!(out, "# {} (not created; built-in defaults)", path.display())?,
        None => writeln!(out, "# no platform config directory")?,
    }
    if Path::new(config_file::LOCAL_CONFIG_FILE).exists() {
        writeln!(out, "# overridden by ./{}", config_file::LOCAL_CONFIG_FILE)?;
    }
    write!(out, "{}", toml::to_string_pretty(&snapshot)?)?;
    Ok(())
}

fn config_init(force: bool) -> anyhow::Result<()> {
    let path = config_file::config_path().context("could not determine config directory")?;
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    config_file::save_to_path(&config_file::starter_config(), &path)?;
    println!("Config written to {}", path.display());
    Ok(())
}
