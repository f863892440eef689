use std::fs::File;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use artistgrid_sheets::config::{
    Settings, DEFAULT_PUBLIC_URL, DEFAULT_SHEET_ID, DEFAULT_TRACKER_SHEET_ID, GOOGLE_SHEETS_URL,
};
use artistgrid_sheets::server::{self, AppState};
use artistgrid_sheets::view::Theme;
use artistgrid_sheets::worker::{CycleOutcome, UpdateWorker};
use clap::Parser;
use color_eyre::eyre::WrapErr;
use tokio::net::TcpListener;
use tokio::runtime::Runtime;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Mirrors the ArtistGrid tracker sheet and serves it as CSV, HTML and XLSX")]
struct Args {
    /// Address to serve the landing page and dataset files on
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:5000")]
    bind: SocketAddr,

    /// Directory holding the mirrored files and info/status.json
    #[arg(long, env = "DATA_DIR", default_value = ".")]
    data_dir: PathBuf,

    /// Google spreadsheet id to mirror
    #[arg(long, env = "SHEET_ID", default_value = DEFAULT_SHEET_ID)]
    sheet_id: String,

    /// Google spreadsheet id linked as "TrackerHub" on the landing page
    #[arg(long, env = "TRACKER_SHEET_ID", default_value = DEFAULT_TRACKER_SHEET_ID)]
    tracker_sheet_id: String,

    /// Public base url of this mirror, used for page links and archival
    #[arg(long, env = "PUBLIC_URL", default_value = DEFAULT_PUBLIC_URL)]
    public_url: String,

    /// Seconds between update cycles
    #[arg(long, env = "UPDATE_INTERVAL", default_value_t = 600)]
    interval: u64,

    /// Discord webhook receiving change summaries
    #[arg(long, env = "DISCORD_WEBHOOK_URL", hide_env_values = true)]
    discord_webhook_url: Option<String>,

    /// Extra csv rows (same header as artists.csv) for artists missing from the sheet
    #[arg(long, env = "MANUAL_ROWS")]
    manual_rows: Option<PathBuf>,

    /// Landing page styling
    #[arg(long, env = "THEME", value_enum, default_value_t = Theme::Card)]
    theme: Theme,

    /// Don't request Wayback Machine snapshots when the tracker changes
    #[arg(long)]
    no_archive: bool,

    /// Only serve the existing files, don't run the update loop
    #[arg(long, conflicts_with = "once")]
    no_update: bool,

    /// Run a single update cycle and exit without serving
    #[arg(long)]
    once: bool,

    /// How verbose the output should be, can be set up to 3 times. Has no effect if RUST_LOG is set
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to output log to
    #[arg(short, long)]
    log_path: Option<PathBuf>,
}

impl Args {
    fn settings(&self) -> Settings {
        Settings {
            data_dir: self.data_dir.clone(),
            sheets_base_url: GOOGLE_SHEETS_URL.to_owned(),
            sheet_id: self.sheet_id.clone(),
            tracker_sheet_id: self.tracker_sheet_id.clone(),
            public_url: self.public_url.clone(),
            discord_webhook_url: self.discord_webhook_url.clone(),
            manual_rows: self.manual_rows.clone(),
            interval: Duration::from_secs(self.interval),
            archive: !self.no_archive,
            theme: self.theme,
        }
    }
}

/// Longest wait for in-flight blocking requests once the worker and server stopped.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let old_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let backtrace = std::backtrace::Backtrace::force_capture();
        old_hook(panic_info);
        error!("Backtrace: {:#?}", backtrace);
    }));

    let args = Args::parse();

    tracing_init(&args)?;

    debug!(?args);

    let settings = Arc::new(args.settings());
    std::fs::create_dir_all(&settings.data_dir)
        .wrap_err_with(|| format!("failed to create data dir {}", settings.data_dir.display()))?;

    let runtime = Runtime::new()?;
    let result = runtime.block_on(run(args, settings));
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    result
}

async fn run(args: Args, settings: Arc<Settings>) -> color_eyre::Result<()> {
    if args.once {
        return once_result(UpdateWorker::new(settings).run_once().await);
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for ctrl-c, running until killed: {}", e);
            std::future::pending::<()>().await;
        }
        info!("received ctrl-c, shutting down");
        shutdown_tx.send(true).ok();
    });

    let worker = if args.no_update {
        info!("update loop disabled, serving existing files only");
        None
    } else {
        info!("starting background update worker");
        Some(tokio::spawn(UpdateWorker::new(settings.clone()).run(shutdown_rx.clone())))
    };

    let listener = TcpListener::bind(args.bind)
        .await
        .wrap_err_with(|| format!("failed to bind {}", args.bind))?;
    server::serve(listener, AppState::new(settings), shutdown_rx).await?;

    if let Some(worker) = worker {
        if let Err(e) = worker.await {
            error!("update worker panicked: {}", e);
        }
    }

    if let Some(log_path) = &args.log_path {
        info!("wrote logs to {}", log_path.display());
    }

    Ok(())
}

/// Exit status of `--once`: a skipped cycle counts as a failure.
fn once_result(outcome: Option<CycleOutcome>) -> color_eyre::Result<()> {
    match outcome {
        Some(CycleOutcome::Skipped) => color_eyre::eyre::bail!("update cycle skipped, dataset files are missing"),
        Some(_) => Ok(()),
        None => color_eyre::eyre::bail!("update cycle failed"),
    }
}

fn tracing_init(args: &Args) -> color_eyre::Result<()> {
    tracing_log::LogTracer::init()?;

    let env_filter = EnvFilter::builder()
        .with_default_directive(
            match args.verbose {
                0 => "artistgrid_sheets=info",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
            .parse()?,
        )
        .from_env_lossy();

    let stdout_log = tracing_subscriber::fmt::layer().with_filter(env_filter);

    let file_log = if let Some(log_path) = &args.log_path {
        let log_file = File::create(log_path).wrap_err_with(|| format!("failed to create {}", log_path.display()))?;
        let file_log = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(Mutex::new(log_file))
            .with_filter(tracing::level_filters::LevelFilter::TRACE);
        Some(file_log)
    } else {
        None
    };

    let subscriber = tracing_subscriber::registry().with(stdout_log).with(file_log);
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}
