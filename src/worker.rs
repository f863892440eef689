use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{error, info, instrument, warn};

use crate::archive::Archiver;
use crate::config::{Settings, HTML_FILENAME};
use crate::csv::{read_snapshot, Snapshot};
use crate::diff::{detect_changes, summary};
use crate::download;
use crate::notify::DiscordNotifier;
use crate::sheet::generate_csv;
use crate::status::{hash_file, write_status, FileHashes};
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// One of the dataset files is missing, nothing was recorded.
    Skipped,
    FirstRun,
    Unchanged,
    /// The html changed but the parsed rows did not.
    NoDifferences,
    Changed { changes: usize, archived: bool },
}

/// Periodically mirrors the sheet and reports changes.
pub struct UpdateWorker {
    settings: Arc<Settings>,
    agent: ureq::Agent,
    notifier: DiscordNotifier,
    archiver: Option<Archiver>,
    last_html_hash: Option<String>,
    last_snapshot: Snapshot,
}

impl UpdateWorker {
    pub fn new(settings: Arc<Settings>) -> Self {
        let notifier = DiscordNotifier::new(settings.discord_webhook_url.clone());
        let archiver = settings.archive.then(|| Archiver::new(settings.archive_urls()));
        Self {
            settings,
            agent: download::agent(),
            notifier,
            archiver,
            last_html_hash: None,
            last_snapshot: Snapshot::new(),
        }
    }

    pub fn with_archiver(mut self, archiver: Archiver) -> Self {
        self.archiver = Some(archiver);
        self
    }

    /// Runs cycles until `shutdown` flips to `true` or its sender goes away.
    /// A cycle in progress is abandoned at its next await point.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                _ = self.run_once() => {}
                _ = stopped(&mut shutdown) => {
                    warn!("shutdown requested, abandoning update cycle");
                    break;
                }
            }

            info!("sleeping for {} seconds", self.settings.interval.as_secs());
            tokio::select! {
                _ = tokio::time::sleep(self.settings.interval) => {}
                _ = stopped(&mut shutdown) => break,
            }
        }
        info!("update worker stopped");
    }

    /// One full cycle. Errors are logged, never propagated.
    pub async fn run_once(&mut self) -> Option<CycleOutcome> {
        info!("--- starting update cycle ---");
        self.fetch().await;

        match self.process().await {
            Ok(outcome) => {
                info!(?outcome, "--- update cycle finished ---");
                Some(outcome)
            }
            Err(e) => {
                error!("unexpected error in update cycle: {}", e);
                None
            }
        }
    }

    /// Downloads the exports. A failed download leaves the previous copy in place.
    async fn fetch(&self) {
        let settings = self.settings.clone();
        let agent = self.agent.clone();
        let result = tokio::task::spawn_blocking(move || {
            if let Err(e) = download::download_sheet_html(&agent, &settings) {
                error!("failed to fetch {}: {}", HTML_FILENAME, e);
            }
            if let Err(e) = download::download_xlsx(&agent, &settings) {
                error!("failed to fetch xlsx export: {}", e);
            }
        })
        .await;

        if let Err(e) = result {
            error!("download task failed: {}", e);
        }
    }

    /// Everything after the downloads: csv generation, change detection,
    /// notification, archival and the status file.
    #[instrument(skip_all)]
    pub async fn process(&mut self) -> Result<CycleOutcome> {
        let settings = self.settings.clone();
        let prepared = tokio::task::spawn_blocking(move || prepare(&settings)).await??;

        let Some((hashes, snapshot)) = prepared else {
            warn!("one or more files are missing after download/parse, skipping this cycle");
            return Ok(CycleOutcome::Skipped);
        };

        let mut archived = false;
        let outcome = match &self.last_html_hash {
            None => {
                info!("first run, storing initial file hashes");
                CycleOutcome::FirstRun
            }
            Some(last) if *last == hashes.html => {
                info!("{} is unchanged", HTML_FILENAME);
                CycleOutcome::Unchanged
            }
            Some(_) => {
                info!("{} has changed, checking for data differences", HTML_FILENAME);
                let changes = detect_changes(&self.last_snapshot, &snapshot);
                if changes.is_empty() {
                    info!("html hash changed, but no data differences found");
                    CycleOutcome::NoDifferences
                } else {
                    info!(count = changes.len(), "tracker update detected");
                    self.notify(summary(&changes)).await;
                    if let Some(archiver) = &self.archiver {
                        archiver.archive_all().await;
                        archived = true;
                    }
                    CycleOutcome::Changed {
                        changes: changes.len(),
                        archived,
                    }
                }
            }
        };

        let data_dir = self.settings.data_dir.clone();
        let status_hashes = hashes.clone();
        tokio::task::spawn_blocking(move || write_status(&data_dir, &status_hashes, archived, Utc::now())).await??;

        self.last_html_hash = Some(hashes.html);
        self.last_snapshot = snapshot;
        Ok(outcome)
    }

    async fn notify(&self, message: String) {
        let notifier = self.notifier.clone();
        match tokio::task::spawn_blocking(move || notifier.send(&message)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => error!("failed to send discord notification: {}", e),
            Err(e) => error!("notification task failed: {}", e),
        }
    }
}

async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Regenerates the csv, then hashes the three files and loads the snapshot.
/// `None` when a file is missing.
fn prepare(settings: &Settings) -> Result<Option<(FileHashes, Snapshot)>> {
    if let Err(e) = generate_csv(&settings.html_path(), &settings.csv_path(), settings.manual_rows.as_deref()) {
        error!("failed to generate csv: {}", e);
    }

    let paths = [settings.html_path(), settings.csv_path(), settings.xlsx_path()];
    if !paths.iter().all(|p| p.exists()) {
        return Ok(None);
    }

    let hashes = FileHashes {
        html: hash_file(&paths[0])?,
        csv: hash_file(&paths[1])?,
        xlsx: hash_file(&paths[2])?,
    };
    let snapshot = read_snapshot(&paths[1])?;

    Ok(Some((hashes, snapshot)))
}
