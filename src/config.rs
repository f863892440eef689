use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::view::Theme;

pub const HTML_FILENAME: &str = "Artists.html";
pub const CSV_FILENAME: &str = "artists.csv";
pub const XLSX_FILENAME: &str = "artists.xlsx";
pub const ZIP_FILENAME: &str = "Trackerhub.zip";

pub const STATUS_DIR: &str = "info";
pub const STATUS_FILENAME: &str = "status.json";

pub const GOOGLE_SHEETS_URL: &str = "https://docs.google.com/spreadsheets/d";

/// Sheet the exports are fetched from.
pub const DEFAULT_SHEET_ID: &str = "1S6WwM05O277npQbaiNk-jZlXK3TdooSyWtqaWUvAI78";
/// Public TrackerHub sheet linked from the landing page.
pub const DEFAULT_TRACKER_SHEET_ID: &str = "1zoOIaNbBvfuL3sS3824acpqGxOdSZSIHM8-nI9C-Vfc";
pub const DEFAULT_PUBLIC_URL: &str = "https://sheets.artistgrid.cx";
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(600);

pub const REPOSITORY_URL: &str = "https://github.com/ArtistGrid/Sheets";

/// Also snapshotted whenever the tracker changes, next to our own public files.
pub const MAIN_SITE_URL: &str = "https://artistgrid.cx";

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/115.0 Safari/537.36";

/// Sheet tabs listed in the artist column that are not artists.
pub const EXCLUDED_NAMES: &[&str] = &[
    "AI Models",
    "🎹 BPM & Key Tracker",
    "🎹 Worst Comps & Edits",
    "Allegations",
    "Rap Disses Timeline",
    "Underground Artists",
];

#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub sheets_base_url: String,
    pub sheet_id: String,
    pub tracker_sheet_id: String,
    pub public_url: String,
    pub discord_webhook_url: Option<String>,
    pub manual_rows: Option<PathBuf>,
    pub interval: Duration,
    pub archive: bool,
    pub theme: Theme,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            sheets_base_url: GOOGLE_SHEETS_URL.to_owned(),
            sheet_id: DEFAULT_SHEET_ID.to_owned(),
            tracker_sheet_id: DEFAULT_TRACKER_SHEET_ID.to_owned(),
            public_url: DEFAULT_PUBLIC_URL.to_owned(),
            discord_webhook_url: None,
            manual_rows: None,
            interval: DEFAULT_INTERVAL,
            archive: true,
            theme: Theme::default(),
        }
    }
}

impl Settings {
    fn spreadsheet_url(&self, id: &str) -> String {
        format!("{}/{}", self.sheets_base_url.trim_end_matches('/'), id)
    }

    pub fn sheet_url(&self) -> String {
        self.spreadsheet_url(&self.sheet_id)
    }

    /// Read-only view of the tracker sheet, the one linked from the landing page.
    pub fn tracker_view_url(&self) -> String {
        format!("{}/htmlview", self.spreadsheet_url(&self.tracker_sheet_id))
    }

    pub fn zip_export_url(&self) -> String {
        format!("{}/export?format=zip", self.sheet_url())
    }

    pub fn xlsx_export_url(&self) -> String {
        format!("{}/export?format=xlsx", self.sheet_url())
    }

    pub fn public_file_url(&self, file_name: &str) -> String {
        format!("{}/{}", self.public_url.trim_end_matches('/'), file_name)
    }

    pub fn archive_urls(&self) -> Vec<String> {
        vec![
            self.public_file_url(""),
            self.public_file_url("artists.html"),
            self.public_file_url("artists.csv"),
            self.public_file_url("artists.xlsx"),
            MAIN_SITE_URL.to_owned(),
        ]
    }

    pub fn html_path(&self) -> PathBuf {
        self.data_dir.join(HTML_FILENAME)
    }

    pub fn csv_path(&self) -> PathBuf {
        self.data_dir.join(CSV_FILENAME)
    }

    pub fn xlsx_path(&self) -> PathBuf {
        self.data_dir.join(XLSX_FILENAME)
    }

    pub fn zip_path(&self) -> PathBuf {
        self.data_dir.join(ZIP_FILENAME)
    }

    pub fn status_path(&self) -> PathBuf {
        status_path(&self.data_dir)
    }
}

pub fn status_path(data_dir: &Path) -> PathBuf {
    data_dir.join(STATUS_DIR).join(STATUS_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_urls_cover_every_public_file() {
        let settings = Settings {
            public_url: "https://mirror.example/".to_owned(),
            ..Settings::default()
        };

        assert_eq!(
            settings.archive_urls(),
            vec![
                "https://mirror.example/",
                "https://mirror.example/artists.html",
                "https://mirror.example/artists.csv",
                "https://mirror.example/artists.xlsx",
                "https://artistgrid.cx",
            ]
        );
    }

    #[test]
    fn export_urls_hang_off_the_sheet() {
        let settings = Settings::default();
        let sheet = format!("https://docs.google.com/spreadsheets/d/{DEFAULT_SHEET_ID}");

        assert_eq!(settings.zip_export_url(), format!("{sheet}/export?format=zip"));
        assert_eq!(settings.xlsx_export_url(), format!("{sheet}/export?format=xlsx"));
    }

    #[test]
    fn landing_link_uses_tracker_sheet() {
        let settings = Settings {
            sheets_base_url: "http://127.0.0.1:9/d/".to_owned(),
            sheet_id: "mirror".to_owned(),
            tracker_sheet_id: "tracker".to_owned(),
            ..Settings::default()
        };

        assert_eq!(settings.tracker_view_url(), "http://127.0.0.1:9/d/tracker/htmlview");
        assert_eq!(settings.zip_export_url(), "http://127.0.0.1:9/d/mirror/export?format=zip");
        assert_eq!(
            Settings::default().tracker_view_url(),
            "https://docs.google.com/spreadsheets/d/1zoOIaNbBvfuL3sS3824acpqGxOdSZSIHM8-nI9C-Vfc/htmlview"
        );
    }
}
