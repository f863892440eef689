use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use tracing::{info, instrument};
use zip::result::ZipError;
use zip::ZipArchive;

use crate::config::{Settings, HTML_FILENAME};
use crate::{Error, Result};

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

pub fn agent() -> ureq::Agent {
    ureq::AgentBuilder::new().timeout(DOWNLOAD_TIMEOUT).build()
}

/// Fetches `url` and writes the body to `dest`. Non-2xx answers are errors.
pub fn download_file(agent: &ureq::Agent, url: &str, dest: &Path) -> Result<u64> {
    info!("downloading {}", dest.display());
    let response = agent.get(url).call().map_err(|e| Error::http(url, e))?;

    let mut body = Vec::new();
    response.into_reader().read_to_end(&mut body)?;
    fs::write(dest, &body)?;

    info!(bytes = body.len(), "saved {}", dest.display());
    Ok(body.len() as u64)
}

/// Copies a single entry out of a zip archive.
pub fn extract_entry(archive_path: &Path, entry: &str, dest: &Path) -> Result<()> {
    let mut archive = ZipArchive::new(File::open(archive_path)?)?;
    let mut file = archive.by_name(entry).map_err(|e| match e {
        ZipError::FileNotFound => Error::MissingEntry {
            archive: archive_path.display().to_string(),
            entry: entry.to_owned(),
        },
        e => e.into(),
    })?;

    let mut contents = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut contents)?;
    fs::write(dest, contents)?;
    Ok(())
}

/// The zip export holds one html file per sheet tab; only the artist tab is kept.
#[instrument(skip_all)]
pub fn download_sheet_html(agent: &ureq::Agent, settings: &Settings) -> Result<()> {
    let zip_path = settings.zip_path();
    download_file(agent, &settings.zip_export_url(), &zip_path)?;

    info!("extracting {} from {}", HTML_FILENAME, zip_path.display());
    extract_entry(&zip_path, HTML_FILENAME, &settings.html_path())?;
    info!("extracted {}", HTML_FILENAME);
    Ok(())
}

#[instrument(skip_all)]
pub fn download_xlsx(agent: &ureq::Agent, settings: &Settings) -> Result<()> {
    download_file(agent, &settings.xlsx_export_url(), &settings.xlsx_path())?;
    Ok(())
}
