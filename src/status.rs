use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, error};

use crate::config::{status_path, CSV_FILENAME, HTML_FILENAME, XLSX_FILENAME};
use crate::Result;

pub const FILE_NOT_FOUND: &str = "file_not_found";

const HASH_BLOCK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub files: BTreeMap<String, FileInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_archived: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHashes {
    pub html: String,
    pub csv: String,
    pub xlsx: String,
}

/// SHA-256 of the file as lowercase hex, or [`FILE_NOT_FOUND`].
pub fn hash_file(path: &Path) -> Result<String> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(FILE_NOT_FOUND.to_owned()),
        Err(e) => return Err(e.into()),
    };

    let mut hasher = Sha256::new();
    let mut block = vec![0u8; HASH_BLOCK_SIZE];
    loop {
        let n = file.read(&mut block)?;
        if n == 0 {
            break;
        }
        hasher.update(&block[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Reads `info/status.json`. Missing or unparsable files yield `None`.
pub fn read_status(data_dir: &Path) -> Option<StatusInfo> {
    let path = status_path(data_dir);
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) => {
            if e.kind() != io::ErrorKind::NotFound {
                error!("failed to read {}: {}", path.display(), e);
            }
            return None;
        }
    };

    match serde_json::from_str(&text) {
        Ok(status) => Some(status),
        Err(e) => {
            error!("failed to parse {}: {}", path.display(), e);
            None
        }
    }
}

/// Merges this cycle's hashes into `info/status.json`.
///
/// `last_archived` on the html entry is carried over from the previous file
/// unless `archived` is set, in which case it becomes `now`.
pub fn write_status(data_dir: &Path, hashes: &FileHashes, archived: bool, now: DateTime<Utc>) -> Result<StatusInfo> {
    let path = status_path(data_dir);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut info = read_status(data_dir).unwrap_or_default();
    let now = now.to_rfc3339_opts(SecondsFormat::Micros, false);

    info.last_updated = Some(now.clone());

    let html = info.files.entry(HTML_FILENAME.to_owned()).or_default();
    html.hash = Some(hashes.html.clone());
    if archived {
        html.last_archived = Some(now);
    }

    info.files.insert(
        CSV_FILENAME.to_owned(),
        FileInfo {
            hash: Some(hashes.csv.clone()),
            last_archived: None,
        },
    );
    info.files.insert(
        XLSX_FILENAME.to_owned(),
        FileInfo {
            hash: Some(hashes.xlsx.clone()),
            last_archived: None,
        },
    );

    fs::write(&path, serde_json::to_string_pretty(&info)?)?;
    debug!(path = %path.display(), "wrote status");

    Ok(info)
}
