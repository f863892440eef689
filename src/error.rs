use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("invalid zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("{entry} not found in {archive}")]
    MissingEntry { archive: String, entry: String },
    #[error("could not find the table body in the sheet html")]
    TableNotFound,
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("failed to render template: {0}")]
    Template(#[from] minijinja::Error),
    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl Error {
    pub(crate) fn http(url: &str, source: ureq::Error) -> Self {
        Error::Http {
            url: url.to_owned(),
            source: Box::new(source),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
