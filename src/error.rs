// Error type shared by the library modules. The binary wraps these in
// `anyhow` at the top level; everything below `main` returns `Result`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RepostError>;

#[derive(Debug, Error)]
pub enum RepostError {
    #[error("Invalid {source_name} URL: {url}")]
    InvalidUrl { source_name: String, url: String },

    #[error("Unsupported source platform: {0}")]
    UnknownSource(String),

    #[error("Missing configuration value: {0}")]
    MissingConfig(&'static str),

    #[error("Invalid configuration value: {key}={value}")]
    InvalidConfig { key: &'static str, value: String },

    #[error("Downloader `{program}` was not found")]
    DownloaderNotFound { program: String },

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Graph API error ({status}): {message}")]
    Graph { status: u16, message: String },

    #[error("Media container {container_id} was rejected with status {status}")]
    PublishRejected { container_id: String, status: String },

    #[error("Media container {container_id} was not ready after {attempts} checks")]
    PublishTimeout { container_id: String, attempts: u32 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RepostError {
    /// Extra guidance printed after a failure, when we know of any.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            RepostError::DownloaderNotFound { .. } => Some(
                "Install yt-dlp (https://github.com/yt-dlp/yt-dlp) and make sure it is on PATH, or set YTDLP_PATH.",
            ),
            RepostError::Download(msg) if msg.to_lowercase().contains("ffmpeg") => Some(
                "yt-dlp needs ffmpeg to merge formats. Install it from https://ffmpeg.org/download.html and add it to PATH.",
            ),
            RepostError::MissingConfig(_) => {
                Some("Set the value in the environment or in a .env file next to the binary.")
            }
            _ => None,
        }
    }
}
