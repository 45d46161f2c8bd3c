// Runtime configuration read from the environment (optionally seeded from a
// `.env` file). Every value has a default except the credentials.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{RepostError, Result};

pub const DEFAULT_GRAPH_API_VERSION: &str = "v18.0";
pub const DEFAULT_GRAPH_API_BASE: &str = "https://graph.facebook.com";
pub const DEFAULT_UPLOAD_BASE: &str = "https://rupload.facebook.com";
pub const DEFAULT_DOWNLOAD_DIR: &str = "downloaded_reels";

/// OAuth application registered in the Meta developer dashboard.
#[derive(Debug, Clone)]
pub struct AppCredentials {
    pub app_id: String,
    pub app_secret: String,
    pub redirect_uri: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub username: Option<String>,
    pub password: Option<String>,
    pub app_id: Option<String>,
    pub app_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub graph_api_version: String,
    pub graph_api_base: String,
    pub upload_base: String,
    pub download_dir: PathBuf,
    pub state_dir: PathBuf,
    pub ytdlp_path: String,
    pub poll_interval: Duration,
    pub poll_attempts: u32,
    pub http_timeout: Duration,
}

impl Config {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Config::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Empty values count as
    /// unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Ok(Config {
            username: get("INSTAGRAM_USERNAME"),
            password: get("INSTAGRAM_PASSWORD"),
            app_id: get("INSTAGRAM_APP_ID"),
            app_secret: get("INSTAGRAM_APP_SECRET"),
            redirect_uri: get("INSTAGRAM_REDIRECT_URI"),
            graph_api_version: get("GRAPH_API_VERSION")
                .unwrap_or_else(|| DEFAULT_GRAPH_API_VERSION.into()),
            graph_api_base: get("GRAPH_API_BASE")
                .unwrap_or_else(|| DEFAULT_GRAPH_API_BASE.into())
                .trim_end_matches('/')
                .to_string(),
            upload_base: get("GRAPH_UPLOAD_BASE")
                .unwrap_or_else(|| DEFAULT_UPLOAD_BASE.into())
                .trim_end_matches('/')
                .to_string(),
            download_dir: get("REPOST_DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DOWNLOAD_DIR)),
            state_dir: get("REPOST_STATE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            ytdlp_path: get("YTDLP_PATH").unwrap_or_else(|| "yt-dlp".into()),
            poll_interval: Duration::from_secs(parse_or(
                "REPOST_POLL_INTERVAL_SECS",
                get("REPOST_POLL_INTERVAL_SECS"),
                5,
            )?),
            poll_attempts: parse_or("REPOST_POLL_ATTEMPTS", get("REPOST_POLL_ATTEMPTS"), 60)?,
            http_timeout: Duration::from_secs(parse_or(
                "REPOST_HTTP_TIMEOUT_SECS",
                get("REPOST_HTTP_TIMEOUT_SECS"),
                300,
            )?),
        })
    }

    /// OAuth app settings; only needed when no stored token is usable.
    pub fn app_credentials(&self) -> Result<AppCredentials> {
        Ok(AppCredentials {
            app_id: self.app_id.clone().ok_or(RepostError::MissingConfig("INSTAGRAM_APP_ID"))?,
            app_secret: self
                .app_secret
                .clone()
                .ok_or(RepostError::MissingConfig("INSTAGRAM_APP_SECRET"))?,
            redirect_uri: self
                .redirect_uri
                .clone()
                .ok_or(RepostError::MissingConfig("INSTAGRAM_REDIRECT_URI"))?,
        })
    }
}

fn parse_or<T: std::str::FromStr>(key: &'static str, value: Option<String>, default: T) -> Result<T> {
    match value {
        None => Ok(default),
        Some(v) => v.parse().map_err(|_| RepostError::InvalidConfig { key, value: v }),
    }
}
