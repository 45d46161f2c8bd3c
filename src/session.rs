// Persisted credentials. Two JSON files live in the state directory:
// `instagram_token.json` holds the OAuth token response and
// `<username>_session.json` holds the resolved account for one username.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;

pub const TOKEN_FILE: &str = "instagram_token.json";

/// OAuth access token as returned by the token endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TokenData {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
}

/// Token plus the Instagram business account it publishes to.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    pub access_token: String,
    pub ig_user_id: String,
    pub saved_at: u64,
}

impl Session {
    pub fn new(username: &str, access_token: &str, ig_user_id: &str) -> Self {
        Session {
            username: username.to_string(),
            access_token: access_token.to_string(),
            ig_user_id: ig_user_id.to_string(),
            saved_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default(),
        }
    }
}

/// Reads and writes the credential files under one directory.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        SessionStore { dir: dir.into() }
    }

    pub fn token_path(&self) -> PathBuf {
        self.dir.join(TOKEN_FILE)
    }

    pub fn session_path(&self, username: &str) -> PathBuf {
        self.dir.join(format!("{}_session.json", username))
    }

    pub fn load_token(&self) -> Result<Option<TokenData>> {
        read_json(&self.token_path())
    }

    pub fn save_token(&self, token: &TokenData) -> Result<()> {
        write_json(&self.token_path(), token)?;
        info!("Token saved to {}", self.token_path().display());
        Ok(())
    }

    pub fn clear_token(&self) {
        remove(&self.token_path());
    }

    pub fn load_session(&self, username: &str) -> Result<Option<Session>> {
        read_json(&self.session_path(username))
    }

    pub fn save_session(&self, session: &Session) -> Result<()> {
        write_json(&self.session_path(&session.username), session)
    }

    pub fn clear_session(&self, username: &str) {
        remove(&self.session_path(username));
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Option<T>> {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_str(&data)?))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

fn remove(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => info!("Removed stale credentials {}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove {}: {}", path.display(), e),
    }
}
