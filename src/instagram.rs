// Instagram account: login with a persisted session/token (running the OAuth
// flow when neither is usable) and publishing a Reel through the Graph API.

use std::path::Path;
use std::thread;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::api::{is_credential_rejection, GraphApi, GraphClient, InstagramAccount};
use crate::config::Config;
use crate::error::{RepostError, Result};
use crate::session::{Session, SessionStore};

/// The publishing side of the pipeline.
pub trait Instagram {
    /// Make sure we hold credentials that can publish.
    fn login(&mut self) -> Result<()>;

    /// Publish `video` as a Reel with `caption`. Returns the media id.
    fn publish(&mut self, video: &Path, caption: &str) -> Result<String>;
}

/// Where the OAuth authorization code comes from. The terminal UI
/// implements this by showing the URL and prompting for the code.
pub trait AuthCodeSource {
    fn auth_code(&self, authorization_url: &str) -> Result<String>;
}

/// How long to wait for Instagram to process an uploaded video.
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub interval: Duration,
    pub attempts: u32,
}

pub struct GraphInstagram {
    api: Box<dyn GraphApi>,
    store: SessionStore,
    config: Config,
    username: String,
    codes: Option<Box<dyn AuthCodeSource>>,
    poll: PollSettings,
    session: Option<Session>,
}

impl GraphInstagram {
    pub fn new(config: Config, username: String, codes: Option<Box<dyn AuthCodeSource>>) -> Result<Self> {
        let api = GraphClient::from_config(&config)?;
        Ok(GraphInstagram::with_api(Box::new(api), config, username, codes))
    }

    /// Build on top of any Graph API implementation.
    pub fn with_api(
        api: Box<dyn GraphApi>,
        config: Config,
        username: String,
        codes: Option<Box<dyn AuthCodeSource>>,
    ) -> Self {
        let store = SessionStore::new(config.state_dir.clone());
        let poll = PollSettings {
            interval: config.poll_interval,
            attempts: config.poll_attempts,
        };
        GraphInstagram {
            api,
            store,
            config,
            username,
            codes,
            poll,
            session: None,
        }
    }

    /// Reuse `<username>_session.json` if the account behind it still answers.
    /// The file is removed only when the Graph API rejects it; transport and
    /// server errors fail the login and leave it in place.
    fn saved_session(&self) -> Result<Option<Session>> {
        let session = match self.store.load_session(&self.username) {
            Ok(Some(session)) => session,
            Ok(None) => return Ok(None),
            Err(e) => {
                warn!("Could not read saved session: {}", e);
                self.store.clear_session(&self.username);
                return Ok(None);
            }
        };
        match self.api.instagram_account(&session.access_token, &session.ig_user_id) {
            Ok(_) => Ok(Some(session)),
            Err(e) if is_credential_rejection(&e) => {
                warn!("Could not use saved session: {}", e);
                self.store.clear_session(&self.username);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// A working access token: the stored one if still valid, else a new
    /// one from the OAuth flow.
    fn access_token(&self) -> Result<String> {
        match self.store.load_token() {
            Ok(Some(token)) => {
                info!("Found existing token. Testing its validity...");
                match self.api.verify_token(&token.access_token) {
                    Ok(()) => return Ok(token.access_token),
                    Err(e) if is_credential_rejection(&e) => {
                        warn!("Stored token is no longer valid: {}", e);
                        self.store.clear_token();
                    }
                    Err(e) => return Err(e),
                }
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Could not read stored token: {}", e);
                self.store.clear_token();
            }
        }

        let codes = self.codes.as_ref().ok_or_else(|| {
            RepostError::Auth("no valid stored token and no terminal to run the authorization flow".into())
        })?;
        let app = self.config.app_credentials()?;
        let url = self.api.authorization_url(&app)?;
        let code = codes.auth_code(url.as_str())?;
        if code.trim().is_empty() {
            return Err(RepostError::Auth("no authorization code entered".into()));
        }
        let token = self.api.exchange_code(&app, &code)?;
        self.store.save_token(&token)?;
        Ok(token.access_token)
    }

    fn pick_account(&self, accounts: Vec<InstagramAccount>) -> Result<InstagramAccount> {
        choose_account(accounts, &self.username).ok_or_else(|| {
            RepostError::Auth("no Instagram business account is linked to this Facebook login".into())
        })
    }

    fn wait_until_ready(&self, token: &str, container_id: &str) -> Result<()> {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message("Waiting for Instagram to process the video...");

        let result = self.poll_container(token, container_id, &spinner);
        spinner.finish_and_clear();
        result
    }

    fn poll_container(&self, token: &str, container_id: &str, spinner: &ProgressBar) -> Result<()> {
        for attempt in 1..=self.poll.attempts {
            let status = self.api.container_status(token, container_id)?;
            let code = status.status_code.unwrap_or_default();
            match code.as_str() {
                "FINISHED" | "PUBLISHED" => return Ok(()),
                "ERROR" | "EXPIRED" => {
                    return Err(RepostError::PublishRejected {
                        container_id: container_id.to_string(),
                        status: status.status.unwrap_or(code),
                    })
                }
                _ => {
                    spinner.set_message(format!("Processing video ({}/{})", attempt, self.poll.attempts));
                    spinner.tick();
                    thread::sleep(self.poll.interval);
                }
            }
        }
        Err(RepostError::PublishTimeout {
            container_id: container_id.to_string(),
            attempts: self.poll.attempts,
        })
    }
}

impl Instagram for GraphInstagram {
    fn login(&mut self) -> Result<()> {
        if let Some(session) = self.saved_session()? {
            info!("Logged in using saved session for {}", self.username);
            self.session = Some(session);
            return Ok(());
        }

        let token = self.access_token()?;
        let account = self.pick_account(self.api.instagram_accounts(&token)?)?;
        let session = Session::new(&self.username, &token, &account.id);
        self.store.save_session(&session)?;
        info!(
            "Logged in as {} and saved session",
            account.username.as_deref().unwrap_or(&self.username)
        );
        self.session = Some(session);
        Ok(())
    }

    fn publish(&mut self, video: &Path, caption: &str) -> Result<String> {
        let session = self
            .session
            .clone()
            .ok_or_else(|| RepostError::Auth("publish called before login".into()))?;
        let token = session.access_token.as_str();

        let container_id = self.api.create_reel_container(token, &session.ig_user_id, caption)?;
        info!("Created media container {}", container_id);
        self.api.upload_video(token, &container_id, video)?;
        self.wait_until_ready(token, &container_id)?;
        let media_id = self.api.publish_container(token, &session.ig_user_id, &container_id)?;
        info!("Published media {}", media_id);
        Ok(media_id)
    }
}

/// Prefer the account whose username matches, else the first one.
pub fn choose_account(accounts: Vec<InstagramAccount>, username: &str) -> Option<InstagramAccount> {
    let wanted = accounts.iter().position(|a| {
        a.username
            .as_deref()
            .map_or(false, |u| u.eq_ignore_ascii_case(username))
    });
    let index = match wanted {
        Some(i) => i,
        None => {
            if !accounts.is_empty() {
                warn!("No linked account named {}, using the first one", username);
            }
            0
        }
    };
    accounts.into_iter().nth(index)
}
