// UI layer: interactive prompts using `dialoguer`, used when the tool runs
// in a terminal instead of being driven by the backend. All prompts draw on
// stderr so stdout stays reserved for status markers.

use std::io::IsTerminal;

use anyhow::Result;
use dialoguer::{Confirm, Input};

use crate::error::RepostError;
use crate::instagram::AuthCodeSource;
use crate::repost::RepostRequest;
use crate::source::Source;

/// True when a person can answer prompts.
pub fn is_interactive() -> bool {
    std::io::stdin().is_terminal() && std::io::stderr().is_terminal()
}

/// Ask for the Instagram username when it is not configured.
pub fn prompt_username() -> Result<String> {
    let username: String = Input::new().with_prompt("Instagram username").interact_text()?;
    Ok(username.trim().to_string())
}

/// Collect URL and caption choices for a repost.
pub fn prompt_request(source: Option<Source>) -> Result<RepostRequest> {
    let url: String = Input::new()
        .with_prompt("Instagram Reel or YouTube Shorts URL")
        .interact_text()?;
    let request = RepostRequest::new(&url, source)?;

    // `Confirm` defaults to yes so a bare Enter keeps the defaults.
    let use_default = Confirm::new()
        .with_prompt("Use default caption?")
        .default(true)
        .interact()?;
    if use_default {
        return Ok(request);
    }

    let caption: String = Input::new()
        .with_prompt("Custom caption")
        .allow_empty(true)
        .interact_text()?;
    let include = Confirm::new()
        .with_prompt("Include hashtags?")
        .default(true)
        .interact()?;
    let hashtags = if include {
        let tags: String = Input::new()
            .with_prompt("Hashtags (empty for defaults)")
            .allow_empty(true)
            .interact_text()?;
        Some(tags)
    } else {
        None
    };

    Ok(request
        .with_caption(Some(caption))
        .with_hashtags(hashtags)
        .include_hashtags(include))
}

/// Prints the authorization URL and reads back the code from the redirect.
pub struct TerminalPrompt;

impl AuthCodeSource for TerminalPrompt {
    fn auth_code(&self, authorization_url: &str) -> Result<String, RepostError> {
        eprintln!("Open this URL in your browser and authorize the application:");
        eprintln!();
        eprintln!("  {}", authorization_url);
        eprintln!();
        let code: String = Input::new()
            .with_prompt("Code from the redirect URL")
            .interact_text()?;
        Ok(code.trim().to_string())
    }
}
