// Download -> login -> upload orchestration with status markers.

use std::path::PathBuf;

use tracing::{error, info};

use crate::caption::Caption;
use crate::download::{self, Downloader};
use crate::error::{RepostError, Result};
use crate::instagram::Instagram;
use crate::source::Source;
use crate::status::{RepostResult, StatusReporter, Step};

/// One repost invocation, built from CLI args or interactive prompts.
#[derive(Debug, Clone)]
pub struct RepostRequest {
    pub url: String,
    pub caption: Option<String>,
    pub hashtags: Option<String>,
    pub include_hashtags: bool,
    pub source: Source,
}

impl RepostRequest {
    /// Build a request, detecting the source from the URL when not given.
    pub fn new(url: &str, source: Option<Source>) -> Result<Self> {
        let url = url.trim();
        if url.is_empty() {
            return Err(RepostError::InvalidUrl {
                source_name: source.map(|s| s.to_string()).unwrap_or_else(|| "video".into()),
                url: String::new(),
            });
        }
        let source = match source.or_else(|| Source::detect(url)) {
            Some(source) => source,
            None => return Err(RepostError::UnknownSource(url.to_string())),
        };
        Ok(RepostRequest {
            url: url.to_string(),
            caption: None,
            hashtags: None,
            include_hashtags: true,
            source,
        })
    }

    pub fn with_caption(mut self, caption: Option<String>) -> Self {
        self.caption = caption;
        self
    }

    pub fn with_hashtags(mut self, hashtags: Option<String>) -> Self {
        self.hashtags = hashtags;
        self
    }

    pub fn include_hashtags(mut self, include: bool) -> Self {
        self.include_hashtags = include;
        self
    }

    pub fn resolved_caption(&self) -> Caption {
        let caption = Caption::resolve(self.caption.as_deref(), self.hashtags.as_deref());
        if self.include_hashtags {
            caption
        } else {
            caption.without_hashtags()
        }
    }
}

/// Result of a run, as reported in the final JSON object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepostOutcome {
    pub success: bool,
    pub message: String,
    pub steps: Vec<String>,
    pub media_id: Option<String>,
}

impl RepostOutcome {
    pub fn to_result(&self) -> RepostResult {
        RepostResult::new(self.success, self.message.clone(), self.steps.clone())
    }
}

/// Runs the pipeline against a downloader and an Instagram account.
pub struct Reposter<'a> {
    downloader: &'a dyn Downloader,
    instagram: &'a mut dyn Instagram,
    download_dir: PathBuf,
}

impl<'a> Reposter<'a> {
    pub fn new(downloader: &'a dyn Downloader, instagram: &'a mut dyn Instagram, download_dir: PathBuf) -> Self {
        Reposter {
            downloader,
            instagram,
            download_dir,
        }
    }

    /// Run one repost. Never returns an error: failures are reported through
    /// the markers and the outcome. The downloaded file is gone before
    /// `FINAL_STATUS` is written.
    pub fn run(&mut self, request: &RepostRequest, status: &mut StatusReporter) -> RepostOutcome {
        info!("Starting {} video repost from {}", request.source, request.url);

        let result = self.stages(request, status);
        let success = result.is_ok();
        status.final_status(success);

        match result {
            Ok(media_id) => {
                info!("Upload completed successfully!");
                RepostOutcome {
                    success,
                    message: format!("{} video uploaded successfully", request.source.display_name()),
                    steps: status.steps().to_vec(),
                    media_id: Some(media_id),
                }
            }
            Err(e) => {
                error!("Repost failed: {}", e);
                if let Some(hint) = e.hint() {
                    error!("{}", hint);
                }
                RepostOutcome {
                    success,
                    message: format!("Failed to upload {} video: {}", request.source, e),
                    steps: status.steps().to_vec(),
                    media_id: None,
                }
            }
        }
    }

    fn stages(&mut self, request: &RepostRequest, status: &mut StatusReporter) -> Result<String> {
        request.source.validate(&request.url)?;

        status.started(Step::Download);
        let asset = match download::fetch(self.downloader, &request.url, &self.download_dir) {
            Ok(asset) => asset,
            Err(e) => {
                status.failed(Step::Download);
                return Err(e);
            }
        };
        status.completed(Step::Download);

        status.started(Step::Login);
        if let Err(e) = self.instagram.login() {
            status.failed(Step::Login);
            return Err(e);
        }
        status.completed(Step::Login);

        let caption = request.resolved_caption();
        info!(
            "Using {} caption and {} hashtags",
            if request.caption.as_deref().map_or(true, |c| c.trim().is_empty()) { "default" } else { "custom" },
            match (&caption.hashtags, &request.hashtags) {
                (None, _) => "no",
                (Some(_), Some(h)) if !h.trim().is_empty() => "custom",
                _ => "default",
            }
        );

        status.started(Step::Upload);
        info!("Uploading {} video to Instagram...", request.source);
        match self.instagram.publish(asset.path(), &caption.full()) {
            Ok(media_id) => {
                status.completed(Step::Upload);
                Ok(media_id)
            }
            Err(e) => {
                status.failed(Step::Upload);
                Err(e)
            }
        }
        // `asset` drops here and deletes the file.
    }
}
