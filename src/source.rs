// Source platform handling: which site a URL belongs to, whether the URL
// points at something we can repost, and the video id used for filenames.

use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::Url;

use crate::error::RepostError;

/// Platform the video is downloaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Source {
    Instagram,
    Youtube,
}

impl Source {
    /// Guess the platform from the URL host. Returns `None` for anything
    /// that is neither Instagram nor YouTube.
    pub fn detect(url: &str) -> Option<Source> {
        if url.contains("instagram.com") {
            Some(Source::Instagram)
        } else if url.contains("youtube.com") || url.contains("youtu.be") {
            Some(Source::Youtube)
        } else {
            None
        }
    }

    /// Whether `url` is a reel/post (Instagram) or short/watch (YouTube) URL.
    pub fn accepts(self, url: &str) -> bool {
        match self {
            Source::Instagram => {
                url.contains("instagram.com/reel/") || url.contains("instagram.com/p/")
            }
            Source::Youtube => {
                url.contains("youtube.com/shorts/")
                    || url.contains("youtu.be/")
                    || url.contains("youtube.com/watch")
            }
        }
    }

    /// Validate `url` against this source.
    pub fn validate(self, url: &str) -> Result<(), RepostError> {
        if self.accepts(url) {
            Ok(())
        } else {
            Err(RepostError::InvalidUrl {
                source_name: self.to_string(),
                url: url.to_string(),
            })
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Source::Instagram => "instagram",
            Source::Youtube => "youtube",
        }
    }

    /// Capitalized name, used in the final result message.
    pub fn display_name(self) -> &'static str {
        match self {
            Source::Instagram => "Instagram",
            Source::Youtube => "Youtube",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = RepostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "instagram" => Ok(Source::Instagram),
            "youtube" => Ok(Source::Youtube),
            other => Err(RepostError::UnknownSource(other.to_string())),
        }
    }
}

/// Extract the platform video id from a reel, post, short or watch URL.
/// Falls back to `video_<unix seconds>` when nothing matches or the id
/// contains anything but ASCII letters, digits, `-` and `_`.
pub fn extract_video_id(url: &str) -> String {
    id_from_url(url)
        .filter(|id| is_safe_id(id))
        .unwrap_or_else(|| {
            let secs = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default();
            format!("video_{}", secs)
        })
}

/// Ids end up in file names, so they must not carry path separators or dots.
fn is_safe_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn parse_url(url: &str) -> Option<Url> {
    let url = url.trim();
    Url::parse(url)
        .or_else(|_| Url::parse(&format!("https://{}", url)))
        .ok()
}

fn id_from_url(raw: &str) -> Option<String> {
    let url = parse_url(raw)?;
    let host = url.host_str()?.trim_start_matches("www.").trim_start_matches("m.");
    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();

    match (host, segments.as_slice()) {
        ("instagram.com", ["reel" | "reels" | "p", id, ..]) => Some(id.to_string()),
        ("youtube.com", ["shorts", id, ..]) => Some(id.to_string()),
        ("youtu.be", [id, ..]) => Some(id.to_string()),
        ("youtube.com", ["watch", ..]) => url
            .query_pairs()
            .find(|(k, _)| k == "v")
            .map(|(_, v)| v.into_owned()),
        _ => None,
    }
}
