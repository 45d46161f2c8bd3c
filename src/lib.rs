// Library root
// -----------
// The binary (`main.rs`) parses arguments and wires these modules together.
//
// Module responsibilities:
// - `repost`: the download -> login -> upload pipeline.
// - `status`: stdout marker protocol and final JSON result.
// - `caption`, `source`: caption/hashtag resolution and URL handling.
// - `download`: yt-dlp downloader and cleanup of downloaded files.
// - `api`, `instagram`, `session`: Graph API access, login and publishing,
//   persisted tokens.
// - `config`, `cli`, `ui`, `error`: environment, arguments, prompts, errors.
pub mod api;
pub mod caption;
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod instagram;
pub mod repost;
pub mod session;
pub mod source;
pub mod status;
pub mod ui;

pub use error::{RepostError, Result};
pub use repost::{RepostOutcome, RepostRequest, Reposter};
