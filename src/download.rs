// Video download. The actual fetching is done by the external `yt-dlp`
// program; this module prepares the target path, removes leftovers from
// earlier runs and owns the downloaded file until the run ends.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info, warn};

use crate::error::{RepostError, Result};
use crate::source::extract_video_id;

/// Anything able to fetch `url` into `output`.
pub trait Downloader {
    fn download(&self, url: &str, output: &Path) -> Result<()>;
}

/// Downloader backed by the `yt-dlp` command line program.
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: String,
}

impl YtDlp {
    pub fn new(program: impl Into<String>) -> Self {
        YtDlp {
            program: program.into(),
        }
    }

    fn args(url: &str, output: &Path) -> Vec<String> {
        vec![
            "-f".into(),
            "best[ext=mp4]/best".into(),
            "--merge-output-format".into(),
            "mp4".into(),
            "--no-playlist".into(),
            "-o".into(),
            output.to_string_lossy().into_owned(),
            url.into(),
        ]
    }
}

impl Downloader for YtDlp {
    fn download(&self, url: &str, output: &Path) -> Result<()> {
        let args = Self::args(url, output);
        debug!("Running {} {}", self.program, args.join(" "));

        let result = Command::new(&self.program).args(&args).output();
        let out = match result {
            Ok(out) => out,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(RepostError::DownloaderNotFound {
                    program: self.program.clone(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            let reason = stderr
                .lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .unwrap_or("no output")
                .trim()
                .to_string();
            return Err(RepostError::Download(format!("{} exited with {}: {}", self.program, out.status, reason)));
        }
        Ok(())
    }
}

/// A video file on disk that is removed when dropped, whatever the outcome
/// of the upload.
#[derive(Debug)]
pub struct DownloadedAsset {
    path: PathBuf,
}

impl DownloadedAsset {
    pub fn new(path: PathBuf) -> Self {
        DownloadedAsset { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DownloadedAsset {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => info!("Deleted temp file: {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Could not delete {}: {}", self.path.display(), e),
        }
    }
}

/// Remove every file in `dir` whose name contains `video_id`. Failures are
/// logged and skipped. Returns the number of files removed.
pub fn remove_stale_files(dir: &Path, video_id: &str) -> usize {
    if video_id.is_empty() {
        return 0;
    }
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Could not list {}: {}", dir.display(), e);
            return 0;
        }
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let name = entry.file_name();
        if !name.to_string_lossy().contains(video_id) {
            continue;
        }
        match fs::remove_file(entry.path()) {
            Ok(()) => {
                info!("Removed previous file: {}", name.to_string_lossy());
                removed += 1;
            }
            Err(e) => warn!("Error removing {}: {}", name.to_string_lossy(), e),
        }
    }
    removed
}

/// Download `url` into `dir` as `<video id>.mp4`.
///
/// The directory is created if needed and stale files for the same id are
/// cleared first, so at most one asset per id exists afterwards.
pub fn fetch(downloader: &dyn Downloader, url: &str, dir: &Path) -> Result<DownloadedAsset> {
    fs::create_dir_all(dir)?;

    let video_id = extract_video_id(url);
    remove_stale_files(dir, &video_id);

    let output = dir.join(format!("{}.mp4", video_id));
    info!("Downloading {} to {}", url, output.display());
    let outcome = downloader.download(url, &output);

    // Own the path before checking the outcome so partial files go too.
    let asset = DownloadedAsset::new(output);
    outcome?;

    if !asset.path().exists() {
        return Err(RepostError::Download(format!(
            "video not found at expected location: {}",
            asset.path().display()
        )));
    }
    info!("Downloaded video: {}", asset.path().display());
    Ok(asset)
}
