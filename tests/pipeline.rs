use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use insta_repost::caption::{DEFAULT_CAPTION, DEFAULT_HASHTAGS};
use insta_repost::download::Downloader;
use insta_repost::instagram::Instagram;
use insta_repost::source::Source;
use insta_repost::status::StatusReporter;
use insta_repost::{RepostError, RepostRequest, Reposter, Result};
use tempfile::tempdir;

#[derive(Clone, Default)]
struct Sink(Arc<Mutex<Vec<u8>>>);

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Sink {
    fn lines(&self) -> Vec<String> {
        String::from_utf8(self.0.lock().unwrap().clone())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

struct FakeDownloader {
    fail: bool,
}

impl Downloader for FakeDownloader {
    fn download(&self, _url: &str, output: &Path) -> Result<()> {
        fs::write(output, b"fake mp4")?;
        if self.fail {
            return Err(RepostError::Download("exit status: 1".into()));
        }
        Ok(())
    }
}

#[derive(Default)]
struct FakeInstagram {
    fail_login: bool,
    fail_publish: bool,
    published: Vec<(PathBuf, String)>,
}

impl Instagram for FakeInstagram {
    fn login(&mut self) -> Result<()> {
        if self.fail_login {
            return Err(RepostError::Auth("bad credentials".into()));
        }
        Ok(())
    }

    fn publish(&mut self, video: &Path, caption: &str) -> Result<String> {
        assert!(video.exists(), "video must exist while publishing");
        self.published.push((video.to_path_buf(), caption.to_string()));
        if self.fail_publish {
            return Err(RepostError::Graph {
                status: 400,
                message: "Media upload has failed".into(),
            });
        }
        Ok("17900000000000000".into())
    }
}

fn reel() -> RepostRequest {
    RepostRequest::new("https://www.instagram.com/reel/CxAbC123/?igsh=1", None).unwrap()
}

fn markers(lines: &[String]) -> Vec<&str> {
    lines
        .iter()
        .filter(|l| l.starts_with("STEP_MARKER:") || l.starts_with("FINAL_STATUS:"))
        .map(String::as_str)
        .collect()
}

#[test]
fn successful_run_emits_all_markers_and_cleans_up() {
    let dir = tempdir().unwrap();
    let sink = Sink::default();
    let mut status = StatusReporter::new(Box::new(sink.clone()));
    let mut instagram = FakeInstagram::default();
    let downloader = FakeDownloader { fail: false };

    let outcome = Reposter::new(&downloader, &mut instagram, dir.path().to_path_buf())
        .run(&reel(), &mut status);

    assert!(outcome.success);
    assert_eq!(outcome.message, "Instagram video uploaded successfully");
    assert_eq!(outcome.media_id.as_deref(), Some("17900000000000000"));
    assert_eq!(
        markers(&sink.lines()),
        [
            "STEP_MARKER: DOWNLOAD_STARTED",
            "STEP_MARKER: DOWNLOAD_COMPLETED",
            "STEP_MARKER: LOGIN_STARTED",
            "STEP_MARKER: LOGIN_COMPLETED",
            "STEP_MARKER: UPLOAD_STARTED",
            "STEP_MARKER: UPLOAD_COMPLETED",
            "FINAL_STATUS: SUCCESS",
        ]
    );
    assert_eq!(outcome.steps.last().map(String::as_str), Some("upload_completed"));

    let (path, caption) = &instagram.published[0];
    assert_eq!(path, &dir.path().join("CxAbC123.mp4"));
    assert_eq!(caption, &format!("{}\n\n{}", DEFAULT_CAPTION, DEFAULT_HASHTAGS));
    assert!(!path.exists());
}

#[test]
fn custom_caption_and_hashtags_are_used() {
    let dir = tempdir().unwrap();
    let mut status = StatusReporter::new(Box::new(Sink::default()));
    let mut instagram = FakeInstagram::default();
    let request = reel()
        .with_caption(Some("  Look at this  ".into()))
        .with_hashtags(Some("cats funny".into()));

    Reposter::new(&FakeDownloader { fail: false }, &mut instagram, dir.path().to_path_buf())
        .run(&request, &mut status);

    assert_eq!(instagram.published[0].1, "Look at this\n\n#cats #funny");
}

#[test]
fn download_failure_stops_before_login_and_removes_partial_file() {
    let dir = tempdir().unwrap();
    let sink = Sink::default();
    let mut status = StatusReporter::new(Box::new(sink.clone()));
    let mut instagram = FakeInstagram::default();

    let outcome = Reposter::new(&FakeDownloader { fail: true }, &mut instagram, dir.path().to_path_buf())
        .run(&reel(), &mut status);

    assert!(!outcome.success);
    assert!(outcome.message.starts_with("Failed to upload instagram video"));
    assert_eq!(
        markers(&sink.lines()),
        [
            "STEP_MARKER: DOWNLOAD_STARTED",
            "STEP_MARKER: DOWNLOAD_FAILED",
            "FINAL_STATUS: FAILED",
        ]
    );
    assert!(instagram.published.is_empty());
    assert!(!dir.path().join("CxAbC123.mp4").exists());
}

#[test]
fn login_failure_removes_downloaded_file() {
    let dir = tempdir().unwrap();
    let sink = Sink::default();
    let mut status = StatusReporter::new(Box::new(sink.clone()));
    let mut instagram = FakeInstagram {
        fail_login: true,
        ..Default::default()
    };

    let outcome = Reposter::new(&FakeDownloader { fail: false }, &mut instagram, dir.path().to_path_buf())
        .run(&reel(), &mut status);

    assert!(!outcome.success);
    assert_eq!(
        outcome.steps,
        ["download_started", "download_completed", "login_started", "login_failed"]
    );
    assert_eq!(sink.lines().last().map(String::as_str), Some("FINAL_STATUS: FAILED"));
    assert!(!dir.path().join("CxAbC123.mp4").exists());
}

#[test]
fn upload_failure_removes_downloaded_file() {
    let dir = tempdir().unwrap();
    let mut status = StatusReporter::new(Box::new(Sink::default()));
    let mut instagram = FakeInstagram {
        fail_publish: true,
        ..Default::default()
    };

    let outcome = Reposter::new(&FakeDownloader { fail: false }, &mut instagram, dir.path().to_path_buf())
        .run(&reel(), &mut status);

    assert!(!outcome.success);
    assert!(outcome.message.contains("Media upload has failed"));
    assert_eq!(outcome.steps.last().map(String::as_str), Some("upload_failed"));
    assert!(!instagram.published[0].0.exists());
}

#[test]
fn invalid_url_fails_without_step_markers() {
    let dir = tempdir().unwrap();
    let sink = Sink::default();
    let mut status = StatusReporter::new(Box::new(sink.clone()));
    let mut instagram = FakeInstagram::default();
    let request = RepostRequest::new("https://www.instagram.com/stories/someone/1/", None).unwrap();

    let outcome = Reposter::new(&FakeDownloader { fail: false }, &mut instagram, dir.path().to_path_buf())
        .run(&request, &mut status);

    assert!(!outcome.success);
    assert!(outcome.message.contains("Invalid instagram URL"));
    assert_eq!(sink.lines(), ["FINAL_STATUS: FAILED"]);
    assert!(outcome.steps.is_empty());
}

#[test]
fn stale_files_for_same_video_are_replaced() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("abc.f137.mp4"), b"old").unwrap();
    fs::write(dir.path().join("unrelated.mp4"), b"keep").unwrap();
    let mut status = StatusReporter::new(Box::new(Sink::default()));
    let mut instagram = FakeInstagram::default();
    let request = RepostRequest::new("https://youtube.com/shorts/abc", Some(Source::Youtube)).unwrap();

    let outcome = Reposter::new(&FakeDownloader { fail: false }, &mut instagram, dir.path().to_path_buf())
        .run(&request, &mut status);

    assert!(outcome.success);
    assert_eq!(outcome.message, "Youtube video uploaded successfully");
    assert!(!dir.path().join("abc.f137.mp4").exists());
    assert!(dir.path().join("unrelated.mp4").exists());
}
