// Status marker protocol. A backend service spawns this tool and scans its
// stdout for `STEP_MARKER:` and `FINAL_STATUS:` lines, so stdout carries
// only those lines plus the final JSON result.

use std::fmt;
use std::io::{self, Write};

use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Download,
    Login,
    Upload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Started,
    Completed,
    Failed,
}

impl Step {
    fn as_str(self) -> &'static str {
        match self {
            Step::Download => "DOWNLOAD",
            Step::Login => "LOGIN",
            Step::Upload => "UPLOAD",
        }
    }
}

impl Phase {
    fn as_str(self) -> &'static str {
        match self {
            Phase::Started => "STARTED",
            Phase::Completed => "COMPLETED",
            Phase::Failed => "FAILED",
        }
    }
}

/// A single `STEP_MARKER` value, e.g. `DOWNLOAD_STARTED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker {
    pub step: Step,
    pub phase: Phase,
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.step.as_str(), self.phase.as_str())
    }
}

/// Writes markers to an output stream and remembers which ones were sent.
pub struct StatusReporter {
    out: Box<dyn Write>,
    steps: Vec<String>,
}

impl StatusReporter {
    pub fn new(out: Box<dyn Write>) -> Self {
        StatusReporter {
            out,
            steps: Vec::new(),
        }
    }

    pub fn stdout() -> Self {
        StatusReporter::new(Box::new(io::stdout()))
    }

    pub fn started(&mut self, step: Step) {
        self.marker(Marker { step, phase: Phase::Started });
    }

    pub fn completed(&mut self, step: Step) {
        self.marker(Marker { step, phase: Phase::Completed });
    }

    pub fn failed(&mut self, step: Step) {
        self.marker(Marker { step, phase: Phase::Failed });
    }

    pub fn marker(&mut self, marker: Marker) {
        self.line(&format!("STEP_MARKER: {}", marker));
        self.steps.push(marker.to_string().to_lowercase());
    }

    pub fn final_status(&mut self, success: bool) {
        let status = if success { "SUCCESS" } else { "FAILED" };
        self.line(&format!("FINAL_STATUS: {}", status));
    }

    /// Print the JSON result object as the last line of output.
    pub fn result(&mut self, result: &RepostResult) {
        match serde_json::to_string(result) {
            Ok(json) => self.line(&json),
            Err(e) => warn!("Could not serialize result: {}", e),
        }
    }

    /// Lower-cased markers emitted so far, in order.
    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    fn line(&mut self, text: &str) {
        // The reader is another process; a broken pipe must not abort the run.
        if let Err(e) = writeln!(self.out, "{}", text).and_then(|_| self.out.flush()) {
            warn!("Could not write status line: {}", e);
        }
    }
}

/// JSON object printed at the end of every run.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RepostResult {
    pub success: bool,
    pub message: String,
    pub status: &'static str,
    pub steps: Vec<String>,
}

impl RepostResult {
    pub fn new(success: bool, message: impl Into<String>, steps: Vec<String>) -> Self {
        RepostResult {
            success,
            message: message.into(),
            status: if success { "completed" } else { "failed" },
            steps,
        }
    }
}
