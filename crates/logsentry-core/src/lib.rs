//! Core types for the log sentry
//! this crate holds the data model shared by the tailer, the analyzer and the sinks.
pub mod batch;
pub mod tail;

pub use batch::Batcher;
pub use tail::Tailer;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CoreError {
    #[error("batch size must be positive, got {0}")]
    InvalidBatchSize(usize),
}

// LOG SOURCE //

/// A named, typed log origin read from configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSource {
    pub name: String,

    pub path: PathBuf,

    #[serde(rename = "type")]
    pub source_type: String,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl LogSource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, source_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            source_type: source_type.into(),
            enabled: true,
        }
    }
}

fn default_true() -> bool {
    true
}

// LOG LINE //

/// One non-blank line produced by the tailer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    pub source_name: String,
    pub source_type: String,
    pub text: String,
    pub line_number: u64,
}

impl LogLine {
    // transcript form handed to the oracle: [source:line] text
    pub fn render(&self) -> String {
        format!("[{}:{}] {}", self.source_name, self.line_number, self.text)
    }
}

// SEVERITY //

/// Alert severity levels (ordered from lowest to highest)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    /// Parse severity from string (case-insensitive), None when unrecognised
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "info" => Some(Self::Info),
            "warning" | "warn" => Some(Self::Warning),
            "error" | "err" => Some(Self::Error),
            "critical" | "crit" | "fatal" => Some(Self::Critical),
            _ => None,
        }
    }

    // numeric rank used for threshold filtering
    pub fn rank(self) -> u8 {
        match self {
            Severity::Info => 0,
            Severity::Warning => 1,
            Severity::Error => 2,
            Severity::Critical => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Info
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ALERT //

/// A classified finding attributed to the source it came from.
/// Built once by the analyzer and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub severity: Severity,
    pub summary: String,
    pub details: String,
    pub log_line: String,
    pub recommendation: String,
    pub source_name: String,
    pub source_type: String,
}
