//! Domain types shared across modules.
//!
//! The request/result model is used by the API client (wire encoding and
//! response parsing), the selection model (tree text) and the session
//! coordinator. Keeping them here avoids circular dependencies between
//! those modules.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the server interprets the pattern list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternMode {
    #[default]
    Exclude,
    Include,
}

impl PatternMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternMode::Exclude => "exclude",
            PatternMode::Include => "include",
        }
    }

    /// The other mode.
    pub fn flipped(self) -> Self {
        match self {
            PatternMode::Exclude => PatternMode::Include,
            PatternMode::Include => PatternMode::Exclude,
        }
    }
}

impl fmt::Display for PatternMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatternMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "exclude" => Ok(PatternMode::Exclude),
            "include" => Ok(PatternMode::Include),
            other => Err(format!(
                "unknown pattern mode '{}', expected 'exclude' or 'include'",
                other
            )),
        }
    }
}

/// A single ingestion request.
///
/// Built fresh from the form values on every submission and never mutated
/// after it is handed to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestRequest {
    repository_url: String,
    pattern_mode: PatternMode,
    pattern: String,
    max_file_size_kb: u32,
}

impl IngestRequest {
    /// Returns `None` when the repository URL is blank or the size cutoff is zero.
    pub fn new(
        repository_url: impl Into<String>,
        pattern_mode: PatternMode,
        pattern: impl Into<String>,
        max_file_size_kb: u32,
    ) -> Option<Self> {
        let repository_url = repository_url.into().trim().to_string();
        if repository_url.is_empty() || max_file_size_kb == 0 {
            return None;
        }
        Some(Self {
            repository_url,
            pattern_mode,
            pattern: pattern.into(),
            max_file_size_kb,
        })
    }

    pub fn repository_url(&self) -> &str {
        &self.repository_url
    }

    pub fn pattern_mode(&self) -> PatternMode {
        self.pattern_mode
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn max_file_size_kb(&self) -> u32 {
        self.max_file_size_kb
    }
}

/// The digest produced by one successful ingestion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestResult {
    pub summary: String,
    /// Newline-delimited indented paths; the first line is a header.
    pub tree: String,
    pub content: String,
    pub ingest_id: Option<String>,
}

impl IngestResult {
    /// Render the digest the way it is copied out: summary, tree, then content.
    pub fn to_digest_text(&self) -> String {
        let mut out = String::with_capacity(
            self.summary.len() + self.tree.len() + self.content.len() + 4,
        );
        for part in [&self.summary, &self.tree, &self.content] {
            if part.is_empty() {
                continue;
            }
            if !out.is_empty() {
                out.push_str("\n\n");
            }
            out.push_str(part.trim_end());
        }
        out.push('\n');
        out
    }
}
