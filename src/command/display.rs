//! Terminal rendering of session output.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::api::{ApiClient, CsrfHeaderProvider, HeaderProvider, NoHeaders};
use crate::config::Config;
use crate::domain::{IngestRequest, IngestResult, PatternMode};
use crate::selection::TreeSelection;
use crate::session::{SessionError, SessionObserver};
use crate::size_scale;

/// Client for the configured service, sending the CSRF token when one is set.
pub fn build_client(config: &Config) -> Result<ApiClient> {
    let headers: Arc<dyn HeaderProvider> = match &config.csrf_token {
        Some(token) => Arc::new(CsrfHeaderProvider::new(Some(token.clone()))),
        None => Arc::new(NoHeaders),
    };
    Ok(ApiClient::new(&config.server_url, headers)?.with_timeout(config.timeout))
}

/// Client for third-party lookups; never carries the CSRF token.
pub fn build_public_client(config: &Config) -> Result<ApiClient> {
    ApiClient::new(&config.server_url, Arc::new(NoHeaders))
}

const ERROR_CLEARED: &str = "(error cleared)";

/// Prints session transitions to the terminal.
pub struct TerminalObserver {
    show_results: bool,
}

impl TerminalObserver {
    /// Status lines only; the caller prints the digest.
    pub fn quiet() -> Self {
        Self {
            show_results: false,
        }
    }

    /// Prints the summary and tree of every new result.
    pub fn interactive() -> Self {
        Self { show_results: true }
    }

    /// Status line shown when the error banner goes away.
    fn dismissal_notice(&self) -> Option<&'static str> {
        self.show_results.then_some(ERROR_CLEARED)
    }
}

impl SessionObserver for TerminalObserver {
    fn on_submitting(&mut self, request: &IngestRequest) {
        eprintln!(
            "⏳ Ingesting {} ({} {:?}, files under {})...",
            request.repository_url(),
            request.pattern_mode(),
            request.pattern(),
            size_scale::format_size(request.max_file_size_kb())
        );
    }

    fn on_result(&mut self, result: &IngestResult) {
        if !self.show_results {
            return;
        }
        println!("\n{}\n", result.summary.trim_end());
        if let Some(id) = &result.ingest_id {
            println!("Ingest ID: {}\n", id);
        }
        let selection = TreeSelection::new(result.tree.clone(), PatternMode::Exclude);
        print!("{}", render_tree(&selection));
        println!(
            "\n{} bytes of file content. Use :toggle <n> to select paths, :save <file> to export.",
            result.content.len()
        );
    }

    fn on_error(&mut self, error: &SessionError) {
        eprintln!("⚠️  {}", error.message);
    }

    fn on_error_dismissed(&mut self) {
        debug!("Error banner dismissed");
        if let Some(notice) = self.dismissal_notice() {
            eprintln!("\n{}", notice);
        }
    }
}

/// Numbered tree listing; struck lines are marked with `~`.
pub fn render_tree(selection: &TreeSelection) -> String {
    let mode = selection.mode();
    let mut out = String::new();
    for (index, line) in selection.lines().iter().enumerate() {
        if line.path.is_none() {
            out.push_str(&format!("     {}\n", line.text));
            continue;
        }
        let marker = if line.is_struck(mode) { '~' } else { ' ' };
        out.push_str(&format!("{:>3} {} {}\n", index, marker, line.text));
    }
    out
}

/// Write the digest to `path`, or to stdout when no path is given.
pub fn write_digest(result: &IngestResult, path: Option<&Path>) -> Result<()> {
    let text = result.to_digest_text();
    match path {
        Some(path) => {
            std::fs::write(path, &text)
                .with_context(|| format!("Failed to write digest to {:?}", path))?;
            eprintln!("✅ Digest written to {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(text.as_bytes())
                .context("Failed to write digest to stdout")?;
            stdout.flush()?;
        }
    }
    Ok(())
}
