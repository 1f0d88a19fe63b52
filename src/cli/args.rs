use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::ConfigOverrides;
use crate::domain::PatternMode;

/// repodigest - turn a Git repository into a prompt-friendly text digest
#[derive(Parser)]
#[command(name = "repodigest")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Ingestion service URL
    #[arg(long, global = true, env = "REPODIGEST_SERVER_URL")]
    pub server_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true, env = "REPODIGEST_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Anti-forgery token sent as X-CSRF-Token
    #[arg(long, global = true, env = "REPODIGEST_CSRF_TOKEN", hide_env_values = true)]
    pub csrf_token: Option<String>,

    /// Config file (defaults to ~/.repodigest/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            server_url: self.server_url.clone(),
            timeout_secs: self.timeout_secs,
            csrf_token: self.csrf_token.clone(),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ingest a repository and print (or save) its digest
    Ingest(IngestArgs),
    /// Interactive session with tree selection (default)
    Interactive,
    /// List example repositories
    Examples,
    /// Show the project's GitHub star count
    Stars,
    /// Convert between slider positions and file-size cutoffs
    Size {
        /// Slider position (0-500)
        #[arg(conflicts_with = "kb")]
        position: Option<u32>,

        /// Cutoff in kilobytes
        #[arg(long)]
        kb: Option<u32>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct IngestArgs {
    /// Repository URL (e.g. https://github.com/owner/repo)
    pub url: String,

    /// Treat the pattern as an include list
    #[arg(long, conflicts_with = "exclude")]
    pub include: bool,

    /// Treat the pattern as an exclude list
    #[arg(long)]
    pub exclude: bool,

    /// Comma-separated path patterns (e.g. "*.md, src/")
    #[arg(short, long, default_value = "")]
    pub pattern: String,

    /// Skip files larger than this many kilobytes
    #[arg(long, conflicts_with = "slider")]
    pub max_size_kb: Option<u32>,

    /// File-size slider position (0-500)
    #[arg(long)]
    pub slider: Option<u32>,

    /// Write the digest to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl IngestArgs {
    /// Mode from the flags; `None` when neither flag was given.
    pub fn pattern_mode(&self) -> Option<PatternMode> {
        if self.include {
            Some(PatternMode::Include)
        } else if self.exclude {
            Some(PatternMode::Exclude)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ingest() {
        let cli = Cli::try_parse_from([
            "repodigest",
            "ingest",
            "https://github.com/a/b",
            "--include",
            "-p",
            "*.rs",
            "--max-size-kb",
            "200",
        ])
        .unwrap();
        let Some(Commands::Ingest(args)) = cli.command else {
            panic!("expected ingest command");
        };
        assert_eq!(args.url, "https://github.com/a/b");
        assert_eq!(args.pattern_mode(), Some(PatternMode::Include));
        assert_eq!(args.pattern, "*.rs");
        assert_eq!(args.max_size_kb, Some(200));
    }

    #[test]
    fn test_conflicting_flags_rejected() {
        assert!(Cli::try_parse_from([
            "repodigest",
            "ingest",
            "u",
            "--include",
            "--exclude"
        ])
        .is_err());
        assert!(Cli::try_parse_from([
            "repodigest",
            "ingest",
            "u",
            "--slider",
            "10",
            "--max-size-kb",
            "5"
        ])
        .is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "repodigest",
            "stars",
            "--server-url",
            "http://x.example/",
        ])
        .unwrap();
        assert_eq!(cli.overrides().server_url.as_deref(), Some("http://x.example/"));
    }
}
