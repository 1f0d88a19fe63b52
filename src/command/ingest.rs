use anyhow::{bail, Result};
use std::sync::Arc;
use tracing::info;

use crate::cli::IngestArgs;
use crate::command::display::{self, TerminalObserver};
use crate::config::Config;
use crate::session::{IngestionSession, SubmitOutcome};

/// One-shot ingestion: submit, wait, then print or save the digest.
pub async fn run_ingest(config: &Config, args: IngestArgs) -> Result<()> {
    let client = display::build_client(config)?;

    let mut session = IngestionSession::new(Arc::new(client), Box::new(TerminalObserver::quiet()))
        .with_dismiss_after(config.dismiss_after)
        .with_form(config.initial_form());

    session.set_repository_url(args.url.clone());
    if let Some(mode) = args.pattern_mode() {
        session.set_pattern_mode(mode);
    }
    session.set_pattern(args.pattern.clone());
    if let Some(position) = args.slider {
        session.set_slider_position(position);
    } else if let Some(kb) = args.max_size_kb {
        session.set_max_file_size_kb(kb);
    }

    match session.submit() {
        SubmitOutcome::Dispatched => {}
        SubmitOutcome::MissingRepository => bail!("A repository URL is required"),
        SubmitOutcome::AlreadySubmitting => bail!("A request is already in progress"),
    }

    let interrupted = tokio::select! {
        _ = session.settle() => false,
        _ = tokio::signal::ctrl_c() => true,
    };
    if interrupted {
        session.cancel();
        bail!("Interrupted");
    }

    if let Some(error) = session.error() {
        bail!("{}", error.message);
    }
    let Some(result) = session.result() else {
        bail!("The ingestion service returned no result");
    };

    info!(
        "Ingested {} ({} bytes of content)",
        session.form().repository_url,
        result.content.len()
    );
    display::write_digest(result, args.output.as_deref())
}
