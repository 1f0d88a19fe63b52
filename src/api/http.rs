use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::{debug, warn};

use super::cancel::CancelSignal;
use super::types::IngestError;

/// A successful response read to completion.
#[derive(Debug)]
pub(super) struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

async fn exchange(request: reqwest::RequestBuilder) -> Result<RawResponse, IngestError> {
    let response = request
        .send()
        .await
        .map_err(|err| IngestError::transport(&err))?;

    let status = response.status();
    debug!("=== Ingest Response ===");
    debug!("Status: {}", status);

    if !status.is_success() {
        let reason = status
            .canonical_reason()
            .unwrap_or("Unknown status")
            .to_string();
        return Err(IngestError::http_status(status.as_u16(), reason));
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(ToOwned::to_owned);
    debug!("Content-Type: {:?}", content_type);

    let body = response
        .text()
        .await
        .map_err(|err| IngestError::transport(&err))?;

    Ok(RawResponse {
        status: status.as_u16(),
        content_type,
        body,
    })
}

/// Send `request` and read its body, racing the whole exchange against
/// `timeout` and `cancel`.
///
/// Whichever settles first wins; the losing future is dropped, which aborts
/// the underlying connection.
pub(super) async fn send_with_deadline(
    request: reqwest::RequestBuilder,
    timeout: Duration,
    cancel: &CancelSignal,
) -> Result<RawResponse, IngestError> {
    if cancel.is_cancelled() {
        return Err(IngestError::Cancelled);
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!("Ingest request cancelled by caller");
            Err(IngestError::Cancelled)
        }
        outcome = tokio::time::timeout(timeout, exchange(request)) => match outcome {
            Ok(result) => result,
            Err(_) => {
                warn!("Ingest request timed out after {:?}", timeout);
                Err(IngestError::Timeout(timeout))
            }
        },
    }
}
