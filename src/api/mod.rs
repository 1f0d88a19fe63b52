//! Client for the remote ingestion service.
//!
//! Submits ingestion requests with a deadline and a cancellation signal,
//! classifies failures, and normalises the response into an
//! [`IngestResult`](crate::domain::IngestResult).

mod cancel;
mod client;
mod headers;
mod http;
mod parser;
mod stars;
mod types;

pub use cancel::CancelSignal;
pub use client::{ApiClient, IngestTransport, DEFAULT_TIMEOUT_SECS};
pub use headers::{CsrfHeaderProvider, HeaderProvider, NoHeaders};
pub use stars::format_star_count;
pub use types::{ErrorKind, IngestError};
