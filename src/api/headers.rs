//! Anti-forgery / session header providers.
//!
//! The client never creates or validates tokens itself; it hands its outgoing
//! header map to a provider right before dispatch.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::warn;

/// Header carrying the anti-forgery token.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Adds collaborator-supplied headers to an outgoing request.
pub trait HeaderProvider: Send + Sync {
    fn attach(&self, headers: &mut HeaderMap);
}

/// Provider that adds nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHeaders;

impl HeaderProvider for NoHeaders {
    fn attach(&self, _headers: &mut HeaderMap) {}
}

/// Attaches `X-CSRF-Token` when a token is configured.
#[derive(Clone, Default)]
pub struct CsrfHeaderProvider {
    token: Option<String>,
}

impl CsrfHeaderProvider {
    pub fn new(token: Option<String>) -> Self {
        let token = token.filter(|t| !t.trim().is_empty());
        Self { token }
    }
}

impl HeaderProvider for CsrfHeaderProvider {
    fn attach(&self, headers: &mut HeaderMap) {
        let Some(token) = &self.token else {
            return;
        };
        match HeaderValue::from_str(token.trim()) {
            Ok(value) => {
                headers.insert(HeaderName::from_static(CSRF_HEADER), value);
            }
            Err(e) => warn!("Ignoring CSRF token that is not a valid header value: {}", e),
        }
    }
}

impl std::fmt::Debug for CsrfHeaderProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsrfHeaderProvider")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
