use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

use super::cancel::CancelSignal;
use super::headers::HeaderProvider;
use super::http::send_with_deadline;
use super::parser::{parse_response, ResponseBody};
use super::types::{IngestError, IngestForm};
use crate::domain::{IngestRequest, IngestResult};

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default client version (from Cargo.toml)
const DEFAULT_VERSION: &str = env!("CARGO_PKG_VERSION");

const ACCEPTED_TYPES: &str = "application/json, text/html;q=0.9";

/// Build the User-Agent string
fn build_user_agent() -> String {
    std::env::var("REPODIGEST_USER_AGENT")
        .unwrap_or_else(|_| format!("repodigest/{}", DEFAULT_VERSION))
}

/// Anything that can turn an [`IngestRequest`] into an [`IngestResult`].
///
/// Implementations must honour `cancel`: once it fires, they return
/// [`IngestError::Cancelled`] promptly and drop any pending transport work.
#[async_trait]
pub trait IngestTransport: Send + Sync {
    async fn submit(
        &self,
        request: &IngestRequest,
        cancel: &CancelSignal,
    ) -> Result<IngestResult, IngestError>;
}

/// HTTP client for the ingestion service
pub struct ApiClient {
    pub(super) client: Client,
    pub(super) base_url: Url,
    pub(super) user_agent: String,
    pub(super) session_id: String,
    pub(super) timeout: Duration,
    pub(super) header_provider: Arc<dyn HeaderProvider>,
}

impl ApiClient {
    /// Create a new API client for the service at `base_url`
    pub fn new(base_url: &str, header_provider: Arc<dyn HeaderProvider>) -> Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("Invalid server URL: {}", base_url))?;

        // Deadlines are enforced per request in `send_with_deadline`.
        let client = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url,
            user_agent: build_user_agent(),
            session_id: Uuid::new_v4().to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            header_provider,
        })
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Headers common to every request, followed by the provider's.
    pub(super) fn request_headers(&self, request_id: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPTED_TYPES));
        if let Ok(value) = HeaderValue::from_str(&self.user_agent) {
            headers.insert(USER_AGENT, value);
        }
        if let Ok(value) = HeaderValue::from_str(request_id) {
            headers.insert("x-request-id", value);
        }
        if let Ok(value) = HeaderValue::from_str(&self.session_id) {
            headers.insert("x-request-session-id", value);
        }
        self.header_provider.attach(&mut headers);
        headers
    }

    /// Submit an ingestion request with an explicit timeout.
    pub async fn submit_with_timeout(
        &self,
        request: &IngestRequest,
        timeout: Duration,
        cancel: &CancelSignal,
    ) -> Result<IngestResult, IngestError> {
        let request_id = Uuid::new_v4().to_string();

        debug!("=== Ingest Request ===");
        debug!("URL: {}", self.base_url);
        debug!("Repository: {}", request.repository_url());
        debug!(
            "Pattern ({}): {:?}, max file size: {}kb",
            request.pattern_mode(),
            request.pattern(),
            request.max_file_size_kb()
        );
        debug!("Timeout: {:?}", timeout);

        let builder = self
            .client
            .post(self.base_url.clone())
            .headers(self.request_headers(&request_id))
            .form(&IngestForm::from(request));

        let response = send_with_deadline(builder, timeout, cancel).await?;
        debug!(
            "Received {} bytes (HTTP {}) for request {}",
            response.body.len(),
            response.status,
            request_id
        );

        let body = ResponseBody::from_content_type(response.content_type.as_deref(), response.body);
        let result = parse_response(&body)?;
        info!("Ingested {}", request.repository_url());
        Ok(result)
    }
}

#[async_trait]
impl IngestTransport for ApiClient {
    async fn submit(
        &self,
        request: &IngestRequest,
        cancel: &CancelSignal,
    ) -> Result<IngestResult, IngestError> {
        self.submit_with_timeout(request, self.timeout, cancel).await
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::headers::{CsrfHeaderProvider, NoHeaders};
    use crate::domain::PatternMode;
    use axum::http::{HeaderMap as AxumHeaders, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::post;
    use axum::Router;

    const SUMMARY_PAGE: &str =
        r#"<div data-results data-ingest-id="id-9"><textarea class="w-full h-[160px]">ok</textarea></div>"#;

    async fn spawn_server(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/", addr)
    }

    fn request() -> IngestRequest {
        IngestRequest::new("https://github.com/a/b", PatternMode::Exclude, "", 50).unwrap()
    }

    fn client(base_url: &str) -> ApiClient {
        ApiClient::new(base_url, Arc::new(NoHeaders)).unwrap()
    }

    #[test]
    fn test_build_user_agent() {
        let ua = build_user_agent();
        assert!(!ua.is_empty());
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(ApiClient::new("not a url", Arc::new(NoHeaders)).is_err());
    }

    #[tokio::test]
    async fn test_submit_parses_document() {
        let router = Router::new().route(
            "/",
            post(|| async {
                (
                    [(axum::http::header::CONTENT_TYPE, "text/html; charset=utf-8")],
                    SUMMARY_PAGE,
                )
            }),
        );
        let base = spawn_server(router).await;

        let result = client(&base)
            .submit(&request(), &CancelSignal::new())
            .await
            .unwrap();
        assert_eq!(result.summary, "ok");
        assert_eq!(result.ingest_id.as_deref(), Some("id-9"));
    }

    #[tokio::test]
    async fn test_submit_sends_form_and_csrf_header() {
        let router = Router::new().route(
            "/",
            post(|headers: AxumHeaders, body: String| async move {
                let token = headers
                    .get("x-csrf-token")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                axum::Json(serde_json::json!({
                    "summary": body,
                    "tree": token,
                    "content": "",
                }))
            }),
        );
        let base = spawn_server(router).await;

        let client = ApiClient::new(
            &base,
            Arc::new(CsrfHeaderProvider::new(Some("tok-1".to_string()))),
        )
        .unwrap();
        let result = client
            .submit(&request(), &CancelSignal::new())
            .await
            .unwrap();

        assert!(result.summary.contains("input_text=https%3A%2F%2Fgithub.com%2Fa%2Fb"));
        assert!(result.summary.contains("pattern_type=exclude"));
        assert!(result.summary.contains("max_file_size=50"));
        assert_eq!(result.tree, "tok-1");
    }

    #[tokio::test]
    async fn test_429_is_rate_limited() {
        let router = Router::new().route(
            "/",
            post(|| async { StatusCode::TOO_MANY_REQUESTS.into_response() }),
        );
        let base = spawn_server(router).await;

        let err = client(&base)
            .submit(&request(), &CancelSignal::new())
            .await
            .unwrap_err();
        assert_eq!(err, IngestError::RateLimited);
    }

    #[tokio::test]
    async fn test_server_error_is_network_with_status() {
        let router = Router::new().route(
            "/",
            post(|| async { StatusCode::INTERNAL_SERVER_ERROR.into_response() }),
        );
        let base = spawn_server(router).await;

        let err = client(&base)
            .submit(&request(), &CancelSignal::new())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert!(matches!(err, IngestError::Network { .. }));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = client(&format!("http://127.0.0.1:{}/", port))
            .submit(&request(), &CancelSignal::new())
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Network { status: None, .. }));
    }

    #[tokio::test]
    async fn test_slow_server_times_out() {
        let router = Router::new().route(
            "/",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                SUMMARY_PAGE
            }),
        );
        let base = spawn_server(router).await;

        let client = client(&base).with_timeout(Duration::from_millis(100));
        let err = client
            .submit(&request(), &CancelSignal::new())
            .await
            .unwrap_err();
        assert_eq!(err, IngestError::Timeout(Duration::from_millis(100)));
    }

    #[tokio::test]
    async fn test_cancel_aborts_in_flight_request() {
        let router = Router::new().route(
            "/",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                SUMMARY_PAGE
            }),
        );
        let base = spawn_server(router).await;

        let client = client(&base);
        let cancel = CancelSignal::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let err = client.submit(&request(), &cancel).await.unwrap_err();
        assert_eq!(err, IngestError::Cancelled);
        assert_eq!(err.kind(), None);
    }
}
