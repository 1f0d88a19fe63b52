//! Best-effort GitHub star count for the project badge.
//!
//! Failures are logged and reported as zero; nothing here ever reaches the
//! ingestion session.

use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use super::client::ApiClient;
use super::types::RepoInfo;

/// Repository whose stars are shown.
pub const STAR_REPO_API: &str = "https://api.github.com/repos/cyclotruc/gitingest";

const STARS_TIMEOUT_SECS: u64 = 10;

impl ApiClient {
    /// Star count of the project repository; `0` on any failure.
    pub async fn github_stars(&self) -> u64 {
        self.fetch_stars(STAR_REPO_API).await
    }

    pub(super) async fn fetch_stars(&self, url: &str) -> u64 {
        let response = self
            .client
            .get(url)
            .headers(self.request_headers(&Uuid::new_v4().to_string()))
            .timeout(Duration::from_secs(STARS_TIMEOUT_SECS))
            .send()
            .await;

        let response = match response {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                debug!("Star count request returned HTTP {}", r.status());
                return 0;
            }
            Err(e) => {
                warn!("Failed to fetch GitHub stars: {}", e);
                return 0;
            }
        };

        match response.json::<RepoInfo>().await {
            Ok(info) => info.stargazers_count,
            Err(e) => {
                warn!("Failed to parse GitHub stars response: {}", e);
                0
            }
        }
    }
}

/// `1234` renders as `1.2k`; smaller counts are shown as-is.
pub fn format_star_count(count: u64) -> String {
    if count >= 1000 {
        format!("{:.1}k", count as f64 / 1000.0)
    } else {
        count.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::headers::NoHeaders;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;
    use std::sync::Arc;

    async fn spawn_server(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_format_star_count() {
        assert_eq!(format_star_count(0), "0");
        assert_eq!(format_star_count(999), "999");
        assert_eq!(format_star_count(1000), "1.0k");
        assert_eq!(format_star_count(12_345), "12.3k");
    }

    #[tokio::test]
    async fn test_fetch_stars() {
        let router = Router::new().route(
            "/repo",
            get(|| async { axum::Json(serde_json::json!({ "stargazers_count": 4321 })) }),
        );
        let base = spawn_server(router).await;
        let client = ApiClient::new(&base, Arc::new(NoHeaders)).unwrap();
        assert_eq!(client.fetch_stars(&format!("{}/repo", base)).await, 4321);
    }

    #[tokio::test]
    async fn test_fetch_stars_failure_is_zero() {
        let router = Router::new().route(
            "/repo",
            get(|| async { StatusCode::FORBIDDEN }),
        );
        let base = spawn_server(router).await;
        let client = ApiClient::new(&base, Arc::new(NoHeaders)).unwrap();
        assert_eq!(client.fetch_stars(&format!("{}/repo", base)).await, 0);
        assert_eq!(client.fetch_stars(&format!("{}/missing", base)).await, 0);
    }
}
