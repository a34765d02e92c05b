use crate::{NavError, NavResult};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

const USER_AGENT: &str = concat!("NoticeSweep/", env!("CARGO_PKG_VERSION"));

/// Checks that the list URL answers over plain HTTP
///
/// Run before the browser is launched so an unreachable site aborts the run
/// without touching any state. Returns the HTTP status code on success.
pub async fn check_reachable(url: &str, timeout: Duration) -> NavResult<u16> {
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
        .map_err(|e| NavError::Failed(format!("Failed to build HTTP client: {}", e)))?;

    debug!(url, "Checking site reachability");
    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            NavError::Timeout {
                locator: url.to_string(),
                waited_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }
        } else {
            NavError::Failed(format!("{} is unreachable: {}", url, e))
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(NavError::Failed(format!(
            "{} answered with HTTP {}",
            url,
            status.as_u16()
        )));
    }

    info!(url, status = status.as_u16(), "Site reachable");
    Ok(status.as_u16())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_reachable_site() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/list"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/list", server.uri());
        let status = check_reachable(&url, Duration::from_secs(5)).await.unwrap();
        assert_eq!(status, 200);
    }

    #[tokio::test]
    async fn test_server_error_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = check_reachable(&server.uri(), Duration::from_secs(5)).await;
        assert!(matches!(result, Err(NavError::Failed(msg)) if msg.contains("503")));
    }

    #[tokio::test]
    async fn test_slow_site_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let result = check_reachable(&server.uri(), Duration::from_millis(200)).await;
        assert!(matches!(result, Err(NavError::Timeout { .. })));
    }
}
