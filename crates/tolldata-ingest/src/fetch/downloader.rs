//! Single-reference downloader with retry and multiplicative backoff

use super::FetchError;
use crate::config::FetchConfig;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, NoProxy, Proxy};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// The sequence of delays between attempts: `initial, initial * m,
/// initial * m^2, ...`
#[derive(Debug, Clone)]
pub struct BackoffSchedule {
    next: Duration,
    multiplier: u32,
}

impl BackoffSchedule {
    pub fn new(initial: Duration, multiplier: u32) -> Self {
        Self {
            next: initial,
            multiplier,
        }
    }
}

impl Iterator for BackoffSchedule {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let current = self.next;
        self.next = current.saturating_mul(self.multiplier);
        Some(current)
    }
}

/// Fetches one reference document over HTTP.
///
/// Redirects are followed. An attempt counts as successful only when the
/// response is 2xx and carries a non-empty `Content-Type` header; anything
/// else is retried until the attempt budget runs out.
pub struct ReferenceDownloader {
    client: Client,
    config: FetchConfig,
}

impl ReferenceDownloader {
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        config
            .validate()
            .map_err(|e| FetchError::Config(e.to_string()))?;

        let mut builder = Client::builder()
            .timeout(config.request_timeout())
            .default_headers(build_headers(&config)?);

        let no_proxy = config
            .proxy
            .no_proxy
            .as_deref()
            .and_then(NoProxy::from_string);

        if let Some(http) = &config.proxy.http {
            builder = builder.proxy(Proxy::http(http)?.no_proxy(no_proxy.clone()));
        }
        if let Some(https) = &config.proxy.https {
            builder = builder.proxy(Proxy::https(https)?.no_proxy(no_proxy));
        }

        let client = builder.build()?;

        Ok(Self { client, config })
    }

    /// Fetch the body of `url`, retrying with backoff.
    ///
    /// The cancellation token is consulted before every sleep so a sweep can
    /// be aborted mid-backoff instead of running out the whole budget.
    pub async fn fetch(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, FetchError> {
        let mut delays =
            BackoffSchedule::new(self.config.backoff_initial(), self.config.backoff_multiplier);
        let mut last_error: Option<FetchError> = None;

        for attempt in 1..=self.config.max_attempts {
            match self.attempt(url).await {
                Ok(body) => {
                    debug!(url = %url, attempt, bytes = body.len(), "fetched reference");
                    return Ok(body);
                },
                Err(e) => {
                    warn!(url = %url, attempt, error = %e, "fetch attempt failed");
                    last_error = Some(e);
                },
            }

            if attempt < self.config.max_attempts {
                if cancel.is_cancelled() {
                    return Err(FetchError::Cancelled);
                }

                // BackoffSchedule is infinite, unwrap_or is unreachable
                let delay = delays.next().unwrap_or_default();
                debug!(url = %url, delay_secs = delay.as_secs(), "retrying after backoff");

                tokio::select! {
                    _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                    _ = tokio::time::sleep(delay) => {},
                }
            }
        }

        Err(FetchError::Exhausted {
            url: url.to_string(),
            attempts: self.config.max_attempts,
            last_error: last_error.map(|e| e.to_string()).unwrap_or_default(),
        })
    }

    async fn attempt(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let has_content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .map(|v| !v.as_bytes().is_empty())
            .unwrap_or(false);

        if !has_content_type {
            return Err(FetchError::MissingContentType {
                url: url.to_string(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

/// Headers come verbatim from the configured JSON file, or default to a
/// single User-Agent.
fn build_headers(config: &FetchConfig) -> Result<HeaderMap, FetchError> {
    let mut headers = HeaderMap::new();

    match &config.headers_file {
        Some(path) => {
            let raw = std::fs::read_to_string(path).map_err(|e| {
                FetchError::Config(format!("cannot read headers file {}: {}", path.display(), e))
            })?;
            let entries: BTreeMap<String, String> = serde_json::from_str(&raw).map_err(|e| {
                FetchError::Config(format!("headers file {} is not a JSON object of strings: {}", path.display(), e))
            })?;

            for (name, value) in entries {
                let name = HeaderName::from_bytes(name.as_bytes())
                    .map_err(|e| FetchError::Config(format!("bad header name {:?}: {}", name, e)))?;
                let value = HeaderValue::from_str(&value)
                    .map_err(|e| FetchError::Config(format!("bad header value for {}: {}", name, e)))?;
                headers.insert(name, value);
            }
        },
        None => {
            let agent = HeaderValue::from_str(&config.user_agent)
                .map_err(|e| FetchError::Config(format!("bad user agent: {}", e)))?;
            headers.insert(USER_AGENT, agent);
        },
    }

    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config() -> FetchConfig {
        FetchConfig {
            max_workers: 4,
            timeout_secs: 5,
            backoff_initial_secs: 0,
            backoff_multiplier: 2,
            max_attempts: 3,
            user_agent: "tolldata-test/1.0".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_backoff_schedule_doubles_from_initial() {
        let delays: Vec<u64> = BackoffSchedule::new(Duration::from_secs(15), 2)
            .take(4)
            .map(|d| d.as_secs())
            .collect();
        assert_eq!(delays, vec![15, 30, 60, 120]);
    }

    #[test]
    fn test_backoff_schedule_with_multiplier_one_is_constant() {
        let delays: Vec<u64> = BackoffSchedule::new(Duration::from_secs(5), 1)
            .take(3)
            .map(|d| d.as_secs())
            .collect();
        assert_eq!(delays, vec![5, 5, 5]);
    }

    #[test]
    fn test_headers_file_is_loaded_verbatim() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"user-agent": "custom/2.0", "accept": "application/pdf"}}"#
        )
        .unwrap();

        let config = FetchConfig {
            headers_file: Some(file.path().to_path_buf()),
            ..test_config()
        };
        let headers = build_headers(&config).unwrap();

        assert_eq!(headers.get("user-agent").unwrap(), "custom/2.0");
        assert_eq!(headers.get("accept").unwrap(), "application/pdf");
    }

    #[test]
    fn test_default_headers_are_a_single_user_agent() {
        let headers = build_headers(&test_config()).unwrap();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get(USER_AGENT).unwrap(), "tolldata-test/1.0");
    }

    #[tokio::test]
    async fn test_first_attempt_success_issues_one_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a.pdf"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(b"%PDF-1.4".to_vec(), "application/pdf"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let downloader = ReferenceDownloader::new(test_config()).unwrap();
        let body = downloader
            .fetch(&format!("{}/a.pdf", server.uri()), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(body, b"%PDF-1.4");
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky.pdf"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky.pdf"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(b"%PDF-1.4".to_vec(), "application/pdf"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let downloader = ReferenceDownloader::new(test_config()).unwrap();
        let body = downloader
            .fetch(
                &format!("{}/flaky.pdf", server.uri()),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(body, b"%PDF-1.4");
    }

    #[tokio::test]
    async fn test_exhausts_attempts_on_persistent_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone.pdf"))
            .respond_with(ResponseTemplate::new(404))
            .expect(3)
            .mount(&server)
            .await;

        let downloader = ReferenceDownloader::new(test_config()).unwrap();
        let err = downloader
            .fetch(
                &format!("{}/gone.pdf", server.uri()),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        match err {
            FetchError::Exhausted { attempts, last_error, .. } => {
                assert_eq!(attempts, 3);
                assert!(last_error.contains("404"));
            },
            other => panic!("expected Exhausted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_content_type_counts_as_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/untyped.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4".to_vec()))
            .mount(&server)
            .await;

        let config = FetchConfig {
            max_attempts: 1,
            ..test_config()
        };
        let downloader = ReferenceDownloader::new(config).unwrap();
        let err = downloader
            .fetch(
                &format!("{}/untyped.pdf", server.uri()),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        match err {
            FetchError::Exhausted { last_error, .. } => {
                assert!(last_error.contains("content type"));
            },
            other => panic!("expected Exhausted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancelled_token_aborts_before_retry_sleep() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/down.pdf"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        // Long backoff: without cancellation this test would hang
        let config = FetchConfig {
            backoff_initial_secs: 3600,
            ..test_config()
        };
        let downloader = ReferenceDownloader::new(config).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = downloader
            .fetch(&format!("{}/down.pdf", server.uri()), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Cancelled));
    }
}
