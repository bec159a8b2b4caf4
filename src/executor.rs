//! HTTP execution with bounded retries.
//!
//! [`RequestExecutor`] performs a single logical request, re-issuing it on 5xx responses and
//! transport failures until [`RetryPolicy::max_retries`] is exhausted, and classifies the final
//! outcome into [`Error`] variants.
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{
    header::{CONTENT_TYPE, RETRY_AFTER},
    Method, StatusCode, Url,
};
use serde::Serialize;

use crate::{Error, Result};

pub(crate) const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// How failed attempts are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one. `0` disables retries.
    pub max_retries: u32,
    /// Pause before each retry.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Single attempt, no retries.
    pub const NONE: RetryPolicy = RetryPolicy {
        max_retries: 0,
        delay: Duration::ZERO,
    };
}

/// A successful (2xx) response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Final status code.
    pub status: StatusCode,
    /// Response body decoded as UTF-8.
    pub body: String,
}

/// Serialize a request body. Failures are caller errors and never reach the network.
pub(crate) fn json_body(value: &impl Serialize) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|err| Error::validation(format!("failed to serialize request body: {err}")))
}

/// Performs HTTP calls with a fixed timeout and retry policy.
///
/// The ads and events paths use separate executors so that their timeout budgets stay
/// independent. Each executor reuses its connection pool between calls.
pub struct RequestExecutor {
    client: reqwest::blocking::Client,
    retry: RetryPolicy,
}

impl RequestExecutor {
    /// Create an executor whose every attempt is bounded by `timeout`.
    ///
    /// Must not be called from within an async runtime.
    pub fn new(timeout: Duration, retry: RetryPolicy) -> Result<RequestExecutor> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        Ok(RequestExecutor { client, retry })
    }

    /// Retry policy applied by [`RequestExecutor::execute`].
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Execute a request, retrying server and transport failures.
    ///
    /// Makes at most `max_retries + 1` attempts. The worst-case wall time is therefore
    /// `timeout * (max_retries + 1) + delay * max_retries`.
    ///
    /// # Errors
    ///
    /// - [`Error::Authentication`], [`Error::NotFound`], [`Error::RateLimit`] and
    ///   [`Error::Validation`] for 4xx responses, without retrying.
    /// - [`Error::Server`] if every attempt got a 5xx response.
    /// - [`Error::Network`] if the last attempt failed at the transport level.
    pub fn execute(&self, method: Method, url: &Url, body: Option<&str>) -> Result<HttpResponse> {
        let mut retry_count: u32 = 0;
        loop {
            match self.attempt(method.clone(), url, body) {
                Ok(response) => return Ok(response),
                Err(err) if err.is_retryable() && retry_count < self.retry.max_retries => {
                    retry_count += 1;
                    log::debug!(target: "retail_ads",
                        url = url.as_str(),
                        retry_count,
                        max_retries = self.retry.max_retries,
                        error:% = err;
                        "retrying request");
                    if !self.retry.delay.is_zero() {
                        std::thread::sleep(self.retry.delay);
                    }
                }
                Err(err) => {
                    log::debug!(target: "retail_ads",
                        url = url.as_str(),
                        retry_count,
                        error:% = err;
                        "request failed");
                    return Err(err);
                }
            }
        }
    }

    fn attempt(&self, method: Method, url: &Url, body: Option<&str>) -> Result<HttpResponse> {
        let mut request = self.client.request(method, url.clone());
        if let Some(body) = body {
            request = request
                .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
                .body(body.to_owned());
        }

        let response = request.send()?;
        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| parse_retry_after(value, Utc::now()));
        let body = response.text()?;

        log::trace!(target: "retail_ads", url = url.as_str(), status = status.as_u16(); "received response");

        classify(status, url, retry_after, body)
    }
}

fn classify(
    status: StatusCode,
    url: &Url,
    retry_after: Option<Duration>,
    body: String,
) -> Result<HttpResponse> {
    match status.as_u16() {
        200..=299 => Ok(HttpResponse { status, body }),
        401 => Err(Error::Authentication),
        404 => Err(Error::NotFound {
            url: url.to_string(),
        }),
        429 => Err(Error::RateLimit { retry_after }),
        400..=499 => Err(Error::Validation {
            status: Some(status),
            message: format!("client error: {} - {}", status.as_u16(), body),
        }),
        500..=599 => Err(Error::Server { status }),
        _ => Err(Error::UnexpectedStatus { status }),
    }
}

/// Parse a `Retry-After` header in either delta-seconds or HTTP-date form.
fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    let date = DateTime::parse_from_rfc2822(value).ok()?;
    Some(
        date.with_timezone(&Utc)
            .signed_duration_since(now)
            .to_std()
            .unwrap_or(Duration::ZERO),
    )
}

#[cfg(test)]
mod tests {
    use std::{
        net::TcpListener,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        time::{Duration, Instant},
    };

    use chrono::{TimeZone, Utc};
    use reqwest::{Method, StatusCode, Url};

    use super::{json_body, parse_retry_after, RequestExecutor, RetryPolicy, JSON_CONTENT_TYPE};
    use crate::Error;

    fn executor(max_retries: u32) -> RequestExecutor {
        RequestExecutor::new(
            Duration::from_millis(2_000),
            RetryPolicy {
                max_retries,
                delay: Duration::ZERO,
            },
        )
        .unwrap()
    }

    fn url(server: &mockito::ServerGuard, path: &str) -> Url {
        Url::parse(&format!("{}{}", server.url(), path)).unwrap()
    }

    /// A server that accepts connections and closes them without answering.
    fn dropping_server() -> (Url, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));
        {
            let accepted = accepted.clone();
            std::thread::spawn(move || {
                for stream in listener.incoming() {
                    accepted.fetch_add(1, Ordering::SeqCst);
                    drop(stream);
                }
            });
        }
        (Url::parse(&format!("http://{addr}/beacon")).unwrap(), accepted)
    }

    #[test]
    fn unserializable_body_is_a_validation_error() {
        let body = std::collections::BTreeMap::from([((1u8, 2u8), 3u8)]);

        let err = json_body(&body).unwrap_err();

        assert!(matches!(err, Error::Validation { status: None, .. }), "got {err:?}");
        assert!(!err.is_retryable());
    }

    #[test]
    fn returns_body_on_success() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/v1/rma/publisher")
            .match_header("content-type", JSON_CONTENT_TYPE)
            .match_body(r#"{"a":1}"#)
            .with_status(200)
            .with_body(r#"{"top":[]}"#)
            .create();

        let response = executor(3)
            .execute(
                Method::POST,
                &url(&server, "/v1/rma/publisher"),
                Some(r#"{"a":1}"#),
            )
            .unwrap();

        mock.assert();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, r#"{"top":[]}"#);
    }

    #[test]
    fn makes_exactly_max_retries_plus_one_attempts_on_server_errors() {
        for max_retries in [0, 1, 3] {
            let mut server = mockito::Server::new();
            let mock = server
                .mock("POST", "/ads")
                .with_status(503)
                .expect(max_retries + 1)
                .create();

            let err = executor(max_retries as u32)
                .execute(Method::POST, &url(&server, "/ads"), Some("{}"))
                .unwrap_err();

            mock.assert();
            assert!(
                matches!(err, Error::Server { status } if status == StatusCode::SERVICE_UNAVAILABLE)
            );
        }
    }

    #[test]
    fn makes_exactly_max_retries_plus_one_attempts_on_transport_errors() {
        let (url, accepted) = dropping_server();

        let err = executor(2)
            .execute(Method::POST, &url, Some("{}"))
            .unwrap_err();

        assert!(matches!(err, Error::Network(_)), "got {err:?}");
        assert_eq!(accepted.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn waits_retry_delay_between_attempts() {
        let mut server = mockito::Server::new();
        let mock = server.mock("GET", "/").with_status(500).expect(3).create();
        let executor = RequestExecutor::new(
            Duration::from_millis(2_000),
            RetryPolicy {
                max_retries: 2,
                delay: Duration::from_millis(50),
            },
        )
        .unwrap();

        let started = Instant::now();
        let _ = executor.execute(Method::GET, &url(&server, "/"), None);

        mock.assert();
        assert!(started.elapsed() >= Duration::from_millis(100));
    }

    #[test]
    fn does_not_retry_client_errors() {
        let cases = [
            (401, "authentication"),
            (404, "not found"),
            (422, "validation"),
            (429, "rate limit"),
        ];

        for (status, name) in cases {
            let mut server = mockito::Server::new();
            let mock = server
                .mock("POST", "/ads")
                .with_status(status)
                .with_body("bad placement")
                .expect(1)
                .create();

            let err = executor(3)
                .execute(Method::POST, &url(&server, "/ads"), Some("{}"))
                .unwrap_err();

            mock.assert();
            let matches = match status {
                401 => matches!(err, Error::Authentication),
                404 => matches!(err, Error::NotFound { .. }),
                429 => matches!(err, Error::RateLimit { .. }),
                _ => matches!(
                    &err,
                    Error::Validation { status: Some(s), message }
                        if s.as_u16() == 422 && message.contains("bad placement")
                ),
            };
            assert!(matches, "{name}: got {err:?}");
        }
    }

    #[test]
    fn carries_retry_after_on_rate_limit() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/ads")
            .with_status(429)
            .with_header("retry-after", "30")
            .create();

        let err = executor(0)
            .execute(Method::POST, &url(&server, "/ads"), Some("{}"))
            .unwrap_err();

        assert!(matches!(
            err,
            Error::RateLimit { retry_after: Some(d) } if d == Duration::from_secs(30)
        ));
    }

    #[test]
    fn parses_retry_after_forms() {
        let now = Utc.with_ymd_and_hms(2015, 10, 21, 7, 27, 0).unwrap();

        assert_eq!(parse_retry_after(" 120 ", now), Some(Duration::from_secs(120)));
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT", now),
            Some(Duration::from_secs(60))
        );
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2015 07:00:00 GMT", now),
            Some(Duration::ZERO)
        );
        assert_eq!(parse_retry_after("soon", now), None);
    }
}
