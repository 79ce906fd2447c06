//! Small JSON-over-HTTP client with safe logging, retries and flexible auth.
//!
//! - Request options: headers, [`Auth`], query params, timeout, retries
//! - Secret query params (`key`, `token`, ...) and `Authorization` headers are
//!   redacted from every log line
//! - 429/5xx and send failures are retried with exponential backoff, honoring
//!   `Retry-After`
//! - Raw request/response logging (target `http.raw`) via `PROSPECTOR_HTTP_RAW=1`
//!
//! ```no_run
//! # async fn demo() -> Result<(), prospector_http::HttpError> {
//! let client = prospector_http::HttpClient::new("https://api.example.com/v1/")?;
//! let got: serde_json::Value = client
//!     .get_json("items", prospector_http::RequestOpts::default())
//!     .await?;
//! # Ok(()) }
//! ```

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use reqwest::{Client, Method, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::sleep;

const RAW_ENV: &str = "PROSPECTOR_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024;
const SNIPPET_MAX: usize = 500;
const REDACTED: &str = "<redacted>";

const SECRET_PARAMS: &[&str] = &[
    "access_token",
    "authorization",
    "auth",
    "key",
    "api_key",
    "token",
    "secret",
    "client_secret",
    "bearer",
];

fn raw_enabled() -> bool {
    matches!(
        std::env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

fn is_secret_param(name: &str) -> bool {
    SECRET_PARAMS.contains(&name.to_ascii_lowercase().as_str())
}

fn redact_pairs(pairs: &[(&str, Cow<'_, str>)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| {
            let value = if is_secret_param(k) {
                REDACTED.to_string()
            } else {
                v.to_string()
            };
            (k.to_string(), value)
        })
        .collect()
}

/// The URL with secret query values replaced, safe to print.
fn redact_url(url: &Url) -> String {
    if url.query().is_none() {
        return url.to_string();
    }
    let mut safe = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let value = if is_secret_param(&k) {
                REDACTED.to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), value)
        })
        .collect();
    safe.query_pairs_mut().clear().extend_pairs(pairs);
    safe.to_string()
}

fn redact_headers(h: &HeaderMap) -> Vec<(String, String)> {
    h.iter()
        .map(|(k, v)| {
            let val = if *k == AUTHORIZATION {
                REDACTED.to_string()
            } else {
                v.to_str().unwrap_or("").to_string()
            };
            (k.as_str().to_string(), val)
        })
        .collect()
}

/// Best-effort curl command for repro/debug, secrets redacted.
fn make_curl(method: &Method, url: &Url, headers: &HeaderMap, body: Option<&[u8]>) -> String {
    let mut parts = vec!["curl".to_string(), format!("-X{method}")];
    for (name, val) in redact_headers(headers) {
        parts.push(format!("-H '{}: {}'", name, val.replace('\'', r"'\''")));
    }
    if let Some(bytes) = body {
        match std::str::from_utf8(bytes) {
            Ok(s) => {
                let mut s = s.to_string();
                truncate_on_char_boundary(&mut s, RAW_MAX_BODY);
                parts.push(format!("-d '{}'", s.replace('\'', r"'\''")));
            }
            Err(_) => parts.push(format!("--data-binary @- # ({} bytes)", bytes.len())),
        }
    }
    parts.push(format!("'{}'", redact_url(url)));
    parts.join(" ")
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("server returned error {status}: {message}, request_id={request_id}")]
    Api {
        status: StatusCode,
        message: String,
        request_id: String,
    },
}

impl HttpError {
    /// HTTP status for [`HttpError::Api`] failures.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HttpError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Authentication strategies supported by the client.
///
/// ```
/// use prospector_http::Auth;
/// use std::borrow::Cow;
///
/// let auth = Auth::Query { name: "key", value: Cow::Borrowed("secret") };
/// assert!(matches!(auth, Auth::Query { name: "key", .. }));
/// ```
#[derive(Clone, Debug)]
pub enum Auth<'a> {
    /// Authorization: Bearer <token>
    Bearer(&'a str),
    /// Custom header carrying the credential.
    Header {
        name: HeaderName,
        value: HeaderValue,
    },
    /// Credential passed as a query parameter (Gemini uses `key`).
    Query {
        name: &'a str,
        value: Cow<'a, str>,
    },
    None,
}

impl Auth<'_> {
    fn kind(&self) -> &'static str {
        match self {
            Auth::Bearer(_) => "bearer",
            Auth::Header { .. } => "header",
            Auth::Query { .. } => "query",
            Auth::None => "none",
        }
    }
}

/// Per-request tuning knobs.
///
/// ```
/// use prospector_http::RequestOpts;
/// use std::time::Duration;
///
/// let opts = RequestOpts {
///     timeout: Some(Duration::from_secs(10)),
///     retries: Some(0),
///     ..Default::default()
/// };
/// assert_eq!(opts.retries, Some(0));
/// assert!(!opts.allow_absolute);
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    pub timeout: Option<Duration>,
    pub retries: Option<usize>,
    pub auth: Option<Auth<'a>>,
    pub headers: Option<HeaderMap>,
    pub query: Option<Vec<(&'a str, Cow<'a, str>)>>,
    /// If true and `path` is an absolute URL, use it as-is (ignore base).
    pub allow_absolute: bool,
}

#[derive(Clone)]
pub struct HttpClient {
    base: Url,
    inner: Client,
    pub default_timeout: Duration,
    pub max_retries: usize,
}

impl HttpClient {
    /// Construct a client anchored to a base URL.
    ///
    /// Relative paths are joined onto `base`, so keep a trailing `/` on bases
    /// that carry a path prefix.
    ///
    /// ```
    /// use prospector_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("https://api.example.com/v1/")?;
    /// assert_eq!(client.default_timeout, Duration::from_secs(15));
    /// assert_eq!(client.max_retries, 2);
    /// assert_eq!(client.base_url().path(), "/v1/");
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(base: &str) -> Result<Self, HttpError> {
        let base = Url::parse(base).map_err(|e| HttpError::Url(e.to_string()))?;
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            base,
            inner,
            default_timeout: Duration::from_secs(15),
            max_retries: 2,
        })
    }

    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    pub fn with_retries(mut self, n: usize) -> Self {
        self.max_retries = n;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// GET JSON with per-request options.
    pub async fn get_json<T>(&self, path: &str, opts: RequestOpts<'_>) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        self.request_json::<(), T>(Method::GET, path, None, opts)
            .await
    }

    /// POST a JSON body and decode a JSON response.
    pub async fn post_json_opts<B, T>(
        &self,
        path: &str,
        body: &B,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request_json(Method::POST, path, Some(body), opts)
            .await
    }

    fn resolve(&self, path: &str, allow_absolute: bool) -> Result<Url, HttpError> {
        if allow_absolute {
            if let Ok(abs) = Url::parse(path) {
                return Ok(abs);
            }
        }
        self.base
            .join(path)
            .map_err(|e| HttpError::Url(e.to_string()))
    }

    async fn request_json<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.resolve(path, opts.allow_absolute)?;
        let max_retries = opts.retries.unwrap_or(self.max_retries);
        let timeout = opts.timeout.unwrap_or(self.default_timeout);

        let body_bytes = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|e| HttpError::Build(format!("body serialization failed: {e}")))?;

        let mut query = opts.query.clone().unwrap_or_default();
        let mut bearer = None;
        let mut auth_header = None;
        match &opts.auth {
            Some(Auth::Bearer(tok)) => bearer = Some(sanitize_api_key(tok)?),
            Some(Auth::Header { name, value }) => auth_header = Some((name.clone(), value.clone())),
            Some(Auth::Query { name, value }) => {
                query.push((*name, Cow::Owned(sanitize_api_key(value)?)))
            }
            Some(Auth::None) | None => {}
        }
        let auth_kind = opts.auth.as_ref().map(Auth::kind).unwrap_or("none");
        let redacted_q = redact_pairs(&query);
        let req_id = uuid::Uuid::new_v4().simple().to_string();

        let mut attempt = 0usize;
        loop {
            let mut rb = self
                .inner
                .request(method.clone(), url.clone())
                .timeout(timeout);
            if !query.is_empty() {
                let pairs: Vec<(&str, &str)> = query.iter().map(|(k, v)| (*k, v.as_ref())).collect();
                rb = rb.query(&pairs);
            }
            if let Some(bytes) = &body_bytes {
                rb = rb.header(CONTENT_TYPE, "application/json").body(bytes.clone());
            }
            if let Some(hdrs) = &opts.headers {
                rb = rb.headers(hdrs.clone());
            }
            if let Some(tok) = &bearer {
                rb = rb.bearer_auth(tok);
            }
            if let Some((name, value)) = &auth_header {
                rb = rb.header(name, value);
            }

            tracing::debug!(
                req_id=%req_id,
                attempt=attempt + 1,
                max_retries,
                method=%method,
                host_path=%format!("{}{}", url.host_str().unwrap_or("-"), url.path()),
                query=?redacted_q,
                timeout_ms=timeout.as_millis() as u64,
                auth_kind,
                has_body=body_bytes.is_some(),
                "http.request.start"
            );
            if raw_enabled() {
                let headers = opts.headers.clone().unwrap_or_default();
                let curl = make_curl(&method, &url, &headers, body_bytes.as_deref());
                tracing::debug!(target: "http.raw", %req_id, %curl, "request");
            }

            let started = Instant::now();
            let sent = match rb.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    let headers = resp.headers().clone();
                    resp.bytes().await.map(|bytes| (status, headers, bytes))
                }
                Err(err) => Err(err),
            };
            let (status, headers, bytes) = match sent {
                Ok(parts) => parts,
                Err(err) => {
                    if attempt < max_retries {
                        attempt += 1;
                        let delay = exponential_backoff(attempt);
                        tracing::warn!(
                            req_id=%req_id,
                            attempt,
                            max_retries,
                            backoff_ms=delay.as_millis() as u64,
                            message=%err,
                            "http.retrying.network"
                        );
                        sleep(delay).await;
                        continue;
                    }
                    tracing::warn!(req_id=%req_id, attempt, message=%err, "http.network_error");
                    return Err(if err.is_timeout() {
                        HttpError::Timeout(timeout)
                    } else {
                        HttpError::Network(err.to_string())
                    });
                }
            };
            let duration_ms = started.elapsed().as_millis() as u64;
            let request_id = headers
                .get("x-request-id")
                .or_else(|| headers.get("x-goog-request-id"))
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-")
                .to_string();

            tracing::debug!(
                req_id=%req_id,
                %status,
                duration_ms,
                body_len=bytes.len(),
                x_request_id=%request_id,
                "http.response.headers"
            );
            if raw_enabled() {
                let mut text = String::from_utf8_lossy(&bytes).into_owned();
                let truncated = truncate_on_char_boundary(&mut text, RAW_MAX_BODY);
                tracing::info!(
                    target: "http.raw",
                    %req_id,
                    %status,
                    duration_ms,
                    headers=?redact_headers(&headers),
                    body=%text,
                    truncated
                );
            }

            let snippet = snip_body(&bytes);
            if status.is_success() {
                return serde_json::from_slice::<T>(&bytes).map_err(|e| {
                    tracing::warn!(
                        req_id=%req_id,
                        serde_err=%e,
                        body_snippet=%snippet,
                        "http.response.decode_error"
                    );
                    HttpError::Decode(e.to_string(), snippet)
                });
            }

            let message = extract_error_message(&bytes);
            let retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
            if retryable && attempt < max_retries {
                attempt += 1;
                let delay = retry_delay(attempt, status, &headers, timeout);
                tracing::warn!(
                    req_id=%req_id,
                    %status,
                    attempt,
                    max_retries,
                    backoff_ms=delay.as_millis() as u64,
                    message=%message,
                    "http.retrying"
                );
                sleep(delay).await;
                continue;
            }

            tracing::warn!(
                req_id=%req_id,
                %status,
                message=%message,
                x_request_id=%request_id,
                body_snippet=%snippet,
                "http.error"
            );
            return Err(HttpError::Api {
                status,
                message,
                request_id,
            });
        }
    }
}

fn exponential_backoff(attempt: usize) -> Duration {
    let shift = attempt.saturating_sub(1).min(16) as u32;
    Duration::from_millis(200u64.saturating_mul(1u64 << shift))
}

/// `Retry-After` is honoured up to `cap`, the per-request timeout.
fn retry_delay(attempt: usize, status: StatusCode, headers: &HeaderMap, cap: Duration) -> Duration {
    if let Some(secs) = retry_after_secs(headers) {
        return Duration::from_secs(secs).min(cap);
    }
    let exp = exponential_backoff(attempt);
    if status == StatusCode::TOO_MANY_REQUESTS {
        exp.max(Duration::from_millis(1100))
    } else {
        exp
    }
}

fn retry_after_secs(h: &HeaderMap) -> Option<u64> {
    h.get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())?
        .trim()
        .parse()
        .ok()
}

/// Pull a human-readable message out of common JSON error envelopes.
///
/// Handles `{"error":{"message":..}}` (Google, OpenAI), `{"errors":[{"message":..}]}`
/// and flat `{"message"|"detail"|"error": ".."}`; falls back to a body snippet.
fn extract_error_message(body: &[u8]) -> String {
    let Ok(v) = serde_json::from_slice::<serde_json::Value>(body) else {
        return snip_body(body);
    };
    let candidates = [
        v.pointer("/error/message"),
        v.pointer("/errors/0/message"),
        v.pointer("/errors/0/detail"),
        v.get("message"),
        v.get("detail"),
        v.get("error"),
    ];
    candidates
        .into_iter()
        .flatten()
        .filter_map(|m| m.as_str())
        .map(str::trim)
        .find(|m| !m.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| snip_body(body))
}

fn truncate_on_char_boundary(s: &mut String, max: usize) -> bool {
    if s.len() <= max {
        return false;
    }
    let mut cut = max;
    while cut > 0 && !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
    true
}

fn snip_body(body: &[u8]) -> String {
    let mut snip = String::from_utf8_lossy(body).into_owned();
    if truncate_on_char_boundary(&mut snip, SNIPPET_MAX) {
        snip.push_str("...");
    }
    snip
}

fn sanitize_api_key(raw: &str) -> Result<String, HttpError> {
    let mut s = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string();
    s.retain(|ch| !ch.is_ascii_whitespace());

    if s.is_empty() {
        return Err(HttpError::Build("API key is empty".into()));
    }
    if !s.is_ascii() {
        return Err(HttpError::Build("API key contains non-ASCII bytes".into()));
    }
    if s.bytes().any(|b| b < 0x20 || b == 0x7F) {
        return Err(HttpError::Build("API key contains control characters".into()));
    }
    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_query_values_are_redacted() {
        let url = Url::parse("https://example.com/v1/models?key=AIza-secret&alt=json").unwrap();
        let safe = redact_url(&url);
        assert!(!safe.contains("AIza-secret"));
        assert!(safe.contains("alt=json"));

        let pairs = vec![("KEY", Cow::Borrowed("x")), ("q", Cow::Borrowed("pizza"))];
        assert_eq!(
            redact_pairs(&pairs),
            vec![
                ("KEY".to_string(), REDACTED.to_string()),
                ("q".to_string(), "pizza".to_string())
            ]
        );
    }

    #[test]
    fn curl_never_contains_authorization_value() {
        let url = Url::parse("https://example.com/x?token=abc").unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        let curl = make_curl(&Method::POST, &url, &headers, Some(br#"{"a":1}"#));
        assert!(!curl.contains("abc"));
        assert!(curl.starts_with("curl -XPOST"));
        assert!(curl.contains(r#"-d '{"a":1}'"#));
    }

    #[test]
    fn error_message_prefers_structured_envelopes() {
        let google = br#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(extract_error_message(google), "API key not valid");

        let list = br#"{"errors":[{"message":"","detail":"quota"}]}"#;
        assert_eq!(extract_error_message(list), "quota");

        let flat = br#"{"error":"nope"}"#;
        assert_eq!(extract_error_message(flat), "nope");

        assert_eq!(extract_error_message(b"plain text"), "plain text");
    }

    #[test]
    fn snippets_respect_char_boundaries() {
        let body = "é".repeat(400);
        let snip = snip_body(body.as_bytes());
        assert!(snip.ends_with("..."));
        assert!(snip.len() <= SNIPPET_MAX + 3);
    }

    #[test]
    fn retry_delay_honors_retry_after_and_429_floor() {
        let mut headers = HeaderMap::new();
        let cap = Duration::from_secs(60);
        assert_eq!(
            retry_delay(1, StatusCode::TOO_MANY_REQUESTS, &headers, cap),
            Duration::from_millis(1100)
        );
        assert_eq!(
            retry_delay(2, StatusCode::BAD_GATEWAY, &headers, cap),
            Duration::from_millis(400)
        );
        headers.insert(RETRY_AFTER, HeaderValue::from_static("3"));
        assert_eq!(
            retry_delay(1, StatusCode::TOO_MANY_REQUESTS, &headers, cap),
            Duration::from_secs(3)
        );
    }

    #[test]
    fn retry_after_is_capped_at_request_timeout() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("86400"));
        assert_eq!(
            retry_delay(1, StatusCode::SERVICE_UNAVAILABLE, &headers, Duration::from_secs(15)),
            Duration::from_secs(15)
        );
    }

    #[test]
    fn api_keys_are_trimmed_and_validated() {
        assert_eq!(sanitize_api_key(" 'AIza 123'\n").unwrap(), "AIza123");
        assert!(sanitize_api_key("").is_err());
        assert!(sanitize_api_key("clé").is_err());
    }
}
