//! Content-negotiating HTTP dispatcher with safe logging.
//!
//! - One GET per [`RequestDescriptor`], carrying a single `Accept` header
//! - Any resolved response is handed back, whatever its status
//! - No retries, no cancellation, and no timeout unless one is configured
//! - Optional *raw* request/response logging via `CATFETCH_HTTP_RAW=1`
//!
//! Example (no_run):
//! ```rust
//! # async fn demo() -> Result<(), catfetch_http::HttpError> {
//! use catfetch_http::{Dispatch, HttpClient, MediaType, RequestDescriptor};
//!
//! let client = HttpClient::new("http://localhost:8080")?;
//! let req = RequestDescriptor::new("/cats", MediaType::Json)?;
//! let resp = client.issue_request(&req).await?;
//! println!("{:?} {}", resp.content_type(), resp.body);
//! # Ok(()) }
//! ```
//!
//! Observability: structured `tracing` events are emitted for request start,
//! response headers, body snippets (truncated), transport failures and
//! (optionally) raw request/response lines on target `http.raw`.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method, Url};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub use reqwest::StatusCode;
pub use reqwest::header;

/// Accept value for the JSON control.
pub const APPLICATION_JSON: &str = "application/json";
/// Accept value for the XML control.
pub const TEXT_XML: &str = "text/xml";

// ==============================
// Raw logging toggles
// ==============================

const RAW_ENV: &str = "CATFETCH_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024; // cap raw body logs (64 KiB)
const SNIPPET_MAX: usize = 500;

fn raw_enabled() -> bool {
    matches!(
        env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

/// Render a best-effort curl command for repro/debug.
fn make_curl(method: &Method, url: &Url, headers: &HeaderMap) -> String {
    let mut parts = vec!["curl".to_string(), format!("-X{}", method)];
    for (name, val) in headers.iter() {
        let v = val.to_str().unwrap_or("");
        parts.push(format!(
            "-H '{}: {}'",
            name.as_str(),
            v.replace('\'', r"'\''")
        ));
    }
    parts.push(format!("'{}'", url.as_str()));
    parts.join(" ")
}

/// Redact sensitive headers for logging
fn redact_headers(h: &HeaderMap) -> Vec<(String, String)> {
    h.iter()
        .map(|(k, v)| {
            let key = k.as_str().to_string();
            let mut val = v.to_str().unwrap_or("").to_string();
            if key.eq_ignore_ascii_case("authorization") || key.eq_ignore_ascii_case("set-cookie")
            {
                val = "<redacted>".into();
            }
            (key, val)
        })
        .collect()
}

// ==============================
// Errors
// ==============================

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
}

// ==============================
// Request & response model
// ==============================

/// Media type placed in the `Accept` header.
///
/// Unsupported values pass through untouched; the server decides what to do
/// with them and the renderer simply won't recognise the reply.
///
/// ```
/// use catfetch_http::MediaType;
///
/// assert_eq!(MediaType::Json.as_str(), "application/json");
/// assert_eq!("text/xml".parse::<MediaType>().unwrap(), MediaType::Xml);
/// assert_eq!(
///     "text/csv".parse::<MediaType>().unwrap(),
///     MediaType::Other("text/csv".into())
/// );
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MediaType {
    Json,
    Xml,
    Other(String),
}

impl MediaType {
    pub fn as_str(&self) -> &str {
        match self {
            MediaType::Json => APPLICATION_JSON,
            MediaType::Xml => TEXT_XML,
            MediaType::Other(raw) => raw,
        }
    }
}

impl FromStr for MediaType {
    type Err = std::convert::Infallible;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Ok(match raw {
            APPLICATION_JSON => MediaType::Json,
            TEXT_XML => MediaType::Xml,
            other => MediaType::Other(other.to_string()),
        })
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to fetch and which representation to ask for. Built fresh per
/// activation and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestDescriptor {
    path: String,
    accept: MediaType,
}

impl RequestDescriptor {
    /// ```
    /// use catfetch_http::{MediaType, RequestDescriptor};
    ///
    /// let req = RequestDescriptor::new("/cats", MediaType::Xml).unwrap();
    /// assert_eq!(req.path(), "/cats");
    /// assert_eq!(req.accept(), &MediaType::Xml);
    /// assert!(RequestDescriptor::new("  ", MediaType::Json).is_err());
    /// ```
    pub fn new(path: impl Into<String>, accept: MediaType) -> Result<Self, HttpError> {
        let path = path.into();
        if path.trim().is_empty() {
            return Err(HttpError::Build("resource path must not be empty".into()));
        }
        Ok(Self { path, accept })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn accept(&self) -> &MediaType {
        &self.accept
    }
}

/// A resolved response. Header lookups are case-insensitive.
#[derive(Clone, Debug)]
pub struct FetchedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl FetchedResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<String>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Raw `Content-Type` value, exactly as sent.
    pub fn content_type(&self) -> Option<&str> {
        self.header(CONTENT_TYPE.as_str())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

// ==============================
// Dispatch seam
// ==============================

/// Issues one request and resolves to whatever the server sent back.
#[async_trait]
pub trait Dispatch: Send + Sync {
    async fn issue_request(&self, req: &RequestDescriptor) -> Result<FetchedResponse, HttpError>;
}

// ==============================
// Client
// ==============================

#[derive(Clone)]
pub struct HttpClient {
    base: Url,
    inner: Client,
    pub timeout: Option<Duration>,
}

impl HttpClient {
    /// Construct a client anchored to a base URL.
    ///
    /// ```no_run
    /// use catfetch_http::{HttpClient, HttpError};
    ///
    /// let client = HttpClient::new("http://localhost:8080")?;
    /// assert!(client.timeout.is_none());
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(base: &str) -> Result<Self, HttpError> {
        let base = Url::parse(base).map_err(|e| HttpError::Url(e.to_string()))?;
        let inner = Client::builder()
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            base,
            inner,
            timeout: None,
        })
    }

    /// Bound each exchange. Off by default: an unanswered request waits forever.
    ///
    /// ```no_run
    /// use catfetch_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("http://localhost:8080")?
    ///     .with_timeout(Duration::from_secs(2));
    /// assert_eq!(client.timeout, Some(Duration::from_secs(2)));
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.timeout = Some(dur);
        self
    }

    /// Relative paths join the base; absolute URLs replace it.
    fn resolve(&self, path: &str) -> Result<Url, HttpError> {
        self.base
            .join(path)
            .map_err(|e| HttpError::Url(e.to_string()))
    }

    async fn send(&self, req: &RequestDescriptor) -> Result<FetchedResponse, HttpError> {
        let url = self.resolve(req.path())?;
        let method = Method::GET;

        let accept = HeaderValue::from_str(req.accept().as_str())
            .map_err(|e| HttpError::Build(format!("invalid Accept header: {e}")))?;
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, accept);

        let mut rb = self
            .inner
            .request(method.clone(), url.clone())
            .headers(headers.clone());
        if let Some(timeout) = self.timeout {
            rb = rb.timeout(timeout);
        }

        let req_id = uuid::Uuid::new_v4().simple().to_string();

        tracing::debug!(
            req_id=%req_id,
            method=%method,
            host_path=%format!("{}{}", url.host_str().unwrap_or("-"), url.path()),
            accept=%req.accept(),
            timeout_ms=?self.timeout.map(|t| t.as_millis() as u64),
            "http.request.start"
        );

        if raw_enabled() {
            let curl = make_curl(&method, &url, &headers);
            tracing::debug!(target: "http.raw", %req_id, %curl, "request");
        }

        // ----- Send -----
        let t0 = std::time::Instant::now();
        let resp = rb.send().await.map_err(|err| {
            let message = err.to_string();
            tracing::warn!(req_id=%req_id, message=%message, "http.network_error.send");
            HttpError::Network(message)
        })?;

        let status = resp.status();
        let headers = resp.headers().clone();

        // Second suspension point: the body may still be streaming in.
        let bytes = resp.bytes().await.map_err(|err| {
            let message = err.to_string();
            tracing::warn!(req_id=%req_id, %status, message=%message, "http.network_error.body");
            HttpError::Network(message)
        })?;
        let dur_ms = t0.elapsed().as_millis() as u64;

        tracing::debug!(
            req_id=%req_id,
            %status,
            duration_ms=dur_ms,
            body_len=bytes.len(),
            content_type=?headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
            "http.response.headers"
        );

        if raw_enabled() {
            let hdrs = redact_headers(&headers);
            let truncated = bytes.len() > RAW_MAX_BODY;
            let text = String::from_utf8_lossy(&bytes[..bytes.len().min(RAW_MAX_BODY)]);
            tracing::info!(
                target:"http.raw",
                %req_id,
                status=%status,
                duration_ms=dur_ms,
                headers=?hdrs,
                body=%text,
                truncated
            );
        }

        tracing::trace!(
            req_id=%req_id,
            body_snippet=%snip_body(&bytes),
            "http.response.body_snippet"
        );

        if !status.is_success() {
            // Not an error: the renderer still gets a look at it.
            tracing::info!(req_id=%req_id, %status, "http.response.non_success");
        }

        Ok(FetchedResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

#[async_trait]
impl Dispatch for HttpClient {
    async fn issue_request(&self, req: &RequestDescriptor) -> Result<FetchedResponse, HttpError> {
        self.send(req).await
    }
}

// ==============================
// Helpers
// ==============================

fn snip_body(body: &[u8]) -> String {
    let mut snip = String::from_utf8_lossy(body).to_string();
    if snip.len() > SNIPPET_MAX {
        let mut cut = SNIPPET_MAX;
        while !snip.is_char_boundary(cut) {
            cut -= 1;
        }
        snip.truncate(cut);
        snip.push_str("...");
    }
    snip
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_media_types_pass_through() {
        let mt: MediaType = "application/x-cat".parse().unwrap();
        assert_eq!(mt.as_str(), "application/x-cat");
        assert_eq!(mt.to_string(), "application/x-cat");
    }

    #[test]
    fn content_type_lookup_ignores_header_case() {
        let mut headers = HeaderMap::new();
        headers.insert("Content-Type", HeaderValue::from_static("text/xml"));
        let resp = FetchedResponse::new(StatusCode::OK, headers, "<cat/>");
        assert_eq!(resp.content_type(), Some("text/xml"));
        assert_eq!(resp.header("CONTENT-TYPE"), Some("text/xml"));
    }

    #[test]
    fn missing_content_type_is_none() {
        let resp = FetchedResponse::new(StatusCode::OK, HeaderMap::new(), "");
        assert_eq!(resp.content_type(), None);
    }

    #[test]
    fn relative_paths_join_the_base() {
        let client = HttpClient::new("http://localhost:8080/api/").unwrap();
        assert_eq!(
            client.resolve("cats").unwrap().as_str(),
            "http://localhost:8080/api/cats"
        );
        assert_eq!(
            client.resolve("/cats").unwrap().as_str(),
            "http://localhost:8080/cats"
        );
    }

    #[test]
    fn absolute_paths_replace_the_base() {
        let client = HttpClient::new("http://localhost:8080/").unwrap();
        assert_eq!(
            client.resolve("http://other.test/cats").unwrap().as_str(),
            "http://other.test/cats"
        );
    }

    #[test]
    fn curl_line_carries_accept_header() {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(TEXT_XML));
        let url = Url::parse("http://localhost/cats").unwrap();
        let curl = make_curl(&Method::GET, &url, &headers);
        assert_eq!(
            curl,
            "curl -XGET -H 'accept: text/xml' 'http://localhost/cats'"
        );
    }

    #[test]
    fn snippets_are_truncated_on_char_boundaries() {
        let body = "é".repeat(400);
        let snip = snip_body(body.as_bytes());
        assert!(snip.ends_with("..."));
        assert!(snip.len() <= SNIPPET_MAX + 3);
    }
}
