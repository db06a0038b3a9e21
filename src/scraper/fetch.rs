//! Encoding-aware HTTP fetching.
//!
//! netkeiba's desktop and db hosts serve EUC-JP, frequently without a usable
//! `Content-Type` charset, while the mobile host serves UTF-8. The body is
//! decoded by, in order: header charset, `<meta>` charset in the first 8 KiB,
//! a per-host default, then UTF-8.

use encoding_rs::{EUC_JP, Encoding, UTF_8};
use regex::Regex;
use reqwest::header::{
    ACCEPT_LANGUAGE, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT,
};
use std::future::Future;
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use super::rate_limiter::RateLimiter;
use crate::config::FetchConfig;

/// Bytes of body inspected for a `<meta>` charset declaration
const META_SNIFF_LEN: usize = 8 * 1024;

/// Lowest configurable gap between request starts (seconds). The first
/// request is not delayed.
pub const MIN_POLITENESS_DELAY_SECS: f64 = 0.5;

/// Hosts known to serve EUC-JP
const EUC_JP_HOSTS: [&str; 4] = [
    "race.netkeiba.com",
    "db.netkeiba.com",
    "nar.netkeiba.com",
    "www.netkeiba.com",
];

static HEADER_CHARSET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)charset\s*=\s*["']?\s*([a-z0-9_.:\-]+)"#).unwrap());

static META_CHARSET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]*?charset\s*=\s*["']?\s*([a-z0-9_.:\-]+)"#).unwrap()
});

/// Fetch errors
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid header '{0}'")]
    InvalidHeader(String),
}

impl FetchError {
    /// HTTP status of the failed response, if there was one
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Client errors other than 429 will not change on retry
    pub fn is_retryable(&self) -> bool {
        !matches!(self.status(), Some(status) if (400..500).contains(&status) && status != 429)
    }
}

/// Source of decoded documents
pub trait Fetch {
    /// Fetch `url`, overriding default request headers with `headers`
    fn fetch_with_headers(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> impl Future<Output = Result<String, FetchError>> + Send;

    /// Fetch `url` with the default headers
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, FetchError>> + Send {
        self.fetch_with_headers(url, &[])
    }
}

/// reqwest-backed fetcher with pacing
pub struct HttpFetcher {
    client: reqwest::Client,
    limiter: RateLimiter,
    user_agent: String,
    accept_language: String,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig, limiter: RateLimiter) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            limiter,
            user_agent: config.user_agent.clone(),
            accept_language: config.accept_language.clone(),
        })
    }

    /// Build a fetcher with the configured politeness delay, never below
    /// [`MIN_POLITENESS_DELAY_SECS`]
    pub fn from_config(config: &FetchConfig) -> Result<Self, FetchError> {
        let min_delay = config.min_delay_secs.max(MIN_POLITENESS_DELAY_SECS);
        if min_delay > config.min_delay_secs {
            warn!(
                "fetch.min_delay_secs {} raised to {}",
                config.min_delay_secs, min_delay
            );
        }
        let limiter = RateLimiter::new(min_delay, config.max_delay_secs);
        Self::new(config, limiter)
    }

    fn request_headers(&self, overrides: &[(&str, &str)]) -> Result<HeaderMap, FetchError> {
        let mut headers = HeaderMap::new();

        let user_agent = HeaderValue::from_str(&self.user_agent)
            .map_err(|_| FetchError::InvalidHeader(USER_AGENT.as_str().to_string()))?;
        headers.insert(USER_AGENT, user_agent);

        let accept_language = HeaderValue::from_str(&self.accept_language)
            .map_err(|_| FetchError::InvalidHeader(ACCEPT_LANGUAGE.as_str().to_string()))?;
        headers.insert(ACCEPT_LANGUAGE, accept_language);

        for (name, value) in overrides {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| FetchError::InvalidHeader(name.to_string()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| FetchError::InvalidHeader(name.as_str().to_string()))?;
            headers.insert(name, value);
        }

        Ok(headers)
    }
}

impl Fetch for HttpFetcher {
    async fn fetch_with_headers(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<String, FetchError> {
        let headers = self.request_headers(headers)?;

        self.limiter.acquire().await;
        debug!("GET {}", url);

        let response = self.client.get(url).headers(headers).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let host = response.url().host_str().map(str::to_string);
        let body = response.bytes().await?;

        Ok(decode_body(content_type.as_deref(), &body, host.as_deref()))
    }
}

/// Pick the text encoding for a response body
pub fn resolve_encoding(
    content_type: Option<&str>,
    body: &[u8],
    host: Option<&str>,
) -> &'static Encoding {
    if let Some(encoding) = content_type.and_then(charset_from_content_type) {
        return encoding;
    }
    if let Some(encoding) = charset_from_meta(body) {
        return encoding;
    }
    if let Some(encoding) = host.and_then(host_default_encoding) {
        return encoding;
    }
    UTF_8
}

/// Decode a body as text using the resolved encoding
pub fn decode_body(content_type: Option<&str>, body: &[u8], host: Option<&str>) -> String {
    decode_with(resolve_encoding(content_type, body, host), body)
}

fn decode_with(encoding: &'static Encoding, body: &[u8]) -> String {
    let (text, actual, had_errors) = encoding.decode(body);
    if had_errors {
        debug!("Malformed {} sequences replaced", actual.name());
    }
    text.into_owned()
}

fn charset_from_content_type(content_type: &str) -> Option<&'static Encoding> {
    let caps = HEADER_CHARSET_RE.captures(content_type)?;
    Encoding::for_label(caps[1].as_bytes())
}

fn charset_from_meta(body: &[u8]) -> Option<&'static Encoding> {
    let head = &body[..body.len().min(META_SNIFF_LEN)];
    let head = String::from_utf8_lossy(head);
    let caps = META_CHARSET_RE.captures(&head)?;
    Encoding::for_label(caps[1].as_bytes())
}

fn host_default_encoding(host: &str) -> Option<&'static Encoding> {
    let host = host.to_ascii_lowercase();
    EUC_JP_HOSTS.contains(&host.as_str()).then_some(EUC_JP)
}
