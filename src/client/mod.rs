use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use thiserror::Error;
use tracing::debug;
use url::form_urlencoded;

use crate::error::ScanError;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:95.0) Gecko/20100101 Firefox/95.0";

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub timeout_seconds: u64,
    pub proxy: Option<String>,
    pub follow_redirects: bool,
    pub header: Option<String>,
    pub rate: Option<u32>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            proxy: None,
            follow_redirects: true,
            header: None,
            rate: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid header '{header}', expected 'Key: Value'")]
    InvalidHeader { header: String },

    #[error("failed to setup proxy: {proxy}: {source}")]
    ProxySetup {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to build HTTP client: {source}")]
    Build {
        #[source]
        source: reqwest::Error,
    },

    #[error("rate must be greater than zero")]
    ZeroRate,
}

/// Status and body of a completed request.
#[derive(Clone, Debug)]
pub struct Fetched {
    /// Where the response came from, after any redirects.
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl Fetched {
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }
}

/// Shared HTTP plumbing: one reqwest client plus an optional requests-per-second cap.
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fetcher")
            .field("client", &self.client)
            .field("rate_limited", &self.limiter.is_some())
            .finish()
    }
}

impl Fetcher {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = build_client(config)?;
        let limiter = match config.rate {
            None => None,
            Some(rate) => {
                let rate = NonZeroU32::new(rate).ok_or(ClientError::ZeroRate)?;
                Some(Arc::new(RateLimiter::direct(Quota::per_second(rate))))
            }
        };
        Ok(Self { client, limiter })
    }

    pub async fn get(&self, url: &str) -> Result<Fetched, ScanError> {
        self.throttle().await;
        debug!(%url, "GET");
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ScanError::network(url, e))?;
        read_response(url, resp).await
    }

    /// POSTs `pairs` as an `application/x-www-form-urlencoded` body.
    pub async fn post_form(&self, url: &str, pairs: &[(&str, &str)]) -> Result<Fetched, ScanError> {
        self.throttle().await;
        debug!(%url, "POST");
        let resp = self
            .client
            .post(url)
            .form(pairs)
            .send()
            .await
            .map_err(|e| ScanError::network(url, e))?;
        read_response(url, resp).await
    }

    async fn throttle(&self) {
        if let Some(limiter) = self.limiter.as_ref() {
            limiter.until_ready().await;
        }
    }
}

async fn read_response(url: &str, resp: reqwest::Response) -> Result<Fetched, ScanError> {
    let status = resp.status().as_u16();
    let final_url = resp.url().to_string();
    let body = resp.text().await.map_err(|e| ScanError::network(url, e))?;
    Ok(Fetched {
        url: final_url,
        status,
        body,
    })
}

fn build_client(config: &ClientConfig) -> Result<reqwest::Client, ClientError> {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::USER_AGENT,
        reqwest::header::HeaderValue::from_static(DEFAULT_USER_AGENT),
    );
    if let Some(raw) = config.header.as_deref().filter(|h| !h.trim().is_empty()) {
        let (key, value) = parse_header(raw)?;
        headers.insert(key, value);
    }

    let redirect_policy = if config.follow_redirects {
        reqwest::redirect::Policy::limited(10)
    } else {
        reqwest::redirect::Policy::none()
    };

    let mut builder = reqwest::Client::builder()
        .default_headers(headers)
        .redirect(redirect_policy)
        .timeout(Duration::from_secs(config.timeout_seconds.max(1)))
        .danger_accept_invalid_hostnames(true)
        .danger_accept_invalid_certs(true);

    if let Some(proxy) = config.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
        let proxy = reqwest::Proxy::all(proxy).map_err(|e| ClientError::ProxySetup {
            proxy: proxy.to_string(),
            source: e,
        })?;
        builder = builder.proxy(proxy);
    }

    builder.build().map_err(|e| ClientError::Build { source: e })
}

fn parse_header(
    raw: &str,
) -> Result<(reqwest::header::HeaderName, reqwest::header::HeaderValue), ClientError> {
    let invalid = || ClientError::InvalidHeader {
        header: raw.to_string(),
    };
    let (key, value) = raw.split_once(':').ok_or_else(invalid)?;
    let key = reqwest::header::HeaderName::from_str(key.trim()).map_err(|_| invalid())?;
    let value = reqwest::header::HeaderValue::from_str(value.trim()).map_err(|_| invalid())?;
    Ok((key, value))
}

/// Appends `param=value` to `url`, keeping any existing query string.
///
/// Name and value are both form-encoded, so spaces become `+` and `&`, `|` and `;`
/// are percent-escaped. A payload such as `& id` therefore stays inside one parameter.
pub fn with_query_param(url: &str, param: &str, value: &str) -> String {
    let pair = form_urlencoded::Serializer::new(String::new())
        .append_pair(param, value)
        .finish();
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{url}{sep}{pair}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_param_uses_question_mark_then_ampersand() {
        assert_eq!(
            with_query_param("http://a/p", "id", "1"),
            "http://a/p?id=1"
        );
        assert_eq!(
            with_query_param("http://a/p?x=2", "id", "1"),
            "http://a/p?x=2&id=1"
        );
    }

    #[test]
    fn query_param_encodes_value() {
        assert_eq!(
            with_query_param("http://a/", "cmd", ";id"),
            "http://a/?cmd=%3Bid"
        );
        assert_eq!(with_query_param("http://a/", "q", ""), "http://a/?q=");
    }

    #[test]
    fn query_param_keeps_shell_payloads_in_one_pair() {
        assert_eq!(
            with_query_param("http://a/", "cmd", "|| id"),
            "http://a/?cmd=%7C%7C+id"
        );
        assert_eq!(
            with_query_param("http://a/", "cmd", "& id"),
            "http://a/?cmd=%26+id"
        );
        assert_eq!(
            with_query_param("http://a/", "my param", "$(id)"),
            "http://a/?my+param=%24%28id%29"
        );
    }

    #[test]
    fn header_requires_key_and_value() {
        assert!(parse_header("X-Test: yes").is_ok());
        assert!(parse_header("no-colon").is_err());
    }

    #[test]
    fn zero_rate_is_rejected() {
        let config = ClientConfig {
            rate: Some(0),
            ..ClientConfig::default()
        };
        assert!(matches!(Fetcher::new(&config), Err(ClientError::ZeroRate)));
    }
}
