use thiserror::Error;

/// Failures a single scan step can run into. None of these abort a scan: the
/// component that hits one logs it and carries on with an incomplete result.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with non-success status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("malformed URL '{url}': {source}")]
    MalformedUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to parse HTML from {url}: {message}")]
    HtmlParse { url: String, message: String },

    #[error("invalid input: {message}")]
    InvalidInput { message: String },
}

impl ScanError {
    pub(crate) fn network(url: &str, source: reqwest::Error) -> Self {
        ScanError::Network {
            url: url.to_string(),
            source,
        }
    }

    pub(crate) fn malformed(url: &str, source: url::ParseError) -> Self {
        ScanError::MalformedUrl {
            url: url.to_string(),
            source,
        }
    }
}
