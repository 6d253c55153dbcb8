use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::client::Fetcher;
use crate::error::ScanError;

pub const DEFAULT_PATH_WORDLIST: &str =
    "https://raw.githubusercontent.com/danielmiessler/SecLists/master/Discovery/Web-Content/common.txt";

pub const DEFAULT_PARAM_WORDLIST: &str = "https://raw.githubusercontent.com/danielmiessler/SecLists/master/Discovery/Web-Content/burp-parameter-names.txt";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WordlistSource {
    Url(String),
    FilePath(String),
    Inline(Vec<String>),
}

impl WordlistSource {
    /// `http://` and `https://` values are fetched, anything else is read from disk.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.starts_with("http://") || value.starts_with("https://") {
            Self::Url(value.to_string())
        } else {
            Self::FilePath(value.to_string())
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::FilePath(path) => path.clone(),
            Self::Inline(words) => format!("inline ({} entries)", words.len()),
        }
    }
}

/// One entry per non-blank line, trimmed, in source order.
pub fn parse_wordlist(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Loads a wordlist. A failed fetch or read is logged and yields an empty list.
pub async fn load_wordlist(fetcher: &Fetcher, source: &WordlistSource) -> Vec<String> {
    let words = match source {
        WordlistSource::Inline(words) => Ok(parse_wordlist(&words.join("\n"))),
        WordlistSource::Url(url) => fetch_wordlist(fetcher, url).await,
        WordlistSource::FilePath(path) => read_wordlist(path).await,
    };
    match words {
        Ok(words) => {
            info!(source = %source.describe(), entries = words.len(), "loaded wordlist");
            words
        }
        Err(e) => {
            warn!(source = %source.describe(), error = %e, "failed to load wordlist");
            Vec::new()
        }
    }
}

async fn fetch_wordlist(fetcher: &Fetcher, url: &str) -> Result<Vec<String>, ScanError> {
    let fetched = fetcher.get(url).await?;
    if !fetched.is_success() {
        return Err(ScanError::HttpStatus {
            url: url.to_string(),
            status: fetched.status,
        });
    }
    Ok(parse_wordlist(&fetched.body))
}

async fn read_wordlist(path: &str) -> Result<Vec<String>, ScanError> {
    let path = crate::config::expand_tilde_string(path);
    let io_error = |e: std::io::Error| ScanError::InvalidInput {
        message: format!("failed to read wordlist '{path}': {e}"),
    };
    let handle = File::open(&path).await.map_err(io_error)?;
    let mut out = Vec::new();
    let mut lines = BufReader::new(handle).lines();
    while let Some(line) = lines.next_line().await.map_err(io_error)? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        out.push(line.to_string());
    }
    Ok(out)
}
