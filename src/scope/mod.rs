use url::Url;

use crate::error::ScanError;

// the Target struct holds the scan boundary for the lifetime of a scan
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    url: String,
    base: String,
    origin: String,
    host: String,
}

impl Target {
    pub fn parse(input: &str) -> Result<Self, ScanError> {
        let trimmed = input.trim();
        let url = Url::parse(trimmed).map_err(|e| ScanError::malformed(trimmed, e))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ScanError::InvalidInput {
                message: format!("unsupported scheme '{}' in {trimmed}", url.scheme()),
            });
        }
        let host = match url.host_str() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => {
                return Err(ScanError::InvalidInput {
                    message: format!("target has no host: {trimmed}"),
                })
            }
        };
        let origin = url.origin().ascii_serialization();

        let mut base = trimmed.to_string();
        while base.ends_with('/') {
            base.pop();
        }
        Ok(Self {
            url: trimmed.to_string(),
            base,
            origin,
            host,
        })
    }

    /// The target exactly as given. Crawls and target-wide mining start here, so a
    /// trailing slash still decides how relative links resolve.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The URL as given, without trailing slashes. Wordlist entries are joined onto it.
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Whether `url` parses and points at the same host as this target.
    pub fn in_scope(&self, url: &str) -> Result<bool, ScanError> {
        same_host(&self.origin, url)
    }

    /// Strips a leading base URL (or, failing that, the origin) so the result is
    /// relative to the target. Anything else is returned untouched.
    pub fn relative_path(&self, path: &str) -> String {
        for prefix in [self.base.as_str(), self.origin.as_str()] {
            if let Some(rest) = strip_url_prefix(path, prefix) {
                return rest.to_string();
            }
        }
        path.to_string()
    }
}

fn strip_url_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix.is_empty() {
        return None;
    }
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() || rest.starts_with(['/', '?', '#']) {
        Some(rest)
    } else {
        None
    }
}

/// Exact hostname comparison between two absolute URLs.
pub fn same_host(a: &str, b: &str) -> Result<bool, ScanError> {
    let a_url = Url::parse(a).map_err(|e| ScanError::malformed(a, e))?;
    let b_url = Url::parse(b).map_err(|e| ScanError::malformed(b, e))?;
    Ok(a_url.host_str() == b_url.host_str())
}

/// Serializes `url` the way the URL parser does, so `http://h` and `http://h/`
/// end up as the same visited-set key.
pub fn canonicalize(url: &str) -> Result<String, ScanError> {
    Url::parse(url.trim())
        .map(|u| u.to_string())
        .map_err(|e| ScanError::malformed(url, e))
}
