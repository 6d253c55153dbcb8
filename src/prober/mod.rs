use std::ops::RangeInclusive;
use std::sync::OnceLock;

use regex::Regex;
use tracing::{info, warn};

use crate::client::Fetcher;
use crate::scope::Target;
use crate::session::Session;

pub const DEFAULT_NEGATIVE_PHRASES: [&str; 6] = [
    "invalid request",
    "not found",
    "forbidden",
    "404",
    "error",
    "unauthorized",
];

/// Decides whether a response means "this path exists".
///
/// The phrase list is a soft-404 heuristic: custom error pages that avoid every phrase
/// are reported as found, and real pages mentioning one of them are missed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbePolicy {
    negative_phrases: Vec<String>,
    success_status: RangeInclusive<u16>,
}

impl Default for ProbePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_NEGATIVE_PHRASES, 200..=299)
    }
}

impl ProbePolicy {
    pub fn new<I, S>(negative_phrases: I, success_status: RangeInclusive<u16>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let negative_phrases = negative_phrases
            .into_iter()
            .map(|p| p.as_ref().trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        Self {
            negative_phrases,
            success_status,
        }
    }

    pub fn negative_phrases(&self) -> &[String] {
        &self.negative_phrases
    }

    pub fn success_status(&self) -> &RangeInclusive<u16> {
        &self.success_status
    }

    pub fn is_found(&self, status: u16, body: &str) -> bool {
        if !self.success_status.contains(&status) {
            return false;
        }
        let lower = body.to_lowercase();
        !self
            .negative_phrases
            .iter()
            .any(|phrase| lower.contains(phrase.as_str()))
    }
}

/// Reads a success range from `MIN-MAX` or a lone code, e.g. `200-399` or `200`.
pub fn parse_status_range(value: &str) -> Result<RangeInclusive<u16>, String> {
    let value = value.trim();
    let (low, high) = value.split_once('-').unwrap_or((value, value));
    let code = |raw: &str| -> Result<u16, String> {
        let raw = raw.trim();
        match raw.parse::<u16>() {
            Ok(code) if (100..=599).contains(&code) => Ok(code),
            Ok(_) => Err(format!("status {raw} is outside 100-599")),
            Err(_) => Err(format!("'{raw}' is not a status code")),
        }
    };
    let (low, high) = (code(low)?, code(high)?);
    if low > high {
        return Err(format!("range {low}-{high} is reversed"));
    }
    Ok(low..=high)
}

/// Where a probe candidate came from: a wordlist entry is joined onto the target base,
/// a crawled link is already a full URL.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeOrigin {
    Wordlist,
    Crawler,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProbeResult {
    pub found: bool,
    pub status: Option<u16>,
}

fn repeated_separators() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([^:]/)/+").expect("static separator regex"))
}

/// Collapses runs of `/` unless they directly follow a `:` (the scheme delimiter).
pub fn collapse_separators(url: &str) -> String {
    repeated_separators().replace_all(url, "$1").into_owned()
}

pub fn candidate_url(target: &Target, candidate: &str, origin: ProbeOrigin) -> String {
    match origin {
        ProbeOrigin::Wordlist => collapse_separators(&format!("{}/{}", target.base(), candidate)),
        ProbeOrigin::Crawler => collapse_separators(candidate),
    }
}

/// Requests one candidate and records it in `session` when `policy` calls it found.
/// Failures are logged and reported as not found.
pub async fn probe(
    fetcher: &Fetcher,
    session: &Session,
    target: &Target,
    policy: &ProbePolicy,
    candidate: &str,
    origin: ProbeOrigin,
) -> ProbeResult {
    let url = candidate_url(target, candidate, origin);
    let fetched = match fetcher.get(&url).await {
        Ok(fetched) => fetched,
        Err(e) => {
            warn!(%url, error = %e, "error checking path");
            return ProbeResult {
                found: false,
                status: None,
            };
        }
    };

    let found = policy.is_found(fetched.status, &fetched.body);
    if found {
        let path = target.relative_path(candidate);
        info!(%path, status = fetched.status, "found");
        session.add_path(&path);
    }
    ProbeResult {
        found,
        status: Some(fetched.status),
    }
}
