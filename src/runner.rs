use std::fmt;

use indicatif::ProgressBar;
use thiserror::Error;
use tracing::info;

use crate::batch::{self, DEFAULT_CONCURRENCY};
use crate::client::{ClientConfig, ClientError, Fetcher};
use crate::crawler::{self, CrawlSummary};
use crate::error::ScanError;
use crate::exploit::{self, ExploitHit};
use crate::miner;
use crate::prober::{self, ProbeOrigin, ProbePolicy};
use crate::scope::Target;
use crate::session::{ParamFinding, Session};
use crate::wordlist::{self, WordlistSource};

#[derive(Clone, Debug)]
pub struct Options {
    pub target: String,
    pub concurrency: usize,
    pub client: ClientConfig,
    pub policy: ProbePolicy,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            target: String::new(),
            concurrency: DEFAULT_CONCURRENCY,
            client: ClientConfig::default(),
            policy: ProbePolicy::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("no target provided")]
    NoTarget,

    #[error("invalid target: {source}")]
    InvalidTarget {
        #[source]
        source: ScanError,
    },

    #[error("invalid concurrency {value}, expected positive integer")]
    InvalidConcurrency { value: usize },

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// One scan session against a single target: the HTTP plumbing plus the discovery state
/// every operation adds to.
pub struct Scanner {
    options: Options,
    target: Target,
    fetcher: Fetcher,
    session: Session,
    pb: ProgressBar,
}

impl fmt::Debug for Scanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scanner")
            .field("options", &self.options)
            .field("target", &self.target)
            .field("fetcher", &self.fetcher)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl Scanner {
    pub fn new(options: Options) -> Result<Self, RunnerError> {
        if options.target.trim().is_empty() {
            return Err(RunnerError::NoTarget);
        }
        if options.concurrency == 0 {
            return Err(RunnerError::InvalidConcurrency {
                value: options.concurrency,
            });
        }
        let target =
            Target::parse(&options.target).map_err(|e| RunnerError::InvalidTarget { source: e })?;
        let fetcher = Fetcher::new(&options.client)?;
        Ok(Self {
            options,
            target,
            fetcher,
            session: Session::new(),
            pb: ProgressBar::hidden(),
        })
    }

    /// Reports batched work on `pb` instead of the default hidden bar.
    pub fn with_progress(mut self, pb: ProgressBar) -> Self {
        self.pb = pb;
        self
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub async fn load_wordlist(&self, source: &WordlistSource) -> Vec<String> {
        wordlist::load_wordlist(&self.fetcher, source).await
    }

    /// Probes every candidate against the target base and returns the ones found, in
    /// wordlist order.
    pub async fn discover_paths(&self, candidates: &[String]) -> Vec<String> {
        self.start_progress(candidates.len(), "discovering paths");
        let results = batch::run_batched(
            candidates.to_vec(),
            self.options.concurrency,
            |candidate| async move {
                let result = prober::probe(
                    &self.fetcher,
                    &self.session,
                    &self.target,
                    &self.options.policy,
                    &candidate,
                    ProbeOrigin::Wordlist,
                )
                .await;
                self.pb.inc(1);
                (candidate, result.found)
            },
        )
        .await;
        self.pb.finish_and_clear();

        let found: Vec<String> = results
            .into_iter()
            .filter(|(_, found)| *found)
            .map(|(candidate, _)| self.target.relative_path(&candidate))
            .collect();
        info!(candidates = candidates.len(), found = found.len(), "discovery done");
        found
    }

    pub async fn crawl(&self, depth: usize) -> CrawlSummary {
        let start = self.target.url().to_string();
        self.crawl_from(&start, depth).await
    }

    pub async fn crawl_from(&self, url: &str, depth: usize) -> CrawlSummary {
        let summary = crawler::crawl(
            &self.fetcher,
            &self.session,
            &self.target,
            &self.options.policy,
            url,
            depth,
        )
        .await;
        info!(
            visited = summary.visited,
            probed = summary.probed,
            found = summary.found,
            "crawl done"
        );
        summary
    }

    pub async fn mine_params(&self, url: &str, params: &[String]) -> Vec<ParamFinding> {
        miner::mine(
            &self.fetcher,
            &self.session,
            url,
            params,
            self.options.concurrency,
        )
        .await
    }

    /// Mines every discovered path, joined back onto the target base. Returns the number
    /// of URLs that produced at least one finding.
    pub async fn mine_discovered(&self, params: &[String]) -> usize {
        let urls: Vec<String> = self
            .session
            .paths()
            .iter()
            .map(|path| self.discovered_url(path))
            .collect();
        self.start_progress(urls.len(), "mining discovered paths");
        let mut productive = 0;
        for url in urls.iter() {
            if !self.mine_params(url, params).await.is_empty() {
                productive += 1;
            }
            self.pb.inc(1);
        }
        self.pb.finish_and_clear();
        productive
    }

    pub async fn test_command_injection(&self, url: &str, param: &str) -> Vec<ExploitHit> {
        exploit::test_command_injection(&self.fetcher, url, param).await
    }

    pub async fn test_xss(&self, url: &str, param: &str, payload: &str) -> Vec<ExploitHit> {
        exploit::test_xss(&self.fetcher, url, param, payload).await
    }

    /// Resolves a user-supplied path for mining or exploit probes: absolute URLs are kept,
    /// anything else is joined onto the target base.
    pub fn resolve(&self, path: Option<&str>) -> String {
        match path.map(str::trim).filter(|p| !p.is_empty()) {
            Some(path) => self.discovered_url(path),
            None => self.target.url().to_string(),
        }
    }

    fn discovered_url(&self, path: &str) -> String {
        let origin = if path.starts_with("http://") || path.starts_with("https://") {
            ProbeOrigin::Crawler
        } else {
            ProbeOrigin::Wordlist
        };
        prober::candidate_url(&self.target, path, origin)
    }

    fn start_progress(&self, len: usize, msg: &'static str) {
        self.pb.reset();
        self.pb.set_length(len as u64);
        self.pb.set_position(0);
        self.pb.set_message(msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner(target: &str) -> Scanner {
        Scanner::new(Options {
            target: target.to_string(),
            ..Options::default()
        })
        .unwrap()
    }

    #[test]
    fn empty_target_is_rejected() {
        assert!(matches!(
            Scanner::new(Options::default()),
            Err(RunnerError::NoTarget)
        ));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let options = Options {
            target: "http://example.com".to_string(),
            concurrency: 0,
            ..Options::default()
        };
        assert!(matches!(
            Scanner::new(options),
            Err(RunnerError::InvalidConcurrency { value: 0 })
        ));
    }

    #[test]
    fn malformed_target_is_rejected() {
        let options = Options {
            target: "example.com/no-scheme".to_string(),
            ..Options::default()
        };
        assert!(matches!(
            Scanner::new(options),
            Err(RunnerError::InvalidTarget { .. })
        ));
    }

    #[test]
    fn bad_header_surfaces_as_client_error() {
        let mut options = Options {
            target: "http://example.com".to_string(),
            ..Options::default()
        };
        options.client.header = Some("missing-colon".to_string());
        assert!(matches!(
            Scanner::new(options),
            Err(RunnerError::Client(ClientError::InvalidHeader { .. }))
        ));
    }

    #[test]
    fn resolve_joins_relative_paths_onto_base() {
        let s = scanner("http://example.com/app/");
        assert_eq!(s.resolve(None), "http://example.com/app/");
        assert_eq!(s.resolve(Some("/login.php")), "http://example.com/app/login.php");
        assert_eq!(s.resolve(Some("admin")), "http://example.com/app/admin");
        assert_eq!(
            s.resolve(Some("http://example.com/x?y=1")),
            "http://example.com/x?y=1"
        );
    }
}
