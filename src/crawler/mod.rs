use std::collections::HashSet;

use scraper::{Html, Selector};
use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::client::Fetcher;
use crate::error::ScanError;
use crate::prober::{self, ProbeOrigin, ProbePolicy};
use crate::scope::{self, Target};
use crate::session::Session;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CrawlSummary {
    pub visited: usize,
    pub probed: usize,
    pub found: usize,
}

// a pending unit of work on the crawl stack
enum Step {
    Visit { url: String, depth: usize },
    Probe { url: String },
}

/// Depth-first, host-scoped crawl starting at `url`.
///
/// Each retained link is expanded completely (one depth level down) and then probed,
/// before its next sibling is touched. A URL is fetched by the crawler at most once per
/// session; it is marked visited before the request goes out. Nothing bounds the number
/// of links followed at a given depth, so a same-host site that generates endless
/// unique links can keep a crawl busy.
pub async fn crawl(
    fetcher: &Fetcher,
    session: &Session,
    target: &Target,
    policy: &ProbePolicy,
    url: &str,
    depth: usize,
) -> CrawlSummary {
    let mut summary = CrawlSummary::default();
    let mut probed: HashSet<String> = HashSet::new();
    let mut stack = vec![Step::Visit {
        url: url.to_string(),
        depth,
    }];

    while let Some(step) = stack.pop() {
        match step {
            Step::Visit { url, depth } => {
                if depth == 0 {
                    continue;
                }
                let url = match scope::canonicalize(&url) {
                    Ok(url) => url,
                    Err(e) => {
                        warn!(error = %e, "skipping crawl target");
                        continue;
                    }
                };
                if !session.mark_visited(&url) {
                    continue;
                }
                summary.visited += 1;
                info!(%url, depth, "crawling");

                let links = match fetch_links(fetcher, target, &url).await {
                    Ok(links) => links,
                    Err(e) => {
                        warn!(%url, error = %e, "error crawling");
                        continue;
                    }
                };
                for link in links.into_iter().rev() {
                    stack.push(Step::Probe { url: link.clone() });
                    stack.push(Step::Visit {
                        url: link,
                        depth: depth - 1,
                    });
                }
            }
            Step::Probe { url } => {
                if !probed.insert(url.clone()) {
                    continue;
                }
                summary.probed += 1;
                let result =
                    prober::probe(fetcher, session, target, policy, &url, ProbeOrigin::Crawler)
                        .await;
                if result.found {
                    summary.found += 1;
                }
            }
        }
    }

    summary
}

async fn fetch_links(
    fetcher: &Fetcher,
    target: &Target,
    url: &str,
) -> Result<Vec<String>, ScanError> {
    let fetched = fetcher.get(url).await?;
    if !fetched.is_success() {
        return Err(ScanError::HttpStatus {
            url: url.to_string(),
            status: fetched.status,
        });
    }
    let links = extract_links(&fetched.body, &fetched.url)?;
    Ok(links
        .into_iter()
        .filter(|link| match target.in_scope(link) {
            Ok(in_scope) => in_scope,
            Err(e) => {
                debug!(error = %e, "dropping link");
                false
            }
        })
        .collect())
}

/// Resolves every anchor's href against `page_url`, keeping absolute http(s) links.
pub fn extract_links(html: &str, page_url: &str) -> Result<Vec<String>, ScanError> {
    let base = Url::parse(page_url).map_err(|e| ScanError::malformed(page_url, e))?;
    let selector = Selector::parse("a[href]").map_err(|e| ScanError::HtmlParse {
        url: page_url.to_string(),
        message: format!("{e:?}"),
    })?;

    let document = Html::parse_document(html);
    let mut links = Vec::new();
    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let resolved = match base.join(href.trim()) {
            Ok(resolved) => resolved,
            Err(_) => continue,
        };
        if resolved.scheme() == "http" || resolved.scheme() == "https" {
            links.push(resolved.to_string());
        }
    }
    Ok(links)
}
