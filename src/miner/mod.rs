use itertools::iproduct;
use rand::Rng;
use tracing::{info, warn};

use crate::batch;
use crate::client::{self, Fetched, Fetcher};
use crate::error::ScanError;
use crate::session::{ParamFinding, ProbeMethod, Session};

const RANDOM_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const RANDOM_STRING_LEN: usize = 13;
const RANDOM_INT_MAX: u32 = 1000;

/// The values every candidate parameter is tried with, in order: a random
/// alphanumeric token, a random small integer, a low integer, a loopback address
/// and an empty value.
pub fn probe_values() -> Vec<String> {
    let mut rng = rand::thread_rng();
    let token: String = (0..RANDOM_STRING_LEN)
        .map(|_| RANDOM_ALPHABET[rng.gen_range(0..RANDOM_ALPHABET.len())] as char)
        .collect();
    let number = rng.gen_range(0..RANDOM_INT_MAX);
    vec![
        token,
        number.to_string(),
        "1".to_string(),
        "127.0.0.1".to_string(),
        String::new(),
    ]
}

/// Whether a differing body echoes the probe value back. The empty value is trivially
/// contained in any body.
pub fn is_reflected(body: &str, value: &str) -> bool {
    body.contains(value)
}

/// Compares one probe response against the baseline. `None` when the response is not a
/// success or is byte-for-byte identical to the baseline.
pub fn diff_against_baseline(
    param: &str,
    method: ProbeMethod,
    value: &str,
    fetched: &Fetched,
    baseline: &str,
) -> Option<ParamFinding> {
    if !fetched.is_success() || fetched.body == baseline {
        return None;
    }
    Some(ParamFinding {
        param: param.to_string(),
        method,
        differs: true,
        reflected: is_reflected(&fetched.body, value),
    })
}

async fn send_probe(
    fetcher: &Fetcher,
    url: &str,
    param: &str,
    value: &str,
    method: ProbeMethod,
) -> Result<Fetched, ScanError> {
    match method {
        ProbeMethod::Get => {
            fetcher
                .get(&client::with_query_param(url, param, value))
                .await
        }
        ProbeMethod::Post => {
            fetcher
                .post_form(url, &[("Submit", "Submit"), (param, value)])
                .await
        }
    }
}

/// Tries `param` on `url` with every probe value over GET and POST, recording a
/// finding for each (param, method) whose response differs from `baseline`.
pub async fn probe_parameter(
    fetcher: &Fetcher,
    session: &Session,
    url: &str,
    param: &str,
    baseline: &str,
) {
    let values = probe_values();
    for (value, method) in iproduct!(values.iter(), [ProbeMethod::Get, ProbeMethod::Post]) {
        let fetched = match send_probe(fetcher, url, param, value, method).await {
            Ok(fetched) => fetched,
            Err(e) => {
                warn!(%url, %param, %method, error = %e, "error during parameter check");
                continue;
            }
        };
        if let Some(finding) = diff_against_baseline(param, method, value, &fetched, baseline) {
            if finding.reflected {
                info!(%url, %param, %method, "parameter reflected in response");
            }
            if session.record_finding(url, finding) {
                info!(%url, %param, %method, "discovered parameter");
            }
        }
    }
}

/// Fetches the baseline for `url` once, then probes every parameter in windows of
/// `concurrency`. Returns the findings recorded for `url` so far.
pub async fn mine(
    fetcher: &Fetcher,
    session: &Session,
    url: &str,
    params: &[String],
    concurrency: usize,
) -> Vec<ParamFinding> {
    let baseline = match fetcher.get(url).await {
        Ok(fetched) => fetched.body,
        Err(e) => {
            warn!(%url, error = %e, "failed to fetch baseline, skipping");
            return Vec::new();
        }
    };
    info!(%url, params = params.len(), "mining parameters");

    let baseline = baseline.as_str();
    batch::run_batched(params.to_vec(), concurrency, |param| async move {
        probe_parameter(fetcher, session, url, &param, baseline).await
    })
    .await;

    session.findings_for(url)
}
