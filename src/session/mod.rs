use std::collections::HashSet;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProbeMethod {
    Get,
    Post,
}

impl ProbeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeMethod::Get => "GET",
            ProbeMethod::Post => "POST",
        }
    }
}

impl fmt::Display for ProbeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parameter that changed the response of the URL it was mined on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ParamFinding {
    pub param: String,
    pub method: ProbeMethod,
    pub differs: bool,
    pub reflected: bool,
}

/// Everything discovered during one scan. Components only ever add to it.
///
/// The containers sit behind mutexes because probes for a window may resume on any
/// runtime worker; no guard is held across an `.await`.
#[derive(Debug, Default)]
pub struct Session {
    visited: Mutex<HashSet<String>>,
    paths: Mutex<IndexSet<String>>,
    findings: Mutex<IndexMap<String, Vec<ParamFinding>>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `url` into the visited set; returns `false` if it was already there.
    pub fn mark_visited(&self, url: &str) -> bool {
        lock(&self.visited).insert(url.to_string())
    }

    pub fn is_visited(&self, url: &str) -> bool {
        lock(&self.visited).contains(url)
    }

    pub fn visited(&self) -> HashSet<String> {
        lock(&self.visited).clone()
    }

    pub fn add_path(&self, path: &str) -> bool {
        lock(&self.paths).insert(path.to_string())
    }

    pub fn paths(&self) -> Vec<String> {
        lock(&self.paths).iter().cloned().collect()
    }

    pub fn has_paths(&self) -> bool {
        !lock(&self.paths).is_empty()
    }

    /// Discovered paths ending in `extension`; a missing leading dot is tolerated.
    pub fn paths_with_extension(&self, extension: &str) -> Vec<String> {
        let ext = extension.trim();
        if ext.is_empty() {
            return Vec::new();
        }
        let suffix = if ext.starts_with('.') {
            ext.to_string()
        } else {
            format!(".{ext}")
        };
        lock(&self.paths)
            .iter()
            .filter(|p| p.ends_with(&suffix))
            .cloned()
            .collect()
    }

    /// Records a finding for `url`. Returns `true` when the (param, method) pair is
    /// new for that URL. A repeat only upgrades the reflection flag.
    pub fn record_finding(&self, url: &str, finding: ParamFinding) -> bool {
        let mut findings = lock(&self.findings);
        let entries = findings.entry(url.to_string()).or_default();
        match entries
            .iter_mut()
            .find(|f| f.param == finding.param && f.method == finding.method)
        {
            Some(existing) => {
                existing.reflected |= finding.reflected;
                false
            }
            None => {
                entries.push(finding);
                true
            }
        }
    }

    pub fn findings(&self) -> IndexMap<String, Vec<ParamFinding>> {
        lock(&self.findings).clone()
    }

    pub fn findings_for(&self, url: &str) -> Vec<ParamFinding> {
        lock(&self.findings).get(url).cloned().unwrap_or_default()
    }
}
