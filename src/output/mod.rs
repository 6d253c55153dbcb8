use indexmap::IndexMap;
use serde::Serialize;

use crate::crawler::CrawlSummary;
use crate::exploit::ExploitHit;
use crate::session::{ParamFinding, Session};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" | "txt" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

pub fn infer_format_from_path(path: &str) -> Option<OutputFormat> {
    let lower = path.trim().to_lowercase();
    if lower.ends_with(".json") {
        return Some(OutputFormat::Json);
    }
    if lower.ends_with(".txt") {
        return Some(OutputFormat::Text);
    }
    None
}

/// Everything one invocation produced, in a shape both renderers share.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ScanReport {
    pub target: String,
    pub paths: Vec<String>,
    pub visited: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crawl: Option<CrawlSummary>,
    pub findings: IndexMap<String, Vec<ParamFinding>>,
    pub hits: Vec<ExploitHit>,
}

impl ScanReport {
    pub fn from_session(target: &str, session: &Session) -> Self {
        let mut visited: Vec<String> = session.visited().into_iter().collect();
        visited.sort();
        Self {
            target: target.to_string(),
            paths: session.paths(),
            visited,
            crawl: None,
            findings: session.findings(),
            hits: Vec::new(),
        }
    }
}

pub fn render_text(report: &ScanReport) -> Vec<u8> {
    let mut out = String::new();
    out.push_str(&format!("target: {}\n", report.target));

    if !report.paths.is_empty() {
        out.push_str("\n[paths]\n");
        for p in &report.paths {
            out.push_str(p);
            out.push('\n');
        }
    }

    if !report.visited.is_empty() {
        out.push_str("\n[visited]\n");
        for v in &report.visited {
            out.push_str(v);
            out.push('\n');
        }
    }

    if !report.findings.is_empty() {
        out.push_str("\n[params]\n");
        for (url, findings) in &report.findings {
            for f in findings {
                out.push_str(&format!("{} {} {}", f.method, url, f.param));
                if f.reflected {
                    out.push_str(" reflected");
                }
                out.push('\n');
            }
        }
    }

    if !report.hits.is_empty() {
        out.push_str("\n[hits]\n");
        for h in &report.hits {
            out.push_str(&format!("{} {} {}={}\n", h.method, h.url, h.param, h.payload));
        }
    }
    out.into_bytes()
}

pub fn render_json(report: &ScanReport) -> Vec<u8> {
    serde_json::to_vec_pretty(report).unwrap_or_else(|_| b"{}\n".to_vec())
}

pub fn render(report: &ScanReport, format: OutputFormat) -> Vec<u8> {
    match format {
        OutputFormat::Text => render_text(report),
        OutputFormat::Json => render_json(report),
    }
}
