//! Keyword-hit evaluation over a small dev set.
//!
//! Each case is run through [`AnswerService::get_answer`], the same path
//! that serves real questions. A case is a hit when every expected keyword
//! occurs in the answer, case-insensitively.

use std::path::Path;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use solorag_core::{Error, Result};
use tracing::{info, warn};

use crate::answer::AnswerService;

/// One dev-set line: `{"question": ..., "keywords": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevCase {
    /// Question to ask.
    pub question: String,

    /// Words the answer must contain.
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Outcome of one case.
#[derive(Debug, Clone, Serialize)]
pub struct CaseResult {
    /// The question asked.
    pub question: String,

    /// Words the answer had to contain.
    pub keywords: Vec<String>,

    /// Whether all keywords were found.
    pub hit: bool,

    /// Wall-clock time for retrieval and generation.
    pub latency: Duration,

    /// Generated answer, if the call succeeded.
    pub answer: Option<String>,

    /// Best-ranked source passage, if any.
    pub top_source: Option<String>,

    /// Failure message, if the call failed.
    pub error: Option<String>,
}

/// Aggregate statistics.
#[derive(Debug, Clone, Serialize)]
pub struct EvalSummary {
    /// Per-case results in dev-set order.
    pub cases: Vec<CaseResult>,

    /// Number of hits.
    pub hits: usize,

    /// Mean latency in seconds.
    pub mean_latency_secs: f64,

    /// 95th percentile latency in seconds.
    pub p95_latency_secs: f64,
}

impl EvalSummary {
    /// Fraction of cases that hit, in `[0, 1]`.
    pub fn hit_rate(&self) -> f64 {
        if self.cases.is_empty() {
            0.0
        } else {
            self.hits as f64 / self.cases.len() as f64
        }
    }
}

/// Whether every keyword occurs in `answer`, ignoring case.
pub fn keywords_hit(answer: &str, keywords: &[String]) -> bool {
    let answer = answer.to_lowercase();
    keywords.iter().all(|k| answer.contains(&k.to_lowercase()))
}

/// Parse a JSON Lines dev set. Blank lines are skipped.
pub fn parse_dev_set(content: &str) -> Result<Vec<DevCase>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line)
                .map_err(|e| Error::invalid_data(format!("dev set line {}: {e}", i + 1)))
        })
        .collect()
}

/// Read a JSON Lines dev set file.
pub fn read_dev_set(path: &Path) -> Result<Vec<DevCase>> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::io_with_path(e, path))?;
    parse_dev_set(&content)
}

/// 95th percentile using the exclusive method over 20 quantiles.
fn p95(sorted: &[f64]) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        len => {
            let (i, n) = (19_i64, 20_i64);
            let m = len as i64 + 1;
            let j = (i * m / n).clamp(1, len as i64 - 1);
            let delta = (i * m - j * n) as f64;
            let j = j as usize;
            (sorted[j - 1] * (n as f64 - delta) + sorted[j] * delta) / n as f64
        }
    }
}

/// Run every case sequentially and summarise.
pub async fn evaluate(service: &AnswerService, cases: &[DevCase]) -> EvalSummary {
    let mut results = Vec::with_capacity(cases.len());

    for case in cases {
        let started = Instant::now();
        let outcome = service.get_answer(&case.question).await;
        let latency = started.elapsed();

        let result = match outcome {
            Ok(answer) => CaseResult {
                question: case.question.clone(),
                keywords: case.keywords.clone(),
                hit: keywords_hit(&answer.answer, &case.keywords),
                latency,
                top_source: answer.sources.first().map(|s| s.text.clone()),
                answer: Some(answer.answer),
                error: None,
            },
            Err(e) => {
                warn!(question = %case.question, error = %e, "evaluation case failed");
                CaseResult {
                    question: case.question.clone(),
                    keywords: case.keywords.clone(),
                    hit: false,
                    latency,
                    answer: None,
                    top_source: None,
                    error: Some(e.to_string()),
                }
            }
        };
        info!(
            hit = result.hit,
            latency_ms = result.latency.as_millis() as u64,
            "evaluation case done"
        );
        results.push(result);
    }

    summarize(results)
}

fn summarize(cases: Vec<CaseResult>) -> EvalSummary {
    let hits = cases.iter().filter(|c| c.hit).count();
    let mut latencies: Vec<f64> = cases.iter().map(|c| c.latency.as_secs_f64()).collect();
    latencies.sort_by(f64::total_cmp);
    let mean = if latencies.is_empty() {
        0.0
    } else {
        latencies.iter().sum::<f64>() / latencies.len() as f64
    };

    EvalSummary {
        p95_latency_secs: p95(&latencies),
        mean_latency_secs: mean,
        hits,
        cases,
    }
}
