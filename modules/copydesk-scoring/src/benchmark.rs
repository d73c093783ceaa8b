use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use copydesk_common::{CopydeskError, DimensionScores, Source};
use serde::Serialize;
use tracing::info;

use crate::report::{summarize, ReportSummary};
use crate::scorer::{ScoringContext, SourceQualityScorer};

/// A named snapshot of batch statistics, for before/after comparisons across
/// rule changes or source-pool changes.
#[derive(Debug, Clone, Serialize)]
pub struct Benchmark {
    pub name: String,
    pub summary: ReportSummary,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkComparison {
    pub baseline: String,
    pub candidate: String,
    pub overall_delta: f64,
    /// Percent change of the candidate mean relative to the baseline mean.
    pub overall_pct_change: f64,
    pub dimension_deltas: DimensionScores,
}

/// Named snapshots, bounded so a long-running process cannot accumulate them
/// indefinitely. Oldest snapshot is evicted at capacity.
pub struct BenchmarkStore {
    snapshots: Mutex<HashMap<String, Benchmark>>,
    capacity: usize,
}

pub const DEFAULT_BENCHMARK_CAPACITY: usize = 256;

impl BenchmarkStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            snapshots: Mutex::new(HashMap::new()),
            capacity: capacity.max(2),
        }
    }

    /// Score the batch and store its summary under the given name.
    /// Re-using a name overwrites the previous snapshot.
    pub fn record(
        &self,
        name: &str,
        scorer: &SourceQualityScorer,
        sources: &[Source],
        ctx: &ScoringContext,
    ) -> Benchmark {
        let breakdowns: Vec<_> = sources.iter().map(|s| scorer.score(s, ctx)).collect();
        let benchmark = Benchmark {
            name: name.to_string(),
            summary: summarize(&breakdowns, ctx.now),
            created_at: ctx.now,
        };

        let mut snapshots = self.snapshots.lock().expect("benchmark lock poisoned");
        if snapshots.len() >= self.capacity && !snapshots.contains_key(name) {
            if let Some(oldest) = snapshots
                .values()
                .min_by_key(|b| b.created_at)
                .map(|b| b.name.clone())
            {
                snapshots.remove(&oldest);
            }
        }
        snapshots.insert(name.to_string(), benchmark.clone());
        info!(name, sources = sources.len(), "Benchmark recorded");
        benchmark
    }

    pub fn get(&self, name: &str) -> Option<Benchmark> {
        self.snapshots
            .lock()
            .expect("benchmark lock poisoned")
            .get(name)
            .cloned()
    }

    /// Per-dimension and overall deltas of `candidate` against `baseline`.
    pub fn compare(&self, baseline: &str, candidate: &str) -> Result<BenchmarkComparison, CopydeskError> {
        let snapshots = self.snapshots.lock().expect("benchmark lock poisoned");
        let a = snapshots
            .get(baseline)
            .ok_or_else(|| CopydeskError::Config(format!("unknown benchmark '{baseline}'")))?;
        let b = snapshots
            .get(candidate)
            .ok_or_else(|| CopydeskError::Config(format!("unknown benchmark '{candidate}'")))?;

        let overall_delta = b.summary.mean - a.summary.mean;
        let overall_pct_change = if a.summary.mean.abs() < f64::EPSILON {
            0.0
        } else {
            overall_delta / a.summary.mean * 100.0
        };

        let da = &a.summary.dimension_averages;
        let db = &b.summary.dimension_averages;
        Ok(BenchmarkComparison {
            baseline: baseline.to_string(),
            candidate: candidate.to_string(),
            overall_delta,
            overall_pct_change,
            dimension_deltas: DimensionScores {
                relevance: db.relevance - da.relevance,
                credibility: db.credibility - da.credibility,
                recency: db.recency - da.recency,
                completeness: db.completeness - da.completeness,
                uniqueness: db.uniqueness - da.uniqueness,
            },
        })
    }
}

impl Default for BenchmarkStore {
    fn default() -> Self {
        Self::new(DEFAULT_BENCHMARK_CAPACITY)
    }
}
