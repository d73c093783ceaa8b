use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use copydesk_common::DimensionScores;
use serde::Serialize;
use uuid::Uuid;

/// One recorded scoring event.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub source_id: Uuid,
    pub url: String,
    pub overall: f64,
    pub dimensions: DimensionScores,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Declining,
    Stable,
}

/// Comparison of the older half of a window against the newer half.
#[derive(Debug, Clone, Serialize)]
pub struct TrendReport {
    pub direction: TrendDirection,
    pub first_half_avg: f64,
    pub second_half_avg: f64,
    pub delta: f64,
    pub sample_count: usize,
}

/// Delta beyond which a trend counts as a real move rather than noise.
const TREND_THRESHOLD: f64 = 5.0;

/// Bounded, append-only log of scoring events. A ring buffer: once capacity
/// is reached the oldest entries are evicted, so a long-running process never
/// grows without bound.
pub struct ScoreHistory {
    entries: Mutex<VecDeque<HistoryEntry>>,
    capacity: usize,
}

pub const DEFAULT_HISTORY_CAPACITY: usize = 10_000;

impl ScoreHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity: capacity.max(2),
        }
    }

    pub fn record(&self, entry: HistoryEntry) {
        let mut entries = self.entries.lock().expect("history lock poisoned");
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("history lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries recorded at or after the cutoff, oldest first.
    pub fn since(&self, cutoff: DateTime<Utc>) -> Vec<HistoryEntry> {
        let entries = self.entries.lock().expect("history lock poisoned");
        entries.iter().filter(|e| e.at >= cutoff).cloned().collect()
    }

    /// Split the window's entries into an older and a newer half and compare
    /// average overall scores. Needs at least four samples to say anything.
    pub fn trends(&self, window: Duration, now: DateTime<Utc>) -> Option<TrendReport> {
        let recent = self.since(now - window);
        if recent.len() < 4 {
            return None;
        }

        let mid = recent.len() / 2;
        let (first, second) = recent.split_at(mid);
        let avg = |xs: &[HistoryEntry]| xs.iter().map(|e| e.overall).sum::<f64>() / xs.len() as f64;
        let first_half_avg = avg(first);
        let second_half_avg = avg(second);
        let delta = second_half_avg - first_half_avg;

        let direction = if delta > TREND_THRESHOLD {
            TrendDirection::Improving
        } else if delta < -TREND_THRESHOLD {
            TrendDirection::Declining
        } else {
            TrendDirection::Stable
        };

        Some(TrendReport {
            direction,
            first_half_avg,
            second_half_avg,
            delta,
            sample_count: recent.len(),
        })
    }
}

impl Default for ScoreHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(overall: f64, at: DateTime<Utc>) -> HistoryEntry {
        HistoryEntry {
            source_id: Uuid::new_v4(),
            url: "https://example.com".into(),
            overall,
            dimensions: DimensionScores {
                relevance: overall,
                credibility: overall,
                recency: overall,
                completeness: overall,
                uniqueness: overall,
            },
            at,
        }
    }

    #[test]
    fn ring_buffer_evicts_oldest() {
        let history = ScoreHistory::new(3);
        let now = Utc::now();
        for i in 0..5 {
            history.record(entry(i as f64, now));
        }
        assert_eq!(history.len(), 3);
        let all = history.since(now - Duration::hours(1));
        assert_eq!(all[0].overall, 2.0);
    }

    #[test]
    fn improving_trend_detected() {
        let history = ScoreHistory::default();
        let now = Utc::now();
        for i in 0..4 {
            let overall = if i < 2 { 50.0 } else { 70.0 };
            history.record(entry(overall, now - Duration::minutes(10 - i)));
        }
        let report = history.trends(Duration::hours(1), now).unwrap();
        assert_eq!(report.direction, TrendDirection::Improving);
        assert!((report.delta - 20.0).abs() < 1e-9);
    }

    #[test]
    fn small_delta_is_stable() {
        let history = ScoreHistory::default();
        let now = Utc::now();
        for i in 0..6 {
            let overall = if i < 3 { 60.0 } else { 63.0 };
            history.record(entry(overall, now - Duration::minutes(10 - i)));
        }
        let report = history.trends(Duration::hours(1), now).unwrap();
        assert_eq!(report.direction, TrendDirection::Stable);
    }

    #[test]
    fn too_few_samples_yields_none() {
        let history = ScoreHistory::default();
        history.record(entry(50.0, Utc::now()));
        assert!(history.trends(Duration::hours(1), Utc::now()).is_none());
    }
}
