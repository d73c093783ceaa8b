use std::collections::VecDeque;
use std::sync::Mutex;

use copydesk_common::Decision;

/// Append-only decision history. Decisions are the audit trail — they are
/// recorded once and never edited.
pub trait DecisionLog: Send + Sync {
    fn append(&self, decision: &Decision);
    /// Most recent decisions, newest first.
    fn recent(&self, limit: usize) -> Vec<Decision>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Bounded in-memory log; oldest entries are evicted at capacity.
pub struct InMemoryDecisionLog {
    entries: Mutex<VecDeque<Decision>>,
    capacity: usize,
}

pub const DEFAULT_LOG_CAPACITY: usize = 10_000;

impl InMemoryDecisionLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }
}

impl Default for InMemoryDecisionLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

impl DecisionLog for InMemoryDecisionLog {
    fn append(&self, decision: &Decision) {
        let mut entries = self.entries.lock().expect("decision log lock poisoned");
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(decision.clone());
    }

    fn recent(&self, limit: usize) -> Vec<Decision> {
        let entries = self.entries.lock().expect("decision log lock poisoned");
        entries.iter().rev().take(limit).cloned().collect()
    }

    fn len(&self) -> usize {
        self.entries.lock().expect("decision log lock poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use copydesk_common::Outcome;
    use uuid::Uuid;

    fn decision(outcome: Outcome) -> Decision {
        Decision {
            id: Uuid::new_v4(),
            draft_id: Uuid::new_v4(),
            outcome,
            reasons: vec!["test".to_string()],
            score: None,
            breakdowns: vec![],
            decided_at: Utc::now(),
        }
    }

    #[test]
    fn recent_returns_newest_first() {
        let log = InMemoryDecisionLog::default();
        log.append(&decision(Outcome::Reject));
        log.append(&decision(Outcome::Publish));
        let recent = log.recent(10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].outcome, Outcome::Publish);
    }

    #[test]
    fn capacity_bounds_the_log() {
        let log = InMemoryDecisionLog::new(2);
        for _ in 0..5 {
            log.append(&decision(Outcome::Hold));
        }
        assert_eq!(log.len(), 2);
    }
}
