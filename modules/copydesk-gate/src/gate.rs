use std::fmt;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use copydesk_common::{
    AggregateScore, CopydeskError, Decision, Draft, Outcome, ScoreBreakdown, Source,
    VerticalConfig,
};
use copydesk_policy::cadence::{CadenceTracker, REASON_COOLDOWN};
use copydesk_policy::registry::VerticalPolicyRegistry;
use copydesk_policy::templates::TemplateRegistry;
use copydesk_policy::validator::TemplateValidator;
use copydesk_scoring::{ScoringContext, SourceQualityScorer};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::log::DecisionLog;

/// Evaluation pipeline stages, terminal at Decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStage {
    Received,
    Validating,
    Scoring,
    CadenceCheck,
    Decided,
}

impl fmt::Display for GateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GateStage::Received => "received",
            GateStage::Validating => "validating",
            GateStage::Scoring => "scoring",
            GateStage::CadenceCheck => "cadence_check",
            GateStage::Decided => "decided",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Scores at or above this fraction of a threshold earn HOLD instead of
    /// REJECT.
    pub hold_tolerance: f64,
    pub max_cadence_retries: u32,
    pub cadence_retry_backoff: StdDuration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            hold_tolerance: 0.90,
            max_cadence_retries: 3,
            cadence_retry_backoff: StdDuration::from_millis(25),
        }
    }
}

/// Orchestrates validation, scoring, and cadence into one auditable decision.
/// Synchronous and CPU-bound; the only serialized section is the per-vertical
/// cadence reservation inside the tracker.
pub struct EditorialGate {
    scorer: SourceQualityScorer,
    verticals: Arc<VerticalPolicyRegistry>,
    templates: Arc<TemplateRegistry>,
    cadence: Arc<CadenceTracker>,
    decisions: Arc<dyn DecisionLog>,
    config: GateConfig,
}

impl EditorialGate {
    pub fn new(
        scorer: SourceQualityScorer,
        verticals: Arc<VerticalPolicyRegistry>,
        templates: Arc<TemplateRegistry>,
        cadence: Arc<CadenceTracker>,
        decisions: Arc<dyn DecisionLog>,
    ) -> Self {
        Self {
            scorer,
            verticals,
            templates,
            cadence,
            decisions,
            config: GateConfig::default(),
        }
    }

    pub fn with_config(mut self, config: GateConfig) -> Self {
        self.config = config;
        self
    }

    pub fn scorer(&self) -> &SourceQualityScorer {
        &self.scorer
    }

    pub fn decisions(&self) -> &Arc<dyn DecisionLog> {
        &self.decisions
    }

    /// Evaluate a draft against its resolved sources. Always resolves to
    /// exactly one outcome; nothing escapes the gate boundary.
    pub fn evaluate(&self, draft: &Draft, sources: &[Source], now: DateTime<Utc>) -> Decision {
        debug!(draft_id = %draft.id, stage = %GateStage::Received, "Draft received");

        // --- VALIDATING ---
        debug!(draft_id = %draft.id, stage = %GateStage::Validating, "Validating structure");

        let template = match self.templates.lookup(&draft.publication_type) {
            Some(t) => t,
            None => {
                return self.record(reject(
                    draft,
                    vec![format!(
                        "unknown publication type '{}'",
                        draft.publication_type
                    )],
                    now,
                ));
            }
        };

        let report = TemplateValidator::validate(draft, &template);
        if !report.passed {
            let reasons = report.violations.iter().map(|v| v.to_string()).collect();
            return self.record(reject(draft, reasons, now));
        }

        let vertical = match self.verticals.lookup(&draft.vertical) {
            Some(v) => v,
            None => {
                return self.record(reject(
                    draft,
                    vec![format!("unknown vertical '{}'", draft.vertical)],
                    now,
                ));
            }
        };
        if !vertical
            .allowed_types
            .iter()
            .any(|t| t == &draft.publication_type)
        {
            return self.record(reject(
                draft,
                vec![format!(
                    "publication type '{}' not allowed in vertical '{}'",
                    draft.publication_type, draft.vertical
                )],
                now,
            ));
        }

        // Upstream override: still-developing topic. Bypasses scoring,
        // source floors, and cadence, but never structural validation.
        if draft.deferred {
            return self.record(decision(
                draft,
                Outcome::Defer,
                vec!["flagged by upstream as still developing; continuing to monitor".to_string()],
                None,
                vec![],
                now,
            ));
        }

        // --- SCORING ---
        debug!(draft_id = %draft.id, stage = %GateStage::Scoring, "Scoring sources");

        let ctx = ScoringContext::new(sources).at(now);
        let breakdowns: Vec<ScoreBreakdown> =
            sources.iter().map(|s| self.scorer.score(s, &ctx)).collect();

        let trust = mean(breakdowns.iter().map(|b| b.overall));
        let claims: Vec<_> = draft
            .sections
            .iter()
            .flat_map(|s| s.claims.iter())
            .collect();
        let novelty = mean(claims.iter().map(|c| c.novelty));
        let impact = mean(claims.iter().map(|c| c.impact));
        let aggregate = AggregateScore {
            trust,
            novelty,
            impact,
        };

        let mut reasons = Vec::new();
        let mut outcome = Outcome::Publish;
        let thresholds = &vertical.thresholds;
        let tolerance = self.config.hold_tolerance;

        if !breakdowns.is_empty() {
            check_threshold(&mut reasons, &mut outcome, tolerance, trust, thresholds.min_trust_score, "trust");
        } else {
            reasons.push("no sources resolved for scoring".to_string());
            outcome = Outcome::Reject;
        }
        // Claim metrics only exist when upstream extracted claims.
        if !claims.is_empty() {
            check_threshold(&mut reasons, &mut outcome, tolerance, novelty, thresholds.min_novelty_score, "novelty");
            check_threshold(&mut reasons, &mut outcome, tolerance, impact, thresholds.min_impact_score, "impact");
        }

        if draft.source_ids.len() < thresholds.min_sources {
            reasons.push(format!(
                "insufficient sources ({} < {})",
                draft.source_ids.len(),
                thresholds.min_sources
            ));
            outcome = Outcome::Reject;
        }

        if outcome != Outcome::Publish {
            return self.record(decision(
                draft,
                outcome,
                reasons,
                Some(aggregate),
                breakdowns,
                now,
            ));
        }

        // --- CADENCE_CHECK ---
        debug!(draft_id = %draft.id, stage = %GateStage::CadenceCheck, "Checking cadence");
        self.reserve_and_decide(draft, &vertical, aggregate, breakdowns, now)
    }

    /// Atomic unit: the publish decision is appended to the log inside the
    /// tracker's per-vertical critical section, together with the counter
    /// commit. Conflicts retry a few times, then fail closed to HOLD.
    fn reserve_and_decide(
        &self,
        draft: &Draft,
        vertical: &VerticalConfig,
        aggregate: AggregateScore,
        breakdowns: Vec<ScoreBreakdown>,
        now: DateTime<Utc>,
    ) -> Decision {
        let publish = decision(
            draft,
            Outcome::Publish,
            vec![],
            Some(aggregate),
            breakdowns.clone(),
            now,
        );

        let mut attempt = 0;
        let verdict = loop {
            let result = self.cadence.try_reserve(vertical, &draft.event_tags, now, || {
                self.decisions.append(&publish);
            });
            match result {
                Ok(v) => break v,
                Err(CopydeskError::CadenceConflict(msg)) if attempt < self.config.max_cadence_retries => {
                    attempt += 1;
                    warn!(
                        draft_id = %draft.id,
                        attempt,
                        error = msg.as_str(),
                        "Cadence commit conflict, retrying"
                    );
                    std::thread::sleep(self.config.cadence_retry_backoff);
                }
                Err(e) => {
                    // Fail closed: never PUBLISH past an unverifiable counter.
                    warn!(draft_id = %draft.id, error = %e, "Cadence unavailable, failing closed");
                    return self.record(decision(
                        draft,
                        Outcome::Hold,
                        vec!["cadence state unavailable, held for retry".to_string()],
                        Some(aggregate),
                        breakdowns,
                        now,
                    ));
                }
            }
        };

        if verdict.allowed {
            info!(
                draft_id = %draft.id,
                vertical = draft.vertical.as_str(),
                via_burst = verdict.via_burst,
                stage = %GateStage::Decided,
                "Draft admitted for publication"
            );
            return publish;
        }

        let reason = verdict
            .reason
            .clone()
            .unwrap_or_else(|| "cadence blocked".to_string());
        let outcome = if reason == REASON_COOLDOWN {
            // Temporary: retry after the cooldown lapses.
            Outcome::Hold
        } else {
            // Cap exhausted with no burst: intentional non-publication.
            Outcome::Silence
        };
        self.record(decision(
            draft,
            outcome,
            vec![reason],
            Some(aggregate),
            breakdowns,
            now,
        ))
    }

    fn record(&self, d: Decision) -> Decision {
        info!(
            draft_id = %d.draft_id,
            outcome = ?d.outcome,
            reasons = d.reasons.len(),
            stage = %GateStage::Decided,
            "Decision recorded"
        );
        self.decisions.append(&d);
        d
    }
}

fn decision(
    draft: &Draft,
    outcome: Outcome,
    reasons: Vec<String>,
    score: Option<AggregateScore>,
    breakdowns: Vec<ScoreBreakdown>,
    now: DateTime<Utc>,
) -> Decision {
    Decision {
        id: Uuid::new_v4(),
        draft_id: draft.id,
        outcome,
        reasons,
        score,
        breakdowns,
        decided_at: now,
    }
}

/// Compare a metric against its floor. Within the tolerance band the draft
/// is held rather than rejected; reject always wins over hold.
fn check_threshold(
    reasons: &mut Vec<String>,
    outcome: &mut Outcome,
    tolerance: f64,
    value: f64,
    min: f64,
    label: &str,
) {
    if value >= min {
        return;
    }
    if value >= min * tolerance {
        reasons.push(format!("needs more evidence ({label} {value:.1} < {min:.1})"));
        if *outcome == Outcome::Publish {
            *outcome = Outcome::Hold;
        }
    } else {
        reasons.push(format!("{label} score too low ({value:.1} < {min:.1})"));
        *outcome = Outcome::Reject;
    }
}

fn reject(draft: &Draft, reasons: Vec<String>, now: DateTime<Utc>) -> Decision {
    decision(draft, Outcome::Reject, reasons, None, vec![], now)
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut n = 0usize;
    for v in values {
        sum += v;
        n += 1;
    }
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}
