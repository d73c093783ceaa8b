use std::collections::HashMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Sources ---

/// A candidate source backing a draft. Immutable once scored for a given
/// evaluation — the scorer never writes back into it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Source {
    pub id: Uuid,
    pub title: String,
    pub url: String,
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub citation_count: u32,
    /// Body text or abstract, whichever the provider surfaced.
    #[serde(default)]
    pub content: String,
    /// Provider domain, e.g. "europa.eu" or "reuters.com".
    #[serde(default)]
    pub domain: String,
    /// Provider-specific extras: "keywords", "doi", etc.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

// --- Scoring ---

/// Letter bucket derived from the composite score.
/// Boundaries are inclusive on the higher grade: exactly 90 is an A.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            Grade::A
        } else if score >= 75.0 {
            Grade::B
        } else if score >= 60.0 {
            Grade::C
        } else if score >= 40.0 {
            Grade::D
        } else {
            Grade::F
        }
    }
}

/// Per-dimension scores, each bounded to [0, 100].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
pub struct DimensionScores {
    pub relevance: f64,
    pub credibility: f64,
    pub recency: f64,
    pub completeness: f64,
    pub uniqueness: f64,
}

/// Weights applied to each dimension. Must sum to 1.0.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
pub struct DimensionWeights {
    pub relevance: f64,
    pub credibility: f64,
    pub recency: f64,
    pub completeness: f64,
    pub uniqueness: f64,
}

impl Default for DimensionWeights {
    fn default() -> Self {
        Self {
            relevance: 0.30,
            credibility: 0.25,
            recency: 0.20,
            completeness: 0.15,
            uniqueness: 0.10,
        }
    }
}

impl DimensionWeights {
    pub fn sum(&self) -> f64 {
        self.relevance + self.credibility + self.recency + self.completeness + self.uniqueness
    }

    /// Composite score: Σ(dimension × weight).
    pub fn weighted_sum(&self, d: &DimensionScores) -> f64 {
        d.relevance * self.relevance
            + d.credibility * self.credibility
            + d.recency * self.recency
            + d.completeness * self.completeness
            + d.uniqueness * self.uniqueness
    }
}

/// Full scoring result for one source. Append-only history — never mutated
/// after it is recorded.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ScoreBreakdown {
    pub source_id: Uuid,
    pub url: String,
    pub dimensions: DimensionScores,
    pub weights: DimensionWeights,
    pub overall: f64,
    pub grade: Grade,
    pub scored_at: DateTime<Utc>,
}

// --- Claims ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ClaimType {
    Fact,
    Statistic,
    Quote,
    Forecast,
    Analysis,
}

/// A machine-extracted claim inside a draft section. Novelty and impact are
/// upstream estimates in [0, 100]; the gate aggregates them against the
/// vertical's thresholds.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Claim {
    pub text: String,
    pub claim_type: ClaimType,
    #[serde(default)]
    pub novelty: f64,
    #[serde(default)]
    pub impact: f64,
}

// --- Drafts ---

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DraftSection {
    /// Matches a `SectionSpec::id` in the publication template.
    pub section_id: String,
    pub text: String,
    pub word_count: u32,
    #[serde(default)]
    pub claims: Vec<Claim>,
}

/// A candidate publication awaiting an editorial decision. Submitted once per
/// evaluation attempt; the gate never edits it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Draft {
    pub id: Uuid,
    pub vertical: String,
    pub publication_type: String,
    pub sections: Vec<DraftSection>,
    pub source_ids: Vec<Uuid>,
    /// Tags for burst-window matching, e.g. "ecb-rate-decision".
    #[serde(default)]
    pub event_tags: Vec<String>,
    /// Upstream override: topic is still developing, keep monitoring instead
    /// of judging quality or cadence. Structural validation still applies.
    #[serde(default)]
    pub deferred: bool,
}

impl Draft {
    /// Concatenated section text, used for forbidden-phrase scanning.
    pub fn rendered_text(&self) -> String {
        self.sections
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn total_word_count(&self) -> u32 {
        self.sections.iter().map(|s| s.word_count).sum()
    }
}

// --- Cadence ---

/// An open burst window: event-triggered relaxation of the weekly cap.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BurstWindow {
    pub trigger: String,
    pub opened_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Timestamps of extra publications admitted through this window.
    pub extras: Vec<DateTime<Utc>>,
}

/// Per-vertical publication history. Mutated only by successful PUBLISH
/// commits, always under the per-vertical lock.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CadenceState {
    pub vertical: String,
    /// Publish timestamps, pruned past the widest window (30 days).
    pub publishes: Vec<DateTime<Utc>>,
    pub last_published_at: Option<DateTime<Utc>>,
    pub burst: Option<BurstWindow>,
}

impl CadenceState {
    pub fn published_since(&self, since: DateTime<Utc>) -> u32 {
        self.publishes.iter().filter(|t| **t >= since).count() as u32
    }
}

// --- Decisions ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Publish,
    /// Retryable: evidence was close to threshold, or cadence cooldown.
    Hold,
    Reject,
    /// Upstream flagged the topic as still developing.
    Defer,
    /// Intentional non-publication: cadence cap exhausted, no burst active.
    Silence,
}

/// Aggregate quality metrics computed for a draft's evaluation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
pub struct AggregateScore {
    /// Mean of per-source overall scores.
    pub trust: f64,
    /// Mean claim novelty across all sections.
    pub novelty: f64,
    /// Mean claim impact across all sections.
    pub impact: f64,
}

/// The gate's verdict. Immutable once recorded — decisions are the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Decision {
    pub id: Uuid,
    pub draft_id: Uuid,
    pub outcome: Outcome,
    pub reasons: Vec<String>,
    pub score: Option<AggregateScore>,
    pub breakdowns: Vec<ScoreBreakdown>,
    pub decided_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_boundaries_land_on_higher_grade() {
        assert_eq!(Grade::from_score(90.0), Grade::A);
        assert_eq!(Grade::from_score(89.9), Grade::B);
        assert_eq!(Grade::from_score(75.0), Grade::B);
        assert_eq!(Grade::from_score(60.0), Grade::C);
        assert_eq!(Grade::from_score(40.0), Grade::D);
        assert_eq!(Grade::from_score(39.9), Grade::F);
        assert_eq!(Grade::from_score(0.0), Grade::F);
    }

    #[test]
    fn default_weights_sum_to_one() {
        let w = DimensionWeights::default();
        assert!((w.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn weighted_sum_matches_manual_computation() {
        let w = DimensionWeights::default();
        let d = DimensionScores {
            relevance: 80.0,
            credibility: 70.0,
            recency: 90.0,
            completeness: 60.0,
            uniqueness: 100.0,
        };
        let expected = 80.0 * 0.30 + 70.0 * 0.25 + 90.0 * 0.20 + 60.0 * 0.15 + 100.0 * 0.10;
        assert!((w.weighted_sum(&d) - expected).abs() < 1e-9);
    }
}
