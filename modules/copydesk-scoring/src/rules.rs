use std::path::Path;

use anyhow::{Context, Result};
use copydesk_common::DimensionWeights;
use serde::Deserialize;

/// Data-driven rule tables for the scorer. Constructed once and injected —
/// nothing in here is module-level state, so tests can run with custom tables.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ScoringRules {
    pub weights: DimensionWeights,
    pub relevance: RelevanceRules,
    pub credibility: CredibilityRules,
    pub recency: RecencyRules,
    pub completeness: CompletenessRules,
    pub uniqueness: UniquenessRules,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            weights: DimensionWeights::default(),
            relevance: RelevanceRules::default(),
            credibility: CredibilityRules::default(),
            recency: RecencyRules::default(),
            completeness: CompletenessRules::default(),
            uniqueness: UniquenessRules::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RelevanceRules {
    pub base: f64,
    pub title_match_bonus: f64,
    pub content_match_bonus: f64,
    /// Titles inside this character range read as well-formed headlines.
    pub title_min_chars: usize,
    pub title_max_chars: usize,
    pub title_shape_bonus: f64,
    pub substantial_content_chars: usize,
    pub substantial_content_bonus: f64,
}

impl Default for RelevanceRules {
    fn default() -> Self {
        Self {
            base: 50.0,
            title_match_bonus: 10.0,
            content_match_bonus: 5.0,
            title_min_chars: 20,
            title_max_chars: 120,
            title_shape_bonus: 5.0,
            substantial_content_chars: 500,
            substantial_content_bonus: 5.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CredibilityRules {
    pub base: f64,
    /// Domain reputation tiers, checked in order; the first matching tier's
    /// bonus applies. Entries match as suffixes of the source domain.
    pub government_domains: Vec<String>,
    pub government_bonus: f64,
    pub academic_domains: Vec<String>,
    pub academic_bonus: f64,
    pub press_domains: Vec<String>,
    pub press_bonus: f64,
    pub ngo_domains: Vec<String>,
    pub ngo_bonus: f64,
    pub financial_domains: Vec<String>,
    pub financial_bonus: f64,
    pub author_bonus: f64,
    /// Metadata keys that count as a persistent identifier.
    pub identifier_keys: Vec<String>,
    pub identifier_bonus: f64,
    pub citation_floor: u32,
    pub citation_bonus: f64,
}

impl Default for CredibilityRules {
    fn default() -> Self {
        Self {
            base: 50.0,
            government_domains: vec![
                ".gov".into(),
                ".mil".into(),
                "europa.eu".into(),
                ".gouv.fr".into(),
                ".gov.uk".into(),
            ],
            government_bonus: 25.0,
            academic_domains: vec![
                ".edu".into(),
                ".ac.uk".into(),
                "arxiv.org".into(),
                "nature.com".into(),
                "sciencedirect.com".into(),
                "springer.com".into(),
                "jstor.org".into(),
            ],
            academic_bonus: 20.0,
            press_domains: vec![
                "reuters.com".into(),
                "apnews.com".into(),
                "bbc.co.uk".into(),
                "bbc.com".into(),
                "economist.com".into(),
                "nytimes.com".into(),
                "theguardian.com".into(),
            ],
            press_bonus: 15.0,
            ngo_domains: vec![
                "un.org".into(),
                "worldbank.org".into(),
                "oecd.org".into(),
                "brookings.edu".into(),
                "rand.org".into(),
            ],
            ngo_bonus: 10.0,
            financial_domains: vec![
                "bloomberg.com".into(),
                "ft.com".into(),
                "wsj.com".into(),
                "morningstar.com".into(),
            ],
            financial_bonus: 10.0,
            author_bonus: 10.0,
            identifier_keys: vec!["doi".into(), "identifier".into(), "isbn".into()],
            identifier_bonus: 10.0,
            citation_floor: 10,
            citation_bonus: 10.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecencyStep {
    pub max_age_hours: i64,
    pub score: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RecencyRules {
    /// Ascending age steps; the first step whose max_age_hours exceeds the
    /// source age wins.
    pub steps: Vec<RecencyStep>,
    /// Older than every step.
    pub fallback: f64,
    /// Source has no publish date at all.
    pub missing_date: f64,
}

impl Default for RecencyRules {
    fn default() -> Self {
        let step = |max_age_hours, score| RecencyStep {
            max_age_hours,
            score,
        };
        Self {
            steps: vec![
                step(1, 100.0),
                step(6, 95.0),
                step(24, 90.0),
                step(48, 80.0),
                step(24 * 7, 70.0),
                step(24 * 30, 60.0),
                step(24 * 90, 50.0),
                step(24 * 180, 40.0),
                step(24 * 365, 30.0),
            ],
            fallback: 20.0,
            missing_date: 30.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CompletenessRules {
    pub title_bonus: f64,
    pub long_title_chars: usize,
    pub long_title_bonus: f64,
    /// Ascending (min_chars, bonus) tiers; every tier the content clears adds
    /// its bonus.
    pub content_tiers: Vec<(usize, f64)>,
    pub url_bonus: f64,
    pub date_bonus: f64,
    pub authors_bonus: f64,
    pub keywords_bonus: f64,
    pub identifier_bonus: f64,
}

impl Default for CompletenessRules {
    fn default() -> Self {
        Self {
            title_bonus: 15.0,
            long_title_chars: 30,
            long_title_bonus: 5.0,
            content_tiers: vec![(200, 15.0), (800, 10.0), (2000, 5.0)],
            url_bonus: 10.0,
            date_bonus: 10.0,
            authors_bonus: 15.0,
            keywords_bonus: 10.0,
            identifier_bonus: 10.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct UniquenessRules {
    pub duplicate_url_penalty: f64,
    /// Max title-overlap similarity against the batch is scaled by this.
    pub title_overlap_scale: f64,
    /// Words at or below this length are ignored when comparing titles.
    pub min_word_chars: usize,
}

impl Default for UniquenessRules {
    fn default() -> Self {
        Self {
            duplicate_url_penalty: 50.0,
            title_overlap_scale: 50.0,
            min_word_chars: 3,
        }
    }
}

/// Load scoring rule tables from a TOML file. Missing sections fall back to
/// the built-in defaults.
pub fn load_rules(path: &Path) -> Result<ScoringRules> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read scoring rules: {}", path.display()))?;
    let rules: ScoringRules = toml::from_str(&content)
        .with_context(|| format!("Failed to parse scoring rules: {}", path.display()))?;
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_recency_steps_are_ascending() {
        let rules = RecencyRules::default();
        for pair in rules.steps.windows(2) {
            assert!(pair[0].max_age_hours < pair[1].max_age_hours);
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let rules: ScoringRules = toml::from_str(
            r#"
            [relevance]
            base = 40.0
        "#,
        )
        .unwrap();
        assert_eq!(rules.relevance.base, 40.0);
        assert_eq!(rules.relevance.title_match_bonus, 10.0);
        assert_eq!(rules.credibility.base, 50.0);
    }
}
