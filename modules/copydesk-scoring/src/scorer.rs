use std::collections::HashSet;

use chrono::{DateTime, Utc};
use copydesk_common::{DimensionScores, Grade, ScoreBreakdown, Source};
use tracing::{debug, warn};

use crate::history::{HistoryEntry, ScoreHistory};
use crate::rules::ScoringRules;

/// Evaluation context for a scoring pass: the query that surfaced the batch
/// (if any) and the sibling sources used for uniqueness comparison.
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext<'a> {
    pub query_terms: Option<&'a [String]>,
    pub batch: &'a [Source],
    pub now: DateTime<Utc>,
}

impl<'a> ScoringContext<'a> {
    pub fn new(batch: &'a [Source]) -> Self {
        Self {
            query_terms: None,
            batch,
            now: Utc::now(),
        }
    }

    pub fn with_query(mut self, terms: &'a [String]) -> Self {
        self.query_terms = Some(terms);
        self
    }

    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }
}

/// Multi-dimensional quality scorer. Pure function of (source, context, rules)
/// apart from the history side channel, so it is safe to call from many
/// threads at once.
pub struct SourceQualityScorer {
    rules: ScoringRules,
    history: ScoreHistory,
}

impl SourceQualityScorer {
    pub fn new(rules: ScoringRules) -> Self {
        Self {
            rules,
            history: ScoreHistory::default(),
        }
    }

    pub fn with_history(rules: ScoringRules, history: ScoreHistory) -> Self {
        Self { rules, history }
    }

    pub fn history(&self) -> &ScoreHistory {
        &self.history
    }

    pub fn rules(&self) -> &ScoringRules {
        &self.rules
    }

    /// Score one source against the context. Every dimension and the overall
    /// land in [0, 100]; malformed fields degrade the affected dimension
    /// instead of failing the whole source.
    pub fn score(&self, source: &Source, ctx: &ScoringContext) -> ScoreBreakdown {
        let dimensions = DimensionScores {
            relevance: self.relevance(source, ctx),
            credibility: self.credibility(source),
            recency: self.recency(source, ctx.now),
            completeness: self.completeness(source),
            uniqueness: self.uniqueness(source, ctx.batch),
        };

        let weights = self.rules.weights;
        let overall = weights.weighted_sum(&dimensions).clamp(0.0, 100.0);
        let grade = Grade::from_score(overall);

        debug!(
            source_id = %source.id,
            overall,
            grade = ?grade,
            "Source scored"
        );

        let breakdown = ScoreBreakdown {
            source_id: source.id,
            url: source.url.clone(),
            dimensions,
            weights,
            overall,
            grade,
            scored_at: ctx.now,
        };

        self.history.record(HistoryEntry {
            source_id: source.id,
            url: source.url.clone(),
            overall,
            dimensions,
            at: ctx.now,
        });

        breakdown
    }

    /// Base 50; bonuses for query-term matches in title and body, plus small
    /// shape bonuses. No query context means the base score stands.
    fn relevance(&self, source: &Source, ctx: &ScoringContext) -> f64 {
        let r = &self.rules.relevance;
        let mut score = r.base;

        if let Some(terms) = ctx.query_terms {
            let title = source.title.to_lowercase();
            let content = source.content.to_lowercase();
            for term in terms {
                let term = term.to_lowercase();
                if term.is_empty() {
                    continue;
                }
                if title.contains(&term) {
                    score += r.title_match_bonus;
                }
                if content.contains(&term) {
                    score += r.content_match_bonus;
                }
            }

            let title_len = source.title.chars().count();
            if (r.title_min_chars..=r.title_max_chars).contains(&title_len) {
                score += r.title_shape_bonus;
            }
            if source.content.chars().count() >= r.substantial_content_chars {
                score += r.substantial_content_bonus;
            }
        }

        score.clamp(0.0, 100.0)
    }

    /// Base 50; one domain-tier bonus (highest tier wins), plus bonuses for
    /// authorship, a persistent identifier, and citations above the floor.
    fn credibility(&self, source: &Source) -> f64 {
        let c = &self.rules.credibility;
        let mut score = c.base;

        let domain = if source.domain.is_empty() {
            domain_of(&source.url)
        } else {
            source.domain.to_lowercase()
        };

        let tiers: [(&[String], f64); 5] = [
            (&c.government_domains, c.government_bonus),
            (&c.academic_domains, c.academic_bonus),
            (&c.press_domains, c.press_bonus),
            (&c.ngo_domains, c.ngo_bonus),
            (&c.financial_domains, c.financial_bonus),
        ];
        for (patterns, bonus) in tiers {
            if patterns.iter().any(|p| domain_matches(&domain, p)) {
                score += bonus;
                break;
            }
        }

        if !source.authors.is_empty() {
            score += c.author_bonus;
        }
        if c.identifier_keys.iter().any(|k| source.metadata.contains_key(k)) {
            score += c.identifier_bonus;
        }
        if source.citation_count >= c.citation_floor {
            score += c.citation_bonus;
        }

        score.clamp(0.0, 100.0)
    }

    /// Step function of age since publication. Missing or future publish
    /// dates fall back to the missing-date default.
    fn recency(&self, source: &Source, now: DateTime<Utc>) -> f64 {
        let r = &self.rules.recency;
        let published_at = match source.published_at {
            Some(t) => t,
            None => return r.missing_date,
        };

        if published_at > now {
            warn!(source_id = %source.id, "Publish date in the future, treating as unknown");
            return r.missing_date;
        }

        let age_hours = (now - published_at).num_hours();
        for step in &r.steps {
            if age_hours < step.max_age_hours {
                return step.score;
            }
        }
        r.fallback
    }

    /// Additive score for field presence and adequacy.
    fn completeness(&self, source: &Source) -> f64 {
        let c = &self.rules.completeness;
        let mut score = 0.0;

        if !source.title.trim().is_empty() {
            score += c.title_bonus;
            if source.title.chars().count() >= c.long_title_chars {
                score += c.long_title_bonus;
            }
        }

        let content_len = source.content.chars().count();
        for (min_chars, bonus) in &c.content_tiers {
            if content_len >= *min_chars {
                score += bonus;
            }
        }

        if !source.url.trim().is_empty() {
            score += c.url_bonus;
        }
        if source.published_at.is_some() {
            score += c.date_bonus;
        }
        if !source.authors.is_empty() {
            score += c.authors_bonus;
        }
        if source.metadata.contains_key("keywords") {
            score += c.keywords_bonus;
        }
        if self
            .rules
            .credibility
            .identifier_keys
            .iter()
            .any(|k| source.metadata.contains_key(k))
        {
            score += c.identifier_bonus;
        }

        score.clamp(0.0, 100.0)
    }

    /// Starts at 100. An exact url duplicate in the batch costs a flat
    /// penalty; near-duplicate titles cost up to `title_overlap_scale` more,
    /// proportional to the worst overlap found.
    fn uniqueness(&self, source: &Source, batch: &[Source]) -> f64 {
        let u = &self.rules.uniqueness;
        let mut score = 100.0;

        let others: Vec<&Source> = batch.iter().filter(|s| s.id != source.id).collect();
        if others.is_empty() {
            return score;
        }

        if others.iter().any(|s| !s.url.is_empty() && s.url == source.url) {
            score -= u.duplicate_url_penalty;
        }

        let own_words = title_words(&source.title, u.min_word_chars);
        let max_overlap = others
            .iter()
            .map(|s| jaccard(&own_words, &title_words(&s.title, u.min_word_chars)))
            .fold(0.0_f64, f64::max);
        score -= max_overlap * u.title_overlap_scale;

        score.clamp(0.0, 100.0)
    }
}

fn domain_of(url: &str) -> String {
    let stripped = url
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    let host = stripped.split('/').next().unwrap_or("");
    host.trim_start_matches("www.").to_lowercase()
}

/// Suffix match: "ec.europa.eu" matches pattern "europa.eu"; the ".gov"
/// pattern matches any domain ending in .gov.
fn domain_matches(domain: &str, pattern: &str) -> bool {
    let pattern = pattern.to_lowercase();
    domain == pattern.trim_start_matches('.') || domain.ends_with(&pattern)
}

fn title_words(title: &str, min_chars: usize) -> HashSet<String> {
    title
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > min_chars)
        .map(|w| w.to_string())
        .collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    intersection / union
}
