use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use copydesk_common::{DimensionScores, Grade, ScoreBreakdown, Source};
use serde::Serialize;
use uuid::Uuid;

use crate::scorer::{ScoringContext, SourceQualityScorer};

/// One row in the top/bottom performer lists.
#[derive(Debug, Clone, Serialize)]
pub struct SourcePerformance {
    pub source_id: Uuid,
    pub title: String,
    pub overall: f64,
    pub grade: Grade,
}

/// Aggregate statistics over one scored batch.
#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub source_count: usize,
    pub mean: f64,
    pub median: f64,
    pub grade_distribution: BTreeMap<Grade, usize>,
    /// Counts per 10-point bucket: index 0 is [0,10), index 9 is [90,100].
    pub score_buckets: [usize; 10],
    pub dimension_averages: DimensionScores,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QualityReport {
    pub breakdowns: Vec<ScoreBreakdown>,
    pub summary: ReportSummary,
    pub top_performers: Vec<SourcePerformance>,
    pub bottom_performers: Vec<SourcePerformance>,
}

const PERFORMER_LIST_LEN: usize = 5;

impl SourceQualityScorer {
    /// Score every source in the batch and summarize the batch as a whole.
    pub fn generate_quality_report(
        &self,
        sources: &[Source],
        ctx: &ScoringContext,
    ) -> QualityReport {
        let breakdowns: Vec<ScoreBreakdown> =
            sources.iter().map(|s| self.score(s, ctx)).collect();

        let summary = summarize(&breakdowns, ctx.now);

        let mut ranked: Vec<(usize, f64)> = breakdowns
            .iter()
            .enumerate()
            .map(|(i, b)| (i, b.overall))
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let performance = |&(i, _): &(usize, f64)| SourcePerformance {
            source_id: sources[i].id,
            title: sources[i].title.clone(),
            overall: breakdowns[i].overall,
            grade: breakdowns[i].grade,
        };
        let top_performers: Vec<_> = ranked.iter().take(PERFORMER_LIST_LEN).map(performance).collect();
        let bottom_performers: Vec<_> = ranked
            .iter()
            .rev()
            .take(PERFORMER_LIST_LEN)
            .map(performance)
            .collect();

        QualityReport {
            breakdowns,
            summary,
            top_performers,
            bottom_performers,
        }
    }
}

pub(crate) fn summarize(breakdowns: &[ScoreBreakdown], now: DateTime<Utc>) -> ReportSummary {
    let n = breakdowns.len();
    if n == 0 {
        return ReportSummary {
            source_count: 0,
            mean: 0.0,
            median: 0.0,
            grade_distribution: BTreeMap::new(),
            score_buckets: [0; 10],
            dimension_averages: DimensionScores {
                relevance: 0.0,
                credibility: 0.0,
                recency: 0.0,
                completeness: 0.0,
                uniqueness: 0.0,
            },
            generated_at: now,
        };
    }

    let mean = breakdowns.iter().map(|b| b.overall).sum::<f64>() / n as f64;

    let mut sorted: Vec<f64> = breakdowns.iter().map(|b| b.overall).collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median = if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    };

    let mut grade_distribution = BTreeMap::new();
    let mut score_buckets = [0usize; 10];
    for b in breakdowns {
        *grade_distribution.entry(b.grade).or_insert(0) += 1;
        let bucket = ((b.overall / 10.0).floor() as usize).min(9);
        score_buckets[bucket] += 1;
    }

    let dim_sum = breakdowns.iter().fold(
        (0.0, 0.0, 0.0, 0.0, 0.0),
        |acc, b| {
            let d = &b.dimensions;
            (
                acc.0 + d.relevance,
                acc.1 + d.credibility,
                acc.2 + d.recency,
                acc.3 + d.completeness,
                acc.4 + d.uniqueness,
            )
        },
    );
    let dimension_averages = DimensionScores {
        relevance: dim_sum.0 / n as f64,
        credibility: dim_sum.1 / n as f64,
        recency: dim_sum.2 / n as f64,
        completeness: dim_sum.3 / n as f64,
        uniqueness: dim_sum.4 / n as f64,
    };

    ReportSummary {
        source_count: n,
        mean,
        median,
        grade_distribution,
        score_buckets,
        dimension_averages,
        generated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::ScoringRules;
    use chrono::Duration;
    use std::collections::HashMap;

    fn source(title: &str, age_hours: i64) -> Source {
        Source {
            id: Uuid::new_v4(),
            title: title.to_string(),
            url: format!("https://example.com/{}", Uuid::new_v4()),
            published_at: Some(Utc::now() - Duration::hours(age_hours)),
            authors: vec![],
            citation_count: 0,
            content: "Some body text for the article under test.".to_string(),
            domain: String::new(),
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn report_covers_every_source() {
        let scorer = SourceQualityScorer::new(ScoringRules::default());
        let sources: Vec<Source> = (0..7)
            .map(|i| source(&format!("Headline number {i} about something"), i * 24))
            .collect();
        let ctx = ScoringContext::new(&sources);
        let report = scorer.generate_quality_report(&sources, &ctx);

        assert_eq!(report.breakdowns.len(), 7);
        assert_eq!(report.summary.source_count, 7);
        assert_eq!(report.top_performers.len(), 5);
        assert_eq!(report.bottom_performers.len(), 5);
        assert_eq!(report.summary.score_buckets.iter().sum::<usize>(), 7);
        assert_eq!(
            report.summary.grade_distribution.values().sum::<usize>(),
            7
        );
    }

    #[test]
    fn median_of_even_count_averages_middle_pair() {
        let scorer = SourceQualityScorer::new(ScoringRules::default());
        let sources: Vec<Source> = (0..4)
            .map(|i| source(&format!("Distinct headline {i} entirely"), i))
            .collect();
        let ctx = ScoringContext::new(&sources);
        let report = scorer.generate_quality_report(&sources, &ctx);

        let mut overalls: Vec<f64> = report.breakdowns.iter().map(|b| b.overall).collect();
        overalls.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let expected = (overalls[1] + overalls[2]) / 2.0;
        assert!((report.summary.median - expected).abs() < 1e-9);
    }

    #[test]
    fn top_performers_sorted_descending() {
        let scorer = SourceQualityScorer::new(ScoringRules::default());
        let sources: Vec<Source> = (0..6)
            .map(|i| source(&format!("Completely unrelated headline {i}"), i * 100))
            .collect();
        let ctx = ScoringContext::new(&sources);
        let report = scorer.generate_quality_report(&sources, &ctx);

        for pair in report.top_performers.windows(2) {
            assert!(pair[0].overall >= pair[1].overall);
        }
    }

    #[test]
    fn empty_batch_yields_empty_summary() {
        let scorer = SourceQualityScorer::new(ScoringRules::default());
        let sources: Vec<Source> = vec![];
        let ctx = ScoringContext::new(&sources);
        let report = scorer.generate_quality_report(&sources, &ctx);
        assert_eq!(report.summary.source_count, 0);
        assert!(report.top_performers.is_empty());
    }
}
