pub mod benchmark;
pub mod history;
pub mod report;
pub mod rules;
pub mod scorer;

pub use benchmark::{Benchmark, BenchmarkComparison, BenchmarkStore};
pub use history::{HistoryEntry, ScoreHistory, TrendDirection, TrendReport};
pub use report::{QualityReport, ReportSummary, SourcePerformance};
pub use rules::ScoringRules;
pub use scorer::{ScoringContext, SourceQualityScorer};
