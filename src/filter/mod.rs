pub mod analyzer;
pub mod categories;
pub mod credibility;
pub mod keywords;
pub mod pipeline;
pub mod types;

pub use analyzer::{AnalysisInput, AnalyzerChain, ContentAnalyzer, HeuristicAnalyzer, LlmContentAnalyzer};
pub use credibility::{RatingUpdate, SourceCredibilityStore, UNKNOWN_SOURCE};
pub use keywords::analyze_text;
pub use pipeline::{ArticleScoringPipeline, IngestOutcome, IngestSummary, ScoreWeights};
