use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Political lean of a publisher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BiasRating {
    Left,
    CenterLeft,
    Center,
    CenterRight,
    Right,
    Unknown,
}

impl fmt::Display for BiasRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BiasRating::Left => write!(f, "left"),
            BiasRating::CenterLeft => write!(f, "center-left"),
            BiasRating::Center => write!(f, "center"),
            BiasRating::CenterRight => write!(f, "center-right"),
            BiasRating::Right => write!(f, "right"),
            BiasRating::Unknown => write!(f, "unknown"),
        }
    }
}

impl From<&str> for BiasRating {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "left" => BiasRating::Left,
            "center-left" => BiasRating::CenterLeft,
            "center" => BiasRating::Center,
            "center-right" => BiasRating::CenterRight,
            "right" => BiasRating::Right,
            _ => BiasRating::Unknown,
        }
    }
}

/// Factual-reporting tier of a publisher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FactualReporting {
    VeryHigh,
    High,
    Mixed,
    Low,
    VeryLow,
    Unknown,
}

impl fmt::Display for FactualReporting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactualReporting::VeryHigh => write!(f, "very-high"),
            FactualReporting::High => write!(f, "high"),
            FactualReporting::Mixed => write!(f, "mixed"),
            FactualReporting::Low => write!(f, "low"),
            FactualReporting::VeryLow => write!(f, "very-low"),
            FactualReporting::Unknown => write!(f, "unknown"),
        }
    }
}

impl From<&str> for FactualReporting {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "very-high" => FactualReporting::VeryHigh,
            "high" => FactualReporting::High,
            "mixed" => FactualReporting::Mixed,
            "low" => FactualReporting::Low,
            "very-low" => FactualReporting::VeryLow,
            _ => FactualReporting::Unknown,
        }
    }
}

/// Where a source's credibility rating came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingSource {
    Manual,
    Curated,
    Default,
}

impl fmt::Display for RatingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RatingSource::Manual => write!(f, "manual"),
            RatingSource::Curated => write!(f, "curated"),
            RatingSource::Default => write!(f, "default"),
        }
    }
}

impl From<&str> for RatingSource {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "manual" => RatingSource::Manual,
            "curated" => RatingSource::Curated,
            _ => RatingSource::Default,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
    Unknown,
}

impl From<&str> for Sentiment {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "positive" => Sentiment::Positive,
            "neutral" => Sentiment::Neutral,
            "negative" => Sentiment::Negative,
            _ => Sentiment::Unknown,
        }
    }
}

/// Approve/reject workflow state of an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurationStatus {
    Pending,
    Approved,
    Rejected,
    Flagged,
}

impl fmt::Display for CurationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CurationStatus::Pending => write!(f, "pending"),
            CurationStatus::Approved => write!(f, "approved"),
            CurationStatus::Rejected => write!(f, "rejected"),
            CurationStatus::Flagged => write!(f, "flagged"),
        }
    }
}

impl From<&str> for CurationStatus {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "approved" => CurationStatus::Approved,
            "rejected" => CurationStatus::Rejected,
            "flagged" => CurationStatus::Flagged,
            _ => CurationStatus::Pending,
        }
    }
}

/// A publisher's reputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredibilityRating {
    pub overall_score: u8,
    pub bias_rating: BiasRating,
    pub factual_reporting: FactualReporting,
    pub last_updated: DateTime<Utc>,
    pub rating_source: RatingSource,
}

impl CredibilityRating {
    /// Neutral rating used for unknown publishers and failed lookups.
    pub fn neutral() -> Self {
        Self {
            overall_score: 50,
            bias_rating: BiasRating::Unknown,
            factual_reporting: FactualReporting::Unknown,
            last_updated: Utc::now(),
            rating_source: RatingSource::Default,
        }
    }
}

/// One named publisher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub id: Option<i64>,
    pub name: String,
    pub credibility_rating: CredibilityRating,
    pub article_count: i64,
}

/// Output of the rule-based text signal scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordFilterResult {
    pub passed: bool,
    pub score: u8,
    pub flagged_keywords: BTreeSet<String>,
    pub clickbait_score: u8,
    pub sensationalism_score: u8,
    pub quality_indicators: Vec<String>,
}

/// Publisher reputation as recorded on one article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredibilityLayer {
    pub source_rating: u8,
    pub bias_rating: BiasRating,
    pub factual_reporting: FactualReporting,
    pub overall_score: u8,
}

impl From<&CredibilityRating> for CredibilityLayer {
    fn from(rating: &CredibilityRating) -> Self {
        Self {
            source_rating: rating.overall_score,
            bias_rating: rating.bias_rating,
            factual_reporting: rating.factual_reporting,
            overall_score: rating.overall_score,
        }
    }
}

/// Quality/bias/credibility judgment of an article's text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAnalysis {
    pub quality_score: u8,
    /// -100 (left) to 100 (right).
    pub bias_score: i8,
    pub credibility_score: u8,
    pub sentiment: Sentiment,
    pub is_opinion: bool,
    pub is_factual: bool,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilteringMetadata {
    pub keyword_filter: Option<KeywordFilterResult>,
    pub credibility: Option<CredibilityLayer>,
    pub ai_analysis: Option<AiAnalysis>,
    pub engagement_score: Option<u8>,
    pub overall_score: u8,
    pub is_passing: bool,
    pub filter_version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Curation {
    pub status: CurationStatus,
    pub curated_by: Option<String>,
    pub curated_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl Default for Curation {
    fn default() -> Self {
        Self {
            status: CurationStatus::Pending,
            curated_by: None,
            curated_at: None,
            notes: None,
        }
    }
}

impl Curation {
    /// A status set by a person rather than by the score thresholds.
    pub fn is_manual(&self) -> bool {
        self.curated_by.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSource {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Article as delivered by an aggregator, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawArticle {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub url_to_image: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub source: RawSource,
}

/// A validated, stored article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: i64,
    pub url: String,
    pub external_id: Option<String>,
    pub title: String,
    pub description: String,
    pub content: String,
    pub author: Option<String>,
    pub published_at: DateTime<Utc>,
    pub source_name: String,
    pub source_url: Option<String>,
    pub image_url: Option<String>,
    pub filtering: Option<FilteringMetadata>,
    pub curation: Curation,
    pub categories: Vec<String>,
    pub views: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Article {
    pub fn overall_score(&self) -> u8 {
        self.filtering.as_ref().map_or(50, |f| f.overall_score)
    }
}

/// Validated fields ready to be written as a new article row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewArticle {
    pub url: String,
    pub external_id: Option<String>,
    pub title: String,
    pub description: String,
    pub content: String,
    pub author: Option<String>,
    pub published_at: DateTime<Utc>,
    pub source_name: String,
    pub source_url: Option<String>,
    pub image_url: Option<String>,
}

/// Result of scoring one article.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredArticle {
    pub filtering: FilteringMetadata,
    pub curation_status: CurationStatus,
    pub categories: Vec<String>,
}
