use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Verification state of a story or a single claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Unverified,
    UnderReview,
    VerifiedTrue,
    VerifiedFalse,
    PartiallyTrue,
    Misleading,
    Satire,
    Opinion,
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VerificationStatus::Unverified => "unverified",
            VerificationStatus::UnderReview => "under_review",
            VerificationStatus::VerifiedTrue => "verified_true",
            VerificationStatus::VerifiedFalse => "verified_false",
            VerificationStatus::PartiallyTrue => "partially_true",
            VerificationStatus::Misleading => "misleading",
            VerificationStatus::Satire => "satire",
            VerificationStatus::Opinion => "opinion",
        };
        write!(f, "{}", s)
    }
}

impl From<&str> for VerificationStatus {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "under_review" => VerificationStatus::UnderReview,
            "verified_true" => VerificationStatus::VerifiedTrue,
            "verified_false" => VerificationStatus::VerifiedFalse,
            "partially_true" => VerificationStatus::PartiallyTrue,
            "misleading" => VerificationStatus::Misleading,
            "satire" => VerificationStatus::Satire,
            "opinion" => VerificationStatus::Opinion,
            _ => VerificationStatus::Unverified,
        }
    }
}

impl VerificationStatus {
    /// One step less certain; statuses outside the true-side ladder are unchanged.
    pub fn downgraded(self) -> Self {
        match self {
            VerificationStatus::VerifiedTrue => VerificationStatus::PartiallyTrue,
            VerificationStatus::PartiallyTrue => VerificationStatus::Misleading,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimType {
    Factual,
    Opinion,
    Prediction,
    Quote,
    Statistic,
    Event,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    pub source: String,
    pub url: String,
    pub supports: bool,
    pub excerpt: String,
    pub credibility_score: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimVerification {
    pub status: VerificationStatus,
    pub evidence: Vec<Evidence>,
    pub confidence_score: u8,
}

impl Default for ClaimVerification {
    fn default() -> Self {
        Self {
            status: VerificationStatus::Unverified,
            evidence: Vec::new(),
            confidence_score: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    pub text: String,
    #[serde(rename = "type")]
    pub claim_type: ClaimType,
    pub verification: ClaimVerification,
}

/// Shared six-point scale every fact-checker's vocabulary is mapped onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizedRating {
    True,
    MostlyTrue,
    HalfTrue,
    MostlyFalse,
    False,
    PantsOnFire,
    Unrated,
}

impl NormalizedRating {
    pub fn is_supporting(self) -> bool {
        matches!(self, NormalizedRating::True | NormalizedRating::MostlyTrue)
    }

    pub fn is_contradicting(self) -> bool {
        matches!(
            self,
            NormalizedRating::False | NormalizedRating::MostlyFalse | NormalizedRating::PantsOnFire
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactCheck {
    pub source: String,
    pub url: String,
    pub rating: String,
    pub normalized_rating: NormalizedRating,
    pub summary: String,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedArticle {
    pub article_id: i64,
    pub url: String,
    pub title: String,
    pub source: String,
    pub published_at: DateTime<Utc>,
    pub credibility_score: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Virality {
    pub score: f64,
    pub first_detected: DateTime<Utc>,
    pub sources_count: usize,
    /// Articles per hour across the detection window.
    pub velocity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryVerification {
    pub status: VerificationStatus,
    pub confidence_score: u8,
    pub last_checked: Option<DateTime<Utc>>,
    pub checked_by: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
}

impl Default for StoryVerification {
    fn default() -> Self {
        Self {
            status: VerificationStatus::Unverified,
            confidence_score: 0,
            last_checked: None,
            checked_by: None,
            verified_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MisinformationType {
    Fabricated,
    Manipulated,
    OutOfContext,
    MisleadingHeadline,
    SatireMisunderstood,
    OldNewsRecycled,
    PartialTruth,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MisinformationAnalysis {
    #[serde(rename = "type")]
    pub misinformation_type: MisinformationType,
    pub flags: Vec<String>,
    /// Unbounded; each matched cue adds its weight.
    pub risk_score: u32,
}

impl Default for MisinformationAnalysis {
    fn default() -> Self {
        Self {
            misinformation_type: MisinformationType::None,
            flags: Vec::new(),
            risk_score: 0,
        }
    }
}

/// A cluster of same-topic articles picked up across several sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViralNewsStory {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub keywords: Vec<String>,
    pub virality: Virality,
    pub verification: StoryVerification,
    pub claims: Vec<Claim>,
    pub related_articles: Vec<RelatedArticle>,
    pub fact_checks: Vec<FactCheck>,
    pub misinformation_analysis: MisinformationAnalysis,
}
