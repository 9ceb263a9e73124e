use chrono::Utc;
use futures::future::join_all;
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use super::claims::extract_claims;
use super::fact_checkers::new_fact_check;
use super::misinformation::{detect_misinformation, RISK_DOWNGRADE_THRESHOLD};
use super::types::{
    ClaimVerification, Evidence, FactCheck, RelatedArticle, VerificationStatus, ViralNewsStory,
};
use crate::db::Database;
use crate::environment::Settings;
use crate::error::{Error, Result};
use crate::util::{significant_words, truncate_chars};
use crate::TARGET_VIRAL;

/// Share of a claim's words an article must contain to count as evidence.
pub const EVIDENCE_THRESHOLD: f64 = 0.5;
/// Stricter share at which evidence supports the claim rather than merely relating to it.
pub const SUPPORT_THRESHOLD: f64 = 0.7;
/// Related articles read when a story has no claims yet.
pub const CLAIM_SOURCE_ARTICLES: usize = 5;

const FACT_CHECK_WEIGHT: usize = 3;
const EXCERPT_CHARS: usize = 200;
const CHECKED_BY: &str = "cross-source-verifier";

/// Combines evidence and fact-checks into a status and a 0-100 confidence.
///
/// Each fact-check counts three times. Confidence measures the distance from
/// an even split, so balanced evidence yields 0 whichever way it leans.
pub fn calculate_verification_confidence(
    evidence: &[Evidence],
    fact_checks: &[FactCheck],
) -> (VerificationStatus, u8) {
    let mut supporting = evidence.iter().filter(|e| e.supports).count();
    let mut contradicting = evidence.len() - supporting;

    for check in fact_checks {
        if check.normalized_rating.is_supporting() {
            supporting += FACT_CHECK_WEIGHT;
        } else if check.normalized_rating.is_contradicting() {
            contradicting += FACT_CHECK_WEIGHT;
        }
    }

    if supporting + contradicting == 0 {
        return (VerificationStatus::Unverified, 0);
    }

    let support_ratio = supporting as f64 / (supporting + contradicting) as f64;
    let status = if support_ratio >= 0.8 {
        VerificationStatus::VerifiedTrue
    } else if support_ratio >= 0.6 {
        VerificationStatus::PartiallyTrue
    } else if support_ratio >= 0.4 {
        VerificationStatus::Misleading
    } else {
        VerificationStatus::VerifiedFalse
    };
    let confidence = ((support_ratio - 0.5).abs() * 200.0).round().clamp(0.0, 100.0) as u8;

    (status, confidence)
}

/// Share of the claim's significant words that occur in `article_words`.
///
/// `None` when the claim has no word longer than three characters.
pub fn claim_match_ratio(claim: &str, article_words: &HashSet<String>) -> Option<f64> {
    let claim_words = significant_words(claim);
    if claim_words.is_empty() {
        return None;
    }
    let matching = claim_words
        .iter()
        .filter(|word| article_words.contains(*word))
        .count();
    Some(matching as f64 / claim_words.len() as f64)
}

/// A related article whose text could be read.
struct ReadArticle<'a> {
    related: &'a RelatedArticle,
    text: String,
    words: HashSet<String>,
}

fn claim_evidence(claim: &str, articles: &[ReadArticle<'_>]) -> Vec<Evidence> {
    articles
        .iter()
        .filter_map(|article| {
            let ratio = claim_match_ratio(claim, &article.words)?;
            (ratio > EVIDENCE_THRESHOLD).then(|| Evidence {
                source: article.related.source.clone(),
                url: article.related.url.clone(),
                supports: ratio > SUPPORT_THRESHOLD,
                excerpt: truncate_chars(article.text.trim(), EXCERPT_CHARS).to_string(),
                credibility_score: article.related.credibility_score,
            })
        })
        .collect()
}

/// Verifies viral stories against their own related coverage and any recorded fact-checks.
#[derive(Clone, Debug)]
pub struct CrossSourceVerifier {
    db: Database,
    fetch_timeout: Duration,
}

impl CrossSourceVerifier {
    pub fn new(db: Database, fetch_timeout: Duration) -> Self {
        Self { db, fetch_timeout }
    }

    pub fn from_settings(db: Database, settings: &Settings) -> Self {
        Self::new(db, settings.fetch_timeout)
    }

    /// Article text with a timeout; failures are logged and yield nothing.
    async fn fetch_text(&self, related: &RelatedArticle) -> Option<String> {
        match timeout(self.fetch_timeout, self.db.get_article_text(related.article_id)).await {
            Ok(Ok(text)) => Some(text),
            Ok(Err(e)) => {
                warn!(target: TARGET_VIRAL, "Skipping evidence from article {}: {}", related.article_id, e);
                None
            }
            Err(_) => {
                warn!(target: TARGET_VIRAL, "Timed out reading article {} after {:?}", related.article_id, self.fetch_timeout);
                None
            }
        }
    }

    /// Runs a full verification pass and stores the outcome.
    ///
    /// The story is marked under review first and always ends in a concrete
    /// status; unreadable related articles simply contribute no evidence.
    ///
    /// If the run fails, the story returns to the status it had before, so the
    /// next batch can pick it up again.
    pub async fn verify(&self, story_id: &str) -> Result<ViralNewsStory> {
        let story = self
            .db
            .get_story(story_id)
            .await?
            .ok_or_else(|| Error::StoryNotFound(story_id.to_string()))?;
        let prior_status = story.verification.status;

        self.db.set_story_status(story_id, VerificationStatus::UnderReview).await?;

        match self.run_verification(story).await {
            Ok(story) => Ok(story),
            Err(e) => {
                if let Err(restore_err) = self.db.set_story_status(story_id, prior_status).await {
                    error!(target: TARGET_VIRAL, "Story {} left under review: {}", story_id, restore_err);
                }
                Err(e)
            }
        }
    }

    async fn run_verification(&self, mut story: ViralNewsStory) -> Result<ViralNewsStory> {
        story.verification.status = VerificationStatus::UnderReview;

        let texts = join_all(story.related_articles.iter().map(|r| self.fetch_text(r))).await;
        let read: Vec<ReadArticle<'_>> = story
            .related_articles
            .iter()
            .zip(texts)
            .filter_map(|(related, text)| {
                text.map(|text| ReadArticle {
                    related,
                    words: significant_words(&text).into_iter().collect(),
                    text,
                })
            })
            .collect();

        let mut claims = story.claims.clone();
        if claims.is_empty() {
            let combined = read
                .iter()
                .filter(|a| {
                    story
                        .related_articles
                        .iter()
                        .take(CLAIM_SOURCE_ARTICLES)
                        .any(|r| r.article_id == a.related.article_id)
                })
                .map(|a| a.text.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            claims = extract_claims(&combined);
            debug!(target: TARGET_VIRAL, "Extracted {} claims for story {}", claims.len(), story.id);
        }

        for claim in &mut claims {
            let evidence = claim_evidence(&claim.text, &read);
            let (status, confidence_score) = calculate_verification_confidence(&evidence, &[]);
            claim.verification = ClaimVerification {
                status,
                evidence,
                confidence_score,
            };
        }

        let all_evidence: Vec<Evidence> = claims
            .iter()
            .flat_map(|claim| claim.verification.evidence.iter().cloned())
            .collect();
        let (mut status, mut confidence) =
            calculate_verification_confidence(&all_evidence, &story.fact_checks);

        let misinformation = detect_misinformation(&story.title, Some(story.summary.as_str()));
        if misinformation.risk_score > RISK_DOWNGRADE_THRESHOLD {
            status = status.downgraded();
            confidence = (confidence as u32).saturating_sub(misinformation.risk_score) as u8;
            info!(target: TARGET_VIRAL, "Story {} downgraded to {} (risk {}: {:?})", story.id, status, misinformation.risk_score, misinformation.flags);
        }

        let now = Utc::now();
        story.claims = claims;
        story.misinformation_analysis = misinformation;
        story.verification.status = status;
        story.verification.confidence_score = confidence;
        story.verification.last_checked = Some(now);
        story.verification.checked_by = Some(CHECKED_BY.to_string());
        story.verification.verified_at = Some(now);

        self.db.save_story_verification(&story).await?;
        info!(target: TARGET_VIRAL, "Verified story {} '{}': {} ({}% confidence, {} claims, {} evidence)", story.id, story.title, status, confidence, story.claims.len(), all_evidence.len());

        Ok(story)
    }

    /// Verifies the most viral unverified stories, logging and skipping failures.
    pub async fn verify_pending(&self, limit: i64, min_virality: f64) -> Result<Vec<ViralNewsStory>> {
        let pending = self.db.get_stories_pending_verification(limit, min_virality).await?;
        let mut verified = Vec::with_capacity(pending.len());

        for story in pending {
            match self.verify(&story.id).await {
                Ok(updated) => verified.push(updated),
                Err(e) => warn!(target: TARGET_VIRAL, "Verification of story {} failed: {}", story.id, e),
            }
        }

        Ok(verified)
    }

    /// Records a registered fact-checker's rating and re-verifies the story.
    pub async fn add_fact_check(
        &self,
        story_id: &str,
        source_id: &str,
        url: &str,
        rating: &str,
        summary: &str,
    ) -> Result<ViralNewsStory> {
        let fact_check = new_fact_check(source_id, url, rating, summary)?;
        self.db.append_fact_check(story_id, &fact_check).await?;
        self.verify(story_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viral::types::NormalizedRating;

    fn evidence(supports: bool) -> Evidence {
        Evidence {
            source: "Reuters".to_string(),
            url: "https://www.reuters.com/a".to_string(),
            supports,
            excerpt: String::new(),
            credibility_score: 80,
        }
    }

    fn fact_check(rating: NormalizedRating) -> FactCheck {
        FactCheck {
            source: "politifact".to_string(),
            url: "https://www.politifact.com/x".to_string(),
            rating: format!("{:?}", rating),
            normalized_rating: rating,
            summary: String::new(),
            checked_at: Utc::now(),
        }
    }

    #[test]
    fn test_no_signal_is_unverified() {
        assert_eq!(calculate_verification_confidence(&[], &[]), (VerificationStatus::Unverified, 0));
        let unrated = [fact_check(NormalizedRating::Unrated), fact_check(NormalizedRating::HalfTrue)];
        assert_eq!(
            calculate_verification_confidence(&[], &unrated),
            (VerificationStatus::Unverified, 0)
        );
    }

    #[test]
    fn test_only_support_is_fully_confident() {
        let (status, confidence) = calculate_verification_confidence(&[evidence(true), evidence(true)], &[]);
        assert_eq!(status, VerificationStatus::VerifiedTrue);
        assert_eq!(confidence, 100);
    }

    #[test]
    fn test_balanced_evidence_has_zero_confidence() {
        let (status, confidence) = calculate_verification_confidence(&[evidence(true), evidence(false)], &[]);
        assert_eq!(status, VerificationStatus::Misleading);
        assert_eq!(confidence, 0);

        let (_, confidence) = calculate_verification_confidence(
            &[evidence(false), evidence(false), evidence(false)],
            &[fact_check(NormalizedRating::MostlyTrue)],
        );
        assert_eq!(confidence, 0);
    }

    #[test]
    fn test_fact_checks_weigh_three_times() {
        // 2 supporting against 3 contradicting
        let (status, confidence) = calculate_verification_confidence(
            &[evidence(true), evidence(true)],
            &[fact_check(NormalizedRating::PantsOnFire)],
        );
        assert_eq!(status, VerificationStatus::Misleading);
        assert_eq!(confidence, 20);

        let (status, confidence) =
            calculate_verification_confidence(&[], &[fact_check(NormalizedRating::False)]);
        assert_eq!(status, VerificationStatus::VerifiedFalse);
        assert_eq!(confidence, 100);
    }

    #[test]
    fn test_status_bands() {
        let with = |s: usize, c: usize| {
            let mut items = vec![evidence(true); s];
            items.extend(vec![evidence(false); c]);
            calculate_verification_confidence(&items, &[]).0
        };
        assert_eq!(with(4, 1), VerificationStatus::VerifiedTrue);
        assert_eq!(with(3, 2), VerificationStatus::PartiallyTrue);
        assert_eq!(with(2, 3), VerificationStatus::Misleading);
        assert_eq!(with(1, 4), VerificationStatus::VerifiedFalse);
    }

    #[test]
    fn test_claim_match_ratio() {
        let words: HashSet<String> = significant_words("Turnout in the capital reached 64 percent on Sunday")
            .into_iter()
            .collect();
        assert_eq!(claim_match_ratio("Turnout reached 64 percent", &words), Some(1.0));
        assert_eq!(claim_match_ratio("Turnout collapsed", &words), Some(0.5));
        assert_eq!(claim_match_ratio("64 of 90", &words), None);
    }
}
