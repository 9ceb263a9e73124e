use chrono::{Duration as ChronoDuration, Utc};
use std::time::Duration;

use super::detection::ViralClusterDetector;
use super::types::{
    Claim, ClaimType, ClaimVerification, MisinformationAnalysis, MisinformationType,
    RelatedArticle, StoryVerification, VerificationStatus, Virality, ViralNewsStory,
};
use super::verification::CrossSourceVerifier;
use crate::db::{ArticleInsert, Database};
use crate::error::Error;
use crate::filter::types::{CurationStatus, FilteringMetadata, NewArticle, ScoredArticle};
use crate::FILTER_VERSION;

async fn add_article(
    db: &Database,
    url: &str,
    title: &str,
    source: &str,
    content: &str,
    hours_ago: i64,
    score: u8,
) -> i64 {
    let article = NewArticle {
        url: url.to_string(),
        external_id: None,
        title: title.to_string(),
        description: String::new(),
        content: content.to_string(),
        author: None,
        published_at: Utc::now() - ChronoDuration::hours(hours_ago),
        source_name: source.to_string(),
        source_url: None,
        image_url: None,
    };
    let id = match db.insert_article(&article).await.unwrap() {
        ArticleInsert::Inserted(id) => id,
        ArticleInsert::Duplicate => panic!("duplicate test article {}", url),
    };

    let scored = ScoredArticle {
        filtering: FilteringMetadata {
            keyword_filter: None,
            credibility: None,
            ai_analysis: None,
            engagement_score: None,
            overall_score: score,
            is_passing: score >= 60,
            filter_version: FILTER_VERSION.to_string(),
        },
        curation_status: CurationStatus::Approved,
        categories: Vec::new(),
    };
    db.update_article_scoring(id, &scored).await.unwrap();
    id
}

async fn add_election_cluster(db: &Database) {
    for (i, source) in ["Reuters", "BBC News", "NPR", "The Hindu"].iter().enumerate() {
        add_article(
            db,
            &format!("https://news.example/{}/election-{}", i, i),
            &format!("Election Results: coverage from {}", source),
            source,
            "",
            1,
            70,
        )
        .await;
    }
}

fn related(article_id: i64, source: &str) -> RelatedArticle {
    RelatedArticle {
        article_id,
        url: format!("https://news.example/{}", article_id),
        title: "Election Results".to_string(),
        source: source.to_string(),
        published_at: Utc::now(),
        credibility_score: 80,
    }
}

fn story(
    id: &str,
    title: &str,
    summary: &str,
    virality: f64,
    related_articles: Vec<RelatedArticle>,
    claims: Vec<Claim>,
) -> ViralNewsStory {
    ViralNewsStory {
        id: id.to_string(),
        title: title.to_string(),
        summary: summary.to_string(),
        keywords: vec![format!("keyword-{}", id)],
        virality: Virality {
            score: virality,
            first_detected: Utc::now(),
            sources_count: related_articles.len(),
            velocity: 1.0,
        },
        verification: StoryVerification::default(),
        claims,
        related_articles,
        fact_checks: Vec::new(),
        misinformation_analysis: MisinformationAnalysis::default(),
    }
}

fn turnout_claim() -> Claim {
    Claim {
        text: "Turnout reached 64 percent in the capital district".to_string(),
        claim_type: ClaimType::Statistic,
        verification: ClaimVerification::default(),
    }
}

const TURNOUT_TEXT: &str = "Officials said turnout reached 64 percent in the capital district on Sunday.";

/// Two corroborating articles and one story carrying the turnout claim.
async fn corroborated_story(db: &Database, id: &str, title: &str, summary: &str) -> ViralNewsStory {
    let a = add_article(db, &format!("https://a.example/{}", id), "Election Results", "Reuters", TURNOUT_TEXT, 1, 80).await;
    let b = add_article(db, &format!("https://b.example/{}", id), "Election Results", "NPR", TURNOUT_TEXT, 1, 80).await;
    let story = story(id, title, summary, 75.0, vec![related(a, "Reuters"), related(b, "NPR")], vec![turnout_claim()]);
    assert!(db.create_story_if_untracked(&story).await.unwrap());
    story
}

fn verifier(db: &Database) -> CrossSourceVerifier {
    CrossSourceVerifier::new(db.clone(), Duration::from_secs(5))
}

#[tokio::test]
async fn test_detects_cluster_across_four_sources() {
    let db = Database::in_memory().await.unwrap();
    add_election_cluster(&db).await;
    // outside the window
    add_article(&db, "https://old.example/1", "Election Results: last week", "CNN", "", 48, 70).await;
    // three articles but only two sources
    for (i, source) in ["Reuters", "Reuters", "NPR"].iter().enumerate() {
        add_article(&db, &format!("https://budget.example/{}", i), "Budget Talks: day two", source, "", 2, 60).await;
    }
    // two articles only
    for i in 0..2 {
        add_article(&db, &format!("https://storm.example/{}", i), &format!("Storm Warning: update {}", i), ["BBC News", "CNN"][i], "", 2, 60).await;
    }

    let detector = ViralClusterDetector::new(db.clone());
    let created = detector.detect().await.unwrap();

    assert_eq!(created.len(), 1);
    let story = &created[0];
    assert_eq!(story.keywords, vec!["election", "results"]);
    assert_eq!(story.virality.sources_count, 4);
    assert_eq!(story.virality.score, 75.0);
    assert!((story.virality.velocity - 4.0 / 24.0).abs() < 1e-9);
    assert_eq!(story.related_articles.len(), 4);
    assert_eq!(story.verification.status, VerificationStatus::Unverified);

    let stored = db.get_story(&story.id).await.unwrap().unwrap();
    assert_eq!(stored.virality.score, 75.0);
    assert_eq!(stored.related_articles.len(), 4);
}

#[tokio::test]
async fn test_tracked_topic_is_not_detected_again() {
    let db = Database::in_memory().await.unwrap();
    add_election_cluster(&db).await;
    let detector = ViralClusterDetector::new(db.clone());

    assert_eq!(detector.detect().await.unwrap().len(), 1);
    assert!(detector.detect().await.unwrap().is_empty());
    assert_eq!(db.list_stories(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_overlapping_signatures_yield_one_story() {
    let db = Database::in_memory().await.unwrap();
    add_election_cluster(&db).await;
    for (i, source) in ["CNN", "Bloomberg", "NDTV"].iter().enumerate() {
        add_article(&db, &format!("https://live.example/{}", i), "Election results live: latest", source, "", 1, 65).await;
    }

    let created = ViralClusterDetector::new(db.clone()).detect().await.unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].keywords, vec!["election", "results"]);
}

#[tokio::test]
async fn test_concurrent_detection_creates_one_story() {
    let db = Database::in_memory().await.unwrap();
    add_election_cluster(&db).await;

    let first = ViralClusterDetector::new(db.clone());
    let second = ViralClusterDetector::new(db.clone());
    let (a, b) = tokio::join!(first.detect(), second.detect());

    assert_eq!(a.unwrap().len() + b.unwrap().len(), 1);
    assert_eq!(db.list_stories(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_earliest_article_leads_on_score_tie() {
    let db = Database::in_memory().await.unwrap();
    for (title, source, hours_ago) in [
        ("Quake Report: newest", "Reuters", 1),
        ("Quake Report: earliest", "NPR", 5),
        ("Quake Report: middle", "BBC News", 3),
    ] {
        add_article(&db, &format!("https://quake.example/{}", hours_ago), title, source, "", hours_ago, 70).await;
    }

    let created = ViralClusterDetector::new(db.clone()).detect().await.unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].title, "Quake Report: earliest");
    assert_eq!(created[0].summary, "Quake Report: earliest");
}

#[tokio::test]
async fn test_best_scored_article_leads() {
    let db = Database::in_memory().await.unwrap();
    for (title, source, hours_ago, score) in [
        ("Quake Report: newest", "Reuters", 1, 90),
        ("Quake Report: earliest", "NPR", 5, 70),
        ("Quake Report: middle", "BBC News", 3, 70),
    ] {
        add_article(&db, &format!("https://quake.example/{}", hours_ago), title, source, "", hours_ago, score).await;
    }

    let created = ViralClusterDetector::new(db.clone()).detect().await.unwrap();
    assert_eq!(created[0].title, "Quake Report: newest");
}

#[tokio::test]
async fn test_corroborated_story_is_verified_true() {
    let db = Database::in_memory().await.unwrap();
    corroborated_story(&db, "s1", "Election Results", "Turnout figures were released").await;

    let verified = verifier(&db).verify("s1").await.unwrap();
    assert_eq!(verified.verification.status, VerificationStatus::VerifiedTrue);
    assert_eq!(verified.verification.confidence_score, 100);
    assert_eq!(verified.misinformation_analysis.risk_score, 0);

    let evidence = &verified.claims[0].verification.evidence;
    assert_eq!(evidence.len(), 2);
    assert!(evidence.iter().all(|e| e.supports && e.credibility_score == 80));
    assert_eq!(verified.claims[0].verification.status, VerificationStatus::VerifiedTrue);

    let stored = db.get_story("s1").await.unwrap().unwrap();
    assert_eq!(stored.verification.status, VerificationStatus::VerifiedTrue);
    assert_eq!(stored.verification.confidence_score, 100);
    assert!(stored.verification.verified_at.is_some());
    assert!(stored.verification.checked_by.is_some());
    assert_eq!(stored.claims.len(), 1);
}

#[tokio::test]
async fn test_claims_are_extracted_when_missing() {
    let db = Database::in_memory().await.unwrap();
    let a = add_article(&db, "https://a.example/x", "Election Results", "Reuters", TURNOUT_TEXT, 1, 80).await;
    let s = story("s2", "Election Results", "Turnout figures", 60.0, vec![related(a, "Reuters")], Vec::new());
    db.create_story_if_untracked(&s).await.unwrap();

    let verified = verifier(&db).verify("s2").await.unwrap();
    assert_eq!(verified.claims.len(), 1);
    assert_eq!(verified.claims[0].claim_type, ClaimType::Statistic);
    assert_eq!(verified.verification.status, VerificationStatus::VerifiedTrue);
}

#[tokio::test]
async fn test_missing_articles_are_skipped() {
    let db = Database::in_memory().await.unwrap();
    let s = story("s3", "Election Results", "Turnout figures", 60.0, vec![related(9999, "Nowhere")], vec![turnout_claim()]);
    db.create_story_if_untracked(&s).await.unwrap();

    let verified = verifier(&db).verify("s3").await.unwrap();
    assert_eq!(verified.verification.status, VerificationStatus::Unverified);
    assert_eq!(verified.verification.confidence_score, 0);
    assert!(verified.claims[0].verification.evidence.is_empty());

    let stored = db.get_story("s3").await.unwrap().unwrap();
    assert_ne!(stored.verification.status, VerificationStatus::UnderReview);
}

#[tokio::test]
async fn test_high_risk_story_is_downgraded() {
    let db = Database::in_memory().await.unwrap();
    corroborated_story(&db, "s4", "Shocking leaked document shows cover-up", "You won't believe the turnout").await;

    let verified = verifier(&db).verify("s4").await.unwrap();
    // leaked document + cover-up (30 each), shocking + you won't believe (15 each)
    assert_eq!(verified.misinformation_analysis.risk_score, 90);
    assert_eq!(verified.misinformation_analysis.misinformation_type, MisinformationType::Fabricated);
    assert_eq!(verified.verification.status, VerificationStatus::PartiallyTrue);
    assert_eq!(verified.verification.confidence_score, 10);
}

#[tokio::test]
async fn test_fact_check_reruns_verification() {
    let db = Database::in_memory().await.unwrap();
    corroborated_story(&db, "s5", "Election Results", "Turnout figures were released").await;
    let verifier = verifier(&db);
    verifier.verify("s5").await.unwrap();

    let updated = verifier
        .add_fact_check("s5", "politifact", "https://www.politifact.com/x", "Pants on Fire", "Numbers were invented")
        .await
        .unwrap();
    assert_eq!(updated.fact_checks.len(), 1);
    // two supporting items against one fact-check worth three
    assert_eq!(updated.verification.status, VerificationStatus::Misleading);
    assert_eq!(updated.verification.confidence_score, 20);
}

#[tokio::test]
async fn test_fact_check_validation() {
    let db = Database::in_memory().await.unwrap();
    corroborated_story(&db, "s6", "Election Results", "Turnout figures were released").await;
    let verifier = verifier(&db);

    let err = verifier
        .add_fact_check("s6", "my-blog", "https://example.com", "False", "")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnknownFactChecker(_)));
    assert!(db.get_story("s6").await.unwrap().unwrap().fact_checks.is_empty());

    let err = verifier
        .add_fact_check("missing", "snopes", "https://www.snopes.com/x", "False", "")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::StoryNotFound(_)));
}

#[tokio::test]
async fn test_verify_pending_respects_virality_floor() {
    let db = Database::in_memory().await.unwrap();
    let a = add_article(&db, "https://a.example/p", "Election Results", "Reuters", TURNOUT_TEXT, 1, 80).await;
    let hot = story("hot", "Election Results", "Turnout", 80.0, vec![related(a, "Reuters")], vec![turnout_claim()]);
    let cold = story("cold", "Election Results", "Turnout", 30.0, vec![related(a, "Reuters")], vec![turnout_claim()]);
    db.create_story_if_untracked(&hot).await.unwrap();
    db.create_story_if_untracked(&cold).await.unwrap();

    let verified = verifier(&db).verify_pending(10, 50.0).await.unwrap();
    assert_eq!(verified.len(), 1);
    assert_eq!(verified[0].id, "hot");

    let cold = db.get_story("cold").await.unwrap().unwrap();
    assert_eq!(cold.verification.status, VerificationStatus::Unverified);
    assert!(cold.verification.last_checked.is_none());
}

#[tokio::test]
async fn test_failed_save_restores_prior_status() {
    let db = Database::in_memory().await.unwrap();
    corroborated_story(&db, "s7", "Election Results", "Turnout").await;
    sqlx::query(
        r#"
        CREATE TRIGGER reject_verification_save BEFORE UPDATE OF checked_by ON viral_stories
        BEGIN SELECT RAISE(ABORT, 'storage unavailable'); END
        "#,
    )
    .execute(db.pool())
    .await
    .unwrap();

    let err = verifier(&db).verify("s7").await.unwrap_err();
    assert!(matches!(err, Error::Database(_)));

    let stored = db.get_story("s7").await.unwrap().unwrap();
    assert_eq!(stored.verification.status, VerificationStatus::Unverified);
    let pending = db.get_stories_pending_verification(10, 0.0).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, "s7");
}
