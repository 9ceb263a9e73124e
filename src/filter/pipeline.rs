use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tracing::{debug, error, info, warn};

use super::analyzer::{AnalysisInput, AnalyzerChain};
use super::categories::{active_categories, categorize, Category};
use super::credibility::{source_name_for_url, SourceCredibilityStore, UNKNOWN_SOURCE};
use super::keywords::analyze_text;
use super::types::{
    Article, CurationStatus, FilteringMetadata, NewArticle, RawArticle, ScoredArticle,
};
use crate::db::{normalize_url, ArticleInsert, Database};
use crate::environment::Settings;
use crate::error::{Error, Result};
use crate::{FILTER_VERSION, TARGET_FILTER};

/// Score assumed for any layer that produced nothing.
pub const NEUTRAL_SCORE: u8 = 50;

/// Relative weight of each layer in the overall score; the five weights sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub keyword: f64,
    pub credibility: f64,
    pub ai_quality: f64,
    pub ai_credibility: f64,
    pub engagement: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            keyword: 0.20,
            credibility: 0.30,
            ai_quality: 0.25,
            ai_credibility: 0.10,
            engagement: 0.15,
        }
    }
}

/// Per-layer scores feeding the weighted sum.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayerScores {
    pub keyword: Option<u8>,
    pub credibility: Option<u8>,
    pub ai_quality: Option<u8>,
    pub ai_credibility: Option<u8>,
    pub engagement: Option<u8>,
}

impl From<&FilteringMetadata> for LayerScores {
    fn from(filtering: &FilteringMetadata) -> Self {
        Self {
            keyword: filtering.keyword_filter.as_ref().map(|k| k.score),
            credibility: filtering.credibility.as_ref().map(|c| c.overall_score),
            ai_quality: filtering.ai_analysis.as_ref().map(|a| a.quality_score),
            ai_credibility: filtering.ai_analysis.as_ref().map(|a| a.credibility_score),
            engagement: filtering.engagement_score,
        }
    }
}

impl ScoreWeights {
    /// Weighted sum of the layers, missing ones counted as neutral, rounded into 0..=100.
    pub fn overall(&self, scores: &LayerScores) -> u8 {
        let layer = |score: Option<u8>| score.unwrap_or(NEUTRAL_SCORE) as f64;

        let total = layer(scores.keyword) * self.keyword
            + layer(scores.credibility) * self.credibility
            + layer(scores.ai_quality) * self.ai_quality
            + layer(scores.ai_credibility) * self.ai_credibility
            + layer(scores.engagement) * self.engagement;

        total.round().clamp(0.0, 100.0) as u8
    }
}

/// Score cut-offs for the automatic curation workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurationThresholds {
    pub approve: u8,
    pub reject: u8,
    /// Separate bar used by read queries.
    pub passing: u8,
}

impl Default for CurationThresholds {
    fn default() -> Self {
        Self {
            approve: 70,
            reject: 40,
            passing: 60,
        }
    }
}

impl CurationThresholds {
    pub fn status_for(&self, overall_score: u8) -> CurationStatus {
        if overall_score >= self.approve {
            CurationStatus::Approved
        } else if overall_score < self.reject {
            CurationStatus::Rejected
        } else {
            CurationStatus::Pending
        }
    }

    pub fn is_passing(&self, overall_score: u8) -> bool {
        overall_score >= self.passing
    }
}

/// Engagement layer from the view counter; neutral until the article has been read.
pub fn engagement_score(views: i64) -> u8 {
    if views <= 0 {
        NEUTRAL_SCORE
    } else {
        (50 + views / 10).min(100) as u8
    }
}

/// What happened to one raw article handed to `ingest`.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    Scored { article_id: i64, scored: ScoredArticle },
    Duplicate,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub scored: usize,
    pub duplicates: usize,
    pub rejected: usize,
}

/// Validates a raw aggregator record into insertable fields.
///
/// A record without a URL or a headline is rejected. The publisher name falls
/// back to the URL's domain and then to the `Unknown` bucket.
pub fn validate_raw_article(raw: RawArticle) -> Result<NewArticle> {
    let url = raw
        .url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| Error::InvalidArticle("article has no url".to_string()))?;
    normalize_url(&url)?;

    let title = raw
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::InvalidArticle(format!("article {} has no title", url)))?;

    let source_name = raw
        .source
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .or_else(|| source_name_for_url(&url).map(str::to_string))
        .unwrap_or_else(|| UNKNOWN_SOURCE.to_string());

    let published_at = raw
        .published_at
        .as_deref()
        .and_then(|p| DateTime::parse_from_rfc3339(p.trim()).ok())
        .map(|p| p.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);

    Ok(NewArticle {
        url,
        external_id: raw.external_id,
        title,
        description: raw.description.unwrap_or_default(),
        content: raw.content.unwrap_or_default(),
        author: raw.author.filter(|a| !a.trim().is_empty()),
        published_at,
        source_name,
        source_url: raw.source.url,
        image_url: raw.url_to_image,
    })
}

/// Combines the keyword, credibility and content-judgment layers into one
/// overall score and curation status per article.
#[derive(Clone)]
pub struct ArticleScoringPipeline {
    db: Database,
    credibility: SourceCredibilityStore,
    analyzer: AnalyzerChain,
    categories: Vec<Category>,
    weights: ScoreWeights,
    thresholds: CurationThresholds,
}

impl ArticleScoringPipeline {
    pub fn new(db: Database, analyzer: AnalyzerChain, categories: Vec<Category>) -> Self {
        Self {
            credibility: SourceCredibilityStore::new(db.clone()),
            db,
            analyzer,
            categories,
            weights: ScoreWeights::default(),
            thresholds: CurationThresholds::default(),
        }
    }

    pub fn from_settings(db: Database, settings: &Settings) -> Self {
        Self::new(
            db,
            AnalyzerChain::from_settings(settings),
            active_categories(&settings.active_categories),
        )
    }

    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn credibility_store(&self) -> &SourceCredibilityStore {
        &self.credibility
    }

    /// Scores one article. Never fails: a layer that cannot be computed counts as neutral.
    pub async fn score(&self, article: &Article) -> ScoredArticle {
        let input = AnalysisInput {
            title: article.title.clone(),
            source_name: article.source_name.clone(),
            description: article.description.clone(),
            content: article.content.clone(),
        };

        // The three layers are independent of each other.
        let (keyword_filter, credibility, ai_analysis) = tokio::join!(
            async { analyze_text(&article.title, &article.description, &article.content) },
            self.credibility.credibility_layer(&article.source_name),
            self.analyzer.analyze(&input),
        );

        let mut filtering = FilteringMetadata {
            keyword_filter: Some(keyword_filter),
            credibility: Some(credibility),
            ai_analysis: Some(ai_analysis),
            engagement_score: Some(engagement_score(article.views)),
            overall_score: NEUTRAL_SCORE,
            is_passing: false,
            filter_version: FILTER_VERSION.to_string(),
        };
        filtering.overall_score = self.weights.overall(&LayerScores::from(&filtering));
        filtering.is_passing = self.thresholds.is_passing(filtering.overall_score);

        let curation_status = self.thresholds.status_for(filtering.overall_score);
        let categories = categorize(&article.title, &article.description, &self.categories);

        debug!(target: TARGET_FILTER, "Scored '{}': overall {} ({})", article.title, filtering.overall_score, curation_status);

        ScoredArticle {
            filtering,
            curation_status,
            categories,
        }
    }

    /// Validates, stores and scores one raw article.
    ///
    /// A URL already on file is skipped without error.
    pub async fn ingest(&self, raw: RawArticle) -> Result<IngestOutcome> {
        let new_article = validate_raw_article(raw)?;

        let article_id = match self.db.insert_article(&new_article).await? {
            ArticleInsert::Inserted(id) => id,
            ArticleInsert::Duplicate => return Ok(IngestOutcome::Duplicate),
        };

        let article = self
            .db
            .get_article(article_id)
            .await?
            .ok_or(Error::ArticleNotFound(article_id))?;

        let scored = self.score(&article).await;
        self.credibility.record_article(&article.source_name).await;
        self.db.update_article_scoring(article_id, &scored).await?;

        info!(target: TARGET_FILTER, "Ingested article {} from {}: score {} ({})", article_id, article.source_name, scored.filtering.overall_score, scored.curation_status);
        Ok(IngestOutcome::Scored { article_id, scored })
    }

    /// Ingests every record, logging and skipping the ones that fail.
    ///
    /// Only a storage failure aborts the batch.
    pub async fn ingest_batch(&self, raws: Vec<RawArticle>) -> Result<IngestSummary> {
        let mut summary = IngestSummary::default();

        for raw in raws {
            let url = raw.url.clone().unwrap_or_default();
            match self.ingest(raw).await {
                Ok(IngestOutcome::Scored { .. }) => summary.scored += 1,
                Ok(IngestOutcome::Duplicate) => summary.duplicates += 1,
                Err(Error::Database(e)) => {
                    error!(target: TARGET_FILTER, "Aborting ingestion batch at {}: {}", url, e);
                    return Err(Error::Database(e));
                }
                Err(e) => {
                    warn!(target: TARGET_FILTER, "Rejected article {}: {}", url, e);
                    summary.rejected += 1;
                }
            }
        }

        info!(target: TARGET_FILTER, "Ingestion batch done: {} scored, {} duplicates, {} rejected", summary.scored, summary.duplicates, summary.rejected);
        Ok(summary)
    }

    /// Re-runs scoring on a stored article, e.g. after its source rating or views changed.
    pub async fn reprocess(&self, article_id: i64) -> Result<ScoredArticle> {
        let article = self
            .db
            .get_article(article_id)
            .await?
            .ok_or(Error::ArticleNotFound(article_id))?;

        let scored = self.score(&article).await;
        self.db.update_article_scoring(article_id, &scored).await?;
        Ok(scored)
    }

    /// Manual curation; later re-scoring leaves this status in place.
    pub async fn curate(
        &self,
        article_id: i64,
        status: CurationStatus,
        curated_by: &str,
        notes: Option<&str>,
    ) -> Result<()> {
        self.db.set_curation(article_id, status, curated_by, notes).await
    }

    pub async fn record_view(&self, article_id: i64) -> Result<i64> {
        self.db.increment_article_views(article_id).await
    }

    /// Retention cleanup: soft-deletes articles published more than `days` ago.
    pub async fn deactivate_older_than(&self, days: i64) -> Result<u64> {
        let cutoff = Utc::now() - ChronoDuration::days(days);
        self.db.deactivate_articles_before(&cutoff).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::types::{BiasRating, FactualReporting, RawSource, Sentiment};

    async fn pipeline() -> (Database, ArticleScoringPipeline) {
        let db = Database::in_memory().await.unwrap();
        let pipeline =
            ArticleScoringPipeline::new(db.clone(), AnalyzerChain::heuristic_only(), active_categories(&[]));
        (db, pipeline)
    }

    fn raw(url: &str, title: &str, content: &str, source: Option<&str>) -> RawArticle {
        RawArticle {
            title: Some(title.to_string()),
            description: Some(String::new()),
            content: Some(content.to_string()),
            url: Some(url.to_string()),
            published_at: Some("2026-10-18T08:00:00Z".to_string()),
            source: RawSource {
                name: source.map(str::to_string),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn scored(outcome: IngestOutcome) -> (i64, ScoredArticle) {
        match outcome {
            IngestOutcome::Scored { article_id, scored } => (article_id, scored),
            IngestOutcome::Duplicate => panic!("expected a scored article"),
        }
    }

    #[test]
    fn test_all_neutral_layers_give_fifty() {
        let neutral = LayerScores {
            keyword: Some(50),
            credibility: Some(50),
            ai_quality: Some(50),
            ai_credibility: Some(50),
            engagement: Some(50),
        };
        let weight_sets = [
            ScoreWeights::default(),
            ScoreWeights { keyword: 0.1, credibility: 0.1, ai_quality: 0.1, ai_credibility: 0.1, engagement: 0.6 },
            ScoreWeights { keyword: 1.0, credibility: 0.0, ai_quality: 0.0, ai_credibility: 0.0, engagement: 0.0 },
            ScoreWeights { keyword: 0.33, credibility: 0.17, ai_quality: 0.21, ai_credibility: 0.07, engagement: 0.22 },
        ];
        for weights in weight_sets {
            assert_eq!(weights.overall(&neutral), 50);
            assert_eq!(weights.overall(&LayerScores::default()), 50);
        }
    }

    #[test]
    fn test_curation_thresholds() {
        let thresholds = CurationThresholds::default();
        assert_eq!(thresholds.status_for(70), CurationStatus::Approved);
        assert_eq!(thresholds.status_for(69), CurationStatus::Pending);
        assert_eq!(thresholds.status_for(40), CurationStatus::Pending);
        assert_eq!(thresholds.status_for(39), CurationStatus::Rejected);
        assert!(thresholds.is_passing(60));
        assert!(!thresholds.is_passing(59));
    }

    #[test]
    fn test_engagement_score() {
        assert_eq!(engagement_score(0), 50);
        assert_eq!(engagement_score(9), 50);
        assert_eq!(engagement_score(120), 62);
        assert_eq!(engagement_score(10_000), 100);
    }

    #[test]
    fn test_validation() {
        let mut missing_url = raw("", "Title", "", None);
        missing_url.url = None;
        assert!(matches!(validate_raw_article(missing_url), Err(Error::InvalidArticle(_))));

        let untitled = raw("https://example.com/a", "  ", "", None);
        assert!(matches!(validate_raw_article(untitled), Err(Error::InvalidArticle(_))));

        let by_domain = validate_raw_article(raw("https://www.reuters.com/world/a", "Title", "", None)).unwrap();
        assert_eq!(by_domain.source_name, "Reuters");

        let unknown = validate_raw_article(raw("https://example.com/a", "Title", "", None)).unwrap();
        assert_eq!(unknown.source_name, UNKNOWN_SOURCE);
    }

    #[tokio::test]
    async fn test_sensational_article_from_unknown_source() {
        let (db, pipeline) = pipeline().await;
        let outcome = pipeline
            .ingest(raw(
                "https://daily-nowhere.example/scandal",
                "Breaking: Shocking bombshell scandal rocks city",
                "",
                Some("The Daily Nowhere"),
            ))
            .await
            .unwrap();
        let (article_id, scored) = scored(outcome);

        let keyword = scored.filtering.keyword_filter.as_ref().unwrap();
        assert!(keyword.clickbait_score >= 30);
        assert_eq!(keyword.score, 40);
        assert_eq!(scored.filtering.credibility.as_ref().unwrap().overall_score, 50);

        let ai = scored.filtering.ai_analysis.as_ref().unwrap();
        assert_eq!(ai.quality_score, 30);
        assert_eq!(ai.model, "heuristic");

        // 40*.2 + 50*.3 + 30*.25 + 30*.1 + 50*.15
        assert_eq!(scored.filtering.overall_score, 41);
        assert_eq!(scored.curation_status, CurationStatus::Pending);
        assert!(!scored.filtering.is_passing);

        let stored = db.get_article(article_id).await.unwrap().unwrap();
        assert_eq!(stored.overall_score(), 41);
        assert_eq!(stored.curation.status, CurationStatus::Pending);
    }

    #[tokio::test]
    async fn test_factual_article_from_curated_source_is_approved() {
        let (db, pipeline) = pipeline().await;
        let content = format!(
            "According to the city clerk, the measure passed. {}",
            "The council approved the transit budget on Tuesday after a long debate. ".repeat(20)
        );
        let outcome = pipeline
            .ingest(raw(
                "https://www.reuters.com/world/council-budget",
                "City council approves transit budget",
                &content,
                Some("Reuters"),
            ))
            .await
            .unwrap();
        let (_, scored) = scored(outcome);

        let keyword = scored.filtering.keyword_filter.as_ref().unwrap();
        assert!(keyword.score >= 80);

        let credibility = scored.filtering.credibility.as_ref().unwrap();
        assert_eq!(credibility.overall_score, 95);
        assert_eq!(credibility.factual_reporting, FactualReporting::VeryHigh);
        assert_eq!(credibility.bias_rating, BiasRating::Center);

        let ai = scored.filtering.ai_analysis.as_ref().unwrap();
        assert_eq!(ai.quality_score, 75);
        assert_eq!(ai.sentiment, Sentiment::Neutral);

        assert!(scored.filtering.overall_score >= 70);
        assert_eq!(scored.curation_status, CurationStatus::Approved);
        assert!(scored.filtering.is_passing);

        let reuters = db.get_source("Reuters").await.unwrap().unwrap();
        assert_eq!(reuters.article_count, 1);
    }

    #[tokio::test]
    async fn test_duplicate_url_is_skipped() {
        let (_db, pipeline) = pipeline().await;
        let first = pipeline
            .ingest(raw("https://example.com/story", "Council approves budget", "", None))
            .await
            .unwrap();
        assert!(matches!(first, IngestOutcome::Scored { .. }));

        let second = pipeline
            .ingest(raw("https://example.com/story", "Council approves budget again", "", None))
            .await
            .unwrap();
        assert_eq!(second, IngestOutcome::Duplicate);

        let stored = pipeline.db.list_articles(None, 10, 0).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].title, "Council approves budget");
    }

    #[tokio::test]
    async fn test_scoring_is_idempotent() {
        let (_db, pipeline) = pipeline().await;
        let outcome = pipeline
            .ingest(raw("https://example.com/a", "Council approves budget", "Some text.", Some("NPR")))
            .await
            .unwrap();
        let (article_id, first) = scored(outcome);

        let second = pipeline.reprocess(article_id).await.unwrap();
        assert_eq!(first.filtering.overall_score, second.filtering.overall_score);
        assert_eq!(first.curation_status, second.curation_status);
    }

    #[tokio::test]
    async fn test_manual_curation_survives_reprocessing() {
        let (db, pipeline) = pipeline().await;
        let outcome = pipeline
            .ingest(raw("https://example.com/b", "Council approves budget", "", Some("Reuters")))
            .await
            .unwrap();
        let (article_id, _) = scored(outcome);

        pipeline
            .curate(article_id, CurationStatus::Flagged, "editor", Some("check sourcing"))
            .await
            .unwrap();
        pipeline.reprocess(article_id).await.unwrap();

        let stored = db.get_article(article_id).await.unwrap().unwrap();
        assert_eq!(stored.curation.status, CurationStatus::Flagged);
        assert_eq!(stored.curation.curated_by.as_deref(), Some("editor"));
        assert!(stored.curation.is_manual());
    }

    #[tokio::test]
    async fn test_views_raise_engagement_on_reprocess() {
        let (_db, pipeline) = pipeline().await;
        let outcome = pipeline
            .ingest(raw("https://example.com/c", "Council approves budget", "", None))
            .await
            .unwrap();
        let (article_id, before) = scored(outcome);
        assert_eq!(before.filtering.engagement_score, Some(50));

        for _ in 0..200 {
            pipeline.record_view(article_id).await.unwrap();
        }
        let after = pipeline.reprocess(article_id).await.unwrap();
        assert_eq!(after.filtering.engagement_score, Some(70));
        assert!(after.filtering.overall_score > before.filtering.overall_score);
    }

    #[tokio::test]
    async fn test_batch_continues_past_invalid_records() {
        let (_db, pipeline) = pipeline().await;
        let mut no_url = raw("", "Headline", "", None);
        no_url.url = None;

        let summary = pipeline
            .ingest_batch(vec![
                raw("https://example.com/1", "First story", "", None),
                no_url,
                raw("https://example.com/1", "First story", "", None),
                raw("https://example.com/2", "Second story", "", None),
            ])
            .await
            .unwrap();

        assert_eq!(summary, IngestSummary { scored: 2, duplicates: 1, rejected: 1 });
    }

    #[tokio::test]
    async fn test_retention_deactivates_old_articles() {
        let (db, pipeline) = pipeline().await;
        let mut old = raw("https://example.com/old", "Archive story", "", None);
        old.published_at = Some("2020-01-01T00:00:00Z".to_string());
        pipeline.ingest(old).await.unwrap();
        let mut fresh = raw("https://example.com/fresh", "Fresh story", "", None);
        fresh.published_at = None;
        pipeline.ingest(fresh).await.unwrap();

        assert_eq!(pipeline.deactivate_older_than(30).await.unwrap(), 1);
        let active = db.list_articles(None, 10, 0).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].title, "Fresh story");
    }

    #[tokio::test]
    async fn test_batch_aborts_when_storage_is_gone() {
        let (db, pipeline) = pipeline().await;
        db.close().await;

        let result = pipeline
            .ingest_batch(vec![raw("https://example.com/1", "First story", "", None)])
            .await;
        assert!(matches!(result, Err(Error::Database(_))));
    }
}
