use chrono::Utc;
use tracing::{debug, info, warn};
use url::Url;

use super::types::{
    BiasRating, CredibilityLayer, CredibilityRating, FactualReporting, RatingSource, Source,
};
use crate::db::Database;
use crate::error::Result;
use crate::TARGET_FILTER;

/// Bucket for articles that arrive without any resolvable publisher.
pub const UNKNOWN_SOURCE: &str = "Unknown";

use BiasRating::*;
use FactualReporting::{High, Mixed, VeryHigh, VeryLow};

/// Curated publisher ratings: (name, overall score, bias, factual reporting).
static CURATED_SOURCES: &[(&str, u8, BiasRating, FactualReporting)] = &[
    ("Reuters", 95, Center, VeryHigh),
    ("Associated Press", 95, Center, VeryHigh),
    ("AP News", 95, Center, VeryHigh),
    ("BBC News", 90, CenterLeft, High),
    ("NPR", 88, CenterLeft, High),
    ("Bloomberg", 88, Center, High),
    ("The Economist", 88, CenterLeft, High),
    ("The Wall Street Journal", 85, CenterRight, High),
    ("The New York Times", 85, CenterLeft, High),
    ("The Washington Post", 84, CenterLeft, High),
    ("Financial Times", 88, Center, High),
    ("The Guardian", 82, CenterLeft, High),
    ("Al Jazeera English", 75, CenterLeft, Mixed),
    ("CNN", 70, Left, Mixed),
    ("Fox News", 60, Right, Mixed),
    ("The Hindu", 82, CenterLeft, High),
    ("Indian Express", 80, Center, High),
    ("NDTV", 72, CenterLeft, Mixed),
    ("Times of India", 65, Center, Mixed),
    ("Breitbart News", 30, Right, FactualReporting::Low),
    ("Infowars", 10, Right, VeryLow),
];

/// Hostnames of curated publishers, used when an article carries no source name.
static DOMAIN_SOURCES: &[(&str, &str)] = &[
    ("reuters.com", "Reuters"),
    ("apnews.com", "Associated Press"),
    ("bbc.com", "BBC News"),
    ("bbc.co.uk", "BBC News"),
    ("npr.org", "NPR"),
    ("bloomberg.com", "Bloomberg"),
    ("economist.com", "The Economist"),
    ("wsj.com", "The Wall Street Journal"),
    ("nytimes.com", "The New York Times"),
    ("washingtonpost.com", "The Washington Post"),
    ("ft.com", "Financial Times"),
    ("theguardian.com", "The Guardian"),
    ("aljazeera.com", "Al Jazeera English"),
    ("cnn.com", "CNN"),
    ("foxnews.com", "Fox News"),
    ("thehindu.com", "The Hindu"),
    ("indianexpress.com", "Indian Express"),
    ("ndtv.com", "NDTV"),
    ("timesofindia.indiatimes.com", "Times of India"),
    ("breitbart.com", "Breitbart News"),
    ("infowars.com", "Infowars"),
];

/// Curated rating for `name`, matched case-insensitively.
pub fn curated_rating(name: &str) -> Option<CredibilityRating> {
    let wanted = name.trim().to_lowercase();
    CURATED_SOURCES
        .iter()
        .find(|(curated, ..)| curated.to_lowercase() == wanted)
        .map(|(_, score, bias, factual)| CredibilityRating {
            overall_score: *score,
            bias_rating: *bias,
            factual_reporting: *factual,
            last_updated: Utc::now(),
            rating_source: RatingSource::Curated,
        })
}

/// Publisher name for an article URL, from the curated domain table.
pub fn source_name_for_url(article_url: &str) -> Option<&'static str> {
    let parsed = Url::parse(article_url).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    DOMAIN_SOURCES
        .iter()
        .find(|(domain, _)| host == *domain || host.ends_with(&format!(".{}", domain)))
        .map(|(_, name)| *name)
}

/// Manual changes to a source's rating.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingUpdate {
    pub overall_score: u8,
    pub bias_rating: BiasRating,
    pub factual_reporting: FactualReporting,
    /// `None` records the update as manual.
    pub rating_source: Option<RatingSource>,
}

/// Lookup and maintenance of per-publisher credibility ratings.
///
/// Lookups never fail: any storage error yields the neutral rating so that
/// article scoring is never blocked on this layer.
#[derive(Clone, Debug)]
pub struct SourceCredibilityStore {
    db: Database,
}

impl SourceCredibilityStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Returns the stored source, creating it on first sight.
    ///
    /// New sources take their curated rating when one exists, otherwise the
    /// neutral default; whichever is stored first is kept.
    pub async fn get_or_create(&self, name: &str) -> Source {
        let name = normalize_source_name(name);

        match self.db.get_source(&name).await {
            Ok(Some(source)) => return source,
            Ok(None) => {}
            Err(e) => {
                warn!(target: TARGET_FILTER, "Source lookup failed for '{}', using default rating: {}", name, e);
                return default_source(&name);
            }
        }

        let rating = curated_rating(&name).unwrap_or_else(CredibilityRating::neutral);
        match self.db.insert_source_if_absent(&name, &rating).await {
            Ok(source) => {
                debug!(target: TARGET_FILTER, "Resolved source '{}' with {} rating {}", name, source.credibility_rating.rating_source, source.credibility_rating.overall_score);
                source
            }
            Err(e) => {
                warn!(target: TARGET_FILTER, "Source creation failed for '{}', using default rating: {}", name, e);
                default_source(&name)
            }
        }
    }

    /// The credibility layer an article from `name` receives.
    pub async fn credibility_layer(&self, name: &str) -> CredibilityLayer {
        let source = self.get_or_create(name).await;
        CredibilityLayer::from(&source.credibility_rating)
    }

    pub async fn update(&self, name: &str, update: RatingUpdate) -> Result<Source> {
        let name = normalize_source_name(name);
        let rating = CredibilityRating {
            overall_score: update.overall_score.min(100),
            bias_rating: update.bias_rating,
            factual_reporting: update.factual_reporting,
            last_updated: Utc::now(),
            rating_source: update.rating_source.unwrap_or(RatingSource::Manual),
        };

        let source = self.db.upsert_source_rating(&name, &rating).await?;
        info!(target: TARGET_FILTER, "Updated rating for '{}' to {} ({})", name, rating.overall_score, rating.rating_source);
        Ok(source)
    }

    /// Seeds every curated rating; safe to run at every start-up.
    ///
    /// Ratings that were set manually are left alone.
    pub async fn initialize_defaults(&self) -> Result<usize> {
        let mut changed = 0;
        for (name, ..) in CURATED_SOURCES {
            if let Some(rating) = curated_rating(name) {
                if self.db.seed_source_rating(name, &rating).await? {
                    changed += 1;
                }
            }
        }
        info!(target: TARGET_FILTER, "Seeded {} curated source ratings", changed);
        Ok(changed)
    }

    /// Bumps the source's article counter; failures are logged only.
    pub async fn record_article(&self, name: &str) {
        let name = normalize_source_name(name);
        if let Err(e) = self.db.increment_source_article_count(&name).await {
            warn!(target: TARGET_FILTER, "Failed to update article count for '{}': {}", name, e);
        }
    }
}

fn normalize_source_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        UNKNOWN_SOURCE.to_string()
    } else {
        trimmed.to_string()
    }
}

fn default_source(name: &str) -> Source {
    Source {
        id: None,
        name: name.to_string(),
        credibility_rating: CredibilityRating::neutral(),
        article_count: 0,
    }
}
