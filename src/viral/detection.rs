use chrono::{Duration as ChronoDuration, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use super::types::{
    MisinformationAnalysis, RelatedArticle, StoryVerification, Virality, ViralNewsStory,
};
use crate::db::Database;
use crate::environment::Settings;
use crate::error::Result;
use crate::filter::types::Article;
use crate::util::significant_words;
use crate::TARGET_VIRAL;

/// Clustering key: the lower-cased headline up to its first colon.
pub fn topic_signature(title: &str) -> String {
    title
        .split(':')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

/// Distinct significant words of a signature, in order of appearance.
pub fn signature_keywords(signature: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    significant_words(signature)
        .into_iter()
        .filter(|word| seen.insert(word.clone()))
        .collect()
}

/// `min(100, articles * 10 + average member score / 2)`.
pub fn virality_score(article_count: usize, average_score: f64) -> f64 {
    (article_count as f64 * 10.0 + average_score * 0.5).min(100.0)
}

/// Groups recent articles by topic signature and records each new group that
/// is covered widely enough as a viral story.
#[derive(Clone, Debug)]
pub struct ViralClusterDetector {
    db: Database,
    window_hours: i64,
    min_articles: usize,
    min_sources: usize,
    // Serialises runs sharing this detector; the store's transaction covers separate processes.
    run_lock: Arc<Mutex<()>>,
}

impl ViralClusterDetector {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            window_hours: 24,
            min_articles: 3,
            min_sources: 3,
            run_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn from_settings(db: Database, settings: &Settings) -> Self {
        Self {
            window_hours: settings.detection_window_hours.max(1),
            min_articles: settings.min_cluster_articles,
            min_sources: settings.min_cluster_sources,
            ..Self::new(db)
        }
    }

    /// Runs one detection pass over the window and returns the stories it created.
    pub async fn detect(&self) -> Result<Vec<ViralNewsStory>> {
        let _guard = self.run_lock.lock().await;

        let since = Utc::now() - ChronoDuration::hours(self.window_hours);
        let articles = self.db.get_recent_articles(&since).await?;
        debug!(target: TARGET_VIRAL, "Scanning {} articles since {}", articles.len(), since);

        let mut groups: BTreeMap<String, Vec<Article>> = BTreeMap::new();
        for article in articles {
            let signature = topic_signature(&article.title);
            if !signature.is_empty() {
                groups.entry(signature).or_default().push(article);
            }
        }

        let mut created = Vec::new();
        for (signature, members) in groups {
            if members.len() < self.min_articles {
                continue;
            }

            let sources: HashSet<&str> = members.iter().map(|a| a.source_name.as_str()).collect();
            if sources.len() < self.min_sources {
                debug!(target: TARGET_VIRAL, "Skipping '{}': {} articles from only {} sources", signature, members.len(), sources.len());
                continue;
            }

            let keywords = signature_keywords(&signature);
            if keywords.is_empty() {
                continue;
            }

            let story = self.build_story(keywords, &members, sources.len());
            if self.db.create_story_if_untracked(&story).await? {
                info!(target: TARGET_VIRAL, "New viral story {} '{}': {} articles from {} sources, virality {:.1}", story.id, story.title, members.len(), story.virality.sources_count, story.virality.score);
                created.push(story);
            } else {
                debug!(target: TARGET_VIRAL, "Topic '{}' is already tracked", signature);
            }
        }

        Ok(created)
    }

    fn build_story(&self, keywords: Vec<String>, members: &[Article], sources_count: usize) -> ViralNewsStory {
        let count = members.len();
        let average_score =
            members.iter().map(|a| a.overall_score() as f64).sum::<f64>() / count as f64;

        // Headline and summary come from the best-scored member; earliest wins ties.
        let lead = members
            .iter()
            .max_by(|a, b| {
                a.overall_score()
                    .cmp(&b.overall_score())
                    .then_with(|| b.published_at.cmp(&a.published_at))
            })
            .unwrap_or(&members[0]);
        let summary = if lead.description.trim().is_empty() {
            lead.title.clone()
        } else {
            lead.description.clone()
        };

        let related_articles = members
            .iter()
            .map(|a| RelatedArticle {
                article_id: a.id,
                url: a.url.clone(),
                title: a.title.clone(),
                source: a.source_name.clone(),
                published_at: a.published_at,
                credibility_score: a.overall_score(),
            })
            .collect();

        ViralNewsStory {
            id: Uuid::new_v4().to_string(),
            title: lead.title.clone(),
            summary,
            keywords,
            virality: Virality {
                score: virality_score(count, average_score),
                first_detected: Utc::now(),
                sources_count,
                velocity: count as f64 / self.window_hours as f64,
            },
            verification: StoryVerification::default(),
            claims: Vec::new(),
            related_articles,
            fact_checks: Vec::new(),
            misinformation_analysis: MisinformationAnalysis::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_signature() {
        assert_eq!(topic_signature("Election Results: Ruling party wins"), "election results");
        assert_eq!(topic_signature("  Budget passes  "), "budget passes");
        assert_eq!(topic_signature(": no prefix"), "");
    }

    #[test]
    fn test_signature_keywords() {
        assert_eq!(
            signature_keywords("the election results and the election"),
            vec!["election", "results"]
        );
        assert!(signature_keywords("a to be").is_empty());
    }

    #[test]
    fn test_virality_score() {
        assert_eq!(virality_score(4, 70.0), 75.0);
        assert_eq!(virality_score(12, 90.0), 100.0);
    }
}
