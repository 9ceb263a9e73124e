use tracing::info;

use super::core::Database;
use crate::TARGET_DB;

impl Database {
    pub(crate) async fn initialize_schema(&self) -> Result<(), sqlx::Error> {
        let mut conn = self.pool().acquire().await?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS articles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL,
                normalized_url TEXT NOT NULL UNIQUE,
                external_id TEXT,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                content TEXT NOT NULL DEFAULT '',
                author TEXT,
                published_at TEXT NOT NULL,
                source_name TEXT NOT NULL,
                source_url TEXT,
                image_url TEXT,
                filtering TEXT, -- JSON FilteringMetadata
                overall_score INTEGER,
                is_passing BOOLEAN NOT NULL DEFAULT 0,
                curation_status TEXT NOT NULL DEFAULT 'pending',
                curated_by TEXT,
                curated_at TEXT,
                curation_notes TEXT,
                categories TEXT NOT NULL DEFAULT '[]', -- JSON array
                views INTEGER NOT NULL DEFAULT 0,
                is_active BOOLEAN NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_articles_published_at ON articles (published_at);
            CREATE INDEX IF NOT EXISTS idx_articles_active_published ON articles (is_active, published_at);
            CREATE INDEX IF NOT EXISTS idx_articles_curation_status ON articles (curation_status);
            CREATE INDEX IF NOT EXISTS idx_articles_source_name ON articles (source_name);

            CREATE TABLE IF NOT EXISTS sources (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                overall_score INTEGER NOT NULL,
                bias_rating TEXT NOT NULL,
                factual_reporting TEXT NOT NULL,
                rating_source TEXT NOT NULL,
                last_updated TEXT NOT NULL,
                article_count INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS viral_stories (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                summary TEXT NOT NULL DEFAULT '',
                keywords TEXT NOT NULL, -- JSON array
                virality_score REAL NOT NULL,
                first_detected TEXT NOT NULL,
                sources_count INTEGER NOT NULL,
                velocity REAL NOT NULL,
                verification_status TEXT NOT NULL DEFAULT 'unverified',
                confidence_score INTEGER NOT NULL DEFAULT 0,
                last_checked TEXT,
                checked_by TEXT,
                verified_at TEXT,
                claims TEXT NOT NULL DEFAULT '[]', -- JSON array of claims
                related_articles TEXT NOT NULL DEFAULT '[]', -- JSON array
                fact_checks TEXT NOT NULL DEFAULT '[]', -- JSON array
                misinformation TEXT NOT NULL DEFAULT '{}' -- JSON MisinformationAnalysis
            );
            CREATE INDEX IF NOT EXISTS idx_viral_status_score ON viral_stories (verification_status, virality_score);

            CREATE TABLE IF NOT EXISTS story_keywords (
                story_id TEXT NOT NULL,
                keyword TEXT NOT NULL,
                FOREIGN KEY (story_id) REFERENCES viral_stories (id) ON DELETE CASCADE,
                UNIQUE(story_id, keyword)
            );
            CREATE INDEX IF NOT EXISTS idx_story_keywords_keyword ON story_keywords (keyword);
            "#,
        )
        .execute(&mut *conn)
        .await?;
        info!(target: TARGET_DB, "Tables ensured to exist");

        Ok(())
    }
}
