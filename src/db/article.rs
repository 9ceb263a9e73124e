use chrono::{DateTime, Utc};
use rand::Rng;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, instrument};
use url::Url;
use urlnorm::UrlNormalizer;

use super::core::{Database, DbLockErrorExt};
use crate::error::{Error, Result};
use crate::filter::types::{
    Article, Curation, CurationStatus, FilteringMetadata, NewArticle, ScoredArticle,
};
use crate::util::{format_timestamp, parse_timestamp};
use crate::TARGET_DB;

/// Outcome of an insert attempt keyed on the normalized URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArticleInsert {
    Inserted(i64),
    Duplicate,
}

/// Canonical form of an article URL; two URLs with the same form are the same article.
pub fn normalize_url(url: &str) -> Result<String> {
    let parsed_url = Url::parse(url.trim())
        .map_err(|e| Error::InvalidArticle(format!("invalid url '{}': {}", url, e)))?;
    let normalizer = UrlNormalizer::default();
    Ok(normalizer.compute_normalization_string(&parsed_url))
}

const ARTICLE_COLUMNS: &str = r#"
    id, url, external_id, title, description, content, author, published_at,
    source_name, source_url, image_url, filtering, curation_status, curated_by,
    curated_at, curation_notes, categories, views, is_active, created_at
"#;

fn article_from_row(row: &SqliteRow) -> Result<Article> {
    let filtering: Option<String> = row.get("filtering");
    let categories: String = row.get("categories");
    let published_at: String = row.get("published_at");
    let created_at: String = row.get("created_at");
    let curated_at: Option<String> = row.get("curated_at");
    let curation_status: String = row.get("curation_status");

    Ok(Article {
        id: row.get("id"),
        url: row.get("url"),
        external_id: row.get("external_id"),
        title: row.get("title"),
        description: row.get("description"),
        content: row.get("content"),
        author: row.get("author"),
        published_at: parse_timestamp(&published_at).unwrap_or_else(Utc::now),
        source_name: row.get("source_name"),
        source_url: row.get("source_url"),
        image_url: row.get("image_url"),
        filtering: filtering
            .as_deref()
            .map(serde_json::from_str::<FilteringMetadata>)
            .transpose()?,
        curation: Curation {
            status: CurationStatus::from(curation_status.as_str()),
            curated_by: row.get("curated_by"),
            curated_at: curated_at.as_deref().and_then(parse_timestamp),
            notes: row.get("curation_notes"),
        },
        categories: serde_json::from_str(&categories)?,
        views: row.get("views"),
        is_active: row.get("is_active"),
        created_at: parse_timestamp(&created_at).unwrap_or_else(Utc::now),
    })
}

impl Database {
    /// Inserts an article unless one with the same normalized URL already exists.
    ///
    /// A duplicate is not an error: it is reported as `ArticleInsert::Duplicate`
    /// and the stored row is left untouched.
    #[instrument(target = "db", level = "info", skip(self, article), fields(url = %article.url))]
    pub async fn insert_article(&self, article: &NewArticle) -> Result<ArticleInsert> {
        let normalized_url = normalize_url(&article.url)?;
        let created_at = format_timestamp(&Utc::now());
        let published_at = format_timestamp(&article.published_at);
        debug!(target: TARGET_DB, "Adding article: {}", article.url);

        let mut backoff = 100; // initial delay in milliseconds
        let max_retries = 5;

        for attempt in 1..=max_retries {
            let result = sqlx::query_scalar::<_, i64>(
                r#"
                INSERT INTO articles (url, normalized_url, external_id, title, description, content,
                    author, published_at, source_name, source_url, image_url, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                ON CONFLICT(normalized_url) DO NOTHING
                RETURNING id
                "#,
            )
            .bind(&article.url)
            .bind(&normalized_url)
            .bind(&article.external_id)
            .bind(&article.title)
            .bind(&article.description)
            .bind(&article.content)
            .bind(&article.author)
            .bind(&published_at)
            .bind(&article.source_name)
            .bind(&article.source_url)
            .bind(&article.image_url)
            .bind(&created_at)
            .fetch_optional(self.pool())
            .await;

            match result {
                Ok(Some(id)) => {
                    debug!(target: TARGET_DB, "Article added: {} with id {}", article.url, id);
                    return Ok(ArticleInsert::Inserted(id));
                }
                Ok(None) => {
                    debug!(target: TARGET_DB, "Skipping duplicate article: {}", article.url);
                    return Ok(ArticleInsert::Duplicate);
                }
                Err(err) if err.is_database_lock_error() && attempt < max_retries => {
                    info!(target: TARGET_DB, "Database is locked, waiting {}ms before retrying attempt {}/{}: {}", backoff, attempt, max_retries, article.url);
                    // jitter keeps concurrent writers from retrying in lockstep
                    let random_jitter = rand::rng().random_range(0..200);
                    sleep(Duration::from_millis(backoff + random_jitter)).await;
                    backoff = backoff.saturating_mul(2);
                }
                Err(err) => {
                    error!(target: TARGET_DB, "Failed to add article {}: {}", article.url, err);
                    return Err(err.into());
                }
            }
        }

        Err(Error::Database(sqlx::Error::Protocol(
            "Maximum retries exceeded for adding article".into(),
        )))
    }

    pub async fn get_article(&self, article_id: i64) -> Result<Option<Article>> {
        let row = sqlx::query(&format!("SELECT {} FROM articles WHERE id = ?1", ARTICLE_COLUMNS))
            .bind(article_id)
            .fetch_optional(self.pool())
            .await?;

        row.as_ref().map(article_from_row).transpose()
    }

    pub async fn get_article_by_url(&self, url: &str) -> Result<Option<Article>> {
        let normalized_url = normalize_url(url)?;
        let row = sqlx::query(&format!(
            "SELECT {} FROM articles WHERE normalized_url = ?1",
            ARTICLE_COLUMNS
        ))
        .bind(&normalized_url)
        .fetch_optional(self.pool())
        .await?;

        row.as_ref().map(article_from_row).transpose()
    }

    /// Gets the text an article contributes as corroborating evidence.
    pub async fn get_article_text(&self, article_id: i64) -> Result<String> {
        let row = sqlx::query("SELECT title, description, content FROM articles WHERE id = ?1")
            .bind(article_id)
            .fetch_optional(self.pool())
            .await?
            .ok_or(Error::ArticleNotFound(article_id))?;

        let parts: Vec<String> = ["title", "description", "content"]
            .iter()
            .map(|column| row.get::<String, _>(*column))
            .filter(|part| !part.trim().is_empty())
            .collect();

        Ok(parts.join("\n"))
    }

    /// Writes the computed score layers. A manually curated status is kept.
    #[instrument(target = "db", level = "info", skip(self, scored))]
    pub async fn update_article_scoring(&self, article_id: i64, scored: &ScoredArticle) -> Result<()> {
        let filtering = serde_json::to_string(&scored.filtering)?;
        let categories = serde_json::to_string(&scored.categories)?;

        let result = sqlx::query(
            r#"
            UPDATE articles
            SET filtering = ?1,
                overall_score = ?2,
                is_passing = ?3,
                categories = ?4,
                curation_status = CASE WHEN curated_by IS NULL THEN ?5 ELSE curation_status END
            WHERE id = ?6
            "#,
        )
        .bind(&filtering)
        .bind(scored.filtering.overall_score as i64)
        .bind(scored.filtering.is_passing)
        .bind(&categories)
        .bind(scored.curation_status.to_string())
        .bind(article_id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::ArticleNotFound(article_id));
        }
        debug!(target: TARGET_DB, "Stored scoring for article {}: {}", article_id, scored.filtering.overall_score);
        Ok(())
    }

    /// Manual curation override.
    pub async fn set_curation(
        &self,
        article_id: i64,
        status: CurationStatus,
        curated_by: &str,
        notes: Option<&str>,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE articles
            SET curation_status = ?1, curated_by = ?2, curated_at = ?3, curation_notes = ?4
            WHERE id = ?5
            "#,
        )
        .bind(status.to_string())
        .bind(curated_by)
        .bind(format_timestamp(&Utc::now()))
        .bind(notes)
        .bind(article_id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::ArticleNotFound(article_id));
        }
        info!(target: TARGET_DB, "Article {} curated as {} by {}", article_id, status, curated_by);
        Ok(())
    }

    /// Atomically bumps the view counter and returns the new value.
    pub async fn increment_article_views(&self, article_id: i64) -> Result<i64> {
        sqlx::query_scalar::<_, i64>(
            "UPDATE articles SET views = views + 1 WHERE id = ?1 RETURNING views",
        )
        .bind(article_id)
        .fetch_optional(self.pool())
        .await?
        .ok_or(Error::ArticleNotFound(article_id))
    }

    /// Active, non-rejected articles published at or after `since`, newest first.
    pub async fn get_recent_articles(&self, since: &DateTime<Utc>) -> Result<Vec<Article>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM articles
            WHERE is_active = 1 AND curation_status != 'rejected' AND published_at >= ?1
            ORDER BY published_at DESC
            "#,
            ARTICLE_COLUMNS
        ))
        .bind(format_timestamp(since))
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(article_from_row).collect()
    }

    /// Lists articles by descending score, optionally restricted to one curation status.
    pub async fn list_articles(
        &self,
        status: Option<CurationStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Article>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM articles
            WHERE is_active = 1 AND (?1 IS NULL OR curation_status = ?1)
            ORDER BY overall_score DESC, published_at DESC
            LIMIT ?2 OFFSET ?3
            "#,
            ARTICLE_COLUMNS
        ))
        .bind(status.map(|s| s.to_string()))
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(article_from_row).collect()
    }

    /// Retention cleanup: soft-deletes articles published before `cutoff`.
    pub async fn deactivate_articles_before(&self, cutoff: &DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE articles SET is_active = 0 WHERE is_active = 1 AND published_at < ?1",
        )
        .bind(format_timestamp(cutoff))
        .execute(self.pool())
        .await?;

        info!(target: TARGET_DB, "Deactivated {} articles published before {}", result.rows_affected(), cutoff);
        Ok(result.rows_affected())
    }
}
