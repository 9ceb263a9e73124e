use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::debug;

use super::core::Database;
use crate::error::Result;
use crate::filter::types::{BiasRating, CredibilityRating, FactualReporting, RatingSource, Source};
use crate::util::{format_timestamp, parse_timestamp};
use crate::TARGET_DB;

fn source_from_row(row: &SqliteRow) -> Source {
    let bias_rating: String = row.get("bias_rating");
    let factual_reporting: String = row.get("factual_reporting");
    let rating_source: String = row.get("rating_source");
    let last_updated: String = row.get("last_updated");
    let overall_score: i64 = row.get("overall_score");

    Source {
        id: Some(row.get("id")),
        name: row.get("name"),
        credibility_rating: CredibilityRating {
            overall_score: overall_score.clamp(0, 100) as u8,
            bias_rating: BiasRating::from(bias_rating.as_str()),
            factual_reporting: FactualReporting::from(factual_reporting.as_str()),
            last_updated: parse_timestamp(&last_updated).unwrap_or_else(Utc::now),
            rating_source: RatingSource::from(rating_source.as_str()),
        },
        article_count: row.get("article_count"),
    }
}

impl Database {
    pub async fn get_source(&self, name: &str) -> Result<Option<Source>> {
        let row = sqlx::query("SELECT * FROM sources WHERE name = ?1")
            .bind(name)
            .fetch_optional(self.pool())
            .await?;

        Ok(row.as_ref().map(source_from_row))
    }

    /// Creates the source with `rating` unless it exists, then returns the stored row.
    ///
    /// Two concurrent first sightings both end up reading the single row the
    /// unique constraint let through.
    pub async fn insert_source_if_absent(&self, name: &str, rating: &CredibilityRating) -> Result<Source> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO sources (name, overall_score, bias_rating, factual_reporting, rating_source, last_updated)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(name) DO NOTHING
            "#,
        )
        .bind(name)
        .bind(rating.overall_score as i64)
        .bind(rating.bias_rating.to_string())
        .bind(rating.factual_reporting.to_string())
        .bind(rating.rating_source.to_string())
        .bind(format_timestamp(&rating.last_updated))
        .execute(self.pool())
        .await?;

        if inserted.rows_affected() > 0 {
            debug!(target: TARGET_DB, "Created source '{}' with {} rating", name, rating.rating_source);
        }

        let row = sqlx::query("SELECT * FROM sources WHERE name = ?1")
            .bind(name)
            .fetch_one(self.pool())
            .await?;
        Ok(source_from_row(&row))
    }

    /// Inserts or overwrites the source's rating.
    pub async fn upsert_source_rating(&self, name: &str, rating: &CredibilityRating) -> Result<Source> {
        let row = sqlx::query(
            r#"
            INSERT INTO sources (name, overall_score, bias_rating, factual_reporting, rating_source, last_updated)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(name) DO UPDATE SET
                overall_score = excluded.overall_score,
                bias_rating = excluded.bias_rating,
                factual_reporting = excluded.factual_reporting,
                rating_source = excluded.rating_source,
                last_updated = excluded.last_updated
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(rating.overall_score as i64)
        .bind(rating.bias_rating.to_string())
        .bind(rating.factual_reporting.to_string())
        .bind(rating.rating_source.to_string())
        .bind(format_timestamp(&rating.last_updated))
        .fetch_one(self.pool())
        .await?;

        Ok(source_from_row(&row))
    }

    /// Upserts a curated rating without overwriting a manually set one.
    ///
    /// Returns `true` when a row was inserted or changed.
    pub async fn seed_source_rating(&self, name: &str, rating: &CredibilityRating) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO sources (name, overall_score, bias_rating, factual_reporting, rating_source, last_updated)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(name) DO UPDATE SET
                overall_score = excluded.overall_score,
                bias_rating = excluded.bias_rating,
                factual_reporting = excluded.factual_reporting,
                rating_source = excluded.rating_source,
                last_updated = excluded.last_updated
            WHERE sources.rating_source != 'manual'
            "#,
        )
        .bind(name)
        .bind(rating.overall_score as i64)
        .bind(rating.bias_rating.to_string())
        .bind(rating.factual_reporting.to_string())
        .bind(rating.rating_source.to_string())
        .bind(format_timestamp(&rating.last_updated))
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn increment_source_article_count(&self, name: &str) -> Result<()> {
        sqlx::query("UPDATE sources SET article_count = article_count + 1 WHERE name = ?1")
            .bind(name)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Sources ordered by credibility, best first.
    pub async fn list_sources(&self, limit: i64) -> Result<Vec<Source>> {
        let rows = sqlx::query("SELECT * FROM sources ORDER BY overall_score DESC, name ASC LIMIT ?1")
            .bind(limit)
            .fetch_all(self.pool())
            .await?;

        Ok(rows.iter().map(source_from_row).collect())
    }
}
