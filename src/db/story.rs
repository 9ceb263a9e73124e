use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::{debug, info, instrument};

use super::core::Database;
use crate::error::{Error, Result};
use crate::util::{format_timestamp, parse_timestamp};
use crate::viral::types::{
    FactCheck, StoryVerification, VerificationStatus, Virality, ViralNewsStory,
};
use crate::TARGET_DB;

fn story_from_row(row: &SqliteRow) -> Result<ViralNewsStory> {
    let keywords: String = row.get("keywords");
    let first_detected: String = row.get("first_detected");
    let status: String = row.get("verification_status");
    let confidence: i64 = row.get("confidence_score");
    let last_checked: Option<String> = row.get("last_checked");
    let verified_at: Option<String> = row.get("verified_at");
    let sources_count: i64 = row.get("sources_count");
    let claims: String = row.get("claims");
    let related_articles: String = row.get("related_articles");
    let fact_checks: String = row.get("fact_checks");
    let misinformation: String = row.get("misinformation");

    Ok(ViralNewsStory {
        id: row.get("id"),
        title: row.get("title"),
        summary: row.get("summary"),
        keywords: serde_json::from_str(&keywords)?,
        virality: Virality {
            score: row.get("virality_score"),
            first_detected: parse_timestamp(&first_detected).unwrap_or_else(Utc::now),
            sources_count: sources_count.max(0) as usize,
            velocity: row.get("velocity"),
        },
        verification: StoryVerification {
            status: VerificationStatus::from(status.as_str()),
            confidence_score: confidence.clamp(0, 100) as u8,
            last_checked: last_checked.as_deref().and_then(parse_timestamp),
            checked_by: row.get("checked_by"),
            verified_at: verified_at.as_deref().and_then(parse_timestamp),
        },
        claims: serde_json::from_str(&claims)?,
        related_articles: serde_json::from_str(&related_articles)?,
        fact_checks: serde_json::from_str(&fact_checks)?,
        misinformation_analysis: serde_json::from_str(&misinformation).unwrap_or_default(),
    })
}

impl Database {
    /// Creates `story` unless a tracked story already owns one of its keywords.
    ///
    /// The overlap check and the insert run inside one `BEGIN IMMEDIATE`
    /// transaction, so concurrent detection runs cannot both create a story
    /// for the same keywords. Returns `false` when the story was already tracked.
    ///
    /// The transaction rolls back when dropped, so a cancelled or failed
    /// creation never hands an open transaction back to the pool.
    #[instrument(target = "db", level = "info", skip(self, story), fields(story_id = %story.id))]
    pub async fn create_story_if_untracked(&self, story: &ViralNewsStory) -> Result<bool> {
        let mut transaction = self.pool().begin_with("BEGIN IMMEDIATE").await?;

        if insert_story_locked(&mut *transaction, story).await? {
            transaction.commit().await?;
            Ok(true)
        } else {
            transaction.rollback().await?;
            Ok(false)
        }
    }

    pub async fn get_story(&self, story_id: &str) -> Result<Option<ViralNewsStory>> {
        let row = sqlx::query("SELECT * FROM viral_stories WHERE id = ?1")
            .bind(story_id)
            .fetch_optional(self.pool())
            .await?;

        row.as_ref().map(story_from_row).transpose()
    }

    /// Stories ordered by virality, most viral first.
    pub async fn list_stories(&self, limit: i64) -> Result<Vec<ViralNewsStory>> {
        let rows = sqlx::query(
            "SELECT * FROM viral_stories ORDER BY virality_score DESC, first_detected DESC LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(story_from_row).collect()
    }

    /// Unverified stories at or above `min_virality`, most viral first.
    pub async fn get_stories_pending_verification(
        &self,
        limit: i64,
        min_virality: f64,
    ) -> Result<Vec<ViralNewsStory>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM viral_stories
            WHERE verification_status = 'unverified' AND virality_score >= ?1
            ORDER BY virality_score DESC
            LIMIT ?2
            "#,
        )
        .bind(min_virality)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(story_from_row).collect()
    }

    pub async fn set_story_status(&self, story_id: &str, status: VerificationStatus) -> Result<()> {
        let result = sqlx::query(
            "UPDATE viral_stories SET verification_status = ?1, last_checked = ?2 WHERE id = ?3",
        )
        .bind(status.to_string())
        .bind(format_timestamp(&Utc::now()))
        .bind(story_id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::StoryNotFound(story_id.to_string()));
        }
        Ok(())
    }

    /// Persists the verification outcome: status, confidence, claims and misinformation analysis.
    pub async fn save_story_verification(&self, story: &ViralNewsStory) -> Result<()> {
        let verification = &story.verification;
        let result = sqlx::query(
            r#"
            UPDATE viral_stories
            SET verification_status = ?1,
                confidence_score = ?2,
                last_checked = ?3,
                checked_by = ?4,
                verified_at = ?5,
                claims = ?6,
                misinformation = ?7
            WHERE id = ?8
            "#,
        )
        .bind(verification.status.to_string())
        .bind(verification.confidence_score as i64)
        .bind(verification.last_checked.as_ref().map(format_timestamp))
        .bind(&verification.checked_by)
        .bind(verification.verified_at.as_ref().map(format_timestamp))
        .bind(serde_json::to_string(&story.claims)?)
        .bind(serde_json::to_string(&story.misinformation_analysis)?)
        .bind(&story.id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::StoryNotFound(story.id.clone()));
        }
        debug!(target: TARGET_DB, "Saved verification for story {}: {}", story.id, verification.status);
        Ok(())
    }

    /// Appends a fact-check to the story's list in a single statement.
    pub async fn append_fact_check(&self, story_id: &str, fact_check: &FactCheck) -> Result<()> {
        let result = sqlx::query(
            "UPDATE viral_stories SET fact_checks = json_insert(fact_checks, '$[#]', json(?1)) WHERE id = ?2",
        )
        .bind(serde_json::to_string(fact_check)?)
        .bind(story_id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::StoryNotFound(story_id.to_string()));
        }
        info!(target: TARGET_DB, "Added {} fact-check to story {}", fact_check.source, story_id);
        Ok(())
    }
}

async fn insert_story_locked(conn: &mut SqliteConnection, story: &ViralNewsStory) -> Result<bool> {
    for keyword in &story.keywords {
        let tracked = sqlx::query_scalar::<_, String>(
            "SELECT story_id FROM story_keywords WHERE keyword = ?1 LIMIT 1",
        )
        .bind(keyword)
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(existing) = tracked {
            debug!(target: TARGET_DB, "Keyword '{}' already tracked by story {}", keyword, existing);
            return Ok(false);
        }
    }

    let verification = &story.verification;
    sqlx::query(
        r#"
        INSERT INTO viral_stories (id, title, summary, keywords, virality_score, first_detected,
            sources_count, velocity, verification_status, confidence_score, claims,
            related_articles, fact_checks, misinformation)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
        "#,
    )
    .bind(&story.id)
    .bind(&story.title)
    .bind(&story.summary)
    .bind(serde_json::to_string(&story.keywords)?)
    .bind(story.virality.score)
    .bind(format_timestamp(&story.virality.first_detected))
    .bind(story.virality.sources_count as i64)
    .bind(story.virality.velocity)
    .bind(verification.status.to_string())
    .bind(verification.confidence_score as i64)
    .bind(serde_json::to_string(&story.claims)?)
    .bind(serde_json::to_string(&story.related_articles)?)
    .bind(serde_json::to_string(&story.fact_checks)?)
    .bind(serde_json::to_string(&story.misinformation_analysis)?)
    .execute(&mut *conn)
    .await?;

    for keyword in &story.keywords {
        sqlx::query("INSERT OR IGNORE INTO story_keywords (story_id, keyword) VALUES (?1, ?2)")
            .bind(&story.id)
            .bind(keyword)
            .execute(&mut *conn)
            .await?;
    }

    Ok(true)
}
