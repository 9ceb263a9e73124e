use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid article: {0}")]
    InvalidArticle(String),

    #[error("unknown fact checker: {0}")]
    UnknownFactChecker(String),

    #[error("viral story not found: {0}")]
    StoryNotFound(String),

    #[error("article not found: {0}")]
    ArticleNotFound(i64),

    #[error("llm request failed: {0}")]
    Llm(String),

    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),
}

pub type Result<T> = std::result::Result<T, Error>;
