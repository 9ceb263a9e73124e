pub mod db;
pub mod environment;
pub mod error;
pub mod filter;
pub mod llm;
pub mod logging;
pub mod patterns;
pub mod prompt;
pub mod util;
pub mod viral;

pub use error::{Error, Result};

use async_openai::{config::OpenAIConfig, Client as OpenAIClient};
use ollama_rs::Ollama;

pub const TARGET_LLM_REQUEST: &str = "llm_request";
pub const TARGET_DB: &str = "db_query";
pub const TARGET_FILTER: &str = "article_filter";
pub const TARGET_VIRAL: &str = "viral_detection";

/// Version tag written into every article's filtering metadata.
pub const FILTER_VERSION: &str = "2.1";

#[derive(Clone, Debug)]
pub enum LLMClient {
    Ollama(Ollama),
    OpenAI(OpenAIClient<OpenAIConfig>),
}

#[derive(Clone, Debug)]
pub struct LLMParams {
    pub llm_client: LLMClient,
    pub model: String,
    pub temperature: f32,
    /// Ask the backend for a JSON-only response.
    pub require_json: bool,
}
