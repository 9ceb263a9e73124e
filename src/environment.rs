use async_openai::{config::OpenAIConfig, Client as OpenAIClient};
use ollama_rs::Ollama;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::{LLMClient, LLMParams};

/// Retrieves an environment variable and splits it into a vector of strings based on a delimiter.
///
/// Empty segments are dropped, so an unset variable yields an empty vector.
pub fn get_env_var_as_vec(var: &str, delimiter: char) -> Vec<String> {
    env::var(var)
        .unwrap_or_default()
        .split(delimiter)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn env_or<T: FromStr>(var: &str, default: T) -> T {
    env::var(var)
        .ok()
        .and_then(|value| value.trim().parse::<T>().ok())
        .unwrap_or(default)
}

/// Which text-judgment backend the content analyzer tries before the heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyzerBackend {
    Ollama,
    OpenAI,
    Heuristic,
}

impl From<&str> for AnalyzerBackend {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "ollama" => AnalyzerBackend::Ollama,
            "openai" => AnalyzerBackend::OpenAI,
            _ => AnalyzerBackend::Heuristic,
        }
    }
}

/// Runtime settings, read once from the environment by the entry points.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_path: String,
    pub log_dir: String,
    pub analyzer_backend: AnalyzerBackend,
    pub ollama_host: String,
    pub ollama_port: u16,
    pub analyzer_model: String,
    pub analyzer_temperature: f32,
    pub analyzer_timeout: Duration,
    pub fetch_timeout: Duration,
    pub detection_window_hours: i64,
    pub min_cluster_articles: usize,
    pub min_cluster_sources: usize,
    pub verify_batch_limit: i64,
    pub verify_min_virality: f64,
    pub run_interval: Duration,
    pub active_categories: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: "truthlens.db".to_string(),
            log_dir: "logs".to_string(),
            analyzer_backend: AnalyzerBackend::Heuristic,
            ollama_host: "http://localhost".to_string(),
            ollama_port: 11434,
            analyzer_model: "llama3".to_string(),
            analyzer_temperature: 0.0,
            analyzer_timeout: Duration::from_secs(15),
            fetch_timeout: Duration::from_secs(10),
            detection_window_hours: 24,
            min_cluster_articles: 3,
            min_cluster_sources: 3,
            verify_batch_limit: 10,
            verify_min_virality: 50.0,
            run_interval: Duration::from_secs(900),
            active_categories: Vec::new(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        let defaults = Settings::default();

        let ollama_host = env::var("OLLAMA_HOST").unwrap_or(defaults.ollama_host);
        let ollama_host = if ollama_host.starts_with("http://") || ollama_host.starts_with("https://") {
            ollama_host
        } else {
            format!("http://{}", ollama_host)
        };

        Self {
            database_path: env::var("DATABASE_PATH").unwrap_or(defaults.database_path),
            log_dir: env::var("LOG_DIR").unwrap_or(defaults.log_dir),
            analyzer_backend: AnalyzerBackend::from(
                env::var("ANALYZER_BACKEND").unwrap_or_default().as_str(),
            ),
            ollama_host,
            ollama_port: env_or("OLLAMA_PORT", defaults.ollama_port),
            analyzer_model: env::var("ANALYZER_MODEL").unwrap_or(defaults.analyzer_model),
            analyzer_temperature: env_or("ANALYZER_TEMPERATURE", defaults.analyzer_temperature),
            analyzer_timeout: Duration::from_secs(env_or("ANALYZER_TIMEOUT_SECS", 15)),
            fetch_timeout: Duration::from_secs(env_or("FETCH_TIMEOUT_SECS", 10)),
            detection_window_hours: env_or("DETECTION_WINDOW_HOURS", defaults.detection_window_hours),
            min_cluster_articles: env_or("MIN_CLUSTER_ARTICLES", defaults.min_cluster_articles),
            min_cluster_sources: env_or("MIN_CLUSTER_SOURCES", defaults.min_cluster_sources),
            verify_batch_limit: env_or("VERIFY_BATCH_LIMIT", defaults.verify_batch_limit),
            verify_min_virality: env_or("VERIFY_MIN_VIRALITY", defaults.verify_min_virality),
            run_interval: Duration::from_secs(env_or("RUN_INTERVAL_SECS", 900)),
            active_categories: get_env_var_as_vec("ACTIVE_CATEGORIES", ';'),
        }
    }

    /// Builds the LLM parameters for the configured external backend, if any.
    pub fn llm_params(&self) -> Option<LLMParams> {
        let llm_client = match self.analyzer_backend {
            AnalyzerBackend::Ollama => {
                LLMClient::Ollama(Ollama::new(self.ollama_host.clone(), self.ollama_port))
            }
            AnalyzerBackend::OpenAI => LLMClient::OpenAI(OpenAIClient::with_config(OpenAIConfig::default())),
            AnalyzerBackend::Heuristic => return None,
        };

        Some(LLMParams {
            llm_client,
            model: self.analyzer_model.clone(),
            temperature: self.analyzer_temperature,
            require_json: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parsing() {
        assert_eq!(AnalyzerBackend::from("Ollama"), AnalyzerBackend::Ollama);
        assert_eq!(AnalyzerBackend::from(" openai "), AnalyzerBackend::OpenAI);
        assert_eq!(AnalyzerBackend::from(""), AnalyzerBackend::Heuristic);
        assert_eq!(AnalyzerBackend::from("something-else"), AnalyzerBackend::Heuristic);
    }

    #[test]
    fn test_heuristic_backend_has_no_llm_params() {
        let settings = Settings::default();
        assert!(settings.llm_params().is_none());
    }

    #[test]
    fn test_env_var_as_vec_skips_empty_segments() {
        env::set_var("TRUTHLENS_TEST_LIST", "Politics; ;Technology;");
        assert_eq!(
            get_env_var_as_vec("TRUTHLENS_TEST_LIST", ';'),
            vec!["Politics".to_string(), "Technology".to_string()]
        );
        assert!(get_env_var_as_vec("TRUTHLENS_TEST_UNSET_LIST", ';').is_empty());
    }
}
