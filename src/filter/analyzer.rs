use async_trait::async_trait;
use once_cell::sync::Lazy;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::keywords::{QUALITY_INDICATORS, SENSATIONAL_WORDS};
use super::types::{AiAnalysis, Sentiment};
use crate::environment::Settings;
use crate::error::{Error, Result};
use crate::llm::{extract_json_object, generate_llm_response};
use crate::patterns::{matched_labels, phrases, Pattern};
use crate::prompt::content_judgment_prompt;
use crate::{LLMParams, TARGET_FILTER};

pub const HEURISTIC_MODEL: &str = "heuristic";

static OPINION_CUES: Lazy<Vec<Pattern>> = Lazy::new(|| {
    phrases(&[
        "i think",
        "i believe",
        "in my opinion",
        "in my view",
        "we believe",
        "it seems to me",
        "editorial:",
        "opinion:",
        "op-ed",
        "commentary:",
    ])
});

static POSITIVE_WORDS: Lazy<Vec<Pattern>> = Lazy::new(|| {
    phrases(&[
        "success", "successful", "growth", "improve", "improved", "win", "wins", "breakthrough",
        "benefit", "celebrate", "gain", "gains", "progress", "hope", "praised", "recovery",
        "boost", "record high", "rescued", "thriving",
    ])
});

static NEGATIVE_WORDS: Lazy<Vec<Pattern>> = Lazy::new(|| {
    phrases(&[
        "crisis", "death", "deaths", "killed", "decline", "loss", "losses", "fail", "failed",
        "failure", "attack", "war", "collapse", "fear", "crash", "condemn", "violence",
        "disaster", "injured", "recession",
    ])
});

/// Text handed to a content analyzer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisInput {
    pub title: String,
    pub source_name: String,
    pub description: String,
    pub content: String,
}

/// A strategy producing a quality/bias/credibility judgment of an article.
#[async_trait]
pub trait ContentAnalyzer: Send + Sync {
    /// Identifier recorded as the judgment's `model`.
    fn name(&self) -> &str;

    async fn analyze(&self, input: &AnalysisInput) -> Result<AiAnalysis>;
}

/// Deterministic lexical judgment; always available.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicAnalyzer;

impl HeuristicAnalyzer {
    pub fn judge(&self, input: &AnalysisInput) -> AiAnalysis {
        let full_text = format!("{} {} {}", input.title, input.description, input.content)
            .to_lowercase();

        let quality_matches = matched_labels(&QUALITY_INDICATORS, &full_text).len() as i32;
        let sensational_matches = matched_labels(&SENSATIONAL_WORDS, &full_text).len() as i32;
        let opinion_matches = matched_labels(&OPINION_CUES, &full_text).len() as i32;

        let mut quality_score = 60 + quality_matches * 5 - sensational_matches * 10 - opinion_matches * 5;
        let content_length = input.content.chars().count();
        if content_length > 500 {
            quality_score += 5;
        }
        if content_length > 1000 {
            quality_score += 5;
        }
        let credibility_score = quality_score + quality_matches * 3;

        let positive: usize = POSITIVE_WORDS.iter().map(|p| p.count(&full_text)).sum();
        let negative: usize = NEGATIVE_WORDS.iter().map(|p| p.count(&full_text)).sum();
        let sentiment = if positive > negative + 2 {
            Sentiment::Positive
        } else if negative > positive + 2 {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        };

        AiAnalysis {
            quality_score: quality_score.clamp(0, 100) as u8,
            bias_score: 0,
            credibility_score: credibility_score.clamp(0, 100) as u8,
            sentiment,
            is_opinion: opinion_matches > 0,
            is_factual: opinion_matches == 0 && sensational_matches < 2,
            model: HEURISTIC_MODEL.to_string(),
        }
    }
}

#[async_trait]
impl ContentAnalyzer for HeuristicAnalyzer {
    fn name(&self) -> &str {
        HEURISTIC_MODEL
    }

    async fn analyze(&self, input: &AnalysisInput) -> Result<AiAnalysis> {
        Ok(self.judge(input))
    }
}

/// The JSON object the language model is asked to return.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct JudgmentResponse {
    pub quality_score: f64,
    pub bias_score: f64,
    pub credibility_score: f64,
    pub sentiment: String,
    pub is_opinion: bool,
    pub is_factual: bool,
}

static JUDGMENT_SCHEMA: Lazy<String> = Lazy::new(|| {
    serde_json::to_string_pretty(&schemars::schema_for!(JudgmentResponse)).unwrap_or_default()
});

/// Parses a model response into a judgment, clamping every score into range.
pub fn parse_judgment(response: &str, model: &str) -> Result<AiAnalysis> {
    let json = extract_json_object(response)
        .ok_or_else(|| Error::Llm(format!("no JSON object in response: {}", response)))?;
    let parsed: JudgmentResponse = serde_json::from_str(json)?;

    let score = |value: f64| {
        if value.is_finite() {
            value.round().clamp(0.0, 100.0) as u8
        } else {
            50
        }
    };
    let bias = if parsed.bias_score.is_finite() {
        parsed.bias_score.round().clamp(-100.0, 100.0) as i8
    } else {
        0
    };

    Ok(AiAnalysis {
        quality_score: score(parsed.quality_score),
        bias_score: bias,
        credibility_score: score(parsed.credibility_score),
        sentiment: Sentiment::from(parsed.sentiment.as_str()),
        is_opinion: parsed.is_opinion,
        is_factual: parsed.is_factual,
        model: model.to_string(),
    })
}

/// Judgment from an Ollama or OpenAI-compatible model.
#[derive(Clone, Debug)]
pub struct LlmContentAnalyzer {
    params: LLMParams,
    request_timeout: Duration,
}

impl LlmContentAnalyzer {
    pub fn new(params: LLMParams, request_timeout: Duration) -> Self {
        Self {
            params,
            request_timeout,
        }
    }
}

#[async_trait]
impl ContentAnalyzer for LlmContentAnalyzer {
    fn name(&self) -> &str {
        &self.params.model
    }

    async fn analyze(&self, input: &AnalysisInput) -> Result<AiAnalysis> {
        let prompt = content_judgment_prompt(
            &input.title,
            &input.source_name,
            &input.description,
            &input.content,
            &JUDGMENT_SCHEMA,
        );

        let response = generate_llm_response(&prompt, &self.params, self.request_timeout)
            .await
            .ok_or_else(|| Error::Llm("no response from text-judgment backend".to_string()))?;

        parse_judgment(&response, &self.params.model)
    }
}

/// Tries each configured analyzer in order and ends in the heuristic.
///
/// Every attempt is bounded by `attempt_timeout`; failures and timeouts move on
/// to the next strategy, so `analyze` always produces a judgment.
#[derive(Clone)]
pub struct AnalyzerChain {
    analyzers: Vec<Arc<dyn ContentAnalyzer>>,
    fallback: HeuristicAnalyzer,
    attempt_timeout: Duration,
}

impl AnalyzerChain {
    pub fn new(analyzers: Vec<Arc<dyn ContentAnalyzer>>, attempt_timeout: Duration) -> Self {
        Self {
            analyzers,
            fallback: HeuristicAnalyzer,
            attempt_timeout,
        }
    }

    pub fn heuristic_only() -> Self {
        Self::new(Vec::new(), Duration::from_secs(15))
    }

    /// External backend from the settings, if any, followed by the heuristic.
    pub fn from_settings(settings: &Settings) -> Self {
        let mut analyzers: Vec<Arc<dyn ContentAnalyzer>> = Vec::new();
        if let Some(params) = settings.llm_params() {
            analyzers.push(Arc::new(LlmContentAnalyzer::new(params, settings.analyzer_timeout)));
        }
        // Bounds the whole retry loop of the external call, not just one request.
        let attempt_timeout = settings.analyzer_timeout * 4;
        Self::new(analyzers, attempt_timeout)
    }

    pub async fn analyze(&self, input: &AnalysisInput) -> AiAnalysis {
        for analyzer in &self.analyzers {
            match timeout(self.attempt_timeout, analyzer.analyze(input)).await {
                Ok(Ok(analysis)) => {
                    debug!(target: TARGET_FILTER, "Content judged by {}", analyzer.name());
                    return analysis;
                }
                Ok(Err(e)) => {
                    warn!(target: TARGET_FILTER, "Analyzer {} failed, falling back: {}", analyzer.name(), e);
                }
                Err(_) => {
                    warn!(target: TARGET_FILTER, "Analyzer {} timed out after {:?}, falling back", analyzer.name(), self.attempt_timeout);
                }
            }
        }

        self.fallback.judge(input)
    }
}
