use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs, ResponseFormat,
};
use ollama_rs::generation::completion::request::GenerationRequest;
use ollama_rs::generation::options::GenerationOptions;
use ollama_rs::generation::parameters::FormatType;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use crate::{LLMClient, LLMParams, TARGET_LLM_REQUEST};

const MAX_RETRIES: u32 = 3;

/// Sends `prompt` to the configured backend, retrying with exponential backoff.
///
/// Each attempt is bounded by `request_timeout`. Returns `None` when every attempt
/// failed or the backend only produced whitespace.
pub async fn generate_llm_response(
    prompt: &str,
    params: &LLMParams,
    request_timeout: Duration,
) -> Option<String> {
    let mut backoff = 1;

    debug!(target: TARGET_LLM_REQUEST, "Starting LLM response generation with model {}", params.model);

    for retry_count in 0..MAX_RETRIES {
        match timeout(request_timeout, send_request(prompt, params)).await {
            Ok(Ok(response)) if !response.trim().is_empty() => {
                debug!(target: TARGET_LLM_REQUEST, "LLM response received: {}", response);
                return Some(strip_thinking_tags(&response));
            }
            Ok(Ok(_)) => {
                warn!(target: TARGET_LLM_REQUEST, "LLM returned an empty response");
            }
            Ok(Err(e)) => {
                warn!(target: TARGET_LLM_REQUEST, "Error generating response: {}", e);
            }
            Err(_) => {
                warn!(target: TARGET_LLM_REQUEST, "LLM request timed out after {:?}", request_timeout);
            }
        }

        if retry_count < MAX_RETRIES - 1 {
            info!(target: TARGET_LLM_REQUEST, "Retrying LLM request in {}s... ({}/{})", backoff, retry_count + 1, MAX_RETRIES);
            sleep(Duration::from_secs(backoff)).await;
            backoff *= 2;
        }
    }

    error!(target: TARGET_LLM_REQUEST, "No response generated after {} attempts", MAX_RETRIES);
    None
}

async fn send_request(prompt: &str, params: &LLMParams) -> Result<String, String> {
    match &params.llm_client {
        LLMClient::Ollama(ollama) => {
            let mut request = GenerationRequest::new(params.model.clone(), prompt.to_string());
            request.options = Some(GenerationOptions::default().temperature(params.temperature));
            if params.require_json {
                request.format = Some(FormatType::Json);
            }

            ollama
                .generate(request)
                .await
                .map(|response| response.response)
                .map_err(|e| e.to_string())
        }
        LLMClient::OpenAI(client) => {
            let message = ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(|e| e.to_string())?;
            let messages: Vec<ChatCompletionRequestMessage> = vec![message.into()];

            let mut builder = CreateChatCompletionRequestArgs::default();
            builder
                .model(params.model.clone())
                .temperature(params.temperature)
                .messages(messages);
            if params.require_json {
                builder.response_format(ResponseFormat::JsonObject);
            }
            let request = builder.build().map_err(|e| e.to_string())?;

            let response = client.chat().create(request).await.map_err(|e| e.to_string())?;
            response
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .ok_or_else(|| "no choices in completion".to_string())
        }
    }
}

/// Removes `<think>...</think>` blocks some reasoning models prepend to their answer.
pub fn strip_thinking_tags(response: &str) -> String {
    let mut result = response.to_string();
    while let Some(start) = result.find("<think>") {
        match result[start..].find("</think>") {
            Some(end) => result.replace_range(start..start + end + "</think>".len(), ""),
            None => break,
        }
    }
    result.trim().to_string()
}

/// Pulls the outermost `{...}` object out of a response that may be wrapped in prose or fences.
pub fn extract_json_object(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    (end > start).then(|| &response[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_thinking_tags() {
        assert_eq!(strip_thinking_tags("<think>hmm</think> {\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_thinking_tags("plain answer"), "plain answer");
        assert_eq!(strip_thinking_tags("<think>unterminated"), "<think>unterminated");
    }

    #[test]
    fn test_extract_json_object() {
        assert_eq!(
            extract_json_object("```json\n{\"qualityScore\": 80}\n```"),
            Some("{\"qualityScore\": 80}")
        );
        assert_eq!(extract_json_object("no json here"), None);
    }
}
