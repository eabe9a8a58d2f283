//! Client for an OpenAI-compatible chat completion endpoint.
//!
//! One request per analysis or consultation, bounded by the configured
//! timeout. Any failure (network, non-2xx status, malformed body, empty
//! choices) becomes [`COMPLETION_ERROR_REPLY`]; nothing is retried.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, Instrument};

use crate::config::CompletionConfig;
use crate::errors::{error_logging, AppError, AppResult};
use crate::observability;
use crate::storage::{Mood, SkinType};

/// Marker that starts every failed completion reply
pub const COMPLETION_ERROR_MARKER: &str = "⚠️";

/// Reply shown when the completion round trip fails for any reason
pub const COMPLETION_ERROR_REPLY: &str =
    "⚠️ Извини, сейчас не получается ответить. Попробуй чуть позже 🌸";

/// Fixed system instruction attached to every request
pub const SYSTEM_PROMPT: &str = "Ты — Полина Павловна, опытный и доброжелательный AI-косметолог. \
Отвечай кратко, по делу и на языке собеседника. Давай практичные советы по уходу за кожей, \
объясняй действие ингредиентов и предупреждай о возможных рисках. \
Не ставь медицинских диагнозов и при серьёзных проблемах советуй обратиться к дерматологу.";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Debug, Deserialize)]
struct MessageContent {
    #[serde(default)]
    content: Option<String>,
}

/// What the user asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    /// Free-form question
    Consultation,
    /// Ingredient list or product name to analyse
    IngredientAnalysis,
}

/// Profile facts included in the prompt
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PromptContext {
    pub skin: Option<SkinType>,
    pub mood: Mood,
}

/// Build the user message sent to the model
pub fn build_prompt(kind: PromptKind, text: &str, context: &PromptContext) -> String {
    let mut prompt = String::new();

    if let Some(skin) = context.skin {
        let skin = match skin {
            SkinType::Dry => "сухая",
            SkinType::Oily => "жирная",
            SkinType::Combination => "комбинированная",
        };
        prompt.push_str(&format!("Тип кожи собеседника: {}.\n", skin));
    }
    match context.mood {
        Mood::Good => prompt.push_str("Настроение собеседника: хорошее.\n"),
        Mood::Bad => prompt.push_str("Настроение собеседника: плохое, будь особенно бережной.\n"),
        Mood::Normal => {}
    }

    match kind {
        PromptKind::IngredientAnalysis => {
            prompt.push_str(
                "Проанализируй состав или продукт: назови ключевые активные компоненты, \
                 для какого типа кожи он подходит и что в нём может вызвать раздражение.\n\n",
            );
            prompt.push_str(text);
        }
        PromptKind::Consultation => prompt.push_str(text),
    }

    prompt
}

/// HTTP client for the completion endpoint
#[derive(Debug, Clone)]
pub struct CompletionClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl CompletionClient {
    /// Create a client with the configured request timeout
    pub fn new(config: &CompletionConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                AppError::Config(format!("Failed to build completion HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    /// Issue one request and return the first choice's text
    pub async fn try_complete(&self, prompt: &str) -> AppResult<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("X-Title", "Cosmo Assistant")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Completion(format!(
                "endpoint returned {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::Completion(format!("malformed response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| AppError::Completion("response has no content".to_string()))
    }

    /// Like [`try_complete`](Self::try_complete), but every failure becomes
    /// the fixed apologetic reply
    pub async fn complete(&self, user_id: i64, prompt: &str) -> String {
        let span = observability::completion_span("complete", Some(user_id));

        async {
            let started = Instant::now();
            let result = self.try_complete(prompt).await;
            let elapsed = started.elapsed();
            observability::record_completion_metrics(result.is_ok(), elapsed);

            match result {
                Ok(reply) => {
                    debug!(
                        user_id = %user_id,
                        duration_ms = elapsed.as_millis() as u64,
                        reply_chars = reply.chars().count(),
                        "Completion succeeded"
                    );
                    reply
                }
                Err(e) => {
                    error_logging::log_network_error(
                        &e,
                        "completion",
                        Some(&self.endpoint),
                        Some(user_id),
                    );
                    COMPLETION_ERROR_REPLY.to_string()
                }
            }
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_reply_carries_marker() {
        assert!(COMPLETION_ERROR_REPLY.starts_with(COMPLETION_ERROR_MARKER));
    }

    #[test]
    fn test_prompt_includes_profile_context() {
        let context = PromptContext {
            skin: Some(SkinType::Dry),
            mood: Mood::Bad,
        };
        let prompt = build_prompt(PromptKind::Consultation, "Чем увлажнять?", &context);
        assert!(prompt.contains("сухая"));
        assert!(prompt.contains("плохое"));
        assert!(prompt.ends_with("Чем увлажнять?"));
    }

    #[test]
    fn test_analysis_prompt_wraps_ingredients() {
        let prompt = build_prompt(
            PromptKind::IngredientAnalysis,
            "Aqua, Glycerin, Alcohol Denat.",
            &PromptContext::default(),
        );
        assert!(prompt.starts_with("Проанализируй"));
        assert!(prompt.contains("Alcohol Denat."));
    }

    #[test]
    fn test_request_body_shape() {
        let request = ChatRequest {
            model: "m",
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "s",
                },
                ChatMessage {
                    role: "user",
                    content: "u",
                },
            ],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "m");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "u");
    }
}
