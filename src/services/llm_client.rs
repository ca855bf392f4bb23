use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::config::LlmConfig;
use crate::error::{AppError, AppResult};
use crate::services::normalizer::RawReply;

const PROMPT_LOG_CHARS: usize = 100;
const ERROR_BODY_CHARS: usize = 500;

/// Client for an OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone)]
pub struct LlmClient {
    config: LlmConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    context_length: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    pub fn has_api_key(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// Answers a document prompt with the chat model.
    pub async fn complete(&self, prompt: &str) -> AppResult<RawReply> {
        let messages = vec![
            ChatMessage { role: "system", content: &self.config.system_prompt },
            ChatMessage { role: "user", content: prompt },
        ];
        let request = CompletionRequest {
            model: &self.config.model,
            messages,
            max_tokens: self.config.max_output_tokens,
            temperature: self.config.temperature,
            top_p: self.config.top_p,
            context_length: Some(self.config.max_context_tokens),
        };
        self.send(&request, prompt).await
    }

    /// Summarizes one chunk of document text with the summary model.
    pub async fn summarize_chunk(&self, prompt: &str) -> AppResult<RawReply> {
        let request = CompletionRequest {
            model: &self.config.summary_model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            max_tokens: self.config.max_output_tokens,
            temperature: self.config.temperature,
            top_p: self.config.top_p,
            context_length: None,
        };
        self.send(&request, prompt).await
    }

    async fn send(&self, request: &CompletionRequest<'_>, prompt: &str) -> AppResult<RawReply> {
        info!(
            model = request.model,
            prompt_preview = %preview(prompt, PROMPT_LOG_CHARS),
            "Sending prompt to completion API"
        );

        let mut builder = self.client.post(&self.config.api_url).json(request);
        if let Some(api_key) = &self.config.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let call = async {
            let response = builder.send().await?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                error!(status = %status, "Completion API returned an error status");
                return Err(AppError::upstream(format!(
                    "HTTP {}: {}",
                    status,
                    preview(&body, ERROR_BODY_CHARS)
                )));
            }
            let parsed: CompletionResponse = response
                .json()
                .await
                .map_err(|e| AppError::upstream(format!("Invalid response body: {}", e)))?;
            Ok::<CompletionResponse, AppError>(parsed)
        };

        let parsed = tokio::time::timeout(self.config.timeout, call).await??;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .filter(|content| !content.trim().is_empty());

        match content {
            Some(content) => {
                debug!(reply_preview = %preview(&content, 200), "Completion API replied");
                Ok(RawReply::Text(content))
            }
            None => {
                error!("Completion API returned an empty or invalid response structure");
                Ok(RawReply::Absent)
            }
        }
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
