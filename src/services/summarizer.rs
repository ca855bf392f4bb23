use tracing::{debug, warn};

use crate::config::{SummaryConfig, SummaryStrategy};
use crate::error::AppResult;
use crate::services::llm_client::LlmClient;
use crate::services::normalizer::{normalize, RawReply, FALLBACK_ANSWER};

const SUMMARY_PROMPT: &str = "Please provide a concise summary of the following text, capturing the main points and key information:";

#[derive(Debug, Clone)]
pub struct Summarizer {
    config: SummaryConfig,
    llm: LlmClient,
}

impl Summarizer {
    pub fn new(config: SummaryConfig, llm: LlmClient) -> Self {
        Self { config, llm }
    }

    pub fn strategy(&self) -> SummaryStrategy {
        self.config.strategy
    }

    /// Condenses document text for the prompt.
    ///
    /// Without `enabled` this is a fixed-length preview. Remote failures fall
    /// back to the preview too.
    pub async fn summarize(&self, text: &str, enabled: bool) -> String {
        if !enabled {
            return truncate_chars(text, self.config.char_limit).to_string();
        }
        if text.chars().count() < self.config.char_limit {
            return text.to_string();
        }

        match self.config.strategy {
            SummaryStrategy::Truncate => truncate_chars(text, self.config.char_limit).to_string(),
            SummaryStrategy::Remote => match self.summarize_remote(text).await {
                Ok(summary) if !summary.trim().is_empty() => summary,
                Ok(_) => {
                    warn!("Remote summarization produced nothing, using truncated text");
                    truncate_chars(text, self.config.char_limit).to_string()
                }
                Err(e) => {
                    warn!(error = %e, "Error summarizing text, using truncated text");
                    truncate_chars(text, self.config.char_limit).to_string()
                }
            },
        }
    }

    async fn summarize_remote(&self, text: &str) -> AppResult<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        let mut summaries = Vec::new();

        for chunk in words.chunks(self.config.chunk_words).take(self.config.max_chunks) {
            let prompt = format!("{}\n\n{}", SUMMARY_PROMPT, chunk.join(" "));
            let reply = self.llm.summarize_chunk(&prompt).await?;
            if reply == RawReply::Absent {
                debug!("Summary model returned no content for a chunk");
                continue;
            }
            let summary = normalize(&reply);
            if summary != FALLBACK_ANSWER {
                summaries.push(summary);
            }
        }

        debug!(chunks = summaries.len(), "Remote summarization finished");
        Ok(summaries.join(" "))
    }
}

/// First `max_chars` characters of `text`, never splitting a character.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
