//! Summaries and discriminative keywords for a batch of same-label articles.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::classification::Classification;
use crate::llm::generate_llm_response;
use crate::prompts::{keyword_prompt, summary_prompt, KEYWORD_SYSTEM_PROMPT, SUMMARY_SYSTEM_PROMPT};
use crate::{LLMClient, LLMParams, TARGET_LLM_REQUEST};

pub const SUMMARY_TEMPERATURE: f32 = 0.7;
pub const SUMMARY_MAX_TOKENS: u32 = 2000;
pub const SUMMARY_TIMEOUT_SECS: u64 = 120;
pub const KEYWORD_TEMPERATURE: f32 = 0.3;
pub const KEYWORD_MAX_TOKENS: u32 = 500;
pub const KEYWORD_TIMEOUT_SECS: u64 = 60;

/// The parts of an article the summarizer sees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleText {
    pub title: String,
    pub content: String,
}

/// Failures are reported as `None` / an empty list; callers carry on without.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn generate_summary(
        &self,
        articles: &[ArticleText],
        classification: Classification,
    ) -> Option<String>;

    async fn extract_keywords(
        &self,
        articles: &[ArticleText],
        classification: Classification,
    ) -> Vec<String>;
}

pub struct LlmSummarizer {
    llm_client: LLMClient,
    model: String,
}

impl LlmSummarizer {
    pub fn new(llm_client: LLMClient, model: impl Into<String>) -> Self {
        Self {
            llm_client,
            model: model.into(),
        }
    }

    fn params(&self, temperature: f32, max_tokens: u32, timeout_secs: u64) -> LLMParams {
        LLMParams {
            llm_client: self.llm_client.clone(),
            model: self.model.clone(),
            temperature,
            max_tokens,
            timeout_secs,
        }
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn generate_summary(
        &self,
        articles: &[ArticleText],
        classification: Classification,
    ) -> Option<String> {
        if articles.is_empty() {
            return None;
        }

        let params = self.params(SUMMARY_TEMPERATURE, SUMMARY_MAX_TOKENS, SUMMARY_TIMEOUT_SECS);
        let prompt = summary_prompt(articles, classification);
        let summary = generate_llm_response(SUMMARY_SYSTEM_PROMPT, &prompt, &params).await;
        if summary.is_none() {
            warn!(target: TARGET_LLM_REQUEST, "No summary generated for {}", classification);
        }
        summary
    }

    async fn extract_keywords(
        &self,
        articles: &[ArticleText],
        classification: Classification,
    ) -> Vec<String> {
        if articles.is_empty() {
            return Vec::new();
        }

        let params = self.params(KEYWORD_TEMPERATURE, KEYWORD_MAX_TOKENS, KEYWORD_TIMEOUT_SECS);
        let prompt = keyword_prompt(articles, classification);
        match generate_llm_response(KEYWORD_SYSTEM_PROMPT, &prompt, &params).await {
            Some(response) => {
                let keywords = parse_keywords(&response);
                info!(target: TARGET_LLM_REQUEST, "Extracted {} keywords for {}", keywords.len(), classification);
                keywords
            }
            None => Vec::new(),
        }
    }
}

/// Reads a keyword list from a model response: a JSON array when the response
/// is one, otherwise one keyword per line with list punctuation trimmed and
/// entries of two characters or fewer dropped. Lowercased, first occurrence
/// wins.
pub fn parse_keywords(response: &str) -> Vec<String> {
    let body = strip_code_fence(response.trim());

    let candidates: Vec<String> = match serde_json::from_str::<Vec<serde_json::Value>>(body) {
        Ok(values) => values
            .iter()
            .filter_map(|value| value.as_str())
            .map(|word| word.trim().to_lowercase())
            .filter(|word| !word.is_empty())
            .collect(),
        Err(_) => body
            .lines()
            .map(|line| line.trim().trim_matches(|c| matches!(c, '[' | ']' | ',' | '"' | '\'')))
            .map(|line| line.trim().to_lowercase())
            .filter(|line| line.len() > 2)
            .collect(),
    };

    let mut keywords: Vec<String> = Vec::with_capacity(candidates.len());
    for word in candidates {
        if !keywords.contains(&word) {
            keywords.push(word);
        }
    }
    keywords
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_array() {
        assert_eq!(
            parse_keywords(r#"["Carbon Tax", "glacier", "carbon tax", 7, ""]"#),
            vec!["carbon tax", "glacier"]
        );
    }

    #[test]
    fn test_parse_fenced_json() {
        assert_eq!(
            parse_keywords("```json\n[\"Asylum\", \"TPS\"]\n```"),
            vec!["asylum", "tps"]
        );
    }

    #[test]
    fn test_parse_line_fallback() {
        let response = "Here you go:\n[\n\"Minimum Wage\",\n'union',\nab,\n\"minimum wage\"\n]";
        assert_eq!(
            parse_keywords(response),
            vec!["here you go:", "minimum wage", "union"]
        );
    }

    #[test]
    fn test_parse_empty_response() {
        assert!(parse_keywords("").is_empty());
    }
}
