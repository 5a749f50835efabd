pub mod classification;
pub mod classifier;
pub mod db;
pub mod environment;
pub mod error;
pub mod llm;
pub mod logging;
pub mod processor;
pub mod prompts;
pub mod rss;
pub mod summarizer;

use async_openai::{config::OpenAIConfig, Client as OpenAIClient};
use ollama_rs::Ollama;

pub const TARGET_WEB_REQUEST: &str = "web_request";
pub const TARGET_LLM_REQUEST: &str = "llm_request";
pub const TARGET_DB: &str = "db_query";
pub const TARGET_CLASSIFIER: &str = "classifier";

/// Backend used for summaries and keyword extraction.
#[derive(Clone, Debug)]
pub enum LLMClient {
    Ollama(Ollama),
    OpenAI(OpenAIClient<OpenAIConfig>),
}

/// Per-call generation settings.
#[derive(Clone)]
pub struct LLMParams {
    pub llm_client: LLMClient,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}
