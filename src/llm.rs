use anyhow::{anyhow, Result};
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client as OpenAIClient;
use ollama_rs::generation::completion::request::GenerationRequest;
use ollama_rs::generation::options::GenerationOptions;
use ollama_rs::Ollama;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use crate::environment::{LlmBackend, LlmSettings};
use crate::{LLMClient, LLMParams, TARGET_LLM_REQUEST};

const MAX_RETRIES: u32 = 3;

/// Builds the client described by the environment.
pub fn build_llm_client(settings: &LlmSettings) -> LLMClient {
    match settings.backend {
        LlmBackend::Ollama => {
            info!(target: TARGET_LLM_REQUEST, "Using Ollama at {}:{}", settings.ollama_host, settings.ollama_port);
            LLMClient::Ollama(Ollama::new(settings.ollama_host.clone(), settings.ollama_port))
        }
        LlmBackend::OpenAI => {
            info!(target: TARGET_LLM_REQUEST, "Using OpenAI-compatible API at {}", settings.base_url);
            let mut config = OpenAIConfig::new().with_api_base(settings.base_url.clone());
            if let Some(api_key) = &settings.api_key {
                config = config.with_api_key(api_key.clone());
            } else {
                warn!(target: TARGET_LLM_REQUEST, "LLM_API_KEY is not set; requests will likely be rejected");
            }
            LLMClient::OpenAI(OpenAIClient::with_config(config))
        }
    }
}

async fn request_once(system: &str, prompt: &str, params: &LLMParams) -> Result<String> {
    match &params.llm_client {
        LLMClient::OpenAI(client) => {
            #[allow(deprecated)]
            let request = CreateChatCompletionRequestArgs::default()
                .model(&params.model)
                .temperature(params.temperature)
                .max_tokens(params.max_tokens)
                .messages([
                    ChatCompletionRequestSystemMessageArgs::default()
                        .content(system)
                        .build()?
                        .into(),
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(prompt)
                        .build()?
                        .into(),
                ])
                .build()?;

            let response = client.chat().create(request).await?;
            response
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .ok_or_else(|| anyhow!("Response contained no message content"))
        }
        LLMClient::Ollama(ollama) => {
            let mut request =
                GenerationRequest::new(params.model.clone(), format!("{}\n\n{}", system, prompt));
            request.options = Some(
                GenerationOptions::default()
                    .temperature(params.temperature)
                    .num_predict(params.max_tokens as i32),
            );
            let response = ollama.generate(request).await?;
            Ok(response.response)
        }
    }
}

/// Sends one system + user prompt pair, retrying with exponential backoff.
/// Returns `None` once every attempt has failed or come back empty.
pub async fn generate_llm_response(system: &str, prompt: &str, params: &LLMParams) -> Option<String> {
    let mut backoff = 2;

    debug!(target: TARGET_LLM_REQUEST, "Starting LLM response generation with model {}", params.model);

    for retry_count in 0..MAX_RETRIES {
        match timeout(
            Duration::from_secs(params.timeout_secs),
            request_once(system, prompt, params),
        )
        .await
        {
            Ok(Ok(text)) if !text.trim().is_empty() => {
                debug!(target: TARGET_LLM_REQUEST, "LLM response received: {}", text);
                return Some(text);
            }
            Ok(Ok(_)) => {
                warn!(target: TARGET_LLM_REQUEST, "LLM returned an empty response");
            }
            Ok(Err(e)) => {
                warn!(target: TARGET_LLM_REQUEST, "Error generating response: {}", e);
            }
            Err(_) => {
                warn!(target: TARGET_LLM_REQUEST, "LLM request timed out after {} seconds", params.timeout_secs);
            }
        }

        if retry_count < MAX_RETRIES - 1 {
            info!(target: TARGET_LLM_REQUEST, "Retrying LLM request in {} seconds ({}/{})", backoff, retry_count + 1, MAX_RETRIES);
            sleep(Duration::from_secs(backoff)).await;
            backoff *= 2;
        }
    }

    error!(target: TARGET_LLM_REQUEST, "No response generated after {} attempts", MAX_RETRIES);
    None
}
