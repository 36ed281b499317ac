use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client as OpenAIClient;
use async_trait::async_trait;
use ollama_rs::generation::completion::request::GenerationRequest;
use ollama_rs::generation::options::GenerationOptions;
use ollama_rs::Ollama;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::{LLMClient, LLMParams, TARGET_LLM_REQUEST};

pub const LLM_TIMEOUT: Duration = Duration::from_secs(120);

/// A text completion endpoint. The model is bound when the client is built.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

pub fn openai_client(api_key: &str, api_base: Option<&str>) -> LLMClient {
    let mut config = OpenAIConfig::new().with_api_key(api_key);
    if let Some(api_base) = api_base {
        config = config.with_api_base(api_base);
    }
    LLMClient::OpenAI(OpenAIClient::with_config(config))
}

pub fn ollama_client(host: &str, port: u16) -> LLMClient {
    LLMClient::Ollama(Ollama::new(host.to_string(), port))
}

#[async_trait]
impl CompletionClient for LLMParams {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        debug!(target: TARGET_LLM_REQUEST, "Sending completion request to {} with prompt: {}", self.model, user_prompt);

        let response = match timeout(LLM_TIMEOUT, self.request(system_prompt, user_prompt)).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                warn!(target: TARGET_LLM_REQUEST, "Error generating response: {}", err);
                return Err(err);
            }
            Err(_) => {
                warn!(target: TARGET_LLM_REQUEST, "LLM request timed out after {} seconds", LLM_TIMEOUT.as_secs());
                return Err(Error::Completion(format!(
                    "request timed out after {} seconds",
                    LLM_TIMEOUT.as_secs()
                )));
            }
        };

        if response.trim().is_empty() {
            return Err(Error::Completion("no content in response".to_string()));
        }

        debug!(target: TARGET_LLM_REQUEST, "LLM response received: {}", response);
        Ok(response)
    }
}

impl LLMParams {
    async fn request(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        match &self.llm_client {
            LLMClient::OpenAI(client) => {
                let request = CreateChatCompletionRequestArgs::default()
                    .model(&self.model)
                    .messages([
                        ChatCompletionRequestSystemMessageArgs::default()
                            .content(system_prompt)
                            .build()
                            .map_err(|e| Error::Completion(e.to_string()))?
                            .into(),
                        ChatCompletionRequestUserMessageArgs::default()
                            .content(user_prompt)
                            .build()
                            .map_err(|e| Error::Completion(e.to_string()))?
                            .into(),
                    ])
                    .temperature(self.temperature)
                    .build()
                    .map_err(|e| Error::Completion(e.to_string()))?;

                let response = client
                    .chat()
                    .create(request)
                    .await
                    .map_err(|e| Error::Completion(format!("OpenAI API error: {}", e)))?;

                Ok(response
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|choice| choice.message.content)
                    .unwrap_or_default())
            }
            LLMClient::Ollama(ollama) => {
                let mut request = GenerationRequest::new(self.model.clone(), user_prompt.to_string());
                request.system = Some(system_prompt.to_string().into());
                request.options = Some(GenerationOptions::default().temperature(self.temperature));

                let response = ollama
                    .generate(request)
                    .await
                    .map_err(|e| Error::Completion(format!("Ollama error: {}", e)))?;

                Ok(response.response)
            }
        }
    }
}
