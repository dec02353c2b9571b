// LLM client abstraction
// the classification oracle is anything that turns a prompt into free-form text

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::ollama_client::OllamaClient;
use crate::openai_client::OpenAiClient;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("API returned {status}: {body}")]
    ApiError { status: u16, body: String },

    #[error("response contained no completion")]
    EmptyResponse,

    #[error("missing API key for provider {0}")]
    MissingApiKey(&'static str),
}

/// One completion call: instructions + rendered log batch
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub instructions: String,
    pub user_content: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(&self, request: &CompletionRequest) -> Result<String, LlmError>;

    fn model(&self) -> &str;

    fn provider(&self) -> &str;
}

/// LLM provider selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    OpenAi,
    Ollama,
}

// [llm] section of the config file
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSettings {
    #[serde(default)]
    pub provider: LlmProvider,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default)]
    pub api_key: String,

    // overrides the provider's default endpoint
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    #[serde(default)]
    pub system_prompt: Option<String>,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    500
}

fn default_timeout_seconds() -> u64 {
    60
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: LlmProvider::OpenAi,
            model: default_model(),
            api_key: String::new(),
            base_url: None,
            max_tokens: default_max_tokens(),
            timeout_seconds: default_timeout_seconds(),
            system_prompt: None,
        }
    }
}

impl LlmSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Build the configured backend
    pub fn build_client(&self) -> Result<Arc<dyn LlmClient>, LlmError> {
        match self.provider {
            LlmProvider::OpenAi => {
                if self.api_key.trim().is_empty() {
                    return Err(LlmError::MissingApiKey("openai"));
                }
                let mut client = OpenAiClient::new(&self.api_key, &self.model, self.timeout())?;
                if let Some(url) = &self.base_url {
                    client = client.with_base_url(url);
                }
                Ok(Arc::new(client))
            }
            LlmProvider::Ollama => {
                let base_url = self
                    .base_url
                    .clone()
                    .unwrap_or_else(|| OllamaClient::DEFAULT_URL.to_string());
                Ok(Arc::new(OllamaClient::new(base_url, &self.model, self.timeout())?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_requires_key() {
        let settings = LlmSettings::default();
        assert!(matches!(settings.build_client(), Err(LlmError::MissingApiKey("openai"))));
    }

    #[test]
    fn test_ollama_builds_without_key() {
        let settings = LlmSettings {
            provider: LlmProvider::Ollama,
            model: "llama3.2:3b".to_string(),
            ..Default::default()
        };
        let client = settings.build_client().unwrap();
        assert_eq!(client.provider(), "ollama");
        assert_eq!(client.model(), "llama3.2:3b");
    }
}
