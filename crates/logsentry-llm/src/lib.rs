// LogSentry LLM - classification of log batches through a remote model

pub mod analyzer;
pub mod extract;
pub mod llm_client;
pub mod ollama_client;
pub mod openai_client;

pub use analyzer::{AnalyzerConfig, LogAnalyzer, parse_response};
pub use extract::extract_json;
pub use llm_client::{CompletionRequest, LlmClient, LlmError, LlmProvider, LlmSettings};
pub use ollama_client::OllamaClient;
pub use openai_client::OpenAiClient;
