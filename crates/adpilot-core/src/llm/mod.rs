//! Language model provider abstractions and integrations.
//!
//! Defines the `LLM` trait the control loop talks to, the `ImageGenerator`
//! trait used to produce ad images, and the Gemini implementations of both.

pub use crate::core_types::{LLMResponse, Message};
use crate::errors::AgentError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod image;
pub mod providers;

pub use image::{GeneratedImage, ImageGenerator};
pub use providers::gemini::GeminiClient;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolMetadata {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

#[async_trait]
pub trait LLM: Send + Sync {
    async fn generate(
        &self,
        messages: Vec<Message>,
        tools: Option<Vec<ToolMetadata>>,
    ) -> Result<LLMResponse, AgentError>;
}
