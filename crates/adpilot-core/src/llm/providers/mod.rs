//! LLM provider implementations
//!
//! Each provider implements the common LLM trait while handling
//! provider-specific protocols and authentication.

use std::sync::Arc;
use crate::config::{ImageGenerationConfig, LlmConfig, LlmProvider};
use crate::llm::{ImageGenerator, LLM};
use crate::errors::AgentError;

pub mod gemini;

/// Create an LLM client based on the provider configuration
pub fn create_llm_client(config: &LlmConfig) -> Result<Arc<dyn LLM>, AgentError> {
    match &config.provider {
        LlmProvider::Gemini | LlmProvider::Custom { .. } => gemini::create_client(config),
    }
}

/// Create the image generator, or `None` when generation is disabled.
pub fn create_image_generator(
    llm: &LlmConfig,
    image: &ImageGenerationConfig,
) -> Result<Option<Arc<dyn ImageGenerator>>, AgentError> {
    if !image.enabled {
        return Ok(None);
    }
    gemini::create_image_client(llm, &image.model).map(Some)
}

