//! Error types for the campaign agent
//!
//! A single error hierarchy covers every failure a run can hit. Errors are
//! grouped by source (language model, tool dispatch, advertising platform,
//! configuration) so the application shell can decide which ones to render
//! for the user and which ones to surface as hard failures. Nothing in the
//! control loop retries; errors travel up unchanged.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum AgentError {
    #[error("LLM interaction failed: {0}")]
    LLMError(String),
    #[error("Image generation failed: {0}")]
    ImageGenerationError(String),
    #[error("Tool execution failed for '{tool_name}': {message}")]
    ToolError { tool_name: String, message: String },
    #[error("Unknown tool requested: '{0}'")]
    UnknownTool(String),
    #[error("Invalid arguments for '{tool_name}': {message}")]
    InvalidArguments { tool_name: String, message: String },
    #[error("Meta Ads API error (HTTP {status}, code {code:?}): {message}")]
    AdsApiError {
        status: u16,
        code: Option<i64>,
        message: String,
    },
    #[error("Meta Ads authentication failed: {0}")]
    AdsAuthentication(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Parsing error: {0}")]
    ParsingError(String),
    #[error("Conversation error: {0}")]
    ConversationError(String),
    #[error("Maximum steps reached ({0})")]
    MaxStepsReached(usize),
    #[error("Run timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("Run cancelled")]
    Cancelled,
    #[error("I/O error: {0}")]
    IoError(String),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AgentError {
    /// True for failures reported by the advertising platform.
    pub fn is_ads_error(&self) -> bool {
        matches!(
            self,
            AgentError::AdsApiError { .. } | AgentError::AdsAuthentication(_)
        )
    }
}

impl From<std::io::Error> for AgentError {
    fn from(err: std::io::Error) -> Self {
        AgentError::IoError(err.to_string())
    }
}

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        AgentError::LLMError(err.without_url().to_string())
    }
}
