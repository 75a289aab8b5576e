//! Configuration type definitions
//!
//! Every section carries defaults so that an empty YAML document is a valid
//! configuration; secrets are normally supplied through `*_env` indirections
//! that the loader resolves from the process environment (or `.env` files).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::errors::AgentError;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AdpilotConfig {
    #[serde(default)]
    pub agent: AgentSettings,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub image: ImageGenerationConfig,
    #[serde(default)]
    pub meta: MetaConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub environment: EnvironmentConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Bounds for the tool-routing loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Maximum model turns per run; `null` leaves the loop unbounded.
    #[serde(default = "default_max_steps")]
    pub max_steps: Option<usize>,
    /// Wall-clock limit per run in seconds; `null` disables it.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            timeout_secs: default_timeout_secs(),
            system_prompt: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProvider,
    #[serde(default = "default_chat_model")]
    pub model: String,
    #[serde(default)]
    pub parameters: ModelParameters,
    #[serde(default)]
    pub auth: LlmAuth,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            model: default_chat_model(),
            parameters: ModelParameters::default(),
            auth: LlmAuth::default(),
        }
    }
}

/// LLM provider types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Gemini,
    /// A Gemini-compatible `generateContent` endpoint at another base URL.
    Custom { base_url: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelParameters {
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmAuth {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_google_key_env")]
    pub api_key_env: Option<String>,
}

impl Default for LlmAuth {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: default_google_key_env(),
        }
    }
}

/// Ad image generation used when the brief carries no image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageGenerationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_image_model")]
    pub model: String,
    /// Where uploaded and generated images are written.
    #[serde(default = "default_image_dir")]
    pub output_dir: PathBuf,
}

impl Default for ImageGenerationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: default_image_model(),
            output_dir: default_image_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    #[serde(default = "default_graph_base_url")]
    pub base_url: String,
    #[serde(default = "default_graph_api_version")]
    pub api_version: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_access_token_env")]
    pub access_token_env: Option<String>,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default = "default_app_id_env")]
    pub app_id_env: Option<String>,
    #[serde(default)]
    pub app_secret: Option<String>,
    #[serde(default = "default_app_secret_env")]
    pub app_secret_env: Option<String>,
    #[serde(default)]
    pub ad_account_id: Option<String>,
    #[serde(default = "default_ad_account_env")]
    pub ad_account_id_env: Option<String>,
    #[serde(default)]
    pub defaults: AdSetDefaults,
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            base_url: default_graph_base_url(),
            api_version: default_graph_api_version(),
            access_token: None,
            access_token_env: default_access_token_env(),
            app_id: None,
            app_id_env: default_app_id_env(),
            app_secret: None,
            app_secret_env: default_app_secret_env(),
            ad_account_id: None,
            ad_account_id_env: default_ad_account_env(),
            defaults: AdSetDefaults::default(),
        }
    }
}

/// Fixed ad set parameters that the model is never asked for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdSetDefaults {
    #[serde(default = "default_countries")]
    pub countries: Vec<String>,
    #[serde(default = "default_bid_amount")]
    pub bid_amount: String,
}

impl Default for AdSetDefaults {
    fn default() -> Self {
        Self {
            countries: default_countries(),
            bid_amount: default_bid_amount(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ToolsConfig {
    #[serde(default)]
    pub web_search: WebSearchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSearchConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub provider: WebSearchProvider,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_tavily_key_env")]
    pub api_key_env: Option<String>,
    #[serde(default = "default_max_search_results")]
    pub max_results: usize,
    /// Overrides the provider's API host.
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: WebSearchProvider::default(),
            api_key: None,
            api_key_env: default_tavily_key_env(),
            max_results: default_max_search_results(),
            base_url: None,
        }
    }
}

/// Web search providers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WebSearchProvider {
    #[default]
    Tavily,
    DuckDuckGo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    #[serde(default)]
    pub variables: HashMap<String, String>,
    #[serde(default = "default_env_files")]
    pub env_files: Vec<PathBuf>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            variables: HashMap::new(),
            env_files: default_env_files(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_file")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

fn default_max_steps() -> Option<usize> { Some(25) }
fn default_timeout_secs() -> Option<u64> { Some(300) }
fn default_chat_model() -> String { "gemini-2.5-flash".to_string() }
fn default_image_model() -> String { "gemini-2.0-flash-exp-image-generation".to_string() }
fn default_image_dir() -> PathBuf { PathBuf::from("./Images") }
fn default_temperature() -> f32 { 0.7 }
fn default_max_tokens() -> u32 { 4096 }
fn default_top_p() -> f32 { 0.9 }
fn default_true() -> bool { true }
fn default_google_key_env() -> Option<String> { Some("GOOGLE_API_KEY".to_string()) }
fn default_tavily_key_env() -> Option<String> { Some("TAVILY_API_KEY".to_string()) }
fn default_access_token_env() -> Option<String> { Some("META_ACCESS_TOKEN".to_string()) }
fn default_app_id_env() -> Option<String> { Some("META_APP_ID".to_string()) }
fn default_app_secret_env() -> Option<String> { Some("META_APP_SECRET".to_string()) }
fn default_ad_account_env() -> Option<String> { Some("META_AD_ACCOUNT_ID".to_string()) }
fn default_graph_base_url() -> String { "https://graph.facebook.com".to_string() }
fn default_graph_api_version() -> String { "v21.0".to_string() }
fn default_countries() -> Vec<String> { vec!["US".to_string()] }
fn default_bid_amount() -> String { "20".to_string() }
fn default_max_search_results() -> usize { 2 }
fn default_env_files() -> Vec<PathBuf> { vec![PathBuf::from(".env")] }
fn default_log_level() -> String { "info".to_string() }
fn default_log_file() -> Option<PathBuf> { Some(PathBuf::from("adpilot.log")) }

impl AdpilotConfig {
    pub fn validate(&self) -> Result<(), AgentError> {
        if self.agent.max_steps == Some(0) {
            return Err(AgentError::ConfigError(
                "agent.max_steps must be greater than 0".to_string(),
            ));
        }

        if self.agent.timeout_secs == Some(0) {
            return Err(AgentError::ConfigError(
                "agent.timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.llm.model.is_empty() {
            return Err(AgentError::ConfigError("LLM model cannot be empty".to_string()));
        }

        if let LlmProvider::Custom { base_url } = &self.llm.provider {
            if base_url.is_empty() {
                return Err(AgentError::ConfigError(
                    "Custom provider requires a valid 'base_url'".to_string(),
                ));
            }
        }

        if self.image.enabled && self.image.model.is_empty() {
            return Err(AgentError::ConfigError(
                "image.model cannot be empty when image generation is enabled".to_string(),
            ));
        }

        if !self.meta.api_version.starts_with('v') {
            return Err(AgentError::ConfigError(format!(
                "meta.api_version must look like 'v21.0', got '{}'",
                self.meta.api_version
            )));
        }

        if self.meta.defaults.countries.is_empty() {
            return Err(AgentError::ConfigError(
                "meta.defaults.countries needs at least one country code".to_string(),
            ));
        }

        let search = &self.tools.web_search;
        if search.enabled && (search.max_results == 0 || search.max_results > 10) {
            return Err(AgentError::ConfigError(
                "tools.web_search.max_results must be between 1 and 10".to_string(),
            ));
        }

        Ok(())
    }
}
