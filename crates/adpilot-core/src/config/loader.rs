//! Configuration loader for YAML files and environment resolution
//!
//! Loading happens in three passes: parse the YAML, pull in `.env` files and
//! configured variables, then resolve every `*_env` indirection into its
//! value. Secrets that are still missing afterwards are not an error here;
//! the component that needs them reports it when it is built.

use crate::config::types::*;
use crate::errors::AgentError;
use std::env;
use std::path::Path;
use tokio::fs;

/// Configuration loader with environment resolution
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a YAML file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<AdpilotConfig, AgentError> {
        let path = path.as_ref();

        let content = fs::read_to_string(path).await.map_err(|e| {
            AgentError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_str(content: &str) -> Result<AdpilotConfig, AgentError> {
        let config: AdpilotConfig = if content.trim().is_empty() {
            AdpilotConfig::default()
        } else {
            serde_yaml::from_str(content)
                .map_err(|e| AgentError::ConfigError(format!("Failed to parse YAML config: {}", e)))?
        };

        Self::finish(config)
    }

    /// Built-in defaults plus whatever the environment provides.
    pub fn from_env_only() -> Result<AdpilotConfig, AgentError> {
        Self::finish(AdpilotConfig::default())
    }

    /// Loads `path` when it exists, otherwise falls back to [`Self::from_env_only`].
    pub async fn from_file_or_default<P: AsRef<Path>>(path: P) -> Result<AdpilotConfig, AgentError> {
        let path = path.as_ref();
        if fs::try_exists(path).await.unwrap_or(false) {
            log::info!("Loading configuration from file: {}", path.display());
            Self::from_file(path).await
        } else {
            log::info!(
                "No configuration file at {}, using defaults and environment",
                path.display()
            );
            Self::from_env_only()
        }
    }

    fn finish(mut config: AdpilotConfig) -> Result<AdpilotConfig, AgentError> {
        Self::resolve_environment(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve environment variables in the configuration
    fn resolve_environment(config: &mut AdpilotConfig) -> Result<(), AgentError> {
        for env_file in &config.environment.env_files {
            if env_file.exists() {
                log::debug!("Loading environment file {}", env_file.display());
                Self::load_env_file(env_file)?;
            }
        }

        for (key, value) in &config.environment.variables {
            env::set_var(key, value);
        }

        Self::resolve_secret(&mut config.llm.auth.api_key, &config.llm.auth.api_key_env);

        let search = &mut config.tools.web_search;
        Self::resolve_secret(&mut search.api_key, &search.api_key_env);

        let meta = &mut config.meta;
        Self::resolve_secret(&mut meta.access_token, &meta.access_token_env);
        Self::resolve_secret(&mut meta.app_id, &meta.app_id_env);
        Self::resolve_secret(&mut meta.app_secret, &meta.app_secret_env);
        Self::resolve_secret(&mut meta.ad_account_id, &meta.ad_account_id_env);

        Ok(())
    }

    /// Explicit values win over their environment variable.
    fn resolve_secret(value: &mut Option<String>, env_var: &Option<String>) {
        if value.as_deref().is_some_and(|v| !v.is_empty()) {
            return;
        }
        if let Some(var) = env_var {
            match env::var(var) {
                Ok(found) if !found.is_empty() => *value = Some(found),
                _ => log::debug!("Environment variable {} is not set", var),
            }
        }
    }

    fn load_env_file<P: AsRef<Path>>(path: P) -> Result<(), AgentError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            AgentError::ConfigError(format!(
                "Failed to read env file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim().trim_start_matches("export ").trim();
                let value = value.trim().trim_matches('"').trim_matches('\'');
                // Variables already present in the process take precedence.
                if env::var_os(key).is_none() {
                    env::set_var(key, value);
                }
            }
        }

        Ok(())
    }
}
