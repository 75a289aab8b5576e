//! Configuration module
//!
//! YAML configuration with environment resolution. See [`ConfigLoader`] for
//! the resolution order.

pub mod types;
pub mod loader;

pub use types::*;
pub use loader::*;


use crate::errors::AgentError;
use std::path::Path;

/// Load a configuration from a YAML file
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<AdpilotConfig, AgentError> {
    ConfigLoader::from_file(path).await
}

/// Validate a configuration
pub fn validate_config(config: &AdpilotConfig) -> Result<(), AgentError> {
    config.validate()
}
