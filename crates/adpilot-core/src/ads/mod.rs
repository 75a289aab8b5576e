//! Advertising-account collaborator.
//!
//! The tool adapters never talk HTTP themselves; they hold an
//! `Arc<dyn AdAccount>` handed to them at construction, so every run (and
//! every test) can work against its own account instance.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

use crate::errors::AgentError;

pub mod graph;
pub mod mapping;
pub mod sandbox;

pub use graph::{AdsSession, GraphApiAccount};
pub use mapping::{CallToAction, CampaignObjective};
pub use sandbox::SandboxAdAccount;

/// Request parameters for one create call, as the Marketing API names them.
pub type AdParams = Map<String, Value>;

/// Object returned by a create call; only the identifier is consumed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdObject {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdImage {
    pub hash: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[async_trait]
pub trait AdAccount: Send + Sync {
    /// Account id including the `act_` prefix.
    fn account_id(&self) -> &str;

    async fn create_campaign(&self, params: AdParams) -> Result<AdObject, AgentError>;

    async fn create_ad_set(&self, params: AdParams) -> Result<AdObject, AgentError>;

    async fn create_ad_image(&self, image_path: &Path) -> Result<AdImage, AgentError>;

    async fn create_ad_creative(&self, params: AdParams) -> Result<AdObject, AgentError>;

    async fn create_ad(&self, params: AdParams) -> Result<AdObject, AgentError>;
}

/// Adds the `act_` prefix the Graph API expects on ad account ids.
pub fn normalize_account_id(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with("act_") {
        trimmed.to_string()
    } else {
        format!("act_{}", trimmed)
    }
}
