//! In-process ad account for dry runs.
//!
//! Mints sequential ids instead of calling Meta, and records every call so a
//! dry run (or a test) can show exactly what would have been sent.

use async_trait::async_trait;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Mutex;

use crate::ads::{AdAccount, AdImage, AdObject, AdParams};
use crate::errors::AgentError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdOperation {
    CreateCampaign,
    CreateAdSet,
    CreateAdImage,
    CreateAdCreative,
    CreateAd,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordedCall {
    pub operation: AdOperation,
    pub params: AdParams,
    pub result_id: String,
}

pub struct SandboxAdAccount {
    account_id: String,
    calls: Mutex<Vec<RecordedCall>>,
    fail_on: Option<(AdOperation, AgentError)>,
}

impl SandboxAdAccount {
    pub fn new() -> Self {
        Self {
            account_id: "act_sandbox".to_string(),
            calls: Mutex::new(Vec::new()),
            fail_on: None,
        }
    }

    /// Makes `operation` fail with `error` instead of minting an id.
    pub fn failing_on(mut self, operation: AdOperation, error: AgentError) -> Self {
        self.fail_on = Some((operation, error));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    fn record(&self, operation: AdOperation, params: AdParams, prefix: &str) -> Result<String, AgentError> {
        if let Some((failing, error)) = &self.fail_on {
            if *failing == operation {
                return Err(error.clone());
            }
        }

        let mut calls = self
            .calls
            .lock()
            .map_err(|_| AgentError::InternalError("sandbox call log poisoned".to_string()))?;
        let result_id = format!("{}-{}", prefix, calls.len() + 1);
        log::info!("Sandbox {:?} -> {}", operation, result_id);
        calls.push(RecordedCall {
            operation,
            params,
            result_id: result_id.clone(),
        });
        Ok(result_id)
    }
}

impl Default for SandboxAdAccount {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AdAccount for SandboxAdAccount {
    fn account_id(&self) -> &str {
        &self.account_id
    }

    async fn create_campaign(&self, params: AdParams) -> Result<AdObject, AgentError> {
        let id = self.record(AdOperation::CreateCampaign, params, "sandbox-campaign")?;
        Ok(AdObject { id })
    }

    async fn create_ad_set(&self, params: AdParams) -> Result<AdObject, AgentError> {
        let id = self.record(AdOperation::CreateAdSet, params, "sandbox-adset")?;
        Ok(AdObject { id })
    }

    async fn create_ad_image(&self, image_path: &Path) -> Result<AdImage, AgentError> {
        let bytes = tokio::fs::read(image_path).await.map_err(|e| {
            AgentError::IoError(format!("cannot read image {}: {}", image_path.display(), e))
        })?;
        let digest = Sha256::digest(&bytes);
        let hash = hex::encode(&digest[..16]);

        let mut params = AdParams::new();
        params.insert(
            "filename".to_string(),
            image_path.display().to_string().into(),
        );
        self.record(AdOperation::CreateAdImage, params, "sandbox-image")?;
        Ok(AdImage { hash, url: None })
    }

    async fn create_ad_creative(&self, params: AdParams) -> Result<AdObject, AgentError> {
        let id = self.record(AdOperation::CreateAdCreative, params, "sandbox-creative")?;
        Ok(AdObject { id })
    }

    async fn create_ad(&self, params: AdParams) -> Result<AdObject, AgentError> {
        let id = self.record(AdOperation::CreateAd, params, "sandbox-ad")?;
        Ok(AdObject { id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ids_are_sequential_and_recorded() {
        let account = SandboxAdAccount::new();
        let campaign = account.create_campaign(AdParams::new()).await.unwrap();
        let ad_set = account.create_ad_set(AdParams::new()).await.unwrap();
        assert_eq!(campaign.id, "sandbox-campaign-1");
        assert_eq!(ad_set.id, "sandbox-adset-2");
        assert_eq!(account.calls().len(), 2);
        assert_eq!(account.calls()[1].operation, AdOperation::CreateAdSet);
    }

    #[tokio::test]
    async fn test_image_hash_is_content_derived() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        std::fs::write(&path, b"pixels").unwrap();

        let account = SandboxAdAccount::new();
        let first = account.create_ad_image(&path).await.unwrap();
        let second = account.create_ad_image(&path).await.unwrap();
        assert_eq!(first.hash, second.hash);
        assert_eq!(first.hash.len(), 32);

        let missing = account.create_ad_image(&dir.path().join("missing.png")).await;
        assert!(matches!(missing, Err(AgentError::IoError(_))));
    }

    #[tokio::test]
    async fn test_configured_failure() {
        let account = SandboxAdAccount::new().failing_on(
            AdOperation::CreateAd,
            AgentError::AdsAuthentication("token expired".into()),
        );
        assert!(account.create_campaign(AdParams::new()).await.is_ok());
        assert!(matches!(
            account.create_ad(AdParams::new()).await,
            Err(AgentError::AdsAuthentication(_))
        ));
    }
}
