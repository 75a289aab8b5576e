use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

use super::{id_result, object_schema, string_arg, string_properties};
use crate::ads::AdAccount;
use crate::errors::AgentError;
use crate::llm::ToolMetadata;
use crate::tools::Tool;

const TOOL_NAME: &str = "make_ad_image";

/// Uploads a local image and returns its hash for use in a creative.
pub struct AdImageTool {
    account: Arc<dyn AdAccount>,
}

impl AdImageTool {
    pub fn new(account: Arc<dyn AdAccount>) -> Self {
        Self { account }
    }
}

#[async_trait]
impl Tool for AdImageTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: TOOL_NAME.to_string(),
            description: "Uploads an image from given file path and creates an image hash. Returns the image_hash."
                .to_string(),
            input_schema: object_schema(
                string_properties(&[("image_path", "A path to the image used in ad creative")]),
                &["image_path"],
            ),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<String, AgentError> {
        let image_path = PathBuf::from(string_arg(TOOL_NAME, &arguments, "image_path")?);
        let image = self.account.create_ad_image(&image_path).await?;
        log::info!("Uploaded {} as image {}", image_path.display(), image.hash);
        Ok(id_result("image_hash", &image.hash))
    }
}
