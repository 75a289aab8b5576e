use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{id_result, object_schema, string_arg, string_properties};
use crate::ads::{AdAccount, AdParams};
use crate::errors::AgentError;
use crate::llm::ToolMetadata;
use crate::tools::Tool;

const TOOL_NAME: &str = "make_ad";

/// Creates the paused ad that ties an ad set to a creative.
pub struct AdTool {
    account: Arc<dyn AdAccount>,
}

impl AdTool {
    pub fn new(account: Arc<dyn AdAccount>) -> Self {
        Self { account }
    }
}

#[async_trait]
impl Tool for AdTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: TOOL_NAME.to_string(),
            description: "Generates a Meta Ad under an Ad set using the Ad creative. Returns the ad_id."
                .to_string(),
            input_schema: object_schema(
                string_properties(&[
                    ("ad_name", "A name for the ad"),
                    ("ad_set_id", "Id of the Ad set under which the ad will run"),
                    (
                        "creative_id",
                        "Id of the Ad Creative that has the creative elements for the Ad",
                    ),
                ]),
                &["ad_name", "ad_set_id", "creative_id"],
            ),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<String, AgentError> {
        let mut params = AdParams::new();
        params.insert(
            "name".to_string(),
            json!(string_arg(TOOL_NAME, &arguments, "ad_name")?),
        );
        params.insert(
            "adset_id".to_string(),
            json!(string_arg(TOOL_NAME, &arguments, "ad_set_id")?),
        );
        params.insert(
            "creative".to_string(),
            json!({"creative_id": string_arg(TOOL_NAME, &arguments, "creative_id")?}),
        );
        params.insert("status".to_string(), json!("PAUSED"));

        let ad = self.account.create_ad(params).await?;
        log::info!("Created ad {}", ad.id);
        Ok(id_result("ad_id", &ad.id))
    }
}
