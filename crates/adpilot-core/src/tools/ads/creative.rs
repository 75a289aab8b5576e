use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{id_result, object_schema, string_arg, string_properties};
use crate::ads::mapping::call_to_action_code;
use crate::ads::{AdAccount, AdParams};
use crate::errors::AgentError;
use crate::llm::ToolMetadata;
use crate::tools::Tool;

const TOOL_NAME: &str = "make_ad_creative";

/// Creates a link ad creative for a page, using an uploaded image hash.
pub struct AdCreativeTool {
    account: Arc<dyn AdAccount>,
}

impl AdCreativeTool {
    pub fn new(account: Arc<dyn AdAccount>) -> Self {
        Self { account }
    }

    fn build_params(arguments: &Value) -> Result<AdParams, AgentError> {
        let name = string_arg(TOOL_NAME, arguments, "ad_creative_name")?;
        let page_id = string_arg(TOOL_NAME, arguments, "page_id")?;
        let message = string_arg(TOOL_NAME, arguments, "ad_description")?;
        let link = string_arg(TOOL_NAME, arguments, "landing_page_url")?;
        let headline = string_arg(TOOL_NAME, arguments, "ad_headline")?;
        let cta = string_arg(TOOL_NAME, arguments, "call_to_action")?;
        let image_hash = string_arg(TOOL_NAME, arguments, "image_hash")?;

        let mut params = AdParams::new();
        params.insert("name".to_string(), json!(name));
        params.insert(
            "object_story_spec".to_string(),
            json!({
                "page_id": page_id,
                "link_data": {
                    "message": message,
                    "link": link,
                    "name": headline,
                    "image_hash": image_hash,
                    "call_to_action": {
                        "type": call_to_action_code(&cta),
                        "value": {"link": link},
                    },
                },
            }),
        );
        Ok(params)
    }
}

#[async_trait]
impl Tool for AdCreativeTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: TOOL_NAME.to_string(),
            description: "Generates a Meta Ad Creative for a page. Requires the image_hash of an uploaded image. Returns the creative_id."
                .to_string(),
            input_schema: object_schema(
                string_properties(&[
                    ("ad_creative_name", "A name for the ad creative"),
                    ("page_id", "The id of the page for which the campaign runs the ad"),
                    ("ad_description", "A catchy one liner description for the ad"),
                    ("landing_page_url", "URL the ad links to"),
                    ("ad_headline", "A catchy headline for the ad"),
                    (
                        "call_to_action",
                        "Call to action: Learn More, Shop Now, Sign Up, Book Now or Download",
                    ),
                    ("image_hash", "A hexadecimal string representing an uploaded image"),
                ]),
                &[
                    "ad_creative_name",
                    "page_id",
                    "ad_description",
                    "landing_page_url",
                    "ad_headline",
                    "call_to_action",
                    "image_hash",
                ],
            ),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<String, AgentError> {
        let params = Self::build_params(&arguments)?;
        let creative = self.account.create_ad_creative(params).await?;
        log::info!("Created ad creative {}", creative.id);
        Ok(id_result("creative_id", &creative.id))
    }
}
