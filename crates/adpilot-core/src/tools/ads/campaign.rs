use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{id_result, object_schema, string_arg, string_properties};
use crate::ads::mapping::objective_code;
use crate::ads::{AdAccount, AdParams};
use crate::errors::AgentError;
use crate::llm::ToolMetadata;
use crate::tools::Tool;

const TOOL_NAME: &str = "make_campaign";

/// Creates a paused auction campaign.
pub struct CampaignTool {
    account: Arc<dyn AdAccount>,
}

impl CampaignTool {
    pub fn new(account: Arc<dyn AdAccount>) -> Self {
        Self { account }
    }

    fn build_params(name: String, goal: &str) -> AdParams {
        let mut params = AdParams::new();
        params.insert("name".to_string(), Value::String(name));
        match objective_code(goal) {
            Some(objective) => {
                params.insert("objective".to_string(), json!(objective));
            }
            None => log::warn!("No objective for campaign goal '{}', sending none", goal),
        }
        params.insert("status".to_string(), json!("PAUSED"));
        params.insert("buying_type".to_string(), json!("AUCTION"));
        params.insert("special_ad_categories".to_string(), json!([]));
        params
    }
}

#[async_trait]
impl Tool for CampaignTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: TOOL_NAME.to_string(),
            description: "Generates a Meta Ad Campaign. Returns the campaign_id.".to_string(),
            input_schema: object_schema(
                string_properties(&[
                    ("campaign_name", "Name of the Campaign"),
                    (
                        "campaign_goal",
                        "Objective of the Campaign: Awareness, Conversions, Traffic, App Installs or Lead Generation",
                    ),
                ]),
                &["campaign_name", "campaign_goal"],
            ),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<String, AgentError> {
        let name = string_arg(TOOL_NAME, &arguments, "campaign_name")?;
        let goal = string_arg(TOOL_NAME, &arguments, "campaign_goal")?;

        let campaign = self
            .account
            .create_campaign(Self::build_params(name, &goal))
            .await?;
        log::info!("Created campaign {}", campaign.id);
        Ok(id_result("campaign_id", &campaign.id))
    }
}
