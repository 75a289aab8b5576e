use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{id_result, integer_arg, object_schema, optional_string_arg, string_arg, string_properties};
use crate::ads::{AdAccount, AdParams};
use crate::config::AdSetDefaults;
use crate::errors::AgentError;
use crate::llm::ToolMetadata;
use crate::tools::Tool;

const TOOL_NAME: &str = "make_ad_set";

/// Creates a paused ad set under a campaign.
///
/// Country targeting and the bid amount come from configuration. When a page
/// id is supplied the ad set optimizes for page likes and promotes that page,
/// otherwise it optimizes for link clicks.
pub struct AdSetTool {
    account: Arc<dyn AdAccount>,
    defaults: AdSetDefaults,
}

struct AdSetRequest {
    name: String,
    campaign_id: String,
    daily_budget: String,
    start_time: String,
    end_time: String,
    age_min: i64,
    age_max: i64,
    page_id: Option<String>,
}

impl AdSetTool {
    pub fn new(account: Arc<dyn AdAccount>, defaults: AdSetDefaults) -> Self {
        Self { account, defaults }
    }

    fn parse(arguments: &Value) -> Result<AdSetRequest, AgentError> {
        Ok(AdSetRequest {
            name: string_arg(TOOL_NAME, arguments, "ad_set_name")?,
            campaign_id: string_arg(TOOL_NAME, arguments, "campaign_id")?,
            daily_budget: string_arg(TOOL_NAME, arguments, "daily_budget")?,
            start_time: string_arg(TOOL_NAME, arguments, "start_date")?,
            end_time: string_arg(TOOL_NAME, arguments, "end_date")?,
            age_min: integer_arg(TOOL_NAME, arguments, "age_min")?,
            age_max: integer_arg(TOOL_NAME, arguments, "age_max")?,
            page_id: optional_string_arg(arguments, "page_id"),
        })
    }

    fn build_params(&self, request: AdSetRequest) -> AdParams {
        let mut params = AdParams::new();
        params.insert("name".to_string(), json!(request.name));
        params.insert("campaign_id".to_string(), json!(request.campaign_id));
        params.insert("status".to_string(), json!("PAUSED"));
        params.insert("daily_budget".to_string(), json!(request.daily_budget));
        params.insert("start_time".to_string(), json!(request.start_time));
        params.insert("end_time".to_string(), json!(request.end_time));
        params.insert("billing_event".to_string(), json!("IMPRESSIONS"));
        params.insert("bid_amount".to_string(), json!(self.defaults.bid_amount));
        params.insert(
            "targeting".to_string(),
            json!({
                "geo_locations": {"countries": self.defaults.countries},
                "age_min": request.age_min,
                "age_max": request.age_max,
            }),
        );

        match request.page_id {
            Some(page_id) => {
                params.insert("optimization_goal".to_string(), json!("PAGE_LIKES"));
                params.insert("promoted_object".to_string(), json!({"page_id": page_id}));
            }
            None => {
                params.insert("optimization_goal".to_string(), json!("LINK_CLICKS"));
            }
        }
        params
    }
}

#[async_trait]
impl Tool for AdSetTool {
    fn metadata(&self) -> ToolMetadata {
        let mut properties = string_properties(&[
            ("ad_set_name", "Name of the Ad set under the campaign"),
            (
                "campaign_id",
                "A campaign id used to generate an ad set under the campaign",
            ),
            ("daily_budget", "Daily budget for the ad set"),
            ("start_date", "Start time, formatted YYYY-MM-DDTHH:MM:SS"),
            ("end_date", "End time, formatted YYYY-MM-DDTHH:MM:SS"),
            ("page_id", "The id of the page for which the campaign runs the ad"),
        ]);
        properties.insert(
            "age_min".to_string(),
            json!({"type": "integer", "description": "Minimum age of the audience"}),
        );
        properties.insert(
            "age_max".to_string(),
            json!({"type": "integer", "description": "Maximum age of the audience"}),
        );

        ToolMetadata {
            name: TOOL_NAME.to_string(),
            description: "Generates a Meta Ad Set under an Ad Campaign. Returns the ad_set_id."
                .to_string(),
            input_schema: object_schema(
                properties,
                &[
                    "ad_set_name",
                    "campaign_id",
                    "daily_budget",
                    "start_date",
                    "end_date",
                    "age_min",
                    "age_max",
                ],
            ),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<String, AgentError> {
        let request = Self::parse(&arguments)?;
        let ad_set = self.account.create_ad_set(self.build_params(request)).await?;
        log::info!("Created ad set {}", ad_set.id);
        Ok(id_result("ad_set_id", &ad_set.id))
    }
}
