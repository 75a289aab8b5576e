//! Campaign brief and the instruction rendered from it
//!
//! Pure functions only. The instruction spells out every literal the tool
//! adapters need (budget, dates, ages, call to action, page and landing page)
//! so the model can copy them into its tool calls. Nothing here validates the
//! brief; `age_min <= age_max`, for example, is left to the platform.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Date-time layout the Marketing API accepts for ad set start and end.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Audience {
    pub age_min: u32,
    pub age_max: u32,
    #[serde(default = "default_gender")]
    pub gender: String,
    /// Steers the creative copy only. Ad set targeting uses
    /// `meta.defaults.countries`.
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub interests: String,
}

/// Everything the user fills in to describe one campaign.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CampaignBrief {
    pub brand_name: String,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub brand_description: String,
    pub landing_page_url: String,
    pub page_id: String,
    pub campaign_goal: String,
    pub daily_budget: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub call_to_action: String,
    #[serde(default = "default_tone")]
    pub tone: String,
    #[serde(default)]
    pub image_style_prompt: String,
    pub audience: Audience,
}

fn default_gender() -> String {
    "All".to_string()
}

fn default_tone() -> String {
    "Professional".to_string()
}

/// Structured variant of the brief for models that summarize better from a
/// key/value mapping than from prose.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CampaignFactSheet {
    pub campaign_goal: String,
    pub campaign_name: String,
    pub landing_page: String,
    pub daily_budget: u32,
    pub start_date: String,
    pub end_date: String,
    pub call_to_action: String,
    pub product_name: String,
    pub brand_description: String,
    pub image_path: String,
    pub tone: String,
    pub image_style: String,
    pub audience: Audience,
}

pub fn format_timestamp(date: NaiveDate) -> String {
    date.and_time(chrono::NaiveTime::MIN)
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

/// Renders the agent instruction for a brief and the resolved image path.
pub fn build_instruction(brief: &CampaignBrief, image_path: &Path) -> String {
    let audience = &brief.audience;
    let image_path = image_path.display();
    let country = match audience.country.trim() {
        "" => String::new(),
        country => format!("\n - Country the audience lives in: {}", country),
    };

    format!(
        r#"You are a campaign automation agent for Meta Ads.

Keep these user preferences in mind when creating creative elements:
 - Tone of the content: {tone}
 - Gender for which the ad content is created: {gender}
 - Interests of the target audience: {interests}{country}

Using the provided inputs, generate a complete Facebook ad campaign by calling the tools in the following sequence:

1. Create a campaign using `make_campaign` with:
   - campaign_name = <Choose an appropriate name based on {brand} & {goal}>
   - campaign_goal = "{goal}"

2. Create an ad set using `make_ad_set` with:
   - ad_set_name = <Give an appropriate name to generate ad set>
   - campaign_id = <use campaign ID from step 1>
   - daily_budget = "{budget}"
   - start_date = "{start}"
   - end_date = "{end}"
   - age_min = {age_min}
   - age_max = {age_max}
   - page_id = "{page_id}"

3a. Upload the ad image using `make_ad_image` with:
   - image_path = "{image_path}"

3. Create a creative using `make_ad_creative` with:
   - ad_creative_name = <Give an appropriate name to generate ad creative>
   - page_id = "{page_id}"
   - ad_description = <Give a good description for ad creative based on {description}>
   - landing_page_url = "{landing}"
   - ad_headline = <Give a catchy headline based on {brand} & {description}>
   - call_to_action = "{cta}"
   - image_hash = <use image hash from step 3a>

4. Finally, create an ad using `make_ad` with:
   - ad_name = <Give an appropriate name to generate ad>
   - ad_set_id = <use ad set ID from step 2>
   - creative_id = <use creative ID from step 3>

Make sure each step passes its output (like campaign_id, ad_set_id, image_hash, creative_id) correctly to the next step.

Pause the ad after creation. Output the final ad ID at the end.
Or ask for valid credentials if not provided.
"#,
        tone = brief.tone,
        gender = audience.gender,
        interests = audience.interests,
        country = country,
        brand = brief.brand_name,
        goal = brief.campaign_goal,
        budget = brief.daily_budget,
        start = format_timestamp(brief.start_date),
        end = format_timestamp(brief.end_date),
        age_min = audience.age_min,
        age_max = audience.age_max,
        page_id = brief.page_id,
        image_path = image_path,
        description = brief.brand_description,
        landing = brief.landing_page_url,
        cta = brief.call_to_action,
    )
}

pub fn fact_sheet(brief: &CampaignBrief, image_path: &Path) -> CampaignFactSheet {
    CampaignFactSheet {
        campaign_goal: brief.campaign_goal.clone(),
        campaign_name: "suggest a campaign name".to_string(),
        landing_page: brief.landing_page_url.clone(),
        daily_budget: brief.daily_budget,
        start_date: format_timestamp(brief.start_date),
        end_date: format_timestamp(brief.end_date),
        call_to_action: brief.call_to_action.clone(),
        product_name: brief.product_name.clone(),
        brand_description: brief.brand_description.clone(),
        image_path: image_path.display().to_string(),
        tone: brief.tone.clone(),
        image_style: brief.image_style_prompt.clone(),
        audience: brief.audience.clone(),
    }
}

/// Prompt for generating the ad image when none was supplied.
pub fn image_prompt(brief: &CampaignBrief) -> String {
    let style = brief.image_style_prompt.trim();
    if !style.is_empty() {
        return style.to_string();
    }
    let subject = if brief.product_name.trim().is_empty() {
        brief.brand_name.as_str()
    } else {
        brief.product_name.as_str()
    };
    format!(
        "An advertising image for {} by {}, {} tone, no text",
        subject,
        brief.brand_name,
        brief.tone.to_lowercase()
    )
}
