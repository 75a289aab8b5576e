//! Application shell around the control loop.
//!
//! `CampaignRunner` takes a brief and an image source, makes sure an ad image
//! exists on disk (copying an upload or generating one), renders the
//! instruction, runs the agent and turns the outcome into Markdown. Failures
//! reported by the ad platform are rendered as a request for valid
//! credentials instead of being returned as errors.

use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::agent::{Agent, AgentConfig, RunOutcome, TurnCounts};
use crate::ads::AdAccount;
use crate::config::AdpilotConfig;
use crate::core_types::ToolResult;
use crate::errors::AgentError;
use crate::llm::providers::{create_image_generator, create_llm_client};
use crate::llm::{ImageGenerator, LLM};
use crate::prompt::{build_instruction, image_prompt, CampaignBrief};
use crate::tools::{ToolFactory, ToolRegistry};
use crate::trace::LogTraceHandler;

/// File stem used for generated ad images.
pub const GENERATED_IMAGE_STEM: &str = "ad_image";

#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    /// A user-supplied image, copied into the image directory.
    Uploaded(PathBuf),
    /// Generate one from the brief's image style.
    Generate,
}

/// Ids collected from tool results, in creation order. Reporting only:
/// nothing checks that each id was fed into the following step.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArtifactChain {
    pub campaign_id: Option<String>,
    pub ad_set_id: Option<String>,
    pub image_hash: Option<String>,
    pub creative_id: Option<String>,
    pub ad_id: Option<String>,
}

impl ArtifactChain {
    /// Later results overwrite earlier ones for the same key.
    pub fn from_tool_results(results: &[ToolResult]) -> Self {
        let mut chain = Self::default();
        for result in results {
            let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(&result.content) else {
                continue;
            };
            for (key, value) in fields {
                let Some(id) = value.as_str().map(str::to_string) else {
                    continue;
                };
                match key.as_str() {
                    "campaign_id" => chain.campaign_id = Some(id),
                    "ad_set_id" => chain.ad_set_id = Some(id),
                    "image_hash" => chain.image_hash = Some(id),
                    "creative_id" => chain.creative_id = Some(id),
                    "ad_id" => chain.ad_id = Some(id),
                    _ => {}
                }
            }
        }
        chain
    }

    pub fn is_complete(&self) -> bool {
        self.campaign_id.is_some()
            && self.ad_set_id.is_some()
            && self.creative_id.is_some()
            && self.ad_id.is_some()
    }

    fn entries(&self) -> [(&'static str, &Option<String>); 5] {
        [
            ("Campaign", &self.campaign_id),
            ("Ad set", &self.ad_set_id),
            ("Image hash", &self.image_hash),
            ("Creative", &self.creative_id),
            ("Ad", &self.ad_id),
        ]
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::from("| Object | Id |\n|---|---|\n");
        for (label, id) in self.entries() {
            out.push_str(&format!(
                "| {} | {} |\n",
                label,
                id.as_deref().unwrap_or("not created")
            ));
        }
        out
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CampaignReport {
    pub final_text: String,
    pub image_path: PathBuf,
    pub artifacts: ArtifactChain,
    pub counts: TurnCounts,
}

impl CampaignReport {
    fn from_outcome(outcome: &RunOutcome, image_path: PathBuf) -> Self {
        Self {
            final_text: outcome.final_text().to_string(),
            image_path,
            artifacts: ArtifactChain::from_tool_results(&outcome.tool_results()),
            counts: outcome.counts,
        }
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(self.final_text.trim());
        out.push_str("\n\n### Created objects\n\n");
        out.push_str(&self.artifacts.to_markdown());
        out.push_str(&format!("\nImage: `{}`\n", self.image_path.display()));
        if !self.artifacts.is_complete() {
            out.push_str("\n> The campaign chain is incomplete; objects created so far stay paused.\n");
        }
        out
    }
}

/// Markdown shown in place of a report when the ad platform rejects a call.
pub fn credentials_message(error: &AgentError) -> String {
    format!("### Provide valid access credentials! \nDetails: {}", error)
}

pub struct CampaignRunner {
    llm: Arc<dyn LLM>,
    image_generator: Option<Arc<dyn ImageGenerator>>,
    tools: Arc<ToolRegistry>,
    agent_config: AgentConfig,
    image_dir: PathBuf,
    cancellation: CancellationToken,
    log_progress: bool,
}

impl CampaignRunner {
    pub fn new(
        llm: Arc<dyn LLM>,
        image_generator: Option<Arc<dyn ImageGenerator>>,
        tools: Arc<ToolRegistry>,
        agent_config: AgentConfig,
        image_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            llm,
            image_generator,
            tools,
            agent_config,
            image_dir: image_dir.into(),
            cancellation: CancellationToken::new(),
            log_progress: false,
        }
    }

    /// Builds the Gemini clients and the campaign tool set from configuration.
    pub fn from_config(
        config: &AdpilotConfig,
        account: Arc<dyn AdAccount>,
    ) -> Result<Self, AgentError> {
        let llm = create_llm_client(&config.llm)?;
        let image_generator = create_image_generator(&config.llm, &config.image)?;
        let web_search = ToolFactory::create_web_search(&config.tools.web_search);
        let tools =
            ToolFactory::create_campaign_registry(account, &config.meta.defaults, web_search)?;

        Ok(Self::new(
            llm,
            image_generator,
            Arc::new(tools),
            AgentConfig::from(&config.agent),
            config.image.output_dir.clone(),
        ))
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Logs every agent step through `LogTraceHandler`.
    pub fn with_progress_logging(mut self, enabled: bool) -> Self {
        self.log_progress = enabled;
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Puts the ad image in the image directory and returns its path.
    pub async fn prepare_image(
        &self,
        brief: &CampaignBrief,
        source: &ImageSource,
    ) -> Result<PathBuf, AgentError> {
        tokio::fs::create_dir_all(&self.image_dir).await?;
        match source {
            ImageSource::Uploaded(path) => copy_upload(path, &self.image_dir).await,
            ImageSource::Generate => {
                let generator = self.image_generator.as_ref().ok_or_else(|| {
                    AgentError::ConfigError(
                        "No image supplied and image generation is disabled".to_string(),
                    )
                })?;
                let prompt = image_prompt(brief);
                log::info!("Generating ad image");
                log::debug!("Image prompt: {}", prompt);
                let image = generator.generate_image(&prompt).await?;
                image.save(&self.image_dir, GENERATED_IMAGE_STEM).await
            }
        }
    }

    /// Runs the agent for a brief. Errors are returned as they are.
    pub async fn execute(
        &self,
        brief: &CampaignBrief,
        source: &ImageSource,
    ) -> Result<CampaignReport, AgentError> {
        let image_path = self.prepare_image(brief, source).await?;
        let instruction = build_instruction(brief, &image_path);

        let mut agent = Agent::new(
            self.llm.clone(),
            self.tools.clone(),
            self.agent_config.clone(),
        )
        .with_cancellation(self.cancellation.clone());
        if self.log_progress {
            agent.set_trace_handler(Box::new(LogTraceHandler));
        }

        let outcome = agent.run(instruction).await?;
        Ok(CampaignReport::from_outcome(&outcome, image_path))
    }

    /// Runs the agent and renders Markdown. Ad platform failures become the
    /// credentials message; anything else is returned as an error.
    pub async fn run(
        &self,
        brief: &CampaignBrief,
        source: &ImageSource,
    ) -> Result<String, AgentError> {
        match self.execute(brief, source).await {
            Ok(report) => Ok(report.to_markdown()),
            Err(e) if e.is_ads_error() => {
                log::error!("Ad platform rejected the run: {}", e);
                Ok(credentials_message(&e))
            }
            Err(e) => Err(e),
        }
    }
}

async fn copy_upload(path: &Path, image_dir: &Path) -> Result<PathBuf, AgentError> {
    let file_name = path.file_name().ok_or_else(|| {
        AgentError::IoError(format!("'{}' is not a file path", path.display()))
    })?;
    let target = image_dir.join(file_name);
    if target != path {
        tokio::fs::copy(path, &target).await.map_err(|e| {
            AgentError::IoError(format!("cannot copy image {}: {}", path.display(), e))
        })?;
    }
    log::info!("Using uploaded image {}", target.display());
    Ok(target)
}
