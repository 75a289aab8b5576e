use adpilot_core::ads::sandbox::AdOperation;
use adpilot_core::ads::SandboxAdAccount;
use adpilot_core::agent::AgentConfig;
use adpilot_core::campaign::{CampaignRunner, ImageSource};
use adpilot_core::config::AdSetDefaults;
use adpilot_core::core_types::{LLMResponse, Message, ToolCall};
use adpilot_core::errors::AgentError;
use adpilot_core::llm::{GeneratedImage, ImageGenerator, ToolMetadata, LLM};
use adpilot_core::prompt::{Audience, CampaignBrief};
use adpilot_core::tools::ToolFactory;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Replays a fixed list of replies and keeps every request it received.
struct ScriptedLLM {
    replies: Mutex<VecDeque<LLMResponse>>,
    requests: Mutex<Vec<(Vec<Message>, Vec<String>)>>,
}

impl ScriptedLLM {
    fn new(replies: Vec<LLMResponse>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl LLM for ScriptedLLM {
    async fn generate(
        &self,
        messages: Vec<Message>,
        tools: Option<Vec<ToolMetadata>>,
    ) -> Result<LLMResponse, AgentError> {
        let names = tools
            .unwrap_or_default()
            .into_iter()
            .map(|t| t.name)
            .collect();
        self.requests.lock().unwrap().push((messages, names));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AgentError::LLMError("script exhausted".to_string()))
    }
}

struct FixedImage;

#[async_trait]
impl ImageGenerator for FixedImage {
    async fn generate_image(&self, _prompt: &str) -> Result<GeneratedImage, AgentError> {
        Ok(GeneratedImage {
            bytes: b"generated pixels".to_vec(),
            mime_type: "image/png".to_string(),
            caption: None,
        })
    }
}

fn brief() -> CampaignBrief {
    CampaignBrief {
        brand_name: "Stride".to_string(),
        product_name: "Trail Runner".to_string(),
        brand_description: "Lightweight running shoes".to_string(),
        landing_page_url: "https://example.com/trail".to_string(),
        page_id: "12345".to_string(),
        campaign_goal: "Traffic".to_string(),
        daily_budget: 20,
        start_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
        call_to_action: "Shop Now".to_string(),
        tone: "Witty".to_string(),
        image_style_prompt: "Vibrant trail at dawn".to_string(),
        audience: Audience {
            age_min: 18,
            age_max: 35,
            gender: "All".to_string(),
            country: "US".to_string(),
            interests: "running".to_string(),
        },
    }
}

fn call(id: &str, name: &str, arguments: Value) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments,
    }
}

/// The reply sequence a well-behaved model produces for `brief()`.
fn full_script(image_path: &Path) -> Vec<LLMResponse> {
    vec![
        LLMResponse::with_tool_calls(vec![call(
            "call_1",
            "make_campaign",
            json!({"campaign_name": "Stride Traffic", "campaign_goal": "Traffic"}),
        )]),
        LLMResponse::with_tool_calls(vec![
            call(
                "call_2",
                "make_ad_set",
                json!({
                    "ad_set_name": "Stride 18-35",
                    "campaign_id": "sandbox-campaign-1",
                    "daily_budget": "20",
                    "start_date": "2025-03-01T00:00:00",
                    "end_date": "2025-03-31T00:00:00",
                    "age_min": 18,
                    "age_max": 35,
                    "page_id": "12345"
                }),
            ),
            call(
                "call_3",
                "make_ad_image",
                json!({"image_path": image_path.display().to_string()}),
            ),
        ]),
        LLMResponse::with_tool_calls(vec![call(
            "call_4",
            "make_ad_creative",
            json!({
                "ad_creative_name": "Stride Creative",
                "page_id": "12345",
                "ad_description": "Run further, feel lighter",
                "landing_page_url": "https://example.com/trail",
                "ad_headline": "Meet the Trail Runner",
                "call_to_action": "Shop Now",
                "image_hash": "from-step-3a"
            }),
        )]),
        LLMResponse::with_tool_calls(vec![call(
            "call_5",
            "make_ad",
            json!({
                "ad_name": "Stride Ad",
                "ad_set_id": "sandbox-adset-2",
                "creative_id": "sandbox-creative-4"
            }),
        )]),
        LLMResponse::text("Campaign created. Final ad id: sandbox-ad-5"),
    ]
}

fn runner(
    llm: Arc<ScriptedLLM>,
    account: Arc<SandboxAdAccount>,
    image_dir: PathBuf,
) -> CampaignRunner {
    let tools =
        ToolFactory::create_campaign_registry(account, &AdSetDefaults::default(), None).unwrap();
    CampaignRunner::new(
        llm,
        Some(Arc::new(FixedImage)),
        Arc::new(tools),
        AgentConfig::default(),
        image_dir,
    )
}

#[tokio::test]
async fn test_full_campaign_with_uploaded_image() {
    let upload_dir = tempfile::tempdir().unwrap();
    let image_dir = tempfile::tempdir().unwrap();
    let upload = upload_dir.path().join("banner.png");
    std::fs::write(&upload, b"uploaded pixels").unwrap();
    let expected_image = image_dir.path().join("banner.png");

    let llm = ScriptedLLM::new(full_script(&expected_image));
    let account = Arc::new(SandboxAdAccount::new());
    let runner = runner(llm.clone(), account.clone(), image_dir.path().to_path_buf());

    let report = runner
        .execute(&brief(), &ImageSource::Uploaded(upload))
        .await
        .unwrap();

    assert_eq!(report.image_path, expected_image);
    assert_eq!(report.counts.model_turns, 5);
    assert_eq!(report.counts.tool_turns, 4);
    assert_eq!(report.counts.tool_invocations, 5);
    assert!(report.artifacts.is_complete());
    assert_eq!(report.artifacts.ad_id.as_deref(), Some("sandbox-ad-5"));

    let operations: Vec<AdOperation> = account.calls().iter().map(|c| c.operation).collect();
    assert_eq!(
        operations,
        vec![
            AdOperation::CreateCampaign,
            AdOperation::CreateAdSet,
            AdOperation::CreateAdImage,
            AdOperation::CreateAdCreative,
            AdOperation::CreateAd,
        ]
    );

    let requests = llm.requests.lock().unwrap();
    let (first_messages, tool_names) = &requests[0];
    assert_eq!(first_messages.len(), 1);
    let instruction = &first_messages[0].content;
    assert!(instruction.contains("daily_budget = \"20\""));
    assert!(instruction.contains("Shop Now"));
    assert!(instruction.contains(&expected_image.display().to_string()));
    assert_eq!(tool_names.len(), 5);

    // The last request carries every earlier turn: instruction, 4 assistant
    // messages and 5 tool results.
    assert_eq!(requests[4].0.len(), 10);
}

#[tokio::test]
async fn test_generated_image_is_saved_and_used() {
    let image_dir = tempfile::tempdir().unwrap();
    let expected_image = image_dir.path().join("ad_image.png");

    let llm = ScriptedLLM::new(full_script(&expected_image));
    let account = Arc::new(SandboxAdAccount::new());
    let runner = runner(llm, account, image_dir.path().to_path_buf());

    let markdown = runner.run(&brief(), &ImageSource::Generate).await.unwrap();
    assert_eq!(std::fs::read(&expected_image).unwrap(), b"generated pixels");
    assert!(markdown.contains("Final ad id: sandbox-ad-5"));
    assert!(markdown.contains("| Campaign | sandbox-campaign-1 |"));
}

#[tokio::test]
async fn test_ads_failure_renders_credentials_message() {
    let image_dir = tempfile::tempdir().unwrap();
    let expected_image = image_dir.path().join("ad_image.png");

    let llm = ScriptedLLM::new(full_script(&expected_image));
    let account = Arc::new(SandboxAdAccount::new().failing_on(
        AdOperation::CreateAdSet,
        AgentError::AdsAuthentication("Error validating access token".to_string()),
    ));
    let runner = runner(llm.clone(), account.clone(), image_dir.path().to_path_buf());

    let markdown = runner.run(&brief(), &ImageSource::Generate).await.unwrap();
    assert!(markdown.starts_with("### Provide valid access credentials!"));
    assert!(markdown.contains("Error validating access token"));

    // The failing call aborted the turn: the image upload after it never ran.
    assert_eq!(account.calls().len(), 1);
    assert_eq!(llm.requests.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_non_ads_failure_is_returned() {
    let image_dir = tempfile::tempdir().unwrap();
    let llm = ScriptedLLM::new(vec![LLMResponse::with_tool_calls(vec![call(
        "call_1",
        "launch_rocket",
        json!({}),
    )])]);
    let account = Arc::new(SandboxAdAccount::new());
    let runner = runner(llm, account, image_dir.path().to_path_buf());

    let err = runner
        .run(&brief(), &ImageSource::Generate)
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::UnknownTool(name) if name == "launch_rocket"));
}
