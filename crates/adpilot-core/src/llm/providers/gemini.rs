//! Google Gemini API client implementation
//!
//! Native client for the Generative Language `generateContent` endpoint. The
//! same wire types serve two purposes: function-calling chat for the campaign
//! agent and image generation (`responseModalities = [TEXT, IMAGE]`) for ad
//! images.

use crate::config::{LlmConfig, LlmProvider, ModelParameters};
use crate::core_types::{LLMResponse, Message, Role, ToolCall, Usage};
use crate::errors::AgentError;
use crate::llm::image::{GeneratedImage, ImageGenerator};
use crate::llm::{ToolMetadata, LLM};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini API client
pub struct GeminiClient {
    api_key: String,
    model: String,
    client: Client,
    base_url: String,
    parameters: ModelParameters,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(api_key: String, model: String) -> Self {
        Self::with_base_url(api_key, model, DEFAULT_BASE_URL.to_string())
    }

    /// Create a new Gemini client with custom base URL
    pub fn with_base_url(api_key: String, model: String, base_url: String) -> Self {
        Self {
            api_key,
            model: model.trim_start_matches("models/").to_string(),
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            parameters: ModelParameters::default(),
        }
    }

    pub fn with_parameters(mut self, parameters: ModelParameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTool>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text { text: String },
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: GeminiFunctionCall,
    },
    FunctionResponse {
        #[serde(rename = "functionResponse")]
        function_response: GeminiFunctionResponse,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiBlob,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiBlob {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    #[serde(rename = "topP")]
    top_p: f32,
    #[serde(rename = "responseModalities", skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct GeminiTool {
    #[serde(rename = "functionDeclarations")]
    function_declarations: Vec<GeminiFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct GeminiFunctionDeclaration {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "usageMetadata", default)]
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiUsage {
    #[serde(rename = "promptTokenCount", default)]
    prompt_token_count: Option<i32>,
    #[serde(rename = "candidatesTokenCount", default)]
    candidates_token_count: Option<i32>,
    #[serde(rename = "totalTokenCount", default)]
    total_token_count: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorDetails,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetails {
    code: u16,
    message: String,
}

impl GeminiClient {
    fn convert_messages_to_gemini_contents(
        &self,
        messages: Vec<Message>,
    ) -> (Option<GeminiContent>, Vec<GeminiContent>) {
        let mut system_instruction = None;
        let mut contents: Vec<GeminiContent> = Vec::new();

        for message in messages {
            match message.role {
                Role::System => {
                    // Use the last system message as system instruction
                    system_instruction = Some(GeminiContent {
                        role: None,
                        parts: vec![GeminiPart::Text {
                            text: message.content,
                        }],
                    });
                }
                Role::User => {
                    contents.push(GeminiContent {
                        role: Some("user".to_string()),
                        parts: vec![GeminiPart::Text {
                            text: message.content,
                        }],
                    });
                }
                Role::Assistant => {
                    let mut parts = Vec::new();

                    if !message.content.is_empty() {
                        parts.push(GeminiPart::Text {
                            text: message.content,
                        });
                    }

                    if let Some(tool_calls) = &message.tool_calls {
                        for tool_call in tool_calls {
                            parts.push(GeminiPart::FunctionCall {
                                function_call: GeminiFunctionCall {
                                    name: tool_call.name.clone(),
                                    args: tool_call.arguments.clone(),
                                },
                            });
                        }
                    }

                    contents.push(GeminiContent {
                        role: Some("model".to_string()),
                        parts,
                    });
                }
                Role::Tool => {
                    let part = GeminiPart::FunctionResponse {
                        function_response: GeminiFunctionResponse {
                            name: message.name.clone().unwrap_or_default(),
                            response: tool_response_value(&message.content),
                        },
                    };

                    // Gemini expects every response to one model turn in a single content.
                    match contents.last_mut() {
                        Some(last)
                            if last.role.as_deref() == Some("user")
                                && last
                                    .parts
                                    .iter()
                                    .all(|p| matches!(p, GeminiPart::FunctionResponse { .. })) =>
                        {
                            last.parts.push(part);
                        }
                        _ => contents.push(GeminiContent {
                            role: Some("user".to_string()),
                            parts: vec![part],
                        }),
                    }
                }
            }
        }

        (system_instruction, contents)
    }

    fn convert_tools_to_gemini(&self, tools: Vec<ToolMetadata>) -> Vec<GeminiTool> {
        if tools.is_empty() {
            return vec![];
        }

        let function_declarations = tools
            .into_iter()
            .map(|tool| GeminiFunctionDeclaration {
                name: tool.name,
                description: tool.description,
                parameters: tool.input_schema,
            })
            .collect();

        vec![GeminiTool {
            function_declarations,
        }]
    }

    fn convert_gemini_response_to_llm(&self, response: GeminiResponse) -> Result<LLMResponse, AgentError> {
        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::LLMError("No candidates in Gemini response".to_string()))?;

        let mut content_parts = Vec::new();
        let mut tool_calls = Vec::new();

        let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
        for part in parts {
            match part {
                GeminiPart::Text { text } => {
                    content_parts.push(text);
                }
                GeminiPart::FunctionCall { function_call } => {
                    tool_calls.push(ToolCall {
                        id: format!("call_{}", uuid::Uuid::new_v4().simple()),
                        name: function_call.name,
                        arguments: function_call.args,
                    });
                }
                GeminiPart::FunctionResponse { .. } | GeminiPart::InlineData { .. } => continue,
            }
        }

        let content = if content_parts.is_empty() {
            None
        } else {
            Some(content_parts.join(" "))
        };

        let tool_calls = if tool_calls.is_empty() {
            None
        } else {
            Some(tool_calls)
        };

        let usage = response.usage_metadata.map(|u| Usage {
            prompt_tokens: u.prompt_token_count.unwrap_or(0) as u32,
            completion_tokens: u.candidates_token_count.unwrap_or(0) as u32,
            total_tokens: u.total_token_count.unwrap_or(0) as u32,
        });

        Ok(LLMResponse {
            content,
            tool_calls,
            finish_reason: candidate.finish_reason,
            usage,
        })
    }

    fn convert_gemini_response_to_image(&self, response: GeminiResponse) -> Result<GeneratedImage, AgentError> {
        let parts = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts)
            .unwrap_or_default();

        let mut captions = Vec::new();
        let mut image = None;
        for part in parts {
            match part {
                GeminiPart::Text { text } => captions.push(text),
                GeminiPart::InlineData { inline_data } if image.is_none() => {
                    let bytes = STANDARD.decode(inline_data.data.as_bytes()).map_err(|e| {
                        AgentError::ImageGenerationError(format!(
                            "Gemini returned undecodable image data: {}",
                            e
                        ))
                    })?;
                    image = Some((bytes, inline_data.mime_type));
                }
                _ => {}
            }
        }

        let (bytes, mime_type) = image.ok_or_else(|| {
            AgentError::ImageGenerationError(format!(
                "Gemini response contained no image{}",
                if captions.is_empty() {
                    String::new()
                } else {
                    format!(": {}", captions.join(" "))
                }
            ))
        })?;

        Ok(GeneratedImage {
            bytes,
            mime_type,
            caption: if captions.is_empty() {
                None
            } else {
                Some(captions.join(" "))
            },
        })
    }

    async fn post_generate_content(&self, request: &GeminiRequest) -> Result<GeminiResponse, AgentError> {
        // The key travels in a header so it never appears in a request URL.
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        log::debug!(
            "Gemini request to model {} with {} contents",
            self.model,
            request.contents.len()
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                AgentError::LLMError(format!("Gemini API request failed: {}", e.without_url()))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            if let Ok(gemini_error) = serde_json::from_str::<GeminiError>(&error_text) {
                return Err(AgentError::LLMError(format!(
                    "Gemini API error {}: {}",
                    gemini_error.error.code, gemini_error.error.message
                )));
            }

            return Err(AgentError::LLMError(format!(
                "Gemini API request failed with status {}: {}",
                status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AgentError::ParsingError(format!("Failed to parse Gemini response: {}", e)))
    }

    fn generation_config(&self, response_modalities: Option<Vec<String>>) -> GeminiGenerationConfig {
        GeminiGenerationConfig {
            temperature: self.parameters.temperature,
            max_output_tokens: self.parameters.max_tokens,
            top_p: self.parameters.top_p,
            response_modalities,
        }
    }
}

/// Tool results are JSON objects already; anything else is wrapped.
fn tool_response_value(content: &str) -> Value {
    match serde_json::from_str::<Value>(content) {
        Ok(value @ Value::Object(_)) => value,
        _ => serde_json::json!({ "content": content }),
    }
}

#[async_trait]
impl LLM for GeminiClient {
    async fn generate(
        &self,
        messages: Vec<Message>,
        tools: Option<Vec<ToolMetadata>>,
    ) -> Result<LLMResponse, AgentError> {
        let (system_instruction, contents) = self.convert_messages_to_gemini_contents(messages);

        let tools_gemini = tools
            .map(|t| self.convert_tools_to_gemini(t))
            .filter(|t| !t.is_empty());

        let request = GeminiRequest {
            contents,
            generation_config: self.generation_config(None),
            system_instruction,
            tools: tools_gemini,
        };

        let gemini_response = self.post_generate_content(&request).await?;
        self.convert_gemini_response_to_llm(gemini_response)
    }
}

#[async_trait]
impl ImageGenerator for GeminiClient {
    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, AgentError> {
        log::info!("Requesting ad image from {}", self.model);

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart::Text {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: self
                .generation_config(Some(vec!["TEXT".to_string(), "IMAGE".to_string()])),
            system_instruction: None,
            tools: None,
        };

        let response = self.post_generate_content(&request).await.map_err(|e| match e {
            AgentError::LLMError(msg) | AgentError::ParsingError(msg) => {
                AgentError::ImageGenerationError(msg)
            }
            other => other,
        })?;
        self.convert_gemini_response_to_image(response)
    }
}

fn api_key_from(config: &LlmConfig) -> Result<String, AgentError> {
    config.auth.api_key.clone().filter(|k| !k.is_empty()).ok_or_else(|| {
        AgentError::ConfigError(format!(
            "No API key found for Gemini. Set {} or provide llm.auth.api_key in config",
            config.auth.api_key_env.as_deref().unwrap_or("GOOGLE_API_KEY")
        ))
    })
}

fn build_client(config: &LlmConfig, model: &str) -> Result<GeminiClient, AgentError> {
    let api_key = api_key_from(config)?;
    let client = match &config.provider {
        LlmProvider::Gemini => GeminiClient::new(api_key, model.to_string()),
        LlmProvider::Custom { base_url } => {
            GeminiClient::with_base_url(api_key, model.to_string(), base_url.clone())
        }
    };
    Ok(client.with_parameters(config.parameters.clone()))
}

/// Create a Gemini LLM client from configuration
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LLM>, AgentError> {
    Ok(Arc::new(build_client(config, &config.model)?))
}

/// Create a Gemini image generator that shares the chat credentials.
pub fn create_image_client(config: &LlmConfig, image_model: &str) -> Result<Arc<dyn ImageGenerator>, AgentError> {
    Ok(Arc::new(build_client(config, image_model)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmAuth;
    use crate::core_types::ToolResult;
    use serde_json::json;

    fn client() -> GeminiClient {
        GeminiClient::new("test-key".to_string(), "gemini-2.5-flash".to_string())
    }

    #[test]
    fn test_gemini_client_creation() {
        let client = GeminiClient::new(
            "test-key".to_string(),
            "models/gemini-2.0-flash-exp-image-generation".to_string(),
        );
        assert_eq!(client.api_key, "test-key");
        assert_eq!(client.model, "gemini-2.0-flash-exp-image-generation");
        assert_eq!(client.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_message_conversion_with_system() {
        let messages = vec![Message::system("You are helpful"), Message::user("Hello")];

        let (system_instruction, contents) = client().convert_messages_to_gemini_contents(messages);
        assert!(system_instruction.is_some());
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0].role, Some("user".to_string()));
    }

    #[test]
    fn test_parallel_tool_results_share_one_content() {
        let calls = vec![
            ToolCall {
                id: "call_a".into(),
                name: "make_ad_set".into(),
                arguments: json!({"ad_set_name": "Spring"}),
            },
            ToolCall {
                id: "call_b".into(),
                name: "make_ad_creative".into(),
                arguments: json!({}),
            },
        ];
        let messages = vec![
            Message::user("create it"),
            Message::assistant("", Some(calls)),
            Message::tool_result(&ToolResult {
                call_id: "call_a".into(),
                name: "make_ad_set".into(),
                content: r#"{"ad_set_id":"2385"}"#.into(),
            }),
            Message::tool_result(&ToolResult {
                call_id: "call_b".into(),
                name: "make_ad_creative".into(),
                content: "not json".into(),
            }),
        ];

        let (_, contents) = client().convert_messages_to_gemini_contents(messages);
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[1].role.as_deref(), Some("model"));
        assert_eq!(contents[1].parts.len(), 2);
        assert_eq!(contents[2].parts.len(), 2);

        let serialized = serde_json::to_value(&contents[2]).unwrap();
        assert_eq!(
            serialized["parts"][0]["functionResponse"]["name"],
            json!("make_ad_set")
        );
        assert_eq!(
            serialized["parts"][0]["functionResponse"]["response"]["ad_set_id"],
            json!("2385")
        );
        assert_eq!(
            serialized["parts"][1]["functionResponse"]["response"]["content"],
            json!("not json")
        );
    }

    #[test]
    fn test_tool_conversion() {
        let tools = vec![ToolMetadata {
            name: "make_campaign".to_string(),
            description: "Create a campaign".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {"campaign_name": {"type": "string"}}
            }),
        }];

        let gemini_tools = client().convert_tools_to_gemini(tools);
        assert_eq!(gemini_tools.len(), 1);
        assert_eq!(gemini_tools[0].function_declarations[0].name, "make_campaign");
        assert!(client().convert_tools_to_gemini(vec![]).is_empty());
    }

    #[test]
    fn test_function_call_response_gets_call_ids() {
        let raw = json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        {"functionCall": {"name": "make_campaign", "args": {"campaign_name": "Acme", "campaign_goal": "Traffic"}}},
                        {"functionCall": {"name": "web_search", "args": {"query": "acme"}}}
                    ]
                },
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 5, "totalTokenCount": 15}
        });
        let response: GeminiResponse = serde_json::from_value(raw).unwrap();
        let llm_response = client().convert_gemini_response_to_llm(response).unwrap();

        let calls = llm_response.tool_calls.unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "make_campaign");
        assert!(calls[0].id.starts_with("call_"));
        assert_ne!(calls[0].id, calls[1].id);
        assert!(llm_response.content.is_none());
        assert_eq!(llm_response.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn test_image_response_decoding() {
        let raw = json!({
            "candidates": [{
                "content": {
                    "parts": [
                        {"text": "Here is a vibrant ad image."},
                        {"inlineData": {"mimeType": "image/png", "data": STANDARD.encode([137u8, 80, 78, 71])}}
                    ]
                }
            }]
        });
        let response: GeminiResponse = serde_json::from_value(raw).unwrap();
        let image = client().convert_gemini_response_to_image(response).unwrap();
        assert_eq!(image.bytes, vec![137, 80, 78, 71]);
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.caption.as_deref(), Some("Here is a vibrant ad image."));
    }

    #[test]
    fn test_image_response_without_image_is_an_error() {
        let raw = json!({"candidates": [{"content": {"parts": [{"text": "I can't draw that."}]}}]});
        let response: GeminiResponse = serde_json::from_value(raw).unwrap();
        let err = client().convert_gemini_response_to_image(response).unwrap_err();
        assert!(matches!(err, AgentError::ImageGenerationError(msg) if msg.contains("can't draw")));
    }

    #[tokio::test]
    async fn test_transport_error_does_not_expose_api_key() {
        let client = GeminiClient::with_base_url(
            "SECRET-KEY-123".to_string(),
            "gemini-2.5-flash".to_string(),
            "http://127.0.0.1:1".to_string(),
        );

        let err = client
            .generate(vec![Message::user("Hello")], None)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::LLMError(_)));
        assert!(!err.to_string().contains("SECRET-KEY-123"));

        let err = client.generate_image("a trail at dawn").await.unwrap_err();
        assert!(matches!(err, AgentError::ImageGenerationError(_)));
        assert!(!err.to_string().contains("SECRET-KEY-123"));
    }

    #[test]
    fn test_create_client_requires_key() {
        let mut config = LlmConfig::default();
        config.auth = LlmAuth {
            api_key: None,
            api_key_env: Some("ADPILOT_UNSET_KEY".to_string()),
        };
        assert!(matches!(create_client(&config), Err(AgentError::ConfigError(_))));

        config.auth.api_key = Some("test-key".to_string());
        assert!(create_client(&config).is_ok());
        assert!(create_image_client(&config, "gemini-2.0-flash-exp-image-generation").is_ok());
    }
}
