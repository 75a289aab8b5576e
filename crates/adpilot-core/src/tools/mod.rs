//! Tool system exposed to the language model
//!
//! Every capability the model may call is a `Tool` trait object held in a
//! `ToolRegistry`. The registry owns the name lookup, compiles each tool's
//! declared argument schema once at registration, and checks model-supplied
//! arguments against it before the tool runs. The campaign adapters live in
//! `ads`; `web_search` is the one general-purpose tool.

use async_trait::async_trait;
use jsonschema::JSONSchema;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::ads::AdAccount;
use crate::config::{AdSetDefaults, WebSearchConfig, WebSearchProvider};
use crate::core_types::{ToolCall, ToolResult};
use crate::errors::AgentError;
use crate::llm::ToolMetadata;

pub mod ads;
pub mod web_search;

pub use ads::{AdCreativeTool, AdImageTool, AdSetTool, AdTool, CampaignTool};
pub use web_search::WebSearchTool;

// Core Tool trait that all tools must implement
#[async_trait]
pub trait Tool: Send + Sync {
    fn metadata(&self) -> ToolMetadata;
    async fn execute(&self, arguments: Value) -> Result<String, AgentError>;
}

struct RegisteredTool {
    tool: Arc<dyn Tool>,
    metadata: ToolMetadata,
    schema: JSONSchema,
}

/// Name-keyed set of tools with compiled argument schemas.
pub struct ToolRegistry {
    tools: HashMap<String, RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Registers a tool. Names must be unique and the declared schema must
    /// compile.
    pub fn register_tool(&mut self, tool: Arc<dyn Tool>) -> Result<(), AgentError> {
        let metadata = tool.metadata();
        if self.tools.contains_key(&metadata.name) {
            return Err(AgentError::ConfigError(format!(
                "Tool '{}' is already registered",
                metadata.name
            )));
        }

        let schema = JSONSchema::compile(&metadata.input_schema).map_err(|e| {
            AgentError::ConfigError(format!(
                "Invalid argument schema for tool '{}': {}",
                metadata.name, e
            ))
        })?;

        log::debug!("Registered tool '{}'", metadata.name);
        self.tools.insert(
            metadata.name.clone(),
            RegisteredTool {
                tool,
                metadata,
                schema,
            },
        );
        Ok(())
    }

    pub fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).map(|entry| entry.tool.clone())
    }

    /// Metadata of every tool, sorted by name so requests are stable.
    pub fn list_tools(&self) -> Vec<ToolMetadata> {
        let mut tools: Vec<ToolMetadata> =
            self.tools.values().map(|entry| entry.metadata.clone()).collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn validate_arguments(&self, name: &str, arguments: &Value) -> Result<(), AgentError> {
        let entry = self
            .tools
            .get(name)
            .ok_or_else(|| AgentError::UnknownTool(name.to_string()))?;

        if let Err(errors) = entry.schema.validate(arguments) {
            let messages: Vec<String> = errors
                .map(|error| {
                    let path = error.instance_path.to_string();
                    if path.is_empty() {
                        error.to_string()
                    } else {
                        format!("{}: {}", path, error)
                    }
                })
                .collect();
            return Err(AgentError::InvalidArguments {
                tool_name: name.to_string(),
                message: messages.join("; "),
            });
        }
        Ok(())
    }

    /// Looks up, validates and executes one requested call.
    pub async fn invoke(&self, call: &ToolCall) -> Result<ToolResult, AgentError> {
        let tool = self
            .get_tool(&call.name)
            .ok_or_else(|| AgentError::UnknownTool(call.name.clone()))?;
        self.validate_arguments(&call.name, &call.arguments)?;

        log::info!("Executing tool '{}' (call {})", call.name, call.id);
        log::debug!("Tool '{}' arguments: {}", call.name, call.arguments);
        let content = tool.execute(call.arguments.clone()).await?;
        log::debug!("Tool '{}' result: {}", call.name, content);

        Ok(ToolResult {
            call_id: call.id.clone(),
            name: call.name.clone(),
            content,
        })
    }

    /// Startup check of the declared schema set.
    pub fn validate(&self) -> Result<(), AgentError> {
        if self.tools.is_empty() {
            return Err(AgentError::ConfigError("No tools registered".to_string()));
        }

        for (name, entry) in &self.tools {
            if entry.metadata.description.trim().is_empty() {
                return Err(AgentError::ConfigError(format!(
                    "Tool '{}' has no description",
                    name
                )));
            }

            let schema = &entry.metadata.input_schema;
            if schema.get("type").and_then(Value::as_str) != Some("object") {
                return Err(AgentError::ConfigError(format!(
                    "Tool '{}' must take an object of arguments",
                    name
                )));
            }

            let properties = schema.get("properties").and_then(Value::as_object);
            let required = schema
                .get("required")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            for field in required {
                let field = field.as_str().unwrap_or_default();
                if !properties.is_some_and(|p| p.contains_key(field)) {
                    return Err(AgentError::ConfigError(format!(
                        "Tool '{}' requires undeclared argument '{}'",
                        name, field
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// Tool factory for the campaign tool set
pub struct ToolFactory;

impl ToolFactory {
    /// The five Ads adapters, in the order the campaign is built.
    pub fn create_ad_tools(
        account: Arc<dyn AdAccount>,
        defaults: &AdSetDefaults,
    ) -> Vec<Arc<dyn Tool>> {
        vec![
            Arc::new(CampaignTool::new(account.clone())),
            Arc::new(AdSetTool::new(account.clone(), defaults.clone())),
            Arc::new(AdImageTool::new(account.clone())),
            Arc::new(AdCreativeTool::new(account.clone())),
            Arc::new(AdTool::new(account)),
        ]
    }

    /// Web search tool, or `None` when disabled. Tavily without a key falls
    /// back to DuckDuckGo.
    pub fn create_web_search(config: &WebSearchConfig) -> Option<Arc<dyn Tool>> {
        if !config.enabled {
            return None;
        }
        let tool = match (&config.provider, &config.api_key) {
            (WebSearchProvider::Tavily, Some(key)) => WebSearchTool::with_tavily_api_key(key.clone()),
            (WebSearchProvider::Tavily, None) => {
                log::warn!("Tavily API key not configured, falling back to DuckDuckGo search");
                WebSearchTool::new()
            }
            (WebSearchProvider::DuckDuckGo, _) => WebSearchTool::new(),
        };
        let tool = match &config.base_url {
            Some(url) => tool.with_base_url(url.as_str()),
            None => tool,
        };
        Some(Arc::new(tool.with_max_results(config.max_results)))
    }

    pub fn create_campaign_registry(
        account: Arc<dyn AdAccount>,
        defaults: &AdSetDefaults,
        web_search: Option<Arc<dyn Tool>>,
    ) -> Result<ToolRegistry, AgentError> {
        let mut registry = ToolRegistry::new();
        for tool in Self::create_ad_tools(account, defaults) {
            registry.register_tool(tool)?;
        }
        if let Some(search) = web_search {
            registry.register_tool(search)?;
        }
        registry.validate()?;
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ads::SandboxAdAccount;
    use serde_json::json;

    struct EchoTool {
        name: &'static str,
        schema: Value,
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn metadata(&self) -> ToolMetadata {
            ToolMetadata {
                name: self.name.to_string(),
                description: "Echoes its arguments".to_string(),
                input_schema: self.schema.clone(),
            }
        }

        async fn execute(&self, arguments: Value) -> Result<String, AgentError> {
            Ok(arguments.to_string())
        }
    }

    fn echo(name: &'static str) -> Arc<dyn Tool> {
        Arc::new(EchoTool {
            name,
            schema: json!({
                "type": "object",
                "properties": {"text": {"type": "string"}},
                "required": ["text"]
            }),
        })
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register_tool(echo("echo")).unwrap();
        assert!(matches!(
            registry.register_tool(echo("echo")),
            Err(AgentError::ConfigError(_))
        ));
        assert_eq!(registry.tool_count(), 1);
    }

    #[tokio::test]
    async fn test_invoke_validates_arguments() {
        let mut registry = ToolRegistry::new();
        registry.register_tool(echo("echo")).unwrap();

        let ok = ToolCall {
            id: "call_1".into(),
            name: "echo".into(),
            arguments: json!({"text": "hi"}),
        };
        let result = registry.invoke(&ok).await.unwrap();
        assert_eq!(result.call_id, "call_1");
        assert_eq!(result.content, r#"{"text":"hi"}"#);

        let bad = ToolCall {
            arguments: json!({"text": 3}),
            ..ok.clone()
        };
        assert!(matches!(
            registry.invoke(&bad).await,
            Err(AgentError::InvalidArguments { .. })
        ));

        let unknown = ToolCall {
            name: "missing".into(),
            ..ok
        };
        assert!(matches!(
            registry.invoke(&unknown).await,
            Err(AgentError::UnknownTool(name)) if name == "missing"
        ));
    }

    #[test]
    fn test_validate_catches_undeclared_required_field() {
        let mut registry = ToolRegistry::new();
        registry
            .register_tool(Arc::new(EchoTool {
                name: "broken",
                schema: json!({"type": "object", "properties": {}, "required": ["text"]}),
            }))
            .unwrap();
        assert!(registry.validate().is_err());
        assert!(ToolRegistry::new().validate().is_err());
    }

    #[test]
    fn test_campaign_registry_lists_sorted_tools() {
        let account = Arc::new(SandboxAdAccount::new());
        let registry =
            ToolFactory::create_campaign_registry(account, &AdSetDefaults::default(), None)
                .unwrap();
        let names: Vec<String> = registry.list_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![
                "make_ad",
                "make_ad_creative",
                "make_ad_image",
                "make_ad_set",
                "make_campaign"
            ]
        );
    }

    #[test]
    fn test_web_search_disabled() {
        let config = WebSearchConfig {
            enabled: false,
            ..WebSearchConfig::default()
        };
        assert!(ToolFactory::create_web_search(&config).is_none());
    }
}
