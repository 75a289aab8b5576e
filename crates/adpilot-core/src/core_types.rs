//! Core type definitions for agent-LLM communication protocol
//!
//! This module defines the message log exchanged with the language model and
//! the tool-call records that flow through the control loop. A conversation is
//! append-only for the duration of one run; ordering is the only thing that
//! ties a tool result to the request that produced it, so the correlation
//! rule is checked whenever a result is appended.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use crate::errors::AgentError;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>, tool_calls: Option<Vec<ToolCall>>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_call_id: None,
            name: None,
            tool_calls: tool_calls.filter(|calls| !calls.is_empty()),
        }
    }

    pub fn tool_result(result: &ToolResult) -> Self {
        Self {
            role: Role::Tool,
            content: result.content.clone(),
            tool_call_id: Some(result.call_id.clone()),
            name: Some(result.name.clone()),
            tool_calls: None,
        }
    }

    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_call_id: None,
            name: None,
            tool_calls: None,
        }
    }

    /// Tool calls carried by an assistant message, empty for every other role.
    pub fn requested_tool_calls(&self) -> &[ToolCall] {
        match (&self.role, &self.tool_calls) {
            (Role::Assistant, Some(calls)) => calls,
            _ => &[],
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ToolResult {
    pub call_id: String,
    pub name: String,
    pub content: String,
}

// Usage statistics structure
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LLMResponse {
    pub content: Option<String>,
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl LLMResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: None,
            finish_reason: None,
            usage: None,
        }
    }

    pub fn with_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: None,
            tool_calls: Some(tool_calls),
            finish_reason: None,
            usage: None,
        }
    }

    pub fn into_message(self) -> Message {
        Message::assistant(self.content.unwrap_or_default(), self.tool_calls)
    }
}

/// Ordered, append-only message log for one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Conversation {
    messages: Vec<Message>,
    #[serde(skip)]
    open_calls: Vec<String>,
    #[serde(skip)]
    answered_calls: HashSet<String>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_message(content: impl Into<String>) -> Self {
        let mut conversation = Self::new();
        conversation.messages.push(Message::user(content));
        conversation
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Appends a message. Tool messages must answer a call id requested by an
    /// earlier assistant message, and each call id may be answered once.
    pub fn push(&mut self, message: Message) -> Result<(), AgentError> {
        match message.role {
            Role::Tool => {
                let call_id = message.tool_call_id.as_deref().ok_or_else(|| {
                    AgentError::ConversationError(
                        "tool result message without a tool call id".to_string(),
                    )
                })?;
                if !self.open_calls.iter().any(|id| id == call_id) {
                    return Err(AgentError::ConversationError(format!(
                        "tool result references unknown call id '{}'",
                        call_id
                    )));
                }
                if !self.answered_calls.insert(call_id.to_string()) {
                    return Err(AgentError::ConversationError(format!(
                        "call id '{}' already has a tool result",
                        call_id
                    )));
                }
            }
            Role::Assistant => {
                for call in message.requested_tool_calls() {
                    self.open_calls.push(call.id.clone());
                }
            }
            Role::System | Role::User => {}
        }
        self.messages.push(message);
        Ok(())
    }

    pub fn push_tool_result(&mut self, result: &ToolResult) -> Result<(), AgentError> {
        self.push(Message::tool_result(result))
    }

    /// Every tool result in the log, in append order.
    pub fn tool_results(&self) -> Vec<ToolResult> {
        self.messages
            .iter()
            .filter(|m| m.role == Role::Tool)
            .map(|m| ToolResult {
                call_id: m.tool_call_id.clone().unwrap_or_default(),
                name: m.name.clone().unwrap_or_default(),
                content: m.content.clone(),
            })
            .collect()
    }
}
