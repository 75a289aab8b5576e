//! Tool-routing control loop.
//!
//! An `Agent` alternates two states until the model stops asking for tools:
//! a Model-Turn sends the whole conversation and the registry's tool metadata
//! to the `LLM` and appends the assistant reply; a Tool-Turn runs every
//! requested call in order and appends one tool result per call. `route`
//! decides between them. Runs are bounded by a model-turn limit, a wall-clock
//! timeout and a cancellation token. Tool failures abort the run unchanged;
//! nothing already created on the ad platform is rolled back.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::config::AgentSettings;
use crate::core_types::{Conversation, Message, ToolCall, ToolResult};
use crate::errors::AgentError;
use crate::llm::LLM;
use crate::tools::ToolRegistry;
use crate::trace::{AgentExecution, AgentStep, AgentTraceHandler};

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Model turns allowed per run; `None` runs until the model stops.
    pub max_steps: Option<usize>,
    pub timeout: Option<Duration>,
    pub system_prompt: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: Some(25),
            timeout: Some(Duration::from_secs(300)),
            system_prompt: None,
        }
    }
}

impl From<&AgentSettings> for AgentConfig {
    fn from(settings: &AgentSettings) -> Self {
        Self {
            max_steps: settings.max_steps,
            timeout: settings.timeout_secs.map(Duration::from_secs),
            system_prompt: settings.system_prompt.clone(),
        }
    }
}

/// Where the loop goes after a Model-Turn.
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    Tools(Vec<ToolCall>),
    Done,
}

/// Routing decision for an assistant message.
pub fn route(message: &Message) -> Route {
    let calls = message.requested_tool_calls();
    if calls.is_empty() {
        Route::Done
    } else {
        Route::Tools(calls.to_vec())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TurnCounts {
    pub model_turns: usize,
    pub tool_turns: usize,
    pub tool_invocations: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub final_message: Message,
    pub conversation: Conversation,
    pub counts: TurnCounts,
}

impl RunOutcome {
    pub fn final_text(&self) -> &str {
        &self.final_message.content
    }

    pub fn tool_results(&self) -> Vec<ToolResult> {
        self.conversation.tool_results()
    }
}

pub struct Agent {
    llm: Arc<dyn LLM>,
    tools: Arc<ToolRegistry>,
    config: AgentConfig,
    cancellation: CancellationToken,
    trace_handler: Option<Box<dyn AgentTraceHandler>>,
    trace_handles: Vec<tokio::task::JoinHandle<()>>,
}

impl Agent {
    pub fn new(llm: Arc<dyn LLM>, tools: Arc<ToolRegistry>, config: AgentConfig) -> Self {
        Agent {
            llm,
            tools,
            config,
            cancellation: CancellationToken::new(),
            trace_handler: None,
            trace_handles: Vec::new(),
        }
    }

    /// Uses `token` to stop the run between turns or during a model call.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn set_trace_handler(&mut self, handler: Box<dyn AgentTraceHandler>) {
        self.trace_handler = Some(handler);
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub async fn run(&mut self, task: impl Into<String>) -> Result<RunOutcome, AgentError> {
        let task = task.into();
        log::info!("Agent run started");
        log::debug!("Task: {}", task);
        self.run_conversation(Conversation::with_user_message(task))
            .await
    }

    /// Drives an existing conversation to completion.
    pub async fn run_conversation(
        &mut self,
        mut conversation: Conversation,
    ) -> Result<RunOutcome, AgentError> {
        let mut counts = TurnCounts::default();
        let mut steps = Vec::new();

        let result = match self.config.timeout {
            Some(limit) => {
                let driven = self.drive(&mut conversation, &mut counts, &mut steps);
                match tokio::time::timeout(limit, driven).await {
                    Ok(result) => result,
                    Err(_) => Err(AgentError::Timeout(limit)),
                }
            }
            None => self.drive(&mut conversation, &mut counts, &mut steps).await,
        };

        let execution = AgentExecution {
            steps,
            final_result: result.as_ref().ok().map(|m| m.content.clone()),
            error: result.as_ref().err().map(|e| e.to_string()),
        };
        if let Some(handler) = &mut self.trace_handler {
            handler.on_execution_complete(&execution);
        }
        for handle in self.trace_handles.drain(..) {
            if let Err(e) = handle.await {
                log::warn!("Trace handler task failed: {}", e);
            }
        }

        match result {
            Ok(final_message) => {
                log::info!(
                    "Agent run finished: {} model turns, {} tool turns, {} tool calls",
                    counts.model_turns,
                    counts.tool_turns,
                    counts.tool_invocations
                );
                Ok(RunOutcome {
                    final_message,
                    conversation,
                    counts,
                })
            }
            Err(e) => {
                log::error!("Agent run failed: {}", e);
                Err(e)
            }
        }
    }

    async fn drive(
        &mut self,
        conversation: &mut Conversation,
        counts: &mut TurnCounts,
        steps: &mut Vec<AgentStep>,
    ) -> Result<Message, AgentError> {
        loop {
            if let Some(max_steps) = self.config.max_steps {
                if counts.model_turns >= max_steps {
                    log::warn!("Agent reached max_steps ({}) without a final answer", max_steps);
                    return Err(AgentError::MaxStepsReached(max_steps));
                }
            }
            self.check_cancelled()?;

            let step_number = counts.model_turns + 1;
            log::info!("Agent Step #{}", step_number);
            let assistant = self.model_turn(conversation).await?;
            counts.model_turns += 1;

            let thought = Some(assistant.content.clone()).filter(|c| !c.is_empty());
            match route(&assistant) {
                Route::Done => {
                    self.record_step(
                        steps,
                        AgentStep {
                            step_number,
                            thought,
                            tool_calls: None,
                            tool_results: Vec::new(),
                        },
                    );
                    return Ok(assistant);
                }
                Route::Tools(calls) => {
                    self.check_cancelled()?;
                    let results = self.tool_turn(conversation, &calls).await?;
                    counts.tool_turns += 1;
                    counts.tool_invocations += results.len();
                    self.record_step(
                        steps,
                        AgentStep {
                            step_number,
                            thought,
                            tool_calls: Some(calls),
                            tool_results: results,
                        },
                    );
                }
            }
        }
    }

    async fn model_turn(&self, conversation: &mut Conversation) -> Result<Message, AgentError> {
        let mut messages = Vec::with_capacity(conversation.len() + 1);
        if let Some(system_prompt) = &self.config.system_prompt {
            if !system_prompt.is_empty() {
                messages.push(Message::system(system_prompt.clone()));
            }
        }
        messages.extend(conversation.messages().iter().cloned());

        let tool_metadata = self.tools.list_tools();
        let tool_metadata = if tool_metadata.is_empty() {
            None
        } else {
            Some(tool_metadata)
        };

        log::info!("Generating LLM response");
        let response = tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => return Err(AgentError::Cancelled),
            response = self.llm.generate(messages, tool_metadata) => response?,
        };

        let assistant = response.into_message();
        log::info!(
            "LLM requested {} tool call(s)",
            assistant.requested_tool_calls().len()
        );
        conversation.push(assistant.clone())?;
        Ok(assistant)
    }

    /// Runs the requested calls in order, appending one result per call. The
    /// first failure ends the turn.
    async fn tool_turn(
        &self,
        conversation: &mut Conversation,
        calls: &[ToolCall],
    ) -> Result<Vec<ToolResult>, AgentError> {
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            let result = self.tools.invoke(call).await.map_err(|e| {
                log::error!("Tool '{}' failed: {}", call.name, e);
                e
            })?;
            conversation.push_tool_result(&result)?;
            results.push(result);
        }
        Ok(results)
    }

    fn record_step(&mut self, steps: &mut Vec<AgentStep>, step: AgentStep) {
        if let Some(handler) = &mut self.trace_handler {
            if let Some(handle) = handler.on_step_complete(&step) {
                self.trace_handles.push(handle);
            }
        }
        steps.push(step);
    }

    fn check_cancelled(&self) -> Result<(), AgentError> {
        if self.cancellation.is_cancelled() {
            log::warn!("Agent run cancelled");
            return Err(AgentError::Cancelled);
        }
        Ok(())
    }
}
