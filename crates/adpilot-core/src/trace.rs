// src/trace.rs

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::core_types::{ToolCall, ToolResult};

/// One Model-Turn and, when the model asked for tools, the Tool-Turn that
/// answered it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStep {
    pub step_number: usize,
    pub thought: Option<String>,
    pub tool_calls: Option<Vec<ToolCall>>,
    pub tool_results: Vec<ToolResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentExecution {
    pub steps: Vec<AgentStep>,
    pub final_result: Option<String>,
    pub error: Option<String>,
}

/// A trait for handling agent execution traces.
/// This allows for decoupled monitoring, logging, or other features
/// without modifying the core agent logic.
pub trait AgentTraceHandler: Send + Sync {
    /// Called after each step of the agent's execution. A returned handle is
    /// awaited before the run finishes.
    fn on_step_complete(&mut self, step: &AgentStep) -> Option<JoinHandle<()>>;

    /// Called when the agent's execution is complete.
    fn on_execution_complete(&mut self, execution: &AgentExecution);
}

/// Trace handler that writes progress to the `log` facade.
#[derive(Debug, Default)]
pub struct LogTraceHandler;

impl AgentTraceHandler for LogTraceHandler {
    fn on_step_complete(&mut self, step: &AgentStep) -> Option<JoinHandle<()>> {
        match &step.tool_calls {
            Some(calls) => {
                let names: Vec<&str> = calls.iter().map(|c| c.name.as_str()).collect();
                log::info!("Step {} called {}", step.step_number, names.join(", "));
                for result in &step.tool_results {
                    log::info!("  {} -> {}", result.name, result.content);
                }
            }
            None => log::info!("Step {} produced the final answer", step.step_number),
        }
        None
    }

    fn on_execution_complete(&mut self, execution: &AgentExecution) {
        match &execution.error {
            Some(error) => log::error!(
                "Run failed after {} steps: {}",
                execution.steps.len(),
                error
            ),
            None => log::info!("Run finished after {} steps", execution.steps.len()),
        }
    }
}
