//! Tool-calling agent that assembles Meta ad campaigns from a campaign brief.
//!
//! A brief is rendered into an instruction for a language model, and a
//! tool-routing control loop lets the model call the Marketing API in a
//! fixed sequence: campaign, ad set, image upload, creative, ad.
//!
//! # Architecture Overview
//!
//! - **Control loop** (`agent`): Model-Turn / Tool-Turn state machine with an
//!   explicit routing decision, step bound, timeout and cancellation
//! - **Tools** (`tools`): registry with schema-validated arguments, the Ads
//!   adapters and web search
//! - **Ad account** (`ads`): `AdAccount` trait, Graph API client and an
//!   in-process sandbox account
//! - **Language model** (`llm`): `LLM` and `ImageGenerator` traits with Gemini
//!   implementations
//! - **Prompt builder** (`prompt`): pure rendering of a `CampaignBrief`
//! - **Application shell** (`campaign`): image preparation, run, report
//! - **Configuration** (`config`): YAML plus `.env` and environment variables

pub mod ads;
pub mod agent;
pub mod campaign;
pub mod config;
pub mod core_types;
pub mod errors;
pub mod llm;
pub mod prompt;
pub mod tools;
pub mod trace;

pub use ads::{AdAccount, GraphApiAccount, SandboxAdAccount};
pub use agent::{route, Agent, AgentConfig, Route, RunOutcome};
pub use campaign::{ArtifactChain, CampaignReport, CampaignRunner, ImageSource};
pub use config::*;
pub use errors::AgentError;
pub use llm::LLM;
pub use prompt::CampaignBrief;
pub use tools::{Tool, ToolFactory, ToolRegistry};

#[cfg(test)]
pub mod test_utils;
