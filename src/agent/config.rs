//! Agent configuration.

use std::sync::Arc;
use std::time::Duration;

use bon::Builder;

use super::continuation::{ContinuationPolicy, DefaultContinuation};
use super::memory::{FullHistory, MemoryStrategy};
use crate::types::{GenerationSettings, ModelMessage, ResponseFormat};

/// Instructions placed at the start of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Instructions {
    #[default]
    None,
    /// A single system prompt.
    System(String),
    /// System prompt plus an initial user message. Empty halves are skipped.
    SystemUser(String, String),
    /// Explicit messages, used as given.
    Messages(Vec<ModelMessage>),
}

impl Instructions {
    pub fn into_messages(self) -> Vec<ModelMessage> {
        match self {
            Self::None => Vec::new(),
            Self::System(system) => vec![ModelMessage::system(system)],
            Self::SystemUser(system, user) => {
                let mut messages = Vec::with_capacity(2);
                if !system.is_empty() {
                    messages.push(ModelMessage::system(system));
                }
                if !user.is_empty() {
                    messages.push(ModelMessage::user(user));
                }
                messages
            }
            Self::Messages(messages) => messages,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::None => true,
            Self::System(_) => false,
            Self::SystemUser(system, user) => system.is_empty() && user.is_empty(),
            Self::Messages(messages) => messages.is_empty(),
        }
    }
}

impl From<&str> for Instructions {
    fn from(system: &str) -> Self {
        Self::System(system.to_string())
    }
}

impl From<String> for Instructions {
    fn from(system: String) -> Self {
        Self::System(system)
    }
}

impl From<(String, String)> for Instructions {
    fn from((system, user): (String, String)) -> Self {
        Self::SystemUser(system, user)
    }
}

impl From<Vec<ModelMessage>> for Instructions {
    fn from(messages: Vec<ModelMessage>) -> Self {
        Self::Messages(messages)
    }
}

/// Immutable description of an agent.
#[derive(Clone, Builder)]
pub struct AgentConfig {
    #[builder(into, default = String::from("default"))]
    pub name: String,
    #[builder(into)]
    pub model: String,
    #[builder(default = 0.7)]
    pub temperature: f64,
    pub max_tokens: Option<u32>,
    /// Structured output requested on every model call.
    pub response_format: Option<ResponseFormat>,
    #[builder(into, default)]
    pub instructions: Instructions,
    /// Registry names of the tools this agent may call.
    #[builder(default)]
    pub tool_names: Vec<String>,
    #[builder(default = default_memory())]
    pub memory: Arc<dyn MemoryStrategy>,
    /// Explicit policy; when absent one is built from `max_steps`.
    pub continuation: Option<Arc<dyn ContinuationPolicy>>,
    pub max_steps: Option<usize>,
    /// Deadline for the whole run.
    pub timeout: Option<Duration>,
}

fn default_memory() -> Arc<dyn MemoryStrategy> {
    Arc::new(FullHistory)
}

impl AgentConfig {
    /// Effective continuation policy.
    pub fn continuation_policy(&self) -> Arc<dyn ContinuationPolicy> {
        match &self.continuation {
            Some(policy) => Arc::clone(policy),
            None => Arc::new(DefaultContinuation {
                max_steps: self.max_steps,
            }),
        }
    }

    pub fn generation_settings(&self) -> GenerationSettings {
        GenerationSettings {
            temperature: Some(self.temperature),
            max_tokens: self.max_tokens,
            response_format: self.response_format.clone(),
            ..GenerationSettings::default()
        }
    }

    /// Flow id for the caller-supplied input.
    pub fn input_flow_id(&self) -> String {
        format!("{}_input", self.name)
    }

    /// Flow id for the main loop.
    pub fn main_flow_id(&self) -> String {
        format!("{}_main", self.name)
    }
}

impl std::fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentConfig")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("response_format", &self.response_format)
            .field("tool_names", &self.tool_names)
            .field("memory", &self.memory.name())
            .field("max_steps", &self.max_steps)
            .field("timeout", &self.timeout)
            .finish()
    }
}
