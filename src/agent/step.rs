//! Steps: the atomic entries of a flow.

use std::time::Duration;

use crate::types::{ModelCompletion, ModelMessage, Usage};

/// One unit of agent progress.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Messages supplied by the caller (instructions, user input).
    Input(InputStep),
    /// One model invocation.
    Model(ModelStep),
    /// All tool calls requested by one model step.
    ToolBatch(ToolBatchStep),
}

impl Step {
    pub fn input(messages: Vec<ModelMessage>) -> Self {
        Self::Input(InputStep { messages })
    }

    pub fn model(completion: ModelCompletion) -> Self {
        Self::Model(ModelStep { completion })
    }

    pub fn tool_batch(calls: Vec<ToolCallResult>) -> Self {
        Self::ToolBatch(ToolBatchStep { calls })
    }

    /// The messages this step contributes to the conversation.
    pub fn messages(&self) -> Vec<ModelMessage> {
        match self {
            Self::Input(step) => step.messages.clone(),
            Self::Model(step) => vec![step.completion.message.clone()],
            Self::ToolBatch(step) => step.calls.iter().map(ToolCallResult::to_message).collect(),
        }
    }

    pub fn is_input(&self) -> bool {
        matches!(self, Self::Input(_))
    }

    pub fn as_model(&self) -> Option<&ModelStep> {
        match self {
            Self::Model(step) => Some(step),
            _ => None,
        }
    }

    pub fn as_tool_batch(&self) -> Option<&ToolBatchStep> {
        match self {
            Self::ToolBatch(step) => Some(step),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputStep {
    pub messages: Vec<ModelMessage>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelStep {
    pub completion: ModelCompletion,
}

impl ModelStep {
    pub fn usage(&self) -> Option<Usage> {
        self.completion.usage
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolBatchStep {
    /// Results in the order the model requested the calls.
    pub calls: Vec<ToolCallResult>,
}

impl ToolBatchStep {
    /// Outputs joined by newlines, in call order.
    pub fn joined_output(&self) -> String {
        self.calls
            .iter()
            .map(|call| call.output.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn failures(&self) -> usize {
        self.calls.iter().filter(|call| !call.success).count()
    }
}

/// Outcome of one tool call.
///
/// Built through [`ToolCallResult::succeeded`] or [`ToolCallResult::failed`]
/// so that an error message is present exactly when the call failed.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallResult {
    call_id: String,
    tool_name: String,
    arguments: serde_json::Map<String, serde_json::Value>,
    output: String,
    execution_time: Duration,
    success: bool,
    error_message: Option<String>,
}

impl ToolCallResult {
    pub fn succeeded(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        arguments: serde_json::Map<String, serde_json::Value>,
        output: impl Into<String>,
        execution_time: Duration,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            arguments,
            output: output.into(),
            execution_time,
            success: true,
            error_message: None,
        }
    }

    pub fn failed(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        arguments: serde_json::Map<String, serde_json::Value>,
        error_message: impl Into<String>,
        execution_time: Duration,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            arguments,
            output: String::new(),
            execution_time,
            success: false,
            error_message: Some(error_message.into()),
        }
    }

    /// Tool message fed back to the model. Failures carry `Error: <message>`.
    pub fn to_message(&self) -> ModelMessage {
        match &self.error_message {
            Some(message) => {
                ModelMessage::tool_result(&self.call_id, format!("Error: {message}"), true)
            }
            None => ModelMessage::tool_result(&self.call_id, &self.output, false),
        }
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    pub fn arguments(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.arguments
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn execution_time(&self) -> Duration {
        self.execution_time
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }
}
