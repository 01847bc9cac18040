//! The result of one model invocation.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::generation::FinishReason;
use crate::error::ScouterError;
use super::message::{ModelMessage, ToolCallRequest};
use super::usage::Usage;

/// A completion returned by a model client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelCompletion {
    #[serde(default)]
    pub id: String,
    pub model: String,
    /// The assistant message, including any requested tool calls.
    pub message: ModelMessage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
}

impl ModelCompletion {
    /// Plain text completion.
    pub fn text(model: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            model: model.into(),
            message: ModelMessage::assistant(text),
            usage: None,
            finish_reason: Some(FinishReason::Stop),
        }
    }

    /// Completion that requests tool calls.
    pub fn tool_calls(model: impl Into<String>, calls: Vec<ToolCallRequest>) -> Self {
        Self {
            id: String::new(),
            model: model.into(),
            message: ModelMessage::assistant_with_tool_calls("", calls),
            usage: None,
            finish_reason: Some(FinishReason::ToolCalls),
        }
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Text emitted by the model.
    pub fn content(&self) -> String {
        self.message.text()
    }

    /// Tool calls requested by the model, in request order.
    pub fn requested_tool_calls(&self) -> Vec<&ToolCallRequest> {
        self.message.tool_calls()
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.message.tool_calls().is_empty()
    }

    /// Parse the text output as JSON into `T`. Markdown code fences are stripped.
    pub fn parse_json<T: DeserializeOwned>(&self) -> Result<T, ScouterError> {
        parse_json_output(&self.content())
    }
}

/// Parse model text as JSON into `T`, tolerating a surrounding code fence.
pub fn parse_json_output<T: DeserializeOwned>(text: &str) -> Result<T, ScouterError> {
    Ok(serde_json::from_str(&strip_code_fences(text))?)
}

fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
