//! OpenAI-compatible Chat Completions client.
//!
//! Works against api.openai.com and OpenRouter alike; only the base URL differs.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::ScouterError;
use crate::types::*;

use super::http::{bearer_headers, shared_client, status_to_error};
use super::{CompletionRequest, ModelClient};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiClient {
    api_key: String,
    base_url: String,
    request_timeout: Option<Duration>,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>, base_url: Option<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            request_timeout: None,
        }
    }

    /// Per-request HTTP timeout. Expiry surfaces as a retryable network error.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        let messages = request
            .messages
            .iter()
            .map(message_to_openai)
            .collect::<Vec<_>>();

        let mut body = serde_json::Map::new();
        body.insert("model".into(), request.model.clone().into());
        body.insert("messages".into(), messages.into());

        let settings = &request.settings;
        if let Some(max) = settings.max_tokens {
            body.insert("max_tokens".into(), max.into());
        }
        if let Some(temp) = settings.temperature {
            body.insert("temperature".into(), temp.into());
        }
        if let Some(top_p) = settings.top_p {
            body.insert("top_p".into(), top_p.into());
        }
        if let Some(ref stops) = settings.stop {
            body.insert("stop".into(), serde_json::json!(stops));
        }
        if let Some(pp) = settings.presence_penalty {
            body.insert("presence_penalty".into(), pp.into());
        }
        if let Some(fp) = settings.frequency_penalty {
            body.insert("frequency_penalty".into(), fp.into());
        }
        if let Some(seed) = settings.seed {
            body.insert("seed".into(), seed.into());
        }
        if let Some(ref format) = settings.response_format {
            body.insert("response_format".into(), response_format_to_openai(format));
        }

        if let Some(ref tools) = request.tools {
            let tool_defs: Vec<serde_json::Value> = tools
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect();
            body.insert("tools".into(), tool_defs.into());
        }

        serde_json::Value::Object(body)
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<ModelCompletion, ScouterError> {
        let body = self.build_request_body(request);
        let url = format!("{}/chat/completions", self.base_url);

        debug!(model = %request.model, messages = request.messages.len(), "OpenAI complete");

        let mut builder = shared_client()
            .post(&url)
            .headers(bearer_headers(&self.api_key))
            .json(&body);
        if let Some(timeout) = self.request_timeout {
            builder = builder.timeout(timeout);
        }
        let resp = builder.send().await?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let retry_after = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body_text, retry_after.as_deref()));
        }

        let data: OpenAiChatResponse = resp.json().await?;
        let choice = data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ScouterError::Provider {
                provider: "openai".into(),
                message: "No choices in response".into(),
            })?;

        let calls: Vec<ToolCallRequest> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCallRequest::new(tc.id, tc.function.name, tc.function.arguments))
            .collect();

        Ok(ModelCompletion {
            id: data.id.unwrap_or_default(),
            model: data.model.unwrap_or_else(|| request.model.clone()),
            message: ModelMessage::assistant_with_tool_calls(
                choice.message.content.unwrap_or_default(),
                calls,
            ),
            usage: data
                .usage
                .map(|u| Usage::new(u.prompt_tokens, u.completion_tokens)),
            finish_reason: choice
                .finish_reason
                .as_deref()
                .and_then(|reason| reason.parse().ok()),
        })
    }
}

fn response_format_to_openai(format: &ResponseFormat) -> serde_json::Value {
    match format {
        ResponseFormat::Text => serde_json::json!({ "type": "text" }),
        ResponseFormat::JsonObject => serde_json::json!({ "type": "json_object" }),
        ResponseFormat::JsonSchema { schema, name } => serde_json::json!({
            "type": "json_schema",
            "json_schema": {
                "name": name,
                "schema": schema,
                "strict": true,
            }
        }),
    }
}

fn message_to_openai(msg: &ModelMessage) -> serde_json::Value {
    let role = match msg.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };

    if let Some(ContentPart::ToolResult(tr)) = msg.content.first() {
        return serde_json::json!({
            "role": "tool",
            "tool_call_id": tr.tool_call_id,
            "content": tr.content,
        });
    }

    let tool_calls = msg.tool_calls();
    if !tool_calls.is_empty() {
        let tc_json: Vec<serde_json::Value> = tool_calls
            .iter()
            .map(|tc| {
                serde_json::json!({
                    "id": tc.id,
                    "type": "function",
                    "function": {
                        "name": tc.name,
                        "arguments": tc.arguments,
                    }
                })
            })
            .collect();
        let text = msg.text();
        return serde_json::json!({
            "role": role,
            "content": if text.is_empty() { serde_json::Value::Null } else { serde_json::Value::String(text) },
            "tool_calls": tc_json,
        });
    }

    let mut value = serde_json::json!({ "role": role, "content": msg.text() });
    if let Some(ref name) = msg.name {
        value["name"] = name.clone().into();
    }
    value
}

// OpenAI API response types (internal)

#[derive(Deserialize)]
struct OpenAiChatResponse {
    id: Option<String>,
    model: Option<String>,
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAiToolCall>>,
}

#[derive(Deserialize)]
struct OpenAiToolCall {
    id: String,
    function: OpenAiFunction,
}

#[derive(Deserialize)]
struct OpenAiFunction {
    name: String,
    arguments: String,
}

#[derive(Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}
