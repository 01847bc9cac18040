//! Shared test helpers: scripted model client and sample tools.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;

use scouter::error::ScouterError;
use scouter::provider::{CompletionRequest, ModelClient};
use scouter::tools::FunctionTool;
use scouter::types::*;

pub const MODEL: &str = "stub-model";

/// A model client that plays back queued responses in order.
#[derive(Default)]
pub struct ScriptedClient {
    responses: Mutex<VecDeque<Result<ModelCompletion, ScouterError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a plain text response.
    pub fn queue_text(&self, text: &str) -> &Self {
        self.queue(Ok(ModelCompletion::text(MODEL, text).with_usage(Usage::new(10, 20))))
    }

    /// Queue a response requesting the given `(id, tool, raw_arguments)` calls.
    pub fn queue_tool_calls(&self, calls: &[(&str, &str, &str)]) -> &Self {
        let calls = calls
            .iter()
            .map(|(id, name, args)| ToolCallRequest::new(*id, *name, *args))
            .collect();
        self.queue(Ok(ModelCompletion::tool_calls(MODEL, calls).with_usage(Usage::new(10, 5))))
    }

    pub fn queue_error(&self, error: ScouterError) -> &Self {
        self.queue(Err(error))
    }

    pub fn queue(&self, response: Result<ModelCompletion, ScouterError>) -> &Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedClient {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<ModelCompletion, ScouterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(ScouterError::Provider {
                    provider: "scripted".into(),
                    message: "no scripted response left".into(),
                })
            })
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TextInput {
    pub text: String,
}

/// Returns its input unchanged.
pub fn echo_tool() -> FunctionTool {
    FunctionTool::new("echo", "Echo the given text back.", |input: TextInput| async move {
        Ok(input.text)
    })
}

/// Fails whenever the text is "boom".
pub fn picky_tool() -> FunctionTool {
    FunctionTool::new("picky", "Rejects 'boom'.", |input: TextInput| async move {
        if input.text == "boom" {
            Err(ScouterError::tool("picky", "refusing to handle boom"))
        } else {
            Ok(input.text.to_uppercase())
        }
    })
}

/// Panics on every call.
pub fn panicking_tool() -> FunctionTool {
    FunctionTool::new("panicky", "Always panics.", |_input: TextInput| async move {
        if true {
            panic!("handler blew up");
        }
        Ok(String::new())
    })
}
