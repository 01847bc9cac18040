//! Model client trait and implementations.

pub mod cache;
pub mod http;
pub mod retry;

#[cfg(feature = "openai")]
pub mod openai;

pub use cache::ClientCache;
pub use retry::RetryingClient;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ScouterError;
use crate::types::{GenerationSettings, ModelCompletion, ModelMessage};

/// A request sent to a model client.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ModelMessage>,
    /// Tools the model may call. `None` when the agent has no tools.
    pub tools: Option<Vec<ToolSpec>>,
    pub settings: GenerationSettings,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ModelMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            tools: None,
            settings: GenerationSettings::default(),
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = if tools.is_empty() { None } else { Some(tools) };
        self
    }

    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }
}

/// Tool description sent to the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema of the tool's input object.
    pub parameters: serde_json::Value,
}

/// Core trait implemented by every model backend.
///
/// Implementations classify their failures through [`ScouterError`] so the
/// retry layer can tell transient from permanent errors.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Backend name (e.g., "openai").
    fn name(&self) -> &str;

    /// Run one completion.
    async fn complete(&self, request: &CompletionRequest) -> Result<ModelCompletion, ScouterError>;
}

#[async_trait]
impl<C: ModelClient + ?Sized> ModelClient for Arc<C> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<ModelCompletion, ScouterError> {
        (**self).complete(request).await
    }
}
