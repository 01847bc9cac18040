//! Convenience re-exports for common use.

pub use crate::agent::{
    AgentConfig, AgentRun, AgentRunner, ContinuationPolicy, DefaultContinuation, Flow,
    FlowStatus, FullHistory, Instructions, MemoryStrategy, RunRecord, RunStore, Step,
    ToolCallResult, Windowed,
};
pub use crate::config::{LlmProvider, LlmSettings, ScouterConfig};
pub use crate::error::{Result, ScouterError};
pub use crate::provider::{ClientCache, CompletionRequest, ModelClient, RetryingClient, ToolSpec};
pub use crate::tools::{FunctionTool, Json, Tool, ToolArguments, ToolRegistry};
pub use crate::types::{
    ContentPart, FinishReason, GenerationSettings, ModelCompletion, ModelMessage, ResponseFormat,
    Role,
    ToolCallRequest, Usage,
};
pub use crate::util::retry::RetryPolicy;
