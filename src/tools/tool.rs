//! Tool trait and typed function tools.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::arguments::ToolArguments;
use crate::error::ScouterError;
use crate::provider::ToolSpec;

/// What a tool promises to return.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputSchema {
    /// Free-form text.
    PlainString,
    /// JSON matching this schema.
    Structured(serde_json::Value),
}

impl OutputSchema {
    /// Classify a raw JSON Schema; `{"type": "string"}` is plain text.
    pub fn from_schema(schema: serde_json::Value) -> Self {
        if schema.get("type").and_then(|t| t.as_str()) == Some("string") {
            Self::PlainString
        } else {
            Self::Structured(schema)
        }
    }
}

/// Value produced by a tool handler.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Text(String),
    Structured(serde_json::Value),
}

impl ToolOutput {
    /// Text fed back to the model: the string itself, or compact JSON.
    pub fn into_payload(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Structured(value) => value.to_string(),
        }
    }
}

/// Wrapper marking a handler result to be returned as JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct Json<T>(pub T);

/// Handler return types a [`FunctionTool`] accepts.
pub trait IntoToolOutput: Send + 'static {
    fn output_schema() -> OutputSchema;
    fn into_tool_output(self) -> Result<ToolOutput, ScouterError>;
}

impl IntoToolOutput for String {
    fn output_schema() -> OutputSchema {
        OutputSchema::PlainString
    }

    fn into_tool_output(self) -> Result<ToolOutput, ScouterError> {
        Ok(ToolOutput::Text(self))
    }
}

impl<T> IntoToolOutput for Json<T>
where
    T: Serialize + JsonSchema + Send + 'static,
{
    fn output_schema() -> OutputSchema {
        OutputSchema::Structured(schema_value::<T>())
    }

    fn into_tool_output(self) -> Result<ToolOutput, ScouterError> {
        Ok(ToolOutput::Structured(serde_json::to_value(self.0)?))
    }
}

/// Core tool trait; implement to create custom tools.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (must match what the model calls).
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// JSON Schema of the input object.
    fn input_schema(&self) -> &serde_json::Value;

    fn output_schema(&self) -> &OutputSchema;

    /// Run the tool on parsed arguments.
    async fn invoke(&self, args: ToolArguments) -> Result<ToolOutput, ScouterError>;

    /// Description sent to the model, with the output contract appended.
    fn spec(&self) -> ToolSpec {
        let description = match self.output_schema() {
            OutputSchema::PlainString => format!(
                "{}\n\nThe tool will **always return a string**.",
                self.description()
            ),
            OutputSchema::Structured(schema) => format!(
                "{}\n\nThe tool will **always return JSON matching this exact schema**:\n```json\n{}\n```",
                self.description(),
                serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string())
            ),
        };
        ToolSpec {
            name: self.name().to_string(),
            description,
            parameters: self.input_schema().clone(),
        }
    }
}

type ToolHandler =
    dyn Fn(ToolArguments) -> BoxFuture<'static, Result<ToolOutput, ScouterError>> + Send + Sync;

/// Tool built from a typed handler.
///
/// Input and output schemas are derived from the handler's types.
pub struct FunctionTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
    output_schema: OutputSchema,
    handler: Arc<ToolHandler>,
}

impl FunctionTool {
    /// Create a tool from an async handler.
    pub fn new<I, O, F, Fut>(name: impl Into<String>, description: impl Into<String>, handler: F) -> Self
    where
        I: DeserializeOwned + JsonSchema + Send + 'static,
        O: IntoToolOutput,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, ScouterError>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        Self::from_parts::<I, O>(
            name,
            description,
            Arc::new(move |args: ToolArguments| {
                let handler = Arc::clone(&handler);
                async move {
                    let input: I = args.deserialize()?;
                    handler(input).await?.into_tool_output()
                }
                .boxed()
            }),
        )
    }

    /// Create a tool from a synchronous handler, run on the blocking pool.
    pub fn blocking<I, O, F>(name: impl Into<String>, description: impl Into<String>, handler: F) -> Self
    where
        I: DeserializeOwned + JsonSchema + Send + 'static,
        O: IntoToolOutput,
        F: Fn(I) -> Result<O, ScouterError> + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        Self::from_parts::<I, O>(
            name,
            description,
            Arc::new(move |args: ToolArguments| {
                let handler = Arc::clone(&handler);
                async move {
                    let input: I = args.deserialize()?;
                    let output = tokio::task::spawn_blocking(move || handler(input))
                        .await
                        .map_err(|e| {
                            ScouterError::tool(args.tool_name(), format!("handler panicked: {e}"))
                        })??;
                    output.into_tool_output()
                }
                .boxed()
            }),
        )
    }

    fn from_parts<I: JsonSchema, O: IntoToolOutput>(
        name: impl Into<String>,
        description: impl Into<String>,
        handler: Arc<ToolHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: schema_value::<I>(),
            output_schema: O::output_schema(),
            handler,
        }
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> &serde_json::Value {
        &self.input_schema
    }

    fn output_schema(&self) -> &OutputSchema {
        &self.output_schema
    }

    async fn invoke(&self, args: ToolArguments) -> Result<ToolOutput, ScouterError> {
        (self.handler)(args).await
    }
}

impl std::fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

fn schema_value<T: JsonSchema>() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(T)).unwrap_or_default()
}
