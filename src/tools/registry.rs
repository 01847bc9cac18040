//! Tool registry: the set of tools available to agents.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use super::arguments::ToolArguments;
use super::tool::{OutputSchema, Tool};
use super::validation::validate_arguments;
use crate::error::ScouterError;
use crate::provider::ToolSpec;

/// Name-keyed collection of tools.
///
/// An explicit object rather than a global: share it between runners with an
/// `Arc`. Registration is rare; lookups take a read lock only.
#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, rejecting duplicates and malformed schemas.
    pub fn register(&self, tool: impl Tool + 'static) -> Result<(), ScouterError> {
        self.register_arc(Arc::new(tool))
    }

    pub fn register_arc(&self, tool: Arc<dyn Tool>) -> Result<(), ScouterError> {
        let name = tool.name().to_string();
        if name.trim().is_empty() {
            return Err(ScouterError::tool_definition(name, "tool name must not be empty"));
        }
        if !is_object_schema(tool.input_schema()) {
            return Err(ScouterError::tool_definition(
                name,
                "input schema must describe an object",
            ));
        }
        if let OutputSchema::Structured(schema) = tool.output_schema() {
            if !is_object_schema(schema) {
                return Err(ScouterError::tool_definition(
                    name,
                    "output schema must be a string or an object",
                ));
            }
        }

        let mut tools = self.write();
        if tools.contains_key(&name) {
            return Err(ScouterError::tool_definition(name, "already registered"));
        }
        debug!(tool = %name, "Registered tool");
        tools.insert(name, tool);
        Ok(())
    }

    /// Find a tool by name.
    pub fn lookup(&self, name: &str) -> Result<Arc<dyn Tool>, ScouterError> {
        self.read()
            .get(name)
            .cloned()
            .ok_or_else(|| ScouterError::tool(name, "tool not found"))
    }

    /// Parse, validate and invoke, returning the text payload for the model.
    ///
    /// Every failure comes back as [`ScouterError::ToolExecution`] naming the tool.
    pub async fn execute(&self, tool: &dyn Tool, raw_arguments: &str) -> Result<String, ScouterError> {
        let name = tool.name();
        let args = ToolArguments::parse(name, raw_arguments)?;
        validate_arguments(args.raw(), tool.input_schema())
            .map_err(|message| ScouterError::tool(name, message))?;

        let output = tool
            .invoke(args)
            .await
            .map_err(|e| as_tool_error(name, e))?;
        Ok(output.into_payload())
    }

    /// Look up a tool by name and execute it.
    pub async fn run(&self, name: &str, raw_arguments: &str) -> Result<String, ScouterError> {
        let tool = self.lookup(name)?;
        self.execute(tool.as_ref(), raw_arguments).await
    }

    /// Specs for the named tools, in the given order.
    pub fn specs<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<ToolSpec>, ScouterError> {
        let tools = self.read();
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                tools
                    .get(name)
                    .map(|tool| tool.spec())
                    .ok_or_else(|| ScouterError::tool(name, "tool not found"))
            })
            .collect()
    }

    /// Registered tool names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<dyn Tool>>> {
        self.tools.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<dyn Tool>>> {
        self.tools.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

fn is_object_schema(schema: &serde_json::Value) -> bool {
    schema.get("type").and_then(|t| t.as_str()) == Some("object")
}

fn as_tool_error(tool_name: &str, err: ScouterError) -> ScouterError {
    match err {
        ScouterError::ToolExecution { .. } => err,
        other => ScouterError::tool(tool_name, other.to_string()),
    }
}
