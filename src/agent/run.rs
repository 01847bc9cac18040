//! The run: all flows of one agent execution plus its policies.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::continuation::{ContinuationPolicy, DefaultContinuation};
use super::flow::Flow;
use super::memory::{FullHistory, MemoryStrategy};
use super::step::{Step, ToolCallResult};
use crate::error::ScouterError;
use crate::types::{parse_json_output, ModelMessage, Usage};

/// Unique run identifier.
pub type RunId = Uuid;

/// One agent execution.
///
/// Derived views (usage, last output, context) are computed from `flows`
/// on demand and never cached.
#[derive(Clone)]
pub struct AgentRun {
    pub id: RunId,
    pub flows: Vec<Flow>,
    pub continuation: Arc<dyn ContinuationPolicy>,
    pub memory: Arc<dyn MemoryStrategy>,
}

impl Default for AgentRun {
    fn default() -> Self {
        Self::new(
            Arc::new(DefaultContinuation::unbounded()),
            Arc::new(FullHistory),
        )
    }
}

impl AgentRun {
    pub fn new(
        continuation: Arc<dyn ContinuationPolicy>,
        memory: Arc<dyn MemoryStrategy>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            flows: Vec::new(),
            continuation,
            memory,
        }
    }

    /// All steps across flows, oldest first.
    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.flows.iter().flat_map(|flow| flow.steps())
    }

    pub fn flow(&self, id: &str) -> Option<&Flow> {
        self.flows.iter().find(|flow| flow.id == id)
    }

    pub fn flow_mut(&mut self, id: &str) -> Option<&mut Flow> {
        self.flows.iter_mut().find(|flow| flow.id == id)
    }

    /// Sum of usage over model steps; steps without usage count as zero.
    pub fn total_usage(&self) -> Usage {
        let mut total = Usage::default();
        for usage in self
            .steps()
            .filter_map(Step::as_model)
            .filter_map(|step| step.usage())
        {
            total.merge(&usage);
        }
        total
    }

    /// Output of the newest model or tool step.
    ///
    /// A trailing tool batch yields its outputs joined by newlines. A run with
    /// flows but no model or tool step yields an empty string.
    pub fn last_output(&self) -> Result<String, ScouterError> {
        if self.flows.is_empty() {
            return Err(ScouterError::InvalidRunState(
                "run has no flows".into(),
            ));
        }

        let newest = self
            .flows
            .iter()
            .rev()
            .flat_map(|flow| flow.steps().iter().rev())
            .find(|step| !step.is_input());

        Ok(match newest {
            Some(Step::Model(step)) => step.completion.content(),
            Some(Step::ToolBatch(batch)) => batch.joined_output(),
            Some(Step::Input(_)) | None => String::new(),
        })
    }

    /// The last output parsed as JSON into `T`.
    pub fn parse_output<T: DeserializeOwned>(&self) -> Result<T, ScouterError> {
        parse_json_output(&self.last_output()?)
    }

    /// Every tool call result, chronologically.
    pub fn tool_executions(&self) -> Vec<&ToolCallResult> {
        self.steps()
            .filter_map(Step::as_tool_batch)
            .flat_map(|batch| batch.calls.iter())
            .collect()
    }

    pub fn model_step_count(&self) -> usize {
        self.steps().filter(|step| matches!(step, Step::Model(_))).count()
    }

    /// Context for the next model call, per the memory strategy.
    pub fn context(&self) -> Vec<ModelMessage> {
        self.memory.context(&self.flows)
    }

    pub fn should_continue(&self) -> bool {
        self.continuation.should_continue(&self.flows)
    }
}

impl std::fmt::Debug for AgentRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRun")
            .field("id", &self.id)
            .field("flows", &self.flows)
            .field("memory", &self.memory.name())
            .finish()
    }
}
