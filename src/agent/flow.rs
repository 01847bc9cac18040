//! Flows: ordered step sequences with a lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::step::Step;
use crate::error::ScouterError;

/// Flow lifecycle status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FlowStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl FlowStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FlowMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Caller-defined annotations.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A named, ordered sequence of steps.
///
/// Transitions: pending → running → completed | failed, or pending → failed.
/// Anything else is rejected and leaves the flow untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Flow {
    pub id: String,
    pub agent_id: String,
    steps: Vec<Step>,
    status: FlowStatus,
    metadata: FlowMetadata,
    pub parent_flow_id: Option<String>,
}

impl Flow {
    pub fn new(id: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            agent_id: agent_id.into(),
            steps: Vec::new(),
            status: FlowStatus::Pending,
            metadata: FlowMetadata::default(),
            parent_flow_id: None,
        }
    }

    /// Nested flow under `parent`.
    pub fn child(parent: &Flow, id: impl Into<String>, agent_id: impl Into<String>) -> Self {
        let mut flow = Self::new(id, agent_id);
        flow.parent_flow_id = Some(parent.id.clone());
        flow
    }

    /// Rebuild a flow from persisted parts without re-running transitions.
    pub(crate) fn restore(
        id: String,
        agent_id: String,
        steps: Vec<Step>,
        status: FlowStatus,
        metadata: FlowMetadata,
        parent_flow_id: Option<String>,
    ) -> Self {
        Self {
            id,
            agent_id,
            steps,
            status,
            metadata,
            parent_flow_id,
        }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn status(&self) -> FlowStatus {
        self.status
    }

    pub fn metadata(&self) -> &FlowMetadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut FlowMetadata {
        &mut self.metadata
    }

    pub fn add_step(&mut self, step: Step) -> Result<(), ScouterError> {
        if self.status.is_terminal() {
            return Err(ScouterError::InvalidRunState(format!(
                "cannot add a step to {} flow '{}'",
                self.status, self.id
            )));
        }
        self.steps.push(step);
        Ok(())
    }

    pub fn mark_running(&mut self) -> Result<(), ScouterError> {
        self.transition(FlowStatus::Running)?;
        self.metadata.start_time = Some(Utc::now());
        Ok(())
    }

    pub fn mark_completed(&mut self) -> Result<(), ScouterError> {
        self.transition(FlowStatus::Completed)?;
        self.metadata.end_time = Some(Utc::now());
        Ok(())
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) -> Result<(), ScouterError> {
        self.transition(FlowStatus::Failed)?;
        self.metadata.error = Some(error.into());
        self.metadata.end_time = Some(Utc::now());
        Ok(())
    }

    fn transition(&mut self, to: FlowStatus) -> Result<(), ScouterError> {
        let allowed = matches!(
            (self.status, to),
            (FlowStatus::Pending, FlowStatus::Running)
                | (FlowStatus::Pending, FlowStatus::Failed)
                | (FlowStatus::Running, FlowStatus::Completed)
                | (FlowStatus::Running, FlowStatus::Failed)
        );
        if !allowed {
            return Err(ScouterError::InvalidRunState(format!(
                "flow '{}' cannot move from {} to {}",
                self.id, self.status, to
            )));
        }
        self.status = to;
        Ok(())
    }
}
