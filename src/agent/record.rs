//! Serializable form of a run.
//!
//! Policies (memory, continuation) are behavior, not data: they are left out
//! of the record and supplied again on [`deserialize`].

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::continuation::ContinuationPolicy;
use super::flow::{Flow, FlowMetadata, FlowStatus};
use super::memory::MemoryStrategy;
use super::run::{AgentRun, RunId};
use super::step::{Step, ToolCallResult};
use crate::error::ScouterError;
use crate::types::{ModelCompletion, ModelMessage};

/// Current record format.
pub const RECORD_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunRecord {
    pub version: u32,
    pub id: RunId,
    pub flows: Vec<FlowRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlowRecord {
    pub id: String,
    pub agent_id: String,
    pub steps: Vec<StepRecord>,
    pub status: FlowStatus,
    #[serde(default)]
    pub metadata: FlowMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_flow_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepRecord {
    Input { messages: Vec<ModelMessage> },
    Model { completion: ModelCompletion },
    ToolBatch { calls: Vec<ToolCallRecord> },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallRecord {
    pub call_id: String,
    pub tool_name: String,
    #[serde(default)]
    pub arguments: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub output: String,
    pub execution_time_ms: f64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl RunRecord {
    pub fn to_json(&self) -> Result<String, ScouterError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self, ScouterError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Capture every flow and step of `run`.
pub fn serialize(run: &AgentRun) -> RunRecord {
    RunRecord {
        version: RECORD_VERSION,
        id: run.id,
        flows: run.flows.iter().map(flow_record).collect(),
    }
}

/// Rebuild a run from `record`, attaching the given policies.
pub fn deserialize(
    record: RunRecord,
    memory: Arc<dyn MemoryStrategy>,
    continuation: Arc<dyn ContinuationPolicy>,
) -> Result<AgentRun, ScouterError> {
    if record.version != RECORD_VERSION {
        return Err(ScouterError::Serialization(serde::de::Error::custom(format!(
            "unsupported run record version {} (expected {RECORD_VERSION})",
            record.version
        ))));
    }

    let mut run = AgentRun::new(continuation, memory);
    run.id = record.id;
    run.flows = record.flows.into_iter().map(restore_flow).collect();
    Ok(run)
}

fn flow_record(flow: &Flow) -> FlowRecord {
    FlowRecord {
        id: flow.id.clone(),
        agent_id: flow.agent_id.clone(),
        steps: flow.steps().iter().map(step_record).collect(),
        status: flow.status(),
        metadata: flow.metadata().clone(),
        parent_flow_id: flow.parent_flow_id.clone(),
    }
}

fn step_record(step: &Step) -> StepRecord {
    match step {
        Step::Input(step) => StepRecord::Input {
            messages: step.messages.clone(),
        },
        Step::Model(step) => StepRecord::Model {
            completion: step.completion.clone(),
        },
        Step::ToolBatch(batch) => StepRecord::ToolBatch {
            calls: batch
                .calls
                .iter()
                .map(|call| ToolCallRecord {
                    call_id: call.call_id().to_string(),
                    tool_name: call.tool_name().to_string(),
                    arguments: call.arguments().clone(),
                    output: call.output().to_string(),
                    execution_time_ms: call.execution_time().as_nanos() as f64 / 1e6,
                    success: call.success(),
                    error_message: call.error_message().map(str::to_string),
                })
                .collect(),
        },
    }
}

fn restore_flow(record: FlowRecord) -> Flow {
    Flow::restore(
        record.id,
        record.agent_id,
        record.steps.into_iter().map(restore_step).collect(),
        record.status,
        record.metadata,
        record.parent_flow_id,
    )
}

fn restore_step(record: StepRecord) -> Step {
    match record {
        StepRecord::Input { messages } => Step::input(messages),
        StepRecord::Model { completion } => Step::model(completion),
        StepRecord::ToolBatch { calls } => Step::tool_batch(
            calls
                .into_iter()
                .map(|call| {
                    let elapsed = millis_to_duration(call.execution_time_ms);
                    if call.success {
                        ToolCallResult::succeeded(
                            call.call_id,
                            call.tool_name,
                            call.arguments,
                            call.output,
                            elapsed,
                        )
                    } else {
                        ToolCallResult::failed(
                            call.call_id,
                            call.tool_name,
                            call.arguments,
                            call.error_message.unwrap_or_default(),
                            elapsed,
                        )
                    }
                })
                .collect(),
        ),
    }
}

fn millis_to_duration(ms: f64) -> Duration {
    if !ms.is_finite() || ms <= 0.0 {
        return Duration::ZERO;
    }
    Duration::from_nanos((ms * 1e6).round() as u64)
}
