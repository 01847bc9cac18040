//! Trace events for model calls, tool calls and whole runs.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const MODEL_CALL: &str = "model_call";
pub const TOOL_CALL: &str = "tool_call";
pub const AGENT_RUN: &str = "agent_run";

/// One timed operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceEvent {
    pub operation: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl TraceEvent {
    pub fn new(operation: impl Into<String>, start_time: DateTime<Utc>) -> Self {
        Self {
            operation: operation.into(),
            start_time,
            end_time: Utc::now(),
            attributes: serde_json::Map::new(),
        }
    }

    pub fn with_attribute(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    pub fn duration_ms(&self) -> i64 {
        (self.end_time - self.start_time).num_milliseconds()
    }
}

/// Receives trace events. Must not block; failures stay inside the sink.
pub trait TraceSink: Send + Sync {
    fn emit(&self, event: TraceEvent);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTraceSink;

impl TraceSink for NoopTraceSink {
    fn emit(&self, _event: TraceEvent) {}
}

/// Logs each event at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTraceSink;

impl TraceSink for TracingTraceSink {
    fn emit(&self, event: TraceEvent) {
        debug!(
            operation = %event.operation,
            duration_ms = event.duration_ms(),
            attributes = %serde_json::Value::Object(event.attributes),
            "trace"
        );
    }
}

/// Keeps events in memory.
#[derive(Debug, Default)]
pub struct MemoryTraceSink {
    events: Mutex<Vec<TraceEvent>>,
}

impl MemoryTraceSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TraceEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn operations(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.operation).collect()
    }
}

impl TraceSink for MemoryTraceSink {
    fn emit(&self, event: TraceEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}

/// Deliver `event`, containing any panic raised by the sink.
pub(crate) fn emit_contained(sink: &dyn TraceSink, event: TraceEvent) {
    let operation = event.operation.clone();
    if catch_unwind(AssertUnwindSafe(|| sink.emit(event))).is_err() {
        warn!(operation = %operation, "Trace sink panicked; event dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Exploding;

    impl TraceSink for Exploding {
        fn emit(&self, _event: TraceEvent) {
            panic!("sink failure");
        }
    }

    #[test]
    fn memory_sink_records_events() {
        let sink = MemoryTraceSink::new();
        emit_contained(
            &sink,
            TraceEvent::new(TOOL_CALL, Utc::now()).with_attribute("tool", "echo"),
        );

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].attributes["tool"], "echo");
        assert!(events[0].duration_ms() >= 0);
    }

    #[test]
    fn panicking_sink_is_contained() {
        emit_contained(&Exploding, TraceEvent::new(MODEL_CALL, Utc::now()));
    }
}
