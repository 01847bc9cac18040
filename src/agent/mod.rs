//! Agent runtime: steps, flows, runs and the loop that drives them.

pub mod config;
pub mod continuation;
pub mod flow;
pub mod memory;
pub mod record;
pub mod run;
pub mod runner;
pub mod step;
pub mod store;
pub mod trace;

pub use config::{AgentConfig, Instructions};
pub use continuation::{ContinuationPolicy, DefaultContinuation, PolicyFn};
pub use flow::{Flow, FlowMetadata, FlowStatus};
pub use memory::{full_history, FullHistory, MemoryFn, MemoryStrategy, Windowed};
pub use record::{FlowRecord, RunRecord, StepRecord, ToolCallRecord, RECORD_VERSION};
pub use run::{AgentRun, RunId};
pub use runner::AgentRunner;
pub use step::{InputStep, ModelStep, Step, ToolBatchStep, ToolCallResult};
pub use store::{FileRunStore, InMemoryRunStore, RunStore};
pub use trace::{MemoryTraceSink, NoopTraceSink, TraceEvent, TraceSink, TracingTraceSink};
