//! The run loop: model call, concurrent tool batch, repeat.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::future;
use tracing::{debug, info, warn};

use super::config::AgentConfig;
use super::flow::{Flow, FlowStatus};
use super::run::AgentRun;
use super::step::{Step, ToolCallResult};
use super::trace::{emit_contained, NoopTraceSink, TraceEvent, TraceSink, AGENT_RUN, MODEL_CALL, TOOL_CALL};
use crate::error::ScouterError;
use crate::provider::{CompletionRequest, ModelClient, ToolSpec};
use crate::tools::ToolRegistry;
use crate::types::{ModelCompletion, ModelMessage, ToolCallRequest};
use crate::util::retry::RetryPolicy;
use crate::util::timeout::with_timeout;

/// Drives agent runs against a model client and a tool registry.
#[derive(Clone)]
pub struct AgentRunner {
    client: Arc<dyn ModelClient>,
    registry: Arc<ToolRegistry>,
    trace: Arc<dyn TraceSink>,
    retry: Option<RetryPolicy>,
}

impl AgentRunner {
    pub fn new(client: Arc<dyn ModelClient>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            client,
            registry,
            trace: Arc::new(NoopTraceSink),
            retry: None,
        }
    }

    pub fn with_trace_sink(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.trace = sink;
        self
    }

    /// Retry transient model failures with this policy.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Empty run carrying the agent's memory and continuation policies.
    pub fn create_run(&self, config: &AgentConfig) -> AgentRun {
        AgentRun::new(config.continuation_policy(), Arc::clone(&config.memory))
    }

    /// Execute `config` on `run` until the continuation policy says stop.
    ///
    /// Instructions and `seed` go into a `{name}_input` flow (only when there
    /// are any); the loop itself records into `{name}_main`. On error the main
    /// flow is marked failed and the error is returned.
    ///
    /// A run is executed once. Calling this on a run that already has flows
    /// fails with [`ScouterError::InvalidRunState`] and leaves it untouched;
    /// for a follow-up turn create a new run and pass the previous
    /// conversation (for example [`full_history`](super::memory::full_history)
    /// of the old flows) as `seed`.
    pub async fn run(
        &self,
        run: &mut AgentRun,
        config: &AgentConfig,
        seed: Vec<ModelMessage>,
    ) -> Result<(), ScouterError> {
        if let Some(existing) = run.flows.first() {
            return Err(ScouterError::InvalidRunState(format!(
                "run {} was already executed (has flow '{}'); start a new run for another turn",
                run.id, existing.id
            )));
        }

        let tools = self.registry.specs(&config.tool_names)?;
        let start_time = Utc::now();

        let mut input = config.instructions.clone().into_messages();
        input.extend(seed);
        if !input.is_empty() {
            let mut flow = Flow::new(config.input_flow_id(), &config.name);
            flow.add_step(Step::input(input))?;
            run.flows.push(flow);
        }

        let mut main = Flow::new(config.main_flow_id(), &config.name);
        main.mark_running()?;
        run.flows.push(main);
        let flow_index = run.flows.len() - 1;

        info!(run_id = %run.id, agent = %config.name, model = %config.model, "Agent run started");

        let outcome = match config.timeout {
            Some(deadline) => with_timeout(deadline, self.drive(run, config, &tools, flow_index)).await,
            None => self.drive(run, config, &tools, flow_index).await,
        };

        let flow = &mut run.flows[flow_index];
        match &outcome {
            Ok(()) => flow.mark_completed()?,
            Err(err) => {
                if flow.status() == FlowStatus::Running {
                    flow.mark_failed(err.to_string())?;
                }
                warn!(run_id = %run.id, flow_id = %flow.id, error = %err, "Agent run failed");
            }
        }

        let model_steps = run.model_step_count();
        info!(run_id = %run.id, model_steps, success = outcome.is_ok(), "Agent run finished");
        emit_contained(
            self.trace.as_ref(),
            TraceEvent::new(AGENT_RUN, start_time)
                .with_attribute("run_id", run.id.to_string())
                .with_attribute("agent", config.name.as_str())
                .with_attribute("model_steps", model_steps)
                .with_attribute("success", outcome.is_ok()),
        );

        outcome
    }

    async fn drive(
        &self,
        run: &mut AgentRun,
        config: &AgentConfig,
        tools: &[ToolSpec],
        flow_index: usize,
    ) -> Result<(), ScouterError> {
        while run.should_continue() {
            let request = CompletionRequest::new(&config.model, run.context())
                .with_tools(tools.to_vec())
                .with_settings(config.generation_settings());

            let completion = self.call_model(&request).await?;
            let calls: Vec<ToolCallRequest> =
                completion.requested_tool_calls().into_iter().cloned().collect();
            run.flows[flow_index].add_step(Step::model(completion))?;

            if calls.is_empty() {
                continue;
            }

            debug!(
                run_id = %run.id,
                flow_id = %run.flows[flow_index].id,
                tool_calls = calls.len(),
                "Executing tool batch"
            );
            let results = future::join_all(
                calls
                    .into_iter()
                    .map(|call| self.execute_single_tool(call, &config.tool_names)),
            )
            .await;
            run.flows[flow_index].add_step(Step::tool_batch(results))?;
        }
        Ok(())
    }

    async fn call_model(&self, request: &CompletionRequest) -> Result<ModelCompletion, ScouterError> {
        let start_time = Utc::now();
        let mut attempts = 0u32;

        let result = match &self.retry {
            Some(policy) => {
                policy
                    .execute(|| {
                        attempts += 1;
                        self.client.complete(request)
                    })
                    .await
            }
            None => {
                attempts = 1;
                self.client.complete(request).await
            }
        };

        let mut event = TraceEvent::new(MODEL_CALL, start_time)
            .with_attribute("model", request.model.as_str())
            .with_attribute("client", self.client.name())
            .with_attribute("attempts", attempts)
            .with_attribute("success", result.is_ok());
        if let Ok(completion) = &result {
            event = event.with_attribute("tool_calls", completion.requested_tool_calls().len());
            if let Some(usage) = completion.usage {
                event = event.with_attribute("total_tokens", usage.total_tokens);
            }
        }
        emit_contained(self.trace.as_ref(), event);

        result
    }

    /// Run one tool call to a result. Never fails: every problem becomes a
    /// failed [`ToolCallResult`].
    async fn execute_single_tool(&self, call: ToolCallRequest, allowed: &[String]) -> ToolCallResult {
        let start_time = Utc::now();
        let started = Instant::now();
        let arguments = serde_json::from_str::<serde_json::Value>(&call.arguments)
            .ok()
            .and_then(|value| value.as_object().cloned())
            .unwrap_or_default();

        let outcome = if allowed.iter().any(|name| name == &call.name) {
            let registry = Arc::clone(&self.registry);
            let name = call.name.clone();
            let raw = call.arguments.clone();
            match tokio::spawn(async move { registry.run(&name, &raw).await }).await {
                Ok(Ok(output)) => Ok(output),
                Ok(Err(err)) => Err(tool_error_message(err)),
                Err(join_err) if join_err.is_panic() => Err(format!("tool '{}' panicked", call.name)),
                Err(_) => Err(format!("tool '{}' was cancelled", call.name)),
            }
        } else {
            Err(format!("tool '{}' is not available to this agent", call.name))
        };

        let elapsed = started.elapsed();
        let result = match outcome {
            Ok(output) => ToolCallResult::succeeded(&call.id, &call.name, arguments, output, elapsed),
            Err(message) => {
                warn!(tool = %call.name, call_id = %call.id, error = %message, "Tool call failed");
                ToolCallResult::failed(&call.id, &call.name, arguments, message, elapsed)
            }
        };

        emit_contained(
            self.trace.as_ref(),
            TraceEvent::new(TOOL_CALL, start_time)
                .with_attribute("tool", call.name.as_str())
                .with_attribute("call_id", call.id.as_str())
                .with_attribute("success", result.success()),
        );

        result
    }
}

fn tool_error_message(err: ScouterError) -> String {
    match err {
        ScouterError::ToolExecution { message, .. } => message,
        other => other.to_string(),
    }
}

impl std::fmt::Debug for AgentRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRunner")
            .field("client", &self.client.name())
            .field("registry", &self.registry)
            .field("retry", &self.retry)
            .finish()
    }
}
