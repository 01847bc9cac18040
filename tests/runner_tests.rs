//! Run loop behavior against a scripted model client.

mod common;

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;

use common::{echo_tool, panicking_tool, picky_tool, ScriptedClient, TextInput};
use scouter::agent::trace::{AGENT_RUN, MODEL_CALL, TOOL_CALL};
use scouter::agent::{
    full_history, AgentConfig, AgentRunner, FlowStatus, MemoryTraceSink, Step,
};
use scouter::error::ScouterError;
use scouter::tools::{FunctionTool, ToolRegistry};
use scouter::types::{ModelMessage, ResponseFormat, Role};

fn registry() -> Arc<ToolRegistry> {
    let registry = ToolRegistry::new();
    registry.register(echo_tool()).unwrap();
    registry.register(picky_tool()).unwrap();
    registry.register(panicking_tool()).unwrap();
    Arc::new(registry)
}

fn runner(client: &Arc<ScriptedClient>) -> AgentRunner {
    AgentRunner::new(client.clone(), registry())
}

fn config(tools: &[&str]) -> AgentConfig {
    AgentConfig::builder()
        .model(common::MODEL)
        .tool_names(tools.iter().map(|t| t.to_string()).collect())
        .build()
}

#[tokio::test]
async fn echo_scenario_records_one_flow_with_three_steps() {
    let client = Arc::new(ScriptedClient::new());
    client
        .queue_tool_calls(&[("call_1", "echo", r#"{"text":"hi"}"#)])
        .queue_text("done");
    let runner = runner(&client);
    let config = config(&["echo"]);

    let mut run = runner.create_run(&config);
    runner.run(&mut run, &config, Vec::new()).await.unwrap();

    assert_eq!(run.flows.len(), 1);
    let flow = &run.flows[0];
    assert_eq!(flow.id, "default_main");
    assert_eq!(flow.status(), FlowStatus::Completed);
    assert_eq!(flow.steps().len(), 3);
    assert!(matches!(flow.steps()[0], Step::Model(_)));
    assert!(matches!(flow.steps()[2], Step::Model(_)));

    let batch = flow.steps()[1].as_tool_batch().unwrap();
    assert_eq!(batch.calls.len(), 1);
    assert!(batch.calls[0].success());
    assert_eq!(batch.calls[0].output(), "hi");
    assert_eq!(batch.calls[0].arguments()["text"], "hi");

    assert_eq!(run.last_output().unwrap(), "done");
    assert_eq!(client.call_count(), 2);
}

#[tokio::test]
async fn model_sees_tool_results_on_the_next_call() {
    let client = Arc::new(ScriptedClient::new());
    client
        .queue_tool_calls(&[("call_1", "echo", r#"{"text":"hi"}"#)])
        .queue_text("done");
    let runner = runner(&client);
    let config = config(&["echo"]);

    let mut run = runner.create_run(&config);
    runner.run(&mut run, &config, Vec::new()).await.unwrap();

    let requests = client.requests();
    assert!(requests[0].messages.is_empty());
    assert_eq!(requests[0].tools.as_ref().unwrap()[0].name, "echo");

    let roles: Vec<Role> = requests[1].messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::Assistant, Role::Tool]);
}

#[tokio::test]
async fn instructions_and_seed_messages_get_their_own_flow() {
    let client = Arc::new(ScriptedClient::new());
    client.queue_text("hello there");
    let runner = runner(&client);
    let config = AgentConfig::builder()
        .name("support")
        .model(common::MODEL)
        .instructions("Answer briefly.")
        .build();

    let mut run = runner.create_run(&config);
    runner
        .run(&mut run, &config, vec![ModelMessage::user("hi")])
        .await
        .unwrap();

    let ids: Vec<&str> = run.flows.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["support_input", "support_main"]);
    assert_eq!(run.flows[0].status(), FlowStatus::Pending);
    assert_eq!(
        client.requests()[0].messages,
        vec![ModelMessage::system("Answer briefly."), ModelMessage::user("hi")]
    );
    assert!(client.requests()[0].tools.is_none());
    assert_eq!(run.last_output().unwrap(), "hello there");
}

#[tokio::test]
async fn run_terminates_once_the_model_stops_calling_tools() {
    let client = Arc::new(ScriptedClient::new());
    client
        .queue_tool_calls(&[("c1", "echo", r#"{"text":"a"}"#)])
        .queue_tool_calls(&[("c2", "echo", r#"{"text":"b"}"#)])
        .queue_text("finished");
    let runner = runner(&client);
    let config = config(&["echo"]);

    let mut run = runner.create_run(&config);
    runner.run(&mut run, &config, Vec::new()).await.unwrap();

    assert_eq!(client.call_count(), 3);
    assert_eq!(run.model_step_count(), 3);
    assert_eq!(run.tool_executions().len(), 2);
    assert_eq!(run.last_output().unwrap(), "finished");
}

#[tokio::test]
async fn max_steps_bounds_model_calls() {
    let client = Arc::new(ScriptedClient::new());
    for i in 0..10 {
        let id = format!("call_{i}");
        client.queue_tool_calls(&[(id.as_str(), "echo", r#"{"text":"again"}"#)]);
    }
    let runner = runner(&client);
    let config = AgentConfig::builder()
        .model(common::MODEL)
        .tool_names(vec!["echo".to_string()])
        .max_steps(3)
        .build();

    let mut run = runner.create_run(&config);
    runner.run(&mut run, &config, Vec::new()).await.unwrap();

    assert_eq!(run.model_step_count(), 3);
    assert_eq!(client.call_count(), 3);
    assert_eq!(run.flows[0].status(), FlowStatus::Completed);
    assert_eq!(run.last_output().unwrap(), "again");
}

#[tokio::test]
async fn one_failing_call_does_not_spoil_the_batch() {
    let client = Arc::new(ScriptedClient::new());
    client
        .queue_tool_calls(&[
            ("c1", "echo", r#"{"text":"one"}"#),
            ("c2", "picky", r#"{"text":"boom"}"#),
            ("c3", "picky", r#"{"text":"three"}"#),
        ])
        .queue_text("done");
    let runner = runner(&client);
    let config = config(&["echo", "picky"]);

    let mut run = runner.create_run(&config);
    runner.run(&mut run, &config, Vec::new()).await.unwrap();

    let batch = run.flows[0].steps()[1].as_tool_batch().unwrap();
    let ids: Vec<&str> = batch.calls.iter().map(|c| c.call_id()).collect();
    assert_eq!(ids, vec!["c1", "c2", "c3"]);
    assert_eq!(batch.failures(), 1);

    let failed = &batch.calls[1];
    assert!(!failed.success());
    assert_eq!(failed.error_message(), Some("refusing to handle boom"));
    assert_eq!(batch.calls[2].output(), "THREE");

    let tool_message = &client.requests()[1].messages[2];
    assert_eq!(tool_message.role, Role::Tool);
    assert_eq!(run.last_output().unwrap(), "done");
}

#[tokio::test]
async fn bad_calls_become_failed_results() {
    let client = Arc::new(ScriptedClient::new());
    client
        .queue_tool_calls(&[
            ("c1", "echo", "{not json"),
            ("c2", "echo", r#"{"text": 5}"#),
            ("c3", "missing", "{}"),
            ("c4", "panicky", r#"{"text":"x"}"#),
            ("c5", "picky", r#"{"text":"x"}"#),
        ])
        .queue_text("done");
    let runner = runner(&client);
    let config = config(&["echo", "panicky"]);

    let mut run = runner.create_run(&config);
    runner.run(&mut run, &config, Vec::new()).await.unwrap();

    let executions = run.tool_executions();
    assert_eq!(executions.len(), 5);
    assert!(executions.iter().all(|call| !call.success()));

    let message = |i: usize| executions[i].error_message().unwrap().to_string();
    assert!(message(0).contains("malformed arguments"));
    assert!(message(1).contains("expected type 'string'"));
    assert!(message(2).contains("not available to this agent"));
    assert!(message(3).contains("panicked"));
    assert!(message(4).contains("not available to this agent"));
    assert!(executions[0].arguments().is_empty());
}

#[tokio::test(start_paused = true)]
async fn tool_calls_in_a_batch_run_concurrently() {
    let registry = ToolRegistry::new();
    registry
        .register(FunctionTool::new("slow", "Sleeps for a second.", |input: TextInput| async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok(input.text)
        }))
        .unwrap();
    let client = Arc::new(ScriptedClient::new());
    client
        .queue_tool_calls(&[
            ("a", "slow", r#"{"text":"1"}"#),
            ("b", "slow", r#"{"text":"2"}"#),
            ("c", "slow", r#"{"text":"3"}"#),
        ])
        .queue_text("done");
    let runner = AgentRunner::new(client.clone(), Arc::new(registry));
    let config = config(&["slow"]);

    let started = tokio::time::Instant::now();
    let mut run = runner.create_run(&config);
    runner.run(&mut run, &config, Vec::new()).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(2));
    let outputs: Vec<&str> = run.tool_executions().iter().map(|c| c.output()).collect();
    assert_eq!(outputs, vec!["1", "2", "3"]);
}

#[tokio::test]
async fn model_errors_fail_the_flow_and_propagate() {
    let client = Arc::new(ScriptedClient::new());
    client
        .queue_tool_calls(&[("c1", "echo", r#"{"text":"hi"}"#)])
        .queue_error(ScouterError::api(400, "context length exceeded"));
    let runner = runner(&client);
    let config = config(&["echo"]);

    let mut run = runner.create_run(&config);
    let err = runner.run(&mut run, &config, Vec::new()).await.unwrap_err();

    assert!(err.is_llm_error());
    let flow = &run.flows[0];
    assert_eq!(flow.status(), FlowStatus::Failed);
    assert!(flow.metadata().error.as_deref().unwrap().contains("context length exceeded"));
    assert!(flow.metadata().end_time.is_some());
    assert_eq!(flow.steps().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn run_deadline_fails_the_active_flow() {
    let client = Arc::new(ScriptedClient::new().with_delay(Duration::from_secs(10)));
    client.queue_text("too late");
    let runner = runner(&client);
    let config = AgentConfig::builder()
        .model(common::MODEL)
        .timeout(Duration::from_secs(1))
        .build();

    let mut run = runner.create_run(&config);
    let err = runner.run(&mut run, &config, Vec::new()).await.unwrap_err();

    assert!(matches!(err, ScouterError::Timeout(1000)));
    assert_eq!(run.flows[0].status(), FlowStatus::Failed);
    assert_eq!(run.model_step_count(), 0);
}

#[tokio::test]
async fn unknown_configured_tool_fails_before_any_flow() {
    let client = Arc::new(ScriptedClient::new());
    let runner = runner(&client);
    let config = config(&["does_not_exist"]);

    let mut run = runner.create_run(&config);
    let err = runner.run(&mut run, &config, Vec::new()).await.unwrap_err();

    assert!(matches!(err, ScouterError::ToolExecution { .. }));
    assert!(run.flows.is_empty());
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn trace_sink_sees_every_operation() {
    let client = Arc::new(ScriptedClient::new());
    client
        .queue_tool_calls(&[("c1", "echo", r#"{"text":"hi"}"#)])
        .queue_text("done");
    let sink = Arc::new(MemoryTraceSink::new());
    let runner = runner(&client).with_trace_sink(sink.clone());
    let config = config(&["echo"]);

    let mut run = runner.create_run(&config);
    runner.run(&mut run, &config, Vec::new()).await.unwrap();

    assert_eq!(
        sink.operations(),
        vec![MODEL_CALL, TOOL_CALL, MODEL_CALL, AGENT_RUN]
    );
    let run_event = sink.events().pop().unwrap();
    assert_eq!(run_event.attributes["success"], true);
    assert_eq!(run_event.attributes["model_steps"], 2);
}

#[tokio::test]
async fn full_history_is_pure_and_order_stable() {
    let client = Arc::new(ScriptedClient::new());
    client
        .queue_tool_calls(&[("c1", "echo", r#"{"text":"hi"}"#)])
        .queue_text("done");
    let runner = runner(&client);
    let config = AgentConfig::builder()
        .model(common::MODEL)
        .instructions("Be brief.")
        .tool_names(vec!["echo".to_string()])
        .build();

    let mut run = runner.create_run(&config);
    runner
        .run(&mut run, &config, vec![ModelMessage::user("say hi")])
        .await
        .unwrap();

    let before = run.flows.clone();
    let first = full_history(&run.flows);
    let second = full_history(&run.flows);

    assert_eq!(first, second);
    assert_eq!(run.flows, before);
    assert_eq!(first.len(), 5);
    assert_eq!(first, run.context());
}

#[tokio::test]
async fn executed_runs_cannot_be_run_again() {
    let client = Arc::new(ScriptedClient::new());
    client.queue_text("one").queue_text("two");
    let runner = runner(&client);
    let config = config(&[]);

    let mut run = runner.create_run(&config);
    runner
        .run(&mut run, &config, vec![ModelMessage::user("q1")])
        .await
        .unwrap();
    let before = run.flows.clone();

    let err = runner
        .run(&mut run, &config, vec![ModelMessage::user("q2")])
        .await
        .unwrap_err();

    assert!(matches!(err, ScouterError::InvalidRunState(_)));
    assert_eq!(run.flows, before);
    assert_eq!(client.call_count(), 1);
    assert_eq!(run.last_output().unwrap(), "one");
}

#[tokio::test]
async fn follow_up_turn_starts_a_new_run_seeded_with_history() {
    let client = Arc::new(ScriptedClient::new());
    client.queue_text("one").queue_text("two");
    let runner = runner(&client);
    let config = config(&[]);

    let mut first = runner.create_run(&config);
    runner
        .run(&mut first, &config, vec![ModelMessage::user("q1")])
        .await
        .unwrap();

    let mut seed = full_history(&first.flows);
    seed.push(ModelMessage::user("q2"));
    let mut second = runner.create_run(&config);
    runner.run(&mut second, &config, seed).await.unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(second.last_output().unwrap(), "two");
    let texts: Vec<String> = client.requests()[1].messages.iter().map(|m| m.text()).collect();
    assert_eq!(texts, vec!["q1", "one", "q2"]);
}

#[tokio::test]
async fn structured_output_format_reaches_the_model_and_parses() {
    #[derive(Debug, serde::Deserialize, PartialEq)]
    struct Verdict {
        label: String,
        confidence: f64,
    }

    let client = Arc::new(ScriptedClient::new());
    client.queue_text(r#"{"label":"spam","confidence":0.9}"#);
    let runner = runner(&client);
    let format = ResponseFormat::JsonSchema {
        schema: serde_json::json!({
            "type": "object",
            "properties": {"label": {"type": "string"}, "confidence": {"type": "number"}},
            "required": ["label", "confidence"]
        }),
        name: "verdict".into(),
    };
    let config = AgentConfig::builder()
        .model(common::MODEL)
        .response_format(format.clone())
        .build();

    let mut run = runner.create_run(&config);
    runner
        .run(&mut run, &config, vec![ModelMessage::user("classify: win a prize")])
        .await
        .unwrap();

    assert_eq!(client.requests()[0].settings.response_format, Some(format));
    let verdict: Verdict = run.parse_output().unwrap();
    assert_eq!(verdict, Verdict { label: "spam".into(), confidence: 0.9 });
}
