//! Integration tests for the execution engine.
//!
//! These run against the in-memory store, the in-process queue, and mock
//! handlers — no network, no database.  The end-to-end cases go through
//! `Submitter` → queue → worker → runner exactly as the binary wires them.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use uuid::Uuid;

use steps::mock::MockHandler;
use steps::{
    builtin_registry, Context, ExternalActionConfig, GenerationConfig, HandlerRegistry,
    ProviderKind, StaticProvider, StepAction, StepContext, StepError, StepHandler, StepKind,
    UsagePolicy, WebhookConfig,
};
use store::{ExecutionRow, ExecutionStatus, MemoryStore, Store};

use crate::models::{Job, Step};
use crate::notify::ChannelNotifier;
use crate::runner::ExecutionRunner;
use crate::submit::Submitter;
use crate::usage::StoreUsageRecorder;
use crate::worker::spawn_workers;
use crate::{EngineError, NoopNotifier};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn external_step(id: &str, action: &str) -> Step {
    Step {
        id: id.into(),
        action: StepAction::ExternalAction(ExternalActionConfig {
            action: action.into(),
            repository: None,
            branch: None,
        }),
        depends_on: Vec::new(),
    }
}

fn webhook_step(id: &str, url: &str) -> Step {
    Step {
        id: id.into(),
        action: StepAction::Webhook(WebhookConfig {
            url: url.into(),
            method: None,
            headers: None,
            body: None,
        }),
        depends_on: Vec::new(),
    }
}

fn generation_step(id: &str, prompt: &str) -> Step {
    Step {
        id: id.into(),
        action: StepAction::Generation(GenerationConfig {
            prompt: prompt.into(),
            purpose: Default::default(),
            provider: ProviderKind::OpenAi,
            language: None,
            max_tokens: None,
        }),
        depends_on: Vec::new(),
    }
}

fn registry_of(entries: Vec<(StepKind, Arc<dyn StepHandler>)>) -> HandlerRegistry {
    entries.into_iter().collect()
}

/// Create a PENDING execution row and the matching job snapshot.
async fn job_for(store: &Arc<MemoryStore>, steps: Vec<Step>, input: Value) -> Job {
    let user_id = Uuid::new_v4();
    let workflow_id = Uuid::new_v4();
    let execution = store
        .create_execution(workflow_id, user_id, input.clone())
        .await
        .unwrap();

    Job {
        id: Uuid::new_v4(),
        execution_id: execution.id,
        workflow_id,
        user_id,
        steps,
        input,
    }
}

fn runner_with(store: &Arc<MemoryStore>, registry: HandlerRegistry) -> ExecutionRunner {
    ExecutionRunner::new(store.clone(), registry, Arc::new(NoopNotifier))
}

fn logs_of(row: &ExecutionRow) -> Vec<Value> {
    row.logs
        .as_ref()
        .and_then(|logs| logs.as_array().cloned())
        .unwrap_or_default()
}

fn output_of(row: &ExecutionRow) -> Vec<Value> {
    row.output
        .as_ref()
        .and_then(|output| output.as_array().cloned())
        .unwrap_or_default()
}

/// Poll the store until the execution reaches a terminal state.
async fn wait_terminal(store: &Arc<MemoryStore>, execution_id: Uuid) -> ExecutionRow {
    for _ in 0..200 {
        let row = store.get_execution(execution_id).await.unwrap();
        if row.parsed_status().unwrap().is_terminal() {
            return row;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("execution {execution_id} never reached a terminal state");
}

// ---------------------------------------------------------------------------
// Runner unit tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn all_succeeding_steps_yield_full_output_and_logs() {
    let store = Arc::new(MemoryStore::new());
    let mock = MockHandler::returning("ok", json!({"ok": true}));
    let registry = registry_of(vec![(StepKind::ExternalAction, mock.clone() as Arc<dyn StepHandler>)]);
    let runner = runner_with(&store, registry);

    let job = job_for(
        &store,
        vec![
            external_step("s1", "first"),
            external_step("s2", "second"),
            external_step("s3", "third"),
        ],
        json!({}),
    )
    .await;

    let status = runner.run(&job).await.unwrap();
    assert_eq!(status, ExecutionStatus::Completed);
    assert_eq!(mock.call_count(), 3);

    let row = store.get_execution(job.execution_id).await.unwrap();
    assert_eq!(row.status, "COMPLETED");
    assert!(row.completed_at.is_some());
    assert!(row.error.is_none());

    let output = output_of(&row);
    let logs = logs_of(&row);
    assert_eq!(output.len(), 3);
    assert_eq!(logs.len(), 3);
    for log in &logs {
        assert_eq!(log["status"], "completed");
        assert!(log["time_taken_ms"].is_u64());
    }
    assert_eq!(logs[0]["step_id"], "s1");
    assert_eq!(logs[2]["step_id"], "s3");
}

#[tokio::test]
async fn failing_step_aborts_the_rest_and_pins_the_error() {
    let store = Arc::new(MemoryStore::new());
    let ok = MockHandler::returning("ok", json!({"ok": true}));
    let boom = MockHandler::failing("boom", "widget jammed");
    let registry = registry_of(vec![
        (StepKind::ExternalAction, ok.clone() as Arc<dyn StepHandler>),
        (StepKind::Webhook, boom.clone() as Arc<dyn StepHandler>),
    ]);
    let runner = runner_with(&store, registry);

    let job = job_for(
        &store,
        vec![
            external_step("s1", "first"),
            webhook_step("s2", "https://example.com"),
            external_step("s3", "never"),
        ],
        json!({}),
    )
    .await;

    let status = runner.run(&job).await.unwrap();
    assert_eq!(status, ExecutionStatus::Failed);

    // Step three never ran: the ok handler saw only step one.
    assert_eq!(ok.call_count(), 1);
    assert_eq!(boom.call_count(), 1);

    let row = store.get_execution(job.execution_id).await.unwrap();
    assert_eq!(row.status, "FAILED");
    assert!(row.completed_at.is_some());

    let expected = StepError::Config("widget jammed".into()).to_string();
    assert_eq!(row.error.as_deref(), Some(expected.as_str()));

    let logs = logs_of(&row);
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0]["status"], "completed");
    assert_eq!(logs[1]["status"], "failed");
    assert_eq!(logs[1]["error"], expected);
    assert!(row.output.is_none());
}

#[tokio::test]
async fn unregistered_step_kind_fails_the_run_with_no_log_entries() {
    let store = Arc::new(MemoryStore::new());
    let registry = registry_of(vec![(
        StepKind::ExternalAction,
        MockHandler::returning("ok", json!({})) as Arc<dyn StepHandler>,
    )]);
    let runner = runner_with(&store, registry);

    let job = job_for(
        &store,
        vec![webhook_step("s1", "https://example.com")],
        json!({}),
    )
    .await;

    let status = runner.run(&job).await.unwrap();
    assert_eq!(status, ExecutionStatus::Failed);

    let row = store.get_execution(job.execution_id).await.unwrap();
    assert_eq!(row.status, "FAILED");
    // Dispatch failed before the step was invoked: nothing was logged.
    assert!(logs_of(&row).is_empty());
    assert_eq!(row.error.as_deref(), Some("unknown step type 'webhook'"));
}

#[tokio::test]
async fn configuration_interpolates_input_and_prior_step_results() {
    let store = Arc::new(MemoryStore::new());
    let echo = MockHandler::echoing("echo");
    let registry = registry_of(vec![(StepKind::ExternalAction, echo.clone() as Arc<dyn StepHandler>)]);
    let runner = runner_with(&store, registry);

    let job = job_for(
        &store,
        vec![
            external_step("s1", "{{greeting}}"),
            external_step("s2", "{{s1}}"),
        ],
        json!({"greeting": "hello"}),
    )
    .await;

    runner.run(&job).await.unwrap();

    let row = store.get_execution(job.execution_id).await.unwrap();
    let output = output_of(&row);

    // Step one saw the input field.
    assert_eq!(output[0]["config"]["action"], "hello");
    // Step two saw step one's whole result, rendered as compact JSON.
    let chained = output[1]["config"]["action"].as_str().unwrap();
    assert!(chained.contains("hello"), "got: {chained}");
}

#[tokio::test]
async fn notifier_observes_running_then_terminal_transitions() {
    let store = Arc::new(MemoryStore::new());
    let (notifier, mut events) = ChannelNotifier::new();
    let registry = registry_of(vec![(
        StepKind::ExternalAction,
        MockHandler::returning("ok", json!({})) as Arc<dyn StepHandler>,
    )]);
    let runner = ExecutionRunner::new(store.clone(), registry, Arc::new(notifier));

    let job = job_for(&store, vec![external_step("s1", "ping")], json!({})).await;
    runner.run(&job).await.unwrap();

    let first = events.recv().await.unwrap();
    assert_eq!(first.status, ExecutionStatus::Running);
    assert_eq!(first.execution_id, job.execution_id);

    let second = events.recv().await.unwrap();
    assert_eq!(second.status, ExecutionStatus::Completed);
    assert!(second.payload.is_some());
}

#[tokio::test]
async fn generation_step_appends_exactly_one_usage_row() {
    let store = Arc::new(MemoryStore::new());
    let mut providers: steps::provider::ProviderMap = HashMap::new();
    providers.insert(
        ProviderKind::OpenAi,
        Arc::new(StaticProvider::default()) as Arc<dyn steps::GenerationProvider>,
    );
    let registry = builtin_registry(
        providers,
        Arc::new(StoreUsageRecorder::new(store.clone())),
        UsagePolicy::Required,
        reqwest::Client::new(),
        None,
    );
    let runner = runner_with(&store, registry);

    let job = job_for(&store, vec![generation_step("gen", "Say hi")], json!({})).await;
    let status = runner.run(&job).await.unwrap();
    assert_eq!(status, ExecutionStatus::Completed);

    let row = store.get_execution(job.execution_id).await.unwrap();
    let output = output_of(&row);
    assert!(!output[0]["content"].as_str().unwrap().is_empty());

    let usage = store.usage_rows();
    assert_eq!(usage.len(), 1);
    assert_eq!(usage[0].user_id, job.user_id);
    assert_eq!(usage[0].action, "generation");
    assert_eq!(usage[0].tokens, output[0]["tokens_used"].as_i64().unwrap());
    assert_eq!(usage[0].cost, output[0]["cost"].as_f64().unwrap());
}

// ---------------------------------------------------------------------------
// Submission service
// ---------------------------------------------------------------------------

async fn seeded_workflow(store: &Arc<MemoryStore>, steps: Vec<Step>) -> (Uuid, Uuid) {
    let user_id = Uuid::new_v4();
    let definition = json!({
        "steps": steps,
        "triggers": [{ "type": "manual" }]
    });
    let row = store
        .create_workflow("demo", user_id, false, definition)
        .await
        .unwrap();
    (row.id, user_id)
}

#[tokio::test]
async fn submitting_an_unknown_workflow_is_rejected_synchronously() {
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
    let (producer, _consumer) = queue::channel();
    let submitter = Submitter::new(store, producer);

    let result = submitter
        .submit(Uuid::new_v4(), Uuid::new_v4(), json!({}))
        .await;

    assert!(matches!(
        result,
        Err(EngineError::Store(store::StoreError::NotFound))
    ));
}

#[tokio::test]
async fn submit_returns_pending_and_enqueues_one_snapshot_job() {
    let store = Arc::new(MemoryStore::new());
    let (producer, consumer) = queue::channel();
    let submitter = Submitter::new(store.clone(), producer);

    let (workflow_id, user_id) = seeded_workflow(
        &store,
        vec![external_step("s1", "ping"), external_step("s2", "pong")],
    )
    .await;

    let execution = submitter
        .submit(workflow_id, user_id, json!({"k": "v"}))
        .await
        .unwrap();
    assert_eq!(execution.status, "PENDING");

    let job = consumer.recv().await.unwrap();
    assert_eq!(job.execution_id, execution.id);
    assert_eq!(job.steps.len(), 2);
    assert_eq!(job.input, json!({"k": "v"}));

    let journal = store.job_rows();
    assert_eq!(journal.len(), 1);
    assert_eq!(journal[0].status, "pending");
}

#[tokio::test]
async fn stored_definition_with_a_cycle_is_rejected_at_submit() {
    let store = Arc::new(MemoryStore::new());
    let (producer, _consumer) = queue::channel();
    let submitter = Submitter::new(store.clone(), producer);

    let mut a = external_step("a", "x");
    a.depends_on = vec!["b".into()];
    let mut b = external_step("b", "y");
    b.depends_on = vec!["a".into()];
    let (workflow_id, user_id) = seeded_workflow(&store, vec![a, b]).await;

    let result = submitter.submit(workflow_id, user_id, json!({})).await;
    assert!(matches!(result, Err(EngineError::DependencyCycle)));
}

#[tokio::test]
async fn stored_definition_with_unknown_type_tag_is_a_definition_error() {
    let store = Arc::new(MemoryStore::new());
    let (producer, _consumer) = queue::channel();
    let submitter = Submitter::new(store.clone(), producer);

    let row = store
        .create_workflow(
            "stale",
            Uuid::new_v4(),
            false,
            json!({"steps": [{"id": "s1", "type": "teleport", "config": {}}]}),
        )
        .await
        .unwrap();

    let result = submitter.submit(row.id, Uuid::new_v4(), json!({})).await;
    assert!(matches!(result, Err(EngineError::Definition(_))));
}

#[tokio::test]
async fn recover_reenqueues_journalled_pending_jobs_once() {
    let store = Arc::new(MemoryStore::new());

    // First process life: submit, but no worker ever picks the job up.
    let (producer, consumer) = queue::channel();
    let submitter = Submitter::new(store.clone(), producer);
    let (workflow_id, user_id) = seeded_workflow(&store, vec![external_step("s1", "ping")]).await;
    let execution = submitter.submit(workflow_id, user_id, json!({})).await.unwrap();
    drop(submitter);
    drop(consumer);

    // Restart: a fresh queue sees the journalled job exactly once.
    let (producer, consumer) = queue::channel();
    let submitter = Submitter::new(store.clone(), producer);
    let recovered = submitter.recover().await.unwrap();
    assert_eq!(recovered, 1);

    let job = consumer.recv().await.unwrap();
    assert_eq!(job.execution_id, execution.id);
}

// ---------------------------------------------------------------------------
// End-to-end through queue + workers
// ---------------------------------------------------------------------------

#[tokio::test]
async fn two_step_workflow_completes_end_to_end() {
    let store = Arc::new(MemoryStore::new());

    let mut providers: steps::provider::ProviderMap = HashMap::new();
    providers.insert(
        ProviderKind::OpenAi,
        Arc::new(StaticProvider::default()) as Arc<dyn steps::GenerationProvider>,
    );
    let mut registry = builtin_registry(
        providers,
        Arc::new(StoreUsageRecorder::new(store.clone())),
        UsagePolicy::Required,
        reqwest::Client::new(),
        None,
    );
    // Keep the scenario offline: stub the webhook delivery.
    registry.insert(
        StepKind::Webhook,
        MockHandler::returning("hook", json!({"url": "https://x", "status": 200})),
    );

    let (producer, consumer) = queue::channel();
    let runner = Arc::new(ExecutionRunner::new(
        store.clone(),
        registry,
        Arc::new(NoopNotifier),
    ));
    let handles = spawn_workers(1, consumer, runner, store.clone());

    let submitter = Submitter::new(store.clone(), producer);
    let (workflow_id, user_id) = seeded_workflow(
        &store,
        vec![
            generation_step("s1", "Say hi"),
            webhook_step("s2", "https://x"),
        ],
    )
    .await;

    let execution = submitter.submit(workflow_id, user_id, json!({})).await.unwrap();
    let row = wait_terminal(&store, execution.id).await;

    assert_eq!(row.status, "COMPLETED");
    let output = output_of(&row);
    assert_eq!(output.len(), 2);
    assert!(!output[0]["content"].as_str().unwrap().is_empty());
    assert_eq!(output[1]["status"], 200);

    // Close the queue and drain the pool before checking the journal.
    drop(submitter);
    for handle in handles {
        handle.await.unwrap();
    }
    assert!(store.job_rows().iter().all(|j| j.status == "completed"));
}

/// A handler slow enough that two workers overlap.
struct SlowEcho;

#[async_trait]
impl StepHandler for SlowEcho {
    async fn process(&self, action: &StepAction, _ctx: &StepContext) -> Result<Value, StepError> {
        tokio::time::sleep(Duration::from_millis(25)).await;
        serde_json::to_value(action).map_err(|e| StepError::Config(e.to_string()))
    }
}

#[tokio::test]
async fn concurrent_executions_do_not_observe_each_others_context() {
    let store = Arc::new(MemoryStore::new());
    let registry = registry_of(vec![(
        StepKind::ExternalAction,
        Arc::new(SlowEcho) as Arc<dyn StepHandler>,
    )]);

    let (producer, consumer) = queue::channel();
    let runner = Arc::new(ExecutionRunner::new(
        store.clone(),
        registry,
        Arc::new(NoopNotifier),
    ));
    let _handles = spawn_workers(2, consumer, runner, store.clone());

    let submitter = Submitter::new(store.clone(), producer);
    let (workflow_id, user_id) = seeded_workflow(
        &store,
        vec![external_step("s1", "{{tag}}"), external_step("s2", "{{tag}}")],
    )
    .await;

    let exec_a = submitter
        .submit(workflow_id, user_id, json!({"tag": "alpha"}))
        .await
        .unwrap();
    let exec_b = submitter
        .submit(workflow_id, user_id, json!({"tag": "beta"}))
        .await
        .unwrap();

    let row_a = wait_terminal(&store, exec_a.id).await;
    let row_b = wait_terminal(&store, exec_b.id).await;

    for (row, tag) in [(&row_a, "alpha"), (&row_b, "beta")] {
        assert_eq!(row.status, "COMPLETED");
        for result in output_of(row) {
            assert_eq!(result["config"]["action"], *tag);
        }
    }
}

// ---------------------------------------------------------------------------
// Context accumulator ownership
// ---------------------------------------------------------------------------

#[tokio::test]
async fn context_seeds_do_not_leak_between_runs_of_the_same_runner() {
    let store = Arc::new(MemoryStore::new());
    let echo = MockHandler::echoing("echo");
    let registry = registry_of(vec![(StepKind::ExternalAction, echo.clone() as Arc<dyn StepHandler>)]);
    let runner = runner_with(&store, registry);

    let first = job_for(&store, vec![external_step("s1", "{{seed}}")], json!({"seed": "one"})).await;
    let second = job_for(&store, vec![external_step("s1", "{{seed}}")], json!({})).await;

    runner.run(&first).await.unwrap();
    runner.run(&second).await.unwrap();

    let row = store.get_execution(second.execution_id).await.unwrap();
    // The second run had no "seed" in scope: the placeholder stays verbatim.
    assert_eq!(output_of(&row)[0]["config"]["action"], "{{seed}}");
}

#[test]
fn seeded_context_prefers_step_results_over_input_on_key_collision() {
    let mut ctx = Context::seeded(&json!({"s1": "from-input"}), Uuid::new_v4());
    ctx.insert("s1", json!("from-step"));
    assert_eq!(ctx.render("s1").as_deref(), Some("from-step"));
}
