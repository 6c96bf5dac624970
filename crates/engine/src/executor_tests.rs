//! Scheduler-level tests for the workflow execution engine.
//!
//! Every test drives a full run through `WorkflowExecutor::run` with
//! `MockAction` (or an `ActionRegistry` of mocks) standing in for the
//! side-effecting actions.

use std::collections::BTreeMap;
use std::sync::Arc;

use actions::{mock::MockAction, ActionExecutor, ActionRegistry};
use serde_json::json;

use crate::{
    dag::DependencyGraph,
    error::EngineError,
    executor::{ExecutorConfig, RunOptions, WorkflowExecutor},
    logger::LogLevel,
    models::{
        ConditionOperator, Connection, ExtractMode, ExtractNode, LogicOperator, Node,
        ParameterValue, Workflow,
    },
    state::{ExecutionResult, NodeExecutionState},
};

type Event = (String, NodeExecutionState);

fn executor(actions: impl ActionExecutor + 'static) -> WorkflowExecutor {
    WorkflowExecutor::new(Arc::new(actions), ExecutorConfig::default())
}

fn ignore(_: &str, _: &NodeExecutionState) -> anyhow::Result<()> {
    Ok(())
}

/// Run `workflow` and collect every state change in callback order.
async fn run_recorded(
    executor: &WorkflowExecutor,
    workflow: &Workflow,
    options: RunOptions,
) -> (ExecutionResult, Vec<Event>) {
    let mut events = Vec::new();
    let result = executor
        .run(workflow, options, |id: &str, state: &NodeExecutionState| {
            events.push((id.to_owned(), state.clone()));
            Ok(())
        })
        .await;
    (result, events)
}

fn send(id: &str) -> Node {
    Node::execute(id, "send", BTreeMap::new())
}

fn always_true(id: &str) -> Node {
    Node::condition(
        id,
        ParameterValue::literal("1"),
        ConditionOperator::Eq,
        ParameterValue::literal("1"),
    )
}

fn condition(id: &str, left: &str, operator: ConditionOperator, right: &str) -> Node {
    Node::condition(
        id,
        ParameterValue::literal(left),
        operator,
        ParameterValue::literal(right),
    )
}

fn success(text: &str) -> NodeExecutionState {
    NodeExecutionState::Success(text.into())
}

fn skipped() -> NodeExecutionState {
    NodeExecutionState::Skipped("condition not met".into())
}

// ============================================================
// Graph construction
// ============================================================

#[test]
fn graph_build_is_deterministic() {
    let workflow = Workflow::new(
        "w",
        "w",
        vec![
            Node::trigger("t", "manual"),
            send("a"),
            Node::execute(
                "b",
                "send",
                BTreeMap::from([("body".to_string(), ParameterValue::reference("a"))]),
            ),
        ],
        vec![Connection::new("t", "a"), Connection::new("t", "b")],
    );
    assert_eq!(DependencyGraph::build(&workflow), DependencyGraph::build(&workflow));
}

// ============================================================
// Happy path and ordering
// ============================================================

#[tokio::test]
async fn linear_chain_runs_every_node_in_order() {
    let mock = MockAction::returning("ok");
    let executor = executor(mock.clone());
    let workflow = Workflow::new(
        "linear",
        "Linear",
        vec![Node::trigger("t", "manual"), send("a"), send("b"), send("c")],
        vec![
            Connection::new("t", "a"),
            Connection::new("a", "b"),
            Connection::new("b", "c"),
        ],
    );

    let (result, events) = run_recorded(&executor, &workflow, RunOptions::manual()).await;

    assert!(result.success, "{}", result.message);
    assert_eq!(result.message, "Workflow executed successfully");
    for id in ["a", "b", "c"] {
        assert_eq!(result.state(id), Some(&success("ok")));
    }
    assert_eq!(mock.call_count(), 3);

    let expected: Vec<Event> = vec![
        ("t".into(), success("{}")),
        ("a".into(), NodeExecutionState::Running),
        ("a".into(), success("ok")),
        ("b".into(), NodeExecutionState::Running),
        ("b".into(), success("ok")),
        ("c".into(), NodeExecutionState::Running),
        ("c".into(), success("ok")),
    ];
    assert_eq!(events, expected);
}

#[tokio::test]
async fn result_carries_run_metadata() {
    let executor = executor(MockAction::returning("ok"));
    let workflow = Workflow::new(
        "wf-7",
        "Nightly",
        vec![Node::trigger("t", "manual")],
        vec![],
    );

    let result = executor.run(&workflow, RunOptions::for_trigger("t"), ignore).await;

    assert!(result.success);
    assert_eq!(result.workflow_id, "wf-7");
    assert_eq!(result.workflow_name, "Nightly");
    assert_eq!(result.trigger_node_id.as_deref(), Some("t"));
    assert!(result.finished_at >= result.started_at);
    assert!(!result.log.is_empty());
}

#[tokio::test]
async fn reference_edges_order_nodes_without_connections() {
    let mock = MockAction::returning("payload");
    let executor = executor(mock.clone());
    // `b` is declared first but reads `a`, so `a` must run before it.
    let workflow = Workflow::new(
        "w",
        "w",
        vec![
            Node::trigger("t", "manual"),
            Node::execute(
                "b",
                "send",
                BTreeMap::from([("body".to_string(), ParameterValue::reference("a"))]),
            ),
            send("a"),
        ],
        vec![Connection::new("t", "a")],
    );

    let result = executor.run(&workflow, RunOptions::manual(), ignore).await;

    assert!(result.success, "{}", result.message);
    let calls = mock.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].parameters.is_empty());
    assert_eq!(calls[1].parameters[0].value, "payload");
}

#[tokio::test]
async fn extras_become_the_trigger_payload() {
    let executor = executor(MockAction::returning("unused"));
    let workflow = Workflow::new(
        "w",
        "w",
        vec![
            Node::trigger("t", "manual"),
            Node::extract(
                "user",
                ExtractNode {
                    mode: ExtractMode::Json,
                    source: ParameterValue::reference("t"),
                    expression: "user".into(),
                    default_value: "nobody".into(),
                    ..ExtractNode::default()
                },
            ),
        ],
        vec![Connection::new("t", "user")],
    );

    let options = RunOptions::manual()
        .with_extra("user", "ada")
        .with_extra("attempt", "2");
    let result = executor.run(&workflow, options, ignore).await;

    assert_eq!(result.state("t"), Some(&success(r#"{"attempt":"2","user":"ada"}"#)));
    assert_eq!(result.state("user"), Some(&success("ada")));
}

// ============================================================
// Structural errors
// ============================================================

#[tokio::test]
async fn cycle_aborts_before_any_node_runs() {
    let mock = MockAction::returning("ok");
    let executor = executor(mock.clone());
    let workflow = Workflow::new(
        "cyclic",
        "Cyclic",
        vec![Node::trigger("t", "manual"), send("a"), send("b"), send("c")],
        vec![
            Connection::new("t", "a"),
            Connection::new("a", "b"),
            Connection::new("b", "c"),
            Connection::new("c", "a"),
        ],
    );

    let (result, events) = run_recorded(&executor, &workflow, RunOptions::manual()).await;

    assert!(!result.success);
    assert_eq!(result.message, EngineError::CycleDetected.to_string());
    assert!(events.iter().all(|(_, s)| *s != NodeExecutionState::Running));
    assert!(["a", "b", "c"].iter().all(|id| result.state(id).is_none()));
    assert_eq!(mock.call_count(), 0);
    assert!(result.log.iter().any(|e| e.level == LogLevel::Error));
}

#[tokio::test]
async fn workflow_without_trigger_is_rejected() {
    let executor = executor(MockAction::returning("ok"));
    let workflow = Workflow::new("w", "w", vec![send("a")], vec![]);

    let result = executor.run(&workflow, RunOptions::manual(), ignore).await;

    assert!(!result.success);
    assert_eq!(result.message, EngineError::NoTriggerNode.to_string());
    assert!(result.node_results.is_empty());
}

#[tokio::test]
async fn trigger_selection_errors() {
    let executor = executor(MockAction::returning("ok"));
    let workflow = Workflow::new(
        "w",
        "w",
        vec![Node::trigger("cron", "schedule"), send("a")],
        vec![Connection::new("cron", "a")],
    );

    let result = executor.run(&workflow, RunOptions::manual(), ignore).await;
    assert_eq!(result.message, EngineError::NoManualTrigger.to_string());

    let result = executor.run(&workflow, RunOptions::for_trigger("nope"), ignore).await;
    assert_eq!(result.message, EngineError::TriggerNotFound("nope".into()).to_string());

    // A non-trigger node cannot be used as the starting point.
    let result = executor.run(&workflow, RunOptions::for_trigger("a"), ignore).await;
    assert_eq!(result.message, EngineError::TriggerNotFound("a".into()).to_string());

    let result = executor.run(&workflow, RunOptions::for_trigger("cron"), ignore).await;
    assert!(result.success, "{}", result.message);
    assert_eq!(result.state("a"), Some(&success("ok")));
}

#[tokio::test]
async fn custom_manual_trigger_type() {
    let config = ExecutorConfig {
        manual_trigger_type: "button".into(),
        ..ExecutorConfig::default()
    };
    let executor = WorkflowExecutor::new(Arc::new(MockAction::returning("ok")), config);
    let workflow = Workflow::new(
        "w",
        "w",
        vec![Node::trigger("press", "button"), Node::trigger("t", "manual"), send("a")],
        vec![Connection::new("press", "a")],
    );

    let result = executor.run(&workflow, RunOptions::manual(), ignore).await;

    assert!(result.success);
    assert!(result.state("press").is_some());
    assert!(result.state("t").is_none());
    assert_eq!(result.state("a"), Some(&success("ok")));
}

// ============================================================
// Failure handling
// ============================================================

fn error_routing_workflow(with_handler_edge: bool) -> Workflow {
    let mut connections = vec![Connection::new("t", "x")];
    if with_handler_edge {
        connections.push(Connection::when("x", "y", "on_error"));
    }
    Workflow::new(
        "routing",
        "Routing",
        vec![
            Node::trigger("t", "manual"),
            Node::execute("x", "", BTreeMap::new()),
            always_true("y"),
        ],
        connections,
    )
}

#[tokio::test]
async fn failure_routed_to_successful_handler_is_handled() {
    let mock = MockAction::returning("unused");
    let executor = executor(mock.clone());

    let result = executor
        .run(&error_routing_workflow(true), RunOptions::manual(), ignore)
        .await;

    assert!(result.success, "{}", result.message);
    assert_eq!(
        result.state("x"),
        Some(&NodeExecutionState::Failed("node 'x' has no action configured".into()))
    );
    assert_eq!(result.state("y"), Some(&success("true")));
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn failure_without_handler_fails_the_run() {
    let executor = executor(MockAction::returning("unused"));

    let result = executor
        .run(&error_routing_workflow(false), RunOptions::manual(), ignore)
        .await;

    assert!(!result.success);
    assert_eq!(result.message, "Workflow execution failed");
    assert!(result.state("x").is_some_and(NodeExecutionState::is_failed));
    // Without the edge `y` is unreachable from the trigger.
    assert!(result.state("y").is_none());
    assert!(result
        .log
        .iter()
        .any(|e| e.level == LogLevel::Warn && e.node_id.as_deref() == Some("x")));
}

#[tokio::test]
async fn failure_does_not_stop_independent_branches() {
    let mut registry = ActionRegistry::new();
    registry
        .register("visit_web", Arc::new(MockAction::failing("page not found")))
        .register("send", Arc::new(MockAction::returning("sent")));
    let executor = executor(registry);
    let workflow = Workflow::new(
        "w",
        "w",
        vec![
            Node::trigger("t", "manual"),
            Node::execute("visit", "visit_web", BTreeMap::new()),
            Node::execute("after_visit", "send", BTreeMap::new()),
            send("notify"),
        ],
        vec![
            Connection::new("t", "visit"),
            Connection::new("visit", "after_visit"),
            Connection::new("t", "notify"),
        ],
    );

    let result = executor.run(&workflow, RunOptions::manual(), ignore).await;

    assert!(!result.success);
    assert_eq!(
        result.state("visit"),
        Some(&NodeExecutionState::Failed("page not found".into()))
    );
    // The plain edge requires a successful source.
    assert_eq!(result.state("after_visit"), Some(&skipped()));
    assert_eq!(result.state("notify"), Some(&success("sent")));
}

#[tokio::test]
async fn unregistered_action_fails_the_node() {
    let executor = executor(ActionRegistry::new());
    let workflow = Workflow::new(
        "w",
        "w",
        vec![Node::trigger("t", "manual"), send("a")],
        vec![Connection::new("t", "a")],
    );

    let result = executor.run(&workflow, RunOptions::manual(), ignore).await;

    assert_eq!(
        result.state("a"),
        Some(&NodeExecutionState::Failed("no action registered for type 'send'".into()))
    );
}

#[tokio::test]
async fn callback_error_aborts_the_run() {
    let mock = MockAction::returning("ok");
    let executor = executor(mock.clone());
    let workflow = Workflow::new(
        "w",
        "w",
        vec![Node::trigger("t", "manual"), send("a"), send("b"), send("c")],
        vec![
            Connection::new("t", "a"),
            Connection::new("a", "b"),
            Connection::new("b", "c"),
        ],
    );

    let result = executor
        .run(&workflow, RunOptions::manual(), |id: &str, state: &NodeExecutionState| {
            if id == "b" && *state == NodeExecutionState::Running {
                anyhow::bail!("progress sink closed");
            }
            Ok(())
        })
        .await;

    assert!(!result.success);
    assert!(result.message.starts_with("workflow execution fault:"));
    assert!(result.message.contains("progress sink closed"));
    assert_eq!(result.state("b"), Some(&NodeExecutionState::Running));
    assert!(result.state("c").is_none());
    assert_eq!(mock.call_count(), 1);
}

// ============================================================
// Gating
// ============================================================

#[tokio::test]
async fn skip_propagates_through_plain_edges() {
    let mock = MockAction::returning("ok");
    let executor = executor(mock.clone());
    let workflow = Workflow::new(
        "w",
        "w",
        vec![
            Node::trigger("t", "manual"),
            condition("check", "1", ConditionOperator::Eq, "2"),
            send("a"),
            send("b"),
        ],
        vec![
            Connection::new("t", "check"),
            Connection::new("check", "a"),
            Connection::new("a", "b"),
        ],
    );

    let (result, events) = run_recorded(&executor, &workflow, RunOptions::manual()).await;

    assert!(result.success, "{}", result.message);
    assert_eq!(result.state("check"), Some(&success("false")));
    assert_eq!(result.state("a"), Some(&skipped()));
    assert_eq!(result.state("b"), Some(&skipped()));
    assert_eq!(mock.call_count(), 0);

    // Gated-out nodes report the skip and never pass through `Running`.
    let after_check: Vec<Event> = events
        .into_iter()
        .skip_while(|(id, state)| !(id == "check" && state.is_terminal()))
        .skip(1)
        .collect();
    assert_eq!(
        after_check,
        vec![("a".to_owned(), skipped()), ("b".to_owned(), skipped())]
    );
}

#[tokio::test]
async fn true_and_false_edges_pick_one_branch() {
    let mock = MockAction::returning("ok");
    let executor = executor(mock.clone());
    let workflow = Workflow::new(
        "w",
        "w",
        vec![
            Node::trigger("t", "manual"),
            condition("big", "10", ConditionOperator::Gt, "9"),
            send("yes"),
            send("no"),
        ],
        vec![
            Connection::new("t", "big"),
            Connection::when("big", "yes", "true"),
            Connection::when("big", "no", "false"),
        ],
    );

    let result = executor.run(&workflow, RunOptions::manual(), ignore).await;

    assert_eq!(result.state("big"), Some(&success("true")));
    assert_eq!(result.state("yes"), Some(&success("ok")));
    assert_eq!(result.state("no"), Some(&skipped()));
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn regex_edges_match_source_text() {
    let mut registry = ActionRegistry::new();
    registry
        .register("ping", Arc::new(MockAction::returning("ok: 200")))
        .register("send", Arc::new(MockAction::returning("sent")));
    let executor = executor(registry);
    let workflow = Workflow::new(
        "w",
        "w",
        vec![
            Node::trigger("t", "manual"),
            Node::execute("ping", "ping", BTreeMap::new()),
            send("matched"),
            send("unmatched"),
            send("broken_pattern"),
        ],
        vec![
            Connection::new("t", "ping"),
            Connection::when("ping", "matched", r"^ok: \d+$"),
            Connection::when("ping", "unmatched", "^error"),
            Connection::when("ping", "broken_pattern", "(unclosed"),
        ],
    );

    let result = executor.run(&workflow, RunOptions::manual(), ignore).await;

    assert!(result.success, "{}", result.message);
    assert_eq!(result.state("matched"), Some(&success("sent")));
    assert_eq!(result.state("unmatched"), Some(&skipped()));
    assert_eq!(result.state("broken_pattern"), Some(&skipped()));
}

#[tokio::test]
async fn skip_marker_output_counts_as_skipped() {
    let mut registry = ActionRegistry::new();
    registry
        .register("maybe", Arc::new(MockAction::returning("__skip__")))
        .register("send", Arc::new(MockAction::returning("sent")));
    let executor = executor(registry);
    let workflow = Workflow::new(
        "w",
        "w",
        vec![
            Node::trigger("t", "manual"),
            Node::execute("maybe", "maybe", BTreeMap::new()),
            send("after"),
        ],
        vec![Connection::new("t", "maybe"), Connection::new("maybe", "after")],
    );

    let result = executor.run(&workflow, RunOptions::manual(), ignore).await;

    assert_eq!(result.state("maybe"), Some(&success("__skip__")));
    assert_eq!(result.state("after"), Some(&skipped()));
}

#[tokio::test]
async fn skipped_reference_reads_as_reason_text() {
    let mock = MockAction::returning("ok");
    let executor = executor(mock.clone());
    let workflow = Workflow::new(
        "w",
        "w",
        vec![
            Node::trigger("t", "manual"),
            condition("never", "a", ConditionOperator::Eq, "b"),
            send("gated"),
            Node::execute(
                "report",
                "send",
                BTreeMap::from([("status".to_string(), ParameterValue::reference("gated"))]),
            ),
        ],
        vec![
            Connection::new("t", "never"),
            Connection::new("never", "gated"),
            Connection::new("t", "report"),
        ],
    );

    let result = executor.run(&workflow, RunOptions::manual(), ignore).await;

    assert!(result.success, "{}", result.message);
    assert_eq!(result.state("gated"), Some(&skipped()));
    let calls = mock.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].parameters[0].value, "condition not met");
}

#[tokio::test]
async fn unstarted_trigger_edges_are_ignored() {
    let executor = executor(MockAction::returning("ok"));
    let workflow = Workflow::new(
        "w",
        "w",
        vec![
            Node::trigger("manual", "manual"),
            Node::trigger("cron", "schedule"),
            send("a"),
            Node::execute(
                "shared",
                "send",
                BTreeMap::from([("input".to_string(), ParameterValue::reference("a"))]),
            ),
            send("cron_only"),
        ],
        vec![
            Connection::new("manual", "a"),
            Connection::new("cron", "shared"),
            Connection::new("cron", "cron_only"),
        ],
    );

    let result = executor.run(&workflow, RunOptions::manual(), ignore).await;

    assert!(result.success, "{}", result.message);
    // The only connection into `shared` comes from a trigger that never
    // started, so `shared` runs ungated.
    assert_eq!(result.state("shared"), Some(&success("ok")));
    assert!(result.state("cron").is_none());
    assert!(result.state("cron_only").is_none());
}

// ============================================================
// Node kinds
// ============================================================

#[tokio::test]
async fn comparison_outcomes() {
    let executor = executor(MockAction::returning("ok"));
    let workflow = Workflow::new(
        "w",
        "w",
        vec![
            Node::trigger("t", "manual"),
            condition("gt", "10", ConditionOperator::Gt, "9"),
            condition("mismatch", "10", ConditionOperator::Gt, "abc"),
            condition("in_json", "b", ConditionOperator::In, r#"["a","b","c"]"#),
            condition("in_mixed", "5", ConditionOperator::In, "a,b,c"),
        ],
        ["gt", "mismatch", "in_json", "in_mixed"]
            .into_iter()
            .map(|id| Connection::new("t", id))
            .collect(),
    );

    let result = executor.run(&workflow, RunOptions::manual(), ignore).await;

    assert_eq!(result.state("gt"), Some(&success("true")));
    assert!(result.state("mismatch").is_some_and(NodeExecutionState::is_failed));
    assert_eq!(result.state("in_json"), Some(&success("true")));
    assert!(result.state("in_mixed").is_some_and(NodeExecutionState::is_failed));
    assert!(!result.success);
}

#[tokio::test]
async fn random_int_with_fixed_value_ignores_range() {
    let executor = executor(MockAction::returning("ok"));
    let fixed = |id: &str| {
        Node::extract(
            id,
            ExtractNode {
                mode: ExtractMode::RandomInt,
                use_fixed: true,
                fixed_value: "42".into(),
                random_min: -5,
                random_max: 5,
                ..ExtractNode::default()
            },
        )
    };
    let collapsed = Node::extract(
        "one",
        ExtractNode {
            mode: ExtractMode::RandomInt,
            random_min: 1,
            random_max: 1,
            ..ExtractNode::default()
        },
    );
    let workflow = Workflow::new(
        "w",
        "w",
        vec![Node::trigger("t", "manual"), fixed("fixed"), collapsed],
        vec![Connection::new("t", "fixed"), Connection::new("t", "one")],
    );

    for _ in 0..10 {
        let result = executor.run(&workflow, RunOptions::manual(), ignore).await;
        assert_eq!(result.state("fixed"), Some(&success("42")));
        assert_eq!(result.state("one"), Some(&success("1")));
    }
}

#[tokio::test]
async fn logic_without_usable_inputs_is_false() {
    let mock = MockAction::returning("ok");
    let executor = executor(mock.clone());
    let workflow = Workflow::new(
        "w",
        "w",
        vec![
            Node::trigger("t", "manual"),
            Node::logic("all", LogicOperator::And),
            send("a"),
        ],
        // The trigger payload `{}` is not boolean-like, so `all` has no inputs.
        vec![Connection::new("t", "all"), Connection::new("all", "a")],
    );

    let result = executor.run(&workflow, RunOptions::manual(), ignore).await;

    assert_eq!(result.state("all"), Some(&success("false")));
    assert_eq!(result.state("a"), Some(&skipped()));
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn logic_combines_condition_results() {
    let executor = executor(MockAction::returning("ok"));
    let workflow = Workflow::new(
        "w",
        "w",
        vec![
            Node::trigger("t", "manual"),
            always_true("c1"),
            condition("c2", "a", ConditionOperator::Eq, "b"),
            Node::logic("and", LogicOperator::And),
            Node::logic("or", LogicOperator::Or),
        ],
        vec![
            Connection::new("t", "c1"),
            Connection::new("t", "c2"),
            Connection::when("c1", "and", "success"),
            Connection::when("c2", "and", "success"),
            Connection::when("c1", "or", "success"),
            Connection::when("c2", "or", "success"),
        ],
    );

    let result = executor.run(&workflow, RunOptions::manual(), ignore).await;

    assert_eq!(result.state("and"), Some(&success("false")));
    assert_eq!(result.state("or"), Some(&success("true")));
}

#[tokio::test]
async fn workflow_document_with_unknown_kind_runs() {
    let workflow: Workflow = serde_json::from_value(json!({
        "id": "doc",
        "name": "From JSON",
        "nodes": [
            { "id": "t", "type": "trigger", "trigger_type": "manual" },
            { "id": "note", "name": "Sticky note", "type": "annotation" },
            {
                "id": "greet",
                "type": "extract",
                "mode": "CONCAT",
                "source": { "type": "static", "value": "Hello, " },
                "others": [{ "type": "reference", "value": "name" }]
            },
            {
                "id": "name",
                "type": "extract",
                "mode": "REGEX",
                "source": { "type": "static", "value": "user=Ada;" },
                "expression": "user=(\\w+)",
                "group": 1
            }
        ],
        "connections": [
            { "id": "c1", "source_node_id": "t", "target_node_id": "note" },
            { "id": "c2", "source_node_id": "t", "target_node_id": "name" }
        ]
    }))
    .unwrap();
    let executor = executor(MockAction::returning("ok"));

    let (result, events) = run_recorded(&executor, &workflow, RunOptions::manual()).await;

    assert!(result.success, "{}", result.message);
    assert_eq!(
        result.state("note"),
        Some(&NodeExecutionState::Skipped("non-execute node".into()))
    );
    assert_eq!(result.state("name"), Some(&success("Ada")));
    assert_eq!(result.state("greet"), Some(&success("Hello, Ada")));

    let position = |id: &str| events.iter().position(|(n, s)| n == id && s.is_terminal());
    assert!(position("name") < position("greet"));
}

#[tokio::test]
async fn long_chain_runs_to_completion() {
    const LENGTH: usize = 50_000;
    let executor = executor(MockAction::returning("unused"));

    let mut nodes = vec![Node::trigger("t", "manual")];
    nodes.extend((0..LENGTH).map(|i| {
        Node::extract(
            format!("n{i}"),
            ExtractNode {
                mode: ExtractMode::Concat,
                source: ParameterValue::literal("step"),
                ..ExtractNode::default()
            },
        )
    }));
    let connections: Vec<Connection> = nodes
        .windows(2)
        .map(|w| Connection::new(w[0].id.as_str(), w[1].id.as_str()))
        .collect();
    let workflow = Workflow::new("long", "Long chain", nodes, connections);

    let result = executor.run(&workflow, RunOptions::manual(), ignore).await;

    assert!(result.success, "{}", result.message);
    assert_eq!(result.node_results.len(), LENGTH + 1);
    assert_eq!(result.state(&format!("n{}", LENGTH - 1)), Some(&success("step")));
}

// ============================================================
// Concurrency
// ============================================================

#[tokio::test]
async fn concurrent_runs_share_nothing() {
    let mock = MockAction::returning("ok");
    let executor = executor(mock.clone());
    let workflow = Workflow::new(
        "w",
        "w",
        vec![Node::trigger("t", "manual"), send("a")],
        vec![Connection::new("t", "a")],
    );

    let (first, second) = tokio::join!(
        executor.run(&workflow, RunOptions::manual().with_extra("n", "1"), ignore),
        executor.run(&workflow, RunOptions::manual().with_extra("n", "2"), ignore),
    );

    assert!(first.success && second.success);
    assert_ne!(first.run_id, second.run_id);
    assert_eq!(first.state("t"), Some(&success(r#"{"n":"1"}"#)));
    assert_eq!(second.state("t"), Some(&success(r#"{"n":"2"}"#)));
    assert_eq!(mock.call_count(), 2);
}
