//! End-to-end group-by jobs through the bridge and the local graph computer

mod common;

use common::{bridged, group_by_label, local_computer, modern_graph, run};
use pregel_bridge::app::EngineConfig;
use pregel_bridge::computer::{ComputerError, LocalGraphComputer};
use pregel_bridge::process::step::{GroupByStep, HasStep, InjectStep, VertexProgramStep};
use pregel_bridge::process::{
    Lambda, LambdaRegistry, PipelineError, StepError, StrategyError,
};
use pregel_bridge::structure::{Graph, Vertex};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn sorted(value: &Value) -> Vec<Value> {
    let mut items = value.as_array().expect("array").clone();
    items.sort_by_key(|v| v.to_string());
    items
}

#[test]
fn test_count_by_label() {
    let lambdas = LambdaRegistry::with_builtins();
    let mut pipeline = bridged(modern_graph(), local_computer(3, lambdas.clone()))
        .then(group_by_label(&lambdas, "g1").with_reduce_fn(lambdas.resolve("count").unwrap()))
        .unwrap();

    let result = run(&mut pipeline).unwrap();

    assert_eq!(result.vertices.len(), 6);
    assert_eq!(
        pipeline.side_effects().get("g1"),
        Some(json!({"person": 4, "software": 2}))
    );
    assert_eq!(result.side_effects.get("g1"), pipeline.side_effects().get("g1"));
}

#[test]
fn test_concatenation_without_reduce_fn() {
    let lambdas = LambdaRegistry::with_builtins();
    let mut pipeline = bridged(modern_graph(), local_computer(2, lambdas.clone()))
        .then(
            group_by_label(&lambdas, "names")
                .with_value_fn(lambdas.resolve("property:name").unwrap()),
        )
        .unwrap();

    run(&mut pipeline).unwrap();

    let groups = pipeline.side_effects().get("names").unwrap();
    assert_eq!(
        sorted(&groups["person"]),
        vec![json!("josh"), json!("marko"), json!("peter"), json!("vadas")]
    );
    assert_eq!(sorted(&groups["software"]), vec![json!("lop"), json!("ripple")]);
}

#[test]
fn test_default_value_is_whole_vertex() {
    let lambdas = LambdaRegistry::with_builtins();
    let mut pipeline = bridged(modern_graph(), local_computer(1, lambdas.clone()))
        .then(HasStep::new("name", "lop"))
        .and_then(|p| p.then(group_by_label(&lambdas, "g1")))
        .unwrap();

    run(&mut pipeline).unwrap();

    let groups = pipeline.side_effects().get("g1").unwrap();
    assert_eq!(
        groups,
        json!({"software": [{"id": 3, "label": "software", "properties": {"name": "lop", "lang": "java"}}]})
    );
}

#[test]
fn test_filter_before_grouping() {
    let lambdas = LambdaRegistry::with_builtins();
    let mut pipeline = bridged(modern_graph(), local_computer(4, lambdas.clone()))
        .then(HasStep::new("lang", "java"))
        .and_then(|p| {
            p.then(
                GroupByStep::new("g1", lambdas.resolve("property:lang").unwrap())
                    .with_value_fn(lambdas.resolve("id").unwrap())
                    .with_reduce_fn(lambdas.resolve("sum").unwrap()),
            )
        })
        .unwrap();

    run(&mut pipeline).unwrap();

    assert_eq!(pipeline.side_effects().get("g1"), Some(json!({"java": 8})));
}

#[test]
fn test_two_aggregations_publish_separately() {
    let lambdas = LambdaRegistry::with_builtins();
    let mut pipeline = bridged(modern_graph(), local_computer(2, lambdas.clone()))
        .then(group_by_label(&lambdas, "byLabel").with_reduce_fn(lambdas.resolve("count").unwrap()))
        .and_then(|p| {
            p.then(
                GroupByStep::new("ages", lambdas.resolve("label").unwrap())
                    .with_side_effect_key("maxAge")
                    .with_value_fn(lambdas.resolve("property:age").unwrap())
                    .with_reduce_fn(lambdas.resolve("max").unwrap()),
            )
        })
        .unwrap();

    run(&mut pipeline).unwrap();

    assert_eq!(
        pipeline.side_effects().get("byLabel"),
        Some(json!({"person": 4, "software": 2}))
    );
    assert_eq!(pipeline.side_effects().get("maxAge").unwrap()["person"], json!(35));
}

#[test]
fn test_existing_side_effects_survive() {
    let lambdas = LambdaRegistry::with_builtins();
    let mut pipeline = bridged(modern_graph(), local_computer(2, lambdas.clone()))
        .then(group_by_label(&lambdas, "g1").with_reduce_fn(lambdas.resolve("count").unwrap()))
        .unwrap();
    pipeline.side_effects().set("seed", json!("kept"));

    let result = run(&mut pipeline).unwrap();

    assert_eq!(result.side_effects.get("seed"), Some(json!("kept")));
    assert_eq!(pipeline.side_effects().get("seed"), Some(json!("kept")));
    assert!(pipeline.side_effects().contains("g1"));
}

#[test]
fn test_reduce_fn_rebound_on_workers() {
    let mut lambdas = LambdaRegistry::with_builtins();
    lambdas.register(Lambda::new("total_age", |v| {
        json!(v
            .as_array()
            .map(|items| items.iter().filter_map(Value::as_i64).sum::<i64>())
            .unwrap_or(0))
    }));

    let mut pipeline = bridged(modern_graph(), local_computer(3, lambdas.clone()))
        .then(HasStep::new("name", "marko").with_label("marko"))
        .and_then(|p| {
            p.then(
                group_by_label(&lambdas, "g1")
                    .with_value_fn(lambdas.resolve("property:age").unwrap())
                    .with_reduce_fn(lambdas.resolve("total_age").unwrap()),
            )
        })
        .unwrap();

    run(&mut pipeline).unwrap();

    assert_eq!(pipeline.side_effects().get("g1"), Some(json!({"person": 29})));
}

#[test]
fn test_lambda_unknown_to_workers_fails_the_job() {
    let mut client_lambdas = LambdaRegistry::with_builtins();
    client_lambdas.register(Lambda::new("local_only", |v| v.clone()));

    let mut pipeline = bridged(
        modern_graph(),
        local_computer(2, LambdaRegistry::with_builtins()),
    )
    .then(group_by_label(&client_lambdas, "g1").with_reduce_fn(client_lambdas.resolve("local_only").unwrap()))
    .unwrap();

    let err = run(&mut pipeline).unwrap_err();

    match err {
        StepError::JobSubmissionFailure { source } => assert!(matches!(
            source,
            ComputerError::Pipeline(PipelineError::UnknownLambda(ref name)) if name == "local_only"
        )),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!pipeline.side_effects().contains("g1"));
}

#[test]
fn test_pull_twice() {
    let lambdas = LambdaRegistry::with_builtins();
    let mut pipeline = bridged(modern_graph(), local_computer(2, lambdas.clone()))
        .then(group_by_label(&lambdas, "g1"))
        .unwrap();
    pipeline.apply_strategies().unwrap();
    let bridge = pipeline.step_mut::<VertexProgramStep>().unwrap();

    assert!(bridge.pull().is_ok());
    assert!(matches!(bridge.pull(), Err(StepError::IterationExhausted)));
}

#[test]
fn test_inject_rejected_before_submission() {
    let lambdas = LambdaRegistry::with_builtins();
    let mut pipeline = bridged(modern_graph(), local_computer(1, lambdas.clone()))
        .then(InjectStep::new(vec![json!(1)]))
        .and_then(|p| p.then(group_by_label(&lambdas, "g1")))
        .unwrap();

    let err = pipeline.apply_strategies().unwrap_err();

    match err {
        StrategyError::Wrap(inner) => assert!(matches!(
            *inner,
            StepError::Strategy(StrategyError::Verification { .. })
        )),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_duplicate_labels_rejected() {
    let lambdas = LambdaRegistry::with_builtins();
    let err = bridged(modern_graph(), local_computer(1, lambdas.clone()))
        .then(group_by_label(&lambdas, "g1"))
        .and_then(|p| p.then(HasStep::new("name", "marko").with_label("g1")))
        .unwrap_err();

    assert!(matches!(err, PipelineError::DuplicateLabel(ref label) if label == "g1"));
}

#[test]
fn test_sum_past_i64_range() {
    let lambdas = LambdaRegistry::with_builtins();
    let graph = Graph::from_vertices(vec![
        Vertex::new(1, "person").with_property("w", i64::MAX),
        Vertex::new(2, "person").with_property("w", 1),
    ])
    .unwrap();
    let mut pipeline = bridged(Arc::new(graph), local_computer(2, lambdas.clone()))
        .then(
            group_by_label(&lambdas, "g1")
                .with_value_fn(lambdas.resolve("property:w").unwrap())
                .with_reduce_fn(lambdas.resolve("sum").unwrap()),
        )
        .unwrap();

    run(&mut pipeline).unwrap();

    let total = pipeline.side_effects().get("g1").unwrap()["person"].clone();
    assert_eq!(total.as_f64(), Some(i64::MAX as f64 + 1.0));
}

#[test]
fn test_reduce_partitions_bounded_by_workers() {
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let mut lambdas = LambdaRegistry::with_builtins();
    let (r, p) = (Arc::clone(&running), Arc::clone(&peak));
    lambdas.register(Lambda::new("slow_count", move |values: &Value| {
        let now = r.fetch_add(1, Ordering::SeqCst) + 1;
        p.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(20));
        r.fetch_sub(1, Ordering::SeqCst);
        json!(values.as_array().map_or(0, Vec::len))
    }));

    let config = EngineConfig::default()
        .with_workers(2)
        .with_reduce_partitions(6);
    let computer = Arc::new(LocalGraphComputer::new(config, lambdas.clone()).unwrap());
    let mut pipeline = bridged(modern_graph(), computer)
        .then(
            GroupByStep::new("g1", lambdas.resolve("id").unwrap())
                .with_reduce_fn(lambdas.resolve("slow_count").unwrap()),
        )
        .unwrap();

    run(&mut pipeline).unwrap();

    let groups = pipeline.side_effects().get("g1").unwrap();
    assert_eq!(groups.as_object().map(|g| g.len()), Some(6));
    assert!(peak.load(Ordering::SeqCst) <= 2);
}
