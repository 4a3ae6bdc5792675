//! Dispatching loaded pipelines to a mock executor

mod helpers;

use helpers::*;
use pipeline_loader::core::load;
use pipeline_loader::execution::{
    DispatchRequest, Dispatcher, JsonLinesExecutor, SchedulingStrategy,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_sequential_dispatch_hands_over_every_step_in_order() {
    let pipeline = load(FIXTURE).unwrap();
    let executor = Arc::new(MockExecutor::new());
    let dispatcher = Dispatcher::with_shared(executor.clone(), SchedulingStrategy::Sequential);

    let report = dispatcher.dispatch_pipeline(&pipeline).await;

    assert!(report.is_success());
    assert_eq!(report.receipts.len(), FIXTURE_STEPS);
    let expected: Vec<String> = pipeline.iter().map(|s| s.label.clone()).collect();
    assert_eq!(executor.received_labels(), expected);
    assert_eq!(executor.max_in_flight(), 1);
}

#[tokio::test]
async fn test_requests_carry_step_parameters() {
    let pipeline = load(FIXTURE).unwrap();
    let executor = Arc::new(MockExecutor::new());
    let dispatcher = Dispatcher::with_shared(executor.clone(), SchedulingStrategy::Sequential);

    dispatcher.dispatch_pipeline(&pipeline).await;

    let received = executor.received();
    let test = &received[1];
    assert_eq!(test.sequence, 1);
    assert_eq!(test.commands, vec!["cargo test --workspace --locked", "cargo test --doc"]);
    assert_eq!(test.constraints["platform"], "x86_64");
    assert!(test.container.privileged);
    assert_eq!(test.container.mounts, vec!["/run", "/tmp:exec"]);
    assert!(test.retry_automatic);
}

#[tokio::test]
async fn test_limited_parallel_respects_limit() {
    let steps: Vec<String> = (0..8)
        .map(|i| step_yaml(&format!("shard-{}", i), "make test"))
        .collect();
    let pipeline = load(&document(&steps)).unwrap();

    let executor = Arc::new(MockExecutor::new().with_delay(Duration::from_millis(20)));
    let dispatcher =
        Dispatcher::with_shared(executor.clone(), SchedulingStrategy::LimitedParallel(3));

    let report = dispatcher.dispatch_pipeline(&pipeline).await;

    assert!(report.is_success());
    assert_eq!(executor.received().len(), 8);
    assert!(executor.max_in_flight() <= 3);
    assert!(executor.max_in_flight() > 1);

    // receipts come back in pipeline order regardless of completion order
    let labels: Vec<&str> = report.receipts.iter().map(|r| r.label.as_str()).collect();
    let expected: Vec<String> = (0..8).map(|i| format!("shard-{}", i)).collect();
    assert_eq!(labels, expected);
}

#[tokio::test]
async fn test_parallel_dispatches_every_request_at_once() {
    let steps: Vec<String> = (0..5)
        .map(|i| step_yaml(&format!("shard-{}", i), "make test"))
        .collect();
    let pipeline = load(&document(&steps)).unwrap();

    let executor = Arc::new(MockExecutor::new().with_delay(Duration::from_millis(20)));
    let dispatcher = Dispatcher::with_shared(executor.clone(), SchedulingStrategy::Parallel);

    let report = dispatcher.dispatch_pipeline(&pipeline).await;

    assert!(report.is_success());
    assert_eq!(report.receipts.len(), 5);
    assert_eq!(executor.max_in_flight(), 5);
}

#[tokio::test]
async fn test_rejected_request_is_reported_not_retried() {
    let yaml = r#"
steps:
  - label: "flaky"
    command: "make"
    retry:
      automatic: true
    agents: { os: linux }
    plugins:
      - docker#v3.0.1: { image: "alpine" }
  - label: "stable"
    command: "make"
    agents: { os: linux }
    plugins:
      - docker#v3.0.1: { image: "alpine" }
"#;
    let pipeline = load(yaml).unwrap();
    let executor = Arc::new(MockExecutor::new().rejecting("flaky"));
    let dispatcher = Dispatcher::with_shared(executor.clone(), SchedulingStrategy::Parallel);

    let report = dispatcher.dispatch_pipeline(&pipeline).await;

    assert!(!report.is_success());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].label, "flaky");
    assert_eq!(report.receipts.len(), 1);
    // exactly one attempt per request, even with automatic retry enabled
    assert_eq!(executor.received().len(), 2);
}

#[tokio::test]
async fn test_json_lines_hand_off_round_trips_requests() {
    let pipeline = load(FIXTURE).unwrap();
    let requests = DispatchRequest::for_pipeline(&pipeline);

    let executor = Arc::new(JsonLinesExecutor::new(Vec::new()));
    let dispatcher = Dispatcher::with_shared(executor.clone(), SchedulingStrategy::Sequential);
    dispatcher.dispatch(requests.clone()).await;
    drop(dispatcher);

    let executor = Arc::try_unwrap(executor).ok().expect("dispatcher released the executor");
    let output = String::from_utf8(executor.into_inner()).unwrap();
    let written: Vec<DispatchRequest> = output
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(written, requests);
}
