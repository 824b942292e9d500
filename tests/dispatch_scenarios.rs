//! End-to-end dispatch scenarios against a scripted relay.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use relay_guard::prelude::*;

/// Relay that replays a fixed script of outcomes, one per invocation.
struct ScriptedRelay {
    script: Mutex<VecDeque<Result<Response>>>,
    calls: AtomicU32,
}

type Result<T> = std::result::Result<T, RelayError>;

impl ScriptedRelay {
    fn new(script: Vec<Result<Response>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: AtomicU32::new(0),
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Relay for ScriptedRelay {
    async fn invoke(&self, _operation: &str, _args: &[Value]) -> Result<Response> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(RelayError::Generic {
                    message: "script exhausted".to_string(),
                })
            })
    }
}

fn valid_response() -> Response {
    json!({"SearchHITsResult": {"NumResults": 1}})
        .as_object()
        .cloned()
        .unwrap()
}

fn service_unavailable() -> RelayError {
    RelayError::Fault {
        code: "Server.ServiceUnavailable".to_string(),
    }
}

fn throttled() -> RelayError {
    RelayError::Generic {
        message: "Throttled".to_string(),
    }
}

#[tokio::test(start_paused = true)]
async fn backs_off_twice_then_returns_the_valid_response() {
    let relay = ScriptedRelay::new(vec![
        Err(service_unavailable()),
        Err(service_unavailable()),
        Ok(valid_response()),
    ]);
    let dispatcher = Dispatcher::new(relay.clone());

    let started = tokio::time::Instant::now();
    let outcome = dispatcher.dispatch("searchHITs", vec![]).await.unwrap();

    // delay(1) + delay(2) = 200ms + 400ms with the default budget.
    assert_eq!(started.elapsed(), Duration::from_millis(600));
    assert_eq!(relay.calls(), 3);
    assert!(outcome.response().unwrap().contains_key("SearchHITsResult"));
}

#[tokio::test(start_paused = true)]
async fn persistent_throttling_exhausts_the_budget_and_reraises_the_original() {
    let relay = ScriptedRelay::new(std::iter::repeat_with(|| Err(throttled())).take(7).collect());
    let dispatcher = Dispatcher::new(relay.clone());

    let started = tokio::time::Instant::now();
    let err = dispatcher.dispatch("searchHITs", vec![]).await.unwrap_err();

    // Six backoff sleeps (attempts 1..=6), then attempt 7 fails for good:
    // 0.2 + 0.4 + 0.8 + 1.6 + 3.2 + 6.4 = 12.6s.
    assert_eq!(relay.calls(), 7);
    assert_eq!(started.elapsed(), Duration::from_millis(12_600));
    match err {
        DispatchError::Operation(RelayError::Generic { message }) => {
            assert_eq!(message, "Throttled");
        }
        other => panic!("expected the original generic error, got {other:?}"),
    }
}

#[tokio::test]
async fn validation_failures_fail_without_retrying() {
    let bad = json!({"Unexpected": {}}).as_object().cloned().unwrap();
    let relay = ScriptedRelay::new(vec![
        Err(RelayError::Validation {
            response: bad,
            reason: "no acceptable result tag among: Unexpected".to_string(),
        }),
        Ok(valid_response()),
    ]);
    let dispatcher = Dispatcher::new(relay.clone());

    let err = dispatcher.dispatch("searchHITs", vec![]).await.unwrap_err();
    assert_eq!(relay.calls(), 1);
    assert!(matches!(
        err,
        DispatchError::Operation(RelayError::Validation { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn throttle_embedded_in_a_successful_response_drives_a_backoff_retry() {
    let throttled_response = json!({
        "Errors": {"Error": {"Code": "ServiceUnavailable"}}
    })
    .as_object()
    .cloned()
    .unwrap();
    let relay = ScriptedRelay::new(vec![Ok(throttled_response), Ok(valid_response())]);
    let dispatcher = Dispatcher::new(relay.clone());

    let started = tokio::time::Instant::now();
    let outcome = dispatcher.dispatch("searchHITs", vec![]).await.unwrap();

    assert_eq!(relay.calls(), 2);
    assert_eq!(started.elapsed(), Duration::from_millis(200));
    assert!(!outcome.is_ignored());
}

#[tokio::test]
async fn responses_with_operation_errors_never_reach_the_caller() {
    let error_bearing = json!({
        "OperationRequest": {"Errors": {"Error": {"Code": "AWS.BadClaims"}}},
        "SearchHITsResult": {}
    })
    .as_object()
    .cloned()
    .unwrap();
    let relay = ScriptedRelay::new(vec![Ok(error_bearing)]);
    let dispatcher = Dispatcher::new(relay.clone());

    let err = dispatcher.dispatch("searchHITs", vec![]).await.unwrap_err();
    assert!(matches!(
        err,
        DispatchError::Operation(RelayError::Validation { .. })
    ));
}

#[tokio::test]
async fn transient_failures_on_unretryable_operations_are_unknown_outcomes() {
    let relay = ScriptedRelay::new(vec![Err(RelayError::TransientInfra {
        message: "connection reset".to_string(),
    })]);
    let dispatcher = Dispatcher::new(relay.clone());

    let args = vec![json!({"Title": "label images"})];
    let err = dispatcher
        .dispatch("createHIT", args.clone())
        .await
        .unwrap_err();

    match err {
        DispatchError::UnknownOutcome {
            operation,
            args: wrapped,
            source,
        } => {
            assert_eq!(operation, "createHIT");
            assert_eq!(wrapped, args);
            assert!(matches!(source, RelayError::TransientInfra { .. }));
        }
        other => panic!("expected UnknownOutcome, got {other:?}"),
    }
    assert_eq!(relay.calls(), 1);
}

#[tokio::test]
async fn immediate_retries_exhaust_the_budget_without_sleeping() {
    let relay = ScriptedRelay::new(
        std::iter::repeat_with(|| {
            Err(RelayError::Generic {
                message: "flaky".to_string(),
            })
        })
        .take(10)
        .collect(),
    );
    let dispatcher = Dispatcher::builder(relay.clone())
        .backoff(BackoffPolicy::builder().max_attempts(3).build())
        .build();

    let err = dispatcher.dispatch("getAccountBalance", vec![]).await.unwrap_err();

    // attempts 1..=3 are retried, attempt 4 gives up.
    assert_eq!(relay.calls(), 4);
    match err {
        DispatchError::Operation(RelayError::Generic { message }) => {
            assert_eq!(message, "flaky");
        }
        other => panic!("expected the original generic error, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn custom_signals_flow_end_to_end() {
    // A deployment whose wire format prefixes fault codes and uses a
    // different throttle message.
    let relay = ScriptedRelay::new(vec![
        Err(RelayError::Fault {
            code: "aws:Server.ServiceUnavailable".to_string(),
        }),
        Ok(valid_response()),
    ]);
    let dispatcher = Dispatcher::builder(relay.clone())
        .classifier(
            ErrorClassifier::builder()
                .unavailable_code("aws:Server.ServiceUnavailable")
                .throttled_message("SlowDown")
                .build(),
        )
        .validator(
            ResponseValidator::builder()
                .throttled_message("SlowDown")
                .build(),
        )
        .build();

    let outcome = dispatcher.dispatch("searchHITs", vec![]).await.unwrap();
    assert_eq!(relay.calls(), 2);
    assert!(outcome.response().is_some());
}
