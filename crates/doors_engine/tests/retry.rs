mod common;

use std::time::Duration;

use common::{init_logging, RecordingSink};
use doors_core::RetryPolicy;
use doors_engine::{attempt, Reporter};
use pretty_assertions::assert_eq;

fn attempts_logged(sink: &RecordingSink, description: &str) -> usize {
    sink.log_lines()
        .iter()
        .filter(|line| line.starts_with(&format!("attempting {description}")))
        .count()
}

#[tokio::test]
async fn retries_until_the_operation_succeeds() {
    init_logging();
    let sink = RecordingSink::new();
    let mut failures_left = 2u32;

    let result: Result<&str, String> = attempt(
        "load page",
        RetryPolicy::new(3, Duration::ZERO),
        Reporter::new(&sink),
        &mut failures_left,
        |left| {
            Box::pin(async move {
                if *left > 0 {
                    *left -= 1;
                    Err(format!("not ready ({left} left)"))
                } else {
                    Ok("ready")
                }
            })
        },
    )
    .await;

    assert_eq!(result, Ok("ready"));
    assert_eq!(failures_left, 0);
    assert_eq!(attempts_logged(&sink, "load page"), 3);
    let lines = sink.log_lines();
    assert!(lines.contains(&"attempting load page (try 1/3)".to_string()));
    let retried = "load page failed (attempt 1): not ready (1 left), retrying";
    assert!(lines.contains(&retried.to_string()));
}

#[tokio::test]
async fn gives_up_after_the_last_attempt() {
    init_logging();
    let sink = RecordingSink::new();
    let mut calls = 0u32;

    let result: Result<(), String> = attempt(
        "click submit",
        RetryPolicy::new(4, Duration::ZERO),
        Reporter::new(&sink),
        &mut calls,
        |calls| {
            Box::pin(async move {
                *calls += 1;
                Err("intercepted".to_string())
            })
        },
    )
    .await;

    assert_eq!(result, Err("intercepted".to_string()));
    assert_eq!(calls, 4);
    assert_eq!(attempts_logged(&sink, "click submit"), 4);
    assert_eq!(
        sink.log_lines().last().map(String::as_str),
        Some("click submit failed after 4 attempts: intercepted")
    );
}

#[tokio::test]
async fn zero_attempts_still_tries_once() {
    init_logging();
    let sink = RecordingSink::new();
    let mut calls = 0u32;

    let result: Result<u32, String> = attempt(
        "probe",
        RetryPolicy::new(0, Duration::ZERO),
        Reporter::new(&sink),
        &mut calls,
        |calls| {
            Box::pin(async move {
                *calls += 1;
                Ok(*calls)
            })
        },
    )
    .await;

    assert_eq!(result, Ok(1));
    assert_eq!(attempts_logged(&sink, "probe"), 1);
}
