//! Process Registry Integration Tests
//!
//! Tests for spawning external processes and killing them at shutdown.
//!
//! # Test Scenarios
//! - Output capture for stdout, stderr and exit status
//! - Non-zero exit is reported, not raised
//! - Fire-and-forget observers
//! - Concurrent processes
//! - Shutdown kills long-running processes
//!
//! Run with: `cargo test -p common --test process_tests`

#![cfg(unix)]

use common::test_utils::{DEFAULT_TEST_TIMEOUT, with_timeout};
use common::{Error, ProcessRegistry};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

fn sh(script: &str) -> Vec<String> {
    vec!["-c".to_string(), script.to_string()]
}

// ============================================================================
// Output Capture Tests
// ============================================================================

#[tokio::test]
async fn test_captures_stdout_and_status() {
    let registry = ProcessRegistry::new();
    let output = with_timeout(
        DEFAULT_TEST_TIMEOUT,
        registry.spawn("sh", &sh("printf 'line one\\nline two\\n'")).wait(),
    )
    .await
    .expect("timed out")
    .expect("process failed");

    assert_eq!(output.stdout, "line one\nline two\n");
    assert!(output.stderr.is_empty());
    assert!(output.success());
}

#[tokio::test]
async fn test_nonzero_exit_still_returns_output() {
    let registry = ProcessRegistry::new();
    let output = registry
        .spawn("sh", &sh("echo partial; echo broken >&2; exit 3"))
        .wait()
        .await
        .expect("non-zero exit must not be an error");

    assert_eq!(output.stdout_lines().collect::<Vec<_>>(), ["partial"]);
    assert_eq!(output.stderr_lines().collect::<Vec<_>>(), ["broken"]);
    assert_eq!(output.status, Some(3));
    assert!(!output.success());
}

#[tokio::test]
async fn test_arguments_are_passed_verbatim() {
    let registry = ProcessRegistry::new();
    let args = vec![
        "-c".to_string(),
        "echo \"$1|$2\"".to_string(),
        "sh".to_string(),
        "--busid".to_string(),
        "1-1.2".to_string(),
    ];
    let output = registry.spawn("sh", &args).wait().await.unwrap();
    assert_eq!(output.stdout.trim_end(), "--busid|1-1.2");
}

// ============================================================================
// Detached Observer Tests
// ============================================================================

#[tokio::test]
async fn test_detached_observer_receives_output() {
    let registry = ProcessRegistry::new();
    let (tx, rx) = oneshot::channel();

    registry.spawn_detached("sh", &sh("echo attached"), move |result| {
        let _ = tx.send(result);
    });

    let result = with_timeout(DEFAULT_TEST_TIMEOUT, rx)
        .await
        .expect("timed out")
        .expect("observer dropped");
    assert_eq!(result.unwrap().stdout.trim_end(), "attached");
}

#[tokio::test]
async fn test_detached_observer_receives_spawn_failure() {
    let registry = ProcessRegistry::new();
    let (tx, rx) = oneshot::channel();

    registry.spawn_detached("/nonexistent/usbipd", &[], move |result| {
        let _ = tx.send(result);
    });

    let result = rx.await.expect("observer dropped");
    assert!(matches!(result, Err(Error::Tool(_))));
}

// ============================================================================
// Concurrency and Shutdown Tests
// ============================================================================

#[tokio::test]
async fn test_concurrent_processes_run_in_parallel() {
    let registry = ProcessRegistry::new();
    let started = Instant::now();

    let tasks: Vec<_> = (0..4)
        .map(|i| registry.spawn("sh", &sh(&format!("sleep 0.3; echo {}", i))))
        .collect();

    for (i, task) in tasks.into_iter().enumerate() {
        let output = task.wait().await.unwrap();
        assert_eq!(output.stdout.trim_end(), i.to_string());
    }

    assert!(started.elapsed() < Duration::from_millis(1200));
}

#[tokio::test]
async fn test_finished_processes_leave_registry() {
    let registry = ProcessRegistry::new();
    registry.spawn("sh", &sh("true")).wait().await.unwrap();

    // The task may need one more poll to be reaped after its output was sent.
    let drained = with_timeout(DEFAULT_TEST_TIMEOUT, async {
        while registry.in_flight() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(drained.is_ok());
}

#[tokio::test]
async fn test_shutdown_kills_running_processes() {
    let registry = ProcessRegistry::new();
    let long_running = registry.spawn("sh", &sh("sleep 30"));
    registry.spawn_detached("sh", &sh("sleep 30"), |_| {
        panic!("observer must not run for a killed process");
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(registry.in_flight(), 2);

    let killed = with_timeout(DEFAULT_TEST_TIMEOUT, registry.shutdown())
        .await
        .expect("shutdown hung");
    assert_eq!(killed, 2);
    assert_eq!(registry.in_flight(), 0);

    let result = long_running.wait().await;
    assert!(matches!(result, Err(Error::Tool(_))));
}

#[tokio::test]
async fn test_clones_share_registry() {
    let registry = ProcessRegistry::new();
    let clone = registry.clone();
    let _task = clone.spawn("sh", &sh("sleep 30"));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(registry.in_flight(), 1);
    assert_eq!(registry.shutdown().await, 1);
}
