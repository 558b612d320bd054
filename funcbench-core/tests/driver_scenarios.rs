// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! End-to-end driver scenarios with scripted client and hook doubles.
//!
//! These tests verify the complete run flow: probe, warm-up bracketing,
//! measured-phase markers, failure policy, and resource release.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use funcbench_core::{
    ClientError, Driver, FunctionClient, InvokerError, Reply, Request, RunConfig, RunPhase,
    SimulatorHook,
};

/// Everything the doubles observed during a run.
#[derive(Debug, Default)]
struct Recording {
    init_calls: u64,
    requests: u64,
    close_calls: u64,
    hook_events: Vec<HookEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum HookEvent {
    Begin(u64, u64),
    End(u64, u64),
    Checkpoint(u64),
    Close,
}

/// Function client double with scripted per-call failures.
///
/// Request indices count from 0 and include the probe, so index 0 is the
/// probe call and index 1 is the first warm-up or measured call.
#[derive(Debug, Default)]
struct ScriptedClient {
    recording: Arc<Mutex<Recording>>,
    fail_indices: HashSet<u64>,
    fail_all_after_probe: bool,
}

impl FunctionClient for ScriptedClient {
    async fn init(&mut self, _url: &str, _port: u16) -> Result<(), ClientError> {
        self.recording.lock().unwrap().init_calls += 1;
        Ok(())
    }

    async fn request(&mut self, request: &Request) -> Result<Reply, ClientError> {
        let index = {
            let mut recording = self.recording.lock().unwrap();
            let index = recording.requests;
            recording.requests += 1;
            index
        };

        if self.fail_indices.contains(&index) || (self.fail_all_after_probe && index > 0) {
            return Err(ClientError::RequestFailed {
                reason: format!("scripted failure at index {}", index),
            });
        }

        Ok(Reply {
            status: 200,
            body: format!("echo {}", request.input),
        })
    }

    async fn close(&mut self) {
        self.recording.lock().unwrap().close_calls += 1;
    }
}

#[derive(Debug, Default)]
struct RecordingHook {
    recording: Arc<Mutex<Recording>>,
}

impl SimulatorHook for RecordingHook {
    fn work_begin(&self, work_id: u64, thread_id: u64) {
        self.recording
            .lock()
            .unwrap()
            .hook_events
            .push(HookEvent::Begin(work_id, thread_id));
    }

    fn work_end(&self, work_id: u64, thread_id: u64) {
        self.recording
            .lock()
            .unwrap()
            .hook_events
            .push(HookEvent::End(work_id, thread_id));
    }

    fn checkpoint(&self, code: u64) {
        self.recording
            .lock()
            .unwrap()
            .hook_events
            .push(HookEvent::Checkpoint(code));
    }

    fn close(&mut self) {
        self.recording.lock().unwrap().hook_events.push(HookEvent::Close);
    }
}

fn harness(recording: &Arc<Mutex<Recording>>) -> (ScriptedClient, RecordingHook) {
    let client = ScriptedClient {
        recording: Arc::clone(recording),
        ..ScriptedClient::default()
    };
    let hook = RecordingHook {
        recording: Arc::clone(recording),
    };
    (client, hook)
}

#[tokio::test]
async fn test_plain_run_makes_exact_call_pairs() {
    let recording = Arc::new(Mutex::new(Recording::default()));
    let (client, hook) = harness(&recording);

    let config = RunConfig {
        measured_count: 10,
        warmup_count: 0,
        ..RunConfig::default()
    };
    let mut driver = Driver::new(config, client, hook).unwrap();

    let summary = driver.run().await.unwrap();
    assert_eq!(summary.measured, 10);
    assert_eq!(summary.failures, 0);
    assert_eq!(driver.phase(), RunPhase::Done);

    let recording = recording.lock().unwrap();
    // Probe plus 10 measured: a 1:1 generator/client correspondence.
    assert_eq!(recording.requests, 11);
    assert_eq!(driver.requests_generated(), 11);
    assert_eq!(recording.init_calls, 1);
    assert_eq!(recording.close_calls, 1);
    // Instrumentation disabled: the hook is never invoked, not even close.
    assert!(recording.hook_events.is_empty());
}

#[tokio::test]
async fn test_instrumented_run_brackets_warmup_and_tags_work_ids() {
    let recording = Arc::new(Mutex::new(Recording::default()));
    let (client, hook) = harness(&recording);

    let config = RunConfig {
        measured_count: 5,
        warmup_count: 3,
        instrumented: true,
        ..RunConfig::default()
    };
    let mut driver = Driver::new(config, client, hook).unwrap();

    let summary = driver.run().await.unwrap();
    assert_eq!(summary.measured, 5);
    assert_eq!(summary.warmed, 3);

    let recording = recording.lock().unwrap();
    // Probe + 3 warm-up + 5 measured.
    assert_eq!(recording.requests, 9);

    let mut expected = vec![
        HookEvent::Checkpoint(funcbench_core::codes::CONNECTION_ESTABLISHED),
        HookEvent::Checkpoint(funcbench_core::codes::WARMUP_BEGIN),
        HookEvent::Checkpoint(funcbench_core::codes::WARMUP_END),
    ];
    for work_id in 100..=104 {
        expected.push(HookEvent::Begin(work_id, 0));
        expected.push(HookEvent::End(work_id, 0));
    }
    expected.push(HookEvent::Close);

    // Warm-up traffic emitted no per-request markers: exactly one
    // bracketing checkpoint pair with nothing in between.
    assert_eq!(recording.hook_events, expected);
}

#[tokio::test]
async fn test_probe_failure_prevents_all_invocations() {
    let recording = Arc::new(Mutex::new(Recording::default()));
    let (mut client, hook) = harness(&recording);
    client.fail_indices.insert(0);

    let config = RunConfig {
        measured_count: 10,
        warmup_count: 5,
        ..RunConfig::default()
    };
    let mut driver = Driver::new(config, client, hook).unwrap();

    let err = driver.run().await.unwrap_err();
    assert!(matches!(err, InvokerError::ProbeFailed { .. }));
    assert_eq!(driver.phase(), RunPhase::Aborted);

    let recording = recording.lock().unwrap();
    // Only the probe's own call happened.
    assert_eq!(recording.requests, 1);
    assert_eq!(driver.requests_generated(), 1);
    // Resources are still released on the fatal path.
    assert_eq!(recording.close_calls, 1);
}

#[tokio::test]
async fn test_per_call_failures_are_non_fatal() {
    let recording = Arc::new(Mutex::new(Recording::default()));
    let (mut client, hook) = harness(&recording);
    // Fail the second and fifth measured invocations.
    client.fail_indices.insert(2);
    client.fail_indices.insert(5);

    let config = RunConfig {
        measured_count: 8,
        warmup_count: 0,
        ..RunConfig::default()
    };
    let mut driver = Driver::new(config, client, hook).unwrap();

    let summary = driver.run().await.unwrap();
    assert_eq!(summary.failures, 2);
    assert_eq!(driver.phase(), RunPhase::Done);

    let recording = recording.lock().unwrap();
    // Failed calls still count as attempted.
    assert_eq!(recording.requests, 9);
    assert_eq!(driver.requests_generated(), 9);
}

#[tokio::test]
async fn test_failed_invocations_keep_marker_pairs_balanced() {
    let recording = Arc::new(Mutex::new(Recording::default()));
    let (mut client, hook) = harness(&recording);
    client.fail_indices.insert(2);

    let config = RunConfig {
        measured_count: 3,
        warmup_count: 0,
        instrumented: true,
        ..RunConfig::default()
    };
    let mut driver = Driver::new(config, client, hook).unwrap();
    driver.run().await.unwrap();

    let recording = recording.lock().unwrap();
    let begins = recording
        .hook_events
        .iter()
        .filter(|e| matches!(e, HookEvent::Begin(..)))
        .count();
    let ends = recording
        .hook_events
        .iter()
        .filter(|e| matches!(e, HookEvent::End(..)))
        .count();
    assert_eq!(begins, 3);
    assert_eq!(ends, 3);
}

#[tokio::test]
async fn test_sustained_failure_policy_aborts_the_run() {
    let recording = Arc::new(Mutex::new(Recording::default()));
    let (mut client, hook) = harness(&recording);
    client.fail_all_after_probe = true;

    let config = RunConfig {
        measured_count: 10,
        warmup_count: 0,
        max_consecutive_failures: 3,
        ..RunConfig::default()
    };
    let mut driver = Driver::new(config, client, hook).unwrap();

    let err = driver.run().await.unwrap_err();
    assert!(matches!(
        err,
        InvokerError::SustainedFailures {
            streak: 3,
            last_index: 2
        }
    ));
    assert_eq!(driver.phase(), RunPhase::Aborted);

    let recording = recording.lock().unwrap();
    // Probe plus the three calls of the failure streak.
    assert_eq!(recording.requests, 4);
    assert_eq!(recording.close_calls, 1);
}

#[tokio::test]
async fn test_unlimited_failures_by_default() {
    let recording = Arc::new(Mutex::new(Recording::default()));
    let (mut client, hook) = harness(&recording);
    client.fail_all_after_probe = true;

    let config = RunConfig {
        measured_count: 20,
        warmup_count: 0,
        ..RunConfig::default()
    };
    let mut driver = Driver::new(config, client, hook).unwrap();

    let summary = driver.run().await.unwrap();
    assert_eq!(summary.failures, 20);
    assert_eq!(recording.lock().unwrap().requests, 21);
}

#[tokio::test]
async fn test_zero_measured_count_runs_only_the_probe() {
    let recording = Arc::new(Mutex::new(Recording::default()));
    let (client, hook) = harness(&recording);

    let config = RunConfig {
        measured_count: 0,
        warmup_count: 0,
        ..RunConfig::default()
    };
    let mut driver = Driver::new(config, client, hook).unwrap();

    let summary = driver.run().await.unwrap();
    assert_eq!(summary.measured, 0);
    assert_eq!(recording.lock().unwrap().requests, 1);
    assert_eq!(driver.phase(), RunPhase::Done);
}

#[tokio::test]
async fn test_shutdown_is_idempotent() {
    let recording = Arc::new(Mutex::new(Recording::default()));
    let (client, hook) = harness(&recording);

    let config = RunConfig {
        measured_count: 2,
        warmup_count: 0,
        instrumented: true,
        ..RunConfig::default()
    };
    let mut driver = Driver::new(config, client, hook).unwrap();
    driver.run().await.unwrap();

    // run() already shut the driver down; further calls must be no-ops.
    driver.shutdown().await;
    driver.shutdown().await;

    let recording = recording.lock().unwrap();
    assert_eq!(recording.close_calls, 1);
    let hook_closes = recording
        .hook_events
        .iter()
        .filter(|e| matches!(e, HookEvent::Close))
        .count();
    assert_eq!(hook_closes, 1);
}

#[tokio::test]
async fn test_pacing_delays_between_invocations() {
    let recording = Arc::new(Mutex::new(Recording::default()));
    let (client, hook) = harness(&recording);

    let config = RunConfig {
        measured_count: 5,
        warmup_count: 0,
        delay_micros: 1_000,
        ..RunConfig::default()
    };
    let mut driver = Driver::new(config, client, hook).unwrap();

    let started = std::time::Instant::now();
    driver.run().await.unwrap();
    // 5 paced iterations at 1ms each.
    assert!(started.elapsed() >= std::time::Duration::from_millis(5));
}
