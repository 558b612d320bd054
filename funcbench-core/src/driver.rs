// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Invocation driver - orchestrates one end-to-end benchmark run.
//!
//! Sequences generator, client, and hook calls across three phases: a single
//! connectivity probe (fatal on failure), an optional warm-up, and the
//! measured run. Applies pacing between requests, samples progress logging,
//! and classifies per-call failures as non-fatal.
//!
//! The driver owns all run state; there are no package-level globals and a
//! single run maps to a single driver instance.

use std::time::{Duration, Instant};

use crate::client::FunctionClient;
use crate::config::RunConfig;
use crate::error::{InvokerError, InvokerResult};
use crate::generator::InputGenerator;
use crate::m5::{codes, SimulatorHook};
use crate::types::Reply;

/// Work-ids of measured invocations start here.
pub const WORK_ID_BASE: u64 = 100;

/// The driver is single-threaded, so every marker carries worker id 0.
const DRIVER_THREAD_ID: u64 = 0;

/// Run lifecycle phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// Driver constructed, nothing sent yet.
    Idle,

    /// The single connectivity probe is in flight.
    Probing,

    /// Warm-up invocations are running (skipped when the count is 0).
    WarmingUp,

    /// Measured invocations are running.
    Measuring,

    /// Run completed normally. Terminal.
    Done,

    /// Run aborted on a fatal failure. Terminal.
    Aborted,
}

impl RunPhase {
    /// Get the phase name for logs and error messages.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Probing => "Probing",
            Self::WarmingUp => "WarmingUp",
            Self::Measuring => "Measuring",
            Self::Done => "Done",
            Self::Aborted => "Aborted",
        }
    }

    /// Check if transition to the target phase is valid.
    pub fn can_transition_to(&self, target: RunPhase) -> bool {
        matches!(
            (self, target),
            // From Idle
            (Self::Idle, Self::Probing) |
            // From Probing
            (Self::Probing, Self::WarmingUp) |
            (Self::Probing, Self::Measuring) |
            (Self::Probing, Self::Aborted) |
            // From WarmingUp
            (Self::WarmingUp, Self::Measuring) |
            (Self::WarmingUp, Self::Aborted) |
            // From Measuring
            (Self::Measuring, Self::Done) |
            (Self::Measuring, Self::Aborted)
        )
    }

    /// Check if this phase is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Number of measured invocations attempted.
    pub measured: u64,
    /// Number of warm-up invocations attempted.
    pub warmed: u64,
    /// Number of invocations that failed (warm-up and measured combined).
    pub failures: u64,
    /// Wall-clock time of the whole run.
    pub elapsed: Duration,
}

/// Orchestrates one benchmark run against a target function service.
///
/// Generic over the client and hook so tests can substitute scripted
/// implementations; the CLI wires in the HTTP client and the m5 hook.
#[derive(Debug)]
pub struct Driver<C, H> {
    config: RunConfig,
    generator: InputGenerator,
    client: C,
    hook: H,
    phase: RunPhase,
    failures: u64,
    closed: bool,
}

impl<C: FunctionClient, H: SimulatorHook> Driver<C, H> {
    /// Build a driver from a validated configuration.
    pub fn new(config: RunConfig, client: C, hook: H) -> InvokerResult<Self> {
        config.validate()?;

        let mut generator = InputGenerator::new(config.generator);
        generator.set_seed_value(config.input.as_str());
        generator.set_bounds(config.lower_bound, config.upper_bound)?;
        generator.set_method(config.method.as_str());

        Ok(Self {
            config,
            generator,
            client,
            hook,
            phase: RunPhase::Idle,
            failures: 0,
            closed: false,
        })
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// The immutable run configuration.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Total number of request payloads generated so far (probe included).
    pub fn requests_generated(&self) -> u64 {
        self.generator.issued()
    }

    /// Execute the whole run: probe, optional warm-up, measured phase.
    ///
    /// Resources are released on every exit path, including a fatal probe
    /// failure.
    pub async fn run(&mut self) -> InvokerResult<RunSummary> {
        let started = Instant::now();
        let result = self.run_phases().await;
        self.shutdown().await;

        result.map(|()| RunSummary {
            measured: self.config.measured_count,
            warmed: self.config.warmup_count,
            failures: self.failures,
            elapsed: started.elapsed(),
        })
    }

    async fn run_phases(&mut self) -> InvokerResult<()> {
        let reply = self.probe().await?;
        tracing::info!(reply = %reply, "Probe reply");

        if self.config.warmup_count > 0 {
            self.warm_up().await?;
        }

        self.run_measured().await?;
        self.transition(RunPhase::Done);
        Ok(())
    }

    /// Establish connectivity with a single invocation.
    ///
    /// A failure here is fatal: no subsequent call could succeed, so the run
    /// aborts and the connectivity error propagates to the caller.
    pub async fn probe(&mut self) -> InvokerResult<Reply> {
        self.transition(RunPhase::Probing);

        let port = self.config.port.value();
        if let Err(source) = self.client.init(&self.config.url, port).await {
            self.transition(RunPhase::Aborted);
            return Err(InvokerError::ProbeFailed { source });
        }
        tracing::info!(address = %self.config.address(), "Connection established");

        let request = self.generator.next_request();
        match self.client.request(&request).await {
            Ok(reply) => {
                self.hook_checkpoint(codes::CONNECTION_ESTABLISHED);
                Ok(reply)
            }
            Err(source) => {
                self.transition(RunPhase::Aborted);
                Err(InvokerError::ProbeFailed { source })
            }
        }
    }

    /// Run the warm-up invocations.
    ///
    /// Warm-up traffic must not pollute measurement checkpoints: per-request
    /// markers stay off regardless of the global instrumentation flag. When
    /// instrumentation is enabled the whole phase is bracketed by one
    /// checkpoint pair so the measurement system can exclude the interval.
    pub async fn warm_up(&mut self) -> InvokerResult<()> {
        self.transition(RunPhase::WarmingUp);
        let count = self.config.warmup_count;
        tracing::info!(count, "Invoking function for warming");

        self.hook_checkpoint(codes::WARMUP_BEGIN);
        let result = self.invoke_batch(count, false).await;
        self.hook_checkpoint(codes::WARMUP_END);
        result
    }

    /// Run the measured invocations.
    pub async fn run_measured(&mut self) -> InvokerResult<()> {
        self.transition(RunPhase::Measuring);
        let count = self.config.measured_count;
        tracing::info!(
            count,
            instrumented = self.config.instrumented,
            "Starting measured phase"
        );
        self.invoke_batch(count, self.config.instrumented).await
    }

    /// The shared invocation loop for the warm-up and measured phases.
    ///
    /// Makes exactly `count` generator calls and `count` client calls;
    /// successes and failures both count, preserving the 1:1 correspondence
    /// between requested and attempted invocations.
    async fn invoke_batch(&mut self, count: u64, instrumented: bool) -> InvokerResult<()> {
        let stride = progress_stride(count);
        let mut streak: u64 = 0;

        for index in 0..count {
            let request = self.generator.next_request();

            if instrumented {
                self.hook.work_begin(WORK_ID_BASE + index, DRIVER_THREAD_ID);
            }
            let outcome = self.client.request(&request).await;
            if instrumented {
                self.hook.work_end(WORK_ID_BASE + index, DRIVER_THREAD_ID);
            }

            match outcome {
                Ok(_) => streak = 0,
                Err(err) => {
                    self.failures += 1;
                    streak += 1;
                    tracing::warn!(index, error = %err, "Invocation failed, continuing");

                    let limit = self.config.max_consecutive_failures;
                    if limit > 0 && streak >= limit {
                        self.transition(RunPhase::Aborted);
                        return Err(InvokerError::SustainedFailures {
                            streak,
                            last_index: index,
                        });
                    }
                }
            }

            if index % stride == 0 {
                tracing::info!(invoked = index, "Invocation progress");
            }

            if let Some(pause) = self.config.pacing() {
                tokio::time::sleep(pause).await;
            }
        }

        Ok(())
    }

    /// Release the client connection and, if instrumentation was enabled,
    /// the hook resource. Idempotent.
    pub async fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.client.close().await;
        if self.config.instrumented {
            self.hook.close();
        }
        self.closed = true;
        tracing::debug!("Driver resources released");
    }

    fn transition(&mut self, next: RunPhase) {
        debug_assert!(
            self.phase.can_transition_to(next),
            "invalid phase transition {} -> {}",
            self.phase,
            next
        );
        tracing::debug!(from = self.phase.name(), to = next.name(), "Phase transition");
        self.phase = next;
    }

    fn hook_checkpoint(&self, code: u64) {
        if self.config.instrumented {
            self.hook.checkpoint(code);
        }
    }
}

/// Stride between progress log lines.
///
/// Large runs log roughly 5 lines per phase; small runs (`count <= 10`) log
/// every iteration. Integer floor division with a floor of 1, so there is
/// never a division by zero.
pub(crate) fn progress_stride(count: u64) -> u64 {
    if count > 10 {
        count / 5
    } else {
        1
    }
}
