//! Driving a pipeline tick after tick.

use super::Pipeline;
use crate::errors::PipelineError;
use crate::frame::DataFrame;
use crate::observability::SpanTimer;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

#[derive(Debug, Default)]
struct StopState {
    stopped: AtomicBool,
    reason: RwLock<Option<String>>,
}

/// A shareable flag asking a runner to stop between ticks.
///
/// Stopping is idempotent; only the first reason is kept.
#[derive(Debug, Clone, Default)]
pub struct StopToken {
    inner: Arc<StopState>,
}

impl StopToken {
    /// Creates a new token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a stop.
    pub fn stop(&self, reason: impl Into<String>) {
        if self
            .inner
            .stopped
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            *self.inner.reason.write() = Some(reason.into());
        }
    }

    /// Returns whether a stop was requested.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Returns the stop reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.inner.reason.read().clone()
    }
}

/// What to do when a tick fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum TickFailurePolicy {
    /// Return the first tick error.
    #[default]
    Abort,
    /// Log and carry on; give up after more than `max_consecutive` failures
    /// in a row, if set.
    Continue {
        /// Consecutive failures tolerated.
        #[serde(default)]
        max_consecutive: Option<u32>,
    },
}

/// Runner settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Stop after this many ticks.
    #[serde(default)]
    pub max_ticks: Option<u64>,
    /// Tick failure handling.
    #[serde(default)]
    pub failure_policy: TickFailurePolicy,
}

impl RunnerConfig {
    /// Creates the default config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the tick limit.
    #[must_use]
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }

    /// Sets the failure policy.
    #[must_use]
    pub fn with_failure_policy(mut self, policy: TickFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
}

/// Why a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// The frame source returned no more frames.
    InputExhausted,
    /// A node set `pipeline_end`.
    PipelineEnd,
    /// The stop token was triggered.
    Stopped {
        /// The stop reason.
        reason: Option<String>,
    },
    /// `max_ticks` was reached.
    MaxTicks,
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Unique id of the run.
    pub run_id: Uuid,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Ticks attempted.
    pub ticks: u64,
    /// Ticks that failed.
    pub failed_ticks: u64,
    /// Wall time in milliseconds.
    pub duration_ms: f64,
    /// Why the run ended.
    pub end_reason: EndReason,
}

/// Runs a pipeline once per tick until told to stop.
#[derive(Debug)]
pub struct Runner {
    pipeline: Pipeline,
    config: RunnerConfig,
    stop: StopToken,
}

impl Runner {
    /// Creates a runner with default settings.
    #[must_use]
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            config: RunnerConfig::default(),
            stop: StopToken::new(),
        }
    }

    /// Sets the runner config.
    #[must_use]
    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses an existing stop token.
    #[must_use]
    pub fn with_stop_token(mut self, stop: StopToken) -> Self {
        self.stop = stop;
        self
    }

    /// Returns a handle to the stop token.
    #[must_use]
    pub fn stop_token(&self) -> StopToken {
        self.stop.clone()
    }

    /// Returns the pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Consumes the runner, returning the pipeline.
    #[must_use]
    pub fn into_pipeline(self) -> Pipeline {
        self.pipeline
    }

    /// Runs with every tick starting from an empty frame.
    ///
    /// A source node is expected to end the run with `pipeline_end`.
    ///
    /// # Errors
    ///
    /// Returns a tick error according to the failure policy.
    pub fn run_until_end(&mut self) -> Result<RunSummary, PipelineError> {
        self.run_with(|_| Some(DataFrame::new()))
    }

    /// Runs with `next_frame` supplying the starting frame of each tick.
    ///
    /// # Errors
    ///
    /// Returns a tick error according to the failure policy.
    pub fn run_with<F>(&mut self, next_frame: F) -> Result<RunSummary, PipelineError>
    where
        F: FnMut(u64) -> Option<DataFrame>,
    {
        self.run_observed(next_frame, |_, _| {})
    }

    /// Like [`Runner::run_with`], handing each finished frame to `observe`.
    ///
    /// # Errors
    ///
    /// Returns a tick error according to the failure policy.
    pub fn run_observed<F, O>(&mut self, mut next_frame: F, mut observe: O) -> Result<RunSummary, PipelineError>
    where
        F: FnMut(u64) -> Option<DataFrame>,
        O: FnMut(u64, &DataFrame),
    {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let timer = SpanTimer::start("run");
        info!(run_id = %run_id, nodes = self.pipeline.len(), "Pipeline run started");

        let mut ticks: u64 = 0;
        let mut failed_ticks: u64 = 0;
        let mut consecutive: u32 = 0;

        let end_reason = loop {
            if self.stop.is_stopped() {
                break EndReason::Stopped {
                    reason: self.stop.reason(),
                };
            }
            if self.config.max_ticks.is_some_and(|max| ticks >= max) {
                break EndReason::MaxTicks;
            }
            let Some(frame) = next_frame(ticks) else {
                break EndReason::InputExhausted;
            };

            let tick = ticks;
            ticks += 1;
            match self.pipeline.run_tick(frame) {
                Ok(frame) => {
                    consecutive = 0;
                    debug!(run_id = %run_id, tick, keys = frame.len(), "Tick completed");
                    observe(tick, &frame);
                    if frame.is_pipeline_end() {
                        break EndReason::PipelineEnd;
                    }
                }
                Err(err) => {
                    failed_ticks += 1;
                    consecutive = consecutive.saturating_add(1);
                    error!(run_id = %run_id, tick, error = %err, "Tick failed");

                    match self.config.failure_policy {
                        TickFailurePolicy::Abort => return Err(err),
                        TickFailurePolicy::Continue { max_consecutive } => {
                            if max_consecutive.is_some_and(|max| consecutive > max) {
                                return Err(err);
                            }
                        }
                    }
                }
            }
        };

        let summary = RunSummary {
            run_id,
            started_at,
            ticks,
            failed_ticks,
            duration_ms: timer.finish(),
            end_reason,
        };
        info!(
            run_id = %run_id,
            ticks = summary.ticks,
            failed_ticks = summary.failed_ticks,
            end_reason = ?summary.end_reason,
            "Pipeline run finished"
        );
        Ok(summary)
    }
}
