//! Round Scheduler
//!
//! Ticks at a fixed period and runs one generation task per round. When a
//! tick arrives before the current round's task has reported, that task's
//! token is cancelled and the task is abandoned (never awaited); the next
//! round starts immediately.
//!
//! The round counter lives inside the scheduling loop and is published
//! through a `watch` channel, so `current_round` never contends with the
//! loop. Completion reports travel over an `mpsc` channel and are matched by
//! round number, so late reports from abandoned tasks are discarded.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::state::{ReportDisposition, RoundState, RoundSummary};
use crate::commit::{CommitmentGenerator, RoundOutcome};
use crate::Round;

/// Buffered completion reports between round tasks and the loop.
const REPORT_CHANNEL_CAPACITY: usize = 16;

/// Scheduler lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerPhase {
    /// Constructed, not started.
    Idle,
    /// Loop running.
    Running,
    /// Stop requested, loop winding down.
    Stopping,
    /// Loop finished. The scheduler cannot be restarted.
    Stopped,
}

/// Scheduler lifecycle errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    /// `start` called while running.
    #[error("Scheduler already running")]
    AlreadyRunning,

    /// `start` called after `stop`.
    #[error("Scheduler has been stopped")]
    Stopped,

    /// `stop` called more than once.
    #[error("Scheduler already stopped")]
    AlreadyStopped,

    /// Tick period of zero.
    #[error("Tick period must be non-zero")]
    ZeroPeriod,

    /// `start` called outside a tokio runtime.
    #[error("No tokio runtime available")]
    NoRuntime,

    /// The scheduling loop panicked.
    #[error("Scheduling loop panicked")]
    LoopPanicked,
}

/// Completion report from a round task.
#[derive(Debug)]
struct RoundReport {
    round: Round,
    outcome: RoundOutcome,
}

struct Control {
    phase: SchedulerPhase,
    shutdown: Option<CancellationToken>,
    handle: Option<JoinHandle<RoundSummary>>,
    summary: Option<RoundSummary>,
}

/// Periodic round scheduler with preemptive cancellation.
///
/// `stop` is terminal. A second `stop` returns
/// [`SchedulerError::AlreadyStopped`] without blocking, and `start` after
/// `stop` returns [`SchedulerError::Stopped`]. The loop records its own
/// final phase and summary, so dropping a `stop` future part way still
/// leaves the scheduler `Stopped` once the loop exits.
pub struct RoundScheduler {
    generator: Arc<CommitmentGenerator>,
    control: Arc<Mutex<Control>>,
    rounds: Arc<watch::Sender<Round>>,
}

impl RoundScheduler {
    /// Create an idle scheduler.
    pub fn new(generator: Arc<CommitmentGenerator>) -> Self {
        let (rounds, _) = watch::channel(0);

        Self {
            generator,
            control: Arc::new(Mutex::new(Control {
                phase: SchedulerPhase::Idle,
                shutdown: None,
                handle: None,
                summary: None,
            })),
            rounds: Arc::new(rounds),
        }
    }

    fn control(&self) -> MutexGuard<'_, Control> {
        lock(&self.control)
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SchedulerPhase {
        self.control().phase
    }

    /// Current round number. 0 until the first tick.
    pub fn current_round(&self) -> Round {
        *self.rounds.borrow()
    }

    /// Watch round changes.
    pub fn subscribe(&self) -> watch::Receiver<Round> {
        self.rounds.subscribe()
    }

    /// Final summary, once stopped.
    pub fn summary(&self) -> Option<RoundSummary> {
        self.control().summary
    }

    /// Start ticking every `period`. Returns immediately; the loop runs on
    /// the current tokio runtime. The first round starts one period from now.
    pub fn start(&self, period: Duration) -> Result<(), SchedulerError> {
        if period.is_zero() {
            return Err(SchedulerError::ZeroPeriod);
        }

        let mut control = self.control();
        match control.phase {
            SchedulerPhase::Idle => {}
            SchedulerPhase::Running => return Err(SchedulerError::AlreadyRunning),
            SchedulerPhase::Stopping | SchedulerPhase::Stopped => {
                return Err(SchedulerError::Stopped)
            }
        }

        let runtime = Handle::try_current().map_err(|_| SchedulerError::NoRuntime)?;
        let shutdown = CancellationToken::new();

        let generator = self.generator.clone();
        let rounds = self.rounds.clone();
        let loop_shutdown = shutdown.clone();
        let loop_control = self.control.clone();

        let handle = runtime.spawn(
            async move {
                let summary = run_loop(generator, period, loop_shutdown, rounds).await;
                record_stop(&loop_control, summary);
                summary
            }
            .instrument(info_span!("round_scheduler")),
        );

        control.phase = SchedulerPhase::Running;
        control.shutdown = Some(shutdown);
        control.handle = Some(handle);

        info!("Round scheduler started (period={:?})", period);
        Ok(())
    }

    /// Stop the loop, cancel the in-flight round and return the summary.
    ///
    /// Stopping an idle scheduler moves it straight to `Stopped`.
    pub async fn stop(&self) -> Result<RoundSummary, SchedulerError> {
        let (shutdown, handle) = {
            let mut control = self.control();
            match control.phase {
                SchedulerPhase::Idle => {
                    let summary = RoundSummary::default();
                    control.phase = SchedulerPhase::Stopped;
                    control.summary = Some(summary);
                    info!("Beacon stopped before its first round");
                    return Ok(summary);
                }
                SchedulerPhase::Stopping | SchedulerPhase::Stopped => {
                    return Err(SchedulerError::AlreadyStopped)
                }
                SchedulerPhase::Running => {
                    control.phase = SchedulerPhase::Stopping;
                    (control.shutdown.take(), control.handle.take())
                }
            }
        };

        if let Some(shutdown) = shutdown {
            shutdown.cancel();
        }

        let Some(handle) = handle else {
            return Ok(self.summary().unwrap_or_default());
        };

        match handle.await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                error!("Scheduling loop failed: {}", e);
                self.control().phase = SchedulerPhase::Stopped;
                Err(SchedulerError::LoopPanicked)
            }
        }
    }
}

impl Drop for RoundScheduler {
    fn drop(&mut self) {
        if let Some(shutdown) = self.control().shutdown.take() {
            shutdown.cancel();
        }
    }
}

fn lock(control: &Mutex<Control>) -> MutexGuard<'_, Control> {
    control.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Final bookkeeping, run by the loop task itself as it exits.
fn record_stop(control: &Mutex<Control>, summary: RoundSummary) {
    {
        let mut control = lock(control);
        control.phase = SchedulerPhase::Stopped;
        control.shutdown = None;
        control.summary = Some(summary);
    }

    info!(
        "Beacon stopped after {} rounds ({} committed, {} failed, {} abandoned)",
        summary.rounds_started, summary.committed, summary.failed, summary.abandoned
    );
}

/// The scheduling loop. Sole owner of the round counter.
async fn run_loop(
    generator: Arc<CommitmentGenerator>,
    period: Duration,
    shutdown: CancellationToken,
    rounds: Arc<watch::Sender<Round>>,
) -> RoundSummary {
    let mut state = RoundState::new();
    let (report_tx, mut report_rx) = mpsc::channel::<RoundReport>(REPORT_CHANNEL_CAPACITY);

    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut active = CancellationToken::new();

    loop {
        if let Some(round) = state.begin_next() {
            // Cancel before spawning so the old task sees it first.
            active.cancel();
            active = shutdown.child_token();
            rounds.send_replace(round);
            spawn_round(generator.clone(), round, active.clone(), report_tx.clone());
        }

        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                debug!("Stop requested at round {}", state.round());
                break;
            }

            Some(report) = report_rx.recv() => apply_report(&mut state, report),

            _ = ticker.tick() => {
                if state.on_tick() {
                    active.cancel();
                    info!("Round {} superseded by tick", state.round());
                }
            }
        }
    }

    active.cancel();
    drain_reports(&mut state, &mut report_rx);
    state.close()
}

fn apply_report(state: &mut RoundState, report: RoundReport) {
    let kind = report.outcome.kind();
    match state.on_report(report.round, kind) {
        ReportDisposition::Applied => {
            debug!("Round {} finished: {:?}", report.round, kind);
        }
        ReportDisposition::Stale => {
            debug!(
                "Discarding stale report for round {} (current {})",
                report.round,
                state.round()
            );
        }
        ReportDisposition::Duplicate => {
            warn!("Duplicate report for round {}", report.round);
        }
    }
}

/// Apply reports already queued when the loop stops, so a round that
/// finished just before `stop` is not counted as abandoned.
fn drain_reports(state: &mut RoundState, report_rx: &mut mpsc::Receiver<RoundReport>) {
    while let Ok(report) = report_rx.try_recv() {
        apply_report(state, report);
    }
}

/// Run one round's generation on its own task.
fn spawn_round(
    generator: Arc<CommitmentGenerator>,
    round: Round,
    cancel: CancellationToken,
    report_tx: mpsc::Sender<RoundReport>,
) {
    tokio::spawn(
        async move {
            let outcome = generator.generate(round, &cancel).await;
            // The loop may already be gone.
            let _ = report_tx.send(RoundReport { round, outcome }).await;
        }
        .instrument(info_span!("round", round)),
    );
}
