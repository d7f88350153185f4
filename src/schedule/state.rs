//! Round State Machine
//!
//! Pure bookkeeping for the scheduling loop. The loop feeds it three kinds of
//! events (tick, completion report, close) and acts on what it returns; no
//! timers or tasks live here, which keeps every transition testable.
//!
//! ```text
//!            tick                begin_next
//!   Running ───────► Superseded ───────────► Running (round + 1)
//!      │
//!      │ report(round)
//!      ▼
//!   Finished ──tick──► (start pending) ──begin_next──► Running (round + 1)
//! ```

use crate::commit::OutcomeKind;
use crate::Round;

/// State of the most recently started round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// No round started yet.
    Empty,
    /// Task in flight.
    Running,
    /// Task reported back.
    Finished,
    /// A tick (or close) arrived first; the task was abandoned.
    Superseded,
}

/// What the state machine did with a completion report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportDisposition {
    /// Report matched the live round and was recorded.
    Applied,
    /// Report belongs to a superseded round and was discarded.
    Stale,
    /// The live round had already reported.
    Duplicate,
}

/// Counters emitted when the scheduler stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundSummary {
    /// Rounds started (equals the final round number).
    pub rounds_started: Round,
    /// Rounds whose commitment reached the store.
    pub committed: u64,
    /// Rounds that failed to derive or persist.
    pub failed: u64,
    /// Rounds abandoned by a tick or by stop before reporting.
    pub abandoned: u64,
}

/// Round counter and in-flight bookkeeping owned by the scheduling loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundState {
    round: Round,
    slot: Slot,
    start_pending: bool,
    summary: RoundSummary,
}

impl RoundState {
    /// Fresh state at round 0.
    pub fn new() -> Self {
        Self {
            round: 0,
            slot: Slot::Empty,
            start_pending: false,
            summary: RoundSummary::default(),
        }
    }

    /// Current round number.
    pub fn round(&self) -> Round {
        self.round
    }

    /// True when a tick has asked for the next round to start.
    pub fn start_pending(&self) -> bool {
        self.start_pending
    }

    /// True while the current round's task has neither reported nor been
    /// superseded.
    pub fn in_flight(&self) -> bool {
        self.slot == Slot::Running
    }

    /// Counters so far.
    pub fn summary(&self) -> RoundSummary {
        self.summary
    }

    /// Record a timer tick.
    ///
    /// Returns `true` when the current round is still in flight and its task
    /// must be cancelled.
    pub fn on_tick(&mut self) -> bool {
        self.start_pending = true;

        if self.slot == Slot::Running {
            self.slot = Slot::Superseded;
            self.summary.abandoned += 1;
            true
        } else {
            false
        }
    }

    /// Advance to the next round if a tick asked for it.
    pub fn begin_next(&mut self) -> Option<Round> {
        if !self.start_pending {
            return None;
        }

        self.start_pending = false;
        self.round += 1;
        self.slot = Slot::Running;
        self.summary.rounds_started = self.round;
        Some(self.round)
    }

    /// Reconcile a completion report against the live round.
    pub fn on_report(&mut self, round: Round, kind: OutcomeKind) -> ReportDisposition {
        if round != self.round {
            return ReportDisposition::Stale;
        }

        match self.slot {
            Slot::Running => {
                self.slot = Slot::Finished;
                match kind {
                    OutcomeKind::Committed => self.summary.committed += 1,
                    OutcomeKind::Failed => self.summary.failed += 1,
                    OutcomeKind::Cancelled => self.summary.abandoned += 1,
                }
                ReportDisposition::Applied
            }
            Slot::Finished => ReportDisposition::Duplicate,
            Slot::Empty | Slot::Superseded => ReportDisposition::Stale,
        }
    }

    /// Close the state: an in-flight round counts as abandoned.
    pub fn close(&mut self) -> RoundSummary {
        if self.slot == Slot::Running {
            self.slot = Slot::Superseded;
            self.summary.abandoned += 1;
        }
        self.start_pending = false;
        self.summary
    }
}

impl Default for RoundState {
    fn default() -> Self {
        Self::new()
    }
}
