//! Round Scheduling
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  state.rs      - Pure round state machine and summary       │
//! │  scheduler.rs  - Tick loop, preemption, lifecycle           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod scheduler;
pub mod state;

pub use scheduler::{RoundScheduler, SchedulerError, SchedulerPhase};
pub use state::{ReportDisposition, RoundState, RoundSummary};
