//! Position resolution pipeline
//!
//! A pass moves through `Idle -> WindowLocated -> Captured -> Resolving ->
//! Validated -> Persisted`, or ends in `Aborted` at any step:
//! - `Resolver` - runs a pass against the platform traits
//! - `ResolverState` - the step reached, observable from other threads
//! - `ResolutionReport` - the table, per-control outcomes and warnings of a pass

mod runner;
mod state;

pub use runner::{CancelHandle, Resolver};
pub use state::{ControlOutcome, OutcomeStatus, ResolutionReport, ResolverState};
