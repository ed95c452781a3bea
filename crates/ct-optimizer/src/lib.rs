//! # ct-optimizer
//!
//! Greedy single-option search over a cluster's live configuration.
//!
//! Provides candidate generation for typed option domains, best-result
//! tracking, the stall-bounded hill-climbing loop, and a session driver that
//! owns the benchmark pool lifecycle.

mod candidate;
mod hill_climb;
mod session;
mod tracker;
mod trial;

pub use candidate::{generate, parse_value, select_option, CandidateValue, SamplingDomain};
pub use hill_climb::HillClimber;
pub use session::TuningSession;
pub use tracker::{ResultTracker, SearchReport};
pub use trial::{
    RunId, SearchConfig, SearchState, SearchStatus, TrialOutcome, TrialRecord,
};
