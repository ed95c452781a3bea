//! Search configuration, per-trial records and the loop's mutable state.

use chrono::{DateTime, Utc};
use ct_types::CurrentConfigValue;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::tracker::{ResultTracker, SearchReport};

/// Unique search run identifier.
pub type RunId = Uuid;

/// Knobs for one hill-climbing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Number of trials without improvement after which the search stops.
    pub timeout: usize,

    /// Pause after every trial so the cluster settles before the next
    /// measurement.
    pub settle: Duration,

    /// Seed for the random source. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            timeout: 30,
            settle: Duration::from_secs(2),
            seed: None,
        }
    }
}

impl SearchConfig {
    pub fn with_timeout(mut self, timeout: usize) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Lifecycle state of a search run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrialOutcome {
    /// Strictly better score; the configuration was snapshotted as the new best.
    Improved,
    /// Not better; the option was restored to its previous value.
    Reverted,
}

/// One perturb/evaluate/decide cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub number: usize,
    pub option: String,
    pub old_value: String,
    pub new_value: String,
    pub score: f64,
    pub outcome: TrialOutcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// State owned by the search loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchState {
    pub run_id: RunId,
    pub status: SearchStatus,
    tracker: ResultTracker,
    stall_count: usize,
    trials_run: usize,
    improvements: usize,
    history: Vec<TrialRecord>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl Default for SearchState {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchState {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            status: SearchStatus::Pending,
            tracker: ResultTracker::new(),
            stall_count: 0,
            trials_run: 0,
            improvements: 0,
            history: Vec::new(),
            started_at: None,
            finished_at: None,
            error: None,
        }
    }

    pub fn mark_running(&mut self) {
        self.status = SearchStatus::Running;
        self.started_at = Some(Utc::now());
    }

    pub fn mark_completed(&mut self) {
        self.status = SearchStatus::Completed;
        self.finished_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self, error: String) {
        self.status = SearchStatus::Failed;
        self.finished_at = Some(Utc::now());
        self.error = Some(error);
    }

    pub fn highest_score(&self) -> f64 {
        self.tracker.highest_score()
    }

    pub fn tracker(&self) -> &ResultTracker {
        &self.tracker
    }

    pub fn stall_count(&self) -> usize {
        self.stall_count
    }

    pub fn trials_run(&self) -> usize {
        self.trials_run
    }

    pub fn improvements(&self) -> usize {
        self.improvements
    }

    pub fn history(&self) -> &[TrialRecord] {
        &self.history
    }

    pub fn is_improvement(&self, score: f64) -> bool {
        self.tracker.is_improvement(score)
    }

    /// Accept an improving trial: snapshot becomes the new best and the stall
    /// counter starts over.
    pub fn commit(&mut self, score: f64, snapshot: Vec<CurrentConfigValue>) {
        self.tracker.record(score, snapshot);
        self.stall_count = 0;
        self.improvements += 1;
    }

    /// Count a non-improving trial against the stall budget.
    pub fn reject(&mut self) {
        self.stall_count += 1;
    }

    pub fn push_trial(&mut self, record: TrialRecord) {
        self.trials_run += 1;
        self.history.push(record);
    }

    /// Trials in the current stall window.
    ///
    /// Once any improvement has happened, the improving trial opens the
    /// window and counts towards it.
    pub fn stall_window(&self) -> usize {
        self.stall_count + usize::from(self.improvements > 0)
    }

    pub fn is_exhausted(&self, timeout: usize) -> bool {
        self.stall_window() >= timeout
    }

    pub fn into_report(self) -> SearchReport {
        SearchReport {
            run_id: self.run_id,
            status: self.status,
            highest_score: self.tracker.highest_score(),
            best_config: self.tracker.best_config().to_vec(),
            trials_run: self.trials_run,
            improvements: self.improvements,
            started_at: self.started_at,
            finished_at: self.finished_at,
        }
    }
}
