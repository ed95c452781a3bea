//! Best-configuration tracking and the final search report.

use chrono::{DateTime, Utc};
use ct_types::CurrentConfigValue;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::trial::SearchStatus;

/// Holds the best configuration snapshot seen so far.
///
/// The snapshot is only ever replaced as a whole.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultTracker {
    highest_score: f64,
    best_config: Vec<CurrentConfigValue>,
}

impl ResultTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the tracked best with `score` and the full configuration that
    /// produced it.
    pub fn record(&mut self, score: f64, config: Vec<CurrentConfigValue>) {
        *self = Self {
            highest_score: score,
            best_config: config,
        };
    }

    /// Strict improvement over the tracked score. Ties do not count.
    pub fn is_improvement(&self, score: f64) -> bool {
        score > self.highest_score
    }

    pub fn highest_score(&self) -> f64 {
        self.highest_score
    }

    pub fn best_config(&self) -> &[CurrentConfigValue] {
        &self.best_config
    }

    /// `name = value` lines in snapshot order.
    pub fn report(&self) -> Vec<String> {
        render_lines(&self.best_config)
    }
}

fn render_lines(config: &[CurrentConfigValue]) -> Vec<String> {
    config
        .iter()
        .map(|entry| format!("{} = {}", entry.name, entry.value))
        .collect()
}

/// Outcome of a finished search.
///
/// `trials_run == 0` means no trial was attempted; a search that ran trials
/// but never improved reports an empty configuration with score 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchReport {
    pub run_id: Uuid,
    pub status: SearchStatus,
    pub highest_score: f64,
    pub best_config: Vec<CurrentConfigValue>,
    pub trials_run: usize,
    pub improvements: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl SearchReport {
    pub fn attempted(&self) -> bool {
        self.trials_run > 0
    }

    pub fn found_improvement(&self) -> bool {
        self.improvements > 0
    }

    pub fn lines(&self) -> Vec<String> {
        render_lines(&self.best_config)
    }

    /// Text block used for the final log line, one `name = value` per line.
    pub fn render(&self) -> String {
        self.lines()
            .into_iter()
            .map(|line| line + "\n")
            .collect()
    }
}
