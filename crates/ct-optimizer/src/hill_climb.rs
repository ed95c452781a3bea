//! Single-option greedy hill climbing with a stall-based stopping rule.

use chrono::Utc;
use ct_types::{ControlSurface, OptionCatalog, TuneError, TuneResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, error, info, warn};

use crate::candidate::{generate, select_option};
use crate::trial::{SearchConfig, SearchState, TrialOutcome, TrialRecord};

/// Drives perturb → evaluate → decide cycles until the stall budget is spent.
///
/// Trials run strictly one after another: each one mutates live cluster state
/// that the next benchmark measures.
#[derive(Debug)]
pub struct HillClimber<R: Rng = StdRng> {
    config: SearchConfig,
    rng: R,
}

impl HillClimber<StdRng> {
    pub fn new(config: SearchConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self { config, rng }
    }
}

impl<R: Rng> HillClimber<R> {
    pub fn with_rng(config: SearchConfig, rng: R) -> Self {
        Self { config, rng }
    }

    /// Run the search loop against `surface`, mutating `state` in place.
    ///
    /// A benchmark failure aborts the run with [`TuneError::Benchmark`];
    /// `state` keeps whatever best was found before the failure.
    pub async fn run<S>(
        &mut self,
        catalog: &OptionCatalog,
        surface: &mut S,
        state: &mut SearchState,
    ) -> TuneResult<()>
    where
        S: ControlSurface + ?Sized,
    {
        state.mark_running();
        info!(
            run_id = %state.run_id,
            timeout = self.config.timeout,
            settle_ms = self.config.settle.as_millis() as u64,
            options = catalog.len(),
            "starting configuration search"
        );

        while !state.is_exhausted(self.config.timeout) {
            if let Err(e) = self.trial(catalog, surface, state).await {
                state.mark_failed(e.to_string());
                return Err(e);
            }
        }

        state.mark_completed();
        info!(
            run_id = %state.run_id,
            trials = state.trials_run(),
            improvements = state.improvements(),
            "Search has ended after {} tries without finding a better config",
            self.config.timeout
        );
        Ok(())
    }

    async fn trial<S>(
        &mut self,
        catalog: &OptionCatalog,
        surface: &mut S,
        state: &mut SearchState,
    ) -> TuneResult<()>
    where
        S: ControlSurface + ?Sized,
    {
        let number = state.trials_run() + 1;
        let started_at = Utc::now();

        // Perturb
        let option = select_option(catalog, &mut self.rng)?;
        let old_value = match surface.read_option(&option.name).await {
            Ok(value) => value,
            Err(e) => {
                error!(option = %option.name, error = %e, "Cannot get current value for option");
                String::new()
            }
        };
        let new_value = generate(option, &mut self.rng)?.to_string();
        apply_value(surface, &option.name, &new_value).await;
        debug!(
            "Setting {} to {} - old value was {}",
            option.name, new_value, old_value
        );

        // Evaluate
        let score = match surface.run_benchmark().await {
            Ok(score) => score,
            Err(e) => {
                error!(trial = number, error = %e, "Cannot get new score - exiting");
                revert_value(surface, &option.name, &old_value).await;
                return Err(TuneError::Benchmark(e));
            }
        };

        // Decide. An improvement without a snapshot cannot become the best,
        // so it is reverted like any other rejected trial.
        let snapshot = if state.is_improvement(score) {
            match surface.snapshot_config().await {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    error!(
                        trial = number,
                        score,
                        error = %e,
                        "Cannot get current config as best snapshot - keeping previous best"
                    );
                    None
                }
            }
        } else {
            None
        };

        let outcome = match snapshot {
            Some(snapshot) => {
                state.commit(score, snapshot);
                info!(
                    tuned_option = %option.name,
                    new_value = %new_value,
                    score,
                    "Found new best config"
                );
                TrialOutcome::Improved
            }
            None => {
                info!(
                    trial = number,
                    option = %option.name,
                    score,
                    best = state.highest_score(),
                    "No new best config"
                );
                revert_value(surface, &option.name, &old_value).await;
                state.reject();
                TrialOutcome::Reverted
            }
        };

        state.push_trial(TrialRecord {
            number,
            option: option.name.clone(),
            old_value,
            new_value,
            score,
            outcome,
            started_at,
            finished_at: Utc::now(),
        });

        tokio::time::sleep(self.config.settle).await;
        Ok(())
    }
}

/// Apply a value, downgrading failures to a log entry.
pub(crate) async fn apply_value<S>(surface: &mut S, name: &str, value: &str)
where
    S: ControlSurface + ?Sized,
{
    if let Err(e) = surface.apply_option(name, value).await {
        error!(option = %name, value = %value, error = %e, "Issues setting value");
    }
}

async fn revert_value<S>(surface: &mut S, name: &str, old_value: &str)
where
    S: ControlSurface + ?Sized,
{
    if old_value.is_empty() {
        warn!(option = %name, "previous value unknown, leaving option as applied");
        return;
    }
    apply_value(surface, name, old_value).await;
}
