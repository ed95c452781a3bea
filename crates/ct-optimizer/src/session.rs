//! Top-level driver: catalog checks, pool lifecycle, baseline, search, report.

use ct_types::{ControlSurface, OptionCatalog, TuneResult};
use rand::Rng;
use tracing::{error, info, warn};

use crate::candidate::parse_value;
use crate::hill_climb::{apply_value, HillClimber};
use crate::tracker::SearchReport;
use crate::trial::{SearchConfig, SearchState};

/// One complete tuning run.
///
/// The benchmarking pool is created after the catalog has been checked and
/// is destroyed on every exit path once it has been requested.
#[derive(Debug, Clone)]
pub struct TuningSession {
    config: SearchConfig,
}

impl TuningSession {
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    pub async fn execute<S>(
        &self,
        catalog: &OptionCatalog,
        surface: &mut S,
    ) -> TuneResult<SearchReport>
    where
        S: ControlSurface + ?Sized,
    {
        let climber = HillClimber::new(self.config.clone());
        self.execute_with(catalog, surface, climber).await
    }

    /// Like [`Self::execute`], with a caller-supplied climber (and so RNG).
    pub async fn execute_with<S, R>(
        &self,
        catalog: &OptionCatalog,
        surface: &mut S,
        mut climber: HillClimber<R>,
    ) -> TuneResult<SearchReport>
    where
        S: ControlSurface + ?Sized,
        R: Rng,
    {
        catalog.validate()?;
        check_start_values(catalog)?;
        info!(
            options = ?catalog.names(),
            "All config options that will be used to optimize the cluster"
        );

        if let Err(e) = surface.create_pool().await {
            error!(error = %e, "Cannot create benchmark pool");
            release_pool(surface).await;
            return Err(e.into());
        }

        apply_start_values(catalog, surface).await;

        let mut state = SearchState::new();
        let outcome = climber.run(catalog, surface, &mut state).await;

        release_pool(surface).await;
        info!(
            score = state.highest_score(),
            "Best config is:\n{}",
            state.tracker().report().join("\n")
        );

        outcome?;
        Ok(state.into_report())
    }
}

/// Reject start values that do not parse as the option's declared type.
fn check_start_values(catalog: &OptionCatalog) -> TuneResult<()> {
    for option in catalog.iter() {
        if let Some(value) = option.start_value() {
            parse_value(option, value)?;
        }
    }
    Ok(())
}

/// Apply every non-empty start value once, in catalog order.
async fn apply_start_values<S>(catalog: &OptionCatalog, surface: &mut S)
where
    S: ControlSurface + ?Sized,
{
    for option in catalog.iter() {
        if let Some(value) = option.start_value() {
            info!(option = %option.name, value = %value, "applying start value");
            apply_value(surface, &option.name, value).await;
        }
    }
}

async fn release_pool<S>(surface: &mut S)
where
    S: ControlSurface + ?Sized,
{
    if let Err(e) = surface.destroy_pool().await {
        warn!(error = %e, "Cannot remove benchmark pool");
    }
}
