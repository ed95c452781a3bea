//! Simulated (in-memory) cluster for dry runs.
//!
//! Keeps option values locally and scores them with a pluggable function, so
//! a search can be exercised end to end without a real cluster.

use async_trait::async_trait;
use ct_types::{
    ConfigOption, ControlError, ControlResult, ControlSurface, CurrentConfigValue, OptionCatalog,
    OptionType,
};
use std::fmt;
use tracing::{debug, info};

type Scorer = Box<dyn FnMut(&[CurrentConfigValue]) -> f64 + Send>;

/// Which calls should fail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaultInjection {
    pub apply: bool,
    pub read: bool,
    pub snapshot: bool,
    /// Let this many snapshots succeed, then fail every later one.
    pub snapshot_after: Option<usize>,
    pub benchmark: bool,
    pub create_pool: bool,
    pub destroy_pool: bool,
}

/// Number of calls received per operation, failed calls included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub apply: usize,
    pub read: usize,
    pub snapshot: usize,
    pub benchmark: usize,
    pub create_pool: usize,
    pub destroy_pool: usize,
}

/// A fully in-process stand-in for a cluster's configuration interface.
pub struct SimulatedCluster {
    values: Vec<CurrentConfigValue>,
    scorer: Scorer,
    faults: FaultInjection,
    pool_exists: bool,
    calls: CallCounts,
    applied: Vec<(String, String)>,
}

impl fmt::Debug for SimulatedCluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulatedCluster")
            .field("values", &self.values)
            .field("faults", &self.faults)
            .field("pool_exists", &self.pool_exists)
            .field("calls", &self.calls)
            .finish_non_exhaustive()
    }
}

impl Default for SimulatedCluster {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedCluster {
    /// An empty cluster whose benchmark always scores 0.
    pub fn new() -> Self {
        Self {
            values: Vec::new(),
            scorer: Box::new(|_| 0.0),
            faults: FaultInjection::default(),
            pool_exists: false,
            calls: CallCounts::default(),
            applied: Vec::new(),
        }
    }

    /// A cluster holding one default value per catalog option and a scorer
    /// that peaks three quarters of the way up each numeric range and with
    /// every boolean enabled.
    pub fn from_catalog(catalog: &OptionCatalog) -> Self {
        let mut cluster = Self::new();
        for option in catalog.iter() {
            cluster = cluster.with_value(&option.name, initial_value(option));
        }
        let targets: Vec<ConfigOption> = catalog.options().to_vec();
        cluster.with_scorer(move |config| peak_score(&targets, config))
    }

    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.values.iter_mut().find(|v| v.name == name) {
            Some(existing) => existing.value = value,
            None => self
                .values
                .push(CurrentConfigValue::new(name, value, "default")),
        }
        self
    }

    pub fn with_scorer<F>(mut self, scorer: F) -> Self
    where
        F: FnMut(&[CurrentConfigValue]) -> f64 + Send + 'static,
    {
        self.scorer = Box::new(scorer);
        self
    }

    pub fn with_constant_score(self, score: f64) -> Self {
        self.with_scorer(move |_| score)
    }

    /// Return `scores` in order, repeating the last one once exhausted.
    pub fn with_score_sequence(self, scores: Vec<f64>) -> Self {
        let mut next = 0;
        self.with_scorer(move |_| {
            let score = scores
                .get(next)
                .or_else(|| scores.last())
                .copied()
                .unwrap_or(0.0);
            next += 1;
            score
        })
    }

    pub fn with_faults(mut self, faults: FaultInjection) -> Self {
        self.faults = faults;
        self
    }

    pub fn calls(&self) -> CallCounts {
        self.calls
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|v| v.name == name)
            .map(|v| v.value.as_str())
    }

    /// Every successful apply, in order.
    pub fn applied(&self) -> &[(String, String)] {
        &self.applied
    }

    pub fn pool_exists(&self) -> bool {
        self.pool_exists
    }
}

fn injected(operation: &str) -> ControlError {
    ControlError::Injected {
        operation: operation.to_string(),
    }
}

fn initial_value(option: &ConfigOption) -> String {
    if let Some(value) = option.start_value() {
        return value.to_string();
    }
    match option.option_type {
        OptionType::Bool => "false".to_string(),
        _ if option.has_integral_bounds() => (option.min as i64).to_string(),
        _ => option.min.to_string(),
    }
}

fn peak_score(targets: &[ConfigOption], config: &[CurrentConfigValue]) -> f64 {
    let mut score = 1000.0;
    for option in targets {
        let Some(current) = config.iter().find(|v| v.name == option.name) else {
            continue;
        };
        match option.option_type {
            OptionType::Bool => {
                if current.value != "true" {
                    score -= 100.0;
                }
            }
            OptionType::Int | OptionType::Float => {
                let span = option.max - option.min;
                let Ok(value) = current.value.trim().parse::<f64>() else {
                    score -= 400.0;
                    continue;
                };
                if span > 0.0 {
                    let target = option.min + 0.75 * span;
                    score -= 400.0 * ((value - target).abs() / span).min(1.0);
                }
            }
        }
    }
    score
}

#[async_trait]
impl ControlSurface for SimulatedCluster {
    async fn apply_option(&mut self, name: &str, value: &str) -> ControlResult<()> {
        self.calls.apply += 1;
        if self.faults.apply {
            return Err(injected("apply_option"));
        }
        match self.values.iter_mut().find(|v| v.name == name) {
            Some(existing) => {
                existing.value = value.to_string();
                existing.source = "override".to_string();
            }
            None => self
                .values
                .push(CurrentConfigValue::new(name, value, "override")),
        }
        self.applied.push((name.to_string(), value.to_string()));
        debug!(option = %name, value = %value, "simulated apply");
        Ok(())
    }

    async fn read_option(&mut self, name: &str) -> ControlResult<String> {
        self.calls.read += 1;
        if self.faults.read {
            return Err(injected("read_option"));
        }
        self.value(name)
            .map(str::to_string)
            .ok_or_else(|| ControlError::InvalidOutput {
                command: format!("config get {name}"),
                message: "unrecognized config option".to_string(),
            })
    }

    async fn snapshot_config(&mut self) -> ControlResult<Vec<CurrentConfigValue>> {
        self.calls.snapshot += 1;
        let exhausted = self
            .faults
            .snapshot_after
            .is_some_and(|allowed| self.calls.snapshot > allowed);
        if self.faults.snapshot || exhausted {
            return Err(injected("snapshot_config"));
        }
        Ok(self.values.clone())
    }

    async fn run_benchmark(&mut self) -> ControlResult<f64> {
        self.calls.benchmark += 1;
        if self.faults.benchmark {
            return Err(injected("run_benchmark"));
        }
        let score = (self.scorer)(&self.values);
        debug!(score, "simulated benchmark");
        Ok(score)
    }

    async fn create_pool(&mut self) -> ControlResult<()> {
        self.calls.create_pool += 1;
        if self.faults.create_pool {
            return Err(injected("create_pool"));
        }
        self.pool_exists = true;
        info!("simulated benchmark pool created");
        Ok(())
    }

    async fn destroy_pool(&mut self) -> ControlResult<()> {
        self.calls.destroy_pool += 1;
        if self.faults.destroy_pool {
            return Err(injected("destroy_pool"));
        }
        self.pool_exists = false;
        info!("simulated benchmark pool removed");
        Ok(())
    }
}
