//! Interface to the system being tuned.

use async_trait::async_trait;

use crate::errors::ControlResult;
use crate::option::CurrentConfigValue;

/// Narrow control surface the search loop drives.
///
/// Implementations may shell out to a real cluster's management tools or
/// keep state in memory (see `ct_cluster::SimulatedCluster`). The loop awaits
/// every call before issuing the next one, so implementations never see
/// overlapping requests.
#[async_trait]
pub trait ControlSurface: Send {
    /// Set a live parameter on the target system.
    async fn apply_option(&mut self, name: &str, value: &str) -> ControlResult<()>;

    /// Fetch the current live value of a parameter.
    async fn read_option(&mut self, name: &str) -> ControlResult<String>;

    /// Fetch the full current configuration, in the order the target reports it.
    async fn snapshot_config(&mut self) -> ControlResult<Vec<CurrentConfigValue>>;

    /// Run one fixed-duration benchmark and return its scalar score.
    async fn run_benchmark(&mut self) -> ControlResult<f64>;

    /// Create the ephemeral benchmarking pool.
    async fn create_pool(&mut self) -> ControlResult<()>;

    /// Destroy the ephemeral benchmarking pool.
    async fn destroy_pool(&mut self) -> ControlResult<()>;
}
