//! # ct-cluster
//!
//! Implementations of [`ct_types::ControlSurface`]: a Ceph adapter that drives
//! the `ceph` and `rados` command-line tools, and a simulated cluster for dry
//! runs and tests.

pub mod ceph;
pub mod runner;
pub mod simulated;

pub use ceph::{parse_score, BenchMode, BenchmarkConfig, CephCluster, CephConfig, PoolConfig};
pub use runner::{CommandRunner, ProcessRunner};
pub use simulated::{CallCounts, FaultInjection, SimulatedCluster};
