use clap::Parser;
use ct_cluster::{BenchMode, BenchmarkConfig, CephConfig, PoolConfig};
use ct_optimizer::SearchConfig;
use ct_types::{config_error, TuneResult};
use std::path::PathBuf;
use std::time::Duration;

pub const CEPH_BIN_ENV: &str = "CEPHTUNE_CEPH_BIN";
pub const RADOS_BIN_ENV: &str = "CEPHTUNE_RADOS_BIN";

#[derive(Debug, Parser)]
#[command(
    name = "cephtune",
    about = "Hill-climbing search over Ceph OSD configuration options"
)]
pub struct Cli {
    /// Location of the config file listing ceph config options to try out
    #[arg(long, default_value = "test.yaml")]
    pub conf: PathBuf,

    /// Numbers of unsuccessful optimization attempts until stopping
    #[arg(long, default_value_t = 30)]
    pub timeout: usize,

    /// Seconds to wait after applying a new config option
    #[arg(long, default_value_t = 2)]
    pub conf_sleep: u64,

    /// Benchmark length in seconds
    #[arg(long, default_value_t = 30)]
    pub bench_time: u64,

    /// pg_num and pgp_num to use for testbench pool creation
    #[arg(long, default_value_t = 64)]
    pub pool_pgs: u32,

    /// Benchmark type - one of write, seq, rand
    #[arg(long, default_value = "write")]
    pub bench_type: BenchMode,

    /// Number of concurrent IOs in benchmark
    #[arg(long, default_value_t = 4)]
    pub bench_scale: u32,

    /// Benchmark block IO size in KB
    #[arg(long, default_value_t = 4000)]
    pub bench_block_size: u64,

    /// Benchmark object IO size in KB
    #[arg(long, default_value_t = 4000)]
    pub bench_object_size: u64,

    /// Seed for a reproducible search
    #[arg(long)]
    pub seed: Option<u64>,

    /// Run against an in-memory simulated cluster instead of ceph
    #[arg(long)]
    pub simulate: bool,

    /// File receiving debug-level logs
    #[arg(long, default_value = "debug.log")]
    pub log_file: PathBuf,

    /// Write the final report as JSON to this path
    #[arg(long)]
    pub report_json: Option<PathBuf>,
}

impl Cli {
    pub fn validate(&self) -> TuneResult<()> {
        if self.bench_time == 0 {
            return Err(config_error!("--bench-time must be at least 1 second"));
        }
        if self.bench_scale == 0 {
            return Err(config_error!("--bench-scale must be at least 1"));
        }
        if self.pool_pgs == 0 {
            return Err(config_error!("--pool-pgs must be at least 1"));
        }
        if self.bench_block_size == 0 || self.bench_object_size == 0 {
            return Err(config_error!("benchmark block and object sizes must be non-zero"));
        }
        Ok(())
    }

    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            timeout: self.timeout,
            settle: Duration::from_secs(self.conf_sleep),
            seed: self.seed,
        }
    }

    pub fn ceph_config(&self) -> CephConfig {
        self.ceph_config_with_env(|key| std::env::var(key).ok())
    }

    pub fn ceph_config_with_env<F>(&self, lookup: F) -> CephConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = CephConfig {
            pool: PoolConfig {
                pg_num: self.pool_pgs,
                ..PoolConfig::default()
            },
            bench: BenchmarkConfig {
                seconds: self.bench_time,
                mode: self.bench_type,
                concurrency: self.bench_scale,
                block_size_kb: self.bench_block_size,
                object_size_kb: self.bench_object_size,
                ..BenchmarkConfig::default()
            },
            ..CephConfig::default()
        };
        if let Some(bin) = lookup(CEPH_BIN_ENV) {
            config.ceph_bin = bin.into();
        }
        if let Some(bin) = lookup(RADOS_BIN_ENV) {
            config.rados_bin = bin.into();
        }
        config
    }
}
