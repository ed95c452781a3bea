//! Ceph control surface built on the `ceph` and `rados` command-line tools.

use async_trait::async_trait;
use ct_types::{ControlError, ControlResult, ControlSurface, CurrentConfigValue};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::{debug, info};

use crate::runner::{describe, CommandRunner, ProcessRunner};

/// `rados bench` workload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BenchMode {
    #[default]
    Write,
    Seq,
    Rand,
}

impl BenchMode {
    /// Read workloads need objects left behind by a write run.
    pub fn needs_prefill(&self) -> bool {
        !matches!(self, Self::Write)
    }
}

impl fmt::Display for BenchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Write => write!(f, "write"),
            Self::Seq => write!(f, "seq"),
            Self::Rand => write!(f, "rand"),
        }
    }
}

impl FromStr for BenchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "write" => Ok(Self::Write),
            "seq" => Ok(Self::Seq),
            "rand" => Ok(Self::Rand),
            other => Err(format!(
                "unknown benchmark type '{other}', expected one of write, seq, rand"
            )),
        }
    }
}

/// The throwaway pool benchmarks run against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    pub name: String,
    /// Used for both `pg_num` and `pgp_num`.
    pub pg_num: u32,
    pub application: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            name: "testbench".to_string(),
            pg_num: 64,
            application: "rbd".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    pub seconds: u64,
    pub mode: BenchMode,
    /// Concurrent IOs (`-t`).
    pub concurrency: u32,
    pub block_size_kb: u64,
    pub object_size_kb: u64,
    /// Output label whose number becomes the score.
    pub score_label: String,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            seconds: 30,
            mode: BenchMode::Write,
            concurrency: 4,
            block_size_kb: 4000,
            object_size_kb: 4000,
            score_label: "Average IOPS".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CephConfig {
    pub ceph_bin: PathBuf,
    pub rados_bin: PathBuf,
    /// Daemon whose configuration is read and snapshotted.
    pub read_target: String,
    /// Daemons new values are injected into.
    pub apply_target: String,
    pub pool: PoolConfig,
    pub bench: BenchmarkConfig,
}

impl Default for CephConfig {
    fn default() -> Self {
        Self {
            ceph_bin: PathBuf::from("/usr/bin/ceph"),
            rados_bin: PathBuf::from("/usr/bin/rados"),
            read_target: "osd.0".to_string(),
            apply_target: "osd.*".to_string(),
            pool: PoolConfig::default(),
            bench: BenchmarkConfig::default(),
        }
    }
}

/// Control surface for a live Ceph cluster.
#[derive(Debug)]
pub struct CephCluster<R: CommandRunner = ProcessRunner> {
    config: CephConfig,
    runner: R,
}

impl CephCluster<ProcessRunner> {
    pub fn new(config: CephConfig) -> Self {
        Self::with_runner(config, ProcessRunner::new())
    }
}

impl<R: CommandRunner> CephCluster<R> {
    pub fn with_runner(config: CephConfig, runner: R) -> Self {
        Self { config, runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    async fn ceph(&self, args: &[&str]) -> ControlResult<String> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        self.runner.run(&self.config.ceph_bin, &args).await
    }

    async fn rados(&self, args: Vec<String>) -> ControlResult<String> {
        self.runner.run(&self.config.rados_bin, &args).await
    }

    fn bench_args(&self, mode: BenchMode, keep_objects: bool) -> Vec<String> {
        let bench = &self.config.bench;
        let mut args = vec![
            "bench".to_string(),
            "-p".to_string(),
            self.config.pool.name.clone(),
            bench.seconds.to_string(),
            mode.to_string(),
            "-t".to_string(),
            bench.concurrency.to_string(),
            "-b".to_string(),
            (bench.block_size_kb * 1024).to_string(),
            "-O".to_string(),
            (bench.object_size_kb * 1024).to_string(),
        ];
        if keep_objects {
            args.push("--no-cleanup".to_string());
        }
        args
    }
}

#[async_trait]
impl<R: CommandRunner> ControlSurface for CephCluster<R> {
    async fn apply_option(&mut self, name: &str, value: &str) -> ControlResult<()> {
        let arg = format!("--{name}={value}");
        self.ceph(&["tell", &self.config.apply_target, "injectargs", &arg])
            .await?;
        Ok(())
    }

    async fn read_option(&mut self, name: &str) -> ControlResult<String> {
        let out = self
            .ceph(&["config", "get", &self.config.read_target, name])
            .await?;
        Ok(out.trim().to_string())
    }

    async fn snapshot_config(&mut self) -> ControlResult<Vec<CurrentConfigValue>> {
        let args = ["config", "show", self.config.read_target.as_str(), "-f", "json"];
        let out = self.ceph(&args).await?;
        serde_json::from_str(&out).map_err(|e| ControlError::InvalidOutput {
            command: format!("ceph {}", args.join(" ")),
            message: e.to_string(),
        })
    }

    async fn run_benchmark(&mut self) -> ControlResult<f64> {
        let args = self.bench_args(self.config.bench.mode, false);
        let out = self.rados(args).await?;
        let score = parse_score(&out, &self.config.bench.score_label)?;
        debug!(score, label = %self.config.bench.score_label, "benchmark finished");
        Ok(score)
    }

    async fn create_pool(&mut self) -> ControlResult<()> {
        let pool = &self.config.pool;
        let pgs = pool.pg_num.to_string();
        self.ceph(&["osd", "pool", "create", &pool.name, &pgs, &pgs])
            .await?;
        self.ceph(&["osd", "pool", "application", "enable", &pool.name, &pool.application])
            .await?;

        if self.config.bench.mode.needs_prefill() {
            let args = self.bench_args(BenchMode::Write, true);
            info!(
                command = %describe(&self.config.rados_bin, &args),
                "prefilling benchmark pool"
            );
            self.rados(args).await?;
        }

        info!(pool = %pool.name, pg_num = pool.pg_num, "benchmark pool created");
        Ok(())
    }

    async fn destroy_pool(&mut self) -> ControlResult<()> {
        let name = &self.config.pool.name;
        let allow = self
            .ceph(&["tell", "mon.*", "injectargs", "--mon_allow_pool_delete", "true"])
            .await;
        let delete = self
            .ceph(&[
                "osd",
                "pool",
                "delete",
                name,
                name,
                "--yes-i-really-really-mean-it",
            ])
            .await;
        allow.and(delete)?;
        info!(pool = %name, "benchmark pool removed");
        Ok(())
    }
}

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[-+]?[0-9]*\.?[0-9]+").expect("number pattern is a valid regex")
    })
}

/// Extract the first number on the first line of `output` containing `label`.
pub fn parse_score(output: &str, label: &str) -> ControlResult<f64> {
    let line = output
        .lines()
        .find(|line| line.contains(label))
        .ok_or_else(|| ControlError::ScoreNotFound {
            label: label.to_string(),
        })?;

    let number = number_pattern()
        .find(line)
        .ok_or_else(|| ControlError::InvalidOutput {
            command: "rados bench".to_string(),
            message: format!("no number on line '{line}'"),
        })?;

    number
        .as_str()
        .parse::<f64>()
        .map_err(|e| ControlError::InvalidOutput {
            command: "rados bench".to_string(),
            message: format!("cannot parse score '{}': {e}", number.as_str()),
        })
}
