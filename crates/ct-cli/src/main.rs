mod cli;
mod logging;

use anyhow::Context;
use clap::Parser;
use ct_cluster::{CephCluster, SimulatedCluster};
use ct_optimizer::{SearchReport, TuningSession};
use ct_types::{ControlSurface, OptionCatalog, TuneResult};
use std::path::Path;
use tracing::{error, info};

use crate::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_file)?;

    let report = match run(&cli).await {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "cephtune aborted");
            return Err(e.into());
        }
    };

    if let Some(path) = &cli.report_json {
        write_report(path, &report)?;
        info!(path = %path.display(), "report written");
    }
    Ok(())
}

async fn run(cli: &Cli) -> TuneResult<SearchReport> {
    cli.validate()?;
    let catalog = OptionCatalog::from_file(&cli.conf)?;

    let mut surface: Box<dyn ControlSurface> = if cli.simulate {
        info!("running against a simulated cluster");
        Box::new(SimulatedCluster::from_catalog(&catalog))
    } else {
        Box::new(CephCluster::new(cli.ceph_config()))
    };

    let session = TuningSession::new(cli.search_config());
    session.execute(&catalog, surface.as_mut()).await
}

fn write_report(path: &Path, report: &SearchReport) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ct_optimizer::SearchStatus;
    use std::io::Write;

    fn catalog_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "- name: osd_op_num_shards\n  type: int\n  min: 1\n  max: 16\n\
             - name: osd_recovery_sleep\n  type: float\n  min: 0.0\n  max: 0.5\n"
        )
        .unwrap();
        file
    }

    #[tokio::test]
    async fn simulated_run_finds_an_improvement() {
        let catalog = catalog_file();
        let cli = Cli::try_parse_from([
            "cephtune",
            "--simulate",
            "--conf",
            catalog.path().to_str().unwrap(),
            "--conf-sleep",
            "0",
            "--timeout",
            "5",
            "--seed",
            "1",
        ])
        .unwrap();

        let report = run(&cli).await.unwrap();
        assert_eq!(report.status, SearchStatus::Completed);
        assert!(report.found_improvement());
        assert!(report.highest_score > 0.0);
        assert_eq!(report.best_config.len(), 2);
    }

    #[tokio::test]
    async fn missing_catalog_is_fatal() {
        let cli = Cli::try_parse_from([
            "cephtune",
            "--simulate",
            "--conf",
            "/nonexistent/options.yaml",
        ])
        .unwrap();
        assert!(run(&cli).await.is_err());
    }

    #[tokio::test]
    async fn report_is_written_as_json() {
        let catalog = catalog_file();
        let cli = Cli::try_parse_from([
            "cephtune",
            "--simulate",
            "--conf",
            catalog.path().to_str().unwrap(),
            "--conf-sleep",
            "0",
            "--timeout",
            "2",
            "--seed",
            "5",
        ])
        .unwrap();
        let report = run(&cli).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        write_report(&path, &report).unwrap();

        let back: SearchReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn bundled_catalog_is_valid() {
        let catalog = OptionCatalog::from_yaml_str(include_str!("../../../test.yaml")).unwrap();
        assert!(catalog.names().contains(&"osd_op_num_shards"));
    }
}
