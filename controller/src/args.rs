// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use config::ControllerConfig;
use std::net::SocketAddr;
use std::path::PathBuf;

pub(crate) use clap::Parser;

/// How nodes are reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum Backend {
    /// Through the management CLI of each software switch
    Cli,
    /// In-process nodes, for dry runs
    Sim,
}

#[derive(Parser, Debug)]
#[command(name = "Adaptive ECMP controller")]
#[command(version = "0.1")]
#[command(about = "Provisions ECMP tables with congestion-aware alternates and monitors load", long_about = None)]
pub(crate) struct CmdArgs {
    #[arg(long, value_name = "topology file (YAML)")]
    topology: PathBuf,
    #[arg(long, value_name = "controller config file (YAML)")]
    config: Option<PathBuf>,
    #[arg(long, value_name = "load threshold in bytes, 0 to disable rerouting")]
    threshold: Option<u64>,
    #[arg(long, default_value_t = false, help = "keep polling counters after provisioning")]
    monitor: bool,
    #[arg(long, value_name = "seconds between counter polls")]
    monitor_interval: Option<u64>,
    #[arg(long, value_name = "seconds between counter resets")]
    reset_interval: Option<u64>,
    #[arg(long, default_value_t = false, conflicts_with = "reset_interval")]
    no_reset: bool,
    #[arg(long, value_enum, default_value_t = Backend::Cli)]
    backend: Backend,
    #[arg(long, value_name = "path to simple_switch_CLI")]
    cli_path: Option<String>,
    #[arg(long, value_name = "tag=level,...")]
    tracing: Option<String>,
    #[arg(long, default_value_t = false)]
    show_tracing_targets: bool,
    #[arg(long, value_name = "address:port to serve prometheus metrics on")]
    metrics_address: Option<SocketAddr>,
}

impl CmdArgs {
    pub fn topology(&self) -> &PathBuf {
        &self.topology
    }
    pub fn config(&self) -> Option<&PathBuf> {
        self.config.as_ref()
    }
    pub fn monitor(&self) -> bool {
        self.monitor
    }
    pub fn backend(&self) -> Backend {
        self.backend
    }
    pub fn tracing(&self) -> Option<&str> {
        self.tracing.as_deref()
    }
    pub fn show_tracing_targets(&self) -> bool {
        self.show_tracing_targets
    }
    pub fn metrics_address(&self) -> Option<SocketAddr> {
        self.metrics_address
    }

    /// Override the values of a config with those given on the command line
    pub fn override_config(&self, config: &mut ControllerConfig) {
        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }
        if let Some(secs) = self.monitor_interval {
            config.monitor.poll_interval_ms = secs.saturating_mul(1000);
        }
        if let Some(secs) = self.reset_interval {
            config.monitor.reset_interval_ms = Some(secs.saturating_mul(1000));
        }
        if self.no_reset {
            config.monitor.reset_interval_ms = None;
        }
        if let Some(path) = &self.cli_path {
            config.device.cli_path.clone_from(path);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn minimal() {
        let args = CmdArgs::try_parse_from(["controller", "--topology", "topo.yaml"]).unwrap();
        assert_eq!(args.topology(), &PathBuf::from("topo.yaml"));
        assert_eq!(args.backend(), Backend::Cli);
        assert!(!args.monitor());
        let mut config = ControllerConfig::default();
        args.override_config(&mut config);
        assert_eq!(config, ControllerConfig::default());
    }

    #[test]
    fn topology_is_required() {
        assert!(CmdArgs::try_parse_from(["controller", "--monitor"]).is_err());
    }

    #[test]
    fn overrides() {
        let args = CmdArgs::try_parse_from([
            "controller",
            "--topology",
            "topo.yaml",
            "--threshold",
            "0",
            "--monitor",
            "--monitor-interval",
            "2",
            "--reset-interval",
            "10",
            "--backend",
            "sim",
            "--cli-path",
            "/usr/local/bin/simple_switch_CLI",
            "--metrics-address",
            "127.0.0.1:9100",
        ])
        .unwrap();
        assert_eq!(args.backend(), Backend::Sim);
        assert_eq!(args.metrics_address(), Some("127.0.0.1:9100".parse().unwrap()));
        let mut config = ControllerConfig::default();
        args.override_config(&mut config);
        assert_eq!(config.threshold, 0);
        assert_eq!(config.monitor.poll_interval_ms, 2000);
        assert_eq!(config.monitor.reset_interval_ms, Some(10_000));
        assert_eq!(config.device.cli_path, "/usr/local/bin/simple_switch_CLI");
    }

    #[test]
    fn no_reset() {
        let args =
            CmdArgs::try_parse_from(["controller", "--topology", "t.yaml", "--no-reset"]).unwrap();
        let mut config = ControllerConfig::default();
        args.override_config(&mut config);
        assert_eq!(config.monitor.reset_interval_ms, None);

        assert!(
            CmdArgs::try_parse_from([
                "controller",
                "--topology",
                "t.yaml",
                "--no-reset",
                "--reset-interval",
                "3"
            ])
            .is_err()
        );
    }
}
