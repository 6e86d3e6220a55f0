// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![deny(clippy::all, clippy::pedantic)]
#![deny(clippy::unwrap_used, clippy::expect_used)]

mod args;
mod devices;

use crate::args::{Backend, CmdArgs, Parser};
use crate::devices::{SimFabric, cli_devices};

use config::ControllerConfig;
use metrics_exporter_prometheus::PrometheusBuilder;
use mgmt::{DeviceMap, Monitor, Provisioner};
use std::process::ExitCode;
use tokio::sync::watch;
use topology::Topology;
use tracectl::{LevelFilter, custom_target, get_trace_ctl, trace_target};
use tracing::{error, info, warn};

trace_target!("controller", LevelFilter::INFO, &["control-plane"]);
custom_target!("hyper", LevelFilter::ERROR, &[]);
custom_target!("metrics_exporter_prometheus", LevelFilter::WARN, &[]);

/// Some node could not be provisioned
const EXIT_PARTIAL: u8 = 2;

fn load(args: &CmdArgs) -> Result<(Topology, ControllerConfig), String> {
    let topology = Topology::from_file(args.topology()).map_err(|e| e.to_string())?;
    let mut config = match args.config() {
        Some(path) => ControllerConfig::from_file(path).map_err(|e| e.to_string())?,
        None => ControllerConfig::default(),
    };
    args.override_config(&mut config);
    config.validate().map_err(|e| e.to_string())?;
    config.tracing.apply().map_err(|e| e.to_string())?;
    Ok((topology, config))
}

async fn run(args: &CmdArgs, topology: &Topology, config: &ControllerConfig) -> ExitCode {
    if let Some(addr) = args.metrics_address() {
        if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
            error!("Failed to start metrics exporter on {addr}: {e}");
            return ExitCode::FAILURE;
        }
        info!("Serving metrics on {addr}");
    }

    let mut sim = None;
    let devices: DeviceMap = match args.backend() {
        Backend::Cli => match cli_devices(topology, config) {
            Ok(devices) => devices,
            Err(e) => {
                error!("{e}");
                return ExitCode::FAILURE;
            }
        },
        Backend::Sim => {
            let fabric = SimFabric::new(topology);
            let devices = fabric.devices.clone();
            sim = Some(fabric);
            devices
        }
    };

    let provisioner = Provisioner::new(devices.clone(), config.retry.clone());
    let report = provisioner.provision_topology(topology).await;
    let thresholds = provisioner.set_thresholds(config.threshold).await;
    let mut complete = report.is_complete();
    for (node, outcome) in &thresholds {
        if let Err(e) = outcome {
            error!("Threshold not set on {node}: {e}");
            complete = false;
        }
    }
    if let Some(sim) = &sim {
        sim.dump();
    }

    if args.monitor() {
        let (stop_tx, stop_rx) = watch::channel(false);
        if let Err(e) = ctrlc::set_handler(move || {
            let _ = stop_tx.send(true);
        }) {
            error!("Failed to set SIGINT handler: {e}");
            return ExitCode::FAILURE;
        }
        let monitor = Monitor::from_topology(topology, devices, config.monitor.clone());
        monitor.run(stop_rx).await;
    }

    if complete {
        info!("Done");
        ExitCode::SUCCESS
    } else {
        warn!("Some nodes were not fully provisioned");
        ExitCode::from(EXIT_PARTIAL)
    }
}

fn main() -> ExitCode {
    let args = CmdArgs::parse();
    let tctl = get_trace_ctl();
    if let Some(tracing) = args.tracing()
        && let Err(e) = tctl.setup_from_string(tracing)
    {
        error!("Invalid tracing configuration: {e}");
        return ExitCode::FAILURE;
    }
    if args.show_tracing_targets() {
        tctl.dump();
        return ExitCode::SUCCESS;
    }

    let (topology, config) = match load(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    info!(
        "Starting controller for {} nodes, threshold {} bytes",
        topology.nodes().count(),
        config.threshold
    );

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create runtime: {e}");
            return ExitCode::FAILURE;
        }
    };
    runtime.block_on(run(&args, &topology, &config))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use topology::Topology;
    use topology::samples::six_switch;

    #[test]
    fn shipped_topology() {
        let yaml = include_str!("../topologies/six-switch.yaml");
        assert_eq!(Topology::from_yaml(yaml).unwrap(), six_switch());
    }
}
