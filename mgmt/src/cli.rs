// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Device client driving a software switch through its management CLI.
//!
//! Each call spawns the CLI, writes the commands on its standard input and collects
//! its standard output. The CLI does not signal failures with its exit status, so the
//! output is inspected for errors.

use async_trait::async_trait;
use lpm::prefix::Ipv4Prefix;
use net::eth::mac::Mac;
use net::ids::{NodeId, PortId};
use routing::{EcmpGroupId, NextHop, RouteAction};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::device::{DeviceClient, DeviceError};

const TABLE_LPM: &str = "ipv4_lpm";
const TABLE_GROUP: &str = "ecmp_group";
const TABLE_MEMBER: &str = "ecmp_nhop";
const TABLE_ALTERNATE: &str = "alt_nhop";
const TABLE_SMAC: &str = "smac_rewrite";
const TABLES: [&str; 5] = [TABLE_LPM, TABLE_GROUP, TABLE_MEMBER, TABLE_ALTERNATE, TABLE_SMAC];

const REG_THRESHOLD: &str = "load_threshold";
const REG_COUNTER: &str = "byte_counter";

fn table_add(table: &str, action: &str, keys: &[String], params: &[String]) -> String {
    format!("table_add {table} {action} {} => {}", keys.join(" "), params.join(" "))
        .trim_end()
        .to_owned()
}

pub(crate) fn render_route(prefix: Ipv4Prefix, action: RouteAction) -> String {
    let key = [prefix.to_string()];
    match action {
        RouteAction::Forward(nhop) => table_add(
            TABLE_LPM,
            "set_nhop",
            &key,
            &[nhop.mac.to_string(), nhop.port.to_string()],
        ),
        RouteAction::Ecmp(group) => {
            table_add(TABLE_LPM, "set_ecmp_group", &key, &[group.to_string()])
        }
        RouteAction::Drop => table_add(TABLE_LPM, "drop", &key, &[]),
    }
}

pub(crate) fn render_group(group: EcmpGroupId, count: u16, base: u16) -> String {
    table_add(
        TABLE_GROUP,
        "set_ecmp_info",
        &[group.to_string()],
        &[count.to_string(), base.to_string()],
    )
}

pub(crate) fn render_member(group: EcmpGroupId, index: u16, nhop: NextHop) -> String {
    table_add(
        TABLE_MEMBER,
        "set_ecmp_nhop",
        &[group.to_string(), index.to_string()],
        &[nhop.mac.to_string(), nhop.port.to_string()],
    )
}

pub(crate) fn render_alternate(port: PortId, nhop: NextHop) -> String {
    table_add(
        TABLE_ALTERNATE,
        "set_alt_nhop",
        &[port.to_string()],
        &[nhop.mac.to_string(), nhop.port.to_string()],
    )
}

pub(crate) fn render_source_mac(port: PortId, mac: Mac) -> String {
    table_add(TABLE_SMAC, "set_smac", &[port.to_string()], &[mac.to_string()])
}

pub(crate) fn render_clear() -> String {
    TABLES
        .iter()
        .map(|table| format!("table_clear {table}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Look for errors in the output of the CLI
pub(crate) fn check_output(output: &str) -> Result<(), DeviceError> {
    match output.lines().find(|line| {
        let line = line.to_ascii_lowercase();
        line.contains("error") || line.contains("invalid")
    }) {
        Some(line) => Err(DeviceError::Rejected(line.trim().to_owned())),
        None => Ok(()),
    }
}

/// Extract the value out of the output of `register_read <register> <index>`, which
/// reads `<register>[<index>]= <value>`
pub(crate) fn parse_register_read(
    output: &str,
    register: &str,
    index: u16,
) -> Result<u64, DeviceError> {
    let cell = format!("{register}[{index}]");
    let line = output
        .lines()
        .find(|line| line.contains(&cell) && line.contains('='))
        .ok_or_else(|| DeviceError::BadResponse(format!("no value for {cell}")))?;
    let value = line.rsplit('=').next().unwrap_or_default().trim();
    value
        .parse::<u64>()
        .map_err(|e| DeviceError::BadResponse(format!("bad value '{value}' for {cell}: {e}")))
}

/// A node reached through `simple_switch_CLI --thrift-port <port>`
#[derive(Debug, Clone)]
pub struct SimpleSwitchCli {
    node: NodeId,
    cli_path: String,
    thrift_port: u16,
    timeout: Duration,
}

impl SimpleSwitchCli {
    #[must_use]
    pub fn new(node: &NodeId, cli_path: &str, thrift_port: u16, timeout: Duration) -> Self {
        Self {
            node: node.clone(),
            cli_path: cli_path.to_owned(),
            thrift_port,
            timeout,
        }
    }

    #[must_use]
    pub fn thrift_port(&self) -> u16 {
        self.thrift_port
    }

    async fn exchange(&self, commands: &str) -> Result<String, DeviceError> {
        let mut child = Command::new(&self.cli_path)
            .arg("--thrift-port")
            .arg(self.thrift_port.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DeviceError::Transport(format!("can't run {}: {e}", self.cli_path)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(format!("{commands}\n").as_bytes())
                .await
                .map_err(|e| DeviceError::Transport(e.to_string()))?;
        }

        let output = timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| DeviceError::Timeout)?
            .map_err(|e| DeviceError::Transport(e.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("{}: CLI exited with {}: {stderr}", self.node, output.status);
            return Err(DeviceError::Transport(format!(
                "CLI exited with {}",
                output.status
            )));
        }
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        trace!("{}: '{commands}' -> '{stdout}'", self.node);
        Ok(stdout)
    }

    async fn run(&self, commands: &str) -> Result<(), DeviceError> {
        debug!("{}: {commands}", self.node);
        let output = self.exchange(commands).await?;
        check_output(&output)
    }
}

#[async_trait]
impl DeviceClient for SimpleSwitchCli {
    fn node(&self) -> &NodeId {
        &self.node
    }
    async fn add_route(&self, prefix: Ipv4Prefix, action: RouteAction) -> Result<(), DeviceError> {
        self.run(&render_route(prefix, action)).await
    }
    async fn add_ecmp_group(
        &self,
        group: EcmpGroupId,
        count: u16,
        base: u16,
    ) -> Result<(), DeviceError> {
        self.run(&render_group(group, count, base)).await
    }
    async fn add_ecmp_member(
        &self,
        group: EcmpGroupId,
        index: u16,
        nhop: NextHop,
    ) -> Result<(), DeviceError> {
        self.run(&render_member(group, index, nhop)).await
    }
    async fn add_alternate(&self, port: PortId, nhop: NextHop) -> Result<(), DeviceError> {
        self.run(&render_alternate(port, nhop)).await
    }
    async fn add_source_mac(&self, port: PortId, mac: Mac) -> Result<(), DeviceError> {
        self.run(&render_source_mac(port, mac)).await
    }
    async fn clear_tables(&self) -> Result<(), DeviceError> {
        self.run(&render_clear()).await
    }
    async fn write_threshold(&self, value: u64) -> Result<(), DeviceError> {
        self.run(&format!("register_write {REG_THRESHOLD} 0 {value}"))
            .await
    }
    async fn read_counter(&self, port: PortId) -> Result<u64, DeviceError> {
        let output = self
            .exchange(&format!("register_read {REG_COUNTER} {port}"))
            .await?;
        check_output(&output)?;
        parse_register_read(&output, REG_COUNTER, port.as_u16())
    }
    async fn reset_counters(&self) -> Result<(), DeviceError> {
        self.run(&format!("register_reset {REG_COUNTER}")).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn nhop() -> NextHop {
        NextHop::new(PortId::new(2), Mac([0, 0, 3, 0, 0, 1]))
    }

    #[test]
    fn commands() {
        let prefix: Ipv4Prefix = "10.0.2.0/24".parse().unwrap();
        assert_eq!(
            render_route(prefix, RouteAction::Forward(nhop())),
            "table_add ipv4_lpm set_nhop 10.0.2.0/24 => 00:00:03:00:00:01 2"
        );
        assert_eq!(
            render_route(prefix, RouteAction::Ecmp(EcmpGroupId::new(4))),
            "table_add ipv4_lpm set_ecmp_group 10.0.2.0/24 => 4"
        );
        assert_eq!(
            render_route(prefix, RouteAction::Drop),
            "table_add ipv4_lpm drop 10.0.2.0/24 =>"
        );
        assert_eq!(
            render_group(EcmpGroupId::new(4), 3, 0),
            "table_add ecmp_group set_ecmp_info 4 => 3 0"
        );
        assert_eq!(
            render_member(EcmpGroupId::new(4), 1, nhop()),
            "table_add ecmp_nhop set_ecmp_nhop 4 1 => 00:00:03:00:00:01 2"
        );
        assert_eq!(
            render_alternate(PortId::new(3), nhop()),
            "table_add alt_nhop set_alt_nhop 3 => 00:00:03:00:00:01 2"
        );
        assert_eq!(
            render_source_mac(PortId::new(3), Mac([0, 0, 1, 0, 0, 3])),
            "table_add smac_rewrite set_smac 3 => 00:00:01:00:00:03"
        );
        assert_eq!(render_clear().lines().count(), 5);
        assert!(render_clear().starts_with("table_clear ipv4_lpm\n"));
    }

    #[test]
    fn errors_in_output() {
        assert!(check_output("Obtaining JSON from switch...\nDone\nRuntimeCmd: ").is_ok());
        assert_eq!(
            check_output("RuntimeCmd: Error: Invalid table name (foo)\n"),
            Err(DeviceError::Rejected(
                "RuntimeCmd: Error: Invalid table name (foo)".to_owned()
            ))
        );
        assert!(check_output("Invalid table operation (DUPLICATE_ENTRY)").is_err());
    }

    #[test]
    fn register_values() {
        let output = "Obtaining JSON from switch...\nDone\nControl utility for runtime P4 table manipulation\nRuntimeCmd: byte_counter[3]= 123456\nRuntimeCmd: \n";
        assert_eq!(parse_register_read(output, "byte_counter", 3), Ok(123_456));
        assert!(matches!(
            parse_register_read(output, "byte_counter", 2),
            Err(DeviceError::BadResponse(_))
        ));
        assert!(matches!(
            parse_register_read("byte_counter[1]= lots", "byte_counter", 1),
            Err(DeviceError::BadResponse(_))
        ));
    }

    #[tokio::test]
    async fn missing_cli_is_a_transport_error() {
        let cli = SimpleSwitchCli::new(
            &NodeId::from("s1"),
            "/nonexistent/simple_switch_CLI",
            9090,
            Duration::from_secs(1),
        );
        assert_eq!(cli.thrift_port(), 9090);
        assert!(matches!(
            cli.reset_counters().await,
            Err(DeviceError::Transport(_))
        ));
    }
}
