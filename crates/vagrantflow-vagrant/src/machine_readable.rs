//! `--machine-readable` output decoding
//!
//! Every record is one line of comma separated fields:
//! `timestamp,target,type,data...`. Commas inside a field are written as
//! `%!(VAGRANT_COMMA)` and newlines as a literal `\n`.

use crate::ssh_config::parse_ssh_config;
use vagrantflow_core::{
    ForwardedPort, MachineState, Result, SshConfig, StatusMap, VagrantError, VmInfo, VmInfoMap,
};

const COMMA: &str = "%!(VAGRANT_COMMA)";

/// One machine-readable record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub timestamp: u64,
    /// Machine name, empty for global records
    pub target: String,
    pub kind: String,
    pub data: Vec<String>,
}

impl Line {
    pub fn data(&self, index: usize) -> Option<&str> {
        self.data.get(index).map(String::as_str)
    }
}

/// Parse one record; anything that is not machine-readable yields `None`.
pub fn parse_line(raw: &str) -> Option<Line> {
    let raw = raw.trim_end_matches(['\r', '\n']);
    let mut fields = raw.split(',');

    let timestamp = fields.next()?.parse::<u64>().ok()?;
    let target = decode(fields.next()?);
    let kind = decode(fields.next()?);
    let data = fields.map(decode).collect();

    Some(Line {
        timestamp,
        target,
        kind,
        data,
    })
}

/// Parse all records of an output, skipping lines that are not machine-readable
/// (plugin warnings and the like).
pub fn parse_output(output: &str) -> Vec<Line> {
    output.lines().filter_map(parse_line).collect()
}

fn decode(field: &str) -> String {
    field
        .replace(COMMA, ",")
        .replace("\\n", "\n")
        .replace("\\r", "\r")
}

/// Message of the `error-exit` record, if vagrant reported one
pub fn error_message(lines: &[Line]) -> Option<String> {
    lines
        .iter()
        .find(|line| line.kind == "error-exit")
        .map(|line| {
            // data: [error class, message]
            line.data(1)
                .or_else(|| line.data(0))
                .unwrap_or_default()
                .trim()
                .to_string()
        })
}

/// Machines reported by `vagrant up` through `metadata,provider,<name>` records
pub fn vm_info(lines: &[Line]) -> VmInfoMap {
    let mut info = VmInfoMap::new();
    for line in lines {
        if line.kind == "metadata" && line.data(0) == Some("provider") && !line.target.is_empty()
        {
            let provider = line.data(1).unwrap_or_default();
            info.insert(line.target.clone(), VmInfo::new(&line.target, provider));
        }
    }
    info
}

/// Machine states from `state,<token>` records
pub fn statuses(lines: &[Line]) -> StatusMap {
    let mut status = StatusMap::new();
    for line in lines {
        if line.kind == "state"
            && !line.target.is_empty()
            && let Some(token) = line.data(0)
        {
            status.insert(line.target.clone(), MachineState::parse(token));
        }
    }
    status
}

/// Forwarded ports from `forwarded_port,<guest>,<host>` records
pub fn forwarded_ports(lines: &[Line]) -> Result<Vec<ForwardedPort>> {
    lines
        .iter()
        .filter(|line| line.kind == "forwarded_port")
        .map(|line| {
            Ok(ForwardedPort {
                guest: parse_port(line.data(0))?,
                host: parse_port(line.data(1))?,
            })
        })
        .collect()
}

/// SSH configuration per machine from `ssh-config` records, in output order.
pub fn ssh_configs(lines: &[Line]) -> Result<Vec<(String, SshConfig)>> {
    let mut configs = Vec::new();
    for line in lines.iter().filter(|line| line.kind == "ssh-config") {
        let text = line.data(0).unwrap_or_default();
        for (host, config) in parse_ssh_config(text)? {
            let machine = if line.target.is_empty() {
                host
            } else {
                line.target.clone()
            };
            configs.push((machine, config));
        }
    }
    Ok(configs)
}

fn parse_port(value: Option<&str>) -> Result<u16> {
    let value = value.unwrap_or_default().trim();
    value
        .parse::<u16>()
        .map_err(|_| VagrantError::Parse(format!("invalid port '{}'", value)))
}
