//! Resource snapshot and its projection from vagrant queries

use crate::error::Result;
use crate::gateway::{CommandOptions, ForwardedPort, SshConfig, VagrantGateway};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Connection type of every endpoint. Only ssh is supported.
pub const CONNECTION_TYPE: &str = "ssh";

/// SSH connection information for one machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshEndpoint {
    #[serde(rename = "type")]
    pub connection_type: String,
    pub user: String,
    pub host: String,
    pub port: String,
    /// Contents of the identity file, empty when it could not be read
    pub private_key: String,
    /// Always "false": vagrant does not report agent forwarding
    pub agent: String,
}

impl SshEndpoint {
    pub fn new(config: &SshConfig, private_key: String) -> Self {
        Self {
            connection_type: CONNECTION_TYPE.to_string(),
            user: config.user.clone(),
            host: config.host_name.clone(),
            port: config.port.to_string(),
            private_key,
            agent: "false".to_string(),
        }
    }
}

/// Observed state of a reconciled resource.
///
/// `machine_names`, `ssh_config` and `ports` are index aligned: entry `i` of
/// each list describes the same machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub id: String,
    pub machine_names: Vec<String>,
    pub ssh_config: Vec<SshEndpoint>,
    pub ports: Vec<Vec<ForwardedPort>>,
    /// Default connection target, only set for single-machine environments
    pub connection_info: Option<SshEndpoint>,
}

impl ResourceSnapshot {
    /// Lookup of one machine's endpoint and ports by name.
    pub fn machine(&self, name: &str) -> Option<(&SshEndpoint, &[ForwardedPort])> {
        let index = self.machine_names.iter().position(|n| n == name)?;
        Some((&self.ssh_config[index], self.ports[index].as_slice()))
    }
}

/// Query ssh-config (and ports when `get_ports` is set) and project the results.
///
/// Machine order is whatever `vagrant ssh-config` reports; it is not sorted.
pub async fn read_vagrant_info<G>(
    gateway: &G,
    options: &CommandOptions,
    get_ports: bool,
    id: String,
) -> Result<ResourceSnapshot>
where
    G: VagrantGateway + ?Sized,
{
    tracing::info!("Getting vagrant ssh-config...");
    let configs = gateway.ssh_config(options).await?;

    let mut machine_names = Vec::with_capacity(configs.len());
    let mut ssh_config = Vec::with_capacity(configs.len());
    for (machine, config) in &configs {
        let private_key = read_private_key(config.identity_file.as_deref()).await;
        ssh_config.push(SshEndpoint::new(config, private_key));
        machine_names.push(machine.clone());
    }

    let mut ports = Vec::with_capacity(machine_names.len());
    for machine in &machine_names {
        if get_ports {
            tracing::info!("Getting forwarded ports of {}...", machine);
            ports.push(gateway.port(options, machine).await?);
        } else {
            ports.push(Vec::new());
        }
    }

    let connection_info = match ssh_config.as_slice() {
        [only] => Some(only.clone()),
        _ => None,
    };

    Ok(ResourceSnapshot {
        id,
        machine_names,
        ssh_config,
        ports,
        connection_info,
    })
}

/// Read the identity file; a missing or unreadable file yields an empty key.
async fn read_private_key(path: Option<&Path>) -> String {
    let Some(path) = path else {
        return String::new();
    };

    match tokio::fs::read(path).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            tracing::debug!("Could not read private key {}: {}", path.display(), e);
            String::new()
        }
    }
}
