//! In-memory gateway for engine tests

use crate::error::{Result, VagrantError};
use crate::gateway::{CommandOptions, ForwardedPort, SshConfig, VagrantGateway};
use crate::machine::{MachineState, StatusMap, VmInfo, VmInfoMap};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::TempDir;
use tokio::time::Instant;

/// Gateway call as recorded by [`MockGateway`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Up { parallel: bool },
    Status,
    Reload,
    Destroy,
    SshConfig,
    Port(String),
}

struct Recorded {
    call: Call,
    deadline: Option<Instant>,
    env: Option<Vec<String>>,
}

#[derive(Default)]
pub struct MockGateway {
    machines: VmInfoMap,
    status: StatusMap,
    ssh: Vec<(String, SshConfig)>,
    ports: HashMap<String, Vec<ForwardedPort>>,
    failing: Vec<Call>,
    log: Mutex<Vec<Recorded>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_machines(mut self, names: &[&str]) -> Self {
        for name in names {
            self.machines
                .insert(name.to_string(), VmInfo::new(*name, "virtualbox"));
        }
        self
    }

    pub fn with_status(mut self, entries: &[(&str, &str)]) -> Self {
        for (name, state) in entries {
            self.status
                .insert(name.to_string(), MachineState::parse(state));
        }
        self
    }

    pub fn with_ssh(self, name: &str, host: &str, port: u16) -> Self {
        let config = SshConfig {
            host: name.to_string(),
            host_name: host.to_string(),
            user: "vagrant".to_string(),
            port,
            identity_file: Some(PathBuf::from(format!(
                "/nonexistent/.vagrant/machines/{}/private_key",
                name
            ))),
            ..Default::default()
        };
        self.with_ssh_config(name, config)
    }

    pub fn with_ssh_config(mut self, name: &str, config: SshConfig) -> Self {
        self.ssh.push((name.to_string(), config));
        self
    }

    pub fn with_ports(mut self, name: &str, ports: &[(u16, u16)]) -> Self {
        self.ports.insert(
            name.to_string(),
            ports
                .iter()
                .map(|(guest, host)| ForwardedPort {
                    guest: *guest,
                    host: *host,
                })
                .collect(),
        );
        self
    }

    pub fn failing(mut self, call: Call) -> Self {
        self.failing.push(call);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.log.lock().unwrap().iter().map(|r| r.call.clone()).collect()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.call == *call)
            .count()
    }

    pub fn deadlines(&self) -> Vec<Option<Instant>> {
        self.log.lock().unwrap().iter().map(|r| r.deadline).collect()
    }

    pub fn envs(&self) -> Vec<Option<Vec<String>>> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.env.clone())
            .collect()
    }

    fn record(&self, call: Call, options: &CommandOptions) -> Result<()> {
        let fail = self.failing.contains(&call);
        let command = format!("{:?}", call).to_lowercase();
        self.log.lock().unwrap().push(Recorded {
            call,
            deadline: options.deadline,
            env: options.env.clone(),
        });

        if fail {
            return Err(VagrantError::CommandFailed {
                command,
                status: "exit status: 1".to_string(),
                message: "mock failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl VagrantGateway for MockGateway {
    async fn up(&self, options: &CommandOptions, parallel: bool) -> Result<VmInfoMap> {
        self.record(Call::Up { parallel }, options)?;
        Ok(self.machines.clone())
    }

    async fn status(&self, options: &CommandOptions) -> Result<StatusMap> {
        self.record(Call::Status, options)?;
        Ok(self.status.clone())
    }

    async fn reload(&self, options: &CommandOptions) -> Result<StatusMap> {
        self.record(Call::Reload, options)?;
        Ok(StatusMap::new())
    }

    async fn destroy(&self, options: &CommandOptions) -> Result<()> {
        self.record(Call::Destroy, options)
    }

    async fn ssh_config(&self, options: &CommandOptions) -> Result<Vec<(String, SshConfig)>> {
        self.record(Call::SshConfig, options)?;
        Ok(self.ssh.clone())
    }

    async fn port(&self, options: &CommandOptions, machine: &str) -> Result<Vec<ForwardedPort>> {
        self.record(Call::Port(machine.to_string()), options)?;
        Ok(self.ports.get(machine).cloned().unwrap_or_default())
    }
}

/// Temporary directory containing an empty Vagrantfile.
pub fn vagrant_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("Vagrantfile"), "").unwrap();
    dir
}
