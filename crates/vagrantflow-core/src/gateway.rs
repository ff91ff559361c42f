//! Gateway trait definition
//!
//! The engine talks to vagrant only through [`VagrantGateway`]. Every call
//! gets its own [`CommandOptions`]; nothing is shared between invocations.

use crate::error::Result;
use crate::machine::{StatusMap, VmInfoMap};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Options for a single vagrant invocation
#[derive(Debug, Clone)]
pub struct CommandOptions {
    /// Directory containing the Vagrantfile; used as the working directory
    pub dir: PathBuf,

    /// `KEY=VALUE` entries layered over the ambient environment.
    /// `None` leaves the environment untouched.
    pub env: Option<Vec<String>>,

    /// Point in time after which the process is killed
    pub deadline: Option<Instant>,

    /// Cancelling this token kills the process
    pub cancel: CancellationToken,
}

impl CommandOptions {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            env: None,
            deadline: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_env(mut self, env: Option<Vec<String>>) -> Self {
        self.env = env;
        self
    }

    /// Derive the deadline from a timeout measured from now.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.deadline = timeout.map(|t| Instant::now() + t);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// `vagrant ssh-config` block for one machine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshConfig {
    pub host: String,
    pub host_name: String,
    pub user: String,
    pub port: u16,
    pub identity_file: Option<PathBuf>,

    /// Options not mapped to a field above (StrictHostKeyChecking, LogLevel, ...)
    #[serde(default)]
    pub additional_fields: BTreeMap<String, String>,
}

/// Forwarded port of one machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardedPort {
    pub guest: u16,
    pub host: u16,
}

/// Vagrant CLI abstraction
///
/// Implementations must kill the underlying process when the deadline passes
/// or the cancellation token fires, before returning the error.
#[async_trait]
pub trait VagrantGateway: Send + Sync {
    /// `vagrant up`. Returns the machines that were brought up.
    async fn up(&self, options: &CommandOptions, parallel: bool) -> Result<VmInfoMap>;

    /// `vagrant status`
    async fn status(&self, options: &CommandOptions) -> Result<StatusMap>;

    /// `vagrant reload`. Does not create machines that do not exist yet.
    async fn reload(&self, options: &CommandOptions) -> Result<StatusMap>;

    /// `vagrant destroy --force`. Destroying absent machines succeeds.
    async fn destroy(&self, options: &CommandOptions) -> Result<()>;

    /// `vagrant ssh-config`, in the order vagrant reports the machines
    async fn ssh_config(&self, options: &CommandOptions) -> Result<Vec<(String, SshConfig)>>;

    /// `vagrant port <machine>`
    async fn port(&self, options: &CommandOptions, machine: &str) -> Result<Vec<ForwardedPort>>;
}

#[async_trait]
impl<G: VagrantGateway + ?Sized> VagrantGateway for std::sync::Arc<G> {
    async fn up(&self, options: &CommandOptions, parallel: bool) -> Result<VmInfoMap> {
        (**self).up(options, parallel).await
    }

    async fn status(&self, options: &CommandOptions) -> Result<StatusMap> {
        (**self).status(options).await
    }

    async fn reload(&self, options: &CommandOptions) -> Result<StatusMap> {
        (**self).reload(options).await
    }

    async fn destroy(&self, options: &CommandOptions) -> Result<()> {
        (**self).destroy(options).await
    }

    async fn ssh_config(&self, options: &CommandOptions) -> Result<Vec<(String, SshConfig)>> {
        (**self).ssh_config(options).await
    }

    async fn port(&self, options: &CommandOptions, machine: &str) -> Result<Vec<ForwardedPort>> {
        (**self).port(options, machine).await
    }
}
