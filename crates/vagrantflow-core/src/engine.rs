//! Reconciliation engine
//!
//! Maps the four lifecycle operations onto sequences of vagrant commands.
//! Each operation derives one deadline at entry and runs its gateway calls
//! strictly one after another. Create and update validate the declared
//! configuration first; read and delete work from stored configurations whose
//! directory may be gone. Nothing is retried here.

use crate::config::VagrantConfig;
use crate::error::{Result, VagrantError};
use crate::gateway::{CommandOptions, VagrantGateway};
use crate::identity::build_id;
use crate::machine::{all_running, any_not_created};
use crate::snapshot::{ResourceSnapshot, read_vagrant_info};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Lifecycle operation, used to pick the timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Create => write!(f, "create"),
            Operation::Read => write!(f, "read"),
            Operation::Update => write!(f, "update"),
            Operation::Delete => write!(f, "delete"),
        }
    }
}

/// Result of a read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// All machines are running
    Present(ResourceSnapshot),
    /// At least one machine is not running; the caller must drop the stored
    /// id so the resource gets created again
    Gone,
}

pub struct Engine<G> {
    gateway: G,
}

impl<G: VagrantGateway> Engine<G> {
    pub fn new(gateway: G) -> Self {
        Self { gateway }
    }

    /// Bring the environment up and read it back.
    ///
    /// When `vagrant up` fails no id exists yet and the resource stays absent.
    /// A failed read-back returns [`VagrantError::ReadBackFailed`] carrying the
    /// id, since the machines are running by then.
    pub async fn create(
        &self,
        config: &VagrantConfig,
        cancel: &CancellationToken,
    ) -> Result<ResourceSnapshot> {
        config.validate()?;
        let options = command_options(config, Operation::Create, cancel);

        tracing::info!("Bringing up vagrant...");
        let info = self.gateway.up(&options, true).await?;
        let id = build_id(info.keys());
        tracing::debug!("Created {}", id);

        read_vagrant_info(&self.gateway, &options, config.get_ports, id.clone())
            .await
            .map_err(|source| VagrantError::ReadBackFailed {
                id,
                source: Box::new(source),
            })
    }

    /// Refresh a resource whose id was stored earlier. The id is kept as-is.
    ///
    /// A resource whose Vagrantfile has disappeared is reported as gone.
    pub async fn read(
        &self,
        config: &VagrantConfig,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<ReadOutcome> {
        if let Err(e) = config.validate() {
            tracing::warn!("{}: {}, dropping it", id, e);
            return Ok(ReadOutcome::Gone);
        }
        let options = command_options(config, Operation::Read, cancel);

        tracing::info!("Getting vagrant status...");
        let status = self.gateway.status(&options).await?;
        if !all_running(&status) {
            tracing::info!("{} is not fully running, dropping it", id);
            return Ok(ReadOutcome::Gone);
        }

        let snapshot =
            read_vagrant_info(&self.gateway, &options, config.get_ports, id.to_string()).await?;
        Ok(ReadOutcome::Present(snapshot))
    }

    /// Reload every machine, bring up machines that reload could not create,
    /// then read the environment back. Any failing step fails the update.
    pub async fn update(
        &self,
        config: &VagrantConfig,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<ResourceSnapshot> {
        config.validate()?;
        let options = command_options(config, Operation::Update, cancel);

        // reload halts running machines, recreates halted or suspended ones
        // and boots them again
        tracing::info!("Reloading vagrant...");
        self.gateway.reload(&options).await?;

        tracing::info!("Checking machine states...");
        let status = self.gateway.status(&options).await?;
        if any_not_created(&status) {
            tracing::info!("Bringing up new machines...");
            self.gateway.up(&options, true).await?;
        }

        read_vagrant_info(&self.gateway, &options, config.get_ports, id.to_string()).await
    }

    /// Destroy every machine. Succeeds for environments that are already gone,
    /// so it works with or without a stored id. A removed Vagrantfile
    /// directory leaves nothing for vagrant to destroy.
    pub async fn delete(&self, config: &VagrantConfig, cancel: &CancellationToken) -> Result<()> {
        if !config.vagrantfile_dir.is_dir() {
            tracing::warn!(
                "{} no longer exists, nothing to destroy",
                config.vagrantfile_dir.display()
            );
            return Ok(());
        }
        let options = command_options(config, Operation::Delete, cancel);

        tracing::info!("Destroying vagrant...");
        self.gateway.destroy(&options).await
    }
}

fn command_options(
    config: &VagrantConfig,
    operation: Operation,
    cancel: &CancellationToken,
) -> CommandOptions {
    CommandOptions::new(&config.vagrantfile_dir)
        .with_env(config.environment())
        .with_timeout(config.timeouts.for_operation(operation))
        .with_cancel(cancel.clone())
}
