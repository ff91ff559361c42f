//! VagrantFlow core
//!
//! Reconciles Vagrant environments declared in KDL against the machines the
//! `vagrant` CLI actually reports.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  vflow CLI                       │
//! │        (plan / apply / refresh / destroy)        │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               vagrantflow-core                   │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │   Engine: create / read / update / delete │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │  KDL Parser  │  │  State Mgmt  │            │
//! │  └──────────────┘  └──────────────┘            │
//! └─────────────────┬───────────────────────────────┘
//!                   │ trait VagrantGateway
//! ┌─────────────────▼───────────────────────────────┐
//! │             vagrantflow-vagrant                  │
//! │        (vagrant CLI, machine-readable)           │
//! └─────────────────────────────────────────────────┘
//! ```

pub mod action;
pub mod config;
pub mod discovery;
pub mod engine;
pub mod environment;
pub mod error;
pub mod gateway;
pub mod identity;
pub mod machine;
pub mod parser;
pub mod schema;
pub mod snapshot;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports
pub use action::{Action, ActionOutcome, ActionType, ApplyResult, Plan, PlanSummary, plan};
pub use config::{Timeouts, VagrantConfig, validate_vagrantfile_dir};
pub use discovery::{find_config_file, project_root};
pub use engine::{Engine, Operation, ReadOutcome};
pub use environment::build_environment;
pub use error::{Result, VagrantError};
pub use gateway::{CommandOptions, ForwardedPort, SshConfig, VagrantGateway};
pub use identity::build_id;
pub use machine::{MachineState, StatusMap, VmInfo, VmInfoMap, all_running};
pub use parser::{Project, parse_kdl_file, parse_kdl_string};
pub use snapshot::{ResourceSnapshot, SshEndpoint, read_vagrant_info};
pub use state::{GlobalState, ResourceState, StateLock, StateManager};
pub use tokio_util::sync::CancellationToken;
