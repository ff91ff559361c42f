//! VagrantFlow gateway for the `vagrant` CLI
//!
//! Implements [`vagrantflow_core::VagrantGateway`] by spawning `vagrant`
//! with `--machine-readable` and decoding its output.

pub mod cli;
pub mod machine_readable;
pub mod ssh_config;

pub use cli::{CommandOutput, VAGRANT_BIN, Vagrant};
