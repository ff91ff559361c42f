//! VagrantFlow error types

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VagrantError {
    #[error("Vagrantfile not found in {}: {source}", dir.display())]
    VagrantfileNotFound {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "Configuration file not found: {}\nHint: create vagrantflow.kdl or pass --config / VFLOW_CONFIG",
        .0.display()
    )]
    ConfigNotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("vagrant {command} failed ({status}): {message}")]
    CommandFailed {
        command: String,
        status: String,
        message: String,
    },

    #[error("vagrant {command} could not be started: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Timeout: vagrant {0} did not exit before the deadline")]
    Timeout(String),

    #[error("Cancelled: vagrant {0}")]
    Cancelled(String),

    #[error("{id} is up but could not be read back: {source}")]
    ReadBackFailed {
        id: String,
        #[source]
        source: Box<VagrantError>,
    },

    #[error("Unexpected vagrant output: {0}")]
    Parse(String),

    #[error("State file error: {0}")]
    StateError(String),

    #[error("Lock acquisition failed: {0}")]
    LockError(String),

    #[error("KDL parse error: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VagrantError {
    /// Id of machines that came up even though the operation failed afterwards
    pub fn created_id(&self) -> Option<&str> {
        match self {
            VagrantError::ReadBackFailed { id, .. } => Some(id),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, VagrantError>;
