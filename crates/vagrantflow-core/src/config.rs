//! Declared configuration of a Vagrant resource

use crate::engine::Operation;
use crate::environment::build_environment;
use crate::error::{Result, VagrantError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default value of the `name` attribute
pub const DEFAULT_NAME: &str = "vagrantbox";

/// Default value of the `vagrantfile_dir` attribute
pub const DEFAULT_VAGRANTFILE_DIR: &str = ".";

/// File that must exist inside `vagrantfile_dir`
pub const VAGRANTFILE: &str = "Vagrantfile";

/// Desired state of one Vagrant environment.
///
/// Built once from the configuration file; the engine never looks at
/// untyped values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VagrantConfig {
    /// Resource name. Changing it replaces the resource.
    pub name: String,

    /// Directory containing the Vagrantfile
    pub vagrantfile_dir: PathBuf,

    /// Environment variables passed to vagrant (and thus to the Vagrantfile)
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Whether forwarded ports are collected
    #[serde(default)]
    pub get_ports: bool,

    /// Per-operation deadlines
    #[serde(default)]
    pub timeouts: Timeouts,
}

impl Default for VagrantConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            vagrantfile_dir: PathBuf::from(DEFAULT_VAGRANTFILE_DIR),
            env: BTreeMap::new(),
            get_ports: false,
            timeouts: Timeouts::default(),
        }
    }
}

impl VagrantConfig {
    pub fn new(vagrantfile_dir: impl Into<PathBuf>) -> Self {
        Self {
            vagrantfile_dir: vagrantfile_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_ports(mut self, get_ports: bool) -> Self {
        self.get_ports = get_ports;
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Check that the Vagrantfile exists.
    pub fn validate(&self) -> Result<()> {
        validate_vagrantfile_dir(&self.vagrantfile_dir)
    }

    /// Environment override for vagrant processes, `None` when `env` is empty.
    pub fn environment(&self) -> Option<Vec<String>> {
        build_environment(&self.env)
    }

    /// Whether moving from `self` to `desired` needs a destroy/create cycle.
    pub fn requires_replace(&self, desired: &VagrantConfig) -> bool {
        self.name != desired.name
    }

    /// Whether moving from `self` to `desired` needs an in-place update.
    pub fn requires_update(&self, desired: &VagrantConfig) -> bool {
        self.vagrantfile_dir != desired.vagrantfile_dir
            || self.env != desired.env
            || self.get_ports != desired.get_ports
    }
}

/// Fail with the filesystem error when `<dir>/Vagrantfile` cannot be found.
pub fn validate_vagrantfile_dir(dir: &Path) -> Result<()> {
    std::fs::metadata(dir.join(VAGRANTFILE)).map_err(|source| {
        VagrantError::VagrantfileNotFound {
            dir: dir.to_path_buf(),
            source,
        }
    })?;
    Ok(())
}

/// Per-operation timeouts. `None` or zero means no deadline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeouts {
    pub create: Option<Duration>,
    pub read: Option<Duration>,
    pub update: Option<Duration>,
    pub delete: Option<Duration>,
}

impl Timeouts {
    /// Build from seconds as written in the configuration file; values `<= 0` disable the deadline.
    pub fn from_secs(seconds: i64) -> Option<Duration> {
        (seconds > 0).then(|| Duration::from_secs(seconds as u64))
    }

    pub fn for_operation(&self, operation: Operation) -> Option<Duration> {
        let timeout = match operation {
            Operation::Create => self.create,
            Operation::Read => self.read,
            Operation::Update => self.update,
            Operation::Delete => self.delete,
        };
        timeout.filter(|t| !t.is_zero())
    }
}
