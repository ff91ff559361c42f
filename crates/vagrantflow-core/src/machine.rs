//! Machine status and identity as reported by vagrant

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-machine state token from `vagrant status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineState {
    Running,
    NotCreated,
    Poweroff,
    Saved,
    Aborted,
    /// Any other provider-specific token, kept verbatim
    Other(String),
}

impl MachineState {
    pub fn parse(token: &str) -> Self {
        match token {
            "running" => MachineState::Running,
            "not_created" => MachineState::NotCreated,
            "poweroff" => MachineState::Poweroff,
            "saved" => MachineState::Saved,
            "aborted" => MachineState::Aborted,
            other => MachineState::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            MachineState::Running => "running",
            MachineState::NotCreated => "not_created",
            MachineState::Poweroff => "poweroff",
            MachineState::Saved => "saved",
            MachineState::Aborted => "aborted",
            MachineState::Other(token) => token,
        }
    }
}

impl std::fmt::Display for MachineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Machine name → state, as returned by status and reload.
pub type StatusMap = BTreeMap<String, MachineState>;

/// Machine name → info, as returned by `vagrant up`.
pub type VmInfoMap = BTreeMap<String, VmInfo>;

/// Machine information reported while bringing an environment up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmInfo {
    pub name: String,
    pub provider: String,
}

impl VmInfo {
    pub fn new(name: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            provider: provider.into(),
        }
    }
}

/// Whether the resource counts as existing.
///
/// Only a fully running environment exists. A machine that is powered off,
/// saved or aborted makes the whole resource absent, so it gets recreated
/// rather than resumed.
pub fn all_running(status: &StatusMap) -> bool {
    status.values().all(|state| *state == MachineState::Running)
}

/// Whether any machine still has to be created (`vagrant reload` never creates machines).
pub fn any_not_created(status: &StatusMap) -> bool {
    status
        .values()
        .any(|state| *state == MachineState::NotCreated)
}
