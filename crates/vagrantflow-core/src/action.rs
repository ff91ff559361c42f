//! Action types for reconciling declared resources against stored state

use crate::parser::Project;
use crate::state::GlobalState;
use serde::{Deserialize, Serialize};

/// Planned step for one resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// `vm` key
    pub resource: String,
    pub action_type: ActionType,
    /// Human readable reason, shown by `vflow plan`
    pub description: String,
}

/// How a resource gets reconciled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Bring up a resource that has no stored id
    Create,
    /// Reload an existing resource in place
    Update,
    /// Destroy and create again (the `name` attribute changed)
    Replace,
    /// Destroy a resource that is no longer declared
    Delete,
    /// Stored state already matches
    NoOp,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ActionType::Create => "create",
            ActionType::Update => "update",
            ActionType::Replace => "replace",
            ActionType::Delete => "delete",
            ActionType::NoOp => "no-op",
        })
    }
}

/// Compute the actions that bring `state` in line with `desired`.
///
/// Declared resources come first in key order, followed by deletions of
/// stored resources that are no longer declared.
pub fn plan(desired: &Project, state: &GlobalState) -> Plan {
    let mut actions = Vec::new();

    for (key, config) in &desired.resources {
        let (action_type, description) = match state.get_resource(key) {
            None => (ActionType::Create, format!("{} will be created", key)),
            Some(current) if current.config.requires_replace(config) => (
                ActionType::Replace,
                format!(
                    "{} will be replaced (name \"{}\" -> \"{}\")",
                    key, current.config.name, config.name
                ),
            ),
            Some(current) if current.config.requires_update(config) => {
                (ActionType::Update, format!("{} will be reloaded", key))
            }
            Some(current) => (
                ActionType::NoOp,
                format!("{} is up to date ({})", key, current.id()),
            ),
        };
        actions.push(Action {
            resource: key.clone(),
            action_type,
            description,
        });
    }

    for (key, current) in &state.resources {
        if desired.get(key).is_none() {
            actions.push(Action {
                resource: key.clone(),
                action_type: ActionType::Delete,
                description: format!("{} will be destroyed ({})", key, current.id()),
            });
        }
    }

    Plan::new(actions)
}

/// What happened to each resource during one apply run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplyResult {
    pub outcomes: Vec<ActionOutcome>,
    pub duration_ms: u64,
}

/// Outcome of one executed action: a message on success, the error text otherwise
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub resource: String,
    pub action_type: ActionType,
    pub result: std::result::Result<String, String>,
}

impl ApplyResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        action: &Action,
        result: std::result::Result<String, String>,
    ) {
        self.outcomes.push(ActionOutcome {
            resource: action.resource.clone(),
            action_type: action.action_type,
            result,
        });
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &ActionOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = &ActionOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    pub fn is_success(&self) -> bool {
        self.failed().next().is_none()
    }
}

/// Ordered actions for one project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub actions: Vec<Action>,
}

impl Plan {
    pub fn new(actions: Vec<Action>) -> Self {
        Self { actions }
    }

    pub fn has_changes(&self) -> bool {
        self.changes().next().is_some()
    }

    /// Actions other than no-ops, in execution order
    pub fn changes(&self) -> impl Iterator<Item = &Action> {
        self.actions
            .iter()
            .filter(|a| a.action_type != ActionType::NoOp)
    }

    pub fn summary(&self) -> PlanSummary {
        let mut summary = PlanSummary::default();
        for action in &self.actions {
            let counter = match action.action_type {
                ActionType::Create => &mut summary.create,
                ActionType::Update => &mut summary.update,
                ActionType::Replace => &mut summary.replace,
                ActionType::Delete => &mut summary.delete,
                ActionType::NoOp => &mut summary.unchanged,
            };
            *counter += 1;
        }
        summary
    }
}

/// Per-type action counts, printed after a plan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub replace: usize,
    pub delete: usize,
    pub unchanged: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to replace, {} to delete, {} unchanged",
            self.create, self.update, self.replace, self.delete, self.unchanged
        )
    }
}
