//! KDL parser
//!
//! Parses `vagrantflow.kdl` into typed [`VagrantConfig`] values, one per
//! `vm` node:
//!
//! ```kdl
//! vm "dev" {
//!     name "vagrantbox"
//!     vagrantfile_dir "./boxes/dev"
//!     get_ports #true
//!     env {
//!         BOX "ubuntu/jammy64"
//!         MEMORY 2048
//!     }
//!     timeouts create=600 delete=300
//! }
//! ```

use crate::config::{Timeouts, VagrantConfig};
use crate::error::{Result, VagrantError};
use kdl::{KdlDocument, KdlNode, KdlValue};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Declared resources keyed by the `vm` node argument
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Project {
    pub resources: BTreeMap<String, VagrantConfig>,
}

impl Project {
    pub fn get(&self, key: &str) -> Option<&VagrantConfig> {
        self.resources.get(key)
    }
}

/// Parse a KDL file. Relative `vagrantfile_dir` values are resolved against
/// the directory containing the file.
pub fn parse_kdl_file<P: AsRef<Path>>(path: P) -> Result<Project> {
    let content = fs::read_to_string(path.as_ref())?;
    let base_dir = path.as_ref().parent().unwrap_or_else(|| Path::new(""));
    parse_kdl_string(&content, base_dir)
}

/// Parse KDL text, resolving relative directories against `base_dir`.
pub fn parse_kdl_string(content: &str, base_dir: &Path) -> Result<Project> {
    let doc: KdlDocument = content.parse()?;
    let mut project = Project::default();

    for node in doc.nodes() {
        match node.name().value() {
            "vm" => {
                let (key, config) = parse_vm(node, base_dir)?;
                if project.resources.contains_key(&key) {
                    return Err(VagrantError::InvalidConfig(format!(
                        "vm \"{}\" is declared more than once",
                        key
                    )));
                }
                project.resources.insert(key, config);
            }
            other => {
                tracing::debug!("Skipping unknown node: {}", other);
            }
        }
    }

    Ok(project)
}

/// Parse a `vm` node
pub fn parse_vm(node: &KdlNode, base_dir: &Path) -> Result<(String, VagrantConfig)> {
    let key = node
        .entries()
        .first()
        .and_then(|e| e.value().as_string())
        .ok_or_else(|| VagrantError::InvalidConfig("vm requires a name".to_string()))?
        .to_string();

    let mut config = VagrantConfig::default();
    let mut vagrantfile_dir = config.vagrantfile_dir.clone();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "name" => {
                    config.name = first_string(child, &key)?;
                }
                "vagrantfile_dir" | "vagrantfile-dir" => {
                    vagrantfile_dir = PathBuf::from(first_string(child, &key)?);
                }
                "get_ports" | "get-ports" => {
                    config.get_ports = child
                        .entries()
                        .first()
                        .and_then(|e| e.value().as_bool())
                        .ok_or_else(|| invalid(&key, "get_ports must be #true or #false"))?;
                }
                "env" | "environment" => {
                    parse_env(child, &key, &mut config.env)?;
                }
                "timeouts" => {
                    config.timeouts = parse_timeouts(child, &key)?;
                }
                other => {
                    tracing::warn!("vm \"{}\": ignoring unknown setting '{}'", key, other);
                }
            }
        }
    }

    config.vagrantfile_dir = resolve_dir(base_dir, &vagrantfile_dir);
    Ok((key, config))
}

/// Parse `env { KEY value }` or the flat `env "KEY=VALUE"` form
fn parse_env(node: &KdlNode, key: &str, env: &mut BTreeMap<String, String>) -> Result<()> {
    if let Some(vars) = node.children() {
        for var in vars.nodes() {
            let value = var
                .entries()
                .first()
                .map(|e| kdl_value_to_string(e.value()))
                .unwrap_or_default();
            env.insert(var.name().value().to_string(), value);
        }
        return Ok(());
    }

    for entry in node.entries() {
        let pair = entry
            .value()
            .as_string()
            .ok_or_else(|| invalid(key, "env entries must be \"KEY=VALUE\" strings"))?;
        let (k, v) = pair
            .split_once('=')
            .ok_or_else(|| invalid(key, &format!("env entry '{}' has no '='", pair)))?;
        env.insert(k.to_string(), v.to_string());
    }
    Ok(())
}

/// Parse `timeouts create=600 read=60 update=600 delete=300`
fn parse_timeouts(node: &KdlNode, key: &str) -> Result<Timeouts> {
    let mut timeouts = Timeouts::default();

    for operation in ["create", "read", "update", "delete"] {
        let Some(value) = node.get(operation) else {
            continue;
        };
        let seconds = value
            .as_integer()
            .ok_or_else(|| invalid(key, &format!("timeouts.{} must be seconds", operation)))?;
        let timeout = Timeouts::from_secs(seconds.clamp(0, i64::MAX as i128) as i64);

        match operation {
            "create" => timeouts.create = timeout,
            "read" => timeouts.read = timeout,
            "update" => timeouts.update = timeout,
            _ => timeouts.delete = timeout,
        }
    }

    Ok(timeouts)
}

fn first_string(node: &KdlNode, key: &str) -> Result<String> {
    node.entries()
        .first()
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
        .ok_or_else(|| invalid(key, &format!("{} must be a string", node.name().value())))
}

fn invalid(key: &str, message: &str) -> VagrantError {
    VagrantError::InvalidConfig(format!("vm \"{}\": {}", key, message))
}

/// Stringify a scalar KDL value
fn kdl_value_to_string(value: &KdlValue) -> String {
    if let Some(s) = value.as_string() {
        s.to_string()
    } else if let Some(i) = value.as_integer() {
        i.to_string()
    } else if let Some(f) = value.as_float() {
        f.to_string()
    } else if let Some(b) = value.as_bool() {
        b.to_string()
    } else {
        String::new()
    }
}

fn resolve_dir(base_dir: &Path, dir: &Path) -> PathBuf {
    if dir.is_absolute() || base_dir.as_os_str().is_empty() {
        dir.to_path_buf()
    } else if dir == Path::new(".") {
        base_dir.to_path_buf()
    } else {
        base_dir.join(dir)
    }
}
