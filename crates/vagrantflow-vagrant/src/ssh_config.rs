//! OpenSSH config blocks as printed by `vagrant ssh-config`

use std::path::PathBuf;
use vagrantflow_core::{Result, SshConfig, VagrantError};

const DEFAULT_SSH_PORT: u16 = 22;

/// Parse one or more `Host` blocks. Returns `(host, config)` pairs in order.
pub fn parse_ssh_config(text: &str) -> Result<Vec<(String, SshConfig)>> {
    let mut configs: Vec<(String, SshConfig)> = Vec::new();

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (key, value) = match line.split_once(char::is_whitespace) {
            Some((key, value)) => (key, unquote(value.trim())),
            None => (line, ""),
        };

        if key.eq_ignore_ascii_case("Host") {
            configs.push((
                value.to_string(),
                SshConfig {
                    host: value.to_string(),
                    port: DEFAULT_SSH_PORT,
                    ..Default::default()
                },
            ));
            continue;
        }

        let Some((_, config)) = configs.last_mut() else {
            tracing::debug!("Ignoring ssh-config line outside a Host block: {}", line);
            continue;
        };

        match key.to_ascii_lowercase().as_str() {
            "hostname" => config.host_name = value.to_string(),
            "user" => config.user = value.to_string(),
            "port" => {
                config.port = value
                    .parse()
                    .map_err(|_| VagrantError::Parse(format!("invalid ssh port '{}'", value)))?;
            }
            "identityfile" => config.identity_file = Some(PathBuf::from(value)),
            _ => {
                config
                    .additional_fields
                    .insert(key.to_string(), value.to_string());
            }
        }
    }

    Ok(configs)
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}
