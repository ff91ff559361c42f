//! Process environment for vagrant invocations

use std::fmt::Display;

/// Turn the declared `env` map into `KEY=VALUE` entries for the vagrant process.
///
/// Returns `None` for an empty map so callers can tell "no override" apart
/// from an override that happens to be empty. Values are only stringified;
/// an `=` or newline inside a value is passed through as-is.
pub fn build_environment<K, V, I>(env: I) -> Option<Vec<String>>
where
    K: Display,
    V: Display,
    I: IntoIterator<Item = (K, V)>,
{
    let entries: Vec<String> = env
        .into_iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect();

    if entries.is_empty() {
        return None;
    }

    tracing::debug!("Environment: {:?}", entries);
    Some(entries)
}

/// Split a `KEY=VALUE` entry at the first `=`.
pub fn split_entry(entry: &str) -> (&str, &str) {
    entry.split_once('=').unwrap_or((entry, ""))
}
