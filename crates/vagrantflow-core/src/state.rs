//! Persisted state of reconciled resources
//!
//! `.vagrantflow/state.json` holds, per `vm` key, the configuration a resource
//! was last reconciled with and the snapshot read back from vagrant. Writes go
//! through a temporary file and replace the state in one rename; the previous
//! file is kept as `state.json.backup`.

use crate::config::VagrantConfig;
use crate::discovery::PROJECT_DIR;
use crate::error::{Result, VagrantError};
use crate::snapshot::ResourceSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

const FORMAT_VERSION: u32 = 1;
const STATE_FILE: &str = "state.json";
const BACKUP_FILE: &str = "state.json.backup";
const TEMP_FILE: &str = "state.json.tmp";
const LOCK_FILE: &str = "state.lock";

/// Age after which a lock left behind by a crashed run is taken over
const STALE_LOCK_HOURS: i64 = 1;

/// Contents of the state file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalState {
    pub version: u32,

    /// Incremented on every save
    #[serde(default)]
    pub serial: u64,

    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,

    /// Keyed by the `vm` node name
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceState>,
}

impl Default for GlobalState {
    fn default() -> Self {
        Self {
            version: FORMAT_VERSION,
            serial: 0,
            saved_at: None,
            resources: BTreeMap::new(),
        }
    }
}

impl GlobalState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_resource(&mut self, key: impl Into<String>, resource: ResourceState) {
        self.resources.insert(key.into(), resource);
    }

    pub fn remove_resource(&mut self, key: &str) -> Option<ResourceState> {
        self.resources.remove(key)
    }

    pub fn get_resource(&self, key: &str) -> Option<&ResourceState> {
        self.resources.get(key)
    }
}

/// One reconciled resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceState {
    /// Configuration used by the last successful create/update/read
    pub config: VagrantConfig,
    pub snapshot: ResourceSnapshot,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResourceState {
    pub fn new(config: VagrantConfig, snapshot: ResourceSnapshot) -> Self {
        let created_at = Utc::now();
        Self {
            config,
            snapshot,
            created_at,
            updated_at: created_at,
        }
    }

    /// Resource id as built when it was created
    pub fn id(&self) -> &str {
        &self.snapshot.id
    }

    /// Same resource with a newer config and snapshot; `created_at` is kept.
    pub fn refreshed(self, config: VagrantConfig, snapshot: ResourceSnapshot) -> Self {
        Self {
            config,
            snapshot,
            updated_at: Utc::now(),
            ..self
        }
    }
}

/// Reads and writes the state file of one project
pub struct StateManager {
    dir: PathBuf,
}

impl StateManager {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            dir: project_root.as_ref().join(PROJECT_DIR),
        }
    }

    fn file(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Load the state; a project without a state file starts empty.
    pub async fn load(&self) -> Result<GlobalState> {
        let path = self.file(STATE_FILE);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No state at {}", path.display());
                return Ok(GlobalState::new());
            }
            Err(e) => return Err(e.into()),
        };

        let state: GlobalState = serde_json::from_str(&content)?;
        if state.version > FORMAT_VERSION {
            return Err(VagrantError::StateError(format!(
                "{} uses format version {}, this vflow understands up to {}",
                path.display(),
                state.version,
                FORMAT_VERSION
            )));
        }

        tracing::debug!(
            "Loaded state serial {} ({} resources)",
            state.serial,
            state.resources.len()
        );
        Ok(state)
    }

    /// Write the state, bumping its serial. The previous file becomes the backup.
    pub async fn save(&self, state: &mut GlobalState) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;

        state.serial += 1;
        state.saved_at = Some(Utc::now());

        let temp = self.file(TEMP_FILE);
        fs::write(&temp, serde_json::to_vec_pretty(&*state)?).await?;

        let path = self.file(STATE_FILE);
        match fs::copy(&path, self.file(BACKUP_FILE)).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        fs::rename(&temp, &path).await?;

        tracing::debug!(
            "Saved state serial {} ({} resources)",
            state.serial,
            state.resources.len()
        );
        Ok(())
    }

    /// Take the project lock. A lock older than an hour is treated as abandoned.
    pub async fn acquire_lock(&self) -> Result<StateLock> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.file(LOCK_FILE);

        let holder = LockHolder {
            host: std::env::var("HOSTNAME")
                .or_else(|_| std::env::var("HOST"))
                .unwrap_or_else(|_| "unknown".to_string()),
            pid: std::process::id(),
            acquired_at: Utc::now(),
        };
        let content = serde_json::to_vec_pretty(&holder)?;

        // second attempt only after removing a stale lock
        for _ in 0..2 {
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(mut file) => {
                    file.write_all(&content).await?;
                    file.flush().await?;
                    tracing::debug!("Locked {}", path.display());
                    return Ok(StateLock {
                        path,
                        released: false,
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    self.clear_stale_lock(&path).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(VagrantError::LockError(format!(
            "could not take {}",
            path.display()
        )))
    }

    async fn clear_stale_lock(&self, path: &Path) -> Result<()> {
        let existing: LockHolder = serde_json::from_str(&fs::read_to_string(path).await?)?;

        let age = Utc::now().signed_duration_since(existing.acquired_at);
        if age < chrono::Duration::hours(STALE_LOCK_HOURS) {
            return Err(VagrantError::LockError(format!(
                "held by pid {} on {} since {}",
                existing.pid, existing.host, existing.acquired_at
            )));
        }

        tracing::warn!(
            "Taking over stale lock of pid {} on {}",
            existing.pid,
            existing.host
        );
        fs::remove_file(path).await?;
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LockHolder {
    host: String,
    pid: u32,
    acquired_at: DateTime<Utc>,
}

/// Held project lock; dropping it releases the lock as well.
pub struct StateLock {
    path: PathBuf,
    released: bool,
}

impl StateLock {
    pub async fn release(mut self) -> Result<()> {
        self.released = true;
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::debug!("Unlocked {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if !self.released {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn snapshot(id: &str) -> ResourceSnapshot {
        ResourceSnapshot {
            id: id.to_string(),
            machine_names: vec!["web".to_string()],
            ssh_config: Vec::new(),
            ports: vec![Vec::new()],
            connection_info: None,
        }
    }

    #[tokio::test]
    async fn test_round_trip_and_serial() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());

        let mut state = GlobalState::new();
        state.set_resource(
            "dev",
            ResourceState::new(
                VagrantConfig::new("/vms/dev").with_env("BOX", "ubuntu/jammy64"),
                snapshot("vagrant:web"),
            ),
        );
        manager.save(&mut state).await.unwrap();
        assert_eq!(state.serial, 1);

        let mut loaded = manager.load().await.unwrap();
        let dev = loaded.get_resource("dev").unwrap();
        assert_eq!(dev.id(), "vagrant:web");
        assert_eq!(dev.config.env["BOX"], "ubuntu/jammy64");
        assert_eq!(loaded.serial, 1);

        manager.save(&mut loaded).await.unwrap();
        assert_eq!(manager.load().await.unwrap().serial, 2);
    }

    #[tokio::test]
    async fn test_previous_state_becomes_backup() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());

        let mut state = GlobalState::new();
        manager.save(&mut state).await.unwrap();
        assert!(!temp_dir.path().join(".vagrantflow/state.json.backup").exists());

        manager.save(&mut state).await.unwrap();

        let backup = temp_dir.path().join(".vagrantflow/state.json.backup");
        let backup: GlobalState =
            serde_json::from_str(&std::fs::read_to_string(backup).unwrap()).unwrap();
        assert_eq!(backup.serial, 1);
        assert!(!temp_dir.path().join(".vagrantflow/state.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_state() {
        let temp_dir = tempdir().unwrap();
        let state = StateManager::new(temp_dir.path()).load().await.unwrap();
        assert!(state.resources.is_empty());
        assert_eq!(state.serial, 0);
    }

    #[tokio::test]
    async fn test_newer_format_rejected() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());
        let mut state = GlobalState {
            version: FORMAT_VERSION + 1,
            ..GlobalState::new()
        };
        manager.save(&mut state).await.unwrap();

        let err = manager.load().await.unwrap_err();
        assert!(matches!(err, VagrantError::StateError(_)));
    }

    #[test]
    fn test_refreshed_keeps_creation_time() {
        let original = ResourceState::new(VagrantConfig::new("/vms/dev"), snapshot("vagrant:web"));
        let created_at = original.created_at;

        let refreshed = original.refreshed(
            VagrantConfig::new("/vms/dev").with_ports(true),
            snapshot("vagrant:web"),
        );
        assert_eq!(refreshed.created_at, created_at);
        assert!(refreshed.config.get_ports);
    }

    #[tokio::test]
    async fn test_lock_is_exclusive() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());

        let lock = manager.acquire_lock().await.unwrap();
        assert!(matches!(
            manager.acquire_lock().await,
            Err(VagrantError::LockError(_))
        ));

        lock.release().await.unwrap();
        let again = manager.acquire_lock().await.unwrap();
        drop(again);
        assert!(!temp_dir.path().join(".vagrantflow/state.lock").exists());
    }

    #[tokio::test]
    async fn test_stale_lock_is_taken_over() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());
        std::fs::create_dir_all(temp_dir.path().join(".vagrantflow")).unwrap();

        let stale = LockHolder {
            host: "ci-runner".to_string(),
            pid: 4242,
            acquired_at: Utc::now() - chrono::Duration::hours(3),
        };
        std::fs::write(
            temp_dir.path().join(".vagrantflow/state.lock"),
            serde_json::to_string(&stale).unwrap(),
        )
        .unwrap();

        let lock = manager.acquire_lock().await.unwrap();
        lock.release().await.unwrap();
    }
}
