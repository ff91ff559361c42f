use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use tempfile::TempDir;

/// A project directory with a Vagrantfile and a fake `vagrant` executable.
///
/// The fake reports one machine (`web`) whose state is read from the
/// `machine_state` file, and appends every invocation to `calls.log`.
pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let project = Self { root };
        fs::write(project.path().join("Vagrantfile"), "").unwrap();
        project.set_machine_state("running");
        project.write_vagrant(&project.default_script());
        project
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }

    pub fn vagrant_bin(&self) -> PathBuf {
        self.path().join("fake-vagrant")
    }

    pub fn write_config(&self, content: &str) {
        fs::write(self.path().join("vagrantflow.kdl"), content).unwrap();
    }

    pub fn set_machine_state(&self, state: &str) {
        fs::write(self.path().join("machine_state"), state).unwrap();
    }

    /// Replace the fake with a custom script body
    pub fn write_vagrant(&self, body: &str) {
        let path = self.vagrant_bin();
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    /// Put the default fake back
    pub fn restore_vagrant(&self) {
        self.write_vagrant(&self.default_script());
    }

    /// Invocations recorded by the fake, one per line
    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.path().join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[allow(dead_code)]
    pub fn state(&self) -> serde_json::Value {
        let content = fs::read_to_string(self.path().join(".vagrantflow/state.json")).unwrap();
        serde_json::from_str(&content).unwrap()
    }

    fn default_script(&self) -> String {
        let dir = self.path();
        format!(
            r#"echo "$*" >> "{dir}/calls.log"
case "$1" in
  up) echo "1,web,metadata,provider,virtualbox" ;;
  status) echo "1,web,state,$(cat "{dir}/machine_state")" ;;
  ssh-config) printf '%s\n' '1,web,ssh-config,Host web\n  HostName 127.0.0.1\n  User vagrant\n  Port 2222\n' ;;
  port) echo "1,web,forwarded_port,22,2222" ;;
esac"#,
            dir = dir.display()
        )
    }
}
