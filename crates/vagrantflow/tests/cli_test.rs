#![cfg(unix)]
#![allow(deprecated)] // Command::cargo_bin

mod common;

use assert_cmd::Command;
use common::TestProject;
use predicates::prelude::*;

const CONFIG: &str = r#"
vm "dev" {
    get_ports #true
}
"#;

fn vflow(project: &TestProject) -> Command {
    let mut cmd = Command::cargo_bin("vflow").unwrap();
    cmd.current_dir(project.path())
        .env("VFLOW_VAGRANT_BIN", project.vagrant_bin())
        .env("NO_COLOR", "1")
        .env_remove("VFLOW_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

fn applied_project() -> TestProject {
    let project = TestProject::new();
    project.write_config(CONFIG);
    vflow(&project).arg("apply").assert().success();
    project
}

/// CLIヘルプにサブコマンドが表示されることを確認
#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("vflow").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("apply"))
        .stdout(predicate::str::contains("destroy"));
}

/// 不正なコマンドでエラーになることを確認
#[test]
fn test_invalid_command() {
    let mut cmd = Command::cargo_bin("vflow").unwrap();
    cmd.arg("invalid-command").assert().failure();
}

#[test]
fn test_schema_lists_defaults() {
    let project = TestProject::new();
    vflow(&project)
        .arg("schema")
        .assert()
        .success()
        .stdout(predicate::str::contains("Defaults to `vagrantbox`."))
        .stdout(predicate::str::contains("machine_names"));
}

#[test]
fn test_validate() {
    let project = TestProject::new();
    project.write_config(CONFIG);

    vflow(&project)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("dev"));
    assert!(project.calls().is_empty());
}

#[test]
fn test_validate_missing_vagrantfile() {
    let project = TestProject::new();
    project.write_config(
        r#"
vm "dev" {
    vagrantfile_dir "nowhere"
}
"#,
    );

    vflow(&project).arg("validate").assert().failure();
}

/// 設定ファイルのないディレクトリではエラーになることを確認
#[test]
fn test_validate_without_project() {
    let project = TestProject::new();
    vflow(&project).arg("validate").assert().failure();
}

#[test]
fn test_plan_without_state() {
    let project = TestProject::new();
    project.write_config(CONFIG);

    vflow(&project)
        .arg("plan")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 to create"));
    assert!(project.calls().is_empty());
}

#[test]
fn test_apply_creates_resource() {
    let project = applied_project();

    assert_eq!(
        project.calls(),
        vec![
            "up --machine-readable --parallel",
            "ssh-config --machine-readable",
            "port --machine-readable web",
        ]
    );

    let state = project.state();
    let dev = &state["resources"]["dev"]["snapshot"];
    assert_eq!(dev["id"], "vagrant:web");
    assert_eq!(dev["machine_names"][0], "web");
    assert_eq!(dev["ports"][0][0]["host"], 2222);
    assert_eq!(dev["connection_info"]["port"], "2222");
}

#[test]
fn test_plan_after_apply_has_no_changes() {
    let project = applied_project();

    vflow(&project)
        .arg("plan")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "0 to create, 0 to update, 0 to replace, 0 to delete, 1 unchanged",
        ));
}

#[test]
fn test_stopped_machine_is_created_again() {
    let project = applied_project();
    project.set_machine_state("poweroff");

    vflow(&project)
        .arg("plan")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 to create"));
}

#[test]
fn test_env_change_reloads() {
    let project = applied_project();
    project.write_config(
        r#"
vm "dev" {
    get_ports #true
    env {
        BOX "debian/bookworm64"
    }
}
"#,
    );

    vflow(&project)
        .arg("apply")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 to update"));

    let calls = project.calls();
    assert!(calls.contains(&"reload --machine-readable".to_string()));
    assert_eq!(
        calls.iter().filter(|c| c.starts_with("up ")).count(),
        1,
        "running machines need no second up"
    );
    assert_eq!(
        project.state()["resources"]["dev"]["config"]["env"]["BOX"],
        "debian/bookworm64"
    );
}

#[test]
fn test_removed_resource_is_destroyed() {
    let project = applied_project();
    project.write_config("");

    vflow(&project)
        .arg("apply")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 to delete"));

    assert!(
        project
            .calls()
            .contains(&"destroy --force --machine-readable".to_string())
    );
    assert_eq!(project.state()["resources"], serde_json::json!({}));
}

#[test]
fn test_destroy() {
    let project = applied_project();

    vflow(&project).arg("destroy").assert().success();

    assert_eq!(
        project.calls().last().map(String::as_str),
        Some("destroy --force --machine-readable")
    );
    assert_eq!(project.state()["resources"], serde_json::json!({}));
}

#[test]
fn test_show_json() {
    let project = applied_project();

    vflow(&project)
        .args(["show", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"vagrant:web\""));
}

#[test]
fn test_apply_failure_keeps_resource_absent() {
    let project = TestProject::new();
    project.write_config(CONFIG);
    project.write_vagrant(
        r#"printf '%s\n' '1,,error-exit,Vagrant::Errors::BoxNotFound,The box could not be found.'
exit 1"#,
    );

    vflow(&project)
        .arg("apply")
        .assert()
        .failure()
        .stdout(predicate::str::contains("The box could not be found."));

    assert_eq!(project.state()["resources"], serde_json::json!({}));
}

#[test]
fn test_read_back_failure_keeps_created_id() {
    let project = TestProject::new();
    project.write_config(CONFIG);
    project.write_vagrant(
        r#"case "$1" in
  up) echo "1,web,metadata,provider,virtualbox" ;;
  ssh-config) echo "ssh-config exploded" >&2; exit 1 ;;
esac"#,
    );

    vflow(&project)
        .arg("apply")
        .assert()
        .failure()
        .stdout(predicate::str::contains("ssh-config exploded"));
    assert_eq!(
        project.state()["resources"]["dev"]["snapshot"]["id"],
        "vagrant:web"
    );

    // the machines are running, so the next plan only refreshes them
    project.restore_vagrant();
    vflow(&project)
        .arg("plan")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 unchanged"));
}

#[test]
fn test_missing_explicit_config_is_an_error() {
    let project = applied_project();

    vflow(&project)
        .args(["--config", "prod.kdl", "apply"])
        .assert()
        .failure();

    assert!(
        !project
            .calls()
            .iter()
            .any(|call| call.starts_with("destroy")),
        "a typo in --config must not touch existing resources"
    );
    assert!(project.state()["resources"]["dev"].is_object());
}

#[test]
fn test_destroy_after_directory_removed() {
    let project = TestProject::new();
    std::fs::create_dir(project.path().join("box")).unwrap();
    std::fs::write(project.path().join("box/Vagrantfile"), "").unwrap();
    project.write_config(
        r#"
vm "dev" {
    vagrantfile_dir "box"
}
"#,
    );
    vflow(&project).arg("apply").assert().success();

    std::fs::remove_dir_all(project.path().join("box")).unwrap();

    vflow(&project).arg("destroy").assert().success();
    assert_eq!(project.state()["resources"], serde_json::json!({}));
}
