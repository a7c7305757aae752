use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

use stencil_core::{checkpoint, Checkpoint, ContentHash, PreviousVersion, TemplateName, VersionId};

fn stencil_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("stencil"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env_remove("STENCIL_URL")
        .env_remove("STENCIL_TOKEN")
        .env_remove("RUST_LOG");
    cmd
}

fn write_version(workspace: &Path, name: &str, body: &str) -> PathBuf {
    let dir = workspace.join(name);
    fs::create_dir_all(&dir).expect("create version dir");
    fs::write(dir.join("main.tf"), body).expect("write main.tf");
    dir
}

fn write_manifest(workspace: &Path, body: &str) -> PathBuf {
    let path = workspace.join("stencil.yaml");
    fs::write(&path, body).expect("write manifest");
    path
}

const TWO_VERSIONS: &str = r#"
name: docker
versions:
  - directory: ./v1
    name: stable
    active: true
  - directory: ./v2
"#;

#[test]
fn hash_prints_lowercase_sha256() {
    let home = TempDir::new().expect("home");
    let workspace = TempDir::new().expect("workspace");
    let dir = write_version(workspace.path(), "v1", "resource {}");
    let expected = stencil_plan::hash_directory(&dir).expect("hash");

    stencil_cmd(home.path())
        .arg("hash")
        .arg(&dir)
        .assert()
        .success()
        .stdout(predicate::str::is_match("^[0-9a-f]{64}\n$").unwrap())
        .stdout(contains(expected.0));
}

#[test]
fn hash_of_missing_directory_fails() {
    let home = TempDir::new().expect("home");
    stencil_cmd(home.path())
        .args(["hash", "/definitely/not/here"])
        .assert()
        .failure()
        .stderr(contains("failed to hash"));
}

#[test]
fn plan_json_on_fresh_home_creates_everything() {
    let home = TempDir::new().expect("home");
    let workspace = TempDir::new().expect("workspace");
    write_version(workspace.path(), "v1", "one");
    write_version(workspace.path(), "v2", "two");
    let manifest = write_manifest(workspace.path(), TWO_VERSIONS);

    let output = stencil_cmd(home.path())
        .arg("plan")
        .arg(&manifest)
        .arg("--json")
        .output()
        .expect("run plan");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("plan JSON");
    assert_eq!(json["template"], "docker");
    assert_eq!(json["creating"], true);
    assert_eq!(json["active"], 0);
    assert_eq!(json["versions"][0]["action"], "create");
    assert_eq!(json["versions"][0]["name"]["source"], "declared");
    assert_eq!(json["versions"][1]["name"]["source"], "generate");
    assert!(json["versions"][1]["id"].is_null());
}

#[test]
fn plan_reuses_checkpointed_identity() {
    let home = TempDir::new().expect("home");
    let workspace = TempDir::new().expect("workspace");
    let v1 = write_version(workspace.path(), "v1", "one");
    write_version(workspace.path(), "v2", "two");
    let manifest = write_manifest(workspace.path(), TWO_VERSIONS);

    let hash = stencil_plan::hash_directory(&v1).expect("hash");
    let previous = Checkpoint::from_entries([(
        hash,
        PreviousVersion {
            id: VersionId::from("ver-1"),
            name: "stable".into(),
            variables: Default::default(),
            active: true,
        },
    )]);
    checkpoint::save_at(home.path(), &TemplateName::from("docker"), &previous)
        .expect("save checkpoint");

    stencil_cmd(home.path())
        .arg("plan")
        .arg(&manifest)
        .assert()
        .success()
        .stdout(contains("ver-1"))
        .stdout(contains("reuse"))
        .stdout(contains("1 to create"));
}

#[test]
fn plan_rejects_two_active_versions() {
    let home = TempDir::new().expect("home");
    let workspace = TempDir::new().expect("workspace");
    write_version(workspace.path(), "v1", "one");
    write_version(workspace.path(), "v2", "two");
    let manifest = write_manifest(
        workspace.path(),
        r#"
name: docker
versions:
  - { directory: ./v1, name: a, active: true }
  - { directory: ./v2, name: b, active: true }
"#,
    );

    stencil_cmd(home.path())
        .arg("plan")
        .arg(&manifest)
        .assert()
        .failure()
        .stderr(contains("only one version can be active"))
        .stderr(contains("'a'"));
}

#[test]
fn plan_rejects_first_creation_without_active_version() {
    let home = TempDir::new().expect("home");
    let workspace = TempDir::new().expect("workspace");
    write_version(workspace.path(), "v1", "one");
    let manifest = write_manifest(
        workspace.path(),
        "name: docker\nversions:\n  - directory: ./v1\n",
    );

    stencil_cmd(home.path())
        .arg("plan")
        .arg(&manifest)
        .assert()
        .failure()
        .stderr(contains("at least one version must be active"));
    assert!(!checkpoint::path_at(home.path(), &TemplateName::from("docker")).exists());
}

#[test]
fn plan_with_missing_manifest_fails() {
    let home = TempDir::new().expect("home");
    stencil_cmd(home.path())
        .args(["plan", "/definitely/not/here.yaml"])
        .assert()
        .failure()
        .stderr(contains("failed to load manifest"));
}

#[test]
fn checkpoint_show_without_checkpoint() {
    let home = TempDir::new().expect("home");
    stencil_cmd(home.path())
        .args(["checkpoint", "show", "docker"])
        .assert()
        .success()
        .stdout(contains("No checkpoint for template 'docker'"));
}

#[test]
fn checkpoint_show_rejects_path_like_template_names() {
    let home = TempDir::new().expect("home");
    stencil_cmd(home.path())
        .args(["checkpoint", "show", "../../etc/passwd"])
        .assert()
        .failure()
        .stderr(contains("template name"));
}

#[test]
fn checkpoint_show_lists_records() {
    let home = TempDir::new().expect("home");
    let saved = Checkpoint::from_entries([(
        ContentHash::from("abc123"),
        PreviousVersion {
            id: VersionId::from("ver-7"),
            name: "stable".into(),
            variables: [("region".to_string(), "eu".to_string())].into(),
            active: true,
        },
    )]);
    checkpoint::save_at(home.path(), &TemplateName::from("docker"), &saved).expect("save");

    stencil_cmd(home.path())
        .args(["checkpoint", "show", "docker"])
        .assert()
        .success()
        .stdout(contains("ver-7"))
        .stdout(contains("region=eu"));

    let output = stencil_cmd(home.path())
        .args(["checkpoint", "show", "docker", "--json"])
        .output()
        .expect("run checkpoint show");
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("JSON");
    assert_eq!(json["versions"][0]["hash"], "abc123");
    assert_eq!(json["versions"][0]["active"], true);
    assert_eq!(json["versions"][0]["variables"]["region"], "eu");
}

#[test]
fn apply_requires_remote_settings() {
    let home = TempDir::new().expect("home");
    let workspace = TempDir::new().expect("workspace");
    let manifest = write_manifest(workspace.path(), TWO_VERSIONS);

    stencil_cmd(home.path())
        .arg("apply")
        .arg(&manifest)
        .assert()
        .failure()
        .stderr(contains("--url"));
}
