mod common;

use assert_cmd::Command;
use predicates::prelude::*;

fn reqtxt() -> Command {
    let mut cmd = Command::cargo_bin("reqtxt").unwrap();
    cmd.arg("--no-color");
    cmd
}

/// Test that --help flag works
#[test]
fn test_help_flag() {
    let mut cmd = Command::cargo_bin("reqtxt").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Inspect and edit pip requirements files",
        ))
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("set-version"))
        .stdout(predicate::str::contains("resolve"));
}

#[test]
fn test_version_flag() {
    let mut cmd = Command::cargo_bin("reqtxt").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("reqtxt"));
}

#[test]
fn test_check_clean_file() {
    let project = common::create_temp_project_with_includes();

    reqtxt()
        .arg("check")
        .arg(project.path().join("requirements.txt"))
        .arg(project.path().join("requirements-dev.txt"))
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_check_reports_errors_with_location() {
    let project = common::TempProject::new();
    let path = project.create_file("requirements.txt", "flask\n--bogus-flag\n");

    reqtxt()
        .arg("check")
        .arg(&path)
        .assert()
        .failure()
        .stdout(predicate::str::contains("requirements.txt:2:1: error:"))
        .stdout(predicate::str::contains("--bogus-flag"));
}

#[test]
fn test_check_missing_file() {
    let project = common::TempProject::new();

    reqtxt()
        .arg("check")
        .arg(project.path().join("nope.txt"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}

#[test]
fn test_list_table() {
    let project = common::create_temp_project_with_includes();

    reqtxt()
        .arg("list")
        .arg(project.path().join("requirements.txt"))
        .assert()
        .success()
        .stdout(predicate::str::contains("requests[security,socks]"))
        .stdout(predicate::str::contains(">=2.28.0,<3.0.0"))
        .stdout(predicate::str::contains("line 5"));
}

#[test]
fn test_list_json() {
    let project = common::create_temp_project_with_includes();

    let output = reqtxt()
        .arg("list")
        .arg("--json")
        .arg(project.path().join("requirements-dev.txt"))
        .output()
        .unwrap();
    assert!(output.status.success());

    let entries: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = entries
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["normalized_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["pytest", "pytest-cov", "black", "numpy"]);
    assert_eq!(entries[0]["line"], 2);
}

#[test]
fn test_set_version_prints_edit() {
    let project = common::TempProject::new();
    let path = project.create_file("requirements.txt", "# deps\nrequests>=2.0  # pinned\nflask\n");

    reqtxt()
        .arg("set-version")
        .arg(&path)
        .arg("requests")
        .arg("==2.31.0")
        .assert()
        .success()
        .stdout("# deps\nrequests==2.31.0  # pinned\nflask\n");

    assert_eq!(
        project.read_file("requirements.txt"),
        "# deps\nrequests>=2.0  # pinned\nflask\n"
    );
}

#[test]
fn test_set_version_write() {
    let project = common::TempProject::new();
    let path = project.create_file("requirements.txt", "Flask (>=1.0)\n");

    reqtxt()
        .arg("set-version")
        .arg(&path)
        .arg("flask")
        .arg(">=2.0,<3")
        .arg("--write")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    assert_eq!(project.read_file("requirements.txt"), "Flask (>=2.0,<3)\n");
}

#[test]
fn test_set_version_unknown_package() {
    let project = common::TempProject::new();
    let path = project.create_file("requirements.txt", "flask\n");

    reqtxt()
        .arg("set-version")
        .arg(&path)
        .arg("django")
        .arg("==4.2")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Package not found: django"));
}

#[test]
fn test_resolve_json() {
    let project = common::create_temp_project_with_includes();

    let output = reqtxt()
        .arg("resolve")
        .arg("--json")
        .arg(project.path().join("requirements.txt"))
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let numpy = report["requirements"]
        .as_array()
        .unwrap()
        .iter()
        .find(|entry| entry["name"] == "numpy")
        .unwrap();
    assert_eq!(numpy["specifiers"], "==1.24.0");
    assert_eq!(report["constraints"].as_array().unwrap().len(), 2);
    assert_eq!(report["errors"].as_array().unwrap().len(), 0);
}

#[test]
fn test_resolve_first_wins_flag() {
    let project = common::create_temp_project_with_includes();

    reqtxt()
        .arg("resolve")
        .arg("--precedence")
        .arg("first-wins")
        .arg(project.path().join("requirements-dev.txt"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Requirements:"))
        .stdout(predicate::str::contains("==1.26.0"));
}

#[test]
fn test_resolve_reports_missing_include() {
    let project = common::TempProject::new();
    let path = project.create_file("requirements.txt", "-r missing.txt\nflask\n");

    reqtxt()
        .arg("resolve")
        .arg(&path)
        .assert()
        .failure()
        .stdout(predicate::str::contains("flask"))
        .stdout(predicate::str::contains("warning: Failed to load include"));
}

#[test]
fn test_resolve_with_config_file() {
    let project = common::TempProject::new();
    project.create_file("base.txt", "flask==1.0\n");
    let path = project.create_file("requirements.txt", "-r base.txt\nflask==2.0\n");
    let config = project.create_file("reqtxt.toml", "[resolve]\nprecedence = \"first-wins\"\n");

    reqtxt()
        .arg("--config")
        .arg(&config)
        .arg("resolve")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("==2.0"))
        .stdout(predicate::str::contains("==1.0").not());
}
