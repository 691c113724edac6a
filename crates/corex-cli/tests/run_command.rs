use assert_cmd::Command;
use predicates::str::contains;
use tempfile::TempDir;

#[test]
fn run_with_mock_completes_and_prints_done() {
    let workspace = TempDir::new().unwrap();

    Command::cargo_bin("corex")
        .unwrap()
        .args(["--workspace", workspace.path().to_str().unwrap(), "run", "greet the user", "--mock", "--auto-approve"])
        .assert()
        .success()
        .stdout(contains("done:"));
}

#[test]
fn config_init_then_show_round_trips_defaults() {
    let workspace = TempDir::new().unwrap();

    Command::cargo_bin("corex")
        .unwrap()
        .args(["--workspace", workspace.path().to_str().unwrap(), "config", "init"])
        .assert()
        .success();

    Command::cargo_bin("corex")
        .unwrap()
        .args(["--workspace", workspace.path().to_str().unwrap(), "config", "show"])
        .assert()
        .success()
        .stdout(contains("max_iterations_per_run"));
}
