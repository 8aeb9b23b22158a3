use predicates::str::contains;

#[test]
fn probabilities_must_sum_to_one() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("chargesim");
    cmd.args(["run", "--p-usb-c", "0.5", "--p-microusb", "0.5"]);
    cmd.assert()
        .failure()
        .stderr(contains("Error: connector probabilities must sum to 1 (got 1.25)"));
}

#[test]
fn unsupported_server_count_fails() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("chargesim");
    cmd.args(["run", "--servers", "9"]);
    cmd.assert()
        .failure()
        .stderr(contains("Error: unsupported server count 9: expected 8 or 10"));
}

#[test]
fn zero_time_limit_fails() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("chargesim");
    cmd.args(["run", "--t-max", "0"]);
    cmd.assert()
        .failure()
        .stderr(contains("Error: t_max must be > 0 (got 0)"));
}

#[test]
fn zero_event_limit_fails() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("chargesim");
    cmd.args(["run", "--n-max", "0"]);
    cmd.assert()
        .failure()
        .stderr(contains("Error: n_max must be greater than 0"));
}

#[test]
fn missing_config_file_fails() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("chargesim");
    cmd.args(["run", "--config", "/nonexistent/chargesim.toml"]);
    cmd.assert()
        .failure()
        .stderr(contains("Error: failed to read config '/nonexistent/chargesim.toml'"));
}

#[test]
fn exhausted_wall_clock_budget_is_reported_as_an_abort() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("chargesim");
    cmd.args(["run", "--seed", "1", "--max-wall-ms", "0"]);
    cmd.assert()
        .failure()
        .stderr(contains("Error: run aborted after 0 events"))
        .stdout("");
}
