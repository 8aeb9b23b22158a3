use predicates::str::{contains, diff};

#[test]
fn show_config_prints_resolved_configuration() {
    let expected = concat!(
        "T_max: 90 min\n",
        "N_max: 1000\n",
        "Mean interarrival: 13 min\n",
        "Validation time: 2 min\n",
        "Servers: 10\n",
        "Seed: 42\n",
        "Connectors:\n",
        "- USB-C (p: 0.45, price/hour: 300, charge: 60min@0.5, 120min@0.3, 180min@0.15, 240min@0.05)\n",
        "- Lightning (p: 0.25, price/hour: 500, charge: 60min@0.5, 120min@0.3, 180min@0.15, 240min@0.05)\n",
        "- MicroUSB (p: 0.3, price/hour: 1000, charge: 60min@0.5, 120min@0.3, 180min@0.15, 240min@0.05)\n",
    );

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("chargesim");
    cmd.args(["show-config", "--t-max", "90", "--servers", "10", "--seed", "42"]);
    cmd.assert().success().stdout(diff(expected));
}

#[test]
fn replicate_prints_one_line_per_seed_and_the_mean() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("chargesim");
    cmd.args(["replicate", "--replications", "3", "--seed", "10"]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let output = String::from_utf8(output).expect("stdout should be utf-8");
    let lines = output.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[0], "Replications:");
    assert!(lines[1].starts_with("seed 10: "));
    assert!(lines[3].starts_with("seed 12: "));
    assert!(lines[4].starts_with("Mean: "));
}

#[test]
fn replicate_rejects_zero_replications() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("chargesim");
    cmd.args(["replicate", "--replications", "0"]);
    cmd.assert()
        .failure()
        .stderr(contains("Error: replications must be greater than 0"));
}

#[test]
fn replicate_rejects_unbounded_replication_counts() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("chargesim");
    cmd.args([
        "replicate",
        "--replications",
        "18446744073709551615",
        "--t-max",
        "1",
    ]);
    cmd.assert()
        .failure()
        .code(1)
        .stderr(contains("Error: replications must be at most 10000"));
}
