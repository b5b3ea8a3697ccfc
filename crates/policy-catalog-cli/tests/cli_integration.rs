use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|err| panic!("clock should be >= UNIX_EPOCH: {err}"))
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("{prefix}-{now}"));
    fs::create_dir_all(&dir)
        .unwrap_or_else(|err| panic!("failed to create temp dir {}: {err}", dir.display()));
    dir
}

fn run_json(args: &[&str]) -> serde_json::Value {
    let output = Command::new(env!("CARGO_BIN_EXE_policy-catalog"))
        .args(args)
        .output()
        .unwrap_or_else(|err| panic!("cli should spawn: {err}"));
    if !output.status.success() {
        panic!(
            "cli {args:?} failed with status {:?}\nstdout: {}\nstderr: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
    }
    serde_json::from_slice(&output.stdout)
        .unwrap_or_else(|err| panic!("cli output should be JSON: {err}"))
}

fn run_expecting_failure(args: &[&str]) -> String {
    let output = Command::new(env!("CARGO_BIN_EXE_policy-catalog"))
        .args(args)
        .output()
        .unwrap_or_else(|err| panic!("cli should spawn: {err}"));
    if output.status.success() {
        panic!(
            "cli {args:?} should have failed\nstdout: {}",
            String::from_utf8_lossy(&output.stdout)
        );
    }
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn as_str<'a>(value: &'a serde_json::Value, key: &str) -> &'a str {
    value[key]
        .as_str()
        .unwrap_or_else(|| panic!("{key} should be a string in {value}"))
}

fn as_i64(value: &serde_json::Value, key: &str) -> i64 {
    value[key]
        .as_i64()
        .unwrap_or_else(|| panic!("{key} should be a number in {value}"))
}

// Test IDs: TCLI-001
#[test]
fn seed_is_deterministic_per_seed_and_now() {
    let dir_a = unique_temp_dir("policy-catalog-seed-a");
    let dir_b = unique_temp_dir("policy-catalog-seed-b");
    let dir_c = unique_temp_dir("policy-catalog-seed-c");

    let seed_into = |dir: &Path, seed: &str| {
        run_json(&[
            "seed",
            "--out",
            dir.to_str().unwrap_or_default(),
            "--seed",
            seed,
            "--now",
            "2021-08-01T00:00:00Z",
            "--customers",
            "8",
            "--policies",
            "24",
        ])
    };
    let first = seed_into(&dir_a, "42");
    let second = seed_into(&dir_b, "42");
    let third = seed_into(&dir_c, "43");

    assert_eq!(as_str(&first, "contract"), "cli.v1");
    assert_eq!(as_i64(&first, "customers"), 8);
    assert_eq!(as_i64(&first, "policies"), 24);
    assert_eq!(as_str(&first, "fingerprint"), as_str(&second, "fingerprint"));
    assert_ne!(as_str(&first, "fingerprint"), as_str(&third, "fingerprint"));

    let _ = fs::remove_dir_all(&dir_a);
    let _ = fs::remove_dir_all(&dir_b);
    let _ = fs::remove_dir_all(&dir_c);
}

// Test IDs: TCLI-002
#[test]
fn fingerprint_subcommand_matches_the_seed_summary() {
    let dir = unique_temp_dir("policy-catalog-fingerprint");

    let seeded = run_json(&[
        "seed",
        "--out",
        dir.to_str().unwrap_or_default(),
        "--seed",
        "7",
        "--now",
        "2021-08-01T00:00:00Z",
        "--customers",
        "5",
        "--policies",
        "15",
    ]);
    let reported = run_json(&["fingerprint", "--data-dir", dir.to_str().unwrap_or_default()]);

    assert_eq!(as_str(&seeded, "fingerprint"), as_str(&reported, "fingerprint"));
    assert_eq!(as_i64(&reported, "policies"), 15);

    let _ = fs::remove_dir_all(&dir);
}

// Test IDs: TCLI-003
#[test]
fn page_over_demo_data_sorts_and_paginates() {
    let page = run_json(&["page", "--sort-field", "policyNumber", "--limit", "3"]);

    assert_eq!(as_str(&page, "contract"), "cli.v1");
    assert_eq!(as_i64(&page, "total"), 7);
    assert_eq!(page["has_next_page"], serde_json::json!(true));

    let rows = page["policies"]
        .as_array()
        .unwrap_or_else(|| panic!("policies should be a list in {page}"));
    assert_eq!(rows.len(), 3);
    assert_eq!(as_str(&rows[0], "id"), "p-000001");
    assert_eq!(as_str(&rows[0], "policy_number"), "a1");
    assert_eq!(as_str(&rows[0], "start_date"), "2021-01-06T00:00:00Z");
    assert_eq!(as_i64(&rows[0], "start_date_ms"), 1_609_891_200_000);
    assert_eq!(as_str(&rows[1], "policy_number"), "a2");
}

// Test IDs: TCLI-004
#[test]
fn page_supports_dotted_customer_paths() {
    let page = run_json(&[
        "page",
        "--sort-field",
        "customer.lastName",
        "--order",
        "desc",
        "--limit",
        "1",
    ]);

    let rows = page["policies"]
        .as_array()
        .unwrap_or_else(|| panic!("policies should be a list in {page}"));
    assert_eq!(rows.len(), 1);
    assert_eq!(as_str(&rows[0], "policy_number"), "d4");
    assert_eq!(as_str(&rows[0], "customer"), "Dave Fredrickson");
}

// Test IDs: TCLI-005
#[test]
fn page_reads_back_seeded_snapshots() {
    let dir = unique_temp_dir("policy-catalog-page-snapshot");

    let _ = run_json(&[
        "seed",
        "--out",
        dir.to_str().unwrap_or_default(),
        "--seed",
        "9",
        "--now",
        "2021-08-01T00:00:00Z",
        "--customers",
        "3",
        "--policies",
        "9",
    ]);
    let page = run_json(&[
        "page",
        "--data-dir",
        dir.to_str().unwrap_or_default(),
        "--sort-field",
        "createdAt",
        "--offset",
        "6",
        "--limit",
        "5",
    ]);

    assert_eq!(as_i64(&page, "total"), 9);
    assert_eq!(page["has_next_page"], serde_json::json!(false));
    let rows = page["policies"]
        .as_array()
        .unwrap_or_else(|| panic!("policies should be a list in {page}"));
    assert_eq!(rows.len(), 3);

    let _ = fs::remove_dir_all(&dir);
}

// Test IDs: TCLI-006
#[test]
fn unknown_sort_fields_fail_with_a_diagnostic() {
    let stderr = run_expecting_failure(&["page", "--sort-field", "nonexistent"]);
    assert!(stderr.contains("unknown sort field"), "stderr: {stderr}");

    let stderr = run_expecting_failure(&["page", "--sort-field", "customer"]);
    assert!(stderr.contains("cannot sort by object type"), "stderr: {stderr}");
}
