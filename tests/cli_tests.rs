//! CLI integration tests - driving the pipeline through the binary

mod common;

use common::{extract_batch_id, fpt, intake_batch, make_ready_batch, setup_test_project};
use predicates::prelude::*;

// ============================================================================
// init
// ============================================================================

#[test]
fn test_init_creates_project_layout() {
    let tmp = tempfile::TempDir::new().unwrap();

    fpt()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized"));

    assert!(tmp.path().join(".fpt/config.yaml").is_file());
    assert!(tmp.path().join(".fpt/pipeline.db").is_file());
}

#[test]
fn test_init_twice_fails() {
    let tmp = setup_test_project();

    fpt()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_commands_outside_project_fail() {
    let tmp = tempfile::TempDir::new().unwrap();

    fpt()
        .current_dir(tmp.path())
        .args(["batch", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("fpt init"));
}

// ============================================================================
// batch intake / list / show
// ============================================================================

#[test]
fn test_intake_creates_batch_in_inspection() {
    let tmp = setup_test_project();
    let id = intake_batch(&tmp, "strawberry", 100.0, 99.5);
    assert!(id.starts_with("BAT-"));

    fpt()
        .current_dir(tmp.path())
        .args(["batch", "show", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("state: inspection"))
        .stdout(predicate::str::contains("variety: strawberry"));
}

#[test]
fn test_intake_rejects_non_positive_mass() {
    let tmp = setup_test_project();

    fpt()
        .current_dir(tmp.path())
        .args([
            "batch", "intake", "--variety", "strawberry", "--origin", "field-7", "--stated",
            "0", "--actual", "10",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("positive"));
}

#[test]
fn test_batch_list_filters_and_counts() {
    let tmp = setup_test_project();
    intake_batch(&tmp, "strawberry", 10.0, 10.0);
    intake_batch(&tmp, "raspberry", 5.0, 5.0);

    fpt()
        .current_dir(tmp.path())
        .args(["batch", "list", "--count"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2"));

    fpt()
        .current_dir(tmp.path())
        .args(["batch", "list", "--variety", "raspberry", "--count"])
        .assert()
        .success()
        .stdout("1\n");

    fpt()
        .current_dir(tmp.path())
        .args(["batch", "list", "--state", "grading", "--count"])
        .assert()
        .success()
        .stdout("0\n");
}

#[test]
fn test_batch_import_from_drop_dir() {
    let tmp = setup_test_project();
    let drop = tmp.path().join("deliveries");
    std::fs::create_dir_all(&drop).unwrap();
    std::fs::write(
        drop.join("d1.yaml"),
        "variety: strawberry\norigin: field-7\nstated_mass_kg: 100\nactual_mass_kg: 99.5\n",
    )
    .unwrap();
    std::fs::write(drop.join("bad.yaml"), "variety: [oops\n").unwrap();

    fpt()
        .current_dir(tmp.path())
        .args(["batch", "import", "deliveries"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 batch(es) created"))
        .stdout(predicate::str::contains("1 file(s) skipped"));

    fpt()
        .current_dir(tmp.path())
        .args(["batch", "list", "--count"])
        .assert()
        .success()
        .stdout("1\n");
}

// ============================================================================
// inspection
// ============================================================================

#[test]
fn test_inspection_split_forks_rejection_sibling() {
    // Scenario A through the binary: 100 kg intake, 20 kg rejected.
    let tmp = setup_test_project();
    let id = intake_batch(&tmp, "strawberry", 100.0, 100.0);

    fpt()
        .current_dir(tmp.path())
        .args([
            "inspect", &id, "--rejected", "20", "--check", "mold=pass", "--inspector", "qa-1",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("80.000 kg accepted"))
        .stdout(predicate::str::contains(format!("{}-REJ", id)));

    fpt()
        .current_dir(tmp.path())
        .args(["batch", "show", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("state: grading"))
        .stdout(predicate::str::contains("actual_mass: 80"));

    fpt()
        .current_dir(tmp.path())
        .args(["batch", "show", &format!("{}-REJ", id)])
        .assert()
        .success()
        .stdout(predicate::str::contains("state: disposal"))
        .stdout(predicate::str::contains(format!("parent_id: {}", id)));
}

#[test]
fn test_reject_all_and_reopen() {
    let tmp = setup_test_project();
    let id = intake_batch(&tmp, "strawberry", 42.0, 42.0);

    fpt()
        .current_dir(tmp.path())
        .args(["inspect", &id, "--reject-all", "--inspector", "qa-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("whole batch rejected"));

    fpt()
        .current_dir(tmp.path())
        .args(["batch", "reopen", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("back to inspection"));

    fpt()
        .current_dir(tmp.path())
        .args(["batch", "show", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("state: inspection"));
}

#[test]
fn test_inspect_rejects_mass_beyond_batch() {
    let tmp = setup_test_project();
    let id = intake_batch(&tmp, "strawberry", 10.0, 10.0);

    fpt()
        .current_dir(tmp.path())
        .args(["inspect", &id, "--rejected", "11"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("exceeds"));
}

// ============================================================================
// grading
// ============================================================================

#[test]
fn test_grading_mismatch_surfaces_both_totals() {
    // Scenario B through the binary: 80 kg accepted, 50 + 19.9 + 10 entered.
    let tmp = setup_test_project();
    let id = intake_batch(&tmp, "strawberry", 100.0, 100.0);
    fpt()
        .current_dir(tmp.path())
        .args(["inspect", &id, "--rejected", "20"])
        .assert()
        .success();

    fpt()
        .current_dir(tmp.path())
        .args(["grade", &id, "-g", "a=50", "-g", "b=19.9", "-g", "c=10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("79.9"))
        .stderr(predicate::str::contains("80"));

    // State unchanged by the failed commit.
    fpt()
        .current_dir(tmp.path())
        .args(["batch", "show", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("state: grading"));

    fpt()
        .current_dir(tmp.path())
        .args(["grade", &id, "-g", "a=50", "-g", "b=20", "-g", "c=10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("awaiting cleaning"));
}

// ============================================================================
// disposal
// ============================================================================

#[test]
fn test_disposal_entries_must_reconcile() {
    let tmp = setup_test_project();
    let id = intake_batch(&tmp, "strawberry", 20.0, 20.0);
    fpt()
        .current_dir(tmp.path())
        .args(["inspect", &id, "--reject-all"])
        .assert()
        .success();

    // 12 + 8 against 20 commits.
    fpt()
        .current_dir(tmp.path())
        .args(["dispose", &id, "-e", "composting=12", "-e", "incineration=8"])
        .assert()
        .success()
        .stdout(predicate::str::contains("batch closed"));

    // Against 19 the same entries are rejected.
    let id = intake_batch(&tmp, "strawberry", 19.0, 19.0);
    fpt()
        .current_dir(tmp.path())
        .args(["inspect", &id, "--reject-all"])
        .assert()
        .success();
    fpt()
        .current_dir(tmp.path())
        .args(["dispose", &id, "-e", "composting=12", "-e", "incineration=8"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("rejected mass is 19"));
}

// ============================================================================
// packaging
// ============================================================================

#[test]
fn test_pack_requires_compliance_flag() {
    let tmp = setup_test_project();
    make_ready_batch(&tmp, "strawberry", 30.0);

    fpt()
        .current_dir(tmp.path())
        .args(["pack", "run", "-v", "strawberry", "-g", "a", "-u", "10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("verification"));
}

#[test]
fn test_pack_over_request_rejected() {
    let tmp = setup_test_project();
    make_ready_batch(&tmp, "strawberry", 10.0);

    fpt()
        .current_dir(tmp.path())
        .args([
            "pack", "run", "-v", "strawberry", "-g", "a", "-u", "51", "--verified",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("insufficient pooled mass"));

    // Nothing was mutated: the full 50 units still pack afterwards.
    fpt()
        .current_dir(tmp.path())
        .args(["pack", "run", "-v", "strawberry", "-g", "a", "--verified"])
        .assert()
        .success()
        .stdout(predicate::str::contains("50 x 0.200 kg packs"));
}

#[test]
fn test_pack_consolidates_pools_and_spins_remainder() {
    // Scenario C through the binary: 30 + 15 kg pooled, 200 units requested.
    let tmp = setup_test_project();
    let first = make_ready_batch(&tmp, "strawberry", 30.0);
    let second = make_ready_batch(&tmp, "strawberry", 15.0);

    let output = fpt()
        .current_dir(tmp.path())
        .args([
            "pack", "run", "-v", "strawberry", "-g", "a", "-u", "200", "--verified",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("200 x 0.200 kg packs"));
    assert!(stdout.contains("40.000 kg"));
    assert!(stdout.contains("leftover continues as"));

    // Both contributors closed, remainder ready with 5 kg.
    fpt()
        .current_dir(tmp.path())
        .args(["batch", "show", &first])
        .assert()
        .success()
        .stdout(predicate::str::contains("state: completed"));
    fpt()
        .current_dir(tmp.path())
        .args(["batch", "show", &format!("{}-REM", second)])
        .assert()
        .success()
        .stdout(predicate::str::contains("state: ready_for_packaging"))
        .stdout(predicate::str::contains("a: 5"));

    // Inventory received exactly the packed mass.
    fpt()
        .current_dir(tmp.path())
        .args(["stock", "levels"])
        .assert()
        .success()
        .stdout(predicate::str::contains("40.000"));

    fpt()
        .current_dir(tmp.path())
        .args(["stock", "movements"])
        .assert()
        .success()
        .stdout(predicate::str::contains("in"))
        .stdout(predicate::str::contains("RUN-"));
}

#[test]
fn test_pack_eligible_lists_pool() {
    let tmp = setup_test_project();
    let id = make_ready_batch(&tmp, "strawberry", 30.0);

    fpt()
        .current_dir(tmp.path())
        .args(["pack", "eligible", "-v", "strawberry", "-g", "a"])
        .assert()
        .success()
        .stdout(predicate::str::contains(&id))
        .stdout(predicate::str::contains("150 x 0.200 kg"));

    fpt()
        .current_dir(tmp.path())
        .args(["pack", "eligible", "-v", "strawberry", "-g", "b"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No eligible batches"));
}

#[test]
fn test_pack_records_visible_on_batch_show() {
    let tmp = setup_test_project();
    let id = make_ready_batch(&tmp, "strawberry", 10.0);

    fpt()
        .current_dir(tmp.path())
        .args([
            "pack", "run", "-v", "strawberry", "-g", "a", "--verified", "-b", &id,
        ])
        .assert()
        .success();

    fpt()
        .current_dir(tmp.path())
        .args(["batch", "show", &id, "--records"])
        .assert()
        .success()
        .stdout(predicate::str::contains("packing_records:"))
        .stdout(predicate::str::contains("mass_consumed: 10"));
}

// ============================================================================
// output formats
// ============================================================================

#[test]
fn test_list_format_id_is_pipeable() {
    let tmp = setup_test_project();
    let id = intake_batch(&tmp, "strawberry", 10.0, 10.0);

    let output = fpt()
        .current_dir(tmp.path())
        .args(["batch", "list", "--format", "id"])
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), id);
}

#[test]
fn test_show_format_json() {
    let tmp = setup_test_project();
    let id = intake_batch(&tmp, "strawberry", 10.0, 10.0);

    let output = fpt()
        .current_dir(tmp.path())
        .args(["batch", "show", &id, "--format", "json"])
        .output()
        .unwrap();
    let batch: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(batch["id"], serde_json::Value::String(id));
    assert_eq!(batch["state"], "inspection");
}

#[test]
fn test_extract_batch_id_helper() {
    let id = extract_batch_id(b"Created BAT-01J123 (10.000 kg strawberry)");
    assert_eq!(id, "BAT-01J123");
}
