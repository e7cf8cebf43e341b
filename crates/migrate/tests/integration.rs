use std::collections::HashSet;
use std::path::PathBuf;

use shortly_migrate::config::{MigrateConfig, ResolutionOrder};
use shortly_migrate::engine::run;
use shortly_migrate::model::{
    AssignmentStatus, GroupDecision, MigrationInput, MigrationOutcome, Timestamp,
};
use shortly_migrate::validate::validate_assignments;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn read_fixture(name: &str) -> String {
    let path = fixtures_dir().join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()))
}

fn load_fixtures() -> MigrationInput {
    MigrationInput::from_json(
        &read_fixture("assignments.json"),
        &read_fixture("parcels.json"),
        &read_fixture("users.json"),
    )
    .unwrap()
}

fn run_with(order: ResolutionOrder) -> MigrationOutcome {
    let mut config = MigrateConfig::default();
    config.heuristics.resolution_order = order;
    run(&config, &load_fixtures())
}

fn parcel_ids(outcome: &MigrationOutcome, assignment_id: &str) -> Vec<String> {
    outcome
        .assignments
        .iter()
        .find(|a| a.assignment_id == assignment_id)
        .unwrap_or_else(|| panic!("no assignment {assignment_id}"))
        .parcels
        .iter()
        .map(|p| p.parcel_id.clone())
        .collect()
}

// -------------------------------------------------------------------------
// Loading
// -------------------------------------------------------------------------

#[test]
fn fixtures_load_with_legacy_quirks() {
    let input = load_fixtures();
    assert_eq!(input.users.len(), 4);
    assert_eq!(input.parcels.len(), 6);
    assert_eq!(input.assignments.len(), 6);

    // Whitespace around phones is dropped at load.
    assert_eq!(input.users[1].phone_number, "0244111222");
    // String and extended-JSON numerics coerce.
    assert_eq!(input.parcels[1].delivery_cost, 7.5);
    assert!(input.parcels[1].parcel_assigned);
    assert_eq!(input.parcels[3].delivery_cost, 5.5);
    assert_eq!(input.assignments[0].assigned_at, Some(Timestamp::Integral(1000)));
    assert_eq!(input.parcels[0].receiver_phone_number, "0244000001");
}

// -------------------------------------------------------------------------
// End-to-end consolidation
// -------------------------------------------------------------------------

#[test]
fn consolidates_fixture_export() {
    let outcome = run_with(ResolutionOrder::FrequencyFirst);

    let ids: Vec<_> = outcome.assignments.iter().map(|a| a.assignment_id.as_str()).collect();
    assert_eq!(ids, vec!["a1", "a2", "a3", "a5", "a6"]);

    assert_eq!(parcel_ids(&outcome, "a1"), vec!["p1"]);
    assert_eq!(parcel_ids(&outcome, "a2"), vec!["p2"]);
    assert_eq!(parcel_ids(&outcome, "a3"), vec!["p3", "p4"]);
    assert_eq!(parcel_ids(&outcome, "a5"), vec!["p5"]);
    assert_eq!(parcel_ids(&outcome, "a6"), vec!["p6"]);

    let a3 = &outcome.assignments[2];
    assert_eq!(a3.amount, 10.5);
    assert_eq!(a3.rider_info.as_ref().unwrap().rider_name, "Ama Owusu");
    assert_eq!(a3.status, Some(AssignmentStatus::Pending));

    let a5 = &outcome.assignments[3];
    assert_eq!(a5.rider_info.as_ref().unwrap().rider_id, "u3");
    assert_eq!(a5.cancelation_reason, Some(serde_json::json!("receiver unreachable")));
}

#[test]
fn report_summarises_the_run() {
    let outcome = run_with(ResolutionOrder::FrequencyFirst);
    let summary = &outcome.report.summary;

    assert_eq!(summary.input_assignments, 6);
    assert_eq!(summary.riders_indexed, 2);
    assert_eq!(summary.parcels_indexed, 6);
    assert_eq!(summary.groups, 5);
    assert_eq!(summary.assignments_produced, 5);
    assert_eq!(summary.groups_skipped, 0);
    assert_eq!(summary.groups_without_parcels, 1);
    assert_eq!(summary.fallback_allocations, 1);
    assert_eq!(summary.parcels_allocated, 6);
    assert!((summary.total_amount - 51.0).abs() < 1e-9);

    assert_eq!(summary.resolution_tiers["exact"], 3);
    assert_eq!(summary.resolution_tiers["frequency"], 1);
    assert_eq!(summary.resolution_tiers["office"], 1);

    let phones: Vec<_> = outcome
        .report
        .mappings
        .iter()
        .map(|m| m.driver_phone.as_str())
        .collect();
    assert_eq!(phones, vec!["+233501234567", "501234567", "0244111222"]);

    let fallback = outcome
        .report
        .groups
        .iter()
        .find(|g| g.office_id == "office-tamale")
        .unwrap();
    match &fallback.decision {
        GroupDecision::Produced { used_fallback, .. } => assert!(*used_fallback),
        other => panic!("unexpected decision {other:?}"),
    }
}

#[test]
fn direct_first_reports_substring_tier() {
    let outcome = run_with(ResolutionOrder::DirectFirst);
    let tiers = &outcome.report.summary.resolution_tiers;
    assert_eq!(tiers["substring"], 1);
    assert!(!tiers.contains_key("frequency"));
    // Same rider either way for this export.
    assert_eq!(outcome.assignments[1].rider_info.as_ref().unwrap().rider_id, "u1");
}

#[test]
fn output_passes_validation() {
    let outcome = run_with(ResolutionOrder::FrequencyFirst);
    let report = validate_assignments(&outcome.assignments, 0.01).unwrap();
    assert!(report.passed(), "{:?}", report.errors);
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    assert_eq!(report.stats.total_parcels, 6);
    assert_eq!(report.stats.by_rider["Kofi Mensah"], 2);
    assert_eq!(report.stats.by_office["office-kumasi"], 2);
}

#[test]
fn no_parcel_claimed_twice() {
    let outcome = run_with(ResolutionOrder::FrequencyFirst);
    let mut seen = HashSet::new();
    for a in &outcome.assignments {
        for p in &a.parcels {
            assert!(seen.insert(p.parcel_id.clone()), "{} claimed twice", p.parcel_id);
        }
    }
}

#[test]
fn output_json_uses_new_schema_names() {
    let outcome = run_with(ResolutionOrder::FrequencyFirst);
    let json = serde_json::to_value(&outcome.assignments).unwrap();
    let first = &json[0];
    assert_eq!(first["assignmentId"], "a1");
    assert_eq!(first["riderInfo"]["riderPhoneNumber"], "+233501234567");
    assert_eq!(first["parcels"][0]["parcelAmount"], 10.0);
    assert_eq!(first["parcels"][0]["payed"], false);
    assert_eq!(first["parcels"][0]["cancelled"], false);
    assert_eq!(first["createdAt"]["$date"], "2024-03-01T10:00:00Z");
}

#[test]
fn runs_are_deterministic() {
    let a = run_with(ResolutionOrder::FrequencyFirst);
    let b = run_with(ResolutionOrder::FrequencyFirst);
    assert_eq!(a.assignments, b.assignments);
}

#[test]
fn empty_input_produces_nothing() {
    let outcome = run(&MigrateConfig::default(), &MigrationInput::default());
    assert!(outcome.assignments.is_empty());
    assert_eq!(outcome.report.summary.groups, 0);
}
