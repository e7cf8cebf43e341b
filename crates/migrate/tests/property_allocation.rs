// Property-based tests for parcel allocation and consolidation.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::HashSet;

use proptest::prelude::*;
use shortly_migrate::config::{MigrateConfig, ResolutionOrder};
use shortly_migrate::engine::run;
use shortly_migrate::group::group_assignments;
use shortly_migrate::model::{
    AssignmentStatus, GroupDecision, MigrationInput, RawAssignment, RawParcel, RawUser, Role,
    Timestamp,
};
use shortly_migrate::validate::validate_assignments;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

const OFFICES: [&str; 4] = ["A", "B", "C", ""];
const PHONES: [&str; 6] = ["+233501234567", "501234567", "0244111222", "0244", "0209999999", ""];

fn arb_office() -> impl Strategy<Value = String> {
    prop::sample::select(OFFICES.to_vec()).prop_map(str::to_string)
}

fn arb_phone() -> impl Strategy<Value = String> {
    prop::sample::select(PHONES.to_vec()).prop_map(str::to_string)
}

fn arb_status() -> impl Strategy<Value = Option<AssignmentStatus>> {
    prop_oneof![
        6 => prop::sample::select(AssignmentStatus::KNOWN.to_vec())
            .prop_map(|s| Some(AssignmentStatus::from(s.to_string()))),
        1 => Just(Some(AssignmentStatus::Other("ON_HOLD".into()))),
        1 => Just(None),
    ]
}

fn arb_users() -> impl Strategy<Value = Vec<RawUser>> {
    proptest::collection::vec((prop::bool::weighted(0.8), arb_phone(), arb_office()), 0..6).prop_map(
        |specs| {
            specs
                .into_iter()
                .enumerate()
                .map(|(i, (is_rider, phone, office))| RawUser {
                    role: if is_rider { Role::Rider } else { Role::Other("ADMIN".into()) },
                    user_id: format!("u{i}"),
                    name: format!("Rider {i}"),
                    phone_number: phone,
                    office_id: office,
                })
                .collect()
        },
    )
}

fn arb_parcels() -> impl Strategy<Value = Vec<RawParcel>> {
    proptest::collection::vec(
        (arb_office(), arb_phone(), any::<bool>(), any::<bool>(), 0u32..50_000),
        0..25,
    )
    .prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (office, phone, assigned, delivered, cents))| RawParcel {
                parcel_id: format!("p{i}"),
                office_id: Some(office),
                driver_phone_number: phone,
                parcel_assigned: assigned,
                delivered,
                delivery_cost: f64::from(cents) / 100.0,
                parcel_description: String::new(),
                receiver_name: String::new(),
                receiver_phone_number: String::new(),
                receiver_address: String::new(),
                sender_name: String::new(),
                sender_phone_number: String::new(),
            })
            .collect()
    })
}

fn arb_assignments() -> impl Strategy<Value = Vec<RawAssignment>> {
    proptest::collection::vec(
        (arb_office(), prop::option::weighted(0.9, 0i64..6), arb_status()),
        0..20,
    )
    .prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (office, slot, status))| RawAssignment {
                assignment_id: format!("a{i}"),
                office_id: office,
                assigned_at: slot.map(|s| Timestamp::Integral(1_000 * s)),
                status,
                accepted_at: 0,
                completed_at: 0,
                confirmation_code: None,
                payed: false,
                payement_method: None,
                cancelation_reason: None,
                created_at: None,
                updated_at: None,
            })
            .collect()
    })
}

fn arb_input() -> impl Strategy<Value = MigrationInput> {
    (arb_assignments(), arb_parcels(), arb_users()).prop_map(|(assignments, parcels, users)| {
        MigrationInput {
            assignments,
            parcels,
            users,
        }
    })
}

fn arb_order() -> impl Strategy<Value = ResolutionOrder> {
    prop_oneof![Just(ResolutionOrder::FrequencyFirst), Just(ResolutionOrder::DirectFirst)]
}

fn config_with(order: ResolutionOrder) -> MigrateConfig {
    let mut config = MigrateConfig::default();
    config.heuristics.resolution_order = order;
    config
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn no_parcel_in_two_assignments(input in arb_input(), order in arb_order()) {
        let outcome = run(&config_with(order), &input);
        let mut seen = HashSet::new();
        for a in &outcome.assignments {
            for p in &a.parcels {
                prop_assert!(seen.insert(p.parcel_id.clone()), "{} allocated twice", p.parcel_id);
            }
        }
        prop_assert_eq!(seen.len(), outcome.report.summary.parcels_allocated);
    }

    #[test]
    fn amount_is_sum_of_parcels(input in arb_input(), order in arb_order()) {
        let outcome = run(&config_with(order), &input);
        for a in &outcome.assignments {
            let sum: f64 = a.parcels.iter().map(|p| p.parcel_amount).sum();
            prop_assert!((a.amount - sum).abs() <= 0.01, "{}: {} vs {}", a.assignment_id, a.amount, sum);
        }
    }

    #[test]
    fn every_row_in_exactly_one_group(input in arb_input()) {
        let groups = group_assignments(&input.assignments);
        let total: usize = groups.iter().map(|g| g.len()).sum();
        prop_assert_eq!(total, input.assignments.len());

        let mut ids = HashSet::new();
        for g in &groups {
            for row in &g.rows {
                prop_assert!(ids.insert(row.assignment_id.clone()));
                prop_assert_eq!(row.assigned_at, g.key.assigned_at);
                prop_assert_eq!(&row.office_id, &g.key.office_id);
            }
        }
    }

    #[test]
    fn at_most_one_output_per_group(input in arb_input(), order in arb_order()) {
        let outcome = run(&config_with(order), &input);
        let groups = group_assignments(&input.assignments);
        let summary = &outcome.report.summary;

        prop_assert_eq!(summary.groups, groups.len());
        prop_assert_eq!(summary.assignments_produced + summary.groups_skipped, groups.len());
        prop_assert_eq!(outcome.assignments.len(), summary.assignments_produced);

        // Output ids are the representatives of distinct groups.
        let reps: HashSet<_> = groups.iter().map(|g| g.representative().assignment_id.clone()).collect();
        for a in &outcome.assignments {
            prop_assert!(reps.contains(&a.assignment_id));
        }

        for g in &outcome.report.groups {
            if let GroupDecision::Produced { parcels, .. } = &g.decision {
                prop_assert!(*parcels <= g.rows, "{} parcels for {} rows", parcels, g.rows);
            }
        }
    }

    #[test]
    fn phoned_rider_means_no_skips(input in arb_input(), order in arb_order()) {
        let any_phoned = input
            .users
            .iter()
            .any(|u| u.role == Role::Rider && !u.phone_number.is_empty());
        let outcome = run(&config_with(order), &input);
        if any_phoned {
            prop_assert_eq!(outcome.report.summary.groups_skipped, 0);
        }
        if !input.users.iter().any(|u| u.role == Role::Rider) {
            prop_assert!(outcome.assignments.is_empty());
        }
    }

    #[test]
    fn output_always_validates(input in arb_input(), order in arb_order()) {
        let outcome = run(&config_with(order), &input);
        let report = validate_assignments(&outcome.assignments, 0.01).unwrap();
        prop_assert!(report.passed(), "{:?}", report.errors);
    }

    #[test]
    fn determinism(input in arb_input(), order in arb_order()) {
        let config = config_with(order);
        let first = run(&config, &input);
        let second = run(&config, &input);
        prop_assert_eq!(first.assignments, second.assignments);
        prop_assert_eq!(first.report.summary.resolution_tiers, second.report.summary.resolution_tiers);
    }
}
