//! Human-readable stderr output. Advisory only; scripts should use `--json`.

use std::collections::BTreeMap;

use shortly_migrate::model::MigrationSummary;
use shortly_migrate::ValidationReport;

/// Counts sorted by descending count, ties by key.
fn by_count<K: std::fmt::Display>(counts: &BTreeMap<K, usize>) -> Vec<(String, usize)> {
    let mut rows: Vec<(String, usize)> = counts.iter().map(|(k, v)| (k.to_string(), *v)).collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    rows
}

pub fn print_migration_summary(summary: &MigrationSummary, output: &str) {
    eprintln!(
        "migrated {} assignment rows into {} assignments ({} groups, {} skipped)",
        summary.input_assignments, summary.assignments_produced, summary.groups, summary.groups_skipped,
    );
    eprintln!(
        "parcels: {} allocated of {}, {} via fallback in {} groups; total amount GHS {:.2}",
        summary.parcels_allocated,
        summary.input_parcels,
        summary.fallback_allocations,
        summary.groups_without_parcels,
        summary.total_amount,
    );
    if !summary.resolution_tiers.is_empty() {
        let tiers: Vec<String> = by_count(&summary.resolution_tiers)
            .into_iter()
            .map(|(tier, n)| format!("{tier}={n}"))
            .collect();
        eprintln!("rider resolution: {}", tiers.join(", "));
    }
    eprintln!("wrote {output}");
}

pub fn print_validation(report: &ValidationReport) {
    if report.errors.is_empty() {
        eprintln!("validation: no errors");
    } else {
        eprintln!("validation: {} errors", report.errors.len());
        for finding in &report.errors {
            eprintln!("  - {finding}");
        }
    }
    if !report.warnings.is_empty() {
        eprintln!("warnings: {}", report.warnings.len());
        for finding in &report.warnings {
            eprintln!("  - {finding}");
        }
    }
}

pub fn print_statistics(report: &ValidationReport) {
    let s = &report.stats;
    eprintln!(
        "{} assignments, {} parcels, total amount GHS {:.2}",
        s.total_assignments, s.total_parcels, s.total_amount,
    );

    for (title, counts) in [("by status", &s.by_status), ("by rider", &s.by_rider), ("by office", &s.by_office)] {
        if counts.is_empty() {
            continue;
        }
        eprintln!("{title}:");
        for (key, n) in by_count(counts) {
            eprintln!("  {key}: {n}");
        }
    }

    if !s.parcel_distribution.is_empty() {
        eprintln!("parcel distribution:");
        for (parcels, assignments) in &s.parcel_distribution {
            eprintln!("  {parcels} parcels: {assignments} assignments");
        }
    }

    if let Some(amounts) = &s.amount_stats {
        eprintln!(
            "amounts: min GHS {:.2}, max GHS {:.2}, average GHS {:.2}",
            amounts.min, amounts.max, amounts.average,
        );
    }

    if report.passed() {
        eprintln!("VALIDATION PASSED");
    } else {
        eprintln!("VALIDATION FAILED");
    }
}
