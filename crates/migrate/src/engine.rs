use std::collections::BTreeMap;

use crate::associate::{associate_parcels, fallback_parcels, AllocationLedger};
use crate::config::{HeuristicsConfig, MigrateConfig};
use crate::group::{group_assignments, AssignmentGroup};
use crate::lookup::build_parcel_lookup;
use crate::model::{
    DriverMappingEntry, GroupDecision, GroupOutcome, MigrationInput, MigrationMeta, MigrationOutcome,
    MigrationReport, MigrationSummary, NormalizedAssignment, ParcelInfo, RawParcel, Resolution,
};
use crate::resolver::DriverResolver;

/// Per-run state: the resolver with its precomputed driver mapping, and
/// the ledger of claimed parcels. One context per run; never shared.
#[derive(Debug)]
pub struct MigrationContext {
    resolver: DriverResolver,
    ledger: AllocationLedger,
    heuristics: HeuristicsConfig,
}

/// Result of consolidating one group.
#[derive(Debug, Clone)]
pub enum Consolidated {
    Produced {
        assignment: NormalizedAssignment,
        resolution: Resolution,
        used_fallback: bool,
        claimed_in_main_pass: bool,
    },
    Skipped {
        reason: String,
    },
}

impl MigrationContext {
    pub fn new(input: &MigrationInput, heuristics: &HeuristicsConfig) -> Self {
        Self {
            resolver: DriverResolver::new(
                &input.users,
                &input.parcels,
                heuristics.resolution_order,
            ),
            ledger: AllocationLedger::new(),
            heuristics: heuristics.clone(),
        }
    }

    pub fn resolver(&self) -> &DriverResolver {
        &self.resolver
    }

    pub fn ledger(&self) -> &AllocationLedger {
        &self.ledger
    }

    /// Turn one group into at most one normalized assignment.
    pub fn consolidate(&mut self, group: &AssignmentGroup<'_>, parcels: &[RawParcel]) -> Consolidated {
        let office_id = group.key.office_id.as_str();
        let association = associate_parcels(group, parcels, &mut self.ledger);

        let Some(resolution) = self.resolver.resolve(association.driver_phone, office_id) else {
            tracing::warn!(
                assigned_at = ?group.key.assigned_at,
                office_id,
                driver_phone = association.driver_phone.unwrap_or(""),
                "skipping group: no riders available"
            );
            return Consolidated::Skipped {
                reason: "no riders available".into(),
            };
        };

        let claimed_in_main_pass = !association.parcels.is_empty();
        let mut claimed = association.parcels;
        let mut used_fallback = false;
        if !claimed_in_main_pass {
            tracing::warn!(assigned_at = ?group.key.assigned_at, office_id, "no parcels found for group");
            claimed = fallback_parcels(group, parcels, &mut self.ledger, self.heuristics.fallback_batch_limit);
            if !claimed.is_empty() {
                used_fallback = true;
                tracing::warn!(
                    assigned_at = ?group.key.assigned_at,
                    office_id,
                    parcels = claimed.len(),
                    "fallback allocation of unclaimed parcels"
                );
            }
        }

        let assignment = build_assignment(group, &resolution, &claimed);
        tracing::info!(
            assignment_id = %assignment.assignment_id,
            rider = %resolution.rider.rider_name,
            tier = %resolution.tier,
            parcels = assignment.parcels.len(),
            amount = assignment.amount,
            "assignment consolidated"
        );

        Consolidated::Produced {
            assignment,
            resolution,
            used_fallback,
            claimed_in_main_pass,
        }
    }
}

/// Project a group, its rider and its claimed parcels into the new schema.
/// `amount` is summed from the raw parcels' delivery cost.
pub fn build_assignment(
    group: &AssignmentGroup<'_>,
    resolution: &Resolution,
    claimed: &[&RawParcel],
) -> NormalizedAssignment {
    let rep = group.representative();
    let parcels: Vec<ParcelInfo> = claimed.iter().map(|p| ParcelInfo::from_parcel(p)).collect();
    let amount: f64 = claimed.iter().map(|p| p.delivery_cost).sum();

    NormalizedAssignment {
        assignment_id: rep.assignment_id.clone(),
        rider_info: Some(resolution.rider.clone()),
        parcels,
        amount,
        status: rep.status.clone(),
        office_id: group.key.office_id.clone(),
        assigned_at: group.key.assigned_at,
        accepted_at: rep.accepted_at,
        completed_at: rep.completed_at,
        confirmation_code: rep.confirmation_code.clone(),
        payed: rep.payed,
        payement_method: rep.payement_method.clone(),
        cancelation_reason: rep.cancelation_reason.clone(),
        created_at: rep.created_at.clone(),
        updated_at: rep.updated_at.clone(),
    }
}

/// Run the migration. Per-record anomalies degrade to defaults, fallbacks
/// or skipped groups; nothing here fails.
pub fn run(config: &MigrateConfig, input: &MigrationInput) -> MigrationOutcome {
    let mut ctx = MigrationContext::new(input, &config.heuristics);
    let parcel_lookup = build_parcel_lookup(&input.parcels);

    tracing::info!(
        riders = ctx.resolver().lookup().len(),
        parcels = parcel_lookup.len(),
        driver_mappings = ctx.resolver().mapping().len(),
        assignments = input.assignments.len(),
        "lookups built"
    );

    let mappings: Vec<DriverMappingEntry> = ctx
        .resolver()
        .mapping()
        .iter()
        .map(|(phone, rider)| DriverMappingEntry {
            driver_phone: phone.clone(),
            rider: rider.clone(),
        })
        .collect();

    let groups = group_assignments(&input.assignments);
    tracing::info!(groups = groups.len(), "assignments grouped");

    let mut summary = MigrationSummary {
        input_assignments: input.assignments.len(),
        input_parcels: input.parcels.len(),
        input_users: input.users.len(),
        riders_indexed: ctx.resolver().lookup().len(),
        parcels_indexed: parcel_lookup.len(),
        driver_mappings: mappings.len(),
        groups: groups.len(),
        ..MigrationSummary::default()
    };
    let mut tiers: BTreeMap<String, usize> = BTreeMap::new();
    let mut assignments = Vec::new();
    let mut outcomes = Vec::with_capacity(groups.len());

    for group in &groups {
        tracing::debug!(
            assigned_at = ?group.key.assigned_at,
            office_id = %group.key.office_id,
            rows = group.len(),
            "processing group"
        );

        let decision = match ctx.consolidate(group, &input.parcels) {
            Consolidated::Produced {
                assignment,
                resolution,
                used_fallback,
                claimed_in_main_pass,
            } => {
                *tiers.entry(resolution.tier.to_string()).or_insert(0) += 1;
                if !claimed_in_main_pass {
                    summary.groups_without_parcels += 1;
                }
                if used_fallback {
                    summary.fallback_allocations += 1;
                }
                summary.parcels_allocated += assignment.parcels.len();
                summary.total_amount += assignment.amount;

                let decision = GroupDecision::Produced {
                    assignment_id: assignment.assignment_id.clone(),
                    rider_id: resolution.rider.rider_id.clone(),
                    tier: resolution.tier,
                    parcels: assignment.parcels.len(),
                    amount: assignment.amount,
                    used_fallback,
                };
                assignments.push(assignment);
                decision
            }
            Consolidated::Skipped { reason } => {
                summary.groups_skipped += 1;
                GroupDecision::Skipped { reason }
            }
        };

        outcomes.push(GroupOutcome {
            assigned_at: group.key.assigned_at,
            office_id: group.key.office_id.clone(),
            rows: group.len(),
            decision,
        });
    }

    summary.assignments_produced = assignments.len();
    summary.resolution_tiers = tiers;

    tracing::info!(
        assignments = summary.assignments_produced,
        skipped = summary.groups_skipped,
        parcels = summary.parcels_allocated,
        total_amount = summary.total_amount,
        "migration complete"
    );

    MigrationOutcome {
        assignments,
        report: MigrationReport {
            meta: MigrationMeta {
                engine_version: env!("CARGO_PKG_VERSION").to_string(),
                run_at: chrono::Utc::now().to_rfc3339(),
                resolution_order: config.heuristics.resolution_order,
            },
            summary,
            mappings,
            groups: outcomes,
        },
    }
}
