//! Parcel ↔ assignment association.
//!
//! Legacy assignment rows do not say which parcels they carried. A group
//! claims parcels from its own office that were flagged as assigned,
//! filtered by whether the delivery state agrees with the row status,
//! and capped at one parcel per legacy row. Claimed parcels go into the
//! [`AllocationLedger`] and are invisible to every later group.

use std::collections::HashSet;

use crate::group::AssignmentGroup;
use crate::model::{AssignmentStatus, RawParcel};

/// Parcel ids already claimed during this run.
#[derive(Debug, Clone, Default)]
pub struct AllocationLedger {
    processed: HashSet<String>,
}

impl AllocationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_allocated(&self, parcel_id: &str) -> bool {
        self.processed.contains(parcel_id)
    }

    fn allocate(&mut self, parcel_id: &str) {
        self.processed.insert(parcel_id.to_string());
    }

    pub fn len(&self) -> usize {
        self.processed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processed.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Association<'a> {
    /// Claimed parcels in discovery order.
    pub parcels: Vec<&'a RawParcel>,
    /// First non-empty driver phone among the group's candidates.
    pub driver_phone: Option<&'a str>,
}

/// Delivery state must agree with the owning row's status.
pub fn is_eligible(parcel: &RawParcel, status: Option<&AssignmentStatus>) -> bool {
    match status {
        Some(s) if parcel.delivered => s.is_finished(),
        Some(s) => s.is_open(),
        None => false,
    }
}

/// Main association pass for one group.
pub fn associate_parcels<'a>(
    group: &AssignmentGroup<'_>,
    parcels: &'a [RawParcel],
    ledger: &mut AllocationLedger,
) -> Association<'a> {
    let office_id = group.key.office_id.as_str();
    let cap = group.len();
    let mut association = Association::default();

    for row in &group.rows {
        // Candidate set is fixed at the start of each row's scan.
        let candidates: Vec<&RawParcel> = parcels
            .iter()
            .filter(|p| p.in_office(office_id) && p.parcel_assigned)
            .filter(|p| !ledger.is_allocated(&p.parcel_id))
            .collect();

        for parcel in candidates {
            if association.driver_phone.is_none() && !parcel.driver_phone_number.is_empty() {
                association.driver_phone = Some(parcel.driver_phone_number.as_str());
            }

            if ledger.is_allocated(&parcel.parcel_id) {
                continue;
            }
            if is_eligible(parcel, row.status.as_ref()) && association.parcels.len() < cap {
                ledger.allocate(&parcel.parcel_id);
                association.parcels.push(parcel);
            }
        }
    }

    association
}

/// Last-resort allocation for a group that claimed nothing: undelivered,
/// unclaimed parcels from the same office, but only when the pool is
/// small enough (`batch_limit`) that the guess is not a wild one.
pub fn fallback_parcels<'a>(
    group: &AssignmentGroup<'_>,
    parcels: &'a [RawParcel],
    ledger: &mut AllocationLedger,
    batch_limit: usize,
) -> Vec<&'a RawParcel> {
    let office_id = group.key.office_id.as_str();
    let pool: Vec<&RawParcel> = parcels
        .iter()
        .filter(|p| p.in_office(office_id) && !p.delivered)
        .filter(|p| !ledger.is_allocated(&p.parcel_id))
        .collect();

    if pool.is_empty() || pool.len() > batch_limit {
        return Vec::new();
    }

    let taken: Vec<&RawParcel> = pool.into_iter().take(group.len()).collect();
    for parcel in &taken {
        ledger.allocate(&parcel.parcel_id);
    }
    taken
}
