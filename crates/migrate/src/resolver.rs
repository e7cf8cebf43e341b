//! Driver identity resolution.
//!
//! Parcels reference their rider only through `driverPhoneNumber`, which
//! rarely matches a user's `phoneNumber` exactly (country-code prefixes
//! come and go). The resolver walks progressively weaker tiers until one
//! yields a rider:
//!
//! | Tier        | Rule                                                    |
//! |-------------|---------------------------------------------------------|
//! | `exact`     | driver phone is a key of the rider lookup               |
//! | `substring` | first rider whose phone contains, or is contained in, it|
//! | `frequency` | precomputed phone → primary office → first office rider |
//! | `office`    | first rider registered at the group's office            |
//! | `any_rider` | first rider in the lookup                               |
//!
//! The relative order of the three phone tiers follows
//! [`ResolutionOrder`]; `exact` always precedes `substring`. Resolution
//! fails only when every tier comes up empty.

use indexmap::IndexMap;

use crate::config::ResolutionOrder;
use crate::lookup::{build_rider_lookup, RiderLookup};
use crate::model::{RawParcel, RawUser, Resolution, ResolutionTier, RiderInfo};

/// Driver phone → inferred rider.
pub type DriverMapping = IndexMap<String, RiderInfo>;

#[derive(Debug, Clone)]
struct RosterEntry {
    office_id: String,
    rider: RiderInfo,
}

#[derive(Debug, Clone)]
pub struct DriverResolver {
    lookup: RiderLookup,
    roster: Vec<RosterEntry>,
    mapping: DriverMapping,
    order: ResolutionOrder,
}

impl DriverResolver {
    pub fn new(users: &[RawUser], parcels: &[RawParcel], order: ResolutionOrder) -> Self {
        let roster = users
            .iter()
            .filter(|u| u.role.is_rider())
            .map(|u| RosterEntry {
                office_id: u.office_id.clone(),
                rider: RiderInfo::from_user(u),
            })
            .collect();

        Self {
            lookup: build_rider_lookup(users),
            roster,
            mapping: build_driver_mapping(parcels, users),
            order,
        }
    }

    pub fn lookup(&self) -> &RiderLookup {
        &self.lookup
    }

    pub fn mapping(&self) -> &DriverMapping {
        &self.mapping
    }

    /// Resolve a rider for a group. `driver_phone` is the group's
    /// representative phone, if any parcel carried one.
    pub fn resolve(&self, driver_phone: Option<&str>, office_id: &str) -> Option<Resolution> {
        let phone = driver_phone.map(str::trim).filter(|p| !p.is_empty());

        let resolution = phone
            .and_then(|p| self.resolve_by_phone(p))
            .or_else(|| self.resolve_by_office(office_id))
            .or_else(|| self.any_rider())?;

        if resolution.tier.is_degraded() {
            tracing::warn!(
                driver_phone = phone.unwrap_or(""),
                office_id,
                tier = %resolution.tier,
                rider = %resolution.rider.rider_name,
                "rider resolved below exact match"
            );
        }
        Some(resolution)
    }

    fn resolve_by_phone(&self, phone: &str) -> Option<Resolution> {
        match self.order {
            ResolutionOrder::FrequencyFirst => self
                .frequency_match(phone)
                .or_else(|| find_rider_by_phone(phone, &self.lookup)),
            ResolutionOrder::DirectFirst => find_rider_by_phone(phone, &self.lookup)
                .or_else(|| self.frequency_match(phone)),
        }
    }

    fn frequency_match(&self, phone: &str) -> Option<Resolution> {
        let rider = self.mapping.get(phone)?;
        let tier = if rider.rider_phone_number == phone {
            ResolutionTier::Exact
        } else {
            ResolutionTier::Frequency
        };
        Some(Resolution {
            rider: rider.clone(),
            tier,
        })
    }

    fn resolve_by_office(&self, office_id: &str) -> Option<Resolution> {
        if office_id.is_empty() {
            return None;
        }
        self.roster
            .iter()
            .find(|entry| entry.office_id == office_id)
            .map(|entry| Resolution {
                rider: entry.rider.clone(),
                tier: ResolutionTier::Office,
            })
    }

    fn any_rider(&self) -> Option<Resolution> {
        self.lookup.first().map(|(_, rider)| Resolution {
            rider: rider.clone(),
            tier: ResolutionTier::AnyRider,
        })
    }
}

/// Exact lookup, then the first rider whose phone is a substring of the
/// driver phone or vice versa. No similarity ranking.
pub fn find_rider_by_phone(driver_phone: &str, lookup: &RiderLookup) -> Option<Resolution> {
    let phone = driver_phone.trim();
    if phone.is_empty() {
        return None;
    }

    if let Some(rider) = lookup.get(phone) {
        return Some(Resolution {
            rider: rider.clone(),
            tier: ResolutionTier::Exact,
        });
    }

    lookup
        .iter()
        .find(|(rider_phone, _)| phone.contains(rider_phone.as_str()) || rider_phone.contains(phone))
        .map(|(_, rider)| Resolution {
            rider: rider.clone(),
            tier: ResolutionTier::Substring,
        })
}

/// Bind each driver phone seen on assigned parcels to the first rider of
/// the office where that phone appears most often. Ties go to the office
/// seen first.
pub fn build_driver_mapping(parcels: &[RawParcel], users: &[RawUser]) -> DriverMapping {
    let mut riders_by_office: IndexMap<&str, Vec<&RawUser>> = IndexMap::new();
    for user in users.iter().filter(|u| u.role.is_rider()) {
        riders_by_office.entry(user.office_id.as_str()).or_default().push(user);
    }

    let mut counts: IndexMap<&str, IndexMap<&str, usize>> = IndexMap::new();
    for parcel in parcels {
        let Some(office) = parcel.office_id.as_deref().filter(|o| !o.is_empty()) else {
            continue;
        };
        if !parcel.parcel_assigned || parcel.driver_phone_number.is_empty() {
            continue;
        }
        *counts
            .entry(parcel.driver_phone_number.as_str())
            .or_default()
            .entry(office)
            .or_insert(0) += 1;
    }

    let mut mapping = DriverMapping::new();
    for (phone, office_counts) in &counts {
        let Some(primary_office) = primary_office(office_counts) else {
            continue;
        };
        if let Some(rider) = riders_by_office.get(primary_office).and_then(|r| r.first()) {
            tracing::debug!(driver_phone = phone, office_id = primary_office, rider = %rider.name, "driver mapped");
            mapping.insert((*phone).to_string(), RiderInfo::from_user(rider));
        }
    }
    mapping
}

fn primary_office<'a>(office_counts: &IndexMap<&'a str, usize>) -> Option<&'a str> {
    let mut best: Option<(&'a str, usize)> = None;
    for (&office, &count) in office_counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((office, count));
        }
    }
    best.map(|(office, _)| office)
}
