use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ResolutionOrder;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Rider,
    Other(String),
}

impl Role {
    pub fn parse(raw: &str) -> Self {
        if raw == "RIDER" {
            Self::Rider
        } else {
            Self::Other(raw.to_string())
        }
    }

    pub fn is_rider(&self) -> bool {
        matches!(self, Self::Rider)
    }
}

/// Assignment lifecycle status. Unknown values survive a round-trip
/// verbatim so the validator can flag them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AssignmentStatus {
    Pending,
    Assigned,
    Accepted,
    Delivered,
    Completed,
    Cancelled,
    Other(String),
}

impl AssignmentStatus {
    pub const KNOWN: [&'static str; 6] = [
        "PENDING",
        "ASSIGNED",
        "ACCEPTED",
        "DELIVERED",
        "COMPLETED",
        "CANCELLED",
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "PENDING",
            Self::Assigned => "ASSIGNED",
            Self::Accepted => "ACCEPTED",
            Self::Delivered => "DELIVERED",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
            Self::Other(s) => s,
        }
    }

    /// Still with the rider: parcels should be undelivered.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::Assigned | Self::Accepted)
    }

    /// Finished: parcels should be delivered.
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Delivered | Self::Completed)
    }
}

impl From<String> for AssignmentStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "PENDING" => Self::Pending,
            "ASSIGNED" => Self::Assigned,
            "ACCEPTED" => Self::Accepted,
            "DELIVERED" => Self::Delivered,
            "COMPLETED" => Self::Completed,
            "CANCELLED" => Self::Cancelled,
            _ => Self::Other(s),
        }
    }
}

impl From<AssignmentStatus> for String {
    fn from(status: AssignmentStatus) -> Self {
        match status {
            AssignmentStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Legacy `assignedAt` value. Integral numbers compare as integers, so
/// `1000` and `1000.0` are the same instant; any other value keeps its exact
/// float bits and only equals itself.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timestamp {
    Integral(i64),
    /// Bit pattern of a finite, non-integral `f64`.
    Fractional(u64),
}

impl Timestamp {
    /// `None` for NaN and infinities.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        // i64::MAX as f64 rounds up to 2^63, hence the strict bound.
        if value.fract() == 0.0 && value >= i64::MIN as f64 && value < i64::MAX as f64 {
            Some(Self::Integral(value as i64))
        } else {
            Some(Self::Fractional(value.to_bits()))
        }
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::Integral(n) => n as f64,
            Self::Fractional(bits) => f64::from_bits(bits),
        }
    }
}

impl From<i64> for Timestamp {
    fn from(n: i64) -> Self {
        Self::Integral(n)
    }
}

impl std::fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integral(n) => f.debug_tuple("Integral").field(n).finish(),
            Self::Fractional(_) => f.debug_tuple("Fractional").field(&self.as_f64()).finish(),
        }
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integral(n) => write!(f, "{n}"),
            Self::Fractional(_) => write!(f, "{}", self.as_f64()),
        }
    }
}

impl Serialize for Timestamp {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            Self::Integral(n) => serializer.serialize_i64(n),
            Self::Fractional(_) => serializer.serialize_f64(self.as_f64()),
        }
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let n = serde_json::Number::deserialize(deserializer)?;
        match n.as_i64() {
            Some(i) => Ok(Self::Integral(i)),
            None => n
                .as_f64()
                .and_then(Self::from_f64)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp {n}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct RawUser {
    pub role: Role,
    pub user_id: String,
    pub name: String,
    /// Trimmed; empty when absent.
    pub phone_number: String,
    pub office_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawParcel {
    pub parcel_id: String,
    /// `None` when the export omits it; such a parcel belongs to no office,
    /// not even the empty one.
    pub office_id: Option<String>,
    /// Trimmed; a weak, often inconsistently formatted rider reference.
    pub driver_phone_number: String,
    pub parcel_assigned: bool,
    pub delivered: bool,
    pub delivery_cost: f64,
    pub parcel_description: String,
    pub receiver_name: String,
    pub receiver_phone_number: String,
    pub receiver_address: String,
    pub sender_name: String,
    pub sender_phone_number: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawAssignment {
    pub assignment_id: String,
    pub office_id: String,
    pub assigned_at: Option<Timestamp>,
    pub status: Option<AssignmentStatus>,
    pub accepted_at: i64,
    pub completed_at: i64,
    pub confirmation_code: Option<String>,
    pub payed: bool,
    pub payement_method: Option<String>,
    pub cancelation_reason: Option<Value>,
    pub created_at: Option<Value>,
    pub updated_at: Option<Value>,
}

/// Pre-loaded legacy collections, in export order.
#[derive(Debug, Clone, Default)]
pub struct MigrationInput {
    pub assignments: Vec<RawAssignment>,
    pub parcels: Vec<RawParcel>,
    pub users: Vec<RawUser>,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiderInfo {
    pub rider_id: String,
    pub rider_name: String,
    pub rider_phone_number: String,
}

impl RawParcel {
    pub fn in_office(&self, office_id: &str) -> bool {
        self.office_id.as_deref() == Some(office_id)
    }
}

impl RiderInfo {
    pub fn from_user(user: &RawUser) -> Self {
        Self {
            rider_id: user.user_id.clone(),
            rider_name: user.name.clone(),
            rider_phone_number: user.phone_number.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParcelInfo {
    pub parcel_id: String,
    pub parcel_description: String,
    pub receiver_name: String,
    pub receiver_phone_number: String,
    pub receiver_address: String,
    pub sender_name: String,
    pub sender_phone_number: String,
    pub parcel_amount: f64,
    pub payed: bool,
    pub cancelled: bool,
}

impl ParcelInfo {
    pub fn from_parcel(parcel: &RawParcel) -> Self {
        Self {
            parcel_id: parcel.parcel_id.clone(),
            parcel_description: parcel.parcel_description.clone(),
            receiver_name: parcel.receiver_name.clone(),
            receiver_phone_number: parcel.receiver_phone_number.clone(),
            receiver_address: parcel.receiver_address.clone(),
            sender_name: parcel.sender_name.clone(),
            sender_phone_number: parcel.sender_phone_number.clone(),
            parcel_amount: parcel.delivery_cost,
            payed: false,
            cancelled: false,
        }
    }
}

/// One consolidated assignment in the new schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedAssignment {
    pub assignment_id: String,
    pub rider_info: Option<RiderInfo>,
    pub parcels: Vec<ParcelInfo>,
    pub amount: f64,
    pub status: Option<AssignmentStatus>,
    pub office_id: String,
    pub assigned_at: Option<Timestamp>,
    pub accepted_at: i64,
    pub completed_at: i64,
    pub confirmation_code: Option<String>,
    pub payed: bool,
    pub payement_method: Option<String>,
    pub cancelation_reason: Option<Value>,
    pub created_at: Option<Value>,
    pub updated_at: Option<Value>,
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Which resolver tier produced a rider, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionTier {
    Exact,
    Substring,
    Frequency,
    Office,
    AnyRider,
}

impl ResolutionTier {
    pub fn is_degraded(&self) -> bool {
        !matches!(self, Self::Exact)
    }
}

impl std::fmt::Display for ResolutionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Substring => write!(f, "substring"),
            Self::Frequency => write!(f, "frequency"),
            Self::Office => write!(f, "office"),
            Self::AnyRider => write!(f, "any_rider"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub rider: RiderInfo,
    pub tier: ResolutionTier,
}

// ---------------------------------------------------------------------------
// Run report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "decision")]
pub enum GroupDecision {
    Produced {
        assignment_id: String,
        rider_id: String,
        tier: ResolutionTier,
        parcels: usize,
        amount: f64,
        used_fallback: bool,
    },
    Skipped {
        reason: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupOutcome {
    pub assigned_at: Option<Timestamp>,
    pub office_id: String,
    pub rows: usize,
    #[serde(flatten)]
    pub decision: GroupDecision,
}

#[derive(Debug, Clone, Serialize)]
pub struct DriverMappingEntry {
    pub driver_phone: String,
    pub rider: RiderInfo,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationSummary {
    pub input_assignments: usize,
    pub input_parcels: usize,
    pub input_users: usize,
    pub riders_indexed: usize,
    pub parcels_indexed: usize,
    pub driver_mappings: usize,
    pub groups: usize,
    pub assignments_produced: usize,
    pub groups_skipped: usize,
    pub groups_without_parcels: usize,
    pub fallback_allocations: usize,
    pub parcels_allocated: usize,
    pub total_amount: f64,
    pub resolution_tiers: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MigrationMeta {
    pub engine_version: String,
    pub run_at: String,
    pub resolution_order: ResolutionOrder,
}

#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub meta: MigrationMeta,
    pub summary: MigrationSummary,
    pub mappings: Vec<DriverMappingEntry>,
    pub groups: Vec<GroupOutcome>,
}

#[derive(Debug, Clone)]
pub struct MigrationOutcome {
    pub assignments: Vec<NormalizedAssignment>,
    pub report: MigrationReport,
}
