//! Post-hoc validation of migrated assignments.
//!
//! Works on raw JSON values rather than [`NormalizedAssignment`] so that a
//! file produced by any tool (or edited by hand) can be checked. Nothing
//! here corrects data; findings are reported for an operator to act on.
//!
//! | Kind                  | Class   | Trigger                                   |
//! |-----------------------|---------|-------------------------------------------|
//! | `not_an_object`       | error   | record is not a JSON object               |
//! | `missing_field`       | error   | required top-level field absent           |
//! | `missing_rider_field` | error   | riderInfo present but incomplete          |
//! | `missing_parcel_field`| error   | parcel entry missing a required field     |
//! | `negative_parcel_amount` | error | parcelAmount < 0                         |
//! | `non_numeric_amount`  | error   | amount or parcelAmount is not a number    |
//! | `amount_mismatch`     | error   | amount differs from parcel sum            |
//! | `duplicate_assignment_id` | error | assignmentId seen more than once        |
//! | `duplicate_parcel_id` | error   | parcelId in more than one assignment      |
//! | `empty_parcels`       | warning | parcels list is empty                     |
//! | `unusual_status`      | warning | status not one of the known values        |
//! | `missing_rider`       | warning | riderInfo null or absent                  |

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::MigrateError;
use crate::model::{AssignmentStatus, NormalizedAssignment};

const REQUIRED_FIELDS: [&str; 5] = ["assignmentId", "riderInfo", "parcels", "amount", "status"];
const REQUIRED_RIDER_FIELDS: [&str; 3] = ["riderId", "riderName", "riderPhoneNumber"];
const REQUIRED_PARCEL_FIELDS: [&str; 4] = ["parcelId", "parcelAmount", "payed", "cancelled"];

// ---------------------------------------------------------------------------
// Findings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    NotAnObject,
    MissingField,
    MissingRiderField,
    MissingParcelField,
    NegativeParcelAmount,
    NonNumericAmount,
    AmountMismatch,
    DuplicateAssignmentId,
    DuplicateParcelId,
    EmptyParcels,
    UnusualStatus,
    MissingRider,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub kind: FindingKind,
    /// Record index in the validated array.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parcel_index: Option<usize>,
    pub message: String,
}

impl Finding {
    fn record(kind: FindingKind, index: usize, message: String) -> Self {
        Self {
            kind,
            index: Some(index),
            parcel_index: None,
            message,
        }
    }

    fn parcel(kind: FindingKind, index: usize, parcel_index: usize, message: String) -> Self {
        Self {
            kind,
            index: Some(index),
            parcel_index: Some(parcel_index),
            message,
        }
    }
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AmountStats {
    pub min: f64,
    pub max: f64,
    pub average: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationStats {
    pub total_assignments: usize,
    pub total_parcels: usize,
    pub total_amount: f64,
    pub by_status: BTreeMap<String, usize>,
    pub by_rider: BTreeMap<String, usize>,
    pub by_office: BTreeMap<String, usize>,
    /// parcels-per-assignment -> number of assignments
    pub parcel_distribution: BTreeMap<usize, usize>,
    /// Over strictly positive amounts only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_stats: Option<AmountStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<Finding>,
    pub warnings: Vec<Finding>,
    pub stats: ValidationStats,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors_of(&self, kind: FindingKind) -> impl Iterator<Item = &Finding> {
        self.errors.iter().filter(move |f| f.kind == kind)
    }

    pub fn warnings_of(&self, kind: FindingKind) -> impl Iterator<Item = &Finding> {
        self.warnings.iter().filter(move |f| f.kind == kind)
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Parse an output file's text and validate it.
pub fn validate_json(text: &str, tolerance: f64) -> Result<ValidationReport, MigrateError> {
    let value: Value = serde_json::from_str(text).map_err(|e| MigrateError::InputParse {
        source: "migrated assignments".into(),
        message: e.to_string(),
    })?;
    match value {
        Value::Array(records) => Ok(validate_records(&records, tolerance)),
        other => Err(MigrateError::InputParse {
            source: "migrated assignments".into(),
            message: format!("expected a JSON array, found {}", kind_name(&other)),
        }),
    }
}

/// Validate typed assignments by checking their serialized form.
pub fn validate_assignments(
    assignments: &[NormalizedAssignment],
    tolerance: f64,
) -> Result<ValidationReport, MigrateError> {
    let records = assignments
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| MigrateError::Serialize(e.to_string()))?;
    Ok(validate_records(&records, tolerance))
}

/// Per-record checks, then cross-record checks, then statistics.
pub fn validate_records(records: &[Value], tolerance: f64) -> ValidationReport {
    let mut report = ValidationReport::default();

    let objects: Vec<(usize, &Map<String, Value>)> = records
        .iter()
        .enumerate()
        .filter_map(|(i, v)| match v.as_object() {
            Some(obj) => Some((i, obj)),
            None => {
                report.errors.push(Finding::record(
                    FindingKind::NotAnObject,
                    i,
                    format!("Assignment {i}: expected an object, found {}", kind_name(v)),
                ));
                None
            }
        })
        .collect();

    for &(index, record) in &objects {
        check_record(index, record, tolerance, &mut report);
    }
    check_integrity(&objects, &mut report);
    report.stats = statistics(&objects);

    tracing::debug!(
        records = records.len(),
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        "validation finished"
    );
    report
}

// ---------------------------------------------------------------------------
// Per-record checks
// ---------------------------------------------------------------------------

fn check_record(index: usize, record: &Map<String, Value>, tolerance: f64, report: &mut ValidationReport) {
    for field in REQUIRED_FIELDS {
        if !record.contains_key(field) {
            report.errors.push(Finding::record(
                FindingKind::MissingField,
                index,
                format!("Assignment {index}: missing required field '{field}'"),
            ));
        }
    }

    if let Some(Value::Object(rider)) = record.get("riderInfo") {
        for field in REQUIRED_RIDER_FIELDS {
            if !rider.contains_key(field) {
                report.errors.push(Finding::record(
                    FindingKind::MissingRiderField,
                    index,
                    format!("Assignment {index}: missing riderInfo field '{field}'"),
                ));
            }
        }
    }

    let parcels = parcel_list(record);
    if record.contains_key("parcels") && parcels.is_empty() {
        let id = record.get("assignmentId").and_then(Value::as_str).unwrap_or("?");
        report.warnings.push(Finding::record(
            FindingKind::EmptyParcels,
            index,
            format!("Assignment {index} ({id}): has no parcels"),
        ));
    }

    for (pi, parcel) in parcels.iter().enumerate() {
        let Some(parcel) = parcel.as_object() else {
            report.errors.push(Finding::parcel(
                FindingKind::MissingParcelField,
                index,
                pi,
                format!("Assignment {index}, parcel {pi}: expected an object"),
            ));
            continue;
        };
        for field in REQUIRED_PARCEL_FIELDS {
            if !parcel.contains_key(field) {
                report.errors.push(Finding::parcel(
                    FindingKind::MissingParcelField,
                    index,
                    pi,
                    format!("Assignment {index}, parcel {pi}: missing field '{field}'"),
                ));
            }
        }
        if parcel.get("parcelAmount").is_some_and(|v| !v.is_number()) {
            report.errors.push(Finding::parcel(
                FindingKind::NonNumericAmount,
                index,
                pi,
                format!("Assignment {index}, parcel {pi}: parcelAmount is not a number"),
            ));
        } else if parcel_amount(parcel) < 0.0 {
            report.errors.push(Finding::parcel(
                FindingKind::NegativeParcelAmount,
                index,
                pi,
                format!("Assignment {index}, parcel {pi}: negative parcel amount"),
            ));
        }
    }

    let amount = record.get("amount");
    if let Some(value) = amount.filter(|v| !v.is_number()) {
        report.errors.push(Finding::record(
            FindingKind::NonNumericAmount,
            index,
            format!("Assignment {index}: amount is not a number ({})", kind_name(value)),
        ));
    }

    // Reported above; not summed as 0.
    let parcel_amounts_numeric = parcels
        .iter()
        .filter_map(Value::as_object)
        .all(|p| p.get("parcelAmount").map_or(true, Value::is_number));

    if record.contains_key("parcels") && parcel_amounts_numeric {
        if let Some(actual) = amount.and_then(Value::as_f64) {
            let expected: f64 = parcels
                .iter()
                .filter_map(Value::as_object)
                .map(parcel_amount)
                .sum();
            if (expected - actual).abs() > tolerance {
                report.errors.push(Finding::record(
                    FindingKind::AmountMismatch,
                    index,
                    format!("Assignment {index}: amount mismatch, expected {expected}, got {actual}"),
                ));
            }
        }
    }

    if let Some(status) = record.get("status") {
        let known = status
            .as_str()
            .is_some_and(|s| AssignmentStatus::KNOWN.iter().any(|k| *k == s));
        if !known {
            report.warnings.push(Finding::record(
                FindingKind::UnusualStatus,
                index,
                format!("Assignment {index}: unusual status {status}"),
            ));
        }
    }
}

// ---------------------------------------------------------------------------
// Cross-record checks
// ---------------------------------------------------------------------------

fn check_integrity(objects: &[(usize, &Map<String, Value>)], report: &mut ValidationReport) {
    // id -> indices, first-seen order
    let mut assignment_ids: IndexMap<String, Vec<usize>> = IndexMap::new();
    let mut parcel_ids: IndexMap<String, Vec<usize>> = IndexMap::new();

    for &(index, record) in objects {
        if let Some(id) = record.get("assignmentId").filter(|v| !v.is_null()) {
            assignment_ids.entry(id_text(id)).or_default().push(index);
        }
        for parcel in parcel_list(record).iter().filter_map(Value::as_object) {
            if let Some(id) = parcel.get("parcelId").filter(|v| !v.is_null()) {
                parcel_ids.entry(id_text(id)).or_default().push(index);
            }
        }
    }

    for (id, indices) in assignment_ids.iter().filter(|(_, ix)| ix.len() > 1) {
        report.errors.push(Finding::record(
            FindingKind::DuplicateAssignmentId,
            indices[1],
            format!("Duplicate assignment id '{id}' at records {indices:?}"),
        ));
    }
    for (id, indices) in parcel_ids.iter().filter(|(_, ix)| ix.len() > 1) {
        report.errors.push(Finding::record(
            FindingKind::DuplicateParcelId,
            indices[1],
            format!("Parcel '{id}' assigned {} times, records {indices:?}", indices.len()),
        ));
    }

    for &(index, record) in objects {
        if !has_rider(record) {
            report.warnings.push(Finding::record(
                FindingKind::MissingRider,
                index,
                format!("Assignment {index}: no rider info"),
            ));
        }
    }
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

fn statistics(objects: &[(usize, &Map<String, Value>)]) -> ValidationStats {
    let mut stats = ValidationStats {
        total_assignments: objects.len(),
        ..ValidationStats::default()
    };
    let mut positive: Vec<f64> = Vec::new();

    for &(_, record) in objects {
        let parcel_count = parcel_list(record).len();
        let amount = record.get("amount").and_then(Value::as_f64).unwrap_or(0.0);

        stats.total_parcels += parcel_count;
        stats.total_amount += amount;
        *stats.parcel_distribution.entry(parcel_count).or_insert(0) += 1;

        let status = match record.get("status") {
            Some(Value::String(s)) => s.clone(),
            _ => "None".to_string(),
        };
        *stats.by_status.entry(status).or_insert(0) += 1;

        let office = match record.get("officeId") {
            Some(Value::String(s)) => s.clone(),
            _ => "None".to_string(),
        };
        *stats.by_office.entry(office).or_insert(0) += 1;

        if let Some(name) = record
            .get("riderInfo")
            .and_then(|r| r.get("riderName"))
            .and_then(Value::as_str)
        {
            *stats.by_rider.entry(name.to_string()).or_insert(0) += 1;
        }

        if amount > 0.0 {
            positive.push(amount);
        }
    }

    if !positive.is_empty() {
        let min = positive.iter().copied().fold(f64::INFINITY, f64::min);
        let max = positive.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let average = positive.iter().sum::<f64>() / positive.len() as f64;
        stats.amount_stats = Some(AmountStats { min, max, average });
    }

    stats
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parcel_list(record: &Map<String, Value>) -> &[Value] {
    record
        .get("parcels")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn parcel_amount(parcel: &Map<String, Value>) -> f64 {
    parcel.get("parcelAmount").and_then(Value::as_f64).unwrap_or(0.0)
}

fn has_rider(record: &Map<String, Value>) -> bool {
    match record.get("riderInfo") {
        None | Some(Value::Null) => false,
        Some(Value::Object(o)) => !o.is_empty(),
        Some(_) => true,
    }
}

fn id_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
