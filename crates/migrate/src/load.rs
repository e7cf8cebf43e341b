//! JSON → typed raw records.
//!
//! Legacy exports are loosely typed: fields go missing, numbers arrive as
//! strings, and Mongo extended JSON (`{"$numberLong": "..."}`) shows up
//! where a plain number was expected. Every accessor here degrades to a
//! named default instead of failing; only a document that is not an array
//! is rejected.

use serde_json::{Map, Value};

use crate::error::MigrateError;
use crate::model::{AssignmentStatus, MigrationInput, RawAssignment, RawParcel, RawUser, Role, Timestamp};

type Record = Map<String, Value>;

// ---------------------------------------------------------------------------
// Document level
// ---------------------------------------------------------------------------

/// Parse a JSON array of objects. Non-object elements are skipped.
pub fn parse_records(source: &str, text: &str) -> Result<Vec<Record>, MigrateError> {
    let value: Value = serde_json::from_str(text).map_err(|e| MigrateError::InputParse {
        source: source.into(),
        message: e.to_string(),
    })?;

    let Value::Array(items) = value else {
        return Err(MigrateError::InputParse {
            source: source.into(),
            message: "expected a JSON array of records".into(),
        });
    };

    let mut records = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        match item {
            Value::Object(obj) => records.push(obj),
            other => {
                tracing::warn!(source, index = i, kind = json_kind(&other), "skipping non-object record");
            }
        }
    }
    Ok(records)
}

pub fn parse_users(text: &str) -> Result<Vec<RawUser>, MigrateError> {
    Ok(parse_records("users", text)?.iter().map(RawUser::from_json).collect())
}

pub fn parse_parcels(text: &str) -> Result<Vec<RawParcel>, MigrateError> {
    Ok(parse_records("parcels", text)?.iter().map(RawParcel::from_json).collect())
}

pub fn parse_assignments(text: &str) -> Result<Vec<RawAssignment>, MigrateError> {
    Ok(parse_records("assignments", text)?
        .iter()
        .map(RawAssignment::from_json)
        .collect())
}

impl MigrationInput {
    pub fn from_json(assignments: &str, parcels: &str, users: &str) -> Result<Self, MigrateError> {
        Ok(Self {
            assignments: parse_assignments(assignments)?,
            parcels: parse_parcels(parcels)?,
            users: parse_users(users)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Record level
// ---------------------------------------------------------------------------

impl RawUser {
    pub fn from_json(obj: &Record) -> Self {
        Self {
            role: Role::parse(&str_field(obj, "role")),
            user_id: str_field(obj, "userId"),
            name: str_field(obj, "name"),
            phone_number: str_field(obj, "phoneNumber").trim().to_string(),
            office_id: str_field(obj, "officeId"),
        }
    }
}

impl RawParcel {
    pub fn from_json(obj: &Record) -> Self {
        Self {
            parcel_id: str_field(obj, "parcelId"),
            office_id: opt_str_field(obj, "officeId"),
            driver_phone_number: str_field(obj, "driverPhoneNumber").trim().to_string(),
            parcel_assigned: bool_field(obj, "parcelAssigned"),
            delivered: bool_field(obj, "delivered"),
            delivery_cost: f64_field(obj, "deliveryCost"),
            parcel_description: str_field(obj, "parcelDescription"),
            receiver_name: str_field(obj, "receiverName"),
            // Legacy exports misspell the key.
            receiver_phone_number: str_field(obj, "recieverPhoneNumber"),
            receiver_address: str_field(obj, "receiverAddress"),
            sender_name: str_field(obj, "senderName"),
            sender_phone_number: str_field(obj, "senderPhoneNumber"),
        }
    }
}

impl RawAssignment {
    pub fn from_json(obj: &Record) -> Self {
        Self {
            assignment_id: str_field(obj, "assignmentId"),
            office_id: str_field(obj, "officeId"),
            assigned_at: timestamp_field(obj, "assignedAt"),
            status: opt_str_field(obj, "status").map(AssignmentStatus::from),
            accepted_at: i64_field(obj, "acceptedAt").unwrap_or(0),
            completed_at: i64_field(obj, "completedAt").unwrap_or(0),
            confirmation_code: opt_str_field(obj, "confirmationCode"),
            payed: bool_field(obj, "payed"),
            payement_method: opt_str_field(obj, "payementMethod"),
            cancelation_reason: opaque_field(obj, "cancelationReason"),
            created_at: opaque_field(obj, "createdAt"),
            updated_at: opaque_field(obj, "updatedAt"),
        }
    }
}

// ---------------------------------------------------------------------------
// Field accessors
// ---------------------------------------------------------------------------

/// Unwrap Mongo extended JSON scalars (`$oid`, `$numberLong`, ...).
fn scalar(v: &Value) -> &Value {
    if let Value::Object(obj) = v {
        if obj.len() == 1 {
            for key in ["$oid", "$numberLong", "$numberInt", "$numberDouble", "$numberDecimal"] {
                if let Some(inner) = obj.get(key) {
                    return inner;
                }
            }
        }
    }
    v
}

fn opt_str_field(obj: &Record, key: &str) -> Option<String> {
    match obj.get(key).map(scalar) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    }
}

fn str_field(obj: &Record, key: &str) -> String {
    opt_str_field(obj, key).unwrap_or_default()
}

fn bool_field(obj: &Record, key: &str) -> bool {
    match obj.get(key).map(scalar) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

fn f64_field(obj: &Record, key: &str) -> f64 {
    match obj.get(key).map(scalar) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn i64_field(obj: &Record, key: &str) -> Option<i64> {
    match obj.get(key).map(scalar) {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64))
        }
        _ => None,
    }
}

/// Grouping key material, so never truncated: `1000.2` and `1000.7` stay
/// distinct while `1000.0` equals `1000`.
fn timestamp_field(obj: &Record, key: &str) -> Option<Timestamp> {
    match obj.get(key).map(scalar) {
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => Some(Timestamp::Integral(i)),
            None => n.as_f64().and_then(Timestamp::from_f64),
        },
        Some(Value::String(s)) => {
            let s = s.trim();
            match s.parse::<i64>() {
                Ok(i) => Some(Timestamp::Integral(i)),
                Err(_) => s.parse::<f64>().ok().and_then(Timestamp::from_f64),
            }
        }
        _ => None,
    }
}

/// Copied through verbatim; `null` counts as absent.
fn opaque_field(obj: &Record, key: &str) -> Option<Value> {
    obj.get(key).filter(|v| !v.is_null()).cloned()
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
