use indexmap::IndexMap;

use crate::model::{RawParcel, RawUser, RiderInfo};

/// Phone → rider, in first-insertion order. A later duplicate phone
/// replaces the value but keeps the original slot.
pub type RiderLookup = IndexMap<String, RiderInfo>;

/// Parcel id → raw parcel, same ordering rules as [`RiderLookup`].
pub type ParcelLookup<'a> = IndexMap<&'a str, &'a RawParcel>;

/// Index riders by trimmed phone. Non-riders and riders without a phone
/// are left out.
pub fn build_rider_lookup(users: &[RawUser]) -> RiderLookup {
    let mut lookup = RiderLookup::new();
    for user in users {
        if !user.role.is_rider() || user.phone_number.is_empty() {
            continue;
        }
        lookup.insert(user.phone_number.clone(), RiderInfo::from_user(user));
    }
    lookup
}

pub fn build_parcel_lookup(parcels: &[RawParcel]) -> ParcelLookup<'_> {
    let mut lookup = ParcelLookup::new();
    for parcel in parcels {
        if parcel.parcel_id.is_empty() {
            continue;
        }
        lookup.insert(parcel.parcel_id.as_str(), parcel);
    }
    lookup
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;

    fn user(role: &str, id: &str, phone: &str, office: &str) -> RawUser {
        RawUser {
            role: Role::parse(role),
            user_id: id.into(),
            name: format!("name_{id}"),
            phone_number: phone.into(),
            office_id: office.into(),
        }
    }

    fn parcel(id: &str, cost: f64) -> RawParcel {
        RawParcel {
            parcel_id: id.into(),
            office_id: Some("A".into()),
            driver_phone_number: String::new(),
            parcel_assigned: false,
            delivered: false,
            delivery_cost: cost,
            parcel_description: String::new(),
            receiver_name: String::new(),
            receiver_phone_number: String::new(),
            receiver_address: String::new(),
            sender_name: String::new(),
            sender_phone_number: String::new(),
        }
    }

    #[test]
    fn riders_only_with_phone() {
        let users = vec![
            user("RIDER", "u1", "0501", "A"),
            user("ADMIN", "u2", "0502", "A"),
            user("RIDER", "u3", "", "A"),
            user("rider", "u4", "0504", "A"),
        ];
        let lookup = build_rider_lookup(&users);
        assert_eq!(lookup.len(), 1);
        assert_eq!(lookup["0501"].rider_id, "u1");
    }

    #[test]
    fn duplicate_phone_last_wins_first_slot() {
        let users = vec![
            user("RIDER", "u1", "0501", "A"),
            user("RIDER", "u2", "0502", "A"),
            user("RIDER", "u3", "0501", "B"),
        ];
        let lookup = build_rider_lookup(&users);
        assert_eq!(lookup.len(), 2);
        let (first_phone, first) = lookup.get_index(0).unwrap();
        assert_eq!(first_phone, "0501");
        assert_eq!(first.rider_id, "u3");
    }

    #[test]
    fn parcel_lookup_skips_missing_ids() {
        let parcels = vec![parcel("p1", 1.0), parcel("", 2.0), parcel("p1", 3.0)];
        let lookup = build_parcel_lookup(&parcels);
        assert_eq!(lookup.len(), 1);
        assert_eq!(lookup["p1"].delivery_cost, 3.0);
    }
}
