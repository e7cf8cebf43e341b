use indexmap::IndexMap;

use crate::model::{RawAssignment, Timestamp};

/// Group key = (assignedAt, officeId). Exact equality, no time window.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub assigned_at: Option<Timestamp>,
    pub office_id: String,
}

/// Legacy rows that collapse into one consolidated assignment.
#[derive(Debug, Clone)]
pub struct AssignmentGroup<'a> {
    pub key: GroupKey,
    pub rows: Vec<&'a RawAssignment>,
}

impl<'a> AssignmentGroup<'a> {
    /// First row of the group; supplies metadata that has no aggregate.
    pub fn representative(&self) -> &'a RawAssignment {
        self.rows[0]
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Partition rows by key. Groups come out in first-seen key order and
/// rows keep input order within a group.
pub fn group_assignments(assignments: &[RawAssignment]) -> Vec<AssignmentGroup<'_>> {
    let mut groups: IndexMap<GroupKey, Vec<&RawAssignment>> = IndexMap::new();

    for row in assignments {
        let key = GroupKey {
            assigned_at: row.assigned_at,
            office_id: row.office_id.clone(),
        };
        groups.entry(key).or_default().push(row);
    }

    groups
        .into_iter()
        .map(|(key, rows)| AssignmentGroup { key, rows })
        .collect()
}
