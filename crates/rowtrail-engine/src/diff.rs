//! Change detection between row snapshots
//!
//! Fields are compared by their canonical serialized forms, not by reference
//! identity, so the same timestamp or number reconstructed from a different
//! store round-trip compares equal. Fields present on only one side always
//! count as changed.

use rowtrail_common::canon::canonical_json;

use crate::record::Row;

/// Compute the field names that differ between two row snapshots
///
/// The comparison runs over the union of keys in both rows. Order of the
/// result follows the new row's key iteration order, with before-only keys
/// appended. Identical rows produce an empty list, never an absent value;
/// whether an empty-diff UPDATE still yields an audit record is the record
/// builder's decision (it does).
pub fn diff(old_row: &Row, new_row: &Row) -> Vec<String> {
    let mut changed = Vec::new();

    for (field, new_value) in new_row {
        match old_row.get(field) {
            Some(old_value) if canonical_json(old_value) == canonical_json(new_value) => {},
            _ => changed.push(field.clone()),
        }
    }

    for field in old_row.keys() {
        if !new_row.contains_key(field) {
            changed.push(field.clone());
        }
    }

    changed
}
