//! Field diff between a stored deal and a submission.

use dealsync_core::{Deal, DealChanges, DealSubmission, LogicalField};

/// The minimal set of mutable fields to send in an update.
///
/// A field is included when the submitted value is non-empty and differs
/// from the stored one by exact string comparison; a missing stored value
/// always differs. The delivery code is the lookup key and is never part of
/// the diff.
pub fn compute_changes(existing: &Deal, submission: &DealSubmission) -> DealChanges {
    let mut changes = DealChanges::new();
    for field in LogicalField::mutable() {
        let submitted = submission.field_value(field);
        if submitted.is_empty() {
            continue;
        }
        if existing.field_value(field) != Some(submitted.as_str()) {
            changes.insert(field, submitted);
        }
    }
    changes
}
