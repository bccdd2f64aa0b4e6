//! Attribute-level merging of feature records
//!
//! Attributes are compared by position, which is only meaningful when every version shares
//! one schema. Callers check schema ids first and treat any schema change as a conflict.

use crate::artifacts::objects::feature::FeatureRecord;
use crate::artifacts::objects::value::Value;
use std::collections::BTreeSet;

/// Positions whose value differs between two versions of a feature
pub fn changed_attributes(old: &FeatureRecord, new: &FeatureRecord) -> BTreeSet<usize> {
    let width = old.len().max(new.len());

    (0..width)
        .filter(|&index| old.value(index) != new.value(index))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeatureMerge {
    Merged(FeatureRecord),
    Conflict,
}

/// Three-way merge of one feature changed on both sides
///
/// Mergeable when no attribute was set to different values by the two sides. The result takes
/// ours' value where ours changed, theirs' where only theirs changed, and the ancestor's
/// elsewhere.
pub fn merge_features(
    ancestor: &FeatureRecord,
    ours: &FeatureRecord,
    theirs: &FeatureRecord,
) -> FeatureMerge {
    if ours.len() != ancestor.len() || theirs.len() != ancestor.len() {
        return FeatureMerge::Conflict;
    }

    let ours_changed = changed_attributes(ancestor, ours);
    let theirs_changed = changed_attributes(ancestor, theirs);

    if ours_changed
        .intersection(&theirs_changed)
        .any(|&index| ours.value(index) != theirs.value(index))
    {
        return FeatureMerge::Conflict;
    }

    let values = ancestor
        .values()
        .iter()
        .enumerate()
        .map(|(index, value)| pick(index, value, ours, &ours_changed, theirs, &theirs_changed))
        .collect();

    FeatureMerge::Merged(FeatureRecord::new(values))
}

fn pick(
    index: usize,
    ancestor_value: &Value,
    ours: &FeatureRecord,
    ours_changed: &BTreeSet<usize>,
    theirs: &FeatureRecord,
    theirs_changed: &BTreeSet<usize>,
) -> Value {
    let chosen = if ours_changed.contains(&index) {
        ours.value(index)
    } else if theirs_changed.contains(&index) {
        theirs.value(index)
    } else {
        None
    };

    chosen.unwrap_or(ancestor_value).clone()
}

/// Replay the change `old -> new` onto `target`
///
/// Every attribute the change touches must hold, in `target`, either its old or its new
/// value; otherwise the change cannot be applied and `None` is returned.
pub fn apply_feature_change(
    old: &FeatureRecord,
    new: &FeatureRecord,
    target: &FeatureRecord,
) -> Option<FeatureRecord> {
    if old.len() != new.len() || target.len() != old.len() {
        return None;
    }

    let mut result = target.clone();
    for index in changed_attributes(old, new) {
        let current = target.value(index);
        if current != old.value(index) && current != new.value(index) {
            return None;
        }
        if let Some(value) = new.value(index) {
            result = result.with_value(index, value.clone());
        }
    }

    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn parcel(owner: &str, area: i64, zoning: &str) -> FeatureRecord {
        FeatureRecord::new(vec![Value::from(owner), Value::Integer(area), Value::from(zoning)])
    }

    #[test]
    fn disjoint_attribute_changes_combine() {
        let ancestor = parcel("alice", 100, "R1");
        let ours = parcel("bob", 100, "R1");
        let theirs = parcel("alice", 100, "C2");

        let merged = merge_features(&ancestor, &ours, &theirs);

        assert_eq!(merged, FeatureMerge::Merged(parcel("bob", 100, "C2")));
        assert_eq!(
            merge_features(&ancestor, &theirs, &ours),
            FeatureMerge::Merged(parcel("bob", 100, "C2"))
        );
    }

    #[test]
    fn same_attribute_to_same_value_is_not_a_conflict() {
        let ancestor = parcel("alice", 100, "R1");
        let ours = parcel("bob", 120, "R1");
        let theirs = parcel("bob", 100, "R1");

        assert_eq!(
            merge_features(&ancestor, &ours, &theirs),
            FeatureMerge::Merged(parcel("bob", 120, "R1"))
        );
    }

    #[rstest]
    #[case(parcel("bob", 100, "R1"), parcel("carol", 100, "R1"))]
    #[case(parcel("alice", 1, "R1"), parcel("alice", 2, "C2"))]
    fn overlapping_changes_conflict(#[case] ours: FeatureRecord, #[case] theirs: FeatureRecord) {
        let ancestor = parcel("alice", 100, "R1");

        assert_eq!(merge_features(&ancestor, &ours, &theirs), FeatureMerge::Conflict);
    }

    #[test]
    fn attribute_count_mismatch_conflicts() {
        let ancestor = parcel("alice", 100, "R1");
        let ours = FeatureRecord::new(vec![Value::from("alice")]);

        assert_eq!(merge_features(&ancestor, &ours, &ancestor), FeatureMerge::Conflict);
    }

    #[test]
    fn change_applies_when_target_kept_old_values() {
        let old = parcel("alice", 100, "R1");
        let new = parcel("bob", 100, "R1");
        let target = parcel("alice", 250, "R1");

        assert_eq!(
            apply_feature_change(&old, &new, &target),
            Some(parcel("bob", 250, "R1"))
        );
        assert_eq!(apply_feature_change(&old, &new, &parcel("carol", 100, "R1")), None);
    }
}
