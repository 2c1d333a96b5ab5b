use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::Serialize;

use crate::{Status, StatusStore};

/// One control whose status rank moved between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffEntry {
    pub framework: String,
    pub control: String,
    pub from: Status,
    pub to: Status,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssessmentDiff {
    pub frameworks: Vec<String>,
    pub improved: Vec<DiffEntry>,
    pub regressed: Vec<DiffEntry>,
    pub unchanged_count: usize,
}

/// Compares two snapshots control by control.
///
/// Frameworks and controls are visited in lexicographic order over the union of both stores;
/// entries keep that traversal order.
pub fn compare(old: &StatusStore, new: &StatusStore) -> AssessmentDiff {
    let frameworks = old
        .frameworks()
        .chain(new.frameworks())
        .collect::<BTreeSet<_>>();

    let mut diff = AssessmentDiff {
        frameworks: frameworks.iter().map(|fw| fw.to_string()).collect(),
        ..AssessmentDiff::default()
    };

    for framework in frameworks {
        let controls = old
            .statuses(framework)
            .into_iter()
            .chain(new.statuses(framework))
            .flat_map(|statuses| statuses.keys().map(String::as_str))
            .collect::<BTreeSet<_>>();

        for control in controls {
            let from = old.get(framework, control);
            let to = new.get(framework, control);
            let entry = || DiffEntry {
                framework: framework.to_string(),
                control: control.to_string(),
                from,
                to,
            };
            match to.rank().cmp(&from.rank()) {
                Ordering::Greater => diff.improved.push(entry()),
                Ordering::Less => diff.regressed.push(entry()),
                Ordering::Equal => diff.unchanged_count += 1,
            }
        }
    }

    diff
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(entries: &[(&str, &str, &str)]) -> StatusStore {
        let mut store = StatusStore::new();
        for (framework, control, status) in entries {
            store.set(framework, control, status);
        }
        store
    }

    #[test]
    fn single_improvement_is_reported() {
        let old = store(&[("nist_csf", "A", "missing")]);
        let new = store(&[("nist_csf", "A", "partial")]);
        let diff = compare(&old, &new);

        assert_eq!(diff.frameworks, vec!["nist_csf".to_string()]);
        assert_eq!(
            diff.improved,
            vec![DiffEntry {
                framework: "nist_csf".to_string(),
                control: "A".to_string(),
                from: Status::Missing,
                to: Status::Partial,
            }]
        );
        assert!(diff.regressed.is_empty());
        assert_eq!(diff.unchanged_count, 0);
    }

    #[test]
    fn every_status_pair_lands_in_exactly_one_bucket() {
        for from in Status::ALL {
            for to in Status::ALL {
                let old = store(&[("soc2", "CC6.1", from.as_str())]);
                let new = store(&[("soc2", "CC6.1", to.as_str())]);
                let diff = compare(&old, &new);

                let buckets = diff.improved.len() + diff.regressed.len() + diff.unchanged_count;
                assert_eq!(buckets, 1, "{from} -> {to}");
                match to.rank().cmp(&from.rank()) {
                    Ordering::Greater => assert_eq!(diff.improved.len(), 1),
                    Ordering::Less => assert_eq!(diff.regressed.len(), 1),
                    Ordering::Equal => assert_eq!(diff.unchanged_count, 1),
                }
            }
        }
    }

    #[test]
    fn controls_absent_on_one_side_default_to_missing() {
        let old = store(&[("iso27001", "A.5.1", "implemented")]);
        let new = store(&[("iso27001", "A.8.8", "partial")]);
        let diff = compare(&old, &new);

        assert_eq!(diff.regressed.len(), 1);
        assert_eq!(diff.regressed[0].control, "A.5.1");
        assert_eq!(diff.regressed[0].to, Status::Missing);
        assert_eq!(diff.improved.len(), 1);
        assert_eq!(diff.improved[0].control, "A.8.8");
        assert_eq!(diff.improved[0].from, Status::Missing);
    }

    #[test]
    fn traversal_order_is_lexicographic_by_framework_then_control() {
        let old = store(&[
            ("soc2", "b", "missing"),
            ("cis_v8", "z", "missing"),
            ("soc2", "a", "missing"),
        ]);
        let new = store(&[
            ("soc2", "b", "implemented"),
            ("cis_v8", "z", "partial"),
            ("soc2", "a", "partial"),
            ("nist_csf", "m", "missing"),
        ]);
        let diff = compare(&old, &new);

        assert_eq!(diff.frameworks, vec!["cis_v8", "nist_csf", "soc2"]);
        let order = diff
            .improved
            .iter()
            .map(|entry| (entry.framework.as_str(), entry.control.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(order, vec![("cis_v8", "z"), ("soc2", "a"), ("soc2", "b")]);
        assert_eq!(diff.unchanged_count, 1);
    }

    #[test]
    fn diff_entry_serializes_from_and_to() {
        let entry = DiffEntry {
            framework: "nist_csf".to_string(),
            control: "A".to_string(),
            from: Status::Missing,
            to: Status::Partial,
        };
        let value = serde_json::to_value(&entry).expect("serialize");
        assert_eq!(
            value,
            serde_json::json!({"framework":"nist_csf","control":"A","from":"missing","to":"partial"})
        );
    }
}
