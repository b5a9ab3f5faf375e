use crate::TreeRecord;
use crate::build::Layout;

/// Anomalies in a flat record set that `build_forest` repairs silently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForestDiagnostics<Id> {
    /// Records whose parent id matches no record.
    pub dangling_parents: Vec<Id>,
    /// Records on a parent cycle, placed as roots.
    pub cycle_roots: Vec<Id>,
    /// Ids declared by more than one record.
    pub duplicate_ids: Vec<Id>,
}

impl<Id> ForestDiagnostics<Id> {
    pub fn is_clean(&self) -> bool {
        self.dangling_parents.is_empty()
            && self.cycle_roots.is_empty()
            && self.duplicate_ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.dangling_parents.len() + self.cycle_roots.len() + self.duplicate_ids.len()
    }
}

pub fn diagnose<Record: TreeRecord>(records: &[Record]) -> ForestDiagnostics<Record::Id> {
    let layout = Layout::new(records);
    let ids = |indices: &[usize]| -> Vec<Record::Id> {
        let mut ids: Vec<Record::Id> = indices
            .iter()
            .map(|&index| records[index].id().clone())
            .collect();
        ids.sort();
        ids.dedup();
        ids
    };

    ForestDiagnostics {
        dangling_parents: ids(&layout.dangling),
        cycle_roots: ids(&layout.cycle_roots),
        duplicate_ids: ids(&layout.duplicates),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::row;

    #[test]
    fn clean_records() {
        let diagnostics = diagnose(&[row("1", None, "1000"), row("2", Some("1"), "1010")]);
        assert!(diagnostics.is_clean());
        assert_eq!(diagnostics.len(), 0);
    }

    #[test]
    fn reports_each_anomaly() {
        let diagnostics = diagnose(&[
            row("1", None, "1000"),
            row("1", None, "1001"),
            row("2", Some("nope"), "2000"),
            row("A", Some("B"), "3000"),
            row("B", Some("A"), "3100"),
            row("C", Some("A"), "3200"),
        ]);

        assert_eq!(diagnostics.dangling_parents, vec!["2"]);
        assert_eq!(diagnostics.cycle_roots, vec!["A", "B"]);
        assert_eq!(diagnostics.duplicate_ids, vec!["1"]);
        assert!(!diagnostics.is_clean());
        assert_eq!(diagnostics.len(), 4);
    }
}
