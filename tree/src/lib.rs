//! Forests reconstructed from flat, parent-pointer records.
//!
//! Assumptions:
//! - Records are addressed by id. A record with no parent id, or whose parent
//!   id matches no record, is a root.
//! - Siblings (and roots) are ordered by `sort_key` with plain string
//!   comparison, ties broken by id.
//! - While building, records live in a Vec<Option<Record>> arena and are
//!   taken out as they are placed, so each record lands in the forest once.
//! - Records on a parent cycle are placed as roots; records hanging below a
//!   cycle stay nested under it.
//! - Depth-first traversal is pre-order (parent before children).
//! - Nothing recurses per tree level: depth is bounded only by record count.
//!
//! Forests are never patched: a changed record set means a new forest.

mod build;
mod diagnose;
mod forest;

use std::fmt::Debug;
use std::hash::Hash;

pub use crate::build::build_forest;
pub use crate::diagnose::{ForestDiagnostics, diagnose};
pub use crate::forest::{DepthFirst, Forest, TreeNode, fold_post_order};

/// A flat record that knows its own id and its parent's id.
pub trait TreeRecord {
    type Id: Debug + Clone + Eq + Hash + Ord;

    fn id(&self) -> &Self::Id;

    fn parent_id(&self) -> Option<&Self::Id>;

    /// Siblings are ordered by this key, compared as plain strings.
    fn sort_key(&self) -> &str;
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Row {
        pub id: &'static str,
        pub parent: Option<&'static str>,
        pub number: &'static str,
    }

    impl TreeRecord for Row {
        type Id = &'static str;

        fn id(&self) -> &Self::Id {
            &self.id
        }

        fn parent_id(&self) -> Option<&Self::Id> {
            self.parent.as_ref()
        }

        fn sort_key(&self) -> &str {
            self.number
        }
    }

    pub fn row(id: &'static str, parent: Option<&'static str>, number: &'static str) -> Row {
        Row { id, parent, number }
    }

    fn leak(text: String) -> &'static str {
        Box::leak(text.into_boxed_str())
    }

    /// `count` rows, each the only child of the row before it.
    pub fn deep_chain(count: usize) -> Vec<Row> {
        (0..count)
            .map(|index| Row {
                id: leak(format!("r{index}")),
                parent: index.checked_sub(1).map(|parent| leak(format!("r{parent}"))),
                number: leak(format!("{index:05}")),
            })
            .collect()
    }

    /// `count` rows with pseudo-random parents and numbers from a fixed seed.
    /// Roughly one row in ten is a root, one in ten has a parent that does not
    /// exist, and one in fifty reuses an earlier row's id. Parents are drawn
    /// from the whole range, so some chains loop back on themselves.
    pub fn scrambled(count: usize, seed: u64) -> Vec<Row> {
        let mut state = seed;
        let mut next = move || {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 33) as usize
        };

        let mut rows: Vec<Row> = Vec::with_capacity(count);
        for index in 0..count {
            let id = if index > 0 && next() % 50 == 0 {
                rows[next() % index].id
            } else {
                leak(format!("r{index}"))
            };
            let parent = match next() % 10 {
                0 => None,
                1 => Some(leak(format!("gone{index}"))),
                _ => Some(leak(format!("r{}", next() % count))),
            };
            let number = leak((next() % 1000).to_string());
            rows.push(Row { id, parent, number });
        }
        rows
    }

    /// Numbers indented two spaces per level, in pre-order.
    pub fn labels(forest: &Forest<Row>) -> Vec<String> {
        forest
            .iter()
            .map(|(depth, node)| format!("{}{}", "  ".repeat(depth), node.record.number))
            .collect()
    }
}
