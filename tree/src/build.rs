use std::cmp::Ordering;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

use tracing::{debug, warn};

use crate::{Forest, TreeNode, TreeRecord};

/// Index-only shape of a forest, computed over a slice of records.
///
/// Every record index appears exactly once, either in `roots` or in the
/// `children` list of exactly one other index.
#[derive(Debug)]
pub(crate) struct Layout {
    pub roots: Vec<usize>,
    pub children: Vec<Vec<usize>>,
    pub dangling: Vec<usize>,
    pub cycle_roots: Vec<usize>,
    pub duplicates: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Walk {
    Unvisited,
    OnPath,
    Done,
}

impl Layout {
    pub fn new<Record: TreeRecord>(records: &[Record]) -> Self {
        let count = records.len();

        // First occurrence of an id owns it.
        let mut index_by_id: HashMap<&Record::Id, usize> = HashMap::with_capacity(count);
        let mut duplicates = Vec::new();
        for (index, record) in records.iter().enumerate() {
            match index_by_id.entry(record.id()) {
                Entry::Occupied(_) => duplicates.push(index),
                Entry::Vacant(entry) => {
                    entry.insert(index);
                }
            }
        }

        let mut parents: Vec<Option<usize>> = vec![None; count];
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); count];
        let mut roots = Vec::new();
        let mut dangling = Vec::new();

        for (index, record) in records.iter().enumerate() {
            match record.parent_id() {
                None => roots.push(index),
                Some(parent_id) => match index_by_id.get(parent_id) {
                    Some(&parent) => {
                        parents[index] = Some(parent);
                        children[parent].push(index);
                    }
                    None => {
                        dangling.push(index);
                        roots.push(index);
                    }
                },
            }
        }

        let reached = reachable(&roots, &children, count);
        let cycle_roots = find_cycle_members(&parents, &reached);

        if !cycle_roots.is_empty() {
            let mut is_cycle_root = vec![false; count];
            for &index in &cycle_roots {
                is_cycle_root[index] = true;
            }
            for siblings in children.iter_mut() {
                siblings.retain(|&child| !is_cycle_root[child]);
            }
            roots.extend(cycle_roots.iter().copied());
        }

        let by_key = |a: &usize, b: &usize| compare(records, *a, *b);
        roots.sort_by(by_key);
        for siblings in children.iter_mut() {
            siblings.sort_by(by_key);
        }

        Layout {
            roots,
            children,
            dangling,
            cycle_roots,
            duplicates,
        }
    }

    /// Indices in pre-order (roots in order, parents before children), each
    /// at most once.
    pub fn pre_order(&self) -> Vec<usize> {
        let mut placed = vec![false; self.children.len()];
        let mut order = Vec::with_capacity(self.children.len());
        let mut stack: Vec<usize> = self.roots.iter().rev().copied().collect();

        while let Some(index) = stack.pop() {
            if placed[index] {
                continue;
            }
            placed[index] = true;
            order.push(index);
            stack.extend(self.children[index].iter().rev().copied());
        }

        order
    }
}

/// Siblings order by sort key as plain strings ("900" after "1000"), then by
/// id, then by input position.
fn compare<Record: TreeRecord>(records: &[Record], a: usize, b: usize) -> Ordering {
    let (left, right) = (&records[a], &records[b]);
    left.sort_key()
        .cmp(right.sort_key())
        .then_with(|| left.id().cmp(right.id()))
        .then(a.cmp(&b))
}

fn reachable(roots: &[usize], children: &[Vec<usize>], count: usize) -> Vec<bool> {
    let mut reached = vec![false; count];
    let mut stack: Vec<usize> = roots.to_vec();
    while let Some(index) = stack.pop() {
        if reached[index] {
            continue;
        }
        reached[index] = true;
        stack.extend(children[index].iter().copied());
    }
    reached
}

/// Every unreached record has a parent chain that never reaches a root, so
/// the chain ends in a cycle. Returns the indices of the records on those
/// cycles, in input order.
fn find_cycle_members(parents: &[Option<usize>], reached: &[bool]) -> Vec<usize> {
    let mut state = vec![Walk::Unvisited; parents.len()];
    let mut members = Vec::new();

    for start in 0..parents.len() {
        if reached[start] || state[start] != Walk::Unvisited {
            continue;
        }

        let mut path = Vec::new();
        let mut current = start;
        loop {
            state[current] = Walk::OnPath;
            path.push(current);

            let Some(parent) = parents[current] else {
                break;
            };
            if reached[parent] {
                break;
            }
            match state[parent] {
                Walk::OnPath => {
                    if let Some(position) = path.iter().position(|&index| index == parent) {
                        members.extend_from_slice(&path[position..]);
                    }
                    break;
                }
                Walk::Done => break,
                Walk::Unvisited => current = parent,
            }
        }

        for index in path {
            state[index] = Walk::Done;
        }
    }

    members.sort_unstable();
    members
}

/// Reconstruct a forest from flat, parent-pointer records.
///
/// Never fails: records with a dangling parent and records caught on a
/// parent cycle become roots. Output order depends only on the records'
/// sort keys and ids, never on input order.
pub fn build_forest<Record, Records>(records: Records) -> Forest<Record>
where
    Record: TreeRecord,
    Records: IntoIterator<Item = Record>,
{
    let records: Vec<Record> = records.into_iter().collect();
    let layout = Layout::new(&records);

    if !layout.dangling.is_empty() {
        warn!(
            count = layout.dangling.len(),
            "records with unknown parent placed as roots"
        );
    }
    if !layout.cycle_roots.is_empty() {
        warn!(
            count = layout.cycle_roots.len(),
            "records on a parent cycle placed as roots"
        );
    }
    if !layout.duplicates.is_empty() {
        warn!(count = layout.duplicates.len(), "duplicate record ids");
    }

    let order = layout.pre_order();
    let mut arena: Vec<Option<Record>> = records.into_iter().map(Some).collect();
    let roots = assemble(&order, &mut arena, &layout);

    debug!(
        records = arena.len(),
        roots = roots.len(),
        "built forest"
    );

    Forest::new(roots)
}

/// Builds nodes in reverse pre-order, so every child exists before its
/// parent. Records are taken out of the arena as they are placed; an index
/// that was already placed yields nothing.
fn assemble<Record>(
    order: &[usize],
    arena: &mut [Option<Record>],
    layout: &Layout,
) -> Vec<TreeNode<Record>> {
    let mut built: Vec<Option<TreeNode<Record>>> = arena.iter().map(|_| None).collect();

    for &index in order.iter().rev() {
        let Some(record) = arena[index].take() else {
            continue;
        };
        let children = layout.children[index]
            .iter()
            .filter_map(|&child| built[child].take())
            .collect();
        built[index] = Some(TreeNode::new(record, children));
    }

    layout
        .roots
        .iter()
        .filter_map(|&index| built[index].take())
        .collect()
}
