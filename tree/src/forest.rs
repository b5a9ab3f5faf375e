use std::collections::HashSet;
use std::mem;

use crate::TreeRecord;

/// A record and its ordered children.
///
/// Walking, rebuilding, comparing and dropping all use explicit stacks, so a
/// chart nested thousands of levels deep never exhausts the call stack.
#[derive(Debug)]
pub struct TreeNode<Record> {
    pub record: Record,
    pub children: Vec<TreeNode<Record>>,
}

impl<Record> TreeNode<Record> {
    pub fn new(record: Record, children: Vec<TreeNode<Record>>) -> Self {
        Self { record, children }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_branch(&self) -> bool {
        !self.children.is_empty()
    }

    /// Number of nodes in this subtree, including this node.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Pre-order walk of this subtree. Depth is relative to this node (0).
    pub fn iter(&self) -> DepthFirst<'_, Record> {
        DepthFirst {
            stack: vec![(0, self)],
        }
    }
}

impl<Record> Drop for TreeNode<Record> {
    fn drop(&mut self) {
        let mut pending = mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

impl<Record: Clone> Clone for TreeNode<Record> {
    fn clone(&self) -> Self {
        let children = fold_post_order(&self.children, |node, children| {
            TreeNode::new(node.record.clone(), children)
        });
        TreeNode::new(self.record.clone(), children)
    }
}

impl<Record: PartialEq> PartialEq for TreeNode<Record> {
    fn eq(&self, other: &Self) -> bool {
        same_shape(self.iter(), other.iter())
    }
}

impl<Record: Eq> Eq for TreeNode<Record> {}

/// Rebuild trees bottom-up: `fold` sees each node after all of its children,
/// together with what it returned for them, in order.
pub fn fold_post_order<'a, Record, Output, Fold>(
    roots: &'a [TreeNode<Record>],
    mut fold: Fold,
) -> Vec<Output>
where
    Fold: FnMut(&'a TreeNode<Record>, Vec<Output>) -> Output,
{
    struct Frame<'a, Record, Output> {
        node: &'a TreeNode<Record>,
        next: usize,
        done: Vec<Output>,
    }

    let mut outputs = Vec::with_capacity(roots.len());
    let mut stack = Vec::new();

    for root in roots {
        stack.push(Frame {
            node: root,
            next: 0,
            done: Vec::new(),
        });

        while let Some(mut frame) = stack.pop() {
            match frame.node.children.get(frame.next) {
                Some(child) => {
                    frame.next += 1;
                    stack.push(frame);
                    stack.push(Frame {
                        node: child,
                        next: 0,
                        done: Vec::with_capacity(child.children.len()),
                    });
                }
                None => {
                    let output = fold(frame.node, frame.done);
                    match stack.last_mut() {
                        Some(parent) => parent.done.push(output),
                        None => outputs.push(output),
                    }
                }
            }
        }
    }

    outputs
}

/// Pre-order sequences of `(depth, record)` pin down a forest's shape.
fn same_shape<'a, Record: PartialEq + 'a>(
    left: DepthFirst<'a, Record>,
    right: DepthFirst<'a, Record>,
) -> bool {
    left.map(|(depth, node)| (depth, &node.record))
        .eq(right.map(|(depth, node)| (depth, &node.record)))
}

/// An ordered collection of independent trees.
#[derive(Debug)]
pub struct Forest<Record> {
    roots: Vec<TreeNode<Record>>,
}

impl<Record> Default for Forest<Record> {
    fn default() -> Self {
        Self { roots: Vec::new() }
    }
}

impl<Record: Clone> Clone for Forest<Record> {
    fn clone(&self) -> Self {
        Self::new(self.fold(|node, children| TreeNode::new(node.record.clone(), children)))
    }
}

impl<Record: PartialEq> PartialEq for Forest<Record> {
    fn eq(&self, other: &Self) -> bool {
        same_shape(self.iter(), other.iter())
    }
}

impl<Record: Eq> Eq for Forest<Record> {}

impl<Record> Forest<Record> {
    pub fn new(roots: Vec<TreeNode<Record>>) -> Self {
        Self { roots }
    }

    pub fn roots(&self) -> &[TreeNode<Record>] {
        &self.roots
    }

    /// Total number of nodes across every tree.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Pre-order walk over every tree, yielding `(depth, node)` with roots at
    /// depth 0.
    pub fn iter(&self) -> DepthFirst<'_, Record> {
        DepthFirst {
            stack: self.roots.iter().rev().map(|root| (0, root)).collect(),
        }
    }

    /// Post-order rebuild of every tree; see [`fold_post_order`].
    pub fn fold<'a, Output, Fold>(&'a self, fold: Fold) -> Vec<Output>
    where
        Fold: FnMut(&'a TreeNode<Record>, Vec<Output>) -> Output,
    {
        fold_post_order(&self.roots, fold)
    }
}

impl<Record> Forest<Record>
where
    Record: TreeRecord,
{
    pub fn find(&self, id: &Record::Id) -> Option<&TreeNode<Record>> {
        self.iter()
            .map(|(_, node)| node)
            .find(|node| node.record.id() == id)
    }

    /// The chain of nodes from a root down to (and including) the node with
    /// `id`.
    pub fn path_to(&self, id: &Record::Id) -> Option<Vec<&TreeNode<Record>>> {
        let mut path: Vec<&TreeNode<Record>> = Vec::new();
        for (depth, node) in self.iter() {
            path.truncate(depth);
            path.push(node);
            if node.record.id() == id {
                return Some(path);
            }
        }
        None
    }

    /// Ids of every node with at least one child.
    pub fn branch_ids(&self) -> HashSet<Record::Id> {
        self.iter()
            .filter(|(_, node)| node.is_branch())
            .map(|(_, node)| node.record.id().clone())
            .collect()
    }

    /// `target` plus every id beneath it.
    ///
    /// None of these may become the new parent of `target`, or the hierarchy
    /// would contain a cycle. An id missing from the forest yields just
    /// itself.
    pub fn descendant_ids(&self, target: &Record::Id) -> HashSet<Record::Id> {
        let mut ids = HashSet::new();
        ids.insert(target.clone());
        if let Some(node) = self.find(target) {
            ids.extend(node.iter().map(|(_, node)| node.record.id().clone()));
        }
        ids
    }
}

/// Pre-order (parent before children) traversal.
pub struct DepthFirst<'a, Record> {
    stack: Vec<(usize, &'a TreeNode<Record>)>,
}

impl<'a, Record> Iterator for DepthFirst<'a, Record> {
    type Item = (usize, &'a TreeNode<Record>);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, node) = self.stack.pop()?;
        self.stack
            .extend(node.children.iter().rev().map(|child| (depth + 1, child)));
        Some((depth, node))
    }
}
