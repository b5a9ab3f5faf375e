use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

use coa_tree::{Forest, TreeNode, TreeRecord};
use tracing::debug;

use crate::Render;

/// Expand/collapse membership for one view session.
///
/// Kept apart from the forest so a rebuilt forest does not lose the user's
/// choices. Ids without children are never added by `expand_all`.
#[derive(Debug, Clone)]
pub struct TreeViewState<Id> {
    expanded: HashSet<Id>,
    scope: Option<String>,
}

impl<Id> Default for TreeViewState<Id> {
    fn default() -> Self {
        Self {
            expanded: HashSet::new(),
            scope: None,
        }
    }
}

impl<Id> TreeViewState<Id>
where
    Id: Clone + Eq + Hash,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// A state with every branch of `forest` expanded.
    pub fn expanded_all<Record>(forest: &Forest<Record>) -> Self
    where
        Record: TreeRecord<Id = Id>,
    {
        let mut state = Self::new();
        state.expand_all(forest);
        state
    }

    /// Accept freshly loaded records for `scope` (e.g. a company).
    ///
    /// The first load of a scope expands everything. Reloading the same scope
    /// keeps the current expansion.
    pub fn load<Record>(&mut self, scope: &str, forest: &Forest<Record>)
    where
        Record: TreeRecord<Id = Id>,
    {
        if self.scope.as_deref() == Some(scope) {
            debug!(scope, "reloaded, keeping expansion");
            return;
        }
        self.scope = Some(scope.to_owned());
        self.expand_all(forest);
        debug!(scope, expanded = self.expanded.len(), "first load, expanded all");
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Flip `id` between expanded and collapsed. Returns whether it is now
    /// expanded.
    pub fn toggle(&mut self, id: &Id) -> bool {
        if self.expanded.remove(id) {
            false
        } else {
            self.expanded.insert(id.clone());
            true
        }
    }

    pub fn expand_all<Record>(&mut self, forest: &Forest<Record>)
    where
        Record: TreeRecord<Id = Id>,
    {
        self.expanded = forest.branch_ids();
    }

    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }

    pub fn is_expanded(&self, id: &Id) -> bool {
        self.expanded.contains(id)
    }

    pub fn expanded_ids(&self) -> &HashSet<Id> {
        &self.expanded
    }

    /// Roots are always visible; any other node is visible when its parent is
    /// visible and expanded. Ids not in the forest are not visible.
    pub fn is_visible<Record>(&self, forest: &Forest<Record>, id: &Id) -> bool
    where
        Record: TreeRecord<Id = Id>,
    {
        let Some(path) = forest.path_to(id) else {
            return false;
        };
        let ancestors = &path[..path.len().saturating_sub(1)];
        ancestors
            .iter()
            .all(|ancestor| self.is_expanded(ancestor.record.id()))
    }

    /// Rows a renderer shows, top-down: a collapsed node's children are
    /// skipped.
    pub fn visible_rows<Record>(&self, forest: &Forest<Record>) -> Vec<TreeRow<Id>>
    where
        Record: TreeRecord<Id = Id> + Render,
    {
        let mut rows = Vec::new();
        let mut stack: Vec<(usize, &TreeNode<Record>)> =
            forest.roots().iter().rev().map(|root| (0, root)).collect();

        while let Some((depth, node)) = stack.pop() {
            let id = node.record.id();
            let is_branch = node.is_branch();
            let is_expanded = is_branch && self.is_expanded(id);

            rows.push(TreeRow {
                id: id.clone(),
                depth,
                is_branch,
                is_expanded,
                label: node.record.render(),
            });

            if is_expanded {
                stack.extend(node.children.iter().rev().map(|child| (depth + 1, child)));
            }
        }

        rows
    }
}

/// One rendered line of the tree, keyed by record id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow<Id> {
    pub id: Id,
    pub depth: usize,
    pub is_branch: bool,
    pub is_expanded: bool,
    pub label: String,
}

impl<Id> fmt::Display for TreeRow<Id> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = match (self.is_branch, self.is_expanded) {
            (true, true) => "▼",
            (true, false) => "▶",
            (false, _) => "•",
        };
        write!(f, "{}{} {}", "  ".repeat(self.depth), marker, self.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Item, Kind, deep_chain, item};
    use coa_tree::build_forest;

    fn chain() -> Forest<Item> {
        build_forest(vec![
            item("root", None, "1000", "Assets", Kind::Asset),
            item("mid", Some("root"), "1100", "Current assets", Kind::Asset),
            item("leaf", Some("mid"), "1110", "Petty cash", Kind::Asset),
            item("other", None, "2000", "Liabilities", Kind::Liability),
        ])
    }

    fn set(ids: &[&'static str]) -> HashSet<&'static str> {
        ids.iter().copied().collect()
    }

    fn lines(state: &TreeViewState<&'static str>, forest: &Forest<Item>) -> Vec<String> {
        state
            .visible_rows(forest)
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn toggle_flips_membership() {
        let mut state = TreeViewState::new();
        assert!(state.toggle(&"root"));
        assert!(state.is_expanded(&"root"));
        assert!(!state.toggle(&"root"));
        assert!(!state.is_expanded(&"root"));
    }

    #[test]
    fn expand_all_only_branches() {
        let forest = chain();
        let state = TreeViewState::expanded_all(&forest);
        assert_eq!(state.expanded_ids(), &set(&["root", "mid"]));
    }

    #[test]
    fn collapse_then_expand_ignores_start() {
        let forest = chain();
        let mut state = TreeViewState::new();
        state.toggle(&"leaf");
        state.toggle(&"ghost");
        state.toggle(&"mid");

        state.collapse_all();
        assert!(state.expanded_ids().is_empty());
        state.expand_all(&forest);
        assert_eq!(state.expanded_ids(), &set(&["root", "mid"]));
    }

    #[test]
    fn collapsed_parent_hides_children() {
        let forest = chain();
        let mut state = TreeViewState::expanded_all(&forest);
        state.toggle(&"mid");

        assert!(state.is_visible(&forest, &"root"));
        assert!(state.is_visible(&forest, &"mid"));
        assert!(!state.is_visible(&forest, &"leaf"));
        assert!(state.is_visible(&forest, &"other"));
        assert!(!state.is_visible(&forest, &"ghost"));
    }

    #[test]
    fn collapsed_grandparent_hides_expanded_parent() {
        let forest = chain();
        let mut state = TreeViewState::expanded_all(&forest);
        state.toggle(&"root");

        assert!(!state.is_visible(&forest, &"mid"));
        assert!(!state.is_visible(&forest, &"leaf"));
    }

    #[test]
    fn rows_follow_expansion() {
        let forest = chain();
        let mut state = TreeViewState::expanded_all(&forest);

        assert_eq!(
            lines(&state, &forest),
            vec![
                "▼ 1000 Assets",
                "  ▼ 1100 Current assets",
                "    • 1110 Petty cash",
                "• 2000 Liabilities",
            ]
        );

        state.toggle(&"mid");
        assert_eq!(
            lines(&state, &forest),
            vec!["▼ 1000 Assets", "  ▶ 1100 Current assets", "• 2000 Liabilities"]
        );
    }

    #[test]
    fn rows_agree_with_is_visible() {
        let forest = chain();
        let mut state = TreeViewState::expanded_all(&forest);
        state.toggle(&"root");

        let row_ids: HashSet<_> = state
            .visible_rows(&forest)
            .into_iter()
            .map(|row| row.id)
            .collect();
        for (_, node) in forest.iter() {
            assert_eq!(
                row_ids.contains(node.record.id()),
                state.is_visible(&forest, node.record.id())
            );
        }
    }

    #[test]
    fn load_expands_on_new_scope_only() {
        let forest = chain();
        let mut state = TreeViewState::new();

        state.load("acme", &forest);
        assert_eq!(state.scope(), Some("acme"));
        assert_eq!(state.expanded_ids(), &set(&["root", "mid"]));

        state.toggle(&"root");
        state.load("acme", &forest);
        assert_eq!(state.expanded_ids(), &set(&["mid"]));

        state.load("globex", &forest);
        assert_eq!(state.expanded_ids(), &set(&["root", "mid"]));
    }

    #[test]
    fn deep_chain_renders_and_collapses() {
        let forest = build_forest(deep_chain(10_000));
        let mut state = TreeViewState::new();
        state.load("deep", &forest);

        let rows = state.visible_rows(&forest);
        assert_eq!(rows.len(), 10_000);
        assert_eq!(rows[9_999].depth, 9_999);
        let deepest = format!("{}• 09999 number 9999", "  ".repeat(9_999));
        assert_eq!(rows[9_999].to_string(), deepest);
        assert!(state.is_visible(&forest, &"r9999"));

        state.toggle(&"r4999");
        assert_eq!(state.visible_rows(&forest).len(), 5_000);
        assert!(!state.is_visible(&forest, &"r5000"));
        assert!(state.is_visible(&forest, &"r4999"));
    }
}
