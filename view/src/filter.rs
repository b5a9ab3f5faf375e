use std::borrow::Cow;

use coa_tree::{Forest, TreeNode};
use tracing::debug;

/// A record that can be found by free-text search and narrowed by kind.
pub trait Searchable {
    type Kind: PartialEq;

    /// Text searched by queries, e.g. number and name.
    fn search_fields(&self) -> Vec<&str>;

    fn kind(&self) -> &Self::Kind;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeFilter<Kind> {
    pub query: String,
    pub kind: Option<Kind>,
}

impl<Kind> Default for TreeFilter<Kind> {
    fn default() -> Self {
        Self {
            query: String::new(),
            kind: None,
        }
    }
}

impl<Kind> TreeFilter<Kind> {
    pub fn new(query: impl Into<String>, kind: Option<Kind>) -> Self {
        Self {
            query: query.into(),
            kind,
        }
    }

    pub fn query(query: impl Into<String>) -> Self {
        Self::new(query, None)
    }

    pub fn kind(kind: Kind) -> Self {
        Self::new(String::new(), Some(kind))
    }

    /// True when the filter lets every node through.
    pub fn is_identity(&self) -> bool {
        self.query.trim().is_empty() && self.kind.is_none()
    }
}

struct Matcher<'a, Kind> {
    needle: String,
    kind: Option<&'a Kind>,
}

impl<'a, Kind: PartialEq> Matcher<'a, Kind> {
    fn new(filter: &'a TreeFilter<Kind>) -> Self {
        Self {
            needle: filter.query.trim().to_lowercase(),
            kind: filter.kind.as_ref(),
        }
    }

    fn matches<Record>(&self, record: &Record) -> bool
    where
        Record: Searchable<Kind = Kind>,
    {
        if let Some(kind) = self.kind {
            if record.kind() != kind {
                return false;
            }
        }
        self.needle.is_empty()
            || record
                .search_fields()
                .iter()
                .any(|field| field.to_lowercase().contains(&self.needle))
    }
}

/// Narrow a forest to the nodes that match `filter`, keeping every ancestor
/// of a match so matches never lose their place in the hierarchy.
///
/// An identity filter borrows the forest untouched; otherwise a new forest is
/// built with fresh children lists.
pub fn apply_filter<'a, Record>(
    forest: &'a Forest<Record>,
    filter: &TreeFilter<Record::Kind>,
) -> Cow<'a, Forest<Record>>
where
    Record: Searchable + Clone,
{
    if filter.is_identity() {
        return Cow::Borrowed(forest);
    }

    let matcher = Matcher::new(filter);
    let roots: Vec<TreeNode<Record>> = forest
        .fold(|node, children: Vec<Option<TreeNode<Record>>>| {
            let children: Vec<TreeNode<Record>> = children.into_iter().flatten().collect();
            (matcher.matches(&node.record) || !children.is_empty())
                .then(|| TreeNode::new(node.record.clone(), children))
        })
        .into_iter()
        .flatten()
        .collect();
    let filtered = Forest::new(roots);

    debug!(
        query = %filter.query,
        kept = filtered.len(),
        total = forest.len(),
        "filtered forest"
    );

    Cow::Owned(filtered)
}
