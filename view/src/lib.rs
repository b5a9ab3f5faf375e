//! Presentation state over a chart forest: filtering that keeps ancestor
//! context, expand/collapse membership, and the rows a renderer walks.
//!
//! The forest is never mutated here. Filtering yields a new (or borrowed)
//! forest; expansion lives in a separate set keyed by record id.

mod filter;
mod render;
mod state;

pub use crate::filter::{Searchable, TreeFilter, apply_filter};
pub use crate::render::Render;
pub use crate::state::{TreeRow, TreeViewState};
