//! Bounded, score-ordered working set shared by search and neighbour
//! selection.

use std::sync::Arc;

use super::node::Node;
use crate::score::{ScoreFunction, ScoreOperand};

/// A node paired with its score against the list's target.
#[derive(Clone, Debug)]
pub(crate) struct CandidateItem {
    pub(crate) node: Arc<Node>,
    pub(crate) score: f32,
}

/// Holds at most `max_length` candidates sorted ascending by score against a
/// fixed target, without duplicate ids.
///
/// Serves as the insertion-time neighbour pool (bounded by a layer's degree)
/// and as the query-time result pool (bounded by `k`).
#[derive(Debug)]
pub(crate) struct CandidateList<'a> {
    target: ScoreOperand<'a>,
    score: &'a dyn ScoreFunction,
    max_length: usize,
    items: Vec<CandidateItem>,
}

impl<'a> CandidateList<'a> {
    pub(crate) fn new(
        target: ScoreOperand<'a>,
        score: &'a dyn ScoreFunction,
        max_length: usize,
    ) -> Self {
        Self {
            target,
            score,
            max_length,
            items: Vec::with_capacity(max_length.saturating_add(1).min(1024)),
        }
    }

    /// Scores `node` against the target and inserts it in order. Nodes
    /// already present are ignored.
    pub(crate) fn add(&mut self, node: Arc<Node>) {
        if self.contains(&node) {
            return;
        }
        let score = self.score.score(node.operand(), self.target);
        self.insert_scored(node, score);
    }

    fn contains(&self, node: &Node) -> bool {
        self.items.iter().any(|item| item.node.id() == node.id())
    }

    fn insert_scored(&mut self, node: Arc<Node>, score: f32) {
        if self.items.len() >= self.max_length
            && self
                .items
                .last()
                .is_none_or(|worst| worst.score <= score)
        {
            return;
        }
        let position = self.items.partition_point(|item| item.score <= score);
        self.items.insert(position, CandidateItem { node, score });
        self.items.truncate(self.max_length);
    }

    #[cfg(test)]
    pub(crate) fn items(&self) -> &[CandidateItem] {
        &self.items
    }

    pub(crate) fn into_items(self) -> Vec<CandidateItem> {
        self.items
    }

    pub(crate) fn best(&self) -> Option<&CandidateItem> {
        self.items.first()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    #[cfg(test)]
    pub(crate) fn max_length(&self) -> usize {
        self.max_length
    }
}
