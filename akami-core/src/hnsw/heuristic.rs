//! Diversity-preserving neighbour selection.

use super::candidates::{CandidateItem, CandidateList};
use crate::score::ScoreFunction;

/// Selects up to `m` candidates, skipping any candidate that sits closer to
/// an already-selected candidate than to the target.
///
/// Candidates are visited best first. A list shorter than `m` is returned
/// unchanged.
pub(crate) fn filter_candidates_by_heuristic(
    candidates: CandidateList<'_>,
    m: usize,
    score: &dyn ScoreFunction,
) -> Vec<CandidateItem> {
    let items = candidates.into_items();
    if items.len() < m {
        return items;
    }
    let mut selected: Vec<CandidateItem> = Vec::with_capacity(m);
    for candidate in items {
        if selected.len() >= m {
            break;
        }
        let shadowed = selected.iter().any(|kept| {
            score.score(kept.node.operand(), candidate.node.operand()) < candidate.score
        });
        if !shadowed {
            selected.push(candidate);
        }
    }
    selected
}
