//! Persisted engine state.

use serde::{Deserialize, Serialize};

use super::types::NodeId;

/// Global facts about the graph, persisted under
/// [`crate::storage::STATE_KEY`].
///
/// `entrypoint_id` and `max_level` are set exactly when the index holds at
/// least one node. `dimensions` is fixed by the first successful insertion.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineState {
    /// Highest layer occupied by any node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_level: Option<usize>,
    /// A node occupying [`EngineState::max_level`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint_id: Option<NodeId>,
    /// Width shared by every stored vector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<usize>,
}

impl EngineState {
    /// Whether the graph holds no nodes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entrypoint_id.is_none()
    }

    /// Promotes `id` to entry point when `level` exceeds the current maximum
    /// (or the graph is empty). Returns whether the state changed.
    pub(crate) fn promote(&mut self, id: NodeId, level: usize) -> bool {
        let promote = match (self.entrypoint_id, self.max_level) {
            (Some(_), Some(max_level)) => level > max_level,
            _ => true,
        };
        if promote {
            self.entrypoint_id = Some(id);
            self.max_level = Some(level);
        }
        promote
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn serialises_with_camel_case_names() {
        let state = EngineState {
            max_level: Some(2),
            entrypoint_id: Some(NodeId::new(9)),
            dimensions: Some(3),
        };
        let json = serde_json::to_string(&state).expect("state must serialise");
        assert_eq!(json, r#"{"maxLevel":2,"entrypointId":9,"dimensions":3}"#);
    }

    #[rstest]
    #[case(None, 0, true)]
    #[case(Some(2), 1, false)]
    #[case(Some(2), 2, false)]
    #[case(Some(2), 3, true)]
    fn promotes_only_higher_levels(
        #[case] current: Option<usize>,
        #[case] level: usize,
        #[case] expected: bool,
    ) {
        let mut state = EngineState {
            max_level: current,
            entrypoint_id: current.map(|_| NodeId::new(1)),
            dimensions: Some(2),
        };
        assert_eq!(state.promote(NodeId::new(5), level), expected);
        if expected {
            assert_eq!(state.entrypoint_id, Some(NodeId::new(5)));
            assert_eq!(state.max_level, Some(level));
        }
    }
}
