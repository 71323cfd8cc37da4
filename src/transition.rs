//! Transition detection
//!
//! Compares the current sweep against the stored per-node health and
//! splits the fleet into newly-down and newly-recovered sets. A node's
//! first appearance is recorded without classification, so a host that
//! joins the fleet impaired never fires a spurious alert.

use crate::node::{self, NodeHealth, NodeKey, Transition};
use crate::patrol::{NodeObservation, Sweep};
use crate::state::PersistedState;
use std::collections::BTreeMap;

/// Rows of one group selected for a notification
#[derive(Debug, Clone, Default)]
pub struct GroupSlice {
    /// Selected observations, in sweep order
    pub rows: Vec<NodeObservation>,
    /// Number of selected rows with an issue
    pub issues: usize,
}

impl GroupSlice {
    pub fn push(&mut self, row: NodeObservation) {
        if row.is_issue {
            self.issues += 1;
        }
        self.rows.push(row);
    }
}

/// Newly-down and newly-recovered nodes, grouped
#[derive(Debug, Clone, Default)]
pub struct TransitionSet {
    /// Groups with nodes that just went down
    pub down: BTreeMap<String, GroupSlice>,
    /// Groups with nodes that just came back
    pub recovered: BTreeMap<String, GroupSlice>,
}

/// Classify every observed node against the stored state
///
/// The stored health is always overwritten with the observation,
/// whether or not a transition occurred.
pub fn detect(sweep: &Sweep, state: &mut PersistedState) -> TransitionSet {
    let mut set = TransitionSet::default();

    for group in &sweep.groups {
        for row in &group.rows {
            let key = NodeKey::new(&group.name, &row.name);
            let observed = NodeHealth::from_issue(row.is_issue);

            let Some(prev) = state.nodes.get(&key).copied() else {
                // First observation: learn the state, never alert.
                state.nodes.insert(key, observed);
                continue;
            };

            if let Some(transition) = node::classify(prev, observed) {
                let slot = match transition {
                    Transition::WentDown => &mut set.down,
                    Transition::Recovered => &mut set.recovered,
                };
                slot.entry(group.name.clone())
                    .or_default()
                    .push(row.clone());
            }

            state.nodes.insert(key, observed);
        }
    }

    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patrol::testutil::sweep_of;

    #[test]
    fn test_first_observation_never_alerts() {
        let mut state = PersistedState::default();
        let sweep = sweep_of(&[("G", &[("healthy", false), ("impaired", true)])]);

        let set = detect(&sweep, &mut state);

        assert!(set.down.is_empty());
        assert!(set.recovered.is_empty());
        assert_eq!(
            state.nodes.get(&NodeKey::new("G", "healthy")),
            Some(&NodeHealth::Up)
        );
        assert_eq!(
            state.nodes.get(&NodeKey::new("G", "impaired")),
            Some(&NodeHealth::Down)
        );
    }

    #[test]
    fn test_down_transition() {
        let mut state = PersistedState::default();
        state
            .nodes
            .insert(NodeKey::new("G", "n1"), NodeHealth::Up);

        let sweep = sweep_of(&[("G", &[("n1", true)])]);
        let set = detect(&sweep, &mut state);

        let slice = set.down.get("G").expect("n1 should be newly down");
        assert_eq!(slice.rows.len(), 1);
        assert_eq!(slice.rows[0].name, "n1");
        assert_eq!(slice.issues, 1);
        assert!(set.recovered.is_empty());
        assert_eq!(
            state.nodes.get(&NodeKey::new("G", "n1")),
            Some(&NodeHealth::Down)
        );
    }

    #[test]
    fn test_recovery_transition() {
        let mut state = PersistedState::default();
        state
            .nodes
            .insert(NodeKey::new("G", "n1"), NodeHealth::Down);

        let sweep = sweep_of(&[("G", &[("n1", false)])]);
        let set = detect(&sweep, &mut state);

        let slice = set.recovered.get("G").expect("n1 should have recovered");
        assert_eq!(slice.rows[0].name, "n1");
        assert_eq!(slice.issues, 0);
        assert!(set.down.is_empty());
        assert_eq!(
            state.nodes.get(&NodeKey::new("G", "n1")),
            Some(&NodeHealth::Up)
        );
    }

    #[test]
    fn test_unchanged_states_produce_nothing() {
        let mut state = PersistedState::default();
        state.nodes.insert(NodeKey::new("G", "up"), NodeHealth::Up);
        state
            .nodes
            .insert(NodeKey::new("G", "down"), NodeHealth::Down);

        let sweep = sweep_of(&[("G", &[("up", false), ("down", true)])]);
        let set = detect(&sweep, &mut state);

        assert!(set.down.is_empty());
        assert!(set.recovered.is_empty());
    }

    #[test]
    fn test_identical_rerun_is_quiet() {
        let mut state = PersistedState::default();
        let sweep = sweep_of(&[("G", &[("n1", true), ("n2", false)])]);

        // First run learns, second run sees no change.
        detect(&sweep, &mut state);
        let set = detect(&sweep, &mut state);

        assert!(set.down.is_empty());
        assert!(set.recovered.is_empty());
    }

    #[test]
    fn test_only_transitioning_node_is_selected() {
        let mut state = PersistedState::default();
        state.nodes.insert(NodeKey::new("G", "n1"), NodeHealth::Up);
        state.nodes.insert(NodeKey::new("G", "n2"), NodeHealth::Up);

        let sweep = sweep_of(&[("G", &[("n1", true), ("n2", false)])]);
        let set = detect(&sweep, &mut state);

        let slice = set.down.get("G").unwrap();
        assert_eq!(slice.rows.len(), 1);
        assert_eq!(slice.rows[0].name, "n1");
    }

    #[test]
    fn test_transitions_span_groups() {
        let mut state = PersistedState::default();
        state.nodes.insert(NodeKey::new("A", "n1"), NodeHealth::Up);
        state
            .nodes
            .insert(NodeKey::new("B", "n2"), NodeHealth::Down);

        let sweep = sweep_of(&[("A", &[("n1", true)]), ("B", &[("n2", false)])]);
        let set = detect(&sweep, &mut state);

        assert!(set.down.contains_key("A"));
        assert!(set.recovered.contains_key("B"));
    }
}
