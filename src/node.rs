//! Node identity and health state machine
//!
//! Type-safe UP/DOWN state machine for node health using the
//! state-machines crate. Uses dynamic dispatch mode so transitions can
//! be driven from persisted state at runtime.

use std::fmt;

use state_machines::state_machine;

state_machine! {
    name: NodeMachine,
    dynamic: true,  // Enable runtime dispatch driven by observations
    initial: Up,
    states: [Up, Down],
    events {
        fail {
            transition: { from: Up, to: Down }
        }
        recover {
            transition: { from: Down, to: Up }
        }
    }
}

/// Composite key identifying a node within a group
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeKey {
    /// Group name
    pub group: String,
    /// Node name
    pub name: String,
}

impl NodeKey {
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
        }
    }

    /// Parse a key from its `group:name` state-file form
    ///
    /// The group part may not contain a colon; the node part may.
    pub fn parse(s: &str) -> Option<Self> {
        let (group, name) = s.split_once(':')?;
        if group.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self::new(group, name))
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.name)
    }
}

/// Simple health enum for external use (persisted as a bool: true = issue)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeHealth {
    Up,
    Down,
}

impl NodeHealth {
    /// Build from an observation's issue flag
    pub fn from_issue(is_issue: bool) -> Self {
        if is_issue { NodeHealth::Down } else { NodeHealth::Up }
    }

    /// State-file representation: true means the node has an issue
    pub fn is_issue(&self) -> bool {
        matches!(self, NodeHealth::Down)
    }
}

impl fmt::Display for NodeHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeHealth::Up => write!(f, "up"),
            NodeHealth::Down => write!(f, "down"),
        }
    }
}

/// A health transition between two consecutive observations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Previously up, now down
    WentDown,
    /// Previously down, now up
    Recovered,
}

/// Classify an observation against the stored health
///
/// Seeds a machine with the previous state and feeds it the event the
/// observation implies. A rejected event means the node is already in
/// the observed state, so there is nothing to report.
pub fn classify(prev: NodeHealth, observed: NodeHealth) -> Option<Transition> {
    let mut machine = NodeMachine::new(()).into_dynamic();
    if prev == NodeHealth::Down && machine.handle(NodeMachineEvent::Fail).is_err() {
        return None;
    }

    let event = match observed {
        NodeHealth::Down => NodeMachineEvent::Fail,
        NodeHealth::Up => NodeMachineEvent::Recover,
    };

    match machine.handle(event) {
        Ok(()) => Some(match observed {
            NodeHealth::Down => Transition::WentDown,
            NodeHealth::Up => Transition::Recovered,
        }),
        Err(_) => None,
    }
}
