//! Agent process roles and lifecycle state.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Which seat an agent occupies in the two-party conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    /// Joins the room first and establishes presence.
    FirstAgent,
    /// Joins after the stagger delay.
    SecondAgent,
}

impl Display for AgentRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FirstAgent => f.write_str("first_agent"),
            Self::SecondAgent => f.write_str("second_agent"),
        }
    }
}

/// Lifecycle state of a supervised agent process.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    /// OS process created.
    Spawned,
    /// Observed alive after spawn.
    Running,
    /// Stop signal sent, waiting for exit.
    Terminating,
    /// Process has exited.
    Exited,
}

impl AgentState {
    /// Whether the process may still be alive.
    #[must_use]
    pub fn is_live(self) -> bool {
        !matches!(self, Self::Exited)
    }
}
