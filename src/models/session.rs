//! Session model and lifecycle helpers.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppError, Result};

/// Lifecycle phase of the orchestrated session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Session constructed, nothing started.
    Idle,
    /// Asset server up, room and tokens being created.
    Provisioning,
    /// Agent processes being spawned.
    Launching,
    /// Both agents running; time budget in effect.
    Running,
    /// Terminating agents and stopping the asset server.
    ShuttingDown,
    /// Terminal phase.
    Stopped,
}

/// How long the session is allowed to run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TimeBudget {
    /// Stop after a fixed wall-clock duration regardless of agent state.
    Bounded(Duration),
    /// Run until both agents have exited.
    Unbounded,
}

impl TimeBudget {
    /// Derive a budget from a signed second count; zero or negative is
    /// unbounded.
    #[must_use]
    pub fn from_seconds(seconds: i64) -> Self {
        u64::try_from(seconds)
            .ok()
            .filter(|s| *s > 0)
            .map_or(Self::Unbounded, |s| Self::Bounded(Duration::from_secs(s)))
    }
}

/// Top-level orchestration unit for one run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Session {
    /// Unique identifier for log correlation.
    pub id: String,
    /// Conversation topic handed to the agents.
    pub topic: String,
    /// Configured duration in seconds; `<= 0` means unbounded.
    pub duration_seconds: i64,
    /// Room URL, set once provisioning succeeds.
    pub room_url: Option<String>,
    /// Session start timestamp.
    pub started_at: DateTime<Utc>,
    /// Current lifecycle phase.
    pub phase: SessionPhase,
}

impl Session {
    /// Construct a new idle session with a generated identifier.
    #[must_use]
    pub fn new(topic: String, duration_seconds: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            topic,
            duration_seconds,
            room_url: None,
            started_at: Utc::now(),
            phase: SessionPhase::Idle,
        }
    }

    /// Budget derived from `duration_seconds`.
    #[must_use]
    pub fn time_budget(&self) -> TimeBudget {
        TimeBudget::from_seconds(self.duration_seconds)
    }

    /// Determine whether a lifecycle transition is permitted.
    #[must_use]
    pub fn can_transition_to(&self, next: SessionPhase) -> bool {
        matches!(
            (self.phase, next),
            (SessionPhase::Idle, SessionPhase::Provisioning | SessionPhase::Stopped)
                | (SessionPhase::Provisioning, SessionPhase::Launching)
                | (SessionPhase::Launching, SessionPhase::Running)
                | (
                    SessionPhase::Provisioning | SessionPhase::Launching | SessionPhase::Running,
                    SessionPhase::ShuttingDown
                )
                | (SessionPhase::ShuttingDown, SessionPhase::Stopped)
        )
    }

    /// Move to `next`, rejecting edges the state machine does not allow.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the transition is not permitted.
    pub fn advance(&mut self, next: SessionPhase) -> Result<()> {
        if !self.can_transition_to(next) {
            return Err(AppError::Config(format!(
                "illegal session transition {:?} -> {next:?}",
                self.phase
            )));
        }
        self.phase = next;
        Ok(())
    }
}

/// How a session ended when no fatal error occurred.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
    /// The bounded time budget elapsed.
    TimeBudgetReached,
    /// Both agents exited on their own.
    AgentsExited,
    /// An operator interrupt cut the session short.
    Cancelled,
}
