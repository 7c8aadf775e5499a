//! Room and access-token models.

use std::fmt::{Debug, Formatter};

use serde::{Deserialize, Serialize};

/// A provider-hosted real-time room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Room {
    /// Provider-assigned room name.
    pub name: String,
    /// Join URL handed to agents and the viewer.
    pub url: String,
    /// Absolute expiry as unix seconds.
    pub expires_at: i64,
}

/// Opaque role-scoped credential for joining a [`Room`].
///
/// The value is never inspected and never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a provider-issued token.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Raw token value for passing to a participant.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl Debug for AccessToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// The room plus exactly one token per participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomCredentials {
    /// The provisioned room.
    pub room: Room,
    /// Token for the agent that joins first.
    pub first_agent: AccessToken,
    /// Token for the agent that joins second.
    pub second_agent: AccessToken,
    /// Token for the browser viewer.
    pub viewer: AccessToken,
}
