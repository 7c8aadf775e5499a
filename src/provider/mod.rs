//! Room provisioning: one time-boxed room and three scoped tokens.
//!
//! The [`RoomProvider`] trait is the seam between the lifecycle controller
//! and the hosted room service. [`provision`] drives it with the
//! all-or-nothing policy: a session either gets a room plus every token, or
//! a `Provisioning` error and nothing to launch with.

pub mod daily;

use std::future::Future;
use std::pin::Pin;

use chrono::Utc;
use tracing::{info, info_span, Instrument};

use crate::models::room::{AccessToken, Room, RoomCredentials};
use crate::{AppError, Result};

/// Lifetime basis used when the session has no fixed duration.
pub const UNBOUNDED_LIFETIME_BASIS_SECONDS: u64 = 180;

/// Remote service that hosts rooms and issues join tokens.
pub trait RoomProvider: Send + Sync {
    /// Create a room that expires at `expires_at` (unix seconds).
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Provisioning`] if the provider is unreachable or
    /// rejects the request.
    fn create_room(&self, expires_at: i64) -> Pin<Box<dyn Future<Output = Result<Room>> + Send + '_>>;

    /// Mint one participant token scoped to `room`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Provisioning`] if the provider is unreachable or
    /// rejects the request.
    fn mint_token<'a>(
        &'a self,
        room: &'a Room,
    ) -> Pin<Box<dyn Future<Output = Result<AccessToken>> + Send + 'a>>;
}

/// Absolute room expiry for a session of `duration_seconds` starting at `now`.
///
/// The room always outlives the planned session by `margin_seconds`.
#[must_use]
pub fn room_expiry(now: i64, duration_seconds: i64, margin_seconds: u64) -> i64 {
    let basis = u64::try_from(duration_seconds)
        .ok()
        .filter(|d| *d > 0)
        .unwrap_or(UNBOUNDED_LIFETIME_BASIS_SECONDS);
    let lifetime = i64::try_from(basis.saturating_add(margin_seconds)).unwrap_or(i64::MAX);
    now.saturating_add(lifetime)
}

/// Create the session room and mint first-agent, second-agent, and viewer
/// tokens, in that order.
///
/// A single attempt is made for each call; the first failure aborts.
///
/// # Errors
///
/// Returns [`AppError::Provisioning`] if the room or any token cannot be
/// created.
pub async fn provision(
    provider: &dyn RoomProvider,
    topic: &str,
    duration_seconds: i64,
    margin_seconds: u64,
) -> Result<RoomCredentials> {
    let span = info_span!("provision", topic, duration_seconds);
    async move {
        let expires_at = room_expiry(Utc::now().timestamp(), duration_seconds, margin_seconds);
        let room = provider.create_room(expires_at).await?;
        info!(room_url = %room.url, expires_at, "room created");

        let first_agent = mint(provider, &room, "first agent").await?;
        let second_agent = mint(provider, &room, "second agent").await?;
        let viewer = mint(provider, &room, "viewer").await?;
        info!("participant tokens minted");

        Ok(RoomCredentials {
            room,
            first_agent,
            second_agent,
            viewer,
        })
    }
    .instrument(span)
    .await
}

async fn mint(provider: &dyn RoomProvider, room: &Room, participant: &str) -> Result<AccessToken> {
    provider.mint_token(room).await.map_err(|err| match err {
        AppError::Provisioning(msg) => {
            AppError::Provisioning(format!("token for {participant}: {msg}"))
        }
        other => other,
    })
}
