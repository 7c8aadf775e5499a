//! Daily REST API implementation of [`RoomProvider`].

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::RoomProvider;
use crate::config::{RoomConfig, ROOM_API_KEY_ENV};
use crate::models::room::{AccessToken, Room};
use crate::{AppError, Result};

/// Maximum number of response-body characters echoed into an error.
const ERROR_BODY_LIMIT: usize = 200;

#[derive(Debug, Serialize)]
struct CreateRoomRequest {
    properties: RoomProperties,
}

#[derive(Debug, Serialize)]
struct RoomProperties {
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct CreateRoomResponse {
    name: String,
    url: String,
}

#[derive(Debug, Serialize)]
struct MeetingTokenRequest<'a> {
    properties: MeetingTokenProperties<'a>,
}

#[derive(Debug, Serialize)]
struct MeetingTokenProperties<'a> {
    room_name: &'a str,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct MeetingTokenResponse {
    token: String,
}

/// HTTP client for the Daily room API.
#[derive(Debug, Clone)]
pub struct DailyProvider {
    client: Client,
    api_base: String,
    api_key: String,
}

impl DailyProvider {
    /// Build a provider from the room configuration.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the API key is absent, before any
    /// request is made.
    pub fn new(config: &RoomConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(AppError::Config(format!(
                "missing {ROOM_API_KEY_ENV}; cannot call the room provider"
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|err| AppError::Config(format!("failed to build http client: {err}")))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.api_base)
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = self.endpoint(path);
        debug!(%url, "room provider request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|err| AppError::Provisioning(format!("{path}: provider unreachable: {err}")))?;

        let response = ensure_success(path, response).await?;
        response
            .json::<R>()
            .await
            .map_err(|err| AppError::Provisioning(format!("{path}: malformed response: {err}")))
    }
}

async fn ensure_success(path: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let excerpt: String = body.chars().take(ERROR_BODY_LIMIT).collect();
    Err(AppError::Provisioning(format!(
        "{path}: provider returned {status}: {excerpt}"
    )))
}

impl RoomProvider for DailyProvider {
    fn create_room(&self, expires_at: i64) -> Pin<Box<dyn Future<Output = Result<Room>> + Send + '_>> {
        Box::pin(async move {
            let request = CreateRoomRequest {
                properties: RoomProperties { exp: expires_at },
            };
            let created: CreateRoomResponse = self.post_json("rooms", &request).await?;
            Ok(Room {
                name: created.name,
                url: created.url,
                expires_at,
            })
        })
    }

    fn mint_token<'a>(
        &'a self,
        room: &'a Room,
    ) -> Pin<Box<dyn Future<Output = Result<AccessToken>> + Send + 'a>> {
        Box::pin(async move {
            let request = MeetingTokenRequest {
                properties: MeetingTokenProperties {
                    room_name: &room.name,
                    exp: room.expires_at,
                },
            };
            let minted: MeetingTokenResponse = self.post_json("meeting-tokens", &request).await?;
            if minted.token.is_empty() {
                return Err(AppError::Provisioning(
                    "meeting-tokens: provider returned an empty token".into(),
                ));
            }
            Ok(AccessToken::new(minted.token))
        })
    }
}
