//! Global configuration parsing, validation, and credential loading.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{info, warn};

use crate::{AppError, Result};

/// Keychain service name used for the room provider API key.
pub const KEYRING_SERVICE: &str = "agent-duet";

/// Environment variable carrying the room provider API key.
pub const ROOM_API_KEY_ENV: &str = "DAILY_API_KEY";

/// Environment variable overriding the session duration.
pub const DURATION_ENV: &str = "CONVERSATION_DURATION";

/// Environment variable overriding the conversation topic.
pub const TOPIC_ENV: &str = "CONVERSATION_TOPIC";

/// Session timing and topic settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SessionConfig {
    /// Session time budget in seconds; zero or negative runs until both
    /// agents exit on their own.
    #[serde(default = "default_duration_seconds")]
    pub duration_seconds: i64,
    /// Free-text conversation topic handed to both agents.
    #[serde(default = "default_topic")]
    pub topic: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration_seconds: default_duration_seconds(),
            topic: default_topic(),
        }
    }
}

fn default_duration_seconds() -> i64 {
    180
}

fn default_topic() -> String {
    "enterprise software sales".into()
}

/// Room provider connectivity.
///
/// The API key is loaded at runtime via OS keychain or environment
/// variable, never from the TOML file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct RoomConfig {
    /// Base URL of the provider REST API.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Extra room lifetime beyond the session duration.
    #[serde(default = "default_expiry_margin")]
    pub expiry_margin_seconds: u64,
    /// Per-request timeout for provider calls.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Provider API key (populated at runtime).
    #[serde(skip)]
    pub api_key: String,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            expiry_margin_seconds: default_expiry_margin(),
            request_timeout_seconds: default_request_timeout(),
            api_key: String::new(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.daily.co/v1".into()
}

fn default_expiry_margin() -> u64 {
    420
}

fn default_request_timeout() -> u64 {
    15
}

/// Launch settings for one agent program.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct AgentConfig {
    /// Display name used in logs.
    pub name: String,
    /// Executable to run (e.g., `python3`).
    pub program: String,
    /// Arguments placed before `--room-url` and `--token`.
    #[serde(default)]
    pub args: Vec<String>,
}

/// Both agent roles plus the backend credentials they need.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct AgentsConfig {
    /// Agent that joins the room first.
    #[serde(default = "default_first_agent")]
    pub first: AgentConfig,
    /// Agent that joins after the stagger delay.
    #[serde(default = "default_second_agent")]
    pub second: AgentConfig,
    /// Environment variables that must be present before anything starts.
    #[serde(default = "default_required_env")]
    pub required_env: Vec<String>,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            first: default_first_agent(),
            second: default_second_agent(),
            required_env: default_required_env(),
        }
    }
}

fn default_first_agent() -> AgentConfig {
    AgentConfig {
        name: "sarah".into(),
        program: "python3".into(),
        args: vec!["sarah.py".into()],
    }
}

fn default_second_agent() -> AgentConfig {
    AgentConfig {
        name: "mike".into(),
        program: "python3".into(),
        args: vec!["mike.py".into()],
    }
}

fn default_required_env() -> Vec<String> {
    vec!["OPENAI_API_KEY".into(), "ELEVENLABS_API_KEY".into()]
}

/// Local viewer page settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ViewerConfig {
    /// Directory served by the asset server.
    #[serde(default = "default_viewer_root")]
    pub root: PathBuf,
    /// Local port for the asset server.
    #[serde(default = "default_viewer_port")]
    pub port: u16,
    /// Page opened in the browser, relative to `root`.
    #[serde(default = "default_viewer_page")]
    pub page: String,
    /// Whether to open a browser once the room is ready.
    #[serde(default = "default_true")]
    pub open_browser: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            root: default_viewer_root(),
            port: default_viewer_port(),
            page: default_viewer_page(),
            open_browser: true,
        }
    }
}

fn default_viewer_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_viewer_port() -> u16 {
    8765
}

fn default_viewer_page() -> String {
    "playground.html".into()
}

fn default_true() -> bool {
    true
}

/// Teardown behavior.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ShutdownConfig {
    /// Seconds each agent gets to exit after the stop signal.
    #[serde(default = "default_grace_seconds")]
    pub grace_seconds: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            grace_seconds: default_grace_seconds(),
        }
    }
}

fn default_grace_seconds() -> u64 {
    10
}

/// Global configuration, optionally parsed from `config.toml`.
///
/// Every section has defaults so the orchestrator runs without a file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Topic and time budget.
    #[serde(default)]
    pub session: SessionConfig,
    /// Room provider settings.
    #[serde(default)]
    pub room: RoomConfig,
    /// Agent programs.
    #[serde(default)]
    pub agents: AgentsConfig,
    /// Viewer asset server and browser launch.
    #[serde(default)]
    pub viewer: ViewerConfig,
    /// Teardown grace period.
    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `CONVERSATION_DURATION` / `CONVERSATION_TOPIC` from the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the duration is not an integer.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| env::var(key).ok())
    }

    /// Apply session overrides from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the duration is not an integer.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(raw) = lookup(DURATION_ENV) {
            self.session.duration_seconds = raw.trim().parse().map_err(|err| {
                AppError::Config(format!("{DURATION_ENV} must be an integer: {err}"))
            })?;
        }
        if let Some(topic) = lookup(TOPIC_ENV).filter(|t| !t.trim().is_empty()) {
            self.session.topic = topic;
        }
        self.validate()
    }

    /// Load the room provider API key from OS keychain with env-var fallback.
    ///
    /// A missing key is not an error here; [`Self::validate_credentials`]
    /// reports it before the session creates anything.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the keychain task panics.
    pub async fn load_credentials(&mut self) -> Result<()> {
        if let Some(key) = load_credential("daily_api_key", ROOM_API_KEY_ENV).await? {
            self.room.api_key = key;
        }
        Ok(())
    }

    /// Verify every external credential the session depends on is present.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` naming the first missing credential.
    pub fn validate_credentials(&self) -> Result<()> {
        self.validate_credentials_with(|key| env::var(key).ok())
    }

    /// Credential check against an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` naming the first missing credential.
    pub fn validate_credentials_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<()> {
        if self.room.api_key.trim().is_empty() {
            return Err(AppError::Config(format!(
                "missing {ROOM_API_KEY_ENV}; set it in .env.local or the OS keychain"
            )));
        }
        for key in &self.agents.required_env {
            if lookup(key).is_none_or(|value| value.trim().is_empty()) {
                return Err(AppError::Config(format!(
                    "missing {key}; set it in .env.local"
                )));
            }
        }
        Ok(())
    }

    /// Grace period granted to each agent on teardown.
    #[must_use]
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.shutdown.grace_seconds)
    }

    fn validate(&self) -> Result<()> {
        if self.session.topic.trim().is_empty() {
            return Err(AppError::Config("session.topic must not be empty".into()));
        }

        for agent in [&self.agents.first, &self.agents.second] {
            if agent.program.trim().is_empty() {
                return Err(AppError::Config(format!(
                    "agent {} has an empty program",
                    agent.name
                )));
            }
        }

        if self.viewer.page.trim().is_empty() {
            return Err(AppError::Config("viewer.page must not be empty".into()));
        }

        if self.shutdown.grace_seconds == 0 {
            return Err(AppError::Config(
                "shutdown.grace_seconds must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}

/// Load `.env.local` into the process environment. Values from the file
/// replace variables already set in the shell.
pub fn load_dotenv(path: impl AsRef<Path>) {
    let path = path.as_ref();
    match dotenvy::from_path_override(path) {
        Ok(()) => info!(path = %path.display(), "loaded environment file"),
        Err(err) if err.not_found() => {}
        Err(err) => warn!(path = %path.display(), %err, "failed to load environment file"),
    }
}

/// Load a single credential from OS keychain with env-var fallback.
async fn load_credential(keyring_key: &str, env_key: &str) -> Result<Option<String>> {
    let key = keyring_key.to_owned();

    // keyring is synchronous I/O.
    let keychain_result = tokio::task::spawn_blocking(move || {
        keyring::Entry::new(KEYRING_SERVICE, &key).and_then(|entry| entry.get_password())
    })
    .await
    .map_err(|err| AppError::Config(format!("keychain task panicked: {err}")))?;

    match keychain_result {
        Ok(value) if !value.is_empty() => return Ok(Some(value)),
        Ok(_) => {
            warn!(key = keyring_key, "keychain entry is empty, trying env var");
        }
        Err(keyring::Error::NoEntry) => {}
        Err(err) => {
            warn!(
                key = keyring_key,
                ?err,
                "keychain lookup failed, trying env var"
            );
        }
    }

    Ok(env::var(env_key).ok().filter(|value| !value.trim().is_empty()))
}
