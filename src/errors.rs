//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all orchestration failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing, validation, or missing credential.
    Config(String),
    /// Room creation or token minting failure at the room provider.
    Provisioning(String),
    /// Agent process could not be spawned.
    Launch(String),
    /// An agent process did not exit within its grace period.
    ShutdownTimeout(String),
    /// Viewer asset server bind or serve failure.
    Server(String),
    /// File-system or I/O operation failure.
    Io(String),
}

impl AppError {
    /// Process exit code the orchestrator reports for this error.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::Provisioning(_) => 3,
            Self::Launch(_) => 4,
            Self::ShutdownTimeout(_) => 5,
            Self::Server(_) | Self::Io(_) => 1,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Provisioning(msg) => write!(f, "provisioning: {msg}"),
            Self::Launch(msg) => write!(f, "launch: {msg}"),
            Self::ShutdownTimeout(msg) => write!(f, "shutdown timeout: {msg}"),
            Self::Server(msg) => write!(f, "server: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        Self::Provisioning(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
