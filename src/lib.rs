#![forbid(unsafe_code)]

pub mod config;
pub mod errors;
pub mod models;
pub mod orchestrator;
pub mod provider;
pub mod viewer;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
