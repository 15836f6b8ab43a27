//! # Reportbell Core
//! Shared error type and configuration for the Reportbell bot.

pub mod config;
pub mod error;

pub use config::BotConfig;
pub use error::{ReportbellError, Result};
