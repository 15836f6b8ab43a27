//! Reportbell configuration system.

use chrono::{FixedOffset, Offset};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BotConfig {
    #[serde(default)]
    pub slack: SlackConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

impl BotConfig {
    /// Load config from the default path (~/.reportbell/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::error::ReportbellError::Config(format!("Failed to read config: {e}"))
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            crate::error::ReportbellError::Config(format!("Failed to parse config: {e}"))
        })?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| {
            crate::error::ReportbellError::Config(format!("Failed to serialize config: {e}"))
        })?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Reportbell home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".reportbell")
    }

    /// Apply environment variable overrides (token and channel come from the
    /// deployment environment, never from the config file checked into a repo).
    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("SLACK_APP_TOKEN") {
            if !token.is_empty() {
                self.slack.token = token;
            }
        }
        if let Ok(channel) = std::env::var("SLACK_CHANNEL_ID") {
            if !channel.is_empty() {
                self.slack.channel_id = channel;
            }
        }
    }
}

/// Slack channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    /// Bot token (pre-shared credential, usually from SLACK_APP_TOKEN).
    #[serde(default)]
    pub token: String,
    /// Target channel ID (usually from SLACK_CHANNEL_ID).
    #[serde(default)]
    pub channel_id: String,
    /// API base URL — overridable for tests.
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_api_base() -> String {
    "https://slack.com/api".into()
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            channel_id: String::new(),
            api_base: default_api_base(),
        }
    }
}

/// Store (SQLite) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database file path.
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// Location → responsible user pairs seeded by `--init-db`.
    #[serde(default)]
    pub seed_assignments: Vec<SeedAssignment>,
}

fn default_db_path() -> String {
    "~/.reportbell/reports.db".into()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            seed_assignments: Vec::new(),
        }
    }
}

/// One seeded assignment row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedAssignment {
    pub location: String,
    pub user_id: String,
}

/// Daily trigger times, all in the bot's fixed timezone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// When to post the daily report form ("HH:MM").
    #[serde(default = "default_form_at")]
    pub form_at: String,
    /// When to remind users who have not submitted yet.
    #[serde(default = "default_reminder_at")]
    pub reminder_at: String,
    /// When to post the completion status report.
    #[serde(default = "default_status_at")]
    pub status_at: String,
    /// Human-readable deadline shown in reminder messages.
    #[serde(default = "default_deadline_text")]
    pub deadline_text: String,
    /// Fixed timezone as minutes east of UTC. Default 330 = IST (+05:30).
    #[serde(default = "default_utc_offset")]
    pub utc_offset_minutes: i32,
}

fn default_form_at() -> String {
    "00:01".into()
}
fn default_reminder_at() -> String {
    "07:00".into()
}
fn default_status_at() -> String {
    "08:30".into()
}
fn default_deadline_text() -> String {
    "8:00 AM".into()
}
fn default_utc_offset() -> i32 {
    330
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            form_at: default_form_at(),
            reminder_at: default_reminder_at(),
            status_at: default_status_at(),
            deadline_text: default_deadline_text(),
            utc_offset_minutes: default_utc_offset(),
        }
    }
}

impl ScheduleConfig {
    /// The fixed timezone the whole schedule runs in.
    pub fn offset(&self) -> FixedOffset {
        match FixedOffset::east_opt(self.utc_offset_minutes * 60) {
            Some(offset) => offset,
            None => {
                tracing::warn!(
                    "⚠️ Invalid utc_offset_minutes {}, falling back to UTC",
                    self.utc_offset_minutes
                );
                chrono::Utc.fix()
            }
        }
    }
}

/// Loop/process tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Sleep after a loop-level action error before resuming polling.
    #[serde(default = "default_backoff")]
    pub error_backoff_secs: u64,
    /// PID marker written while the bot runs.
    #[serde(default = "default_pid_file")]
    pub pid_file: String,
}

fn default_backoff() -> u64 {
    60
}
fn default_pid_file() -> String {
    "~/.reportbell/reportbell.pid".into()
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            error_backoff_secs: default_backoff(),
            pid_file: default_pid_file(),
        }
    }
}
