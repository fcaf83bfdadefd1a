//! Configuration management
//!
//! This module provides YAML-based configuration management with support for:
//! - Environment variable overrides
//! - Multiple configuration file locations
//! - Default values for all settings

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::utils::AppError;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Alert evaluation and notification dispatch settings
    #[serde(default)]
    pub alerting: AlertingConfig,
    /// Outbound SMTP transport for the email channel (optional)
    #[serde(default)]
    pub smtp: Option<SmtpConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log output target (console or file)
    #[serde(default = "default_log_target")]
    pub target: LogTarget,
    /// Directory for log files (used when target is "file")
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Log file name prefix
    #[serde(default = "default_log_prefix")]
    pub log_prefix: String,
    /// Enable daily log rotation
    #[serde(default = "default_log_rotation")]
    pub daily_rotation: bool,
}

/// Log output target
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    /// Log to console (stdout/stderr) - default for development
    #[default]
    Console,
    /// Log to file with optional rotation - recommended for production
    File,
    /// Log to both console and file
    Both,
}

/// Alert engine configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AlertingConfig {
    /// Whether the background evaluation scheduler runs at all
    #[serde(default = "default_alerting_enabled")]
    pub enabled: bool,
    /// Cron expression driving evaluation passes (second-field format,
    /// minute granularity: "0 * * * * *" fires once a minute)
    #[serde(default = "default_alerting_schedule")]
    pub schedule: String,
    /// Fallback dedup lookback in minutes when an alert does not declare
    /// its own recent_minutes window
    #[serde(default = "default_dedup_window")]
    pub dedup_window_minutes: i64,
}

/// SMTP transport configuration for the email channel
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    pub from: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_database_url() -> String {
    "sqlite://./data/buildboard.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_target() -> LogTarget {
    LogTarget::Console
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("./logs")
}

fn default_log_prefix() -> String {
    "buildboard".to_string()
}

fn default_log_rotation() -> bool {
    true
}

fn default_alerting_enabled() -> bool {
    true
}

fn default_alerting_schedule() -> String {
    "0 * * * * *".to_string()
}

fn default_dedup_window() -> i64 {
    60
}

fn default_smtp_port() -> u16 {
    587
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            target: default_log_target(),
            log_dir: default_log_dir(),
            log_prefix: default_log_prefix(),
            daily_rotation: default_log_rotation(),
        }
    }
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            enabled: default_alerting_enabled(),
            schedule: default_alerting_schedule(),
            dedup_window_minutes: default_dedup_window(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
            alerting: AlertingConfig::default(),
            smtp: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values
    /// 2. Configuration file (YAML)
    /// 3. Environment variables (prefixed with BUILDBOARD_)
    pub fn load() -> Result<Self> {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        // Check for config path override from environment
        let config_path = std::env::var("BUILDBOARD_CONFIG")
            .map(PathBuf::from)
            .ok()
            .or_else(Self::find_config_file);

        let mut config = if let Some(ref path) = config_path {
            if path.exists() {
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {:?}", path))?;
                serde_norway::from_str(&contents)
                    .with_context(|| format!("Failed to parse config file: {:?}", path))?
            } else {
                eprintln!("[CONFIG] Config path set but file not found: {:?}", path);
                AppConfig::default()
            }
        } else {
            AppConfig::default()
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Find the configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let paths = [
            PathBuf::from("config.yaml"),
            PathBuf::from("config/config.yaml"),
            PathBuf::from("/etc/buildboard/config.yaml"),
        ];

        paths.into_iter().find(|p| p.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("BUILDBOARD_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("BUILDBOARD_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Ok(url) = std::env::var("BUILDBOARD_DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(level) = std::env::var("BUILDBOARD_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(enabled) = std::env::var("BUILDBOARD_ALERTING_ENABLED") {
            self.alerting.enabled = enabled.to_lowercase() == "true";
        }
        if let Ok(schedule) = std::env::var("BUILDBOARD_ALERTING_SCHEDULE") {
            self.alerting.schedule = schedule;
        }
    }

    /// Validate the configuration
    fn validate(&self) -> std::result::Result<(), AppError> {
        if self.database.url.is_empty() {
            return Err(AppError::Config("database.url must not be empty".to_string()));
        }
        if self.alerting.dedup_window_minutes <= 0 {
            return Err(AppError::Config(
                "alerting.dedup_window_minutes must be positive".to_string(),
            ));
        }
        crate::services::scheduler::validate_cron_expression(&self.alerting.schedule)
            .map_err(|e| AppError::Config(format!("alerting.schedule: {}", e)))?;
        if let Some(ref smtp) = self.smtp {
            if smtp.host.is_empty() {
                return Err(AppError::Config(
                    "smtp.host must not be empty when smtp is configured".to_string(),
                ));
            }
            if smtp.from.is_empty() {
                return Err(AppError::Config(
                    "smtp.from must not be empty when smtp is configured".to_string(),
                ));
            }
        }
        Ok(())
    }
}
