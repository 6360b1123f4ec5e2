use serde::Deserialize;

use crate::retention::RetentionWorkerConfig;
use crate::usage_log::FetchPolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_pool_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetentionConfig {
    #[serde(default = "default_enable_purge")]
    pub enable_purge: bool,
    /// Snapshots older than this many days are purged.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    #[serde(default = "default_purge_interval_secs")]
    pub purge_interval_secs: u64,
    /// Cron expression (local time) for VACUUM; overrides vacuum_interval_secs.
    #[serde(default)]
    pub vacuum_schedule: Option<String>,
    #[serde(default = "default_vacuum_interval_secs")]
    pub vacuum_interval_secs: u64,
}

fn default_enable_purge() -> bool {
    true
}

fn default_retention_days() -> u32 {
    90
}

fn default_purge_interval_secs() -> u64 {
    3600
}

fn default_vacuum_interval_secs() -> u64 {
    86_400
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            enable_purge: default_enable_purge(),
            retention_days: default_retention_days(),
            purge_interval_secs: default_purge_interval_secs(),
            vacuum_schedule: None,
            vacuum_interval_secs: default_vacuum_interval_secs(),
        }
    }
}

impl From<&RetentionConfig> for RetentionWorkerConfig {
    fn from(c: &RetentionConfig) -> Self {
        Self {
            purge_interval_secs: c.purge_interval_secs,
            retention_days: c.retention_days,
            vacuum_schedule: c.vacuum_schedule.clone(),
            vacuum_interval_secs: c.vacuum_interval_secs,
        }
    }
}

/// Shape of the main report query; see `FetchPolicy`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_fetch_margin_multiplier")]
    pub fetch_margin_multiplier: i64,
    #[serde(default)]
    pub min_fetch_margin_ms: i64,
    #[serde(default)]
    pub include_anchor_snapshot: bool,
}

fn default_fetch_margin_multiplier() -> i64 {
    2
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            fetch_margin_multiplier: default_fetch_margin_multiplier(),
            min_fetch_margin_ms: 0,
            include_anchor_snapshot: false,
        }
    }
}

impl From<&ReportConfig> for FetchPolicy {
    fn from(c: &ReportConfig) -> Self {
        Self {
            margin_multiplier: c.fetch_margin_multiplier,
            min_margin_ms: c.min_fetch_margin_ms,
            include_anchor: c.include_anchor_snapshot,
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        if self.retention.enable_purge {
            anyhow::ensure!(
                self.retention.retention_days > 0,
                "retention.retention_days must be > 0 when purge is enabled, got {}",
                self.retention.retention_days
            );
            anyhow::ensure!(
                self.retention.purge_interval_secs > 0,
                "retention.purge_interval_secs must be > 0 when purge is enabled, got {}",
                self.retention.purge_interval_secs
            );
            anyhow::ensure!(
                self.retention.vacuum_interval_secs > 0,
                "retention.vacuum_interval_secs must be > 0 when purge is enabled, got {}",
                self.retention.vacuum_interval_secs
            );
        }
        if let Some(ref schedule) = self.retention.vacuum_schedule {
            anyhow::ensure!(
                <cron::Schedule as std::str::FromStr>::from_str(schedule).is_ok(),
                "retention.vacuum_schedule is not a valid cron expression: {}",
                schedule
            );
        }
        anyhow::ensure!(
            self.report.fetch_margin_multiplier >= 0,
            "report.fetch_margin_multiplier must be >= 0, got {}",
            self.report.fetch_margin_multiplier
        );
        anyhow::ensure!(
            self.report.min_fetch_margin_ms >= 0,
            "report.min_fetch_margin_ms must be >= 0, got {}",
            self.report.min_fetch_margin_ms
        );
        Ok(())
    }
}
