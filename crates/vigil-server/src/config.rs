//! Configuration management for the Vigil server
//!
//! Sources, lowest precedence first: built-in defaults, the YAML file
//! (`conf/vigil.yml` or `--config`), `VIGIL_*` environment variables, then
//! command line overrides.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Parser;
use config::{Config, Environment, File};
use url::Url;
use vigil_cache::CacheConfig;
use vigil_client::{RecordStoreConfig, WebhookConfig};
use vigil_common::{DEFAULT_INCIDENTS_COLLECTION, DEFAULT_MAINTENANCE_COLLECTION};
use vigil_maintenance::{CooldownPolicy, SchedulerConfig};

use crate::startup::{LogRotation, LoggingConfig};

pub const DEFAULT_CONFIG_FILE: &str = "conf/vigil.yml";
pub const ENV_PREFIX: &str = "VIGIL";

const STORE_BASE_URL: &str = "store.base_url";
const STORE_API_TOKEN: &str = "store.api_token";
const STORE_INCIDENTS_COLLECTION: &str = "store.incidents_collection";
const STORE_MAINTENANCE_COLLECTION: &str = "store.maintenance_collection";
const STORE_CONNECT_TIMEOUT_MS: &str = "store.connect_timeout_ms";
const STORE_READ_TIMEOUT_MS: &str = "store.read_timeout_ms";
const WEBHOOK_URL: &str = "webhook.url";
const WEBHOOK_USERNAME: &str = "webhook.username";
const WEBHOOK_TIMEOUT_MS: &str = "webhook.timeout_ms";
const MONITOR_POLL_INTERVAL_SECS: &str = "monitor.poll_interval_secs";
const MONITOR_BACKOFF: &str = "monitor.backoff";
const MONITOR_COOLDOWN_SECS: &str = "monitor.cooldown_secs";
const MONITOR_MAX_COOLDOWN_SECS: &str = "monitor.max_cooldown_secs";
const CACHE_TTL_SECS: &str = "cache.ttl_secs";
const CACHE_FETCH_TIMEOUT_MS: &str = "cache.fetch_timeout_ms";
const CACHE_REFRESH_INTERVAL_SECS: &str = "cache.refresh_interval_secs";
const LOGGING_LEVEL: &str = "logging.level";
const LOGGING_CONSOLE: &str = "logging.console";
const LOGGING_FILE: &str = "logging.file";
const LOGGING_DIR: &str = "logging.dir";
const LOGGING_ROTATION: &str = "logging.rotation";

/// Command line arguments for the server
#[derive(Debug, Default, Parser)]
#[command(name = "vigil", version, about = "Maintenance window monitor and incident cache")]
pub struct Cli {
    /// Configuration file (default: conf/vigil.yml when present)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Log level override (trace, debug, info, warn, error)
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,
}

/// Application configuration loaded from config files and environment
#[derive(Clone, Debug)]
pub struct Configuration {
    pub config: Config,
}

impl Configuration {
    /// Load and validate the configuration
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let mut builder = Config::builder()
            .set_default(STORE_BASE_URL, RecordStoreConfig::default().base_url)?
            .set_default(STORE_INCIDENTS_COLLECTION, DEFAULT_INCIDENTS_COLLECTION)?
            .set_default(STORE_MAINTENANCE_COLLECTION, DEFAULT_MAINTENANCE_COLLECTION)?
            .set_default(STORE_CONNECT_TIMEOUT_MS, 5000_i64)?
            .set_default(STORE_READ_TIMEOUT_MS, 30000_i64)?
            .set_default(WEBHOOK_TIMEOUT_MS, 10000_i64)?
            .set_default(MONITOR_POLL_INTERVAL_SECS, 5_i64)?
            .set_default(MONITOR_BACKOFF, "fixed")?
            .set_default(MONITOR_COOLDOWN_SECS, 120_i64)?
            .set_default(MONITOR_MAX_COOLDOWN_SECS, 1800_i64)?
            .set_default(CACHE_TTL_SECS, 1800_i64)?
            .set_default(CACHE_FETCH_TIMEOUT_MS, 10000_i64)?
            .set_default(CACHE_REFRESH_INTERVAL_SECS, 60_i64)?
            .set_default(LOGGING_LEVEL, "info")?
            .set_default(LOGGING_CONSOLE, true)?
            .set_default(LOGGING_FILE, false)?
            .set_default(LOGGING_ROTATION, "daily")?;

        builder = match &cli.config {
            Some(path) => builder.add_source(File::from(path.as_path()).required(true)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(level) = &cli.log_level {
            builder = builder.set_override(LOGGING_LEVEL, level.as_str())?;
        }

        let config = builder
            .build()
            .context("Failed to build configuration - check conf/vigil.yml")?;
        let configuration = Configuration { config };
        configuration.validate()?;
        Ok(configuration)
    }

    /// Check every section; the first invalid value aborts startup
    pub fn validate(&self) -> anyhow::Result<()> {
        self.record_store_config()?;
        self.webhook_config()?;
        self.cooldown_policy()?;
        self.scheduler_config()?;
        self.cache_config()?;
        self.cache_refresh_interval()?;
        self.log_rotation()?;
        Ok(())
    }

    // ========================================================================
    // Record Store Configuration
    // ========================================================================

    pub fn record_store_config(&self) -> anyhow::Result<RecordStoreConfig> {
        let base_url = self.config.get_string(STORE_BASE_URL)?;
        Url::parse(&base_url).with_context(|| format!("invalid {}: {}", STORE_BASE_URL, base_url))?;

        let mut store = RecordStoreConfig::new(&base_url).with_timeouts(
            self.positive_u64(STORE_CONNECT_TIMEOUT_MS)?,
            self.positive_u64(STORE_READ_TIMEOUT_MS)?,
        );
        if let Some(token) = self.non_empty_string(STORE_API_TOKEN) {
            store = store.with_token(&token);
        }
        Ok(store)
    }

    pub fn incidents_collection(&self) -> String {
        self.non_empty_string(STORE_INCIDENTS_COLLECTION)
            .unwrap_or(DEFAULT_INCIDENTS_COLLECTION.to_string())
    }

    pub fn maintenance_collection(&self) -> String {
        self.non_empty_string(STORE_MAINTENANCE_COLLECTION)
            .unwrap_or(DEFAULT_MAINTENANCE_COLLECTION.to_string())
    }

    // ========================================================================
    // Webhook Configuration
    // ========================================================================

    /// `None` when no webhook url is configured
    pub fn webhook_config(&self) -> anyhow::Result<Option<WebhookConfig>> {
        let Some(url) = self.non_empty_string(WEBHOOK_URL) else {
            return Ok(None);
        };
        Url::parse(&url).with_context(|| format!("invalid {}: {}", WEBHOOK_URL, url))?;

        let mut webhook = WebhookConfig::new(&url).with_timeout(self.positive_u64(WEBHOOK_TIMEOUT_MS)?);
        if let Some(username) = self.non_empty_string(WEBHOOK_USERNAME) {
            webhook = webhook.with_username(&username);
        }
        Ok(Some(webhook))
    }

    // ========================================================================
    // Monitor Configuration
    // ========================================================================

    pub fn cooldown_policy(&self) -> anyhow::Result<CooldownPolicy> {
        let cooldown = Duration::from_secs(self.positive_u64(MONITOR_COOLDOWN_SECS)?);
        let backoff = self.config.get_string(MONITOR_BACKOFF)?;

        match backoff.to_lowercase().as_str() {
            "fixed" => Ok(CooldownPolicy::Fixed(cooldown)),
            "exponential" => {
                let max = Duration::from_secs(self.positive_u64(MONITOR_MAX_COOLDOWN_SECS)?);
                if max < cooldown {
                    bail!(
                        "{} ({:?}) must not be lower than {} ({:?})",
                        MONITOR_MAX_COOLDOWN_SECS,
                        max,
                        MONITOR_COOLDOWN_SECS,
                        cooldown
                    );
                }
                Ok(CooldownPolicy::Exponential {
                    base: cooldown,
                    max,
                })
            }
            other => bail!(
                "invalid {}: '{}' (expected 'fixed' or 'exponential')",
                MONITOR_BACKOFF,
                other
            ),
        }
    }

    pub fn scheduler_config(&self) -> anyhow::Result<SchedulerConfig> {
        Ok(SchedulerConfig::default().with_poll_interval(Duration::from_secs(
            self.positive_u64(MONITOR_POLL_INTERVAL_SECS)?,
        )))
    }

    // ========================================================================
    // Cache Configuration
    // ========================================================================

    pub fn cache_config(&self) -> anyhow::Result<CacheConfig> {
        Ok(CacheConfig::default()
            .with_ttl(Duration::from_secs(self.positive_u64(CACHE_TTL_SECS)?))
            .with_fetch_timeout(Duration::from_millis(
                self.positive_u64(CACHE_FETCH_TIMEOUT_MS)?,
            )))
    }

    pub fn cache_refresh_interval(&self) -> anyhow::Result<Duration> {
        Ok(Duration::from_secs(
            self.positive_u64(CACHE_REFRESH_INTERVAL_SECS)?,
        ))
    }

    // ========================================================================
    // Logging Configuration
    // ========================================================================

    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig::from_config(
            self.non_empty_string(LOGGING_DIR),
            self.config.get_bool(LOGGING_CONSOLE).unwrap_or(true),
            self.config.get_bool(LOGGING_FILE).unwrap_or(false),
            self.config
                .get_string(LOGGING_LEVEL)
                .unwrap_or("info".to_string()),
        )
        .with_rotation(self.log_rotation().unwrap_or(LogRotation::Daily))
    }

    pub fn log_rotation(&self) -> anyhow::Result<LogRotation> {
        self.config
            .get_string(LOGGING_ROTATION)?
            .parse()
            .with_context(|| format!("invalid {}", LOGGING_ROTATION))
    }

    fn positive_u64(&self, key: &str) -> anyhow::Result<u64> {
        let value = self
            .config
            .get_int(key)
            .with_context(|| format!("invalid value for {}", key))?;
        if value <= 0 {
            bail!("{} must be greater than zero, got {}", key, value);
        }
        Ok(value as u64)
    }

    fn non_empty_string(&self, key: &str) -> Option<String> {
        self.config
            .get_string(key)
            .ok()
            .filter(|v| !v.trim().is_empty())
    }
}
